//! PowerPC Instruction Word Fields
//!
//! Field extraction for 32-bit instruction words. Bit positions use the
//! architecture manual's numbering: bit 0 is the most significant bit of
//! the word and bit 31 the least significant.
//!
//! # Access Paths
//! - [`InsnWord::field`] extracts any `(start, width)` field through a
//!   `bitvec` MSB-first view of the word
//! - the named accessors (`ra`, `simm16`, `xo10`, ...) are fixed shifts for
//!   the fields translators read on every instruction
//!
//! # Instruction Forms
//! The named accessors cover the D, DS, DQ, X, XO, XL, XFX, XFL, M, MD,
//! MDS, A, VX, VA, VC, XX1-XX4 and Z22/Z23 forms. Several accessors read
//! the same bits under different names (`rd`, `rs`, `bo` and `to` are all
//! bits 6..10); pick the one the instruction's manual entry uses.

use bitvec::prelude::*;

/// A fetched 32-bit instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InsnWord(pub u32);

impl InsnWord {
    /// Fetch a word from `bytes` at `offset`.
    ///
    /// Big-endian guests store the most significant byte first, little-endian
    /// guests the least significant byte first. Returns `None` when fewer
    /// than four bytes remain.
    pub fn fetch(bytes: &[u8], offset: usize, big_endian: bool) -> Option<InsnWord> {
        let raw: [u8; 4] = bytes.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        let word: u32 = if big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        };
        Some(InsnWord(word))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Extract `width` bits starting at IBM bit `start`.
    ///
    /// # Panics
    /// If the field does not fit in the word or `width` is zero.
    pub fn field(self, start: u32, width: u32) -> u32 {
        assert!(width > 0 && start + width <= 32, "bad field ({}, {})", start, width);
        let (s, e): (usize, usize) = (start as usize, (start + width) as usize);
        self.0.view_bits::<Msb0>()[s..e].load_be::<u32>()
    }

    /// Return a copy of this word with the `(start, width)` field set to the
    /// low `width` bits of `value`.
    pub fn with_field(self, start: u32, width: u32, value: u32) -> InsnWord {
        assert!(width > 0 && start + width <= 32, "bad field ({}, {})", start, width);
        let (s, e): (usize, usize) = (start as usize, (start + width) as usize);
        let mut w: u32 = self.0;
        let masked: u32 = if width == 32 { value } else { value & ((1u32 << width) - 1) };
        w.view_bits_mut::<Msb0>()[s..e].store_be::<u32>(masked);
        InsnWord(w)
    }

    #[inline]
    fn bits(self, shift: u32, mask: u32) -> u32 {
        (self.0 >> shift) & mask
    }

    // Primary and extended opcodes.

    /// Primary opcode, bits 0..5.
    #[inline] // Hot path
    pub fn opc1(self) -> u32 {
        self.0 >> 26
    }

    /// X/XL/XFX-form extended opcode, bits 21..30.
    #[inline]
    pub fn xo10(self) -> u32 {
        self.bits(1, 0x3FF)
    }

    /// XO-form extended opcode, bits 22..30 (excludes OE).
    #[inline]
    pub fn xo9(self) -> u32 {
        self.bits(1, 0x1FF)
    }

    /// Z23-form extended opcode, bits 23..30.
    #[inline]
    pub fn xo8(self) -> u32 {
        self.bits(1, 0xFF)
    }

    /// A-form extended opcode, bits 26..30.
    #[inline]
    pub fn xo5(self) -> u32 {
        self.bits(1, 0x1F)
    }

    /// MDS-form extended opcode, bits 27..30.
    #[inline]
    pub fn xo4(self) -> u32 {
        self.bits(1, 0xF)
    }

    /// MD-form extended opcode, bits 27..29.
    #[inline]
    pub fn xo3(self) -> u32 {
        self.bits(2, 0x7)
    }

    /// DS-form extended opcode, bits 30..31.
    #[inline]
    pub fn xo2(self) -> u32 {
        self.0 & 3
    }

    /// VX-form extended opcode, bits 21..31.
    #[inline]
    pub fn vx_xo11(self) -> u32 {
        self.0 & 0x7FF
    }

    /// VA-form extended opcode, bits 26..31.
    #[inline]
    pub fn va_xo6(self) -> u32 {
        self.0 & 0x3F
    }

    /// VC-form extended opcode, bits 22..31 (excludes the record bit).
    #[inline]
    pub fn vc_xo10(self) -> u32 {
        self.0 & 0x3FF
    }

    /// VC-form record bit, bit 21.
    #[inline]
    pub fn vc_rc(self) -> bool {
        self.bits(10, 1) != 0
    }

    // Register fields.

    /// Bits 6..10: RT/RS/FRT/VRT.
    #[inline]
    pub fn rd(self) -> u32 {
        self.bits(21, 0x1F)
    }

    #[inline]
    pub fn rs(self) -> u32 {
        self.rd()
    }

    /// Bits 11..15.
    #[inline]
    pub fn ra(self) -> u32 {
        self.bits(16, 0x1F)
    }

    /// Bits 16..20.
    #[inline]
    pub fn rb(self) -> u32 {
        self.bits(11, 0x1F)
    }

    /// Bits 21..25: FRC/VRC/MB.
    #[inline]
    pub fn rc_field(self) -> u32 {
        self.bits(6, 0x1F)
    }

    // Flag bits.

    /// Record bit, bit 31.
    #[inline]
    pub fn rc(self) -> bool {
        self.0 & 1 != 0
    }

    /// Overflow-enable bit, bit 21 of XO forms.
    #[inline]
    pub fn oe(self) -> bool {
        self.bits(10, 1) != 0
    }

    /// Link bit, bit 31 of branches.
    #[inline]
    pub fn lk(self) -> bool {
        self.0 & 1 != 0
    }

    /// Absolute-address bit, bit 30 of branches.
    #[inline]
    pub fn aa(self) -> bool {
        self.bits(1, 1) != 0
    }

    /// Compare width bit L, bit 10.
    #[inline]
    pub fn l_bit(self) -> bool {
        self.bits(21, 1) != 0
    }

    // Immediates.

    /// Low 16 bits, sign-extended.
    #[inline]
    pub fn simm16(self) -> i32 {
        (self.0 & 0xFFFF) as u16 as i16 as i32
    }

    #[inline]
    pub fn uimm16(self) -> u32 {
        self.0 & 0xFFFF
    }

    /// DS-form displacement (low two bits cleared), sign-extended.
    #[inline]
    pub fn ds(self) -> i32 {
        ((self.0 & 0xFFFC) as u16 as i16) as i32
    }

    /// DQ-form displacement field, bits 16..27 (unscaled).
    #[inline]
    pub fn dq(self) -> u32 {
        self.bits(4, 0xFFF)
    }

    /// I-form branch displacement field, bits 6..29 (unscaled).
    #[inline]
    pub fn li24(self) -> u32 {
        self.bits(2, 0xFF_FFFF)
    }

    /// B-form branch displacement field, bits 16..29 (unscaled).
    #[inline]
    pub fn bd14(self) -> u32 {
        self.bits(2, 0x3FFF)
    }

    /// Branch options, bits 6..10.
    #[inline]
    pub fn bo(self) -> u32 {
        self.rd()
    }

    /// Branch condition bit, bits 11..15.
    #[inline]
    pub fn bi(self) -> u32 {
        self.ra()
    }

    /// Trap condition mask, bits 6..10.
    #[inline]
    pub fn to(self) -> u32 {
        self.rd()
    }

    /// Target CR field, bits 6..8.
    #[inline]
    pub fn crfd(self) -> u32 {
        self.bits(23, 0x7)
    }

    /// Source CR field, bits 11..13.
    #[inline]
    pub fn crfs(self) -> u32 {
        self.bits(18, 0x7)
    }

    /// Shift amount of M/X forms, bits 16..20.
    #[inline]
    pub fn sh5(self) -> u32 {
        self.rb()
    }

    /// M-form mask begin, bits 21..25.
    #[inline]
    pub fn mb5(self) -> u32 {
        self.rc_field()
    }

    /// M-form mask end, bits 26..30.
    #[inline]
    pub fn me5(self) -> u32 {
        self.bits(1, 0x1F)
    }

    /// MD/XS-form 6-bit shift: bits 16..20 with bit 30 as the high bit.
    #[inline]
    pub fn sh6(self) -> u32 {
        self.rb() | (self.bits(1, 1) << 5)
    }

    /// MD/MDS-form 6-bit mask: bits 21..25 with bit 26 as the high bit.
    #[inline]
    pub fn mb6(self) -> u32 {
        self.rc_field() | (self.bits(5, 1) << 5)
    }

    /// SPR number with its two 5-bit halves swapped back.
    #[inline]
    pub fn spr(self) -> u32 {
        let raw: u32 = self.bits(11, 0x3FF);
        ((raw & 0x1F) << 5) | (raw >> 5)
    }

    /// Time-base register number, encoded like [`InsnWord::spr`].
    #[inline]
    pub fn tbr(self) -> u32 {
        self.spr()
    }

    /// mtcrf field mask, bits 12..19.
    #[inline]
    pub fn crm(self) -> u32 {
        self.bits(12, 0xFF)
    }

    /// mtfsf field mask, bits 7..14.
    #[inline]
    pub fn fm(self) -> u32 {
        self.bits(17, 0xFF)
    }

    /// String byte count, bits 16..20.
    #[inline]
    pub fn nb(self) -> u32 {
        self.rb()
    }

    // DFP fields.

    /// Z22-form 6-bit data-class/group mask or shift, bits 16..21.
    #[inline]
    pub fn dcm(self) -> u32 {
        self.bits(10, 0x3F)
    }

    /// Z23-form rounding-mode control, bits 21..22.
    #[inline]
    pub fn rmc(self) -> u32 {
        self.bits(9, 0x3)
    }

    /// Z23-form R bit, bit 15.
    #[inline]
    pub fn r_bit(self) -> bool {
        self.bits(16, 1) != 0
    }

    // VSX fields.

    /// XT: bits 6..10 with TX (bit 31) as the high bit.
    #[inline]
    pub fn xt(self) -> u32 {
        self.rd() | ((self.0 & 1) << 5)
    }

    /// XS of XX1-form stores, same encoding as [`InsnWord::xt`].
    #[inline]
    pub fn xs(self) -> u32 {
        self.xt()
    }

    /// XA: bits 11..15 with AX (bit 29) as the high bit.
    #[inline]
    pub fn xa(self) -> u32 {
        self.ra() | (self.bits(2, 1) << 5)
    }

    /// XB: bits 16..20 with BX (bit 30) as the high bit.
    #[inline]
    pub fn xb(self) -> u32 {
        self.rb() | (self.bits(1, 1) << 5)
    }

    /// XC: bits 21..25 with CX (bit 28) as the high bit.
    #[inline]
    pub fn xc(self) -> u32 {
        self.rc_field() | (self.bits(3, 1) << 5)
    }

    /// XX3 two-bit immediate (xxpermdi DM, xxsldwi SHW), bits 22..23.
    #[inline]
    pub fn xx_dm(self) -> u32 {
        self.bits(8, 0x3)
    }

    /// XX2 two-bit UIM (xxspltw), bits 14..15.
    #[inline]
    pub fn xx_uim(self) -> u32 {
        self.bits(16, 0x3)
    }
}

impl From<u32> for InsnWord {
    fn from(w: u32) -> Self {
        InsnWord(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_matches_named_accessors() {
        // addi r3, r1, -8
        let w = InsnWord(0x3861FFF8);
        assert_eq!(w.opc1(), 14);
        assert_eq!(w.field(0, 6), 14);
        assert_eq!(w.rd(), 3);
        assert_eq!(w.field(6, 5), 3);
        assert_eq!(w.ra(), 1);
        assert_eq!(w.simm16(), -8);
        assert_eq!(w.field(16, 16), 0xFFF8);
    }

    #[test]
    fn test_field_round_trip() {
        for width in 1u32..=26 {
            let max: u32 = (1u32 << width) - 1;
            for value in [0, 1, max, max / 2 + 1] {
                for start in [0u32, 32 - width, (32 - width) / 2] {
                    let w = InsnWord(0).with_field(start, width, value);
                    assert_eq!(w.field(start, width), value, "start {} width {}", start, width);
                    // All other bits stay clear.
                    assert_eq!(w.0 & !(max << (32 - start - width)), 0);
                }
            }
        }
    }

    #[test]
    fn test_spr_halves_swapped() {
        // mflr r0 = mfspr r0, 8
        let w = InsnWord(0x7C0802A6);
        assert_eq!(w.xo10(), 339);
        assert_eq!(w.spr(), 8);
        // mfctr r0 = mfspr r0, 9
        assert_eq!(InsnWord(0x7C0902A6).spr(), 9);
    }

    #[test]
    fn test_md_fields() {
        // rldicl r3, r4, 63, 1  (sh=63, mb=1)
        let w = InsnWord(0x7883F842);
        assert_eq!(w.opc1(), 30);
        assert_eq!(w.sh6(), 63);
        assert_eq!(w.mb6(), 1);
        assert_eq!(w.xo3(), 0);
    }

    #[test]
    fn test_fetch_endianness() {
        let bytes: [u8; 6] = [0x38, 0x60, 0x00, 0x05, 0xAA, 0xBB];
        assert_eq!(InsnWord::fetch(&bytes, 0, true), Some(InsnWord(0x38600005)));
        assert_eq!(InsnWord::fetch(&bytes, 0, false), Some(InsnWord(0x05006038)));
        assert_eq!(InsnWord::fetch(&bytes, 4, true), None);
        assert_eq!(InsnWord::fetch(&bytes, usize::MAX, true), None);
    }

    #[test]
    fn test_vsx_register_fields() {
        // xxlor vs33, vs34, vs35: all three high bits set.
        let w = InsnWord(0xF0221C97);
        assert_eq!(w.xt(), 33);
        assert_eq!(w.xa(), 34);
        assert_eq!(w.xb(), 35);
    }
}
