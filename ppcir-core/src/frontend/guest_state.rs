//! Guest-State Addressing
//!
//! Maps architectural registers to `(offset, type)` locations in the guest
//! state record. The record itself is owned by whoever executes the IR;
//! the decoder only needs offsets, obtained through the [`GuestLayout`]
//! trait.
//!
//! # Register Model
//! - GPRs are 32 or 64 bits wide depending on the architecture variant
//! - the 64 VSX registers are the only storage for FP and vector values:
//!   FPR `i` is one doubleword of VSR `i` and VR `i` is VSR `i + 32`
//! - each CR field is split over two bytes: `CRn_321` holds LT/GT/EQ in
//!   bits 3..1 and `CRn_0` holds SO in bit 0
//! - XER is four separate bytes (SO, OV, CA, byte count)
//! - FPSCR is modelled by its binary and decimal rounding modes and the
//!   C/FPCC nibble
//!
//! Out-of-range register indices are translator bugs and panic.

use crate::frontend::ir::{Endness, IrType};
use crate::target::GuestArch;

/// A storage slot in the guest state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestSlot {
    Gpr(u32),
    Vsr(u32),
    Cia,
    Lr,
    Ctr,
    Tar,
    XerSo,
    XerOv,
    XerCa,
    XerBc,
    /// LT/GT/EQ byte of CR field `n`.
    Cr321(u32),
    /// SO byte of CR field `n`.
    Cr0(u32),
    /// Binary FP rounding mode, architectural encoding (RN).
    FpRound,
    /// Decimal FP rounding mode, architectural encoding (DRN).
    DfpRound,
    /// FPSCR C and FPCC bits.
    CFpcc,
    Vrsave,
    Vscr,
    /// Emulation warning code.
    Emnote,
    /// Start of a cache-management range.
    CmStart,
    /// Length of a cache-management range.
    CmLen,
    /// Non-redirected address of the current function.
    NrAddr,
    NrAddrGpr2,
    IpAtSyscall,
    Sprg3Ro,
    Tfhar,
    Texasr,
    Texasru,
    Tfiar,
    Ppr,
    Pspb,
    Dscr,
}

const FIXED_SLOTS: [GuestSlot; 27] = [
    GuestSlot::Cia,
    GuestSlot::Lr,
    GuestSlot::Ctr,
    GuestSlot::Tar,
    GuestSlot::XerSo,
    GuestSlot::XerOv,
    GuestSlot::XerCa,
    GuestSlot::XerBc,
    GuestSlot::FpRound,
    GuestSlot::DfpRound,
    GuestSlot::CFpcc,
    GuestSlot::Vrsave,
    GuestSlot::Vscr,
    GuestSlot::Emnote,
    GuestSlot::CmStart,
    GuestSlot::CmLen,
    GuestSlot::NrAddr,
    GuestSlot::NrAddrGpr2,
    GuestSlot::IpAtSyscall,
    GuestSlot::Sprg3Ro,
    GuestSlot::Tfhar,
    GuestSlot::Texasr,
    GuestSlot::Texasru,
    GuestSlot::Tfiar,
    GuestSlot::Ppr,
    GuestSlot::Pspb,
    GuestSlot::Dscr,
];

impl GuestSlot {
    /// IR type stored in this slot for `arch`.
    pub fn ty(self, arch: GuestArch) -> IrType {
        let word: IrType = if arch.is_64() { IrType::I64 } else { IrType::I32 };
        match self {
            GuestSlot::Gpr(_)
            | GuestSlot::Cia
            | GuestSlot::Lr
            | GuestSlot::Ctr
            | GuestSlot::Tar
            | GuestSlot::CmStart
            | GuestSlot::CmLen
            | GuestSlot::NrAddr
            | GuestSlot::NrAddrGpr2
            | GuestSlot::IpAtSyscall
            | GuestSlot::Sprg3Ro => word,
            GuestSlot::Vsr(_) => IrType::V128,
            GuestSlot::XerSo
            | GuestSlot::XerOv
            | GuestSlot::XerCa
            | GuestSlot::XerBc
            | GuestSlot::Cr321(_)
            | GuestSlot::Cr0(_)
            | GuestSlot::FpRound
            | GuestSlot::DfpRound
            | GuestSlot::CFpcc => IrType::I8,
            GuestSlot::Vrsave
            | GuestSlot::Vscr
            | GuestSlot::Emnote
            | GuestSlot::Texasru
            | GuestSlot::Pspb => IrType::I32,
            GuestSlot::Tfhar | GuestSlot::Texasr | GuestSlot::Tfiar | GuestSlot::Ppr | GuestSlot::Dscr => {
                IrType::I64
            }
        }
    }

    fn fixed_index(self) -> Option<usize> {
        FIXED_SLOTS.iter().position(|s| *s == self)
    }
}

/// Where a value lives in the guest state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub offset: u32,
    pub ty: IrType,
}

/// Capability to resolve guest-state offsets.
pub trait GuestLayout {
    fn arch(&self) -> GuestArch;

    /// Byte offset of `slot`.
    ///
    /// # Panics
    /// On out-of-range register indices.
    fn offset_of(&self, slot: GuestSlot) -> u32;

    /// Size of the whole guest state in bytes.
    fn total_size(&self) -> u32;

    /// Offset and type of `slot`.
    fn location(&self, slot: GuestSlot) -> Location {
        Location { offset: self.offset_of(slot), ty: slot.ty(self.arch()) }
    }
}

/// Deterministic guest-state layout for one architecture variant.
///
/// GPRs start at offset 0, followed by the 16-byte aligned VSX file, the
/// special registers, and the sixteen CR bytes. Every slot is naturally
/// aligned.
#[derive(Debug, Clone)]
pub struct PpcGuestLayout {
    arch: GuestArch,
    vsr_base: u32,
    cr_base: u32,
    fixed: [u32; FIXED_SLOTS.len()],
    size: u32,
}

#[inline]
fn align_up(v: u32, a: u32) -> u32 {
    (v + a - 1) & !(a - 1)
}

impl PpcGuestLayout {
    pub fn new(arch: GuestArch) -> Self {
        let word: u32 = arch.word_bytes();
        let mut cursor: u32 = 32 * word;
        let vsr_base: u32 = align_up(cursor, 16);
        cursor = vsr_base + 64 * 16;

        let mut fixed: [u32; FIXED_SLOTS.len()] = [0; FIXED_SLOTS.len()];
        for (i, slot) in FIXED_SLOTS.iter().enumerate() {
            let sz: u32 = slot.ty(arch).size_bytes();
            cursor = align_up(cursor, sz);
            fixed[i] = cursor;
            cursor += sz;
        }
        let cr_base: u32 = cursor;
        cursor += 16;

        Self { arch, vsr_base, cr_base, fixed, size: align_up(cursor, 16) }
    }
}

impl GuestLayout for PpcGuestLayout {
    #[inline]
    fn arch(&self) -> GuestArch {
        self.arch
    }

    fn offset_of(&self, slot: GuestSlot) -> u32 {
        match slot {
            GuestSlot::Gpr(i) => {
                assert!(i < 32, "GPR index {} out of range", i);
                i * self.arch.word_bytes()
            }
            GuestSlot::Vsr(i) => {
                assert!(i < 64, "VSR index {} out of range", i);
                self.vsr_base + i * 16
            }
            GuestSlot::Cr321(n) => {
                assert!(n < 8, "CR field {} out of range", n);
                self.cr_base + 2 * n
            }
            GuestSlot::Cr0(n) => {
                assert!(n < 8, "CR field {} out of range", n);
                self.cr_base + 2 * n + 1
            }
            other => match other.fixed_index() {
                Some(i) => self.fixed[i],
                None => panic!("no storage for {:?}", other),
            },
        }
    }

    #[inline]
    fn total_size(&self) -> u32 {
        self.size
    }
}

/// Integer register `i` at the mode's word width.
pub fn gpr(layout: &dyn GuestLayout, i: u32) -> Location {
    layout.location(GuestSlot::Gpr(i))
}

/// Floating-point register `i`: the architecturally high doubleword of
/// VSR `i`, which sits at the low address on big-endian hosts and the high
/// address on little-endian hosts.
pub fn fpr(layout: &dyn GuestLayout, i: u32, host: Endness) -> Location {
    assert!(i < 32, "FPR index {} out of range", i);
    let base: u32 = layout.offset_of(GuestSlot::Vsr(i));
    let shift: u32 = match host {
        Endness::Big => 0,
        Endness::Little => 8,
    };
    Location { offset: base + shift, ty: IrType::F64 }
}

/// Altivec register `i`, aliased to VSR `i + 32`.
pub fn vr(layout: &dyn GuestLayout, i: u32) -> Location {
    assert!(i < 32, "VR index {} out of range", i);
    layout.location(GuestSlot::Vsr(i + 32))
}

/// VSX register `i` (0..64).
pub fn vsr(layout: &dyn GuestLayout, i: u32) -> Location {
    layout.location(GuestSlot::Vsr(i))
}

/// Storage position of a single CR bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrBitPos {
    /// CR field, 0..8.
    pub field: u32,
    /// Bit within the field's nibble: 3 = LT, 2 = GT, 1 = EQ, 0 = SO.
    pub nibble_bit: u32,
}

impl CrBitPos {
    /// Position of CR bit `bi` (0 = CR0.LT, 31 = CR7.SO).
    pub fn of(bi: u32) -> Self {
        assert!(bi < 32, "CR bit {} out of range", bi);
        CrBitPos { field: bi / 4, nibble_bit: 3 - (bi % 4) }
    }

    /// The byte slot holding this bit. SO lives in `CRn_0`, the others in
    /// `CRn_321` at their nibble position.
    pub fn slot(self) -> GuestSlot {
        if self.nibble_bit == 0 {
            GuestSlot::Cr0(self.field)
        } else {
            GuestSlot::Cr321(self.field)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_layout_slots_do_not_overlap() {
        for arch in [GuestArch::Ppc32, GuestArch::Ppc64] {
            let l = PpcGuestLayout::new(arch);
            let mut slots: Vec<GuestSlot> = Vec::new();
            slots.extend((0..32).map(GuestSlot::Gpr));
            slots.extend((0..64).map(GuestSlot::Vsr));
            slots.extend((0..8).map(GuestSlot::Cr321));
            slots.extend((0..8).map(GuestSlot::Cr0));
            slots.extend(FIXED_SLOTS.iter().copied());
            let mut bytes: HashSet<u32> = HashSet::new();
            for s in slots {
                let loc: Location = l.location(s);
                assert_eq!(loc.offset % loc.ty.size_bytes(), 0, "{:?} misaligned", s);
                for b in loc.offset..loc.offset + loc.ty.size_bytes() {
                    assert!(bytes.insert(b), "{:?} overlaps at byte {}", s, b);
                }
                assert!(loc.offset + loc.ty.size_bytes() <= l.total_size());
            }
        }
    }

    #[test]
    fn test_fpr_aliases_vsr_doubleword() {
        let l = PpcGuestLayout::new(GuestArch::Ppc64);
        for i in 0..32 {
            let v: u32 = l.offset_of(GuestSlot::Vsr(i));
            assert_eq!(fpr(&l, i, Endness::Big).offset, v);
            assert_eq!(fpr(&l, i, Endness::Little).offset, v + 8);
            assert_eq!(vr(&l, i).offset, l.offset_of(GuestSlot::Vsr(i + 32)));
        }
    }

    #[test]
    fn test_gpr_width_follows_mode() {
        assert_eq!(gpr(&PpcGuestLayout::new(GuestArch::Ppc32), 3).ty, IrType::I32);
        assert_eq!(gpr(&PpcGuestLayout::new(GuestArch::Ppc64), 3).ty, IrType::I64);
    }

    #[test]
    fn test_cr_bit_positions() {
        assert_eq!(CrBitPos::of(0), CrBitPos { field: 0, nibble_bit: 3 });
        assert_eq!(CrBitPos::of(2).slot(), GuestSlot::Cr321(0));
        assert_eq!(CrBitPos::of(3).slot(), GuestSlot::Cr0(0));
        assert_eq!(CrBitPos::of(30), CrBitPos { field: 7, nibble_bit: 1 });
    }

    #[test]
    #[should_panic]
    fn test_gpr_out_of_range() {
        gpr(&PpcGuestLayout::new(GuestArch::Ppc64), 32);
    }
}
