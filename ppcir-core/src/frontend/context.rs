//! Decode Context and Emission Primitives
//!
//! [`DecodeContext`] carries everything one instruction's translation
//! needs: processor mode, byte orders, the instruction address, enabled
//! features, ABI details, the guest-state layout and the
//! [`InsnBuilder`] receiving the instruction's IR. A fresh context is
//! created for every decoded instruction and passed by `&mut` to every
//! translator.
//!
//! # Register Access
//! `get_*`/`put_*` resolve architectural registers through the
//! [`GuestLayout`](super::guest_state::GuestLayout) and emit typed `Get`
//! and `Put` nodes. Composite registers (CR, XER, FPSCR) are assembled
//! from and split into their component bytes here.
//!
//! # Memory Access
//! Loads and stores carry the byte order recorded at entry. Effective
//! address helpers follow the `(RA|0) + disp` and `(RA|0) + RB` rules.

use crate::frontend::guest_state::{self, CrBitPos, GuestLayout, GuestSlot, Location};
use crate::frontend::ir::{
    binop, get, load, mk_u32, mk_u64, mk_u8, mkexpr, unop, Const, Endness, Expr,
    InsnBuilder, IrType, JumpKind, Op, SzOp, Temp, TypeEnv,
};
use crate::target::{AbiInfo, ArchInfo, Features, GuestArch};

/// What the block decoder should do after this instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhatNext {
    /// Decode the next sequential instruction.
    Continue,
    /// Continue decoding at `target` within the same block.
    Resteer { target: u64 },
    /// End the block; `CIA` has been written and the jump has this kind.
    StopHere(JumpKind),
}

/// Special architectural registers and composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestReg {
    Cia,
    Lr,
    Ctr,
    Tar,
    /// 32-bit composite of SO/OV/CA/byte count.
    Xer,
    /// 32-bit composite of the eight CR fields.
    Cr,
    /// 64-bit composite of RN, C/FPCC and DRN.
    Fpscr,
    Vrsave,
    Vscr,
    Emnote,
    CmStart,
    CmLen,
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

impl GuestReg {
    /// Storage slot of a non-composite register.
    fn slot(self) -> Option<GuestSlot> {
        let s: GuestSlot = match self {
            GuestReg::Cia => GuestSlot::Cia,
            GuestReg::Lr => GuestSlot::Lr,
            GuestReg::Ctr => GuestSlot::Ctr,
            GuestReg::Tar => GuestSlot::Tar,
            GuestReg::Vrsave => GuestSlot::Vrsave,
            GuestReg::Vscr => GuestSlot::Vscr,
            GuestReg::Emnote => GuestSlot::Emnote,
            GuestReg::CmStart => GuestSlot::CmStart,
            GuestReg::CmLen => GuestSlot::CmLen,
            GuestReg::NrAddr => GuestSlot::NrAddr,
            GuestReg::NrAddrGpr2 => GuestSlot::NrAddrGpr2,
            GuestReg::IpAtSyscall => GuestSlot::IpAtSyscall,
            GuestReg::Sprg3Ro => GuestSlot::Sprg3Ro,
            GuestReg::Tfhar => GuestSlot::Tfhar,
            GuestReg::Texasr => GuestSlot::Texasr,
            GuestReg::Texasru => GuestSlot::Texasru,
            GuestReg::Tfiar => GuestSlot::Tfiar,
            GuestReg::Ppr => GuestSlot::Ppr,
            GuestReg::Pspb => GuestSlot::Pspb,
            GuestReg::Dscr => GuestSlot::Dscr,
            GuestReg::Xer | GuestReg::Cr | GuestReg::Fpscr => return None,
        };
        Some(s)
    }
}

/// FPSCR field masks, in the 64-bit register's LSB-0 bit positions.
pub mod fpscr {
    /// Binary rounding mode RN.
    pub const RN: u64 = 0x3;
    /// C and FPCC.
    pub const C_FPCC: u64 = 0x1F << 12;
    /// Decimal rounding mode DRN.
    pub const DRN: u64 = 0x7 << 32;
}

/// VSCR bits.
pub mod vscr {
    pub const SAT: u32 = 0x1;
    pub const NJ: u32 = 0x1_0000;
}

/// Per-instruction translation state.
pub struct DecodeContext<'a> {
    pub arch: GuestArch,
    pub mode64: bool,
    /// Byte order of emitted loads and stores and of the FPR/VSR overlay.
    pub host_end: Endness,
    /// Byte order the guest code was fetched in.
    pub guest_end: Endness,
    /// Address of the instruction being translated.
    pub cia: u64,
    /// Address of the first instruction of the enclosing block.
    pub block_start: u64,
    pub features: Features,
    pub arch_info: &'a ArchInfo,
    pub abi: &'a AbiInfo,
    pub layout: &'a dyn GuestLayout,
    pub resteer_ok: &'a dyn Fn(u64) -> bool,
    /// Report decode failures at `warn` instead of `debug`.
    pub sigill_diag: bool,
    pub ir: InsnBuilder,
    pub what_next: WhatNext,
}

impl<'a> DecodeContext<'a> {
    // Mode and immediates.

    /// Integer register type for the current mode.
    #[inline]
    pub fn ty(&self) -> IrType {
        if self.mode64 {
            IrType::I64
        } else {
            IrType::I32
        }
    }

    /// Mode-sized variant of `op`.
    #[inline]
    pub fn sz_op(&self, op: SzOp) -> Op {
        Op::sized(op, self.ty())
    }

    /// Address of the next sequential instruction, wrapped to the mode.
    #[inline]
    pub fn nia(&self) -> u64 {
        self.mode_addr(self.cia.wrapping_add(4))
    }

    /// Truncate an address to the mode's width.
    #[inline]
    pub fn mode_addr(&self, a: u64) -> u64 {
        if self.mode64 {
            a
        } else {
            a & 0xFFFF_FFFF
        }
    }

    /// Mode-sized constant.
    #[inline]
    pub fn mk_sz_imm(&self, v: u64) -> Expr {
        if self.mode64 {
            mk_u64(v)
        } else {
            mk_u32(v as u32)
        }
    }

    /// Mode-sized address constant usable as an exit target.
    #[inline]
    pub fn mk_sz_const(&self, v: u64) -> Const {
        if self.mode64 {
            Const::U64(v)
        } else {
            Const::U32(v as u32)
        }
    }

    // Temporaries.

    #[inline]
    pub fn new_temp(&mut self, ty: IrType) -> Temp {
        self.ir.new_temp(ty)
    }

    #[inline]
    pub fn assign(&mut self, t: Temp, e: Expr) {
        self.ir.assign(t, e)
    }

    /// Bind `e` to a fresh temporary.
    #[inline]
    pub fn tmp(&mut self, e: Expr) -> Temp {
        self.ir.new_assign(e)
    }

    /// Bind `e` to a fresh temporary and return a read of it.
    #[inline]
    pub fn tmp_e(&mut self, e: Expr) -> Expr {
        mkexpr(self.ir.new_assign(e))
    }

    #[inline]
    pub fn type_of(&self, e: &Expr) -> IrType {
        e.type_of(&self.ir as &dyn TypeEnv)
    }

    // Width conversion.

    /// Widen an 8/16/32-bit integer (or pass through a word) to the mode width.
    pub fn widen_to_word(&self, e: Expr, signed: bool) -> Expr {
        let from: IrType = self.type_of(&e);
        let to: IrType = self.ty();
        if from == to {
            return e;
        }
        let op: Op = match (from, to, signed) {
            (IrType::I8, IrType::I32, false) => Op::Cast8Uto32,
            (IrType::I8, IrType::I32, true) => Op::Cast8Sto32,
            (IrType::I8, IrType::I64, false) => Op::Cast8Uto64,
            (IrType::I8, IrType::I64, true) => Op::Cast8Sto64,
            (IrType::I16, IrType::I32, false) => Op::Cast16Uto32,
            (IrType::I16, IrType::I32, true) => Op::Cast16Sto32,
            (IrType::I16, IrType::I64, false) => Op::Cast16Uto64,
            (IrType::I16, IrType::I64, true) => Op::Cast16Sto64,
            (IrType::I32, IrType::I64, false) => Op::Cast32Uto64,
            (IrType::I32, IrType::I64, true) => Op::Cast32Sto64,
            (IrType::I1, IrType::I32, _) => Op::Cast1Uto32,
            (IrType::I1, IrType::I64, _) => Op::Cast1Uto64,
            other => panic!("widen_to_word: cannot widen {:?}", other),
        };
        unop(op, e)
    }

    /// Narrow a word-sized expression to `to` (I8/I16/I32).
    pub fn narrow_from_word(&self, e: Expr, to: IrType) -> Expr {
        let from: IrType = self.type_of(&e);
        if from == to {
            return e;
        }
        let op: Op = match (from, to) {
            (IrType::I64, IrType::I32) => Op::Cast64to32,
            (IrType::I64, IrType::I16) => Op::Cast64to16,
            (IrType::I64, IrType::I8) => Op::Cast64to8,
            (IrType::I32, IrType::I16) => Op::Cast32to16,
            (IrType::I32, IrType::I8) => Op::Cast32to8,
            other => panic!("narrow_from_word: cannot narrow {:?}", other),
        };
        unop(op, e)
    }

    /// Word-sized expression as I32: identity in 32-bit mode, low half in 64-bit mode.
    #[inline]
    pub fn word_to_32(&self, e: Expr) -> Expr {
        if self.mode64 {
            unop(Op::Cast64to32, e)
        } else {
            e
        }
    }

    /// Word-sized expression as I64: identity in 64-bit mode, zero/sign
    /// extended in 32-bit mode.
    #[inline]
    pub fn word_to_64(&self, e: Expr, signed: bool) -> Expr {
        if self.mode64 {
            e
        } else {
            unop(if signed { Op::Cast32Sto64 } else { Op::Cast32Uto64 }, e)
        }
    }

    // Guest-state primitives.

    #[inline]
    pub fn loc(&self, slot: GuestSlot) -> Location {
        self.layout.location(slot)
    }

    #[inline]
    pub fn get_slot(&self, slot: GuestSlot) -> Expr {
        let l: Location = self.loc(slot);
        get(l.offset, l.ty)
    }

    #[inline]
    pub fn put_slot(&mut self, slot: GuestSlot, e: Expr) {
        let l: Location = self.loc(slot);
        self.ir.put(l.offset, l.ty, e);
    }

    /// Offset of the program counter, used as the exit `offs_ip`.
    #[inline]
    pub fn offs_cia(&self) -> u32 {
        self.layout.offset_of(GuestSlot::Cia)
    }

    // Registers.

    #[inline]
    pub fn get_ireg(&self, i: u32) -> Expr {
        let l: Location = guest_state::gpr(self.layout, i);
        get(l.offset, l.ty)
    }

    #[inline]
    pub fn put_ireg(&mut self, i: u32, e: Expr) {
        let l: Location = guest_state::gpr(self.layout, i);
        self.ir.put(l.offset, l.ty, e);
    }

    #[inline]
    pub fn get_freg(&self, i: u32) -> Expr {
        let l: Location = guest_state::fpr(self.layout, i, self.host_end);
        get(l.offset, l.ty)
    }

    #[inline]
    pub fn put_freg(&mut self, i: u32, e: Expr) {
        let l: Location = guest_state::fpr(self.layout, i, self.host_end);
        self.ir.put(l.offset, l.ty, e);
    }

    #[inline]
    pub fn get_vreg(&self, i: u32) -> Expr {
        let l: Location = guest_state::vr(self.layout, i);
        get(l.offset, l.ty)
    }

    #[inline]
    pub fn put_vreg(&mut self, i: u32, e: Expr) {
        let l: Location = guest_state::vr(self.layout, i);
        self.ir.put(l.offset, l.ty, e);
    }

    #[inline]
    pub fn get_vsreg(&self, i: u32) -> Expr {
        let l: Location = guest_state::vsr(self.layout, i);
        get(l.offset, l.ty)
    }

    #[inline]
    pub fn put_vsreg(&mut self, i: u32, e: Expr) {
        let l: Location = guest_state::vsr(self.layout, i);
        self.ir.put(l.offset, l.ty, e);
    }

    /// FPR `i` as its raw I64 bit pattern.
    #[inline]
    pub fn get_freg_bits(&self, i: u32) -> Expr {
        unop(Op::ReinterpF64asI64, self.get_freg(i))
    }

    /// Write FPR `i` from an I64 bit pattern.
    #[inline]
    pub fn put_freg_bits(&mut self, i: u32, e: Expr) {
        self.put_freg(i, unop(Op::ReinterpI64asF64, e));
    }

    // Condition register.

    /// CR bit `bi` as an I32 holding 0 or 1.
    pub fn get_cr_bit(&self, bi: u32) -> Expr {
        let pos: CrBitPos = CrBitPos::of(bi);
        let byte: Expr = unop(Op::Cast8Uto32, self.get_slot(pos.slot()));
        if pos.nibble_bit == 0 {
            binop(Op::And32, byte, mk_u32(1))
        } else {
            binop(Op::And32, binop(Op::Shr32, byte, mk_u8(pos.nibble_bit as u8)), mk_u32(1))
        }
    }

    /// Write CR bit `bi` from an I32 whose low bit is the new value. The
    /// other bits sharing the byte are preserved.
    pub fn put_cr_bit(&mut self, bi: u32, bit: Expr) {
        let pos: CrBitPos = CrBitPos::of(bi);
        let bit: Expr = binop(Op::And32, bit, mk_u32(1));
        if pos.nibble_bit == 0 {
            self.put_slot(pos.slot(), unop(Op::Cast32to8, bit));
            return;
        }
        let old: Expr = unop(Op::Cast8Uto32, self.get_slot(pos.slot()));
        let kept: Expr = binop(Op::And32, old, mk_u32(!(1u32 << pos.nibble_bit)));
        let merged: Expr =
            binop(Op::Or32, kept, binop(Op::Shl32, bit, mk_u8(pos.nibble_bit as u8)));
        self.put_slot(pos.slot(), unop(Op::Cast32to8, merged));
    }

    /// CR field `f` as an I32 nibble (LT GT EQ SO in bits 3..0).
    pub fn get_cr_field(&self, f: u32) -> Expr {
        let hi: Expr = binop(Op::And32, unop(Op::Cast8Uto32, self.get_slot(GuestSlot::Cr321(f))), mk_u32(0xE));
        let lo: Expr = binop(Op::And32, unop(Op::Cast8Uto32, self.get_slot(GuestSlot::Cr0(f))), mk_u32(1));
        binop(Op::Or32, hi, lo)
    }

    /// Write CR field `f` from an I32 nibble. Both bytes are written.
    pub fn put_cr_field(&mut self, f: u32, nibble: Expr) {
        let t: Temp = self.tmp(nibble);
        self.put_slot(GuestSlot::Cr321(f), unop(Op::Cast32to8, binop(Op::And32, mkexpr(t), mk_u32(0xE))));
        self.put_slot(GuestSlot::Cr0(f), unop(Op::Cast32to8, binop(Op::And32, mkexpr(t), mk_u32(1))));
    }

    /// Write the LT/GT/EQ byte of field `f` (I8, bits 3..1).
    #[inline]
    pub fn put_cr321(&mut self, f: u32, e: Expr) {
        self.put_slot(GuestSlot::Cr321(f), e);
    }

    /// Write the SO byte of field `f` (I8, bit 0).
    #[inline]
    pub fn put_cr0(&mut self, f: u32, e: Expr) {
        self.put_slot(GuestSlot::Cr0(f), e);
    }

    // XER.

    /// XER.SO as I8 0/1.
    #[inline]
    pub fn get_xer_so(&self) -> Expr {
        binop(Op::And8, self.get_slot(GuestSlot::XerSo), mk_u8(1))
    }

    #[inline]
    pub fn get_xer_ov(&self) -> Expr {
        binop(Op::And8, self.get_slot(GuestSlot::XerOv), mk_u8(1))
    }

    #[inline]
    pub fn get_xer_ca(&self) -> Expr {
        binop(Op::And8, self.get_slot(GuestSlot::XerCa), mk_u8(1))
    }

    /// XER byte count (string length field).
    #[inline]
    pub fn get_xer_bc(&self) -> Expr {
        binop(Op::And8, self.get_slot(GuestSlot::XerBc), mk_u8(0x7F))
    }

    /// XER.CA as I32 0/1.
    #[inline]
    pub fn get_xer_ca32(&self) -> Expr {
        unop(Op::Cast8Uto32, self.get_xer_ca())
    }

    /// Write XER.SO from an I8 (only bit 0 is used).
    #[inline]
    pub fn put_xer_so(&mut self, e: Expr) {
        self.put_slot(GuestSlot::XerSo, binop(Op::And8, e, mk_u8(1)));
    }

    #[inline]
    pub fn put_xer_ov(&mut self, e: Expr) {
        self.put_slot(GuestSlot::XerOv, binop(Op::And8, e, mk_u8(1)));
    }

    #[inline]
    pub fn put_xer_ca(&mut self, e: Expr) {
        self.put_slot(GuestSlot::XerCa, binop(Op::And8, e, mk_u8(1)));
    }

    #[inline]
    pub fn put_xer_bc(&mut self, e: Expr) {
        self.put_slot(GuestSlot::XerBc, binop(Op::And8, e, mk_u8(0x7F)));
    }

    // Special registers.

    /// Read a special register. Composites are assembled from their
    /// component bytes.
    pub fn get_gst(&self, reg: GuestReg) -> Expr {
        if let Some(slot) = reg.slot() {
            return self.get_slot(slot);
        }
        match reg {
            GuestReg::Xer => {
                let so: Expr = binop(Op::Shl32, unop(Op::Cast8Uto32, self.get_xer_so()), mk_u8(31));
                let ov: Expr = binop(Op::Shl32, unop(Op::Cast8Uto32, self.get_xer_ov()), mk_u8(30));
                let ca: Expr = binop(Op::Shl32, unop(Op::Cast8Uto32, self.get_xer_ca()), mk_u8(29));
                let bc: Expr = unop(Op::Cast8Uto32, self.get_xer_bc());
                binop(Op::Or32, binop(Op::Or32, so, ov), binop(Op::Or32, ca, bc))
            }
            GuestReg::Cr => {
                let mut acc: Expr = self.get_cr_field(0);
                acc = binop(Op::Shl32, acc, mk_u8(28));
                for f in 1..8u32 {
                    let field: Expr = binop(Op::Shl32, self.get_cr_field(f), mk_u8((28 - 4 * f) as u8));
                    acc = binop(Op::Or32, acc, field);
                }
                acc
            }
            GuestReg::Fpscr => {
                let rn: Expr = unop(Op::Cast8Uto64, binop(Op::And8, self.get_slot(GuestSlot::FpRound), mk_u8(3)));
                let c_fpcc: Expr = binop(
                    Op::Shl64,
                    unop(Op::Cast8Uto64, binop(Op::And8, self.get_slot(GuestSlot::CFpcc), mk_u8(0x1F))),
                    mk_u8(12),
                );
                let drn: Expr = binop(
                    Op::Shl64,
                    unop(Op::Cast8Uto64, binop(Op::And8, self.get_slot(GuestSlot::DfpRound), mk_u8(7))),
                    mk_u8(32),
                );
                binop(Op::Or64, binop(Op::Or64, rn, c_fpcc), drn)
            }
            _ => unreachable!(),
        }
    }

    /// Write a special register. The value type must match the register:
    /// the mode word for LR/CTR/TAR/CIA-like registers, I32 for XER and CR,
    /// I64 for FPSCR.
    pub fn put_gst(&mut self, reg: GuestReg, e: Expr) {
        match reg {
            GuestReg::Cr => self.put_gst_masked(reg, e, 0xFFFF_FFFF),
            GuestReg::Fpscr => self.put_gst_masked(reg, e, u64::MAX),
            GuestReg::Xer => {
                let v: Temp = self.tmp(e);
                self.put_xer_so(unop(Op::Cast32to8, binop(Op::Shr32, mkexpr(v), mk_u8(31))));
                self.put_xer_ov(unop(Op::Cast32to8, binop(Op::Shr32, mkexpr(v), mk_u8(30))));
                self.put_xer_ca(unop(Op::Cast32to8, binop(Op::Shr32, mkexpr(v), mk_u8(29))));
                self.put_xer_bc(unop(Op::Cast32to8, mkexpr(v)));
            }
            other => match other.slot() {
                Some(slot) => self.put_slot(slot, e),
                None => unreachable!(),
            },
        }
    }

    /// Write the bits of a composite register selected by `mask`.
    ///
    /// For CR the mask selects whole fields (any bit of a nibble selects
    /// the nibble). For FPSCR only the RN, C/FPCC and DRN fields are
    /// modelled; other mask bits are ignored.
    pub fn put_gst_masked(&mut self, reg: GuestReg, e: Expr, mask: u64) {
        match reg {
            GuestReg::Cr => {
                let v: Temp = self.tmp(e);
                for f in 0..8u32 {
                    let shift: u32 = 28 - 4 * f;
                    if (mask >> shift) & 0xF == 0 {
                        continue;
                    }
                    let nibble: Expr = binop(Op::Shr32, mkexpr(v), mk_u8(shift as u8));
                    self.put_cr_field(f, binop(Op::And32, nibble, mk_u32(0xF)));
                }
            }
            GuestReg::Fpscr => {
                let v: Temp = self.tmp(e);
                if mask & fpscr::RN != 0 {
                    self.put_slot(GuestSlot::FpRound, binop(Op::And8, unop(Op::Cast64to8, mkexpr(v)), mk_u8(3)));
                }
                if mask & fpscr::C_FPCC != 0 {
                    let c: Expr = unop(Op::Cast64to8, binop(Op::Shr64, mkexpr(v), mk_u8(12)));
                    self.put_slot(GuestSlot::CFpcc, binop(Op::And8, c, mk_u8(0x1F)));
                }
                if mask & fpscr::DRN != 0 {
                    let d: Expr = unop(Op::Cast64to8, binop(Op::Shr64, mkexpr(v), mk_u8(32)));
                    self.put_slot(GuestSlot::DfpRound, binop(Op::And8, d, mk_u8(7)));
                }
            }
            other => panic!("put_gst_masked: {:?} is not a composite register", other),
        }
    }

    /// Binary FP rounding mode in IR encoding (I32).
    pub fn get_round_mode(&self) -> Expr {
        let rm: Expr = binop(Op::And32, unop(Op::Cast8Uto32, self.get_slot(GuestSlot::FpRound)), mk_u32(3));
        rm_ppc_to_ir(rm)
    }

    /// Decimal FP rounding mode in IR encoding (I32).
    pub fn get_dfp_round_mode(&self) -> Expr {
        let rm: Expr = binop(Op::And32, unop(Op::Cast8Uto32, self.get_slot(GuestSlot::DfpRound)), mk_u32(7));
        rm_ppc_to_ir(rm)
    }

    // Memory.

    /// Load of type `ty` from `addr` in the recorded byte order.
    #[inline]
    pub fn load(&self, ty: IrType, addr: Expr) -> Expr {
        load(self.host_end, ty, addr)
    }

    #[inline]
    pub fn store(&mut self, addr: Expr, data: Expr) {
        self.ir.store(self.host_end, addr, data)
    }

    /// `(RA|0) + simm`.
    pub fn ea_ra_or0_simm(&self, ra: u32, simm: i64) -> Expr {
        let imm: Expr = self.mk_sz_imm(simm as u64);
        if ra == 0 {
            imm
        } else {
            binop(self.sz_op(SzOp::Add), self.get_ireg(ra), imm)
        }
    }

    /// `RA + simm` (update forms, where RA is never treated as zero).
    pub fn ea_ra_simm(&self, ra: u32, simm: i64) -> Expr {
        binop(self.sz_op(SzOp::Add), self.get_ireg(ra), self.mk_sz_imm(simm as u64))
    }

    /// `(RA|0) + RB`.
    pub fn ea_ra_or0_idx(&self, ra: u32, rb: u32) -> Expr {
        if ra == 0 {
            self.get_ireg(rb)
        } else {
            binop(self.sz_op(SzOp::Add), self.get_ireg(ra), self.get_ireg(rb))
        }
    }

    /// `RA + RB`.
    pub fn ea_ra_idx(&self, ra: u32, rb: u32) -> Expr {
        binop(self.sz_op(SzOp::Add), self.get_ireg(ra), self.get_ireg(rb))
    }

    /// `(RA|0)`.
    pub fn ea_ra_or0(&self, ra: u32) -> Expr {
        if ra == 0 {
            self.mk_sz_imm(0)
        } else {
            self.get_ireg(ra)
        }
    }

    /// Add a constant to a mode-sized address.
    #[inline]
    pub fn addr_plus(&self, addr: Expr, off: u64) -> Expr {
        if off == 0 {
            return addr;
        }
        binop(self.sz_op(SzOp::Add), addr, self.mk_sz_imm(off))
    }

    /// Addresses of the high and low doublewords of the quadword at `ea`,
    /// laid out in the same byte order as every other access.
    pub fn quad_halves(&self, ea: Temp) -> (Expr, Expr) {
        let ea8: Expr = self.addr_plus(mkexpr(ea), 8);
        match self.host_end {
            Endness::Big => (mkexpr(ea), ea8),
            Endness::Little => (ea8, mkexpr(ea)),
        }
    }

    // Control flow.

    /// Side exit to the constant `target` when `guard` (I1) holds.
    pub fn exit(&mut self, guard: Expr, jk: JumpKind, target: u64) {
        let dst: Const = self.mk_sz_const(self.mode_addr(target));
        let offs: u32 = self.offs_cia();
        self.ir.exit(guard, jk, dst, offs);
    }

    /// Leave the block with a SIGBUS at this instruction if `addr` (a
    /// mode-sized temporary) is not aligned to `align` bytes.
    pub fn sigbus_if_misaligned(&mut self, addr: Temp, align: u64) {
        debug_assert!(align.is_power_of_two());
        if align <= 1 {
            return;
        }
        let low: Expr = binop(self.sz_op(SzOp::And), mkexpr(addr), self.mk_sz_imm(align - 1));
        let guard: Expr = binop(self.sz_op(SzOp::CmpNE), low, self.mk_sz_imm(0));
        let cia: u64 = self.cia;
        self.exit(guard, JumpKind::SigBus, cia);
    }

    /// Write `CIA := target` and end the block with `jk`.
    pub fn jump_to(&mut self, target: Expr, jk: JumpKind) {
        self.put_gst(GuestReg::Cia, target);
        self.what_next = WhatNext::StopHere(jk);
    }

    /// End the block at the next instruction with `jk`.
    pub fn stop_at_nia(&mut self, jk: JumpKind) {
        let nia: Expr = self.mk_sz_imm(self.nia());
        self.jump_to(nia, jk);
    }

    /// Emit a red-zone hint: the area below the stack pointer becomes
    /// undefined as execution continues at `nia`.
    pub fn redzone_hint(&mut self, nia: Expr) {
        let sz: u32 = self.abi.redzone_size;
        if sz == 0 {
            return;
        }
        let base: Expr = binop(self.sz_op(SzOp::Sub), self.get_ireg(1), self.mk_sz_imm(sz as u64));
        self.ir.abi_hint(base, sz, nia);
    }
}

/// Convert an architectural rounding-mode field to IR encoding:
/// `rm_ir = rm ^ ((rm << 1) & 2)`.
fn rm_ppc_to_ir(rm: Expr) -> Expr {
    let shifted: Expr = binop(Op::And32, binop(Op::Shl32, rm.clone(), mk_u8(1)), mk_u32(2));
    binop(Op::Xor32, rm, shifted)
}

/// Lane decomposition of 128-bit vectors.
///
/// Lanes are returned most-significant first, so index 0 is the
/// architecturally first (big-endian numbered) element.
impl<'a> DecodeContext<'a> {
    /// Split into four I32 lanes.
    pub fn break_v128_to_4x32(&mut self, v: Expr) -> [Temp; 4] {
        let t: Temp = self.tmp(v);
        let hi: Temp = self.tmp(unop(Op::CastV128HIto64, mkexpr(t)));
        let lo: Temp = self.tmp(unop(Op::CastV128to64, mkexpr(t)));
        [
            self.tmp(unop(Op::Cast64HIto32, mkexpr(hi))),
            self.tmp(unop(Op::Cast64to32, mkexpr(hi))),
            self.tmp(unop(Op::Cast64HIto32, mkexpr(lo))),
            self.tmp(unop(Op::Cast64to32, mkexpr(lo))),
        ]
    }

    /// Split into four I32 lanes widened to I64, signed or unsigned.
    pub fn break_v128_to_4x64(&mut self, v: Expr, signed: bool) -> [Temp; 4] {
        let lanes: [Temp; 4] = self.break_v128_to_4x32(v);
        let op: Op = if signed { Op::Cast32Sto64 } else { Op::Cast32Uto64 };
        lanes.map(|l| self.tmp(unop(op, mkexpr(l))))
    }

    /// Split into two I64 lanes, high first.
    pub fn break_v128_to_2x64(&mut self, v: Expr) -> [Temp; 2] {
        let t: Temp = self.tmp(v);
        [self.tmp(unop(Op::CastV128HIto64, mkexpr(t))), self.tmp(unop(Op::CastV128to64, mkexpr(t)))]
    }
}

/// Assemble four I32 lanes, most significant first.
pub fn mk_v128_from_4x32(l: [Expr; 4]) -> Expr {
    let [a, b, c, d] = l;
    binop(
        Op::Cat64HLtoV128,
        binop(Op::Cat32HLto64, a, b),
        binop(Op::Cat32HLto64, c, d),
    )
}
