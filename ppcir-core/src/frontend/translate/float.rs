//! Binary floating point: loads and stores, arithmetic, compares,
//! conversions, sign manipulation and FPSCR moves.
//!
//! FPRs hold F64 values; single-precision loads widen on the way in and
//! single-precision arithmetic uses the `r32` operators, which round the
//! result to single precision while keeping it in double format.
//!
//! Only the FPSCR fields the IR models (RN, C/FPCC, DRN) are read or
//! written. Writes go through [`write_fpscr`], which merges the new bits
//! into the current register so partial field writes keep the bits
//! outside their mask.

use super::{dis, dot, invalid_if, reserved_zero, unknown, Translator};
use crate::frontend::context::{DecodeContext, GuestReg};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::flags::set_fp_cr1;
use crate::frontend::guest_state::GuestSlot;
use crate::frontend::ir::{
    binop, fcmp, ite, mk_f64i, mk_u1, mk_u32, mk_u64, mk_u8, mkexpr, qop, round, triop, unop,
    Expr, IrType, Op, Temp,
};

pub struct FloatingPoint;

impl Translator for FloatingPoint {
    fn name(&self) -> &'static str {
        "floating point"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match w.opc1() {
            48..=55 => d_form(ctx, w),
            57 | 61 => pair_ds(ctx, w),
            31 => x_form_mem(ctx, w),
            59 | 63 if w.xo5() >= 18 => arith(ctx, w),
            59 => single_from_int(ctx, w),
            63 => x_form(ctx, w),
            _ => unknown(w, "floating point"),
        }
    }
}

/// What a floating-point memory access moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FpData {
    Single,
    Double,
    /// Low word of the FPR bit pattern, sign- or zero-extended on load.
    Word { signed: bool },
}

#[derive(Debug, Clone, Copy)]
struct FpAccess {
    name: &'static str,
    data: FpData,
    store: bool,
    update: bool,
}

const fn fp(name: &'static str, data: FpData, store: bool, update: bool) -> FpAccess {
    FpAccess { name, data, store, update }
}

fn d_access(opc1: u32) -> Option<FpAccess> {
    use FpData::{Double, Single};
    Some(match opc1 {
        48 => fp("lfs", Single, false, false),
        49 => fp("lfsu", Single, false, true),
        50 => fp("lfd", Double, false, false),
        51 => fp("lfdu", Double, false, true),
        52 => fp("stfs", Single, true, false),
        53 => fp("stfsu", Single, true, true),
        54 => fp("stfd", Double, true, false),
        55 => fp("stfdu", Double, true, true),
        _ => return None,
    })
}

fn x_access(xo10: u32) -> Option<FpAccess> {
    use FpData::{Double, Single, Word};
    Some(match xo10 {
        535 => fp("lfsx", Single, false, false),
        567 => fp("lfsux", Single, false, true),
        599 => fp("lfdx", Double, false, false),
        631 => fp("lfdux", Double, false, true),
        855 => fp("lfiwax", Word { signed: true }, false, false),
        887 => fp("lfiwzx", Word { signed: false }, false, false),
        663 => fp("stfsx", Single, true, false),
        695 => fp("stfsux", Single, true, true),
        727 => fp("stfdx", Double, true, false),
        759 => fp("stfdux", Double, true, true),
        983 => fp("stfiwx", Word { signed: false }, true, false),
        _ => return None,
    })
}

fn d_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let Some(a) = d_access(w.opc1()) else {
        return unknown(w, "FP D-form load/store");
    };
    let (fr, ra) = (w.rd(), w.ra());
    let simm: i64 = w.simm16() as i64;
    dis!("{} fr{},{}(r{})", a.name, fr, simm, ra);
    invalid_if(w, a.update && ra == 0, "FP update form with rA = 0")?;
    let ea: Expr = if a.update { ctx.ea_ra_simm(ra, simm) } else { ctx.ea_ra_or0_simm(ra, simm) };
    transfer(ctx, a, ea, fr, ra);
    Ok(())
}

fn x_form_mem(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "FP X-form load/store bit 31")?;
    match w.xo10() {
        791 => return pair(ctx, w, false, true),
        919 => return pair(ctx, w, true, true),
        _ => {}
    }
    let Some(a) = x_access(w.xo10()) else {
        return unknown(w, "FP X-form load/store");
    };
    let (fr, ra, rb) = (w.rd(), w.ra(), w.rb());
    dis!("{} fr{},r{},r{}", a.name, fr, ra, rb);
    invalid_if(w, a.update && ra == 0, "FP update form with rA = 0")?;
    let ea: Expr = if a.update { ctx.ea_ra_idx(ra, rb) } else { ctx.ea_ra_or0_idx(ra, rb) };
    transfer(ctx, a, ea, fr, ra);
    Ok(())
}

fn transfer(ctx: &mut DecodeContext<'_>, a: FpAccess, ea: Expr, fr: u32, ra: u32) {
    let ea: Temp = ctx.tmp(ea);
    if a.store {
        let data: Expr = match a.data {
            FpData::Single => binop(Op::F64toF32, ctx.get_round_mode(), ctx.get_freg(fr)),
            FpData::Double => ctx.get_freg(fr),
            FpData::Word { .. } => unop(Op::Cast64to32, ctx.get_freg_bits(fr)),
        };
        ctx.store(mkexpr(ea), data);
    } else {
        match a.data {
            FpData::Single => {
                let v: Expr = unop(Op::F32toF64, ctx.load(IrType::F32, mkexpr(ea)));
                ctx.put_freg(fr, v);
            }
            FpData::Double => {
                let v: Expr = ctx.load(IrType::F64, mkexpr(ea));
                ctx.put_freg(fr, v);
            }
            FpData::Word { signed } => {
                let op: Op = if signed { Op::Cast32Sto64 } else { Op::Cast32Uto64 };
                let v: Expr = unop(op, ctx.load(IrType::I32, mkexpr(ea)));
                ctx.put_freg_bits(fr, v);
            }
        }
    }
    if a.update {
        ctx.put_ireg(ra, mkexpr(ea));
    }
}

/// lfdp/stfdp (DS-form, primary 57/61).
fn pair_ds(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    if w.xo2() != 0 {
        return unknown(w, "FP pair DS-form");
    }
    pair(ctx, w, w.opc1() == 61, false)
}

/// Load or store an even/odd FPR pair as two consecutive doublewords.
fn pair(ctx: &mut DecodeContext<'_>, w: InsnWord, store: bool, indexed: bool) -> TranslateResult {
    let (fr, ra) = (w.rd(), w.ra());
    invalid_if(w, fr % 2 != 0, "odd FPR pair")?;
    let name: &str = match (store, indexed) {
        (false, false) => "lfdp",
        (true, false) => "stfdp",
        (false, true) => "lfdpx",
        (true, true) => "stfdpx",
    };
    let ea: Expr = if indexed {
        dis!("{} fr{},r{},r{}", name, fr, ra, w.rb());
        ctx.ea_ra_or0_idx(ra, w.rb())
    } else {
        dis!("{} fr{},{}(r{})", name, fr, w.ds(), ra);
        ctx.ea_ra_or0_simm(ra, w.ds() as i64)
    };
    let ea: Temp = ctx.tmp(ea);
    let ea_lo: Expr = ctx.addr_plus(mkexpr(ea), 8);
    let ea_lo: Temp = ctx.tmp(ea_lo);
    if store {
        let hi: Expr = ctx.get_freg(fr);
        let lo: Expr = ctx.get_freg(fr + 1);
        ctx.store(mkexpr(ea), hi);
        ctx.store(mkexpr(ea_lo), lo);
    } else {
        let hi: Expr = ctx.load(IrType::F64, mkexpr(ea));
        let lo: Expr = ctx.load(IrType::F64, mkexpr(ea_lo));
        ctx.put_freg(fr, hi);
        ctx.put_freg(fr + 1, lo);
    }
    Ok(())
}

/// A-form arithmetic under primary 59 (single) and 63 (double).
fn arith(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let single: bool = w.opc1() == 59;
    let (frd, fra, frb, frc) = (w.rd(), w.ra(), w.rb(), w.rc_field());
    let s: &str = if single { "s" } else { "" };
    let rc: bool = w.rc();
    let rm: Temp = ctx.tmp(ctx.get_round_mode());
    let pick = |dbl: Op, sgl: Op| if single { sgl } else { dbl };

    let res: Expr = match w.xo5() {
        18 | 20 | 21 => {
            reserved_zero(w, frc, "FRC of fadd/fsub/fdiv")?;
            let (name, op) = match w.xo5() {
                18 => ("fdiv", pick(Op::DivF64, Op::DivF64r32)),
                20 => ("fsub", pick(Op::SubF64, Op::SubF64r32)),
                _ => ("fadd", pick(Op::AddF64, Op::AddF64r32)),
            };
            dis!("{}{}{} fr{},fr{},fr{}", name, s, dot(rc), frd, fra, frb);
            triop(op, mkexpr(rm), ctx.get_freg(fra), ctx.get_freg(frb))
        }
        22 => {
            reserved_zero(w, fra | frc, "FRA/FRC of fsqrt")?;
            dis!("fsqrt{}{} fr{},fr{}", s, dot(rc), frd, frb);
            let r: Expr = binop(Op::SqrtF64, mkexpr(rm), ctx.get_freg(frb));
            round_if_single(single, rm, r)
        }
        23 if !single => {
            dis!("fsel{} fr{},fr{},fr{},fr{}", dot(rc), frd, fra, frc, frb);
            let cc: Temp = ctx.tmp(binop(Op::CmpF64, ctx.get_freg(fra), mk_f64i(0)));
            let ge: Expr = binop(
                Op::Or1,
                binop(Op::CmpEQ32, mkexpr(cc), mk_u32(fcmp::GT)),
                binop(Op::CmpEQ32, mkexpr(cc), mk_u32(fcmp::EQ)),
            );
            ite(ge, ctx.get_freg(frc), ctx.get_freg(frb))
        }
        24 => {
            reserved_zero(w, fra | frc, "FRA/FRC of fre")?;
            dis!("fre{}{} fr{},fr{}", s, dot(rc), frd, frb);
            round_if_single(single, rm, unop(Op::RecipEstF64, ctx.get_freg(frb)))
        }
        25 => {
            reserved_zero(w, frb, "FRB of fmul")?;
            dis!("fmul{}{} fr{},fr{},fr{}", s, dot(rc), frd, fra, frc);
            let op: Op = pick(Op::MulF64, Op::MulF64r32);
            triop(op, mkexpr(rm), ctx.get_freg(fra), ctx.get_freg(frc))
        }
        26 => {
            reserved_zero(w, fra | frc, "FRA/FRC of frsqrte")?;
            dis!("frsqrte{}{} fr{},fr{}", s, dot(rc), frd, frb);
            round_if_single(single, rm, unop(Op::RSqrtEstF64, ctx.get_freg(frb)))
        }
        xo @ 28..=31 => {
            let (name, sub, neg) = match xo {
                28 => ("fmsub", true, false),
                29 => ("fmadd", false, false),
                30 => ("fnmsub", true, true),
                _ => ("fnmadd", false, true),
            };
            dis!("{}{}{} fr{},fr{},fr{},fr{}", name, s, dot(rc), frd, fra, frc, frb);
            let op: Op = match (sub, single) {
                (false, false) => Op::MAddF64,
                (false, true) => Op::MAddF64r32,
                (true, false) => Op::MSubF64,
                (true, true) => Op::MSubF64r32,
            };
            let r: Expr = qop(op, mkexpr(rm), ctx.get_freg(fra), ctx.get_freg(frc), ctx.get_freg(frb));
            if neg {
                unop(Op::NegF64, r)
            } else {
                r
            }
        }
        _ => return unknown(w, "FP A-form"),
    };
    ctx.put_freg(frd, res);
    if rc {
        set_fp_cr1(ctx);
    }
    Ok(())
}

fn round_if_single(single: bool, rm: Temp, e: Expr) -> Expr {
    if single {
        binop(Op::RoundF64toF32, mkexpr(rm), e)
    } else {
        e
    }
}

/// fcfids/fcfidus under primary 59.
fn single_from_int(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (frd, frb) = (w.rd(), w.rb());
    reserved_zero(w, w.ra(), "FRA of fcfid[u]s")?;
    let (name, op) = match w.xo10() {
        846 => ("fcfids", Op::I64StoF32),
        974 => ("fcfidus", Op::I64UtoF32),
        _ => return unknown(w, "FP single X-form"),
    };
    dis!("{}{} fr{},fr{}", name, dot(w.rc()), frd, frb);
    let r: Expr = binop(op, ctx.get_round_mode(), ctx.get_freg_bits(frb));
    ctx.put_freg(frd, unop(Op::F32toF64, r));
    if w.rc() {
        set_fp_cr1(ctx);
    }
    Ok(())
}

/// X-form operations under primary 63.
fn x_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    match w.xo10() {
        0 | 32 => compare(ctx, w),
        128 | 160 => test(ctx, w),
        64 | 70 | 38 | 134 | 583 | 711 => fpscr_move(ctx, w),
        _ => unary(ctx, w),
    }
}

/// fcmpu/fcmpo.
fn compare(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.field(9, 2) | w.rc() as u32, "fcmp reserved bits")?;
    let (crfd, fra, frb) = (w.crfd(), w.ra(), w.rb());
    let name: &str = if w.xo10() == 0 { "fcmpu" } else { "fcmpo" };
    dis!("{} cr{},fr{},fr{}", name, crfd, fra, frb);
    let cc_ir: Temp = ctx.tmp(binop(Op::CmpF64, ctx.get_freg(fra), ctx.get_freg(frb)));
    put_compare_result(ctx, crfd, cc_ir);
    Ok(())
}

/// Remap an IR compare result (`fcmp` encoding) to the architectural
/// LT/GT/EQ/UN nibble and write it to CR field `crfd` and to FPCC.
pub(super) fn put_compare_result(ctx: &mut DecodeContext<'_>, crfd: u32, cc_ir: Temp) {
    // shift = (~(ir >> 5) & 2) | ((ir ^ (ir >> 6)) & 1)
    let hi: Expr = binop(
        Op::And32,
        unop(Op::Not32, binop(Op::Shr32, mkexpr(cc_ir), mk_u8(5))),
        mk_u32(2),
    );
    let lo: Expr = binop(
        Op::And32,
        binop(Op::Xor32, mkexpr(cc_ir), binop(Op::Shr32, mkexpr(cc_ir), mk_u8(6))),
        mk_u32(1),
    );
    let shift: Expr = unop(Op::Cast32to8, binop(Op::Or32, hi, lo));
    let cc: Temp = ctx.tmp(binop(Op::Shl32, mk_u32(1), shift));
    put_cr_and_fpcc(ctx, crfd, cc);
}

/// CR field `crfd` and FPCC := the I32 nibble `cc`.
pub(super) fn put_cr_and_fpcc(ctx: &mut DecodeContext<'_>, crfd: u32, cc: Temp) {
    ctx.put_cr_field(crfd, mkexpr(cc));
    let c: Expr = binop(Op::And8, ctx.get_slot(GuestSlot::CFpcc), mk_u8(0x10));
    ctx.put_slot(GuestSlot::CFpcc, binop(Op::Or8, c, unop(Op::Cast32to8, mkexpr(cc))));
}

/// Bit-pattern class tests on an I64 double.
struct FpClass {
    bits: Temp,
}

impl FpClass {
    fn new(ctx: &mut DecodeContext<'_>, fr: u32) -> Self {
        FpClass { bits: ctx.tmp(ctx.get_freg_bits(fr)) }
    }

    fn exp(&self) -> Expr {
        binop(Op::And64, binop(Op::Shr64, mkexpr(self.bits), mk_u8(52)), mk_u64(0x7FF))
    }

    fn magnitude(&self) -> Expr {
        binop(Op::And64, mkexpr(self.bits), mk_u64(0x7FFF_FFFF_FFFF_FFFF))
    }

    /// Infinity or NaN.
    fn non_finite(&self) -> Expr {
        binop(Op::CmpEQ64, self.exp(), mk_u64(0x7FF))
    }

    fn infinite(&self) -> Expr {
        binop(Op::CmpEQ64, self.magnitude(), mk_u64(0x7FF0_0000_0000_0000))
    }

    fn zero(&self) -> Expr {
        binop(Op::CmpEQ64, self.magnitude(), mk_u64(0))
    }

    fn denormal(&self) -> Expr {
        binop(
            Op::And1,
            binop(Op::CmpEQ64, self.exp(), mk_u64(0)),
            binop(Op::CmpNE64, self.magnitude(), mk_u64(0)),
        )
    }

    fn negative(&self) -> Expr {
        binop(Op::CmpLT64S, mkexpr(self.bits), mk_u64(0))
    }
}

fn any(terms: impl IntoIterator<Item = Expr>) -> Expr {
    terms.into_iter().reduce(|a, b| binop(Op::Or1, a, b)).unwrap_or_else(|| mk_u1(false))
}

/// ftdiv/ftsqrt: CR field := 0b1000 | fg << 2 | fe << 1.
///
/// The exponent-range conditions of the full test are not modelled; fe
/// and fg cover the special-value and zero/denormal cases.
fn test(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.field(9, 2) | w.rc() as u32, "ftdiv/ftsqrt reserved bits")?;
    let (crfd, fra, frb) = (w.crfd(), w.ra(), w.rb());
    let b: FpClass = FpClass::new(ctx, frb);
    let (fe, fg) = if w.xo10() == 128 {
        dis!("ftdiv cr{},fr{},fr{}", crfd, fra, frb);
        let a: FpClass = FpClass::new(ctx, fra);
        (
            any([a.non_finite(), b.non_finite(), b.zero()]),
            any([a.infinite(), b.infinite(), b.zero(), b.denormal()]),
        )
    } else {
        reserved_zero(w, fra, "FRA of ftsqrt")?;
        dis!("ftsqrt cr{},fr{}", crfd, frb);
        (
            any([b.non_finite(), b.zero(), b.negative()]),
            any([b.infinite(), b.zero(), b.denormal()]),
        )
    };
    let fe: Expr = binop(Op::Shl32, unop(Op::Cast1Uto32, fe), mk_u8(1));
    let fg: Expr = binop(Op::Shl32, unop(Op::Cast1Uto32, fg), mk_u8(2));
    let field: Expr = binop(Op::Or32, mk_u32(8), binop(Op::Or32, fg, fe));
    ctx.put_cr_field(crfd, field);
    Ok(())
}

/// Unary X-form: rounding, conversions, moves and sign operations.
fn unary(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (frd, fra, frb) = (w.rd(), w.ra(), w.rb());
    let rc: bool = w.rc();
    let xo: u32 = w.xo10();
    if xo != 8 {
        reserved_zero(w, fra, "FRA of unary FP op")?;
    }
    let b: Expr = ctx.get_freg(frb);
    let res: Expr = match xo {
        12 => {
            dis!("frsp{} fr{},fr{}", dot(rc), frd, frb);
            binop(Op::RoundF64toF32, ctx.get_round_mode(), b)
        }
        14 | 15 | 142 | 143 => {
            let toward_zero: bool = xo & 1 == 1;
            let unsigned: bool = xo >= 142;
            dis!(
                "fctiw{}{}{} fr{},fr{}",
                if unsigned { "u" } else { "" },
                if toward_zero { "z" } else { "" },
                dot(rc),
                frd,
                frb
            );
            let rm: Expr = if toward_zero { mk_u32(round::ZERO) } else { ctx.get_round_mode() };
            let op: Op = if unsigned { Op::F64toI32U } else { Op::F64toI32S };
            let r: Expr = unop(Op::Cast32Uto64, binop(op, rm, b));
            unop(Op::ReinterpI64asF64, r)
        }
        814 | 815 | 942 | 943 => {
            let toward_zero: bool = xo & 1 == 1;
            let unsigned: bool = xo >= 942;
            dis!(
                "fctid{}{}{} fr{},fr{}",
                if unsigned { "u" } else { "" },
                if toward_zero { "z" } else { "" },
                dot(rc),
                frd,
                frb
            );
            let rm: Expr = if toward_zero { mk_u32(round::ZERO) } else { ctx.get_round_mode() };
            let op: Op = if unsigned { Op::F64toI64U } else { Op::F64toI64S };
            unop(Op::ReinterpI64asF64, binop(op, rm, b))
        }
        846 | 974 => {
            let unsigned: bool = xo == 974;
            dis!("fcfid{}{} fr{},fr{}", if unsigned { "u" } else { "" }, dot(rc), frd, frb);
            let op: Op = if unsigned { Op::I64UtoF64 } else { Op::I64StoF64 };
            binop(op, ctx.get_round_mode(), ctx.get_freg_bits(frb))
        }
        392 | 424 | 456 | 488 => {
            let (name, mode) = match xo {
                392 => ("frin", round::NEAREST_EVEN),
                424 => ("friz", round::ZERO),
                456 => ("frip", round::POS_INF),
                _ => ("frim", round::NEG_INF),
            };
            dis!("{}{} fr{},fr{}", name, dot(rc), frd, frb);
            binop(Op::RoundF64toInt, mk_u32(mode), b)
        }
        72 => {
            dis!("fmr{} fr{},fr{}", dot(rc), frd, frb);
            b
        }
        40 => {
            dis!("fneg{} fr{},fr{}", dot(rc), frd, frb);
            unop(Op::NegF64, b)
        }
        264 => {
            dis!("fabs{} fr{},fr{}", dot(rc), frd, frb);
            unop(Op::AbsF64, b)
        }
        136 => {
            dis!("fnabs{} fr{},fr{}", dot(rc), frd, frb);
            unop(Op::NegF64, unop(Op::AbsF64, b))
        }
        8 => {
            dis!("fcpsgn{} fr{},fr{},fr{}", dot(rc), frd, fra, frb);
            const SIGN: u64 = 1 << 63;
            let sign: Expr = binop(Op::And64, ctx.get_freg_bits(fra), mk_u64(SIGN));
            let mag: Expr = binop(Op::And64, ctx.get_freg_bits(frb), mk_u64(!SIGN));
            unop(Op::ReinterpI64asF64, binop(Op::Or64, sign, mag))
        }
        _ => return unknown(w, "FP X-form"),
    };
    ctx.put_freg(frd, res);
    if rc {
        set_fp_cr1(ctx);
    }
    Ok(())
}

/// Merge `val` into the FPSCR under `mask`, leaving other bits as they
/// were.
fn write_fpscr(ctx: &mut DecodeContext<'_>, val: Expr, mask: u64) {
    let old: Expr = binop(Op::And64, ctx.get_gst(GuestReg::Fpscr), mk_u64(!mask));
    let new: Expr = binop(Op::Or64, old, binop(Op::And64, val, mk_u64(mask)));
    ctx.put_gst_masked(GuestReg::Fpscr, new, mask);
}

/// Mask of FPSCR nibble `field` (0 = most significant of the low word),
/// in the upper word when `upper` is set.
const fn nibble_mask(field: u32, upper: bool) -> u64 {
    let shift: u32 = 4 * (7 - field) + if upper { 32 } else { 0 };
    0xF << shift
}

fn fpscr_move(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let rc: bool = w.rc();
    match w.xo10() {
        583 => {
            reserved_zero(w, w.ra() | w.rb(), "mffs reserved fields")?;
            dis!("mffs{} fr{}", dot(rc), w.rd());
            let v: Expr = ctx.get_gst(GuestReg::Fpscr);
            ctx.put_freg_bits(w.rd(), v);
        }
        711 => {
            let (l, fm, wide, frb) = (w.field(6, 1) == 1, w.fm(), w.field(15, 1) == 1, w.rb());
            dis!("mtfsf{} {},fr{},{},{}", dot(rc), fm, frb, l as u32, wide as u32);
            let mask: u64 = if l {
                u64::MAX
            } else {
                (0..8u32)
                    .filter(|i| fm & (0x80 >> i) != 0)
                    .fold(0u64, |m, i| m | nibble_mask(i, wide))
            };
            let v: Expr = ctx.get_freg_bits(frb);
            write_fpscr(ctx, v, mask);
        }
        134 => {
            reserved_zero(w, w.field(9, 6) | w.field(20, 1), "mtfsfi reserved bits")?;
            let (bf, wide, u) = (w.crfd(), w.field(15, 1) == 1, w.field(16, 4));
            dis!("mtfsfi{} {},{},{}", dot(rc), bf, u, wide as u32);
            let mask: u64 = nibble_mask(bf, wide);
            let val: u64 = (u as u64) << mask.trailing_zeros();
            write_fpscr(ctx, mk_u64(val), mask);
        }
        38 | 70 => {
            reserved_zero(w, w.ra() | w.rb(), "mtfsb reserved fields")?;
            let bt: u32 = w.rd();
            let set: bool = w.xo10() == 38;
            dis!("mtfsb{}{} {}", set as u32, dot(rc), bt);
            let mask: u64 = 1 << (31 - bt);
            write_fpscr(ctx, mk_u64(if set { mask } else { 0 }), mask);
        }
        64 => {
            reserved_zero(w, w.field(9, 2) | w.field(14, 2) | w.rb() | rc as u32, "mcrfs reserved bits")?;
            let (crfd, crfs) = (w.crfd(), w.crfs());
            dis!("mcrfs cr{},cr{}", crfd, crfs);
            let shift: u8 = (4 * (7 - crfs)) as u8;
            let nibble: Expr =
                unop(Op::Cast64to32, binop(Op::Shr64, ctx.get_gst(GuestReg::Fpscr), mk_u8(shift)));
            ctx.put_cr_field(crfd, binop(Op::And32, nibble, mk_u32(0xF)));
            return Ok(());
        }
        _ => return unknown(w, "FPSCR move"),
    }
    if rc {
        set_fp_cr1(ctx);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibble_mask() {
        assert_eq!(nibble_mask(7, false), 0xF);
        assert_eq!(nibble_mask(0, false), 0xF000_0000);
        assert_eq!(nibble_mask(7, true), 0xF_0000_0000);
    }

    #[test]
    fn test_access_tables() {
        let a: FpAccess = d_access(49).unwrap();
        assert_eq!(a.data, FpData::Single);
        assert!(a.update && !a.store);
        let x: FpAccess = x_access(983).unwrap();
        assert!(x.store);
        assert_eq!(x.data, FpData::Word { signed: false });
        assert!(x_access(1).is_none());
    }
}
