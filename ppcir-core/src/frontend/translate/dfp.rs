//! Decimal floating point.
//!
//! Primary opcode 59 holds the decimal64 forms and 63 the decimal128
//! (`q`) forms. Decimal128 operands occupy an even/odd FPR pair with the
//! high half in the even register; an odd register number for a pair is
//! an invalid form. Values move between FPRs and the IR as raw bit
//! patterns reinterpreted to `D64`.
//!
//! Z22-form (shift, data class/group tests) and Z23-form (quantize,
//! round to integer) share the primary opcodes with the X-forms and are
//! told apart by their extended-opcode width.

use super::float::{put_compare_result, put_cr_and_fpcc};
use super::{dis, dot, invalid_if, reserved_zero, unknown, Translator};
use crate::frontend::bits::extend_s;
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::flags::set_fp_cr1;
use crate::frontend::helpers::{callee, Helper};
use crate::frontend::ir::{
    binop, ccall, ite, mk_u32, mk_u64, mk_u8, mkexpr, round, triop, unop, Expr, IrType, Op, Temp,
};

pub struct DecimalFloat;

impl Translator for DecimalFloat {
    fn name(&self) -> &'static str {
        "decimal floating point"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match (w.opc1(), w.xo5()) {
            (59 | 63, 3) => z23_form(ctx, w),
            (59 | 63, 2) if matches!(w.xo9(), 66 | 98 | 194 | 226) => z22_form(ctx, w),
            (59 | 63, 2) => x_form(ctx, w),
            _ => unknown(w, "decimal floating point"),
        }
    }
}

/// Biased exponent of 1E0 and its DPD encodings.
const BIAS64: i64 = 398;
const BIAS128: i64 = 6176;
const ONE64: u64 = 0x2238_0000_0000_0001;
const ONE128_HI: u64 = 0x2208_0000_0000_0000;

fn get_d64(ctx: &DecodeContext<'_>, fr: u32) -> Expr {
    unop(Op::ReinterpI64asD64, ctx.get_freg_bits(fr))
}

fn put_d64(ctx: &mut DecodeContext<'_>, fr: u32, e: Expr) {
    ctx.put_freg_bits(fr, unop(Op::ReinterpD64asI64, e));
}

fn get_d128(ctx: &DecodeContext<'_>, fr: u32) -> Expr {
    binop(Op::D64HLtoD128, get_d64(ctx, fr), get_d64(ctx, fr + 1))
}

fn put_d128(ctx: &mut DecodeContext<'_>, fr: u32, e: Expr) {
    let t: Temp = ctx.tmp(e);
    put_d64(ctx, fr, unop(Op::D128HItoD64, mkexpr(t)));
    put_d64(ctx, fr + 1, unop(Op::D128LOtoD64, mkexpr(t)));
}

fn get_dec(ctx: &DecodeContext<'_>, quad: bool, fr: u32) -> Expr {
    if quad {
        get_d128(ctx, fr)
    } else {
        get_d64(ctx, fr)
    }
}

fn put_dec(ctx: &mut DecodeContext<'_>, quad: bool, fr: u32, e: Expr) {
    if quad {
        put_d128(ctx, fr, e)
    } else {
        put_d64(ctx, fr, e)
    }
}

/// Pair operands must name an even register.
fn even_pairs(w: InsnWord, quad: bool, regs: &[u32]) -> TranslateResult {
    invalid_if(w, quad && regs.iter().any(|r| r % 2 != 0), "odd FPR pair")
}

fn x_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let quad: bool = w.opc1() == 63;
    let q: &str = if quad { "q" } else { "" };
    let (frt, fra, frb) = (w.rd(), w.ra(), w.rb());
    let rc: bool = w.rc();

    match w.xo10() {
        xo @ (2 | 34 | 514 | 546) => {
            even_pairs(w, quad, &[frt, fra, frb])?;
            let (name, op) = match (xo, quad) {
                (2, false) => ("dadd", Op::AddD64),
                (2, true) => ("dadd", Op::AddD128),
                (514, false) => ("dsub", Op::SubD64),
                (514, true) => ("dsub", Op::SubD128),
                (34, false) => ("dmul", Op::MulD64),
                (34, true) => ("dmul", Op::MulD128),
                (_, false) => ("ddiv", Op::DivD64),
                (_, true) => ("ddiv", Op::DivD128),
            };
            dis!("{}{}{} fr{},fr{},fr{}", name, q, dot(rc), frt, fra, frb);
            let r: Expr = triop(op, ctx.get_dfp_round_mode(), get_dec(ctx, quad, fra), get_dec(ctx, quad, frb));
            put_dec(ctx, quad, frt, r);
        }
        xo @ (130 | 642 | 162) => {
            reserved_zero(w, w.field(9, 2) | rc as u32, "decimal compare reserved bits")?;
            even_pairs(w, quad, &[fra, frb])?;
            let crfd: u32 = w.crfd();
            let (name, op) = match (xo, quad) {
                (130, false) => ("dcmpo", Op::CmpD64),
                (130, true) => ("dcmpo", Op::CmpD128),
                (642, false) => ("dcmpu", Op::CmpD64),
                (642, true) => ("dcmpu", Op::CmpD128),
                (_, false) => ("dtstex", Op::CmpExpD64),
                (_, true) => ("dtstex", Op::CmpExpD128),
            };
            dis!("{}{} cr{},fr{},fr{}", name, q, crfd, fra, frb);
            let cc: Temp = ctx.tmp(binop(op, get_dec(ctx, quad, fra), get_dec(ctx, quad, frb)));
            put_compare_result(ctx, crfd, cc);
            return Ok(());
        }
        674 => return test_significance(ctx, w, quad),
        258 if quad => {
            even_pairs(w, quad, &[frt])?;
            dis!("dctqpq{} fr{},fr{}", dot(rc), frt, frb);
            let r: Expr = unop(Op::D64toD128, get_d64(ctx, frb));
            put_d128(ctx, frt, r);
        }
        258 => {
            dis!("dctdp{} fr{},fr{}", dot(rc), frt, frb);
            let r: Expr = unop(Op::D32toD64, unop(Op::Cast64to32, ctx.get_freg_bits(frb)));
            put_d64(ctx, frt, r);
        }
        770 if quad => {
            even_pairs(w, quad, &[frt, frb])?;
            dis!("drdpq{} fr{},fr{}", dot(rc), frt, frb);
            let narrowed: Expr = binop(Op::D128toD64, ctx.get_dfp_round_mode(), get_d128(ctx, frb));
            put_d128(ctx, frt, unop(Op::D64toD128, narrowed));
        }
        770 => {
            dis!("drsp{} fr{},fr{}", dot(rc), frt, frb);
            let r: Expr = binop(Op::D64toD32, ctx.get_dfp_round_mode(), get_d64(ctx, frb));
            ctx.put_freg_bits(frt, unop(Op::Cast32Uto64, r));
        }
        802 => {
            even_pairs(w, quad, &[frt])?;
            dis!("dcffix{}{} fr{},fr{}", q, dot(rc), frt, frb);
            let bits: Expr = ctx.get_freg_bits(frb);
            if quad {
                put_d128(ctx, frt, unop(Op::I64StoD128, bits));
            } else {
                let r: Expr = binop(Op::I64StoD64, ctx.get_dfp_round_mode(), bits);
                put_d64(ctx, frt, r);
            }
        }
        290 => {
            even_pairs(w, quad, &[frb])?;
            dis!("dctfix{}{} fr{},fr{}", q, dot(rc), frt, frb);
            let op: Op = if quad { Op::D128toI64S } else { Op::D64toI64S };
            let r: Expr = binop(op, ctx.get_dfp_round_mode(), get_dec(ctx, quad, frb));
            ctx.put_freg_bits(frt, r);
        }
        354 => {
            even_pairs(w, quad, &[frb])?;
            dis!("dxex{}{} fr{},fr{}", q, dot(rc), frt, frb);
            let op: Op = if quad { Op::ExtractExpD128 } else { Op::ExtractExpD64 };
            let r: Expr = unop(op, get_dec(ctx, quad, frb));
            ctx.put_freg_bits(frt, r);
        }
        866 => {
            even_pairs(w, quad, &[frt, frb])?;
            dis!("diex{}{} fr{},fr{},fr{}", q, dot(rc), frt, fra, frb);
            let op: Op = if quad { Op::InsertExpD128 } else { Op::InsertExpD64 };
            let r: Expr = binop(op, ctx.get_freg_bits(fra), get_dec(ctx, quad, frb));
            put_dec(ctx, quad, frt, r);
        }
        322 if !quad => decode_dpd(ctx, w)?,
        834 if !quad => encode_bcd(ctx, w)?,
        _ => return unknown(w, "decimal X-form"),
    }
    if rc {
        set_fp_cr1(ctx);
    }
    Ok(())
}

/// dtstsf: compare the reference significance in FRA[58:63] with the
/// number of significant digits of FRB. Infinities and NaNs compare
/// unordered.
fn test_significance(ctx: &mut DecodeContext<'_>, w: InsnWord, quad: bool) -> TranslateResult {
    reserved_zero(w, w.field(9, 2) | w.rc() as u32, "dtstsf reserved bits")?;
    let (crfd, fra, frb) = (w.crfd(), w.ra(), w.rb());
    even_pairs(w, quad, &[frb])?;
    let q: &str = if quad { "q" } else { "" };
    dis!("dtstsf{} cr{},fr{},fr{}", q, crfd, fra, frb);
    let k: Expr = binop(Op::And32, unop(Op::Cast64to32, ctx.get_freg_bits(fra)), mk_u32(0x3F));
    let sig_op: Op = if quad { Op::ExtractSigD128 } else { Op::ExtractSigD64 };
    let nsd: Expr = unop(Op::Cast64to32, unop(sig_op, get_dec(ctx, quad, frb)));
    let combo: Expr = binop(Op::And64, binop(Op::Shr64, ctx.get_freg_bits(frb), mk_u8(58)), mk_u64(0x1F));
    let special: Expr = binop(Op::CmpLE64U, mk_u64(0x1E), combo);
    let cc: Temp = ctx.tmp(ite(special, mk_u32(1), binop(Op::CmpORD32U, k, nsd)));
    put_cr_and_fpcc(ctx, crfd, cc);
    Ok(())
}

/// Leftmost coefficient digit from the combination field of a decimal64
/// bit pattern.
fn leftmost_digit(ctx: &mut DecodeContext<'_>, bits: Temp) -> Temp {
    let combo: Temp = ctx.tmp(binop(Op::And64, binop(Op::Shr64, mkexpr(bits), mk_u8(58)), mk_u64(0x1F)));
    let large: Expr = binop(Op::CmpEQ64, binop(Op::Shr64, mkexpr(combo), mk_u8(3)), mk_u64(3));
    let digit: Expr = ite(
        large,
        binop(Op::Or64, mk_u64(8), binop(Op::And64, mkexpr(combo), mk_u64(1))),
        binop(Op::And64, mkexpr(combo), mk_u64(7)),
    );
    ctx.tmp(digit)
}

/// ddedpd: decimal64 coefficient to BCD. SP=0/1 yields sixteen unsigned
/// digits; SP=2/3 yields fifteen digits and a sign code (0xC or 0xF for
/// plus, 0xD for minus).
fn decode_dpd(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (frt, frb, sp) = (w.rd(), w.rb(), w.field(11, 2));
    reserved_zero(w, w.field(13, 3), "ddedpd reserved bits")?;
    dis!("ddedpd{} {},fr{},fr{}", dot(w.rc()), sp, frt, frb);
    let bits: Temp = ctx.tmp(ctx.get_freg_bits(frb));
    let declets: Expr = binop(Op::And64, mkexpr(bits), mk_u64((1 << 50) - 1));
    let bcd: Temp = ctx.tmp(ccall(callee(Helper::DpdToBcd, ctx.abi), IrType::I64, [declets]));
    let r: Expr = if sp < 2 {
        let lmd: Temp = leftmost_digit(ctx, bits);
        binop(Op::Or64, binop(Op::Shl64, mkexpr(lmd), mk_u8(60)), mkexpr(bcd))
    } else {
        let plus: u64 = if sp == 2 { 0xC } else { 0xF };
        let negative: Expr = binop(Op::CmpLT64S, mkexpr(bits), mk_u64(0));
        let sign: Expr = ite(negative, mk_u64(0xD), mk_u64(plus));
        binop(Op::Or64, binop(Op::Shl64, mkexpr(bcd), mk_u8(4)), sign)
    };
    ctx.put_freg_bits(frt, r);
    Ok(())
}

/// denbcd: BCD to a decimal64 with exponent zero. S=0 takes sixteen
/// unsigned digits; S=1 takes fifteen digits and a trailing sign code
/// (0xB and 0xD are minus).
fn encode_bcd(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (frt, frb, signed) = (w.rd(), w.rb(), w.field(11, 1) == 1);
    reserved_zero(w, w.field(12, 4), "denbcd reserved bits")?;
    dis!("denbcd{} {},fr{},fr{}", dot(w.rc()), signed as u32, frt, frb);
    let bits: Temp = ctx.tmp(ctx.get_freg_bits(frb));
    // Biased exponent 398: two high bits 0b01, continuation 0x8E.
    let exp_cont: u64 = 0x8E << 50;
    let (digits, combo, sign): (Expr, Expr, Expr) = if signed {
        let nibble: Temp = ctx.tmp(binop(Op::And64, mkexpr(bits), mk_u64(0xF)));
        let minus: Expr = binop(
            Op::Or1,
            binop(Op::CmpEQ64, mkexpr(nibble), mk_u64(0xB)),
            binop(Op::CmpEQ64, mkexpr(nibble), mk_u64(0xD)),
        );
        let sign: Expr = binop(Op::Shl64, unop(Op::Cast1Uto64, minus), mk_u8(63));
        (binop(Op::Shr64, mkexpr(bits), mk_u8(4)), mk_u64(0b01000 << 58), sign)
    } else {
        let lmd: Temp = ctx.tmp(binop(Op::Shr64, mkexpr(bits), mk_u8(60)));
        let small: Expr = binop(Op::CmpLT64U, mkexpr(lmd), mk_u64(8));
        let combo: Expr = ite(
            small,
            binop(Op::Or64, mk_u64(0b01000), mkexpr(lmd)),
            binop(Op::Or64, mk_u64(0b11010), binop(Op::And64, mkexpr(lmd), mk_u64(1))),
        );
        let digits: Expr = binop(Op::And64, mkexpr(bits), mk_u64((1 << 60) - 1));
        (digits, binop(Op::Shl64, combo, mk_u8(58)), mk_u64(0))
    };
    let dpd: Expr = ccall(callee(Helper::BcdToDpd, ctx.abi), IrType::I64, [digits]);
    let head: Expr = binop(Op::Or64, sign, binop(Op::Or64, combo, mk_u64(exp_cont)));
    ctx.put_freg_bits(frt, binop(Op::Or64, head, dpd));
    Ok(())
}

/// dscli/dscri and the data class/group tests.
fn z22_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let quad: bool = w.opc1() == 63;
    let q: &str = if quad { "q" } else { "" };
    let (frt, fra, dcm) = (w.rd(), w.ra(), w.dcm());
    match w.xo9() {
        xo @ (66 | 98) => {
            even_pairs(w, quad, &[frt, fra])?;
            let left: bool = xo == 66;
            dis!("dsc{}i{}{} fr{},fr{},{}", if left { "l" } else { "r" }, q, dot(w.rc()), frt, fra, dcm);
            let op: Op = match (left, quad) {
                (true, false) => Op::ShlD64,
                (true, true) => Op::ShlD128,
                (false, false) => Op::ShrD64,
                (false, true) => Op::ShrD128,
            };
            let r: Expr = binop(op, get_dec(ctx, quad, fra), mk_u8(dcm as u8));
            put_dec(ctx, quad, frt, r);
            if w.rc() {
                set_fp_cr1(ctx);
            }
            Ok(())
        }
        xo => {
            reserved_zero(w, w.field(9, 2) | w.rc() as u32, "decimal class test reserved bits")?;
            even_pairs(w, quad, &[fra])?;
            let crfd: u32 = w.crfd();
            let group: bool = xo == 226;
            dis!("dtstd{}{} cr{},fr{},{}", if group { "g" } else { "c" }, q, crfd, fra, dcm);
            let hi: Temp = ctx.tmp(ctx.get_freg_bits(fra));
            let args: [Expr; 3] = if quad {
                [mkexpr(hi), ctx.get_freg_bits(fra + 1), mk_u64(1)]
            } else {
                [mk_u64(0), mkexpr(hi), mk_u64(0)]
            };
            let class: Temp = ctx.tmp(ccall(callee(Helper::DfpClassify, ctx.abi), IrType::I64, args));
            let shift: u8 = if group { 8 } else { 0 };
            let bits: Expr = binop(Op::Shr64, mkexpr(class), mk_u8(shift));
            let hit: Expr = binop(Op::CmpNE64, binop(Op::And64, bits, mk_u64(dcm as u64)), mk_u64(0));
            let sign: Expr = unop(Op::Cast64to32, binop(Op::Shr64, mkexpr(hi), mk_u8(63)));
            let nibble: Expr = binop(
                Op::Or32,
                binop(Op::Shl32, sign, mk_u8(3)),
                binop(Op::Shl32, unop(Op::Cast1Uto32, hit), mk_u8(1)),
            );
            let cc: Temp = ctx.tmp(nibble);
            put_cr_and_fpcc(ctx, crfd, cc);
            Ok(())
        }
    }
}

/// Rounding mode selected by the R bit and RMC field. R=0, RMC=3 defers
/// to the DRN field of the FPSCR.
fn rmc_mode(ctx: &DecodeContext<'_>, r: bool, rmc: u32) -> Expr {
    let mode: u32 = match (r, rmc) {
        (false, 0) => round::NEAREST_EVEN,
        (false, 1) => round::ZERO,
        (false, 2) => round::NEAREST_TIE_AWAY_0,
        (false, _) => return ctx.get_dfp_round_mode(),
        (true, 0) => round::POS_INF,
        (true, 1) => round::NEG_INF,
        (true, 2) => round::AWAY_FROM_ZERO,
        (true, _) => round::NEAREST_TIE_TOWARD_0,
    };
    mk_u32(mode)
}

/// Decimal 1 with exponent `te`.
fn one_with_exponent(quad: bool, te: i64) -> Expr {
    if quad {
        let one: Expr = binop(
            Op::D64HLtoD128,
            unop(Op::ReinterpI64asD64, mk_u64(ONE128_HI)),
            unop(Op::ReinterpI64asD64, mk_u64(1)),
        );
        binop(Op::InsertExpD128, mk_u64((te + BIAS128) as u64), one)
    } else {
        let one: Expr = unop(Op::ReinterpI64asD64, mk_u64(ONE64));
        binop(Op::InsertExpD64, mk_u64((te + BIAS64) as u64), one)
    }
}

/// dqua, dquai, drintx, drintn.
fn z23_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let quad: bool = w.opc1() == 63;
    let q: &str = if quad { "q" } else { "" };
    let (frt, fra, frb, rmc) = (w.rd(), w.ra(), w.rb(), w.rmc());
    let rc: bool = w.rc();
    let r: Expr = match w.xo8() {
        3 => {
            even_pairs(w, quad, &[frt, fra, frb])?;
            dis!("dqua{}{} fr{},fr{},fr{},{}", q, dot(rc), frt, fra, frb, rmc);
            let op: Op = if quad { Op::QuantizeD128 } else { Op::QuantizeD64 };
            triop(op, rmc_mode(ctx, false, rmc), get_dec(ctx, quad, fra), get_dec(ctx, quad, frb))
        }
        67 => {
            even_pairs(w, quad, &[frt, frb])?;
            let te: i64 = extend_s(fra as u64, 5) as i64;
            dis!("dquai{}{} {},fr{},fr{},{}", q, dot(rc), te, frt, frb, rmc);
            let op: Op = if quad { Op::QuantizeD128 } else { Op::QuantizeD64 };
            triop(op, rmc_mode(ctx, false, rmc), one_with_exponent(quad, te), get_dec(ctx, quad, frb))
        }
        xo @ (99 | 227) => {
            reserved_zero(w, w.field(11, 4), "drint reserved bits")?;
            even_pairs(w, quad, &[frt, frb])?;
            let r_bit: bool = w.r_bit();
            let name: &str = if xo == 99 { "drintx" } else { "drintn" };
            dis!("{}{}{} {},fr{},fr{},{}", name, q, dot(rc), r_bit as u32, frt, frb, rmc);
            let op: Op = if quad { Op::RoundD128toInt } else { Op::RoundD64toInt };
            binop(op, rmc_mode(ctx, r_bit, rmc), get_dec(ctx, quad, frb))
        }
        _ => return unknown(w, "decimal Z23-form"),
    };
    put_dec(ctx, quad, frt, r);
    if rc {
        set_fp_cr1(ctx);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::helpers::{dfp_class, ppc_dfp_classify};

    #[test]
    fn test_one_encodings_classify_as_normal() {
        assert_eq!(ppc_dfp_classify(0, ONE64, 0) & 0x3F, dfp_class::NORMAL);
        assert_eq!(ppc_dfp_classify(ONE128_HI, 1, 1) & 0x3F, dfp_class::NORMAL);
    }

    #[test]
    fn test_even_pairs() {
        let w: InsnWord = InsnWord(0xFC00_0004);
        assert!(even_pairs(w, true, &[2, 4]).is_ok());
        assert!(even_pairs(w, true, &[2, 5]).is_err());
        assert!(even_pairs(w, false, &[3]).is_ok());
    }
}
