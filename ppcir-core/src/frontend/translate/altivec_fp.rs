//! Altivec single-precision floating point.
//!
//! Vector FP always rounds to nearest; VSCR.NJ is not modelled.

use super::altivec::{any_set, or_into_sat, splat_const};
use super::{dis, reserved_zero, unknown, Translator};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::flags::set_av_cr6;
use crate::frontend::ir::{binop, mk_u32, mkexpr, round, triop, unop, Expr, Op, Temp};

pub struct AltivecFloat;

impl Translator for AltivecFloat {
    fn name(&self) -> &'static str {
        "altivec-fp"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match w.va_xo6() {
            46 | 47 => return multiply_add(ctx, w),
            _ => {}
        }
        match w.vc_xo10() {
            198 | 454 | 710 | 966 => compare(ctx, w),
            _ => vx_form(ctx, w),
        }
    }
}

fn rn() -> Expr {
    mk_u32(round::NEAREST_EVEN)
}

/// Splat of the f32 power of two `2^exp`.
fn pow2(exp: i32) -> Expr {
    let bits: u32 = ((127 + exp) as u32) << 23;
    splat_const(32, bits as u64)
}

fn multiply_add(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (vd, va, vb, vc) = (w.rd(), w.ra(), w.rb(), w.rc_field());
    let prod: Expr = triop(Op::Mul32Fx4, rn(), ctx.get_vreg(va), ctx.get_vreg(vc));
    let r: Expr = if w.va_xo6() == 46 {
        dis!("vmaddfp v{},v{},v{},v{}", vd, va, vc, vb);
        triop(Op::Add32Fx4, rn(), prod, ctx.get_vreg(vb))
    } else {
        dis!("vnmsubfp v{},v{},v{},v{}", vd, va, vc, vb);
        triop(Op::Sub32Fx4, rn(), ctx.get_vreg(vb), prod)
    };
    ctx.put_vreg(vd, r);
    Ok(())
}

fn compare(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (vd, va, vb) = (w.rd(), w.ra(), w.rb());
    let rc: bool = w.vc_rc();
    let a: Temp = ctx.tmp(ctx.get_vreg(va));
    let b: Temp = ctx.tmp(ctx.get_vreg(vb));
    let (name, r, all_ones) = match w.vc_xo10() {
        198 => ("vcmpeqfp", binop(Op::CmpEQ32Fx4, mkexpr(a), mkexpr(b)), true),
        454 => ("vcmpgefp", binop(Op::CmpGE32Fx4, mkexpr(a), mkexpr(b)), true),
        710 => ("vcmpgtfp", binop(Op::CmpGT32Fx4, mkexpr(a), mkexpr(b)), true),
        _ => {
            // Bit 0 of each lane: a > b; bit 1: a < -b. NaN sets both.
            let le: Expr = binop(Op::CmpGE32Fx4, mkexpr(b), mkexpr(a));
            let ge_neg: Expr = binop(Op::CmpGE32Fx4, mkexpr(a), unop(Op::Neg32Fx4, mkexpr(b)));
            let hi: Expr = binop(Op::AndV128, unop(Op::NotV128, le), splat_const(32, 0x8000_0000));
            let lo: Expr = binop(Op::AndV128, unop(Op::NotV128, ge_neg), splat_const(32, 0x4000_0000));
            ("vcmpbfp", binop(Op::OrV128, hi, lo), false)
        }
    };
    dis!("{}{} v{},v{},v{}", name, if rc { "." } else { "" }, vd, va, vb);
    let r: Temp = ctx.tmp(r);
    ctx.put_vreg(vd, mkexpr(r));
    if rc {
        set_av_cr6(ctx, &mkexpr(r), all_ones);
    }
    Ok(())
}

fn vx_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (vd, va, vb) = (w.rd(), w.ra(), w.rb());
    let xo: u32 = w.vx_xo11();
    let r: Expr = match xo {
        10 | 74 => {
            let (name, op) = if xo == 10 { ("vaddfp", Op::Add32Fx4) } else { ("vsubfp", Op::Sub32Fx4) };
            dis!("{} v{},v{},v{}", name, vd, va, vb);
            triop(op, rn(), ctx.get_vreg(va), ctx.get_vreg(vb))
        }
        1034 | 1098 => {
            let (name, op) = if xo == 1034 { ("vmaxfp", Op::Max32Fx4) } else { ("vminfp", Op::Min32Fx4) };
            dis!("{} v{},v{},v{}", name, vd, va, vb);
            binop(op, ctx.get_vreg(va), ctx.get_vreg(vb))
        }
        266 | 330 | 394 | 458 | 522 | 586 | 650 | 714 => {
            reserved_zero(w, va, "vector FP unary rA")?;
            let (name, op) = match xo {
                266 => ("vrefp", Op::RecipEst32Fx4),
                330 => ("vrsqrtefp", Op::RSqrtEst32Fx4),
                394 => ("vexptefp", Op::Exp2_32Fx4),
                458 => ("vlogefp", Op::Log2_32Fx4),
                522 => ("vrfin", Op::RoundF32x4RN),
                586 => ("vrfiz", Op::RoundF32x4RZ),
                650 => ("vrfip", Op::RoundF32x4RP),
                _ => ("vrfim", Op::RoundF32x4RM),
            };
            dis!("{} v{},v{}", name, vd, vb);
            unop(op, ctx.get_vreg(vb))
        }
        778 | 842 => {
            let signed: bool = xo == 842;
            let uim: u32 = va;
            dis!("vcf{}x v{},v{},{}", if signed { "s" } else { "u" }, vd, vb, uim);
            let op: Op = if signed { Op::I32StoF32x4 } else { Op::I32UtoF32x4 };
            triop(Op::Mul32Fx4, rn(), unop(op, ctx.get_vreg(vb)), pow2(-(uim as i32)))
        }
        906 | 970 => {
            let signed: bool = xo == 970;
            let uim: u32 = va;
            dis!("vct{}xs v{},v{},{}", if signed { "s" } else { "u" }, vd, vb, uim);
            let scaled: Temp = ctx.tmp(triop(Op::Mul32Fx4, rn(), ctx.get_vreg(vb), pow2(uim as i32)));
            // Lanes whose truncation falls outside the integer range.
            let (upper, lower, op) = if signed {
                (0x4F00_0000u64, 0xCF00_0000u64, Op::F32toI32Sx4RZ)
            } else {
                (0x4F80_0000, 0xBF80_0000, Op::F32toI32Ux4RZ)
            };
            let over: Expr = binop(Op::CmpGE32Fx4, mkexpr(scaled), splat_const(32, upper));
            let under: Expr = if signed {
                binop(Op::CmpGT32Fx4, splat_const(32, lower), mkexpr(scaled))
            } else {
                binop(Op::CmpGE32Fx4, splat_const(32, lower), mkexpr(scaled))
            };
            let flag: Expr = any_set(ctx, binop(Op::OrV128, over, under));
            or_into_sat(ctx, flag);
            unop(op, mkexpr(scaled))
        }
        _ => return unknown(w, "altivec FP"),
    };
    ctx.put_vreg(vd, r);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ir::Const;

    fn halves(e: Expr) -> (Option<Const>, Option<Const>) {
        match e {
            Expr::Binop(Op::Cat64HLtoV128, hi, lo) => (hi.as_const(), lo.as_const()),
            other => panic!("not a vector constant: {:?}", other),
        }
    }

    #[test]
    fn test_pow2_scale() {
        // 1.0f and 0.25f.
        assert_eq!(halves(pow2(0)).0, Some(Const::U64(0x3F80_0000_3F80_0000)));
        assert_eq!(halves(pow2(-2)).1, Some(Const::U64(0x3E80_0000_3E80_0000)));
        assert_eq!(halves(pow2(31)).0, Some(Const::U64(0x4F00_0000_4F00_0000)));
    }
}
