//! Condition-register logic and moves.

use super::{dis, invalid_if, reserved_zero, unknown, Translator};
use crate::frontend::context::{DecodeContext, GuestReg};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::ir::{binop, mk_u32, mk_u8, mkexpr, unop, Expr, Op, Temp};

pub struct CondReg;

impl Translator for CondReg {
    fn name(&self) -> &'static str {
        "condition register"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match (w.opc1(), w.xo10()) {
            (19, 0) => mcrf(ctx, w),
            (19, _) => cr_logic(ctx, w),
            (31, 512) => mcrxr(ctx, w),
            (31, 19) => mfcr(ctx, w),
            (31, 144) => mtcrf(ctx, w),
            _ => unknown(w, "condition register"),
        }
    }
}

fn cr_logic(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "CR logical bit 31")?;
    let (bt, ba, bb) = (w.rd(), w.ra(), w.rb());
    let a: Temp = ctx.tmp(ctx.get_cr_bit(ba));
    let b: Temp = ctx.tmp(ctx.get_cr_bit(bb));
    let (a, b) = (mkexpr(a), mkexpr(b));
    let (name, value): (&str, Expr) = match w.xo10() {
        257 => ("crand", binop(Op::And32, a, b)),
        129 => ("crandc", binop(Op::And32, a, unop(Op::Not32, b))),
        289 => ("creqv", unop(Op::Not32, binop(Op::Xor32, a, b))),
        225 => ("crnand", unop(Op::Not32, binop(Op::And32, a, b))),
        33 => ("crnor", unop(Op::Not32, binop(Op::Or32, a, b))),
        449 => ("cror", binop(Op::Or32, a, b)),
        417 => ("crorc", binop(Op::Or32, a, unop(Op::Not32, b))),
        193 => ("crxor", binop(Op::Xor32, a, b)),
        _ => return unknown(w, "CR logical"),
    };
    dis!("{} crb{},crb{},crb{}", name, bt, ba, bb);
    ctx.put_cr_bit(bt, value);
    Ok(())
}

fn mcrf(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.field(9, 2), "mcrf bits 9..10")?;
    reserved_zero(w, w.field(14, 7), "mcrf bits 14..20")?;
    reserved_zero(w, w.rc() as u32, "mcrf bit 31")?;
    let (bf, bfa) = (w.crfd(), w.crfs());
    dis!("mcrf cr{},cr{}", bf, bfa);
    let field: Expr = ctx.get_cr_field(bfa);
    ctx.put_cr_field(bf, field);
    Ok(())
}

/// mcrxr: CR field := XER[SO, OV, CA, 0]; those XER bits are cleared.
fn mcrxr(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.field(9, 12), "mcrxr bits 9..20")?;
    reserved_zero(w, w.rc() as u32, "mcrxr bit 31")?;
    let bf: u32 = w.crfd();
    dis!("mcrxr cr{}", bf);
    let xer: Expr = ctx.get_gst(GuestReg::Xer);
    ctx.put_cr_field(bf, binop(Op::Shr32, xer, mk_u8(28)));
    ctx.put_xer_so(mk_u8(0));
    ctx.put_xer_ov(mk_u8(0));
    ctx.put_xer_ca(mk_u8(0));
    Ok(())
}

/// Field index selected by a one-hot FXM value.
fn one_hot_field(fxm: u32) -> Option<u32> {
    if fxm.count_ones() == 1 {
        Some(fxm.leading_zeros() - 24)
    } else {
        None
    }
}

/// mfcr, mfocrf.
fn mfcr(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "mfcr bit 31")?;
    reserved_zero(w, w.field(20, 1), "mfcr bit 20")?;
    let rd: u32 = w.rd();
    let cr: Expr = ctx.get_gst(GuestReg::Cr);
    let value: Expr = if w.field(11, 1) == 1 {
        let Some(f) = one_hot_field(w.crm()) else {
            return invalid_if(w, true, "mfocrf field mask not one-hot");
        };
        dis!("mfocrf r{},0x{:x}", rd, w.crm());
        binop(Op::And32, cr, mk_u32(0xF << (28 - 4 * f)))
    } else {
        reserved_zero(w, w.field(12, 8), "mfcr bits 12..19")?;
        dis!("mfcr r{}", rd);
        cr
    };
    let v: Temp = ctx.tmp(value);
    let widened: Expr = ctx.widen_to_word(mkexpr(v), false);
    ctx.put_ireg(rd, widened);
    Ok(())
}

/// mtcrf, mtocrf.
fn mtcrf(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "mtcrf bit 31")?;
    reserved_zero(w, w.field(20, 1), "mtcrf bit 20")?;
    let (rs, fxm) = (w.rs(), w.crm());
    if w.field(11, 1) == 1 {
        invalid_if(w, one_hot_field(fxm).is_none(), "mtocrf field mask not one-hot")?;
        dis!("mtocrf 0x{:x},r{}", fxm, rs);
    } else {
        dis!("mtcrf 0x{:x},r{}", fxm, rs);
    }
    let mut mask: u64 = 0;
    for f in 0..8u32 {
        if fxm & (0x80 >> f) != 0 {
            mask |= 0xF << (28 - 4 * f);
        }
    }
    let value: Expr = ctx.word_to_32(ctx.get_ireg(rs));
    ctx.put_gst_masked(GuestReg::Cr, value, mask);
    Ok(())
}
