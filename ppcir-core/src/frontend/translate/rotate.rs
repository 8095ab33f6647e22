//! Rotates and shifts.
//!
//! Word rotates in 64-bit mode rotate the low word and replicate it into
//! both halves before masking, so a wrapping mask may select bits of the
//! upper copy.

use super::{dis, dot, need_mode64, unknown, Translator};
use crate::frontend::bits::{mask32, mask32_in_64, mask64};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::flags::{set_cr0, set_xer_ca, FlagOp};
use crate::frontend::ir::{
    binop, ite, mk_u32, mk_u64, mk_u8, mkexpr, unop, Expr, IrType, Op, SzOp, Temp,
};

pub struct RotateShift;

impl Translator for RotateShift {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match w.opc1() {
            20 | 21 | 23 => rotate_word(ctx, w),
            30 => rotate_doubleword(ctx, w),
            31 => shift(ctx, w),
            _ => unknown(w, "rotate"),
        }
    }
}

/// Rotate `src` (I32 or I64) left by an I8 amount. A zero amount yields
/// `src` without a full-width shift.
pub(crate) fn rotl(ty: IrType, src: Expr, amt: Expr) -> Expr {
    let width: u8 = ty.bits() as u8;
    if let Some(c) = amt.as_const().and_then(|c| c.as_u64()) {
        let n: u8 = (c as u8) % width;
        if n == 0 {
            return src;
        }
        return binop(
            Op::sized(SzOp::Or, ty),
            binop(Op::sized(SzOp::Shl, ty), src.clone(), mk_u8(n)),
            binop(Op::sized(SzOp::Shr, ty), src, mk_u8(width - n)),
        );
    }
    let rotated: Expr = binop(
        Op::sized(SzOp::Or, ty),
        binop(Op::sized(SzOp::Shl, ty), src.clone(), amt.clone()),
        binop(Op::sized(SzOp::Shr, ty), src.clone(), binop(Op::Sub8, mk_u8(width), amt.clone())),
    );
    ite(binop(Op::CmpNE8, amt, mk_u8(0)), rotated, src)
}

/// rlwimi, rlwinm, rlwnm.
fn rotate_word(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rs, ra, rb, rc) = (w.rs(), w.ra(), w.rb(), w.rc());
    let (mb, me) = (w.mb5(), w.me5());
    let mode64: bool = ctx.mode64;

    let s32: Expr = ctx.word_to_32(ctx.get_ireg(rs));
    let amt: Expr = match w.opc1() {
        23 => {
            dis!("rlwnm{} r{},r{},r{},{},{}", dot(rc), ra, rs, rb, mb, me);
            let b32: Expr = ctx.word_to_32(ctx.get_ireg(rb));
            unop(Op::Cast32to8, binop(Op::And32, b32, mk_u32(31)))
        }
        opc => {
            let sh: u32 = w.sh5();
            dis!("{}{} r{},r{},{},{},{}", if opc == 20 { "rlwimi" } else { "rlwinm" }, dot(rc), ra, rs, sh, mb, me);
            mk_u8(sh as u8)
        }
    };
    let amt: Expr = ctx.tmp_e(amt);
    let rot32: Temp = ctx.tmp(rotl(IrType::I32, s32, amt));

    let (rot, mask): (Expr, u64) = if mode64 {
        let r64: Temp = ctx.tmp(unop(Op::Cast32Uto64, mkexpr(rot32)));
        let both: Expr = binop(Op::Or64, mkexpr(r64), binop(Op::Shl64, mkexpr(r64), mk_u8(32)));
        (both, mask32_in_64(mb, me))
    } else {
        (mkexpr(rot32), mask32(mb, me) as u64)
    };

    let masked: Expr = binop(ctx.sz_op(SzOp::And), rot, ctx.mk_sz_imm(mask));
    let value: Expr = if w.opc1() == 20 {
        let keep: Expr = binop(ctx.sz_op(SzOp::And), ctx.get_ireg(ra), ctx.mk_sz_imm(!mask));
        binop(ctx.sz_op(SzOp::Or), masked, keep)
    } else {
        masked
    };
    let res: Temp = ctx.tmp(value);
    ctx.put_ireg(ra, mkexpr(res));
    if rc {
        set_cr0(ctx, &mkexpr(res));
    }
    Ok(())
}

/// rldicl, rldicr, rldic, rldimi, rldcl, rldcr.
fn rotate_doubleword(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    need_mode64(ctx, w, "rotate doubleword")?;
    let (rs, ra, rb, rc) = (w.rs(), w.ra(), w.rb(), w.rc());
    let m6: u32 = w.mb6();
    let s: Expr = ctx.get_ireg(rs);

    let (rot, mask, insert): (Expr, u64, bool) = if w.xo3() <= 3 {
        let sh: u32 = w.sh6();
        let rot: Expr = rotl(IrType::I64, s, mk_u8(sh as u8));
        match w.xo3() {
            0 => {
                dis!("rldicl{} r{},r{},{},{}", dot(rc), ra, rs, sh, m6);
                (rot, mask64(m6, 63), false)
            }
            1 => {
                dis!("rldicr{} r{},r{},{},{}", dot(rc), ra, rs, sh, m6);
                (rot, mask64(0, m6), false)
            }
            2 => {
                dis!("rldic{} r{},r{},{},{}", dot(rc), ra, rs, sh, m6);
                (rot, mask64(m6, 63 - sh), false)
            }
            _ => {
                dis!("rldimi{} r{},r{},{},{}", dot(rc), ra, rs, sh, m6);
                (rot, mask64(m6, 63 - sh), true)
            }
        }
    } else {
        let amt: Expr = unop(Op::Cast64to8, binop(Op::And64, ctx.get_ireg(rb), mk_u64(63)));
        let amt: Expr = ctx.tmp_e(amt);
        let rot: Expr = rotl(IrType::I64, s, amt);
        match w.xo4() {
            8 => {
                dis!("rldcl{} r{},r{},r{},{}", dot(rc), ra, rs, rb, m6);
                (rot, mask64(m6, 63), false)
            }
            9 => {
                dis!("rldcr{} r{},r{},r{},{}", dot(rc), ra, rs, rb, m6);
                (rot, mask64(0, m6), false)
            }
            _ => return unknown(w, "rotate doubleword MDS"),
        }
    };

    let rot: Temp = ctx.tmp(rot);
    let masked: Expr = binop(Op::And64, mkexpr(rot), mk_u64(mask));
    let value: Expr = if insert {
        binop(Op::Or64, masked, binop(Op::And64, ctx.get_ireg(ra), mk_u64(!mask)))
    } else {
        masked
    };
    let res: Temp = ctx.tmp(value);
    ctx.put_ireg(ra, mkexpr(res));
    if rc {
        set_cr0(ctx, &mkexpr(res));
    }
    Ok(())
}

/// X/XS-form shifts.
fn shift(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rs, ra, rb, rc) = (w.rs(), w.ra(), w.rb(), w.rc());
    let s: Temp = ctx.tmp(ctx.get_ireg(rs));

    // XS-form encodings carry sh[5] in bit 30.
    match w.xo10() >> 1 {
        413 | 445 => return shift_doubleword_imm(ctx, w, s),
        _ => {}
    }

    let value: Expr = match w.xo10() {
        24 | 536 => {
            let left: bool = w.xo10() == 24;
            dis!("{}{} r{},r{},r{}", if left { "slw" } else { "srw" }, dot(rc), ra, rs, rb);
            let s32: Expr = ctx.word_to_32(mkexpr(s));
            let amt: Temp = ctx.tmp(binop(Op::And32, ctx.word_to_32(ctx.get_ireg(rb)), mk_u32(63)));
            let op: Op = if left { Op::Shl32 } else { Op::Shr32 };
            let shifted: Expr = binop(op, s32, unop(Op::Cast32to8, mkexpr(amt)));
            let r32: Expr = ite(binop(Op::CmpLT32U, mkexpr(amt), mk_u32(32)), shifted, mk_u32(0));
            ctx.widen_to_word(r32, false)
        }
        792 => {
            dis!("sraw{} r{},r{},r{}", dot(rc), ra, rs, rb);
            let s32: Temp = ctx.tmp(ctx.word_to_32(mkexpr(s)));
            let amt: Temp = ctx.tmp(binop(Op::And32, ctx.word_to_32(ctx.get_ireg(rb)), mk_u32(63)));
            let clamped: Expr = ite(
                binop(Op::CmpLT32U, mk_u32(31), mkexpr(amt)),
                mk_u8(31),
                unop(Op::Cast32to8, mkexpr(amt)),
            );
            let r32: Temp = ctx.tmp(binop(Op::Sar32, mkexpr(s32), clamped));
            set_xer_ca(ctx, FlagOp::Sraw, &mkexpr(r32), &mkexpr(s32), &mkexpr(amt), &mk_u32(0));
            ctx.widen_to_word(mkexpr(r32), true)
        }
        824 => {
            let sh: u32 = w.sh5();
            dis!("srawi{} r{},r{},{}", dot(rc), ra, rs, sh);
            let s32: Temp = ctx.tmp(ctx.word_to_32(mkexpr(s)));
            let r32: Temp = ctx.tmp(binop(Op::Sar32, mkexpr(s32), mk_u8(sh as u8)));
            set_xer_ca(ctx, FlagOp::Srawi, &mkexpr(r32), &mkexpr(s32), &mk_u32(sh), &mk_u32(0));
            ctx.widen_to_word(mkexpr(r32), true)
        }
        27 | 539 => {
            need_mode64(ctx, w, "doubleword shift")?;
            let left: bool = w.xo10() == 27;
            dis!("{}{} r{},r{},r{}", if left { "sld" } else { "srd" }, dot(rc), ra, rs, rb);
            let amt: Temp = ctx.tmp(binop(Op::And64, ctx.get_ireg(rb), mk_u64(127)));
            let op: Op = if left { Op::Shl64 } else { Op::Shr64 };
            let shifted: Expr = binop(op, mkexpr(s), unop(Op::Cast64to8, mkexpr(amt)));
            ite(binop(Op::CmpLT64U, mkexpr(amt), mk_u64(64)), shifted, mk_u64(0))
        }
        794 => {
            need_mode64(ctx, w, "srad")?;
            dis!("srad{} r{},r{},r{}", dot(rc), ra, rs, rb);
            let amt: Temp = ctx.tmp(binop(Op::And64, ctx.get_ireg(rb), mk_u64(127)));
            let clamped: Expr = ite(
                binop(Op::CmpLT64U, mk_u64(63), mkexpr(amt)),
                mk_u8(63),
                unop(Op::Cast64to8, mkexpr(amt)),
            );
            let r: Temp = ctx.tmp(binop(Op::Sar64, mkexpr(s), clamped));
            set_xer_ca(ctx, FlagOp::Srad, &mkexpr(r), &mkexpr(s), &mkexpr(amt), &mk_u64(0));
            mkexpr(r)
        }
        _ => return unknown(w, "shift"),
    };

    let res: Temp = ctx.tmp(value);
    ctx.put_ireg(ra, mkexpr(res));
    if rc {
        set_cr0(ctx, &mkexpr(res));
    }
    Ok(())
}

/// sradi, extswsli.
fn shift_doubleword_imm(ctx: &mut DecodeContext<'_>, w: InsnWord, s: Temp) -> TranslateResult {
    need_mode64(ctx, w, "doubleword shift immediate")?;
    let (rs, ra, rc) = (w.rs(), w.ra(), w.rc());
    let sh: u32 = w.sh6();
    let res: Temp = if w.xo10() >> 1 == 413 {
        dis!("sradi{} r{},r{},{}", dot(rc), ra, rs, sh);
        let r: Temp = ctx.tmp(binop(Op::Sar64, mkexpr(s), mk_u8(sh as u8)));
        set_xer_ca(ctx, FlagOp::Sradi, &mkexpr(r), &mkexpr(s), &mk_u64(sh as u64), &mk_u64(0));
        r
    } else {
        dis!("extswsli{} r{},r{},{}", dot(rc), ra, rs, sh);
        let ext: Expr = unop(Op::Cast32Sto64, unop(Op::Cast64to32, mkexpr(s)));
        ctx.tmp(binop(Op::Shl64, ext, mk_u8(sh as u8)))
    };
    ctx.put_ireg(ra, mkexpr(res));
    if rc {
        set_cr0(ctx, &mkexpr(res));
    }
    Ok(())
}
