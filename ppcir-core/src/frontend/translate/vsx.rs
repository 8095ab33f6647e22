//! VSX loads, stores and GPR moves (XX1-form, primary opcode 31).
//!
//! Scalar accesses use doubleword 0 of the target register; the other
//! doubleword is written as zero.

use super::{dis, need_mode64, reserved_zero, unknown, Translator};
use crate::frontend::context::{mk_v128_from_4x32, DecodeContext};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::{DecodeFailure, Extension, TranslateResult};
use crate::frontend::ir::{binop, mk_u64, mkexpr, unop, Expr, IrType, Op, Temp};

pub struct Vsx;

impl Translator for Vsx {
    fn name(&self) -> &'static str {
        "vsx"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        let xo: u32 = w.xo10();
        if matches!(xo, 12 | 76 | 524 | 140 | 652 | 51 | 115 | 179 | 211 | 243) && !ctx.features.isa2_07 {
            return Err(DecodeFailure::missing(w.raw(), Extension::Isa2_07));
        }
        match xo {
            51 | 115 | 179 | 211 | 243 => moves(ctx, w),
            12 | 76 | 524 | 588 | 332 | 780 | 844 => load(ctx, w),
            140 | 652 | 716 | 908 | 972 => store(ctx, w),
            _ => unknown(w, "VSX XX1-form"),
        }
    }
}

/// Doubleword 0 := `dw`, doubleword 1 := 0.
fn scalar(dw: Expr) -> Expr {
    binop(Op::Cat64HLtoV128, dw, mk_u64(0))
}

fn load(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (xt, ra, rb) = (w.xt(), w.ra(), w.rb());
    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_idx(ra, rb));
    let v: Expr = match w.xo10() {
        12 => {
            dis!("lxsiwzx vs{},r{},r{}", xt, ra, rb);
            scalar(unop(Op::Cast32Uto64, ctx.load(IrType::I32, mkexpr(ea))))
        }
        76 => {
            dis!("lxsiwax vs{},r{},r{}", xt, ra, rb);
            scalar(unop(Op::Cast32Sto64, ctx.load(IrType::I32, mkexpr(ea))))
        }
        524 => {
            dis!("lxsspx vs{},r{},r{}", xt, ra, rb);
            let d: Expr = unop(Op::F32toF64, ctx.load(IrType::F32, mkexpr(ea)));
            scalar(unop(Op::ReinterpF64asI64, d))
        }
        588 => {
            dis!("lxsdx vs{},r{},r{}", xt, ra, rb);
            scalar(ctx.load(IrType::I64, mkexpr(ea)))
        }
        332 => {
            dis!("lxvdsx vs{},r{},r{}", xt, ra, rb);
            let d: Temp = ctx.tmp(ctx.load(IrType::I64, mkexpr(ea)));
            binop(Op::Cat64HLtoV128, mkexpr(d), mkexpr(d))
        }
        844 => {
            dis!("lxvd2x vs{},r{},r{}", xt, ra, rb);
            let hi: Expr = ctx.load(IrType::I64, mkexpr(ea));
            let lo: Expr = ctx.load(IrType::I64, ctx.addr_plus(mkexpr(ea), 8));
            binop(Op::Cat64HLtoV128, hi, lo)
        }
        _ => {
            dis!("lxvw4x vs{},r{},r{}", xt, ra, rb);
            let words: [Expr; 4] =
                [0u64, 4, 8, 12].map(|off| ctx.load(IrType::I32, ctx.addr_plus(mkexpr(ea), off)));
            mk_v128_from_4x32(words)
        }
    };
    ctx.put_vsreg(xt, v);
    Ok(())
}

fn store(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (xs, ra, rb) = (w.xt(), w.ra(), w.rb());
    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_idx(ra, rb));
    let v: Temp = ctx.tmp(ctx.get_vsreg(xs));
    match w.xo10() {
        140 => {
            dis!("stxsiwx vs{},r{},r{}", xs, ra, rb);
            let word: Expr = unop(Op::Cast64to32, unop(Op::CastV128HIto64, mkexpr(v)));
            ctx.store(mkexpr(ea), word);
        }
        652 => {
            dis!("stxsspx vs{},r{},r{}", xs, ra, rb);
            let d: Expr = unop(Op::ReinterpI64asF64, unop(Op::CastV128HIto64, mkexpr(v)));
            ctx.store(mkexpr(ea), binop(Op::F64toF32, ctx.get_round_mode(), d));
        }
        716 => {
            dis!("stxsdx vs{},r{},r{}", xs, ra, rb);
            ctx.store(mkexpr(ea), unop(Op::CastV128HIto64, mkexpr(v)));
        }
        972 => {
            dis!("stxvd2x vs{},r{},r{}", xs, ra, rb);
            ctx.store(mkexpr(ea), unop(Op::CastV128HIto64, mkexpr(v)));
            let second: Expr = ctx.addr_plus(mkexpr(ea), 8);
            ctx.store(second, unop(Op::CastV128to64, mkexpr(v)));
        }
        _ => {
            dis!("stxvw4x vs{},r{},r{}", xs, ra, rb);
            let lanes: [Temp; 4] = ctx.break_v128_to_4x32(mkexpr(v));
            for (i, lane) in lanes.into_iter().enumerate() {
                let addr: Expr = ctx.addr_plus(mkexpr(ea), 4 * i as u64);
                ctx.store(addr, mkexpr(lane));
            }
        }
    }
    Ok(())
}

/// mfvsrd, mfvsrwz, mtvsrd, mtvsrwa, mtvsrwz.
fn moves(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (xt, ra) = (w.xt(), w.ra());
    reserved_zero(w, w.rb(), "VSR move rB")?;
    match w.xo10() {
        51 => {
            need_mode64(ctx, w, "mfvsrd")?;
            dis!("mfvsrd r{},vs{}", ra, xt);
            let dw: Expr = unop(Op::CastV128HIto64, ctx.get_vsreg(xt));
            ctx.put_ireg(ra, dw);
        }
        115 => {
            dis!("mfvsrwz r{},vs{}", ra, xt);
            let word: Expr = unop(Op::Cast64to32, unop(Op::CastV128HIto64, ctx.get_vsreg(xt)));
            let r: Expr = ctx.widen_to_word(word, false);
            ctx.put_ireg(ra, r);
        }
        179 => {
            need_mode64(ctx, w, "mtvsrd")?;
            dis!("mtvsrd vs{},r{}", xt, ra);
            ctx.put_vsreg(xt, scalar(ctx.get_ireg(ra)));
        }
        xo => {
            let signed: bool = xo == 211;
            dis!("mtvsrw{} vs{},r{}", if signed { "a" } else { "z" }, xt, ra);
            let word: Expr = ctx.word_to_32(ctx.get_ireg(ra));
            let op: Op = if signed { Op::Cast32Sto64 } else { Op::Cast32Uto64 };
            ctx.put_vsreg(xt, scalar(unop(op, word)));
        }
    }
    Ok(())
}
