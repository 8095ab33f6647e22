//! Integer compares into a CR field, cmpb and setb.

use super::{dis, invalid_if, reserved_zero, unknown, Translator};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::flags::set_cr_from_ord;
use crate::frontend::ir::{binop, ite, mk_u32, mk_u8, mkexpr, unop, Expr, IrType, Op, SzOp, Temp};

pub struct IntCompare;

impl Translator for IntCompare {
    fn name(&self) -> &'static str {
        "compare"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match (w.opc1(), w.xo10()) {
            (10, _) | (11, _) | (31, 0) | (31, 32) => compare(ctx, w),
            (31, 508) => cmpb(ctx, w),
            (31, 128) => setb(ctx, w),
            _ => unknown(w, "integer compare"),
        }
    }
}

fn compare(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.field(9, 1), "compare bit 9")?;
    let (crf, ra) = (w.crfd(), w.ra());
    let l: bool = w.l_bit();
    invalid_if(w, l && !ctx.mode64, "64-bit compare in 32-bit mode")?;

    let a: Expr = ctx.get_ireg(ra);
    let width: &str = if l { "d" } else { "w" };
    let (signed, b): (bool, Expr) = match w.opc1() {
        11 => {
            let simm: i64 = w.simm16() as i64;
            dis!("cmp{}i cr{},r{},{}", width, crf, ra, simm);
            (true, ctx.mk_sz_imm(simm as u64))
        }
        10 => {
            let uimm: u64 = w.uimm16() as u64;
            dis!("cmpl{}i cr{},r{},{}", width, crf, ra, uimm);
            (false, ctx.mk_sz_imm(uimm))
        }
        _ => {
            reserved_zero(w, w.rc() as u32, "compare Rc")?;
            let rb: u32 = w.rb();
            let signed: bool = w.xo10() == 0;
            dis!("{}{} cr{},r{},r{}", if signed { "cmp" } else { "cmpl" }, width, crf, ra, rb);
            (signed, ctx.get_ireg(rb))
        }
    };

    let ord: Expr = if l {
        binop(if signed { Op::CmpORD64S } else { Op::CmpORD64U }, a, b)
    } else {
        let a32: Expr = ctx.word_to_32(a);
        let b32: Expr = ctx.word_to_32(b);
        binop(if signed { Op::CmpORD32S } else { Op::CmpORD32U }, a32, b32)
    };
    let ord: Temp = ctx.tmp(ord);
    set_cr_from_ord(ctx, crf, mkexpr(ord));
    Ok(())
}

/// cmpb: each result byte is 0xFF where the operand bytes are equal.
fn cmpb(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "cmpb Rc")?;
    let (rs, ra, rb) = (w.rs(), w.ra(), w.rb());
    dis!("cmpb r{},r{},r{}", ra, rs, rb);
    let ty: IrType = ctx.ty();
    let s: Temp = ctx.tmp(ctx.get_ireg(rs));
    let b: Temp = ctx.tmp(ctx.get_ireg(rb));
    let bytes: u32 = ty.size_bytes();
    let mut acc: Expr = ctx.mk_sz_imm(0);
    for i in 0..bytes {
        let sh: u8 = (8 * i) as u8;
        let byte_of = |t: Temp| -> Expr {
            let shifted: Expr = binop(Op::sized(SzOp::Shr, ty), mkexpr(t), mk_u8(sh));
            if ty == IrType::I64 {
                unop(Op::Cast64to8, shifted)
            } else {
                unop(Op::Cast32to8, shifted)
            }
        };
        let eq: Expr = binop(Op::CmpEQ8, byte_of(s), byte_of(b));
        let lane: Expr = ite(eq, ctx.mk_sz_imm(0xFFu64 << sh), ctx.mk_sz_imm(0));
        acc = binop(Op::sized(SzOp::Or, ty), acc, lane);
    }
    ctx.put_ireg(ra, acc);
    Ok(())
}

/// setb: -1 when CR[bfa].LT, 1 when CR[bfa].GT, else 0.
fn setb(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.field(14, 7), "setb reserved")?;
    reserved_zero(w, w.rc() as u32, "setb Rc")?;
    let rd: u32 = w.rd();
    let bfa: u32 = w.field(11, 3);
    dis!("setb r{},cr{}", rd, bfa);
    let lt: Expr = binop(Op::CmpNE32, ctx.get_cr_bit(4 * bfa), mk_u32(0));
    let gt: Expr = binop(Op::CmpNE32, ctx.get_cr_bit(4 * bfa + 1), mk_u32(0));
    let value: Expr = ite(lt, ctx.mk_sz_imm(u64::MAX), ite(gt, ctx.mk_sz_imm(1), ctx.mk_sz_imm(0)));
    ctx.put_ireg(rd, value);
    Ok(())
}
