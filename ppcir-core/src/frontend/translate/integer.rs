//! Integer arithmetic: add/subtract/multiply/divide/modulo.

use super::{dis, dot, invalid_if, need_mode64, o, reserved_zero, unknown, Translator};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::flags::{set_cr0, set_xer_ca, set_xer_ov, FlagOp};
use crate::frontend::ir::{binop, mk_u32, mk_u64, mk_u8, mkexpr, unop, Expr, IrType, Op, SzOp, Temp};

pub struct IntArith;

impl Translator for IntArith {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match w.opc1() {
            4 => multiply_add(ctx, w),
            7 | 8 | 12 | 13 | 14 | 15 => immediate(ctx, w),
            19 => addpcis(ctx, w),
            31 => extended(ctx, w),
            _ => unknown(w, "integer arithmetic"),
        }
    }
}

/// D-form forms with a signed 16-bit immediate.
fn immediate(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    if matches!(w.opc1(), 14 | 15) {
        return add_immediate(ctx, w);
    }
    let (rd, ra) = (w.rd(), w.ra());
    let simm: i64 = w.simm16() as i64;
    let ty: IrType = ctx.ty();
    let add: Op = ctx.sz_op(SzOp::Add);
    let ra_v: Temp = ctx.tmp(ctx.get_ireg(ra));
    let res: Temp;
    match w.opc1() {
        12 | 13 => {
            let rc: bool = w.opc1() == 13;
            dis!("addic{} r{},r{},{}", dot(rc), rd, ra, simm);
            let imm: Expr = ctx.mk_sz_imm(simm as u64);
            res = ctx.tmp(binop(add, mkexpr(ra_v), imm.clone()));
            let zero: Expr = ctx.mk_sz_imm(0);
            set_xer_ca(ctx, FlagOp::Add, &mkexpr(res), &mkexpr(ra_v), &imm, &zero);
            if rc {
                set_cr0(ctx, &mkexpr(res));
            }
        }
        7 => {
            dis!("mulli r{},r{},{}", rd, ra, simm);
            res = if ty == IrType::I64 {
                ctx.tmp(binop(Op::Mul64, mkexpr(ra_v), mk_u64(simm as u64)))
            } else {
                ctx.tmp(binop(Op::Mul32, mkexpr(ra_v), mk_u32(simm as u32)))
            };
        }
        8 => {
            dis!("subfic r{},r{},{}", rd, ra, simm);
            let imm: Expr = ctx.mk_sz_imm(simm as u64);
            res = ctx.tmp(binop(ctx.sz_op(SzOp::Sub), imm.clone(), mkexpr(ra_v)));
            let zero: Expr = ctx.mk_sz_imm(0);
            set_xer_ca(ctx, FlagOp::SubfI, &mkexpr(res), &mkexpr(ra_v), &imm, &zero);
        }
        _ => return unknown(w, "integer immediate"),
    }
    ctx.put_ireg(rd, mkexpr(res));
    Ok(())
}

/// addi/addis; `rA == 0` loads the immediate without reading r0.
fn add_immediate(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rd, ra) = (w.rd(), w.ra());
    let simm: i64 = w.simm16() as i64;
    let shifted: bool = w.opc1() == 15;
    let imm: Expr = ctx.mk_sz_imm(if shifted { (simm as u64) << 16 } else { simm as u64 });
    let value: Expr = if ra == 0 {
        dis!("{} r{},{}", if shifted { "lis" } else { "li" }, rd, simm);
        imm
    } else {
        dis!("{} r{},r{},{}", if shifted { "addis" } else { "addi" }, rd, ra, simm);
        binop(ctx.sz_op(SzOp::Add), ctx.get_ireg(ra), imm)
    };
    let res: Temp = ctx.tmp(value);
    ctx.put_ireg(rd, mkexpr(res));
    Ok(())
}

/// addpcis: rD := NIA + (D << 16).
fn addpcis(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let rd: u32 = w.rd();
    let d1: u32 = w.field(11, 5);
    let d0: u32 = w.field(16, 10);
    let d2: u32 = w.field(31, 1);
    let d: u64 = crate::frontend::bits::extend_s(((d0 << 6) | (d1 << 1) | d2) as u64, 16);
    dis!("addpcis r{},{}", rd, d as i64);
    let target: u64 = ctx.mode_addr(ctx.nia().wrapping_add(d << 16));
    let v: Expr = ctx.mk_sz_imm(target);
    ctx.put_ireg(rd, v);
    Ok(())
}

/// maddhd, maddhdu, maddld (VA-form under primary opcode 4).
fn multiply_add(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    need_mode64(ctx, w, "multiply-add doubleword")?;
    let (rd, ra, rb, rc) = (w.rd(), w.ra(), w.rb(), w.rc_field());
    let a: Temp = ctx.tmp(ctx.get_ireg(ra));
    let b: Temp = ctx.tmp(ctx.get_ireg(rb));
    let c: Temp = ctx.tmp(ctx.get_ireg(rc));
    let res: Expr = match w.va_xo6() {
        48 => {
            dis!("maddhd r{},r{},r{},r{}", rd, ra, rb, rc);
            // Signed 128-bit product plus sign-extended addend.
            let prod: Temp = ctx.tmp(binop(Op::MullS64, mkexpr(a), mkexpr(b)));
            let lo: Temp = ctx.tmp(unop(Op::Cast128to64, mkexpr(prod)));
            let sum_lo: Temp = ctx.tmp(binop(Op::Add64, mkexpr(lo), mkexpr(c)));
            let carry: Expr = unop(Op::Cast1Uto64, binop(Op::CmpLT64U, mkexpr(sum_lo), mkexpr(lo)));
            let c_hi: Expr = binop(Op::Sar64, mkexpr(c), mk_u8(63));
            let hi: Expr = unop(Op::Cast128HIto64, mkexpr(prod));
            binop(Op::Add64, binop(Op::Add64, hi, c_hi), carry)
        }
        49 => {
            dis!("maddhdu r{},r{},r{},r{}", rd, ra, rb, rc);
            let prod: Temp = ctx.tmp(binop(Op::MullU64, mkexpr(a), mkexpr(b)));
            let lo: Temp = ctx.tmp(unop(Op::Cast128to64, mkexpr(prod)));
            let sum_lo: Temp = ctx.tmp(binop(Op::Add64, mkexpr(lo), mkexpr(c)));
            let carry: Expr = unop(Op::Cast1Uto64, binop(Op::CmpLT64U, mkexpr(sum_lo), mkexpr(lo)));
            binop(Op::Add64, unop(Op::Cast128HIto64, mkexpr(prod)), carry)
        }
        51 => {
            dis!("maddld r{},r{},r{},r{}", rd, ra, rb, rc);
            binop(Op::Add64, binop(Op::Mul64, mkexpr(a), mkexpr(b)), mkexpr(c))
        }
        _ => return unknown(w, "multiply-add doubleword"),
    };
    ctx.put_ireg(rd, res);
    Ok(())
}

/// XO-form and modulo forms under primary opcode 31.
fn extended(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    match w.xo10() {
        779 | 267 | 777 | 265 => return modulo(ctx, w),
        _ => {}
    }

    let (rd, ra, rb) = (w.rd(), w.ra(), w.rb());
    let (oe, rc) = (w.oe(), w.rc());
    let ty: IrType = ctx.ty();
    let mode64: bool = ctx.mode64;

    let a: Temp = ctx.tmp(ctx.get_ireg(ra));
    let b: Temp = ctx.tmp(ctx.get_ireg(rb));
    let (a_e, b_e) = (mkexpr(a), mkexpr(b));
    let res: Temp = ctx.new_temp(ty);

    match w.xo9() {
        266 => {
            dis!("add{}{} r{},r{},r{}", o(oe), dot(rc), rd, ra, rb);
            ctx.assign(res, binop(ctx.sz_op(SzOp::Add), a_e.clone(), b_e.clone()));
            if oe {
                set_xer_ov(ctx, FlagOp::Add, &mkexpr(res), &a_e, &b_e);
            }
        }
        10 => {
            dis!("addc{}{} r{},r{},r{}", o(oe), dot(rc), rd, ra, rb);
            ctx.assign(res, binop(ctx.sz_op(SzOp::Add), a_e.clone(), b_e.clone()));
            let zero: Expr = ctx.mk_sz_imm(0);
            set_xer_ca(ctx, FlagOp::Add, &mkexpr(res), &a_e, &b_e, &zero);
            if oe {
                set_xer_ov(ctx, FlagOp::Add, &mkexpr(res), &a_e, &b_e);
            }
        }
        138 | 234 | 202 => {
            // adde, addme (rB := -1), addze (rB := 0)
            let b_op: Expr = match w.xo9() {
                138 => {
                    dis!("adde{}{} r{},r{},r{}", o(oe), dot(rc), rd, ra, rb);
                    b_e.clone()
                }
                234 => {
                    reserved_zero(w, rb, "addme rB")?;
                    dis!("addme{}{} r{},r{}", o(oe), dot(rc), rd, ra);
                    ctx.mk_sz_imm(u64::MAX)
                }
                _ => {
                    reserved_zero(w, rb, "addze rB")?;
                    dis!("addze{}{} r{},r{}", o(oe), dot(rc), rd, ra);
                    ctx.mk_sz_imm(0)
                }
            };
            let old_ca: Temp = ctx.tmp(ctx.widen_to_word(ctx.get_xer_ca(), false));
            let add: Op = ctx.sz_op(SzOp::Add);
            ctx.assign(res, binop(add, binop(add, a_e.clone(), b_op.clone()), mkexpr(old_ca)));
            set_xer_ca(ctx, FlagOp::AddE, &mkexpr(res), &a_e, &b_op, &mkexpr(old_ca));
            if oe {
                set_xer_ov(ctx, FlagOp::AddE, &mkexpr(res), &a_e, &b_op);
            }
        }
        40 => {
            dis!("subf{}{} r{},r{},r{}", o(oe), dot(rc), rd, ra, rb);
            ctx.assign(res, binop(ctx.sz_op(SzOp::Sub), b_e.clone(), a_e.clone()));
            if oe {
                set_xer_ov(ctx, FlagOp::Subf, &mkexpr(res), &a_e, &b_e);
            }
        }
        8 => {
            dis!("subfc{}{} r{},r{},r{}", o(oe), dot(rc), rd, ra, rb);
            ctx.assign(res, binop(ctx.sz_op(SzOp::Sub), b_e.clone(), a_e.clone()));
            let zero: Expr = ctx.mk_sz_imm(0);
            set_xer_ca(ctx, FlagOp::SubfC, &mkexpr(res), &a_e, &b_e, &zero);
            if oe {
                set_xer_ov(ctx, FlagOp::SubfC, &mkexpr(res), &a_e, &b_e);
            }
        }
        136 | 232 | 200 => {
            // subfe, subfme (rB := -1), subfze (rB := 0): ~rA + rB + CA
            let b_op: Expr = match w.xo9() {
                136 => {
                    dis!("subfe{}{} r{},r{},r{}", o(oe), dot(rc), rd, ra, rb);
                    b_e.clone()
                }
                232 => {
                    reserved_zero(w, rb, "subfme rB")?;
                    dis!("subfme{}{} r{},r{}", o(oe), dot(rc), rd, ra);
                    ctx.mk_sz_imm(u64::MAX)
                }
                _ => {
                    reserved_zero(w, rb, "subfze rB")?;
                    dis!("subfze{}{} r{},r{}", o(oe), dot(rc), rd, ra);
                    ctx.mk_sz_imm(0)
                }
            };
            let old_ca: Temp = ctx.tmp(ctx.widen_to_word(ctx.get_xer_ca(), false));
            let add: Op = ctx.sz_op(SzOp::Add);
            let not_a: Expr = unop(ctx.sz_op(SzOp::Not), a_e.clone());
            ctx.assign(res, binop(add, binop(add, not_a, b_op.clone()), mkexpr(old_ca)));
            set_xer_ca(ctx, FlagOp::SubfE, &mkexpr(res), &a_e, &b_op, &mkexpr(old_ca));
            if oe {
                set_xer_ov(ctx, FlagOp::SubfE, &mkexpr(res), &a_e, &b_op);
            }
        }
        104 => {
            reserved_zero(w, rb, "neg rB")?;
            dis!("neg{}{} r{},r{}", o(oe), dot(rc), rd, ra);
            let zero: Expr = ctx.mk_sz_imm(0);
            ctx.assign(res, binop(ctx.sz_op(SzOp::Sub), zero, a_e.clone()));
            if oe {
                set_xer_ov(ctx, FlagOp::Neg, &mkexpr(res), &a_e, &b_e);
            }
        }
        235 => {
            dis!("mullw{}{} r{},r{},r{}", o(oe), dot(rc), rd, ra, rb);
            let a32: Expr = ctx.word_to_32(a_e.clone());
            let b32: Expr = ctx.word_to_32(b_e.clone());
            if mode64 {
                ctx.assign(res, binop(Op::MullS32, a32.clone(), b32.clone()));
            } else {
                ctx.assign(res, binop(Op::Mul32, a32.clone(), b32.clone()));
            }
            if oe {
                let lo: Expr = ctx.tmp_e(ctx.word_to_32(mkexpr(res)));
                set_xer_ov(ctx, FlagOp::MulLw, &lo, &a32, &b32);
            }
        }
        75 | 11 => {
            let signed: bool = w.xo9() == 75;
            invalid_if(w, oe, "mulhw with OE")?;
            dis!("mulhw{}{} r{},r{},r{}", if signed { "" } else { "u" }, dot(rc), rd, ra, rb);
            let a32: Expr = ctx.word_to_32(a_e.clone());
            let b32: Expr = ctx.word_to_32(b_e.clone());
            let mull: Op = if signed { Op::MullS32 } else { Op::MullU32 };
            let hi: Expr = unop(Op::Cast64HIto32, binop(mull, a32, b32));
            if mode64 {
                let widen: Op = if signed { Op::Cast32Sto64 } else { Op::Cast32Uto64 };
                ctx.assign(res, unop(widen, hi));
            } else {
                ctx.assign(res, hi);
            }
        }
        233 => {
            need_mode64(ctx, w, "mulld")?;
            dis!("mulld{}{} r{},r{},r{}", o(oe), dot(rc), rd, ra, rb);
            ctx.assign(res, binop(Op::Mul64, a_e.clone(), b_e.clone()));
            if oe {
                set_xer_ov(ctx, FlagOp::MulLd, &mkexpr(res), &a_e, &b_e);
            }
        }
        73 | 9 => {
            need_mode64(ctx, w, "mulhd")?;
            invalid_if(w, oe, "mulhd with OE")?;
            let signed: bool = w.xo9() == 73;
            dis!("mulhd{}{} r{},r{},r{}", if signed { "" } else { "u" }, dot(rc), rd, ra, rb);
            let mull: Op = if signed { Op::MullS64 } else { Op::MullU64 };
            ctx.assign(res, unop(Op::Cast128HIto64, binop(mull, a_e.clone(), b_e.clone())));
        }
        491 | 459 | 427 | 395 => {
            // divw, divwu, divwe, divweu: word operations in both modes.
            let (op, flag, name): (Op, FlagOp, &str) = match w.xo9() {
                491 => (Op::DivS32, FlagOp::DivW, "divw"),
                459 => (Op::DivU32, FlagOp::DivWU, "divwu"),
                427 => (Op::DivS32E, FlagOp::DivWE, "divwe"),
                _ => (Op::DivU32E, FlagOp::DivWEU, "divweu"),
            };
            dis!("{}{}{} r{},r{},r{}", name, o(oe), dot(rc), rd, ra, rb);
            let a32: Temp = ctx.tmp(ctx.word_to_32(a_e.clone()));
            let b32: Temp = ctx.tmp(ctx.word_to_32(b_e.clone()));
            let q: Temp = ctx.tmp(binop(op, mkexpr(a32), mkexpr(b32)));
            // The upper word of a 64-bit result is undefined; zero it.
            if mode64 {
                ctx.assign(res, unop(Op::Cast32Uto64, mkexpr(q)));
            } else {
                ctx.assign(res, mkexpr(q));
            }
            if oe {
                set_xer_ov(ctx, flag, &mkexpr(q), &mkexpr(a32), &mkexpr(b32));
            }
        }
        489 | 457 | 425 | 393 => {
            need_mode64(ctx, w, "divide doubleword")?;
            let (op, flag, name): (Op, FlagOp, &str) = match w.xo9() {
                489 => (Op::DivS64, FlagOp::DivD, "divd"),
                457 => (Op::DivU64, FlagOp::DivDU, "divdu"),
                425 => (Op::DivS64E, FlagOp::DivDE, "divde"),
                _ => (Op::DivU64E, FlagOp::DivDEU, "divdeu"),
            };
            dis!("{}{}{} r{},r{},r{}", name, o(oe), dot(rc), rd, ra, rb);
            ctx.assign(res, binop(op, a_e.clone(), b_e.clone()));
            if oe {
                set_xer_ov(ctx, flag, &mkexpr(res), &a_e, &b_e);
            }
        }
        _ => return unknown(w, "integer arithmetic XO"),
    }

    ctx.put_ireg(rd, mkexpr(res));
    if rc {
        set_cr0(ctx, &mkexpr(res));
    }
    Ok(())
}

/// modsw, moduw, modsd, modud.
fn modulo(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rd, ra, rb) = (w.rd(), w.ra(), w.rb());
    reserved_zero(w, w.rc() as u32, "modulo Rc")?;
    let a: Expr = ctx.get_ireg(ra);
    let b: Expr = ctx.get_ireg(rb);
    match w.xo10() {
        779 | 267 => {
            let signed: bool = w.xo10() == 779;
            dis!("mod{}w r{},r{},r{}", if signed { "s" } else { "u" }, rd, ra, rb);
            let a32: Temp = ctx.tmp(ctx.word_to_32(a));
            let b32: Temp = ctx.tmp(ctx.word_to_32(b));
            let div: Op = if signed { Op::DivS32 } else { Op::DivU32 };
            let q: Expr = binop(div, mkexpr(a32), mkexpr(b32));
            let r: Expr = binop(Op::Sub32, mkexpr(a32), binop(Op::Mul32, q, mkexpr(b32)));
            let widened: Expr = ctx.widen_to_word(r, signed);
            ctx.put_ireg(rd, widened);
        }
        _ => {
            need_mode64(ctx, w, "modulo doubleword")?;
            let signed: bool = w.xo10() == 777;
            dis!("mod{}d r{},r{},r{}", if signed { "s" } else { "u" }, rd, ra, rb);
            let a64: Temp = ctx.tmp(a);
            let b64: Temp = ctx.tmp(b);
            let div: Op = if signed { Op::DivS64 } else { Op::DivU64 };
            let q: Expr = binop(div, mkexpr(a64), mkexpr(b64));
            ctx.put_ireg(rd, binop(Op::Sub64, mkexpr(a64), binop(Op::Mul64, q, mkexpr(b64))));
        }
    }
    Ok(())
}
