//! Logical operations, sign extension, bit counts, parity and isel.

use super::{dis, dot, need_mode64, reserved_zero, unknown, Translator};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::flags::set_cr0;
use crate::frontend::ir::{
    binop, ite, mk_u32, mk_u64, mk_u8, mkexpr, unop, Expr, IrType, JumpKind, Op, SzOp, Temp,
};

pub struct IntLogic;

impl Translator for IntLogic {
    fn name(&self) -> &'static str {
        "logical"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match w.opc1() {
            24..=29 => immediate(ctx, w),
            31 if w.xo5() == 15 => isel(ctx, w),
            31 => extended(ctx, w),
            _ => unknown(w, "logical"),
        }
    }
}

fn immediate(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rs, ra) = (w.rs(), w.ra());
    let uimm: u64 = w.uimm16() as u64;
    let (op, imm, name, record): (SzOp, u64, &str, bool) = match w.opc1() {
        24 => (SzOp::Or, uimm, "ori", false),
        25 => (SzOp::Or, uimm << 16, "oris", false),
        26 => (SzOp::Xor, uimm, "xori", false),
        27 => (SzOp::Xor, uimm << 16, "xoris", false),
        28 => (SzOp::And, uimm, "andi.", true),
        _ => (SzOp::And, uimm << 16, "andis.", true),
    };
    if w.opc1() == 24 && rs == 0 && ra == 0 && uimm == 0 {
        dis!("nop");
        return Ok(());
    }
    dis!("{} r{},r{},0x{:x}", name, ra, rs, uimm);
    let res: Temp = ctx.tmp(binop(ctx.sz_op(op), ctx.get_ireg(rs), ctx.mk_sz_imm(imm)));
    ctx.put_ireg(ra, mkexpr(res));
    if record {
        set_cr0(ctx, &mkexpr(res));
    }
    Ok(())
}

fn extended(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rs, ra, rb, rc) = (w.rs(), w.ra(), w.rb(), w.rc());
    let ty: IrType = ctx.ty();
    let sz = |op: SzOp| Op::sized(op, ty);

    let s: Temp = ctx.tmp(ctx.get_ireg(rs));
    let s_e: Expr = mkexpr(s);

    let value: Expr = match w.xo10() {
        28 | 60 | 444 | 412 | 316 | 476 | 124 | 284 => {
            let b: Expr = ctx.get_ireg(rb);
            let (name, e): (&str, Expr) = match w.xo10() {
                28 => ("and", binop(sz(SzOp::And), s_e, b)),
                60 => ("andc", binop(sz(SzOp::And), s_e, unop(sz(SzOp::Not), b))),
                444 => {
                    if rs == 27 && ra == 27 && rb == 27 && !rc {
                        dis!("or 27,27,27 (yield)");
                        ctx.stop_at_nia(JumpKind::Yield);
                        return Ok(());
                    }
                    if rs == rb {
                        dis!("mr{} r{},r{}", dot(rc), ra, rs);
                        let res: Temp = ctx.tmp(s_e);
                        ctx.put_ireg(ra, mkexpr(res));
                        if rc {
                            set_cr0(ctx, &mkexpr(res));
                        }
                        return Ok(());
                    }
                    ("or", binop(sz(SzOp::Or), s_e, b))
                }
                412 => ("orc", binop(sz(SzOp::Or), s_e, unop(sz(SzOp::Not), b))),
                316 => ("xor", binop(sz(SzOp::Xor), s_e, b)),
                476 => ("nand", unop(sz(SzOp::Not), binop(sz(SzOp::And), s_e, b))),
                124 => ("nor", unop(sz(SzOp::Not), binop(sz(SzOp::Or), s_e, b))),
                _ => ("eqv", unop(sz(SzOp::Not), binop(sz(SzOp::Xor), s_e, b))),
            };
            dis!("{}{} r{},r{},r{}", name, dot(rc), ra, rs, rb);
            e
        }
        954 | 922 | 986 => {
            reserved_zero(w, rb, "extend rB")?;
            let from: IrType = match w.xo10() {
                954 => IrType::I8,
                922 => IrType::I16,
                _ => {
                    need_mode64(ctx, w, "extsw")?;
                    IrType::I32
                }
            };
            dis!("exts{}{} r{},r{}", ["b", "h", "w"][(from.bits() / 16) as usize], dot(rc), ra, rs);
            let narrow: Expr = ctx.narrow_from_word(s_e, from);
            ctx.widen_to_word(narrow, true)
        }
        26 | 538 => {
            reserved_zero(w, rb, "count rB")?;
            let leading: bool = w.xo10() == 26;
            dis!("cnt{}zw{} r{},r{}", if leading { "l" } else { "t" }, dot(rc), ra, rs);
            let lo: Temp = ctx.tmp(ctx.word_to_32(s_e));
            let count: Expr = count_zeros32(lo, leading);
            ctx.widen_to_word(count, false)
        }
        58 | 570 => {
            need_mode64(ctx, w, "count doubleword")?;
            reserved_zero(w, rb, "count rB")?;
            let leading: bool = w.xo10() == 58;
            dis!("cnt{}zd{} r{},r{}", if leading { "l" } else { "t" }, dot(rc), ra, rs);
            let op: Op = if leading { Op::Clz64 } else { Op::Ctz64 };
            ite(binop(Op::CmpEQ64, s_e.clone(), mk_u64(0)), mk_u64(64), unop(op, s_e))
        }
        122 => {
            reserved_zero(w, rb, "popcntb rB")?;
            reserved_zero(w, rc as u32, "popcntb Rc")?;
            dis!("popcntb r{},r{}", ra, rs);
            popcount_bytes(ctx, s)
        }
        378 => {
            reserved_zero(w, rb, "popcntw rB")?;
            reserved_zero(w, rc as u32, "popcntw Rc")?;
            dis!("popcntw r{},r{}", ra, rs);
            if ctx.mode64 {
                let hi: Expr = unop(Op::PopCount32, unop(Op::Cast64HIto32, s_e.clone()));
                let lo: Expr = unop(Op::PopCount32, unop(Op::Cast64to32, s_e));
                binop(Op::Cat32HLto64, hi, lo)
            } else {
                unop(Op::PopCount32, s_e)
            }
        }
        506 => {
            need_mode64(ctx, w, "popcntd")?;
            reserved_zero(w, rb, "popcntd rB")?;
            reserved_zero(w, rc as u32, "popcntd Rc")?;
            dis!("popcntd r{},r{}", ra, rs);
            unop(Op::PopCount64, s_e)
        }
        154 | 186 => {
            reserved_zero(w, rb, "prty rB")?;
            reserved_zero(w, rc as u32, "prty Rc")?;
            let per_word: bool = w.xo10() == 154;
            if !per_word {
                need_mode64(ctx, w, "prtyd")?;
            }
            dis!("prty{} r{},r{}", if per_word { "w" } else { "d" }, ra, rs);
            parity(ctx, s, per_word)
        }
        252 => {
            need_mode64(ctx, w, "bpermd")?;
            reserved_zero(w, rc as u32, "bpermd Rc")?;
            dis!("bpermd r{},r{},r{}", ra, rs, rb);
            let b: Temp = ctx.tmp(ctx.get_ireg(rb));
            bit_permute(ctx, s, b)
        }
        _ => return unknown(w, "logical X-form"),
    };

    let res: Temp = ctx.tmp(value);
    ctx.put_ireg(ra, mkexpr(res));
    if rc {
        set_cr0(ctx, &mkexpr(res));
    }
    Ok(())
}

/// Leading or trailing zero count of an I32, 32 for zero.
fn count_zeros32(v: Temp, leading: bool) -> Expr {
    let op: Op = if leading { Op::Clz32 } else { Op::Ctz32 };
    ite(binop(Op::CmpEQ32, mkexpr(v), mk_u32(0)), mk_u32(32), unop(op, mkexpr(v)))
}

/// Per-byte population count at mode width.
fn popcount_bytes(ctx: &mut DecodeContext<'_>, s: Temp) -> Expr {
    let ty: IrType = ctx.ty();
    let k = |v: u64| if ty == IrType::I64 { mk_u64(v) } else { mk_u32(v as u32) };
    let (and, add, sub, shr) =
        (Op::sized(SzOp::And, ty), Op::sized(SzOp::Add, ty), Op::sized(SzOp::Sub, ty), Op::sized(SzOp::Shr, ty));
    // x - ((x >> 1) & 0x55..)
    let t1: Temp = ctx.tmp(binop(
        sub,
        mkexpr(s),
        binop(and, binop(shr, mkexpr(s), mk_u8(1)), k(0x5555_5555_5555_5555)),
    ));
    // (x & 0x33..) + ((x >> 2) & 0x33..)
    let t2: Temp = ctx.tmp(binop(
        add,
        binop(and, mkexpr(t1), k(0x3333_3333_3333_3333)),
        binop(and, binop(shr, mkexpr(t1), mk_u8(2)), k(0x3333_3333_3333_3333)),
    ));
    // (x + (x >> 4)) & 0x0f..
    binop(and, binop(add, mkexpr(t2), binop(shr, mkexpr(t2), mk_u8(4))), k(0x0F0F_0F0F_0F0F_0F0F))
}

/// Parity of the least significant bit of each byte, per word or per doubleword.
fn parity(ctx: &mut DecodeContext<'_>, s: Temp, per_word: bool) -> Expr {
    let ty: IrType = ctx.ty();
    let k = |v: u64| if ty == IrType::I64 { mk_u64(v) } else { mk_u32(v as u32) };
    let (and, xor, shr) = (Op::sized(SzOp::And, ty), Op::sized(SzOp::Xor, ty), Op::sized(SzOp::Shr, ty));
    let mut t: Temp = ctx.tmp(binop(and, mkexpr(s), k(0x0101_0101_0101_0101)));
    if !per_word && ty == IrType::I64 {
        t = ctx.tmp(binop(xor, mkexpr(t), binop(shr, mkexpr(t), mk_u8(32))));
    }
    t = ctx.tmp(binop(xor, mkexpr(t), binop(shr, mkexpr(t), mk_u8(16))));
    t = ctx.tmp(binop(xor, mkexpr(t), binop(shr, mkexpr(t), mk_u8(8))));
    let keep: u64 = if per_word { 0x0000_0001_0000_0001 } else { 1 };
    binop(and, mkexpr(t), k(keep))
}

/// bpermd: gather eight bits of `b` selected by the bytes of `s`.
fn bit_permute(ctx: &mut DecodeContext<'_>, s: Temp, b: Temp) -> Expr {
    let mut acc: Expr = mk_u64(0);
    for i in 0..8u32 {
        let idx: Temp = ctx.tmp(binop(
            Op::And64,
            binop(Op::Shr64, mkexpr(s), mk_u8((56 - 8 * i) as u8)),
            mk_u64(0xFF),
        ));
        let amt: Expr = unop(Op::Cast64to8, binop(Op::Sub64, mk_u64(63), mkexpr(idx)));
        let bit: Expr = binop(Op::And64, binop(Op::Shr64, mkexpr(b), amt), mk_u64(1));
        let bit: Expr = ite(binop(Op::CmpLT64U, mkexpr(idx), mk_u64(64)), bit, mk_u64(0));
        acc = binop(Op::Or64, acc, binop(Op::Shl64, bit, mk_u8((7 - i) as u8)));
    }
    acc
}

/// isel: rD := CR[bc] ? (rA|0) : rB.
fn isel(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rd, ra, rb, bc) = (w.rd(), w.ra(), w.rb(), w.rc_field());
    reserved_zero(w, w.rc() as u32, "isel bit 31")?;
    dis!("isel r{},r{},r{},{}", rd, ra, rb, bc);
    let cond: Expr = binop(Op::CmpNE32, ctx.get_cr_bit(bc), mk_u32(0));
    let a: Expr = ctx.ea_ra_or0(ra);
    let b: Expr = ctx.get_ireg(rb);
    let res: Temp = ctx.tmp(ite(cond, a, b));
    ctx.put_ireg(rd, mkexpr(res));
    Ok(())
}
