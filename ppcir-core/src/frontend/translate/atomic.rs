//! Load-and-reserve and store-conditional.
//!
//! Reservation addresses must be naturally aligned; a misaligned address
//! leaves the block with a SIGBUS at the instruction.

use super::{dis, invalid_if, need_mode64, unknown, Translator};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::ir::{binop, mk_u8, mkexpr, unop, Endness, Expr, IrType, Op, Temp};

pub struct Atomic;

impl Translator for Atomic {
    fn name(&self) -> &'static str {
        "atomic"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        let xo: u32 = w.xo10();
        match xo {
            52 | 116 | 20 | 84 => load_reserve(ctx, w, width_of(xo)),
            694 | 726 | 150 | 214 => store_conditional(ctx, w, width_of(xo)),
            276 => load_reserve_quad(ctx, w),
            182 => store_conditional_quad(ctx, w),
            _ => unknown(w, "atomic"),
        }
    }
}

fn width_of(xo: u32) -> IrType {
    match xo {
        52 | 694 => IrType::I8,
        116 | 726 => IrType::I16,
        20 | 150 => IrType::I32,
        _ => IrType::I64,
    }
}

fn suffix(ty: IrType) -> &'static str {
    match ty {
        IrType::I8 => "b",
        IrType::I16 => "h",
        IrType::I32 => "w",
        _ => "d",
    }
}

fn load_reserve(ctx: &mut DecodeContext<'_>, w: InsnWord, ty: IrType) -> TranslateResult {
    if ty == IrType::I64 {
        need_mode64(ctx, w, "ldarx")?;
    }
    let (rd, ra, rb) = (w.rd(), w.ra(), w.rb());
    dis!("l{}arx r{},r{},r{},{}", suffix(ty), rd, ra, rb, w.rc() as u32);
    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_idx(ra, rb));
    ctx.sigbus_if_misaligned(ea, ty.size_bytes() as u64);
    let res: Temp = ctx.new_temp(ty);
    let end: Endness = ctx.host_end;
    ctx.ir.load_linked(end, res, mkexpr(ea));
    let v: Expr = ctx.widen_to_word(mkexpr(res), false);
    ctx.put_ireg(rd, v);
    Ok(())
}

/// CR0 := 0b00 || success || SO.
fn set_cr0_from_store(ctx: &mut DecodeContext<'_>, ok: Temp) {
    ctx.put_cr321(0, binop(Op::Shl8, unop(Op::Cast1Uto8, mkexpr(ok)), mk_u8(1)));
    let so: Expr = ctx.get_xer_so();
    ctx.put_cr0(0, so);
}

fn store_conditional(ctx: &mut DecodeContext<'_>, w: InsnWord, ty: IrType) -> TranslateResult {
    if ty == IrType::I64 {
        need_mode64(ctx, w, "stdcx.")?;
    }
    invalid_if(w, !w.rc(), "store-conditional without record bit")?;
    let (rs, ra, rb) = (w.rs(), w.ra(), w.rb());
    dis!("st{}cx. r{},r{},r{}", suffix(ty), rs, ra, rb);
    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_idx(ra, rb));
    ctx.sigbus_if_misaligned(ea, ty.size_bytes() as u64);
    let data: Expr = ctx.narrow_from_word(ctx.get_ireg(rs), ty);
    let ok: Temp = ctx.new_temp(IrType::I1);
    let end: Endness = ctx.host_end;
    ctx.ir.store_conditional(end, ok, mkexpr(ea), data);
    set_cr0_from_store(ctx, ok);
    Ok(())
}

fn load_reserve_quad(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    need_mode64(ctx, w, "lqarx")?;
    let (rd, ra, rb) = (w.rd(), w.ra(), w.rb());
    invalid_if(w, rd % 2 != 0, "lqarx odd target")?;
    invalid_if(w, rd == ra || rd == rb, "lqarx target overlaps address registers")?;
    dis!("lqarx r{},r{},r{}", rd, ra, rb);
    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_idx(ra, rb));
    ctx.sigbus_if_misaligned(ea, 16);
    let (hi_addr, lo_addr) = ctx.quad_halves(ea);
    let hi: Temp = ctx.new_temp(IrType::I64);
    let lo: Temp = ctx.new_temp(IrType::I64);
    let end: Endness = ctx.host_end;
    ctx.ir.load_linked(end, hi, hi_addr);
    ctx.ir.load_linked(end, lo, lo_addr);
    ctx.put_ireg(rd, mkexpr(hi));
    ctx.put_ireg(rd + 1, mkexpr(lo));
    Ok(())
}

fn store_conditional_quad(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    need_mode64(ctx, w, "stqcx.")?;
    invalid_if(w, !w.rc(), "store-conditional without record bit")?;
    let (rs, ra, rb) = (w.rs(), w.ra(), w.rb());
    invalid_if(w, rs % 2 != 0, "stqcx. odd source")?;
    dis!("stqcx. r{},r{},r{}", rs, ra, rb);
    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_idx(ra, rb));
    ctx.sigbus_if_misaligned(ea, 16);
    let (hi_addr, lo_addr) = ctx.quad_halves(ea);
    let ok: Temp = ctx.new_temp(IrType::I1);
    let end: Endness = ctx.host_end;
    let hi: Expr = ctx.get_ireg(rs);
    ctx.ir.store_conditional(end, ok, hi_addr, hi);
    ctx.store(lo_addr, ctx.get_ireg(rs + 1));
    set_cr0_from_store(ctx, ok);
    Ok(())
}
