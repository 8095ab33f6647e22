//! Load/store multiple and string forms.
//!
//! String transfers move one byte at a time, filling each register from
//! its most significant byte of the low word. The indexed forms take
//! their length from XER's byte count at run time, so they emit an early
//! exit before every byte and end the block at this instruction.

use super::{dis, invalid_if, unknown, Translator};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::ir::{binop, mk_u32, mk_u8, mkexpr, unop, Expr, IrType, JumpKind, Op, SzOp, Temp};

pub struct LoadStoreMultiple;

impl Translator for LoadStoreMultiple {
    fn name(&self) -> &'static str {
        "multiple/string"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match (w.opc1(), w.xo10()) {
            (46, _) | (47, _) => multiple(ctx, w),
            (31, 597) | (31, 533) | (31, 725) | (31, 661) => string(ctx, w),
            _ => unknown(w, "load/store multiple"),
        }
    }
}

/// lmw, stmw: registers rD..r31 as consecutive words.
fn multiple(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rd, ra) = (w.rd(), w.ra());
    let simm: i64 = w.simm16() as i64;
    let load: bool = w.opc1() == 46;
    if load {
        invalid_if(w, ra >= rd, "lmw with rA in the loaded range")?;
    }
    dis!("{} r{},{}(r{})", if load { "lmw" } else { "stmw" }, rd, simm, ra);

    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_simm(ra, simm));
    for (i, r) in (rd..32).enumerate() {
        let addr: Expr = ctx.addr_plus(mkexpr(ea), 4 * i as u64);
        if load {
            let word: Expr = ctx.load(IrType::I32, addr);
            let v: Expr = ctx.widen_to_word(word, false);
            ctx.put_ireg(r, v);
        } else {
            let v: Expr = ctx.word_to_32(ctx.get_ireg(r));
            ctx.store(addr, v);
        }
    }
    Ok(())
}

fn string(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (rd, ra, rb) = (w.rd(), w.ra(), w.rb());
    let load: bool = matches!(w.xo10(), 597 | 533);
    let immediate: bool = matches!(w.xo10(), 597 | 725);

    if immediate {
        let nb: u32 = if rb == 0 { 32 } else { rb };
        if load {
            let regs: u32 = nb.div_ceil(4);
            let hits_ra: bool = (0..regs).any(|k| (rd + k) % 32 == ra) && ra != 0;
            invalid_if(w, hits_ra, "lswi with rA in the loaded range")?;
        }
        dis!("{} r{},r{},{}", if load { "lswi" } else { "stswi" }, rd, ra, nb);
        let ea: Temp = ctx.tmp(ctx.ea_ra_or0(ra));
        transfer(ctx, ea, rd, load, nb, None);
    } else {
        if load {
            invalid_if(w, rd == ra || rd == rb, "lswx with rD = rA or rB")?;
        }
        dis!("{} r{},r{},r{}", if load { "lswx" } else { "stswx" }, rd, ra, rb);
        let ea: Temp = ctx.tmp(ctx.ea_ra_or0_idx(ra, rb));
        let nbytes: Temp = ctx.tmp(unop(Op::Cast8Uto32, ctx.get_xer_bc()));
        transfer(ctx, ea, rd, load, 128, Some(nbytes));
        ctx.stop_at_nia(JumpKind::Boring);
    }
    Ok(())
}

/// Move up to `max` bytes starting at register `rd`. With `runtime_len`,
/// each byte is preceded by an exit to the next instruction once the
/// count is exhausted.
fn transfer(ctx: &mut DecodeContext<'_>, ea: Temp, rd: u32, load: bool, max: u32, runtime_len: Option<Temp>) {
    let mut reg: u32 = rd;
    let mut shift: u32 = 24;
    let nia: u64 = ctx.nia();
    for i in 0..max {
        if let Some(n) = runtime_len {
            let done: Expr = binop(Op::CmpLT32U, mkexpr(n), mk_u32(i + 1));
            ctx.exit(done, JumpKind::Boring, nia);
        }
        if i > 0 && i % 4 == 0 {
            reg = (reg + 1) % 32;
            shift = 24;
        }
        let addr: Expr = ctx.addr_plus(mkexpr(ea), i as u64);
        if load {
            if i % 4 == 0 {
                let zero: Expr = ctx.mk_sz_imm(0);
                ctx.put_ireg(reg, zero);
            }
            let byte: Expr = ctx.widen_to_word(ctx.load(IrType::I8, addr), false);
            let placed: Expr = binop(ctx.sz_op(SzOp::Shl), byte, mk_u8(shift as u8));
            let merged: Expr = binop(ctx.sz_op(SzOp::Or), ctx.get_ireg(reg), placed);
            ctx.put_ireg(reg, merged);
        } else {
            let word: Expr = ctx.word_to_32(ctx.get_ireg(reg));
            let byte: Expr = unop(Op::Cast32to8, binop(Op::Shr32, word, mk_u8(shift as u8)));
            ctx.store(addr, byte);
        }
        shift = shift.wrapping_sub(8);
    }
}
