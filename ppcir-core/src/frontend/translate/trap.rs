//! Conditional traps: tw, twi, td, tdi.

use super::{dis, need_mode64, reserved_zero, unknown, Translator};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::ir::{binop, mk_u1, mk_u32, mk_u64, mkexpr, Expr, IrType, JumpKind, Op, Temp};

pub struct Trap;

impl Translator for Trap {
    fn name(&self) -> &'static str {
        "trap"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        let (to, ra) = (w.to(), w.ra());
        let (double, rhs): (bool, Option<u32>) = match (w.opc1(), w.xo10()) {
            (3, _) => (false, None),
            (2, _) => (true, None),
            (31, 4) => (false, Some(w.rb())),
            (31, 68) => (true, Some(w.rb())),
            _ => return unknown(w, "trap"),
        };
        if rhs.is_some() {
            reserved_zero(w, w.rc() as u32, "trap bit 31")?;
        }
        if double {
            need_mode64(ctx, w, "doubleword trap")?;
        }
        let name: &str = if double { "td" } else { "tw" };
        match rhs {
            Some(rb) => dis!("{} {},r{},r{}", name, to, ra, rb),
            None => dis!("{}i {},r{},{}", name, to, ra, w.simm16()),
        }

        let ty: IrType = if double { IrType::I64 } else { IrType::I32 };
        let a: Expr = ctx.get_ireg(ra);
        let b: Expr = match rhs {
            Some(rb) => ctx.get_ireg(rb),
            None => ctx.mk_sz_imm(w.simm16() as i64 as u64),
        };
        let (a, b) = if double { (a, b) } else { (ctx.word_to_32(a), ctx.word_to_32(b)) };
        if emit_trap(ctx, to, ty, a, b) {
            ctx.stop_at_nia(JumpKind::Boring);
        }
        Ok(())
    }
}

/// TO bits, most significant first.
const LT: u32 = 0x10;
const GT: u32 = 0x08;
const EQ: u32 = 0x04;
const LTU: u32 = 0x02;
const GTU: u32 = 0x01;

/// Whether TO traps for every operand pair.
pub const fn always_traps(to: u32) -> bool {
    to & (LT | GT | EQ) == (LT | GT | EQ) || to & (EQ | LTU | GTU) == (EQ | LTU | GTU)
}

/// Emit the trap exit. Returns true when the trap is unconditional, in
/// which case nothing after this instruction is reachable.
fn emit_trap(ctx: &mut DecodeContext<'_>, to: u32, ty: IrType, a: Expr, b: Expr) -> bool {
    let cia: u64 = ctx.cia;
    if always_traps(to) {
        ctx.exit(mk_u1(true), JumpKind::SigTrap, cia);
        return true;
    }
    if to == 0 {
        return false;
    }

    let a: Temp = ctx.tmp(a);
    let b: Temp = ctx.tmp(b);
    let (ord_s, ord_u, zero): (Op, Op, Expr) = if ty == IrType::I64 {
        (Op::CmpORD64S, Op::CmpORD64U, mk_u64(0))
    } else {
        (Op::CmpORD32S, Op::CmpORD32U, mk_u32(0))
    };
    let and: Op = if ty == IrType::I64 { Op::And64 } else { Op::And32 };
    let ne: Op = if ty == IrType::I64 { Op::CmpNE64 } else { Op::CmpNE32 };
    let k = |v: u32| if ty == IrType::I64 { mk_u64(v as u64) } else { mk_u32(v) };

    // CmpORD yields 8 (lt), 4 (gt) or 2 (eq).
    let signed: Temp = ctx.tmp(binop(ord_s, mkexpr(a), mkexpr(b)));
    let unsigned: Temp = ctx.tmp(binop(ord_u, mkexpr(a), mkexpr(b)));
    let mut s_mask: u32 = 0;
    if to & LT != 0 {
        s_mask |= 8;
    }
    if to & GT != 0 {
        s_mask |= 4;
    }
    if to & EQ != 0 {
        s_mask |= 2;
    }
    let mut u_mask: u32 = 0;
    if to & LTU != 0 {
        u_mask |= 8;
    }
    if to & GTU != 0 {
        u_mask |= 4;
    }

    let mut cond: Option<Expr> = None;
    for (t, mask) in [(signed, s_mask), (unsigned, u_mask)] {
        if mask == 0 {
            continue;
        }
        let hit: Expr = binop(ne, binop(and, mkexpr(t), k(mask)), zero.clone());
        cond = Some(match cond {
            Some(c) => binop(Op::Or1, c, hit),
            None => hit,
        });
    }
    if let Some(c) = cond {
        ctx.exit(c, JumpKind::SigTrap, cia);
    }
    false
}
