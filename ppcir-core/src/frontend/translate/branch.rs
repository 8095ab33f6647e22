//! Branches: b, bc, bclr, bcctr, bctar.
//!
//! Every branch ends the block, except an unconditional branch to a
//! constant target the resteer predicate accepts, which continues
//! decoding at the target.

use super::{dis, invalid_if, reserved_zero, unknown, Translator};
use crate::frontend::bits::extend_s;
use crate::frontend::context::{DecodeContext, GuestReg, WhatNext};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::ir::{binop, mk_u1, mk_u32, mkexpr, unop, Expr, JumpKind, Op, SzOp, Temp};

pub struct Branch;

impl Translator for Branch {
    fn name(&self) -> &'static str {
        "branch"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match w.opc1() {
            18 => branch_imm(ctx, w),
            16 => branch_cond(ctx, w),
            19 => match w.xo10() {
                16 => branch_reg(ctx, w, Via::Lr),
                528 => branch_reg(ctx, w, Via::Ctr),
                560 => branch_reg(ctx, w, Via::Tar),
                _ => unknown(w, "branch XL-form"),
            },
            _ => unknown(w, "branch"),
        }
    }
}

/// The BO field of a conditional branch, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchOptions {
    /// CTR is decremented and tested (BO bit 2 clear).
    pub decrement_ctr: bool,
    /// With `decrement_ctr`, branch when CTR becomes zero (BO bit 3).
    pub branch_if_ctr_zero: bool,
    /// The CR bit is tested (BO bit 0 clear).
    pub test_cond: bool,
    /// With `test_cond`, branch when the CR bit is set (BO bit 1).
    pub branch_if_true: bool,
}

impl BranchOptions {
    pub const fn decode(bo: u32) -> Self {
        BranchOptions {
            decrement_ctr: bo & 0x04 == 0,
            branch_if_ctr_zero: bo & 0x02 != 0,
            test_cond: bo & 0x10 == 0,
            branch_if_true: bo & 0x08 != 0,
        }
    }

    /// BO = 1z1zz: neither CTR nor CR is consulted.
    #[inline]
    pub const fn is_unconditional(self) -> bool {
        !self.decrement_ctr && !self.test_cond
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Via {
    Lr,
    Ctr,
    Tar,
}

/// Decrement CTR when the options ask for it.
fn update_ctr(ctx: &mut DecodeContext<'_>, opts: BranchOptions) {
    if opts.decrement_ctr {
        let one: Expr = ctx.mk_sz_imm(1);
        let dec: Expr = binop(ctx.sz_op(SzOp::Sub), ctx.get_gst(GuestReg::Ctr), one);
        ctx.put_gst(GuestReg::Ctr, dec);
    }
}

/// I1 "branch taken" condition from the (already updated) CTR and CR bit `bi`.
fn branch_taken(ctx: &mut DecodeContext<'_>, opts: BranchOptions, bi: u32) -> Temp {
    let ctr_ok: Expr = if opts.decrement_ctr {
        let zero: Expr = ctx.mk_sz_imm(0);
        let op: SzOp = if opts.branch_if_ctr_zero { SzOp::CmpEQ } else { SzOp::CmpNE };
        binop(ctx.sz_op(op), ctx.get_gst(GuestReg::Ctr), zero)
    } else {
        mk_u1(true)
    };
    let cond_ok: Expr = if opts.test_cond {
        let bit: Expr = ctx.get_cr_bit(bi);
        let want: u32 = opts.branch_if_true as u32;
        binop(Op::CmpEQ32, bit, mk_u32(want))
    } else {
        mk_u1(true)
    };
    let taken: Expr = match (opts.decrement_ctr, opts.test_cond) {
        (false, false) => mk_u1(true),
        (true, false) => ctr_ok,
        (false, true) => cond_ok,
        (true, true) => binop(Op::And1, ctr_ok, cond_ok),
    };
    ctx.tmp(taken)
}

/// b, ba, bl, bla.
fn branch_imm(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let disp: u64 = extend_s((w.li24() as u64) << 2, 26);
    let target: u64 = ctx.mode_addr(if w.aa() { disp } else { ctx.cia.wrapping_add(disp) });
    let lk: bool = w.lk();
    dis!("b{}{} 0x{:x}", if lk { "l" } else { "" }, if w.aa() { "a" } else { "" }, target);

    if lk {
        let nia: Expr = ctx.mk_sz_imm(ctx.nia());
        ctx.put_gst(GuestReg::Lr, nia);
        if ctx.abi.zap_at_call(target) {
            let t: Expr = ctx.mk_sz_imm(target);
            ctx.redzone_hint(t);
        }
    }

    if (ctx.resteer_ok)(target) {
        ctx.what_next = WhatNext::Resteer { target };
    } else {
        let t: Expr = ctx.mk_sz_imm(target);
        ctx.jump_to(t, if lk { JumpKind::Call } else { JumpKind::Boring });
    }
    Ok(())
}

/// bc, bca, bcl, bcla.
fn branch_cond(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (bo, bi, lk) = (w.bo(), w.bi(), w.lk());
    let disp: u64 = extend_s((w.bd14() as u64) << 2, 16);
    let target: u64 = ctx.mode_addr(if w.aa() { disp } else { ctx.cia.wrapping_add(disp) });
    dis!("bc{}{} 0x{:02x},{},0x{:x}", if lk { "l" } else { "" }, if w.aa() { "a" } else { "" }, bo, bi, target);

    let opts: BranchOptions = BranchOptions::decode(bo);
    update_ctr(ctx, opts);
    let taken: Temp = branch_taken(ctx, opts, bi);
    if lk {
        let nia: Expr = ctx.mk_sz_imm(ctx.nia());
        ctx.put_gst(GuestReg::Lr, nia);
    }
    ctx.exit(mkexpr(taken), if lk { JumpKind::Call } else { JumpKind::Boring }, target);
    ctx.stop_at_nia(JumpKind::Boring);
    Ok(())
}

/// bclr, bcctr, bctar.
fn branch_reg(ctx: &mut DecodeContext<'_>, w: InsnWord, via: Via) -> TranslateResult {
    let (bo, bi, lk) = (w.bo(), w.bi(), w.lk());
    reserved_zero(w, w.field(16, 3), "branch-to-register bits 16..18")?;
    let opts: BranchOptions = BranchOptions::decode(bo);
    invalid_if(w, via == Via::Ctr && opts.decrement_ctr, "bcctr decrementing CTR")?;
    let (name, short, reg) = match via {
        Via::Lr => ("bclr", "blr", GuestReg::Lr),
        Via::Ctr => ("bcctr", "bctr", GuestReg::Ctr),
        Via::Tar => ("bctar", "btar", GuestReg::Tar),
    };
    if opts.is_unconditional() {
        dis!("{}{}", short, if lk { "l" } else { "" });
    } else {
        dis!("{}{} 0x{:02x},{}", name, if lk { "l" } else { "" }, bo, bi);
    }

    // The target is read before CTR or LR change.
    let align: Expr = ctx.mk_sz_imm(!3u64);
    let target: Temp = ctx.tmp(binop(ctx.sz_op(SzOp::And), ctx.get_gst(reg), align));
    update_ctr(ctx, opts);
    let taken: Option<Temp> = if opts.is_unconditional() { None } else { Some(branch_taken(ctx, opts, bi)) };
    if lk {
        let nia: Expr = ctx.mk_sz_imm(ctx.nia());
        ctx.put_gst(GuestReg::Lr, nia);
    }
    if let Some(t) = taken {
        let nia: u64 = ctx.nia();
        ctx.exit(unop(Op::Not1, mkexpr(t)), JumpKind::Boring, nia);
    }

    let jk: JumpKind = match (via, lk) {
        (_, true) => JumpKind::Call,
        (Via::Lr, false) => JumpKind::Ret,
        _ => JumpKind::Boring,
    };
    // Only a plain blr returns from the frame.
    if via == Via::Lr && opts.is_unconditional() && !lk && ctx.abi.zap_redzone_at_blr {
        ctx.redzone_hint(mkexpr(target));
    }
    // blr writes CIA and stops with Ret rather than emitting an always-true exit.
    ctx.jump_to(mkexpr(target), jk);
    Ok(())
}
