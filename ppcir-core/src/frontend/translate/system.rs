//! System call, special-purpose registers, cache management and
//! synchronization.

use smallvec::SmallVec;

use super::{dis, reserved_zero, unknown, Translator};
use crate::frontend::bits::align_down;
use crate::frontend::context::{vscr, DecodeContext, GuestReg};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::{DecodeFailure, TranslateResult};
use crate::frontend::helpers::{callee, Helper};
use crate::frontend::ir::{
    binop, mk_u1, mk_u32, mk_u64, mk_u8, mkexpr, unop, DirtyCall, Expr, IrType, JumpKind, Op,
    SzOp, Temp,
};

pub struct System;

impl Translator for System {
    fn name(&self) -> &'static str {
        "system"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match (w.opc1(), w.xo10()) {
            (17, _) => syscall(ctx, w),
            (19, 150) => isync(ctx, w),
            (31, 339) => mfspr(ctx, w),
            (31, 467) => mtspr(ctx, w),
            (31, 371) => mftb(ctx, w),
            (31, 598) | (31, 854) => sync(ctx, w),
            (31, 62) => wait(ctx, w),
            (31, 86) | (31, 54) | (31, 278) | (31, 246) | (31, 1014) | (31, 982) => cache(ctx, w),
            (4, _) if w.vx_xo11() == 1540 || w.vx_xo11() == 1604 => vscr_move(ctx, w),
            _ => unknown(w, "system"),
        }
    }
}

/// User-accessible SPR numbers.
pub mod spr {
    pub const XER: u32 = 1;
    pub const DSCR: u32 = 3;
    pub const LR: u32 = 8;
    pub const CTR: u32 = 9;
    pub const TFHAR: u32 = 128;
    pub const TFIAR: u32 = 129;
    pub const TEXASR: u32 = 130;
    pub const TEXASRU: u32 = 131;
    pub const PSPB: u32 = 159;
    pub const VRSAVE: u32 = 256;
    pub const SPRG3: u32 = 259;
    pub const TB: u32 = 268;
    pub const TBU: u32 = 269;
    pub const TAR: u32 = 815;
    pub const PPR: u32 = 896;
    pub const PPR32: u32 = 898;
}

/// sc: only the plain LEV=0 encoding is accepted.
fn syscall(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    if w.raw() != 0x4400_0002 {
        return Err(DecodeFailure::reserved(w.raw(), "sc with non-zero fields"));
    }
    dis!("sc");
    let cia: Expr = ctx.mk_sz_imm(ctx.cia);
    ctx.put_gst(GuestReg::IpAtSyscall, cia);
    ctx.stop_at_nia(JumpKind::SysSyscall);
    Ok(())
}

fn isync(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.field(6, 15), "isync bits 6..20")?;
    reserved_zero(w, w.rc() as u32, "isync bit 31")?;
    dis!("isync");
    ctx.ir.fence();
    Ok(())
}

/// sync (L = 0, 1, 2) and eieio.
fn sync(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "sync bit 31")?;
    if w.xo10() == 854 {
        reserved_zero(w, w.field(6, 15), "eieio bits 6..20")?;
        dis!("eieio");
    } else {
        reserved_zero(w, w.field(6, 3), "sync bits 6..8")?;
        reserved_zero(w, w.field(11, 10), "sync bits 11..20")?;
        let l: u32 = w.field(9, 2);
        match l {
            0 => dis!("sync"),
            1 => dis!("lwsync"),
            2 => dis!("ptesync"),
            _ => return Err(DecodeFailure::invalid(w.raw(), "sync L = 3")),
        }
    }
    ctx.ir.fence();
    Ok(())
}

/// wait: treated as a yield to the scheduler.
fn wait(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "wait bit 31")?;
    dis!("wait");
    ctx.stop_at_nia(JumpKind::Yield);
    Ok(())
}

/// Dirty call reading the host time base.
fn read_timebase(ctx: &mut DecodeContext<'_>) -> Temp {
    let t: Temp = ctx.new_temp(IrType::I64);
    let call: DirtyCall = DirtyCall {
        callee: callee(Helper::ReadTimeBase, ctx.abi),
        guard: mk_u1(true),
        args: SmallVec::new(),
        tmp: Some(t),
        mem_fx: None,
        guest_fx: SmallVec::new(),
    };
    ctx.ir.dirty(call);
    t
}

/// Time base (or its upper half) at mode width.
fn timebase_value(ctx: &mut DecodeContext<'_>, upper: bool) -> Expr {
    let tb: Temp = read_timebase(ctx);
    let v: Expr = if upper { binop(Op::Shr64, mkexpr(tb), mk_u8(32)) } else { mkexpr(tb) };
    if ctx.mode64 {
        v
    } else {
        unop(Op::Cast64to32, v)
    }
}

fn mftb(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "mftb bit 31")?;
    let rd: u32 = w.rd();
    let v: Expr = match w.tbr() {
        spr::TB => {
            dis!("mftb r{}", rd);
            timebase_value(ctx, false)
        }
        spr::TBU => {
            dis!("mftbu r{}", rd);
            timebase_value(ctx, true)
        }
        _ => return unknown(w, "mftb TBR"),
    };
    ctx.put_ireg(rd, v);
    Ok(())
}

/// A 64-bit register viewed at mode width.
fn i64_to_word(ctx: &DecodeContext<'_>, e: Expr) -> Expr {
    if ctx.mode64 {
        e
    } else {
        unop(Op::Cast64to32, e)
    }
}

fn mfspr(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "mfspr bit 31")?;
    let rd: u32 = w.rd();
    let n: u32 = w.spr();
    dis!("mfspr r{},{}", rd, n);
    let v: Expr = match n {
        spr::XER => {
            let xer: Expr = ctx.get_gst(GuestReg::Xer);
            ctx.widen_to_word(xer, false)
        }
        spr::LR => ctx.get_gst(GuestReg::Lr),
        spr::CTR => ctx.get_gst(GuestReg::Ctr),
        spr::TAR => ctx.get_gst(GuestReg::Tar),
        spr::SPRG3 => ctx.get_gst(GuestReg::Sprg3Ro),
        spr::VRSAVE => {
            let v: Expr = ctx.get_gst(GuestReg::Vrsave);
            ctx.widen_to_word(v, false)
        }
        spr::TB => timebase_value(ctx, false),
        spr::TBU => timebase_value(ctx, true),
        spr::PPR | spr::DSCR | spr::TFHAR | spr::TFIAR | spr::TEXASR => {
            let reg: GuestReg = match n {
                spr::PPR => GuestReg::Ppr,
                spr::DSCR => GuestReg::Dscr,
                spr::TFHAR => GuestReg::Tfhar,
                spr::TFIAR => GuestReg::Tfiar,
                _ => GuestReg::Texasr,
            };
            let v: Expr = ctx.get_gst(reg);
            i64_to_word(ctx, v)
        }
        spr::PPR32 => {
            let hi: Expr = binop(Op::Shr64, ctx.get_gst(GuestReg::Ppr), mk_u8(32));
            i64_to_word(ctx, hi)
        }
        spr::TEXASRU | spr::PSPB => {
            let reg: GuestReg = if n == spr::TEXASRU { GuestReg::Texasru } else { GuestReg::Pspb };
            let v: Expr = ctx.get_gst(reg);
            ctx.widen_to_word(v, false)
        }
        _ => return unknown(w, "mfspr SPR"),
    };
    let t: Temp = ctx.tmp(v);
    ctx.put_ireg(rd, mkexpr(t));
    Ok(())
}

fn mtspr(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "mtspr bit 31")?;
    let rs: u32 = w.rs();
    let n: u32 = w.spr();
    dis!("mtspr {},r{}", n, rs);
    let s: Temp = ctx.tmp(ctx.get_ireg(rs));
    match n {
        spr::XER => {
            let v: Expr = ctx.word_to_32(mkexpr(s));
            ctx.put_gst(GuestReg::Xer, v);
        }
        spr::LR => ctx.put_gst(GuestReg::Lr, mkexpr(s)),
        spr::CTR => ctx.put_gst(GuestReg::Ctr, mkexpr(s)),
        spr::TAR => ctx.put_gst(GuestReg::Tar, mkexpr(s)),
        spr::VRSAVE => {
            let v: Expr = ctx.word_to_32(mkexpr(s));
            ctx.put_gst(GuestReg::Vrsave, v);
        }
        spr::PPR | spr::DSCR | spr::TFHAR | spr::TFIAR | spr::TEXASR => {
            let reg: GuestReg = match n {
                spr::PPR => GuestReg::Ppr,
                spr::DSCR => GuestReg::Dscr,
                spr::TFHAR => GuestReg::Tfhar,
                spr::TFIAR => GuestReg::Tfiar,
                _ => GuestReg::Texasr,
            };
            let v: Expr = ctx.word_to_64(mkexpr(s), false);
            ctx.put_gst(reg, v);
        }
        spr::PPR32 => {
            let hi: Expr = binop(Op::Shl64, ctx.word_to_64(mkexpr(s), false), mk_u8(32));
            let lo: Expr = binop(Op::And64, ctx.get_gst(GuestReg::Ppr), mk_u64(0xFFFF_FFFF));
            ctx.put_gst(GuestReg::Ppr, binop(Op::Or64, hi, lo));
        }
        spr::TEXASRU | spr::PSPB => {
            let reg: GuestReg = if n == spr::TEXASRU { GuestReg::Texasru } else { GuestReg::Pspb };
            let v: Expr = ctx.word_to_32(mkexpr(s));
            ctx.put_gst(reg, v);
        }
        _ => return unknown(w, "mtspr SPR"),
    }
    Ok(())
}

/// dcbf, dcbst, dcbt, dcbtst, dcbz, dcbzl, icbi.
fn cache(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "cache op bit 31")?;
    let (ra, rb) = (w.ra(), w.rb());
    match w.xo10() {
        86 => {
            reserved_zero(w, w.field(6, 3), "dcbf bits 6..8")?;
            dis!("dcbf r{},r{}", ra, rb);
        }
        54 => {
            reserved_zero(w, w.rd(), "dcbst bits 6..10")?;
            dis!("dcbst r{},r{}", ra, rb);
        }
        278 => dis!("dcbt r{},r{}", ra, rb),
        246 => dis!("dcbtst r{},r{}", ra, rb),
        1014 => {
            reserved_zero(w, w.field(6, 4), "dcbz bits 6..9")?;
            let long: bool = w.field(10, 1) == 1;
            dis!("dcbz{} r{},r{}", if long { "l" } else { "" }, ra, rb);
            let size: u32 = if long { ctx.arch_info.dcbzl_szb } else { ctx.arch_info.dcbz_szb };
            zero_block(ctx, ra, rb, size);
        }
        _ => {
            reserved_zero(w, w.rd(), "icbi bits 6..10")?;
            dis!("icbi r{},r{}", ra, rb);
            invalidate_icache(ctx, ra, rb);
        }
    }
    Ok(())
}

/// Zero the naturally aligned block of `size` bytes containing (rA|0)+rB.
fn zero_block(ctx: &mut DecodeContext<'_>, ra: u32, rb: u32, size: u32) {
    let ea: Expr = ctx.ea_ra_or0_idx(ra, rb);
    let base: Temp = ctx.tmp(binop(ctx.sz_op(SzOp::And), ea, ctx.mk_sz_imm(align_down(u64::MAX, size as u64))));
    let step: u32 = ctx.ty().size_bytes();
    for off in (0..size).step_by(step as usize) {
        let addr: Expr = ctx.addr_plus(mkexpr(base), off as u64);
        let zero: Expr = ctx.mk_sz_imm(0);
        ctx.store(addr, zero);
    }
}

/// icbi: record the I-cache line as the range to invalidate and end the block.
fn invalidate_icache(ctx: &mut DecodeContext<'_>, ra: u32, rb: u32) {
    let line: u32 = ctx.arch_info.icache_line_szb;
    let ea: Expr = ctx.ea_ra_or0_idx(ra, rb);
    let base: Temp = ctx.tmp(binop(ctx.sz_op(SzOp::And), ea, ctx.mk_sz_imm(align_down(u64::MAX, line as u64))));
    ctx.put_gst(GuestReg::CmStart, mkexpr(base));
    let len: Expr = ctx.mk_sz_imm(line as u64);
    ctx.put_gst(GuestReg::CmLen, len);
    ctx.ir.fence();
    ctx.stop_at_nia(JumpKind::InvalICache);
}

/// mfvscr, mtvscr.
fn vscr_move(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    if w.vx_xo11() == 1540 {
        reserved_zero(w, w.ra() | w.rb(), "mfvscr vA/vB")?;
        let vd: u32 = w.rd();
        dis!("mfvscr v{}", vd);
        let v: Expr = unop(Op::Cast32UtoV128, ctx.get_gst(GuestReg::Vscr));
        ctx.put_vreg(vd, v);
    } else {
        reserved_zero(w, w.rd() | w.ra(), "mtvscr vD/vA")?;
        let vb: u32 = w.rb();
        dis!("mtvscr v{}", vb);
        let low: Expr = unop(Op::CastV128to32, ctx.get_vreg(vb));
        ctx.put_gst(GuestReg::Vscr, binop(Op::And32, low, mk_u32(vscr::SAT | vscr::NJ)));
    }
    Ok(())
}
