//! Integer loads and stores.
//!
//! Every form reduces to an [`Access`] description plus an effective
//! address; [`emit`] performs the transfer, extension, byte reversal and
//! base-register update uniformly.

use super::{dis, invalid_if, need_mode64, reserved_zero, unknown, Translator};
use crate::frontend::bits::extend_s;
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::ir::{mkexpr, unop, Expr, IrType, Op, Temp};

pub struct IntLoadStore;

impl Translator for IntLoadStore {
    fn name(&self) -> &'static str {
        "load/store"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match w.opc1() {
            32..=45 => d_form(ctx, w),
            56 => quad(ctx, w, false),
            62 if w.xo2() == 2 => quad(ctx, w, true),
            58 | 62 => ds_form(ctx, w),
            31 => x_form(ctx, w),
            _ => unknown(w, "integer load/store"),
        }
    }
}

/// One transfer's shape.
#[derive(Debug, Clone, Copy)]
struct Access {
    name: &'static str,
    ty: IrType,
    signed: bool,
    store: bool,
    update: bool,
    reversed: bool,
}

const fn acc(name: &'static str, ty: IrType, signed: bool, store: bool, update: bool) -> Access {
    Access { name, ty, signed, store, update, reversed: false }
}

const fn rev(name: &'static str, ty: IrType, store: bool) -> Access {
    Access { name, ty, signed: false, store, update: false, reversed: true }
}

fn d_access(opc1: u32) -> Option<Access> {
    use IrType::{I16, I32, I8};
    Some(match opc1 {
        32 => acc("lwz", I32, false, false, false),
        33 => acc("lwzu", I32, false, false, true),
        34 => acc("lbz", I8, false, false, false),
        35 => acc("lbzu", I8, false, false, true),
        36 => acc("stw", I32, false, true, false),
        37 => acc("stwu", I32, false, true, true),
        38 => acc("stb", I8, false, true, false),
        39 => acc("stbu", I8, false, true, true),
        40 => acc("lhz", I16, false, false, false),
        41 => acc("lhzu", I16, false, false, true),
        42 => acc("lha", I16, true, false, false),
        43 => acc("lhau", I16, true, false, true),
        44 => acc("sth", I16, false, true, false),
        45 => acc("sthu", I16, false, true, true),
        _ => return None,
    })
}

fn x_access(xo10: u32) -> Option<Access> {
    use IrType::{I16, I32, I64, I8};
    Some(match xo10 {
        23 => acc("lwzx", I32, false, false, false),
        55 => acc("lwzux", I32, false, false, true),
        87 => acc("lbzx", I8, false, false, false),
        119 => acc("lbzux", I8, false, false, true),
        279 => acc("lhzx", I16, false, false, false),
        311 => acc("lhzux", I16, false, false, true),
        343 => acc("lhax", I16, true, false, false),
        375 => acc("lhaux", I16, true, false, true),
        21 => acc("ldx", I64, false, false, false),
        53 => acc("ldux", I64, false, false, true),
        341 => acc("lwax", I32, true, false, false),
        373 => acc("lwaux", I32, true, false, true),
        151 => acc("stwx", I32, false, true, false),
        183 => acc("stwux", I32, false, true, true),
        215 => acc("stbx", I8, false, true, false),
        247 => acc("stbux", I8, false, true, true),
        407 => acc("sthx", I16, false, true, false),
        439 => acc("sthux", I16, false, true, true),
        149 => acc("stdx", I64, false, true, false),
        181 => acc("stdux", I64, false, true, true),
        790 => rev("lhbrx", I16, false),
        534 => rev("lwbrx", I32, false),
        532 => rev("ldbrx", I64, false),
        918 => rev("sthbrx", I16, true),
        662 => rev("stwbrx", I32, true),
        660 => rev("stdbrx", I64, true),
        _ => return None,
    })
}

fn d_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let Some(a) = d_access(w.opc1()) else {
        return unknown(w, "D-form load/store");
    };
    let (rd, ra) = (w.rd(), w.ra());
    let simm: i64 = w.simm16() as i64;
    dis!("{} r{},{}(r{})", a.name, rd, simm, ra);
    let ea: Expr = if a.update { ctx.ea_ra_simm(ra, simm) } else { ctx.ea_ra_or0_simm(ra, simm) };
    emit(ctx, w, a, ea, rd, ra)
}

fn ds_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    need_mode64(ctx, w, "DS-form load/store")?;
    use IrType::{I32, I64};
    let a: Access = match (w.opc1(), w.xo2()) {
        (58, 0) => acc("ld", I64, false, false, false),
        (58, 1) => acc("ldu", I64, false, false, true),
        (58, 2) => acc("lwa", I32, true, false, false),
        (62, 0) => acc("std", I64, false, true, false),
        (62, 1) => acc("stdu", I64, false, true, true),
        _ => return unknown(w, "DS-form load/store"),
    };
    let (rd, ra) = (w.rd(), w.ra());
    let ds: i64 = w.ds() as i64;
    dis!("{} r{},{}(r{})", a.name, rd, ds, ra);
    let ea: Expr = if a.update { ctx.ea_ra_simm(ra, ds) } else { ctx.ea_ra_or0_simm(ra, ds) };
    emit(ctx, w, a, ea, rd, ra)
}

fn x_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let Some(a) = x_access(w.xo10()) else {
        return unknown(w, "X-form load/store");
    };
    reserved_zero(w, w.rc() as u32, "load/store bit 31")?;
    let (rd, ra, rb) = (w.rd(), w.ra(), w.rb());
    dis!("{} r{},r{},r{}", a.name, rd, ra, rb);
    let ea: Expr = if a.update { ctx.ea_ra_idx(ra, rb) } else { ctx.ea_ra_or0_idx(ra, rb) };
    emit(ctx, w, a, ea, rd, ra)
}

fn byte_reverse(ty: IrType, e: Expr) -> Expr {
    match ty {
        IrType::I16 => unop(Op::Reverse8sIn16, e),
        IrType::I32 => unop(Op::Reverse8sIn32, e),
        IrType::I64 => unop(Op::Reverse8sIn64, e),
        _ => e,
    }
}

/// Perform one access. `rd` is the data register, `ra` the base.
fn emit(ctx: &mut DecodeContext<'_>, w: InsnWord, a: Access, ea: Expr, rd: u32, ra: u32) -> TranslateResult {
    if a.ty == IrType::I64 || (a.ty == IrType::I32 && a.signed) {
        need_mode64(ctx, w, "doubleword access")?;
    }
    if a.update {
        invalid_if(w, ra == 0, "update form with rA = 0")?;
        invalid_if(w, !a.store && ra == rd, "update form with rA = rD")?;
    }

    let ea: Temp = ctx.tmp(ea);
    if a.store {
        let data: Expr = ctx.narrow_from_word(ctx.get_ireg(rd), a.ty);
        let data: Expr = if a.reversed { byte_reverse(a.ty, data) } else { data };
        ctx.store(mkexpr(ea), data);
    } else {
        let mut val: Expr = ctx.load(a.ty, mkexpr(ea));
        if a.reversed {
            val = byte_reverse(a.ty, val);
        }
        let val: Expr = ctx.widen_to_word(val, a.signed);
        ctx.put_ireg(rd, val);
    }
    if a.update {
        ctx.put_ireg(ra, mkexpr(ea));
    }
    Ok(())
}

/// lq / stq: an even/odd register pair as one 16-byte access.
fn quad(ctx: &mut DecodeContext<'_>, w: InsnWord, store: bool) -> TranslateResult {
    need_mode64(ctx, w, "quadword access")?;
    let (rp, ra) = (w.rd(), w.ra());
    invalid_if(w, rp % 2 != 0, "odd register pair")?;
    let disp: i64 = if store {
        w.ds() as i64
    } else {
        reserved_zero(w, w.field(28, 4), "lq reserved")?;
        invalid_if(w, rp == ra, "lq with rA in the target pair")?;
        (extend_s(w.dq() as u64, 12) << 4) as i64
    };
    dis!("{} r{},{}(r{})", if store { "stq" } else { "lq" }, rp, disp, ra);

    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_simm(ra, disp));
    // The even register holds the high doubleword.
    let (hi_addr, lo_addr) = ctx.quad_halves(ea);
    if store {
        ctx.store(hi_addr, ctx.get_ireg(rp));
        ctx.store(lo_addr, ctx.get_ireg(rp + 1));
    } else {
        let hi: Temp = ctx.tmp(ctx.load(IrType::I64, hi_addr));
        let lo: Temp = ctx.tmp(ctx.load(IrType::I64, lo_addr));
        ctx.put_ireg(rp, mkexpr(hi));
        ctx.put_ireg(rp + 1, mkexpr(lo));
    }
    Ok(())
}
