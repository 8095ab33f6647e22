//! Text rendering of IR, in the usual `t3 = Add32(t1,0x4:I32)` style.
//!
//! Used by the CLI and by `ppcir::ir` trace logging.

use std::fmt;

use super::instruction::{DirtyCall, EffectKind, Expr, IrBlock, Stmt};
use super::types::{Const, Endness, IrType, Temp};

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &str = match self {
            IrType::I1 => "I1",
            IrType::I8 => "I8",
            IrType::I16 => "I16",
            IrType::I32 => "I32",
            IrType::I64 => "I64",
            IrType::I128 => "I128",
            IrType::F32 => "F32",
            IrType::F64 => "F64",
            IrType::D64 => "D64",
            IrType::D128 => "D128",
            IrType::V128 => "V128",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::U1(b) => write!(f, "{}:I1", if *b { 1 } else { 0 }),
            Const::U8(v) => write!(f, "{:#x}:I8", v),
            Const::U16(v) => write!(f, "{:#x}:I16", v),
            Const::U32(v) => write!(f, "{:#x}:I32", v),
            Const::U64(v) => write!(f, "{:#x}:I64", v),
            Const::F32i(v) => write!(f, "F32{{{:#x}}}", v),
            Const::F64i(v) => write!(f, "F64{{{:#x}}}", v),
            Const::V128(v) => write!(f, "V128{{{:#06x}}}", v),
        }
    }
}

fn end_tag(end: Endness) -> &'static str {
    match end {
        Endness::Big => "be",
        Endness::Little => "le",
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", a)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Get { offset, ty } => write!(f, "GET:{}({})", ty, offset),
            Expr::RdTmp(t) => write!(f, "{}", t),
            Expr::Const(c) => write!(f, "{}", c),
            Expr::Unop(op, a) => write!(f, "{:?}({})", op, a),
            Expr::Binop(op, a, b) => write!(f, "{:?}({},{})", op, a, b),
            Expr::Triop(op, a, b, c) => write!(f, "{:?}({},{},{})", op, a, b, c),
            Expr::Qop(op, a, b, c, d) => write!(f, "{:?}({},{},{},{})", op, a, b, c, d),
            Expr::Load { end, ty, addr } => write!(f, "LD{}:{}({})", end_tag(*end), ty, addr),
            Expr::Ite { cond, then, els } => write!(f, "ITE({},{},{})", cond, then, els),
            Expr::CCall { callee, ret_ty, args } => {
                write!(f, "{}{{{:#x}}}(", callee.name, callee.addr)?;
                write_args(f, args)?;
                write!(f, "):{}", ret_ty)
            }
        }
    }
}

fn fx_tag(kind: EffectKind) -> &'static str {
    match kind {
        EffectKind::Read => "RdFX",
        EffectKind::Write => "WrFX",
        EffectKind::Modify => "MoFX",
    }
}

fn write_dirty(f: &mut fmt::Formatter<'_>, d: &DirtyCall) -> fmt::Result {
    f.write_str("DIRTY ")?;
    write!(f, "{} ", d.guard)?;
    if let Some(fx) = &d.mem_fx {
        write!(f, "{}-mem({},{}) ", fx_tag(fx.kind), fx.addr, fx.size)?;
    }
    for g in d.guest_fx.iter() {
        write!(f, "{}-gst({},{}) ", fx_tag(g.kind), g.offset, g.size)?;
    }
    f.write_str(":::")?;
    if let Some(t) = d.tmp {
        write!(f, " {} =", t)?;
    }
    write!(f, " {}(", d.callee.name)?;
    write_args(f, &d.args)?;
    f.write_str(")")
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::IMark { addr, len, delta } => {
                write!(f, "------ IMark({:#x}, {}, {}) ------", addr, len, delta)
            }
            Stmt::WrTmp { tmp, data } => write!(f, "{} = {}", tmp, data),
            Stmt::Put { offset, data } => write!(f, "PUT({}) = {}", offset, data),
            Stmt::Store { end, addr, data } => write!(f, "ST{}({}) = {}", end_tag(*end), addr, data),
            Stmt::Exit { guard, jk, dst, offs_ip } => {
                write!(f, "if ({}) {{ PUT({}) = {}; exit-{:?} }}", guard, offs_ip, dst, jk)
            }
            Stmt::LoadLinked { end, result, addr } => {
                write!(f, "{} = LD{}-Linked({})", result, end_tag(*end), addr)
            }
            Stmt::StoreCond { end, result, addr, data } => {
                write!(f, "{} = ( ST{}-Cond({}) = {} )", result, end_tag(*end), addr, data)
            }
            Stmt::MemFence => f.write_str("IR-MBusEvent-Fence"),
            Stmt::Dirty(d) => write_dirty(f, d),
            Stmt::AbiHint { base, len, nia } => write!(f, "====== AbiHint({}, {}, {}) ======", base, len, nia),
        }
    }
}

impl fmt::Display for IrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IRSB {\n")?;
        for (i, ty) in self.tyenv.iter().enumerate() {
            if i % 8 == 0 {
                f.write_str("   ")?;
            }
            write!(f, "t{}:{} ", i, ty)?;
            if i % 8 == 7 || i + 1 == self.tyenv.len() {
                f.write_str("\n")?;
            }
        }
        f.write_str("\n")?;
        for s in self.stmts.iter() {
            writeln!(f, "   {}", s)?;
        }
        match &self.next {
            Some(next) => writeln!(f, "   PUT({}) = {}; exit-{:?}", self.offs_ip, next, self.jumpkind)?,
            None => writeln!(f, "   (no next)")?,
        }
        f.write_str("}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ir::instruction::{binop, get, mk_u32};
    use crate::frontend::ir::ops::Op;

    #[test]
    fn test_render_expr() {
        let e = binop(Op::Add32, get(16, IrType::I32), mk_u32(4));
        assert_eq!(e.to_string(), "Add32(GET:I32(16),0x4:I32)");
    }

    #[test]
    fn test_render_stmt() {
        let s = Stmt::IMark { addr: 0x1000, len: 4, delta: 0 };
        assert_eq!(s.to_string(), "------ IMark(0x1000, 4, 0) ------");
        let p = Stmt::Put { offset: 8, data: mk_u32(0) };
        assert_eq!(p.to_string(), "PUT(8) = 0x0:I32");
    }
}
