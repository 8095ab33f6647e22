//! IR expressions, statements and blocks.
//!
//! # Expressions
//! Expressions are trees of [`Expr`]. Every node has a single type that is
//! computed by [`Expr::type_of`] from operator signatures and the block's
//! temporary type environment. Translators build them through the small
//! constructor functions at the bottom of this module (`binop`, `mk_u32`,
//! `mkexpr`, ...).
//!
//! # Statements
//! A block is a flat list of [`Stmt`] with a final `next` target and jump
//! kind. Side effects on guest state, memory and control flow only happen
//! through statements.

use smallvec::SmallVec;

use super::ops::Op;
use super::types::{Const, Endness, IrType, JumpKind, Temp};

/// Descriptor of a pure or dirty helper function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Callee {
    /// Symbolic helper name.
    pub name: &'static str,
    /// Entry point of the helper as seen by the host.
    pub addr: usize,
    /// Number of arguments passed in registers.
    pub regparms: u32,
}

/// IR expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Read a guest-state slot of the given type.
    Get { offset: u32, ty: IrType },
    /// Read a temporary.
    RdTmp(Temp),
    Const(Const),
    Unop(Op, Box<Expr>),
    Binop(Op, Box<Expr>, Box<Expr>),
    Triop(Op, Box<Expr>, Box<Expr>, Box<Expr>),
    Qop(Op, Box<Expr>, Box<Expr>, Box<Expr>, Box<Expr>),
    /// Memory read.
    Load { end: Endness, ty: IrType, addr: Box<Expr> },
    /// `cond ? then : els`; `cond` is `I1`.
    Ite { cond: Box<Expr>, then: Box<Expr>, els: Box<Expr> },
    /// Call to a pure helper.
    CCall { callee: Callee, ret_ty: IrType, args: Vec<Expr> },
}

/// Lookup of temporary types, implemented by blocks and staging builders.
pub trait TypeEnv {
    fn temp_type(&self, t: Temp) -> IrType;
}

impl Expr {
    /// Type of this expression. Does not validate operand types; see
    /// [`Expr::check`] for that.
    pub fn type_of(&self, env: &dyn TypeEnv) -> IrType {
        match self {
            Expr::Get { ty, .. } => *ty,
            Expr::RdTmp(t) => env.temp_type(*t),
            Expr::Const(c) => c.ty(),
            Expr::Unop(op, ..) | Expr::Binop(op, ..) | Expr::Triop(op, ..) | Expr::Qop(op, ..) => {
                op.signature().ret
            }
            Expr::Load { ty, .. } => *ty,
            Expr::Ite { then, .. } => then.type_of(env),
            Expr::CCall { ret_ty, .. } => *ret_ty,
        }
    }

    /// Type-check the whole tree and return its type.
    ///
    /// Panics on any operand/signature mismatch; an ill-typed tree is a
    /// translator bug, never a property of the guest code.
    pub fn check(&self, env: &dyn TypeEnv) -> IrType {
        match self {
            Expr::Get { .. } | Expr::RdTmp(_) | Expr::Const(_) => self.type_of(env),
            Expr::Unop(op, a) => check_op(*op, &[a], env),
            Expr::Binop(op, a, b) => check_op(*op, &[a, b], env),
            Expr::Triop(op, a, b, c) => check_op(*op, &[a, b, c], env),
            Expr::Qop(op, a, b, c, d) => check_op(*op, &[a, b, c, d], env),
            Expr::Load { ty, addr, .. } => {
                let aty: IrType = addr.check(env);
                assert!(
                    aty == IrType::I32 || aty == IrType::I64,
                    "load address must be I32 or I64, got {:?}",
                    aty
                );
                *ty
            }
            Expr::Ite { cond, then, els } => {
                assert_eq!(cond.check(env), IrType::I1, "ITE condition must be I1");
                let t: IrType = then.check(env);
                let e: IrType = els.check(env);
                assert_eq!(t, e, "ITE arms differ in type");
                t
            }
            Expr::CCall { ret_ty, args, .. } => {
                for a in args.iter() {
                    a.check(env);
                }
                *ret_ty
            }
        }
    }

    /// Constant payload if this expression is a literal.
    #[inline]
    pub fn as_const(&self) -> Option<Const> {
        match self {
            Expr::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// Visit every temporary read by this expression.
    pub fn for_each_temp(&self, f: &mut dyn FnMut(Temp)) {
        match self {
            Expr::Get { .. } | Expr::Const(_) => {}
            Expr::RdTmp(t) => f(*t),
            Expr::Unop(_, a) => a.for_each_temp(f),
            Expr::Binop(_, a, b) => {
                a.for_each_temp(f);
                b.for_each_temp(f);
            }
            Expr::Triop(_, a, b, c) => {
                a.for_each_temp(f);
                b.for_each_temp(f);
                c.for_each_temp(f);
            }
            Expr::Qop(_, a, b, c, d) => {
                a.for_each_temp(f);
                b.for_each_temp(f);
                c.for_each_temp(f);
                d.for_each_temp(f);
            }
            Expr::Load { addr, .. } => addr.for_each_temp(f),
            Expr::Ite { cond, then, els } => {
                cond.for_each_temp(f);
                then.for_each_temp(f);
                els.for_each_temp(f);
            }
            Expr::CCall { args, .. } => {
                for a in args.iter() {
                    a.for_each_temp(f);
                }
            }
        }
    }
}

fn check_op(op: Op, args: &[&Expr], env: &dyn TypeEnv) -> IrType {
    let sig = op.signature();
    assert_eq!(sig.arity(), args.len(), "{:?} applied to {} operands", op, args.len());
    for (i, (arg, want)) in args.iter().zip(sig.args.iter()).enumerate() {
        let got: IrType = arg.check(env);
        assert_eq!(got, *want, "{:?} operand {} has type {:?}, expected {:?}", op, i, got, want);
    }
    sig.ret
}

/// Access kind of a dirty helper's declared effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Read,
    Write,
    Modify,
}

/// Memory range a dirty helper touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemEffect {
    pub kind: EffectKind,
    pub addr: Expr,
    pub size: u32,
}

/// Guest-state range a dirty helper touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuestEffect {
    pub kind: EffectKind,
    pub offset: u32,
    pub size: u32,
}

/// Call to a helper with side effects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirtyCall {
    pub callee: Callee,
    /// `I1`; the call only happens when it holds.
    pub guard: Expr,
    pub args: SmallVec<[Expr; 4]>,
    /// Temporary receiving the return value, if any.
    pub tmp: Option<Temp>,
    pub mem_fx: Option<MemEffect>,
    pub guest_fx: SmallVec<[GuestEffect; 2]>,
}

/// IR statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// Marks the start of a guest instruction.
    IMark { addr: u64, len: u32, delta: u8 },
    /// Bind a temporary. Each temporary is bound exactly once.
    WrTmp { tmp: Temp, data: Expr },
    /// Write a guest-state slot.
    Put { offset: u32, data: Expr },
    /// Memory write.
    Store { end: Endness, addr: Expr, data: Expr },
    /// Conditional side exit to a constant guest address.
    Exit { guard: Expr, jk: JumpKind, dst: Const, offs_ip: u32 },
    /// Load-linked: `result := *addr` and set a reservation.
    LoadLinked { end: Endness, result: Temp, addr: Expr },
    /// Store-conditional: `result` (`I1`) is set when the store happened.
    StoreCond { end: Endness, result: Temp, addr: Expr, data: Expr },
    /// Memory barrier.
    MemFence,
    Dirty(Box<DirtyCall>),
    /// ABI hint: `[base, base+len)` became undefined; `nia` is the
    /// address execution continues at.
    AbiHint { base: Expr, len: u32, nia: Expr },
}

/// A superblock of translated guest code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrBlock {
    /// Type of every temporary, indexed by [`Temp::index`].
    pub tyenv: Vec<IrType>,
    pub stmts: Vec<Stmt>,
    /// Fall-through target, set by whoever ends the block.
    pub next: Option<Expr>,
    pub jumpkind: JumpKind,
    /// Guest-state offset of the program counter.
    pub offs_ip: u32,
}

impl IrBlock {
    pub fn new(offs_ip: u32) -> Self {
        Self {
            tyenv: Vec::new(),
            stmts: Vec::new(),
            next: None,
            jumpkind: JumpKind::Boring,
            offs_ip,
        }
    }

    /// Allocate a temporary directly in the block. Used by block drivers
    /// outside per-instruction staging.
    pub fn new_temp(&mut self, ty: IrType) -> Temp {
        let t = Temp(self.tyenv.len() as u32);
        self.tyenv.push(ty);
        t
    }
}

impl TypeEnv for IrBlock {
    fn temp_type(&self, t: Temp) -> IrType {
        self.tyenv[t.0 as usize]
    }
}

// Constructors.

#[inline]
pub fn mkexpr(t: Temp) -> Expr {
    Expr::RdTmp(t)
}

#[inline]
pub fn mk_u1(b: bool) -> Expr {
    Expr::Const(Const::U1(b))
}

#[inline]
pub fn mk_u8(v: u8) -> Expr {
    Expr::Const(Const::U8(v))
}

#[inline]
pub fn mk_u16(v: u16) -> Expr {
    Expr::Const(Const::U16(v))
}

#[inline]
pub fn mk_u32(v: u32) -> Expr {
    Expr::Const(Const::U32(v))
}

#[inline]
pub fn mk_u64(v: u64) -> Expr {
    Expr::Const(Const::U64(v))
}

#[inline]
pub fn mk_f64i(bits: u64) -> Expr {
    Expr::Const(Const::F64i(bits))
}

/// Vector constant; see [`Const::V128`] for the mask format.
#[inline]
pub fn mk_v128(mask: u16) -> Expr {
    Expr::Const(Const::V128(mask))
}

/// Arbitrary 128-bit vector built from two 64-bit halves.
pub fn mk_v128_bits(hi: u64, lo: u64) -> Expr {
    binop(Op::Cat64HLtoV128, mk_u64(hi), mk_u64(lo))
}

#[inline]
pub fn get(offset: u32, ty: IrType) -> Expr {
    Expr::Get { offset, ty }
}

#[inline]
pub fn unop(op: Op, a: Expr) -> Expr {
    Expr::Unop(op, Box::new(a))
}

#[inline]
pub fn binop(op: Op, a: Expr, b: Expr) -> Expr {
    Expr::Binop(op, Box::new(a), Box::new(b))
}

#[inline]
pub fn triop(op: Op, a: Expr, b: Expr, c: Expr) -> Expr {
    Expr::Triop(op, Box::new(a), Box::new(b), Box::new(c))
}

#[inline]
pub fn qop(op: Op, a: Expr, b: Expr, c: Expr, d: Expr) -> Expr {
    Expr::Qop(op, Box::new(a), Box::new(b), Box::new(c), Box::new(d))
}

#[inline]
pub fn ite(cond: Expr, then: Expr, els: Expr) -> Expr {
    Expr::Ite { cond: Box::new(cond), then: Box::new(then), els: Box::new(els) }
}

#[inline]
pub fn load(end: Endness, ty: IrType, addr: Expr) -> Expr {
    Expr::Load { end, ty, addr: Box::new(addr) }
}

pub fn ccall(callee: Callee, ret_ty: IrType, args: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::CCall { callee, ret_ty, args: args.into_iter().collect() }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoTemps;
    impl TypeEnv for NoTemps {
        fn temp_type(&self, _t: Temp) -> IrType {
            unreachable!()
        }
    }

    #[test]
    fn test_check_well_typed() {
        let e = binop(Op::Add32, mk_u32(1), unop(Op::Cast8Uto32, mk_u8(2)));
        assert_eq!(e.check(&NoTemps), IrType::I32);
        let c = ite(binop(Op::CmpEQ64, mk_u64(0), mk_u64(1)), mk_u8(1), mk_u8(2));
        assert_eq!(c.check(&NoTemps), IrType::I8);
    }

    #[test]
    #[should_panic]
    fn test_check_rejects_mismatch() {
        binop(Op::Add32, mk_u32(1), mk_u64(2)).check(&NoTemps);
    }

    #[test]
    fn test_temps_in_block() {
        let mut block = IrBlock::new(0);
        let t = block.new_temp(IrType::F64);
        assert_eq!(mkexpr(t).type_of(&block), IrType::F64);
        let mut seen = Vec::new();
        binop(Op::Add64, mkexpr(Temp(3)), mkexpr(Temp(5))).for_each_temp(&mut |t| seen.push(t));
        assert_eq!(seen, vec![Temp(3), Temp(5)]);
    }

    #[test]
    fn test_nested_helper_calls() {
        let callee = Callee { name: "h", addr: 0, regparms: 0 };
        let inner = ccall(callee, IrType::I64, [mkexpr(Temp(1)), mk_u64(2)]);
        let outer = ccall(callee, IrType::I32, [inner, mkexpr(Temp(4))]);
        let mut seen = Vec::new();
        outer.for_each_temp(&mut |t| seen.push(t));
        assert_eq!(seen, vec![Temp(1), Temp(4)]);
        assert_eq!(outer.type_of(&NoTemps), IrType::I32);
        assert!(std::mem::size_of::<Expr>() <= 64);
    }
}
