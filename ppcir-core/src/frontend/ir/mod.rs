//! Intermediate representation emitted by the front end.

pub mod builder;
pub mod display;
pub mod instruction;
pub mod ops;
pub mod types;

pub use builder::InsnBuilder;
pub use instruction::{
    binop, ccall, get, ite, load, mk_f64i, mk_u1, mk_u16, mk_u32, mk_u64, mk_u8, mk_v128,
    mk_v128_bits, mkexpr, qop, triop, unop, Callee, DirtyCall, EffectKind, Expr, GuestEffect,
    IrBlock, MemEffect, Stmt, TypeEnv,
};
pub use ops::{Op, Signature, SzOp};
pub use types::{fcmp, round, Const, Endness, IrType, JumpKind, Temp};
