//! Per-instruction IR staging.
//!
//! Translators never write into the caller's [`IrBlock`] directly. They
//! emit into an [`InsnBuilder`], which allocates temporaries continuing the
//! block's numbering and type-checks every statement as it is added. Only a
//! successful decode commits the staged temporaries and statements; a
//! failed decode drops the builder and leaves the block untouched.
//!
//! # Invariants
//! - every temporary is bound exactly once
//! - a temporary is bound before any statement reads it
//! - every expression is well typed against operator signatures

use super::instruction::{DirtyCall, Expr, IrBlock, Stmt, TypeEnv};
use super::types::{Const, Endness, IrType, JumpKind, Temp};

/// Staging area for the IR of a single guest instruction.
#[derive(Debug, Clone)]
pub struct InsnBuilder {
    /// Index of the first temporary owned by this builder.
    base: u32,
    tyenv: Vec<IrType>,
    bound: Vec<bool>,
    stmts: Vec<Stmt>,
    /// Types of temporaries that already exist in the target block.
    outer: Vec<IrType>,
}

impl InsnBuilder {
    /// Create a builder whose temporaries continue `block`'s numbering.
    pub fn for_block(block: &IrBlock) -> Self {
        Self {
            base: block.tyenv.len() as u32,
            tyenv: Vec::new(),
            bound: Vec::new(),
            stmts: Vec::new(),
            outer: block.tyenv.clone(),
        }
    }

    /// Allocate a fresh temporary of type `ty`.
    #[inline]
    pub fn new_temp(&mut self, ty: IrType) -> Temp {
        let t = Temp(self.base + self.tyenv.len() as u32);
        self.tyenv.push(ty);
        self.bound.push(false);
        t
    }

    /// Bind `t := e`.
    ///
    /// # Panics
    /// On a type mismatch, a rebinding, or a read of an unbound temporary.
    pub fn assign(&mut self, t: Temp, e: Expr) {
        let ety: IrType = self.check_expr(&e);
        assert_eq!(self.temp_type(t), ety, "assigning {:?} expression to {:?}", ety, t);
        self.bind(t);
        self.stmts.push(Stmt::WrTmp { tmp: t, data: e });
    }

    /// Allocate a temporary of the expression's type and bind it.
    pub fn new_assign(&mut self, e: Expr) -> Temp {
        let ty: IrType = self.check_expr(&e);
        let t = self.new_temp(ty);
        self.bind(t);
        self.stmts.push(Stmt::WrTmp { tmp: t, data: e });
        t
    }

    /// Mark the start of a guest instruction of `len` bytes at `addr`.
    pub fn imark(&mut self, addr: u64, len: u32, delta: u8) {
        self.stmts.push(Stmt::IMark { addr, len, delta });
    }

    /// Write guest state at `offset`, checking the slot type.
    pub fn put(&mut self, offset: u32, ty: IrType, e: Expr) {
        let ety: IrType = self.check_expr(&e);
        assert_eq!(ety, ty, "put of {:?} into {:?} slot at offset {}", ety, ty, offset);
        self.stmts.push(Stmt::Put { offset, data: e });
    }

    pub fn store(&mut self, end: Endness, addr: Expr, data: Expr) {
        self.check_addr(&addr);
        let dty: IrType = self.check_expr(&data);
        assert!(dty != IrType::I1, "cannot store an I1 value");
        self.stmts.push(Stmt::Store { end, addr, data });
    }

    /// Conditional side exit. `dst` must be an address constant.
    pub fn exit(&mut self, guard: Expr, jk: JumpKind, dst: Const, offs_ip: u32) {
        assert_eq!(self.check_expr(&guard), IrType::I1, "exit guard must be I1");
        assert!(
            matches!(dst, Const::U32(_) | Const::U64(_)),
            "exit target must be an address constant, got {:?}",
            dst
        );
        self.stmts.push(Stmt::Exit { guard, jk, dst, offs_ip });
    }

    pub fn load_linked(&mut self, end: Endness, result: Temp, addr: Expr) {
        self.check_addr(&addr);
        assert!(self.temp_type(result).is_int(), "load-linked result must be an integer");
        self.bind(result);
        self.stmts.push(Stmt::LoadLinked { end, result, addr });
    }

    pub fn store_conditional(&mut self, end: Endness, result: Temp, addr: Expr, data: Expr) {
        self.check_addr(&addr);
        self.check_expr(&data);
        assert_eq!(self.temp_type(result), IrType::I1, "store-conditional result must be I1");
        self.bind(result);
        self.stmts.push(Stmt::StoreCond { end, result, addr, data });
    }

    pub fn fence(&mut self) {
        self.stmts.push(Stmt::MemFence);
    }

    pub fn dirty(&mut self, call: DirtyCall) {
        assert_eq!(self.check_expr(&call.guard), IrType::I1, "dirty guard must be I1");
        for a in call.args.iter() {
            self.check_expr(a);
        }
        if let Some(fx) = &call.mem_fx {
            self.check_addr(&fx.addr);
        }
        if let Some(t) = call.tmp {
            self.bind(t);
        }
        self.stmts.push(Stmt::Dirty(Box::new(call)));
    }

    pub fn abi_hint(&mut self, base: Expr, len: u32, nia: Expr) {
        self.check_addr(&base);
        self.check_addr(&nia);
        self.stmts.push(Stmt::AbiHint { base, len, nia });
    }

    /// Statements staged so far.
    #[inline]
    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Append the staged temporaries and statements to `block`.
    ///
    /// # Panics
    /// If `block` gained temporaries since this builder was created.
    pub fn commit(self, block: &mut IrBlock) {
        assert_eq!(
            block.tyenv.len() as u32,
            self.base,
            "block changed underneath an instruction builder"
        );
        block.tyenv.extend(self.tyenv);
        block.stmts.extend(self.stmts);
    }

    fn bind(&mut self, t: Temp) {
        assert!(t.0 >= self.base, "{:?} belongs to an earlier instruction", t);
        let slot: &mut bool = &mut self.bound[(t.0 - self.base) as usize];
        assert!(!*slot, "{:?} bound twice", t);
        *slot = true;
    }

    fn check_expr(&self, e: &Expr) -> IrType {
        e.for_each_temp(&mut |t| {
            if t.0 >= self.base {
                assert!(self.bound[(t.0 - self.base) as usize], "{:?} read before binding", t);
            }
        });
        e.check(self)
    }

    fn check_addr(&self, e: &Expr) {
        let ty: IrType = self.check_expr(e);
        assert!(ty == IrType::I32 || ty == IrType::I64, "address must be I32 or I64, got {:?}", ty);
    }
}

impl TypeEnv for InsnBuilder {
    fn temp_type(&self, t: Temp) -> IrType {
        if t.0 < self.base {
            self.outer[t.0 as usize]
        } else {
            self.tyenv[(t.0 - self.base) as usize]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ir::instruction::{binop, mk_u32, mkexpr};
    use crate::frontend::ir::ops::Op;

    #[test]
    fn test_numbering_continues_block() {
        let mut block = IrBlock::new(0);
        block.new_temp(IrType::I64);
        block.new_temp(IrType::I64);
        let mut b = InsnBuilder::for_block(&block);
        let t = b.new_temp(IrType::I32);
        assert_eq!(t.index(), 2);
        b.assign(t, mk_u32(5));
        b.commit(&mut block);
        assert_eq!(block.tyenv.len(), 3);
        assert_eq!(block.stmts.len(), 1);
    }

    #[test]
    fn test_dropped_builder_leaves_block_untouched() {
        let mut block = IrBlock::new(0);
        {
            let mut b = InsnBuilder::for_block(&block);
            let t = b.new_assign(mk_u32(1));
            b.put(16, IrType::I32, mkexpr(t));
        }
        assert!(block.tyenv.is_empty());
        assert!(block.stmts.is_empty());
        let b = InsnBuilder::for_block(&block);
        b.commit(&mut block);
        assert!(block.stmts.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_double_binding_panics() {
        let block = IrBlock::new(0);
        let mut b = InsnBuilder::for_block(&block);
        let t = b.new_temp(IrType::I32);
        b.assign(t, mk_u32(1));
        b.assign(t, mk_u32(2));
    }

    #[test]
    #[should_panic]
    fn test_read_before_bind_panics() {
        let block = IrBlock::new(0);
        let mut b = InsnBuilder::for_block(&block);
        let t = b.new_temp(IrType::I32);
        let _ = b.new_assign(binop(Op::Add32, mkexpr(t), mk_u32(1)));
    }

    #[test]
    #[should_panic]
    fn test_put_type_mismatch_panics() {
        let block = IrBlock::new(0);
        let mut b = InsnBuilder::for_block(&block);
        b.put(0, IrType::I64, mk_u32(1));
    }
}
