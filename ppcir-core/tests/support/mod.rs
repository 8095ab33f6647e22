//! Test Support
//!
//! A decode harness plus a small reference evaluator for the integer
//! subset of the IR. Guest state is a byte array laid out by
//! [`PpcGuestLayout`]; temporaries hold `u128` values masked to their type.

#![allow(dead_code)]

use std::collections::HashMap;

use ppcir_core::frontend::guest_state::GuestSlot;
use ppcir_core::frontend::ir::{Const, Expr, IrType, Op, Stmt};
use ppcir_core::{
    translate_instruction, AbiInfo, ArchInfo, DecodeInputs, DecodeResult, Endness, GuestArch,
    GuestLayout, HwCaps, IrBlock, JumpKind, PpcGuestLayout,
};

pub const CIA: u64 = 0x1000;

/// Byte order of every memory access the harness asks for.
pub const HOST_END: Endness = Endness::Little;

fn never(_: u64) -> bool {
    false
}

fn always(_: u64) -> bool {
    true
}

/// Decoder configuration for one test.
pub struct Harness {
    pub arch: GuestArch,
    pub arch_info: ArchInfo,
    pub abi: AbiInfo,
    pub layout: PpcGuestLayout,
    pub resteer: bool,
}

impl Harness {
    pub fn new(arch: GuestArch) -> Self {
        Self {
            arch,
            arch_info: ArchInfo { hwcaps: arch.own_caps(), ..ArchInfo::default() },
            abi: AbiInfo::default(),
            layout: PpcGuestLayout::new(arch),
            resteer: false,
        }
    }

    pub fn ppc64() -> Self {
        Self::new(GuestArch::Ppc64)
    }

    pub fn ppc32() -> Self {
        Self::new(GuestArch::Ppc32)
    }

    pub fn with_caps(mut self, caps: HwCaps) -> Self {
        self.arch_info.hwcaps = caps;
        self
    }

    /// Encode `words` in the guest byte order.
    pub fn encode(&self, words: &[u32]) -> Vec<u8> {
        words
            .iter()
            .flat_map(|w| match self.arch_info.endness {
                Endness::Big => w.to_be_bytes(),
                Endness::Little => w.to_le_bytes(),
            })
            .collect()
    }

    /// Decode the first instruction of `words` at [`CIA`] into a fresh block.
    pub fn decode(&self, words: &[u32]) -> (IrBlock, DecodeResult) {
        let mut block = IrBlock::new(self.layout.offset_of(GuestSlot::Cia));
        let res = self.decode_into(&mut block, words, CIA);
        (block, res)
    }

    pub fn decode_into(&self, block: &mut IrBlock, words: &[u32], cia: u64) -> DecodeResult {
        let code: Vec<u8> = self.encode(words);
        let resteer_ok: fn(u64) -> bool = if self.resteer { always } else { never };
        let inputs = DecodeInputs {
            code: &code,
            delta: 0,
            cia,
            block_start: cia,
            arch: self.arch,
            arch_info: &self.arch_info,
            abi: &self.abi,
            host_end: HOST_END,
            resteer_ok: &resteer_ok,
            injector: None,
            sigill_diag: false,
            layout: &self.layout,
        };
        translate_instruction(block, &inputs)
    }
}

/// How a block run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A side exit was taken.
    Exit(JumpKind, u64),
    /// Fell off the end of the statement list.
    FellThrough,
}

/// Reference evaluator state.
pub struct Machine {
    pub arch: GuestArch,
    pub layout: PpcGuestLayout,
    pub state: Vec<u8>,
    pub mem: HashMap<u64, u8>,
    temps: HashMap<u32, u128>,
}

#[derive(Debug, Clone, Copy)]
struct Val {
    v: u128,
    ty: IrType,
}

fn mask(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

fn sx(x: Val) -> i128 {
    let sh: u32 = 128 - x.ty.bits();
    ((x.v << sh) as i128) >> sh
}

fn ord<T: Ord>(a: T, b: T) -> u128 {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => 8,
        std::cmp::Ordering::Greater => 4,
        std::cmp::Ordering::Equal => 2,
    }
}

impl Machine {
    pub fn new(arch: GuestArch) -> Self {
        let layout = PpcGuestLayout::new(arch);
        let size: usize = layout.total_size() as usize;
        Self { arch, layout, state: vec![0; size], mem: HashMap::new(), temps: HashMap::new() }
    }

    fn read_state(&self, offset: u32, bytes: u32) -> u128 {
        let mut v: u128 = 0;
        for i in (0..bytes).rev() {
            v = (v << 8) | self.state[(offset + i) as usize] as u128;
        }
        v
    }

    fn write_state(&mut self, offset: u32, bytes: u32, v: u128) {
        for i in 0..bytes {
            self.state[(offset + i) as usize] = (v >> (8 * i)) as u8;
        }
    }

    pub fn slot(&self, slot: GuestSlot) -> u64 {
        let loc = self.layout.location(slot);
        self.read_state(loc.offset, loc.ty.size_bytes()) as u64
    }

    pub fn set_slot(&mut self, slot: GuestSlot, v: u64) {
        let loc = self.layout.location(slot);
        self.write_state(loc.offset, loc.ty.size_bytes(), v as u128);
    }

    pub fn gpr(&self, i: u32) -> u64 {
        self.slot(GuestSlot::Gpr(i))
    }

    pub fn set_gpr(&mut self, i: u32, v: u64) {
        self.set_slot(GuestSlot::Gpr(i), v);
    }

    /// Write a `ty`-sized value at `addr` the way a guest store would.
    pub fn write_mem(&mut self, ty: IrType, addr: u64, v: u64) {
        self.store(HOST_END, addr, Val { v: v as u128 & mask(ty.bits()), ty });
    }

    pub fn read_mem(&self, ty: IrType, addr: u64) -> u64 {
        self.load(HOST_END, ty, addr) as u64
    }

    /// Fill `len` bytes from `addr` with `byte`.
    pub fn fill_mem(&mut self, addr: u64, len: u64, byte: u8) {
        for a in addr..addr + len {
            self.mem.insert(a, byte);
        }
    }

    /// CR field `f` as a nibble, LT GT EQ SO in bits 3..0.
    pub fn cr_field(&self, f: u32) -> u32 {
        ((self.slot(GuestSlot::Cr321(f)) & 0xE) | (self.slot(GuestSlot::Cr0(f)) & 1)) as u32
    }

    fn load(&self, end: Endness, ty: IrType, addr: u64) -> u128 {
        let n: u64 = ty.size_bytes() as u64;
        let mut v: u128 = 0;
        for i in 0..n {
            let byte_addr: u64 = match end {
                Endness::Big => addr + i,
                Endness::Little => addr + n - 1 - i,
            };
            v = (v << 8) | *self.mem.get(&byte_addr).unwrap_or(&0) as u128;
        }
        v
    }

    fn store(&mut self, end: Endness, addr: u64, x: Val) {
        let n: u64 = x.ty.size_bytes() as u64;
        for i in 0..n {
            let shift: u64 = match end {
                Endness::Big => 8 * (n - 1 - i),
                Endness::Little => 8 * i,
            };
            self.mem.insert(addr + i, (x.v >> shift) as u8);
        }
    }

    /// Execute `block`'s statements in order, stopping at the first taken
    /// side exit.
    pub fn run(&mut self, block: &IrBlock) -> Outcome {
        for s in &block.stmts {
            match s {
                Stmt::IMark { .. } | Stmt::MemFence | Stmt::AbiHint { .. } => {}
                Stmt::WrTmp { tmp, data } => {
                    let v: Val = self.eval(data, block);
                    self.temps.insert(tmp.index(), v.v);
                }
                Stmt::Put { offset, data } => {
                    let v: Val = self.eval(data, block);
                    self.write_state(*offset, v.ty.size_bytes(), v.v);
                }
                Stmt::Store { end, addr, data } => {
                    let a: Val = self.eval(addr, block);
                    let d: Val = self.eval(data, block);
                    self.store(*end, a.v as u64, d);
                }
                // A single-threaded run never loses its reservation.
                Stmt::LoadLinked { end, result, addr } => {
                    let a: Val = self.eval(addr, block);
                    let ty: IrType = block.tyenv[result.index() as usize];
                    let v: u128 = self.load(*end, ty, a.v as u64);
                    self.temps.insert(result.index(), v);
                }
                Stmt::StoreCond { end, result, addr, data } => {
                    let a: Val = self.eval(addr, block);
                    let d: Val = self.eval(data, block);
                    self.store(*end, a.v as u64, d);
                    self.temps.insert(result.index(), 1);
                }
                Stmt::Exit { guard, jk, dst, .. } => {
                    if self.eval(guard, block).v != 0 {
                        let target: u64 = dst.as_u64().expect("address constant");
                        return Outcome::Exit(*jk, target);
                    }
                }
                other => panic!("evaluator cannot run {:?}", other),
            }
        }
        Outcome::FellThrough
    }

    fn eval(&self, e: &Expr, block: &IrBlock) -> Val {
        match e {
            Expr::Get { offset, ty } => Val { v: self.read_state(*offset, ty.size_bytes()), ty: *ty },
            Expr::RdTmp(t) => Val { v: self.temps[&t.index()], ty: block.tyenv[t.index() as usize] },
            Expr::Const(c) => {
                let v: u64 = match c {
                    Const::F32i(b) => *b as u64,
                    Const::F64i(b) => *b,
                    other => other.as_u64().expect("integer constant"),
                };
                Val { v: v as u128, ty: c.ty() }
            }
            Expr::Unop(op, a) => {
                let a: Val = self.eval(a, block);
                Val { v: unop(*op, a), ty: op.signature().ret }
            }
            Expr::Binop(op, a, b) => {
                let a: Val = self.eval(a, block);
                let b: Val = self.eval(b, block);
                Val { v: binop(*op, a, b), ty: op.signature().ret }
            }
            Expr::Load { end, ty, addr } => {
                let a: Val = self.eval(addr, block);
                Val { v: self.load(*end, *ty, a.v as u64), ty: *ty }
            }
            Expr::Ite { cond, then, els } => {
                if self.eval(cond, block).v != 0 {
                    self.eval(then, block)
                } else {
                    self.eval(els, block)
                }
            }
            other => panic!("evaluator cannot evaluate {:?}", other),
        }
    }
}

fn unop(op: Op, a: Val) -> u128 {
    use Op::*;
    let n: u32 = a.ty.bits();
    let v: u128 = match op {
        Not1 | Not8 | Not16 | Not32 | Not64 => !a.v,
        Clz32 | Clz64 => (a.v.leading_zeros() - (128 - n)) as u128,
        Ctz32 | Ctz64 => {
            if a.v == 0 {
                n as u128
            } else {
                a.v.trailing_zeros() as u128
            }
        }
        PopCount32 | PopCount64 => a.v.count_ones() as u128,
        Reverse8sIn16 | Reverse8sIn32 | Reverse8sIn64 => ((a.v as u64).swap_bytes() >> (64 - n)) as u128,
        Cast1Uto8 | Cast1Uto32 | Cast1Uto64 | Cast8Uto16 | Cast8Uto32 | Cast8Uto64 | Cast16Uto32
        | Cast16Uto64 | Cast32Uto64 => a.v,
        Cast1Sto32 | Cast1Sto64 | Cast8Sto32 | Cast8Sto64 | Cast16Sto32 | Cast16Sto64
        | Cast32Sto64 => sx(a) as u128,
        Cast64to1 | Cast32to1 | Cast16to8 | Cast32to8 | Cast32to16 | Cast64to8 | Cast64to16
        | Cast64to32 | Cast128to64 => a.v,
        Cast64HIto32 => a.v >> 32,
        Cast128HIto64 => a.v >> 64,
        other => panic!("evaluator has no unop {:?}", other),
    };
    v & mask(op.signature().ret.bits())
}

fn binop(op: Op, a: Val, b: Val) -> u128 {
    use Op::*;
    let n: u32 = a.ty.bits();
    let shift = |kind: u8| -> u128 {
        let amt: u32 = b.v as u32;
        match kind {
            0 if amt >= n => 0,
            0 => a.v << amt,
            1 if amt >= n => 0,
            1 => a.v >> amt,
            _ => (sx(a) >> amt.min(n - 1)) as u128,
        }
    };
    let v: u128 = match op {
        Add8 | Add16 | Add32 | Add64 => a.v.wrapping_add(b.v),
        Sub8 | Sub16 | Sub32 | Sub64 => a.v.wrapping_sub(b.v),
        Mul8 | Mul16 | Mul32 | Mul64 => a.v.wrapping_mul(b.v),
        Or1 | Or8 | Or16 | Or32 | Or64 => a.v | b.v,
        And1 | And8 | And16 | And32 | And64 => a.v & b.v,
        Xor8 | Xor16 | Xor32 | Xor64 => a.v ^ b.v,
        Shl8 | Shl16 | Shl32 | Shl64 => shift(0),
        Shr8 | Shr16 | Shr32 | Shr64 => shift(1),
        Sar8 | Sar16 | Sar32 | Sar64 => shift(2),
        CmpEQ8 | CmpEQ16 | CmpEQ32 | CmpEQ64 => (a.v == b.v) as u128,
        CmpNE8 | CmpNE16 | CmpNE32 | CmpNE64 => (a.v != b.v) as u128,
        CmpLT32S | CmpLT64S => (sx(a) < sx(b)) as u128,
        CmpLE32S | CmpLE64S => (sx(a) <= sx(b)) as u128,
        CmpLT32U | CmpLT64U => (a.v < b.v) as u128,
        CmpLE32U | CmpLE64U => (a.v <= b.v) as u128,
        CmpORD32S | CmpORD64S => ord(sx(a), sx(b)),
        CmpORD32U | CmpORD64U => ord(a.v, b.v),
        MullS32 | MullS64 => sx(a).wrapping_mul(sx(b)) as u128,
        MullU32 | MullU64 => a.v.wrapping_mul(b.v),
        DivS32 | DivS64 if b.v == 0 => 0,
        DivU32 | DivU64 | DivU32E | DivU64E | DivS32E | DivS64E if b.v == 0 => 0,
        DivS32 | DivS64 => sx(a).wrapping_div(sx(b)) as u128,
        DivU32 | DivU64 => a.v / b.v,
        DivS32E | DivS64E => (sx(a) << n).wrapping_div(sx(b)) as u128,
        DivU32E | DivU64E => (a.v << n) / b.v,
        Cat8HLto16 | Cat16HLto32 | Cat32HLto64 | Cat64HLto128 => (a.v << n) | b.v,
        other => panic!("evaluator has no binop {:?}", other),
    };
    v & mask(op.signature().ret.bits())
}
