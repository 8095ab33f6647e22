//! IR value types, temporaries, constants and control-flow tags.
//!
//! # Layout
//! - `IrType`, `Endness` and `JumpKind` are `#[repr(u8)]` enums
//! - `Temp` is an index into the owning block's type environment
//! - `Const` carries floating-point constants as raw bit patterns so that
//!   the whole IR stays `Eq + Hash`

use serde::{Deserialize, Serialize};

/// Type of an IR value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IrType {
    I1 = 0,
    I8 = 1,
    I16 = 2,
    I32 = 3,
    I64 = 4,
    I128 = 5,
    F32 = 6,
    F64 = 7,
    D64 = 8,
    D128 = 9,
    V128 = 10,
}

impl IrType {
    /// Size of a value of this type in bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            IrType::I1 => 1,
            IrType::I8 => 8,
            IrType::I16 => 16,
            IrType::I32 | IrType::F32 => 32,
            IrType::I64 | IrType::F64 | IrType::D64 => 64,
            IrType::I128 | IrType::D128 | IrType::V128 => 128,
        }
    }

    /// Size in bytes when stored to memory or guest state. `I1` has no
    /// storage size and reports zero.
    #[inline]
    pub const fn size_bytes(self) -> u32 {
        match self {
            IrType::I1 => 0,
            other => other.bits() / 8,
        }
    }

    /// Whether this is one of the integer types (including `I1`).
    #[inline]
    pub const fn is_int(self) -> bool {
        matches!(
            self,
            IrType::I1 | IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64 | IrType::I128
        )
    }
}

/// Handle of a single-assignment temporary.
///
/// The index is global to the block being built: temporaries staged for one
/// instruction continue the numbering of the block they are committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Temp(pub(crate) u32);

impl Temp {
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Const {
    U1(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    /// 32-bit float given by its bit pattern.
    F32i(u32),
    /// 64-bit float given by its bit pattern.
    F64i(u64),
    /// 128-bit vector where bit `i` of the mask selects byte lane `i`
    /// to be `0xFF` (set) or `0x00` (clear).
    V128(u16),
}

impl Const {
    #[inline]
    pub const fn ty(self) -> IrType {
        match self {
            Const::U1(_) => IrType::I1,
            Const::U8(_) => IrType::I8,
            Const::U16(_) => IrType::I16,
            Const::U32(_) => IrType::I32,
            Const::U64(_) => IrType::I64,
            Const::F32i(_) => IrType::F32,
            Const::F64i(_) => IrType::F64,
            Const::V128(_) => IrType::V128,
        }
    }

    /// Zero-extended integer value of an integer constant, `None` for
    /// float and vector constants.
    pub const fn as_u64(self) -> Option<u64> {
        match self {
            Const::U1(b) => Some(b as u64),
            Const::U8(v) => Some(v as u64),
            Const::U16(v) => Some(v as u64),
            Const::U32(v) => Some(v as u64),
            Const::U64(v) => Some(v),
            _ => None,
        }
    }
}

/// Byte order of a memory access or of the guest/host machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Endness {
    Big = 0,
    Little = 1,
}

impl Endness {
    /// Byte order of the machine running the translator.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endness::Big
        } else {
            Endness::Little
        }
    }
}

/// Kind of a control transfer, attached to block exits and to the
/// "stop here" outcome of a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JumpKind {
    /// Ordinary jump.
    Boring = 0,
    /// Subroutine call (link register set).
    Call = 1,
    /// Subroutine return.
    Ret = 2,
    /// Client request hook.
    ClientReq = 3,
    /// Spin-loop hint; the scheduler may switch threads.
    Yield = 4,
    /// Emulation warning recorded in the guest state.
    EmWarn = 5,
    /// Emulation failure recorded in the guest state.
    EmFail = 6,
    /// Instruction could not be decoded.
    NoDecode = 7,
    /// Address translation failure.
    MapFail = 8,
    /// Invalidate cached translations covering `[CMSTART, CMSTART+CMLEN)`.
    InvalICache = 9,
    /// Flush data cache over `[CMSTART, CMSTART+CMLEN)`.
    FlushDCache = 10,
    /// Jump to the target without applying function redirection.
    NoRedir = 11,
    SigIll = 12,
    SigTrap = 13,
    SigSegv = 14,
    SigBus = 15,
    SigFpe = 16,
    /// System call entry.
    SysSyscall = 17,
}

/// Rounding modes in the encoding IR floating-point ops expect as their
/// `I32` rounding operand.
pub mod round {
    pub const NEAREST_EVEN: u32 = 0;
    pub const NEG_INF: u32 = 1;
    pub const POS_INF: u32 = 2;
    pub const ZERO: u32 = 3;
    /// Decimal-only modes.
    pub const NEAREST_TIE_AWAY_0: u32 = 4;
    pub const PREPARE_SHORTER: u32 = 5;
    pub const AWAY_FROM_ZERO: u32 = 6;
    pub const NEAREST_TIE_TOWARD_0: u32 = 7;
}

/// Result encoding of `CmpF64`/`CmpD64`/`CmpD128`.
pub mod fcmp {
    pub const UN: u32 = 0x45;
    pub const LT: u32 = 0x01;
    pub const GT: u32 = 0x00;
    pub const EQ: u32 = 0x40;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes() {
        assert_eq!(IrType::I1.size_bytes(), 0);
        assert_eq!(IrType::I8.size_bytes(), 1);
        assert_eq!(IrType::F64.size_bytes(), 8);
        assert_eq!(IrType::D128.size_bytes(), 16);
        assert_eq!(IrType::V128.bits(), 128);
    }

    #[test]
    fn test_const_types() {
        assert_eq!(Const::U1(true).ty(), IrType::I1);
        assert_eq!(Const::U64(7).ty(), IrType::I64);
        assert_eq!(Const::F64i(0).ty(), IrType::F64);
        assert_eq!(Const::V128(0xFFFF).ty(), IrType::V128);
        assert_eq!(Const::U16(0x1234).as_u64(), Some(0x1234));
        assert_eq!(Const::V128(0).as_u64(), None);
    }
}
