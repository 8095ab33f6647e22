//! IR operators and their fixed type signatures.
//!
//! Every operator has exactly one signature. Operators that round take the
//! rounding mode as an explicit leading `I32` operand (see
//! [`round`](super::types::round)). Vector lane `0` is the least
//! significant lane of the 128-bit value.
//!
//! # Naming
//! - `Add32`, `Shl64`: integer ops on one width
//! - `Cast8Uto32`, `Cast64to32`: widening/narrowing conversions
//! - `Cat32HLto64`: concatenation, high half first
//! - `Add32x4`: lane-wise vector ops, `Add32Fx4` for float lanes

use super::types::IrType;

/// IR operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // Integer arithmetic and logic, (T, T) -> T.
    Add8, Add16, Add32, Add64,
    Sub8, Sub16, Sub32, Sub64,
    Mul8, Mul16, Mul32, Mul64,
    Or1, Or8, Or16, Or32, Or64,
    And1, And8, And16, And32, And64,
    Xor8, Xor16, Xor32, Xor64,

    // Shifts, (T, I8) -> T.
    Shl8, Shl16, Shl32, Shl64,
    Shr8, Shr16, Shr32, Shr64,
    Sar8, Sar16, Sar32, Sar64,

    // Comparisons, (T, T) -> I1.
    CmpEQ8, CmpEQ16, CmpEQ32, CmpEQ64,
    CmpNE8, CmpNE16, CmpNE32, CmpNE64,
    CmpLT32S, CmpLT32U, CmpLE32S, CmpLE32U,
    CmpLT64S, CmpLT64U, CmpLE64S, CmpLE64U,

    /// Three-way ordered compare producing 8 (lt), 4 (gt) or 2 (eq).
    CmpORD32S, CmpORD32U, CmpORD64S, CmpORD64U,

    // Widening multiply and division.
    MullS32, MullU32, MullS64, MullU64,
    DivS32, DivU32, DivS64, DivU64,
    /// Extended division: dividend is `argL << width`.
    DivS32E, DivU32E, DivS64E, DivU64E,

    // Unary integer.
    Not1, Not8, Not16, Not32, Not64,
    Clz32, Clz64, Ctz32, Ctz64,
    PopCount32, PopCount64,
    Reverse8sIn16, Reverse8sIn32, Reverse8sIn64,

    // Width conversions.
    Cast1Uto8, Cast1Uto32, Cast1Uto64, Cast1Sto32, Cast1Sto64,
    Cast8Uto16, Cast8Uto32, Cast8Uto64, Cast8Sto32, Cast8Sto64,
    Cast16Uto32, Cast16Uto64, Cast16Sto32, Cast16Sto64,
    Cast32Uto64, Cast32Sto64,
    Cast64to1, Cast32to1, Cast16to8, Cast32to8, Cast32to16,
    Cast64to8, Cast64to16, Cast64to32, Cast64HIto32,
    Cast128to64, Cast128HIto64,
    CastV128to64, CastV128HIto64, CastV128to32,
    Cast32UtoV128, Cast64UtoV128,
    Cat8HLto16, Cat16HLto32, Cat32HLto64, Cat64HLto128, Cat64HLtoV128,

    // Binary floating point.
    AddF64, SubF64, MulF64, DivF64,
    /// As the `F64` forms, but the result is rounded to single precision.
    AddF64r32, SubF64r32, MulF64r32, DivF64r32,
    SqrtF64,
    MAddF64, MSubF64, MAddF64r32, MSubF64r32,
    NegF64, AbsF64,
    RecipEstF64, RSqrtEstF64,
    /// Unordered-aware compare, result in [`fcmp`](super::types::fcmp) encoding.
    CmpF64,
    F64toI32S, F64toI32U, F64toI64S, F64toI64U,
    I64StoF64, I64UtoF64, I64StoF32, I64UtoF32,
    I32StoF64, I32UtoF64,
    F32toF64, F64toF32,
    RoundF64toF32, RoundF64toInt,
    ReinterpF64asI64, ReinterpI64asF64, ReinterpF32asI32, ReinterpI32asF32,

    // Decimal floating point.
    AddD64, SubD64, MulD64, DivD64,
    AddD128, SubD128, MulD128, DivD128,
    CmpD64, CmpD128, CmpExpD64, CmpExpD128,
    D64toD128, D128toD64,
    /// Round to decimal32; the result is the 32-bit encoding.
    D64toD32,
    /// Widen a 32-bit decimal32 encoding.
    D32toD64,
    I64StoD64, I64StoD128, D64toI64S, D128toI64S,
    ExtractExpD64, ExtractExpD128, InsertExpD64, InsertExpD128,
    /// Number of significant digits in the coefficient.
    ExtractSigD64, ExtractSigD128,
    ShlD64, ShrD64, ShlD128, ShrD128,
    /// `(rm, ref, x)`: `x` rounded to the exponent of `ref`.
    QuantizeD64, QuantizeD128,
    RoundD64toInt, RoundD128toInt,
    ReinterpD64asI64, ReinterpI64asD64,
    D64HLtoD128, D128HItoD64, D128LOtoD64,

    // Vector bitwise.
    AndV128, OrV128, XorV128, NotV128,
    /// Whole-register shift by an `I8` bit count.
    ShlV128, ShrV128,

    // Vector integer.
    Add8x16, Add16x8, Add32x4, Add64x2, Add128x1,
    Sub8x16, Sub16x8, Sub32x4, Sub64x2, Sub128x1,
    QAdd8Ux16, QAdd16Ux8, QAdd32Ux4, QAdd8Sx16, QAdd16Sx8, QAdd32Sx4,
    QSub8Ux16, QSub16Ux8, QSub32Ux4, QSub8Sx16, QSub16Sx8, QSub32Sx4,
    Avg8Ux16, Avg16Ux8, Avg32Ux4, Avg8Sx16, Avg16Sx8, Avg32Sx4,
    Max8Ux16, Max16Ux8, Max32Ux4, Max64Ux2, Max8Sx16, Max16Sx8, Max32Sx4, Max64Sx2,
    Min8Ux16, Min16Ux8, Min32Ux4, Min64Ux2, Min8Sx16, Min16Sx8, Min32Sx4, Min64Sx2,
    Mul32x4,
    /// Multiply the even-numbered lanes (big-endian numbering), widening.
    MullEven8Ux16, MullEven16Ux8, MullEven32Ux4,
    MullEven8Sx16, MullEven16Sx8, MullEven32Sx4,
    CmpEQ8x16, CmpEQ16x8, CmpEQ32x4, CmpEQ64x2,
    CmpGT8Ux16, CmpGT16Ux8, CmpGT32Ux4, CmpGT64Ux2,
    CmpGT8Sx16, CmpGT16Sx8, CmpGT32Sx4, CmpGT64Sx2,
    /// Per-lane shift with counts taken from the matching lane of argR,
    /// modulo the lane width.
    Shl8x16, Shl16x8, Shl32x4, Shl64x2,
    Shr8x16, Shr16x8, Shr32x4, Shr64x2,
    Sar8x16, Sar16x8, Sar32x4, Sar64x2,
    Rol8x16, Rol16x8, Rol32x4, Rol64x2,
    /// Byte `i` of the result is byte `argR[i] & 15` of argL.
    Perm8x16,
    InterleaveHI8x16, InterleaveHI16x8, InterleaveHI32x4, InterleaveHI64x2,
    InterleaveLO8x16, InterleaveLO16x8, InterleaveLO32x4, InterleaveLO64x2,
    /// Lanes 0 and 2 (odd: 1 and 3) of argL and argR, counting from the
    /// most significant lane, interleaved with argL's lane first.
    InterleaveEvenLanes32x4, InterleaveOddLanes32x4,
    Dup8x16, Dup16x8, Dup32x4,
    NarrowBin16to8x16, NarrowBin32to16x8, NarrowBin64to32x4,
    QNarrowBin16Uto8Ux16, QNarrowBin32Uto16Ux8, QNarrowBin64Uto32Ux4,
    QNarrowBin16Sto8Sx16, QNarrowBin32Sto16Sx8, QNarrowBin64Sto32Sx4,
    QNarrowBin16Sto8Ux16, QNarrowBin32Sto16Ux8, QNarrowBin64Sto32Ux4,
    Clz8x16, Clz16x8, Clz32x4, Clz64x2,
    PopCount8x16, PopCount16x8, PopCount32x4, PopCount64x2,

    // Vector floating point.
    Add32Fx4, Sub32Fx4, Mul32Fx4, Div32Fx4,
    Add64Fx2, Sub64Fx2, Mul64Fx2, Div64Fx2,
    Sqrt32Fx4, Sqrt64Fx2,
    Max32Fx4, Min32Fx4, Max64Fx2, Min64Fx2,
    CmpEQ32Fx4, CmpGT32Fx4, CmpGE32Fx4,
    CmpEQ64Fx2, CmpLT64Fx2, CmpLE64Fx2,
    Neg32Fx4, Abs32Fx4, Neg64Fx2, Abs64Fx2,
    RecipEst32Fx4, RSqrtEst32Fx4, Log2_32Fx4, Exp2_32Fx4,
    RoundF32x4RM, RoundF32x4RP, RoundF32x4RN, RoundF32x4RZ,
    F32toI32Ux4RZ, F32toI32Sx4RZ, I32UtoF32x4, I32StoF32x4,

    // Crypto and BCD.
    CipherV128, CipherLV128, NCipherV128, NCipherLV128, CipherSV128,
    /// SHA-2 sigma functions; the `I8` operand packs `st` and `six`.
    SHA256, SHA512,
    /// Carry-less products of each adjacent lane pair, XORed into one
    /// double-width lane.
    PolynomialMulAdd8x16, PolynomialMulAdd16x8, PolynomialMulAdd32x4, PolynomialMulAdd64x2,
    /// BCD add/subtract; the `I8` operand is the preferred-sign bit.
    BCDAdd, BCDSub,
}

/// Operand and result types of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub ret: IrType,
    pub args: &'static [IrType],
}

impl Signature {
    #[inline]
    pub const fn arity(&self) -> usize {
        self.args.len()
    }
}

/// Width-generic base for [`Op::sized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SzOp {
    Add,
    Sub,
    Mul,
    Or,
    And,
    Xor,
    Shl,
    Shr,
    Sar,
    CmpEQ,
    CmpNE,
    Not,
}

macro_rules! sig {
    ($ret:ident; $($arg:ident),*) => {
        Signature { ret: IrType::$ret, args: &[$(IrType::$arg),*] }
    };
}

impl Op {
    /// Select the 8/16/32/64-bit variant of `base` for integer type `ty`.
    ///
    /// Panics on non-integer types, which is a translator bug.
    pub fn sized(base: SzOp, ty: IrType) -> Op {
        use Op::*;
        let idx: usize = match ty {
            IrType::I8 => 0,
            IrType::I16 => 1,
            IrType::I32 => 2,
            IrType::I64 => 3,
            other => panic!("Op::sized: no {:?} variant for {:?}", base, other),
        };
        let table: [Op; 4] = match base {
            SzOp::Add => [Add8, Add16, Add32, Add64],
            SzOp::Sub => [Sub8, Sub16, Sub32, Sub64],
            SzOp::Mul => [Mul8, Mul16, Mul32, Mul64],
            SzOp::Or => [Or8, Or16, Or32, Or64],
            SzOp::And => [And8, And16, And32, And64],
            SzOp::Xor => [Xor8, Xor16, Xor32, Xor64],
            SzOp::Shl => [Shl8, Shl16, Shl32, Shl64],
            SzOp::Shr => [Shr8, Shr16, Shr32, Shr64],
            SzOp::Sar => [Sar8, Sar16, Sar32, Sar64],
            SzOp::CmpEQ => [CmpEQ8, CmpEQ16, CmpEQ32, CmpEQ64],
            SzOp::CmpNE => [CmpNE8, CmpNE16, CmpNE32, CmpNE64],
            SzOp::Not => [Not8, Not16, Not32, Not64],
        };
        table[idx]
    }

    /// The fixed type signature of this operator.
    pub fn signature(self) -> Signature {
        use Op::*;
        match self {
            Add8 | Sub8 | Mul8 | Or8 | And8 | Xor8 => sig!(I8; I8, I8),
            Add16 | Sub16 | Mul16 | Or16 | And16 | Xor16 => sig!(I16; I16, I16),
            Add32 | Sub32 | Mul32 | Or32 | And32 | Xor32 => sig!(I32; I32, I32),
            Add64 | Sub64 | Mul64 | Or64 | And64 | Xor64 => sig!(I64; I64, I64),
            Or1 | And1 => sig!(I1; I1, I1),

            Shl8 | Shr8 | Sar8 => sig!(I8; I8, I8),
            Shl16 | Shr16 | Sar16 => sig!(I16; I16, I8),
            Shl32 | Shr32 | Sar32 => sig!(I32; I32, I8),
            Shl64 | Shr64 | Sar64 => sig!(I64; I64, I8),

            CmpEQ8 | CmpNE8 => sig!(I1; I8, I8),
            CmpEQ16 | CmpNE16 => sig!(I1; I16, I16),
            CmpEQ32 | CmpNE32 | CmpLT32S | CmpLT32U | CmpLE32S | CmpLE32U => {
                sig!(I1; I32, I32)
            }
            CmpEQ64 | CmpNE64 | CmpLT64S | CmpLT64U | CmpLE64S | CmpLE64U => {
                sig!(I1; I64, I64)
            }
            CmpORD32S | CmpORD32U => sig!(I32; I32, I32),
            CmpORD64S | CmpORD64U => sig!(I64; I64, I64),

            MullS32 | MullU32 => sig!(I64; I32, I32),
            MullS64 | MullU64 => sig!(I128; I64, I64),
            DivS32 | DivU32 | DivS32E | DivU32E => sig!(I32; I32, I32),
            DivS64 | DivU64 | DivS64E | DivU64E => sig!(I64; I64, I64),

            Not1 => sig!(I1; I1),
            Not8 => sig!(I8; I8),
            Not16 | Reverse8sIn16 => sig!(I16; I16),
            Not32 | Clz32 | Ctz32 | PopCount32 | Reverse8sIn32 => sig!(I32; I32),
            Not64 | Clz64 | Ctz64 | PopCount64 | Reverse8sIn64 => sig!(I64; I64),

            Cast1Uto8 => sig!(I8; I1),
            Cast1Uto32 | Cast1Sto32 => sig!(I32; I1),
            Cast1Uto64 | Cast1Sto64 => sig!(I64; I1),
            Cast8Uto16 => sig!(I16; I8),
            Cast8Uto32 | Cast8Sto32 => sig!(I32; I8),
            Cast8Uto64 | Cast8Sto64 => sig!(I64; I8),
            Cast16Uto32 | Cast16Sto32 => sig!(I32; I16),
            Cast16Uto64 | Cast16Sto64 => sig!(I64; I16),
            Cast32Uto64 | Cast32Sto64 => sig!(I64; I32),
            Cast64to1 => sig!(I1; I64),
            Cast32to1 => sig!(I1; I32),
            Cast16to8 => sig!(I8; I16),
            Cast32to8 => sig!(I8; I32),
            Cast32to16 => sig!(I16; I32),
            Cast64to8 => sig!(I8; I64),
            Cast64to16 => sig!(I16; I64),
            Cast64to32 | Cast64HIto32 => sig!(I32; I64),
            Cast128to64 | Cast128HIto64 => sig!(I64; I128),
            CastV128to64 | CastV128HIto64 => sig!(I64; V128),
            CastV128to32 => sig!(I32; V128),
            Cast32UtoV128 => sig!(V128; I32),
            Cast64UtoV128 => sig!(V128; I64),
            Cat8HLto16 => sig!(I16; I8, I8),
            Cat16HLto32 => sig!(I32; I16, I16),
            Cat32HLto64 => sig!(I64; I32, I32),
            Cat64HLto128 => sig!(I128; I64, I64),
            Cat64HLtoV128 => sig!(V128; I64, I64),

            AddF64 | SubF64 | MulF64 | DivF64 | AddF64r32 | SubF64r32 | MulF64r32
            | DivF64r32 => sig!(F64; I32, F64, F64),
            SqrtF64 | RoundF64toF32 | RoundF64toInt => sig!(F64; I32, F64),
            MAddF64 | MSubF64 | MAddF64r32 | MSubF64r32 => sig!(F64; I32, F64, F64, F64),
            NegF64 | AbsF64 | RecipEstF64 | RSqrtEstF64 => sig!(F64; F64),
            CmpF64 => sig!(I32; F64, F64),
            F64toI32S | F64toI32U => sig!(I32; I32, F64),
            F64toI64S | F64toI64U => sig!(I64; I32, F64),
            I64StoF64 | I64UtoF64 => sig!(F64; I32, I64),
            I64StoF32 | I64UtoF32 => sig!(F32; I32, I64),
            I32StoF64 | I32UtoF64 => sig!(F64; I32),
            F32toF64 => sig!(F64; F32),
            F64toF32 => sig!(F32; I32, F64),
            ReinterpF64asI64 => sig!(I64; F64),
            ReinterpI64asF64 => sig!(F64; I64),
            ReinterpF32asI32 => sig!(I32; F32),
            ReinterpI32asF32 => sig!(F32; I32),

            AddD64 | SubD64 | MulD64 | DivD64 | QuantizeD64 => sig!(D64; I32, D64, D64),
            AddD128 | SubD128 | MulD128 | DivD128 | QuantizeD128 => {
                sig!(D128; I32, D128, D128)
            }
            CmpD64 | CmpExpD64 => sig!(I32; D64, D64),
            CmpD128 | CmpExpD128 => sig!(I32; D128, D128),
            D64toD128 => sig!(D128; D64),
            D128toD64 => sig!(D64; I32, D128),
            RoundD64toInt => sig!(D64; I32, D64),
            D64toD32 => sig!(I32; I32, D64),
            D32toD64 => sig!(D64; I32),
            RoundD128toInt => sig!(D128; I32, D128),
            I64StoD64 => sig!(D64; I32, I64),
            I64StoD128 => sig!(D128; I64),
            D64toI64S => sig!(I64; I32, D64),
            D128toI64S => sig!(I64; I32, D128),
            ExtractExpD64 | ExtractSigD64 => sig!(I64; D64),
            ExtractExpD128 | ExtractSigD128 => sig!(I64; D128),
            InsertExpD64 => sig!(D64; I64, D64),
            InsertExpD128 => sig!(D128; I64, D128),
            ShlD64 | ShrD64 => sig!(D64; D64, I8),
            ShlD128 | ShrD128 => sig!(D128; D128, I8),
            ReinterpD64asI64 => sig!(I64; D64),
            ReinterpI64asD64 => sig!(D64; I64),
            D64HLtoD128 => sig!(D128; D64, D64),
            D128HItoD64 | D128LOtoD64 => sig!(D64; D128),

            NotV128 | Clz8x16 | Clz16x8 | Clz32x4 | Clz64x2 | PopCount8x16 | PopCount16x8
            | PopCount32x4 | PopCount64x2 | Neg32Fx4 | Abs32Fx4 | Neg64Fx2 | Abs64Fx2
            | RecipEst32Fx4 | RSqrtEst32Fx4 | Log2_32Fx4 | Exp2_32Fx4 | RoundF32x4RM
            | RoundF32x4RP | RoundF32x4RN | RoundF32x4RZ | F32toI32Ux4RZ | F32toI32Sx4RZ
            | I32UtoF32x4 | I32StoF32x4 | CipherSV128 => sig!(V128; V128),
            ShlV128 | ShrV128 | SHA256 | SHA512 => sig!(V128; V128, I8),
            Dup8x16 => sig!(V128; I8),
            Dup16x8 => sig!(V128; I16),
            Dup32x4 => sig!(V128; I32),
            Add32Fx4 | Sub32Fx4 | Mul32Fx4 | Div32Fx4 | Add64Fx2 | Sub64Fx2 | Mul64Fx2
            | Div64Fx2 => sig!(V128; I32, V128, V128),
            Sqrt32Fx4 | Sqrt64Fx2 => sig!(V128; I32, V128),
            BCDAdd | BCDSub => sig!(V128; V128, V128, I8),

            AndV128 | OrV128 | XorV128 | Add8x16 | Add16x8 | Add32x4 | Add64x2 | Add128x1
            | Sub8x16 | Sub16x8 | Sub32x4 | Sub64x2 | Sub128x1 | QAdd8Ux16 | QAdd16Ux8
            | QAdd32Ux4 | QAdd8Sx16 | QAdd16Sx8 | QAdd32Sx4 | QSub8Ux16 | QSub16Ux8
            | QSub32Ux4 | QSub8Sx16 | QSub16Sx8 | QSub32Sx4 | Avg8Ux16 | Avg16Ux8 | Avg32Ux4
            | Avg8Sx16 | Avg16Sx8 | Avg32Sx4 | Max8Ux16 | Max16Ux8 | Max32Ux4 | Max64Ux2
            | Max8Sx16 | Max16Sx8 | Max32Sx4 | Max64Sx2 | Min8Ux16 | Min16Ux8 | Min32Ux4
            | Min64Ux2 | Min8Sx16 | Min16Sx8 | Min32Sx4 | Min64Sx2 | Mul32x4 | MullEven8Ux16
            | MullEven16Ux8 | MullEven32Ux4 | MullEven8Sx16 | MullEven16Sx8 | MullEven32Sx4
            | CmpEQ8x16 | CmpEQ16x8 | CmpEQ32x4 | CmpEQ64x2 | CmpGT8Ux16 | CmpGT16Ux8
            | CmpGT32Ux4 | CmpGT64Ux2 | CmpGT8Sx16 | CmpGT16Sx8 | CmpGT32Sx4 | CmpGT64Sx2
            | Shl8x16 | Shl16x8 | Shl32x4 | Shl64x2 | Shr8x16 | Shr16x8 | Shr32x4 | Shr64x2
            | Sar8x16 | Sar16x8 | Sar32x4 | Sar64x2 | Rol8x16 | Rol16x8 | Rol32x4 | Rol64x2
            | Perm8x16 | InterleaveHI8x16 | InterleaveHI16x8 | InterleaveHI32x4
            | InterleaveHI64x2 | InterleaveLO8x16 | InterleaveLO16x8 | InterleaveLO32x4
            | InterleaveLO64x2 | InterleaveEvenLanes32x4 | InterleaveOddLanes32x4
            | NarrowBin16to8x16 | NarrowBin32to16x8 | NarrowBin64to32x4
            | QNarrowBin16Uto8Ux16 | QNarrowBin32Uto16Ux8 | QNarrowBin64Uto32Ux4
            | QNarrowBin16Sto8Sx16 | QNarrowBin32Sto16Sx8 | QNarrowBin64Sto32Sx4
            | QNarrowBin16Sto8Ux16 | QNarrowBin32Sto16Ux8 | QNarrowBin64Sto32Ux4
            | Max32Fx4 | Min32Fx4 | Max64Fx2 | Min64Fx2 | CmpEQ32Fx4 | CmpGT32Fx4
            | CmpGE32Fx4 | CmpEQ64Fx2 | CmpLT64Fx2 | CmpLE64Fx2 | CipherV128 | CipherLV128
            | NCipherV128 | NCipherLV128 | PolynomialMulAdd8x16 | PolynomialMulAdd16x8
            | PolynomialMulAdd32x4 | PolynomialMulAdd64x2 => sig!(V128; V128, V128),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_selects_width() {
        assert_eq!(Op::sized(SzOp::Add, IrType::I32), Op::Add32);
        assert_eq!(Op::sized(SzOp::Shl, IrType::I64), Op::Shl64);
        assert_eq!(Op::sized(SzOp::CmpNE, IrType::I8), Op::CmpNE8);
    }

    #[test]
    #[should_panic]
    fn test_sized_rejects_float() {
        let _ = Op::sized(SzOp::Add, IrType::F64);
    }

    #[test]
    fn test_signatures() {
        let s: Signature = Op::MullS32.signature();
        assert_eq!(s.ret, IrType::I64);
        assert_eq!(s.args, &[IrType::I32, IrType::I32]);
        assert_eq!(Op::MAddF64.signature().arity(), 4);
        assert_eq!(Op::Shl64.signature().args[1], IrType::I8);
        assert_eq!(Op::CmpF64.signature().ret, IrType::I32);
        assert_eq!(Op::Cat64HLtoV128.signature().ret, IrType::V128);
    }
}
