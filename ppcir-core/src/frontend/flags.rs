//! XER and CR Flag Computation
//!
//! IR-emitting helpers for the overflow (OV/SO), carry (CA) and
//! condition-register updates of integer instructions.
//!
//! # Width
//! Every helper takes its operands at the *effective operation width*:
//! word instructions (`mullw`, `divw`, `sraw`, ...) pass I32 operands even in
//! 64-bit mode, doubleword instructions pass I64, and instructions whose
//! width follows the mode (`add`, `subf`, `neg`, ...) pass mode-sized
//! values. Result, operands and old carry must all have the same type.
//!
//! # Formulas
//! | op | OV | CA |
//! |----|----|----|
//! | add, adde | sign of `~(L^R) & (L^res)` | `res <u L` (with carry-in: `res <=u L`) |
//! | subf, subfc, subfe | sign of `(L^R) & (~L^res)` | `res <=u R` (no carry-in: `res <u R`) |
//! | neg | `L == MIN` | |
//! | mullw, mulld | high half != sign of low half | |
//! | divw, divd | `R == 0 \|\| (L == MIN && R == -1)` | |
//! | sraw, srad | | `L <s 0 && shifted-out bits != 0` |

use crate::frontend::context::DecodeContext;
use crate::frontend::ir::{
    binop, ite, mk_u32, mk_u64, mk_u8, mkexpr, unop, Expr, IrType, Op, SzOp, Temp,
};

/// Operation kinds with distinct flag formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FlagOp {
    Add = 0,
    AddE = 1,
    Subf = 2,
    SubfC = 3,
    SubfE = 4,
    SubfI = 5,
    Neg = 6,
    MulLw = 7,
    MulLd = 8,
    DivW = 9,
    DivWU = 10,
    DivD = 11,
    DivDU = 12,
    DivWE = 13,
    DivWEU = 14,
    DivDE = 15,
    DivDEU = 16,
    Sraw = 17,
    Srawi = 18,
    Srad = 19,
    Sradi = 20,
}

struct W {
    ty: IrType,
    bits: u32,
}

impl W {
    fn of(ty: IrType) -> W {
        assert!(ty == IrType::I32 || ty == IrType::I64, "flag width must be I32 or I64, got {:?}", ty);
        W { ty, bits: ty.bits() }
    }

    fn op(&self, op: SzOp) -> Op {
        Op::sized(op, self.ty)
    }

    fn k(&self, v: u64) -> Expr {
        if self.bits == 64 {
            mk_u64(v)
        } else {
            mk_u32(v as u32)
        }
    }

    fn min(&self) -> Expr {
        self.k(1u64 << (self.bits - 1))
    }

    fn all_ones(&self) -> Expr {
        self.k(u64::MAX)
    }

    fn lt_u(&self) -> Op {
        if self.bits == 64 {
            Op::CmpLT64U
        } else {
            Op::CmpLT32U
        }
    }

    fn le_u(&self) -> Op {
        if self.bits == 64 {
            Op::CmpLE64U
        } else {
            Op::CmpLE32U
        }
    }

    fn lt_s(&self) -> Op {
        if self.bits == 64 {
            Op::CmpLT64S
        } else {
            Op::CmpLT32S
        }
    }

    /// Sign bit of `e` as I1.
    fn sign(&self, e: Expr) -> Expr {
        let sh: Expr = binop(self.op(SzOp::Shr), e, mk_u8((self.bits - 1) as u8));
        binop(self.op(SzOp::CmpNE), sh, self.k(0))
    }

    fn eq(&self, a: Expr, b: Expr) -> Expr {
        binop(self.op(SzOp::CmpEQ), a, b)
    }

    fn ne(&self, a: Expr, b: Expr) -> Expr {
        binop(self.op(SzOp::CmpNE), a, b)
    }
}

/// I1 overflow condition of `op`. Operands must be temporaries-backed
/// expressions; they may be read more than once.
pub fn overflow_of(op: FlagOp, ty: IrType, res: &Expr, arg_l: &Expr, arg_r: &Expr) -> Expr {
    let w: W = W::of(ty);
    let (l, r, res) = (arg_l.clone(), arg_r.clone(), res.clone());
    match op {
        FlagOp::Add | FlagOp::AddE => {
            // ((L ^ R ^ -1) & (L ^ res)) sign bit
            let a: Expr = binop(w.op(SzOp::Xor), binop(w.op(SzOp::Xor), l.clone(), r), w.all_ones());
            let b: Expr = binop(w.op(SzOp::Xor), l, res);
            w.sign(binop(w.op(SzOp::And), a, b))
        }
        FlagOp::Subf | FlagOp::SubfC | FlagOp::SubfE => {
            // ((~L ^ R ^ -1) & (~L ^ res)) sign bit
            let not_l: Expr = unop(w.op(SzOp::Not), l);
            let a: Expr =
                binop(w.op(SzOp::Xor), binop(w.op(SzOp::Xor), not_l.clone(), r), w.all_ones());
            let b: Expr = binop(w.op(SzOp::Xor), not_l, res);
            w.sign(binop(w.op(SzOp::And), a, b))
        }
        FlagOp::Neg => w.eq(l, w.min()),
        FlagOp::MulLw => {
            assert_eq!(w.bits, 32, "mullw overflow is a word computation");
            let prod: Expr = binop(Op::MullS32, l, r);
            let hi: Expr = unop(Op::Cast64HIto32, prod.clone());
            let lo: Expr = unop(Op::Cast64to32, prod);
            binop(Op::CmpNE32, hi, binop(Op::Sar32, lo, mk_u8(31)))
        }
        FlagOp::MulLd => {
            assert_eq!(w.bits, 64, "mulld overflow is a doubleword computation");
            let prod: Expr = binop(Op::MullS64, l, r);
            let hi: Expr = unop(Op::Cast128HIto64, prod.clone());
            let lo: Expr = unop(Op::Cast128to64, prod);
            binop(Op::CmpNE64, hi, binop(Op::Sar64, lo, mk_u8(63)))
        }
        FlagOp::DivW | FlagOp::DivD => {
            let by_zero: Expr = w.eq(r.clone(), w.k(0));
            let min_by_m1: Expr = binop(Op::And1, w.eq(l, w.min()), w.eq(r, w.all_ones()));
            binop(Op::Or1, by_zero, min_by_m1)
        }
        FlagOp::DivWU | FlagOp::DivDU => w.eq(r, w.k(0)),
        FlagOp::DivWEU | FlagOp::DivDEU => {
            // Quotient of (L << width) / R fits only when R > L.
            binop(Op::Or1, w.eq(r.clone(), w.k(0)), binop(w.le_u(), r, l))
        }
        FlagOp::DivWE | FlagOp::DivDE => {
            // A zero result from non-zero operands means the quotient overflowed.
            let zero_res: Expr = w.eq(res, w.k(0));
            let nz: Expr = binop(Op::And1, w.ne(l, w.k(0)), w.ne(r.clone(), w.k(0)));
            binop(Op::Or1, binop(Op::And1, zero_res, nz), w.eq(r, w.k(0)))
        }
        FlagOp::SubfI | FlagOp::Sraw | FlagOp::Srawi | FlagOp::Srad | FlagOp::Sradi => {
            panic!("{:?} has no overflow form", op)
        }
    }
}

/// I1 carry-out of `op`. `old_ca` is the incoming carry at the operation
/// width (0 or 1) and is only read by the extended forms.
pub fn carry_of(op: FlagOp, ty: IrType, res: &Expr, arg_l: &Expr, arg_r: &Expr, old_ca: &Expr) -> Expr {
    let w: W = W::of(ty);
    let (l, r, res) = (arg_l.clone(), arg_r.clone(), res.clone());
    match op {
        FlagOp::Add => binop(w.lt_u(), res, l),
        FlagOp::AddE => {
            // res <u L || (old_ca == 1 && res == L)
            let with_ca: Expr = binop(Op::And1, w.eq(old_ca.clone(), w.k(1)), w.eq(res.clone(), l.clone()));
            binop(Op::Or1, binop(w.lt_u(), res, l), with_ca)
        }
        FlagOp::Subf | FlagOp::SubfC | FlagOp::SubfI => binop(w.le_u(), res, r),
        FlagOp::SubfE => {
            // res <u R || (old_ca == 1 && res == R)
            let with_ca: Expr = binop(Op::And1, w.eq(old_ca.clone(), w.k(1)), w.eq(res.clone(), r.clone()));
            binop(Op::Or1, binop(w.lt_u(), res, r), with_ca)
        }
        FlagOp::Sraw | FlagOp::Srad => {
            // Amounts at or beyond the width shift in copies of the sign.
            let top: u64 = (w.bits - 1) as u64;
            let in_range: Expr = shifted_out_negative(&w, l.clone(), r.clone());
            let saturated: Expr = binop(w.lt_s(), l, w.k(0));
            ite(binop(w.lt_u(), w.k(top), r), saturated, in_range)
        }
        FlagOp::Srawi | FlagOp::Sradi => shifted_out_negative(&w, l, r),
        FlagOp::Neg
        | FlagOp::MulLw
        | FlagOp::MulLd
        | FlagOp::DivW
        | FlagOp::DivWU
        | FlagOp::DivD
        | FlagOp::DivDU
        | FlagOp::DivWE
        | FlagOp::DivWEU
        | FlagOp::DivDE
        | FlagOp::DivDEU => panic!("{:?} has no carry form", op),
    }
}

/// `(L <s 0) && (L & ((1 << amt) - 1)) != 0`, for amounts below the width.
fn shifted_out_negative(w: &W, l: Expr, amt: Expr) -> Expr {
    let amt8: Expr = if w.bits == 64 { unop(Op::Cast64to8, amt) } else { unop(Op::Cast32to8, amt) };
    let lost_mask: Expr = binop(w.op(SzOp::Sub), binop(w.op(SzOp::Shl), w.k(1), amt8), w.k(1));
    let lost: Expr = binop(w.op(SzOp::And), l.clone(), lost_mask);
    let sign_mask: Expr = binop(w.op(SzOp::Sar), l, mk_u8((w.bits - 1) as u8));
    w.ne(binop(w.op(SzOp::And), sign_mask, lost), w.k(0))
}

/// Write XER.OV and accumulate it into XER.SO.
pub fn set_xer_ov(ctx: &mut DecodeContext<'_>, op: FlagOp, res: &Expr, arg_l: &Expr, arg_r: &Expr) {
    let ty: IrType = ctx.type_of(res);
    let ov: Temp = ctx.tmp(unop(Op::Cast1Uto8, overflow_of(op, ty, res, arg_l, arg_r)));
    ctx.put_xer_ov(mkexpr(ov));
    let so: Expr = binop(Op::Or8, ctx.get_xer_so(), mkexpr(ov));
    ctx.put_xer_so(so);
}

/// Write XER.CA.
pub fn set_xer_ca(
    ctx: &mut DecodeContext<'_>,
    op: FlagOp,
    res: &Expr,
    arg_l: &Expr,
    arg_r: &Expr,
    old_ca: &Expr,
) {
    let ty: IrType = ctx.type_of(res);
    let ca: Expr = unop(Op::Cast1Uto8, carry_of(op, ty, res, arg_l, arg_r, old_ca));
    ctx.put_xer_ca(ca);
}

/// CR0 := signed compare of `result` against zero, with SO copied from XER.
pub fn set_cr0(ctx: &mut DecodeContext<'_>, result: &Expr) {
    let ty: IrType = ctx.type_of(result);
    let ord: Expr = match ty {
        IrType::I32 => unop(Op::Cast32to8, binop(Op::CmpORD32S, result.clone(), mk_u32(0))),
        IrType::I64 => unop(Op::Cast64to8, binop(Op::CmpORD64S, result.clone(), mk_u64(0))),
        other => panic!("set_cr0 on {:?}", other),
    };
    ctx.put_cr321(0, ord);
    let so: Expr = ctx.get_xer_so();
    ctx.put_cr0(0, so);
}

/// CR field `crf` := an 8/4/2 ordering value (I32 or I64) plus XER.SO.
pub fn set_cr_from_ord(ctx: &mut DecodeContext<'_>, crf: u32, ord: Expr) {
    let ty: IrType = ctx.type_of(&ord);
    let byte: Expr = match ty {
        IrType::I32 => unop(Op::Cast32to8, ord),
        IrType::I64 => unop(Op::Cast64to8, ord),
        IrType::I8 => ord,
        other => panic!("set_cr_from_ord on {:?}", other),
    };
    ctx.put_cr321(crf, byte);
    let so: Expr = ctx.get_xer_so();
    ctx.put_cr0(crf, so);
}

/// CR6 after a vector compare: bit 3 when every lane compared true
/// (`test_all_ones`), bit 1 when every lane compared false.
pub fn set_av_cr6(ctx: &mut DecodeContext<'_>, result: &Expr, test_all_ones: bool) {
    let [hi, lo] = ctx.break_v128_to_2x64(result.clone());
    let zeros: Expr = unop(
        Op::Cast1Uto8,
        binop(Op::CmpEQ64, binop(Op::Or64, mkexpr(hi), mkexpr(lo)), mk_u64(0)),
    );
    let mut cr: Expr = binop(Op::Shl8, zeros, mk_u8(1));
    if test_all_ones {
        let ones: Expr = unop(
            Op::Cast1Uto8,
            binop(Op::CmpEQ64, binop(Op::And64, mkexpr(hi), mkexpr(lo)), mk_u64(u64::MAX)),
        );
        cr = binop(Op::Or8, cr, binop(Op::Shl8, ones, mk_u8(3)));
    }
    ctx.put_cr321(6, cr);
    ctx.put_cr0(6, mk_u8(0));
}

/// CR1 after an FP record form. Exception summary bits are not tracked,
/// so the field reads as zero.
pub fn set_fp_cr1(ctx: &mut DecodeContext<'_>) {
    ctx.put_cr321(1, mk_u8(0));
    ctx.put_cr0(1, mk_u8(0));
}
