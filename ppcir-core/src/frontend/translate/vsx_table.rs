//! VSX XX2/XX3/XX4-form instructions (primary opcode 60).
//!
//! The extended opcode occupies different bit ranges per form, so every
//! entry is keyed by the ten bits 21..30 with the form's operand bits
//! (AX, BX, Rc, DM/SHW) cleared. [`lookup`] tries each form's mask in turn
//! and binary-searches the sorted [`TABLE`].
//!
//! Arithmetic is done per lane in F64: double lanes directly, single lanes
//! widened and computed with the `r32` operators so each result is
//! rounded once to single precision. Undefined result words are zero.

use smallvec::SmallVec;

use super::altivec::{element, splat_const};
use super::float::put_compare_result;
use super::{dis, reserved_zero, unknown, Translator};
use crate::frontend::context::{mk_v128_from_4x32, DecodeContext};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::{DecodeFailure, Extension, TranslateResult};
use crate::frontend::flags::set_av_cr6;
use crate::frontend::ir::{
    binop, mk_u32, mk_u64, mk_u8, mkexpr, qop, round, triop, unop, Expr, Op, Temp,
};

/// Instruction form; decides which bits of the key are opcode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// 9-bit XO in bits 21..29.
    Xx2,
    /// 8-bit XO in bits 21..28.
    Xx3,
    /// XX3 with a two-bit immediate in bits 22..23.
    Xx3Imm,
    /// XX3 with the record bit in bit 21.
    Xx3Rc,
    /// xxsel: XO in bits 26..27.
    Xx4,
}

impl Form {
    pub const fn mask(self) -> u32 {
        match self {
            Form::Xx2 => 0x3FE,
            Form::Xx3 => 0x3FC,
            Form::Xx3Imm => 0x27C,
            Form::Xx3Rc => 0x1FC,
            Form::Xx4 => 0x018,
        }
    }
}

/// Which lanes an FP operation reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Scalar double in doubleword 0.
    Sdp,
    /// Scalar single, held in double format in doubleword 0.
    Ssp,
    /// Two double lanes.
    Vdp,
    /// Four single lanes.
    Vsp,
}

impl Shape {
    const fn single(self) -> bool {
        matches!(self, Shape::Ssp | Shape::Vsp)
    }

    const fn lanes(self) -> usize {
        match self {
            Shape::Sdp | Shape::Ssp => 1,
            Shape::Vdp => 2,
            Shape::Vsp => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arith {
    Add,
    Sub,
    Mul,
    Div,
}

impl Arith {
    const fn op(self, single: bool) -> Op {
        match (self, single) {
            (Arith::Add, false) => Op::AddF64,
            (Arith::Sub, false) => Op::SubF64,
            (Arith::Mul, false) => Op::MulF64,
            (Arith::Div, false) => Op::DivF64,
            (Arith::Add, true) => Op::AddF64r32,
            (Arith::Sub, true) => Op::SubF64r32,
            (Arith::Mul, true) => Op::MulF64r32,
            (Arith::Div, true) => Op::DivF64r32,
        }
    }
}

/// Multiply-add variant. The A forms take XT as the addend, the M forms
/// as the second multiplicand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fma {
    pub sub: bool,
    pub negate: bool,
    pub m_form: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rel {
    Eq,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unary {
    Sqrt,
    RecipEst,
    RSqrtEst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOp {
    Abs,
    Nabs,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conv {
    /// xscvdpsp, xscvdpspn.
    ScalarDpToSp,
    /// xscvspdp, xscvspdpn.
    ScalarSpToDp,
    /// xscvdp{s,u}x{d,w}s.
    ScalarToInt { signed: bool, dword: bool },
    /// xscv{s,u}xd{dp,sp}.
    ScalarFromInt { signed: bool, single: bool },
    /// xvcvdpsp.
    VecDpToSp,
    /// xvcvspdp.
    VecSpToDp,
    /// xvcvdp{s,u}x{d,w}s.
    VecDpToInt { signed: bool, dword: bool },
    /// xvcvsp{s,u}x{d,w}s.
    VecSpToInt { signed: bool, dword: bool },
    /// xvcv{s,u}xd{dp,sp}.
    VecDwordToFp { signed: bool, single: bool },
    /// xvcv{s,u}xw{dp,sp}.
    VecWordToFp { signed: bool, single: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Arith(Shape, Arith),
    MulAdd(Shape, Fma),
    CmpScalar { ordered: bool },
    CmpVector(Shape, Rel),
    MaxMin(Shape, bool),
    CopySign(Shape),
    Unary(Shape, Unary),
    Sign(Shape, SignOp),
    /// Round to integral; `None` uses the current rounding mode.
    RoundInt(Shape, Option<u32>),
    Convert(Conv),
    Logical { op: Op, invert_b: bool, invert: bool },
    Merge { high: bool },
    SplatWord,
    ShiftWords,
    PermuteDwords,
    Select,
}

#[derive(Debug, Clone, Copy)]
pub struct VsxEntry {
    pub key: u32,
    pub form: Form,
    pub name: &'static str,
    pub kind: Kind,
    /// Added by ISA 2.07.
    pub isa207: bool,
}

const fn e(key: u32, form: Form, name: &'static str, kind: Kind, isa207: bool) -> VsxEntry {
    VsxEntry { key, form, name, kind, isa207 }
}

const fn fma(sub: bool, negate: bool, m_form: bool) -> Fma {
    Fma { sub, negate, m_form }
}

const fn logic(op: Op, invert_b: bool, invert: bool) -> Kind {
    Kind::Logical { op, invert_b, invert }
}

use self::Arith::{Add, Div, Mul, Sub};
use self::Form::{Xx2, Xx3, Xx3Imm, Xx3Rc, Xx4};
use self::Kind::{Arith as Ar, CmpVector, Convert, MaxMin, MulAdd, RoundInt, Sign};
use self::Shape::{Sdp, Ssp, Vdp, Vsp};

/// Sorted by key.
pub static TABLE: &[VsxEntry] = &[
    e(0x000, Xx3, "xsaddsp", Ar(Ssp, Add), true),
    e(0x004, Xx3, "xsmaddasp", MulAdd(Ssp, fma(false, false, false)), true),
    e(0x008, Xx3Imm, "xxsldwi", Kind::ShiftWords, false),
    e(0x014, Xx2, "xsrsqrtesp", Kind::Unary(Ssp, Unary::RSqrtEst), true),
    e(0x016, Xx2, "xssqrtsp", Kind::Unary(Ssp, Unary::Sqrt), true),
    e(0x018, Xx4, "xxsel", Kind::Select, false),
    e(0x020, Xx3, "xssubsp", Ar(Ssp, Sub), true),
    e(0x024, Xx3, "xsmaddmsp", MulAdd(Ssp, fma(false, false, true)), true),
    e(0x028, Xx3Imm, "xxpermdi", Kind::PermuteDwords, false),
    e(0x034, Xx2, "xsresp", Kind::Unary(Ssp, Unary::RecipEst), true),
    e(0x040, Xx3, "xsmulsp", Ar(Ssp, Mul), true),
    e(0x044, Xx3, "xsmsubasp", MulAdd(Ssp, fma(true, false, false)), true),
    e(0x048, Xx3, "xxmrghw", Kind::Merge { high: true }, false),
    e(0x060, Xx3, "xsdivsp", Ar(Ssp, Div), true),
    e(0x064, Xx3, "xsmsubmsp", MulAdd(Ssp, fma(true, false, true)), true),
    e(0x080, Xx3, "xsadddp", Ar(Sdp, Add), false),
    e(0x084, Xx3, "xsmaddadp", MulAdd(Sdp, fma(false, false, false)), false),
    e(0x08C, Xx3, "xscmpudp", Kind::CmpScalar { ordered: false }, false),
    e(0x090, Xx2, "xscvdpuxws", Convert(Conv::ScalarToInt { signed: false, dword: false }), false),
    e(0x092, Xx2, "xsrdpi", RoundInt(Sdp, Some(round::NEAREST_EVEN)), false),
    e(0x094, Xx2, "xsrsqrtedp", Kind::Unary(Sdp, Unary::RSqrtEst), false),
    e(0x096, Xx2, "xssqrtdp", Kind::Unary(Sdp, Unary::Sqrt), false),
    e(0x0A0, Xx3, "xssubdp", Ar(Sdp, Sub), false),
    e(0x0A4, Xx3, "xsmaddmdp", MulAdd(Sdp, fma(false, false, true)), false),
    e(0x0AC, Xx3, "xscmpodp", Kind::CmpScalar { ordered: true }, false),
    e(0x0B0, Xx2, "xscvdpsxws", Convert(Conv::ScalarToInt { signed: true, dword: false }), false),
    e(0x0B2, Xx2, "xsrdpiz", RoundInt(Sdp, Some(round::ZERO)), false),
    e(0x0B4, Xx2, "xsredp", Kind::Unary(Sdp, Unary::RecipEst), false),
    e(0x0C0, Xx3, "xsmuldp", Ar(Sdp, Mul), false),
    e(0x0C4, Xx3, "xsmsubadp", MulAdd(Sdp, fma(true, false, false)), false),
    e(0x0C8, Xx3, "xxmrglw", Kind::Merge { high: false }, false),
    e(0x0D2, Xx2, "xsrdpip", RoundInt(Sdp, Some(round::POS_INF)), false),
    e(0x0D6, Xx2, "xsrdpic", RoundInt(Sdp, None), false),
    e(0x0E0, Xx3, "xsdivdp", Ar(Sdp, Div), false),
    e(0x0E4, Xx3, "xsmsubmdp", MulAdd(Sdp, fma(true, false, true)), false),
    e(0x0F2, Xx2, "xsrdpim", RoundInt(Sdp, Some(round::NEG_INF)), false),
    e(0x100, Xx3, "xvaddsp", Ar(Vsp, Add), false),
    e(0x104, Xx3, "xvmaddasp", MulAdd(Vsp, fma(false, false, false)), false),
    e(0x10C, Xx3Rc, "xvcmpeqsp", CmpVector(Vsp, Rel::Eq), false),
    e(0x110, Xx2, "xvcvspuxws", Convert(Conv::VecSpToInt { signed: false, dword: false }), false),
    e(0x112, Xx2, "xvrspi", RoundInt(Vsp, Some(round::NEAREST_EVEN)), false),
    e(0x114, Xx2, "xvrsqrtesp", Kind::Unary(Vsp, Unary::RSqrtEst), false),
    e(0x116, Xx2, "xvsqrtsp", Kind::Unary(Vsp, Unary::Sqrt), false),
    e(0x120, Xx3, "xvsubsp", Ar(Vsp, Sub), false),
    e(0x124, Xx3, "xvmaddmsp", MulAdd(Vsp, fma(false, false, true)), false),
    e(0x12C, Xx3Rc, "xvcmpgtsp", CmpVector(Vsp, Rel::Gt), false),
    e(0x130, Xx2, "xvcvspsxws", Convert(Conv::VecSpToInt { signed: true, dword: false }), false),
    e(0x132, Xx2, "xvrspiz", RoundInt(Vsp, Some(round::ZERO)), false),
    e(0x134, Xx2, "xvresp", Kind::Unary(Vsp, Unary::RecipEst), false),
    e(0x140, Xx3, "xvmulsp", Ar(Vsp, Mul), false),
    e(0x144, Xx3, "xvmsubasp", MulAdd(Vsp, fma(true, false, false)), false),
    e(0x148, Xx2, "xxspltw", Kind::SplatWord, false),
    e(0x14C, Xx3Rc, "xvcmpgesp", CmpVector(Vsp, Rel::Ge), false),
    e(0x150, Xx2, "xvcvuxwsp", Convert(Conv::VecWordToFp { signed: false, single: true }), false),
    e(0x152, Xx2, "xvrspip", RoundInt(Vsp, Some(round::POS_INF)), false),
    e(0x156, Xx2, "xvrspic", RoundInt(Vsp, None), false),
    e(0x160, Xx3, "xvdivsp", Ar(Vsp, Div), false),
    e(0x164, Xx3, "xvmsubmsp", MulAdd(Vsp, fma(true, false, true)), false),
    e(0x170, Xx2, "xvcvsxwsp", Convert(Conv::VecWordToFp { signed: true, single: true }), false),
    e(0x172, Xx2, "xvrspim", RoundInt(Vsp, Some(round::NEG_INF)), false),
    e(0x180, Xx3, "xvadddp", Ar(Vdp, Add), false),
    e(0x184, Xx3, "xvmaddadp", MulAdd(Vdp, fma(false, false, false)), false),
    e(0x18C, Xx3Rc, "xvcmpeqdp", CmpVector(Vdp, Rel::Eq), false),
    e(0x190, Xx2, "xvcvdpuxws", Convert(Conv::VecDpToInt { signed: false, dword: false }), false),
    e(0x192, Xx2, "xvrdpi", RoundInt(Vdp, Some(round::NEAREST_EVEN)), false),
    e(0x194, Xx2, "xvrsqrtedp", Kind::Unary(Vdp, Unary::RSqrtEst), false),
    e(0x196, Xx2, "xvsqrtdp", Kind::Unary(Vdp, Unary::Sqrt), false),
    e(0x1A0, Xx3, "xvsubdp", Ar(Vdp, Sub), false),
    e(0x1A4, Xx3, "xvmaddmdp", MulAdd(Vdp, fma(false, false, true)), false),
    e(0x1AC, Xx3Rc, "xvcmpgtdp", CmpVector(Vdp, Rel::Gt), false),
    e(0x1B0, Xx2, "xvcvdpsxws", Convert(Conv::VecDpToInt { signed: true, dword: false }), false),
    e(0x1B2, Xx2, "xvrdpiz", RoundInt(Vdp, Some(round::ZERO)), false),
    e(0x1B4, Xx2, "xvredp", Kind::Unary(Vdp, Unary::RecipEst), false),
    e(0x1C0, Xx3, "xvmuldp", Ar(Vdp, Mul), false),
    e(0x1C4, Xx3, "xvmsubadp", MulAdd(Vdp, fma(true, false, false)), false),
    e(0x1CC, Xx3Rc, "xvcmpgedp", CmpVector(Vdp, Rel::Ge), false),
    e(0x1D0, Xx2, "xvcvuxwdp", Convert(Conv::VecWordToFp { signed: false, single: false }), false),
    e(0x1D2, Xx2, "xvrdpip", RoundInt(Vdp, Some(round::POS_INF)), false),
    e(0x1D6, Xx2, "xvrdpic", RoundInt(Vdp, None), false),
    e(0x1E0, Xx3, "xvdivdp", Ar(Vdp, Div), false),
    e(0x1E4, Xx3, "xvmsubmdp", MulAdd(Vdp, fma(true, false, true)), false),
    e(0x1F0, Xx2, "xvcvsxwdp", Convert(Conv::VecWordToFp { signed: true, single: false }), false),
    e(0x1F2, Xx2, "xvrdpim", RoundInt(Vdp, Some(round::NEG_INF)), false),
    e(0x204, Xx3, "xsnmaddasp", MulAdd(Ssp, fma(false, true, false)), true),
    e(0x208, Xx3, "xxland", logic(Op::AndV128, false, false), false),
    e(0x212, Xx2, "xscvdpsp", Convert(Conv::ScalarDpToSp), false),
    e(0x216, Xx2, "xscvdpspn", Convert(Conv::ScalarDpToSp), true),
    e(0x224, Xx3, "xsnmaddmsp", MulAdd(Ssp, fma(false, true, true)), true),
    e(0x228, Xx3, "xxlandc", logic(Op::AndV128, true, false), false),
    e(0x244, Xx3, "xsnmsubasp", MulAdd(Ssp, fma(true, true, false)), true),
    e(0x248, Xx3, "xxlor", logic(Op::OrV128, false, false), false),
    e(0x250, Xx2, "xscvuxdsp", Convert(Conv::ScalarFromInt { signed: false, single: true }), true),
    e(0x264, Xx3, "xsnmsubmsp", MulAdd(Ssp, fma(true, true, true)), true),
    e(0x268, Xx3, "xxlxor", logic(Op::XorV128, false, false), false),
    e(0x270, Xx2, "xscvsxdsp", Convert(Conv::ScalarFromInt { signed: true, single: true }), true),
    e(0x280, Xx3, "xsmaxdp", MaxMin(Sdp, true), false),
    e(0x284, Xx3, "xsnmaddadp", MulAdd(Sdp, fma(false, true, false)), false),
    e(0x288, Xx3, "xxlnor", logic(Op::OrV128, false, true), false),
    e(0x290, Xx2, "xscvdpuxds", Convert(Conv::ScalarToInt { signed: false, dword: true }), false),
    e(0x292, Xx2, "xscvspdp", Convert(Conv::ScalarSpToDp), false),
    e(0x296, Xx2, "xscvspdpn", Convert(Conv::ScalarSpToDp), true),
    e(0x2A0, Xx3, "xsmindp", MaxMin(Sdp, false), false),
    e(0x2A4, Xx3, "xsnmaddmdp", MulAdd(Sdp, fma(false, true, true)), false),
    e(0x2A8, Xx3, "xxlorc", logic(Op::OrV128, true, false), true),
    e(0x2B0, Xx2, "xscvdpsxds", Convert(Conv::ScalarToInt { signed: true, dword: true }), false),
    e(0x2B2, Xx2, "xsabsdp", Sign(Sdp, SignOp::Abs), false),
    e(0x2C0, Xx3, "xscpsgndp", Kind::CopySign(Sdp), false),
    e(0x2C4, Xx3, "xsnmsubadp", MulAdd(Sdp, fma(true, true, false)), false),
    e(0x2C8, Xx3, "xxlnand", logic(Op::AndV128, false, true), true),
    e(0x2D0, Xx2, "xscvuxddp", Convert(Conv::ScalarFromInt { signed: false, single: false }), false),
    e(0x2D2, Xx2, "xsnabsdp", Sign(Sdp, SignOp::Nabs), false),
    e(0x2E4, Xx3, "xsnmsubmdp", MulAdd(Sdp, fma(true, true, true)), false),
    e(0x2E8, Xx3, "xxleqv", logic(Op::XorV128, false, true), true),
    e(0x2F0, Xx2, "xscvsxddp", Convert(Conv::ScalarFromInt { signed: true, single: false }), false),
    e(0x2F2, Xx2, "xsnegdp", Sign(Sdp, SignOp::Neg), false),
    e(0x300, Xx3, "xvmaxsp", MaxMin(Vsp, true), false),
    e(0x304, Xx3, "xvnmaddasp", MulAdd(Vsp, fma(false, true, false)), false),
    e(0x310, Xx2, "xvcvspuxds", Convert(Conv::VecSpToInt { signed: false, dword: true }), false),
    e(0x312, Xx2, "xvcvdpsp", Convert(Conv::VecDpToSp), false),
    e(0x320, Xx3, "xvminsp", MaxMin(Vsp, false), false),
    e(0x324, Xx3, "xvnmaddmsp", MulAdd(Vsp, fma(false, true, true)), false),
    e(0x330, Xx2, "xvcvspsxds", Convert(Conv::VecSpToInt { signed: true, dword: true }), false),
    e(0x332, Xx2, "xvabssp", Sign(Vsp, SignOp::Abs), false),
    e(0x340, Xx3, "xvcpsgnsp", Kind::CopySign(Vsp), false),
    e(0x344, Xx3, "xvnmsubasp", MulAdd(Vsp, fma(true, true, false)), false),
    e(0x350, Xx2, "xvcvuxdsp", Convert(Conv::VecDwordToFp { signed: false, single: true }), false),
    e(0x352, Xx2, "xvnabssp", Sign(Vsp, SignOp::Nabs), false),
    e(0x364, Xx3, "xvnmsubmsp", MulAdd(Vsp, fma(true, true, true)), false),
    e(0x370, Xx2, "xvcvsxdsp", Convert(Conv::VecDwordToFp { signed: true, single: true }), false),
    e(0x372, Xx2, "xvnegsp", Sign(Vsp, SignOp::Neg), false),
    e(0x380, Xx3, "xvmaxdp", MaxMin(Vdp, true), false),
    e(0x384, Xx3, "xvnmaddadp", MulAdd(Vdp, fma(false, true, false)), false),
    e(0x390, Xx2, "xvcvdpuxds", Convert(Conv::VecDpToInt { signed: false, dword: true }), false),
    e(0x392, Xx2, "xvcvspdp", Convert(Conv::VecSpToDp), false),
    e(0x3A0, Xx3, "xvmindp", MaxMin(Vdp, false), false),
    e(0x3A4, Xx3, "xvnmaddmdp", MulAdd(Vdp, fma(false, true, true)), false),
    e(0x3B0, Xx2, "xvcvdpsxds", Convert(Conv::VecDpToInt { signed: true, dword: true }), false),
    e(0x3B2, Xx2, "xvabsdp", Sign(Vdp, SignOp::Abs), false),
    e(0x3C0, Xx3, "xvcpsgndp", Kind::CopySign(Vdp), false),
    e(0x3C4, Xx3, "xvnmsubadp", MulAdd(Vdp, fma(true, true, false)), false),
    e(0x3D0, Xx2, "xvcvuxddp", Convert(Conv::VecDwordToFp { signed: false, single: false }), false),
    e(0x3D2, Xx2, "xvnabsdp", Sign(Vdp, SignOp::Nabs), false),
    e(0x3E4, Xx3, "xvnmsubmdp", MulAdd(Vdp, fma(true, true, true)), false),
    e(0x3F0, Xx2, "xvcvsxddp", Convert(Conv::VecDwordToFp { signed: true, single: false }), false),
    e(0x3F2, Xx2, "xvnegdp", Sign(Vdp, SignOp::Neg), false),
];

fn find(key: u32, form: Form) -> Option<&'static VsxEntry> {
    let i: usize = TABLE.binary_search_by_key(&key, |e| e.key).ok()?;
    let entry: &VsxEntry = &TABLE[i];
    (entry.form == form).then_some(entry)
}

/// Table entry for a primary-60 instruction word.
pub fn lookup(w: InsnWord) -> Option<&'static VsxEntry> {
    let k: u32 = (w.raw() >> 1) & 0x3FF;
    if k & Xx4.mask() == Xx4.mask() {
        return find(Xx4.mask(), Xx4);
    }
    [Xx2, Xx3, Xx3Imm, Xx3Rc].into_iter().find_map(|form| find(k & form.mask(), form))
}

pub struct VsxTable;

impl Translator for VsxTable {
    fn name(&self) -> &'static str {
        "vsx-xx"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        let Some(entry) = lookup(w) else {
            return unknown(w, "VSX XX-form");
        };
        if entry.isa207 && !ctx.features.isa2_07 {
            return Err(DecodeFailure::missing(w.raw(), Extension::Isa2_07));
        }
        if entry.form == Xx2 {
            // xxspltw keeps its UIM in bits 14..15.
            let reserved: u32 = if entry.kind == Kind::SplatWord { w.field(11, 3) } else { w.ra() };
            reserved_zero(w, reserved, "XX2 bits 11..15")?;
        }
        emit(ctx, w, entry)
    }
}

fn emit(ctx: &mut DecodeContext<'_>, w: InsnWord, entry: &VsxEntry) -> TranslateResult {
    let (xt, xa, xb) = (w.xt(), w.xa(), w.xb());
    let name: &str = entry.name;
    let r: Expr = match entry.kind {
        Kind::Arith(shape, op) => {
            dis!("{} vs{},vs{},vs{}", name, xt, xa, xb);
            let rm: Temp = ctx.tmp(ctx.get_round_mode());
            let a: Lanes = f64_lanes(ctx, xa, shape);
            let b: Lanes = f64_lanes(ctx, xb, shape);
            let op: Op = op.op(shape.single());
            let out = (0..shape.lanes()).map(|i| triop(op, mkexpr(rm), mkexpr(a[i]), mkexpr(b[i])));
            from_f64_lanes(out.collect(), shape)
        }
        Kind::MulAdd(shape, f) => {
            dis!("{} vs{},vs{},vs{}", name, xt, xa, xb);
            let rm: Temp = ctx.tmp(ctx.get_round_mode());
            let a: Lanes = f64_lanes(ctx, xa, shape);
            let b: Lanes = f64_lanes(ctx, xb, shape);
            let t: Lanes = f64_lanes(ctx, xt, shape);
            let (mul2, addend) = if f.m_form { (&t, &b) } else { (&b, &t) };
            let op: Op = match (f.sub, shape.single()) {
                (false, false) => Op::MAddF64,
                (true, false) => Op::MSubF64,
                (false, true) => Op::MAddF64r32,
                (true, true) => Op::MSubF64r32,
            };
            let out = (0..shape.lanes()).map(|i| {
                let r: Expr = qop(op, mkexpr(rm), mkexpr(a[i]), mkexpr(mul2[i]), mkexpr(addend[i]));
                if f.negate {
                    unop(Op::NegF64, r)
                } else {
                    r
                }
            });
            from_f64_lanes(out.collect(), shape)
        }
        Kind::CmpScalar { .. } => {
            reserved_zero(w, w.field(9, 2) | (w.raw() & 1), "VSX compare reserved bits")?;
            let bf: u32 = w.crfd();
            dis!("{} cr{},vs{},vs{}", name, bf, xa, xb);
            let a: Lanes = f64_lanes(ctx, xa, Sdp);
            let b: Lanes = f64_lanes(ctx, xb, Sdp);
            let cc: Temp = ctx.tmp(binop(Op::CmpF64, mkexpr(a[0]), mkexpr(b[0])));
            put_compare_result(ctx, bf, cc);
            return Ok(());
        }
        Kind::CmpVector(shape, rel) => {
            let rc: bool = w.field(21, 1) != 0;
            dis!("{}{} vs{},vs{},vs{}", name, if rc { "." } else { "" }, xt, xa, xb);
            let a: Temp = ctx.tmp(ctx.get_vsreg(xa));
            let b: Temp = ctx.tmp(ctx.get_vsreg(xb));
            let (a, b) = (mkexpr(a), mkexpr(b));
            let r: Expr = match (shape, rel) {
                (Vdp, Rel::Eq) => binop(Op::CmpEQ64Fx2, a, b),
                (Vdp, Rel::Gt) => binop(Op::CmpLT64Fx2, b, a),
                (Vdp, Rel::Ge) => binop(Op::CmpLE64Fx2, b, a),
                (_, Rel::Eq) => binop(Op::CmpEQ32Fx4, a, b),
                (_, Rel::Gt) => binop(Op::CmpGT32Fx4, a, b),
                (_, Rel::Ge) => binop(Op::CmpGE32Fx4, a, b),
            };
            let r: Temp = ctx.tmp(r);
            if rc {
                set_av_cr6(ctx, &mkexpr(r), true);
            }
            mkexpr(r)
        }
        Kind::MaxMin(shape, max) => {
            dis!("{} vs{},vs{},vs{}", name, xt, xa, xb);
            let op: Op = match (shape, max) {
                (Vsp, true) => Op::Max32Fx4,
                (Vsp, false) => Op::Min32Fx4,
                (_, true) => Op::Max64Fx2,
                (_, false) => Op::Min64Fx2,
            };
            let r: Expr = binop(op, ctx.get_vsreg(xa), ctx.get_vsreg(xb));
            scalar_if(shape, r)
        }
        Kind::CopySign(shape) => {
            dis!("{} vs{},vs{},vs{}", name, xt, xa, xb);
            let sign: Temp = ctx.tmp(sign_mask(shape));
            let from_a: Expr = binop(Op::AndV128, ctx.get_vsreg(xa), mkexpr(sign));
            let from_b: Expr = binop(Op::AndV128, ctx.get_vsreg(xb), unop(Op::NotV128, mkexpr(sign)));
            scalar_if(shape, binop(Op::OrV128, from_a, from_b))
        }
        Kind::Unary(shape, op) => {
            dis!("{} vs{},vs{}", name, xt, xb);
            let rm: Temp = ctx.tmp(ctx.get_round_mode());
            let b: Lanes = f64_lanes(ctx, xb, shape);
            let out = (0..shape.lanes()).map(|i| {
                let x: Expr = mkexpr(b[i]);
                let r: Expr = match op {
                    Unary::Sqrt => binop(Op::SqrtF64, mkexpr(rm), x),
                    Unary::RecipEst => unop(Op::RecipEstF64, x),
                    Unary::RSqrtEst => unop(Op::RSqrtEstF64, x),
                };
                if shape.single() {
                    binop(Op::RoundF64toF32, mkexpr(rm), r)
                } else {
                    r
                }
            });
            from_f64_lanes(out.collect(), shape)
        }
        Kind::Sign(shape, op) => {
            dis!("{} vs{},vs{}", name, xt, xb);
            let b: Expr = ctx.get_vsreg(xb);
            let sign: Expr = sign_mask(shape);
            let r: Expr = match op {
                SignOp::Abs => binop(Op::AndV128, b, unop(Op::NotV128, sign)),
                SignOp::Nabs => binop(Op::OrV128, b, sign),
                SignOp::Neg => binop(Op::XorV128, b, sign),
            };
            scalar_if(shape, r)
        }
        Kind::RoundInt(shape, mode) => {
            dis!("{} vs{},vs{}", name, xt, xb);
            let rm: Temp = match mode {
                Some(m) => ctx.tmp(mk_u32(m)),
                None => ctx.tmp(ctx.get_round_mode()),
            };
            let b: Lanes = f64_lanes(ctx, xb, shape);
            let out = (0..shape.lanes()).map(|i| binop(Op::RoundF64toInt, mkexpr(rm), mkexpr(b[i])));
            from_f64_lanes(out.collect(), shape)
        }
        Kind::Convert(conv) => {
            dis!("{} vs{},vs{}", name, xt, xb);
            convert(ctx, xb, conv)
        }
        Kind::Logical { op, invert_b, invert } => {
            dis!("{} vs{},vs{},vs{}", name, xt, xa, xb);
            let a: Expr = ctx.get_vsreg(xa);
            let mut b: Expr = ctx.get_vsreg(xb);
            if invert_b {
                b = unop(Op::NotV128, b);
            }
            let r: Expr = binop(op, a, b);
            if invert {
                unop(Op::NotV128, r)
            } else {
                r
            }
        }
        Kind::Merge { high } => {
            dis!("{} vs{},vs{},vs{}", name, xt, xa, xb);
            let op: Op = if high { Op::InterleaveHI32x4 } else { Op::InterleaveLO32x4 };
            binop(op, ctx.get_vsreg(xa), ctx.get_vsreg(xb))
        }
        Kind::SplatWord => {
            let uim: u32 = w.xx_uim();
            dis!("{} vs{},vs{},{}", name, xt, xb, uim);
            unop(Op::Dup32x4, element(ctx.get_vsreg(xb), 4, uim))
        }
        Kind::ShiftWords => {
            let shw: u32 = w.xx_dm();
            dis!("{} vs{},vs{},vs{},{}", name, xt, xa, xb, shw);
            let a: Expr = ctx.get_vsreg(xa);
            if shw == 0 {
                a
            } else {
                binop(
                    Op::OrV128,
                    binop(Op::ShlV128, a, mk_u8((32 * shw) as u8)),
                    binop(Op::ShrV128, ctx.get_vsreg(xb), mk_u8((32 * (4 - shw)) as u8)),
                )
            }
        }
        Kind::PermuteDwords => {
            let dm: u32 = w.xx_dm();
            dis!("{} vs{},vs{},vs{},{}", name, xt, xa, xb, dm);
            let hi_op: Op = if dm & 2 != 0 { Op::CastV128to64 } else { Op::CastV128HIto64 };
            let lo_op: Op = if dm & 1 != 0 { Op::CastV128to64 } else { Op::CastV128HIto64 };
            binop(
                Op::Cat64HLtoV128,
                unop(hi_op, ctx.get_vsreg(xa)),
                unop(lo_op, ctx.get_vsreg(xb)),
            )
        }
        Kind::Select => {
            let xc: u32 = w.xc();
            dis!("{} vs{},vs{},vs{},vs{}", name, xt, xa, xb, xc);
            let c: Temp = ctx.tmp(ctx.get_vsreg(xc));
            binop(
                Op::OrV128,
                binop(Op::AndV128, ctx.get_vsreg(xa), unop(Op::NotV128, mkexpr(c))),
                binop(Op::AndV128, ctx.get_vsreg(xb), mkexpr(c)),
            )
        }
    };
    ctx.put_vsreg(xt, r);
    Ok(())
}

type Lanes = SmallVec<[Temp; 4]>;

/// F64 values of the lanes `shape` reads from VSR `r`.
fn f64_lanes(ctx: &mut DecodeContext<'_>, r: u32, shape: Shape) -> Lanes {
    let v: Expr = ctx.get_vsreg(r);
    match shape {
        Sdp | Ssp => {
            let d: Expr = unop(Op::ReinterpI64asF64, unop(Op::CastV128HIto64, v));
            let mut out: Lanes = SmallVec::new();
            out.push(ctx.tmp(d));
            out
        }
        Vdp => {
            let dws: [Temp; 2] = ctx.break_v128_to_2x64(v);
            dws.into_iter().map(|d| ctx.tmp(unop(Op::ReinterpI64asF64, mkexpr(d)))).collect()
        }
        Vsp => {
            let words: [Temp; 4] = ctx.break_v128_to_4x32(v);
            words
                .into_iter()
                .map(|x| ctx.tmp(unop(Op::F32toF64, unop(Op::ReinterpI32asF32, mkexpr(x)))))
                .collect()
        }
    }
}

/// Pack per-lane F64 results back into a vector.
fn from_f64_lanes(lanes: SmallVec<[Expr; 4]>, shape: Shape) -> Expr {
    assert_eq!(lanes.len(), shape.lanes(), "lane count for {:?}", shape);
    let bits = |e: &Expr| unop(Op::ReinterpF64asI64, e.clone());
    match shape {
        Sdp | Ssp => binop(Op::Cat64HLtoV128, bits(&lanes[0]), mk_u64(0)),
        Vdp => binop(Op::Cat64HLtoV128, bits(&lanes[0]), bits(&lanes[1])),
        Vsp => {
            // Lane values are already single-rounded; the narrowing is exact.
            let word = |e: &Expr| {
                unop(Op::ReinterpF32asI32, binop(Op::F64toF32, mk_u32(round::NEAREST_EVEN), e.clone()))
            };
            mk_v128_from_4x32([word(&lanes[0]), word(&lanes[1]), word(&lanes[2]), word(&lanes[3])])
        }
    }
}

/// Sign bit of every lane `shape` covers.
fn sign_mask(shape: Shape) -> Expr {
    match shape {
        Vsp => splat_const(32, 0x8000_0000),
        _ => splat_const(64, 1 << 63),
    }
}

/// Keep only doubleword 0 for scalar shapes.
fn scalar_if(shape: Shape, v: Expr) -> Expr {
    match shape {
        Sdp | Ssp => binop(Op::Cat64HLtoV128, unop(Op::CastV128HIto64, v), mk_u64(0)),
        _ => v,
    }
}

/// An I32 word in the upper half of a doubleword.
fn word_hi(word: Expr) -> Expr {
    binop(Op::Cat32HLto64, word, mk_u32(0))
}

fn convert(ctx: &mut DecodeContext<'_>, xb: u32, conv: Conv) -> Expr {
    let rm: Temp = ctx.tmp(ctx.get_round_mode());
    let rz = || mk_u32(round::ZERO);
    let to_f32_bits = |d: Expr| unop(Op::ReinterpF32asI32, binop(Op::F64toF32, mkexpr(rm), d));
    let f32_to_f64 = |x: Expr| unop(Op::F32toF64, unop(Op::ReinterpI32asF32, x));
    let to_int = |d: Expr, signed: bool, dword: bool| match (signed, dword) {
        (true, true) => binop(Op::F64toI64S, rz(), d),
        (false, true) => binop(Op::F64toI64U, rz(), d),
        (true, false) => unop(Op::Cast32Sto64, binop(Op::F64toI32S, rz(), d)),
        (false, false) => unop(Op::Cast32Uto64, binop(Op::F64toI32U, rz(), d)),
    };
    let from_int = |i: Expr, signed: bool, single: bool| match (signed, single) {
        (true, false) => binop(Op::I64StoF64, mkexpr(rm), i),
        (false, false) => binop(Op::I64UtoF64, mkexpr(rm), i),
        (true, true) => binop(Op::I64StoF32, mkexpr(rm), i),
        (false, true) => binop(Op::I64UtoF32, mkexpr(rm), i),
    };
    let v: Expr = ctx.get_vsreg(xb);
    match conv {
        Conv::ScalarDpToSp => {
            let d: Expr = unop(Op::ReinterpI64asF64, unop(Op::CastV128HIto64, v));
            binop(Op::Cat64HLtoV128, word_hi(to_f32_bits(d)), mk_u64(0))
        }
        Conv::ScalarSpToDp => {
            let d: Expr = f32_to_f64(unop(Op::Cast64HIto32, unop(Op::CastV128HIto64, v)));
            binop(Op::Cat64HLtoV128, unop(Op::ReinterpF64asI64, d), mk_u64(0))
        }
        Conv::ScalarToInt { signed, dword } => {
            let d: Expr = unop(Op::ReinterpI64asF64, unop(Op::CastV128HIto64, v));
            binop(Op::Cat64HLtoV128, to_int(d, signed, dword), mk_u64(0))
        }
        Conv::ScalarFromInt { signed, single } => {
            let mut d: Expr = from_int(unop(Op::CastV128HIto64, v), signed, single);
            if single {
                d = unop(Op::F32toF64, d);
            }
            binop(Op::Cat64HLtoV128, unop(Op::ReinterpF64asI64, d), mk_u64(0))
        }
        Conv::VecDpToSp => {
            let [hi, lo] = ctx.break_v128_to_2x64(v);
            let lane = |t: Temp| word_hi(to_f32_bits(unop(Op::ReinterpI64asF64, mkexpr(t))));
            binop(Op::Cat64HLtoV128, lane(hi), lane(lo))
        }
        Conv::VecSpToDp => {
            let words: [Temp; 4] = ctx.break_v128_to_4x32(v);
            let lane = |t: Temp| unop(Op::ReinterpF64asI64, f32_to_f64(mkexpr(t)));
            binop(Op::Cat64HLtoV128, lane(words[0]), lane(words[2]))
        }
        Conv::VecDpToInt { signed, dword } => {
            let [hi, lo] = ctx.break_v128_to_2x64(v);
            let lane = |t: Temp| {
                let i: Expr = to_int(unop(Op::ReinterpI64asF64, mkexpr(t)), signed, dword);
                if dword {
                    i
                } else {
                    word_hi(unop(Op::Cast64to32, i))
                }
            };
            binop(Op::Cat64HLtoV128, lane(hi), lane(lo))
        }
        Conv::VecSpToInt { signed, dword: false } => {
            let op: Op = if signed { Op::F32toI32Sx4RZ } else { Op::F32toI32Ux4RZ };
            unop(op, v)
        }
        Conv::VecSpToInt { signed, dword: true } => {
            let words: [Temp; 4] = ctx.break_v128_to_4x32(v);
            let lane = |t: Temp| to_int(f32_to_f64(mkexpr(t)), signed, true);
            binop(Op::Cat64HLtoV128, lane(words[0]), lane(words[2]))
        }
        Conv::VecDwordToFp { signed, single } => {
            let [hi, lo] = ctx.break_v128_to_2x64(v);
            let lane = |t: Temp| {
                let f: Expr = from_int(mkexpr(t), signed, single);
                if single {
                    word_hi(unop(Op::ReinterpF32asI32, f))
                } else {
                    unop(Op::ReinterpF64asI64, f)
                }
            };
            binop(Op::Cat64HLtoV128, lane(hi), lane(lo))
        }
        Conv::VecWordToFp { signed, single: true } => {
            let op: Op = if signed { Op::I32StoF32x4 } else { Op::I32UtoF32x4 };
            unop(op, v)
        }
        Conv::VecWordToFp { signed, single: false } => {
            let words: [Temp; 4] = ctx.break_v128_to_4x32(v);
            let widen: Op = if signed { Op::Cast32Sto64 } else { Op::Cast32Uto64 };
            let lane = |t: Temp| unop(Op::ReinterpF64asI64, from_int(unop(widen, mkexpr(t)), signed, false));
            binop(Op::Cat64HLtoV128, lane(words[0]), lane(words[2]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sorted_and_canonical() {
        for pair in TABLE.windows(2) {
            assert!(pair[0].key < pair[1].key, "{} before {}", pair[0].name, pair[1].name);
        }
        for entry in TABLE {
            assert_eq!(entry.key & entry.form.mask(), entry.key, "{}", entry.name);
        }
    }

    #[test]
    fn test_every_entry_decodes_with_any_operand_bits() {
        for entry in TABLE {
            let free: u32 = 0x3FF & !entry.form.mask();
            // Enumerate every subset of the operand bits.
            let mut sub: u32 = free;
            loop {
                let word: u32 = (60 << 26) | ((entry.key | sub) << 1);
                let got = lookup(InsnWord(word)).map(|e| e.name);
                assert_eq!(got, Some(entry.name), "key 0x{:03X} operand bits 0x{:03X}", entry.key, sub);
                if sub == 0 {
                    break;
                }
                sub = (sub - 1) & free;
            }
        }
    }

    #[test]
    fn test_lookup_known_words() {
        // xsadddp vs1,vs2,vs3
        assert_eq!(lookup(InsnWord(0xF022_1900)).map(|e| e.name), Some("xsadddp"));
        // xxlxor vs0,vs0,vs0
        assert_eq!(lookup(InsnWord(0xF000_04D0)).map(|e| e.name), Some("xxlxor"));
        // xvcmpeqdp. vs0,vs0,vs0
        assert_eq!(lookup(InsnWord(0xF000_0718)).map(|e| e.name), Some("xvcmpeqdp"));
    }
}
