//! Altivec (VMX) integer, logical, permute and load/store instructions.
//!
//! Element numbering follows the architecture: element 0 is the most
//! significant lane of the register. IR lane ops number lanes from the
//! least significant end, which only matters for byte permutes
//! ([`perm_be`]) and element extraction ([`element`]).
//!
//! Saturating adds and subtracts set VSCR.SAT when any lane of the
//! saturated result differs from the modular result. Saturating packs test
//! the source lanes against the destination range.

use super::{dis, reserved_zero, unknown, Translator};
use crate::frontend::bits::extend_s;
use crate::frontend::context::{mk_v128_from_4x32, vscr, DecodeContext, GuestReg};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::flags::set_av_cr6;
use crate::frontend::ir::{
    binop, mk_u16, mk_u32, mk_u64, mk_u8, mk_v128_bits, mkexpr, unop, Expr, IrType, Op, SzOp, Temp,
};

pub struct Altivec;

impl Translator for Altivec {
    fn name(&self) -> &'static str {
        "altivec"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        match w.opc1() {
            31 => load_store(ctx, w),
            4 if matches!(w.va_xo6(), 42 | 43 | 44) => va_form(ctx, w),
            4 if compare_op(w.vc_xo10()).is_some() => compare(ctx, w),
            4 => vx_form(ctx, w),
            _ => unknown(w, "altivec"),
        }
    }
}

/// Replicate the low `lane_bits` of `value` across a vector.
pub(super) fn splat_const(lane_bits: u32, value: u64) -> Expr {
    let mask: u64 = if lane_bits == 64 { u64::MAX } else { (1u64 << lane_bits) - 1 };
    let mut pattern: u64 = 0;
    let mut shift: u32 = 0;
    while shift < 64 {
        pattern |= (value & mask) << shift;
        shift += lane_bits;
    }
    mk_v128_bits(pattern, pattern)
}

/// Element `idx` (architectural numbering) of a vector with `lanes`
/// lanes, as the low bits of an I32.
pub(super) fn element(v: Expr, lanes: u32, idx: u32) -> Expr {
    let bits: u32 = 128 / lanes;
    let shift: u32 = bits * (lanes - 1 - idx);
    let moved: Expr = if shift == 0 { v } else { binop(Op::ShrV128, v, mk_u8(shift as u8)) };
    unop(Op::CastV128to32, moved)
}

/// Byte permute with architectural control bytes: result byte `i` is
/// byte `ctrl[i] & 15` of `src`, both counted from the most significant
/// end.
pub(super) fn perm_be(src: Expr, ctrl: Expr) -> Expr {
    binop(Op::Perm8x16, src, binop(Op::XorV128, ctrl, splat_const(8, 0x0F)))
}

/// OR `flag` (I1) into VSCR.SAT.
pub(super) fn or_into_sat(ctx: &mut DecodeContext<'_>, flag: Expr) {
    let old: Expr = ctx.get_gst(GuestReg::Vscr);
    let sat: Expr = binop(Op::And32, unop(Op::Cast1Uto32, flag), mk_u32(vscr::SAT));
    ctx.put_gst(GuestReg::Vscr, binop(Op::Or32, old, sat));
}

/// I1: any bit of the vector is set.
pub(super) fn any_set(ctx: &mut DecodeContext<'_>, v: Expr) -> Expr {
    let [hi, lo] = ctx.break_v128_to_2x64(v);
    binop(Op::CmpNE64, binop(Op::Or64, mkexpr(hi), mkexpr(lo)), mk_u64(0))
}

fn vector_addr(ctx: &DecodeContext<'_>, ea: Temp, align: u64) -> Expr {
    binop(ctx.sz_op(SzOp::And), mkexpr(ea), ctx.mk_sz_imm(!(align - 1)))
}

/// Vector loads and stores under primary 31, plus lvsl/lvsr.
fn load_store(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.rc() as u32, "vector load/store bit 31")?;
    let (vd, ra, rb) = (w.rd(), w.ra(), w.rb());
    let ea: Temp = ctx.tmp(ctx.ea_ra_or0_idx(ra, rb));
    match w.xo10() {
        xo @ (6 | 38) => {
            let left: bool = xo == 6;
            dis!("lvs{} v{},r{},r{}", if left { "l" } else { "r" }, vd, ra, rb);
            let sh: Expr = ctx.narrow_from_word(
                binop(ctx.sz_op(SzOp::And), mkexpr(ea), ctx.mk_sz_imm(15)),
                IrType::I8,
            );
            let sh: Expr = unop(Op::Dup8x16, sh);
            let r: Expr = if left {
                binop(Op::Add8x16, mk_v128_bits(0x0001_0203_0405_0607, 0x0809_0A0B_0C0D_0E0F), sh)
            } else {
                binop(Op::Sub8x16, mk_v128_bits(0x1011_1213_1415_1617, 0x1819_1A1B_1C1D_1E1F), sh)
            };
            ctx.put_vreg(vd, r);
        }
        xo @ (7 | 39 | 71 | 103 | 359) => {
            let name: &str = match xo {
                7 => "lvebx",
                39 => "lvehx",
                71 => "lvewx",
                103 => "lvx",
                _ => "lvxl",
            };
            dis!("{} v{},r{},r{}", name, vd, ra, rb);
            // Element loads fill the whole register from the aligned
            // quadword; the other elements are undefined.
            let v: Expr = ctx.load(IrType::V128, vector_addr(ctx, ea, 16));
            ctx.put_vreg(vd, v);
        }
        231 | 487 => {
            dis!("{} v{},r{},r{}", if w.xo10() == 231 { "stvx" } else { "stvxl" }, vd, ra, rb);
            let addr: Expr = vector_addr(ctx, ea, 16);
            let v: Expr = ctx.get_vreg(vd);
            ctx.store(addr, v);
        }
        xo @ (135 | 167 | 199) => {
            let (name, bytes) = match xo {
                135 => ("stvebx", 1u64),
                167 => ("stvehx", 2),
                _ => ("stvewx", 4),
            };
            dis!("{} v{},r{},r{}", name, vd, ra, rb);
            // Byte offset of the element within the quadword, then the
            // bit shift that brings it to the low end.
            let off: Expr = binop(ctx.sz_op(SzOp::And), mkexpr(ea), ctx.mk_sz_imm(16 - bytes));
            let off: Expr = ctx.narrow_from_word(off, IrType::I8);
            let shift: Expr = binop(Op::Shl8, binop(Op::Sub8, mk_u8((16 - bytes) as u8), off), mk_u8(3));
            let lane: Expr = unop(Op::CastV128to32, binop(Op::ShrV128, ctx.get_vreg(vd), shift));
            let data: Expr = match bytes {
                1 => unop(Op::Cast32to8, lane),
                2 => unop(Op::Cast32to16, lane),
                _ => lane,
            };
            let addr: Expr = vector_addr(ctx, ea, bytes);
            ctx.store(addr, data);
        }
        _ => return unknown(w, "vector load/store"),
    }
    Ok(())
}

/// vsel, vperm, vsldoi.
fn va_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (vd, va, vb, vc) = (w.rd(), w.ra(), w.rb(), w.rc_field());
    let a: Expr = ctx.get_vreg(va);
    let b: Expr = ctx.get_vreg(vb);
    let r: Expr = match w.va_xo6() {
        42 => {
            dis!("vsel v{},v{},v{},v{}", vd, va, vb, vc);
            let c: Temp = ctx.tmp(ctx.get_vreg(vc));
            binop(
                Op::OrV128,
                binop(Op::AndV128, a, unop(Op::NotV128, mkexpr(c))),
                binop(Op::AndV128, b, mkexpr(c)),
            )
        }
        43 => {
            dis!("vperm v{},v{},v{},v{}", vd, va, vb, vc);
            let c: Temp = ctx.tmp(ctx.get_vreg(vc));
            // Control bit 4 selects vB.
            let take_b: Expr = binop(
                Op::Sar8x16,
                binop(Op::Shl8x16, mkexpr(c), splat_const(8, 3)),
                splat_const(8, 7),
            );
            let take_b: Temp = ctx.tmp(take_b);
            binop(
                Op::OrV128,
                binop(Op::AndV128, perm_be(a, mkexpr(c)), unop(Op::NotV128, mkexpr(take_b))),
                binop(Op::AndV128, perm_be(b, mkexpr(c)), mkexpr(take_b)),
            )
        }
        _ => {
            reserved_zero(w, w.field(21, 1), "vsldoi bit 21")?;
            let shb: u32 = w.field(22, 4);
            dis!("vsldoi v{},v{},v{},{}", vd, va, vb, shb);
            if shb == 0 {
                a
            } else {
                binop(
                    Op::OrV128,
                    binop(Op::ShlV128, a, mk_u8((shb * 8) as u8)),
                    binop(Op::ShrV128, b, mk_u8(((16 - shb) * 8) as u8)),
                )
            }
        }
    };
    ctx.put_vreg(vd, r);
    Ok(())
}

/// Integer compares: (mnemonic, lane op). `vcmpequd` and friends are ISA
/// 2.07 and gated by the dispatcher.
fn compare_op(xo: u32) -> Option<(&'static str, Op)> {
    Some(match xo {
        6 => ("vcmpequb", Op::CmpEQ8x16),
        70 => ("vcmpequh", Op::CmpEQ16x8),
        134 => ("vcmpequw", Op::CmpEQ32x4),
        199 => ("vcmpequd", Op::CmpEQ64x2),
        518 => ("vcmpgtub", Op::CmpGT8Ux16),
        582 => ("vcmpgtuh", Op::CmpGT16Ux8),
        646 => ("vcmpgtuw", Op::CmpGT32Ux4),
        711 => ("vcmpgtud", Op::CmpGT64Ux2),
        774 => ("vcmpgtsb", Op::CmpGT8Sx16),
        838 => ("vcmpgtsh", Op::CmpGT16Sx8),
        902 => ("vcmpgtsw", Op::CmpGT32Sx4),
        967 => ("vcmpgtsd", Op::CmpGT64Sx2),
        _ => return None,
    })
}

fn compare(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let Some((name, op)) = compare_op(w.vc_xo10()) else {
        return unknown(w, "vector compare");
    };
    let (vd, va, vb) = (w.rd(), w.ra(), w.rb());
    let rc: bool = w.vc_rc();
    dis!("{}{} v{},v{},v{}", name, if rc { "." } else { "" }, vd, va, vb);
    let r: Temp = ctx.tmp(binop(op, ctx.get_vreg(va), ctx.get_vreg(vb)));
    ctx.put_vreg(vd, mkexpr(r));
    if rc {
        set_av_cr6(ctx, &mkexpr(r), true);
    }
    Ok(())
}

/// A lane-wise binary op; `modular` names the wrapping counterpart of a
/// saturating op.
#[derive(Debug, Clone, Copy)]
struct VBin {
    name: &'static str,
    op: Op,
    modular: Option<Op>,
}

const fn vb(name: &'static str, op: Op) -> VBin {
    VBin { name, op, modular: None }
}

const fn vs(name: &'static str, op: Op, modular: Op) -> VBin {
    VBin { name, op, modular: Some(modular) }
}

fn binary_op(xo: u32) -> Option<VBin> {
    use Op::*;
    Some(match xo {
        0 => vb("vaddubm", Add8x16),
        64 => vb("vadduhm", Add16x8),
        128 => vb("vadduwm", Add32x4),
        192 => vb("vaddudm", Add64x2),
        256 => vb("vadduqm", Add128x1),
        512 => vs("vaddubs", QAdd8Ux16, Add8x16),
        576 => vs("vadduhs", QAdd16Ux8, Add16x8),
        640 => vs("vadduws", QAdd32Ux4, Add32x4),
        768 => vs("vaddsbs", QAdd8Sx16, Add8x16),
        832 => vs("vaddshs", QAdd16Sx8, Add16x8),
        896 => vs("vaddsws", QAdd32Sx4, Add32x4),
        1024 => vb("vsububm", Sub8x16),
        1088 => vb("vsubuhm", Sub16x8),
        1152 => vb("vsubuwm", Sub32x4),
        1216 => vb("vsubudm", Sub64x2),
        1280 => vb("vsubuqm", Sub128x1),
        1536 => vs("vsububs", QSub8Ux16, Sub8x16),
        1600 => vs("vsubuhs", QSub16Ux8, Sub16x8),
        1664 => vs("vsubuws", QSub32Ux4, Sub32x4),
        1792 => vs("vsubsbs", QSub8Sx16, Sub8x16),
        1856 => vs("vsubshs", QSub16Sx8, Sub16x8),
        1920 => vs("vsubsws", QSub32Sx4, Sub32x4),

        1026 => vb("vavgub", Avg8Ux16),
        1090 => vb("vavguh", Avg16Ux8),
        1154 => vb("vavguw", Avg32Ux4),
        1282 => vb("vavgsb", Avg8Sx16),
        1346 => vb("vavgsh", Avg16Sx8),
        1410 => vb("vavgsw", Avg32Sx4),

        2 => vb("vmaxub", Max8Ux16),
        66 => vb("vmaxuh", Max16Ux8),
        130 => vb("vmaxuw", Max32Ux4),
        194 => vb("vmaxud", Max64Ux2),
        258 => vb("vmaxsb", Max8Sx16),
        322 => vb("vmaxsh", Max16Sx8),
        386 => vb("vmaxsw", Max32Sx4),
        450 => vb("vmaxsd", Max64Sx2),
        514 => vb("vminub", Min8Ux16),
        578 => vb("vminuh", Min16Ux8),
        642 => vb("vminuw", Min32Ux4),
        706 => vb("vminud", Min64Ux2),
        770 => vb("vminsb", Min8Sx16),
        834 => vb("vminsh", Min16Sx8),
        898 => vb("vminsw", Min32Sx4),
        962 => vb("vminsd", Min64Sx2),

        137 => vb("vmuluwm", Mul32x4),

        4 => vb("vrlb", Rol8x16),
        68 => vb("vrlh", Rol16x8),
        132 => vb("vrlw", Rol32x4),
        196 => vb("vrld", Rol64x2),
        260 => vb("vslb", Shl8x16),
        324 => vb("vslh", Shl16x8),
        388 => vb("vslw", Shl32x4),
        1476 => vb("vsld", Shl64x2),
        516 => vb("vsrb", Shr8x16),
        580 => vb("vsrh", Shr16x8),
        644 => vb("vsrw", Shr32x4),
        1732 => vb("vsrd", Shr64x2),
        772 => vb("vsrab", Sar8x16),
        836 => vb("vsrah", Sar16x8),
        900 => vb("vsraw", Sar32x4),
        964 => vb("vsrad", Sar64x2),

        12 => vb("vmrghb", InterleaveHI8x16),
        76 => vb("vmrghh", InterleaveHI16x8),
        140 => vb("vmrghw", InterleaveHI32x4),
        268 => vb("vmrglb", InterleaveLO8x16),
        332 => vb("vmrglh", InterleaveLO16x8),
        396 => vb("vmrglw", InterleaveLO32x4),
        1932 => vb("vmrgew", InterleaveEvenLanes32x4),
        1676 => vb("vmrgow", InterleaveOddLanes32x4),

        14 => vb("vpkuhum", NarrowBin16to8x16),
        78 => vb("vpkuwum", NarrowBin32to16x8),
        1102 => vb("vpkudum", NarrowBin64to32x4),
        _ => return None,
    })
}

/// Source-lane signedness and destination range of a saturating pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackSat {
    /// Unsigned source to unsigned destination.
    UU,
    /// Signed source to unsigned destination.
    SU,
    /// Signed source to signed destination.
    SS,
}

fn pack_op(xo: u32) -> Option<(&'static str, Op, u32, PackSat)> {
    use Op::*;
    use PackSat::{SS, SU, UU};
    Some(match xo {
        142 => ("vpkuhus", QNarrowBin16Uto8Ux16, 16, UU),
        206 => ("vpkuwus", QNarrowBin32Uto16Ux8, 32, UU),
        1230 => ("vpkudus", QNarrowBin64Uto32Ux4, 64, UU),
        270 => ("vpkshus", QNarrowBin16Sto8Ux16, 16, SU),
        334 => ("vpkswus", QNarrowBin32Sto16Ux8, 32, SU),
        1358 => ("vpksdus", QNarrowBin64Sto32Ux4, 64, SU),
        398 => ("vpkshss", QNarrowBin16Sto8Sx16, 16, SS),
        462 => ("vpkswss", QNarrowBin32Sto16Sx8, 32, SS),
        1486 => ("vpksdss", QNarrowBin64Sto32Sx4, 64, SS),
        _ => return None,
    })
}

/// Lanes of `src` (lane width `bits`) outside the destination range of
/// a saturating pack.
fn pack_overflow(src: Temp, bits: u32, kind: PackSat) -> Expr {
    let half: u32 = bits / 2;
    let (gt_s, gt_u) = match bits {
        16 => (Op::CmpGT16Sx8, Op::CmpGT16Ux8),
        32 => (Op::CmpGT32Sx4, Op::CmpGT32Ux4),
        _ => (Op::CmpGT64Sx2, Op::CmpGT64Ux2),
    };
    let umax: u64 = (1u64 << half) - 1;
    let smax: u64 = (1u64 << (half - 1)) - 1;
    let smin: u64 = (!smax) & if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
    match kind {
        PackSat::UU => binop(gt_u, mkexpr(src), splat_const(bits, umax)),
        PackSat::SU => binop(
            Op::OrV128,
            binop(gt_s, mkexpr(src), splat_const(bits, umax)),
            binop(gt_s, splat_const(bits, 0), mkexpr(src)),
        ),
        PackSat::SS => binop(
            Op::OrV128,
            binop(gt_s, mkexpr(src), splat_const(bits, smax)),
            binop(gt_s, splat_const(bits, smin), mkexpr(src)),
        ),
    }
}

/// Even/odd widening multiplies: (mnemonic, op, lane bits, odd).
fn mul_op(xo: u32) -> Option<(&'static str, Op, u32, bool)> {
    use Op::*;
    Some(match xo {
        520 => ("vmuleub", MullEven8Ux16, 8, false),
        584 => ("vmuleuh", MullEven16Ux8, 16, false),
        648 => ("vmuleuw", MullEven32Ux4, 32, false),
        776 => ("vmulesb", MullEven8Sx16, 8, false),
        840 => ("vmulesh", MullEven16Sx8, 16, false),
        904 => ("vmulesw", MullEven32Sx4, 32, false),
        8 => ("vmuloub", MullEven8Ux16, 8, true),
        72 => ("vmulouh", MullEven16Ux8, 16, true),
        136 => ("vmulouw", MullEven32Ux4, 32, true),
        264 => ("vmulosb", MullEven8Sx16, 8, true),
        328 => ("vmulosh", MullEven16Sx8, 16, true),
        392 => ("vmulosw", MullEven32Sx4, 32, true),
        _ => return None,
    })
}

fn vx_form(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (vd, va, vb) = (w.rd(), w.ra(), w.rb());
    let xo: u32 = w.vx_xo11();

    if let Some(op) = binary_op(xo) {
        dis!("{} v{},v{},v{}", op.name, vd, va, vb);
        let a: Temp = ctx.tmp(ctx.get_vreg(va));
        let b: Temp = ctx.tmp(ctx.get_vreg(vb));
        let r: Temp = ctx.tmp(binop(op.op, mkexpr(a), mkexpr(b)));
        ctx.put_vreg(vd, mkexpr(r));
        if let Some(modular) = op.modular {
            let diff: Expr = binop(Op::XorV128, mkexpr(r), binop(modular, mkexpr(a), mkexpr(b)));
            let flag: Expr = any_set(ctx, diff);
            or_into_sat(ctx, flag);
        }
        return Ok(());
    }
    if let Some((name, op, bits, kind)) = pack_op(xo) {
        dis!("{} v{},v{},v{}", name, vd, va, vb);
        let a: Temp = ctx.tmp(ctx.get_vreg(va));
        let b: Temp = ctx.tmp(ctx.get_vreg(vb));
        ctx.put_vreg(vd, binop(op, mkexpr(a), mkexpr(b)));
        let out: Expr = binop(Op::OrV128, pack_overflow(a, bits, kind), pack_overflow(b, bits, kind));
        let flag: Expr = any_set(ctx, out);
        or_into_sat(ctx, flag);
        return Ok(());
    }
    if let Some((name, op, bits, odd)) = mul_op(xo) {
        dis!("{} v{},v{},v{}", name, vd, va, vb);
        let mut a: Expr = ctx.get_vreg(va);
        let mut b: Expr = ctx.get_vreg(vb);
        if odd {
            a = binop(Op::ShlV128, a, mk_u8(bits as u8));
            b = binop(Op::ShlV128, b, mk_u8(bits as u8));
        }
        ctx.put_vreg(vd, binop(op, a, b));
        return Ok(());
    }

    let r: Expr = match xo {
        1028 | 1092 | 1156 | 1220 | 1284 | 1348 | 1412 | 1668 => {
            let a: Expr = ctx.get_vreg(va);
            let b: Expr = ctx.get_vreg(vb);
            let (name, r) = match xo {
                1028 => ("vand", binop(Op::AndV128, a, b)),
                1092 => ("vandc", binop(Op::AndV128, a, unop(Op::NotV128, b))),
                1156 => ("vor", binop(Op::OrV128, a, b)),
                1220 => ("vxor", binop(Op::XorV128, a, b)),
                1284 => ("vnor", unop(Op::NotV128, binop(Op::OrV128, a, b))),
                1348 => ("vorc", binop(Op::OrV128, a, unop(Op::NotV128, b))),
                1412 => ("vnand", unop(Op::NotV128, binop(Op::AndV128, a, b))),
                _ => ("veqv", unop(Op::NotV128, binop(Op::XorV128, a, b))),
            };
            dis!("{} v{},v{},v{}", name, vd, va, vb);
            r
        }
        452 | 708 | 1036 | 1100 => {
            let (name, op, mask) = match xo {
                452 => ("vsl", Op::ShlV128, 0x7),
                708 => ("vsr", Op::ShrV128, 0x7),
                1036 => ("vslo", Op::ShlV128, 0x78),
                _ => ("vsro", Op::ShrV128, 0x78),
            };
            dis!("{} v{},v{},v{}", name, vd, va, vb);
            let sh: Expr = binop(Op::And32, unop(Op::CastV128to32, ctx.get_vreg(vb)), mk_u32(mask));
            binop(op, ctx.get_vreg(va), unop(Op::Cast32to8, sh))
        }
        524 | 588 | 652 => {
            let (name, lanes) = match xo {
                524 => ("vspltb", 16u32),
                588 => ("vsplth", 8),
                _ => ("vspltw", 4),
            };
            let idx_bits: u32 = lanes.trailing_zeros();
            reserved_zero(w, w.field(11, 5 - idx_bits), "vsplt reserved bits")?;
            let idx: u32 = w.field(16 - idx_bits, idx_bits);
            dis!("{} v{},v{},{}", name, vd, vb, idx);
            let lane: Expr = element(ctx.get_vreg(vb), lanes, idx);
            match lanes {
                16 => unop(Op::Dup8x16, unop(Op::Cast32to8, lane)),
                8 => unop(Op::Dup16x8, unop(Op::Cast32to16, lane)),
                _ => unop(Op::Dup32x4, lane),
            }
        }
        780 | 844 | 908 => {
            reserved_zero(w, vb, "vspltis rB")?;
            let simm: u64 = extend_s(va as u64, 5);
            let (name, r) = match xo {
                780 => ("vspltisb", unop(Op::Dup8x16, mk_u8(simm as u8))),
                844 => ("vspltish", unop(Op::Dup16x8, mk_u16(simm as u16))),
                _ => ("vspltisw", unop(Op::Dup32x4, mk_u32(simm as u32))),
            };
            dis!("{} v{},{}", name, vd, simm as i64);
            r
        }
        526 | 654 | 590 | 718 | 1614 | 1742 => {
            reserved_zero(w, va, "vupk rA")?;
            let (name, interleave, sar, bits) = match xo {
                526 => ("vupkhsb", Op::InterleaveHI8x16, Op::Sar16x8, 16),
                654 => ("vupklsb", Op::InterleaveLO8x16, Op::Sar16x8, 16),
                590 => ("vupkhsh", Op::InterleaveHI16x8, Op::Sar32x4, 32),
                718 => ("vupklsh", Op::InterleaveLO16x8, Op::Sar32x4, 32),
                1614 => ("vupkhsw", Op::InterleaveHI32x4, Op::Sar64x2, 64),
                _ => ("vupklsw", Op::InterleaveLO32x4, Op::Sar64x2, 64),
            };
            dis!("{} v{},v{}", name, vd, vb);
            let b: Temp = ctx.tmp(ctx.get_vreg(vb));
            let doubled: Expr = binop(interleave, mkexpr(b), mkexpr(b));
            binop(sar, doubled, splat_const(bits, (bits / 2) as u64))
        }
        846 | 974 => {
            reserved_zero(w, va, "vupkpx rA")?;
            let high: bool = xo == 846;
            dis!("vupk{}px v{},v{}", if high { "h" } else { "l" }, vd, vb);
            unpack_pixels(ctx, vb, high)
        }
        782 => {
            dis!("vpkpx v{},v{},v{}", vd, va, vb);
            pack_pixels(ctx, va, vb)
        }
        1794 | 1858 | 1922 | 1986 | 1795 | 1859 | 1923 | 1987 => {
            reserved_zero(w, va, "vclz/vpopcnt rA")?;
            let (name, op) = match xo {
                1794 => ("vclzb", Op::Clz8x16),
                1858 => ("vclzh", Op::Clz16x8),
                1922 => ("vclzw", Op::Clz32x4),
                1986 => ("vclzd", Op::Clz64x2),
                1795 => ("vpopcntb", Op::PopCount8x16),
                1859 => ("vpopcnth", Op::PopCount16x8),
                1923 => ("vpopcntw", Op::PopCount32x4),
                _ => ("vpopcntd", Op::PopCount64x2),
            };
            dis!("{} v{},v{}", name, vd, vb);
            unop(op, ctx.get_vreg(vb))
        }
        _ => return unknown(w, "altivec VX-form"),
    };
    ctx.put_vreg(vd, r);
    Ok(())
}

/// 1/5/5/5 pixel to 8/8/8/8: the alpha byte replicates the top bit.
fn expand_pixel(ctx: &mut DecodeContext<'_>, h: Expr) -> Expr {
    let h: Temp = ctx.tmp(h);
    let a: Expr = binop(Op::Sar32, binop(Op::Shl32, mkexpr(h), mk_u8(16)), mk_u8(31));
    let a: Expr = binop(Op::Shl32, binop(Op::And32, a, mk_u32(0xFF)), mk_u8(24));
    let r: Expr = binop(Op::Shl32, binop(Op::And32, binop(Op::Shr32, mkexpr(h), mk_u8(10)), mk_u32(0x1F)), mk_u8(16));
    let g: Expr = binop(Op::Shl32, binop(Op::And32, binop(Op::Shr32, mkexpr(h), mk_u8(5)), mk_u32(0x1F)), mk_u8(8));
    let b: Expr = binop(Op::And32, mkexpr(h), mk_u32(0x1F));
    binop(Op::Or32, binop(Op::Or32, a, r), binop(Op::Or32, g, b))
}

fn unpack_pixels(ctx: &mut DecodeContext<'_>, vb: u32, high: bool) -> Expr {
    let half: Op = if high { Op::CastV128HIto64 } else { Op::CastV128to64 };
    let d: Temp = ctx.tmp(unop(half, ctx.get_vreg(vb)));
    let hi: Temp = ctx.tmp(unop(Op::Cast64HIto32, mkexpr(d)));
    let lo: Temp = ctx.tmp(unop(Op::Cast64to32, mkexpr(d)));
    let [p0, p1] = expand_pixel_pair(ctx, hi);
    let [p2, p3] = expand_pixel_pair(ctx, lo);
    mk_v128_from_4x32([p0, p1, p2, p3])
}

fn expand_pixel_pair(ctx: &mut DecodeContext<'_>, word: Temp) -> [Expr; 2] {
    let upper: Expr = binop(Op::Shr32, mkexpr(word), mk_u8(16));
    let lower: Expr = binop(Op::And32, mkexpr(word), mk_u32(0xFFFF));
    [expand_pixel(ctx, upper), expand_pixel(ctx, lower)]
}

/// 8/8/8/8 pixel to 1/5/5/5.
fn shrink_pixel(x: Temp) -> Expr {
    let a_r: Expr = binop(Op::And32, binop(Op::Shr32, mkexpr(x), mk_u8(9)), mk_u32(0xFC00));
    let g: Expr = binop(Op::And32, binop(Op::Shr32, mkexpr(x), mk_u8(6)), mk_u32(0x03E0));
    let b: Expr = binop(Op::And32, binop(Op::Shr32, mkexpr(x), mk_u8(3)), mk_u32(0x001F));
    binop(Op::Or32, a_r, binop(Op::Or32, g, b))
}

fn pack_pixels(ctx: &mut DecodeContext<'_>, va: u32, vb: u32) -> Expr {
    let a: [Temp; 4] = ctx.break_v128_to_4x32(ctx.get_vreg(va));
    let b: [Temp; 4] = ctx.break_v128_to_4x32(ctx.get_vreg(vb));
    let lanes: [Temp; 8] = [a[0], a[1], a[2], a[3], b[0], b[1], b[2], b[3]];
    let word = |i: usize| {
        binop(
            Op::Or32,
            binop(Op::Shl32, shrink_pixel(lanes[2 * i]), mk_u8(16)),
            shrink_pixel(lanes[2 * i + 1]),
        )
    };
    mk_v128_from_4x32([word(0), word(1), word(2), word(3)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ir::Const;

    #[test]
    fn test_splat_const() {
        let Expr::Binop(op, hi, lo) = splat_const(16, 0x00FF) else {
            panic!("expected Cat64HLtoV128");
        };
        assert_eq!(op, Op::Cat64HLtoV128);
        assert_eq!(hi.as_const(), Some(Const::U64(0x00FF_00FF_00FF_00FF)));
        assert_eq!(lo.as_const(), Some(Const::U64(0x00FF_00FF_00FF_00FF)));
    }

    #[test]
    fn test_tables_are_disjoint() {
        for xo in 0..2048u32 {
            let hits: usize = binary_op(xo).is_some() as usize
                + pack_op(xo).is_some() as usize
                + mul_op(xo).is_some() as usize;
            assert!(hits <= 1, "xo {} in more than one table", xo);
        }
    }
}
