//! Opcode Dispatch
//!
//! Each primary opcode owns an ordered list of [`Route`]s. The first route
//! whose [`Matcher`] accepts the word wins; its [`Gate`]s are checked
//! against the enabled features before the family translator runs.
//! Secondary-opcode decoding inside the family happens in the translator.
//!
//! # Route Order
//! Routes that test narrow fields come before routes that test wide ones:
//! under primary 31 `isel` (XO5 = 15) and the XS-form shifts are matched
//! before any XO10 set, and the integer arithmetic XO9 set (which ignores
//! the OE bit) comes after every XO10 set it could shadow.
//!
//! # Magic Sequences
//! A fixed four-word preamble of no-effect rotates followed by one
//! `or rN,rN,rN` is a request from the guest to its execution
//! environment. [`magic_at`] recognizes these by literal comparison
//! before normal dispatch runs.

use log::{debug, warn};

use crate::frontend::context::{DecodeContext, GuestReg};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::{DecodeFailure, Extension, TranslateResult};
use crate::frontend::ir::JumpKind;
use crate::frontend::translate::altivec::Altivec;
use crate::frontend::translate::altivec_fp::AltivecFloat;
use crate::frontend::translate::atomic::Atomic;
use crate::frontend::translate::branch::Branch;
use crate::frontend::translate::compare::IntCompare;
use crate::frontend::translate::cr::CondReg;
use crate::frontend::translate::crypto::{self, Crypto};
use crate::frontend::translate::dfp::DecimalFloat;
use crate::frontend::translate::float::FloatingPoint;
use crate::frontend::translate::integer::IntArith;
use crate::frontend::translate::load_store::IntLoadStore;
use crate::frontend::translate::logical::IntLogic;
use crate::frontend::translate::multiple::LoadStoreMultiple;
use crate::frontend::translate::rotate::RotateShift;
use crate::frontend::translate::system::System;
use crate::frontend::translate::tm::Transactional;
use crate::frontend::translate::trap::Trap;
use crate::frontend::translate::vsx::Vsx;
use crate::frontend::translate::vsx_table::VsxTable;
use crate::frontend::translate::Translator;
use crate::frontend::IrInjector;

/// Secondary-opcode test selecting a route.
#[derive(Clone, Copy)]
pub enum Matcher {
    Any,
    Xo10(&'static [u32]),
    /// XO-form opcode without the OE bit.
    Xo9(&'static [u32]),
    Xo5(&'static [u32]),
    Xo2(&'static [u32]),
    VxXo11(&'static [u32]),
    VaXo6(&'static [u32]),
    Pred(fn(InsnWord) -> bool),
}

impl Matcher {
    pub fn matches(&self, w: InsnWord) -> bool {
        match *self {
            Matcher::Any => true,
            Matcher::Xo10(set) => set.contains(&w.xo10()),
            Matcher::Xo9(set) => set.contains(&w.xo9()),
            Matcher::Xo5(set) => set.contains(&w.xo5()),
            Matcher::Xo2(set) => set.contains(&w.xo2()),
            Matcher::VxXo11(set) => set.contains(&w.vx_xo11()),
            Matcher::VaXo6(set) => set.contains(&w.va_xo6()),
            Matcher::Pred(f) => f(w),
        }
    }
}

/// Capability a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Fp,
    Altivec,
    Fx,
    Gx,
    Vsx,
    Dfp,
    Isa207,
    Isa30,
    Mode64,
}

impl Gate {
    fn check(self, ctx: &DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        let f = &ctx.features;
        let (ok, ext) = match self {
            Gate::Fp => (f.fp, Extension::FloatingPoint),
            Gate::Altivec => (f.altivec, Extension::Altivec),
            Gate::Fx => (f.fx, Extension::GeneralPurposeOptional),
            Gate::Gx => (f.gx, Extension::GraphicsOptional),
            Gate::Vsx => (f.vsx, Extension::Vsx),
            Gate::Dfp => (f.dfp, Extension::DecimalFloatingPoint),
            Gate::Isa207 => (f.isa2_07, Extension::Isa2_07),
            Gate::Isa30 => (f.isa3_0, Extension::Isa3_0),
            Gate::Mode64 => (ctx.mode64, Extension::Mode64),
        };
        if ok {
            Ok(())
        } else {
            Err(DecodeFailure::missing(w.raw(), ext))
        }
    }
}

/// One entry of a primary opcode's route list. An empty `gates` slice
/// means the route is always available.
pub struct Route {
    pub matcher: Matcher,
    pub gates: &'static [Gate],
    pub family: &'static dyn Translator,
}

const fn route(matcher: Matcher, gates: &'static [Gate], family: &'static dyn Translator) -> Route {
    Route { matcher, gates, family }
}

use Matcher::*;

// Primary 4.

const AV_ISA207: &[u32] = &[
    136, 137, 192, 194, 196, 256, 392, 450, 648, 706, 904, 962, 964, 1102, 1216, 1230, 1280,
    1358, 1476, 1486, 1614, 1676, 1732, 1742, 1794, 1795, 1858, 1859, 1922, 1923, 1932, 1986,
    1987,
];
const CRYPTO_VX: &[u32] = &[1032, 1096, 1160, 1224, 1288, 1289, 1352, 1353, 1480, 1666, 1730];
const AV_FLOAT_VX: &[u32] = &[
    10, 74, 266, 330, 394, 458, 522, 586, 650, 714, 778, 842, 906, 970, 1034, 1098,
];

fn vc_float(w: InsnWord) -> bool {
    matches!(w.vc_xo10(), 198 | 454 | 710 | 966)
}

fn vc_isa207(w: InsnWord) -> bool {
    matches!(w.vc_xo10(), 199 | 711 | 967)
}

static OPC4: &[Route] = &[
    route(VaXo6(&[42, 43, 44]), &[Gate::Altivec], &Altivec),
    route(VaXo6(&[46, 47]), &[Gate::Altivec], &AltivecFloat),
    route(VaXo6(&[45]), &[Gate::Altivec, Gate::Isa207], &Crypto),
    route(VaXo6(&[48, 49, 51]), &[Gate::Isa30, Gate::Mode64], &IntArith),
    route(Pred(crypto::is_bcd), &[Gate::Altivec, Gate::Isa207], &Crypto),
    route(VxXo11(CRYPTO_VX), &[Gate::Altivec, Gate::Isa207], &Crypto),
    route(VxXo11(&[1540, 1604]), &[Gate::Altivec], &System),
    route(VxXo11(AV_FLOAT_VX), &[Gate::Altivec], &AltivecFloat),
    route(Pred(vc_float), &[Gate::Altivec], &AltivecFloat),
    route(VxXo11(AV_ISA207), &[Gate::Altivec, Gate::Isa207], &Altivec),
    route(Pred(vc_isa207), &[Gate::Altivec, Gate::Isa207], &Altivec),
    route(Any, &[Gate::Altivec], &Altivec),
];

// Primary 19.

static OPC19: &[Route] = &[
    route(Xo5(&[2]), &[Gate::Isa30], &IntArith),
    route(Xo10(&[16, 528]), &[], &Branch),
    route(Xo10(&[560]), &[Gate::Isa207], &Branch),
    route(Xo10(&[150]), &[], &System),
    route(Xo10(&[0, 33, 129, 193, 225, 257, 289, 417, 449]), &[], &CondReg),
];

// Primary 31.

const TM_XO: &[u32] = &[654, 686, 718, 750, 782, 814, 846, 878, 910, 942, 1006];
const VSX_X1: &[u32] = &[
    12, 51, 76, 115, 140, 179, 211, 243, 332, 524, 588, 652, 716, 780, 844, 908, 972,
];
const VEC_MEM: &[u32] = &[6, 7, 38, 39, 71, 103, 135, 167, 199, 231, 359, 487];
const FP_MEM: &[u32] = &[535, 567, 599, 631, 663, 695, 727, 759, 791, 855, 887, 919, 983];
const MODULO: &[u32] = &[265, 267, 777, 779];
const INT_XO9: &[u32] = &[
    8, 9, 10, 11, 40, 73, 75, 104, 136, 138, 200, 202, 232, 233, 234, 235, 266, 393, 395, 425,
    427, 457, 459, 489, 491,
];
const LOGIC_XO: &[u32] = &[
    26, 28, 58, 60, 122, 124, 154, 186, 252, 284, 316, 378, 412, 444, 476, 506, 922, 954, 986,
];
const SHIFT_XO: &[u32] = &[24, 27, 536, 539, 792, 794, 824];
const INT_MEM: &[u32] = &[
    21, 23, 53, 55, 87, 119, 149, 151, 181, 183, 215, 247, 279, 311, 341, 343, 373, 375, 407,
    439, 532, 534, 660, 662, 790, 918,
];
const STRING_XO: &[u32] = &[533, 597, 661, 725];
const ATOMIC_XO: &[u32] = &[20, 52, 84, 116, 150, 214, 694, 726];
const SYSTEM_XO: &[u32] = &[54, 62, 86, 246, 278, 339, 371, 467, 598, 854, 982, 1014];

fn sradi(w: InsnWord) -> bool {
    w.xo10() >> 1 == 413
}

fn extswsli(w: InsnWord) -> bool {
    w.xo10() >> 1 == 445
}

static OPC31: &[Route] = &[
    route(Xo5(&[15]), &[], &IntLogic),
    route(Pred(sradi), &[Gate::Mode64], &RotateShift),
    route(Pred(extswsli), &[Gate::Mode64, Gate::Isa30], &RotateShift),
    route(Xo10(TM_XO), &[Gate::Isa207], &Transactional),
    route(Xo10(VSX_X1), &[Gate::Vsx], &Vsx),
    route(Xo10(VEC_MEM), &[Gate::Altivec], &Altivec),
    route(Xo10(FP_MEM), &[Gate::Fp], &FloatingPoint),
    route(Xo10(MODULO), &[Gate::Isa30], &IntArith),
    route(Xo10(&[538, 570]), &[Gate::Isa30], &IntLogic),
    route(Xo10(LOGIC_XO), &[], &IntLogic),
    route(Xo10(SHIFT_XO), &[], &RotateShift),
    route(Xo10(&[0, 32, 508]), &[], &IntCompare),
    route(Xo10(&[128]), &[Gate::Isa30], &IntCompare),
    route(Xo10(INT_MEM), &[], &IntLoadStore),
    route(Xo10(STRING_XO), &[], &LoadStoreMultiple),
    route(Xo10(ATOMIC_XO), &[], &Atomic),
    route(Xo10(&[182, 276]), &[Gate::Isa207], &Atomic),
    route(Xo10(&[19, 144, 512]), &[], &CondReg),
    route(Xo10(SYSTEM_XO), &[], &System),
    route(Xo10(&[4, 68]), &[], &Trap),
    route(Xo9(INT_XO9), &[], &IntArith),
];

// Primaries 59 and 63.

fn fp_arith(w: InsnWord) -> bool {
    w.xo5() >= 18
}

static OPC59: &[Route] = &[
    route(Xo5(&[2, 3]), &[Gate::Fp, Gate::Dfp], &DecimalFloat),
    route(Xo5(&[22]), &[Gate::Fp, Gate::Fx], &FloatingPoint),
    route(Xo5(&[24, 26]), &[Gate::Fp, Gate::Gx], &FloatingPoint),
    route(Pred(fp_arith), &[Gate::Fp], &FloatingPoint),
    route(Any, &[Gate::Fp], &FloatingPoint),
];

static OPC63: &[Route] = &[
    route(Xo5(&[2, 3]), &[Gate::Fp, Gate::Dfp], &DecimalFloat),
    route(Xo5(&[22]), &[Gate::Fp, Gate::Fx], &FloatingPoint),
    route(Xo5(&[23, 24, 26]), &[Gate::Fp, Gate::Gx], &FloatingPoint),
    route(Pred(fp_arith), &[Gate::Fp], &FloatingPoint),
    route(Any, &[Gate::Fp], &FloatingPoint),
];

static OPC62: &[Route] = &[
    route(Xo2(&[2]), &[Gate::Mode64, Gate::Isa207], &IntLoadStore),
    route(Any, &[Gate::Mode64], &IntLoadStore),
];

static INT_ARITH: &[Route] = &[route(Any, &[], &IntArith)];
static INT_LOGIC: &[Route] = &[route(Any, &[], &IntLogic)];
static INT_COMPARE: &[Route] = &[route(Any, &[], &IntCompare)];
static INT_MEM_D: &[Route] = &[route(Any, &[], &IntLoadStore)];
static INT_MEM_64: &[Route] = &[route(Any, &[Gate::Mode64], &IntLoadStore)];
static MULTIPLE: &[Route] = &[route(Any, &[], &LoadStoreMultiple)];
static ROTATE: &[Route] = &[route(Any, &[], &RotateShift)];
static ROTATE_64: &[Route] = &[route(Any, &[Gate::Mode64], &RotateShift)];
static BRANCH: &[Route] = &[route(Any, &[], &Branch)];
static SYSTEM: &[Route] = &[route(Any, &[], &System)];
static TRAP: &[Route] = &[route(Any, &[], &Trap)];
static TRAP_64: &[Route] = &[route(Any, &[Gate::Mode64], &Trap)];
static FLOAT: &[Route] = &[route(Any, &[Gate::Fp], &FloatingPoint)];
static VSX_XX: &[Route] = &[route(Any, &[Gate::Vsx], &VsxTable)];

/// Route list of a primary opcode. Unassigned opcodes have none.
pub fn routes(opc1: u32) -> &'static [Route] {
    match opc1 {
        2 => TRAP_64,
        3 => TRAP,
        4 => OPC4,
        7 | 8 | 12 | 13 | 14 | 15 => INT_ARITH,
        10 | 11 => INT_COMPARE,
        16 | 18 => BRANCH,
        17 => SYSTEM,
        19 => OPC19,
        20 | 21 | 23 => ROTATE,
        24..=29 => INT_LOGIC,
        30 => ROTATE_64,
        31 => OPC31,
        46 | 47 => MULTIPLE,
        32..=45 => INT_MEM_D,
        48..=55 | 57 | 61 => FLOAT,
        56 | 58 => INT_MEM_64,
        59 => OPC59,
        60 => VSX_XX,
        62 => OPC62,
        63 => OPC63,
        _ => &[],
    }
}

/// The route `w` would take, ignoring gates.
pub fn find_route(w: InsnWord) -> Option<&'static Route> {
    routes(w.opc1()).iter().find(|r| r.matcher.matches(w))
}

/// Name of the family that owns `w`, if any.
pub fn family_of(w: InsnWord) -> Option<&'static str> {
    find_route(w).map(|r| r.family.name())
}

/// Translate one ordinary instruction word.
pub(crate) fn dispatch(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let Some(route) = find_route(w) else {
        return Err(DecodeFailure::unrecognized(w.raw(), "primary opcode"));
    };
    for gate in route.gates {
        gate.check(ctx, w)?;
    }
    route.family.translate(ctx, w)
}

/// Report a failed decode, loudly when `sigill_diag` is set.
pub(crate) fn report_failure(ctx: &DecodeContext<'_>, w: InsnWord, err: &DecodeFailure) {
    let family: &str = family_of(w).unwrap_or("none");
    if ctx.sigill_diag {
        warn!(
            "0x{:x}: cannot decode 0x{:08X} (opc1 {}, xo10 {}, family {}): {}",
            ctx.cia,
            w.raw(),
            w.opc1(),
            w.xo10(),
            family,
            err
        );
    } else {
        debug!("0x{:x}: no decode for 0x{:08X} ({}): {}", ctx.cia, w.raw(), family, err);
    }
}

// Magic sequences.

const PREAMBLE_32: [u32; 4] = [0x5400_183E, 0x5400_683E, 0x5400_E83E, 0x5400_983E];
const PREAMBLE_64: [u32; 4] = [0x7800_1800, 0x7800_6800, 0x7800_E802, 0x7800_9802];

/// Total length of a magic sequence in bytes.
pub const MAGIC_LEN: u32 = 20;

/// Non-architectural request carried by a magic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialHook {
    /// `or 1,1,1`: client request; the block ends with `ClientReq`.
    ClientRequest,
    /// `or 2,2,2`: r3 := NRADDR.
    GuestNrAddr,
    /// `or 3,3,3`: branch-and-link to r11 without redirection.
    CallNoRedirR11,
    /// `or 4,4,4`: r3 := NRADDR_GPR2 (64-bit only).
    GuestNrAddrGpr2,
    /// `or 5,5,5`: inject IR, then invalidate the sequence's translation.
    InjectIr,
}

/// What the words at the decode position look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    /// No preamble here.
    Absent,
    Hook(SpecialHook),
    /// A preamble followed by an unknown request word.
    Unknown(InsnWord),
}

/// Compare the five words at `offset` against the magic sequences.
pub fn magic_at(code: &[u8], offset: usize, mode64: bool, big_endian: bool) -> Magic {
    let preamble: &[u32; 4] = if mode64 { &PREAMBLE_64 } else { &PREAMBLE_32 };
    for (i, expected) in preamble.iter().enumerate() {
        match InsnWord::fetch(code, offset + 4 * i, big_endian) {
            Some(w) if w.raw() == *expected => {}
            _ => return Magic::Absent,
        }
    }
    let Some(w) = InsnWord::fetch(code, offset + 16, big_endian) else {
        return Magic::Absent;
    };
    match w.raw() {
        0x7C21_0B78 => Magic::Hook(SpecialHook::ClientRequest),
        0x7C42_1378 => Magic::Hook(SpecialHook::GuestNrAddr),
        0x7C63_1B78 => Magic::Hook(SpecialHook::CallNoRedirR11),
        0x7C84_2378 if mode64 => Magic::Hook(SpecialHook::GuestNrAddrGpr2),
        0x7CA5_2B78 => Magic::Hook(SpecialHook::InjectIr),
        _ => Magic::Unknown(w),
    }
}

/// Emit the IR for a recognized hook.
pub(crate) fn emit_hook(ctx: &mut DecodeContext<'_>, hook: SpecialHook, injector: Option<&dyn IrInjector>) {
    let next: u64 = ctx.mode_addr(ctx.cia.wrapping_add(MAGIC_LEN as u64));
    match hook {
        SpecialHook::ClientRequest => {
            debug!("0x{:x}: client request", ctx.cia);
            let nia = ctx.mk_sz_imm(next);
            ctx.jump_to(nia, JumpKind::ClientReq);
        }
        SpecialHook::GuestNrAddr => {
            let v = ctx.get_gst(GuestReg::NrAddr);
            ctx.put_ireg(3, v);
        }
        SpecialHook::CallNoRedirR11 => {
            let lr = ctx.mk_sz_imm(next);
            ctx.put_gst(GuestReg::Lr, lr);
            let target = ctx.get_ireg(11);
            ctx.jump_to(target, JumpKind::NoRedir);
        }
        SpecialHook::GuestNrAddrGpr2 => {
            let v = ctx.get_gst(GuestReg::NrAddrGpr2);
            ctx.put_ireg(3, v);
        }
        SpecialHook::InjectIr => {
            match injector {
                Some(inj) => inj.inject(&mut ctx.ir, ctx.host_end),
                None => debug!("0x{:x}: IR injection requested without an injector", ctx.cia),
            }
            let start = ctx.mk_sz_imm(ctx.cia);
            ctx.put_gst(GuestReg::CmStart, start);
            let len = ctx.mk_sz_imm(MAGIC_LEN as u64);
            ctx.put_gst(GuestReg::CmLen, len);
            let nia = ctx.mk_sz_imm(next);
            ctx.jump_to(nia, JumpKind::InvalICache);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn be_words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn test_magic_requires_full_preamble() {
        let mut words: Vec<u32> = PREAMBLE_64.to_vec();
        words.push(0x7C21_0B78);
        let code = be_words(&words);
        assert_eq!(magic_at(&code, 0, true, true), Magic::Hook(SpecialHook::ClientRequest));
        // Wrong preamble for the mode.
        assert_eq!(magic_at(&code, 0, false, true), Magic::Absent);
        // Truncated.
        assert_eq!(magic_at(&code[..16], 0, true, true), Magic::Absent);
    }

    #[test]
    fn test_gpr2_hook_is_64_bit_only() {
        let mut words: Vec<u32> = PREAMBLE_32.to_vec();
        words.push(0x7C84_2378);
        let code = be_words(&words);
        assert_eq!(magic_at(&code, 0, false, true), Magic::Unknown(InsnWord(0x7C84_2378)));
    }

    #[test]
    fn test_common_words_route_to_their_family() {
        assert_eq!(family_of(InsnWord(0x3860_0005)), Some("integer"));
        assert_eq!(family_of(InsnWord(0x7C62_1A14)), Some("integer"));
        assert_eq!(family_of(InsnWord(0x4E80_0020)), Some("branch"));
        assert_eq!(family_of(InsnWord(0x4400_0002)), Some("system"));
        // isel r3,r4,r5,2
        assert_eq!(family_of(InsnWord(0x7C64_289E)), Some("logical"));
        // lvx v1,0,r3
        assert_eq!(family_of(InsnWord(0x7C20_18CE)), Some("altivec"));
        assert_eq!(family_of(InsnWord(0x0000_0000)), None);
    }

    #[test]
    fn test_route_sets_are_disjoint_under_31() {
        let mut seen: Vec<(u32, usize)> = Vec::new();
        for (i, r) in OPC31.iter().enumerate() {
            if let Xo10(set) = r.matcher {
                for &xo in set {
                    assert!(!seen.iter().any(|(x, _)| *x == xo), "xo10 {} routed twice", xo);
                    seen.push((xo, i));
                }
            }
        }
        // No XO10 route is shadowed by the XO5 or XS-form routes ahead of it.
        for (xo, _) in seen {
            assert_ne!(xo & 0x1F, 15, "xo10 {} looks like isel", xo);
            assert!(!matches!(xo >> 1, 413 | 445), "xo10 {} looks like an XS-form", xo);
        }
    }
}
