//! Out-of-line helper routines referenced from emitted IR.
//!
//! Some instruction semantics are awkward to express as IR trees (reading
//! the host time base, classifying densely-packed decimal values). The
//! translators emit `CCall`/`Dirty` nodes naming one of the [`Helper`]s
//! below; the code generator calls the host function at
//! [`Callee::addr`].
//!
//! # Function Descriptors
//! On hosts whose ABI represents function pointers as descriptors (a
//! two-word record holding the entry point and TOC), the callable address
//! is the first word of the descriptor. [`resolve_callable`] is the only
//! place that performs this indirection.

use std::sync::OnceLock;
use std::time::Instant;

use crate::frontend::ir::Callee;
use crate::target::AbiInfo;

/// Helpers the translators can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    /// `() -> I64`: current value of the 64-bit time base.
    ReadTimeBase,
    /// `(hi: I64, lo: I64, quad: I64) -> I64`: decimal class in bits 0..5
    /// and data group in bits 8..13.
    DfpClassify,
    /// `(I64) -> I64`: five declets to fifteen BCD digits.
    DpdToBcd,
    /// `(I64) -> I64`: fifteen BCD digits to five declets.
    BcdToDpd,
}

impl Helper {
    pub const fn name(self) -> &'static str {
        match self {
            Helper::ReadTimeBase => "ppc_read_timebase",
            Helper::DfpClassify => "ppc_dfp_classify",
            Helper::DpdToBcd => "ppc_dpd_to_bcd",
            Helper::BcdToDpd => "ppc_bcd_to_dpd",
        }
    }

    /// Host address of the helper as a plain function pointer value.
    fn entry(self) -> usize {
        match self {
            Helper::ReadTimeBase => ppc_read_timebase as usize,
            Helper::DfpClassify => ppc_dfp_classify as usize,
            Helper::DpdToBcd => ppc_dpd_to_bcd as usize,
            Helper::BcdToDpd => ppc_bcd_to_dpd as usize,
        }
    }

    const fn regparms(self) -> u32 {
        match self {
            Helper::ReadTimeBase => 0,
            Helper::DfpClassify => 3,
            Helper::DpdToBcd | Helper::BcdToDpd => 1,
        }
    }
}

/// Callable address for a host function pointer value.
///
/// With `uses_fndescrs` set, `entry` is the address of a function
/// descriptor and the code address is read from its first word.
pub fn resolve_callable(entry: usize, uses_fndescrs: bool) -> usize {
    if !uses_fndescrs {
        return entry;
    }
    // SAFETY: on descriptor ABIs every function pointer value is the
    // address of a live, word-aligned descriptor.
    unsafe { std::ptr::read(entry as *const usize) }
}

/// Build the [`Callee`] record for `helper` under the host ABI in `abi`.
pub fn callee(helper: Helper, abi: &AbiInfo) -> Callee {
    Callee {
        name: helper.name(),
        addr: resolve_callable(helper.entry(), abi.host_calls_use_fndescrs),
        regparms: helper.regparms(),
    }
}

fn epoch() -> &'static Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now)
}

/// Time base, ticking once every two nanoseconds since first use.
pub extern "C" fn ppc_read_timebase() -> u64 {
    let ns: u128 = epoch().elapsed().as_nanos();
    (ns / 2) as u64
}

/// Decode one 10-bit densely-packed decimal declet to 0..=999.
pub fn dpd_to_bin(d: u32) -> u32 {
    let b = |i: u32| (d >> i) & 1;
    let (p, q, r, s, t, u, v, w, x, y) = (b(9), b(8), b(7), b(6), b(5), b(4), b(3), b(2), b(1), b(0));
    let (h, i, j);
    if v == 0 {
        h = (p << 2) | (q << 1) | r;
        i = (s << 2) | (t << 1) | u;
        j = (w << 2) | (x << 1) | y;
    } else {
        match (w, x) {
            (0, 0) => {
                h = (p << 2) | (q << 1) | r;
                i = (s << 2) | (t << 1) | u;
                j = 8 | y;
            }
            (0, 1) => {
                h = (p << 2) | (q << 1) | r;
                i = 8 | u;
                j = (s << 2) | (t << 1) | y;
            }
            (1, 0) => {
                h = 8 | r;
                i = (s << 2) | (t << 1) | u;
                j = (p << 2) | (q << 1) | y;
            }
            _ => match (s, t) {
                (0, 0) => {
                    h = 8 | r;
                    i = 8 | u;
                    j = (p << 2) | (q << 1) | y;
                }
                (0, 1) => {
                    h = 8 | r;
                    i = (p << 2) | (q << 1) | u;
                    j = 8 | y;
                }
                (1, 0) => {
                    h = (p << 2) | (q << 1) | r;
                    i = 8 | u;
                    j = 8 | y;
                }
                _ => {
                    h = 8 | r;
                    i = 8 | u;
                    j = 8 | y;
                }
            },
        }
    }
    h * 100 + i * 10 + j
}

/// Encode 0..=999 as one densely-packed declet.
pub fn bin_to_dpd(v: u32) -> u32 {
    let (hd, md, ld) = (v / 100 % 10, v / 10 % 10, v % 10);
    let (bcd, fgh, jkm) = (hd & 7, md & 7, ld & 7);
    let (d, h, m) = (hd & 1, md & 1, ld & 1);
    let (fg, jk) = ((md >> 1) & 3, (ld >> 1) & 3);
    // (pqr, stu, wxy) keyed on which digits are 8 or 9.
    let (pqr, stu, wxy, v_bit) = match (hd >> 3, md >> 3, ld >> 3) {
        (0, 0, 0) => (bcd, fgh, jkm, 0),
        (0, 0, _) => (bcd, fgh, m, 1),
        (0, _, 0) => (bcd, (jk << 1) | h, 0b010 | m, 1),
        (0, _, _) => (bcd, 0b100 | h, 0b110 | m, 1),
        (_, 0, 0) => ((jk << 1) | d, fgh, 0b100 | m, 1),
        (_, 0, _) => ((fg << 1) | d, 0b010 | h, 0b110 | m, 1),
        (_, _, 0) => ((jk << 1) | d, h, 0b110 | m, 1),
        _ => (d, 0b110 | h, 0b110 | m, 1),
    };
    (pqr << 7) | (stu << 4) | (v_bit << 3) | wxy
}

/// Five declets (low 50 bits) to fifteen BCD digits (low 60 bits).
pub extern "C" fn ppc_dpd_to_bcd(dpd: u64) -> u64 {
    (0..5).fold(0u64, |acc, k| {
        let v: u32 = dpd_to_bin(((dpd >> (10 * k)) & 0x3FF) as u32);
        let digits: u64 = ((v / 100) << 8 | (v / 10 % 10) << 4 | (v % 10)) as u64;
        acc | (digits << (12 * k))
    })
}

/// Fifteen BCD digits (low 60 bits) to five declets (low 50 bits).
/// Nibbles above 9 are taken modulo 10.
pub extern "C" fn ppc_bcd_to_dpd(bcd: u64) -> u64 {
    (0..5).fold(0u64, |acc, k| {
        let group: u64 = bcd >> (12 * k);
        let digit = |i: u32| ((group >> (4 * i)) & 0xF) as u32 % 10;
        let v: u32 = digit(2) * 100 + digit(1) * 10 + digit(0);
        acc | ((bin_to_dpd(v) as u64) << (10 * k))
    })
}

/// Class bits, most significant first in the instruction's mask order.
pub mod dfp_class {
    pub const ZERO: u64 = 0x20;
    pub const SUBNORMAL: u64 = 0x10;
    pub const NORMAL: u64 = 0x08;
    pub const INFINITY: u64 = 0x04;
    pub const QNAN: u64 = 0x02;
    pub const SNAN: u64 = 0x01;
}

/// Data-group bits.
pub mod dfp_group {
    pub const ZERO_NON_EXTREME: u64 = 0x20;
    pub const ZERO_EXTREME: u64 = 0x10;
    pub const SUBNORMAL_OR_EXTREME: u64 = 0x08;
    pub const NORMAL_LMD_ZERO: u64 = 0x04;
    pub const NORMAL_LMD_NONZERO: u64 = 0x02;
    pub const SPECIAL: u64 = 0x01;
}

/// Classify a DPD-encoded decimal64 (`quad == 0`, value in `lo`) or
/// decimal128 (`quad != 0`, value in `hi:lo`).
pub extern "C" fn ppc_dfp_classify(hi: u64, lo: u64, quad: u64) -> u64 {
    let quad: bool = quad != 0;
    let top: u64 = if quad { hi } else { lo };
    let combo: u64 = (top >> 58) & 0x1F;
    if combo == 0x1E {
        return dfp_class::INFINITY | (dfp_group::SPECIAL << 8);
    }
    if combo == 0x1F {
        let snan: bool = (top >> 57) & 1 != 0;
        let class: u64 = if snan { dfp_class::SNAN } else { dfp_class::QNAN };
        return class | (dfp_group::SPECIAL << 8);
    }
    let (exp_hi, lmd): (u64, u64) = if combo >> 3 == 3 {
        ((combo >> 1) & 3, 8 + (combo & 1))
    } else {
        (combo >> 3, combo & 7)
    };
    // (exponent continuation bits, declets, bias, max digits, emin)
    let (econt_bits, declets, bias, digits_max, emin): (u32, u32, i64, i64, i64) =
        if quad { (12, 11, 6176, 34, -6143) } else { (8, 5, 398, 16, -383) };
    let econt: u64 = (top >> (58 - econt_bits)) & ((1u64 << econt_bits) - 1);
    let biased: i64 = ((exp_hi << econt_bits) | econt) as i64;
    let max_biased: i64 = (3i64 << econt_bits) - 1;

    // Count significant digits from the most significant declet down.
    let mut digits: i64 = if lmd != 0 { digits_max } else { 0 };
    if digits == 0 {
        for k in (0..declets).rev() {
            let bit: u32 = k * 10;
            let d: u64 = if bit >= 64 {
                hi >> (bit - 64)
            } else if bit + 10 > 64 {
                (lo >> bit) | (hi << (64 - bit))
            } else {
                lo >> bit
            };
            let v: u32 = dpd_to_bin((d & 0x3FF) as u32);
            if v != 0 {
                let in_declet: i64 = if v >= 100 { 3 } else if v >= 10 { 2 } else { 1 };
                digits = k as i64 * 3 + in_declet;
                break;
            }
        }
    }
    let extreme: bool = biased == 0 || biased == max_biased;
    if digits == 0 {
        let group: u64 = if extreme { dfp_group::ZERO_EXTREME } else { dfp_group::ZERO_NON_EXTREME };
        return dfp_class::ZERO | (group << 8);
    }
    let adjusted: i64 = biased - bias + digits - 1;
    if adjusted < emin {
        return dfp_class::SUBNORMAL | (dfp_group::SUBNORMAL_OR_EXTREME << 8);
    }
    let group: u64 = if extreme {
        dfp_group::SUBNORMAL_OR_EXTREME
    } else if lmd == 0 {
        dfp_group::NORMAL_LMD_ZERO
    } else {
        dfp_group::NORMAL_LMD_NONZERO
    };
    dfp_class::NORMAL | (group << 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpd_declets() {
        assert_eq!(dpd_to_bin(0x000), 0);
        assert_eq!(dpd_to_bin(0x001), 1);
        assert_eq!(dpd_to_bin(0x009), 9);
        assert_eq!(dpd_to_bin(0x010), 10);
        assert_eq!(dpd_to_bin(0x05F), 99);
        assert_eq!(dpd_to_bin(0x080), 100);
        assert_eq!(dpd_to_bin(0x3FF), 999);
    }

    #[test]
    fn test_dpd_encode_all() {
        for v in 0..1000 {
            assert_eq!(dpd_to_bin(bin_to_dpd(v)), v, "declet for {}", v);
        }
    }

    #[test]
    fn test_bcd_conversions() {
        let bcd: u64 = 0x123_456_789_012_345;
        let dpd: u64 = ppc_bcd_to_dpd(bcd);
        assert_eq!(dpd & 0x3FF, bin_to_dpd(345) as u64);
        assert_eq!(ppc_dpd_to_bcd(dpd), bcd);
    }

    #[test]
    fn test_classify_decimal64() {
        // +0E+0: biased exponent 398 = 0b01_1000_1110 -> combo 01000, econt 0x8E.
        let zero: u64 = 0x2238_0000_0000_0000;
        assert_eq!(ppc_dfp_classify(0, zero, 0) & 0x3F, dfp_class::ZERO);
        // 1E+0.
        let one: u64 = zero | 1;
        assert_eq!(ppc_dfp_classify(0, one, 0) & 0x3F, dfp_class::NORMAL);
        assert_eq!((ppc_dfp_classify(0, one, 0) >> 8) & 0x3F, dfp_group::NORMAL_LMD_ZERO);
        assert_eq!(ppc_dfp_classify(0, 0x7800_0000_0000_0000, 0) & 0x3F, dfp_class::INFINITY);
        assert_eq!(ppc_dfp_classify(0, 0x7C00_0000_0000_0000, 0) & 0x3F, dfp_class::QNAN);
        assert_eq!(ppc_dfp_classify(0, 0x7E00_0000_0000_0000, 0) & 0x3F, dfp_class::SNAN);
        // 1E-398: smallest subnormal.
        assert_eq!(ppc_dfp_classify(0, 1, 0) & 0x3F, dfp_class::SUBNORMAL);
    }

    #[test]
    fn test_resolve_callable_descriptor() {
        let descriptor: [usize; 3] = [0x1234_5678, 0, 0];
        let addr: usize = descriptor.as_ptr() as usize;
        assert_eq!(resolve_callable(addr, true), 0x1234_5678);
        assert_eq!(resolve_callable(addr, false), addr);
    }

    #[test]
    fn test_callee_names() {
        let c: Callee = callee(Helper::ReadTimeBase, &AbiInfo::default());
        assert_eq!(c.name, "ppc_read_timebase");
        assert_eq!(c.regparms, 0);
        assert_ne!(c.addr, 0);
    }
}
