//! Immediate extension and rotate-mask generation.
//!
//! Masks use the architecture's big-endian bit numbering: `mask32(0, 0)`
//! is `0x8000_0000`. A begin position greater than the end position
//! produces the wrapping mask `begin..=31 | 0..=end`, exactly as the
//! rotate instructions define it.

/// Sign-extend the low `bits` bits of `value` to 64 bits.
///
/// # Panics
/// If `bits` is zero or larger than 64.
#[inline]
pub const fn extend_s(value: u64, bits: u32) -> u64 {
    assert!(bits > 0 && bits <= 64);
    let sh: u32 = 64 - bits;
    (((value << sh) as i64) >> sh) as u64
}

/// Zero-extend the low `bits` bits of `value` to 64 bits.
#[inline]
pub const fn extend_u(value: u64, bits: u32) -> u64 {
    assert!(bits > 0 && bits <= 64);
    if bits == 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

/// Sign-extend the low `bits` bits of `value` to 32 bits.
#[inline]
pub const fn extend_s32(value: u32, bits: u32) -> u32 {
    extend_s(value as u64, bits) as u32
}

/// 32-bit rotate mask with IBM bits `mb..=me` set.
///
/// # Examples
/// ```rust
/// use ppcir_core::frontend::bits::mask32;
/// assert_eq!(mask32(0, 31), 0xFFFF_FFFF);
/// assert_eq!(mask32(16, 31), 0x0000_FFFF);
/// assert_eq!(mask32(28, 3), 0xF000_000F);
/// ```
#[inline] // Called for every rotate instruction
pub const fn mask32(mb: u32, me: u32) -> u32 {
    assert!(mb < 32 && me < 32);
    let begin: u32 = 31 - me;
    let end: u32 = 31 - mb;
    let m1: u32 = u32::MAX << begin;
    let m2: u32 = (u32::MAX << end) << 1;
    let mask: u32 = m1 ^ m2;
    if mb > me {
        !mask
    } else {
        mask
    }
}

/// 64-bit rotate mask with IBM bits `mb..=me` set.
#[inline]
pub const fn mask64(mb: u32, me: u32) -> u64 {
    assert!(mb < 64 && me < 64);
    let begin: u32 = 63 - me;
    let end: u32 = 63 - mb;
    let m1: u64 = u64::MAX << begin;
    let m2: u64 = (u64::MAX << end) << 1;
    let mask: u64 = m1 ^ m2;
    if mb > me {
        !mask
    } else {
        mask
    }
}

/// The 64-bit mask a 32-bit rotate produces in 64-bit mode, where the
/// rotated word is replicated into both halves before masking.
#[inline]
pub const fn mask32_in_64(mb: u32, me: u32) -> u64 {
    mask64(mb + 32, me + 32)
}

/// Round `value` down to a multiple of `align`, which must be a power of two.
#[inline]
pub const fn align_down(value: u64, align: u64) -> u64 {
    value & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_boundaries() {
        for bits in [5u32, 8, 16, 26, 32] {
            let max: u64 = (1u64 << (bits - 1)) - 1;
            let min_neg: u64 = 1u64 << (bits - 1);
            let all: u64 = (1u64 << bits) - 1;
            assert_eq!(extend_s(0, bits), 0);
            assert_eq!(extend_s(max, bits) as i64, max as i64);
            assert_eq!(extend_s(all, bits) as i64, -1);
            assert_eq!(extend_s(min_neg, bits) as i64, -(1i64 << (bits - 1)));
            for v in [0, max, all, min_neg] {
                let once: u64 = extend_s(v, bits);
                assert_eq!(extend_s(once, bits), once);
                assert_eq!(extend_u(v, bits), v);
            }
        }
        assert_eq!(extend_s32(0x8000, 16), 0xFFFF_8000);
    }

    #[test]
    fn test_mask32_exhaustive() {
        for mb in 0u32..32 {
            for me in 0u32..32 {
                let m: u32 = mask32(mb, me);
                for bit in 0u32..32 {
                    let set: bool = m & (0x8000_0000 >> bit) != 0;
                    let want: bool = if mb <= me { bit >= mb && bit <= me } else { bit >= mb || bit <= me };
                    assert_eq!(set, want, "mb {} me {} bit {}", mb, me, bit);
                }
            }
        }
        assert_eq!(mask32(7, 7), 0x0100_0000);
    }

    #[test]
    fn test_mask64_exhaustive() {
        for mb in 0u32..64 {
            for me in 0u32..64 {
                let m: u64 = mask64(mb, me);
                let inside: u32 = if mb <= me { me - mb + 1 } else { 64 - (mb - me - 1) };
                assert_eq!(m.count_ones(), inside, "mb {} me {}", mb, me);
                assert!(m & (0x8000_0000_0000_0000 >> mb) != 0);
                assert!(m & (0x8000_0000_0000_0000 >> me) != 0);
            }
        }
        assert_eq!(mask64(0, 63), u64::MAX);
        assert_eq!(mask32_in_64(0, 31), 0xFFFF_FFFF);
    }
}
