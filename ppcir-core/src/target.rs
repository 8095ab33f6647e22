//! Guest Target Description
//!
//! Everything the decoder needs to know about the machine being decoded
//! and the host it is decoded for, fixed for the lifetime of one
//! translation unit.
//!
//! # Capability Sets
//! [`HwCaps`] holds two disjoint groups of flags, one per architecture
//! variant. A capability set handed to the decoder must only contain
//! flags of its own variant; anything else is a configuration bug and
//! panics in [`HwCaps::validate`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::frontend::ir::Endness;

/// Architecture variant of the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestArch {
    Ppc32,
    Ppc64,
}

impl GuestArch {
    #[inline]
    pub const fn is_64(self) -> bool {
        matches!(self, GuestArch::Ppc64)
    }

    /// Size of a GPR in bytes.
    #[inline]
    pub const fn word_bytes(self) -> u32 {
        if self.is_64() {
            8
        } else {
            4
        }
    }

    /// Every capability flag that belongs to this variant.
    pub const fn own_caps(self) -> HwCaps {
        match self {
            GuestArch::Ppc32 => HwCaps::PPC32_ALL,
            GuestArch::Ppc64 => HwCaps::PPC64_ALL,
        }
    }
}

bitflags! {
    /// Optional hardware features present on the guest CPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct HwCaps: u32 {
        /// Floating point (32-bit variant only; always present on 64-bit).
        const PPC32_F       = 1 << 0;
        /// Altivec/VMX.
        const PPC32_V       = 1 << 1;
        /// fsqrt family.
        const PPC32_FX      = 1 << 2;
        /// fre/frsqrte/fsel family.
        const PPC32_GX      = 1 << 3;
        const PPC32_VX      = 1 << 4;
        const PPC32_DFP     = 1 << 5;
        const PPC32_ISA2_07 = 1 << 6;
        const PPC32_ISA3_0  = 1 << 7;

        const PPC64_V       = 1 << 16;
        const PPC64_FX      = 1 << 17;
        const PPC64_GX      = 1 << 18;
        const PPC64_VX      = 1 << 19;
        const PPC64_DFP     = 1 << 20;
        const PPC64_ISA2_07 = 1 << 21;
        const PPC64_ISA3_0  = 1 << 22;

        const PPC32_ALL = Self::PPC32_F.bits()
            | Self::PPC32_V.bits()
            | Self::PPC32_FX.bits()
            | Self::PPC32_GX.bits()
            | Self::PPC32_VX.bits()
            | Self::PPC32_DFP.bits()
            | Self::PPC32_ISA2_07.bits()
            | Self::PPC32_ISA3_0.bits();
        const PPC64_ALL = Self::PPC64_V.bits()
            | Self::PPC64_FX.bits()
            | Self::PPC64_GX.bits()
            | Self::PPC64_VX.bits()
            | Self::PPC64_DFP.bits()
            | Self::PPC64_ISA2_07.bits()
            | Self::PPC64_ISA3_0.bits();
    }
}

impl Default for HwCaps {
    fn default() -> Self {
        Self::empty()
    }
}

impl HwCaps {
    /// Assert that no flag of the other variant is set.
    ///
    /// # Panics
    /// When the set contains a foreign flag.
    pub fn validate(self, arch: GuestArch) {
        let foreign: HwCaps = self - arch.own_caps();
        assert!(foreign.is_empty(), "capability flags {:?} do not belong to {:?}", foreign, arch);
    }
}

/// Enabled extensions, resolved from a capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    pub fp: bool,
    pub altivec: bool,
    pub fx: bool,
    pub gx: bool,
    pub vsx: bool,
    pub dfp: bool,
    pub isa2_07: bool,
    pub isa3_0: bool,
}

impl Features {
    pub fn resolve(arch: GuestArch, caps: HwCaps) -> Self {
        match arch {
            GuestArch::Ppc32 => Features {
                fp: caps.contains(HwCaps::PPC32_F),
                altivec: caps.contains(HwCaps::PPC32_V),
                fx: caps.contains(HwCaps::PPC32_FX),
                gx: caps.contains(HwCaps::PPC32_GX),
                vsx: caps.contains(HwCaps::PPC32_VX),
                dfp: caps.contains(HwCaps::PPC32_DFP),
                isa2_07: caps.contains(HwCaps::PPC32_ISA2_07),
                isa3_0: caps.contains(HwCaps::PPC32_ISA3_0),
            },
            GuestArch::Ppc64 => Features {
                fp: true,
                altivec: caps.contains(HwCaps::PPC64_V),
                fx: caps.contains(HwCaps::PPC64_FX),
                gx: caps.contains(HwCaps::PPC64_GX),
                vsx: caps.contains(HwCaps::PPC64_VX),
                dfp: caps.contains(HwCaps::PPC64_DFP),
                isa2_07: caps.contains(HwCaps::PPC64_ISA2_07),
                isa3_0: caps.contains(HwCaps::PPC64_ISA3_0),
            },
        }
    }
}

/// Guest CPU description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchInfo {
    pub hwcaps: HwCaps,
    /// Byte order of the guest code and data.
    pub endness: Endness,
    /// Bytes zeroed by `dcbz`.
    pub dcbz_szb: u32,
    /// Bytes zeroed by `dcbzl`.
    pub dcbzl_szb: u32,
    /// I-cache line size, used to round `icbi` addresses.
    pub icache_line_szb: u32,
}

impl Default for ArchInfo {
    fn default() -> Self {
        Self {
            hwcaps: HwCaps::empty(),
            endness: Endness::Big,
            dcbz_szb: 32,
            dcbzl_szb: 128,
            icache_line_szb: 32,
        }
    }
}

/// Cache-line sizes the decoder accepts.
pub const LINE_SIZES: [u32; 4] = [16, 32, 64, 128];

impl ArchInfo {
    /// The first cache-line size outside [`LINE_SIZES`], by field name.
    pub fn bad_line_size(&self) -> Option<(&'static str, u32)> {
        [
            ("dcbz_szb", self.dcbz_szb),
            ("dcbzl_szb", self.dcbzl_szb),
            ("icache_line_szb", self.icache_line_szb),
        ]
        .into_iter()
        .find(|(_, size)| !LINE_SIZES.contains(size))
    }

    /// # Panics
    /// When a cache-line size is not one of [`LINE_SIZES`].
    pub fn validate(&self) {
        if let Some((field, size)) = self.bad_line_size() {
            panic!("{} = {} is not a supported cache-line size", field, size);
        }
    }
}

/// Host and guest ABI details that influence emitted IR.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AbiInfo {
    /// Bytes below the stack pointer the guest ABI reserves; 0 for none.
    pub redzone_size: u32,
    /// Emit a red-zone hint when a `blr` returns.
    pub zap_redzone_at_blr: bool,
    /// Decides per call target whether `bl` emits a red-zone hint.
    #[serde(skip)]
    pub zap_redzone_at_bl: Option<fn(u64) -> bool>,
    /// The host represents function pointers as descriptors.
    pub host_calls_use_fndescrs: bool,
}

impl AbiInfo {
    /// Whether a call to `target` should mark the red zone undefined.
    #[inline]
    pub fn zap_at_call(&self, target: u64) -> bool {
        self.redzone_size != 0 && self.zap_redzone_at_bl.map_or(false, |f| f(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_sizes() {
        let info = ArchInfo::default();
        assert_eq!(info.bad_line_size(), None);
        info.validate();
        let odd = ArchInfo { icache_line_szb: 24, ..ArchInfo::default() };
        assert_eq!(odd.bad_line_size(), Some(("icache_line_szb", 24)));
        let zero = ArchInfo { dcbz_szb: 0, ..ArchInfo::default() };
        assert_eq!(zero.bad_line_size(), Some(("dcbz_szb", 0)));
    }

    #[test]
    #[should_panic(expected = "dcbzl_szb")]
    fn test_validate_rejects_odd_line_size() {
        ArchInfo { dcbzl_szb: 96, ..ArchInfo::default() }.validate();
    }

    #[test]
    fn test_groups_are_disjoint() {
        assert!((HwCaps::PPC32_ALL & HwCaps::PPC64_ALL).is_empty());
    }

    #[test]
    fn test_resolve_64_always_has_fp() {
        let f = Features::resolve(GuestArch::Ppc64, HwCaps::PPC64_V);
        assert!(f.fp && f.altivec && !f.vsx);
        let g = Features::resolve(GuestArch::Ppc32, HwCaps::empty());
        assert!(!g.fp);
    }

    #[test]
    #[should_panic]
    fn test_foreign_flag_panics() {
        (HwCaps::PPC32_F | HwCaps::PPC64_V).validate(GuestArch::Ppc32);
    }

    #[test]
    fn test_abi_call_predicate() {
        fn always(_: u64) -> bool {
            true
        }
        let mut abi = AbiInfo { zap_redzone_at_bl: Some(always), ..AbiInfo::default() };
        assert!(!abi.zap_at_call(0x1000));
        abi.redzone_size = 288;
        assert!(abi.zap_at_call(0x1000));
    }
}
