//! Guest Configuration
//!
//! JSON description of the guest a command decodes for. Every field is
//! optional; command-line flags override individual fields afterwards.
//!
//! ```json
//! {
//!   "arch": "ppc64",
//!   "endness": "big",
//!   "hwcaps": "PPC64_V | PPC64_VX | PPC64_ISA2_07",
//!   "redzone_size": 288,
//!   "zap_redzone_at_blr": true
//! }
//! ```

use anyhow::{bail, Context, Result};
use ppcir_core::target::LINE_SIZES;
use ppcir_core::{AbiInfo, ArchInfo, Endness, GuestArch, HwCaps};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestConfig {
    pub arch: GuestArch,
    pub endness: Endness,
    /// Every capability of `arch` when absent.
    pub hwcaps: Option<HwCaps>,
    pub dcbz_szb: u32,
    pub dcbzl_szb: u32,
    pub icache_line_szb: u32,
    #[serde(flatten)]
    pub abi: AbiInfo,
}

impl Default for GuestConfig {
    fn default() -> Self {
        let info = ArchInfo::default();
        Self {
            arch: GuestArch::Ppc64,
            endness: info.endness,
            hwcaps: None,
            dcbz_szb: info.dcbz_szb,
            dcbzl_szb: info.dcbzl_szb,
            icache_line_szb: info.icache_line_szb,
            abi: AbiInfo::default(),
        }
    }
}

impl GuestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Reject combinations the decoder treats as configuration bugs.
    pub fn validate(&self) -> Result<()> {
        if !self.arch.is_64() && self.endness == Endness::Little {
            bail!("32-bit little-endian guests are not supported");
        }
        if let Some(caps) = self.hwcaps {
            let foreign = caps - self.arch.own_caps();
            if !foreign.is_empty() {
                bail!("capability flags {:?} do not belong to {:?}", foreign, self.arch);
            }
        }
        if let Some((field, size)) = self.arch_info().bad_line_size() {
            bail!("{} = {} is not a supported cache-line size (expected one of {:?})", field, size, LINE_SIZES);
        }
        Ok(())
    }

    pub fn arch_info(&self) -> ArchInfo {
        ArchInfo {
            hwcaps: self.hwcaps.unwrap_or(self.arch.own_caps()),
            endness: self.endness,
            dcbz_szb: self.dcbz_szb,
            dcbzl_szb: self.dcbzl_szb,
            icache_line_szb: self.icache_line_szb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_every_capability() {
        let cfg: GuestConfig = serde_json::from_str(r#"{ "arch": "ppc32" }"#).unwrap();
        assert_eq!(cfg.arch_info().hwcaps, HwCaps::PPC32_ALL);
        assert_eq!(cfg.endness, Endness::Big);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_abi_fields_are_flattened() {
        let cfg: GuestConfig =
            serde_json::from_str(r#"{ "redzone_size": 288, "host_calls_use_fndescrs": true }"#).unwrap();
        assert_eq!(cfg.abi.redzone_size, 288);
        assert!(cfg.abi.host_calls_use_fndescrs);
    }

    #[test]
    fn test_validate_rejects_foreign_caps_and_ppc32_le() {
        let mut cfg = GuestConfig { hwcaps: Some(HwCaps::PPC64_V), ..GuestConfig::default() };
        assert!(cfg.validate().is_ok());
        cfg.arch = GuestArch::Ppc32;
        assert!(cfg.validate().is_err());
        cfg.hwcaps = None;
        cfg.endness = Endness::Little;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_line_sizes() {
        let cfg: GuestConfig = serde_json::from_str(r#"{ "dcbz_szb": 0 }"#).unwrap();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("dcbz_szb = 0"), "{}", err);

        let cfg = GuestConfig { icache_line_szb: 24, ..GuestConfig::default() };
        assert!(cfg.validate().is_err());

        let cfg = GuestConfig { dcbzl_szb: 64, icache_line_szb: 128, ..GuestConfig::default() };
        assert!(cfg.validate().is_ok());
    }
}
