// Guest configuration parsing and register addressing.
use std::collections::HashSet;

use ppcir_core::frontend::guest_state::{fpr, gpr, vr, vsr, GuestSlot};
use ppcir_core::{AbiInfo, ArchInfo, Endness, Features, GuestArch, GuestLayout, HwCaps, PpcGuestLayout};

#[test]
fn test_arch_info_from_partial_json() {
    let json = r#"{ "hwcaps": "PPC64_V | PPC64_ISA2_07", "endness": "little" }"#;
    let info: ArchInfo = serde_json::from_str(json).unwrap();
    assert_eq!(info.endness, Endness::Little);
    assert_eq!(info.hwcaps, HwCaps::PPC64_V | HwCaps::PPC64_ISA2_07);
    assert_eq!(info.dcbz_szb, ArchInfo::default().dcbz_szb);
    info.hwcaps.validate(GuestArch::Ppc64);

    let f = Features::resolve(GuestArch::Ppc64, info.hwcaps);
    assert!(f.fp && f.altivec && f.isa2_07);
    assert!(!f.vsx && !f.dfp && !f.isa3_0);
}

#[test]
fn test_abi_info_skips_predicate() {
    let abi: AbiInfo = serde_json::from_str(r#"{ "redzone_size": 288, "zap_redzone_at_blr": true }"#).unwrap();
    assert_eq!(abi.redzone_size, 288);
    assert!(abi.zap_redzone_at_blr);
    assert!(abi.zap_redzone_at_bl.is_none());
    assert!(!abi.host_calls_use_fndescrs);

    let text: String = serde_json::to_string(&abi).unwrap();
    assert!(!text.contains("zap_redzone_at_bl\""));
}

#[test]
fn test_arch_names() {
    let a: GuestArch = serde_json::from_str("\"ppc32\"").unwrap();
    assert_eq!(a, GuestArch::Ppc32);
    assert!(serde_json::from_str::<GuestArch>("\"ppc\"").is_err());
}

#[test]
fn test_register_offsets_unique_per_mode() {
    for arch in [GuestArch::Ppc32, GuestArch::Ppc64] {
        let l = PpcGuestLayout::new(arch);
        let mut seen: HashSet<u32> = HashSet::new();
        for i in 0..32 {
            assert!(seen.insert(gpr(&l, i).offset), "{:?} gpr {}", arch, i);
        }
        for i in 0..64 {
            assert!(seen.insert(vsr(&l, i).offset), "{:?} vsr {}", arch, i);
        }
        assert!(seen.insert(l.offset_of(GuestSlot::Cia)));
        assert!(seen.insert(l.offset_of(GuestSlot::Lr)));
        assert!(seen.insert(l.offset_of(GuestSlot::Ctr)));
    }
}

#[test]
fn test_fpr_is_a_vsr_doubleword_for_both_host_orders() {
    let l = PpcGuestLayout::new(GuestArch::Ppc64);
    for i in 0..32 {
        let base: u32 = vsr(&l, i).offset;
        for (host, shift) in [(Endness::Big, 0), (Endness::Little, 8)] {
            let f = fpr(&l, i, host);
            assert_eq!(f.offset, base + shift);
            // The 8-byte span stays inside VSR i.
            assert!(f.offset + 8 <= base + 16);
        }
        assert_eq!(vr(&l, i).offset, vsr(&l, i + 32).offset);
    }
}
