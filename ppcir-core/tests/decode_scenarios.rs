// End-to-end decoding of literal instruction words.
mod support;

use ppcir_core::frontend::guest_state::GuestSlot;
use ppcir_core::frontend::ir::{Const, Expr, IrType, Op, Stmt, Temp};
use ppcir_core::{AbiInfo, GuestArch, GuestLayout, HwCaps, IrBlock, JumpKind, SpecialHook, WhatNext};
use support::{Harness, Machine, Outcome, CIA};

const PREAMBLE_64: [u32; 4] = [0x78001800, 0x78006800, 0x7800E802, 0x78009802];
const PREAMBLE_32: [u32; 4] = [0x5400183E, 0x5400683E, 0x5400E83E, 0x5400983E];

fn puts_to(block: &IrBlock, offset: u32) -> usize {
    block
        .stmts
        .iter()
        .filter(|s| matches!(s, Stmt::Put { offset: o, .. } if *o == offset))
        .count()
}

/// The expression bound to `t`.
fn binding(block: &IrBlock, t: Temp) -> &Expr {
    block
        .stmts
        .iter()
        .find_map(|s| match s {
            Stmt::WrTmp { tmp, data } if *tmp == t => Some(data),
            _ => None,
        })
        .unwrap_or_else(|| panic!("{:?} is never written", t))
}

fn abi_hints(block: &IrBlock) -> usize {
    block.stmts.iter().filter(|s| matches!(s, Stmt::AbiHint { .. })).count()
}

#[test]
fn test_li_writes_sign_extended_immediate() {
    let h = Harness::ppc64();
    let (block, res) = h.decode(&[0x38600005]);
    assert_eq!(res.len, 4);
    assert_eq!(res.what_next, WhatNext::Continue);
    assert_eq!(block.stmts[0], Stmt::IMark { addr: CIA, len: 4, delta: 0 });

    let tmp = match &block.stmts[1] {
        Stmt::WrTmp { tmp, data: Expr::Const(Const::U64(5)) } => *tmp,
        other => panic!("expected the immediate bound to a temp, got {:?}", other),
    };
    let r3: u32 = h.layout.offset_of(GuestSlot::Gpr(3));
    assert_eq!(block.stmts[2], Stmt::Put { offset: r3, data: Expr::RdTmp(tmp) });
    assert_eq!(block.stmts.len(), 3);
}

#[test]
fn test_li_negative_in_32_bit_mode() {
    // li r3,-1
    let h = Harness::ppc32();
    let (block, _) = h.decode(&[0x3860FFFF]);
    assert!(block
        .stmts
        .iter()
        .any(|s| matches!(s, Stmt::WrTmp { data: Expr::Const(Const::U32(0xFFFF_FFFF)), .. })));
}

#[test]
fn test_add_without_flags() {
    // add r3,r2,r3
    let h = Harness::ppc64();
    let (block, res) = h.decode(&[0x7C621A14]);
    assert_eq!((res.len, res.what_next), (4, WhatNext::Continue));

    let (a, b) = block
        .stmts
        .iter()
        .find_map(|s| match s {
            Stmt::WrTmp { data: Expr::Binop(Op::Add64, a, b), .. } => match (&**a, &**b) {
                (Expr::RdTmp(a), Expr::RdTmp(b)) => Some((*a, *b)),
                _ => None,
            },
            _ => None,
        })
        .expect("an Add64 of two temps");
    let r2: u32 = h.layout.offset_of(GuestSlot::Gpr(2));
    let r3: u32 = h.layout.offset_of(GuestSlot::Gpr(3));
    assert_eq!(binding(&block, a), &Expr::Get { offset: r2, ty: IrType::I64 });
    assert_eq!(binding(&block, b), &Expr::Get { offset: r3, ty: IrType::I64 });

    for slot in [GuestSlot::XerOv, GuestSlot::XerSo, GuestSlot::XerCa, GuestSlot::Cr321(0)] {
        assert_eq!(puts_to(&block, h.layout.offset_of(slot)), 0, "{:?} written", slot);
    }

    let mut m = Machine::new(h.arch);
    m.set_gpr(2, 0x7FFF_FFFF_FFFF_FFFF);
    m.set_gpr(3, 0x7FFF_FFFF_FFFF_FFFF);
    assert_eq!(m.run(&block), Outcome::FellThrough);
    assert_eq!(m.gpr(3), 0xFFFF_FFFF_FFFF_FFFE);
    assert_eq!(m.gpr(2), 0x7FFF_FFFF_FFFF_FFFF);

    let mut m = Machine::new(h.arch);
    m.set_gpr(2, 40);
    m.set_gpr(3, 2);
    m.run(&block);
    assert_eq!(m.gpr(3), 42);
}

#[test]
fn test_blr_returns_to_aligned_lr() {
    let h = Harness::ppc64();
    let (block, res) = h.decode(&[0x4E800020]);
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::Ret));
    assert_eq!(res.len, 4);

    let mut m = Machine::new(h.arch);
    m.set_slot(GuestSlot::Lr, 0x2003);
    assert_eq!(m.run(&block), Outcome::FellThrough);
    assert_eq!(m.slot(GuestSlot::Cia), 0x2000);
    assert_eq!(m.slot(GuestSlot::Lr), 0x2003);
}

#[test]
fn test_redzone_hint_only_on_plain_blr() {
    let mut h = Harness::ppc64();
    h.abi = AbiInfo { redzone_size: 288, zap_redzone_at_blr: true, ..AbiInfo::default() };

    let (block, res) = h.decode(&[0x4E800020]);
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::Ret));
    assert_eq!(abi_hints(&block), 1);

    // blrl, beqlr
    for word in [0x4E800021u32, 0x4D820020] {
        let (block, _) = h.decode(&[word]);
        assert_eq!(abi_hints(&block), 0, "word 0x{:08X}", word);
    }
}

#[test]
fn test_sc_saves_ip_and_stops() {
    let h = Harness::ppc64();
    let (block, res) = h.decode(&[0x44000002]);
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::SysSyscall));

    let mut m = Machine::new(h.arch);
    m.run(&block);
    assert_eq!(m.slot(GuestSlot::IpAtSyscall), CIA);
    assert_eq!(m.slot(GuestSlot::Cia), CIA + 4);
}

#[test]
fn test_ldu_with_base_equal_to_target_is_no_decode() {
    // ldu r5,8(r5)
    let h = Harness::ppc64();
    let (block, res) = h.decode(&[0xE8A50009]);
    assert!(res.is_no_decode());
    assert_eq!(res.len, 0);
    assert!(block.tyenv.is_empty());
    let cia: u32 = h.layout.offset_of(GuestSlot::Cia);
    assert_eq!(block.stmts, vec![Stmt::Put { offset: cia, data: Expr::Const(Const::U64(CIA)) }]);

    // ldu r6,8(r5) is fine.
    let (_, ok) = h.decode(&[0xE8C50009]);
    assert_eq!(ok.what_next, WhatNext::Continue);
}

#[test]
fn test_client_request_magic() {
    let h = Harness::ppc64();
    let mut words: Vec<u32> = PREAMBLE_64.to_vec();
    words.push(0x7C210B78);
    let (block, res) = h.decode(&words);
    assert_eq!(res.len, 20);
    assert_eq!(res.hook, Some(SpecialHook::ClientRequest));
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::ClientReq));
    assert_eq!(block.stmts[0], Stmt::IMark { addr: CIA, len: 20, delta: 0 });

    let mut m = Machine::new(h.arch);
    m.run(&block);
    assert_eq!(m.slot(GuestSlot::Cia), CIA + 20);
}

#[test]
fn test_nraddr_magic_in_32_bit_mode() {
    let h = Harness::ppc32().with_caps(HwCaps::PPC32_F);
    let mut words: Vec<u32> = PREAMBLE_32.to_vec();
    words.push(0x7C421378);
    let (block, res) = h.decode(&words);
    assert_eq!(res.hook, Some(SpecialHook::GuestNrAddr));
    assert_eq!(res.what_next, WhatNext::Continue);

    let mut m = Machine::new(h.arch);
    m.set_slot(GuestSlot::NrAddr, 0x8000_1234);
    m.run(&block);
    assert_eq!(m.gpr(3), 0x8000_1234);
}

#[test]
fn test_unknown_magic_request_is_no_decode() {
    let h = Harness::ppc64();
    let mut words: Vec<u32> = PREAMBLE_64.to_vec();
    words.push(0x7CC63378); // or 6,6,6
    let (_, res) = h.decode(&words);
    assert!(res.is_no_decode());
}

#[test]
fn test_missing_fp_capability() {
    // fadd f1,f2,f3
    let word: u32 = 0xFC22182A;
    let (_, res) = Harness::ppc32().with_caps(HwCaps::empty()).decode(&[word]);
    assert!(res.is_no_decode());
    let (_, res) = Harness::ppc32().with_caps(HwCaps::PPC32_F).decode(&[word]);
    assert_eq!(res.what_next, WhatNext::Continue);
}

#[test]
fn test_doubleword_ops_rejected_in_32_bit_mode() {
    // ld r3,0(r4)
    let (_, res) = Harness::ppc32().decode(&[0xE8640000]);
    assert!(res.is_no_decode());
}

#[test]
fn test_unconditional_branch_resteers_when_allowed() {
    // b +0x100
    let mut h = Harness::ppc64();
    let (block, res) = h.decode(&[0x48000100]);
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::Boring));
    let mut m = Machine::new(h.arch);
    m.run(&block);
    assert_eq!(m.slot(GuestSlot::Cia), CIA + 0x100);

    h.resteer = true;
    let (_, res) = h.decode(&[0x48000100]);
    assert_eq!(res.what_next, WhatNext::Resteer { target: CIA + 0x100 });
}

#[test]
fn test_bl_sets_link_register() {
    // bl -0x10
    let h = Harness::ppc64();
    let (block, res) = h.decode(&[0x4BFFFFF1]);
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::Call));
    let mut m = Machine::new(h.arch);
    m.run(&block);
    assert_eq!(m.slot(GuestSlot::Lr), CIA + 4);
    assert_eq!(m.slot(GuestSlot::Cia), CIA - 0x10);
}

#[test]
fn test_trap_never_emits_nothing() {
    // tw 0,r0,r0
    let (block, res) = Harness::ppc64().decode(&[0x7C000008]);
    assert_eq!(res.what_next, WhatNext::Continue);
    assert_eq!(block.stmts.len(), 1);
}

#[test]
fn test_little_endian_64_bit_fetch() {
    let mut h = Harness::ppc64();
    h.arch_info.endness = ppcir_core::Endness::Little;
    let (block, res) = h.decode(&[0x38600005]);
    assert_eq!(res.len, 4);
    let mut m = Machine::new(h.arch);
    m.run(&block);
    assert_eq!(m.gpr(3), 5);
}

#[test]
fn test_redecoding_is_structurally_identical() {
    let h = Harness::ppc64();
    for word in [0x38600005u32, 0x7C621A15, 0x4E800020, 0x7C6307B4] {
        let (a, ra) = h.decode(&[word]);
        let (b, rb) = h.decode(&[word]);
        assert_eq!(a, b, "word 0x{:08X}", word);
        assert_eq!(ra, rb);
    }
}

#[test]
fn test_second_instruction_continues_temp_numbering() {
    let h = Harness::ppc64();
    let (first, _) = h.decode(&[0x7C621A15]);
    let mut block = first.clone();
    h.decode_into(&mut block, &[0x7C621A15], CIA + 4);
    assert_eq!(block.tyenv.len(), 2 * first.tyenv.len());
    assert_eq!(block.stmts.len(), 2 * first.stmts.len());
    assert_eq!(&block.tyenv[first.tyenv.len()..], &first.tyenv[..]);
}

#[test]
#[should_panic]
fn test_32_bit_little_endian_is_unsupported() {
    let mut h = Harness::ppc32();
    h.arch_info.endness = ppcir_core::Endness::Little;
    h.decode(&[0x38600005]);
}

#[test]
#[should_panic]
fn test_foreign_capability_flags_panic() {
    Harness::ppc64().with_caps(HwCaps::PPC32_V).decode(&[0x38600005]);
}

#[test]
fn test_rlwinm_wrapping_mask() {
    // rlwinm r3,r4,8,28,3
    let word: u32 = 0x54834706;

    let h = Harness::ppc32();
    let (block, _) = h.decode(&[word]);
    let mut m = Machine::new(h.arch);
    m.set_gpr(4, 0x1234_5678);
    m.run(&block);
    assert_eq!(m.gpr(3), 0x3000_0002);

    // In 64-bit mode the mask also keeps the upper copy of the rotated word.
    let h = Harness::ppc64();
    let (block, _) = h.decode(&[word]);
    let mut m = Machine::new(h.arch);
    m.set_gpr(4, 0xFFFF_FFFF_1234_5678);
    m.run(&block);
    assert_eq!(m.gpr(3), 0x3456_7812_3000_0002);
}

#[test]
fn test_srawi_carry_out() {
    // srawi r3,r4,4
    let h = Harness::ppc32();
    let (block, _) = h.decode(&[0x7C832670]);
    for (src, want, ca) in [(0xFFFF_FFEFu64, 0xFFFF_FFFEu64, 1u64), (0xFFFF_FFF0, 0xFFFF_FFFF, 0), (17, 1, 0)] {
        let mut m = Machine::new(h.arch);
        m.set_gpr(4, src);
        m.set_slot(GuestSlot::XerCa, 1 - ca);
        m.run(&block);
        assert_eq!(m.gpr(3), want, "srawi of 0x{:X}", src);
        assert_eq!(m.slot(GuestSlot::XerCa), ca, "carry of 0x{:X}", src);
    }
}

#[test]
fn test_lwzu_updates_base() {
    // lwzu r3,8(r4)
    let h = Harness::ppc32();
    let (block, res) = h.decode(&[0x84640008]);
    assert_eq!(res.what_next, WhatNext::Continue);

    let mut m = Machine::new(h.arch);
    m.set_gpr(4, 0x2000);
    m.write_mem(IrType::I32, 0x2008, 0xCAFE_F00D);
    m.run(&block);
    assert_eq!(m.gpr(3), 0xCAFE_F00D);
    assert_eq!(m.gpr(4), 0x2008);
}

#[test]
fn test_stwu_stores_old_base() {
    // stwu r1,-16(r1)
    let h = Harness::ppc64();
    let (block, _) = h.decode(&[0x9421FFF0]);
    let mut m = Machine::new(h.arch);
    m.set_gpr(1, 0x3000);
    m.fill_mem(0x2FF0, 8, 0xEE);
    m.run(&block);
    assert_eq!(m.gpr(1), 0x2FF0);
    assert_eq!(m.read_mem(IrType::I32, 0x2FF0), 0x3000);
    assert_eq!(m.read_mem(IrType::I32, 0x2FF4), 0xEEEE_EEEE);
}

#[test]
fn test_lwz_zero_extends_in_64_bit_mode() {
    // lwz r3,0(r4)
    let h = Harness::ppc64();
    let (block, _) = h.decode(&[0x80640000]);
    let mut m = Machine::new(h.arch);
    m.set_gpr(3, u64::MAX);
    m.set_gpr(4, 0x2000);
    m.write_mem(IrType::I32, 0x2000, 0xFFFF_FFFF);
    m.run(&block);
    assert_eq!(m.gpr(3), 0x0000_0000_FFFF_FFFF);
}

#[test]
fn test_lq_even_register_gets_high_doubleword() {
    // lq r4,16(r3)
    let h = Harness::ppc64();
    let (block, res) = h.decode(&[0xE0830010]);
    assert_eq!(res.what_next, WhatNext::Continue);

    // Little-endian memory keeps the high doubleword at the higher address.
    let mut m = Machine::new(h.arch);
    m.set_gpr(3, 0x2000);
    m.write_mem(IrType::I64, 0x2018, 0x1111_2222_3333_4444);
    m.write_mem(IrType::I64, 0x2010, 0x5555_6666_7777_8888);
    m.run(&block);
    assert_eq!(m.gpr(4), 0x1111_2222_3333_4444);
    assert_eq!(m.gpr(5), 0x5555_6666_7777_8888);
}

#[test]
fn test_lwarx_stwcx_sets_cr0() {
    let h = Harness::ppc32();
    let mut m = Machine::new(h.arch);
    m.set_gpr(4, 0x2000);
    m.set_slot(GuestSlot::XerSo, 1);
    m.write_mem(IrType::I32, 0x2000, 0xDEAD_BEEF);

    // lwarx r3,0,r4
    let (load, res) = h.decode(&[0x7C602028]);
    assert_eq!(res.what_next, WhatNext::Continue);
    assert!(load.stmts.iter().any(|s| matches!(s, Stmt::LoadLinked { .. })));
    assert_eq!(m.run(&load), Outcome::FellThrough);
    assert_eq!(m.gpr(3), 0xDEAD_BEEF);

    // stwcx. r3,0,r4
    let (store, _) = h.decode(&[0x7C60212D]);
    assert!(store.stmts.iter().any(|s| matches!(s, Stmt::StoreCond { .. })));
    m.set_gpr(3, 0x1234_5678);
    assert_eq!(m.run(&store), Outcome::FellThrough);
    assert_eq!(m.read_mem(IrType::I32, 0x2000), 0x1234_5678);
    // EQ for success, SO copied from XER.
    assert_eq!(m.cr_field(0), 0b0011);
}

#[test]
fn test_misaligned_reservation_raises_sigbus() {
    let h = Harness::ppc32();
    for word in [0x7C602028u32, 0x7C60212D] {
        let (block, _) = h.decode(&[word]);
        let mut m = Machine::new(h.arch);
        m.set_gpr(4, 0x2002);
        assert_eq!(m.run(&block), Outcome::Exit(JumpKind::SigBus, CIA), "word 0x{:08X}", word);
    }
}

#[test]
fn test_stwcx_without_record_bit_is_no_decode() {
    let (_, res) = Harness::ppc32().decode(&[0x7C60212C]);
    assert!(res.is_no_decode());
}

#[test]
fn test_lswx_stops_after_xer_byte_count() {
    // lswx r5,r3,r4
    let h = Harness::ppc32();
    let (block, res) = h.decode(&[0x7CA3242A]);
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::Boring));

    let mut m = Machine::new(h.arch);
    m.set_gpr(3, 0x2000);
    m.set_gpr(5, 0xFFFF_FFFF);
    m.set_slot(GuestSlot::XerBc, 3);
    m.write_mem(IrType::I8, 0x2000, 0xAA);
    m.write_mem(IrType::I8, 0x2001, 0xBB);
    m.write_mem(IrType::I8, 0x2002, 0xCC);
    m.write_mem(IrType::I8, 0x2003, 0xDD);
    assert_eq!(m.run(&block), Outcome::Exit(JumpKind::Boring, CIA + 4));
    assert_eq!(m.gpr(5), 0xAABB_CC00);

    // A zero count leaves the target untouched.
    let mut m = Machine::new(h.arch);
    m.set_gpr(5, 0x1234);
    assert_eq!(m.run(&block), Outcome::Exit(JumpKind::Boring, CIA + 4));
    assert_eq!(m.gpr(5), 0x1234);
}

#[test]
fn test_conditional_trap() {
    let h = Harness::ppc64();
    // tw 4,r3,r4 and twi 4,r3,5
    for word in [0x7C832008u32, 0x0C830005] {
        let (block, res) = h.decode(&[word]);
        assert_eq!(res.what_next, WhatNext::Continue);

        let mut m = Machine::new(h.arch);
        m.set_gpr(3, 0xFFFF_FFFF_0000_0005);
        m.set_gpr(4, 5);
        assert_eq!(m.run(&block), Outcome::Exit(JumpKind::SigTrap, CIA), "word 0x{:08X}", word);

        let mut m = Machine::new(h.arch);
        m.set_gpr(3, 6);
        m.set_gpr(4, 5);
        assert_eq!(m.run(&block), Outcome::FellThrough, "word 0x{:08X}", word);
    }
}

#[test]
fn test_compare_writes_target_field_with_so() {
    let h = Harness::ppc64();
    // cmp cr3,0,r3,r4 / cmpl cr3,0,r3,r4
    for (word, want) in [(0x7D832000u32, 0b1001u32), (0x7D832040, 0b0101)] {
        let (block, _) = h.decode(&[word]);
        let mut m = Machine::new(h.arch);
        m.set_gpr(3, u64::MAX);
        m.set_gpr(4, 1);
        m.set_slot(GuestSlot::XerSo, 1);
        m.run(&block);
        assert_eq!(m.cr_field(3), want, "word 0x{:08X}", word);
        assert_eq!(m.cr_field(0), 0);
    }
}

#[test]
fn test_dcbz_zeroes_aligned_block() {
    // dcbz 0,r3
    let h = Harness::ppc64();
    let (block, _) = h.decode(&[0x7C001FEC]);
    let mut m = Machine::new(h.arch);
    m.set_gpr(3, 0x2047);
    m.fill_mem(0x2030, 0x40, 0xFF);
    m.run(&block);
    for addr in 0x2040..0x2060u64 {
        assert_eq!(m.read_mem(IrType::I8, addr), 0, "byte at 0x{:X}", addr);
    }
    assert_eq!(m.read_mem(IrType::I8, 0x203F), 0xFF);
    assert_eq!(m.read_mem(IrType::I8, 0x2060), 0xFF);
}

#[test]
fn test_icbi_records_line_and_stops() {
    // icbi 0,r3
    let h = Harness::ppc64();
    let (block, res) = h.decode(&[0x7C001FAC]);
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::InvalICache));
    assert!(block.stmts.contains(&Stmt::MemFence));

    let mut m = Machine::new(h.arch);
    m.set_gpr(3, 0x2047);
    assert_eq!(m.run(&block), Outcome::FellThrough);
    assert_eq!(m.slot(GuestSlot::CmStart), 0x2040);
    assert_eq!(m.slot(GuestSlot::CmLen), 32);
    assert_eq!(m.slot(GuestSlot::Cia), CIA + 4);
}

#[test]
#[should_panic(expected = "dcbz_szb = 0")]
fn test_zero_dcbz_size_panics() {
    let mut h = Harness::ppc64();
    h.arch_info.dcbz_szb = 0;
    h.decode(&[0x7C001FEC]);
}

#[test]
#[should_panic(expected = "icache_line_szb = 24")]
fn test_odd_icache_line_panics() {
    let mut h = Harness::new(GuestArch::Ppc32);
    h.arch_info.icache_line_szb = 24;
    h.decode(&[0x7C001FAC]);
}
