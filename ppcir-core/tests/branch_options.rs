// Conditional branches over all 32 BO encodings.
mod support;

use ppcir_core::frontend::guest_state::GuestSlot;
use ppcir_core::frontend::translate::branch::BranchOptions;
use ppcir_core::{JumpKind, WhatNext};
use support::{Harness, Machine, Outcome, CIA};

/// The manual's BO table: (CTR condition, CR condition). The CTR condition
/// is `Some(true)` for "branch if CTR == 0 after decrement"; the CR
/// condition is the value the tested bit must have.
fn documented(bo: u32) -> (Option<bool>, Option<bool>) {
    match bo {
        0b00000 | 0b00001 => (Some(false), Some(false)),
        0b00010 | 0b00011 => (Some(true), Some(false)),
        0b00100..=0b00111 => (None, Some(false)),
        0b01000 | 0b01001 => (Some(false), Some(true)),
        0b01010 | 0b01011 => (Some(true), Some(true)),
        0b01100..=0b01111 => (None, Some(true)),
        b if b & 0b10100 == 0b10000 => (Some(b & 0b00010 != 0), None),
        _ => (None, None),
    }
}

#[test]
fn test_decode_matches_documented_table() {
    for bo in 0..32u32 {
        let opts = BranchOptions::decode(bo);
        let (ctr, cond) = documented(bo);
        assert_eq!(opts.decrement_ctr, ctr.is_some(), "BO {:05b}", bo);
        if let Some(zero) = ctr {
            assert_eq!(opts.branch_if_ctr_zero, zero, "BO {:05b}", bo);
        }
        assert_eq!(opts.test_cond, cond.is_some(), "BO {:05b}", bo);
        if let Some(want) = cond {
            assert_eq!(opts.branch_if_true, want, "BO {:05b}", bo);
        }
        assert_eq!(opts.is_unconditional(), ctr.is_none() && cond.is_none(), "BO {:05b}", bo);
    }
    assert!(BranchOptions::decode(0b10100).is_unconditional());
}

#[test]
fn test_bc_taken_and_ctr_update() {
    let h = Harness::ppc64();
    for bo in 0..32u32 {
        // bc BO,eq,+0x40
        let word: u32 = (16 << 26) | (bo << 21) | (2 << 16) | 0x40;
        let (block, res) = h.decode(&[word]);
        assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::Boring), "BO {:05b}", bo);
        let (ctr_cond, cr_cond) = documented(bo);

        for ctr in [1u64, 2] {
            for eq in [false, true] {
                let mut m = Machine::new(h.arch);
                m.set_slot(GuestSlot::Ctr, ctr);
                m.set_slot(GuestSlot::Cr321(0), (eq as u64) << 1);
                let out: Outcome = m.run(&block);

                let new_ctr: u64 = if ctr_cond.is_some() { ctr - 1 } else { ctr };
                let ctr_ok: bool = ctr_cond.map_or(true, |zero| (new_ctr == 0) == zero);
                let cr_ok: bool = cr_cond.map_or(true, |want| eq == want);
                let ctx = format!("BO {:05b} ctr={} eq={}", bo, ctr, eq);

                assert_eq!(m.slot(GuestSlot::Ctr), new_ctr, "{}", ctx);
                if ctr_ok && cr_ok {
                    assert_eq!(out, Outcome::Exit(JumpKind::Boring, CIA + 0x40), "{}", ctx);
                } else {
                    assert_eq!(out, Outcome::FellThrough, "{}", ctx);
                    assert_eq!(m.slot(GuestSlot::Cia), CIA + 4, "{}", ctx);
                }
            }
        }
    }
}

#[test]
fn test_bcctr_may_not_decrement_ctr() {
    let h = Harness::ppc64();
    // bcctr 0,0
    let (_, res) = h.decode(&[0x4C000420]);
    assert!(res.is_no_decode());
    // bctr
    let (_, res) = h.decode(&[0x4E800420]);
    assert_eq!(res.what_next, WhatNext::StopHere(JumpKind::Boring));
}

#[test]
fn test_conditional_blr_falls_through() {
    // beqlr
    let h = Harness::ppc64();
    let (block, _) = h.decode(&[0x4D820020]);
    let mut m = Machine::new(h.arch);
    m.set_slot(GuestSlot::Lr, 0x4000);
    assert_eq!(m.run(&block), Outcome::Exit(JumpKind::Boring, CIA + 4));

    let mut m = Machine::new(h.arch);
    m.set_slot(GuestSlot::Lr, 0x4000);
    m.set_slot(GuestSlot::Cr321(0), 0b0010);
    assert_eq!(m.run(&block), Outcome::FellThrough);
    assert_eq!(m.slot(GuestSlot::Cia), 0x4000);
}
