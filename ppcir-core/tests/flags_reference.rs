// XER and CR0 updates checked against i128 arithmetic.
mod support;

use ppcir_core::frontend::guest_state::GuestSlot;
use ppcir_core::GuestArch;
use support::{Harness, Machine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Add,
    AddC,
    AddE,
    Subf,
    SubfC,
    SubfE,
    Neg,
    MulLw,
    MulLd,
    DivW,
    DivWU,
    DivD,
    DivDU,
}

impl Kind {
    fn xo9(self) -> u32 {
        match self {
            Kind::Add => 266,
            Kind::AddC => 10,
            Kind::AddE => 138,
            Kind::Subf => 40,
            Kind::SubfC => 8,
            Kind::SubfE => 136,
            Kind::Neg => 104,
            Kind::MulLw => 235,
            Kind::MulLd => 233,
            Kind::DivW => 491,
            Kind::DivWU => 459,
            Kind::DivD => 489,
            Kind::DivDU => 457,
        }
    }

    /// `<op>o. r3,r4,r5` (rB is 0 for neg).
    fn encode(self) -> u32 {
        let rb: u32 = if self == Kind::Neg { 0 } else { 5 };
        (31 << 26) | (3 << 21) | (4 << 16) | (rb << 11) | (1 << 10) | (self.xo9() << 1) | 1
    }
}

struct Expect {
    /// `None` where the architecture leaves the result undefined.
    res: Option<u64>,
    ov: bool,
    /// `None` when CA is not written.
    ca: Option<bool>,
}

fn s(v: u64, bits: u32) -> i128 {
    let sh: u32 = 128 - bits;
    (((v as u128) << sh) as i128) >> sh
}

fn u(v: u64, bits: u32) -> u128 {
    v as u128 & ((1u128 << bits) - 1)
}

fn fits(x: i128, bits: u32) -> bool {
    x >= -(1i128 << (bits - 1)) && x < (1i128 << (bits - 1))
}

fn wrap(x: i128, bits: u32) -> u64 {
    (x as u128 & ((1u128 << bits) - 1)) as u64
}

fn reference(kind: Kind, n: u32, a: u64, b: u64, ca_in: bool) -> Expect {
    let ci: i128 = ca_in as i128;
    let top: u128 = 1u128 << n;
    match kind {
        Kind::Add | Kind::AddC => Expect {
            res: Some(wrap(s(a, n) + s(b, n), n)),
            ov: !fits(s(a, n) + s(b, n), n),
            ca: (kind == Kind::AddC).then(|| u(a, n) + u(b, n) >= top),
        },
        Kind::AddE => Expect {
            res: Some(wrap(s(a, n) + s(b, n) + ci, n)),
            ov: !fits(s(a, n) + s(b, n) + ci, n),
            ca: Some(u(a, n) + u(b, n) + ci as u128 >= top),
        },
        Kind::Subf | Kind::SubfC => Expect {
            res: Some(wrap(s(b, n) - s(a, n), n)),
            ov: !fits(s(b, n) - s(a, n), n),
            ca: (kind == Kind::SubfC).then(|| u(b, n) >= u(a, n)),
        },
        Kind::SubfE => {
            let not_a: u64 = !a;
            Expect {
                res: Some(wrap(s(not_a, n) + s(b, n) + ci, n)),
                ov: !fits(s(not_a, n) + s(b, n) + ci, n),
                ca: Some(u(not_a, n) + u(b, n) + ci as u128 >= top),
            }
        }
        Kind::Neg => Expect { res: Some(wrap(-s(a, n), n)), ov: s(a, n) == -(1i128 << (n - 1)), ca: None },
        Kind::MulLw => {
            let p: i128 = s(a, 32) * s(b, 32);
            Expect { res: Some(wrap(p, n)), ov: !fits(p, 32), ca: None }
        }
        Kind::MulLd => {
            let p: i128 = s(a, 64) * s(b, 64);
            Expect { res: Some(wrap(p, 64)), ov: !fits(p, 64), ca: None }
        }
        Kind::DivW | Kind::DivD => {
            let w: u32 = if kind == Kind::DivW { 32 } else { 64 };
            let (x, y) = (s(a, w), s(b, w));
            let ov: bool = y == 0 || (x == -(1i128 << (w - 1)) && y == -1);
            let res: Option<u64> = if ov { None } else { Some(wrap(x / y, w)) };
            Expect { res, ov, ca: None }
        }
        Kind::DivWU | Kind::DivDU => {
            let w: u32 = if kind == Kind::DivWU { 32 } else { 64 };
            let (x, y) = (u(a, w), u(b, w));
            let res: Option<u64> = if y == 0 { None } else { Some((x / y) as u64) };
            Expect { res, ov: y == 0, ca: None }
        }
    }
}

fn samples(n: u32) -> Vec<u64> {
    let all: [u64; 11] = [
        0,
        1,
        2,
        0x7FFF_FFFF,
        0x8000_0000,
        0xFFFF_FFFF,
        0x1234_5678_9ABC_DEF0,
        0x7FFF_FFFF_FFFF_FFFF,
        0x8000_0000_0000_0000,
        0xFFFF_FFFF_FFFF_FFFE,
        u64::MAX,
    ];
    let mut v: Vec<u64> = all.iter().map(|x| u(*x, n) as u64).collect();
    v.sort_unstable();
    v.dedup();
    v
}

fn check(arch: GuestArch, kind: Kind) {
    let h = Harness::new(arch);
    let n: u32 = if arch.is_64() { 64 } else { 32 };
    let (block, res) = h.decode(&[kind.encode()]);
    assert!(!res.is_no_decode(), "{:?} did not decode", kind);

    for &a in &samples(n) {
        for &b in &samples(n) {
            for ca_in in [false, true] {
                let mut m = Machine::new(arch);
                m.set_gpr(4, a);
                m.set_gpr(5, b);
                m.set_slot(GuestSlot::XerCa, ca_in as u64);
                m.run(&block);

                let want: Expect = reference(kind, n, a, b, ca_in);
                let ctx = format!("{:?} {:?} a=0x{:x} b=0x{:x} ca={}", arch, kind, a, b, ca_in);
                assert_eq!(m.slot(GuestSlot::XerOv) == 1, want.ov, "OV {}", ctx);
                assert_eq!(m.slot(GuestSlot::XerSo) == 1, want.ov, "SO {}", ctx);
                let ca_now: bool = m.slot(GuestSlot::XerCa) == 1;
                assert_eq!(ca_now, want.ca.unwrap_or(ca_in), "CA {}", ctx);

                let so: u32 = want.ov as u32;
                match want.res {
                    Some(r) => {
                        assert_eq!(m.gpr(3), r, "result {}", ctx);
                        let order: u32 = match s(r, n).signum() {
                            -1 => 8,
                            1 => 4,
                            _ => 2,
                        };
                        assert_eq!(m.cr_field(0), order | so, "CR0 {}", ctx);
                    }
                    None => assert_eq!(m.cr_field(0) & 1, so, "CR0.SO {}", ctx),
                }
            }
        }
    }
}

#[test]
fn test_add_family_32() {
    for kind in [Kind::Add, Kind::AddC, Kind::AddE] {
        check(GuestArch::Ppc32, kind);
    }
}

#[test]
fn test_add_family_64() {
    for kind in [Kind::Add, Kind::AddC, Kind::AddE] {
        check(GuestArch::Ppc64, kind);
    }
}

#[test]
fn test_subtract_family() {
    for arch in [GuestArch::Ppc32, GuestArch::Ppc64] {
        for kind in [Kind::Subf, Kind::SubfC, Kind::SubfE, Kind::Neg] {
            check(arch, kind);
        }
    }
}

#[test]
fn test_word_multiply_and_divide() {
    for arch in [GuestArch::Ppc32, GuestArch::Ppc64] {
        for kind in [Kind::MulLw, Kind::DivW, Kind::DivWU] {
            check(arch, kind);
        }
    }
}

#[test]
fn test_doubleword_multiply_and_divide() {
    for kind in [Kind::MulLd, Kind::DivD, Kind::DivDU] {
        check(GuestArch::Ppc64, kind);
    }
}
