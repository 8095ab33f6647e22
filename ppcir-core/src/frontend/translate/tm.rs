//! Transactional memory (ISA 2.07, primary opcode 31).
//!
//! No transaction ever starts: `tbegin.` reports an immediate failure
//! through CR0 and the TM SPRs, and execution continues with the failure
//! handler the guest branches to. Every other TM instruction sees the
//! non-transactional state.

use super::{dis, reserved_zero, unknown, Translator};
use crate::frontend::context::{DecodeContext, GuestReg};
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::ir::{mk_u32, mk_u64, mk_u8};

/// TEXASR after a failed `tbegin.`: failure persistent (bit 7) and
/// failure summary (bit 36).
const TEXASR_FAILED: u64 = (1 << 56) | (1 << 27);

/// CR0 after `tbegin.` fails: EQ.
const CR0_FAILED: u8 = 0x2;

pub struct Transactional;

impl Translator for Transactional {
    fn name(&self) -> &'static str {
        "transactional memory"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        let xo: u32 = w.xo10();
        if xo == 718 {
            return tcheck(ctx, w);
        }
        if !w.rc() {
            return unknown(w, "TM instruction without record bit");
        }
        match xo {
            654 => {
                reserved_zero(w, w.field(6, 4) | w.field(11, 10), "tbegin. reserved bits")?;
                let r: u32 = w.field(10, 1);
                dis!("tbegin. {}", r);
                ctx.put_gst(GuestReg::Texasr, mk_u64(TEXASR_FAILED));
                ctx.put_gst(GuestReg::Texasru, mk_u32(0));
                ctx.put_gst(GuestReg::Tfiar, mk_u64(ctx.cia));
                ctx.put_gst(GuestReg::Tfhar, mk_u64(ctx.nia()));
                ctx.put_cr321(0, mk_u8(CR0_FAILED));
                ctx.put_cr0(0, mk_u8(0));
                return Ok(());
            }
            686 => {
                reserved_zero(w, w.field(7, 14), "tend. reserved bits")?;
                dis!("tend. {}", w.field(6, 1));
            }
            910 => {
                reserved_zero(w, w.rd() | w.rb(), "tabort. reserved bits")?;
                dis!("tabort. r{}", w.ra());
            }
            782 | 814 => {
                let name: &str = if xo == 782 { "tabortwc." } else { "tabortdc." };
                dis!("{} {},r{},r{}", name, w.to(), w.ra(), w.rb());
            }
            846 | 878 => {
                let name: &str = if xo == 846 { "tabortwci." } else { "tabortdci." };
                dis!("{} {},r{},{}", name, w.to(), w.ra(), w.rb());
            }
            750 => {
                reserved_zero(w, w.field(6, 4) | w.field(11, 10), "tsr. reserved bits")?;
                dis!("tsr. {}", w.field(10, 1));
            }
            942 => {
                reserved_zero(w, w.rd() | w.rb(), "treclaim. reserved bits")?;
                dis!("treclaim. r{}", w.ra());
            }
            1006 => {
                reserved_zero(w, w.rd() | w.ra() | w.rb(), "trechkpt. reserved bits")?;
                dis!("trechkpt.");
            }
            _ => return unknown(w, "TM instruction"),
        }
        // Outside a transaction CR0 reads 0b0 || TS=00 || 0.
        ctx.put_cr321(0, mk_u8(0));
        ctx.put_cr0(0, mk_u8(0));
        Ok(())
    }
}

/// tcheck: with no transaction active the checked one counts as doomed.
fn tcheck(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    reserved_zero(w, w.field(9, 12) | w.rc() as u32, "tcheck reserved bits")?;
    let bf: u32 = w.crfd();
    dis!("tcheck cr{}", bf);
    ctx.put_cr_field(bf, mk_u32(0x8));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texasr_failure_bits() {
        // IBM bit k of a doubleword is 1 << (63 - k).
        assert_eq!(TEXASR_FAILED >> (63 - 7) & 1, 1);
        assert_eq!(TEXASR_FAILED >> (63 - 36) & 1, 1);
        assert_eq!(TEXASR_FAILED.count_ones(), 2);
    }
}
