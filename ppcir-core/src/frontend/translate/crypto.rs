//! ISA 2.07 vector crypto, polynomial multiply, vpermxor and BCD
//! arithmetic (primary opcode 4).

use super::altivec::{perm_be, splat_const};
use super::{dis, reserved_zero, unknown, Translator};
use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::TranslateResult;
use crate::frontend::ir::{binop, mk_u64, mk_u8, mkexpr, triop, unop, Expr, Op, Temp};

pub struct Crypto;

/// bcdadd. and bcdsub.: VX-form with the record bit always set and PS in
/// bit 22.
pub fn is_bcd(w: InsnWord) -> bool {
    matches!(w.vx_xo11() & 0x5FF, 0x401 | 0x441)
}

impl Translator for Crypto {
    fn name(&self) -> &'static str {
        "crypto"
    }

    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
        if w.va_xo6() == 45 {
            return permute_xor(ctx, w);
        }
        if is_bcd(w) {
            return bcd(ctx, w);
        }
        let (vd, va, vb) = (w.rd(), w.ra(), w.rb());
        let r: Expr = match w.vx_xo11() {
            xo @ (1288 | 1289 | 1352 | 1353) => {
                let (name, op) = match xo {
                    1288 => ("vcipher", Op::CipherV128),
                    1289 => ("vcipherlast", Op::CipherLV128),
                    1352 => ("vncipher", Op::NCipherV128),
                    _ => ("vncipherlast", Op::NCipherLV128),
                };
                dis!("{} v{},v{},v{}", name, vd, va, vb);
                binop(op, ctx.get_vreg(va), ctx.get_vreg(vb))
            }
            1480 => {
                reserved_zero(w, vb, "vsbox rB")?;
                dis!("vsbox v{},v{}", vd, va);
                unop(Op::CipherSV128, ctx.get_vreg(va))
            }
            xo @ (1666 | 1730) => {
                let st: u32 = w.field(16, 1);
                let six: u32 = w.field(17, 4);
                let (name, op) = if xo == 1666 { ("vshasigmaw", Op::SHA256) } else { ("vshasigmad", Op::SHA512) };
                dis!("{} v{},v{},{},{}", name, vd, va, st, six);
                binop(op, ctx.get_vreg(va), mk_u8(((st << 4) | six) as u8))
            }
            xo @ (1032 | 1096 | 1160 | 1224) => {
                let (name, op) = match xo {
                    1032 => ("vpmsumb", Op::PolynomialMulAdd8x16),
                    1096 => ("vpmsumh", Op::PolynomialMulAdd16x8),
                    1160 => ("vpmsumw", Op::PolynomialMulAdd32x4),
                    _ => ("vpmsumd", Op::PolynomialMulAdd64x2),
                };
                dis!("{} v{},v{},v{}", name, vd, va, vb);
                binop(op, ctx.get_vreg(va), ctx.get_vreg(vb))
            }
            _ => return unknown(w, "vector crypto"),
        };
        ctx.put_vreg(vd, r);
        Ok(())
    }
}

/// vpermxor: byte `i` is `vA[c >> 4] ^ vB[c & 15]` for control byte `c`.
fn permute_xor(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (vd, va, vb, vc) = (w.rd(), w.ra(), w.rb(), w.rc_field());
    dis!("vpermxor v{},v{},v{},v{}", vd, va, vb, vc);
    let c: Temp = ctx.tmp(ctx.get_vreg(vc));
    let hi: Expr = binop(Op::Shr8x16, mkexpr(c), splat_const(8, 4));
    let lo: Expr = binop(Op::AndV128, mkexpr(c), splat_const(8, 0x0F));
    let r: Expr = binop(
        Op::XorV128,
        perm_be(ctx.get_vreg(va), hi),
        perm_be(ctx.get_vreg(vb), lo),
    );
    ctx.put_vreg(vd, r);
    Ok(())
}

/// bcdadd./bcdsub. CR6 reports the sign and zeroness of the result;
/// invalid operands and overflow are not detected, so SO is always clear.
fn bcd(ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult {
    let (vd, va, vb) = (w.rd(), w.ra(), w.rb());
    let ps: u32 = w.field(22, 1);
    let sub: bool = w.vx_xo11() & 0x40 != 0;
    dis!("bcd{}. v{},v{},v{},{}", if sub { "sub" } else { "add" }, vd, va, vb, ps);
    let op: Op = if sub { Op::BCDSub } else { Op::BCDAdd };
    let r: Temp = ctx.tmp(triop(op, ctx.get_vreg(va), ctx.get_vreg(vb), mk_u8(ps as u8)));
    ctx.put_vreg(vd, mkexpr(r));

    let [hi, lo] = ctx.break_v128_to_2x64(mkexpr(r));
    let sign: Temp = ctx.tmp(binop(Op::And64, mkexpr(lo), mk_u64(0xF)));
    let negative: Expr = binop(
        Op::Or1,
        binop(Op::CmpEQ64, mkexpr(sign), mk_u64(0xB)),
        binop(Op::CmpEQ64, mkexpr(sign), mk_u64(0xD)),
    );
    let digits: Expr = binop(Op::Or64, mkexpr(hi), binop(Op::Shr64, mkexpr(lo), mk_u8(4)));
    let zero: Temp = ctx.tmp(binop(Op::CmpEQ64, digits, mk_u64(0)));
    let neg: Temp = ctx.tmp(binop(Op::And1, negative, unop(Op::Not1, mkexpr(zero))));
    let pos: Expr = binop(Op::And1, unop(Op::Not1, mkexpr(neg)), unop(Op::Not1, mkexpr(zero)));
    let bit = |b: Expr, shift: u8| binop(Op::Shl8, unop(Op::Cast1Uto8, b), mk_u8(shift));
    let cr: Expr = binop(
        Op::Or8,
        bit(mkexpr(neg), 3),
        binop(Op::Or8, bit(pos, 2), bit(mkexpr(zero), 1)),
    );
    ctx.put_cr321(6, cr);
    ctx.put_cr0(6, mk_u8(0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_predicate() {
        // bcdadd. v1,v2,v3,0 and bcdsub. v1,v2,v3,1
        assert!(is_bcd(InsnWord(0x1022_1C01)));
        assert!(is_bcd(InsnWord(0x1022_1E41)));
        // vaddubm has no record bit.
        assert!(!is_bcd(InsnWord(0x1022_1800)));
        // vcipher
        assert!(!is_bcd(InsnWord(0x1022_1D08)));
    }
}
