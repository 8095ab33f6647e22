//! Per-Family Instruction Translators
//!
//! Each family is a unit struct implementing [`Translator`]. The dispatcher
//! selects a family from the primary opcode (and a secondary opcode for
//! the extended opcode spaces), checks capability gates, and calls
//! [`Translator::translate`], which either emits the instruction's IR into
//! the context's builder or reports why the word is not decodable.
//!
//! # Families
//! - `integer`: add/subtract/multiply/divide/modulo
//! - `compare`: cmp*, cmpb, setb
//! - `logical`: and/or/xor families, extends, counts, isel
//! - `rotate`: rotates and shifts
//! - `load_store`: integer loads and stores
//! - `multiple`: lmw/stmw and string forms
//! - `branch`, `cr`, `trap`, `system`, `atomic`
//! - `float`: FP loads/stores, arithmetic, compare, convert, FPSCR
//! - `dfp`: decimal floating point
//! - `altivec`, `altivec_fp`: VMX integer/permute and float
//! - `vsx`, `vsx_table`: VSX loads/stores/moves and the XX-form space
//! - `crypto`: AES, SHA-2, polynomial multiply, BCD
//! - `tm`: transactional memory

use crate::frontend::context::DecodeContext;
use crate::frontend::decoder::InsnWord;
use crate::frontend::error::{DecodeFailure, TranslateResult};

/// Disassembly trace, one line per translated instruction.
macro_rules! dis {
    ($($arg:tt)*) => {
        log::trace!(target: "ppcir::dis", $($arg)*)
    };
}
pub(crate) use dis;

pub mod altivec;
pub mod altivec_fp;
pub mod atomic;
pub mod branch;
pub mod compare;
pub mod cr;
pub mod crypto;
pub mod dfp;
pub mod float;
pub mod integer;
pub mod load_store;
pub mod logical;
pub mod multiple;
pub mod rotate;
pub mod system;
pub mod tm;
pub mod trap;
pub mod vsx;
pub mod vsx_table;

/// A family of instructions with a uniform "decode and emit" operation.
pub trait Translator: Sync {
    /// Short family name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Emit IR for `w` into `ctx`, or report why it cannot be translated.
    fn translate(&self, ctx: &mut DecodeContext<'_>, w: InsnWord) -> TranslateResult;
}

/// Fail with `ReservedBits` unless `value` is zero.
#[inline]
pub(crate) fn reserved_zero(w: InsnWord, value: u32, what: &'static str) -> TranslateResult {
    if value != 0 {
        return Err(DecodeFailure::reserved(w.raw(), what));
    }
    Ok(())
}

/// Fail with `InvalidForm` when `bad` holds.
#[inline]
pub(crate) fn invalid_if(w: InsnWord, bad: bool, what: &'static str) -> TranslateResult {
    if bad {
        return Err(DecodeFailure::invalid(w.raw(), what));
    }
    Ok(())
}

/// Fail with `Unrecognized` for an unhandled secondary opcode.
#[cold]
pub(crate) fn unknown<T>(w: InsnWord, what: &'static str) -> Result<T, DecodeFailure> {
    Err(DecodeFailure::unrecognized(w.raw(), what))
}

/// Operations restricted to 64-bit mode fail as unrecognized elsewhere.
#[inline]
pub(crate) fn need_mode64(ctx: &DecodeContext<'_>, w: InsnWord, what: &'static str) -> TranslateResult {
    if !ctx.mode64 {
        return Err(DecodeFailure::unrecognized(w.raw(), what));
    }
    Ok(())
}

/// Record-bit suffix for disassembly.
#[inline]
pub(crate) fn dot(rc: bool) -> &'static str {
    if rc {
        "."
    } else {
        ""
    }
}

/// Overflow-enable suffix for disassembly.
#[inline]
pub(crate) fn o(oe: bool) -> &'static str {
    if oe {
        "o"
    } else {
        ""
    }
}
