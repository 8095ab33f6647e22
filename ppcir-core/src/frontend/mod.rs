//! PowerPC Front End
//!
//! Decodes one guest instruction at a time and appends its IR to a block.
//!
//! # Flow
//! 1. [`translate_instruction`] validates the target configuration and
//!    fetches the word at `code[delta..]` in the guest byte order
//! 2. magic sequences are matched literally; a hit emits the hook's IR
//!    and consumes 20 bytes
//! 3. otherwise [`dispatch`] picks the family translator, which stages IR
//!    into a fresh [`InsnBuilder`]
//! 4. on success the staged IR is committed to the block; on failure it is
//!    dropped and the block only receives `CIA := cia` and ends with
//!    `NoDecode`
//!
//! # Modules
//! - `decoder`, `bits`: instruction fields and immediate arithmetic
//! - `ir`: the emitted intermediate representation
//! - `guest_state`, `context`: register addressing and emission helpers
//! - `flags`: XER/CR flag computation
//! - `helpers`: out-of-line routines called from IR
//! - `translate`: the per-family translators
//! - `dispatch`: route tables and magic sequences

pub mod bits;
pub mod context;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod flags;
pub mod guest_state;
pub mod helpers;
pub mod ir;
pub mod translate;

use log::trace;

use crate::frontend::context::{DecodeContext, GuestReg, WhatNext};
use crate::frontend::decoder::InsnWord;
use crate::frontend::dispatch::{Magic, MAGIC_LEN};
use crate::frontend::error::DecodeFailure;
use crate::frontend::guest_state::GuestLayout;
use crate::frontend::ir::{Endness, InsnBuilder, IrBlock, JumpKind};
use crate::target::{AbiInfo, ArchInfo, Features, GuestArch};

pub use crate::frontend::dispatch::SpecialHook;

/// Supplies the IR for the "inject IR" magic sequence.
pub trait IrInjector {
    /// Append the injected statements. Loads and stores use `end`.
    fn inject(&self, ir: &mut InsnBuilder, end: Endness);
}

/// Everything one call of [`translate_instruction`] reads.
pub struct DecodeInputs<'a> {
    /// Guest code; the instruction starts at `code[delta]`.
    pub code: &'a [u8],
    pub delta: usize,
    /// Guest address of `code[delta]`.
    pub cia: u64,
    /// Guest address of the first instruction of the block.
    pub block_start: u64,
    pub arch: GuestArch,
    pub arch_info: &'a ArchInfo,
    pub abi: &'a AbiInfo,
    /// Byte order of emitted memory accesses.
    pub host_end: Endness,
    /// Whether a branch may continue decoding at the given target.
    pub resteer_ok: &'a dyn Fn(u64) -> bool,
    pub injector: Option<&'a dyn IrInjector>,
    /// Log decode failures at `warn`.
    pub sigill_diag: bool,
    pub layout: &'a dyn GuestLayout,
}

/// Outcome of decoding one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeResult {
    /// Bytes consumed: 4, 20 for a magic sequence, 0 when nothing decoded.
    pub len: u32,
    pub what_next: WhatNext,
    /// The magic sequence that fired, if any.
    pub hook: Option<SpecialHook>,
}

impl DecodeResult {
    /// Whether the instruction failed to decode.
    #[inline]
    pub fn is_no_decode(&self) -> bool {
        self.what_next == WhatNext::StopHere(JumpKind::NoDecode)
    }
}

/// Decode the instruction at `inputs.code[inputs.delta]` and append its IR
/// to `block`.
///
/// # Panics
/// For unsupported configurations: 32-bit little-endian guests, a layout
/// for another variant, capability flags of the other variant, cache-line
/// sizes outside [`LINE_SIZES`](crate::target::LINE_SIZES), or fewer than
/// four code bytes at `delta`.
pub fn translate_instruction(block: &mut IrBlock, inputs: &DecodeInputs<'_>) -> DecodeResult {
    let arch: GuestArch = inputs.arch;
    let guest_end: Endness = inputs.arch_info.endness;
    assert!(
        arch.is_64() || guest_end == Endness::Big,
        "32-bit little-endian guests are not supported"
    );
    assert_eq!(inputs.layout.arch(), arch, "guest layout is for another architecture variant");
    inputs.arch_info.hwcaps.validate(arch);
    inputs.arch_info.validate();

    let big: bool = guest_end == Endness::Big;
    let Some(w) = InsnWord::fetch(inputs.code, inputs.delta, big) else {
        panic!("no instruction word at code offset {}", inputs.delta);
    };

    let mut ctx = DecodeContext {
        arch,
        mode64: arch.is_64(),
        host_end: inputs.host_end,
        guest_end,
        cia: inputs.cia,
        block_start: inputs.block_start,
        features: Features::resolve(arch, inputs.arch_info.hwcaps),
        arch_info: inputs.arch_info,
        abi: inputs.abi,
        layout: inputs.layout,
        resteer_ok: inputs.resteer_ok,
        sigill_diag: inputs.sigill_diag,
        ir: InsnBuilder::for_block(block),
        what_next: WhatNext::Continue,
    };

    let outcome: Result<(u32, Option<SpecialHook>), DecodeFailure> =
        match dispatch::magic_at(inputs.code, inputs.delta, ctx.mode64, big) {
            Magic::Hook(hook) => {
                ctx.ir.imark(ctx.cia, MAGIC_LEN, 0);
                dispatch::emit_hook(&mut ctx, hook, inputs.injector);
                Ok((MAGIC_LEN, Some(hook)))
            }
            Magic::Unknown(request) => {
                Err(DecodeFailure::unrecognized(request.raw(), "magic sequence request"))
            }
            Magic::Absent => {
                ctx.ir.imark(ctx.cia, 4, 0);
                dispatch::dispatch(&mut ctx, w).map(|()| (4, None))
            }
        };

    match outcome {
        Ok((len, hook)) => {
            let what_next: WhatNext = ctx.what_next;
            if log::log_enabled!(target: "ppcir::ir", log::Level::Trace) {
                for s in ctx.ir.stmts() {
                    trace!(target: "ppcir::ir", "{}", s);
                }
            }
            ctx.ir.commit(block);
            DecodeResult { len, what_next, hook }
        }
        Err(err) => {
            dispatch::report_failure(&ctx, w, &err);
            no_decode(block, &ctx)
        }
    }
}

/// Commit `CIA := cia` on its own and end the block with `NoDecode`.
fn no_decode(block: &mut IrBlock, failed: &DecodeContext<'_>) -> DecodeResult {
    let mut ctx = DecodeContext {
        ir: InsnBuilder::for_block(block),
        what_next: WhatNext::Continue,
        ..*failed
    };
    let cia = ctx.mk_sz_imm(ctx.cia);
    ctx.put_gst(GuestReg::Cia, cia);
    ctx.ir.commit(block);
    DecodeResult { len: 0, what_next: WhatNext::StopHere(JumpKind::NoDecode), hook: None }
}
