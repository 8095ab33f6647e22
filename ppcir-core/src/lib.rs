//! PowerPC 32/64-bit instruction decoder emitting an SSA intermediate
//! representation.
//!
//! The entry point is [`translate_instruction`], which decodes one guest
//! instruction and appends its IR to an [`IrBlock`].

pub mod frontend;
pub mod target;

pub use frontend::context::{GuestReg, WhatNext};
pub use frontend::decoder::InsnWord;
pub use frontend::dispatch::family_of;
pub use frontend::error::{DecodeFailure, Extension};
pub use frontend::guest_state::{GuestLayout, PpcGuestLayout};
pub use frontend::ir::{Endness, InsnBuilder, IrBlock, JumpKind};
pub use frontend::{translate_instruction, DecodeInputs, DecodeResult, IrInjector, SpecialHook};
pub use target::{AbiInfo, ArchInfo, Features, GuestArch, HwCaps};
