//! Decode Failures
//!
//! Structured reasons why a single instruction could not be translated.
//! All of them end in the same guest-visible outcome (the instruction is
//! treated as illegal); the distinction exists for diagnostics.
//!
//! # Failure Categories
//! - **Unrecognized**: no instruction matches the opcode bits
//! - **ReservedBits**: a must-be-zero field is non-zero
//! - **InvalidForm**: an architecturally undefined operand combination,
//!   such as an update-form load whose base register equals its target
//! - **MissingCapability**: the instruction belongs to a disabled extension
//!
//! Internal invariant violations (ill-typed IR, out-of-range register
//! indices) are not represented here; they panic.

use std::fmt;

use thiserror::Error;

/// Optional instruction-set extensions an instruction may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Extension {
    FloatingPoint = 0,
    Altivec = 1,
    /// fsqrt family.
    GeneralPurposeOptional = 2,
    /// fre/frsqrte/fsel family.
    GraphicsOptional = 3,
    Vsx = 4,
    DecimalFloatingPoint = 5,
    Isa2_07 = 6,
    Isa3_0 = 7,
    /// Instruction only exists in 64-bit mode.
    Mode64 = 8,
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &str = match self {
            Extension::FloatingPoint => "floating point",
            Extension::Altivec => "Altivec",
            Extension::GeneralPurposeOptional => "general-purpose optional (FX)",
            Extension::GraphicsOptional => "graphics optional (GX)",
            Extension::Vsx => "VSX",
            Extension::DecimalFloatingPoint => "decimal floating point",
            Extension::Isa2_07 => "ISA 2.07",
            Extension::Isa3_0 => "ISA 3.0",
            Extension::Mode64 => "64-bit mode",
        };
        f.write_str(s)
    }
}

/// Why one instruction failed to translate.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    /// No instruction matches the opcode bits.
    #[error("unrecognized instruction 0x{word:08X} ({what})")]
    Unrecognized { word: u32, what: &'static str },

    /// A reserved field is non-zero.
    #[error("reserved bits set in 0x{word:08X} ({what})")]
    ReservedBits { word: u32, what: &'static str },

    /// The operand combination is architecturally undefined.
    #[error("invalid form 0x{word:08X}: {what}")]
    InvalidForm { word: u32, what: &'static str },

    /// The instruction needs an extension the guest does not have.
    #[error("instruction 0x{word:08X} requires {ext}")]
    MissingCapability { word: u32, ext: Extension },
}

impl DecodeFailure {
    #[cold]
    pub fn unrecognized(word: u32, what: &'static str) -> Self {
        Self::Unrecognized { word, what }
    }

    #[cold]
    pub fn reserved(word: u32, what: &'static str) -> Self {
        Self::ReservedBits { word, what }
    }

    #[cold]
    pub fn invalid(word: u32, what: &'static str) -> Self {
        Self::InvalidForm { word, what }
    }

    #[cold]
    pub fn missing(word: u32, ext: Extension) -> Self {
        Self::MissingCapability { word, ext }
    }

    /// The raw instruction word this failure refers to.
    pub fn word(&self) -> u32 {
        match self {
            Self::Unrecognized { word, .. }
            | Self::ReservedBits { word, .. }
            | Self::InvalidForm { word, .. }
            | Self::MissingCapability { word, .. } => *word,
        }
    }
}

/// Result of translating one instruction family member.
pub type TranslateResult = Result<(), DecodeFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_word() {
        let e = DecodeFailure::missing(0x1000_0000, Extension::Altivec);
        assert_eq!(e.to_string(), "instruction 0x10000000 requires Altivec");
        assert_eq!(e.word(), 0x1000_0000);
        let u = DecodeFailure::unrecognized(0x0000_0000, "opcode 0");
        assert!(u.to_string().contains("0x00000000"));
    }
}
