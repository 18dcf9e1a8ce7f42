//! Instruction set codec.
//!
//! This module classifies raw instruction words into the architectural
//! formats and unpacks their fields:
//! 1. **Formats:** R, R4, I, S, SB, U, UJ, plus provisional compressed tags.
//! 2. **Decode:** Opcode classification, field extraction, immediate
//!    sign-extension and bit-group permutation.
//! 3. **Encode:** The exact inverse, used by tooling and tests.

/// Decoding and encoding of instruction words.
pub mod decode;

/// Decoded instruction representation and format tags.
pub mod instruction;

pub use decode::{decode, decode16, encode};
pub use instruction::{Format, Instruction};
