//! Configurable RISC-V instruction set emulator.
//!
//! This crate implements a multi-width RISC-V emulation core with the following:
//! 1. **Codec:** Instruction decoding and encoding across the architectural formats.
//! 2. **Hart:** Register files, CSR bank, four privilege tiers, and the step loop.
//! 3. **Translation:** Direct, bounds-checked, and paged virtual memory modes.
//! 4. **Floating point:** A software IEEE-754 unit parameterized over format width.
//! 5. **Memory:** A shared physical backend with reservation tracking for atomics.
//!
//! Construct a [`Hart`] from a [`Config`] and a shared [`Memory`], load a
//! program through the memory handle, and drive execution with
//! [`Hart::step`].

/// Bit-field primitives and error taxonomy.
pub mod common;
/// Runtime configuration (register width, extensions, memory size).
pub mod config;
/// Execution context (registers, CSRs, MMU, step loop).
pub mod hart;
/// Instruction set codec (formats, decode, encode).
pub mod isa;
/// Physical memory backend and reservation seals.
pub mod memory;
/// Software IEEE-754 floating point.
pub mod softfloat;

/// Architectural exception taxonomy; raised and caught within one step.
pub use crate::common::{Exception, Fatal};
/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::{Config, Extensions, Xlen};
/// Main execution context; construct with `Hart::new`.
pub use crate::hart::{Csrs, Hart, Privilege, StepResult};
/// Physical memory backend; wrap with `Memory::shared` for hart use.
pub use crate::memory::{Memory, SharedMemory};
