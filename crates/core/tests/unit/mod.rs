//! # Unit Tests
//!
//! Per-component tests for the emulation core.

/// Codec tests: decode field extraction and encode round trips.
pub mod isa;

/// Softfloat tests: conversions and arithmetic checked against host floats.
pub mod softfloat;

/// Hart tests: execution, atomics, CSR access, translation, and traps.
pub mod hart;
