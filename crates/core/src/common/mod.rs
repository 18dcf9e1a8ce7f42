//! Common utilities and types used throughout the emulation core.
//!
//! This module provides the building blocks shared across all components:
//! 1. **Bit fields:** Generic extraction/insertion of N-bit fields, used by
//!    the codec, CSR file, MMU, and softfloat type alike.
//! 2. **Error handling:** The architectural [`Exception`] taxonomy and the
//!    dispatcher-level [`Fatal`] error.

/// Bit-field extraction and insertion primitives.
pub mod bits;

/// Exception and fatal-error definitions.
pub mod error;

pub use bits::{BitField, sign_extend};
pub use error::{Exception, Fatal};
