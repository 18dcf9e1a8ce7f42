//! Configuration system for the emulation core.
//!
//! This module defines the runtime parameters that the original design
//! resolved at compile time: register width, the ISA extension set, and the
//! size of the emulated physical memory. It provides:
//! 1. **Defaults:** Baseline constants for a general-purpose RV64 machine.
//! 2. **Structures:** The [`Config`] handed to every hart at construction.
//! 3. **Enums:** The register-width selector and the extension bitmask.
//!
//! Configuration is supplied programmatically or deserialized from JSON via
//! [`Config::from_json`]; use `Config::default()` for the standard machine.

use serde::Deserialize;

use crate::common::BitField;

/// Default configuration constants.
mod defaults {
    /// Default emulated memory size as a power of two (1 MiB).
    pub const MEMORY_SIZE_LOG2: u32 = 20;
}

/// Integer register width of the emulated hart.
///
/// The width gates the availability of 64-bit-only opcodes and selects
/// whether the performance counters are split into low/high CSR halves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum Xlen {
    /// 32-bit registers; `*W` opcodes and the `D`-to-`X` float moves fault.
    #[serde(rename = "rv32")]
    Rv32,
    /// 64-bit registers.
    #[default]
    #[serde(rename = "rv64")]
    Rv64,
}

impl Xlen {
    /// Register width in bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::Rv32 => 32,
            Self::Rv64 => 64,
        }
    }

    /// Truncates `value` to the register width and sign-extends back to
    /// 64 bits, producing the canonical stored form.
    pub fn canonical(self, value: u64) -> u64 {
        match self {
            Self::Rv32 => value as u32 as i32 as i64 as u64,
            Self::Rv64 => value,
        }
    }

    /// Truncates `value` to the register width with zero extension.
    pub fn unsigned(self, value: u64) -> u64 {
        match self {
            Self::Rv32 => value as u32 as u64,
            Self::Rv64 => value,
        }
    }
}

/// ISA extension bitmask, one bit per extension letter.
///
/// Bit `n` corresponds to letter `'A' + n`, matching the encoding seeded
/// into the ISA identification CSR at reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Extensions(pub u32);

impl Extensions {
    /// Atomic memory operations.
    pub const A: Self = Self(1 << 0);
    /// Compressed instructions (format tags only; layouts are provisional).
    pub const C: Self = Self(1 << 2);
    /// Double-precision floating point.
    pub const D: Self = Self(1 << 3);
    /// Single-precision floating point.
    pub const F: Self = Self(1 << 5);
    /// Hypervisor privilege level.
    pub const H: Self = Self(1 << 7);
    /// Base integer ISA.
    pub const I: Self = Self(1 << 8);
    /// Integer multiply and divide.
    pub const M: Self = Self(1 << 12);
    /// Supervisor privilege level.
    pub const S: Self = Self(1 << 18);
    /// User privilege level.
    pub const U: Self = Self(1 << 20);

    /// Whether every extension in `other` is enabled.
    pub fn has(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two extension sets.
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Runtime configuration for one emulated hart.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Integer register width.
    pub xlen: Xlen,
    /// Enabled ISA extensions.
    pub extensions: Extensions,
    /// Emulated physical memory size, as log2 of the byte count.
    pub memory_size_log2: u32,
    /// Hart index, seeded into the hart-ID CSR at reset.
    pub hart_id: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            xlen: Xlen::Rv64,
            extensions: Extensions::I
                .with(Extensions::M)
                .with(Extensions::A)
                .with(Extensions::F)
                .with(Extensions::D)
                .with(Extensions::S)
                .with(Extensions::U),
            memory_size_log2: defaults::MEMORY_SIZE_LOG2,
            hart_id: 0,
        }
    }
}

impl Config {
    /// Parses a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the underlying decode error when the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of reachable privilege levels (1, 2, 3, or 4).
    ///
    /// Machine level always exists; U, S, and H add tiers cumulatively.
    pub fn levels(&self) -> u8 {
        if self.extensions.has(Extensions::H) {
            4
        } else if self.extensions.has(Extensions::S) {
            3
        } else if self.extensions.has(Extensions::U) {
            2
        } else {
            1
        }
    }

    /// The ISA identification value seeded into the CSR bank at reset.
    ///
    /// The top two bits encode the register width, bits [26..] the width
    /// value itself, and the low 26 bits the extension mask.
    pub fn isa_id(&self) -> u64 {
        let width = self.xlen.bits();
        let mut id: u64 = match self.xlen {
            Xlen::Rv32 => 1,
            Xlen::Rv64 => 2,
        };
        id <<= width - 2;
        id.set_bits(u64::from(width), 26, width - 28);
        id.set_bits(u64::from(self.extensions.0), 0, 26);
        self.xlen.unsigned(id)
    }
}
