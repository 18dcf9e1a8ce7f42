//! Architectural exception and fatal-error definitions.
//!
//! This module defines the error values that flow through the emulation
//! core. It provides:
//! 1. **Exceptions:** Synchronous faults and interrupt requests, each mapped
//!    to its architectural cause code.
//! 2. **Fatal errors:** Conditions the trap machinery cannot express, which
//!    terminate a dispatcher step and surface to the embedding driver.
//!
//! Every fallible fetch/decode/execute operation returns
//! `Result<T, Exception>`; the dispatcher catches the exception exactly once
//! per step and converts it into a trap entry. Exceptions never cross a step
//! boundary.

use thiserror::Error;

/// A synchronous exception or interrupt request raised during execution.
///
/// Memory-related variants carry the faulting virtual address, which the
/// trap entry sequence stores into the target level's bad-address CSR.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Exception {
    /// Instruction fetch from an address not aligned to the fetch width.
    #[error("instruction address misaligned ({0:#x})")]
    InstructionAddressMisaligned(u64),

    /// Instruction fetch rejected by translation or outside physical memory.
    #[error("instruction access fault ({0:#x})")]
    InstructionAccessFault(u64),

    /// Unknown opcode, malformed encoding, or insufficient privilege.
    #[error("illegal instruction")]
    IllegalInstruction,

    /// `EBREAK` was executed.
    #[error("breakpoint")]
    Breakpoint,

    /// Load from an address not aligned to the access width.
    #[error("load address misaligned ({0:#x})")]
    LoadAddressMisaligned(u64),

    /// Load rejected by translation or outside physical memory.
    #[error("load access fault ({0:#x})")]
    LoadAccessFault(u64),

    /// Store to an address not aligned to the access width.
    #[error("store address misaligned ({0:#x})")]
    StoreAddressMisaligned(u64),

    /// Store rejected by translation or outside physical memory.
    #[error("store access fault ({0:#x})")]
    StoreAccessFault(u64),

    /// `ECALL` from user mode.
    #[error("environment call from U-mode")]
    EnvironmentCallFromU,

    /// `ECALL` from supervisor mode.
    #[error("environment call from S-mode")]
    EnvironmentCallFromS,

    /// `ECALL` from hypervisor mode.
    #[error("environment call from H-mode")]
    EnvironmentCallFromH,

    /// `ECALL` from machine mode.
    #[error("environment call from M-mode")]
    EnvironmentCallFromM,

    /// An asynchronous interrupt request with the given cause number.
    ///
    /// The cause value stored into the CSR bank sets the register's top bit
    /// to distinguish interrupts from exceptions.
    #[error("interrupt {0}")]
    Interrupt(u64),
}

impl Exception {
    /// Architectural cause code, without the interrupt bit.
    pub fn code(self) -> u64 {
        match self {
            Self::InstructionAddressMisaligned(_) => 0,
            Self::InstructionAccessFault(_) => 1,
            Self::IllegalInstruction => 2,
            Self::Breakpoint => 3,
            Self::LoadAddressMisaligned(_) => 4,
            Self::LoadAccessFault(_) => 5,
            Self::StoreAddressMisaligned(_) => 6,
            Self::StoreAccessFault(_) => 7,
            Self::EnvironmentCallFromU => 8,
            Self::EnvironmentCallFromS => 9,
            Self::EnvironmentCallFromH => 10,
            Self::EnvironmentCallFromM => 11,
            Self::Interrupt(code) => code,
        }
    }

    /// Whether this is an asynchronous interrupt rather than an exception.
    pub fn is_interrupt(self) -> bool {
        matches!(self, Self::Interrupt(_))
    }

    /// The faulting address, for the variants that carry one.
    pub fn bad_addr(self) -> Option<u64> {
        match self {
            Self::InstructionAddressMisaligned(addr)
            | Self::InstructionAccessFault(addr)
            | Self::LoadAddressMisaligned(addr)
            | Self::LoadAccessFault(addr)
            | Self::StoreAddressMisaligned(addr)
            | Self::StoreAccessFault(addr) => Some(addr),
            _ => None,
        }
    }
}

/// A condition the trap machinery cannot route.
///
/// Unlike [`Exception`], a `Fatal` is not converted into a trap entry: the
/// dispatcher stops the current step, leaves all CSR state untouched, and
/// hands the error to the embedding driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Fatal {
    /// A trap cause with no entry in the delegation map.
    ///
    /// Raised when an interrupt cause number places its delegation bit
    /// outside the configured register width.
    #[error("unhandled trap cause {cause:#x}")]
    UnhandledCause {
        /// The cause value that could not be routed.
        cause: u64,
    },
}
