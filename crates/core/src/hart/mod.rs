//! Processor state and execution.
//!
//! A [`Hart`] is one execution context: program counter, integer and
//! float register files, a CSR bank, and a handle to the shared memory
//! backend. The submodules split the work:
//! 1. **csr:** The control/status register bank and privilege machinery.
//! 2. **mmu:** Virtual-to-physical address translation.
//! 3. **execute / fp:** Per-opcode instruction semantics.
//! 4. **trap:** The step loop and trap-entry sequence.

pub mod csr;
pub mod mmu;

mod execute;
mod fp;
mod trap;

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError};

use crate::common::Exception;
use crate::config::Config;
use crate::memory::{Memory, Seal, SharedMemory};

pub use csr::{Csrs, Privilege};
pub use mmu::Access;
pub use trap::StepResult;

/// How a handler left the program counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PcUpdate {
    /// Apply the default advance to the next sequential instruction.
    Advance,
    /// The handler transferred control itself; do not advance.
    Transferred,
}

/// One emulated execution context.
#[derive(Debug)]
pub struct Hart {
    config: Config,
    pc: u64,
    /// Integer registers; slot 0 is never written.
    regs: [u64; 32],
    /// Float registers as raw bit patterns; narrow formats occupy the
    /// low bits of a slot.
    fregs: [u64; 32],
    csrs: Csrs,
    memory: SharedMemory,
    /// Reservations this hart currently holds in the shared seal set.
    reservations: BTreeSet<Seal>,
}

impl Hart {
    /// Constructs a hart in its post-reset state, attached to `memory`.
    pub fn new(config: Config, memory: SharedMemory) -> Self {
        let mut hart = Self {
            config,
            pc: 0,
            regs: [0; 32],
            fregs: [0; 32],
            csrs: Csrs::new(config),
            memory,
            reservations: BTreeSet::new(),
        };
        hart.reset();
        hart
    }

    /// Reinitializes registers and CSRs to architectural defaults.
    ///
    /// Execution resumes at the machine trap vector plus `0x100`.
    pub fn reset(&mut self) {
        self.regs = [0; 32];
        self.fregs = [0; 32];
        self.csrs.reset();
        self.reservations.clear();
        self.pc = self.csrs.mtvec + 0x100;
    }

    /// Current program counter.
    pub fn pc(&self) -> u64 {
        self.pc
    }

    /// Overrides the program counter (entry-point setup).
    pub fn set_pc(&mut self, pc: u64) {
        self.pc = self.config.xlen.canonical(pc);
    }

    /// Reads integer register `index`; register 0 is always zero.
    pub fn x(&self, index: u8) -> u64 {
        if index == 0 {
            0
        } else {
            self.regs[usize::from(index)]
        }
    }

    /// Writes integer register `index` (entry-point argument setup);
    /// writes to register 0 are ignored.
    pub fn set_x(&mut self, index: u8, value: u64) {
        self.write_x(index, value);
    }

    /// Reads the raw bit pattern of float register `index`.
    pub fn f(&self, index: u8) -> u64 {
        self.fregs[usize::from(index)]
    }

    /// Writes the raw bit pattern of float register `index`.
    pub fn set_f(&mut self, index: u8, raw: u64) {
        self.fregs[usize::from(index)] = raw;
    }

    /// The CSR bank, for inspection.
    pub fn csrs(&self) -> &Csrs {
        &self.csrs
    }

    /// The CSR bank, for test setup and external state injection.
    pub fn csrs_mut(&mut self) -> &mut Csrs {
        &mut self.csrs
    }

    /// A handle to the shared memory backend.
    pub fn memory(&self) -> SharedMemory {
        Arc::clone(&self.memory)
    }

    /// The configuration this hart was constructed with.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Signed view; the canonical stored form is already sign-extended.
    pub(crate) fn read_x_i(&self, index: u8) -> i64 {
        self.x(index) as i64
    }

    /// Zero-extended view at the configured width.
    pub(crate) fn read_x_u(&self, index: u8) -> u64 {
        self.config.xlen.unsigned(self.x(index))
    }

    pub(crate) fn write_x(&mut self, index: u8, value: u64) {
        if index != 0 {
            self.regs[usize::from(index)] = self.config.xlen.canonical(value);
        }
    }

    pub(crate) fn write_x_i(&mut self, index: u8, value: i64) {
        self.write_x(index, value as u64);
    }

    /// Loads `width` bytes through translation. Unaligned addresses are
    /// permitted; the physical range must fall inside the backend.
    pub(crate) fn load_virtual(&self, address: u64, width: u32) -> Result<u64, Exception> {
        let memory = Arc::clone(&self.memory);
        let mut memory = memory.lock().unwrap_or_else(PoisonError::into_inner);
        let physical = mmu::translate(&self.csrs, &mut memory, Access::Load, address)?;
        memory
            .load(physical, width)
            .ok_or_else(|| Access::Load.fault(address))
    }

    /// Stores `width` bytes through translation, invalidating overlapped
    /// reservations.
    pub(crate) fn store_virtual(
        &self,
        address: u64,
        width: u32,
        value: u64,
    ) -> Result<(), Exception> {
        let memory = Arc::clone(&self.memory);
        let mut memory = memory.lock().unwrap_or_else(PoisonError::into_inner);
        let physical = mmu::translate(&self.csrs, &mut memory, Access::Store, address)?;
        memory
            .store(physical, width, value)
            .ok_or_else(|| Access::Store.fault(address))
    }

    /// Fetches one aligned 32-bit instruction word.
    pub(crate) fn fetch(&self, address: u64) -> Result<u32, Exception> {
        if address % 4 != 0 {
            return Err(Access::Fetch.misaligned(address));
        }
        let memory = Arc::clone(&self.memory);
        let mut memory = memory.lock().unwrap_or_else(PoisonError::into_inner);
        let physical = mmu::translate(&self.csrs, &mut memory, Access::Fetch, address)?;
        let word = memory
            .load(physical, 4)
            .ok_or_else(|| Access::Fetch.fault(address))?;
        Ok(word as u32)
    }

    /// Access to the shared backend plus this hart's reservation set,
    /// under one lock acquisition for read-modify-write sequences.
    pub(crate) fn with_memory<T>(
        &mut self,
        operate: impl FnOnce(&mut Self, &mut Memory) -> T,
    ) -> T {
        let memory = Arc::clone(&self.memory);
        let mut memory = memory.lock().unwrap_or_else(PoisonError::into_inner);
        operate(self, &mut memory)
    }
}
