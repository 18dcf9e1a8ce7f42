//! The step loop and trap entry.
//!
//! A step is fetch, decode, execute, retire. Any exception raised along
//! the way is caught here exactly once and converted into a trap entry:
//! pick the handling tier from the delegation registers, save the
//! exception program counter, cause, and faulting address into that
//! tier's CSRs, push the privilege stack, and vector to the tier's
//! handler with a per-origin offset.
//!
//! A cause whose delegation bit falls outside the register width cannot
//! be routed; the step stops with a [`Fatal`] and CSR state untouched.

use crate::common::{BitField, Exception, Fatal};
use crate::config::Extensions;
use crate::isa;

use super::csr::Privilege;
use super::{Hart, PcUpdate};

/// Outcome of one dispatcher step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// The instruction retired normally.
    Retired,
    /// An exception or interrupt entered a trap handler.
    Trapped {
        /// Cause value as stored in the target tier's cause CSR, with the
        /// top bit set for interrupts.
        cause: u64,
        /// Privilege tier now executing the handler.
        target: Privilege,
    },
}

impl Hart {
    /// Executes one instruction, entering a trap on any exception.
    ///
    /// The cycle counter advances on every step; the retired-instruction
    /// counter only when the instruction completes.
    ///
    /// # Errors
    ///
    /// [`Fatal`] when a raised exception cannot be routed to a handler.
    pub fn step(&mut self) -> Result<StepResult, Fatal> {
        self.csrs.cycle = self.csrs.cycle.wrapping_add(1);

        let pc = self.pc;
        let next_pc = pc.wrapping_add(4);
        let outcome = self
            .fetch(pc)
            .and_then(isa::decode)
            .and_then(|inst| self.execute(&inst, next_pc));

        match outcome {
            Ok(update) => {
                self.csrs.instret = self.csrs.instret.wrapping_add(1);
                if update == PcUpdate::Advance {
                    self.pc = self.config.xlen.canonical(next_pc);
                }
                Ok(StepResult::Retired)
            }
            Err(exception) => self.enter_trap(exception),
        }
    }

    /// Delivers an asynchronous interrupt through the trap entry path.
    ///
    /// # Errors
    ///
    /// [`Fatal`] when the cause cannot be routed to a handler.
    pub fn interrupt(&mut self, code: u64) -> Result<StepResult, Fatal> {
        self.enter_trap(Exception::Interrupt(code))
    }

    fn enter_trap(&mut self, exception: Exception) -> Result<StepResult, Fatal> {
        let origin = self.csrs.privilege();
        let width = self.config.xlen.bits();
        let code = exception.code();

        let cause = if exception.is_interrupt() {
            (1 << (width - 1)) | code
        } else {
            code
        };

        // Delegation bit position: exceptions index directly, interrupts
        // index by cause and originating privilege past the exception block.
        let position = if exception.is_interrupt() {
            code.wrapping_mul(4).wrapping_add(origin as u64 + 16)
        } else {
            code
        };
        if position >= u64::from(width) {
            return Err(Fatal::UnhandledCause { cause });
        }
        let delegated = |deleg: u64| deleg.bits(position as u32, 1) != 0;

        let mut target = Privilege::Machine;
        if delegated(self.csrs.mtdeleg) {
            if self.config.extensions.has(Extensions::H) {
                if origin <= Privilege::Hypervisor {
                    target = if delegated(self.csrs.htdeleg) {
                        Privilege::Supervisor
                    } else {
                        Privilege::Hypervisor
                    };
                }
            } else if origin <= Privilege::Supervisor
                && self.config.extensions.has(Extensions::S)
            {
                target = Privilege::Supervisor;
            }
        }

        let alignment = if self.config.extensions.has(Extensions::C) {
            1
        } else {
            2
        };
        let epc = self.pc & !u64::trailing_mask(alignment);
        let bad_addr = exception.bad_addr().unwrap_or(0);
        let offset = 0x40 * origin as u64;

        let vector = match target {
            Privilege::Supervisor => {
                self.csrs.sepc = epc;
                self.csrs.scause = cause;
                self.csrs.sbadaddr = bad_addr;
                self.csrs.stvec
            }
            Privilege::Hypervisor => {
                self.csrs.hepc = epc;
                self.csrs.hcause = cause;
                self.csrs.hbadaddr = bad_addr;
                self.csrs.htvec
            }
            _ => {
                self.csrs.mepc = epc;
                self.csrs.mcause = cause;
                self.csrs.mbadaddr = bad_addr;
                self.csrs.mtvec
            }
        };

        self.csrs.push_privilege(target);
        self.pc = self.config.xlen.canonical(vector.wrapping_add(offset));

        tracing::debug!(
            cause,
            epc,
            from = ?origin,
            to = ?target,
            "trap entry"
        );
        Ok(StepResult::Trapped { cause, target })
    }
}
