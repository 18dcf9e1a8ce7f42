//! Integer, atomic, and system instruction semantics.
//!
//! One handler per opcode group. Handlers gate availability on the
//! configured register width and extension set, compute through the
//! canonical sign-extended register form, and report whether they
//! transferred control so the dispatcher knows not to apply the default
//! advance.
//!
//! Divide semantics follow the architectural convention rather than the
//! host's: division by zero yields an all-ones quotient and passes the
//! dividend through as remainder; signed overflow (most-negative value
//! divided by minus one) yields the dividend and a zero remainder.

use std::collections::BTreeSet;

use crate::common::{BitField, Exception, sign_extend};
use crate::config::{Extensions, Xlen};
use crate::isa::Instruction;

use super::csr::Privilege;
use super::mmu::{self, Access};
use super::{Hart, PcUpdate};

/// System-function encodings in the I-immediate of the SYSTEM opcode.
mod system {
    pub const ECALL: u32 = 0x000;
    pub const EBREAK: u32 = 0x001;
    pub const ERET: u32 = 0x100;
    pub const SFENCE_VM: u32 = 0x101;
    pub const WFI: u32 = 0x102;
    pub const HRTS: u32 = 0x205;
    pub const MRTS: u32 = 0x305;
    pub const MRTH: u32 = 0x306;
}

impl Hart {
    pub(super) fn require(&self, extensions: Extensions) -> Result<(), Exception> {
        if self.config.extensions.has(extensions) {
            Ok(())
        } else {
            Err(Exception::IllegalInstruction)
        }
    }

    pub(super) fn require_rv64(&self) -> Result<(), Exception> {
        if self.config.xlen == Xlen::Rv64 {
            Ok(())
        } else {
            Err(Exception::IllegalInstruction)
        }
    }

    /// Dispatches one decoded instruction.
    pub(crate) fn execute(
        &mut self,
        inst: &Instruction,
        next_pc: u64,
    ) -> Result<PcUpdate, Exception> {
        match inst.opcode {
            0x03 => self.exec_load(inst)?,
            0x07 => self.exec_fp_load(inst)?,
            0x0F => {} // FENCE group; no pipeline or cache to synchronize
            0x13 => self.exec_op_imm(inst)?,
            0x17 => {
                let offset = inst.imm as i64 as u64;
                self.write_x(inst.rd, self.pc.wrapping_add(offset));
            }
            0x1B => self.exec_op_imm_32(inst)?,
            0x23 => self.exec_store(inst)?,
            0x27 => self.exec_fp_store(inst)?,
            0x2F => self.exec_atomic(inst)?,
            0x33 => self.exec_op(inst)?,
            0x37 => self.write_x(inst.rd, inst.imm as i64 as u64),
            0x3B => self.exec_op_32(inst)?,
            0x43 | 0x47 | 0x4B | 0x4F => self.exec_fp_fma(inst)?,
            0x53 => self.exec_fp_op(inst)?,
            0x63 => return self.exec_branch(inst, next_pc),
            0x67 => {
                let target = self.x(inst.rs1).wrapping_add(inst.imm as i64 as u64) & !1;
                self.write_x(inst.rd, next_pc);
                self.pc = self.config.xlen.canonical(target);
                return Ok(PcUpdate::Transferred);
            }
            0x6F => {
                self.write_x(inst.rd, next_pc);
                self.pc = self
                    .config
                    .xlen
                    .canonical(self.pc.wrapping_add(inst.imm as i64 as u64));
                return Ok(PcUpdate::Transferred);
            }
            0x73 => return self.exec_system(inst, next_pc),
            _ => return Err(Exception::IllegalInstruction),
        }
        Ok(PcUpdate::Advance)
    }

    fn exec_load(&mut self, inst: &Instruction) -> Result<(), Exception> {
        let address = self.x(inst.rs1).wrapping_add(inst.imm as i64 as u64);
        match inst.funct3 {
            0 => {
                let data = self.load_virtual(address, 1)?;
                self.write_x_i(inst.rd, sign_extend(data, 8));
            }
            1 => {
                let data = self.load_virtual(address, 2)?;
                self.write_x_i(inst.rd, sign_extend(data, 16));
            }
            2 => {
                let data = self.load_virtual(address, 4)?;
                self.write_x_i(inst.rd, sign_extend(data, 32));
            }
            3 => {
                self.require_rv64()?;
                let data = self.load_virtual(address, 8)?;
                self.write_x(inst.rd, data);
            }
            4 => {
                let data = self.load_virtual(address, 1)?;
                self.write_x(inst.rd, data);
            }
            5 => {
                let data = self.load_virtual(address, 2)?;
                self.write_x(inst.rd, data);
            }
            6 => {
                self.require_rv64()?;
                let data = self.load_virtual(address, 4)?;
                self.write_x(inst.rd, data);
            }
            _ => return Err(Exception::IllegalInstruction),
        }
        Ok(())
    }

    fn exec_store(&mut self, inst: &Instruction) -> Result<(), Exception> {
        let address = self.x(inst.rs1).wrapping_add(inst.imm as i64 as u64);
        let value = self.x(inst.rs2);
        match inst.funct3 {
            0 => self.store_virtual(address, 1, value),
            1 => self.store_virtual(address, 2, value),
            2 => self.store_virtual(address, 4, value),
            3 => {
                self.require_rv64()?;
                self.store_virtual(address, 8, value)
            }
            _ => Err(Exception::IllegalInstruction),
        }
    }

    fn shift_amount(&self, imm: i32) -> Result<u32, Exception> {
        let imm = imm as u32;
        if self.config.xlen == Xlen::Rv32 {
            if imm.bits(5, 1) != 0 {
                return Err(Exception::IllegalInstruction);
            }
            Ok(imm & 0x1F)
        } else {
            Ok(imm & 0x3F)
        }
    }

    fn exec_op_imm(&mut self, inst: &Instruction) -> Result<(), Exception> {
        let imm = inst.imm as i64;
        let rs1 = self.x(inst.rs1);
        match inst.funct3 {
            0 => self.write_x(inst.rd, rs1.wrapping_add(imm as u64)),
            1 => {
                let shift = self.shift_amount(inst.imm)?;
                self.write_x(inst.rd, rs1 << shift);
            }
            2 => self.write_x(inst.rd, u64::from(self.read_x_i(inst.rs1) < imm)),
            3 => {
                let bound = self.config.xlen.unsigned(imm as u64);
                self.write_x(inst.rd, u64::from(self.read_x_u(inst.rs1) < bound));
            }
            4 => self.write_x(inst.rd, rs1 ^ imm as u64),
            5 => {
                let shift = self.shift_amount(inst.imm)?;
                if (inst.imm as u32).bits(10, 1) != 0 {
                    self.write_x_i(inst.rd, self.read_x_i(inst.rs1) >> shift);
                } else {
                    self.write_x(inst.rd, self.read_x_u(inst.rs1) >> shift);
                }
            }
            6 => self.write_x(inst.rd, rs1 | imm as u64),
            7 => self.write_x(inst.rd, rs1 & imm as u64),
            _ => return Err(Exception::IllegalInstruction),
        }
        Ok(())
    }

    fn exec_op_imm_32(&mut self, inst: &Instruction) -> Result<(), Exception> {
        self.require_rv64()?;
        let rs1 = self.x(inst.rs1) as u32;
        match inst.funct3 {
            0 => {
                let sum = rs1.wrapping_add(inst.imm as u32);
                self.write_x_i(inst.rd, i64::from(sum as i32));
            }
            1 | 5 => {
                if (inst.imm as u32).bits(5, 1) != 0 {
                    return Err(Exception::IllegalInstruction);
                }
                let shift = (inst.imm as u32) & 0x1F;
                let result = if inst.funct3 == 1 {
                    (rs1 << shift) as i32
                } else if (inst.imm as u32).bits(10, 1) != 0 {
                    (rs1 as i32) >> shift
                } else {
                    (rs1 >> shift) as i32
                };
                self.write_x_i(inst.rd, i64::from(result));
            }
            _ => return Err(Exception::IllegalInstruction),
        }
        Ok(())
    }

    fn exec_op(&mut self, inst: &Instruction) -> Result<(), Exception> {
        let rd = inst.rd;
        if inst.funct7 == 1 {
            self.require(Extensions::M)?;
            let high_shift = self.config.xlen.bits();
            match inst.funct3 {
                0 => self.write_x(rd, self.x(inst.rs1).wrapping_mul(self.x(inst.rs2))),
                1 => {
                    let product = i128::from(self.read_x_i(inst.rs1))
                        * i128::from(self.read_x_i(inst.rs2));
                    self.write_x_i(rd, (product >> high_shift) as i64);
                }
                2 => {
                    let product = i128::from(self.read_x_i(inst.rs1))
                        * i128::from(self.read_x_u(inst.rs2));
                    self.write_x_i(rd, (product >> high_shift) as i64);
                }
                3 => {
                    let product = u128::from(self.read_x_u(inst.rs1))
                        * u128::from(self.read_x_u(inst.rs2));
                    self.write_x(rd, (product >> high_shift) as u64);
                }
                4 => {
                    let quotient = divide(self.read_x_i(inst.rs1), self.read_x_i(inst.rs2));
                    self.write_x_i(rd, quotient);
                }
                5 => {
                    let quotient = divide_unsigned(self.read_x_u(inst.rs1), self.read_x_u(inst.rs2));
                    self.write_x(rd, quotient);
                }
                6 => {
                    let remainder = remainder(self.read_x_i(inst.rs1), self.read_x_i(inst.rs2));
                    self.write_x_i(rd, remainder);
                }
                7 => {
                    let remainder =
                        remainder_unsigned(self.read_x_u(inst.rs1), self.read_x_u(inst.rs2));
                    self.write_x(rd, remainder);
                }
                _ => return Err(Exception::IllegalInstruction),
            }
            return Ok(());
        }

        let rs1 = self.x(inst.rs1);
        let rs2 = self.x(inst.rs2);
        let shift_mask = if self.config.xlen == Xlen::Rv32 { 0x1F } else { 0x3F };
        match (inst.funct3, inst.funct7) {
            (0, 0x00) => self.write_x(rd, rs1.wrapping_add(rs2)),
            (0, 0x20) => self.write_x(rd, rs1.wrapping_sub(rs2)),
            (1, 0x00) => self.write_x(rd, rs1 << (rs2 & shift_mask)),
            (2, 0x00) => self.write_x(
                rd,
                u64::from(self.read_x_i(inst.rs1) < self.read_x_i(inst.rs2)),
            ),
            (3, 0x00) => self.write_x(
                rd,
                u64::from(self.read_x_u(inst.rs1) < self.read_x_u(inst.rs2)),
            ),
            (4, 0x00) => self.write_x(rd, rs1 ^ rs2),
            (5, 0x00) => self.write_x(rd, self.read_x_u(inst.rs1) >> (rs2 & shift_mask)),
            (5, 0x20) => self.write_x_i(rd, self.read_x_i(inst.rs1) >> (rs2 & shift_mask)),
            (6, 0x00) => self.write_x(rd, rs1 | rs2),
            (7, 0x00) => self.write_x(rd, rs1 & rs2),
            _ => return Err(Exception::IllegalInstruction),
        }
        Ok(())
    }

    fn exec_op_32(&mut self, inst: &Instruction) -> Result<(), Exception> {
        self.require_rv64()?;
        let rd = inst.rd;
        let a = self.x(inst.rs1) as u32;
        let b = self.x(inst.rs2) as u32;
        if inst.funct7 == 1 {
            self.require(Extensions::M)?;
            let result = match inst.funct3 {
                0 => a.wrapping_mul(b) as i32,
                4 => divide(i64::from(a as i32), i64::from(b as i32)) as i32,
                5 => divide_unsigned(u64::from(a), u64::from(b)) as i32,
                6 => remainder(i64::from(a as i32), i64::from(b as i32)) as i32,
                7 => remainder_unsigned(u64::from(a), u64::from(b)) as i32,
                _ => return Err(Exception::IllegalInstruction),
            };
            self.write_x_i(rd, i64::from(result));
            return Ok(());
        }

        let result = match (inst.funct3, inst.funct7) {
            (0, 0x00) => a.wrapping_add(b) as i32,
            (0, 0x20) => a.wrapping_sub(b) as i32,
            (1, 0x00) => (a << (b & 0x1F)) as i32,
            (5, 0x00) => (a >> (b & 0x1F)) as i32,
            (5, 0x20) => (a as i32) >> (b & 0x1F),
            _ => return Err(Exception::IllegalInstruction),
        };
        self.write_x_i(rd, i64::from(result));
        Ok(())
    }

    fn exec_branch(
        &mut self,
        inst: &Instruction,
        next_pc: u64,
    ) -> Result<PcUpdate, Exception> {
        let taken = match inst.funct3 {
            0 => self.x(inst.rs1) == self.x(inst.rs2),
            1 => self.x(inst.rs1) != self.x(inst.rs2),
            4 => self.read_x_i(inst.rs1) < self.read_x_i(inst.rs2),
            5 => self.read_x_i(inst.rs1) >= self.read_x_i(inst.rs2),
            6 => self.read_x_u(inst.rs1) < self.read_x_u(inst.rs2),
            7 => self.read_x_u(inst.rs1) >= self.read_x_u(inst.rs2),
            _ => return Err(Exception::IllegalInstruction),
        };
        let target = if taken {
            self.pc.wrapping_add(inst.imm as i64 as u64)
        } else {
            next_pc
        };
        self.pc = self.config.xlen.canonical(target);
        Ok(PcUpdate::Transferred)
    }

    fn exec_atomic(&mut self, inst: &Instruction) -> Result<(), Exception> {
        self.require(Extensions::A)?;
        let width: u32 = match inst.funct3 {
            2 => 4,
            3 => {
                self.require_rv64()?;
                8
            }
            _ => return Err(Exception::IllegalInstruction),
        };
        let function = inst.funct7 & !3;
        let address = self.read_x_u(inst.rs1);

        // One lock acquisition spans the whole read-modify-write.
        self.with_memory(|hart, memory| {
            let physical = mmu::translate(&hart.csrs, memory, Access::Store, address)?;
            if physical % u64::from(width) != 0 {
                return Err(Access::Store.misaligned(address));
            }
            let seal = (physical, width as u8);

            if function == 12 {
                // Store-conditional: succeeds only while the seal survives.
                if memory.unseal(seal) {
                    memory
                        .store(physical, width, hart.x(inst.rs2))
                        .ok_or_else(|| Access::Store.fault(address))?;
                    hart.write_x(inst.rd, 0);
                } else {
                    hart.write_x(inst.rd, 1);
                }
                return Ok(());
            }

            let raw = memory
                .load(physical, width)
                .ok_or_else(|| Access::Load.fault(address))?;
            let old = if width == 4 { sign_extend(raw, 32) as u64 } else { raw };

            if function == 8 {
                // Load-reserved: seal and return the value.
                memory.seal(&mut hart.reservations, BTreeSet::from([seal]));
                hart.write_x(inst.rd, old);
                return Ok(());
            }

            let rs2 = hart.x(inst.rs2);
            let new = amo_op(function, width, old, rs2)?;
            memory
                .store(physical, width, new)
                .ok_or_else(|| Access::Store.fault(address))?;
            hart.write_x(inst.rd, old);
            Ok(())
        })
    }

    fn exec_system(
        &mut self,
        inst: &Instruction,
        next_pc: u64,
    ) -> Result<PcUpdate, Exception> {
        if inst.funct3 == 0 {
            return self.exec_system_function(inst, next_pc);
        }

        let key = (inst.imm as u32 & 0xFFF) as u16;
        let source = if inst.funct3 >= 5 {
            u64::from(inst.rs1)
        } else {
            self.x(inst.rs1)
        };
        let old = self.csrs.read(key)?;
        match inst.funct3 & 3 {
            1 => self.csrs.write(key, source)?,
            2 => {
                let engaged = if inst.funct3 >= 5 { source != 0 } else { inst.rs1 != 0 };
                if engaged {
                    self.csrs.write(key, old | source)?;
                }
            }
            3 => {
                let engaged = if inst.funct3 >= 5 { source != 0 } else { inst.rs1 != 0 };
                if engaged {
                    self.csrs.write(key, old & !source)?;
                }
            }
            _ => return Err(Exception::IllegalInstruction),
        }
        self.write_x(inst.rd, old);
        Ok(PcUpdate::Advance)
    }

    fn exec_system_function(
        &mut self,
        inst: &Instruction,
        next_pc: u64,
    ) -> Result<PcUpdate, Exception> {
        let privilege = self.csrs.privilege();
        match inst.imm as u32 & 0xFFF {
            system::ECALL => {
                // The saved pc points past the call so the handler's
                // return resumes after it.
                self.pc = self.config.xlen.canonical(next_pc);
                Err(match privilege {
                    Privilege::User => Exception::EnvironmentCallFromU,
                    Privilege::Supervisor => Exception::EnvironmentCallFromS,
                    Privilege::Hypervisor => Exception::EnvironmentCallFromH,
                    Privilege::Machine => Exception::EnvironmentCallFromM,
                })
            }
            system::EBREAK => Err(Exception::Breakpoint),
            system::ERET => {
                let epc = match privilege {
                    Privilege::User => return Err(Exception::IllegalInstruction),
                    Privilege::Supervisor => self.csrs.sepc,
                    Privilege::Hypervisor => self.csrs.hepc,
                    Privilege::Machine => self.csrs.mepc,
                };
                self.csrs.pop_privilege();
                self.pc = self.config.xlen.canonical(epc);
                tracing::debug!(epc, from = ?privilege, "trap return");
                Ok(PcUpdate::Transferred)
            }
            system::SFENCE_VM | system::WFI => Ok(PcUpdate::Advance),
            system::HRTS => {
                if privilege != Privilege::Hypervisor {
                    return Err(Exception::IllegalInstruction);
                }
                self.csrs.set_privilege(Privilege::Supervisor);
                self.csrs.sepc = self.csrs.hepc;
                self.csrs.scause = self.csrs.hcause;
                self.csrs.sbadaddr = self.csrs.hbadaddr;
                self.pc = self.config.xlen.canonical(self.csrs.stvec);
                Ok(PcUpdate::Transferred)
            }
            system::MRTS => {
                if privilege != Privilege::Machine {
                    return Err(Exception::IllegalInstruction);
                }
                self.csrs.set_privilege(Privilege::Supervisor);
                self.csrs.sepc = self.csrs.mepc;
                self.csrs.scause = self.csrs.mcause;
                self.csrs.sbadaddr = self.csrs.mbadaddr;
                self.pc = self.config.xlen.canonical(self.csrs.stvec);
                Ok(PcUpdate::Transferred)
            }
            system::MRTH => {
                if privilege != Privilege::Machine {
                    return Err(Exception::IllegalInstruction);
                }
                self.csrs.set_privilege(Privilege::Hypervisor);
                self.csrs.hepc = self.csrs.mepc;
                self.csrs.hcause = self.csrs.mcause;
                self.csrs.hbadaddr = self.csrs.mbadaddr;
                self.pc = self.config.xlen.canonical(self.csrs.htvec);
                Ok(PcUpdate::Transferred)
            }
            _ => Err(Exception::IllegalInstruction),
        }
    }
}

/// Architectural signed division.
fn divide(dividend: i64, divisor: i64) -> i64 {
    if divisor == 0 {
        -1
    } else if dividend == i64::MIN && divisor == -1 {
        dividend
    } else {
        dividend / divisor
    }
}

/// Architectural unsigned division.
fn divide_unsigned(dividend: u64, divisor: u64) -> u64 {
    if divisor == 0 { u64::MAX } else { dividend / divisor }
}

/// Architectural signed remainder.
fn remainder(dividend: i64, divisor: i64) -> i64 {
    if divisor == 0 {
        dividend
    } else if dividend == i64::MIN && divisor == -1 {
        0
    } else {
        dividend % divisor
    }
}

/// Architectural unsigned remainder.
fn remainder_unsigned(dividend: u64, divisor: u64) -> u64 {
    if divisor == 0 { dividend } else { dividend % divisor }
}

/// Applies a fetch-and-op function to the old memory value.
fn amo_op(function: u8, width: u32, old: u64, rs2: u64) -> Result<u64, Exception> {
    let result = if width == 4 {
        let old = old as i32;
        let rs2 = rs2 as i32;
        let value = match function {
            0 => old.wrapping_add(rs2),
            4 => rs2,
            16 => old ^ rs2,
            32 => old | rs2,
            48 => old & rs2,
            64 => old.min(rs2),
            80 => old.max(rs2),
            96 => (old as u32).min(rs2 as u32) as i32,
            112 => (old as u32).max(rs2 as u32) as i32,
            _ => return Err(Exception::IllegalInstruction),
        };
        value as u32 as u64
    } else {
        let old_i = old as i64;
        let rs2_i = rs2 as i64;
        match function {
            0 => old.wrapping_add(rs2),
            4 => rs2,
            16 => old ^ rs2,
            32 => old | rs2,
            48 => old & rs2,
            64 => old_i.min(rs2_i) as u64,
            80 => old_i.max(rs2_i) as u64,
            96 => old.min(rs2),
            112 => old.max(rs2),
            _ => return Err(Exception::IllegalInstruction),
        }
    };
    Ok(result)
}
