//! Shared harness and instruction construction helpers.
//!
//! Programs are assembled through the crate's own encoder, so every test
//! that runs an instruction also exercises the codec round trip.

use rvemu_core::isa::{Instruction, encode};
use rvemu_core::{Config, Hart, Memory, StepResult};

/// A hart wired to a fresh shared memory.
pub struct TestContext {
    /// The hart under test.
    pub hart: Hart,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Default RV64 machine with all standard extensions.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Builds a context with an explicit configuration.
    ///
    /// Trace output is routed to the test writer; set `RUST_LOG` to see
    /// per-step events from a failing test.
    pub fn with_config(config: Config) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let memory = Memory::shared(config.memory_size_log2);
        Self {
            hart: Hart::new(config, memory),
        }
    }

    /// Writes a program at `addr` (a physical address) and points the
    /// program counter at it.
    pub fn load_program(mut self, addr: u64, words: &[u32]) -> Self {
        self.write_program(addr, words);
        self.hart.set_pc(addr);
        self
    }

    /// Writes a program without touching the program counter.
    pub fn write_program(&mut self, addr: u64, words: &[u32]) {
        let memory = self.hart.memory();
        let mut memory = memory.lock().unwrap();
        for (index, word) in words.iter().enumerate() {
            memory
                .store(addr + index as u64 * 4, 4, u64::from(*word))
                .unwrap();
        }
    }

    /// Steps once, asserting the instruction retired without a trap.
    pub fn step_retired(&mut self) {
        assert_eq!(self.hart.step().unwrap(), StepResult::Retired);
    }

    /// Steps `count` instructions, asserting each retires.
    pub fn run(&mut self, count: usize) {
        for _ in 0..count {
            self.step_retired();
        }
    }

    /// Steps once and returns the trap outcome.
    pub fn step(&mut self) -> StepResult {
        self.hart.step().unwrap()
    }

    /// Stores directly into physical memory.
    pub fn store(&mut self, addr: u64, width: u32, value: u64) {
        let memory = self.hart.memory();
        memory.lock().unwrap().store(addr, width, value).unwrap();
    }

    /// Loads directly from physical memory.
    pub fn load(&self, addr: u64, width: u32) -> u64 {
        let memory = self.hart.memory();
        let value = memory.lock().unwrap().load(addr, width);
        value.unwrap()
    }
}

/// Encodes an R-type instruction.
pub fn r_type(opcode: u8, rd: u8, funct3: u8, rs1: u8, rs2: u8, funct7: u8) -> u32 {
    encode(&Instruction {
        opcode,
        rd,
        funct3,
        rs1,
        rs2,
        funct7,
        ..Instruction::default()
    })
}

/// Encodes an I-type instruction.
pub fn i_type(opcode: u8, rd: u8, funct3: u8, rs1: u8, imm: i32) -> u32 {
    encode(&Instruction {
        opcode,
        rd,
        funct3,
        rs1,
        imm,
        ..Instruction::default()
    })
}

/// Encodes an S-type instruction.
pub fn s_type(opcode: u8, funct3: u8, rs1: u8, rs2: u8, imm: i32) -> u32 {
    encode(&Instruction {
        opcode,
        funct3,
        rs1,
        rs2,
        imm,
        ..Instruction::default()
    })
}

/// Encodes an SB-type (branch) instruction.
pub fn b_type(funct3: u8, rs1: u8, rs2: u8, imm: i32) -> u32 {
    encode(&Instruction {
        opcode: 0x63,
        funct3,
        rs1,
        rs2,
        imm,
        ..Instruction::default()
    })
}

pub fn addi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x13, rd, 0, rs1, imm)
}

pub fn add(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x33, rd, 0, rs1, rs2, 0)
}

pub fn mul(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x33, rd, 0, rs1, rs2, 1)
}

pub fn div(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x33, rd, 4, rs1, rs2, 1)
}

pub fn lui(rd: u8, imm: i32) -> u32 {
    encode(&Instruction {
        opcode: 0x37,
        rd,
        imm,
        ..Instruction::default()
    })
}

pub fn jal(rd: u8, imm: i32) -> u32 {
    encode(&Instruction {
        opcode: 0x6F,
        rd,
        imm,
        ..Instruction::default()
    })
}

pub fn jalr(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x67, rd, 0, rs1, imm)
}

pub fn beq(rs1: u8, rs2: u8, imm: i32) -> u32 {
    b_type(0, rs1, rs2, imm)
}

pub fn bge(rs1: u8, rs2: u8, imm: i32) -> u32 {
    b_type(5, rs1, rs2, imm)
}

pub fn lw(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x03, rd, 2, rs1, imm)
}

pub fn ld(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x03, rd, 3, rs1, imm)
}

pub fn sw(rs1: u8, rs2: u8, imm: i32) -> u32 {
    s_type(0x23, 2, rs1, rs2, imm)
}

pub fn sd(rs1: u8, rs2: u8, imm: i32) -> u32 {
    s_type(0x23, 3, rs1, rs2, imm)
}

/// `CSRRW rd, csr, rs1`.
pub fn csrrw(rd: u8, csr: u16, rs1: u8) -> u32 {
    i_type(0x73, rd, 1, rs1, i32::from(csr))
}

/// `CSRRS rd, csr, rs1`; with `rs1 == x0` this is a plain CSR read.
pub fn csrrs(rd: u8, csr: u16, rs1: u8) -> u32 {
    i_type(0x73, rd, 2, rs1, i32::from(csr))
}

pub fn ecall() -> u32 {
    i_type(0x73, 0, 0, 0, 0)
}

pub fn eret() -> u32 {
    i_type(0x73, 0, 0, 0, 0x100)
}

/// `LR.D rd, (rs1)`.
pub fn lr_d(rd: u8, rs1: u8) -> u32 {
    r_type(0x2F, rd, 3, rs1, 0, 8)
}

/// `SC.D rd, rs2, (rs1)`.
pub fn sc_d(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x2F, rd, 3, rs1, rs2, 12)
}

/// `AMOADD.D rd, rs2, (rs1)`.
pub fn amoadd_d(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x2F, rd, 3, rs1, rs2, 0)
}

/// `FLD frd, imm(rs1)`.
pub fn fld(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x07, rd, 3, rs1, imm)
}

/// `FSD frs2, imm(rs1)`.
pub fn fsd(rs1: u8, rs2: u8, imm: i32) -> u32 {
    s_type(0x27, 3, rs1, rs2, imm)
}

/// `FCVT.D.W frd, rs1` (round to nearest).
pub fn fcvt_d_w(rd: u8, rs1: u8) -> u32 {
    r_type(0x53, rd, 0, rs1, 0, 0x69)
}

/// `FCVT.W.D rd, frs1` (round to nearest).
pub fn fcvt_w_d(rd: u8, rs1: u8) -> u32 {
    r_type(0x53, rd, 0, rs1, 0, 0x61)
}

/// `FADD.D frd, frs1, frs2` (round to nearest).
pub fn fadd_d(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x53, rd, 0, rs1, rs2, 0x01)
}

/// `FCLASS.D rd, frs1`.
pub fn fclass_d(rd: u8, rs1: u8) -> u32 {
    r_type(0x53, rd, 1, rs1, 0, 0x71)
}

/// `FEQ.D rd, frs1, frs2`.
pub fn feq_d(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x53, rd, 2, rs1, rs2, 0x51)
}

/// `FLE.D rd, frs1, frs2`.
pub fn fle_d(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x53, rd, 0, rs1, rs2, 0x51)
}
