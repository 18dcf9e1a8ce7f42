//! Instruction decoding and encoding.
//!
//! Handles the unpacking of 32-bit instruction words into [`Instruction`]
//! values and the exact inverse. Split immediates (S, SB, UJ) are
//! reassembled bit group by bit group; branch and jump offsets keep bit 0
//! clear because control-transfer targets are 2-byte aligned.

use crate::common::{BitField, Exception, sign_extend};
use crate::isa::instruction::{Format, Instruction};

/// Number of bits in an I/S-type immediate.
const IMM12_BITS: u32 = 12;

/// Number of bits in an SB-type immediate (including the forced zero).
const IMM_SB_BITS: u32 = 13;

/// Number of bits in a UJ-type immediate (including the forced zero).
const IMM_UJ_BITS: u32 = 21;

/// Decodes a raw 32-bit instruction word.
///
/// # Errors
///
/// [`Exception::IllegalInstruction`] when the opcode maps to no known
/// format.
pub fn decode(word: u32) -> Result<Instruction, Exception> {
    let opcode = word.bits(0, 7) as u8;
    let format = Format::of(opcode)?;

    let mut inst = Instruction {
        opcode,
        ..Instruction::default()
    };

    match format {
        Format::R => {
            inst.rd = word.bits(7, 5) as u8;
            inst.funct3 = word.bits(12, 3) as u8;
            inst.rs1 = word.bits(15, 5) as u8;
            inst.rs2 = word.bits(20, 5) as u8;
            inst.funct7 = word.bits(25, 7) as u8;
        }
        Format::R4 => {
            inst.rd = word.bits(7, 5) as u8;
            inst.funct3 = word.bits(12, 3) as u8;
            inst.rs1 = word.bits(15, 5) as u8;
            inst.rs2 = word.bits(20, 5) as u8;
            inst.funct7 = word.bits(25, 2) as u8;
            inst.rs3 = word.bits(27, 5) as u8;
        }
        Format::I => {
            inst.rd = word.bits(7, 5) as u8;
            inst.funct3 = word.bits(12, 3) as u8;
            inst.rs1 = word.bits(15, 5) as u8;
            inst.imm = sign_extend(u64::from(word.bits(20, 12)), IMM12_BITS) as i32;
        }
        Format::S => {
            inst.funct3 = word.bits(12, 3) as u8;
            inst.rs1 = word.bits(15, 5) as u8;
            inst.rs2 = word.bits(20, 5) as u8;
            let imm = word.bits(7, 5) | (word.bits(25, 7) << 5);
            inst.imm = sign_extend(u64::from(imm), IMM12_BITS) as i32;
        }
        Format::Sb => {
            inst.funct3 = word.bits(12, 3) as u8;
            inst.rs1 = word.bits(15, 5) as u8;
            inst.rs2 = word.bits(20, 5) as u8;
            let imm = (word.bits(8, 4) << 1)
                | (word.bits(25, 6) << 5)
                | (word.bits(7, 1) << 11)
                | (word.bits(31, 1) << 12);
            inst.imm = sign_extend(u64::from(imm), IMM_SB_BITS) as i32;
        }
        Format::U => {
            inst.rd = word.bits(7, 5) as u8;
            inst.imm = (word & 0xFFFF_F000) as i32;
        }
        Format::Uj => {
            inst.rd = word.bits(7, 5) as u8;
            let imm = (word.bits(21, 10) << 1)
                | (word.bits(20, 1) << 11)
                | (word.bits(12, 8) << 12)
                | (word.bits(31, 1) << 20);
            inst.imm = sign_extend(u64::from(imm), IMM_UJ_BITS) as i32;
        }
        // Compressed layouts are provisional; no opcode maps here yet.
        _ => return Err(Exception::IllegalInstruction),
    }

    Ok(inst)
}

/// Decodes a 16-bit compressed instruction word.
///
/// The compressed field layouts are provisional, so every compressed word
/// currently signals an illegal instruction.
///
/// # Errors
///
/// Always returns [`Exception::IllegalInstruction`].
pub fn decode16(_half: u16) -> Result<Instruction, Exception> {
    Err(Exception::IllegalInstruction)
}

/// Encodes an instruction back into its raw 32-bit word.
///
/// Exact inverse of [`decode`] for every field combination representable in
/// the instruction's format: `decode(encode(i)) == i`.
pub fn encode(inst: &Instruction) -> u32 {
    let mut word = u32::from(inst.opcode) & 0x7F;
    let imm = inst.imm as u32;

    match inst.format() {
        Format::R => {
            word.set_bits(u32::from(inst.rd), 7, 5);
            word.set_bits(u32::from(inst.funct3), 12, 3);
            word.set_bits(u32::from(inst.rs1), 15, 5);
            word.set_bits(u32::from(inst.rs2), 20, 5);
            word.set_bits(u32::from(inst.funct7), 25, 7);
        }
        Format::R4 => {
            word.set_bits(u32::from(inst.rd), 7, 5);
            word.set_bits(u32::from(inst.funct3), 12, 3);
            word.set_bits(u32::from(inst.rs1), 15, 5);
            word.set_bits(u32::from(inst.rs2), 20, 5);
            word.set_bits(u32::from(inst.funct7), 25, 2);
            word.set_bits(u32::from(inst.rs3), 27, 5);
        }
        Format::I => {
            word.set_bits(u32::from(inst.rd), 7, 5);
            word.set_bits(u32::from(inst.funct3), 12, 3);
            word.set_bits(u32::from(inst.rs1), 15, 5);
            word.set_bits(imm, 20, 12);
        }
        Format::S => {
            word.set_bits(imm, 7, 5);
            word.set_bits(u32::from(inst.funct3), 12, 3);
            word.set_bits(u32::from(inst.rs1), 15, 5);
            word.set_bits(u32::from(inst.rs2), 20, 5);
            word.set_bits(imm >> 5, 25, 7);
        }
        Format::Sb => {
            word.set_bits(imm >> 11, 7, 1);
            word.set_bits(imm >> 1, 8, 4);
            word.set_bits(u32::from(inst.funct3), 12, 3);
            word.set_bits(u32::from(inst.rs1), 15, 5);
            word.set_bits(u32::from(inst.rs2), 20, 5);
            word.set_bits(imm >> 5, 25, 6);
            word.set_bits(imm >> 12, 31, 1);
        }
        Format::U => {
            word.set_bits(u32::from(inst.rd), 7, 5);
            word |= imm & 0xFFFF_F000;
        }
        Format::Uj => {
            word.set_bits(u32::from(inst.rd), 7, 5);
            word.set_bits(imm >> 12, 12, 8);
            word.set_bits(imm >> 11, 20, 1);
            word.set_bits(imm >> 1, 21, 10);
            word.set_bits(imm >> 20, 31, 1);
        }
        _ => {}
    }

    word
}
