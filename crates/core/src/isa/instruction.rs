//! Decoded instruction representation.
//!
//! A raw instruction word is classified into one of the architectural
//! formats and unpacked into register indices, function codes, and one
//! sign-extended immediate. The format tag is a pure function of the opcode;
//! the decoded value is immutable and lives for exactly one dispatch.

use crate::common::Exception;

/// Instruction format, determined by the opcode.
///
/// The last twelve variants tag the 16-bit compressed sub-formats. Their
/// field layouts are provisional; decoding a compressed word currently
/// signals [`Exception::IllegalInstruction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Register-register: rd, funct3, rs1, rs2, funct7.
    R,
    /// Fused multiply-add: rd, funct3, rs1, rs2, funct2, rs3.
    R4,
    /// Register-immediate: rd, funct3, rs1, imm\[11:0\].
    I,
    /// Store: split imm\[11:0\], funct3, rs1, rs2.
    S,
    /// Branch: split imm\[12:1\] with bit 0 forced to zero.
    Sb,
    /// Upper immediate: rd, imm\[31:12\].
    U,
    /// Jump: rd, permuted imm\[20:1\] with bit 0 forced to zero.
    Uj,
    /// Compressed register (provisional).
    Cr,
    /// Compressed immediate (provisional).
    Ci,
    /// Compressed stack store (provisional).
    Css,
    /// Compressed wide immediate (provisional).
    Ciw,
    /// Compressed load (provisional).
    Cl,
    /// Compressed store (provisional).
    Cs,
    /// Compressed branch (provisional).
    Cb,
    /// Compressed jump (provisional).
    Cj,
}

impl Format {
    /// Maps a 7-bit opcode to its format.
    ///
    /// # Errors
    ///
    /// [`Exception::IllegalInstruction`] when the opcode is not part of the
    /// recognized set.
    pub fn of(opcode: u8) -> Result<Self, Exception> {
        match opcode {
            0x03 | 0x07 | 0x0F | 0x13 | 0x1B | 0x67 | 0x73 => Ok(Self::I),
            0x17 | 0x37 => Ok(Self::U),
            0x23 | 0x27 => Ok(Self::S),
            0x2F | 0x33 | 0x3B | 0x53 => Ok(Self::R),
            0x43 | 0x47 | 0x4B | 0x4F => Ok(Self::R4),
            0x63 => Ok(Self::Sb),
            0x6F => Ok(Self::Uj),
            _ => Err(Exception::IllegalInstruction),
        }
    }
}

/// A decoded view of one instruction word.
///
/// Fields that a format does not use decode as zero and are ignored by
/// `encode`, so the decode/encode round-trip holds per format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    /// Low 7 bits of the raw word.
    pub opcode: u8,
    /// Destination register index.
    pub rd: u8,
    /// First source register index.
    pub rs1: u8,
    /// Second source register index.
    pub rs2: u8,
    /// Third source register index (R4 only).
    pub rs3: u8,
    /// Minor function code.
    pub funct3: u8,
    /// Major function code (7 bits for R, 2 bits for R4).
    pub funct7: u8,
    /// Sign-extended immediate.
    pub imm: i32,
}

impl Instruction {
    /// Format tag for this instruction's opcode.
    ///
    /// Always succeeds on a value produced by `decode`.
    pub fn format(&self) -> Format {
        Format::of(self.opcode).unwrap_or(Format::I)
    }
}
