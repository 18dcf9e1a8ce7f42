//! Floating-point instruction semantics.
//!
//! Handlers bridge the register file and the softfloat formats: single
//! precision lives in the low 32 bits of a float register slot with the
//! upper half preserved, double precision uses the whole slot. Status
//! flags raised by an operation accumulate into the flags CSR field.
//!
//! The fused multiply-add group evaluates as a multiply followed by an
//! add, each rounded separately.

use crate::common::Exception;
use crate::config::{Extensions, Xlen};
use crate::isa::Instruction;
use crate::softfloat::{F32, F64, FpFlags, Rounding};

use super::Hart;

impl Hart {
    /// Resolves an instruction rounding field, substituting the CSR mode
    /// for the dynamic encoding.
    fn rounding(&self, field: u8) -> Result<Rounding, Exception> {
        let field = if field == 7 { self.csrs.frm as u8 } else { field };
        Rounding::decode(field).ok_or(Exception::IllegalInstruction)
    }

    /// Runs an operation against the accumulated flags CSR field.
    fn with_flags<T>(&mut self, operate: impl FnOnce(&mut FpFlags) -> T) -> T {
        let mut flags = FpFlags(self.csrs.fflags as u8);
        let result = operate(&mut flags);
        self.csrs.fflags = u64::from(flags.0);
        result
    }

    fn read_f32(&self, index: u8) -> F32 {
        F32::from_raw(self.fregs[usize::from(index)])
    }

    fn write_f32(&mut self, index: u8, value: F32) {
        let slot = &mut self.fregs[usize::from(index)];
        *slot = (*slot & !0xFFFF_FFFF) | value.raw;
    }

    fn read_f64(&self, index: u8) -> F64 {
        F64::from_raw(self.fregs[usize::from(index)])
    }

    fn write_f64(&mut self, index: u8, value: F64) {
        self.fregs[usize::from(index)] = value.raw;
    }

    fn require_double(&self, double: bool) -> Result<(), Exception> {
        if double {
            self.require(Extensions::D)?;
        }
        Ok(())
    }

    pub(super) fn exec_fp_load(&mut self, inst: &Instruction) -> Result<(), Exception> {
        self.require(Extensions::F)?;
        let address = self.x(inst.rs1).wrapping_add(inst.imm as i64 as u64);
        match inst.funct3 {
            2 => {
                let data = self.load_virtual(address, 4)?;
                self.write_f32(inst.rd, F32::from_raw(data));
            }
            3 => {
                self.require(Extensions::D)?;
                let data = self.load_virtual(address, 8)?;
                self.write_f64(inst.rd, F64::from_raw(data));
            }
            _ => return Err(Exception::IllegalInstruction),
        }
        Ok(())
    }

    pub(super) fn exec_fp_store(&mut self, inst: &Instruction) -> Result<(), Exception> {
        self.require(Extensions::F)?;
        let address = self.x(inst.rs1).wrapping_add(inst.imm as i64 as u64);
        match inst.funct3 {
            2 => self.store_virtual(address, 4, self.read_f32(inst.rs2).raw),
            3 => {
                self.require(Extensions::D)?;
                self.store_virtual(address, 8, self.f(inst.rs2))
            }
            _ => Err(Exception::IllegalInstruction),
        }
    }

    /// Fused multiply-add group. The opcode selects the sign pattern;
    /// the two-bit format field selects the width.
    pub(super) fn exec_fp_fma(&mut self, inst: &Instruction) -> Result<(), Exception> {
        self.require(Extensions::F)?;
        let double = match inst.funct7 & 3 {
            0 => false,
            1 => {
                self.require(Extensions::D)?;
                true
            }
            _ => return Err(Exception::IllegalInstruction),
        };
        let round = self.rounding(inst.funct3)?;
        let opcode = inst.opcode;

        if double {
            let a = self.read_f64(inst.rs1);
            let b = self.read_f64(inst.rs2);
            let c = self.read_f64(inst.rs3);
            let result = self.with_flags(|flags| multiply_add(flags, round, opcode, a, b, c));
            self.write_f64(inst.rd, result);
        } else {
            let a = self.read_f32(inst.rs1);
            let b = self.read_f32(inst.rs2);
            let c = self.read_f32(inst.rs3);
            let result = self.with_flags(|flags| multiply_add(flags, round, opcode, a, b, c));
            self.write_f32(inst.rd, result);
        }
        Ok(())
    }

    pub(super) fn exec_fp_op(&mut self, inst: &Instruction) -> Result<(), Exception> {
        self.require(Extensions::F)?;
        let double = inst.funct7 & 1 == 1;
        match inst.funct7 {
            0x00 | 0x01 => self.fp_arith(inst, double, F32::add, F64::add),
            0x04 | 0x05 => self.fp_arith(inst, double, F32::sub, F64::sub),
            0x08 | 0x09 => self.fp_arith(inst, double, F32::mul, F64::mul),
            0x0C | 0x0D => self.fp_arith(inst, double, F32::div, F64::div),
            0x10 | 0x11 => self.fp_sign_inject(inst, double),
            0x14 | 0x15 => self.fp_extremum(inst, double),
            0x20 => {
                // Narrowing conversion from the double operand.
                self.require(Extensions::D)?;
                let round = self.rounding(inst.funct3)?;
                let src = self.read_f64(inst.rs1);
                let result = self.with_flags(|flags| F32::convert_from(flags, round, src));
                self.write_f32(inst.rd, result);
                Ok(())
            }
            0x21 => {
                self.require(Extensions::D)?;
                let round = self.rounding(inst.funct3)?;
                let src = self.read_f32(inst.rs1);
                let result = self.with_flags(|flags| F64::convert_from(flags, round, src));
                self.write_f64(inst.rd, result);
                Ok(())
            }
            0x2C | 0x2D => {
                self.require_double(double)?;
                let round = self.rounding(inst.funct3)?;
                if double {
                    let a = self.read_f64(inst.rs1);
                    let result = self.with_flags(|flags| F64::sqrt(flags, round, a));
                    self.write_f64(inst.rd, result);
                } else {
                    let a = self.read_f32(inst.rs1);
                    let result = self.with_flags(|flags| F32::sqrt(flags, round, a));
                    self.write_f32(inst.rd, result);
                }
                Ok(())
            }
            0x50 | 0x51 => self.fp_compare(inst, double),
            0x60 | 0x61 => self.fp_to_int(inst, double),
            0x68 | 0x69 => self.fp_from_int(inst, double),
            0x70 | 0x71 => {
                self.require_double(double)?;
                match inst.funct3 {
                    0 if double => {
                        // Raw move to the integer file; 64-bit registers only.
                        if self.config.xlen != Xlen::Rv64 {
                            return Err(Exception::IllegalInstruction);
                        }
                        self.write_x(inst.rd, self.f(inst.rs1));
                    }
                    0 => {
                        let raw = self.read_f32(inst.rs1).raw;
                        self.write_x_i(inst.rd, i64::from(raw as u32 as i32));
                    }
                    1 if double => {
                        let class = self.read_f64(inst.rs1).classify();
                        self.write_x(inst.rd, class as u64);
                    }
                    1 => {
                        let class = self.read_f32(inst.rs1).classify();
                        self.write_x(inst.rd, class as u64);
                    }
                    _ => return Err(Exception::IllegalInstruction),
                }
                Ok(())
            }
            0x78 => {
                self.write_f32(inst.rd, F32::from_raw(self.x(inst.rs1)));
                Ok(())
            }
            0x79 => {
                self.require(Extensions::D)?;
                if self.config.xlen != Xlen::Rv64 {
                    return Err(Exception::IllegalInstruction);
                }
                self.write_f64(inst.rd, F64::from_raw(self.x(inst.rs1)));
                Ok(())
            }
            _ => Err(Exception::IllegalInstruction),
        }
    }

    fn fp_arith(
        &mut self,
        inst: &Instruction,
        double: bool,
        op32: fn(&mut FpFlags, Rounding, F32, F32) -> F32,
        op64: fn(&mut FpFlags, Rounding, F64, F64) -> F64,
    ) -> Result<(), Exception> {
        self.require_double(double)?;
        let round = self.rounding(inst.funct3)?;
        if double {
            let a = self.read_f64(inst.rs1);
            let b = self.read_f64(inst.rs2);
            let result = self.with_flags(|flags| op64(flags, round, a, b));
            self.write_f64(inst.rd, result);
        } else {
            let a = self.read_f32(inst.rs1);
            let b = self.read_f32(inst.rs2);
            let result = self.with_flags(|flags| op32(flags, round, a, b));
            self.write_f32(inst.rd, result);
        }
        Ok(())
    }

    /// Sign injection: the result takes its magnitude from `rs1` and its
    /// sign from `rs2` (direct, inverted, or xored with `rs1`'s).
    fn fp_sign_inject(&mut self, inst: &Instruction, double: bool) -> Result<(), Exception> {
        self.require_double(double)?;
        if double {
            let mut result = self.read_f64(inst.rs1);
            let sign = injected_sign(inst.funct3, result.sign(), self.read_f64(inst.rs2).sign())?;
            result.set_sign(sign);
            self.write_f64(inst.rd, result);
        } else {
            let mut result = self.read_f32(inst.rs1);
            let sign = injected_sign(inst.funct3, result.sign(), self.read_f32(inst.rs2).sign())?;
            result.set_sign(sign);
            self.write_f32(inst.rd, result);
        }
        Ok(())
    }

    fn fp_extremum(&mut self, inst: &Instruction, double: bool) -> Result<(), Exception> {
        self.require_double(double)?;
        if inst.funct3 > 1 {
            return Err(Exception::IllegalInstruction);
        }
        let minimum = inst.funct3 == 0;
        if double {
            let a = self.read_f64(inst.rs1);
            let b = self.read_f64(inst.rs2);
            let result = self.with_flags(|flags| {
                if minimum {
                    F64::extremum::<true>(flags, a, b)
                } else {
                    F64::extremum::<false>(flags, a, b)
                }
            });
            self.write_f64(inst.rd, result);
        } else {
            let a = self.read_f32(inst.rs1);
            let b = self.read_f32(inst.rs2);
            let result = self.with_flags(|flags| {
                if minimum {
                    F32::extremum::<true>(flags, a, b)
                } else {
                    F32::extremum::<false>(flags, a, b)
                }
            });
            self.write_f32(inst.rd, result);
        }
        Ok(())
    }

    fn fp_compare(&mut self, inst: &Instruction, double: bool) -> Result<(), Exception> {
        use crate::softfloat::FpOrdering;

        self.require_double(double)?;
        let ordering = if double {
            let a = self.read_f64(inst.rs1);
            let b = self.read_f64(inst.rs2);
            self.with_flags(|flags| {
                if inst.funct3 == 2 {
                    F64::compare::<false>(flags, a, b)
                } else {
                    F64::compare::<true>(flags, a, b)
                }
            })
        } else {
            let a = self.read_f32(inst.rs1);
            let b = self.read_f32(inst.rs2);
            self.with_flags(|flags| {
                if inst.funct3 == 2 {
                    F32::compare::<false>(flags, a, b)
                } else {
                    F32::compare::<true>(flags, a, b)
                }
            })
        };
        let result = match inst.funct3 {
            0 => matches!(ordering, FpOrdering::Less | FpOrdering::Equal),
            1 => ordering == FpOrdering::Less,
            2 => ordering == FpOrdering::Equal,
            _ => return Err(Exception::IllegalInstruction),
        };
        self.write_x(inst.rd, u64::from(result));
        Ok(())
    }

    /// Conversions to the integer file. The source-register field of the
    /// encoding selects the integer width and signedness.
    fn fp_to_int(&mut self, inst: &Instruction, double: bool) -> Result<(), Exception> {
        self.require_double(double)?;
        let round = self.rounding(inst.funct3)?;
        if inst.rs2 >= 2 {
            self.require_rv64()?;
        }
        macro_rules! convert {
            ($value:expr) => {{
                let value = $value;
                match inst.rs2 {
                    0 => {
                        let result = self.with_flags(|flags| value.to_signed(flags, round, 32));
                        self.write_x_i(inst.rd, result);
                    }
                    1 => {
                        let result = self.with_flags(|flags| value.to_unsigned(flags, round, 32));
                        self.write_x_i(inst.rd, i64::from(result as u32 as i32));
                    }
                    2 => {
                        let result = self.with_flags(|flags| value.to_signed(flags, round, 64));
                        self.write_x_i(inst.rd, result);
                    }
                    3 => {
                        let result = self.with_flags(|flags| value.to_unsigned(flags, round, 64));
                        self.write_x(inst.rd, result);
                    }
                    _ => return Err(Exception::IllegalInstruction),
                }
            }};
        }
        if double {
            convert!(self.read_f64(inst.rs1));
        } else {
            convert!(self.read_f32(inst.rs1));
        }
        Ok(())
    }

    fn fp_from_int(&mut self, inst: &Instruction, double: bool) -> Result<(), Exception> {
        self.require_double(double)?;
        let round = self.rounding(inst.funct3)?;
        if inst.rs2 >= 2 {
            self.require_rv64()?;
        }
        macro_rules! convert {
            ($format:ty, $write:ident) => {{
                let result = match inst.rs2 {
                    0 => {
                        let value = i64::from(self.x(inst.rs1) as i32);
                        self.with_flags(|flags| <$format>::from_signed(flags, round, value))
                    }
                    1 => {
                        let value = u64::from(self.x(inst.rs1) as u32);
                        self.with_flags(|flags| <$format>::from_unsigned(flags, round, value))
                    }
                    2 => {
                        let value = self.read_x_i(inst.rs1);
                        self.with_flags(|flags| <$format>::from_signed(flags, round, value))
                    }
                    3 => {
                        let value = self.read_x_u(inst.rs1);
                        self.with_flags(|flags| <$format>::from_unsigned(flags, round, value))
                    }
                    _ => return Err(Exception::IllegalInstruction),
                };
                self.$write(inst.rd, result);
            }};
        }
        if double {
            convert!(F64, write_f64);
        } else {
            convert!(F32, write_f32);
        }
        Ok(())
    }
}

/// Sign for the injection group: direct, inverted, or xor.
fn injected_sign(funct3: u8, rs1: bool, rs2: bool) -> Result<bool, Exception> {
    match funct3 {
        0 => Ok(rs2),
        1 => Ok(!rs2),
        2 => Ok(rs1 ^ rs2),
        _ => Err(Exception::IllegalInstruction),
    }
}

/// Multiply-add evaluated as two separately rounded steps; the opcode's
/// low bits select the sign pattern applied to the product and addend.
fn multiply_add<const EXP: u32, const FRAC: u32>(
    flags: &mut FpFlags,
    round: Rounding,
    opcode: u8,
    a: crate::softfloat::SoftFloat<EXP, FRAC>,
    b: crate::softfloat::SoftFloat<EXP, FRAC>,
    c: crate::softfloat::SoftFloat<EXP, FRAC>,
) -> crate::softfloat::SoftFloat<EXP, FRAC> {
    let mut product = crate::softfloat::SoftFloat::mul(flags, round, a, b);
    if matches!(opcode, 0x4B | 0x4F) && !product.is_nan() {
        product.negate();
    }
    if matches!(opcode, 0x47 | 0x4F) {
        crate::softfloat::SoftFloat::sub(flags, round, product, c)
    } else {
        crate::softfloat::SoftFloat::add(flags, round, product, c)
    }
}
