//! Software IEEE-754 floating point.
//!
//! This module implements the emulator's floating-point formats entirely in
//! integer arithmetic, parameterized over exponent and significand-field
//! widths. It provides:
//! 1. **Representation:** Sign/exponent/field accessors over a raw bit
//!    pattern, with [`F16`]/[`F32`]/[`F64`] instantiations.
//! 2. **Classification:** The ten-way class split used by `FCLASS`.
//! 3. **Conversion:** Integer↔float in both signed and unsigned flavors.
//! 4. **Comparison:** Quiet and signaling three-way ordering plus min/max.
//! 5. **Arithmetic:** Add, subtract, multiply, divide, and square root,
//!    all rounding through one shared pack path.
//!
//! Status flags accumulate into a caller-held [`FpFlags`]; no operation
//! ever clears a flag. Clearing is the CSR write path's responsibility.

/// Addition, multiplication, division, and square root.
pub mod arith;

/// Three-way comparison and extremum selection.
pub mod compare;

/// Integer-to-float and float-to-integer conversion.
pub mod convert;

use crate::common::BitField;

/// Accumulated floating-point status flags.
///
/// Bit layout matches the low five bits of the floating-point status CSR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FpFlags(pub u8);

impl FpFlags {
    /// Result was rounded.
    pub const INEXACT: u8 = 1 << 0;
    /// Result was tiny and inexact.
    pub const UNDERFLOW: u8 = 1 << 1;
    /// Result exceeded the representable exponent range.
    pub const OVERFLOW: u8 = 1 << 2;
    /// Finite nonzero value divided by zero.
    pub const DIVIDE_BY_ZERO: u8 = 1 << 3;
    /// Operation had no meaningful result (NaN production and friends).
    pub const INVALID: u8 = 1 << 4;

    /// Accumulates `flag` into the status value.
    pub fn raise(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Whether `flag` has accumulated.
    pub fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }
}

/// Rounding mode, resolved before an operation is invoked.
///
/// The "dynamic" encoding of the instruction word is resolved against the
/// rounding-mode CSR field by the execution unit via [`Rounding::decode`];
/// the FPU itself only ever sees a concrete mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rounding {
    /// Round to nearest, ties to even.
    #[default]
    NearestEven,
    /// Round toward zero.
    TowardZero,
    /// Round toward negative infinity.
    Down,
    /// Round toward positive infinity.
    Up,
    /// Round to nearest, ties away from zero.
    MaxMagnitude,
}

impl Rounding {
    /// Decodes a 3-bit rounding-mode field.
    ///
    /// Returns `None` for the reserved encodings, including the dynamic
    /// encoding (7) — the caller must substitute the CSR value first.
    pub fn decode(field: u8) -> Option<Self> {
        match field {
            0 => Some(Self::NearestEven),
            1 => Some(Self::TowardZero),
            2 => Some(Self::Down),
            3 => Some(Self::Up),
            4 => Some(Self::MaxMagnitude),
            _ => None,
        }
    }
}

/// Floating-point value classification.
///
/// Discriminants are the values written to the integer destination by the
/// classification opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FpClass {
    /// Negative infinity.
    NegInfinity = 0,
    /// Negative normal number.
    NegNormal = 1,
    /// Negative subnormal number.
    NegSubnormal = 2,
    /// Negative zero.
    NegZero = 3,
    /// Positive zero.
    PosZero = 4,
    /// Positive subnormal number.
    PosSubnormal = 5,
    /// Positive normal number.
    PosNormal = 6,
    /// Positive infinity.
    PosInfinity = 7,
    /// Signaling not-a-number.
    SignalingNan = 8,
    /// Quiet not-a-number.
    QuietNan = 9,
}

/// Three-way floating-point ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FpOrdering {
    /// Left operand is greater.
    Greater,
    /// Left operand is less.
    Less,
    /// Operands are equal (including zeros of either sign).
    Equal,
    /// At least one operand is NaN.
    Unordered,
}

/// An IEEE-754 binary float with `EXP` exponent bits and `FRAC` field bits.
///
/// The raw pattern occupies the low `1 + EXP + FRAC` bits of a `u64`;
/// `binary16`/`binary32`/`binary64` are the instantiated formats. The float
/// register file stores the widest format and reads narrower formats as the
/// low bits of the slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoftFloat<const EXP: u32, const FRAC: u32> {
    /// Raw bit pattern in the low `1 + EXP + FRAC` bits.
    pub raw: u64,
}

/// Half-precision binary16.
pub type F16 = SoftFloat<5, 10>;
/// Single-precision binary32.
pub type F32 = SoftFloat<8, 23>;
/// Double-precision binary64.
pub type F64 = SoftFloat<11, 52>;

impl<const EXP: u32, const FRAC: u32> SoftFloat<EXP, FRAC> {
    /// Total width of the format in bits.
    pub const TOTAL_BITS: u32 = 1 + EXP + FRAC;

    /// All-ones biased exponent (infinity/NaN marker).
    pub const EXP_MAX: u64 = (1 << EXP) - 1;

    /// Exponent bias.
    pub const BIAS: i32 = (Self::EXP_MAX >> 1) as i32;

    /// Wraps a raw bit pattern.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            raw: raw & u64::trailing_mask(Self::TOTAL_BITS),
        }
    }

    /// Sign bit; `true` for negative.
    pub fn sign(self) -> bool {
        self.raw.bits(EXP + FRAC, 1) != 0
    }

    /// Biased exponent field.
    pub fn exponent(self) -> u64 {
        self.raw.bits(FRAC, EXP)
    }

    /// Significand field, excluding the implicit leading bit.
    pub fn field(self) -> u64 {
        self.raw.bits(0, FRAC)
    }

    /// Replaces the sign bit.
    pub fn set_sign(&mut self, sign: bool) {
        self.raw.set_bits(u64::from(sign), EXP + FRAC, 1);
    }

    /// Replaces the biased exponent field.
    pub fn set_exponent(&mut self, exponent: u64) {
        self.raw.set_bits(exponent, FRAC, EXP);
    }

    /// Replaces the significand field.
    pub fn set_field(&mut self, field: u64) {
        self.raw.set_bits(field, 0, FRAC);
    }

    /// Zero of the given sign.
    pub fn zero(sign: bool) -> Self {
        let mut value = Self::from_raw(0);
        value.set_sign(sign);
        value
    }

    /// Infinity of the given sign.
    pub fn infinity(sign: bool) -> Self {
        let mut value = Self::from_raw(0);
        value.set_sign(sign);
        value.set_exponent(Self::EXP_MAX);
        value
    }

    /// The canonical quiet NaN (positive, only the field's top bit set).
    pub fn quiet_nan() -> Self {
        let mut value = Self::from_raw(0);
        value.set_exponent(Self::EXP_MAX);
        value.set_field(1 << (FRAC - 1));
        value
    }

    /// A signaling NaN (positive, field value 1).
    pub fn signaling_nan() -> Self {
        let mut value = Self::from_raw(0);
        value.set_exponent(Self::EXP_MAX);
        value.set_field(1);
        value
    }

    /// Largest finite value of the given sign.
    pub fn max_finite(sign: bool) -> Self {
        let mut value = Self::zero(sign);
        value.set_exponent(Self::EXP_MAX - 1);
        value.set_field(u64::trailing_mask(FRAC));
        value
    }

    /// One.
    pub fn one() -> Self {
        let mut value = Self::from_raw(0);
        value.set_exponent(Self::BIAS as u64);
        value
    }

    /// Whether this is any NaN.
    pub fn is_nan(self) -> bool {
        self.exponent() == Self::EXP_MAX && self.field() != 0
    }

    /// Whether this is a signaling NaN.
    pub fn is_signaling_nan(self) -> bool {
        self.is_nan() && self.field().bits(FRAC - 1, 1) == 0
    }

    /// Whether this is an infinity of either sign.
    pub fn is_infinite(self) -> bool {
        self.exponent() == Self::EXP_MAX && self.field() == 0
    }

    /// Whether this is a zero of either sign.
    pub fn is_zero(self) -> bool {
        self.exponent() == 0 && self.field() == 0
    }

    /// Whether this is a subnormal number.
    pub fn is_subnormal(self) -> bool {
        self.exponent() == 0 && self.field() != 0
    }

    /// Flips the sign bit.
    pub fn negate(&mut self) {
        let sign = self.sign();
        self.set_sign(!sign);
    }

    /// Classifies the value into one of the ten classes.
    pub fn classify(self) -> FpClass {
        let sign = self.sign();
        if self.exponent() == Self::EXP_MAX {
            if self.field() == 0 {
                if sign {
                    FpClass::NegInfinity
                } else {
                    FpClass::PosInfinity
                }
            } else if self.field().bits(FRAC - 1, 1) != 0 {
                FpClass::QuietNan
            } else {
                FpClass::SignalingNan
            }
        } else if self.exponent() == 0 {
            if self.field() == 0 {
                if sign { FpClass::NegZero } else { FpClass::PosZero }
            } else if sign {
                FpClass::NegSubnormal
            } else {
                FpClass::PosSubnormal
            }
        } else if sign {
            FpClass::NegNormal
        } else {
            FpClass::PosNormal
        }
    }

    /// Unpacks a finite nonzero value into `(exponent, significand)` with
    /// the implicit bit materialized at bit `FRAC`.
    ///
    /// The value equals `significand * 2^(exponent - FRAC)` (ignoring sign).
    /// Subnormals are normalized by left-shifting, so the returned
    /// significand always has its top bit at position `FRAC`.
    pub(crate) fn unpack(self) -> (i32, u64) {
        let exp = self.exponent();
        let field = self.field();
        if exp == 0 {
            // Subnormal: normalize so the leading 1 sits at bit FRAC.
            let shift = FRAC + 1 - (64 - field.leading_zeros());
            (1 - Self::BIAS - shift as i32, field << shift)
        } else {
            (exp as i32 - Self::BIAS, field | (1 << FRAC))
        }
    }

    /// Converts between formats, rounding to the destination width.
    pub fn convert_from<const E2: u32, const F2: u32>(
        flags: &mut FpFlags,
        round: Rounding,
        src: SoftFloat<E2, F2>,
    ) -> Self {
        if src.is_nan() {
            if src.is_signaling_nan() {
                flags.raise(FpFlags::INVALID);
            }
            return Self::quiet_nan();
        }
        if src.is_infinite() {
            return Self::infinity(src.sign());
        }
        if src.is_zero() {
            return Self::zero(src.sign());
        }
        let (exp, sig) = src.unpack();
        // Rebase the significand from F2 to FRAC fractional bits; round_pack
        // carries three extra guard bits.
        arith::round_pack::<EXP, FRAC>(
            flags,
            round,
            src.sign(),
            exp,
            u128::from(sig) << (FRAC + 3),
            F2 + FRAC + 3,
            false,
        )
    }
}
