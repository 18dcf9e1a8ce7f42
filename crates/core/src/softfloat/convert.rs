//! Integer conversions.
//!
//! Integer-to-float routes through the shared rounding path, so a 64-bit
//! value wider than the destination significand rounds per the active mode.
//! Float-to-integer rejects NaN with Invalid, saturates out-of-range
//! magnitudes with Overflow, and raises Inexact when fraction bits are
//! discarded.

use super::{FpFlags, Rounding, SoftFloat, arith};

impl<const EXP: u32, const FRAC: u32> SoftFloat<EXP, FRAC> {
    /// Rounds an integer magnitude of the given sign into the format.
    fn from_magnitude(flags: &mut FpFlags, round: Rounding, sign: bool, value: u64) -> Self {
        if value == 0 {
            return Self::zero(false);
        }
        let lead = 63 - value.leading_zeros();
        arith::round_pack(
            flags,
            round,
            sign,
            lead as i32,
            u128::from(value),
            lead,
            false,
        )
    }

    /// Converts an unsigned integer.
    pub fn from_unsigned(flags: &mut FpFlags, round: Rounding, value: u64) -> Self {
        Self::from_magnitude(flags, round, false, value)
    }

    /// Converts a signed integer.
    pub fn from_signed(flags: &mut FpFlags, round: Rounding, value: i64) -> Self {
        Self::from_magnitude(flags, round, value < 0, value.unsigned_abs())
    }

    /// Splits the value into a truncated integer magnitude and an
    /// any-fraction-bits-discarded marker, then applies the rounding mode.
    ///
    /// Returns `None` for NaN and infinity; the magnitude otherwise, which
    /// may exceed the destination range and saturate in the caller.
    fn to_magnitude(self, round: Rounding) -> Option<(bool, u128, bool)> {
        if self.exponent() == Self::EXP_MAX {
            return None;
        }
        if self.is_zero() {
            return Some((self.sign(), 0, false));
        }
        let sign = self.sign();
        let (exp, sig) = self.unpack();
        let sig = u128::from(sig);

        // value magnitude = sig * 2^(exp - FRAC)
        let (mut whole, fraction, half_or_more, exact_half) = if exp >= FRAC as i32 {
            let shift = (exp - FRAC as i32) as u32;
            if shift >= 64 {
                // Saturates in the caller; no fraction bits exist.
                return Some((sign, u128::MAX, false));
            }
            (sig << shift, false, false, false)
        } else {
            let shift = (FRAC as i32 - exp) as u32;
            if shift >= 128 {
                (0, true, false, false)
            } else {
                let dropped = sig & ((1 << shift) - 1);
                let half = 1u128 << (shift - 1);
                (sig >> shift, dropped != 0, dropped >= half, dropped == half)
            }
        };

        if fraction {
            let increment = match round {
                Rounding::NearestEven => {
                    half_or_more && (!exact_half || whole & 1 != 0)
                }
                Rounding::TowardZero => false,
                Rounding::Down => sign,
                Rounding::Up => !sign,
                Rounding::MaxMagnitude => half_or_more,
            };
            if increment {
                whole += 1;
            }
        }
        Some((sign, whole, fraction))
    }

    /// Converts to an unsigned integer of `bits` width.
    ///
    /// NaN raises Invalid and yields the all-ones pattern; negative values
    /// and magnitudes beyond the range raise Overflow and saturate.
    pub fn to_unsigned(self, flags: &mut FpFlags, round: Rounding, bits: u32) -> u64 {
        let max = if bits >= 64 { u64::MAX } else { (1 << bits) - 1 };
        let Some((sign, magnitude, inexact)) = self.to_magnitude(round) else {
            if self.is_nan() {
                flags.raise(FpFlags::INVALID);
                return max;
            }
            flags.raise(FpFlags::OVERFLOW);
            return if self.sign() { 0 } else { max };
        };
        if sign && magnitude != 0 {
            flags.raise(FpFlags::OVERFLOW);
            return 0;
        }
        if magnitude > u128::from(max) {
            flags.raise(FpFlags::OVERFLOW);
            return max;
        }
        if inexact {
            flags.raise(FpFlags::INEXACT);
        }
        magnitude as u64
    }

    /// Converts to a signed integer of `bits` width, returned sign-extended
    /// to 64 bits.
    ///
    /// NaN raises Invalid and yields the maximum; out-of-range magnitudes
    /// raise Overflow and saturate toward the matching bound.
    pub fn to_signed(self, flags: &mut FpFlags, round: Rounding, bits: u32) -> i64 {
        let max = if bits >= 64 {
            i64::MAX
        } else {
            (1 << (bits - 1)) - 1
        };
        let min = if bits >= 64 {
            i64::MIN
        } else {
            -(1 << (bits - 1))
        };
        let Some((sign, magnitude, inexact)) = self.to_magnitude(round) else {
            if self.is_nan() {
                flags.raise(FpFlags::INVALID);
                return max;
            }
            flags.raise(FpFlags::OVERFLOW);
            return if self.sign() { min } else { max };
        };
        let bound = if sign {
            min.unsigned_abs() as u128
        } else {
            max as u128
        };
        if magnitude > bound {
            flags.raise(FpFlags::OVERFLOW);
            return if sign { min } else { max };
        }
        if inexact {
            flags.raise(FpFlags::INEXACT);
        }
        if sign {
            (magnitude as i64).wrapping_neg()
        } else {
            magnitude as i64
        }
    }
}
