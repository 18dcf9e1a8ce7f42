//! Comparison and extremum selection.
//!
//! Ordering works on the raw patterns: after the class-based special cases,
//! two values of equal sign compare by magnitude bits, with the order
//! inverted when both are negative. Zeros of either sign compare equal.

use super::{FpFlags, FpOrdering, SoftFloat};

impl<const EXP: u32, const FRAC: u32> SoftFloat<EXP, FRAC> {
    /// Three-way comparison.
    ///
    /// A NaN operand yields [`FpOrdering::Unordered`]. A signaling NaN
    /// always raises Invalid; with `SIGNALING` set, any NaN does. The quiet
    /// form backs `FEQ`, the signaling form `FLT` and `FLE`.
    pub fn compare<const SIGNALING: bool>(
        flags: &mut FpFlags,
        a: Self,
        b: Self,
    ) -> FpOrdering {
        if a.is_nan() || b.is_nan() {
            if SIGNALING || a.is_signaling_nan() || b.is_signaling_nan() {
                flags.raise(FpFlags::INVALID);
            }
            return FpOrdering::Unordered;
        }
        if a.is_zero() && b.is_zero() {
            return FpOrdering::Equal;
        }
        match (a.sign(), b.sign()) {
            (false, true) => FpOrdering::Greater,
            (true, false) => FpOrdering::Less,
            (sign, _) => {
                // Same sign: magnitude bits order lexicographically.
                let magnitude_mask = !0u64 >> (64 - EXP - FRAC);
                let mag_a = a.raw & magnitude_mask;
                let mag_b = b.raw & magnitude_mask;
                if mag_a == mag_b {
                    FpOrdering::Equal
                } else if (mag_a > mag_b) != sign {
                    FpOrdering::Greater
                } else {
                    FpOrdering::Less
                }
            }
        }
    }

    /// Extremum of two values.
    ///
    /// A quiet NaN is masked in favor of the other operand; a signaling NaN
    /// on either side raises Invalid and forces the canonical quiet NaN.
    /// `MINIMUM` selects the smaller value, with `-0` ordered below `+0`.
    pub fn extremum<const MINIMUM: bool>(flags: &mut FpFlags, a: Self, b: Self) -> Self {
        if a.is_signaling_nan() || b.is_signaling_nan() {
            flags.raise(FpFlags::INVALID);
            return Self::quiet_nan();
        }
        match (a.is_nan(), b.is_nan()) {
            (true, true) => return Self::quiet_nan(),
            (true, false) => return b,
            (false, true) => return a,
            (false, false) => {}
        }
        if a.is_zero() && b.is_zero() && a.sign() != b.sign() {
            return Self::zero(MINIMUM);
        }
        let ordering = Self::compare::<false>(flags, a, b);
        let take_a = if MINIMUM {
            ordering == FpOrdering::Less
        } else {
            ordering == FpOrdering::Greater
        };
        if take_a { a } else { b }
    }
}
