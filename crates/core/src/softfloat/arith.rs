//! Floating-point arithmetic.
//!
//! Every arithmetic result funnels through [`round_pack`], which normalizes
//! an extended significand, applies the active rounding mode against
//! guard/round/sticky bits, and handles overflow and subnormal underflow in
//! one place. The operations themselves only have to produce a sign, an
//! unbiased exponent, and a sufficiently wide significand.

use super::{FpFlags, Rounding, SoftFloat};

/// Number of extra low bits carried below the significand during rounding.
const GUARD_BITS: u32 = 3;

/// Rounds and packs an extended significand into a float.
///
/// The value represented is `(-1)^sign * sig * 2^(exp - frac_bits)` where
/// `frac_bits` is the number of fractional bits the significand carries
/// below its implicit-bit position (`FRAC + GUARD_BITS` after
/// normalization). `sticky` ORs an out-of-band inexact residue (for example
/// a nonzero division remainder) into the lowest bit.
///
/// Overflow produces infinity or the largest finite value depending on the
/// rounding direction; results too small for the subnormal range flush to
/// zero with underflow and inexact raised.
pub(crate) fn round_pack<const EXP: u32, const FRAC: u32>(
    flags: &mut FpFlags,
    round: Rounding,
    sign: bool,
    exp: i32,
    sig: u128,
    frac_bits: u32,
    sticky: bool,
) -> SoftFloat<EXP, FRAC> {
    let mut sig = sig;
    let mut sticky = sticky;
    if sig == 0 {
        if sticky {
            flags.raise(FpFlags::INEXACT);
        }
        return SoftFloat::zero(sign);
    }

    // Normalize so the leading 1 sits at bit FRAC + GUARD_BITS, rebasing the
    // exponent from the caller's fractional width as we go.
    let target = FRAC + GUARD_BITS;
    let lead = 127 - sig.leading_zeros();
    let mut exp = exp - frac_bits as i32 + lead as i32;
    if lead > target {
        let shift = lead - target;
        sticky |= sig & ((1 << shift) - 1) != 0;
        sig >>= shift;
    } else {
        sig <<= target - lead;
    }

    // Pre-round subnormal handling: shift the significand right until the
    // exponent reaches the minimum, collecting everything lost into sticky.
    let bias = SoftFloat::<EXP, FRAC>::BIAS;
    if exp < 1 - bias {
        let shift = (1 - bias - exp) as u32;
        if shift >= 128 {
            sticky |= sig != 0;
            sig = 0;
        } else {
            sticky |= sig & ((1 << shift) - 1) != 0;
            sig >>= shift;
        }
        exp = 1 - bias;
    }

    let guard = sig & ((1 << GUARD_BITS) - 1);
    let mut kept = (sig >> GUARD_BITS) as u64;
    let inexact = guard != 0 || sticky;
    let half = 1 << (GUARD_BITS - 1);
    let increment = match round {
        Rounding::NearestEven => {
            guard > half || (guard == half && (sticky || kept & 1 != 0))
        }
        Rounding::TowardZero => false,
        Rounding::Down => sign && inexact,
        Rounding::Up => !sign && inexact,
        Rounding::MaxMagnitude => guard >= half,
    };
    if increment {
        kept += 1;
        if kept == 1 << (FRAC + 1) {
            kept >>= 1;
            exp += 1;
        }
    }

    // A subnormal that rounded up into the normal range is no longer tiny.
    let tiny = kept < (1 << FRAC);

    if exp + bias >= SoftFloat::<EXP, FRAC>::EXP_MAX as i32 && kept >= (1 << FRAC) {
        flags.raise(FpFlags::OVERFLOW);
        flags.raise(FpFlags::INEXACT);
        let to_infinity = match round {
            Rounding::NearestEven | Rounding::MaxMagnitude => true,
            Rounding::TowardZero => false,
            Rounding::Down => sign,
            Rounding::Up => !sign,
        };
        return if to_infinity {
            SoftFloat::infinity(sign)
        } else {
            SoftFloat::max_finite(sign)
        };
    }

    if inexact {
        flags.raise(FpFlags::INEXACT);
        if tiny {
            flags.raise(FpFlags::UNDERFLOW);
        }
    }

    let mut result = SoftFloat::zero(sign);
    if tiny {
        result.set_field(kept);
    } else {
        result.set_exponent((exp + bias) as u64);
        result.set_field(kept & ((1 << FRAC) - 1));
    }
    result
}

impl<const EXP: u32, const FRAC: u32> SoftFloat<EXP, FRAC> {
    /// Propagates NaN inputs: returns the canonical quiet NaN and raises
    /// Invalid if either operand signals.
    fn propagate_nan(flags: &mut FpFlags, a: Self, b: Self) -> Self {
        if a.is_signaling_nan() || b.is_signaling_nan() {
            flags.raise(FpFlags::INVALID);
        }
        Self::quiet_nan()
    }

    /// Adds two values.
    pub fn add(flags: &mut FpFlags, round: Rounding, a: Self, b: Self) -> Self {
        if a.is_nan() || b.is_nan() {
            return Self::propagate_nan(flags, a, b);
        }
        if a.is_infinite() || b.is_infinite() {
            if a.is_infinite() && b.is_infinite() && a.sign() != b.sign() {
                flags.raise(FpFlags::INVALID);
                return Self::quiet_nan();
            }
            return Self::infinity(if a.is_infinite() { a.sign() } else { b.sign() });
        }
        if a.is_zero() && b.is_zero() {
            // Equal signs keep the sign; opposite signs give +0 except when
            // rounding down.
            if a.sign() == b.sign() {
                return Self::zero(a.sign());
            }
            return Self::zero(round == Rounding::Down);
        }
        if a.is_zero() {
            return b;
        }
        if b.is_zero() {
            return a;
        }

        let (exp_a, sig_a) = a.unpack();
        let (exp_b, sig_b) = b.unpack();
        // Keep the larger-exponent operand on the left so alignment only
        // ever shifts the right significand down.
        let (exp_hi, sig_hi, sign_hi, exp_lo, sig_lo, sign_lo) =
            if exp_a > exp_b || (exp_a == exp_b && sig_a >= sig_b) {
                (exp_a, sig_a, a.sign(), exp_b, sig_b, b.sign())
            } else {
                (exp_b, sig_b, b.sign(), exp_a, sig_a, a.sign())
            };

        let mut hi = u128::from(sig_hi) << GUARD_BITS;
        let mut lo = u128::from(sig_lo) << GUARD_BITS;
        let mut sticky = false;
        let align = (exp_hi - exp_lo) as u32;
        if align >= 128 {
            sticky = lo != 0;
            lo = 0;
        } else if align > 0 {
            sticky = lo & ((1 << align) - 1) != 0;
            lo >>= align;
        }

        let (sum, sign) = if sign_hi == sign_lo {
            (hi + lo, sign_hi)
        } else {
            // Sticky residue borrows from the low end of the subtraction.
            if sticky {
                hi -= 1;
            }
            (hi - lo, sign_hi)
        };

        if sum == 0 && !sticky {
            return Self::zero(round == Rounding::Down);
        }
        round_pack(flags, round, sign, exp_hi, sum, FRAC + GUARD_BITS, sticky)
    }

    /// Subtracts `b` from `a`.
    pub fn sub(flags: &mut FpFlags, round: Rounding, a: Self, b: Self) -> Self {
        let mut negated = b;
        if !b.is_nan() {
            negated.negate();
        }
        Self::add(flags, round, a, negated)
    }

    /// Multiplies two values.
    pub fn mul(flags: &mut FpFlags, round: Rounding, a: Self, b: Self) -> Self {
        let sign = a.sign() != b.sign();
        if a.is_nan() || b.is_nan() {
            return Self::propagate_nan(flags, a, b);
        }
        if a.is_infinite() || b.is_infinite() {
            if a.is_zero() || b.is_zero() {
                flags.raise(FpFlags::INVALID);
                return Self::quiet_nan();
            }
            return Self::infinity(sign);
        }
        if a.is_zero() || b.is_zero() {
            return Self::zero(sign);
        }

        let (exp_a, sig_a) = a.unpack();
        let (exp_b, sig_b) = b.unpack();
        let product = u128::from(sig_a) * u128::from(sig_b);
        round_pack(flags, round, sign, exp_a + exp_b, product, 2 * FRAC, false)
    }

    /// Divides `a` by `b`.
    pub fn div(flags: &mut FpFlags, round: Rounding, a: Self, b: Self) -> Self {
        let sign = a.sign() != b.sign();
        if a.is_nan() || b.is_nan() {
            return Self::propagate_nan(flags, a, b);
        }
        if a.is_infinite() {
            if b.is_infinite() {
                flags.raise(FpFlags::INVALID);
                return Self::quiet_nan();
            }
            return Self::infinity(sign);
        }
        if b.is_infinite() {
            return Self::zero(sign);
        }
        if b.is_zero() {
            if a.is_zero() {
                flags.raise(FpFlags::INVALID);
                return Self::quiet_nan();
            }
            flags.raise(FpFlags::DIVIDE_BY_ZERO);
            return Self::infinity(sign);
        }
        if a.is_zero() {
            return Self::zero(sign);
        }

        let (exp_a, sig_a) = a.unpack();
        let (exp_b, sig_b) = b.unpack();
        // Scale the dividend so the quotient keeps FRAC + GUARD_BITS + 1
        // significant bits; the quotient then carries `scale` fractional
        // bits and the remainder folds into sticky.
        let scale = FRAC + GUARD_BITS + 1;
        let dividend = u128::from(sig_a) << scale;
        let divisor = u128::from(sig_b);
        let quotient = dividend / divisor;
        let sticky = dividend % divisor != 0;
        round_pack(
            flags,
            round,
            sign,
            exp_a - exp_b,
            quotient,
            scale,
            sticky,
        )
    }

    /// Square root, computed digit by digit over the integer significand.
    pub fn sqrt(flags: &mut FpFlags, round: Rounding, a: Self) -> Self {
        if a.is_nan() {
            if a.is_signaling_nan() {
                flags.raise(FpFlags::INVALID);
            }
            return Self::quiet_nan();
        }
        if a.is_zero() {
            return Self::zero(a.sign());
        }
        if a.sign() {
            flags.raise(FpFlags::INVALID);
            return Self::quiet_nan();
        }
        if a.is_infinite() {
            return Self::infinity(false);
        }

        let (exp, sig) = a.unpack();
        // Express the value as radicand * 4^half so the root is
        // isqrt(radicand) * 2^half; widen the radicand enough that the
        // integer root keeps FRAC + GUARD_BITS + 2 significant bits.
        let mut shift = FRAC + 2 * GUARD_BITS + 2;
        if (exp - FRAC as i32 - shift as i32).rem_euclid(2) != 0 {
            shift += 1;
        }
        let radicand = u128::from(sig) << shift;
        let half = (exp - FRAC as i32 - shift as i32) / 2;
        let root = isqrt(radicand);
        let sticky = root * root != radicand;
        round_pack(flags, round, false, half, root, 0, sticky)
    }
}

/// Integer square root by binary digit recurrence: largest `r` with
/// `r * r <= n`.
fn isqrt(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }
    let mut remainder = n;
    let mut result: u128 = 0;
    let mut bit: u128 = 1 << ((127 - n.leading_zeros()) & !1);
    while bit != 0 {
        if remainder >= result + bit {
            remainder -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }
    result
}
