//! Softfloat tests against host floating point.
//!
//! The host's IEEE-754 unit provides the reference bit patterns for
//! round-to-nearest results; directed-rounding and flag behavior are
//! checked structurally.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use rvemu_core::softfloat::{F32, F64, FpFlags, FpOrdering, Rounding};

fn host32(value: f32) -> F32 {
    F32::from_raw(u64::from(value.to_bits()))
}

fn host64(value: f64) -> F64 {
    F64::from_raw(value.to_bits())
}

proptest! {
    /// Addition of finite doubles matches the host bit for bit.
    #[test]
    fn f64_add_matches_host(a in -1e300f64..1e300, b in -1e300f64..1e300) {
        let mut flags = FpFlags::default();
        let sum = F64::add(&mut flags, Rounding::NearestEven, host64(a), host64(b));
        prop_assert_eq!(sum.raw, (a + b).to_bits());
    }

    /// Multiplication of moderate singles matches the host.
    #[test]
    fn f32_mul_matches_host(a in -1e18f32..1e18, b in -1e18f32..1e18) {
        let mut flags = FpFlags::default();
        let product = F32::mul(&mut flags, Rounding::NearestEven, host32(a), host32(b));
        prop_assert_eq!(product.raw, u64::from((a * b).to_bits()));
    }

    /// Division matches the host, including the subnormal range.
    #[test]
    fn f64_div_matches_host(a in -1e30f64..1e30, b in prop_oneof![-1e30f64..-1e-30, 1e-30f64..1e30]) {
        let mut flags = FpFlags::default();
        let quotient = F64::div(&mut flags, Rounding::NearestEven, host64(a), host64(b));
        prop_assert_eq!(quotient.raw, (a / b).to_bits());
    }

    /// Square root of non-negative doubles matches the host.
    #[test]
    fn f64_sqrt_matches_host(a in 0f64..1e300) {
        let mut flags = FpFlags::default();
        let root = F64::sqrt(&mut flags, Rounding::NearestEven, host64(a));
        prop_assert_eq!(root.raw, a.sqrt().to_bits());
    }

    /// Signed 64-bit integers convert exactly when representable.
    #[test]
    fn i64_round_trips_through_f64(value in -(1i64 << 52)..(1i64 << 52)) {
        let mut flags = FpFlags::default();
        let converted = F64::from_signed(&mut flags, Rounding::NearestEven, value);
        let back = converted.to_signed(&mut flags, Rounding::TowardZero, 64);
        prop_assert_eq!(back, value);
        prop_assert_eq!(flags.0, 0);
    }
}

#[rstest]
#[case(12.0)]
#[case(-0.5)]
#[case(f64::from(f32::MAX))]
#[case(1e-40)]
fn f64_to_f32_matches_host(#[case] value: f64) {
    let mut flags = FpFlags::default();
    let narrowed = F32::convert_from(&mut flags, Rounding::NearestEven, host64(value));
    assert_eq!(narrowed.raw, u64::from((value as f32).to_bits()));
}

#[test]
fn f32_to_f64_is_exact() {
    let mut flags = FpFlags::default();
    let widened = F64::convert_from(&mut flags, Rounding::NearestEven, host32(12.0));
    assert_eq!(widened.raw, 12.0f64.to_bits());
    assert_eq!(flags.0, 0);
}

#[test]
fn zeros_of_either_sign_compare_equal() {
    let mut flags = FpFlags::default();
    let pos = host64(0.0);
    let neg = host64(-0.0);
    assert_eq!(F64::compare::<false>(&mut flags, pos, neg), FpOrdering::Equal);
    assert_eq!(F64::compare::<true>(&mut flags, neg, pos), FpOrdering::Equal);
    assert_eq!(flags.0, 0);
}

#[test]
fn quiet_comparison_ignores_quiet_nan() {
    let mut flags = FpFlags::default();
    let ordering = F64::compare::<false>(&mut flags, F64::quiet_nan(), host64(1.0));
    assert_eq!(ordering, FpOrdering::Unordered);
    assert!(!flags.is_set(FpFlags::INVALID));
}

#[test]
fn signaling_comparison_raises_invalid_on_any_nan() {
    let mut flags = FpFlags::default();
    let ordering = F64::compare::<true>(&mut flags, F64::quiet_nan(), host64(1.0));
    assert_eq!(ordering, FpOrdering::Unordered);
    assert!(flags.is_set(FpFlags::INVALID));
}

#[test]
fn directed_rounding_brackets_the_quotient() {
    // 1/3 is inexact; rounding down and up must differ by one ulp.
    let one = host64(1.0);
    let three = host64(3.0);
    let mut flags = FpFlags::default();
    let down = F64::div(&mut flags, Rounding::Down, one, three);
    let up = F64::div(&mut flags, Rounding::Up, one, three);
    assert_eq!(up.raw, down.raw + 1);
    assert!(flags.is_set(FpFlags::INEXACT));
}

#[test]
fn conversion_saturates_and_raises_invalid() {
    let mut flags = FpFlags::default();
    let huge = host64(1e300);
    assert_eq!(huge.to_signed(&mut flags, Rounding::TowardZero, 32), i64::from(i32::MAX));
    let mut flags = FpFlags::default();
    let negative = host64(-2.0);
    assert_eq!(negative.to_unsigned(&mut flags, Rounding::TowardZero, 64), 0);
}
