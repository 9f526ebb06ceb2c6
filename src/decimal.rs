//! Exact fixed-point decimal primitives.
//!
//! Every result-affecting value in this crate is a `BigDecimal` rescaled
//! through these helpers. No binary floating point ever reaches a
//! comparison or arithmetic operation that influences which execution plan
//! gets returned. Rounding is always HALF_UP (ties away from zero), matching
//! `bigdecimal::RoundingMode::HalfUp`.

use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Zero};

use crate::error::{CoreError, CoreResult};

/// Internal working scale used whenever an operation doesn't have a more
/// specific scale to target (e.g. cumulative rate products during search).
pub const CANONICAL_SCALE: i64 = 18;

/// Upper bound on any scale a caller may request.
pub const MAX_SCALE: i64 = 50;

pub fn validate_scale(scale: i64) -> CoreResult<()> {
    if !(0..=MAX_SCALE).contains(&scale) {
        return Err(CoreError::invalid_input(format!(
            "scale {scale} out of bounds [0, {MAX_SCALE}]"
        )));
    }
    Ok(())
}

/// Rescale `value` to exactly `scale` fractional digits, rounding HALF_UP.
pub fn normalize(value: &BigDecimal, scale: i64) -> CoreResult<BigDecimal> {
    validate_scale(scale)?;
    Ok(value.with_scale_round(scale, RoundingMode::HalfUp))
}

pub fn add(left: &BigDecimal, right: &BigDecimal, scale: i64) -> CoreResult<BigDecimal> {
    validate_scale(scale)?;
    Ok((left + right).with_scale_round(scale, RoundingMode::HalfUp))
}

pub fn sub(left: &BigDecimal, right: &BigDecimal, scale: i64) -> CoreResult<BigDecimal> {
    validate_scale(scale)?;
    Ok((left - right).with_scale_round(scale, RoundingMode::HalfUp))
}

pub fn mul(left: &BigDecimal, right: &BigDecimal, scale: i64) -> CoreResult<BigDecimal> {
    validate_scale(scale)?;
    Ok((left * right).with_scale_round(scale, RoundingMode::HalfUp))
}

/// Divides `left` by `right`. A zero divisor is a precision violation, not
/// an invalid-input — it signals the caller asked for an operation that
/// cannot be represented, not merely out-of-range input.
pub fn div(left: &BigDecimal, right: &BigDecimal, scale: i64) -> CoreResult<BigDecimal> {
    validate_scale(scale)?;
    if right.is_zero() {
        return Err(CoreError::precision_violation("division by zero"));
    }
    Ok((left / right).with_scale_round(scale, RoundingMode::HalfUp))
}

pub fn compare(left: &BigDecimal, right: &BigDecimal, scale: i64) -> CoreResult<Ordering> {
    validate_scale(scale)?;
    let l = left.with_scale_round(scale, RoundingMode::HalfUp);
    let r = right.with_scale_round(scale, RoundingMode::HalfUp);
    Ok(l.cmp(&r))
}

/// Validates that every string in `values` parses as a decimal number.
pub fn ensure_numeric(values: &[&str]) -> CoreResult<()> {
    for v in values {
        BigDecimal::from_str(v)
            .map_err(|_| CoreError::precision_violation(format!("not numeric: {v}")))?;
    }
    Ok(())
}

/// Picks a comparison scale from two operand scales, falling back to
/// `fallback` only when both operands carry no scale information (0).
pub fn scale_for_comparison(a: i64, b: i64, fallback: i64) -> i64 {
    if a == 0 && b == 0 {
        fallback
    } else {
        a.max(b)
    }
}

#[cfg(test)]
pub(crate) fn bd(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_up_rounds_ties_away_from_zero() {
        assert_eq!(normalize(&bd("0.5"), 0).unwrap(), bd("1"));
        assert_eq!(normalize(&bd("-0.5"), 0).unwrap(), bd("-1"));
        assert_eq!(normalize(&bd("1.005"), 2).unwrap(), bd("1.01"));
    }

    #[test]
    fn div_by_zero_is_precision_violation() {
        let err = div(&bd("1"), &bd("0"), 4).unwrap_err();
        assert!(matches!(err, CoreError::PrecisionViolation { .. }));
    }

    #[test]
    fn scale_out_of_bounds_rejected() {
        assert!(normalize(&bd("1"), 51).is_err());
        assert!(normalize(&bd("1"), -1).is_err());
    }

    #[test]
    fn scale_for_comparison_prefers_larger_operand_scale() {
        assert_eq!(scale_for_comparison(2, 4, 18), 4);
        assert_eq!(scale_for_comparison(0, 0, 18), 18);
    }
}
