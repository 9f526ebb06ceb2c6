//! Value objects: `Money`, `ExchangeRate`, `OrderBounds`, `ToleranceWindow`.
//!
//! Consolidated into one file the way the source repo keeps its closely
//! related domain structs together (see `types.rs` in the teacher repo) —
//! these four types are always reasoned about as a group.

use std::cmp::Ordering;

use bigdecimal::{BigDecimal, Zero};

use crate::decimal::{self, CANONICAL_SCALE};
use crate::error::{CoreError, CoreResult};

/// Validates a currency code: 3-12 uppercase ASCII letters after trimming.
pub fn validate_currency_code(raw: &str) -> CoreResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_input("currency code is empty"));
    }
    let len = trimmed.len();
    if !(3..=12).contains(&len) || !trimmed.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(CoreError::invalid_input(format!(
            "currency code '{trimmed}' must be 3-12 uppercase letters"
        )));
    }
    Ok(trimmed.to_string())
}

/// A non-negative fixed-point amount in a named currency, normalized to
/// exactly `scale` fractional digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    currency: String,
    amount: BigDecimal,
    scale: i64,
}

impl Money {
    pub fn new(currency: &str, amount: BigDecimal, scale: i64) -> CoreResult<Self> {
        let currency = validate_currency_code(currency)?;
        if amount < BigDecimal::zero() {
            return Err(CoreError::invalid_input("Money amount must be non-negative"));
        }
        let amount = decimal::normalize(&amount, scale)?;
        Ok(Self {
            currency,
            amount,
            scale,
        })
    }

    pub fn zero(currency: &str, scale: i64) -> CoreResult<Self> {
        Self::new(currency, BigDecimal::zero(), scale)
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    fn require_same_currency(&self, other: &Money) -> CoreResult<()> {
        if self.currency != other.currency {
            return Err(CoreError::invalid_input(format!(
                "currency mismatch: {} vs {}",
                self.currency, other.currency
            )));
        }
        Ok(())
    }

    pub fn add(&self, other: &Money) -> CoreResult<Money> {
        self.require_same_currency(other)?;
        let scale = self.scale.max(other.scale);
        let amount = decimal::add(&self.amount, &other.amount, scale)?;
        Money::new(&self.currency, amount, scale)
    }

    pub fn subtract(&self, other: &Money) -> CoreResult<Money> {
        self.require_same_currency(other)?;
        let scale = self.scale.max(other.scale);
        let amount = decimal::sub(&self.amount, &other.amount, scale)?;
        Money::new(&self.currency, amount, scale)
    }

    /// Multiplies by a scalar/decimal factor. The result carries `scale`
    /// when given, otherwise this Money's own scale.
    pub fn multiply(&self, factor: &BigDecimal, scale: Option<i64>) -> CoreResult<Money> {
        let scale = scale.unwrap_or(self.scale);
        let amount = decimal::mul(&self.amount, factor, scale)?;
        Money::new(&self.currency, amount, scale)
    }

    pub fn divide(&self, divisor: &BigDecimal, scale: Option<i64>) -> CoreResult<Money> {
        let scale = scale.unwrap_or(self.scale);
        let amount = decimal::div(&self.amount, divisor, scale)?;
        Money::new(&self.currency, amount, scale)
    }

    pub fn compare(&self, other: &Money) -> CoreResult<Ordering> {
        self.require_same_currency(other)?;
        let scale = decimal::scale_for_comparison(self.scale, other.scale, CANONICAL_SCALE);
        decimal::compare(&self.amount, &other.amount, scale)
    }

    pub fn greater_than(&self, other: &Money) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn less_than(&self, other: &Money) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    /// Numeric equality at the greater of the two scales. Returns `false`
    /// (never an error) for mismatched currencies.
    pub fn equals(&self, other: &Money) -> bool {
        match self.compare(other) {
            Ok(ord) => ord == Ordering::Equal,
            Err(_) => false,
        }
    }

    pub fn with_scale(&self, scale: i64) -> CoreResult<Money> {
        if scale == self.scale {
            return Ok(self.clone());
        }
        Money::new(&self.currency, self.amount.clone(), scale)
    }
}

/// A directional conversion rate between two distinct currencies.
#[derive(Debug, Clone)]
pub struct ExchangeRate {
    base: String,
    quote: String,
    rate: BigDecimal,
    scale: i64,
}

impl ExchangeRate {
    pub fn new(base: &str, quote: &str, rate: BigDecimal, scale: i64) -> CoreResult<Self> {
        let base = validate_currency_code(base)?;
        let quote = validate_currency_code(quote)?;
        if base == quote {
            return Err(CoreError::invalid_input(
                "ExchangeRate base and quote currencies must differ",
            ));
        }
        decimal::validate_scale(scale)?;
        if rate <= BigDecimal::zero() {
            return Err(CoreError::invalid_input("ExchangeRate rate must be positive"));
        }
        let rate = decimal::normalize(&rate, scale)?;
        Ok(Self {
            base,
            quote,
            rate,
            scale,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn rate(&self) -> &BigDecimal {
        &self.rate
    }

    /// Converts `money` (which must be denominated in `base`) into the
    /// `quote` currency at the given scale (defaults to `CANONICAL_SCALE`).
    pub fn convert(&self, money: &Money, scale: Option<i64>) -> CoreResult<Money> {
        if money.currency() != self.base {
            return Err(CoreError::invalid_input(format!(
                "ExchangeRate base {} does not match Money currency {}",
                self.base,
                money.currency()
            )));
        }
        let scale = scale.unwrap_or(CANONICAL_SCALE);
        let amount = decimal::mul(money.amount(), &self.rate, scale)?;
        Money::new(&self.quote, amount, scale)
    }

    /// Returns the reciprocal rate, quote -> base, at this rate's own scale.
    pub fn invert(&self) -> CoreResult<ExchangeRate> {
        let one = BigDecimal::from(1);
        let reciprocal = decimal::div(&one, &self.rate, self.scale)?;
        ExchangeRate::new(&self.quote, &self.base, reciprocal, self.scale)
    }
}

/// An inclusive `[min, max]` range of `Money` in a single currency.
#[derive(Debug, Clone)]
pub struct OrderBounds {
    min: Money,
    max: Money,
}

impl OrderBounds {
    pub fn from(min: Money, max: Money) -> CoreResult<Self> {
        min.require_same_currency(&max)?;
        if min.greater_than(&max)? {
            return Err(CoreError::invalid_input(
                "OrderBounds min must not exceed max",
            ));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> &Money {
        &self.min
    }

    pub fn max(&self) -> &Money {
        &self.max
    }

    pub fn contains(&self, x: &Money) -> CoreResult<bool> {
        Ok(!x.less_than(&self.min)? && !x.greater_than(&self.max)?)
    }

    pub fn clamp(&self, x: &Money) -> CoreResult<Money> {
        if x.less_than(&self.min)? {
            Ok(self.min.clone())
        } else if x.greater_than(&self.max)? {
            Ok(self.max.clone())
        } else {
            Ok(x.clone())
        }
    }
}

/// Where a `ToleranceWindow`'s heuristic tolerance figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceOrigin {
    Under,
    Over,
    Shared,
}

/// An asymmetric acceptance band around a requested spend amount, each side
/// in `[0, 1)` at the canonical scale.
#[derive(Debug, Clone)]
pub struct ToleranceWindow {
    under_min: BigDecimal,
    over_max: BigDecimal,
    heuristic: BigDecimal,
    origin: ToleranceOrigin,
}

impl ToleranceWindow {
    pub fn from(under_min: BigDecimal, over_max: BigDecimal) -> CoreResult<Self> {
        let under_min = decimal::normalize(&under_min, CANONICAL_SCALE)?;
        let over_max = decimal::normalize(&over_max, CANONICAL_SCALE)?;
        let one = BigDecimal::from(1);
        for (label, v) in [("underMin", &under_min), ("overMax", &over_max)] {
            if *v < BigDecimal::zero() || *v >= one {
                return Err(CoreError::invalid_input(format!(
                    "ToleranceWindow {label} must be in [0, 1), got {v}"
                )));
            }
        }
        let (heuristic, origin) = match under_min.cmp(&over_max) {
            Ordering::Greater => (under_min.clone(), ToleranceOrigin::Under),
            Ordering::Less => (over_max.clone(), ToleranceOrigin::Over),
            Ordering::Equal => (under_min.clone(), ToleranceOrigin::Shared),
        };
        Ok(Self {
            under_min,
            over_max,
            heuristic,
            origin,
        })
    }

    pub fn under_min(&self) -> &BigDecimal {
        &self.under_min
    }

    pub fn over_max(&self) -> &BigDecimal {
        &self.over_max
    }

    pub fn heuristic_tolerance(&self) -> &BigDecimal {
        &self.heuristic
    }

    pub fn heuristic_origin(&self) -> ToleranceOrigin {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::bd;

    fn money(cur: &str, amt: &str, scale: i64) -> Money {
        Money::new(cur, bd(amt), scale).unwrap()
    }

    #[test]
    fn with_scale_round_trips_to_an_equal_value() {
        let m = money("USD", "12.34", 2);
        let rescaled = m.with_scale(6).unwrap().with_scale(2).unwrap();
        assert!(m.equals(&rescaled));
    }

    #[test]
    fn rejects_negative_amount() {
        assert!(Money::new("USD", bd("-1"), 2).is_err());
    }

    #[test]
    fn add_requires_matching_currency() {
        let a = money("USD", "1", 2);
        let b = money("EUR", "1", 2);
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn exchange_rate_invert_then_convert_round_trips() {
        let rate = ExchangeRate::new("USD", "EUR", bd("0.9"), 18).unwrap();
        let inverted = rate.invert().unwrap();
        let usd = money("USD", "100", 2);
        let eur = rate.convert(&usd, Some(18)).unwrap();
        let back = inverted.convert(&eur, Some(18)).unwrap();
        // allow 1 ULP at scale 18 from the reciprocal rounding
        let diff = back.amount() - usd.with_scale(18).unwrap().amount();
        assert!(diff.abs() <= bd("0.000000000000000002"));
    }

    #[test]
    fn order_bounds_rejects_inverted_range() {
        let min = money("USD", "10", 2);
        let max = money("USD", "5", 2);
        assert!(OrderBounds::from(min, max).is_err());
    }

    #[test]
    fn order_bounds_clamp() {
        let bounds = OrderBounds::from(money("USD", "10", 2), money("USD", "100", 2)).unwrap();
        assert!(bounds.clamp(&money("USD", "5", 2)).unwrap().equals(&money("USD", "10", 2)));
        assert!(bounds
            .clamp(&money("USD", "500", 2))
            .unwrap()
            .equals(&money("USD", "100", 2)));
    }

    #[test]
    fn tolerance_window_rejects_values_at_or_above_one() {
        assert!(ToleranceWindow::from(bd("1"), bd("0")).is_err());
        assert!(ToleranceWindow::from(bd("0"), bd("1.5")).is_err());
    }

    #[test]
    fn tolerance_window_heuristic_picks_larger_side() {
        let w = ToleranceWindow::from(bd("0.02"), bd("0.05")).unwrap();
        assert_eq!(w.heuristic_tolerance(), &bd("0.050000000000000000"));
        assert_eq!(w.heuristic_origin(), ToleranceOrigin::Over);
    }
}
