//! Fee policies: a pure function of (side, base amount, quote amount) to a
//! map of fees by currency.
//!
//! Modeled as a sum type over built-in variants plus a user-supplied hook,
//! rather than a trait-object hierarchy, per the flat tagged-union style
//! used for `DexType` and `Policy`-like enums in the wider pack (see
//! `06813c23_cowprotocol-services__...fee-mod.rs.rs`'s `Policy` enum).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::error::CoreResult;
use crate::value::Money;

use super::OrderSide;

/// Fees keyed by currency code. A `BTreeMap` keeps iteration order
/// deterministic (sorted by currency) for byte-identical fee breakdowns.
pub type FeeMap = BTreeMap<String, Money>;

pub trait FeeHook: Send + Sync {
    fn compute(&self, side: OrderSide, base_amount: &Money, quote_amount: &Money) -> CoreResult<FeeMap>;
}

#[derive(Debug, Clone)]
pub struct FeeTier {
    /// Fee applies once `base_amount` meets or exceeds this threshold.
    pub threshold: Money,
    pub base_bps: BigDecimal,
    pub quote_bps: BigDecimal,
}

#[derive(Clone)]
pub enum FeePolicy {
    None,
    Fixed {
        base_fee: Option<Money>,
        quote_fee: Option<Money>,
    },
    Percentage {
        base_bps: BigDecimal,
        quote_bps: BigDecimal,
    },
    Tiered {
        tiers: Vec<FeeTier>,
    },
    MakerTaker {
        maker_bps: BigDecimal,
        taker_bps: BigDecimal,
        is_maker: bool,
    },
    Custom(Arc<dyn FeeHook>),
}

impl fmt::Debug for FeePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeePolicy::None => write!(f, "FeePolicy::None"),
            FeePolicy::Fixed { .. } => write!(f, "FeePolicy::Fixed"),
            FeePolicy::Percentage { .. } => write!(f, "FeePolicy::Percentage"),
            FeePolicy::Tiered { .. } => write!(f, "FeePolicy::Tiered"),
            FeePolicy::MakerTaker { .. } => write!(f, "FeePolicy::MakerTaker"),
            FeePolicy::Custom(_) => write!(f, "FeePolicy::Custom"),
        }
    }
}

impl FeePolicy {
    pub fn apply(
        &self,
        side: OrderSide,
        base_amount: &Money,
        quote_amount: &Money,
    ) -> CoreResult<FeeMap> {
        match self {
            FeePolicy::None => Ok(FeeMap::new()),
            FeePolicy::Fixed {
                base_fee,
                quote_fee,
            } => {
                let mut fees = FeeMap::new();
                if let Some(f) = base_fee {
                    fees.insert(f.currency().to_string(), f.clone());
                }
                if let Some(f) = quote_fee {
                    fees.insert(f.currency().to_string(), f.clone());
                }
                Ok(fees)
            }
            FeePolicy::Percentage {
                base_bps,
                quote_bps,
            } => percentage_fees(base_amount, quote_amount, base_bps, quote_bps),
            FeePolicy::Tiered { tiers } => {
                let tier = tiers
                    .iter()
                    .filter(|t| base_amount.compare(&t.threshold).map(|o| o != std::cmp::Ordering::Less).unwrap_or(false))
                    .last();
                match tier {
                    Some(t) => percentage_fees(base_amount, quote_amount, &t.base_bps, &t.quote_bps),
                    None => Ok(FeeMap::new()),
                }
            }
            FeePolicy::MakerTaker {
                maker_bps,
                taker_bps,
                is_maker,
            } => {
                let bps = if *is_maker { maker_bps } else { taker_bps };
                percentage_fees(base_amount, quote_amount, bps, bps)
            }
            FeePolicy::Custom(hook) => hook.compute(side, base_amount, quote_amount),
        }
    }
}

fn percentage_fees(
    base_amount: &Money,
    quote_amount: &Money,
    base_bps: &BigDecimal,
    quote_bps: &BigDecimal,
) -> CoreResult<FeeMap> {
    let mut fees = FeeMap::new();
    let base_fee = base_amount.multiply(base_bps, None)?;
    if !base_fee.is_zero() {
        fees.insert(base_fee.currency().to_string(), base_fee);
    }
    let quote_fee = quote_amount.multiply(quote_bps, None)?;
    if !quote_fee.is_zero() {
        fees.insert(quote_fee.currency().to_string(), quote_fee);
    }
    Ok(fees)
}
