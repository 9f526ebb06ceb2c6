//! Orders and the order book: the immutable snapshot a single query searches.

pub mod fee;

use std::sync::Arc;

use crate::error::CoreResult;
use crate::value::{ExchangeRate, OrderBounds};

pub use fee::{FeeHook, FeeMap, FeePolicy, FeeTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct AssetPair {
    pub base: String,
    pub quote: String,
}

/// A stable identity for an `Order`, assigned by its position in the
/// `OrderBook` that owns it. Two `Order`s are equal iff their ids match —
/// never by structural comparison of rate/bounds/fee policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub usize);

#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    side: OrderSide,
    pair: AssetPair,
    bounds: OrderBounds,
    rate: ExchangeRate,
    fee_policy: FeePolicy,
}

impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn pair(&self) -> &AssetPair {
        &self.pair
    }

    pub fn bounds(&self) -> &OrderBounds {
        &self.bounds
    }

    pub fn effective_rate(&self) -> &ExchangeRate {
        &self.rate
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fee_policy
    }
}

/// Fields needed to describe an order before it's assigned an id by the
/// `OrderBook` that holds it.
pub struct OrderSpec {
    pub side: OrderSide,
    pub pair: AssetPair,
    pub bounds: OrderBounds,
    pub rate: ExchangeRate,
    pub fee_policy: FeePolicy,
}

/// An immutable, ordered sequence of orders — a single query's snapshot.
/// Orders are held behind `Arc` so that graph edges built from the same
/// order can share its identity by reference, per the graph invariant
/// that edges originating from one order carry the same underlying
/// reference rather than a structural copy.
#[derive(Debug, Clone)]
pub struct OrderBook {
    orders: Vec<Arc<Order>>,
}

impl OrderBook {
    pub fn new(specs: Vec<OrderSpec>) -> CoreResult<Self> {
        let orders = specs
            .into_iter()
            .enumerate()
            .map(|(idx, spec)| {
                if spec.pair.base != spec.rate.base() || spec.pair.quote != spec.rate.quote() {
                    return Err(crate::error::CoreError::invalid_input(
                        "order's asset pair must match its exchange rate's currencies",
                    ));
                }
                if spec.bounds.min().currency() != spec.pair.base {
                    return Err(crate::error::CoreError::invalid_input(
                        "order bounds must be denominated in the pair's base currency",
                    ));
                }
                Ok(Arc::new(Order {
                    id: OrderId(idx),
                    side: spec.side,
                    pair: spec.pair,
                    bounds: spec.bounds,
                    rate: spec.rate,
                    fee_policy: spec.fee_policy,
                }))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { orders })
    }

    pub fn orders(&self) -> &[Arc<Order>] {
        &self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::bd;
    use crate::value::Money;

    fn sample_order() -> OrderSpec {
        OrderSpec {
            side: OrderSide::Buy,
            pair: AssetPair {
                base: "USD".into(),
                quote: "EUR".into(),
            },
            bounds: OrderBounds::from(
                Money::new("USD", bd("10"), 2).unwrap(),
                Money::new("USD", bd("1000"), 2).unwrap(),
            )
            .unwrap(),
            rate: ExchangeRate::new("USD", "EUR", bd("0.9"), 18).unwrap(),
            fee_policy: FeePolicy::None,
        }
    }

    #[test]
    fn identity_is_positional_not_structural() {
        let book = OrderBook::new(vec![sample_order(), sample_order()]).unwrap();
        let orders = book.orders();
        assert_ne!(orders[0].id(), orders[1].id());
    }

    #[test]
    fn rejects_pair_rate_mismatch() {
        let mut spec = sample_order();
        spec.rate = ExchangeRate::new("USD", "GBP", bd("0.8"), 18).unwrap();
        assert!(OrderBook::new(vec![spec]).is_err());
    }
}
