//! Order filters: pluggable predicates that prune an `OrderBook` before
//! graph construction. Built-ins plus a user-supplied hook, same tagged
//! sum-type style as `FeePolicy`.

use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::BigDecimal;

use crate::order::{Order, OrderId};

#[derive(Clone)]
pub enum OrderFilter {
    MinSpread(BigDecimal),
    AllowedCurrencies(HashSet<String>),
    ExcludeOrders(HashSet<OrderId>),
    Custom(Arc<dyn Fn(&Order) -> bool + Send + Sync>),
}

impl std::fmt::Debug for OrderFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderFilter::MinSpread(s) => write!(f, "OrderFilter::MinSpread({s})"),
            OrderFilter::AllowedCurrencies(c) => write!(f, "OrderFilter::AllowedCurrencies({c:?})"),
            OrderFilter::ExcludeOrders(ids) => write!(f, "OrderFilter::ExcludeOrders({ids:?})"),
            OrderFilter::Custom(_) => write!(f, "OrderFilter::Custom"),
        }
    }
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            OrderFilter::MinSpread(min) => {
                let one = BigDecimal::from(1);
                let implied_spread = &one - order.effective_rate().rate();
                implied_spread.abs() >= *min
            }
            OrderFilter::AllowedCurrencies(allowed) => {
                allowed.contains(&order.pair().base) && allowed.contains(&order.pair().quote)
            }
            OrderFilter::ExcludeOrders(excluded) => !excluded.contains(&order.id()),
            OrderFilter::Custom(f) => f(order),
        }
    }
}

pub fn apply_filters(orders: &[Arc<Order>], filters: &[OrderFilter]) -> Vec<OrderId> {
    orders
        .iter()
        .filter(|o| filters.iter().all(|f| f.matches(o)))
        .map(|o| o.id())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::bd;
    use crate::order::{AssetPair, FeePolicy, OrderBook, OrderSide, OrderSpec};
    use crate::value::{ExchangeRate, Money, OrderBounds};

    fn sample_book() -> OrderBook {
        let spec = OrderSpec {
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
        };
        OrderBook::new(vec![spec]).unwrap()
    }

    #[test]
    fn allowed_currencies_filters_out_unlisted_pairs() {
        let book = sample_book();
        let mut allowed = HashSet::new();
        allowed.insert("USD".to_string());
        let filter = OrderFilter::AllowedCurrencies(allowed);
        let kept = apply_filters(book.orders(), &[filter]);
        assert!(kept.is_empty());
    }
}
