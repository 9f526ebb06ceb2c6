//! Spend analyzer and tolerance evaluator (spec 4.F).
//!
//! The analyzer seeds the search's initial feasible-spend range and
//! pre-filters edges that can never be touched within the configured
//! tolerance window; the tolerance evaluator judges whether a materialized
//! plan's actual spend fell within that window.

use bigdecimal::BigDecimal;

use crate::decimal::{self, CANONICAL_SCALE};
use crate::error::CoreResult;
use crate::graph::{Capacity, Edge, Graph, NodeId};
use crate::value::{Money, ToleranceWindow};

/// The initial feasible-spend seed for a single edge reachable from the
/// start node: `net`/`gross` at the nominal spend amount, and the absolute
/// ceiling the tolerance window allows spending.
#[derive(Debug, Clone)]
pub struct SpendSeed {
    pub net: Money,
    pub gross: Money,
    pub gross_ceiling: Money,
}

/// Computes the feasible spend seed for `edge`, or `None` when the edge's
/// mandatory minimum cannot be reached within the tolerance-adjusted
/// ceiling, i.e. the edge is unusable for this query regardless of path.
pub fn seed(
    edge: &Edge,
    requested_spend: &Money,
    tolerance: &ToleranceWindow,
) -> CoreResult<Option<SpendSeed>> {
    let one = BigDecimal::from(1);
    let over_factor = decimal::add(&one, tolerance.over_max(), CANONICAL_SCALE)?;
    let under_factor = decimal::sub(&one, tolerance.under_min(), CANONICAL_SCALE)?;

    let gross_ceiling = requested_spend.multiply(&over_factor, Some(CANONICAL_SCALE))?;
    let gross_floor = requested_spend.multiply(&under_factor, Some(CANONICAL_SCALE))?;

    let capacity = edge.source_capacity();
    if capacity.min.greater_than(&gross_ceiling)? {
        return Ok(None);
    }
    if capacity.max.less_than(&gross_floor)? {
        return Ok(None);
    }

    let gross = capacity.clamp(&gross_ceiling)?;
    let net = gross.clone();
    Ok(Some(SpendSeed {
        net,
        gross,
        gross_ceiling,
    }))
}

/// Computes the initial feasible-spend `Capacity` at the start node: the
/// tolerance-adjusted `[floor, ceiling]` band around the requested spend,
/// in the spend currency.
pub fn initial_feasible_range(
    requested_spend: &Money,
    tolerance: &ToleranceWindow,
) -> CoreResult<Capacity> {
    let one = BigDecimal::from(1);
    let over_factor = decimal::add(&one, tolerance.over_max(), CANONICAL_SCALE)?;
    let under_factor = decimal::sub(&one, tolerance.under_min(), CANONICAL_SCALE)?;
    let ceiling = requested_spend.multiply(&over_factor, Some(CANONICAL_SCALE))?;
    let floor = requested_spend.multiply(&under_factor, Some(CANONICAL_SCALE))?;
    Ok(Capacity::new(floor, ceiling))
}

/// Drops edges from `candidates` whose feasible input lies entirely
/// outside the tolerance-adjusted spend range for the given start node.
pub fn prefilter_edges(
    graph: &Graph,
    start: NodeId,
    requested_spend: &Money,
    tolerance: &ToleranceWindow,
) -> CoreResult<Vec<crate::graph::EdgeId>> {
    let mut kept = Vec::new();
    for edge_id in graph.edges_from(start) {
        let edge = graph.edge(*edge_id);
        if seed(edge, requested_spend, tolerance)?.is_some() {
            kept.push(*edge_id);
        }
    }
    Ok(kept)
}

/// Evaluates the residual tolerance of `actual` against `requested`
/// (same currency required). Returns `None` when outside the window.
/// Sign convention: negative on under-spend, positive on over-spend —
/// `(actual - requested) / requested`.
pub fn evaluate_tolerance(
    requested: &Money,
    actual: &Money,
    window: &ToleranceWindow,
) -> CoreResult<Option<BigDecimal>> {
    if requested.is_zero() {
        return Ok(if actual.is_zero() {
            Some(BigDecimal::from(0))
        } else {
            None
        });
    }
    let diff = decimal::sub(actual.amount(), requested.amount(), CANONICAL_SCALE)?;
    let residual = decimal::div(&diff, requested.amount(), CANONICAL_SCALE)?;
    let neg_under = -tolerance_under(window)?;
    if residual >= neg_under && residual <= window.over_max().clone() {
        Ok(Some(residual))
    } else {
        Ok(None)
    }
}

fn tolerance_under(window: &ToleranceWindow) -> CoreResult<BigDecimal> {
    Ok(window.under_min().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::bd;
    use crate::order::{AssetPair, FeePolicy, OrderSide, OrderSpec};
    use crate::order::OrderBook;
    use crate::value::{ExchangeRate, OrderBounds};
    use crate::graph::builder::GraphBuilder;

    fn money(cur: &str, amt: &str) -> Money {
        Money::new(cur, bd(amt), 6).unwrap()
    }

    fn sample_book() -> OrderBook {
        let spec = OrderSpec {
            side: OrderSide::Buy,
            pair: AssetPair {
                base: "USD".into(),
                quote: "EUR".into(),
            },
            bounds: OrderBounds::from(money("USD", "10"), money("USD", "1000")).unwrap(),
            rate: ExchangeRate::new("USD", "EUR", bd("0.9"), 18).unwrap(),
            fee_policy: FeePolicy::None,
        };
        OrderBook::new(vec![spec]).unwrap()
    }

    #[test]
    fn seed_rejects_edge_whose_minimum_exceeds_ceiling() {
        let book = sample_book();
        let graph = GraphBuilder::new().build(book.orders()).unwrap();
        let usd = graph.node_id("USD").unwrap();
        let edge = graph.edge(graph.edges_from(usd)[0]);
        let tolerance = ToleranceWindow::from(bd("0"), bd("0")).unwrap();
        let tiny_spend = Money::new("USD", bd("1"), 6).unwrap();
        assert!(seed(edge, &tiny_spend, &tolerance).unwrap().is_none());
    }

    #[test]
    fn tolerance_evaluator_accepts_within_window() {
        let window = ToleranceWindow::from(bd("0.01"), bd("0.02")).unwrap();
        let requested = money("USD", "100");
        let actual = money("USD", "101");
        let residual = evaluate_tolerance(&requested, &actual, &window).unwrap();
        assert!(residual.is_some());
    }

    #[test]
    fn tolerance_evaluator_rejects_outside_window() {
        let window = ToleranceWindow::from(bd("0.01"), bd("0.02")).unwrap();
        let requested = money("USD", "100");
        let actual = money("USD", "110");
        assert!(evaluate_tolerance(&requested, &actual, &window)
            .unwrap()
            .is_none());
    }

    #[test]
    fn zero_requested_only_accepts_zero_actual() {
        let window = ToleranceWindow::from(bd("0.01"), bd("0.02")).unwrap();
        let requested = money("USD", "0");
        assert!(evaluate_tolerance(&requested, &money("USD", "0"), &window)
            .unwrap()
            .is_some());
        assert!(evaluate_tolerance(&requested, &money("USD", "1"), &window)
            .unwrap()
            .is_none());
    }
}
