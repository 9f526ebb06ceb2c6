//! Leg materializer (spec 4.H): replays an edge sequence with fees applied,
//! turning a raw search candidate into exact spend/receive amounts.
//!
//! A `Buy`-side edge (spend base, receive quote) sizes analytically: the
//! spend amount is already known in the edge's own bound currency, so fees
//! fall out of one `FeePolicy::apply` call. The first leg's spend is
//! checked against the tolerance-adjusted ceiling rather than the bare
//! requested amount, since a base-denominated fee otherwise pushes the
//! gross spend past a requested figure the over-tolerance window was
//! meant to absorb.
//!
//! A `Sell`-side edge (spend quote, receive base) sizes iteratively: the
//! order's bounds and fee policy are defined in base-currency terms, but
//! what's available to spend is quote, so finding the largest deliverable
//! base amount means searching. The search seeds itself with a linear
//! interpolation between the two fee-evaluated endpoints (exact for the
//! affine fee policies, a starting bracket otherwise — see
//! `Edge::map_source_to_dest` for the same technique applied to capacity
//! envelopes), then bisects to a bracket width of zero at the currency's
//! own scale.

use std::collections::BTreeMap;

use crate::decimal::CANONICAL_SCALE;
use crate::error::CoreResult;
use crate::graph::{EdgeId, Graph};
use crate::order::{FeeMap, OrderSide};
use crate::value::{Money, ToleranceWindow};

const MAX_SELL_LEG_ITERATIONS: u32 = 64;

#[derive(Debug, Clone)]
pub struct ExecutionStepRaw {
    pub sequence_number: u32,
    pub from: String,
    pub to: String,
    pub spent: Money,
    pub received: Money,
    pub fees: FeeMap,
    pub order_id: crate::order::OrderId,
}

#[derive(Debug, Clone)]
pub struct PathResult {
    pub total_spent: Money,
    pub total_received: Money,
    pub residual_tolerance: bigdecimal::BigDecimal,
    pub legs: Vec<ExecutionStepRaw>,
    pub fee_breakdown: FeeMap,
}

struct LegAmounts {
    spent: Money,
    received: Money,
    fees: FeeMap,
}

fn quote_cost_for_base(
    graph: &Graph,
    edge_id: EdgeId,
    base_amount: &Money,
) -> CoreResult<Money> {
    let edge = graph.edge(edge_id);
    // edge.side == Sell here; the order's rate converts base -> quote,
    // while the edge's own `rate` field is the inverted quote -> base
    // direction, so go through the order's natural rate via its inverse.
    let base_to_quote = edge.rate.invert()?;
    let quote_raw = base_to_quote.convert(base_amount, Some(CANONICAL_SCALE))?;
    let fees = edge
        .order
        .fee_policy()
        .apply(OrderSide::Sell, base_amount, &quote_raw)?;
    let quote_fee = fees
        .get(quote_raw.currency())
        .cloned()
        .unwrap_or(Money::zero(quote_raw.currency(), CANONICAL_SCALE)?);
    quote_raw.add(&quote_fee)
}

fn size_buy_leg(
    graph: &Graph,
    edge_id: EdgeId,
    available: &Money,
    spend_ceiling: &Money,
) -> CoreResult<Option<LegAmounts>> {
    let edge = graph.edge(edge_id);
    let order_bounds_min = &edge.net_base.min;
    if available.less_than(order_bounds_min)? {
        return Ok(None);
    }
    let spend_base = edge.net_base.clamp(available)?;
    let quote_raw = edge.rate.convert(&spend_base, Some(CANONICAL_SCALE))?;
    let fees = edge
        .order
        .fee_policy()
        .apply(OrderSide::Buy, &spend_base, &quote_raw)?;

    let base_ccy = spend_base.currency().to_string();
    let quote_ccy = quote_raw.currency().to_string();
    let base_fee = fees
        .get(&base_ccy)
        .cloned()
        .unwrap_or(Money::zero(&base_ccy, CANONICAL_SCALE)?);
    let quote_fee = fees
        .get(&quote_ccy)
        .cloned()
        .unwrap_or(Money::zero(&quote_ccy, CANONICAL_SCALE)?);

    // `spend_base` targets `available` exactly (clamped to order capacity);
    // the fee can push the gross above that target, which is what the
    // tolerance window's over-spend allowance exists for, so the overflow
    // check compares against `spend_ceiling`, not `available` itself.
    let gross_base = spend_base.add(&base_fee)?;
    if gross_base.greater_than(spend_ceiling)? {
        return Ok(None);
    }
    let quote_received = match quote_raw.subtract(&quote_fee) {
        Ok(m) => m,
        Err(_) => return Ok(None),
    };

    Ok(Some(LegAmounts {
        spent: gross_base,
        received: quote_received,
        fees,
    }))
}

/// Linear interpolation between two fee-evaluated (base, cost) points,
/// solving for the base amount whose cost is `target_cost`. Exact when the
/// underlying fee policy is affine (`None`/`Fixed`/`Percentage`/
/// `MakerTaker`); for `Tiered`/`Custom` it's a starting guess the caller
/// refines further. `None` when the two cost points coincide.
fn interpolate_base_for_cost(
    min_base: &Money,
    max_base: &Money,
    cost_at_min: &Money,
    cost_at_max: &Money,
    target_cost: &Money,
) -> CoreResult<Option<Money>> {
    let span = cost_at_max.subtract(cost_at_min)?;
    if span.is_zero() {
        return Ok(None);
    }
    let offset = target_cost.subtract(cost_at_min)?;
    let fraction = offset.amount() / span.amount();
    let base_span = max_base.subtract(min_base)?;
    let delta = base_span.multiply(&fraction, Some(CANONICAL_SCALE))?;
    let guess = min_base.add(&delta)?;
    let guess = if guess.greater_than(max_base)? {
        max_base.clone()
    } else if min_base.greater_than(&guess)? {
        min_base.clone()
    } else {
        guess
    };
    Ok(Some(guess))
}

fn size_sell_leg(graph: &Graph, edge_id: EdgeId, available: &Money) -> CoreResult<Option<LegAmounts>> {
    let edge = graph.edge(edge_id);
    let min_base = edge.net_base.min.clone();
    let max_base = edge.net_base.max.clone();

    let cost_at_min = quote_cost_for_base(graph, edge_id, &min_base)?;
    if cost_at_min.greater_than(available)? {
        return Ok(None);
    }

    let cost_at_max = quote_cost_for_base(graph, edge_id, &max_base)?;
    let candidate = if !cost_at_max.greater_than(available)? {
        max_base
    } else {
        let mut lo = min_base.clone();
        let mut hi = max_base.clone();

        if let Some(guess) =
            interpolate_base_for_cost(&min_base, &max_base, &cost_at_min, &cost_at_max, available)?
        {
            if !quote_cost_for_base(graph, edge_id, &guess)?.greater_than(available)? {
                lo = guess;
            } else {
                hi = guess;
            }
        }

        for _ in 0..MAX_SELL_LEG_ITERATIONS {
            if lo.equals(&hi) {
                break;
            }
            let mid = midpoint(&lo, &hi)?;
            if mid.equals(&lo) || mid.equals(&hi) {
                break;
            }
            let cost_mid = quote_cost_for_base(graph, edge_id, &mid)?;
            if !cost_mid.greater_than(available)? {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        // The bracket has converged to (near) a single representable
        // value; rounding at the currency's own scale can land `hi`'s
        // recomputed cost back inside the budget even though it was
        // classified infeasible at full precision, so prefer it when it
        // still qualifies — it spends more of the available budget.
        if !quote_cost_for_base(graph, edge_id, &hi)?.greater_than(available)? {
            hi
        } else {
            lo
        }
    };

    let quote_cost = quote_cost_for_base(graph, edge_id, &candidate)?;
    let base_to_quote = edge.rate.invert()?;
    let quote_raw = base_to_quote.convert(&candidate, Some(CANONICAL_SCALE))?;
    let fees = edge
        .order
        .fee_policy()
        .apply(OrderSide::Sell, &candidate, &quote_raw)?;

    Ok(Some(LegAmounts {
        spent: quote_cost,
        received: candidate,
        fees,
    }))
}

fn midpoint(a: &Money, b: &Money) -> CoreResult<Money> {
    let sum = a.add(b)?;
    sum.divide(&bigdecimal::BigDecimal::from(2), None)
}

pub fn materialize(
    graph: &Graph,
    edges: &[EdgeId],
    requested_spend: &Money,
    tolerance: &ToleranceWindow,
) -> CoreResult<Option<PathResult>> {
    let mut legs = Vec::new();
    let mut fee_totals: FeeMap = BTreeMap::new();
    let mut current_available = requested_spend.clone();
    // Only the first leg's budget gets the tolerance's over-spend headroom;
    // every later leg is bounded by exactly what the prior leg delivered.
    let first_leg_ceiling = crate::analyzer::initial_feasible_range(requested_spend, tolerance)?.max;

    for (i, edge_id) in edges.iter().enumerate() {
        let edge = graph.edge(*edge_id);
        let amounts = match edge.side {
            OrderSide::Buy => {
                let spend_ceiling = if i == 0 { &first_leg_ceiling } else { &current_available };
                size_buy_leg(graph, *edge_id, &current_available, spend_ceiling)?
            }
            OrderSide::Sell => size_sell_leg(graph, *edge_id, &current_available)?,
        };
        let Some(amounts) = amounts else {
            return Ok(None);
        };

        for (currency, fee) in amounts.fees.iter() {
            let entry = fee_totals
                .entry(currency.clone())
                .or_insert(Money::zero(currency, fee.scale())?);
            *entry = entry.add(fee)?;
        }

        legs.push(ExecutionStepRaw {
            sequence_number: (i + 1) as u32,
            from: edge.from_currency.clone(),
            to: edge.to_currency.clone(),
            spent: amounts.spent.clone(),
            received: amounts.received.clone(),
            fees: amounts.fees,
            order_id: edge.order_id(),
        });

        current_available = amounts.received;
    }

    let Some(first) = legs.first() else {
        return Ok(None);
    };
    let last = legs.last().unwrap();
    let total_spent = first.spent.clone();
    let total_received = last.received.clone();

    let residual = match crate::analyzer::evaluate_tolerance(requested_spend, &total_spent, tolerance)? {
        Some(r) => r,
        None => return Ok(None),
    };

    Ok(Some(PathResult {
        total_spent,
        total_received,
        residual_tolerance: residual,
        legs,
        fee_breakdown: fee_totals,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::bd;
    use crate::graph::builder::GraphBuilder;
    use crate::order::{AssetPair, FeePolicy, OrderBook, OrderSpec};
    use crate::value::{ExchangeRate, OrderBounds, ToleranceWindow};

    fn money(cur: &str, amt: &str) -> Money {
        Money::new(cur, bd(amt), 6).unwrap()
    }

    #[test]
    fn buy_leg_uses_tolerance_ceiling_not_bare_requested_for_fee_overflow() {
        let spec = OrderSpec {
            side: OrderSide::Buy,
            pair: AssetPair {
                base: "EUR".into(),
                quote: "USD".into(),
            },
            bounds: OrderBounds::from(money("EUR", "1"), money("EUR", "1000")).unwrap(),
            rate: ExchangeRate::new("EUR", "USD", bd("1.2"), 18).unwrap(),
            fee_policy: FeePolicy::Percentage {
                base_bps: bd("0.02"),
                quote_bps: bd("0.05"),
            },
        };
        let book = OrderBook::new(vec![spec]).unwrap();
        let graph = GraphBuilder::new().build(book.orders()).unwrap();
        let eur = graph.node_id("EUR").unwrap();
        let edge_id = graph.edges_from(eur)[0];

        let requested = money("EUR", "100");
        let tolerance = ToleranceWindow::from(bd("0"), bd("0.05")).unwrap();
        let plan = materialize(&graph, &[edge_id], &requested, &tolerance)
            .unwrap()
            .expect("a base-denominated fee should spend into the over-tolerance ceiling, not get dropped");

        assert!(plan.total_spent.equals(&money("EUR", "102")));
        assert!(plan.total_received.equals(&money("USD", "114")));
        assert!(plan
            .fee_breakdown
            .get("EUR")
            .unwrap()
            .equals(&money("EUR", "2")));
        assert!(plan
            .fee_breakdown
            .get("USD")
            .unwrap()
            .equals(&money("USD", "6")));
    }

    #[test]
    fn buy_leg_still_rejects_once_the_fee_overruns_the_ceiling_too() {
        let spec = OrderSpec {
            side: OrderSide::Buy,
            pair: AssetPair {
                base: "EUR".into(),
                quote: "USD".into(),
            },
            bounds: OrderBounds::from(money("EUR", "1"), money("EUR", "1000")).unwrap(),
            rate: ExchangeRate::new("EUR", "USD", bd("1.2"), 18).unwrap(),
            fee_policy: FeePolicy::Percentage {
                base_bps: bd("0.10"),
                quote_bps: bd("0"),
            },
        };
        let book = OrderBook::new(vec![spec]).unwrap();
        let graph = GraphBuilder::new().build(book.orders()).unwrap();
        let eur = graph.node_id("EUR").unwrap();
        let edge_id = graph.edges_from(eur)[0];

        let requested = money("EUR", "100");
        let tolerance = ToleranceWindow::from(bd("0"), bd("0.05")).unwrap();
        let plan = materialize(&graph, &[edge_id], &requested, &tolerance).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn sell_leg_converges_tightly_enough_for_a_zero_under_tolerance() {
        let spec = OrderSpec {
            side: OrderSide::Sell,
            pair: AssetPair {
                base: "USD".into(),
                quote: "EUR".into(),
            },
            bounds: OrderBounds::from(money("USD", "10"), money("USD", "200")).unwrap(),
            rate: ExchangeRate::new("USD", "EUR", bd("0.9"), 18).unwrap(),
            fee_policy: FeePolicy::None,
        };
        let book = OrderBook::new(vec![spec]).unwrap();
        let graph = GraphBuilder::new().build(book.orders()).unwrap();
        let eur = graph.node_id("EUR").unwrap();
        let edge_id = graph.edges_from(eur)[0];

        let requested = money("EUR", "100");
        let tolerance = ToleranceWindow::from(bd("0"), bd("0.25")).unwrap();
        let plan = materialize(&graph, &[edge_id], &requested, &tolerance)
            .unwrap()
            .expect("a linear sell leg should converge close enough to land inside a zero-under window");

        assert!(!plan.total_spent.less_than(&requested).unwrap());
        assert!(plan.total_spent.less_than(&money("EUR", "100.01")).unwrap());
        assert!(plan.total_received.greater_than(&money("USD", "111")).unwrap());
        assert!(plan.total_received.less_than(&money("USD", "112")).unwrap());
    }

    #[test]
    fn sell_leg_picks_the_bracket_side_that_lands_inside_the_budget() {
        let spec = OrderSpec {
            side: OrderSide::Sell,
            pair: AssetPair {
                base: "USD".into(),
                quote: "EUR".into(),
            },
            bounds: OrderBounds::from(money("USD", "1"), money("USD", "500")).unwrap(),
            rate: ExchangeRate::new("USD", "EUR", bd("0.33333"), 18).unwrap(),
            fee_policy: FeePolicy::None,
        };
        let book = OrderBook::new(vec![spec]).unwrap();
        let graph = GraphBuilder::new().build(book.orders()).unwrap();
        let eur = graph.node_id("EUR").unwrap();
        let edge_id = graph.edges_from(eur)[0];

        let requested = money("EUR", "50");
        let tolerance = ToleranceWindow::from(bd("0"), bd("0.01")).unwrap();
        let plan = materialize(&graph, &[edge_id], &requested, &tolerance)
            .unwrap()
            .expect("a tight over-tolerance window should still be reachable after convergence");

        assert!(!plan.total_spent.less_than(&requested).unwrap());
    }
}
