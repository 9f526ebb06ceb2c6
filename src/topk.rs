//! Top-K driver (spec 4.J): runs the search engine repeatedly to extract
//! K ranked alternatives, either excluding each iteration's used orders
//! (disjoint mode) or applying a reuse-penalty overlay the cost function
//! consults (reusable mode).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use tracing::debug;

use crate::config::PathSearchConfig;
use crate::decimal::CANONICAL_SCALE;
use crate::error::{CoreError, CoreResult};
use crate::graph::Graph;
use crate::materializer::{self, ExecutionStepRaw, PathResult};
use crate::order::{FeeMap, OrderBook, OrderId};
use crate::ranking::RawCandidate;
use crate::search::guards::GuardReport;
use crate::search::{search_once, ReusePenalties, SearchRequest};
use crate::value::Money;

/// Fixed multiplicative surcharge applied, per reused order, each time
/// reusable mode re-searches. Strictly increases cost for any path that
/// reuses an order without ever inverting relative order among plans
/// that reuse nothing, satisfying property 7.
const REUSE_PENALTY_FACTOR: &str = "0.25";

#[derive(Debug, Clone)]
pub struct ExecutionStep {
    pub sequence_number: u32,
    pub from: String,
    pub to: String,
    pub spent: Money,
    pub received: Money,
    pub fees_by_currency: FeeMap,
    pub order_id: OrderId,
}

impl From<ExecutionStepRaw> for ExecutionStep {
    fn from(raw: ExecutionStepRaw) -> Self {
        Self {
            sequence_number: raw.sequence_number,
            from: raw.from,
            to: raw.to,
            spent: raw.spent,
            received: raw.received,
            fees_by_currency: raw.fees,
            order_id: raw.order_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub steps: Vec<ExecutionStep>,
    pub source_currency: String,
    pub target_currency: String,
    pub total_spent: Money,
    pub total_received: Money,
    pub residual_tolerance: BigDecimal,
    pub fee_breakdown: FeeMap,
    pub signature: String,
}

impl ExecutionPlan {
    /// True when each step's destination currency is the next step's
    /// source currency — a simple chain with no split/merge topology.
    pub fn is_linear(&self) -> bool {
        self.steps
            .windows(2)
            .all(|pair| pair[0].to == pair[1].from)
    }

    fn order_ids(&self) -> HashSet<OrderId> {
        self.steps.iter().map(|s| s.order_id).collect()
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<ExecutionPlan>,
    pub guard_report: GuardReport,
}

fn to_plan(
    source_currency: &str,
    target_currency: &str,
    result: PathResult,
    route_signature: String,
) -> ExecutionPlan {
    ExecutionPlan {
        steps: result.legs.into_iter().map(ExecutionStep::from).collect(),
        source_currency: source_currency.to_string(),
        target_currency: target_currency.to_string(),
        total_spent: result.total_spent,
        total_received: result.total_received,
        residual_tolerance: result.residual_tolerance,
        fee_breakdown: result.fee_breakdown,
        signature: route_signature,
    }
}

fn run_one_search(
    graph: &Graph,
    config: &PathSearchConfig,
    source_currency: &str,
    target_currency: &str,
    reuse_penalties: &ReusePenalties,
) -> CoreResult<(Vec<RawCandidate>, GuardReport)> {
    let start = graph
        .node_id(source_currency)
        .ok_or_else(|| CoreError::invalid_input(format!("unknown source currency {source_currency}")))?;
    let target = graph
        .node_id(target_currency)
        .ok_or_else(|| CoreError::invalid_input(format!("unknown target currency {target_currency}")))?;

    let req = SearchRequest {
        graph,
        start,
        target,
        requested_spend: &config.spend_amount,
        tolerance: &config.tolerance,
        min_hops: config.min_hops,
        max_hops: config.max_hops,
        result_limit: config.result_limit,
        guards: &config.guards,
        ordering: &config.ordering,
        reuse_penalties,
    };
    let outcome = search_once(&req)?;
    Ok((outcome.candidates, outcome.guard_report))
}

fn materialize_candidate(
    graph: &Graph,
    candidate: &RawCandidate,
    config: &PathSearchConfig,
) -> CoreResult<Option<PathResult>> {
    materializer::materialize(
        graph,
        &candidate.edges,
        &config.spend_amount,
        &config.tolerance,
    )
}

/// Runs the Top-K driver against a pre-built graph. `source_currency` is
/// the currency `config.spend_amount` is denominated in.
pub fn find_best_plans_on_graph(
    graph: &Graph,
    config: &PathSearchConfig,
    source_currency: &str,
    target_currency: &str,
) -> CoreResult<SearchOutcome> {
    let outcome = if config.disjoint_plans {
        find_disjoint(graph, config, source_currency, target_currency)?
    } else {
        find_reusable(graph, config, source_currency, target_currency)?
    };
    if config.throw_on_guard_breach && outcome.guard_report.any_breach() {
        return Err(CoreError::GuardLimitExceeded {
            report: outcome.guard_report,
        });
    }
    Ok(outcome)
}

fn find_disjoint(
    graph: &Graph,
    config: &PathSearchConfig,
    source_currency: &str,
    target_currency: &str,
) -> CoreResult<SearchOutcome> {
    let empty_penalties = ReusePenalties::new();
    let mut results = Vec::new();
    let mut aggregate = GuardReport::default();
    let mut excluded: HashSet<OrderId> = HashSet::new();
    let mut current_graph: Arc<Graph> = Arc::new(graph.clone());

    for iteration in 0..config.result_limit {
        let (candidates, report) = run_one_search(
            &current_graph,
            config,
            source_currency,
            target_currency,
            &empty_penalties,
        )?;
        aggregate.merge(&report);

        let Some(best) = candidates.into_iter().next() else {
            debug!(iteration, "disjoint top-k: no further candidates");
            break;
        };
        let Some(path_result) = materialize_candidate(&current_graph, &best, config)? else {
            break;
        };
        let plan = to_plan(
            source_currency,
            target_currency,
            path_result,
            best.key.route_signature.clone(),
        );
        excluded.extend(plan.order_ids());
        results.push(plan);

        current_graph = current_graph.without(&excluded);
    }

    debug!(
        plans = results.len(),
        expansions = aggregate.expansions,
        "disjoint top-k finished"
    );
    Ok(SearchOutcome {
        results,
        guard_report: aggregate,
    })
}

fn find_reusable(
    graph: &Graph,
    config: &PathSearchConfig,
    source_currency: &str,
    target_currency: &str,
) -> CoreResult<SearchOutcome> {
    let mut results = Vec::new();
    let mut aggregate = GuardReport::default();
    let mut seen_signatures: HashSet<(String, String)> = HashSet::new();
    let mut penalties: ReusePenalties = HashMap::new();
    let factor: BigDecimal = REUSE_PENALTY_FACTOR.parse().expect("valid literal");
    let one = BigDecimal::from(1);
    let multiplier = &one + &factor;

    for iteration in 0..config.result_limit {
        let (candidates, report) =
            run_one_search(graph, config, source_currency, target_currency, &penalties)?;
        aggregate.merge(&report);

        let mut admitted = false;
        for candidate in candidates {
            let dedup_key = (
                candidate.key.cost.to_string(),
                candidate.key.route_signature.clone(),
            );
            if seen_signatures.contains(&dedup_key) {
                continue;
            }
            let Some(path_result) = materialize_candidate(graph, &candidate, config)? else {
                continue;
            };
            let plan = to_plan(
                source_currency,
                target_currency,
                path_result,
                candidate.key.route_signature.clone(),
            );
            seen_signatures.insert(dedup_key);
            for order_id in plan.order_ids() {
                let entry = penalties.entry(order_id).or_insert_with(|| one.clone());
                *entry = crate::decimal::mul(entry, &multiplier, CANONICAL_SCALE)?;
            }
            results.push(plan);
            admitted = true;
            break;
        }
        if !admitted {
            debug!(iteration, "reusable top-k: no further distinct candidates");
            break;
        }
    }

    debug!(
        plans = results.len(),
        expansions = aggregate.expansions,
        "reusable top-k finished"
    );
    Ok(SearchOutcome {
        results,
        guard_report: aggregate,
    })
}

/// Builds a graph from `book`, applying `config.filters` first.
pub fn find_best_plans(
    book: &OrderBook,
    config: &PathSearchConfig,
    target_currency: &str,
) -> CoreResult<SearchOutcome> {
    let source_currency = config.spend_amount.currency().to_string();
    let surviving = crate::filters::apply_filters(book.orders(), &config.filters)
        .into_iter()
        .collect::<HashSet<_>>();
    let filtered: Vec<Arc<crate::order::Order>> = book
        .orders()
        .iter()
        .filter(|o| surviving.contains(&o.id()))
        .cloned()
        .collect();

    let mut builder = crate::graph::builder::GraphBuilder::new();
    let graph = builder.build(&filtered)?;

    find_best_plans_on_graph(&graph, config, &source_currency, target_currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathSearchConfigBuilder;
    use crate::decimal::bd;
    use crate::order::{AssetPair, FeePolicy, OrderSide, OrderSpec};
    use crate::search::guards::GuardLimits;
    use crate::value::{ExchangeRate, Money, OrderBounds, ToleranceWindow};

    fn money(cur: &str, amt: &str) -> Money {
        Money::new(cur, bd(amt), 6).unwrap()
    }

    fn order(base: &str, quote: &str, rate: &str) -> OrderSpec {
        OrderSpec {
            side: OrderSide::Buy,
            pair: AssetPair {
                base: base.into(),
                quote: quote.into(),
            },
            bounds: OrderBounds::from(money(base, "10"), money(base, "1000")).unwrap(),
            rate: ExchangeRate::new(base, quote, bd(rate), 18).unwrap(),
            fee_policy: FeePolicy::None,
        }
    }

    #[test]
    fn direct_buy_plan_reports_spend_and_receive() {
        let book = OrderBook::new(vec![order("USD", "EUR", "0.9")]).unwrap();
        let config = PathSearchConfigBuilder::new(
            money("USD", "100"),
            ToleranceWindow::from(bd("0.05"), bd("0.05")).unwrap(),
        )
        .min_hops(1)
        .max_hops(1)
        .result_limit(1)
        .build()
        .unwrap();

        let outcome = find_best_plans(&book, &config, "EUR").unwrap();
        assert_eq!(outcome.results.len(), 1);
        let plan = &outcome.results[0];
        assert!(plan.is_linear());
        assert_eq!(plan.source_currency, "USD");
        assert_eq!(plan.target_currency, "EUR");
        assert_eq!(plan.total_spent.currency(), "USD");
        assert_eq!(plan.total_received.currency(), "EUR");
    }

    #[test]
    fn disjoint_mode_excludes_orders_already_used_by_an_earlier_plan() {
        let book = OrderBook::new(vec![
            order("USD", "EUR", "0.9"),
            order("USD", "EUR", "0.8"),
        ])
        .unwrap();
        let config = PathSearchConfigBuilder::new(
            money("USD", "100"),
            ToleranceWindow::from(bd("0.05"), bd("0.05")).unwrap(),
        )
        .min_hops(1)
        .max_hops(1)
        .result_limit(2)
        .disjoint_plans(true)
        .build()
        .unwrap();

        let outcome = find_best_plans(&book, &config, "EUR").unwrap();
        assert_eq!(outcome.results.len(), 2);
        let first_orders: HashSet<OrderId> = outcome.results[0].order_ids();
        let second_orders: HashSet<OrderId> = outcome.results[1].order_ids();
        assert!(first_orders.is_disjoint(&second_orders));
    }

    #[test]
    fn reusable_mode_penalizes_repeated_use_of_the_same_order() {
        let book = OrderBook::new(vec![order("USD", "EUR", "0.9")]).unwrap();
        let config = PathSearchConfigBuilder::new(
            money("USD", "100"),
            ToleranceWindow::from(bd("0.05"), bd("0.05")).unwrap(),
        )
        .min_hops(1)
        .max_hops(1)
        .result_limit(2)
        .disjoint_plans(false)
        .build()
        .unwrap();

        let outcome = find_best_plans(&book, &config, "EUR").unwrap();
        // only one order exists; reusable mode can surface it again but the
        // second iteration's candidate is cost-penalized, not excluded.
        assert!(!outcome.results.is_empty());
    }

    #[test]
    fn tolerance_rejection_yields_empty_results_without_guard_breach() {
        let book = OrderBook::new(vec![order("USD", "EUR", "0.9")]).unwrap();
        let config = PathSearchConfigBuilder::new(
            money("USD", "100"),
            ToleranceWindow::from(bd("0.0001"), bd("0.0001")).unwrap(),
        )
        .min_hops(1)
        .max_hops(1)
        .result_limit(1)
        .build()
        .unwrap();

        let outcome = find_best_plans(&book, &config, "EUR").unwrap();
        assert!(outcome.results.is_empty());
        assert!(!outcome.guard_report.any_breach());
    }

    #[test]
    fn throw_on_guard_breach_surfaces_a_guard_limit_error() {
        let book = OrderBook::new(vec![
            order("USD", "GBP", "0.8"),
            order("GBP", "EUR", "1.1"),
        ])
        .unwrap();
        let config = PathSearchConfigBuilder::new(
            money("USD", "100"),
            ToleranceWindow::from(bd("0.1"), bd("0.1")).unwrap(),
        )
        .min_hops(2)
        .max_hops(2)
        .result_limit(1)
        .guards(GuardLimits::new(1, 100, None).unwrap())
        .throw_on_guard_breach(true)
        .build()
        .unwrap();

        let err = find_best_plans(&book, &config, "EUR").unwrap_err();
        assert!(matches!(err, CoreError::GuardLimitExceeded { .. }));
    }
}
