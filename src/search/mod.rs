//! Best-first path search (spec 4.G) — the core of the core.
//!
//! A single invocation explores `SearchState`s keyed by current currency,
//! a live feasible-spend range, and a visited set that forbids currency
//! revisits within one path. States pop off a priority queue ordered by
//! `(cost, hops, routeSignature, insertionOrder)`; the dominance registry
//! is the sole gate against combinatorial blowup, and three guards bound
//! total effort. Candidates that reach the target within the configured
//! hop window are pushed into the caller's `ResultHeap`; everything else
//! keeps expanding until the queue drains, the heap is saturated past the
//! frontier's best remaining cost, or a guard trips.

pub mod dominance;
pub mod guards;
pub mod state;

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

use bigdecimal::{BigDecimal, One, Zero};

use crate::analyzer;
use crate::decimal::{self, CANONICAL_SCALE};
use crate::error::CoreResult;
use crate::graph::{Graph, NodeId};
use crate::order::OrderId;
use crate::ranking::{OrderingStrategy, RawCandidate, ResultHeap};
use crate::value::{Money, ToleranceWindow};

use dominance::DominanceRegistry;
use guards::{GuardLimits, GuardReport};
use state::{route_signature, PathOrderKey, SearchState};

/// Per-order multiplicative cost surcharge consulted by the cost function.
/// Populated by the Top-K driver's reusable mode; empty for disjoint mode
/// and for a search's first iteration.
pub type ReusePenalties = std::collections::HashMap<OrderId, BigDecimal>;

/// Everything one `search_once` call needs, already resolved by the caller
/// (pre-filtering, config validation) so this module stays free of the
/// config/builder surface.
pub struct SearchRequest<'a> {
    pub graph: &'a Graph,
    pub start: NodeId,
    pub target: NodeId,
    pub requested_spend: &'a Money,
    pub tolerance: &'a ToleranceWindow,
    pub min_hops: u32,
    pub max_hops: u32,
    pub result_limit: usize,
    pub guards: &'a GuardLimits,
    pub ordering: &'a OrderingStrategy,
    pub reuse_penalties: &'a ReusePenalties,
}

pub struct SearchOutcomeRaw {
    pub candidates: Vec<RawCandidate>,
    pub guard_report: GuardReport,
}

/// One entry in the frontier. Ordering is always the canonical
/// `(cost, hops, routeSignature, insertionOrder)` key — the configurable
/// `OrderingStrategy` governs the *result* heap, not frontier traversal,
/// so that dominance and termination stay deterministic regardless of a
/// caller-supplied comparator.
struct QueueEntry {
    key: PathOrderKey,
    state: SearchState,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for QueueEntry {}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Runs one best-first search to exhaustion (or guard breach), collecting
/// up to `result_limit` ranked candidates that reach `target` within
/// `[min_hops, max_hops]`.
pub fn search_once(req: &SearchRequest) -> CoreResult<SearchOutcomeRaw> {
    let start_time = Instant::now();
    let mut report = GuardReport::default();
    let mut insertion_counter: u64 = 0;
    let mut registry = DominanceRegistry::new();
    let mut heap: BinaryHeap<Reverse<QueueEntry>> = BinaryHeap::new();
    let mut result_heap = ResultHeap::new(req.result_limit, req.ordering);

    let initial_range = analyzer::initial_feasible_range(req.requested_spend, req.tolerance)?;
    let initial_state = SearchState {
        node: req.start,
        cost: BigDecimal::zero(),
        cumulative_rate: BigDecimal::one(),
        hops: 0,
        edges: Vec::new(),
        feasible: initial_range,
        visited: HashSet::from([req.start]),
        insertion_order: insertion_counter,
    };
    let initial_key = initial_key_for(&initial_state);
    insertion_counter += 1;
    heap.push(Reverse(QueueEntry {
        key: initial_key,
        state: initial_state,
    }));

    'frontier: while let Some(Reverse(entry)) = heap.pop() {
        if let Some(budget) = req.guards.time_budget_ms() {
            if start_time.elapsed().as_millis() as u64 >= budget {
                report.time_reached = true;
                break;
            }
        }
        if report.expansions >= req.guards.max_expansions() {
            report.expansions_reached = true;
            break;
        }
        report.expansions += 1;

        if result_heap.is_full() {
            if let Some(worst) = result_heap.worst_key() {
                if entry.key.cost > worst.cost {
                    break;
                }
            }
        }

        let state = entry.state;
        for &edge_id in req.graph.edges_from(state.node) {
            let edge = req.graph.edge(edge_id);

            if state.visited.contains(&edge.to) {
                continue;
            }
            let next_hops = state.hops + 1;
            if next_hops > req.max_hops {
                continue;
            }

            let source_capacity = edge.source_capacity();
            let intersected = match state.feasible.intersect(source_capacity)? {
                Some(c) => c,
                None => continue,
            };
            let next_range = edge.map_source_to_dest(&intersected)?;

            let edge_rate = edge.rate.rate().clone();
            let cumulative_rate = decimal::mul(&state.cumulative_rate, &edge_rate, CANONICAL_SCALE)?;
            let mut cost = invert_rate_to_cost(&cumulative_rate)?;
            if let Some(penalty) = req.reuse_penalties.get(&edge.order_id()) {
                cost = decimal::mul(&cost, penalty, CANONICAL_SCALE)?;
            }

            let mut next_edges = state.edges.clone();
            next_edges.push(edge_id);
            let mut next_visited = state.visited.clone();
            next_visited.insert(edge.to);

            let currencies = next_edges
                .iter()
                .map(|id| req.graph.edge(*id).from_currency.clone())
                .chain(std::iter::once(edge.to_currency.clone()))
                .collect::<Vec<_>>();
            let signature = route_signature(&currencies);

            if edge.to == req.target {
                if next_hops >= req.min_hops && next_hops <= req.max_hops {
                    let key = PathOrderKey {
                        cost: cost.clone(),
                        hops: next_hops,
                        route_signature: signature,
                        insertion_order: insertion_counter,
                    };
                    insertion_counter += 1;
                    result_heap.try_insert(RawCandidate {
                        edges: next_edges,
                        key,
                    });
                }
                continue;
            }

            let desired = None;
            let state_signature = dominance::signature(&next_range, desired);
            report.visited_states += 1;
            if report.visited_states > req.guards.max_visited_states() {
                report.visited_states_reached = true;
                break 'frontier;
            }
            let accepted = registry.try_register(edge.to, state_signature, &cost, next_hops);
            if !accepted {
                continue;
            }

            let next_state = SearchState {
                node: edge.to,
                cost: cost.clone(),
                cumulative_rate,
                hops: next_hops,
                edges: next_edges,
                feasible: next_range,
                visited: next_visited,
                insertion_order: insertion_counter,
            };
            let key = PathOrderKey {
                cost,
                hops: next_hops,
                route_signature: signature,
                insertion_order: insertion_counter,
            };
            insertion_counter += 1;
            heap.push(Reverse(QueueEntry {
                key,
                state: next_state,
            }));
        }
    }

    report.elapsed_ms = start_time.elapsed().as_millis() as u64;
    Ok(SearchOutcomeRaw {
        candidates: result_heap.into_sorted_vec(),
        guard_report: report,
    })
}

fn initial_key_for(state: &SearchState) -> PathOrderKey {
    PathOrderKey {
        cost: state.cost.clone(),
        hops: state.hops,
        route_signature: String::new(),
        insertion_order: state.insertion_order,
    }
}

fn invert_rate_to_cost(cumulative_rate: &BigDecimal) -> CoreResult<BigDecimal> {
    decimal::div(&BigDecimal::one(), cumulative_rate, CANONICAL_SCALE)
}
