//! Search state and the strict total order it's ranked by.

use std::collections::HashSet;

use bigdecimal::BigDecimal;

use crate::graph::{Capacity, EdgeId, NodeId};

#[derive(Debug, Clone)]
pub struct SearchState {
    pub node: NodeId,
    pub cost: BigDecimal,
    pub cumulative_rate: BigDecimal,
    pub hops: u32,
    pub edges: Vec<EdgeId>,
    pub feasible: Capacity,
    pub visited: HashSet<NodeId>,
    pub insertion_order: u64,
}

/// `(cost, hops, route_signature, insertion_order)` — a strict total order.
/// The fourth field guarantees no two distinct states ever compare equal,
/// which is what makes tie-breaking deterministic across platforms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PathOrderKey {
    pub cost: BigDecimal,
    pub hops: u32,
    pub route_signature: String,
    pub insertion_order: u64,
}

pub fn route_signature(currencies: &[String]) -> String {
    currencies.join("->")
}
