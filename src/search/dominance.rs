//! Per-node dominance registry: prunes newly discovered states that
//! cannot possibly beat a state already registered for an equivalent
//! feasible-spend signature.

use std::collections::HashMap;

use bigdecimal::BigDecimal;

use crate::graph::{Capacity, NodeId};
use crate::value::Money;

/// Builds the deterministic signature a state is registered under: the
/// feasible spend range (and, when known, the desired spend projected
/// into the current currency) collapse to one string so that two states
/// with identical reachable futures can be compared.
pub fn signature(feasible: &Capacity, desired: Option<&Money>) -> String {
    let range = format!(
        "range:{}:{}:{}:{}",
        feasible.min.currency(),
        feasible.min.amount(),
        feasible.max.amount(),
        feasible.min.scale()
    );
    match desired {
        Some(d) => format!(
            "{range}|desired:{}:{}:{}",
            d.currency(),
            d.amount(),
            d.scale()
        ),
        None => format!("{range}|desired:none"),
    }
}

#[derive(Debug, Clone)]
struct Record {
    cost: BigDecimal,
    hops: u32,
}

#[derive(Debug, Default)]
pub struct DominanceRegistry {
    records: HashMap<(NodeId, String), Vec<Record>>,
}

impl DominanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to register a new state. Returns `true` (accepted) unless
    /// an existing record for the same `(node, signature)` has both cost
    /// and hops no worse than the new state's — in which case the new
    /// state is dominated and rejected. Existing records that the new
    /// state itself dominates are replaced; otherwise the new record
    /// coexists alongside incomparable ones.
    pub fn try_register(
        &mut self,
        node: NodeId,
        signature: String,
        cost: &BigDecimal,
        hops: u32,
    ) -> bool {
        let key = (node, signature);
        let entry = self.records.entry(key).or_default();

        for existing in entry.iter() {
            if existing.cost <= *cost && existing.hops <= hops {
                return false;
            }
        }

        entry.retain(|existing| !(cost <= &existing.cost && hops <= existing.hops));
        entry.push(Record {
            cost: cost.clone(),
            hops,
        });
        true
    }
}
