//! Result ranking: the ordering strategy injection point and the bounded
//! result heap that collects the best `K` candidates a search finds.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::graph::EdgeId;
use crate::search::state::PathOrderKey;

/// A surviving path that reached the target currency, not yet materialized
/// into an `ExecutionPlan`.
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub edges: Vec<EdgeId>,
    pub key: PathOrderKey,
}

/// The pluggable comparison a `ResultHeap` ranks candidates by. The default
/// is the spec's lexicographic `(cost, hops, route_signature, insertion_order)`
/// order; `Custom` carries a user-supplied comparator, per the sum-type
/// (tagged variant + closure) style used for `FeePolicy`/`OrderFilter`.
#[derive(Clone)]
pub enum OrderingStrategy {
    CostHopsSignature,
    Custom(Arc<dyn Fn(&PathOrderKey, &PathOrderKey) -> Ordering + Send + Sync>),
}

impl std::fmt::Debug for OrderingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderingStrategy::CostHopsSignature => write!(f, "OrderingStrategy::CostHopsSignature"),
            OrderingStrategy::Custom(_) => write!(f, "OrderingStrategy::Custom"),
        }
    }
}

impl Default for OrderingStrategy {
    fn default() -> Self {
        OrderingStrategy::CostHopsSignature
    }
}

impl OrderingStrategy {
    pub fn compare(&self, a: &PathOrderKey, b: &PathOrderKey) -> Ordering {
        match self {
            OrderingStrategy::CostHopsSignature => a.cmp(b),
            OrderingStrategy::Custom(f) => f(a, b),
        }
    }
}

/// Bounded-size collection of the best candidates seen so far, ranked by
/// an `OrderingStrategy`. When full, an incoming candidate only displaces
/// the current worst entry if it is strictly better.
#[derive(Debug)]
pub struct ResultHeap<'a> {
    capacity: usize,
    entries: Vec<RawCandidate>,
    strategy: &'a OrderingStrategy,
}

impl<'a> ResultHeap<'a> {
    pub fn new(capacity: usize, strategy: &'a OrderingStrategy) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
            strategy,
        }
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn worst_key(&self) -> Option<&PathOrderKey> {
        self.entries.last().map(|e| &e.key)
    }

    /// Inserts `candidate`, keeping entries sorted ascending (best first).
    /// Returns `true` if the candidate was admitted.
    pub fn try_insert(&mut self, candidate: RawCandidate) -> bool {
        let pos = self
            .entries
            .binary_search_by(|e| self.strategy.compare(&e.key, &candidate.key))
            .unwrap_or_else(|p| p);

        if self.entries.len() < self.capacity {
            self.entries.insert(pos, candidate);
            return true;
        }

        if pos < self.entries.len() {
            self.entries.insert(pos, candidate);
            self.entries.pop();
            true
        } else {
            false
        }
    }

    pub fn into_sorted_vec(self) -> Vec<RawCandidate> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::bd;

    fn key(cost: &str, hops: u32, sig: &str, ord: u64) -> PathOrderKey {
        PathOrderKey {
            cost: bd(cost),
            hops,
            route_signature: sig.to_string(),
            insertion_order: ord,
        }
    }

    #[test]
    fn keeps_best_k_ascending() {
        let strategy = OrderingStrategy::default();
        let mut heap = ResultHeap::new(2, &strategy);
        heap.try_insert(RawCandidate {
            edges: vec![],
            key: key("5", 1, "USD->EUR", 0),
        });
        heap.try_insert(RawCandidate {
            edges: vec![],
            key: key("1", 1, "USD->EUR", 1),
        });
        heap.try_insert(RawCandidate {
            edges: vec![],
            key: key("3", 1, "USD->EUR", 2),
        });
        let out = heap.into_sorted_vec();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key.cost, bd("1"));
        assert_eq!(out[1].key.cost, bd("3"));
    }
}
