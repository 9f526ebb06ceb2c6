//! The directed, capacity-annotated multigraph the search engine walks.
//!
//! Nodes are keyed by currency; edges carry the originating `Order`'s rate
//! and a list of `Segment`s describing how much of that order's liquidity
//! is mandatory versus optional headroom. Graph ownership follows an arena
//! style: nodes/edges live in flat `Vec`s and are referenced by index, the
//! way `jordy25519-fulcrum`'s `PriceGraph` keeps edges in a flat lookup
//! rather than a pointer graph.

pub mod builder;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::order::{Order, OrderId, OrderSide};
use crate::value::{ExchangeRate, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub currency: String,
}

/// An inclusive `[min, max]` envelope of `Money`, compared by currency and
/// amount only.
#[derive(Debug, Clone)]
pub struct Capacity {
    pub min: Money,
    pub max: Money,
}

impl Capacity {
    pub fn new(min: Money, max: Money) -> Self {
        Self { min, max }
    }

    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    /// Intersects with `other` (same currency required). Returns `None`
    /// when the overlap is empty, or when it collapses to a strictly
    /// positive minimum over a zero-capacity maximum.
    pub fn intersect(&self, other: &Capacity) -> CoreResult<Option<Capacity>> {
        let min = if self.min.greater_than(&other.min)? {
            self.min.clone()
        } else {
            other.min.clone()
        };
        let max = if self.max.less_than(&other.max)? {
            self.max.clone()
        } else {
            other.max.clone()
        };
        if min.greater_than(&max)? {
            return Ok(None);
        }
        if max.is_zero() && !min.is_zero() {
            return Ok(None);
        }
        Ok(Some(Capacity { min, max }))
    }

    pub fn clamp(&self, amount: &Money) -> CoreResult<Money> {
        if amount.less_than(&self.min)? {
            Ok(self.min.clone())
        } else if amount.greater_than(&self.max)? {
            Ok(self.max.clone())
        } else {
            Ok(amount.clone())
        }
    }
}

/// Whether a segment is the mandatory minimum slice of an order (must be
/// used at all to touch the order) or optional headroom above it.
#[derive(Debug, Clone)]
pub struct Segment {
    pub mandatory: bool,
    pub net_base: Capacity,
    pub quote: Capacity,
    pub gross_base: Capacity,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub from_currency: String,
    pub to_currency: String,
    pub side: OrderSide,
    /// Shared reference to the originating order. Edges built from the
    /// same order (forward and reverse direction) clone this `Arc`, so
    /// they compare as the same order by identity, not by value.
    pub order: Arc<Order>,
    /// Directional rate for this edge: `from` currency -> `to` currency.
    pub rate: ExchangeRate,
    pub net_base: Capacity,
    pub quote: Capacity,
    pub gross_base: Capacity,
    pub segments: Vec<Segment>,
}

impl Edge {
    pub fn order_id(&self) -> OrderId {
        self.order.id()
    }

    /// The capacity envelope, in the `from` currency, that bounds how much
    /// of a traveling state's feasible spend range this edge can accept.
    pub fn source_capacity(&self) -> &Capacity {
        match self.side {
            OrderSide::Buy => &self.net_base,
            OrderSide::Sell => &self.quote,
        }
    }

    /// The capacity envelope, in the `to` currency, this edge can deliver.
    pub fn dest_capacity(&self) -> &Capacity {
        match self.side {
            OrderSide::Buy => &self.quote,
            OrderSide::Sell => &self.net_base,
        }
    }

    /// Maps a sub-range of `source_capacity()` into the corresponding
    /// sub-range of `dest_capacity()` by linear interpolation between the
    /// two boundary-evaluated envelope endpoints. Segments only carry two
    /// fee-evaluated data points (order minimum, order maximum), so this
    /// is exact at the endpoints and a deliberate linear approximation
    /// between them — the materializer re-derives exact amounts later.
    pub fn map_source_to_dest(&self, sub_range: &Capacity) -> CoreResult<Capacity> {
        let src = self.source_capacity();
        let dst = self.dest_capacity();
        let span = src.max.subtract(&src.min);
        let (span, degenerate) = match span {
            Ok(s) if !s.is_zero() => (s, false),
            _ => (src.max.clone(), true),
        };
        let map_point = |point: &Money| -> CoreResult<Money> {
            if degenerate {
                return Ok(dst.min.clone());
            }
            let offset = point.subtract(&src.min)?;
            let fraction = offset.amount() / span.amount();
            let dst_span = dst.max.subtract(&dst.min)?;
            let delta = dst_span.multiply(&fraction, Some(crate::decimal::CANONICAL_SCALE))?;
            dst.min.add(&delta)
        };
        Ok(Capacity {
            min: map_point(&sub_range.min)?,
            max: map_point(&sub_range.max)?,
        })
    }
}

/// An acyclic-per-query directed multigraph built fresh for each search.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    node_index: HashMap<String, NodeId>,
    edges: Vec<Edge>,
    adjacency: HashMap<NodeId, Vec<EdgeId>>,
}

impl Graph {
    pub(crate) fn new(
        nodes: Vec<Node>,
        node_index: HashMap<String, NodeId>,
        edges: Vec<Edge>,
        adjacency: HashMap<NodeId, Vec<EdgeId>>,
    ) -> Self {
        Self {
            nodes,
            node_index,
            edges,
            adjacency,
        }
    }

    pub fn node_id(&self, currency: &str) -> Option<NodeId> {
        self.node_index.get(currency).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn edges_from(&self, node: NodeId) -> &[EdgeId] {
        self.adjacency
            .get(&node)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns a graph with edges originating from any order in `excluded`
    /// removed. Aliases `self` (no copy) when nothing would be removed.
    pub fn without(self: &Arc<Self>, excluded: &std::collections::HashSet<OrderId>) -> Arc<Graph> {
        if excluded.is_empty() || !self.edges.iter().any(|e| excluded.contains(&e.order_id())) {
            return Arc::clone(self);
        }
        let kept_edges: Vec<Edge> = self
            .edges
            .iter()
            .filter(|e| !excluded.contains(&e.order_id()))
            .cloned()
            .collect();
        let mut renumbered = Vec::with_capacity(kept_edges.len());
        let mut adjacency: HashMap<NodeId, Vec<EdgeId>> = HashMap::new();
        for (idx, mut edge) in kept_edges.into_iter().enumerate() {
            edge.id = EdgeId(idx);
            adjacency.entry(edge.from).or_default().push(edge.id);
            renumbered.push(edge);
        }
        Arc::new(Graph {
            nodes: self.nodes.clone(),
            node_index: self.node_index.clone(),
            edges: renumbered,
            adjacency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::bd;
    use crate::value::Money;

    fn money(cur: &str, amt: &str) -> Money {
        Money::new(cur, bd(amt), 6).unwrap()
    }

    #[test]
    fn capacity_intersect_shrinks_to_overlap() {
        let a = Capacity::new(money("USD", "10"), money("USD", "100"));
        let b = Capacity::new(money("USD", "50"), money("USD", "200"));
        let i = a.intersect(&b).unwrap().unwrap();
        assert!(i.min.equals(&money("USD", "50")));
        assert!(i.max.equals(&money("USD", "100")));
    }

    #[test]
    fn capacity_intersect_empty_when_disjoint() {
        let a = Capacity::new(money("USD", "10"), money("USD", "20"));
        let b = Capacity::new(money("USD", "30"), money("USD", "40"));
        assert!(a.intersect(&b).unwrap().is_none());
    }
}
