//! Builds a `Graph` from an `OrderBook`.
//!
//! For each order, two edges are emitted — one per traversable direction of
//! its asset pair — since a fixed-rate standing order can be walked by a
//! counterparty from either side, the way `ExchangeRate::invert` lets any
//! rate be read in reverse. Capacity envelopes are evaluated once at each
//! of the order's bound endpoints (min, max); the two points anchor a
//! 2-segment structure (mandatory floor + optional headroom) per spec, and
//! the builder caches a zero-`Money` per currency to avoid repeat
//! allocation, mirroring the per-builder (not global) cache note in the
//! design notes.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::decimal::CANONICAL_SCALE;
use crate::error::CoreResult;
use crate::order::{Order, OrderSide};
use crate::value::Money;

use super::{Capacity, Edge, EdgeId, Graph, Node, NodeId, Segment};

pub struct GraphBuilder {
    zero_cache: HashMap<String, Money>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            zero_cache: HashMap::new(),
        }
    }

    fn zero_money(&mut self, currency: &str) -> CoreResult<Money> {
        if let Some(m) = self.zero_cache.get(currency) {
            return Ok(m.clone());
        }
        let m = Money::zero(currency, CANONICAL_SCALE)?;
        self.zero_cache.insert(currency.to_string(), m.clone());
        Ok(m)
    }

    /// Builds a `Graph` from any ordered sequence of orders, preserving
    /// each order's existing `OrderId` (e.g. a subset already filtered out
    /// of its owning `OrderBook`).
    pub fn build(&mut self, orders: &[std::sync::Arc<Order>]) -> CoreResult<Graph> {
        let mut node_index: HashMap<String, NodeId> = HashMap::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut adjacency: HashMap<NodeId, Vec<EdgeId>> = HashMap::new();

        let mut node_for = |currency: &str,
                             nodes: &mut Vec<Node>,
                             node_index: &mut HashMap<String, NodeId>|
         -> NodeId {
            if let Some(id) = node_index.get(currency) {
                return *id;
            }
            let id = NodeId(nodes.len());
            nodes.push(Node {
                id,
                currency: currency.to_string(),
            });
            node_index.insert(currency.to_string(), id);
            id
        };

        for order in orders {
            let base_id = node_for(&order.pair().base, &mut nodes, &mut node_index);
            let quote_id = node_for(&order.pair().quote, &mut nodes, &mut node_index);

            let forward = self.build_edge(order, base_id, quote_id, OrderSide::Buy)?;
            let mut id = EdgeId(edges.len());
            let mut e = forward;
            e.id = id;
            adjacency.entry(e.from).or_default().push(id);
            edges.push(e);

            let reverse = self.build_edge(order, quote_id, base_id, OrderSide::Sell)?;
            id = EdgeId(edges.len());
            let mut e = reverse;
            e.id = id;
            adjacency.entry(e.from).or_default().push(id);
            edges.push(e);
        }

        debug!(orders = orders.len(), edges = edges.len(), "graph built");

        Ok(Graph::new(nodes, node_index, edges, adjacency))
    }

    /// Builds one directional edge for `order`. `leg_side` is the side
    /// passed to the fee policy for *this* direction — `Buy` for the
    /// base->quote edge (a BUY order's counterparty sells base into it),
    /// `Sell` for the quote->base edge (a SELL order's counterparty buys
    /// base from it). This is independent of `order.side()`, which just
    /// records the order owner's own stated intent for reporting purposes.
    fn build_edge(
        &mut self,
        order: &Arc<Order>,
        from: NodeId,
        to: NodeId,
        leg_side: OrderSide,
    ) -> CoreResult<Edge> {
        let base_ccy = order.pair().base.clone();
        let quote_ccy = order.pair().quote.clone();

        let min_base = order.bounds().min().clone();
        let max_base = order.bounds().max().clone();

        let (net_base_min, gross_base_min, quote_min) =
            self.envelope_at(order, &min_base, leg_side)?;
        let (net_base_max, gross_base_max, quote_max) =
            self.envelope_at(order, &max_base, leg_side)?;

        let net_base = Capacity::new(net_base_min.clone(), net_base_max.clone());
        let gross_base = Capacity::new(gross_base_min.clone(), gross_base_max.clone());
        let quote = Capacity::new(quote_min.clone(), quote_max.clone());

        let mandatory = Segment {
            mandatory: true,
            net_base: Capacity::new(net_base_min.clone(), net_base_min),
            quote: Capacity::new(quote_min.clone(), quote_min),
            gross_base: Capacity::new(gross_base_min.clone(), gross_base_min),
        };
        let headroom = Segment {
            mandatory: false,
            net_base: net_base.clone(),
            quote: quote.clone(),
            gross_base: gross_base.clone(),
        };

        let rate = match leg_side {
            OrderSide::Buy => order.effective_rate().clone(),
            OrderSide::Sell => order.effective_rate().invert()?,
        };

        Ok(Edge {
            id: EdgeId(0),
            from,
            to,
            from_currency: if leg_side == OrderSide::Buy {
                base_ccy.clone()
            } else {
                quote_ccy.clone()
            },
            to_currency: if leg_side == OrderSide::Buy {
                quote_ccy
            } else {
                base_ccy
            },
            side: leg_side,
            order: Arc::clone(order),
            rate,
            net_base,
            quote,
            gross_base,
            segments: vec![mandatory, headroom],
        })
    }

    /// Computes (net_base, gross_base, quote) at a single base-amount
    /// boundary, applying the order's fee policy at that exact point.
    fn envelope_at(
        &mut self,
        order: &Arc<Order>,
        base_amount: &Money,
        leg_side: OrderSide,
    ) -> CoreResult<(Money, Money, Money)> {
        let quote_raw = order.effective_rate().convert(base_amount, Some(CANONICAL_SCALE))?;
        let fees = order.fee_policy().apply(leg_side, base_amount, &quote_raw)?;

        let base_ccy = &order.pair().base;
        let quote_ccy = &order.pair().quote;

        let base_fee = fees
            .get(base_ccy)
            .cloned()
            .unwrap_or(self.zero_money(base_ccy)?);
        let quote_fee = fees
            .get(quote_ccy)
            .cloned()
            .unwrap_or(self.zero_money(quote_ccy)?);

        let net_base = base_amount.subtract(&base_fee).unwrap_or(base_amount.clone());
        let gross_base = base_amount.add(&base_fee)?;
        let quote_after_fee = quote_raw
            .subtract(&quote_fee)
            .unwrap_or(self.zero_money(quote_ccy)?);

        Ok((net_base, gross_base, quote_after_fee))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
