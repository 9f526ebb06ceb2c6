//! Best-execution path search over a peer-to-peer order book.
//!
//! Given an [`order::OrderBook`] snapshot, a [`config::PathSearchConfig`],
//! and a target currency, [`find_best_plans`] searches a capacity-annotated
//! currency graph for up to K ranked [`topk::ExecutionPlan`]s that convert
//! a requested spend amount into the target currency within a tolerance
//! window and hop budget. All arithmetic is exact fixed-point decimal
//! (see [`decimal`]); the search itself is deterministic — identical
//! inputs always produce identical plans, guard counters, and ordering.

pub mod analyzer;
pub mod config;
pub mod decimal;
pub mod error;
pub mod filters;
pub mod graph;
pub mod materializer;
pub mod order;
pub mod ranking;
pub mod search;
pub mod topk;
pub mod value;

pub use config::{PathSearchConfig, PathSearchConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use filters::OrderFilter;
pub use order::{
    AssetPair, FeeHook, FeeMap, FeePolicy, FeeTier, Order, OrderBook, OrderId, OrderSide,
    OrderSpec,
};
pub use ranking::OrderingStrategy;
pub use search::guards::{GuardLimits, GuardReport};
pub use topk::{ExecutionPlan, ExecutionStep, SearchOutcome};
pub use value::{ExchangeRate, Money, OrderBounds, ToleranceOrigin, ToleranceWindow};

/// The crate's single entry point (spec §6): searches `book` for up to
/// `config.result_limit` ranked execution plans converting
/// `config.spend_amount` into `target_currency`.
pub fn find_best_plans(
    book: &OrderBook,
    config: &PathSearchConfig,
    target_currency: &str,
) -> CoreResult<SearchOutcome> {
    let target_currency = value::validate_currency_code(target_currency)?;
    topk::find_best_plans(book, config, &target_currency)
}
