//! `PathSearchConfig`: the immutable, builder-constructed configuration a
//! single `find_best_plans` call runs against. Built entirely in memory —
//! loading from files or environment variables is a consumer concern, not
//! part of this crate's surface.

use crate::error::{CoreError, CoreResult};
use crate::filters::OrderFilter;
use crate::ranking::OrderingStrategy;
use crate::search::guards::GuardLimits;
use crate::value::{Money, ToleranceWindow};

#[derive(Debug)]
pub struct PathSearchConfig {
    pub spend_amount: Money,
    pub tolerance: ToleranceWindow,
    pub min_hops: u32,
    pub max_hops: u32,
    pub result_limit: usize,
    pub disjoint_plans: bool,
    pub guards: GuardLimits,
    pub filters: Vec<OrderFilter>,
    pub ordering: OrderingStrategy,
    pub throw_on_guard_breach: bool,
}

pub struct PathSearchConfigBuilder {
    spend_amount: Money,
    tolerance: ToleranceWindow,
    min_hops: u32,
    max_hops: u32,
    result_limit: usize,
    disjoint_plans: bool,
    guards: GuardLimits,
    filters: Vec<OrderFilter>,
    ordering: OrderingStrategy,
    throw_on_guard_breach: bool,
}

impl PathSearchConfigBuilder {
    pub fn new(spend_amount: Money, tolerance: ToleranceWindow) -> Self {
        Self {
            spend_amount,
            tolerance,
            min_hops: 1,
            max_hops: 1,
            result_limit: 1,
            disjoint_plans: true,
            guards: GuardLimits::unbounded(),
            filters: Vec::new(),
            ordering: OrderingStrategy::default(),
            throw_on_guard_breach: false,
        }
    }

    pub fn min_hops(mut self, min_hops: u32) -> Self {
        self.min_hops = min_hops;
        self
    }

    pub fn max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn result_limit(mut self, result_limit: usize) -> Self {
        self.result_limit = result_limit;
        self
    }

    pub fn disjoint_plans(mut self, disjoint: bool) -> Self {
        self.disjoint_plans = disjoint;
        self
    }

    pub fn guards(mut self, guards: GuardLimits) -> Self {
        self.guards = guards;
        self
    }

    pub fn filters(mut self, filters: Vec<OrderFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn ordering(mut self, ordering: OrderingStrategy) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn throw_on_guard_breach(mut self, throw: bool) -> Self {
        self.throw_on_guard_breach = throw;
        self
    }

    pub fn build(self) -> CoreResult<PathSearchConfig> {
        if self.min_hops < 1 {
            return Err(CoreError::invalid_input("minHops must be >= 1"));
        }
        if self.max_hops < self.min_hops {
            return Err(CoreError::invalid_input("maxHops must be >= minHops"));
        }
        if self.result_limit < 1 {
            return Err(CoreError::invalid_input("resultLimit must be >= 1"));
        }
        Ok(PathSearchConfig {
            spend_amount: self.spend_amount,
            tolerance: self.tolerance,
            min_hops: self.min_hops,
            max_hops: self.max_hops,
            result_limit: self.result_limit,
            disjoint_plans: self.disjoint_plans,
            guards: self.guards,
            filters: self.filters,
            ordering: self.ordering,
            throw_on_guard_breach: self.throw_on_guard_breach,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::bd;

    fn money() -> Money {
        Money::new("USD", bd("100"), 2).unwrap()
    }

    fn tolerance() -> ToleranceWindow {
        ToleranceWindow::from(bd("0.01"), bd("0.02")).unwrap()
    }

    #[test]
    fn rejects_max_hops_below_min_hops() {
        let built = PathSearchConfigBuilder::new(money(), tolerance())
            .min_hops(3)
            .max_hops(2)
            .build();
        assert!(built.is_err());
    }

    #[test]
    fn rejects_zero_result_limit() {
        let built = PathSearchConfigBuilder::new(money(), tolerance())
            .result_limit(0)
            .build();
        assert!(built.is_err());
    }

    #[test]
    fn defaults_match_spec() {
        let cfg = PathSearchConfigBuilder::new(money(), tolerance()).build().unwrap();
        assert_eq!(cfg.result_limit, 1);
        assert!(cfg.disjoint_plans);
    }
}
