//! Resource guards that bound a single search invocation: expansion count,
//! visited-state count, and wall-clock time budget. Guards stop expansion
//! immediately on breach and the search returns whatever results it has
//! accumulated — the engine never raises an error for running out of
//! budget unless the caller opts in via `throw_on_guard_breach`.

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy)]
pub struct GuardLimits {
    max_expansions: Option<u64>,
    max_visited_states: Option<u64>,
    time_budget_ms: Option<u64>,
}

impl GuardLimits {
    pub fn new(
        max_expansions: u64,
        max_visited_states: u64,
        time_budget_ms: Option<u64>,
    ) -> CoreResult<Self> {
        if max_expansions == 0 {
            return Err(CoreError::invalid_input("maxExpansions must be >= 1"));
        }
        if max_visited_states == 0 {
            return Err(CoreError::invalid_input("maxVisitedStates must be >= 1"));
        }
        if let Some(0) = time_budget_ms {
            return Err(CoreError::invalid_input("timeBudgetMs must be >= 1 when set"));
        }
        Ok(Self {
            max_expansions: Some(max_expansions),
            max_visited_states: Some(max_visited_states),
            time_budget_ms,
        })
    }

    /// The dedicated unbounded configuration — zero limits are otherwise
    /// rejected at validation.
    pub fn unbounded() -> Self {
        Self {
            max_expansions: None,
            max_visited_states: None,
            time_budget_ms: None,
        }
    }

    pub fn max_expansions(&self) -> u64 {
        self.max_expansions.unwrap_or(u64::MAX)
    }

    pub fn max_visited_states(&self) -> u64 {
        self.max_visited_states.unwrap_or(u64::MAX)
    }

    pub fn time_budget_ms(&self) -> Option<u64> {
        self.time_budget_ms
    }
}

/// Aggregated counters and breach flags for one or more search
/// invocations. The Top-K driver sums counters across iterations and
/// ORs breach flags together (property 8).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardReport {
    pub expansions: u64,
    pub visited_states: u64,
    pub elapsed_ms: u64,
    pub expansions_reached: bool,
    pub visited_states_reached: bool,
    pub time_reached: bool,
}

impl GuardReport {
    pub fn any_breach(&self) -> bool {
        self.expansions_reached || self.visited_states_reached || self.time_reached
    }

    /// Folds `other`'s counters and flags into `self`: counters sum,
    /// flags OR, elapsed time takes the larger of the two (a wall-clock
    /// measurement, not a counter, so summing would misrepresent it).
    pub fn merge(&mut self, other: &GuardReport) {
        self.expansions += other.expansions;
        self.visited_states += other.visited_states;
        self.elapsed_ms = self.elapsed_ms.max(other.elapsed_ms);
        self.expansions_reached |= other.expansions_reached;
        self.visited_states_reached |= other.visited_states_reached;
        self.time_reached |= other.time_reached;
    }
}
