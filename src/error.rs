//! Classified error taxonomy for the search engine's public surface.

use thiserror::Error;

use crate::search::guards::GuardReport;

/// The crate's single error type. Construction and validation failures are
/// always `InvalidInput`; arithmetic that cannot be represented at a
/// requested scale is `PrecisionViolation` and indicates a programming
/// mistake rather than bad input. `GuardLimitExceeded` is only ever
/// produced when a caller opts in via `PathSearchConfig::throw_on_guard_breach`;
/// otherwise guard breaches are reported silently through `GuardReport`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("precision violation: {reason}")]
    PrecisionViolation { reason: String },

    #[error("guard limit exceeded: {report:?}")]
    GuardLimitExceeded { report: GuardReport },

    /// Reserved for callers that want "no plan found" treated as an
    /// exceptional outcome. The engine itself never raises this — an
    /// empty result set is returned, not an error.
    #[error("no execution plan satisfies the request")]
    InfeasiblePath,
}

impl CoreError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn precision_violation(reason: impl Into<String>) -> Self {
        Self::PrecisionViolation {
            reason: reason.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
