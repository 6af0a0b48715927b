//! Error types for scenario validation, coefficient evaluation and integration

use thiserror::Error;

/// Errors that terminate a payoff run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayoffError {
    /// Malformed scenario input, or a coefficient evaluated outside its domain
    /// (for example an amortized payment with no remaining term)
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// Adaptive stepping could not make progress
    #[error("numerical non-convergence at t={t:.6} (h={step:.3e}): {reason}")]
    NumericalNonConvergence {
        /// Last accepted time
        t: f64,
        /// Step size at failure
        step: f64,
        /// What went wrong
        reason: String,
    },
}

impl PayoffError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        PayoffError::InvalidScenario(reason.into())
    }

    pub(crate) fn non_convergence(t: f64, step: f64, reason: impl Into<String>) -> Self {
        PayoffError::NumericalNonConvergence {
            t,
            step,
            reason: reason.into(),
        }
    }
}

/// Errors raised while reading scenario configuration files
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scenario '{name}' rejected: {source}")]
    Rejected {
        name: String,
        #[source]
        source: PayoffError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PayoffError::invalid("initial balance must be non-negative");
        assert_eq!(
            err.to_string(),
            "invalid scenario: initial balance must be non-negative"
        );

        let err = PayoffError::non_convergence(12.5, 1e-15, "step size underflow");
        assert!(err.to_string().starts_with("numerical non-convergence at t=12.500000"));
    }
}
