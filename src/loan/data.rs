//! Loan scenario definition

use serde::{Deserialize, Serialize};

use crate::coefficients::LoanCoefficients;
use crate::error::PayoffError;
use crate::integrator::ReportingGrid;

/// Default upper bound on simulated time (months); runs normally stop earlier at payoff
pub const DEFAULT_HORIZON_MONTHS: f64 = 1000.0;

/// Default number of evenly spaced reporting samples over the horizon
pub const DEFAULT_SAMPLE_COUNT: usize = 5000;

fn default_horizon() -> f64 {
    DEFAULT_HORIZON_MONTHS
}

fn default_sample_count() -> usize {
    DEFAULT_SAMPLE_COUNT
}

/// One loan to simulate: starting balance, coefficients and reporting window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Label used in reports
    pub name: String,

    /// Balance outstanding at t = 0
    pub initial_balance: f64,

    pub coefficients: LoanCoefficients,

    /// Upper bound on simulated time (months)
    #[serde(default = "default_horizon")]
    pub horizon_months: f64,

    /// Number of reporting samples over `[0, horizon_months]`
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,
}

impl Scenario {
    /// Create a scenario with the default horizon and sampling
    pub fn new(name: impl Into<String>, initial_balance: f64, coefficients: LoanCoefficients) -> Self {
        Self {
            name: name.into(),
            initial_balance,
            coefficients,
            horizon_months: DEFAULT_HORIZON_MONTHS,
            sample_count: DEFAULT_SAMPLE_COUNT,
        }
    }

    pub fn with_horizon(mut self, horizon_months: f64) -> Self {
        self.horizon_months = horizon_months;
        self
    }

    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Reporting grid `linspace(0, horizon, sample_count)`
    pub fn grid(&self) -> ReportingGrid {
        ReportingGrid::new(self.horizon_months, self.sample_count)
    }

    /// Reject malformed input before any integration work
    pub fn validate(&self) -> Result<(), PayoffError> {
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(PayoffError::invalid(format!(
                "{}: initial balance must be finite and non-negative, got {}",
                self.name, self.initial_balance
            )));
        }
        if !self.horizon_months.is_finite() || self.horizon_months <= 0.0 {
            return Err(PayoffError::invalid(format!(
                "{}: horizon must be positive, got {}",
                self.name, self.horizon_months
            )));
        }
        if self.sample_count < 2 {
            return Err(PayoffError::invalid(format!(
                "{}: at least 2 samples required, got {}",
                self.name, self.sample_count
            )));
        }
        self.coefficients.validate()
    }
}
