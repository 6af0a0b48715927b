//! Payoff results reported back to callers

use serde::Serialize;

use crate::coefficients::MONTHS_PER_YEAR;
use crate::integrator::Crossing;

/// The first downward zero-crossing of the balance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayoffEvent {
    /// Months from the start of the loan
    pub time: f64,
    /// Interpolated balance at `time` (zero to within the event tolerance)
    pub balance: f64,
    /// Root-finder iterations spent locating the crossing
    pub iterations: u32,
}

impl PayoffEvent {
    /// Payoff at the very start, for loans with nothing outstanding
    pub fn immediate() -> Self {
        Self {
            time: 0.0,
            balance: 0.0,
            iterations: 0,
        }
    }
}

impl From<Crossing> for PayoffEvent {
    fn from(crossing: Crossing) -> Self {
        Self {
            time: crossing.t,
            balance: crossing.balance,
            iterations: crossing.iterations,
        }
    }
}

/// Payoff time and total cash paid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub payoff_months: f64,
    pub payoff_years: f64,
    pub total_cost: f64,
}

impl Summary {
    pub fn new(payoff_months: f64, total_cost: f64) -> Self {
        Self {
            payoff_months,
            payoff_years: payoff_months / MONTHS_PER_YEAR,
            total_cost,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    PaidOff { event: PayoffEvent, summary: Summary },
    /// The horizon ran out with the balance still above zero; no cost is computed
    NotPaidOff { horizon_months: f64, final_balance: f64 },
}

impl Outcome {
    pub fn is_paid_off(&self) -> bool {
        matches!(self, Outcome::PaidOff { .. })
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Outcome::PaidOff { summary, .. } => Some(summary),
            Outcome::NotPaidOff { .. } => None,
        }
    }

    pub fn event(&self) -> Option<&PayoffEvent> {
        match self {
            Outcome::PaidOff { event, .. } => Some(event),
            Outcome::NotPaidOff { .. } => None,
        }
    }
}
