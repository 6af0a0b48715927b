//! Payment and interest coefficients driving the balance ODE
//!
//! The balance evolves as `dB/dt = -payment(t, B) + interest(t) * B`, with time
//! measured in months and rates expressed per month.

mod rates;
mod payment;

pub use rates::RateCurve;
pub use payment::PaymentRule;

use serde::{Deserialize, Serialize};

use crate::error::PayoffError;

/// Number of compounding periods per year (rates are monthly)
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Instantaneous payment and interest rates of a loan
///
/// Implementations must be pure: the integrator evaluates them at trial
/// points it may later discard.
pub trait CoefficientModel {
    /// Payment rate (currency per month) at time `t` for current balance
    fn payment_rate(&self, t: f64, balance: f64) -> Result<f64, PayoffError>;

    /// Monthly interest rate at time `t`
    fn interest_rate(&self, t: f64) -> f64;

    /// Right-hand side of the balance ODE
    fn balance_derivative(&self, t: f64, balance: f64) -> Result<f64, PayoffError> {
        Ok(-self.payment_rate(t, balance)? + self.interest_rate(t) * balance)
    }

    /// End of the amortization term governing the balance from `t` onwards
    ///
    /// An amortized payment drives the balance to zero exactly at its term,
    /// where the payment formula itself is undefined. `None` when no such
    /// term lies ahead.
    fn amortization_end(&self, _t: f64) -> Option<f64> {
        None
    }
}

/// Month at which a stepped schedule switches from its first to its second rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwitchPoint {
    /// Switch month
    pub month: f64,

    /// Whether the switch month itself still belongs to the earlier segment
    /// (`t <= month`) rather than the later one (`t < month`)
    #[serde(default)]
    pub inclusive: bool,
}

impl SwitchPoint {
    /// Later segment starts at `month` (`t < month` is before)
    pub fn at(month: f64) -> Self {
        Self { month, inclusive: false }
    }

    /// Earlier segment includes `month` (`t <= month` is before)
    pub fn after(month: f64) -> Self {
        Self { month, inclusive: true }
    }

    /// True if `t` falls in the earlier segment
    pub fn is_before(&self, t: f64) -> bool {
        if self.inclusive {
            t <= self.month
        } else {
            t < self.month
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PayoffError> {
        if !self.month.is_finite() {
            return Err(PayoffError::invalid("switch month must be finite"));
        }
        Ok(())
    }
}

/// Coefficients of one loan: a payment rule and the interest curve it accrues on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanCoefficients {
    pub payment: PaymentRule,
    pub interest: RateCurve,
}

impl LoanCoefficients {
    pub fn new(payment: PaymentRule, interest: RateCurve) -> Self {
        Self { payment, interest }
    }

    /// Constant payment against a constant monthly interest rate
    pub fn constant(monthly_payment: f64, monthly_rate: f64) -> Self {
        Self::new(
            PaymentRule::constant(monthly_payment),
            RateCurve::flat(monthly_rate),
        )
    }

    /// Check every parameter is usable before integration starts
    pub fn validate(&self) -> Result<(), PayoffError> {
        self.payment.validate()?;
        self.interest.validate()
    }
}

impl CoefficientModel for LoanCoefficients {
    fn payment_rate(&self, t: f64, balance: f64) -> Result<f64, PayoffError> {
        self.payment.rate(t, balance, &self.interest)
    }

    fn interest_rate(&self, t: f64) -> f64 {
        self.interest.monthly_rate(t)
    }

    fn amortization_end(&self, t: f64) -> Option<f64> {
        self.payment.amortization_end(t)
    }
}
