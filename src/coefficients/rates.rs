//! Interest rate curves over time

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{SwitchPoint, MONTHS_PER_YEAR};
use crate::error::PayoffError;

/// Monthly interest rate as a function of time (months)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateCurve {
    /// Constant monthly rate
    Flat { monthly_rate: f64 },

    /// Base rate with a sinusoidal drift:
    /// `base + amplitude * sin(2π (t - phase) / period)`
    Sinusoidal {
        base: f64,
        amplitude: f64,
        period_months: f64,
        #[serde(default)]
        phase_months: f64,
    },

    /// One curve up to the switch month, another after it
    Stepped {
        switch: SwitchPoint,
        before: Box<RateCurve>,
        after: Box<RateCurve>,
    },
}

impl RateCurve {
    pub fn flat(monthly_rate: f64) -> Self {
        RateCurve::Flat { monthly_rate }
    }

    /// Flat curve from an annual rate (e.g. 0.055 for 5.5%), compounded monthly
    pub fn flat_annual(annual_rate: f64) -> Self {
        Self::flat(annual_rate / MONTHS_PER_YEAR)
    }

    /// Sinusoidal drift specified in annual terms
    pub fn sinusoidal_annual(
        annual_base: f64,
        annual_amplitude: f64,
        period_months: f64,
        phase_months: f64,
    ) -> Self {
        RateCurve::Sinusoidal {
            base: annual_base / MONTHS_PER_YEAR,
            amplitude: annual_amplitude / MONTHS_PER_YEAR,
            period_months,
            phase_months,
        }
    }

    pub fn stepped(switch: SwitchPoint, before: RateCurve, after: RateCurve) -> Self {
        RateCurve::Stepped {
            switch,
            before: Box::new(before),
            after: Box::new(after),
        }
    }

    /// Monthly rate at time `t`
    pub fn monthly_rate(&self, t: f64) -> f64 {
        match self {
            RateCurve::Flat { monthly_rate } => *monthly_rate,
            RateCurve::Sinusoidal { base, amplitude, period_months, phase_months } => {
                base + amplitude * (2.0 * PI * (t - phase_months) / period_months).sin()
            }
            RateCurve::Stepped { switch, before, after } => {
                if switch.is_before(t) {
                    before.monthly_rate(t)
                } else {
                    after.monthly_rate(t)
                }
            }
        }
    }

    /// Annualized rate at time `t` (monthly * 12)
    pub fn annual_rate(&self, t: f64) -> f64 {
        self.monthly_rate(t) * MONTHS_PER_YEAR
    }

    pub(crate) fn validate(&self) -> Result<(), PayoffError> {
        match self {
            RateCurve::Flat { monthly_rate } => {
                if !monthly_rate.is_finite() {
                    return Err(PayoffError::invalid("flat rate must be finite"));
                }
            }
            RateCurve::Sinusoidal { base, amplitude, period_months, phase_months } => {
                if ![base, amplitude, phase_months].iter().all(|v| v.is_finite()) {
                    return Err(PayoffError::invalid("sinusoidal rate parameters must be finite"));
                }
                if !(period_months.is_finite() && *period_months > 0.0) {
                    return Err(PayoffError::invalid(format!(
                        "sinusoidal period must be positive, got {}",
                        period_months
                    )));
                }
            }
            RateCurve::Stepped { switch, before, after } => {
                switch.validate()?;
                before.validate()?;
                after.validate()?;
            }
        }
        Ok(())
    }
}
