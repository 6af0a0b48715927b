//! Payment rules, including amortized recomputation from the running balance

use serde::{Deserialize, Serialize};

use super::{RateCurve, SwitchPoint};
use crate::error::PayoffError;

/// Below this monthly rate the amortization formula is replaced by its limit `B / N`
const ZERO_RATE_THRESHOLD: f64 = 1e-12;

/// Payment rate (currency per month) as a function of time and balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentRule {
    /// Fixed monthly payment
    Constant { monthly_payment: f64 },

    /// Payment recomputed from the current balance so the loan would clear
    /// exactly at `term_months`:
    /// `payment = a * B / (1 - (1 + a)^(-N))`, `N = term_months - t`
    Amortized {
        term_months: f64,
        /// Rate curve the payment is priced on; the loan's interest curve if absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pricing_rate: Option<RateCurve>,
    },

    /// One rule up to the switch month, another after it
    Stepped {
        switch: SwitchPoint,
        before: Box<PaymentRule>,
        after: Box<PaymentRule>,
    },
}

impl PaymentRule {
    pub fn constant(monthly_payment: f64) -> Self {
        PaymentRule::Constant { monthly_payment }
    }

    pub fn amortized(term_months: f64) -> Self {
        PaymentRule::Amortized {
            term_months,
            pricing_rate: None,
        }
    }

    /// Amortized payment priced on a curve other than the loan's interest curve
    pub fn amortized_on(term_months: f64, pricing_rate: RateCurve) -> Self {
        PaymentRule::Amortized {
            term_months,
            pricing_rate: Some(pricing_rate),
        }
    }

    pub fn stepped(switch: SwitchPoint, before: PaymentRule, after: PaymentRule) -> Self {
        PaymentRule::Stepped {
            switch,
            before: Box::new(before),
            after: Box::new(after),
        }
    }

    /// Payment rate at time `t` for the current balance
    ///
    /// `interest` is the loan's own curve, used by amortized rules without a
    /// pricing curve of their own.
    pub fn rate(&self, t: f64, balance: f64, interest: &RateCurve) -> Result<f64, PayoffError> {
        match self {
            PaymentRule::Constant { monthly_payment } => Ok(*monthly_payment),
            PaymentRule::Amortized { term_months, pricing_rate } => {
                let a = pricing_rate.as_ref().unwrap_or(interest).monthly_rate(t);
                amortized_payment(balance, a, term_months - t, t)
            }
            PaymentRule::Stepped { switch, before, after } => {
                if switch.is_before(t) {
                    before.rate(t, balance, interest)
                } else {
                    after.rate(t, balance, interest)
                }
            }
        }
    }

    /// Term end of the amortized rule in force at `t`, or of the one a
    /// stepped schedule switches to, provided that term still lies ahead
    pub fn amortization_end(&self, t: f64) -> Option<f64> {
        match self {
            PaymentRule::Constant { .. } => None,
            PaymentRule::Amortized { term_months, .. } => {
                (*term_months > t).then_some(*term_months)
            }
            PaymentRule::Stepped { switch, before, after } => {
                if switch.is_before(t) {
                    match before.amortization_end(t) {
                        Some(end) if switch.is_before(end) => Some(end),
                        _ => after.amortization_end(switch.month),
                    }
                } else {
                    after.amortization_end(t)
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PayoffError> {
        match self {
            PaymentRule::Constant { monthly_payment } => {
                if !(monthly_payment.is_finite() && *monthly_payment >= 0.0) {
                    return Err(PayoffError::invalid(format!(
                        "monthly payment must be finite and non-negative, got {}",
                        monthly_payment
                    )));
                }
            }
            PaymentRule::Amortized { term_months, pricing_rate } => {
                if !(term_months.is_finite() && *term_months > 0.0) {
                    return Err(PayoffError::invalid(format!(
                        "amortization term must be positive, got {}",
                        term_months
                    )));
                }
                if let Some(curve) = pricing_rate {
                    curve.validate()?;
                }
            }
            PaymentRule::Stepped { switch, before, after } => {
                switch.validate()?;
                before.validate()?;
                after.validate()?;
            }
        }
        Ok(())
    }
}

/// Level payment clearing `balance` over `remaining` months at monthly rate `a`
fn amortized_payment(balance: f64, a: f64, remaining: f64, t: f64) -> Result<f64, PayoffError> {
    // Nothing left to amortize, including at the term end itself
    if balance == 0.0 {
        return Ok(0.0);
    }
    if remaining.is_nan() || remaining <= 0.0 {
        return Err(PayoffError::invalid(format!(
            "amortized payment undefined at t={:.4}: remaining term is {:.4} months",
            t, remaining
        )));
    }

    let payment = if a.abs() < ZERO_RATE_THRESHOLD {
        balance / remaining
    } else {
        a * balance / (1.0 - (1.0 + a).powf(-remaining))
    };

    if !payment.is_finite() {
        return Err(PayoffError::invalid(format!(
            "amortized payment not finite at t={:.4} (rate {}, remaining {:.4} months)",
            t, a, remaining
        )));
    }
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_payment() {
        let rule = PaymentRule::constant(1400.0);
        let interest = RateCurve::flat(0.004);
        assert_eq!(rule.rate(0.0, 220_000.0, &interest).unwrap(), 1400.0);
        assert_eq!(rule.rate(999.0, 1.0, &interest).unwrap(), 1400.0);
    }

    #[test]
    fn test_amortized_matches_annuity_formula() {
        // 200k over 25 years at 4.82% annual
        let a = 0.0482 / 12.0;
        let rule = PaymentRule::amortized(300.0);
        let interest = RateCurve::flat(a);

        let payment = rule.rate(0.0, 200_000.0, &interest).unwrap();
        let expected = a * 200_000.0 / (1.0 - (1.0 + a).powf(-300.0));
        assert_relative_eq!(payment, expected, max_relative = 1e-12);
        assert!(payment > 1140.0 && payment < 1160.0);
    }

    #[test]
    fn test_amortized_uses_remaining_term() {
        let rule = PaymentRule::amortized(300.0);
        let interest = RateCurve::flat(0.004);
        let early = rule.rate(60.0, 100_000.0, &interest).unwrap();
        let late = rule.rate(240.0, 100_000.0, &interest).unwrap();
        assert!(late > early);
    }

    #[test]
    fn test_amortized_zero_rate_limit() {
        let rule = PaymentRule::amortized(120.0);
        let interest = RateCurve::flat(0.0);
        let payment = rule.rate(20.0, 50_000.0, &interest).unwrap();
        assert_relative_eq!(payment, 500.0);
    }

    #[test]
    fn test_amortized_term_exhausted_is_domain_error() {
        let rule = PaymentRule::amortized(180.0);
        let interest = RateCurve::flat(0.004);

        assert!(matches!(
            rule.rate(180.0, 10.0, &interest),
            Err(PayoffError::InvalidScenario(_))
        ));
        assert!(matches!(
            rule.rate(200.0, 10.0, &interest),
            Err(PayoffError::InvalidScenario(_))
        ));
    }

    #[test]
    fn test_amortized_pricing_curve_override() {
        let own = RateCurve::flat(0.001);
        let pricing = RateCurve::flat(0.006);
        let rule = PaymentRule::amortized_on(180.0, pricing.clone());

        let priced = rule.rate(0.0, 100_000.0, &own).unwrap();
        let plain = PaymentRule::amortized(180.0).rate(0.0, 100_000.0, &pricing).unwrap();
        assert_relative_eq!(priced, plain);
    }

    #[test]
    fn test_stepped_payment() {
        let rule = PaymentRule::stepped(
            SwitchPoint::after(60.0),
            PaymentRule::constant(1148.0),
            PaymentRule::amortized(300.0),
        );
        let interest = RateCurve::flat(0.004);
        assert_eq!(rule.rate(60.0, 180_000.0, &interest).unwrap(), 1148.0);
        assert!(rule.rate(60.5, 180_000.0, &interest).unwrap() != 1148.0);
    }

    #[test]
    fn test_cleared_balance_needs_no_payment_at_term_end() {
        let rule = PaymentRule::amortized(180.0);
        let interest = RateCurve::flat(0.004);
        assert_eq!(rule.rate(180.0, 0.0, &interest).unwrap(), 0.0);
    }

    #[test]
    fn test_amortization_end() {
        assert_eq!(PaymentRule::constant(1400.0).amortization_end(0.0), None);
        assert_eq!(PaymentRule::amortized(300.0).amortization_end(100.0), Some(300.0));
        assert_eq!(PaymentRule::amortized(300.0).amortization_end(300.0), None);

        // Fixed deal, then amortized: the term is visible before the switch
        let tracker = PaymentRule::stepped(
            SwitchPoint::after(60.0),
            PaymentRule::constant(1148.0),
            PaymentRule::amortized(300.0),
        );
        assert_eq!(tracker.amortization_end(0.0), Some(300.0));
        assert_eq!(tracker.amortization_end(120.0), Some(300.0));

        // Amortized term running past the switch is cut off by it
        let handover = PaymentRule::stepped(
            SwitchPoint::at(100.0),
            PaymentRule::amortized(300.0),
            PaymentRule::constant(500.0),
        );
        assert_eq!(handover.amortization_end(0.0), None);

        // Switching to an amortization whose term has already passed
        let expired = PaymentRule::stepped(
            SwitchPoint::at(10.0),
            PaymentRule::constant(0.0),
            PaymentRule::amortized(5.0),
        );
        assert_eq!(expired.amortization_end(0.0), None);
    }

    #[test]
    fn test_validate_rejects_negative_payment() {
        assert!(PaymentRule::constant(-5.0).validate().is_err());
        assert!(PaymentRule::amortized(0.0).validate().is_err());
        assert!(PaymentRule::amortized(f64::NAN).validate().is_err());
    }
}
