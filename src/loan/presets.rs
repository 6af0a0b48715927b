//! Named reference scenarios
//!
//! Coefficient tables for the loans the engine was first built to compare:
//! a basic constant-payment loan, fixed vs. stepped-rate vs. oscillating-rate
//! mortgages on the same payment, and tracker mortgages that switch from a fixed deal to a drifting rate with
//! the payment re-amortized over the remaining term.

use super::Scenario;
use crate::coefficients::{LoanCoefficients, PaymentRule, RateCurve, SwitchPoint};

/// Length of the initial fixed deal on the tracker mortgages (months)
const FIXED_DEAL_MONTHS: f64 = 60.0;

/// Horizon for the tracker comparisons (60 years)
const TRACKER_HORIZON_MONTHS: f64 = 720.0;

/// All preset names, in report order
pub const PRESET_NAMES: [&str; 8] = [
    "basic",
    "fixed",
    "variable",
    "osc-tracker",
    "tracker-25y-20k",
    "tracker-25y-40k",
    "tracker-15y-20k",
    "tracker-15y-40k",
];

/// Look up a preset by name
pub fn preset(name: &str) -> Option<Scenario> {
    let scenario = match name {
        "basic" => basic(),
        "fixed" => fixed_rate(),
        "variable" => variable_rate(),
        "osc-tracker" => oscillating_tracker(),
        "tracker-25y-20k" => tracker(name, 200_000.0, 1148.0, 0.0482, 10.0, 300.0, false),
        "tracker-25y-40k" => tracker(name, 180_000.0, 957.0, 0.0407, 46.0, 300.0, true),
        "tracker-15y-20k" => tracker(name, 200_000.0, 1563.0, 0.0482, 10.0, 180.0, false),
        "tracker-15y-40k" => tracker(name, 180_000.0, 1338.0, 0.0407, 46.0, 180.0, true),
        _ => return None,
    };
    Some(scenario)
}

/// Every preset, in report order
pub fn all_presets() -> Vec<Scenario> {
    PRESET_NAMES.iter().filter_map(|name| preset(name)).collect()
}

/// £20k at 4.36% per month against a £1000 monthly payment
fn basic() -> Scenario {
    Scenario::new("basic", 20_000.0, LoanCoefficients::constant(1000.0, 0.0436))
}

/// £220k at a fixed 5.5% annual rate
fn fixed_rate() -> Scenario {
    Scenario::new(
        "fixed",
        220_000.0,
        LoanCoefficients::new(PaymentRule::constant(1400.0), RateCurve::flat_annual(0.055)),
    )
}

/// £220k at 3.5% for five years, then 7.5%
fn variable_rate() -> Scenario {
    let interest = RateCurve::stepped(
        SwitchPoint::at(FIXED_DEAL_MONTHS),
        RateCurve::flat_annual(0.035),
        RateCurve::flat_annual(0.075),
    );
    Scenario::new(
        "variable",
        220_000.0,
        LoanCoefficients::new(PaymentRule::constant(1400.0), interest),
    )
}

/// £220k on a tracker oscillating 5% +/- 2.5% over a five year cycle
fn oscillating_tracker() -> Scenario {
    Scenario::new(
        "osc-tracker",
        220_000.0,
        LoanCoefficients::new(
            PaymentRule::constant(1400.0),
            RateCurve::sinusoidal_annual(0.05, 0.025, 60.0, 0.0),
        ),
    )
}

/// Tracker drifting 4.5% +/- 2.5% over a five year cycle
fn tracker_curve(phase_months: f64) -> RateCurve {
    RateCurve::sinusoidal_annual(0.045, 0.025, 60.0, phase_months)
}

/// Fixed deal for five years, then a tracker rate with the payment
/// re-amortized from the running balance over what is left of the term
///
/// The 40k-deposit loans price their re-amortized payment off the 20k-deposit
/// tracker curve (phase 10) while accruing interest on their own.
fn tracker(
    name: &str,
    initial_balance: f64,
    fixed_payment: f64,
    fixed_annual_rate: f64,
    phase_months: f64,
    term_months: f64,
    priced_on_reference_curve: bool,
) -> Scenario {
    let switch = SwitchPoint::after(FIXED_DEAL_MONTHS);
    let interest = RateCurve::stepped(
        switch,
        RateCurve::flat_annual(fixed_annual_rate),
        tracker_curve(phase_months),
    );
    let amortized = if priced_on_reference_curve {
        PaymentRule::amortized_on(term_months, tracker_curve(10.0))
    } else {
        PaymentRule::amortized(term_months)
    };
    let payment = PaymentRule::stepped(switch, PaymentRule::constant(fixed_payment), amortized);

    Scenario::new(name, initial_balance, LoanCoefficients::new(payment, interest))
        .with_horizon(TRACKER_HORIZON_MONTHS)
}
