//! Total cash paid over a realized trajectory
//!
//! Used to cost a loan once the payoff time is known

use crate::coefficients::CoefficientModel;
use crate::error::PayoffError;
use crate::integrator::Trajectory;

/// Integrate the payment rate over `[0, payoff_time]` with the trapezoidal rule
///
/// Uses the trajectory samples with `t <= payoff_time`; the runner's
/// trajectories end on the exact payoff sample, so the interval is covered in full.
pub fn total_cost<M: CoefficientModel + ?Sized>(
    model: &M,
    trajectory: &Trajectory,
    payoff_time: f64,
) -> Result<f64, PayoffError> {
    let mut times = Vec::with_capacity(trajectory.len());
    let mut payments = Vec::with_capacity(trajectory.len());

    for (t, balance) in trajectory.up_to(payoff_time) {
        times.push(t);
        payments.push(model.payment_rate(t, balance)?);
    }

    Ok(trapezoid(&times, &payments))
}

/// Trapezoidal rule over paired samples; zero for fewer than two points
pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}
