//! Single Dormand-Prince 5(4) steps with embedded error control

use log::trace;
use serde::Serialize;

use super::dense::DenseStep;
use super::tableau::{A, B, C, E, ERROR_ESTIMATOR_ORDER, STAGES};
use crate::coefficients::CoefficientModel;
use crate::error::PayoffError;

/// Work counters for one integration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IntegrationStats {
    /// Right-hand side evaluations
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

/// Step-size controller: `h_new = h * clamp(safety * err^(-1/(p+1)))`
#[derive(Debug, Clone)]
pub struct StepController {
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
            exponent: -1.0 / (ERROR_ESTIMATOR_ORDER as f64 + 1.0),
        }
    }
}

impl StepController {
    /// Growth factor after an accepted step; no growth right after a rejection
    pub fn accept_factor(&self, error_norm: f64, after_rejection: bool) -> f64 {
        let factor = if error_norm == 0.0 {
            self.max_factor
        } else {
            (self.safety * error_norm.powf(self.exponent)).min(self.max_factor)
        };
        if after_rejection {
            factor.min(1.0)
        } else {
            factor
        }
    }

    /// Shrink factor after a rejected step
    pub fn reject_factor(&self, error_norm: f64) -> f64 {
        (self.safety * error_norm.powf(self.exponent)).max(self.min_factor)
    }
}

/// Result of one attempted step, accepted or not
#[derive(Debug, Clone)]
pub struct TrialStep {
    pub t_new: f64,
    pub y_new: f64,
    /// Derivative at the new point (first stage of the next step)
    pub f_new: f64,
    /// Scaled local error; the step is acceptable when below 1
    pub error_norm: f64,
    k: [f64; STAGES + 1],
}

impl TrialStep {
    pub fn accepted(&self) -> bool {
        self.error_norm < 1.0
    }

    pub fn dense(&self, t_old: f64, y_old: f64) -> DenseStep {
        DenseStep::new(t_old, y_old, self.t_new, self.y_new, &self.k)
    }
}

/// Dormand-Prince 5(4) stepper for the scalar balance ODE
#[derive(Debug, Clone)]
pub struct DormandPrince {
    rtol: f64,
    atol: f64,
    pub controller: StepController,
}

impl DormandPrince {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self {
            rtol,
            atol,
            controller: StepController::default(),
        }
    }

    /// Evaluate `dB/dt`, rejecting non-finite values
    pub fn derivative<M: CoefficientModel + ?Sized>(
        &self,
        model: &M,
        t: f64,
        y: f64,
        stats: &mut IntegrationStats,
    ) -> Result<f64, PayoffError> {
        stats.fn_evals += 1;
        let dydt = model.balance_derivative(t, y)?;
        if !dydt.is_finite() {
            return Err(PayoffError::non_convergence(
                t,
                0.0,
                format!("non-finite derivative {} at balance {}", dydt, y),
            ));
        }
        Ok(dydt)
    }

    /// Attempt a step of size `h` from `(t, y)` where `f0 = f(t, y)`
    pub fn attempt<M: CoefficientModel + ?Sized>(
        &self,
        model: &M,
        t: f64,
        y: f64,
        f0: f64,
        h: f64,
        stats: &mut IntegrationStats,
    ) -> Result<TrialStep, PayoffError> {
        let mut k = [0.0; STAGES + 1];
        k[0] = f0;

        for i in 1..STAGES {
            let increment: f64 = A[i][..i].iter().zip(&k[..i]).map(|(a, kj)| a * kj).sum();
            k[i] = self.derivative(model, t + C[i] * h, y + h * increment, stats)?;
        }

        let y_new = y + h * B.iter().zip(&k[..STAGES]).map(|(b, ki)| b * ki).sum::<f64>();
        if !y_new.is_finite() {
            return Err(PayoffError::non_convergence(t, h, "balance overflowed"));
        }

        let t_new = t + h;
        let f_new = self.derivative(model, t_new, y_new, stats)?;
        k[STAGES] = f_new;

        let error = h * E.iter().zip(k.iter()).map(|(e, ki)| e * ki).sum::<f64>();
        let scale = self.atol + self.rtol * y.abs().max(y_new.abs());
        let error_norm = (error / scale).abs();

        trace!("trial step t={:.6} h={:.3e} err={:.3e}", t, h, error_norm);

        Ok(TrialStep {
            t_new,
            y_new,
            f_new,
            error_norm,
            k,
        })
    }

    /// Starting step size from the scale of the solution and its derivatives
    /// (Hairer, Norsett & Wanner, "Solving ODEs I", sec. II.4)
    pub fn initial_step<M: CoefficientModel + ?Sized>(
        &self,
        model: &M,
        t0: f64,
        y0: f64,
        f0: f64,
        span: f64,
        stats: &mut IntegrationStats,
    ) -> Result<f64, PayoffError> {
        if span <= 0.0 {
            return Ok(0.0);
        }
        let scale = self.atol + y0.abs() * self.rtol;
        let d0 = (y0 / scale).abs();
        let d1 = (f0 / scale).abs();

        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        let h0 = h0.min(span);

        let y1 = y0 + h0 * f0;
        let f1 = self.derivative(model, t0 + h0, y1, stats)?;
        let d2 = ((f1 - f0) / scale).abs() / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (ERROR_ESTIMATOR_ORDER as f64 + 1.0))
        };

        Ok((100.0 * h0).min(h1).min(span))
    }
}

/// Spacing between `t` and the next representable float above it
pub(crate) fn ulp(t: f64) -> f64 {
    let t = t.abs();
    f64::from_bits(t.to_bits() + 1) - t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::LoanCoefficients;
    use approx::assert_relative_eq;

    #[test]
    fn test_controller_factors() {
        let controller = StepController::default();
        assert_eq!(controller.accept_factor(0.0, false), 10.0);
        assert_eq!(controller.accept_factor(0.0, true), 1.0);
        assert!(controller.accept_factor(0.5, false) > 1.0);
        assert_eq!(controller.reject_factor(1e9), 0.2);
        assert!(controller.reject_factor(2.0) < 1.0);
    }

    #[test]
    fn test_single_step_matches_exponential() {
        // Pure interest accrual: B' = 0.01 B, exact solution B0 e^(0.01 t)
        let model = LoanCoefficients::constant(0.0, 0.01);
        let stepper = DormandPrince::new(1e-10, 1e-10);
        let mut stats = IntegrationStats::default();

        let f0 = stepper.derivative(&model, 0.0, 1000.0, &mut stats).unwrap();
        let trial = stepper.attempt(&model, 0.0, 1000.0, f0, 1.0, &mut stats).unwrap();

        assert!(trial.accepted());
        assert_relative_eq!(trial.y_new, 1000.0 * 0.01f64.exp(), max_relative = 1e-12);
        assert_relative_eq!(trial.f_new, 0.01 * trial.y_new, max_relative = 1e-12);
        assert_eq!(stats.fn_evals, 7);
    }

    #[test]
    fn test_large_step_rejected() {
        let model = LoanCoefficients::constant(0.0, 0.5);
        let stepper = DormandPrince::new(1e-10, 1e-10);
        let mut stats = IntegrationStats::default();

        let f0 = stepper.derivative(&model, 0.0, 1.0, &mut stats).unwrap();
        let trial = stepper.attempt(&model, 0.0, 1.0, f0, 10.0, &mut stats).unwrap();
        assert!(!trial.accepted());
    }

    #[test]
    fn test_initial_step_bounded_by_span() {
        let model = LoanCoefficients::constant(1000.0, 0.0436);
        let stepper = DormandPrince::new(1e-3, 1e-6);
        let mut stats = IntegrationStats::default();

        let f0 = stepper.derivative(&model, 0.0, 20_000.0, &mut stats).unwrap();
        let h = stepper.initial_step(&model, 0.0, 20_000.0, f0, 0.5, &mut stats).unwrap();
        assert!(h > 0.0 && h <= 0.5);
    }

    #[test]
    fn test_ulp() {
        assert_eq!(ulp(1.0), f64::EPSILON);
        assert!(ulp(0.0) > 0.0);
    }
}
