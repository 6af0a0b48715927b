//! Adaptive integration of the balance ODE with terminal-event detection

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::dense::DenseStep;
use super::event::{localize, Crossing, EventDescriptor, LocalizerTolerance};
use super::stepper::{ulp, DormandPrince, IntegrationStats, TrialStep};
use super::trajectory::{ReportingGrid, Trajectory};
use crate::coefficients::CoefficientModel;
use crate::error::PayoffError;

/// Configuration for an integration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Relative local error tolerance
    pub rtol: f64,

    /// Absolute local error tolerance (currency units)
    pub atol: f64,

    /// Step attempts (accepted + rejected) before giving up
    pub max_steps: u64,

    /// Event bracket width at which localization stops (months)
    pub event_time_tol: f64,

    /// |g| at which localization stops (currency units)
    pub event_balance_tol: f64,

    pub max_event_iterations: u32,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
            max_steps: 1_000_000,
            event_time_tol: 1e-6,
            event_balance_tol: 1e-9,
            max_event_iterations: 100,
        }
    }
}

impl IntegratorConfig {
    /// Tight tolerances for comparisons against closed-form solutions
    pub fn precise() -> Self {
        Self {
            rtol: 1e-10,
            atol: 1e-8,
            event_time_tol: 1e-9,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), PayoffError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.rtol) || !positive(self.atol) {
            return Err(PayoffError::invalid(format!(
                "tolerances must be positive (rtol={}, atol={})",
                self.rtol, self.atol
            )));
        }
        if !positive(self.event_time_tol)
            || self.event_balance_tol.is_nan()
            || self.event_balance_tol < 0.0
        {
            return Err(PayoffError::invalid("event tolerances must be non-negative"));
        }
        if self.max_steps == 0 || self.max_event_iterations == 0 {
            return Err(PayoffError::invalid("step and iteration budgets must be non-zero"));
        }
        Ok(())
    }

    fn localizer_tolerance(&self) -> LocalizerTolerance {
        LocalizerTolerance {
            time: self.event_time_tol,
            balance: self.event_balance_tol,
            max_iterations: self.max_event_iterations,
        }
    }
}

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Termination {
    /// A terminal event fired
    EventReached(Crossing),
    /// The horizon was reached with no terminal event
    HorizonReached { balance: f64 },
}

/// Everything an integration run produces
#[derive(Debug, Clone)]
pub struct IntegrationOutput {
    pub trajectory: Trajectory,
    pub termination: Termination,
    /// Crossings of non-terminal events, in time order
    pub crossings: Vec<Crossing>,
    pub stats: IntegrationStats,
}

/// Phases of a single run
#[derive(Debug)]
enum RunState {
    Initialized,
    Integrating,
    EventFound(DenseStep),
    Localizing(DenseStep),
    HorizonReached,
    /// Within the event time tolerance of an amortization term end
    TermEnded(f64),
    StepUnderflow { step: f64, reason: &'static str },
    Terminated(Result<Termination, PayoffError>),
}

/// Outcome of advancing by one accepted step
enum Advance {
    Accepted(TrialStep),
    Underflow { step: f64, reason: &'static str },
}

/// Mutable bookkeeping for one run
struct Cursor {
    t: f64,
    y: f64,
    /// Derivative at (t, y)
    f: f64,
    /// Next step size to try
    h: f64,
    /// Event function at (t, y)
    g: f64,
    next_sample: usize,
    attempts: u64,
}

/// Adaptive Dormand-Prince integrator for `dB/dt = -payment + interest * B`
#[derive(Debug, Clone)]
pub struct Integrator {
    config: IntegratorConfig,
    stepper: DormandPrince,
}

impl Integrator {
    pub fn new(config: IntegratorConfig) -> Self {
        let stepper = DormandPrince::new(config.rtol, config.atol);
        Self { config, stepper }
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Integrate from `t = 0` until `event` terminates the run or `grid.end()` is reached
    ///
    /// The returned trajectory holds the grid samples up to the stopping time;
    /// after a terminal event the exact crossing point is appended.
    pub fn integrate<M: CoefficientModel + ?Sized>(
        &self,
        model: &M,
        initial_balance: f64,
        grid: &ReportingGrid,
        event: &EventDescriptor,
    ) -> Result<IntegrationOutput, PayoffError> {
        self.config.validate()?;

        let horizon = grid.end();
        let mut stats = IntegrationStats::default();
        let mut trajectory = Trajectory::with_capacity(grid.len() + 1);
        let mut crossings = Vec::new();
        let mut cursor = Cursor {
            t: 0.0,
            y: initial_balance,
            f: 0.0,
            h: 0.0,
            g: event.eval(initial_balance),
            next_sample: 0,
            attempts: 0,
        };

        let mut state = RunState::Initialized;
        let termination = loop {
            state = match state {
                RunState::Initialized => {
                    cursor.f = self.stepper.derivative(model, cursor.t, cursor.y, &mut stats)?;
                    let span = model
                        .amortization_end(cursor.t)
                        .filter(|&end| end < horizon)
                        .map_or(horizon, |end| 0.5 * end);
                    cursor.h = self.stepper.initial_step(
                        model, cursor.t, cursor.y, cursor.f, span, &mut stats,
                    )?;
                    emit_samples(&mut trajectory, grid, &mut cursor.next_sample, cursor.t, |_| {
                        initial_balance
                    });
                    debug!(
                        "integrating from B0={:.2} to t={} (h0={:.3e})",
                        initial_balance, horizon, cursor.h
                    );
                    RunState::Integrating
                }
                RunState::Integrating => {
                    let term_end = model.amortization_end(cursor.t).filter(|&end| end < horizon);
                    if cursor.t >= horizon {
                        RunState::HorizonReached
                    } else if let Some(end) =
                        term_end.filter(|&end| end - cursor.t <= self.config.event_time_tol)
                    {
                        RunState::TermEnded(end)
                    } else {
                        match self.advance(model, &mut cursor, horizon, term_end, &mut stats)? {
                            Advance::Accepted(trial) => {
                                let dense = trial.dense(cursor.t, cursor.y);
                                let g_new = event.eval(trial.y_new);
                                let crossed = event.triggers(cursor.g, g_new);
                                cursor.t = trial.t_new;
                                cursor.y = trial.y_new;
                                cursor.f = trial.f_new;
                                cursor.g = g_new;
                                if crossed {
                                    RunState::EventFound(dense)
                                } else {
                                    emit_samples(
                                        &mut trajectory,
                                        grid,
                                        &mut cursor.next_sample,
                                        dense.t_end(),
                                        |t| dense.eval(t),
                                    );
                                    RunState::Integrating
                                }
                            }
                            Advance::Underflow { step, reason } => {
                                RunState::StepUnderflow { step, reason }
                            }
                        }
                    }
                }
                RunState::EventFound(dense) => {
                    trace!(
                        "sign change in [{:.6}, {:.6}]: {:.6} -> {:.6}",
                        dense.t_start(),
                        dense.t_end(),
                        dense.y_start(),
                        dense.y_end()
                    );
                    RunState::Localizing(dense)
                }
                RunState::Localizing(dense) => {
                    let crossing = localize(&dense, event, &self.config.localizer_tolerance());
                    if event.terminal {
                        emit_samples(
                            &mut trajectory,
                            grid,
                            &mut cursor.next_sample,
                            crossing.t,
                            |t| dense.eval(t),
                        );
                        trajectory.push(crossing.t, crossing.balance);
                        debug!(
                            "terminal event at t={:.6} after {} localizer iterations",
                            crossing.t, crossing.iterations
                        );
                        RunState::Terminated(Ok(Termination::EventReached(crossing)))
                    } else {
                        crossings.push(crossing);
                        emit_samples(
                            &mut trajectory,
                            grid,
                            &mut cursor.next_sample,
                            dense.t_end(),
                            |t| dense.eval(t),
                        );
                        RunState::Integrating
                    }
                }
                RunState::HorizonReached => {
                    debug!("horizon t={} reached with balance {:.2}", horizon, cursor.y);
                    RunState::Terminated(Ok(Termination::HorizonReached { balance: cursor.y }))
                }
                RunState::TermEnded(end) => {
                    // The balance runs off to zero over the last sliver of the term
                    let (t_last, y_last) = (cursor.t, cursor.y);
                    trajectory.push(t_last, y_last);
                    let g_end = event.eval(0.0);
                    if event.terminal && event.triggers(cursor.g, g_end) {
                        let t = if g_end == 0.0 {
                            end
                        } else {
                            t_last + (end - t_last) * cursor.g / (cursor.g - g_end)
                        };
                        let crossing = Crossing {
                            t,
                            balance: event.level,
                            iterations: 0,
                        };
                        emit_samples(&mut trajectory, grid, &mut cursor.next_sample, t, |s| {
                            y_last * (end - s) / (end - t_last)
                        });
                        trajectory.push(crossing.t, crossing.balance);
                        debug!("balance cleared at amortization term end t={:.6}", end);
                        RunState::Terminated(Ok(Termination::EventReached(crossing)))
                    } else {
                        warn!("amortization term ended at t={:.6} before the run completed", end);
                        RunState::Terminated(Err(PayoffError::invalid(format!(
                            "amortization term ends at t={:.4} before the run completes",
                            end
                        ))))
                    }
                }
                RunState::StepUnderflow { step, reason } => {
                    warn!("integration stalled at t={:.6}: {}", cursor.t, reason);
                    RunState::Terminated(Err(PayoffError::non_convergence(cursor.t, step, reason)))
                }
                RunState::Terminated(end) => break end,
            };
        };

        debug!(
            "{} accepted, {} rejected steps, {} derivative evaluations",
            stats.accepted_steps, stats.rejected_steps, stats.fn_evals
        );

        Ok(IntegrationOutput {
            trajectory,
            termination: termination?,
            crossings,
            stats,
        })
    }

    /// Attempt steps from the cursor until one is accepted or the step size collapses
    ///
    /// Steps cover at most half the distance to `term_end`. A trial step whose
    /// stages leave the coefficients' domain is rejected like an inaccurate
    /// one; the domain error only surfaces once the step size collapses.
    fn advance<M: CoefficientModel + ?Sized>(
        &self,
        model: &M,
        cursor: &mut Cursor,
        horizon: f64,
        term_end: Option<f64>,
        stats: &mut IntegrationStats,
    ) -> Result<Advance, PayoffError> {
        let controller = &self.stepper.controller;
        let min_step = 10.0 * ulp(cursor.t);
        let to_horizon = horizon - cursor.t;
        let to_term = term_end.map_or(f64::INFINITY, |end| 0.5 * (end - cursor.t));
        let mut h = cursor.h.max(min_step);
        let mut rejected = false;
        let mut domain_error = None;

        loop {
            if h < min_step {
                if let Some(err) = domain_error {
                    return Err(err);
                }
                return Ok(Advance::Underflow {
                    step: h,
                    reason: "step size fell below floating-point resolution",
                });
            }
            if cursor.attempts >= self.config.max_steps {
                return Ok(Advance::Underflow {
                    step: h,
                    reason: "step budget exhausted",
                });
            }
            cursor.attempts += 1;

            let clipped = h.min(to_term) >= to_horizon;
            let step = if clipped { to_horizon } else { h.min(to_term) };
            let mut trial = match self.stepper.attempt(model, cursor.t, cursor.y, cursor.f, step, stats) {
                Ok(trial) => trial,
                Err(err @ PayoffError::InvalidScenario(_)) => {
                    trace!("step from t={:.6} left the coefficient domain: {}", cursor.t, err);
                    stats.rejected_steps += 1;
                    rejected = true;
                    h = 0.5 * step;
                    domain_error = Some(err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            if trial.accepted() {
                if clipped {
                    trial.t_new = horizon;
                }
                stats.accepted_steps += 1;
                cursor.h = step * controller.accept_factor(trial.error_norm, rejected);
                return Ok(Advance::Accepted(trial));
            }

            stats.rejected_steps += 1;
            rejected = true;
            h = step * controller.reject_factor(trial.error_norm);
            trace!("rejected step at t={:.6}, retrying with h={:.3e}", cursor.t, h);
        }
    }
}

/// Push grid samples with `t <= until`, evaluating balances through `balance_at`
fn emit_samples<F: Fn(f64) -> f64>(
    trajectory: &mut Trajectory,
    grid: &ReportingGrid,
    next: &mut usize,
    until: f64,
    balance_at: F,
) {
    while *next < grid.len() {
        let t = grid.time(*next);
        if t > until {
            break;
        }
        trajectory.push(t, balance_at(t));
        *next += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::LoanCoefficients;
    use crate::integrator::event::Direction;
    use approx::assert_relative_eq;

    /// Closed form for constant payment r and rate alpha
    fn analytic_balance(b0: f64, r: f64, alpha: f64, t: f64) -> f64 {
        let growth = (alpha * t).exp();
        b0 * growth - (r / alpha) * (growth - 1.0)
    }

    #[test]
    fn test_matches_closed_form() {
        let (b0, r, alpha) = (20_000.0, 1000.0, 0.0436);
        let model = LoanCoefficients::constant(r, alpha);
        let grid = ReportingGrid::new(1000.0, 5000);
        let integrator = Integrator::new(IntegratorConfig::precise());

        let output = integrator
            .integrate(&model, b0, &grid, &EventDescriptor::payoff())
            .unwrap();

        for (t, balance) in output.trajectory.iter() {
            let expected = analytic_balance(b0, r, alpha, t);
            assert!(
                (balance - expected).abs() <= 1e-5 * b0,
                "t={} got {} expected {}",
                t,
                balance,
                expected
            );
        }

        let analytic_payoff = (r / (r - alpha * b0)).ln() / alpha;
        match output.termination {
            Termination::EventReached(crossing) => {
                assert_relative_eq!(crossing.t, analytic_payoff, epsilon = 1e-6);
                assert!(crossing.balance.abs() < 1e-3);
            }
            other => panic!("expected payoff, got {:?}", other),
        }
    }

    #[test]
    fn test_trajectory_stops_at_event() {
        let model = LoanCoefficients::constant(1000.0, 0.0436);
        let grid = ReportingGrid::new(1000.0, 5000);
        let integrator = Integrator::new(IntegratorConfig::default());

        let output = integrator
            .integrate(&model, 20_000.0, &grid, &EventDescriptor::payoff())
            .unwrap();

        let (t_last, _) = output.trajectory.last().unwrap();
        match output.termination {
            Termination::EventReached(crossing) => assert_eq!(t_last, crossing.t),
            other => panic!("expected payoff, got {:?}", other),
        }
        assert!(output.trajectory.len() < 5000);
        assert!(output.trajectory.times().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_horizon_without_event() {
        let model = LoanCoefficients::constant(100.0, 0.01);
        let grid = ReportingGrid::new(1000.0, 5000);
        let integrator = Integrator::new(IntegratorConfig::default());

        let output = integrator
            .integrate(&model, 20_000.0, &grid, &EventDescriptor::payoff())
            .unwrap();

        assert!(matches!(output.termination, Termination::HorizonReached { .. }));
        assert_eq!(output.trajectory.len(), 5000);
        assert_eq!(output.trajectory.last().unwrap().0, 1000.0);
    }

    #[test]
    fn test_non_terminal_event_records_and_continues() {
        let model = LoanCoefficients::constant(1000.0, 0.0436);
        let grid = ReportingGrid::new(1000.0, 200);
        let integrator = Integrator::new(IntegratorConfig::precise());
        let halfway = EventDescriptor {
            level: 10_000.0,
            direction: Direction::Falling,
            terminal: false,
        };

        let output = integrator.integrate(&model, 20_000.0, &grid, &halfway).unwrap();

        // The balance keeps falling through zero and past the horizon
        assert_eq!(output.crossings.len(), 1);
        assert_relative_eq!(output.crossings[0].balance, 10_000.0, epsilon = 1e-3);
        assert!(matches!(output.termination, Termination::HorizonReached { .. }));
    }

    /// Constant payment at zero interest, undefined after `valid_until`
    struct ExpiringPayment {
        monthly_payment: f64,
        valid_until: f64,
    }

    impl CoefficientModel for ExpiringPayment {
        fn payment_rate(&self, t: f64, _balance: f64) -> Result<f64, PayoffError> {
            if t > self.valid_until {
                return Err(PayoffError::invalid(format!("no payment defined at t={}", t)));
            }
            Ok(self.monthly_payment)
        }

        fn interest_rate(&self, _t: f64) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_trial_stage_outside_domain_is_rejected() {
        // Paid off at month 280; large steps would sample past month 290
        let model = ExpiringPayment {
            monthly_payment: 1000.0,
            valid_until: 290.0,
        };
        let grid = ReportingGrid::new(1000.0, 5000);
        let integrator = Integrator::new(IntegratorConfig::default());

        let output = integrator
            .integrate(&model, 280_000.0, &grid, &EventDescriptor::payoff())
            .unwrap();

        match output.termination {
            Termination::EventReached(crossing) => {
                assert_relative_eq!(crossing.t, 280.0, epsilon = 1e-6)
            }
            other => panic!("expected payoff, got {:?}", other),
        }
        assert!(output.stats.rejected_steps > 0);
    }

    #[test]
    fn test_domain_ending_before_payoff_surfaces_error() {
        let model = ExpiringPayment {
            monthly_payment: 1000.0,
            valid_until: 100.0,
        };
        let grid = ReportingGrid::new(1000.0, 5000);
        let integrator = Integrator::new(IntegratorConfig::default());

        let result = integrator.integrate(&model, 280_000.0, &grid, &EventDescriptor::payoff());
        assert!(matches!(result, Err(PayoffError::InvalidScenario(_))));
    }

    #[test]
    fn test_amortized_balance_cleared_at_term_end() {
        use crate::coefficients::{PaymentRule, RateCurve};
        let model = LoanCoefficients::new(PaymentRule::amortized(120.0), RateCurve::flat(0.004));
        let grid = ReportingGrid::new(360.0, 1000);
        let integrator = Integrator::new(IntegratorConfig::default());

        let output = integrator
            .integrate(&model, 100_000.0, &grid, &EventDescriptor::payoff())
            .unwrap();

        match output.termination {
            Termination::EventReached(crossing) => {
                assert_relative_eq!(crossing.t, 120.0, epsilon = 1e-9);
                assert_eq!(crossing.balance, 0.0);
            }
            other => panic!("expected payoff, got {:?}", other),
        }
        assert_eq!(output.trajectory.last(), Some((120.0, 0.0)));
        assert!(output.trajectory.balances().iter().all(|b| b.is_finite()));
    }

    #[test]
    fn test_amortization_term_ending_before_event_is_invalid() {
        use crate::coefficients::{PaymentRule, RateCurve};
        // The amortized balance reaches zero at month 12 but never the level below it
        let model = LoanCoefficients::new(PaymentRule::amortized(12.0), RateCurve::flat(0.0));
        let grid = ReportingGrid::new(24.0, 100);
        let integrator = Integrator::new(IntegratorConfig::default());

        let event = EventDescriptor {
            level: -1.0,
            ..EventDescriptor::payoff()
        };
        let result = integrator.integrate(&model, 1000.0, &grid, &event);
        assert!(matches!(result, Err(PayoffError::InvalidScenario(_))));
    }

    #[test]
    fn test_step_budget_exhaustion_is_non_convergence() {
        let model = LoanCoefficients::constant(1000.0, 0.0436);
        let grid = ReportingGrid::new(1000.0, 10);
        let config = IntegratorConfig {
            max_steps: 3,
            ..IntegratorConfig::precise()
        };
        let integrator = Integrator::new(config);

        let result = integrator.integrate(&model, 20_000.0, &grid, &EventDescriptor::payoff());
        assert!(matches!(
            result,
            Err(PayoffError::NumericalNonConvergence { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = IntegratorConfig {
            rtol: -1.0,
            ..Default::default()
        };
        let model = LoanCoefficients::constant(1.0, 0.0);
        let grid = ReportingGrid::new(10.0, 10);
        let result = Integrator::new(config).integrate(&model, 1.0, &grid, &EventDescriptor::payoff());
        assert!(matches!(result, Err(PayoffError::InvalidScenario(_))));
    }
}
