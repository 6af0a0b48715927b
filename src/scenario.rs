//! Scenario runner for single and batch payoff simulations
//!
//! Holds one integrator configuration and applies it to any number of
//! scenarios. Runs are independent, so batches fan out across threads.

use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::PayoffError;
use crate::integrator::{
    EventDescriptor, IntegrationStats, Integrator, IntegratorConfig, Termination, Trajectory,
};
use crate::loan::Scenario;
use crate::payoff::{total_cost, Outcome, PayoffEvent, Summary};

/// Everything a single scenario run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Scenario name, carried through for reporting
    pub name: String,
    /// Reporting samples up to payoff (or the horizon)
    pub trajectory: Trajectory,
    pub outcome: Outcome,
    pub stats: IntegrationStats,
}

/// Runs loan scenarios with a shared integrator configuration
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new();
/// let scenario = loan::preset("basic").unwrap();
/// let result = runner.run(&scenario)?;
/// println!("{:?}", result.outcome.summary());
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    integrator: Integrator,
}

impl ScenarioRunner {
    /// Create runner with the default tolerances
    pub fn new() -> Self {
        Self::with_config(IntegratorConfig::default())
    }

    /// Create runner with specific tolerances
    pub fn with_config(config: IntegratorConfig) -> Self {
        Self {
            integrator: Integrator::new(config),
        }
    }

    pub fn config(&self) -> &IntegratorConfig {
        self.integrator.config()
    }

    /// Simulate one scenario to payoff or the end of its horizon
    pub fn run(&self, scenario: &Scenario) -> Result<RunResult, PayoffError> {
        scenario.validate()?;
        self.integrator.config().validate()?;

        if scenario.initial_balance == 0.0 {
            debug!("{}: nothing outstanding, paid off at t=0", scenario.name);
            let mut trajectory = Trajectory::with_capacity(1);
            trajectory.push(0.0, 0.0);
            return Ok(RunResult {
                name: scenario.name.clone(),
                trajectory,
                outcome: Outcome::PaidOff {
                    event: PayoffEvent::immediate(),
                    summary: Summary::new(0.0, 0.0),
                },
                stats: IntegrationStats::default(),
            });
        }

        let output = self.integrator.integrate(
            &scenario.coefficients,
            scenario.initial_balance,
            &scenario.grid(),
            &EventDescriptor::payoff(),
        )?;

        let outcome = match output.termination {
            Termination::EventReached(crossing) => {
                let cost = total_cost(&scenario.coefficients, &output.trajectory, crossing.t)?;
                let summary = Summary::new(crossing.t, cost);
                info!(
                    "{}: paid off after {:.2} months ({:.2} years), total cost {:.2}",
                    scenario.name, summary.payoff_months, summary.payoff_years, summary.total_cost
                );
                Outcome::PaidOff {
                    event: crossing.into(),
                    summary,
                }
            }
            Termination::HorizonReached { balance } => {
                info!(
                    "{}: not paid off within {} months (balance {:.2})",
                    scenario.name, scenario.horizon_months, balance
                );
                Outcome::NotPaidOff {
                    horizon_months: scenario.horizon_months,
                    final_balance: balance,
                }
            }
        };

        Ok(RunResult {
            name: scenario.name.clone(),
            trajectory: output.trajectory,
            outcome,
            stats: output.stats,
        })
    }

    /// Run many scenarios in parallel; results come back in input order
    pub fn run_batch(&self, scenarios: &[Scenario]) -> Vec<Result<RunResult, PayoffError>> {
        scenarios.par_iter().map(|s| self.run(s)).collect()
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}
