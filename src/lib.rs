//! Loan Payoff - Continuous-time loan balance simulation
//!
//! This library provides:
//! - Time-dependent payment and interest models (constant, stepped, sinusoidal, amortized)
//! - Adaptive Dormand-Prince 5(4) integration of `dB/dt = -r(t, B) + a(t) * B`
//! - Payoff detection by root-finding on the dense-output interpolant
//! - Total cost of the loan from the sampled trajectory
//! - Named preset scenarios and JSON scenario files, runnable in parallel batches

pub mod coefficients;
pub mod error;
pub mod integrator;
pub mod loan;
pub mod payoff;
pub mod scenario;

// Re-export commonly used types
pub use coefficients::{CoefficientModel, LoanCoefficients, PaymentRule, RateCurve, SwitchPoint};
pub use error::{LoadError, PayoffError};
pub use integrator::{EventDescriptor, Integrator, IntegratorConfig, Trajectory};
pub use loan::Scenario;
pub use payoff::{Outcome, Summary};
pub use scenario::{RunResult, ScenarioRunner};
