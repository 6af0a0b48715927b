//! Adaptive Runge-Kutta integration of the balance ODE
//!
//! - Dormand-Prince 5(4) stepping with embedded error control
//! - Quartic dense output between accepted steps, used both for the reporting
//!   grid and for event localization
//! - Level-crossing events with direction and terminal flags, located to
//!   sub-step precision with Brent's method

mod tableau;
mod dense;
mod stepper;
mod event;
mod trajectory;
mod engine;

pub use dense::DenseStep;
pub use stepper::{DormandPrince, IntegrationStats, StepController};
pub use event::{Crossing, Direction, EventDescriptor};
pub use trajectory::{ReportingGrid, Trajectory};
pub use engine::{IntegrationOutput, Integrator, IntegratorConfig, Termination};
