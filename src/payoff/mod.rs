//! Payoff summary and cost accumulation

mod cost;
mod summary;

pub use cost::{total_cost, trapezoid};
pub use summary::{Outcome, PayoffEvent, Summary};
