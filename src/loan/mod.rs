//! Loan scenarios: definition, JSON loading and named presets

mod data;
pub mod loader;
pub mod presets;

pub use data::{Scenario, DEFAULT_HORIZON_MONTHS, DEFAULT_SAMPLE_COUNT};
pub use loader::{load_scenarios, scenarios_from_json};
pub use presets::{all_presets, preset, PRESET_NAMES};
