//! Load scenarios from JSON files
//!
//! A file holds either a single scenario object or an array of them.

use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::Scenario;
use crate::error::LoadError;

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Many(Vec<Scenario>),
    One(Scenario),
}

/// Parse and validate scenarios from a JSON string
pub fn scenarios_from_json(json: &str) -> Result<Vec<Scenario>, LoadError> {
    let scenarios = match serde_json::from_str(json)? {
        ScenarioFile::Many(list) => list,
        ScenarioFile::One(scenario) => vec![scenario],
    };

    for scenario in &scenarios {
        scenario.validate().map_err(|source| LoadError::Rejected {
            name: scenario.name.clone(),
            source,
        })?;
    }

    Ok(scenarios)
}

/// Load and validate scenarios from a JSON file
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>, LoadError> {
    let json = fs::read_to_string(path)?;
    let scenarios = scenarios_from_json(&json)?;
    info!("Loaded {} scenario(s) from {}", scenarios.len(), path.display());
    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::PaymentRule;

    const SINGLE: &str = r#"{
        "name": "basic",
        "initial_balance": 20000.0,
        "coefficients": {
            "payment": { "kind": "constant", "monthly_payment": 1000.0 },
            "interest": { "kind": "flat", "monthly_rate": 0.0436 }
        }
    }"#;

    #[test]
    fn test_single_scenario_with_defaults() {
        let scenarios = scenarios_from_json(SINGLE).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, "basic");
        assert_eq!(scenarios[0].horizon_months, 1000.0);
        assert_eq!(scenarios[0].coefficients.payment, PaymentRule::constant(1000.0));
    }

    #[test]
    fn test_scenario_array() {
        let json = r#"[
            {
                "name": "tracker",
                "initial_balance": 200000.0,
                "horizon_months": 720.0,
                "sample_count": 5000,
                "coefficients": {
                    "payment": {
                        "kind": "stepped",
                        "switch": { "month": 60.0, "inclusive": true },
                        "before": { "kind": "constant", "monthly_payment": 1148.0 },
                        "after": { "kind": "amortized", "term_months": 300.0 }
                    },
                    "interest": {
                        "kind": "sinusoidal",
                        "base": 0.00375,
                        "amplitude": 0.0020833,
                        "period_months": 60.0,
                        "phase_months": 10.0
                    }
                }
            },
            {
                "name": "flat",
                "initial_balance": 1000.0,
                "coefficients": {
                    "payment": { "kind": "constant", "monthly_payment": 100.0 },
                    "interest": { "kind": "flat", "monthly_rate": 0.0 }
                }
            }
        ]"#;
        let scenarios = scenarios_from_json(json).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].horizon_months, 720.0);
    }

    #[test]
    fn test_invalid_scenario_rejected() {
        let json = SINGLE.replace("20000.0", "-5.0");
        match scenarios_from_json(&json) {
            Err(LoadError::Rejected { name, .. }) => assert_eq!(name, "basic"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            scenarios_from_json("{ not json"),
            Err(LoadError::Json(_))
        ));
    }
}
