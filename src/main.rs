//! Loan Payoff CLI
//!
//! Simulates one or more loans to payoff and prints the payoff time and total cost

use anyhow::{bail, Context, Result};
use clap::Parser;
use loan_payoff::loan::{self, Scenario, PRESET_NAMES};
use loan_payoff::{IntegratorConfig, Outcome, RunResult, ScenarioRunner};
use std::path::{Path, PathBuf};

/// Continuous-time loan payoff simulator
#[derive(Parser)]
#[command(name = "loan_payoff", version, about)]
struct Cli {
    /// Named preset to run (repeatable); defaults to `basic`
    #[arg(long = "preset", value_name = "NAME")]
    presets: Vec<String>,

    /// JSON file holding one scenario or an array of scenarios
    #[arg(long, value_name = "PATH")]
    scenario_file: Option<PathBuf>,

    /// Relative local error tolerance
    #[arg(long)]
    rtol: Option<f64>,

    /// Absolute local error tolerance
    #[arg(long)]
    atol: Option<f64>,

    /// Write every run's sampled trajectory to this CSV file
    #[arg(long, value_name = "PATH")]
    trajectory_csv: Option<PathBuf>,

    /// List the available presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_presets {
        for name in PRESET_NAMES {
            println!("{}", name);
        }
        return Ok(());
    }

    let scenarios = collect_scenarios(&cli)?;

    let mut config = IntegratorConfig::default();
    if let Some(rtol) = cli.rtol {
        config.rtol = rtol;
    }
    if let Some(atol) = cli.atol {
        config.atol = atol;
    }
    config.validate().context("Invalid integrator tolerances")?;

    let runner = ScenarioRunner::with_config(config);
    let results = runner.run_batch(&scenarios);

    let mut completed = Vec::with_capacity(results.len());
    let mut failures = 0;
    for (scenario, result) in scenarios.iter().zip(results) {
        println!("{}:", scenario.name);
        match result {
            Ok(run) => {
                print_outcome(&run.outcome);
                completed.push(run);
            }
            Err(e) => {
                println!("  error: {}", e);
                failures += 1;
            }
        }
    }

    if let Some(path) = &cli.trajectory_csv {
        write_trajectories(path, &completed)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\nTrajectories written to: {}", path.display());
    }

    if failures > 0 {
        bail!("{} of {} scenario(s) failed", failures, scenarios.len());
    }
    Ok(())
}

fn collect_scenarios(cli: &Cli) -> Result<Vec<Scenario>> {
    let mut scenarios = Vec::new();
    for name in &cli.presets {
        match loan::preset(name) {
            Some(scenario) => scenarios.push(scenario),
            None => bail!(
                "Unknown preset '{}' (available: {})",
                name,
                PRESET_NAMES.join(", ")
            ),
        }
    }
    if let Some(path) = &cli.scenario_file {
        let loaded = loan::load_scenarios(path)
            .with_context(|| format!("Failed to load scenarios from {}", path.display()))?;
        scenarios.extend(loaded);
    }
    if scenarios.is_empty() {
        scenarios.extend(loan::preset("basic"));
    }
    Ok(scenarios)
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::PaidOff { summary, .. } => {
            println!("  Payoff time: {:.2} months ({:.2} years)", summary.payoff_months, summary.payoff_years);
            println!("  Total cost:  {:.2}", summary.total_cost);
        }
        Outcome::NotPaidOff {
            horizon_months,
            final_balance,
        } => {
            println!("  Not paid off within horizon ({} months)", horizon_months);
            println!("  Final balance: {:.2}", final_balance);
        }
    }
}

fn write_trajectories(path: &Path, runs: &[RunResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["scenario", "month", "balance"])?;
    for run in runs {
        for (t, balance) in run.trajectory.iter() {
            writer.write_record(&[run.name.clone(), format!("{:.6}", t), format!("{:.6}", balance)])?;
        }
    }
    writer.flush()?;
    Ok(())
}
