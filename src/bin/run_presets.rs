//! Run every preset scenario in parallel
//!
//! Outputs one combined trajectory CSV and a payoff summary table

use anyhow::{Context, Result};
use loan_payoff::loan::all_presets;
use loan_payoff::{Outcome, ScenarioRunner};
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();

    let scenarios = all_presets();
    println!("Running {} presets...", scenarios.len());

    let start = Instant::now();
    let runner = ScenarioRunner::new();
    let results = runner.run_batch(&scenarios);
    println!("Runs complete in {:?}\n", start.elapsed());

    let output_path = "preset_trajectories.csv";
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create {}", output_path))?;
    writer.write_record(["scenario", "month", "balance"])?;

    println!(
        "{:<18} {:>12} {:>10} {:>14} {:>8}",
        "Scenario", "Months", "Years", "Total cost", "Steps"
    );
    println!("{}", "-".repeat(66));

    for (scenario, result) in scenarios.iter().zip(&results) {
        let run = match result {
            Ok(run) => run,
            Err(e) => {
                println!("{:<18} error: {}", scenario.name, e);
                continue;
            }
        };

        for (t, balance) in run.trajectory.iter() {
            writer.write_record(&[scenario.name.clone(), format!("{:.6}", t), format!("{:.6}", balance)])?;
        }

        match &run.outcome {
            Outcome::PaidOff { summary, .. } => println!(
                "{:<18} {:>12.2} {:>10.2} {:>14.2} {:>8}",
                scenario.name,
                summary.payoff_months,
                summary.payoff_years,
                summary.total_cost,
                run.stats.accepted_steps
            ),
            Outcome::NotPaidOff { final_balance, .. } => println!(
                "{:<18} not paid off within horizon (balance {:.2})",
                scenario.name, final_balance
            ),
        }
    }

    writer.flush()?;
    println!("\nTrajectories written to {}", output_path);
    Ok(())
}
