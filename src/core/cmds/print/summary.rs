use std::path::PathBuf;

use log::info;
use strum::IntoEnumIterator;

use crate::types::{AppResult, ExitKind, ExperimentSummary};

pub async fn execute(experiment: PathBuf, format: String) -> AppResult<()> {
    let summary = ExperimentSummary::load(&experiment)?;
    print_summary(&summary, &format)
}

/// Print a summary as its JSON file content or as a readable report
pub fn print_summary(summary: &ExperimentSummary, format: &str) -> AppResult<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    info!("Experiment: {}", summary.experiment_name);
    info!("  runs: {}", summary.run_count);
    info!("  mean coverage: {:.4}", summary.mean_coverage);
    info!("  mean iterations: {:.2}", summary.mean_iterations);
    info!("  mean total time: {:.2}s", summary.mean_total_time);
    info!("  mean search time: {:.2}s", summary.mean_search_time);
    info!("  mean mutation score: {:.4}", summary.mean_mutation_score);
    info!("  crash tests: {}", summary.crash_count);

    info!("");
    info!("Exit statuses:");
    for kind in ExitKind::iter() {
        let count = summary.exit_count(kind);
        if count > 0 {
            info!("  {kind}: {count}");
        }
    }
    info!("  raw: {}", format_status_counts(summary));

    let reachable = summary.executed_lines_histogram.len();
    let executed = summary
        .executed_lines_histogram
        .values()
        .filter(|&&count| count > 0)
        .count();
    info!("");
    info!("Lines: {executed} of {reachable} executed by at least one run");

    Ok(())
}

/// `0: 28, null: 2`
pub fn format_status_counts(summary: &ExperimentSummary) -> String {
    summary
        .exit_status_histogram
        .iter()
        .map(|(status, count)| format!("{status}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
