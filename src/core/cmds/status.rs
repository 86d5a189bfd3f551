use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::core::cli::StatusArgs;
use crate::types::config::config;
use crate::types::{AppResult, ExperimentSummary, SUMMARY_FILENAME};

#[derive(Debug, Serialize)]
pub struct ExperimentStatus {
    pub name: String,
    /// Run directories present among `0..nb_runs`
    pub started: u32,
    /// Runs whose exit status was recorded
    pub finished: u32,
    pub summary: SummaryState,
    pub mean_coverage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryState {
    Missing,
    Valid,
    Invalid,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub results_path: PathBuf,
    pub nb_runs: u32,
    pub experiments: Vec<ExperimentStatus>,
    pub progress_percent: f64,
}

pub async fn execute_status(args: StatusArgs) -> AppResult<()> {
    // --results-path is already folded into the config
    let results_path = PathBuf::from(config().run().results_path());
    let nb_runs = config().run().nb_runs();
    let return_code_file = config().summary().return_code_file().to_string();
    let report = generate_status_report(&results_path, nb_runs, &return_code_file)?;

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
        _ => {
            print_table_format(&report);
        }
    }

    Ok(())
}

/// Inspect every experiment directory under `results_path`
pub fn generate_status_report(
    results_path: &Path,
    nb_runs: u32,
    return_code_file: &str,
) -> AppResult<StatusReport> {
    let mut experiments = Vec::new();
    if results_path.is_dir() {
        let mut dirs: Vec<PathBuf> = fs::read_dir(results_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            experiments.push(experiment_status(&dir, nb_runs, return_code_file));
        }
    }

    let expected = u64::from(nb_runs) * experiments.len() as u64;
    let finished: u64 = experiments.iter().map(|e| u64::from(e.finished)).sum();
    let progress_percent = if expected > 0 {
        finished as f64 / expected as f64 * 100.0
    } else {
        0.0
    };

    Ok(StatusReport {
        results_path: results_path.to_path_buf(),
        nb_runs,
        experiments,
        progress_percent,
    })
}

fn experiment_status(dir: &Path, nb_runs: u32, return_code_file: &str) -> ExperimentStatus {
    let mut started = 0;
    let mut finished = 0;
    for i in 0..nb_runs {
        let run_dir = dir.join(i.to_string());
        if run_dir.is_dir() {
            started += 1;
            if run_dir.join(return_code_file).is_file() {
                finished += 1;
            }
        }
    }

    let (summary, mean_coverage) = if !dir.join(SUMMARY_FILENAME).is_file() {
        (SummaryState::Missing, None)
    } else {
        match ExperimentSummary::load(dir) {
            Ok(summary) => (SummaryState::Valid, Some(summary.mean_coverage)),
            Err(_) => (SummaryState::Invalid, None),
        }
    };

    ExperimentStatus {
        name: dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        started,
        finished,
        summary,
        mean_coverage,
    }
}

fn print_table_format(report: &StatusReport) {
    info!("Benchmark Status Report");
    info!("");
    info!("Results: {}", report.results_path.display());
    info!("Runs per experiment: {}", report.nb_runs);
    info!("");

    if report.experiments.is_empty() {
        info!("No experiments found. Use the 'run' command to start a benchmark.");
        return;
    }

    for experiment in &report.experiments {
        let summary = match (experiment.summary, experiment.mean_coverage) {
            (SummaryState::Valid, Some(coverage)) => format!("summary (coverage {coverage:.4})"),
            (SummaryState::Invalid, _) => "invalid summary".to_string(),
            _ => "no summary".to_string(),
        };
        info!(
            "{:<40} {:>4}/{} started, {:>4} finished, {}",
            experiment.name, experiment.started, report.nb_runs, experiment.finished, summary
        );
    }

    info!("");
    info!(
        "Experiments: {} ({:.1}% of runs finished)",
        report.experiments.len(),
        report.progress_percent
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_started_and_finished_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let exp = tmp.path().join("exp");
        fs::create_dir_all(exp.join("0")).unwrap();
        fs::write(exp.join("0").join("return_code"), "0").unwrap();
        fs::create_dir_all(exp.join("1")).unwrap();
        fs::create_dir_all(exp.join("7")).unwrap();
        fs::write(exp.join(SUMMARY_FILENAME), "{").unwrap();

        let report = generate_status_report(tmp.path(), 4, "return_code").unwrap();
        assert_eq!(report.experiments.len(), 1);
        let status = &report.experiments[0];
        assert_eq!(status.name, "exp");
        assert_eq!(status.started, 2);
        assert_eq!(status.finished, 1);
        assert_eq!(status.summary, SummaryState::Invalid);
        assert!((report.progress_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn missing_results_dir_is_empty_report() {
        let tmp = tempfile::tempdir().unwrap();
        let report = generate_status_report(&tmp.path().join("nope"), 30, "return_code").unwrap();
        assert!(report.experiments.is_empty());
        assert_eq!(report.progress_percent, 0.0);
    }
}
