//! Reading per-run result files and folding a batch of runs into one summary.
//!
//! Missing or malformed per-run files are expected (a run can crash or time
//! out before writing anything) and fall back to fixed defaults per file.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::core::stats::mean;
use crate::types::config::{RunConfig, SummaryConfig};
use crate::types::{AppError, AppResult, ExitStatus, ExperimentSummary, RunResult};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// One row of the tool's statistics file; every column is optional
#[derive(Debug, Default, Deserialize)]
pub struct StatisticsRow {
    #[serde(rename = "TargetModule", default)]
    pub target_module: Option<String>,
    #[serde(rename = "AlgorithmIterations", default)]
    pub iterations: Option<u64>,
    #[serde(rename = "Coverage", default)]
    pub coverage: Option<f64>,
    #[serde(rename = "TotalTime", default)]
    pub total_time_ns: Option<u64>,
    #[serde(rename = "SearchTime", default)]
    pub search_time_ns: Option<u64>,
    #[serde(rename = "MutationScore", default)]
    pub mutation_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoverageReport {
    #[serde(default)]
    files: BTreeMap<String, FileCoverage>,
}

#[derive(Debug, Deserialize)]
struct FileCoverage {
    #[serde(default)]
    executed_lines: Vec<u32>,
    #[serde(default)]
    missing_lines: Vec<u32>,
}

/// Executed and not-executed statement lines of the target module in one report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleCoverage {
    pub executed: BTreeSet<u32>,
    pub missing: BTreeSet<u32>,
}

/// Reads run directories using the configured file names and fallback budgets
#[derive(Debug, Clone)]
pub struct RunReader {
    pub statistics_file: String,
    pub coverage_file: String,
    pub return_code_file: String,
    pub crash_prefix: String,
    /// Dotted module name used to pick the file out of the coverage report.
    /// When unset, the `TargetModule` column of the run's statistics is used.
    pub module_name: Option<String>,
    /// Elapsed time recorded for a run without statistics
    pub timeout_ns: u64,
    /// Search time recorded for a run without statistics
    pub search_time_ns: u64,
}

impl RunReader {
    pub fn from_config(summary: &SummaryConfig, run: &RunConfig) -> Self {
        Self {
            statistics_file: summary.statistics_file().to_string(),
            coverage_file: summary.coverage_file().to_string(),
            return_code_file: summary.return_code_file().to_string(),
            crash_prefix: summary.crash_prefix().to_string(),
            module_name: None,
            timeout_ns: run.timeout().saturating_mul(1_000_000_000),
            search_time_ns: run.maximum_search_time().saturating_mul(1_000_000_000),
        }
    }

    pub fn with_module(mut self, module_name: Option<String>) -> Self {
        self.module_name = module_name;
        self
    }

    /// Read one run. Never fails: each absent or unreadable file degrades to its default.
    pub fn read_run(&self, run_dir: &Path) -> RunResult {
        let mut result = RunResult::failed(self.timeout_ns, self.search_time_ns);

        let statistics = self.read_statistics(run_dir);
        if let Some(stats) = &statistics {
            result.iterations = stats.iterations.unwrap_or(0);
            result.coverage = fraction(stats.coverage, "Coverage", run_dir).unwrap_or(0.0);
            result.total_time_ns = stats.total_time_ns.unwrap_or(self.timeout_ns);
            result.search_time_ns = stats.search_time_ns.unwrap_or(self.search_time_ns);
            result.mutation_score =
                fraction(stats.mutation_score, "MutationScore", run_dir).unwrap_or(0.0);
        }

        let module = self.module_name.clone().or_else(|| {
            statistics
                .as_ref()
                .and_then(|stats| stats.target_module.clone())
        });
        if let Some(coverage) = self.read_coverage(run_dir, module.as_deref()) {
            result.executed_lines = coverage.executed;
        }

        result.exit_status = self.read_exit_status(run_dir);
        result.crash_artifacts = self.count_crash_artifacts(run_dir);
        result
    }

    pub fn read_statistics(&self, run_dir: &Path) -> Option<StatisticsRow> {
        let path = run_dir.join(&self.statistics_file);
        let mut reader = match csv::Reader::from_path(&path) {
            Ok(reader) => reader,
            Err(e) => {
                debug!("No statistics at {}: {e}", path.display());
                return None;
            }
        };
        match reader.deserialize::<StatisticsRow>().next() {
            Some(Ok(row)) => Some(row),
            Some(Err(e)) => {
                debug!("Malformed statistics at {}: {e}", path.display());
                None
            }
            None => {
                debug!("Empty statistics at {}", path.display());
                None
            }
        }
    }

    /// Coverage of the target module in this run's report, if the report exists
    pub fn read_coverage(&self, run_dir: &Path, module_name: Option<&str>) -> Option<ModuleCoverage> {
        let path = run_dir.join(&self.coverage_file);
        let contents = fs::read_to_string(&path)
            .map_err(|e| debug!("No coverage report at {}: {e}", path.display()))
            .ok()?;
        let report: CoverageReport = serde_json::from_str(&contents)
            .map_err(|e| debug!("Malformed coverage report at {}: {e}", path.display()))
            .ok()?;

        let file = select_module_file(&report.files, module_name)?;
        Some(ModuleCoverage {
            executed: file.executed_lines.iter().copied().collect(),
            missing: file.missing_lines.iter().copied().collect(),
        })
    }

    pub fn read_exit_status(&self, run_dir: &Path) -> ExitStatus {
        let path = run_dir.join(&self.return_code_file);
        match fs::read_to_string(&path) {
            Ok(text) => ExitStatus::parse_lossy(&text),
            Err(e) => {
                debug!("No exit status at {}: {e}", path.display());
                ExitStatus::NoExit
            }
        }
    }

    pub fn count_crash_artifacts(&self, run_dir: &Path) -> usize {
        let pattern = format!(
            "{}/{}*",
            glob::Pattern::escape(&run_dir.to_string_lossy()),
            glob::Pattern::escape(&self.crash_prefix)
        );
        match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).filter(|p| p.is_file()).count(),
            Err(e) => {
                debug!("Invalid crash artifact pattern {pattern}: {e}");
                0
            }
        }
    }

    /// Coverage value of each run `0..nb_runs`, missing runs counting as zero
    pub fn read_coverages(&self, experiment_dir: &Path, nb_runs: u32) -> Vec<f64> {
        (0..nb_runs)
            .map(|i| {
                let run_dir = experiment_dir.join(i.to_string());
                let coverage = self
                    .read_statistics(&run_dir)
                    .and_then(|stats| stats.coverage);
                fraction(coverage, "Coverage", &run_dir).unwrap_or(0.0)
            })
            .collect()
    }

    /// Every statement line of the target module seen in any run's coverage report
    pub fn reachable_lines(&self, experiment_dir: &Path, nb_runs: u32) -> BTreeSet<u32> {
        let mut lines = BTreeSet::new();
        for i in 0..nb_runs {
            let run_dir = experiment_dir.join(i.to_string());
            let module = self.module_name.clone().or_else(|| {
                self.read_statistics(&run_dir)
                    .and_then(|stats| stats.target_module)
            });
            if let Some(coverage) = self.read_coverage(&run_dir, module.as_deref()) {
                lines.extend(coverage.executed);
                lines.extend(coverage.missing);
            }
        }
        lines
    }
}

/// A statistics value that must lie in `[0, 1]`; anything else counts as absent
fn fraction(value: Option<f64>, column: &str, run_dir: &Path) -> Option<f64> {
    let value = value?;
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Some(value)
    } else {
        debug!(
            "Ignoring {column} = {value} in {}: not a fraction",
            run_dir.display()
        );
        None
    }
}

/// Pick the target module's entry: a path ending in the module's file path (plain
/// module before package), or the only entry of a single-file report.
fn select_module_file<'a>(
    files: &'a BTreeMap<String, FileCoverage>,
    module_name: Option<&str>,
) -> Option<&'a FileCoverage> {
    if let Some(module) = module_name {
        let base = module.replace('.', "/");
        let candidates = [format!("{base}.py"), format!("{base}/__init__.py")];
        for candidate in &candidates {
            let suffix = format!("/{candidate}");
            let found = files.iter().find(|(path, _)| {
                let normalized = path.replace('\\', "/");
                normalized == *candidate || normalized.ends_with(&suffix)
            });
            if let Some((_, file)) = found {
                return Some(file);
            }
        }
    }
    if files.len() == 1 {
        return files.values().next();
    }
    debug!(
        "Coverage report has {} files and none matches module {:?}",
        files.len(),
        module_name
    );
    None
}

/// Fold the results of all runs of one experiment. Every run counts, defaulted ones included.
pub fn fold_runs(
    experiment_name: &str,
    runs: &[RunResult],
    reachable_lines: &BTreeSet<u32>,
) -> AppResult<ExperimentSummary> {
    if runs.is_empty() {
        return Err(AppError::Custom(format!(
            "Experiment {experiment_name} has no runs to summarize"
        )));
    }
    let run_count = u32::try_from(runs.len())
        .map_err(|_| AppError::Custom(format!("Too many runs: {}", runs.len())))?;

    let mut executed_lines_histogram: BTreeMap<u32, u32> =
        reachable_lines.iter().map(|&line| (line, 0)).collect();
    let mut exit_status_histogram: BTreeMap<ExitStatus, u32> = BTreeMap::new();
    let mut crash_count = 0u64;

    for run in runs {
        for &line in &run.executed_lines {
            *executed_lines_histogram.entry(line).or_insert(0) += 1;
        }
        *exit_status_histogram.entry(run.exit_status).or_insert(0) += 1;
        crash_count += run.crash_artifacts as u64;
    }

    let summary = ExperimentSummary {
        experiment_name: experiment_name.to_string(),
        run_count,
        mean_iterations: mean_of(runs, |r| r.iterations as f64),
        mean_coverage: mean_of(runs, |r| r.coverage),
        mean_total_time: mean_of(runs, |r| r.total_time_ns as f64) / NANOS_PER_SECOND,
        mean_search_time: mean_of(runs, |r| r.search_time_ns as f64) / NANOS_PER_SECOND,
        mean_mutation_score: mean_of(runs, |r| r.mutation_score),
        crash_count,
        executed_lines_histogram,
        exit_status_histogram,
    };
    summary.validate().map_err(|reason| {
        AppError::Custom(format!(
            "Experiment {experiment_name} folds into an invalid summary: {reason}"
        ))
    })?;
    Ok(summary)
}

fn mean_of(runs: &[RunResult], field: impl Fn(&RunResult) -> f64) -> f64 {
    mean(&runs.iter().map(field).collect::<Vec<_>>())
}

/// Read runs `0..nb_runs` under `experiment_dir` and fold them into a summary
pub fn summarize_experiment(
    reader: &RunReader,
    experiment_dir: &Path,
    experiment_name: &str,
    nb_runs: u32,
) -> AppResult<ExperimentSummary> {
    let runs: Vec<RunResult> = (0..nb_runs)
        .map(|i| reader.read_run(&experiment_dir.join(i.to_string())))
        .collect();
    let reachable = reader.reachable_lines(experiment_dir, nb_runs);
    debug!(
        "{experiment_name}: {} runs, {} reachable lines",
        runs.len(),
        reachable.len()
    );
    fold_runs(experiment_name, &runs, &reachable)
}
