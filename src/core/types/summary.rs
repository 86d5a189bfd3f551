use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{AppError, AppResult, ExitKind, ExitStatus};

/// File name of the persisted summary inside an experiment directory
pub const SUMMARY_FILENAME: &str = "summary.json";

/// Aggregate over all runs of one experiment, persisted as `summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub experiment_name: String,
    #[serde(rename = "nb_runs")]
    pub run_count: u32,
    pub mean_iterations: f64,
    pub mean_coverage: f64,
    /// Seconds
    pub mean_total_time: f64,
    /// Seconds
    pub mean_search_time: f64,
    pub mean_mutation_score: f64,
    #[serde(rename = "crash_test_count")]
    pub crash_count: u64,
    #[serde(rename = "executed_lines_counter")]
    pub executed_lines_histogram: BTreeMap<u32, u32>,
    #[serde(rename = "return_code_counter")]
    pub exit_status_histogram: BTreeMap<ExitStatus, u32>,
}

impl ExperimentSummary {
    /// Resolve an experiment argument: either an experiment directory or a summary file
    pub fn resolve_path(experiment: &Path) -> PathBuf {
        if experiment.is_dir() {
            experiment.join(SUMMARY_FILENAME)
        } else {
            experiment.to_path_buf()
        }
    }

    /// Load and validate a summary. A missing file is fatal for every caller.
    pub fn load(experiment: &Path) -> AppResult<Self> {
        let path = Self::resolve_path(experiment);
        let contents = fs::read_to_string(&path).map_err(|e| {
            AppError::Custom(format!("Cannot read summary {}: {e}", path.display()))
        })?;
        let summary: ExperimentSummary =
            serde_json::from_str(&contents).map_err(|e| AppError::InvalidSummary {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        summary
            .validate()
            .map_err(|reason| AppError::InvalidSummary { path, reason })?;
        Ok(summary)
    }

    pub fn save(&self, experiment_dir: &Path) -> AppResult<PathBuf> {
        let path = experiment_dir.join(SUMMARY_FILENAME);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Check the invariants every consumer relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.run_count == 0 {
            return Err("nb_runs must be greater than zero".to_string());
        }
        let status_total: u64 = self
            .exit_status_histogram
            .values()
            .map(|&c| u64::from(c))
            .sum();
        if status_total != u64::from(self.run_count) {
            return Err(format!(
                "return_code_counter sums to {status_total}, expected {}",
                self.run_count
            ));
        }
        if let Some((line, count)) = self
            .executed_lines_histogram
            .iter()
            .find(|&(_, &count)| count > self.run_count)
        {
            return Err(format!(
                "line {line} executed {count} times, more than {} runs",
                self.run_count
            ));
        }
        for (name, value) in [
            ("mean_coverage", self.mean_coverage),
            ("mean_mutation_score", self.mean_mutation_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} out of [0, 1]: {value}"));
            }
        }
        for (name, value) in [
            ("mean_iterations", self.mean_iterations),
            ("mean_total_time", self.mean_total_time),
            ("mean_search_time", self.mean_search_time),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number: {value}"));
            }
        }
        Ok(())
    }

    /// Number of runs whose exit status falls into `kind`
    pub fn exit_count(&self, kind: ExitKind) -> u32 {
        self.exit_status_histogram
            .iter()
            .filter(|(status, _)| status.kind() == kind)
            .map(|(_, count)| count)
            .sum()
    }

    /// Number of runs that executed `line`; lines outside the histogram count as zero
    pub fn line_hits(&self, line: u32) -> u32 {
        self.executed_lines_histogram
            .get(&line)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ExperimentSummary {
        ExperimentSummary {
            experiment_name: "baseline".to_string(),
            run_count: 3,
            mean_iterations: 12.0,
            mean_coverage: 0.5,
            mean_total_time: 10.0,
            mean_search_time: 5.0,
            mean_mutation_score: 0.25,
            crash_count: 1,
            executed_lines_histogram: BTreeMap::from([(1, 3), (2, 0), (10, 1)]),
            exit_status_histogram: BTreeMap::from([
                (ExitStatus::Code(0), 2),
                (ExitStatus::NoExit, 1),
            ]),
        }
    }

    #[test]
    fn serializes_with_interchange_field_names() {
        let value = serde_json::to_value(summary()).unwrap();
        assert_eq!(value["nb_runs"], 3);
        assert_eq!(value["crash_test_count"], 1);
        assert_eq!(value["executed_lines_counter"]["10"], 1);
        assert_eq!(value["return_code_counter"]["null"], 1);
        assert_eq!(value["return_code_counter"]["0"], 2);
    }

    #[test]
    fn parses_summary_written_by_older_tooling() {
        let text = r#"{
            "experiment_name": "typed",
            "nb_runs": 2,
            "mean_iterations": 3.5,
            "mean_coverage": 0.75,
            "mean_total_time": 1.0,
            "mean_search_time": 0.5,
            "mean_mutation_score": 0.0,
            "crash_test_count": 0,
            "executed_lines_counter": {"3": 2, "4": 1},
            "return_code_counter": {"-11": 1, "null": 1}
        }"#;
        let parsed: ExperimentSummary = serde_json::from_str(text).unwrap();
        assert_eq!(parsed.line_hits(3), 2);
        assert_eq!(parsed.line_hits(99), 0);
        assert_eq!(parsed.exit_count(ExitKind::SegmentationFault), 1);
        assert_eq!(parsed.exit_count(ExitKind::Timeout), 1);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn rejects_status_counts_that_do_not_match_runs() {
        let mut s = summary();
        s.exit_status_histogram.insert(ExitStatus::Code(1), 1);
        assert!(s.validate().unwrap_err().contains("return_code_counter"));
    }

    #[test]
    fn rejects_line_counts_above_run_count() {
        let mut s = summary();
        s.executed_lines_histogram.insert(5, 4);
        assert!(s.validate().unwrap_err().contains("line 5"));
    }

    #[test]
    fn rejects_empty_experiment() {
        let mut s = summary();
        s.run_count = 0;
        s.exit_status_histogram.clear();
        assert!(s.validate().is_err());
    }
}
