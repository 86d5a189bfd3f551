//! Per-line views over experiment summaries: hit-count tests, hit frequencies
//! and the overlap of executed lines.

use std::collections::BTreeSet;
use std::io;

use log::info;
use serde::Serialize;

use crate::core::cli::{FrequencyArgs, OverlapArgs, PairArgs};
use crate::core::stats::{bernoulli_sample, compare};
use crate::types::{AppError, AppResult, Comparison, ExperimentSummary};

#[derive(Debug, Serialize)]
pub struct LineComparison {
    pub line: u32,
    pub first_hits: u32,
    pub second_hits: u32,
    pub comparison: Comparison,
}

/// Compare hit counts of every line seen by either experiment, in line order
pub fn compare_lines(
    first: &ExperimentSummary,
    second: &ExperimentSummary,
) -> AppResult<Vec<LineComparison>> {
    let lines: BTreeSet<u32> = first
        .executed_lines_histogram
        .keys()
        .chain(second.executed_lines_histogram.keys())
        .copied()
        .collect();

    let mut results = Vec::with_capacity(lines.len());
    for line in lines {
        let first_hits = first.line_hits(line);
        let second_hits = second.line_hits(line);
        let comparison = compare(
            &bernoulli_sample(first_hits, first.run_count)?,
            &bernoulli_sample(second_hits, second.run_count)?,
        )?;
        results.push(LineComparison {
            line,
            first_hits,
            second_hits,
            comparison,
        });
    }
    Ok(results)
}

pub async fn execute_line_compare(args: PairArgs) -> AppResult<()> {
    let first = ExperimentSummary::load(&args.first)?;
    let second = ExperimentSummary::load(&args.second)?;

    for result in compare_lines(&first, &second)? {
        info!(
            "Line {:<4} Mann-Whitney U-test: {} (pvalue: {:.4}), A: {:.2} ({}), hits {}/{} vs {}/{}",
            result.line,
            result.comparison.u_statistic,
            result.comparison.p_value,
            result.comparison.effect_size,
            result.comparison.label,
            result.first_hits,
            first.run_count,
            result.second_hits,
            second.run_count
        );
    }
    Ok(())
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FrequencyRow {
    pub line: u32,
    /// One entry per experiment, in argument order
    pub frequencies: Vec<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FrequencyReport {
    pub experiments: Vec<String>,
    pub total_runs: u32,
    pub lines: Vec<FrequencyRow>,
}

/// Hit count of each line divided by the number of runs across all experiments
pub fn line_frequencies(summaries: &[ExperimentSummary]) -> AppResult<FrequencyReport> {
    let total_runs: u32 = summaries.iter().map(|s| s.run_count).sum();
    if total_runs == 0 {
        return Err(AppError::Custom(
            "No runs to compute frequencies over".to_string(),
        ));
    }

    let lines: BTreeSet<u32> = summaries
        .iter()
        .flat_map(|s| s.executed_lines_histogram.keys().copied())
        .collect();
    let rows = lines
        .into_iter()
        .map(|line| FrequencyRow {
            line,
            frequencies: summaries
                .iter()
                .map(|s| f64::from(s.line_hits(line)) / f64::from(total_runs))
                .collect(),
        })
        .collect();

    Ok(FrequencyReport {
        experiments: summaries.iter().map(|s| s.experiment_name.clone()).collect(),
        total_runs,
        lines: rows,
    })
}

pub async fn execute_frequency(args: FrequencyArgs) -> AppResult<()> {
    let summaries = args
        .experiments
        .iter()
        .map(|path| ExperimentSummary::load(path))
        .collect::<AppResult<Vec<_>>>()?;
    let report = line_frequencies(&summaries)?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "csv" => {
            let mut writer = csv::Writer::from_writer(io::stdout());
            let mut header = vec!["line".to_string()];
            header.extend(report.experiments.iter().cloned());
            writer.write_record(&header)?;
            for row in &report.lines {
                let mut record = vec![row.line.to_string()];
                record.extend(row.frequencies.iter().map(|f| f.to_string()));
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        _ => {
            info!(
                "Line hit frequency over {} runs ({})",
                report.total_runs,
                report.experiments.join(", ")
            );
            for row in &report.lines {
                let cells: Vec<String> = row.frequencies.iter().map(|f| format!("{f:>8.4}")).collect();
                info!("{:<6}{}", row.line, cells.join(" "));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Overlap {
    pub only_first: Vec<u32>,
    pub both: Vec<u32>,
    pub only_second: Vec<u32>,
}

/// Partition the lines executed by at least one run of either experiment
pub fn line_overlap(first: &ExperimentSummary, second: &ExperimentSummary) -> Overlap {
    let executed = |summary: &ExperimentSummary| -> BTreeSet<u32> {
        summary
            .executed_lines_histogram
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(&line, _)| line)
            .collect()
    };
    let first_lines = executed(first);
    let second_lines = executed(second);

    Overlap {
        only_first: first_lines.difference(&second_lines).copied().collect(),
        both: first_lines.intersection(&second_lines).copied().collect(),
        only_second: second_lines.difference(&first_lines).copied().collect(),
    }
}

pub async fn execute_overlap(args: OverlapArgs) -> AppResult<()> {
    let first = ExperimentSummary::load(&args.first)?;
    let second = ExperimentSummary::load(&args.second)?;
    let overlap = line_overlap(&first, &second);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&overlap)?),
        _ => {
            info!(
                "Only {} ({}): {}",
                first.experiment_name,
                overlap.only_first.len(),
                format_ranges(&overlap.only_first)
            );
            info!(
                "Both ({}): {}",
                overlap.both.len(),
                format_ranges(&overlap.both)
            );
            info!(
                "Only {} ({}): {}",
                second.experiment_name,
                overlap.only_second.len(),
                format_ranges(&overlap.only_second)
            );
        }
    }
    Ok(())
}

/// Collapse sorted line numbers into ranges: `1-3, 7, 9-10`
pub fn format_ranges(lines: &[u32]) -> String {
    let mut parts = Vec::new();
    let mut iter = lines.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}
