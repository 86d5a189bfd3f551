use std::path::Path;

use log::info;
use serde::Serialize;

use crate::core::aggregate::RunReader;
use crate::core::cli::{CompareArgs, PairArgs};
use crate::core::cmds::experiment_dir;
use crate::core::cmds::print::summary::format_status_counts;
use crate::core::stats::compare;
use crate::types::config::config;
use crate::types::{AppResult, Comparison, ExperimentSummary};

/// p-values below this are highlighted in LaTeX rows
const SIGNIFICANCE: f64 = 0.05;

#[derive(Debug, Serialize)]
struct CompareReport<'a> {
    first: &'a ExperimentSummary,
    second: &'a ExperimentSummary,
    coverage: Comparison,
}

pub async fn execute_compare(args: CompareArgs) -> AppResult<()> {
    let first = ExperimentSummary::load(&args.first)?;
    let second = ExperimentSummary::load(&args.second)?;
    let comparison = compare_coverage(&args.first, &first, &args.second, &second)?;

    match args.format.as_str() {
        "json" => {
            let report = CompareReport {
                first: &first,
                second: &second,
                coverage: comparison,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_table_format(&first, &second, &comparison),
    }

    Ok(())
}

pub async fn execute_latex_compare(args: PairArgs) -> AppResult<()> {
    let first = ExperimentSummary::load(&args.first)?;
    let second = ExperimentSummary::load(&args.second)?;
    let comparison = compare_coverage(&args.first, &first, &args.second, &second)?;
    println!(
        "{}",
        latex_row(first.mean_coverage, second.mean_coverage, &comparison)
    );
    Ok(())
}

/// U-test on the per-run coverages, re-read from each run's statistics
fn compare_coverage(
    first_path: &Path,
    first: &ExperimentSummary,
    second_path: &Path,
    second: &ExperimentSummary,
) -> AppResult<Comparison> {
    let reader = RunReader::from_config(&config().summary(), &config().run());
    let first_coverages = reader.read_coverages(&experiment_dir(first_path), first.run_count);
    let second_coverages = reader.read_coverages(&experiment_dir(second_path), second.run_count);
    Ok(compare(&first_coverages, &second_coverages)?)
}

/// `m1 & m2 & p & Label (A) \\`, the p cell shaded when significant
pub fn latex_row(first_mean: f64, second_mean: f64, comparison: &Comparison) -> String {
    let p_value = if comparison.p_value < 0.01 {
        "<0.01".to_string()
    } else {
        format!("{:.2}", comparison.p_value)
    };
    let highlight = if comparison.p_value < SIGNIFICANCE {
        "\\cellcolor{gray!25}"
    } else {
        ""
    };
    format!(
        "{first_mean:.2} & {second_mean:.2} & {highlight}{p_value} & {} ({:.2}) \\\\",
        comparison.label, comparison.effect_size
    )
}

fn print_table_format(first: &ExperimentSummary, second: &ExperimentSummary, comparison: &Comparison) {
    let rows = [
        (
            "experiment_name",
            first.experiment_name.clone(),
            second.experiment_name.clone(),
        ),
        (
            "nb_runs",
            first.run_count.to_string(),
            second.run_count.to_string(),
        ),
        (
            "mean_coverage",
            format!("{:.4}", first.mean_coverage),
            format!("{:.4}", second.mean_coverage),
        ),
        (
            "mean_iterations",
            format!("{:.2}", first.mean_iterations),
            format!("{:.2}", second.mean_iterations),
        ),
        (
            "mean_total_time",
            format!("{:.2}", first.mean_total_time),
            format!("{:.2}", second.mean_total_time),
        ),
        (
            "mean_search_time",
            format!("{:.2}", first.mean_search_time),
            format!("{:.2}", second.mean_search_time),
        ),
        (
            "mean_mutation_score",
            format!("{:.4}", first.mean_mutation_score),
            format!("{:.4}", second.mean_mutation_score),
        ),
        (
            "crash_test_count",
            first.crash_count.to_string(),
            second.crash_count.to_string(),
        ),
        (
            "return_code_counter",
            format_status_counts(first),
            format_status_counts(second),
        ),
    ];
    for (key, a, b) in &rows {
        info!("{key:<30}: {a:<35} {b:<35}");
    }

    info!("");
    info!(
        "Coverage Mann-Whitney U-test: {} (pvalue: {:.4})",
        comparison.u_statistic, comparison.p_value
    );
    info!(
        "Coverage Vargha-Delaney A measure: {:.4} ({})",
        comparison.effect_size, comparison.label
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EffectSize;

    fn comparison(p_value: f64, effect_size: f64, label: EffectSize) -> Comparison {
        Comparison {
            u_statistic: 9.0,
            p_value,
            effect_size,
            label,
        }
    }

    #[test]
    fn latex_row_shades_significant_p() {
        let row = latex_row(0.6, 0.2, &comparison(0.004, 1.0, EffectSize::Large));
        assert_eq!(
            row,
            "0.60 & 0.20 & \\cellcolor{gray!25}<0.01 & Large (1.00) \\\\"
        );

        let row = latex_row(0.6, 0.2, &comparison(0.03, 0.9, EffectSize::Large));
        assert_eq!(
            row,
            "0.60 & 0.20 & \\cellcolor{gray!25}0.03 & Large (0.90) \\\\"
        );
    }

    #[test]
    fn latex_row_plain_when_not_significant() {
        let row = latex_row(0.4, 0.4, &comparison(1.0, 0.5, EffectSize::Negligible));
        assert_eq!(row, "0.40 & 0.40 & 1.00 & Negligible (0.50) \\\\");
    }
}
