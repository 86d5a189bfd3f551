use std::fs;
use std::path::Path;

use genbench::core::cmds::compare::latex_row;
use genbench::core::cmds::lines::{compare_lines, line_overlap};
use genbench::types::{EffectSize, ExperimentSummary};
use genbench::{RunReader, compare, summarize_experiment};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn reader() -> RunReader {
    RunReader {
        statistics_file: "statistics.csv".to_string(),
        coverage_file: "coverage.json".to_string(),
        return_code_file: "return_code".to_string(),
        crash_prefix: "crash_test_".to_string(),
        module_name: Some("pkg.mod".to_string()),
        timeout_ns: 60_000_000_000,
        search_time_ns: 30_000_000_000,
    }
}

/// An experiment whose runs reached the given coverages and executed the given lines
fn experiment(root: &Path, name: &str, coverages: &[f64], lines: &[&[u32]]) -> ExperimentSummary {
    let dir = root.join(name);
    for (i, coverage) in coverages.iter().enumerate() {
        let run = dir.join(i.to_string());
        fs::create_dir_all(&run).unwrap();
        fs::write(
            run.join("statistics.csv"),
            format!(
                "TargetModule,AlgorithmIterations,Coverage,TotalTime,SearchTime,MutationScore\n\
                 pkg.mod,5,{coverage},1000000000,1000000000,0.0\n"
            ),
        )
        .unwrap();
        let report = serde_json::json!({
            "files": {"pkg/mod.py": {"executed_lines": lines[i], "missing_lines": [1, 2, 3, 4]}}
        });
        fs::write(run.join("coverage.json"), report.to_string()).unwrap();
        fs::write(run.join("return_code"), "0").unwrap();
    }
    let summary = summarize_experiment(&reader(), &dir, name, coverages.len() as u32).unwrap();
    summary.save(&dir).unwrap();
    summary
}

#[test]
fn test_clearly_better_experiment() {
    let tmp = tempdir().unwrap();
    let lines: [&[u32]; 3] = [&[5, 6], &[5], &[5, 6]];
    let better = experiment(tmp.path(), "better", &[0.5, 0.6, 0.7], &lines);
    let worse = experiment(tmp.path(), "worse", &[0.1, 0.2, 0.3], &lines);

    assert!((better.mean_coverage - 0.6).abs() < 1e-9);
    assert!((worse.mean_coverage - 0.2).abs() < 1e-9);

    let comparison = compare(
        &reader().read_coverages(&tmp.path().join("better"), better.run_count),
        &reader().read_coverages(&tmp.path().join("worse"), worse.run_count),
    )
    .unwrap();
    assert_eq!(comparison.u_statistic, 9.0);
    assert_eq!(comparison.effect_size, 1.0);
    assert_eq!(comparison.label, EffectSize::Large);
    assert!((comparison.p_value - 0.1).abs() < 1e-12);

    assert_eq!(
        latex_row(better.mean_coverage, worse.mean_coverage, &comparison),
        "0.60 & 0.20 & 0.10 & Large (1.00) \\\\"
    );
}

#[test]
fn test_identical_experiments() {
    let tmp = tempdir().unwrap();
    let lines: [&[u32]; 3] = [&[1], &[1], &[1]];
    let first = experiment(tmp.path(), "first", &[0.4, 0.4, 0.4], &lines);
    let second = experiment(tmp.path(), "second", &[0.4, 0.4, 0.4], &lines);

    let comparison = compare(
        &reader().read_coverages(&tmp.path().join("first"), first.run_count),
        &reader().read_coverages(&tmp.path().join("second"), second.run_count),
    )
    .unwrap();
    assert_eq!(comparison.p_value, 1.0);
    assert_eq!(comparison.effect_size, 0.5);
    assert_eq!(comparison.label, EffectSize::Negligible);

    // Every per-line test is a tie as well
    for line in compare_lines(&first, &second).unwrap() {
        assert_eq!(line.comparison.effect_size, 0.5, "line {}", line.line);
    }
}

#[test]
fn test_missing_runs_read_as_zero_coverage() {
    let tmp = tempdir().unwrap();
    let lines: [&[u32]; 2] = [&[], &[]];
    let summary = experiment(tmp.path(), "partial", &[0.8, 0.6], &lines);
    let coverages = reader().read_coverages(&tmp.path().join("partial"), summary.run_count + 2);
    assert_eq!(coverages, vec![0.8, 0.6, 0.0, 0.0]);
}

#[test]
fn test_line_views_from_saved_summaries() {
    let tmp = tempdir().unwrap();
    let first_lines: [&[u32]; 2] = [&[1, 2], &[1]];
    let second_lines: [&[u32]; 2] = [&[1, 3], &[3]];
    experiment(tmp.path(), "a", &[0.5, 0.5], &first_lines);
    experiment(tmp.path(), "b", &[0.5, 0.5], &second_lines);

    let first = ExperimentSummary::load(&tmp.path().join("a")).unwrap();
    let second = ExperimentSummary::load(&tmp.path().join("a").join("..").join("b")).unwrap();

    let overlap = line_overlap(&first, &second);
    assert_eq!(overlap.only_first, vec![2]);
    assert_eq!(overlap.both, vec![1]);
    assert_eq!(overlap.only_second, vec![3]);

    let lines: Vec<u32> = compare_lines(&first, &second)
        .unwrap()
        .iter()
        .map(|l| l.line)
        .collect();
    assert_eq!(lines, vec![1, 2, 3, 4]);
}
