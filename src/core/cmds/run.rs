use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::core::aggregate::{RunReader, summarize_experiment};
use crate::core::cli::RunArgs;
use crate::core::modules::{ExperimentSpec, load_experiments, select};
use crate::core::runner::{ToolRunner, checkout_branch, install_tool};
use crate::types::AppResult;
use crate::types::config::config;

/// What happened to one experiment's batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub executed: u32,
    pub skipped: u32,
    pub interrupted: bool,
}

/// Seed used when neither the config nor the command line provides one
pub fn clock_seed() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map(|nanos| nanos as u64)
        .unwrap_or_default()
}

/// Run every selected experiment. Returns false if the batch was interrupted.
pub async fn execute_run(args: RunArgs, running: Arc<AtomicBool>) -> AppResult<bool> {
    let mut run_cfg = config().run();
    if args.create_coverage_report {
        run_cfg.create_coverage_report = Some(true);
    }
    let summary_cfg = config().summary();

    let base_seed = run_cfg.base_seed().unwrap_or_else(clock_seed);
    info!("Base seed: {base_seed}");

    let modules_csv = PathBuf::from(
        args.modules_csv
            .as_deref()
            .unwrap_or_else(|| run_cfg.modules_csv()),
    );
    let specs = load_experiments(&modules_csv)?;
    let selected = select(&specs, args.start, args.end);
    if selected.is_empty() {
        warn!(
            "No experiments selected from {} ({} rows)",
            modules_csv.display(),
            specs.len()
        );
        return Ok(true);
    }

    let tool_path = PathBuf::from(run_cfg.tool_path());
    let results_path = PathBuf::from(run_cfg.results_path());
    let nb_runs = run_cfg.nb_runs();
    let install = run_cfg.install() && !args.no_install;
    let runner = ToolRunner::from_config(&run_cfg, summary_cfg.return_code_file());
    let reader = RunReader::from_config(&summary_cfg, &run_cfg);
    let mut rng = StdRng::seed_from_u64(base_seed);

    for spec in selected {
        if !running.load(Ordering::SeqCst) {
            return Ok(false);
        }

        info!(
            "{} : Running {nb_runs} experiments with \"{}\" on branch \"{}\"",
            spec.experiment_name, spec.module_name, spec.branch_name
        );
        checkout_branch(&tool_path, &spec.branch_name).await?;
        if install {
            install_tool(&tool_path).await?;
        }

        let experiment_dir = results_path.join(&spec.experiment_name);
        let outcome = run_batch(
            spec,
            &runner,
            &mut rng,
            &experiment_dir,
            nb_runs,
            &running,
        )
        .await?;
        info!(
            "{}: {} runs executed, {} already present",
            spec.experiment_name, outcome.executed, outcome.skipped
        );
        if outcome.interrupted {
            warn!(
                "{} interrupted; rerun the same command to resume",
                spec.experiment_name
            );
            return Ok(false);
        }

        let reader = reader.clone().with_module(Some(spec.module_name.clone()));
        let summary = summarize_experiment(&reader, &experiment_dir, &spec.experiment_name, nb_runs)?;
        let path = summary.save(&experiment_dir)?;
        info!(
            "{}: mean coverage {:.4} over {} runs, summary written to {}",
            spec.experiment_name,
            summary.mean_coverage,
            summary.run_count,
            path.display()
        );
    }

    Ok(true)
}

/// Run `nb_runs` seeded invocations of one experiment, skipping runs already on disk.
/// One seed is drawn per run index, skipped or not.
pub async fn run_batch(
    spec: &ExperimentSpec,
    runner: &ToolRunner,
    rng: &mut StdRng,
    experiment_dir: &Path,
    nb_runs: u32,
    running: &AtomicBool,
) -> AppResult<BatchOutcome> {
    let progress = ProgressBar::new(u64::from(nb_runs));
    progress.set_style(
        ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    progress.set_prefix(spec.experiment_name.clone());

    let mut outcome = BatchOutcome::default();
    for i in 0..nb_runs {
        let seed = rng.next_u64();
        let report_path = experiment_dir.join(i.to_string());

        if report_path.exists() {
            debug!(
                "Run {i}: {} already exists, skipping",
                report_path.display()
            );
            outcome.skipped += 1;
            progress.inc(1);
            continue;
        }
        if !running.load(Ordering::SeqCst) {
            outcome.interrupted = true;
            break;
        }

        progress.set_message(format!("run {i} (seed {seed})"));
        let status = runner
            .run(&spec.module_name, &report_path, seed, &spec.tool_args)
            .await?;
        if !running.load(Ordering::SeqCst) {
            // The tool shares our process group and got the same SIGINT
            progress.suspend(|| warn!("Run {i} interrupted, discarding {}", report_path.display()));
            if let Err(e) = std::fs::remove_dir_all(&report_path) {
                warn!("Failed to remove {}: {e}", report_path.display());
            }
            outcome.interrupted = true;
            break;
        }
        progress.suspend(|| debug!("Run {i}: exit status {status}"));
        outcome.executed += 1;
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(outcome)
}
