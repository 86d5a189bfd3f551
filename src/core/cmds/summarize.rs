use log::info;

use crate::core::aggregate::{RunReader, summarize_experiment};
use crate::core::cli::SummarizeArgs;
use crate::core::cmds::print::summary::print_summary;
use crate::types::config::config;
use crate::types::{AppError, AppResult};

pub async fn execute_summarize(args: SummarizeArgs) -> AppResult<()> {
    let experiment_dir = args.experiment;
    if !experiment_dir.is_dir() {
        return Err(AppError::Custom(format!(
            "Experiment directory {} does not exist",
            experiment_dir.display()
        )));
    }

    let name = match args.name {
        Some(name) => name,
        None => experiment_dir
            .canonicalize()?
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                AppError::Custom(format!(
                    "Cannot derive an experiment name from {}; pass --name",
                    experiment_dir.display()
                ))
            })?,
    };

    // nb_runs, timeout and search time overrides are already folded into the config
    let run_cfg = config().run();
    let reader = RunReader::from_config(&config().summary(), &run_cfg).with_module(args.module);
    let summary = summarize_experiment(&reader, &experiment_dir, &name, run_cfg.nb_runs())?;
    let path = summary.save(&experiment_dir)?;

    print_summary(&summary, &args.format)?;
    if args.format != "json" {
        info!("");
        info!("Summary written to {}", path.display());
    }
    Ok(())
}
