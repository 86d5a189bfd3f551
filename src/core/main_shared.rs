use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::{debug, warn};

use crate::core::cli::{Args, Commands, PrintArgs};
use crate::core::cmds;
use crate::core::logging::init_logging;
use crate::types::config::{CliOverrides, init_with_overrides};
use crate::types::{AppError, AppResult};

/// Exit code of a batch stopped by Ctrl-C
const INTERRUPTED_EXIT_CODE: i32 = 2;

pub async fn run_main() -> AppResult<()> {
    let args = Args::parse();

    // Handle global arguments
    if let Some(cwd_arg) = args.cwd.as_ref() {
        let cwd = PathBuf::from(cwd_arg).canonicalize()?;
        env::set_current_dir(&cwd)?;
    }

    // Initialize configuration (file, then CLI overrides)
    let cli_overrides = cli_overrides(&args);
    let config_path = init_with_overrides(&cli_overrides)?;

    // Initialize logging after config so level/color are applied
    init_logging();
    debug!("Current working directory: {}", env::current_dir()?.display());
    match &config_path {
        Some(path) => debug!("Using configuration {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }

    // Setup running flag to handle signals from ctrl-c
    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);

    ctrlc::set_handler(move || {
        warn!("Received Ctrl-C, stopping after the current run..");
        running_ctrlc.store(false, Ordering::SeqCst);
    })
    .map_err(|e| AppError::Custom(format!("Error creating a Ctrl-C handler: {e}")))?;

    // Dispatch to appropriate command
    let exit_code = match args.command {
        Commands::Init => {
            cmds::execute_init().await?;
            0
        }
        Commands::Run(run_args) => {
            let completed = cmds::execute_run(run_args, Arc::clone(&running)).await?;
            if completed && running.load(Ordering::SeqCst) {
                0
            } else {
                INTERRUPTED_EXIT_CODE
            }
        }
        Commands::Summarize(summarize_args) => {
            cmds::execute_summarize(summarize_args).await?;
            0
        }
        Commands::Status(status_args) => {
            cmds::execute_status(status_args).await?;
            0
        }
        Commands::Compare(compare_args) => {
            cmds::execute_compare(compare_args).await?;
            0
        }
        Commands::LineCompare(pair_args) => {
            cmds::execute_line_compare(pair_args).await?;
            0
        }
        Commands::LatexCompare(pair_args) => {
            cmds::execute_latex_compare(pair_args).await?;
            0
        }
        Commands::Table(table_args) => {
            cmds::execute_table(table_args).await?;
            0
        }
        Commands::Frequency(frequency_args) => {
            cmds::execute_frequency(frequency_args).await?;
            0
        }
        Commands::Overlap(overlap_args) => {
            cmds::execute_overlap(overlap_args).await?;
            0
        }
        Commands::Print {
            command: print_args,
        } => {
            let command = match print_args {
                PrintArgs::Config(args) => cmds::print::PrintCommand::Config(args.format),
                PrintArgs::Summary(args) => cmds::print::PrintCommand::Summary {
                    experiment: args.experiment,
                    format: args.format,
                },
                PrintArgs::Run(args) => cmds::print::PrintCommand::Run(cmds::print::RunFilters {
                    run: args.run,
                    module: args.module,
                    format: args.format,
                }),
            };
            cmds::execute_print(command).await?;
            0
        }
    };

    // Exit with appropriate code
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}

/// Collect the flags that take precedence over the config file
fn cli_overrides(args: &Args) -> CliOverrides {
    let mut overrides = CliOverrides {
        log_level: args.log_level.clone(),
        log_color: args.log_color.clone(),
        ..Default::default()
    };
    match &args.command {
        Commands::Run(run) => {
            overrides.results_path = run.results_path.clone();
            overrides.nb_runs = run.nb_runs;
            overrides.maximum_search_time = run.maximum_search_time;
            overrides.timeout = run.timeout;
            overrides.base_seed = run.base_seed;
        }
        Commands::Summarize(summarize) => {
            overrides.nb_runs = summarize.nb_runs;
            overrides.maximum_search_time = summarize.maximum_search_time;
            overrides.timeout = summarize.timeout;
        }
        Commands::Status(status) => {
            overrides.results_path = status.results_path.clone();
        }
        _ => {}
    }
    overrides
}
