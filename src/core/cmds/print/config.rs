use log::info;

use crate::types::AppResult;
use crate::types::config::{config, get_config_filename};

pub async fn execute(format: String) -> AppResult<()> {
    let effective_config = config().to_effective();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&effective_config)?);
        return Ok(());
    }

    // Table format
    info!("Effective Configuration ({}):", get_config_filename());

    info!("");
    info!("Log:");
    if let Some(log) = &effective_config.log {
        info!("  level: {}", log.level.as_deref().unwrap_or("info"));
        match log.color {
            Some(true) => info!("  color: on"),
            Some(false) => info!("  color: off"),
            None => info!("  color: auto"),
        }
    }

    info!("");
    info!("Run:");
    if let Some(run) = &effective_config.run {
        info!("  tool: {}", run.tool());
        info!("  tool_path: {}", run.tool_path());
        info!("  install: {}", run.install());
        info!("  project_path: {}", run.project_path());
        info!("  results_path: {}", run.results_path());
        info!("  modules_csv: {}", run.modules_csv());
        info!("  nb_runs: {}", run.nb_runs());
        info!("  maximum_search_time: {}s", run.maximum_search_time());
        info!("  timeout: {}s", run.timeout());
        info!("  create_coverage_report: {}", run.create_coverage_report());
        match run.base_seed() {
            Some(seed) => info!("  base_seed: {seed}"),
            None => info!("  base_seed: (clock)"),
        }
    }

    info!("");
    info!("Summary:");
    if let Some(summary) = &effective_config.summary {
        info!("  statistics_file: {}", summary.statistics_file());
        info!("  coverage_file: {}", summary.coverage_file());
        info!("  return_code_file: {}", summary.return_code_file());
        info!("  crash_prefix: {}", summary.crash_prefix());
    }

    Ok(())
}
