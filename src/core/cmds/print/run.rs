use std::fs;

use log::info;

use crate::core::aggregate::RunReader;
use crate::core::cmds::print::RunFilters;
use crate::core::runner::SEED_FILENAME;
use crate::types::config::config;
use crate::types::{AppError, AppResult};

pub async fn execute(filters: RunFilters) -> AppResult<()> {
    if !filters.run.is_dir() {
        return Err(AppError::Custom(format!(
            "Run directory {} does not exist",
            filters.run.display()
        )));
    }

    let reader = RunReader::from_config(&config().summary(), &config().run())
        .with_module(filters.module);
    let result = reader.read_run(&filters.run);

    if filters.format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let seed = fs::read_to_string(filters.run.join(SEED_FILENAME))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "(unknown)".to_string());

    info!("Run: {}", filters.run.display());
    info!("  seed: {seed}");
    info!(
        "  exit status: {} ({})",
        result.exit_status,
        result.exit_status.kind()
    );
    info!("  iterations: {}", result.iterations);
    info!("  coverage: {:.4}", result.coverage);
    info!(
        "  total time: {:.2}s",
        result.total_time_ns as f64 / 1_000_000_000.0
    );
    info!(
        "  search time: {:.2}s",
        result.search_time_ns as f64 / 1_000_000_000.0
    );
    info!("  mutation score: {:.4}", result.mutation_score);
    info!("  crash tests: {}", result.crash_artifacts);
    if result.executed_lines.is_empty() {
        info!("  executed lines: none");
    } else {
        let lines: Vec<u32> = result.executed_lines.iter().copied().collect();
        info!(
            "  executed lines ({}): {}",
            lines.len(),
            crate::core::cmds::lines::format_ranges(&lines)
        );
    }

    Ok(())
}
