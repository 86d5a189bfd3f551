use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::types::AppResult;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LogConfig {
    pub level: Option<String>,
    pub color: Option<bool>, // None = auto-detect (semantic)
}

impl LogConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn color(&self) -> Option<bool> {
        self.color // None has semantic meaning (auto-detect)
    }

    pub fn to_effective(&self) -> Self {
        Self {
            level: Some(self.level().to_string()),
            color: self.color,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RunConfig {
    pub tool: Option<String>,
    pub tool_path: Option<String>,
    pub install: Option<bool>,
    pub project_path: Option<String>,
    pub results_path: Option<String>,
    pub modules_csv: Option<String>,
    pub nb_runs: Option<u32>,
    pub maximum_search_time: Option<u64>,
    pub timeout: Option<u64>,
    pub create_coverage_report: Option<bool>,
    pub base_seed: Option<u64>, // None = derived from the clock at startup
}

impl RunConfig {
    pub fn tool(&self) -> &str {
        self.tool.as_deref().unwrap_or("pynguin")
    }

    pub fn tool_path(&self) -> &str {
        self.tool_path.as_deref().unwrap_or("pynguin")
    }

    pub fn install(&self) -> bool {
        self.install.unwrap_or(true)
    }

    pub fn project_path(&self) -> &str {
        self.project_path.as_deref().unwrap_or(".")
    }

    pub fn results_path(&self) -> &str {
        self.results_path.as_deref().unwrap_or("results")
    }

    pub fn modules_csv(&self) -> &str {
        self.modules_csv.as_deref().unwrap_or("modules.csv")
    }

    pub fn nb_runs(&self) -> u32 {
        self.nb_runs.unwrap_or(30)
    }

    /// Search budget handed to the tool, in seconds
    pub fn maximum_search_time(&self) -> u64 {
        self.maximum_search_time.unwrap_or(600)
    }

    /// Hard wall-clock limit per run, in seconds
    pub fn timeout(&self) -> u64 {
        self.timeout.unwrap_or(1200)
    }

    pub fn create_coverage_report(&self) -> bool {
        self.create_coverage_report.unwrap_or(false)
    }

    pub fn base_seed(&self) -> Option<u64> {
        self.base_seed
    }

    pub fn to_effective(&self) -> Self {
        Self {
            tool: Some(self.tool().to_string()),
            tool_path: Some(self.tool_path().to_string()),
            install: Some(self.install()),
            project_path: Some(self.project_path().to_string()),
            results_path: Some(self.results_path().to_string()),
            modules_csv: Some(self.modules_csv().to_string()),
            nb_runs: Some(self.nb_runs()),
            maximum_search_time: Some(self.maximum_search_time()),
            timeout: Some(self.timeout()),
            create_coverage_report: Some(self.create_coverage_report()),
            base_seed: self.base_seed,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SummaryConfig {
    pub statistics_file: Option<String>,
    pub coverage_file: Option<String>,
    pub return_code_file: Option<String>,
    pub crash_prefix: Option<String>,
}

impl SummaryConfig {
    pub fn statistics_file(&self) -> &str {
        self.statistics_file.as_deref().unwrap_or("statistics.csv")
    }

    pub fn coverage_file(&self) -> &str {
        self.coverage_file.as_deref().unwrap_or("coverage.json")
    }

    pub fn return_code_file(&self) -> &str {
        self.return_code_file.as_deref().unwrap_or("return_code")
    }

    pub fn crash_prefix(&self) -> &str {
        self.crash_prefix.as_deref().unwrap_or("crash_test_")
    }

    pub fn to_effective(&self) -> Self {
        Self {
            statistics_file: Some(self.statistics_file().to_string()),
            coverage_file: Some(self.coverage_file().to_string()),
            return_code_file: Some(self.return_code_file().to_string()),
            crash_prefix: Some(self.crash_prefix().to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    pub log: Option<LogConfig>,
    pub run: Option<RunConfig>,
    pub summary: Option<SummaryConfig>,
}

impl Config {
    pub fn log(&self) -> LogConfig {
        self.log.clone().unwrap_or_default()
    }

    pub fn run(&self) -> RunConfig {
        self.run.clone().unwrap_or_default()
    }

    pub fn summary(&self) -> SummaryConfig {
        self.summary.clone().unwrap_or_default()
    }

    pub fn to_effective(&self) -> Self {
        Self {
            log: Some(self.log().to_effective()),
            run: Some(self.run().to_effective()),
            summary: Some(self.summary().to_effective()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub log_color: Option<String>, // "on" | "off"
    pub results_path: Option<String>,
    pub nb_runs: Option<u32>,
    pub maximum_search_time: Option<u64>,
    pub timeout: Option<u64>,
    pub base_seed: Option<u64>,
}

const CONFIG_FILENAME: &str = "genbench.toml";
static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn get_config_filename() -> &'static str {
    CONFIG_FILENAME
}

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let mut cfg = Config::default();
        // Apply nearest config file found by walking up from cwd
        if let Some(path) = find_nearest_config_file()
            && let Ok(file_cfg) = read_config_file(&path)
        {
            apply_file_config(&mut cfg, &file_cfg);
        }
        cfg
    })
}

/// Resolve the global configuration: defaults, then the nearest config file, then CLI flags.
/// Returns the config file that was applied, if any.
pub fn init_with_overrides(overrides: &CliOverrides) -> AppResult<Option<PathBuf>> {
    let mut cfg = Config::default();

    // 1) Config file: walk up from cwd and use the first config file found
    let config_path = find_nearest_config_file();
    if let Some(path) = &config_path {
        let file_cfg = read_config_file(path)?;
        apply_file_config(&mut cfg, &file_cfg);
    }

    // 2) CLI arguments (highest priority). Only override if user specified.
    apply_cli_overrides(&mut cfg, overrides);

    let _ = CONFIG.set(cfg);
    Ok(config_path)
}

pub fn read_config_file(path: &Path) -> AppResult<Config> {
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str::<Config>(&contents)?)
}

pub fn apply_file_config(cfg: &mut Config, file: &Config) {
    // Merge log section
    if let Some(file_log) = &file.log {
        let mut log = cfg.log.clone().unwrap_or_default();
        if file_log.level.is_some() {
            log.level = file_log.level.clone();
        }
        if file_log.color.is_some() {
            log.color = file_log.color;
        }
        cfg.log = Some(log);
    }

    // Merge run section
    if let Some(file_run) = &file.run {
        let mut run = cfg.run.clone().unwrap_or_default();
        merge_option(&mut run.tool, &file_run.tool);
        merge_option(&mut run.tool_path, &file_run.tool_path);
        merge_option(&mut run.install, &file_run.install);
        merge_option(&mut run.project_path, &file_run.project_path);
        merge_option(&mut run.results_path, &file_run.results_path);
        merge_option(&mut run.modules_csv, &file_run.modules_csv);
        merge_option(&mut run.nb_runs, &file_run.nb_runs);
        merge_option(&mut run.maximum_search_time, &file_run.maximum_search_time);
        merge_option(&mut run.timeout, &file_run.timeout);
        merge_option(
            &mut run.create_coverage_report,
            &file_run.create_coverage_report,
        );
        merge_option(&mut run.base_seed, &file_run.base_seed);
        cfg.run = Some(run);
    }

    // Merge summary section
    if let Some(file_summary) = &file.summary {
        let mut summary = cfg.summary.clone().unwrap_or_default();
        merge_option(&mut summary.statistics_file, &file_summary.statistics_file);
        merge_option(&mut summary.coverage_file, &file_summary.coverage_file);
        merge_option(&mut summary.return_code_file, &file_summary.return_code_file);
        merge_option(&mut summary.crash_prefix, &file_summary.crash_prefix);
        cfg.summary = Some(summary);
    }
}

fn merge_option<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *target = value.clone();
    }
}

pub fn apply_cli_overrides(cfg: &mut Config, overrides: &CliOverrides) {
    // Log overrides
    let mut log = cfg.log.clone().unwrap_or_default();
    if let Some(level) = &overrides.log_level
        && !level.trim().is_empty()
    {
        log.level = Some(level.trim().to_string());
    }
    if let Some(color_str) = &overrides.log_color {
        match color_str.to_lowercase().as_str() {
            "on" => log.color = Some(true),
            "off" => log.color = Some(false),
            _ => {}
        }
    }
    if overrides.log_level.is_some() || overrides.log_color.is_some() {
        cfg.log = Some(log);
    }

    // Run overrides
    let mut run = cfg.run.clone().unwrap_or_default();
    let mut touched = false;
    if let Some(results_path) = &overrides.results_path
        && !results_path.trim().is_empty()
    {
        run.results_path = Some(results_path.clone());
        touched = true;
    }
    for (target, value) in [
        (&mut run.maximum_search_time, overrides.maximum_search_time),
        (&mut run.timeout, overrides.timeout),
        (&mut run.base_seed, overrides.base_seed),
    ] {
        if value.is_some() {
            *target = value;
            touched = true;
        }
    }
    if overrides.nb_runs.is_some() {
        run.nb_runs = overrides.nb_runs;
        touched = true;
    }
    if touched {
        cfg.run = Some(run);
    }
}

pub fn parse_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn find_nearest_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let config_filename = get_config_filename();
    for dir in cwd.ancestors() {
        let candidate = dir.join(config_filename);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

pub fn colors_enabled() -> bool {
    match config().log().color() {
        Some(force) => force,
        None => console::colors_enabled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.log().level(), "info");
        assert_eq!(cfg.run().tool(), "pynguin");
        assert_eq!(cfg.run().nb_runs(), 30);
        assert_eq!(cfg.run().maximum_search_time(), 600);
        assert_eq!(cfg.run().timeout(), 1200);
        assert!(cfg.run().install());
        assert!(!cfg.run().create_coverage_report());
        assert_eq!(cfg.summary().crash_prefix(), "crash_test_");
    }

    #[test]
    fn file_values_override_defaults_and_cli_overrides_file() {
        let file: Config = toml::from_str(
            r#"
            [log]
            level = "debug"

            [run]
            nb_runs = 5
            timeout = 60
            base_seed = 7

            [summary]
            coverage_file = "cov.json"
            "#,
        )
        .unwrap();

        let mut cfg = Config::default();
        apply_file_config(&mut cfg, &file);
        assert_eq!(cfg.log().level(), "debug");
        assert_eq!(cfg.run().nb_runs(), 5);
        assert_eq!(cfg.run().base_seed(), Some(7));
        assert_eq!(cfg.summary().coverage_file(), "cov.json");
        assert_eq!(cfg.summary().statistics_file(), "statistics.csv");

        apply_cli_overrides(
            &mut cfg,
            &CliOverrides {
                log_color: Some("off".to_string()),
                nb_runs: Some(2),
                ..Default::default()
            },
        );
        assert_eq!(cfg.log().color(), Some(false));
        assert_eq!(cfg.log().level(), "debug");
        assert_eq!(cfg.run().nb_runs(), 2);
        assert_eq!(cfg.run().timeout(), 60);
    }

    #[test]
    fn example_config_parses_to_defaults() {
        let example: Config = toml::from_str(include_str!("../../example.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(example.run().nb_runs(), defaults.run().nb_runs());
        assert_eq!(example.run().timeout(), defaults.run().timeout());
        assert_eq!(example.run().base_seed(), None);
        assert_eq!(
            example.summary().return_code_file(),
            defaults.summary().return_code_file()
        );
        assert_eq!(example.log().color(), None);
    }

    #[test]
    fn parse_csv_drops_empty_entries() {
        assert_eq!(
            parse_csv("Coverage, ,Timeout,"),
            vec!["Coverage".to_string(), "Timeout".to_string()]
        );
    }
}
