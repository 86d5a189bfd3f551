use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// All relative paths will be interpreted relative to this directory.
    /// All child processes will be run in this directory.
    #[arg(long, global = true)]
    pub cwd: Option<String>,

    /// Logging level (overrides env/config). One of: trace, debug, info, warn, error
    #[arg(long = "log.level", global = true)]
    pub log_level: Option<String>,

    /// Logging color control: "on" to force colors, "off" to disable; omit for auto
    #[arg(long = "log.color", global = true)]
    pub log_color: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up genbench.toml, the modules CSV and the results directory here
    Init,

    /// Run every configured experiment, one tool invocation at a time
    Run(RunArgs),

    /// Aggregate the runs of one experiment into its summary.json
    Summarize(SummarizeArgs),

    /// Show batch progress for every experiment under the results directory
    Status(StatusArgs),

    /// Compare two experiments: summaries side by side and a U-test on coverage
    Compare(CompareArgs),

    /// Compare per-line hit counts of two experiments
    LineCompare(PairArgs),

    /// Print one LaTeX table row comparing the coverage of two experiments
    LatexCompare(PairArgs),

    /// Print a LaTeX table summarizing any number of experiments
    Table(TableArgs),

    /// Line hit frequency of one or more experiments
    Frequency(FrequencyArgs),

    /// Executed-line overlap between two experiments
    Overlap(OverlapArgs),

    /// Print configuration, summaries, or what is read back from a single run
    Print {
        #[command(subcommand)]
        command: PrintArgs,
    },
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// CSV of experiments: module name, experiment name, branch, tool arguments.
    /// Replaces config [run].modules_csv if provided.
    #[arg(long = "modules-csv")]
    pub modules_csv: Option<String>,

    /// Index of the first CSV row to run (inclusive)
    #[arg(long)]
    pub start: Option<usize>,

    /// Index of the last CSV row to run (exclusive)
    #[arg(long)]
    pub end: Option<usize>,

    /// Runs per experiment. Replaces config [run].nb_runs if provided.
    #[arg(long = "nb-runs")]
    pub nb_runs: Option<u32>,

    /// Search budget in seconds. Replaces config [run].maximum_search_time if provided.
    #[arg(long = "maximum-search-time")]
    pub maximum_search_time: Option<u64>,

    /// Hard timeout per run in seconds. Replaces config [run].timeout if provided.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seed of the generator that draws one seed per run.
    /// Replaces config [run].base_seed if provided.
    #[arg(long = "base-seed")]
    pub base_seed: Option<u64>,

    /// Directory receiving one sub-directory per experiment.
    /// Replaces config [run].results_path if provided.
    #[arg(long = "results-path")]
    pub results_path: Option<String>,

    /// Ask the tool to write a coverage report for every run
    #[arg(long = "create-coverage-report")]
    pub create_coverage_report: bool,

    /// Skip reinstalling the tool after each branch checkout
    #[arg(long = "no-install")]
    pub no_install: bool,
}

/// Arguments for the summarize command
#[derive(Parser, Debug)]
pub struct SummarizeArgs {
    /// Experiment directory containing run sub-directories 0..N
    #[arg(value_name = "EXPERIMENT")]
    pub experiment: PathBuf,

    /// Number of runs to aggregate. Replaces config [run].nb_runs if provided.
    #[arg(long = "nb-runs")]
    pub nb_runs: Option<u32>,

    /// Experiment name recorded in the summary (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Dotted name of the target module, used to pick its file from coverage reports
    #[arg(long)]
    pub module: Option<String>,

    /// Timeout in seconds recorded for runs without statistics
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Search time in seconds recorded for runs without statistics
    #[arg(long = "maximum-search-time")]
    pub maximum_search_time: Option<u64>,

    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Results directory. Replaces config [run].results_path if provided.
    #[arg(long = "results-path")]
    pub results_path: Option<String>,

    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Arguments for the compare command
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// First experiment directory
    pub first: PathBuf,

    /// Second experiment directory
    pub second: PathBuf,

    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Two experiments (directories or summary files)
#[derive(Parser, Debug)]
pub struct PairArgs {
    pub first: PathBuf,
    pub second: PathBuf,
}

/// Arguments for the table command
#[derive(Parser, Debug)]
pub struct TableArgs {
    /// Comma-separated column names to leave out (e.g., "Timeout,Other crashes")
    #[arg(long = "except-columns")]
    pub except_columns: Option<String>,

    /// Experiment directories or summary files, one row each
    #[arg(value_name = "EXPERIMENT", required = true)]
    pub experiments: Vec<PathBuf>,
}

/// Arguments for the frequency command
#[derive(Parser, Debug)]
pub struct FrequencyArgs {
    /// Experiment directories or summary files
    #[arg(value_name = "EXPERIMENT", required = true)]
    pub experiments: Vec<PathBuf>,

    /// Output format: "table" (default), "csv" or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Arguments for the overlap command
#[derive(Parser, Debug)]
pub struct OverlapArgs {
    pub first: PathBuf,
    pub second: PathBuf,

    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Arguments for the print command
#[derive(Subcommand, Debug)]
pub enum PrintArgs {
    /// Print the effective global configuration
    Config(PrintConfigArgs),

    /// Print a stored experiment summary
    Summary(PrintSummaryArgs),

    /// Print what the aggregator reads from a single run directory
    Run(PrintRunArgs),
}

/// Arguments for the print config subcommand
#[derive(Parser, Debug)]
pub struct PrintConfigArgs {
    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Arguments for the print summary subcommand
#[derive(Parser, Debug)]
pub struct PrintSummaryArgs {
    /// Experiment directory or summary file
    pub experiment: PathBuf,

    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Arguments for the print run subcommand
#[derive(Parser, Debug)]
pub struct PrintRunArgs {
    /// Run directory
    pub run: PathBuf,

    /// Dotted name of the target module, used to pick its file from the coverage report
    #[arg(long)]
    pub module: Option<String>,

    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}
