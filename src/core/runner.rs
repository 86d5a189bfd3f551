//! Invocation of the external test-generation tool and of the commands that
//! prepare it (branch checkout, editable install).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::process::Command;

use crate::core::modules::expand_args;
use crate::types::config::RunConfig;
use crate::types::{AppError, AppResult, ExitStatus};

/// Statistics the tool is asked to write for every run
pub const OUTPUT_VARIABLES: [&str; 7] = [
    "TargetModule",
    "AlgorithmIterations",
    "Coverage",
    "TotalTime",
    "SearchTime",
    "LineNos",
    "MutationScore",
];

pub const SEED_FILENAME: &str = "seed";
pub const STDOUT_FILENAME: &str = "stdout.log";
pub const STDERR_FILENAME: &str = "stderr.log";

/// Runs the tool once per call, waiting for it or killing it at the timeout
#[derive(Debug, Clone)]
pub struct ToolRunner {
    pub tool: String,
    pub project_path: PathBuf,
    /// Search budget handed to the tool, in seconds
    pub maximum_search_time: u64,
    pub create_coverage_report: bool,
    pub timeout: Duration,
    /// File the exit status is written to inside each run directory
    pub return_code_file: String,
}

impl ToolRunner {
    pub fn from_config(run: &RunConfig, return_code_file: &str) -> Self {
        Self {
            tool: run.tool().to_string(),
            project_path: PathBuf::from(run.project_path()),
            maximum_search_time: run.maximum_search_time(),
            create_coverage_report: run.create_coverage_report(),
            timeout: Duration::from_secs(run.timeout()),
            return_code_file: return_code_file.to_string(),
        }
    }

    /// Full argument list for one run
    pub fn command_args(
        &self,
        module_name: &str,
        report_path: &Path,
        seed: u64,
        tool_args: &[String],
    ) -> Vec<String> {
        let report = report_path.to_string_lossy().to_string();
        let coverage_flag = if self.create_coverage_report {
            "True"
        } else {
            "False"
        };
        let mut args = vec![
            "--module-name".to_string(),
            module_name.to_string(),
            "--project-path".to_string(),
            self.project_path.to_string_lossy().to_string(),
            "--output-path".to_string(),
            report.clone(),
            "--report-dir".to_string(),
            report,
            "--maximum-search-time".to_string(),
            self.maximum_search_time.to_string(),
            "--seed".to_string(),
            seed.to_string(),
            "--create-coverage-report".to_string(),
            coverage_flag.to_string(),
            "--output-variables".to_string(),
        ];
        args.extend(OUTPUT_VARIABLES.iter().map(|v| v.to_string()));
        args.push("-v".to_string());
        args.extend(expand_args(tool_args, report_path));
        args
    }

    /// Run the tool into `report_path`, which must not exist yet. Writes the seed,
    /// captured output and exit status there. Returns the recorded status.
    pub async fn run(
        &self,
        module_name: &str,
        report_path: &Path,
        seed: u64,
        tool_args: &[String],
    ) -> AppResult<ExitStatus> {
        fs::create_dir_all(report_path)?;
        match self.run_in(module_name, report_path, seed, tool_args).await {
            Ok(status) => Ok(status),
            Err(e) => {
                // The directory is ours; leaving it would mark the run as done on resume
                if let Err(cleanup) = fs::remove_dir_all(report_path) {
                    warn!(
                        "Failed to remove incomplete run {}: {cleanup}",
                        report_path.display()
                    );
                }
                Err(e)
            }
        }
    }

    async fn run_in(
        &self,
        module_name: &str,
        report_path: &Path,
        seed: u64,
        tool_args: &[String],
    ) -> AppResult<ExitStatus> {
        fs::write(report_path.join(SEED_FILENAME), seed.to_string())?;
        let stdout = fs::File::create(report_path.join(STDOUT_FILENAME))?;
        let stderr = fs::File::create(report_path.join(STDERR_FILENAME))?;

        let args = self.command_args(module_name, report_path, seed, tool_args);
        debug!("Running {} {}", self.tool, args.join(" "));

        let start = Instant::now();
        let mut child = Command::new(&self.tool)
            .args(&args)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Custom(format!("Failed to start {}: {e}", self.tool)))?;

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(result) => exit_status_of(result?),
            Err(_) => {
                warn!(
                    "Run exceeded {}s timeout, killing {}",
                    self.timeout.as_secs(),
                    self.tool
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {e}", self.tool);
                }
                ExitStatus::NoExit
            }
        };
        debug!(
            "{} finished in {:.1}s with status {status}",
            self.tool,
            start.elapsed().as_secs_f64()
        );

        fs::write(
            report_path.join(&self.return_code_file),
            status.to_status_file(),
        )?;
        Ok(status)
    }
}

/// Convert a process status, recording death by signal `s` as `-s`
pub fn exit_status_of(status: std::process::ExitStatus) -> ExitStatus {
    if let Some(code) = status.code() {
        return ExitStatus::Code(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitStatus::Code(-signal);
        }
    }
    ExitStatus::NoExit
}

/// `git checkout <branch>` inside the tool repository
pub async fn checkout_branch(tool_path: &Path, branch: &str) -> AppResult<()> {
    run_quiet(
        Command::new("git")
            .arg("checkout")
            .arg(branch)
            .current_dir(tool_path),
        &format!("git checkout {branch}"),
    )
    .await
}

/// Editable install of the tool repository so the checked-out branch is the one that runs
pub async fn install_tool(tool_path: &Path) -> AppResult<()> {
    run_quiet(
        Command::new("pip").arg("install").arg("-e").arg(tool_path),
        &format!("pip install -e {}", tool_path.display()),
    )
    .await
}

/// Run a preparation command with stdout discarded. A non-zero exit is logged, not fatal.
async fn run_quiet(command: &mut Command, description: &str) -> AppResult<()> {
    let status = command
        .stdout(Stdio::null())
        .status()
        .await
        .map_err(|e| AppError::Custom(format!("Failed to run {description}: {e}")))?;
    if !status.success() {
        warn!("{description} exited with {}", exit_status_of(status));
    }
    Ok(())
}
