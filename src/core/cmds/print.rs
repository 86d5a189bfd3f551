use std::path::PathBuf;

use crate::types::AppResult;

pub mod config;
pub mod run;
pub mod summary;

pub struct RunFilters {
    pub run: PathBuf,
    pub module: Option<String>,
    pub format: String,
}

pub enum PrintCommand {
    Config(String),
    Summary { experiment: PathBuf, format: String },
    Run(RunFilters),
}

pub async fn execute_print(command: PrintCommand) -> AppResult<()> {
    match command {
        PrintCommand::Config(format) => config::execute(format).await,
        PrintCommand::Summary { experiment, format } => summary::execute(experiment, format).await,
        PrintCommand::Run(filters) => run::execute(filters).await,
    }
}
