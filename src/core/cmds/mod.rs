pub mod compare;
pub mod init;
pub mod lines;
pub mod print;
pub mod run;
pub mod status;
pub mod summarize;
pub mod table;

use std::path::{Path, PathBuf};

pub use compare::{execute_compare, execute_latex_compare};
pub use init::execute_init;
pub use lines::{execute_frequency, execute_line_compare, execute_overlap};
pub use print::execute_print;
pub use run::execute_run;
pub use status::execute_status;
pub use summarize::execute_summarize;
pub use table::execute_table;

/// Directory holding the runs of an experiment given as a directory or a summary file
pub fn experiment_dir(experiment: &Path) -> PathBuf {
    if experiment.is_dir() {
        experiment.to_path_buf()
    } else {
        experiment
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
