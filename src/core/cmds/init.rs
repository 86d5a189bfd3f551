use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

use log::{info, warn};

use crate::types::AppResult;
use crate::types::config::{config, get_config_filename};

const EXAMPLE_CONFIG: &str = include_str!("../../example.toml");

/// Starter experiment list: comments only, so `run` has nothing to do until rows are added
const MODULES_TEMPLATE: &str = "\
# One experiment per line, no header:
# module_name,experiment_name,branch_name,tool_args
# tool_args may use {report_path}, replaced by each run's directory.
# pkg.module,dynamosa_base,main,--algorithm DYNAMOSA
";

/// Create `path` with `contents` unless it already exists; returns whether it was written
pub fn write_if_absent(path: &Path, contents: &str) -> AppResult<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    file.write_all(contents.as_bytes())?;
    Ok(true)
}

/// Lay out a benchmark workspace in `dir`: configuration, experiment list and results directory
pub fn init_workspace(dir: &Path, modules_csv: &str, results_path: &str) -> AppResult<Vec<String>> {
    let mut created = Vec::new();
    for (name, contents) in [
        (get_config_filename(), EXAMPLE_CONFIG),
        (modules_csv, MODULES_TEMPLATE),
    ] {
        if write_if_absent(&dir.join(name), contents)? {
            created.push(name.to_string());
        } else {
            warn!("{name} already exists; leaving it unchanged");
        }
    }

    let results = dir.join(results_path);
    if !results.is_dir() {
        std::fs::create_dir_all(&results)?;
        created.push(results_path.to_string());
    }
    Ok(created)
}

pub async fn execute_init() -> AppResult<()> {
    let run = config().run();
    let created = init_workspace(Path::new("."), run.modules_csv(), run.results_path())?;
    if created.is_empty() {
        info!("Benchmark workspace already set up");
    } else {
        info!("Created {}", created.join(", "));
        info!("Add experiments to {}, then start them with `genbench run`", run.modules_csv());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::modules::load_experiments;
    use crate::types::config::Config;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn fresh_workspace_gets_every_file() {
        let tmp = tempdir().unwrap();
        let created = init_workspace(tmp.path(), "modules.csv", "results").unwrap();
        assert_eq!(created, vec!["genbench.toml", "modules.csv", "results"]);

        let written = fs::read_to_string(tmp.path().join("genbench.toml")).unwrap();
        assert!(toml::from_str::<Config>(&written).is_ok());
        assert!(load_experiments(&tmp.path().join("modules.csv")).unwrap().is_empty());
        assert!(tmp.path().join("results").is_dir());
    }

    #[test]
    fn existing_files_are_left_alone() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("genbench.toml"), "[run]\nnb_runs = 3\n").unwrap();

        let created = init_workspace(tmp.path(), "experiments.csv", "out").unwrap();
        assert_eq!(created, vec!["experiments.csv", "out"]);
        assert_eq!(
            fs::read_to_string(tmp.path().join("genbench.toml")).unwrap(),
            "[run]\nnb_runs = 3\n"
        );

        assert!(init_workspace(tmp.path(), "experiments.csv", "out").unwrap().is_empty());
        let config_path = tmp.path().join("out").join("..").join("genbench.toml");
        assert!(!write_if_absent(&config_path, "x").unwrap());
    }
}
