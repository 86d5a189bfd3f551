use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::types::AppResult;

/// One experiment configuration: a row of the modules CSV
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExperimentSpec {
    pub module_name: String,
    pub experiment_name: String,
    pub branch_name: String,
    /// Extra tool arguments; `{report_path}` is substituted per run
    #[serde(deserialize_with = "deserialize_args")]
    pub tool_args: Vec<String>,
}

fn deserialize_args<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(split_args(&raw))
}

/// Split on single spaces, dropping empty tokens
pub fn split_args(args: &str) -> Vec<String> {
    args.split(' ')
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect()
}

/// Substitute `{report_path}` in every argument
pub fn expand_args(args: &[String], report_path: &Path) -> Vec<String> {
    let report_path = report_path.to_string_lossy();
    args.iter()
        .map(|arg| arg.replace("{report_path}", &report_path))
        .collect()
}

/// Read the header-less modules CSV; lines starting with `#` are skipped
pub fn load_experiments(path: &Path) -> AppResult<Vec<ExperimentSpec>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(path)?;
    parse_experiments(reader)
}

fn parse_experiments<R: std::io::Read>(mut reader: csv::Reader<R>) -> AppResult<Vec<ExperimentSpec>> {
    let mut specs = Vec::new();
    for record in reader.deserialize::<ExperimentSpec>() {
        specs.push(record?);
    }
    Ok(specs)
}

/// Rows `[start, end)`, clamped to the available rows
pub fn select(specs: &[ExperimentSpec], start: Option<usize>, end: Option<usize>) -> &[ExperimentSpec] {
    let end = end.unwrap_or(specs.len()).min(specs.len());
    let start = start.unwrap_or(0).min(end);
    &specs[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn split_args_ignores_repeated_spaces() {
        assert_eq!(
            split_args(" --algorithm  DYNAMOSA --foo "),
            vec!["--algorithm", "DYNAMOSA", "--foo"]
        );
        assert!(split_args("").is_empty());
    }

    #[test]
    fn expand_args_substitutes_report_path() {
        let args = vec!["--log={report_path}/x.log".to_string(), "-q".to_string()];
        let formatted = expand_args(&args, &PathBuf::from("results/exp/3"));
        assert_eq!(formatted, vec!["--log=results/exp/3/x.log", "-q"]);
    }

    #[test]
    fn comment_lines_are_skipped() {
        let text = "# module_name,experiment_name,branch_name,tool_args\n\
                    pkg.mod,base,main,--algorithm DYNAMOSA\n";
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .from_reader(text.as_bytes());
        let specs = parse_experiments(reader).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].experiment_name, "base");
        assert_eq!(specs[0].tool_args, vec!["--algorithm", "DYNAMOSA"]);
    }

    #[test]
    fn select_clamps_like_slicing() {
        let spec = |name: &str| ExperimentSpec {
            module_name: "m".to_string(),
            experiment_name: name.to_string(),
            branch_name: "main".to_string(),
            tool_args: vec![],
        };
        let specs = vec![spec("a"), spec("b"), spec("c")];
        assert_eq!(select(&specs, None, None).len(), 3);
        assert_eq!(select(&specs, Some(1), None)[0].experiment_name, "b");
        assert_eq!(select(&specs, Some(1), Some(2)).len(), 1);
        assert!(select(&specs, Some(5), Some(9)).is_empty());
        assert!(select(&specs, Some(2), Some(1)).is_empty());
    }
}
