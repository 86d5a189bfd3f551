use log::warn;
use strum::IntoEnumIterator;

use crate::core::cli::TableArgs;
use crate::types::config::parse_csv;
use crate::types::{AppResult, ExitKind, ExperimentSummary};

/// Columns before the exit-status buckets; those follow in `ExitKind` order
const LEADING_COLUMNS: [&str; 7] = [
    "Experiment",
    "Coverage",
    "Iterations",
    "Total time",
    "Search time",
    "Mutation score",
    "Crash test count",
];

pub fn header() -> Vec<String> {
    LEADING_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(ExitKind::iter().map(|kind| kind.to_string()))
        .collect()
}

/// One row of cells per summary, aligned with [`header`]
pub fn summary_row(summary: &ExperimentSummary) -> Vec<String> {
    let mut row = vec![
        summary.experiment_name.clone(),
        format!("{:.2}", summary.mean_coverage),
        format!("{:.2}", summary.mean_iterations),
        format!("{:.2}", summary.mean_total_time),
        format!("{:.2}", summary.mean_search_time),
        format!("{:.2}", summary.mean_mutation_score),
        summary.crash_count.to_string(),
    ];
    row.extend(ExitKind::iter().map(|kind| summary.exit_count(kind).to_string()));
    row
}

/// Render a LaTeX `tabular` with centered columns and a rule around every row,
/// leaving out the named columns
pub fn render_table(summaries: &[ExperimentSummary], except_columns: &[String]) -> String {
    let header = header();
    for column in except_columns {
        if !header.contains(column) {
            warn!("Unknown column {column:?}; known columns: {}", header.join(", "));
        }
    }
    let keep: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| !except_columns.contains(name))
        .map(|(i, _)| i)
        .collect();
    let pick = |cells: &[String]| -> String {
        keep.iter()
            .map(|&i| escape_latex(&cells[i]))
            .collect::<Vec<_>>()
            .join(" & ")
    };

    let spec = vec!["c"; keep.len()].join(" | ");
    let mut out = format!("\\begin{{tabular}}{{| {spec} |}}\n\\hline\n");
    out.push_str(&format!("{} \\\\\n\\hline\n", pick(header.as_slice())));
    for summary in summaries {
        out.push_str(&format!("{} \\\\\n\\hline\n", pick(summary_row(summary).as_slice())));
    }
    out.push_str("\\end{tabular}");
    out
}

/// Escape the characters LaTeX treats specially in text mode
pub fn escape_latex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '~' => escaped.push_str("\\textasciitilde{}"),
            '^' => escaped.push_str("\\textasciicircum{}"),
            '\\' => escaped.push_str("\\textbackslash{}"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub async fn execute_table(args: TableArgs) -> AppResult<()> {
    let summaries = args
        .experiments
        .iter()
        .map(|path| ExperimentSummary::load(path))
        .collect::<AppResult<Vec<_>>>()?;
    let except_columns = args
        .except_columns
        .as_deref()
        .map(parse_csv)
        .unwrap_or_default();

    println!("{}", render_table(&summaries, &except_columns));
    Ok(())
}
