//! Report egress: issue ordering, the JSON report, and the SARIF
//! document.

pub mod sarif;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::issue::{Issue, Metrics, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid issue line {0:?}")]
    InvalidLine(String),

    #[error("invalid issue column {0:?}")]
    InvalidColumn(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Extracts the starting line number from `"N"` or `"N-M"`, returning 0
/// on malformed input.
pub fn extract_line_number(line: &str) -> u64 {
    line.split('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Sorts issues by severity, message, file, and starting line, all
/// descending.
pub fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.what.cmp(&a.what))
            .then_with(|| b.file.cmp(&a.file))
            .then_with(|| extract_line_number(&b.line).cmp(&extract_line_number(&a.line)))
    });
}

#[derive(Serialize)]
pub struct Report<'a> {
    pub issues: &'a [Issue],
    pub stats: &'a Metrics,
    pub errors: &'a BTreeMap<String, Vec<ParseError>>,
}

/// Renders the run's findings as a JSON document.
pub fn to_json(
    issues: &[Issue],
    stats: &Metrics,
    errors: &BTreeMap<String, Vec<ParseError>>,
) -> Result<String, ReportError> {
    let report = Report {
        issues,
        stats,
        errors,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
