//! The issue model shared by the analyzer, the rules, and the report
//! emitters.

use std::fmt;

use serde::{Serialize, Serializer};
use tree_sitter::Node;

use crate::analysis::Context;

/// How serious a finding is. Ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        };
        f.write_str(name)
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// How confident a rule is in a finding. Ordered like [`Severity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        };
        f.write_str(name)
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A CWE entry attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cwe {
    pub id: String,
    pub url: String,
}

impl Cwe {
    pub fn new(id: &str) -> Self {
        Cwe {
            id: id.to_string(),
            url: format!("https://cwe.mitre.org/data/definitions/{id}.html"),
        }
    }
}

/// Fixed mapping from rule ID to its CWE entry.
pub fn cwe_by_rule(rule_id: &str) -> Option<Cwe> {
    let id = match rule_id {
        "G401" => "327",
        "G501" => "676",
        "G701" | "G702" => "190",
        "G703" | "G704" => "330",
        "G705" => "703",
        _ => return None,
    };
    Some(Cwe::new(id))
}

/// Identity and default reporting attributes embedded in every rule.
#[derive(Debug, Clone)]
pub struct MetaData {
    pub id: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub what: String,
}

/// A single finding. Positions are 1-based; `line` is either `"N"` or
/// `"N-M"` for multi-line nodes.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe: Option<Cwe>,
    pub rule_id: String,
    #[serde(rename = "details")]
    pub what: String,
    pub file: String,
    pub code: String,
    pub line: String,
    #[serde(rename = "column")]
    pub col: String,
}

impl Issue {
    /// Builds an issue for `node`, deriving the location and snippet from
    /// the file currently installed in `ctx`.
    pub fn new(
        ctx: &Context<'_>,
        node: Node<'_>,
        rule_id: &str,
        what: impl Into<String>,
        severity: Severity,
        confidence: Confidence,
    ) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        let line = if start.row == end.row {
            format!("{}", start.row + 1)
        } else {
            format!("{}-{}", start.row + 1, end.row + 1)
        };

        Issue {
            severity,
            confidence,
            cwe: cwe_by_rule(rule_id),
            rule_id: rule_id.to_string(),
            what: what.into(),
            file: ctx.file_path().to_string(),
            code: ctx.node_text(node).to_string(),
            line,
            col: format!("{}", start.column + 1),
        }
    }

    /// Builds an issue from a previously recorded location, for rules
    /// that correlate across nodes and report on an earlier one.
    pub fn at_location(
        ctx: &Context<'_>,
        location: Location,
        rule_id: &str,
        what: impl Into<String>,
        severity: Severity,
        confidence: Confidence,
    ) -> Self {
        Issue {
            severity,
            confidence,
            cwe: cwe_by_rule(rule_id),
            rule_id: rule_id.to_string(),
            what: what.into(),
            file: ctx.file_path().to_string(),
            code: location.code,
            line: location.line,
            col: location.col,
        }
    }
}

/// An owned source location, detachable from the syntax tree.
#[derive(Debug, Clone)]
pub struct Location {
    pub line: String,
    pub col: String,
    pub code: String,
}

impl Location {
    pub fn of(ctx: &Context<'_>, node: Node<'_>) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        let line = if start.row == end.row {
            format!("{}", start.row + 1)
        } else {
            format!("{}-{}", start.row + 1, end.row + 1)
        };
        Location {
            line,
            col: format!("{}", start.column + 1),
            code: ctx.node_text(node).to_string(),
        }
    }
}

/// Counters reported alongside the issues of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    #[serde(rename = "files")]
    pub num_files: usize,
    #[serde(rename = "lines")]
    pub num_lines: usize,
    #[serde(rename = "nosec")]
    pub num_nosec: usize,
    #[serde(rename = "found")]
    pub num_found: usize,
}

/// A syntax error reported by the front-end for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    #[serde(rename = "error")]
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        ParseError {
            line,
            column,
            message: message.into(),
        }
    }
}
