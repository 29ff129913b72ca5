//! SARIF 2.1.0 output.
//!
//! One run, one rule entry per distinct rule ID, one physical location
//! per result. File URIs are made repository-relative by stripping the
//! longest matching configured root prefix.

use std::collections::HashMap;

use serde::Serialize;

use super::ReportError;
use crate::issue::Issue;

const SCHEMA_URI: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const VERSION: &str = "2.1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SarifLevel {
    None,
    Note,
    Warning,
    Error,
}

#[derive(Debug, Serialize)]
pub struct SarifReport {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub version: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    #[serde(rename = "informationUri")]
    pub information_uri: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
pub struct SarifRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
    #[serde(rename = "fullDescription")]
    pub full_description: SarifMessage,
    pub help: SarifMessage,
    pub properties: SarifProperties,
    #[serde(rename = "defaultConfiguration")]
    pub default_configuration: SarifConfiguration,
}

#[derive(Debug, Serialize)]
pub struct SarifProperties {
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SarifConfiguration {
    pub level: SarifLevel,
}

#[derive(Debug, Serialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    #[serde(rename = "ruleIndex")]
    pub rule_index: usize,
    pub level: SarifLevel,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifactLocation,
    pub region: SarifRegion,
}

#[derive(Debug, Serialize)]
pub struct SarifArtifactLocation {
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: u64,
    #[serde(rename = "endLine")]
    pub end_line: u64,
    #[serde(rename = "startColumn")]
    pub start_column: u64,
    #[serde(rename = "endColumn")]
    pub end_column: u64,
}

/// Maps a severity string onto a SARIF level.
pub fn level_for(severity: &str) -> SarifLevel {
    match severity {
        "LOW" => SarifLevel::Warning,
        "MEDIUM" => SarifLevel::Error,
        "HIGH" => SarifLevel::Error,
        _ => SarifLevel::Note,
    }
}

/// Builds the SARIF document for one run over `issues`.
pub fn create_report(
    issues: &[Issue],
    root_paths: &[String],
    driver_name: &str,
    driver_version: &str,
    information_uri: &str,
) -> Result<SarifReport, ReportError> {
    let mut rules: Vec<SarifRule> = Vec::new();
    let mut rule_indices: HashMap<String, usize> = HashMap::new();
    let mut results: Vec<SarifResult> = Vec::new();

    for issue in issues {
        let index = *rule_indices
            .entry(issue.rule_id.clone())
            .or_insert_with(|| {
                rules.push(build_rule(issue));
                rules.len() - 1
            });

        results.push(SarifResult {
            rule_id: rules[index].id.clone(),
            rule_index: index,
            level: level_for(&issue.severity.to_string()),
            message: SarifMessage {
                text: issue.what.clone(),
            },
            locations: vec![build_location(issue, root_paths)?],
        });
    }

    Ok(SarifReport {
        schema: SCHEMA_URI.to_string(),
        version: VERSION.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: driver_name.to_string(),
                    version: driver_version.to_string(),
                    information_uri: information_uri.to_string(),
                    rules,
                },
            },
            results,
        }],
    })
}

fn build_rule(issue: &Issue) -> SarifRule {
    let cwe_id = issue.cwe.as_ref().map(|c| c.id.as_str()).unwrap_or("");
    let cwe_url = issue.cwe.as_ref().map(|c| c.url.as_str()).unwrap_or("");
    SarifRule {
        id: format!("{} (CWE-{})", issue.rule_id, cwe_id),
        name: issue.what.clone(),
        short_description: SarifMessage {
            text: issue.what.clone(),
        },
        full_description: SarifMessage {
            text: issue.what.clone(),
        },
        help: SarifMessage {
            text: format!(
                "{}\nSeverity: {}\nConfidence: {}\nCWE: {}",
                issue.what, issue.severity, issue.confidence, cwe_url
            ),
        },
        properties: SarifProperties {
            tags: vec![format!("CWE-{cwe_id}"), issue.severity.to_string()],
        },
        default_configuration: SarifConfiguration {
            level: level_for(&issue.severity.to_string()),
        },
    }
}

fn build_location(issue: &Issue, root_paths: &[String]) -> Result<SarifLocation, ReportError> {
    let mut lines = issue.line.split('-');
    let start_line: u64 = lines
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|_| ReportError::InvalidLine(issue.line.clone()))?;
    let end_line = match lines.next() {
        Some(end) => end
            .parse()
            .map_err(|_| ReportError::InvalidLine(issue.line.clone()))?,
        None => start_line,
    };
    let column: u64 = issue
        .col
        .parse()
        .map_err(|_| ReportError::InvalidColumn(issue.col.clone()))?;

    // Strip the longest configured root prefix that is followed by '/'.
    let mut uri = issue.file.clone();
    let best = root_paths
        .iter()
        .filter(|root| issue.file.strip_prefix(root.as_str()).is_some_and(|r| r.starts_with('/')))
        .max_by_key(|root| root.len());
    if let Some(root) = best {
        uri = issue.file[root.len() + 1..].to_string();
    }

    Ok(SarifLocation {
        physical_location: SarifPhysicalLocation {
            artifact_location: SarifArtifactLocation { uri },
            region: SarifRegion {
                start_line,
                end_line: end_line.max(start_line),
                start_column: column,
                end_column: column,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{cwe_by_rule, Confidence, Severity};

    fn issue(rule_id: &str, severity: Severity, file: &str, line: &str) -> Issue {
        Issue {
            severity,
            confidence: Confidence::Medium,
            cwe: cwe_by_rule(rule_id),
            rule_id: rule_id.to_string(),
            what: "Potential integer overflow by integer type conversion".to_string(),
            file: file.to_string(),
            code: "uint32(v)".to_string(),
            line: line.to_string(),
            col: "7".to_string(),
        }
    }

    #[test]
    fn level_mapping() {
        assert_eq!(level_for("LOW"), SarifLevel::Warning);
        assert_eq!(level_for("MEDIUM"), SarifLevel::Error);
        assert_eq!(level_for("HIGH"), SarifLevel::Error);
        assert_eq!(level_for("WHATEVER"), SarifLevel::Note);
    }

    #[test]
    fn document_shape() {
        let issues = vec![issue("G701", Severity::High, "/repo/pkg/a.go", "3")];
        let report =
            create_report(&issues, &[], "godet", "0.3.1", "https://example.invalid").unwrap();

        assert_eq!(report.version, "2.1.0");
        assert!(report.schema.contains("sarif-schema-2.1.0.json"));
        assert_eq!(report.runs.len(), 1);

        let run = &report.runs[0];
        assert_eq!(run.tool.driver.rules.len(), 1);
        assert_eq!(run.tool.driver.rules[0].id, "G701 (CWE-190)");
        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].rule_index, 0);
        assert_eq!(run.results[0].rule_id, "G701 (CWE-190)");
    }

    #[test]
    fn rules_are_deduplicated_by_rule_id() {
        let issues = vec![
            issue("G701", Severity::High, "/repo/a.go", "1"),
            issue("G701", Severity::High, "/repo/b.go", "2"),
            issue("G703", Severity::High, "/repo/c.go", "3"),
        ];
        let report = create_report(&issues, &[], "godet", "0.3.1", "uri").unwrap();
        let run = &report.runs[0];
        assert_eq!(run.tool.driver.rules.len(), 2);
        assert_eq!(run.results[1].rule_index, 0);
        assert_eq!(run.results[2].rule_index, 1);
    }

    #[test]
    fn line_ranges_expand_to_start_and_end() {
        let issues = vec![issue("G703", Severity::High, "/repo/a.go", "4-9")];
        let report = create_report(&issues, &[], "godet", "0.3.1", "uri").unwrap();
        let region = &report.runs[0].results[0].locations[0]
            .physical_location
            .region;
        assert_eq!(region.start_line, 4);
        assert_eq!(region.end_line, 9);
        assert_eq!(region.start_column, 7);
        assert_eq!(region.end_column, 7);
    }

    #[test]
    fn longest_root_prefix_wins() {
        let issues = vec![issue("G701", Severity::High, "/repo/sub/a.go", "1")];
        let roots = vec!["/repo".to_string(), "/repo/sub".to_string()];
        let report = create_report(&issues, &roots, "godet", "0.3.1", "uri").unwrap();
        let uri = &report.runs[0].results[0].locations[0]
            .physical_location
            .artifact_location
            .uri;
        assert_eq!(uri, "a.go");
    }

    #[test]
    fn prefix_must_fall_on_a_path_boundary() {
        let issues = vec![issue("G701", Severity::High, "/repository/a.go", "1")];
        let roots = vec!["/repo".to_string()];
        let report = create_report(&issues, &roots, "godet", "0.3.1", "uri").unwrap();
        let uri = &report.runs[0].results[0].locations[0]
            .physical_location
            .artifact_location
            .uri;
        assert_eq!(uri, "/repository/a.go");
    }

    #[test]
    fn malformed_line_and_column_surface_errors() {
        let mut bad_line = issue("G701", Severity::High, "/a.go", "not-a-number");
        bad_line.line = "x-y".to_string();
        let err = create_report(&[bad_line], &[], "godet", "0.3.1", "uri").unwrap_err();
        assert!(matches!(err, ReportError::InvalidLine(_)));

        let mut bad_col = issue("G701", Severity::High, "/a.go", "3");
        bad_col.col = "seven".to_string();
        let err = create_report(&[bad_col], &[], "godet", "0.3.1", "uri").unwrap_err();
        assert!(matches!(err, ReportError::InvalidColumn(_)));
    }

    #[test]
    fn help_text_carries_severity_confidence_and_cwe() {
        let issues = vec![issue("G701", Severity::High, "/a.go", "3")];
        let report = create_report(&issues, &[], "godet", "0.3.1", "uri").unwrap();
        let help = &report.runs[0].tool.driver.rules[0].help.text;
        assert!(help.contains("Severity: HIGH"));
        assert!(help.contains("Confidence: MEDIUM"));
        assert!(help.contains("https://cwe.mitre.org/data/definitions/190.html"));
        let tags = &report.runs[0].tool.driver.rules[0].properties.tags;
        assert_eq!(tags, &["CWE-190".to_string(), "HIGH".to_string()]);
    }

    #[test]
    fn serialized_document_uses_sarif_field_names() {
        let issues = vec![issue("G701", Severity::High, "/a.go", "3")];
        let report = create_report(&issues, &[], "godet", "0.3.1", "uri").unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("$schema").is_some());
        assert_eq!(json["runs"][0]["results"][0]["level"], "error");
        assert!(json["runs"][0]["results"][0]["locations"][0]["physicalLocation"]["region"]
            ["startLine"]
            .is_number());
    }
}
