//! godet scans Go source packages for security- and determinism-relevant
//! patterns: integer casts that can truncate, map iteration outside the
//! safe idioms, wall-clock reads, weak cryptographic primitives, and
//! blocklisted imports. Findings are reported as structured issues and
//! can be rendered as JSON or SARIF 2.1.0.
//!
//! Parsing is done with Tree-sitter; a local type resolver supplies the
//! expression-type information the rules consume.

pub mod analysis;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod issue;
pub mod loader;
pub mod logging;
pub mod report;
pub mod rules;

pub use analyzer::Analyzer;
pub use config::Config;
pub use error::{Error, Result};
pub use issue::{Confidence, Issue, Metrics, ParseError, Severity};
