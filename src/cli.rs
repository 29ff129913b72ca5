use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use walkdir::WalkDir;

const EXCLUDED_DIRS: &[&str] = &["vendor", "testdata", ".git"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Sarif,
}

#[derive(Parser, Debug)]
#[command(name = "godet")]
#[command(about = "Determinism and security scanner for Go packages", long_about = None)]
pub struct Args {
    /// Package directories to scan; a trailing /... recurses
    #[arg(value_name = "PACKAGES", required = true)]
    pub packages: Vec<String>,

    /// Include _test.go files
    #[arg(long)]
    pub tests: bool,

    /// Build tags applied to the first load
    #[arg(long = "tags", value_name = "TAG")]
    pub build_tags: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Root prefixes stripped from file paths in SARIF output
    #[arg(long = "root-path", value_name = "PATH")]
    pub root_paths: Vec<String>,

    /// Ignore #nosec annotations entirely
    #[arg(long)]
    pub nosec: bool,

    /// Replace the #nosec suppression token
    #[arg(long = "nosec-tag", value_name = "TAG")]
    pub nosec_tag: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Silence all logging
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if let Some(tag) = &self.nosec_tag {
            if tag.trim().is_empty() {
                anyhow::bail!("--nosec-tag must not be empty");
            }
        }
        Ok(())
    }

    /// Expands `dir/...` entries into every package directory below
    /// `dir`, leaving plain entries untouched.
    pub fn expand_packages(&self) -> Result<Vec<String>> {
        let mut expanded = Vec::new();
        for entry in &self.packages {
            match entry.strip_suffix("/...") {
                Some(root) => {
                    let root = if root.is_empty() { "." } else { root };
                    expanded.extend(package_dirs(Path::new(root))?);
                }
                None => expanded.push(entry.clone()),
            }
        }
        Ok(expanded)
    }
}

/// Lists every directory under `root` containing at least one Go file,
/// skipping vendor trees, testdata, and hidden directories.
fn package_dirs(root: &Path) -> Result<Vec<String>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            if !e.file_type().is_dir() {
                return true;
            }
            if name.starts_with('.') && e.depth() > 0 {
                return false;
            }
            !EXCLUDED_DIRS.contains(&name.as_ref())
        })
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let has_go_files = std::fs::read_dir(entry.path())?.any(|f| {
            f.ok()
                .map(|f| {
                    f.file_name().to_string_lossy().ends_with(".go") && f.path().is_file()
                })
                .unwrap_or(false)
        });
        if has_go_files {
            dirs.push(entry.path().display().to_string());
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args_for(packages: &[&str]) -> Args {
        Args {
            packages: packages.iter().map(|s| s.to_string()).collect(),
            tests: false,
            build_tags: Vec::new(),
            format: OutputFormat::Json,
            output: None,
            root_paths: Vec::new(),
            nosec: false,
            nosec_tag: None,
            verbose: 0,
            quiet: false,
        }
    }

    #[test]
    fn plain_entries_pass_through() {
        let args = args_for(&["./pkg", "./other"]);
        let expanded = args.expand_packages().unwrap();
        assert_eq!(expanded, vec!["./pkg".to_string(), "./other".to_string()]);
    }

    #[test]
    fn triple_dot_recurses_into_package_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b/vendor/dep")).unwrap();
        fs::create_dir_all(root.join("b/c")).unwrap();
        fs::write(root.join("a/a.go"), "package a\n").unwrap();
        fs::write(root.join("b/c/c.go"), "package c\n").unwrap();
        fs::write(root.join("b/vendor/dep/d.go"), "package d\n").unwrap();
        fs::write(root.join("b/readme.md"), "not go\n").unwrap();

        let spec = format!("{}/...", root.display());
        let args = args_for(&[&spec]);
        let expanded = args.expand_packages().unwrap();

        assert_eq!(expanded.len(), 2);
        assert!(expanded[0].ends_with("/a"));
        assert!(expanded[1].ends_with("/c"));
    }

    #[test]
    fn empty_nosec_tag_is_rejected() {
        let mut args = args_for(&["./pkg"]);
        args.nosec_tag = Some("  ".to_string());
        assert!(args.validate().is_err());

        args.nosec_tag = Some("#ignore".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn args_parse_from_command_line() {
        let args = Args::try_parse_from([
            "godet",
            "--tests",
            "--tags",
            "integration",
            "-f",
            "sarif",
            "./...",
        ])
        .unwrap();
        assert!(args.tests);
        assert_eq!(args.build_tags, vec!["integration".to_string()]);
        assert_eq!(args.format, OutputFormat::Sarif);
        assert_eq!(args.packages, vec!["./...".to_string()]);
    }
}
