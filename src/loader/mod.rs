//! Package loading: resolving a package path to parsed Go source files.

pub mod generated;
mod go;

use std::path::{Path, PathBuf};

pub use go::{find_module_root, parse_file, GoPackageLoader};

use crate::issue::ParseError;

/// One parsed source file, retained together with its source text.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: tree_sitter::Tree,
}

impl ParsedFile {
    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }
}

/// A group of files sharing one package clause.
#[derive(Debug)]
pub struct Package {
    pub name: String,
    pub module_root: PathBuf,
    pub files: Vec<ParsedFile>,
}

/// Loader configuration. Build tags are consumed by the first load that
/// uses them and cleared afterwards so they are never applied twice.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    pub build_tags: Vec<String>,
    pub tests: bool,
}

impl LoaderConfig {
    pub fn new(build_tags: &[String], tests: bool) -> Self {
        LoaderConfig {
            build_tags: build_tags.to_vec(),
            tests,
        }
    }
}

pub trait PackageLoader {
    /// Loads the package at `path`. A path that does not exist is skipped
    /// with an empty result rather than an error.
    fn load(&self, path: &Path, config: &mut LoaderConfig) -> Result<Vec<Package>, LoadError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no buildable Go source files in {0}")]
    NoGoFiles(PathBuf),

    #[error("loading files from package {path:?}: {message}")]
    Package { path: String, message: String },

    #[error(transparent)]
    Filter(#[from] generated::FilterError),
}

/// Harvests front-end syntax errors from every file of `pkg`, in file
/// order, each error carrying its 1-based position.
pub fn syntax_errors(pkg: &Package) -> Vec<(String, Vec<ParseError>)> {
    let mut out = Vec::new();
    for file in &pkg.files {
        let mut errors = Vec::new();
        collect_error_nodes(file.tree.root_node(), &file.source, &mut errors);
        if !errors.is_empty() {
            out.push((file.path.display().to_string(), errors));
        }
    }
    out
}

fn collect_error_nodes(node: tree_sitter::Node, source: &str, errors: &mut Vec<ParseError>) {
    if node.is_error() {
        let pos = node.start_position();
        let snippet: String = node
            .utf8_text(source.as_bytes())
            .unwrap_or("")
            .chars()
            .take(40)
            .collect();
        errors.push(ParseError::new(
            pos.row + 1,
            pos.column + 1,
            format!("syntax error near {snippet:?}"),
        ));
        return;
    }
    if node.is_missing() {
        let pos = node.start_position();
        errors.push(ParseError::new(
            pos.row + 1,
            pos.column + 1,
            format!("missing {}", node.kind()),
        ));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, source, errors);
    }
}
