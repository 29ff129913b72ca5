use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::generated::filter_generated;
use super::{LoadError, LoaderConfig, Package, PackageLoader, ParsedFile};

pub struct GoPackageLoader;

impl PackageLoader for GoPackageLoader {
    fn load(&self, path: &Path, config: &mut LoaderConfig) -> Result<Vec<Package>, LoadError> {
        let abs = match fs::canonicalize(path) {
            Ok(abs) => abs,
            Err(_) => {
                debug!(path = %path.display(), "skipping: path does not exist");
                return Ok(Vec::new());
            }
        };
        debug!(dir = %abs.display(), "import directory");

        let working_dir = std::env::current_dir().map_err(|source| LoadError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        let module_root = find_module_root(&abs, &working_dir);
        debug!(root = %module_root.display(), "module root");

        // Tags apply to this load only.
        let build_tags = std::mem::take(&mut config.build_tags);

        let paths = collect_go_files(&abs, config.tests)?;
        let paths = filter_generated(&paths)?;

        // Group parsed files by package clause, in first-appearance order.
        let mut order = Vec::new();
        let mut grouped: BTreeMap<String, Vec<ParsedFile>> = BTreeMap::new();
        for file_path in paths {
            let source = fs::read(&file_path).map_err(|source| LoadError::Io {
                path: file_path.clone(),
                source,
            })?;
            let source = String::from_utf8_lossy(&source).into_owned();
            if !build_tags.is_empty() && !build_tags_satisfied(&source, &build_tags) {
                continue;
            }
            let file = parse_file(file_path, source)?;
            let name = package_clause(&file).unwrap_or_default();
            if !grouped.contains_key(&name) {
                order.push(name.clone());
            }
            grouped.entry(name).or_default().push(file);
        }

        if order.is_empty() {
            return Err(LoadError::NoGoFiles(abs));
        }

        let packages = order
            .into_iter()
            .map(|name| {
                let files = grouped.remove(&name).unwrap_or_default();
                Package {
                    name,
                    module_root: module_root.clone(),
                    files,
                }
            })
            .collect();
        Ok(packages)
    }
}

/// Walks upward from the package directory toward the working directory,
/// returning the first directory holding a regular `go.mod` file, or the
/// working directory when none is found.
pub fn find_module_root(pkg_dir: &Path, working_dir: &Path) -> PathBuf {
    let mut dir = pkg_dir;
    loop {
        if dir == working_dir {
            break;
        }
        if dir.join("go.mod").is_file() {
            return dir.to_path_buf();
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }
    working_dir.to_path_buf()
}

/// Lists the `.go` files directly inside `dir`, sorted by name.
/// `_test.go` files are kept only when `tests` is set.
fn collect_go_files(dir: &Path, tests: bool) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".go") || name.starts_with('.') {
            continue;
        }
        if name.ends_with("_test.go") && !tests {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// Evaluates the file's `//go:build` line against the given tags.
/// Supports plain terms, negation, and `&&`/`||` of those; anything
/// richer is treated as satisfied.
fn build_tags_satisfied(source: &str, tags: &[String]) -> bool {
    let Some(expr) = source.lines().find_map(|line| {
        let line = line.trim();
        line.strip_prefix("//go:build ").map(str::trim)
    }) else {
        return true;
    };

    let term_holds = |term: &str| -> bool {
        let term = term.trim();
        if let Some(negated) = term.strip_prefix('!') {
            return !tags.iter().any(|t| t == negated.trim());
        }
        if term.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            return tags.iter().any(|t| t == term);
        }
        true
    };

    expr.split("||")
        .any(|alt| alt.split("&&").all(|term| term_holds(term)))
}

/// Parses one Go source file with the Tree-sitter front-end.
pub fn parse_file(path: PathBuf, source: String) -> Result<ParsedFile, LoadError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| LoadError::Package {
            path: path.display().to_string(),
            message: format!("installing Go grammar: {e}"),
        })?;
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| LoadError::Package {
            path: path.display().to_string(),
            message: "parser produced no tree".to_string(),
        })?;
    Ok(ParsedFile { path, source, tree })
}

fn package_clause(file: &ParsedFile) -> Option<String> {
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "package_clause" {
            let mut inner = child.walk();
            for part in child.children(&mut inner) {
                if part.kind() == "package_identifier" {
                    return part
                        .utf8_text(file.source.as_bytes())
                        .ok()
                        .map(str::to_string);
                }
            }
        }
    }
    None
}
