//! Tracks one file's import declarations:
//! - plain: `import "crypto/sha256"` registers `sha256`
//! - aliased: `import csha "crypto/sha256"` registers `csha`
//! - dot: `import . "crypto/sha256"` exposes the package's names bare
//! - blank: `import _ "embed"` is recorded as a side-effect import

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use super::unquote;

#[derive(Debug, Clone, Default)]
pub struct ImportTracker {
    imported: HashMap<String, String>,
    dot: HashSet<String>,
    side_effect: HashSet<String>,
}

impl ImportTracker {
    pub fn new() -> Self {
        ImportTracker::default()
    }

    /// Registers every import spec reachable from `root`.
    pub fn track_file(&mut self, root: Node, source: &str) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind() == "import_spec" {
                self.track_spec(node, source);
                continue;
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    /// Registers a single `import_spec` node. Called by the visitor as it
    /// encounters specs; re-registration is harmless.
    pub fn track_spec(&mut self, node: Node, source: &str) {
        if node.kind() != "import_spec" {
            return;
        }

        let mut name: Option<String> = None;
        let mut path: Option<String> = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "package_identifier" | "blank_identifier" | "dot" => {
                    name = child.utf8_text(source.as_bytes()).ok().map(str::to_string);
                }
                "interpreted_string_literal" | "raw_string_literal" => {
                    path = child
                        .utf8_text(source.as_bytes())
                        .ok()
                        .map(|text| unquote(text).to_string());
                }
                _ => {}
            }
        }

        let Some(path) = path else { return };
        match name.as_deref() {
            Some("_") => {
                self.side_effect.insert(path);
            }
            Some(".") => {
                self.dot.insert(path);
            }
            Some(alias) => {
                self.imported.insert(alias.to_string(), path);
            }
            None => {
                self.imported.insert(base_name(&path), path);
            }
        }
    }

    /// Resolves a local package name (possibly an alias) to its import
    /// path.
    pub fn resolve(&self, local: &str) -> Option<&str> {
        self.imported.get(local).map(String::as_str)
    }

    pub fn is_dot_imported(&self, path: &str) -> bool {
        self.dot.contains(path)
    }

    pub fn dot_imports(&self) -> impl Iterator<Item = &str> {
        self.dot.iter().map(String::as_str)
    }

    pub fn is_side_effect_import(&self, path: &str) -> bool {
        self.side_effect.contains(path)
    }

    pub fn len(&self) -> usize {
        self.imported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imported.is_empty() && self.dot.is_empty() && self.side_effect.is_empty()
    }
}

fn base_name(import_path: &str) -> String {
    import_path
        .rsplit('/')
        .next()
        .unwrap_or(import_path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_file;
    use std::path::PathBuf;

    fn tracker_for(source: &str) -> ImportTracker {
        let file = parse_file(PathBuf::from("test.go"), source.to_string()).unwrap();
        let mut tracker = ImportTracker::new();
        tracker.track_file(file.tree.root_node(), source);
        tracker
    }

    #[test]
    fn plain_import() {
        let tracker = tracker_for("package main\nimport \"crypto/sha256\"\n");
        assert_eq!(tracker.resolve("sha256"), Some("crypto/sha256"));
    }

    #[test]
    fn aliased_import() {
        let tracker = tracker_for("package main\nimport mrand \"math/rand\"\n");
        assert_eq!(tracker.resolve("mrand"), Some("math/rand"));
        assert_eq!(tracker.resolve("rand"), None);
    }

    #[test]
    fn grouped_imports() {
        let tracker = tracker_for(
            "package main\nimport (\n\t\"strconv\"\n\tcmd5 \"crypto/md5\"\n)\n",
        );
        assert_eq!(tracker.resolve("strconv"), Some("strconv"));
        assert_eq!(tracker.resolve("cmd5"), Some("crypto/md5"));
    }

    #[test]
    fn dot_import() {
        let tracker = tracker_for("package main\nimport . \"crypto/md5\"\n");
        assert!(tracker.is_dot_imported("crypto/md5"));
        assert_eq!(tracker.resolve("md5"), None);
    }

    #[test]
    fn blank_import_is_side_effect() {
        let tracker = tracker_for("package main\nimport _ \"embed\"\n");
        assert!(tracker.is_side_effect_import("embed"));
        assert_eq!(tracker.resolve("embed"), None);
    }

    #[test]
    fn versioned_path_uses_last_segment() {
        let tracker = tracker_for("package main\nimport \"github.com/foo/bar\"\n");
        assert_eq!(tracker.resolve("bar"), Some("github.com/foo/bar"));
    }
}
