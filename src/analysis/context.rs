use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;

use tree_sitter::Node;

use super::{CommentMap, ImportTracker, TypeResolver};
use crate::config::Config;
use crate::loader::{Package, ParsedFile};

/// Everything a rule may consult while one file is being walked. Rebuilt
/// from scratch for every file; the passed-values map gives rules a place
/// to stash cross-node state for the duration of that walk.
pub struct Context<'a> {
    pkg: &'a Package,
    file: &'a ParsedFile,
    config: &'a Config,
    comments: CommentMap,
    imports: RefCell<ImportTracker>,
    passed_values: RefCell<HashMap<String, Box<dyn Any>>>,
}

impl<'a> Context<'a> {
    pub fn new(pkg: &'a Package, file: &'a ParsedFile, config: &'a Config) -> Self {
        let root = file.tree.root_node();
        let comments = CommentMap::build(root, &file.source);
        let mut imports = ImportTracker::new();
        imports.track_file(root, &file.source);

        Context {
            pkg,
            file,
            config,
            comments,
            imports: RefCell::new(imports),
            passed_values: RefCell::new(HashMap::new()),
        }
    }

    pub fn file_path(&self) -> &str {
        self.file.path.to_str().unwrap_or("")
    }

    pub fn source(&self) -> &'a str {
        &self.file.source
    }

    pub fn root(&self) -> Node<'a> {
        self.file.tree.root_node()
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn comments(&self) -> &CommentMap {
        &self.comments
    }

    pub fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.file.source.as_bytes()).unwrap_or("")
    }

    pub fn resolver(&self) -> TypeResolver<'a> {
        TypeResolver::new(self.pkg, self.file)
    }

    /// Registers an import spec as the visitor encounters it.
    pub fn track_import(&self, node: Node) {
        self.imports.borrow_mut().track_spec(node, &self.file.source);
    }

    pub fn with_imports<R>(&self, f: impl FnOnce(&ImportTracker) -> R) -> R {
        f(&self.imports.borrow())
    }

    /// Runs `f` over this walk's scratch value for `rule_id`, creating it
    /// on first use. Returns `None` when the slot holds a value of a
    /// different type.
    pub fn with_passed_value<T, R>(&self, rule_id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R>
    where
        T: Any + Default,
    {
        let mut values = self.passed_values.borrow_mut();
        let slot = values
            .entry(rule_id.to_string())
            .or_insert_with(|| Box::<T>::default());
        slot.downcast_mut::<T>().map(f)
    }
}
