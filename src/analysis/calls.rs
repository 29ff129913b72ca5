//! Matching call expressions against qualified package functions,
//! resolving aliases and dot imports through the file's import tracker.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use super::Context;

/// Matches any imported package when used as the package key.
pub const WILDCARD_PACKAGE: &str = "*";

/// A two-level set of `package path -> function names`.
#[derive(Debug, Clone, Default)]
pub struct CallList {
    callees: HashMap<String, HashSet<String>>,
}

impl CallList {
    pub fn new() -> Self {
        CallList::default()
    }

    pub fn add(&mut self, package: &str, function: &str) {
        self.callees
            .entry(package.to_string())
            .or_default()
            .insert(function.to_string());
    }

    pub fn add_all(&mut self, package: &str, functions: &[&str]) {
        for function in functions {
            self.add(package, function);
        }
    }

    pub fn contains(&self, package: &str, function: &str) -> bool {
        self.callees
            .get(package)
            .is_some_and(|functions| functions.contains(function))
    }

    /// Returns the call expression when `node` is a call resolving to one
    /// of the listed qualified functions.
    pub fn contains_call<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<Node<'a>> {
        match resolve_call(node, ctx)? {
            ResolvedCall::Qualified { path, function } => {
                if self.contains(&path, &function) || self.contains(WILDCARD_PACKAGE, &function) {
                    return Some(node);
                }
                None
            }
            ResolvedCall::Bare { function } => ctx.with_imports(|imports| {
                imports
                    .dot_imports()
                    .any(|path| self.contains(path, &function))
                    .then_some(node)
            }),
        }
    }
}

/// Returns the call expression iff `node` is a call to one of `functions`
/// in the package imported from `package_path`. Aliased imports resolve
/// through the tracker; dot imports match bare calls.
pub fn match_call_by_package<'a>(
    node: Node<'a>,
    ctx: &Context<'a>,
    package_path: &str,
    functions: &[&str],
) -> Option<Node<'a>> {
    match resolve_call(node, ctx)? {
        ResolvedCall::Qualified { path, function } => {
            if path == package_path && functions.contains(&function.as_str()) {
                return Some(node);
            }
            None
        }
        ResolvedCall::Bare { function } => ctx.with_imports(|imports| {
            (imports.is_dot_imported(package_path) && functions.contains(&function.as_str()))
                .then_some(node)
        }),
    }
}

enum ResolvedCall {
    Qualified { path: String, function: String },
    Bare { function: String },
}

/// Resolves a call to its package qualification. A selector call resolves
/// the qualifier through the import tracker; a bare call is a candidate
/// for dot-imported packages.
fn resolve_call<'a>(node: Node<'a>, ctx: &Context<'a>) -> Option<ResolvedCall> {
    if node.kind() != "call_expression" {
        return None;
    }
    let function = node.child_by_field_name("function")?;

    match function.kind() {
        "selector_expression" => {
            let operand = function.child_by_field_name("operand")?;
            let field = function.child_by_field_name("field")?;
            if operand.kind() != "identifier" && operand.kind() != "package_identifier" {
                return None;
            }
            // A locally declared name shadows any package of the same name.
            if ctx.resolver().resolve(operand).is_some() {
                return None;
            }
            let local = ctx.node_text(operand);
            let path = ctx.with_imports(|imports| imports.resolve(local).map(str::to_string))?;
            Some(ResolvedCall::Qualified {
                path,
                function: ctx.node_text(field).to_string(),
            })
        }
        "identifier" => {
            if ctx.resolver().resolve(function).is_some() {
                return None;
            }
            Some(ResolvedCall::Bare {
                function: ctx.node_text(function).to_string(),
            })
        }
        _ => None,
    }
}
