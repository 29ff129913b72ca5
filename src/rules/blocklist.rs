use std::collections::HashMap;

use tree_sitter::Node;

use super::{Rule, RuleError};
use crate::analysis::{unquote, Context};
use crate::config::Config;
use crate::issue::{Confidence, Issue, MetaData, Severity};

/// Reports imports of packages that have no place in deterministic code.
struct BlocklistedImports {
    meta: MetaData,
    blocklisted: HashMap<&'static str, &'static str>,
}

impl Rule for BlocklistedImports {
    fn id(&self) -> &str {
        &self.meta.id
    }

    fn match_node<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        if node.kind() != "import_spec" {
            return Ok(None);
        }
        let Some(path_node) = find_path_literal(node) else {
            return Ok(None);
        };
        let path = unquote(ctx.node_text(path_node));
        let Some(description) = self.blocklisted.get(path) else {
            return Ok(None);
        };
        Ok(Some(Issue::new(
            ctx,
            node,
            self.id(),
            *description,
            self.meta.severity,
            self.meta.confidence,
        )))
    }
}

fn find_path_literal(spec: Node) -> Option<Node> {
    let mut cursor = spec.walk();
    let result = spec.children(&mut cursor).find(|child| {
        matches!(
            child.kind(),
            "interpreted_string_literal" | "raw_string_literal"
        )
    });
    result
}

/// Fails on imports of `unsafe`, `reflect`, `runtime` and the two `rand`
/// packages, all of which undermine determinism or memory safety.
pub fn new_blocklisted_imports(id: &str, _config: &Config) -> (Box<dyn Rule>, Vec<&'static str>) {
    let blocklisted = HashMap::from([
        ("unsafe", "Blocklisted import unsafe"),
        ("reflect", "Blocklisted import reflect"),
        ("runtime", "Blocklisted import runtime"),
        ("math/rand", "Blocklisted import math/rand"),
        ("crypto/rand", "Blocklisted import crypto/rand"),
    ]);
    let rule = BlocklistedImports {
        meta: MetaData {
            id: id.to_string(),
            severity: Severity::Medium,
            confidence: Confidence::High,
            what: String::new(),
        },
        blocklisted,
    };
    (Box::new(rule), vec!["import_spec"])
}
