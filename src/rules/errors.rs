use tree_sitter::Node;

use super::{Rule, RuleError};
use crate::analysis::{Context, GoType};
use crate::config::Config;
use crate::issue::{Confidence, Issue, MetaData, Severity};

/// Flags assignments that receive an `error` result into the blank
/// identifier, silently discarding the failure.
struct ErrorNotPropagated {
    meta: MetaData,
}

impl Rule for ErrorNotPropagated {
    fn id(&self) -> &str {
        &self.meta.id
    }

    fn match_node<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        if !matches!(node.kind(), "short_var_declaration" | "assignment_statement") {
            return Ok(None);
        }
        let Some(right) = node.child_by_field_name("right") else {
            return Ok(None);
        };
        let Some(left) = node.child_by_field_name("left") else {
            return Ok(None);
        };
        let lhs: Vec<Node> = {
            let mut cursor = left.walk();
            left.named_children(&mut cursor).collect()
        };

        let resolver = ctx.resolver();
        let mut cursor = right.walk();
        for expr in right.named_children(&mut cursor) {
            if expr.kind() != "call_expression" {
                continue;
            }
            let Some(results) = resolver.call_results(expr) else {
                continue;
            };
            let Some(pos) = results.iter().position(|t| *t == GoType::Error) else {
                continue;
            };
            if pos >= lhs.len() {
                continue;
            }
            let receiver = lhs[pos];
            if matches!(receiver.kind(), "identifier" | "blank_identifier")
                && ctx.node_text(receiver) == "_"
            {
                return Ok(Some(Issue::new(
                    ctx,
                    node,
                    self.id(),
                    self.meta.what.clone(),
                    self.meta.severity,
                    self.meta.confidence,
                )));
            }
        }
        Ok(None)
    }
}

pub fn new_error_not_propagated(id: &str, _config: &Config) -> (Box<dyn Rule>, Vec<&'static str>) {
    let rule = ErrorNotPropagated {
        meta: MetaData {
            id: id.to_string(),
            severity: Severity::Low,
            confidence: Confidence::High,
            what: "Returned error is not propagated up the stack.".to_string(),
        },
    };
    (
        Box::new(rule),
        vec!["short_var_declaration", "assignment_statement"],
    )
}
