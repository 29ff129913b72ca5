use tree_sitter::Node;

use super::{Rule, RuleError};
use crate::analysis::Context;
use crate::config::Config;
use crate::issue::{Confidence, Issue, MetaData, Severity};

/// Refuses `time.Now()`: wall-clock reads differ between nodes and have
/// caused consensus failures, so block time must be used instead.
struct TimeNowRefusal {
    meta: MetaData,
}

impl Rule for TimeNowRefusal {
    fn id(&self) -> &str {
        &self.meta.id
    }

    fn match_node<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        if node.kind() != "call_expression" {
            return Ok(None);
        }
        let Some(function) = node.child_by_field_name("function") else {
            return Ok(None);
        };
        if function.kind() != "selector_expression" {
            return Ok(None);
        }
        let Some(field) = function.child_by_field_name("field") else {
            return Ok(None);
        };
        if ctx.node_text(field) != "Now" {
            return Ok(None);
        }
        let Some(operand) = function.child_by_field_name("operand") else {
            return Ok(None);
        };

        let receiver_is_time = match operand.kind() {
            "identifier" | "package_identifier" => {
                let name = ctx.node_text(operand);
                name == "time"
                    || ctx.with_imports(|imports| imports.resolve(name) == Some("time"))
            }
            "selector_expression" => operand
                .child_by_field_name("field")
                .map(|inner| ctx.node_text(inner) == "time")
                .unwrap_or(false),
            _ => false,
        };
        if !receiver_is_time {
            return Ok(None);
        }

        Ok(Some(Issue::new(
            ctx,
            node,
            self.id(),
            self.meta.what.clone(),
            self.meta.severity,
            self.meta.confidence,
        )))
    }
}

pub fn new_time_now_refusal(id: &str, _config: &Config) -> (Box<dyn Rule>, Vec<&'static str>) {
    let rule = TimeNowRefusal {
        meta: MetaData {
            id: id.to_string(),
            severity: Severity::High,
            confidence: Confidence::High,
            what: "Non-determinism from using non-consensus aware time.Now() can cause a chain halt"
                .to_string(),
        },
    };
    (Box::new(rule), vec!["call_expression"])
}
