use tree_sitter::Node;

use super::{Rule, RuleError};
use crate::analysis::{Context, GoType};
use crate::config::Config;
use crate::issue::{Confidence, Issue, MetaData, Severity};

/// Enforces that maps are only ranged over in order-insensitive ways:
/// key extraction into a slice, the map-clear idiom, or a map copy.
/// Anything else makes iteration order observable and is reported.
struct MapRanging {
    meta: MetaData,
}

impl Rule for MapRanging {
    fn id(&self) -> &str {
        &self.meta.id
    }

    fn match_node<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        if node.kind() != "for_statement" {
            return Ok(None);
        }
        let Some(range_clause) = named_child_of_kind(node, "range_clause") else {
            return Ok(None);
        };
        let Some(ranged) = range_clause.child_by_field_name("right") else {
            return Ok(None);
        };

        let resolver = ctx.resolver();
        let ranged_type = resolver.underlying(resolver.type_of(ranged));
        if !matches!(ranged_type, GoType::Map(_, _)) {
            return Ok(None);
        }

        let (key, value) = range_bindings(range_clause);

        let Some(body) = node.child_by_field_name("body") else {
            return Ok(None);
        };
        let statements: Vec<Node> = {
            let mut cursor = body.walk();
            body.named_children(&mut cursor)
                .filter(|child| child.kind() != "comment")
                .collect()
        };
        if statements.len() != 1 {
            return Ok(Some(self.issue(
                ctx,
                node,
                format!(
                    "expected exactly 1 statement (either append, delete, or copying to another map) in a range with a map, got {}",
                    statements.len()
                ),
            )));
        }
        let stmt = statements[0];

        let Some(key) = key else {
            return Ok(Some(self.issue(
                ctx,
                node,
                "the key in the range statement should not be _: want: for key := range m",
            )));
        };

        if matches!(stmt.kind(), "assignment_statement") {
            if self.is_map_copy(ctx, stmt, key, value, ranged)? {
                return Ok(None);
            }
        }
        if value.is_some() {
            return Ok(Some(self.issue(
                ctx,
                node,
                "the value in the range statement should be _ unless copying a map: want: for key := range m",
            )));
        }

        match stmt.kind() {
            "call_expression" => {
                let name = stmt
                    .child_by_field_name("function")
                    .filter(|f| f.kind() == "identifier")
                    .map(|f| ctx.node_text(f))
                    .unwrap_or("");
                if name == "delete" {
                    // The fast map-clear idiom.
                    return Ok(None);
                }
                Ok(Some(self.issue(
                    ctx,
                    node,
                    format!(
                        "expected either an append, delete, or copy to another map in a range with a map, got: {name:?}"
                    ),
                )))
            }
            "assignment_statement" | "short_var_declaration" => {
                self.check_key_extraction(ctx, node, stmt)
            }
            kind => Ok(Some(self.issue(
                ctx,
                node,
                format!(
                    "got {kind}; expected exactly 1 statement (either append or delete) in a range with a map"
                ),
            ))),
        }
    }
}

impl MapRanging {
    /// The `keys = append(keys, k)` idiom: the only permitted assignment
    /// besides a map copy is appending range keys to a slice.
    fn check_key_extraction<'a>(
        &self,
        ctx: &Context<'a>,
        range_node: Node<'a>,
        stmt: Node<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        let lhs = first_of_field(stmt, "left");
        let Some(lhs) = lhs.filter(|n| n.kind() == "identifier") else {
            return Ok(Some(self.issue(
                ctx,
                range_node,
                "expected either an append, delete, or copy to another map in a range with a map",
            )));
        };
        if ctx.node_text(lhs) == "_" {
            return Ok(Some(self.issue(
                ctx,
                range_node,
                "expected an array/slice being used to retrieve keys, got _",
            )));
        }

        let resolver = ctx.resolver();
        let lhs_type = resolver.underlying(resolver.type_of(lhs));
        match lhs_type {
            GoType::Slice(_) | GoType::Array(_) => {}
            GoType::Unknown => {
                return Err(RuleError::UnknownType(ctx.node_text(lhs).to_string()));
            }
            other => {
                return Ok(Some(self.issue(
                    ctx,
                    range_node,
                    format!("expected an array/slice being used to retrieve keys, got {other}"),
                )));
            }
        }

        let Some(rhs) = first_of_field(stmt, "right") else {
            return Ok(None);
        };
        if rhs.kind() != "call_expression" {
            return Ok(Some(self.issue(
                ctx,
                range_node,
                format!("expected only an append(), got: {}", ctx.node_text(rhs)),
            )));
        }
        let name = rhs
            .child_by_field_name("function")
            .filter(|f| f.kind() == "identifier")
            .map(|f| ctx.node_text(f))
            .unwrap_or("");
        if name != "append" {
            return Ok(Some(self.issue(
                ctx,
                range_node,
                format!("expected only an append(), got: {name:?}"),
            )));
        }
        Ok(None)
    }

    /// A map copy writes the ranged key (and, in the two-variable form,
    /// the ranged value) into another map:
    ///   for k, v := range m { dst[k] = v }
    ///   for k := range m    { dst[k] = m[k] }
    fn is_map_copy<'a>(
        &self,
        ctx: &Context<'a>,
        stmt: Node<'a>,
        range_key: Node<'a>,
        range_value: Option<Node<'a>>,
        ranged: Node<'a>,
    ) -> Result<bool, RuleError> {
        let Some(left) = stmt.child_by_field_name("left") else {
            return Ok(false);
        };
        let lhs_list: Vec<Node> = {
            let mut cursor = left.walk();
            left.named_children(&mut cursor).collect()
        };
        let &[lhs] = lhs_list.as_slice() else {
            return Ok(false);
        };
        if lhs.kind() != "index_expression" {
            return Ok(false);
        }

        let resolver = ctx.resolver();
        let Some(dst) = lhs.child_by_field_name("operand") else {
            return Ok(false);
        };
        if !matches!(
            resolver.underlying(resolver.type_of(dst)),
            GoType::Map(_, _)
        ) {
            return Ok(false);
        }

        // The write must be keyed by the ranged key.
        let Some(write_key) = lhs
            .child_by_field_name("index")
            .filter(|n| n.kind() == "identifier")
        else {
            return Ok(false);
        };
        if range_key.kind() != "identifier" || !resolver.same_object(write_key, range_key) {
            return Ok(false);
        }

        let Some(rhs) = first_of_field(stmt, "right") else {
            return Ok(false);
        };

        if let Some(range_value) = range_value {
            // for k, v := range m { dst[k] = v }
            if rhs.kind() != "identifier" || range_value.kind() != "identifier" {
                return Ok(false);
            }
            return Ok(resolver.same_object(rhs, range_value));
        }

        // for k := range m { dst[k] = m[k] }
        if rhs.kind() != "index_expression" {
            return Ok(false);
        }
        let Some(read_key) = rhs
            .child_by_field_name("index")
            .filter(|n| n.kind() == "identifier")
        else {
            return Ok(false);
        };
        if !resolver.same_object(read_key, range_key) {
            return Ok(false);
        }
        let Some(src) = rhs.child_by_field_name("operand") else {
            return Ok(false);
        };
        Ok(ctx.node_text(src).trim() == ctx.node_text(ranged).trim())
    }

    fn issue(&self, ctx: &Context<'_>, node: Node<'_>, what: impl Into<String>) -> Issue {
        Issue::new(
            ctx,
            node,
            self.id(),
            what,
            self.meta.severity,
            self.meta.confidence,
        )
    }
}

/// The key and value bindings of a range clause; a blank key reads as
/// absent.
fn range_bindings(clause: Node) -> (Option<Node>, Option<Node>) {
    let Some(left) = clause.child_by_field_name("left") else {
        return (None, None);
    };
    let mut cursor = left.walk();
    let bindings: Vec<Node> = left.named_children(&mut cursor).collect();
    let key = bindings.first().copied();
    let value = bindings.get(1).copied();
    (key, value)
}

fn named_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn first_of_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    let list = node.child_by_field_name(field)?;
    let mut cursor = list.walk();
    let first = list.named_children(&mut cursor).next();
    first
}

pub fn new_map_ranging(id: &str, _config: &Config) -> (Box<dyn Rule>, Vec<&'static str>) {
    let rule = MapRanging {
        meta: MetaData {
            id: id.to_string(),
            severity: Severity::High,
            confidence: Confidence::Medium,
            what: "Non-determinism from ranging over maps".to_string(),
        },
    };
    (Box::new(rule), vec!["for_statement"])
}
