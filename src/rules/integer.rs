use tree_sitter::Node;

use super::{Rule, RuleError};
use crate::analysis::{Context, GoType, IntKind};
use crate::config::Config;
use crate::issue::{Confidence, Issue, MetaData, Severity};

/// Host word size, fixed at compile time like Go's `int`.
#[cfg(target_pointer_width = "32")]
pub const IS_32BIT: bool = true;
#[cfg(not(target_pointer_width = "32"))]
pub const IS_32BIT: bool = false;

/// Catches integer conversions `intX(y)` / `uintX(y)` that can truncate
/// or change sign. Generated protobuf files are full of checked casts and
/// are skipped wholesale.
struct IntegerCast {
    meta: MetaData,
}

impl Rule for IntegerCast {
    fn id(&self) -> &str {
        &self.meta.id
    }

    fn match_node<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        if ctx.file_path().ends_with(".pb.go") {
            return Ok(None);
        }
        if node.kind() != "call_expression" {
            return Ok(None);
        }
        let Some(function) = node.child_by_field_name("function") else {
            return Ok(None);
        };
        if function.kind() != "identifier" {
            return Ok(None);
        }
        let name = ctx.node_text(function);
        if !name.starts_with("int") && !name.starts_with("uint") {
            return Ok(None);
        }
        let Some(dest) = IntKind::from_name(name) else {
            return Ok(None);
        };

        let Some(arg) = first_argument(node) else {
            return Ok(None);
        };

        // Literal operands have a value known to fit or not at a glance.
        if ctx.node_text(arg).trim().parse::<i64>().is_ok() {
            return Ok(None);
        }

        // len() yields a non-negative machine int; only destinations too
        // narrow to hold one can overflow.
        if is_len_call(arg, ctx) {
            if len_can_overflow(dest, IS_32BIT) {
                return Ok(Some(self.issue(ctx, node)));
            }
            return Ok(None);
        }

        let resolver = ctx.resolver();
        let src = resolver.underlying(resolver.type_of(arg));
        match src {
            GoType::Int(src_kind) => {
                if conversion_can_overflow(src_kind, dest, IS_32BIT) {
                    Ok(Some(self.issue(ctx, node)))
                } else {
                    Ok(None)
                }
            }
            // Unknown operand kinds default to flagging.
            _ => Ok(Some(self.issue(ctx, node))),
        }
    }
}

impl IntegerCast {
    fn issue(&self, ctx: &Context<'_>, node: Node<'_>) -> Issue {
        Issue::new(
            ctx,
            node,
            self.id(),
            self.meta.what.clone(),
            self.meta.severity,
            self.meta.confidence,
        )
    }
}

fn first_argument<'a>(call: Node<'a>) -> Option<Node<'a>> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args.named_children(&mut cursor).next();
    first
}

fn is_len_call(node: Node, ctx: &Context<'_>) -> bool {
    if node.kind() != "call_expression" {
        return false;
    }
    node.child_by_field_name("function")
        .is_some_and(|f| f.kind() == "identifier" && ctx.node_text(f) == "len")
}

/// Whether converting the result of `len()` to `dest` can overflow. The
/// value is a machine int in `[0, maxInt]`, so any destination with
/// fewer value bits than a machine int can truncate it.
pub fn len_can_overflow(dest: IntKind, is_32bit: bool) -> bool {
    let len_value_bits = if is_32bit { 31 } else { 63 };
    dest.width(is_32bit) <= len_value_bits
}

/// Whether a conversion from `src` to `dest` can overflow on the given
/// host. Identical kinds are safe; mixed signedness always flags.
pub fn conversion_can_overflow(src: IntKind, dest: IntKind, is_32bit: bool) -> bool {
    if src == dest {
        return false;
    }
    if src.is_signed() != dest.is_signed() {
        return true;
    }
    src.width(is_32bit) > dest.width(is_32bit)
}

pub fn new_integer_cast(id: &str, _config: &Config) -> (Box<dyn Rule>, Vec<&'static str>) {
    let rule = IntegerCast {
        meta: MetaData {
            id: id.to_string(),
            severity: Severity::High,
            confidence: Confidence::Medium,
            what: "Potential integer overflow by integer type conversion".to_string(),
        },
    };
    (Box::new(rule), vec!["call_expression"])
}
