use std::collections::HashMap;

use tree_sitter::Node;

use super::{Rule, RuleError};
use crate::analysis::{CallList, Context};
use crate::config::Config;
use crate::issue::{Confidence, Issue, Location, MetaData, Severity};

/// Cross-node state: for each variable fed by `strconv.ParseUint`, the
/// assignment's location and the literal `bitSize` argument.
#[derive(Default)]
struct ParseUintSites {
    by_decl: HashMap<usize, RecordedParse>,
}

struct RecordedParse {
    location: Location,
    bit_size: Option<String>,
}

/// Flags signed conversions of `strconv.ParseUint` results whose parsed
/// bitSize exceeds what the destination can represent.
struct StrconvBitSizeOverflow {
    meta: MetaData,
    calls: CallList,
}

impl Rule for StrconvBitSizeOverflow {
    fn id(&self) -> &str {
        &self.meta.id
    }

    fn match_node<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        match node.kind() {
            "short_var_declaration" | "assignment_statement" => {
                self.record_parse_uint(node, ctx)?;
                Ok(None)
            }
            "call_expression" => self.check_conversion(node, ctx),
            _ => Ok(None),
        }
    }
}

impl StrconvBitSizeOverflow {
    fn record_parse_uint<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Result<(), RuleError> {
        let Some(right) = node.child_by_field_name("right") else {
            return Ok(());
        };
        let mut cursor = right.walk();
        for expr in right.named_children(&mut cursor) {
            if self.calls.contains_call(expr, ctx).is_none() {
                continue;
            }

            let Some(left) = node.child_by_field_name("left") else {
                continue;
            };
            let mut left_cursor = left.walk();
            let Some(lhs) = left.named_children(&mut left_cursor).next() else {
                continue;
            };
            if lhs.kind() != "identifier" || ctx.node_text(lhs) == "_" {
                continue;
            }
            let Some(decl) = ctx.resolver().resolve(lhs) else {
                continue;
            };

            let bit_size = third_argument(expr).and_then(|arg| {
                arg.kind()
                    .ends_with("_literal")
                    .then(|| ctx.node_text(arg).to_string())
            });
            let record = RecordedParse {
                location: Location::of(ctx, node),
                bit_size,
            };

            self.with_sites(ctx, |sites| {
                sites.by_decl.insert(decl.id(), record);
            })?;
        }
        Ok(())
    }

    fn check_conversion<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        let Some(function) = node.child_by_field_name("function") else {
            return Ok(None);
        };
        if function.kind() != "identifier" {
            return Ok(None);
        }
        let dest = ctx.node_text(function);
        if !matches!(dest, "int" | "int16" | "int32" | "int64") {
            return Ok(None);
        }

        let Some(arg) = first_argument(node) else {
            return Ok(None);
        };
        if arg.kind() != "identifier" {
            return Ok(None);
        }
        let Some(decl) = ctx.resolver().resolve(arg) else {
            return Ok(None);
        };

        let recorded = self.with_sites(ctx, |sites| {
            sites
                .by_decl
                .get(&decl.id())
                .map(|r| (r.location.clone(), r.bit_size.clone()))
        })?;
        let Some((location, bit_size)) = recorded else {
            return Ok(None);
        };
        let Some(bit_size) = bit_size else {
            return Ok(None);
        };

        let parsed: i64 = match bit_size.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                let what = format!("Invalid bitSize {bit_size:?} parse failure: {err}");
                return Ok(Some(self.issue(ctx, location, what)));
            }
        };

        let overflows = match dest {
            "int16" => parsed >= 16,
            "int32" => parsed >= 32,
            "int64" => parsed >= 64,
            "int" => parsed == 32 || parsed >= 64,
            _ => false,
        };
        if !overflows {
            return Ok(None);
        }

        let what = format!("Overflow in bitSize of {parsed} for {dest:?}");
        Ok(Some(self.issue(ctx, location, what)))
    }

    fn with_sites<R>(
        &self,
        ctx: &Context<'_>,
        f: impl FnOnce(&mut ParseUintSites) -> R,
    ) -> Result<R, RuleError> {
        ctx.with_passed_value(self.id(), f)
            .ok_or_else(|| RuleError::PassedValueType {
                rule: self.id().to_string(),
            })
    }

    fn issue(&self, ctx: &Context<'_>, location: Location, what: String) -> Issue {
        Issue::at_location(
            ctx,
            location,
            self.id(),
            what,
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

fn third_argument<'a>(call: Node<'a>) -> Option<Node<'a>> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let third = args.named_children(&mut cursor).nth(2);
    third
}

pub fn new_strconv_bitsize_overflow(
    id: &str,
    _config: &Config,
) -> (Box<dyn Rule>, Vec<&'static str>) {
    let mut calls = CallList::new();
    calls.add("strconv", "ParseUint");

    let rule = StrconvBitSizeOverflow {
        meta: MetaData {
            id: id.to_string(),
            severity: Severity::High,
            confidence: Confidence::Medium,
            what: "Overflow due to wrong bitsize in strconv.ParseUint yet cast from uint64 to int*"
                .to_string(),
        },
        calls,
    };
    (
        Box::new(rule),
        vec![
            "short_var_declaration",
            "assignment_statement",
            "call_expression",
        ],
    )
}
