//! Per-file analysis support shared by the visitor and the rules: the
//! import tracker, the comment map, the call matcher, and the local type
//! resolver that stands in for a full type checker.

pub mod calls;
pub mod comments;
mod context;
pub mod imports;
pub mod types;

pub use calls::{match_call_by_package, CallList};
pub use comments::CommentMap;
pub use context::Context;
pub use imports::ImportTracker;
pub use types::{GoType, IntKind, TypeResolver};

/// Trims surrounding quotes (interpreted, raw, or rune) off a Go literal.
pub fn unquote(text: &str) -> &str {
    let text = text.trim();
    let quoted = (text.starts_with('"') && text.ends_with('"'))
        || (text.starts_with('`') && text.ends_with('`'))
        || (text.starts_with('\'') && text.ends_with('\''));
    if quoted && text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    }
}
