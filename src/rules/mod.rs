//! The rule catalogue. Each rule is a small AST- and type-directed
//! pattern matcher registered for the node kinds it inspects.

mod blocklist;
mod errors;
mod integer;
mod map_ranging;
mod strconv_bitsize;
mod time_now;
mod weak_crypto;

use std::collections::HashMap;

use tree_sitter::Node;

use crate::analysis::Context;
use crate::config::Config;
use crate::issue::Issue;

pub use blocklist::new_blocklisted_imports;
pub use errors::new_error_not_propagated;
pub use integer::{conversion_can_overflow, len_can_overflow, new_integer_cast, IS_32BIT};
pub use map_ranging::new_map_ranging;
pub use strconv_bitsize::new_strconv_bitsize_overflow;
pub use time_now::new_time_now_refusal;
pub use weak_crypto::new_weak_crypto;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("unable to determine the type of {0}")]
    UnknownType(String),

    #[error("passed values for {rule} hold an unexpected type")]
    PassedValueType { rule: String },
}

/// A registered check. Matchers are side-effect-free except through the
/// context's passed-values scratch space, and must never abort the walk.
pub trait Rule {
    fn id(&self) -> &str;

    /// Inspects `node`, returning an issue on a positive match. Errors
    /// are logged by the walker and discarded.
    fn match_node<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError>;
}

/// Builds a rule from its assigned ID and the run configuration, naming
/// the node kinds it wants to see.
pub type RuleBuilder = fn(&str, &Config) -> (Box<dyn Rule>, Vec<&'static str>);

/// The full catalogue, keyed by rule ID.
pub fn generate_rule_list() -> HashMap<String, RuleBuilder> {
    let mut rules: HashMap<String, RuleBuilder> = HashMap::new();
    rules.insert("G401".to_string(), new_weak_crypto);
    rules.insert("G501".to_string(), new_blocklisted_imports);
    rules.insert("G701".to_string(), new_integer_cast);
    rules.insert("G702".to_string(), new_strconv_bitsize_overflow);
    rules.insert("G703".to_string(), new_map_ranging);
    rules.insert("G704".to_string(), new_time_now_refusal);
    rules.insert("G705".to_string(), new_error_not_propagated);
    rules
}
