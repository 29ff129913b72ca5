use std::collections::BTreeMap;

use tree_sitter::Node;

use super::{Rule, RuleError};
use crate::analysis::{match_call_by_package, Context};
use crate::config::Config;
use crate::issue::{Confidence, Issue, MetaData, Severity};

/// Flags constructions of broken or weak cryptographic primitives. The
/// packages are kept in a sorted map so the match order is stable.
struct WeakCrypto {
    meta: MetaData,
    blocklist: BTreeMap<&'static str, Vec<&'static str>>,
}

impl Rule for WeakCrypto {
    fn id(&self) -> &str {
        &self.meta.id
    }

    fn match_node<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Result<Option<Issue>, RuleError> {
        for (package, functions) in &self.blocklist {
            if match_call_by_package(node, ctx, package, functions).is_some() {
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

/// Detects uses of DES, 3DES, MD5, SHA1 and RC4.
pub fn new_weak_crypto(id: &str, _config: &Config) -> (Box<dyn Rule>, Vec<&'static str>) {
    let blocklist = BTreeMap::from([
        ("crypto/des", vec!["NewCipher", "NewTripleDESCipher"]),
        ("crypto/md5", vec!["New", "Sum"]),
        ("crypto/rc4", vec!["NewCipher"]),
        ("crypto/sha1", vec!["New", "Sum"]),
    ]);
    let rule = WeakCrypto {
        meta: MetaData {
            id: id.to_string(),
            severity: Severity::Medium,
            confidence: Confidence::High,
            what: "Use of weak cryptographic primitive".to_string(),
        },
        blocklist,
    };
    (Box::new(rule), vec!["call_expression"])
}

#[cfg(test)]
mod tests {
    use super::super::testsupport::check_source;
    use super::*;

    const RULES: &[(&str, super::super::RuleBuilder)] = &[("G401", new_weak_crypto)];

    #[test]
    fn flags_md5_new() {
        let source = "package main\n\nimport \"crypto/md5\"\n\nfunc f() {\n\tmd5.New()\n}\n";
        let (issues, _) = check_source(source, RULES);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].what, "Use of weak cryptographic primitive");
        assert_eq!(issues[0].cwe.as_ref().unwrap().id, "327");
    }

    #[test]
    fn flags_des_and_rc4() {
        let source = "package main\n\nimport (\n\t\"crypto/des\"\n\t\"crypto/rc4\"\n)\n\nfunc f(key []byte) {\n\tdes.NewTripleDESCipher(key)\n\trc4.NewCipher(key)\n}\n";
        let (issues, _) = check_source(source, RULES);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn flags_aliased_sha1() {
        let source = "package main\n\nimport digest \"crypto/sha1\"\n\nfunc f() {\n\tdigest.New()\n}\n";
        let (issues, _) = check_source(source, RULES);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn sha256_is_fine() {
        let source = "package main\n\nimport \"crypto/sha256\"\n\nfunc f() {\n\tsha256.New()\n}\n";
        let (issues, _) = check_source(source, RULES);
        assert!(issues.is_empty());
    }

    #[test]
    fn unrelated_new_does_not_match() {
        let source = "package main\n\nimport \"errors\"\n\nfunc f() error {\n\treturn errors.New(\"x\")\n}\n";
        let (issues, _) = check_source(source, RULES);
        assert!(issues.is_empty());
    }
}
