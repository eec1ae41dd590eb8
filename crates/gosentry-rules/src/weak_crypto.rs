//! Rule G401: weak cryptographic primitives.

use gosentry_core::ast::NodeKind;
use gosentry_core::{CallList, Config, Context, Rule, RuleError, Score, Verdict};
use tree_sitter::Node;

/// Rule ID for weak cryptographic primitives.
pub const ID: &str = "G401";

/// Flags constructors of broken or legacy ciphers and digests.
pub struct WeakCrypto {
    calls: CallList,
}

impl WeakCrypto {
    /// Builds the rule.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        let mut calls = CallList::new();
        calls.add("crypto/md5", "New");
        calls.add("crypto/md5", "Sum");
        calls.add("crypto/sha1", "New");
        calls.add("crypto/sha1", "Sum");
        calls.add("crypto/des", "NewCipher");
        calls.add("crypto/des", "NewTripleDESCipher");
        calls.add("crypto/rc4", "NewCipher");
        Self { calls }
    }
}

impl Rule for WeakCrypto {
    fn id(&self) -> &'static str {
        ID
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CallExpr]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        match self.calls.contains_call_expr(node, ctx) {
            Some((pkg, name)) => Ok(Verdict::report(ctx.new_issue(
                node,
                ID,
                format!("Use of weak cryptographic primitive {pkg}.{name}"),
                Score::Medium,
                Score::High,
            ))),
            None => Ok(Verdict::pass()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};

    #[test]
    fn md5_and_des_fire() {
        let issues = scan(
            r#"package main

import (
    "crypto/des"
    "crypto/md5"
)

func digest(data []byte) {
    h := md5.New()
    c, _ := des.NewCipher(data)
    _ = h
    _ = c
}
"#,
        );
        assert_eq!(with_rule(&issues, "G401").len(), 2);
    }

    #[test]
    fn sha256_is_quiet() {
        let issues = scan(
            r#"package main

import "crypto/sha256"

func digest() {
    h := sha256.New()
    _ = h
}
"#,
        );
        assert!(with_rule(&issues, "G401").is_empty());
    }
}
