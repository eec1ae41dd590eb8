//! Rule G404: non-cryptographic random sources.
//!
//! Whole-package matching: any call into `math/rand` counts, whichever
//! function it names.

use gosentry_core::ast::NodeKind;
use gosentry_core::{CallList, Config, Context, Rule, RuleError, Score, Verdict};
use tree_sitter::Node;

/// Rule ID for weak randomness.
pub const ID: &str = "G404";

/// Flags any use of the non-cryptographic random generator.
pub struct WeakRandom {
    calls: CallList,
}

impl WeakRandom {
    /// Builds the rule.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        let mut calls = CallList::new();
        calls.add_all("math/rand");
        calls.add_all("math/rand/v2");
        Self { calls }
    }
}

impl Rule for WeakRandom {
    fn id(&self) -> &'static str {
        ID
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CallExpr]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        match self.calls.contains_pkg_call_expr(node, ctx) {
            Some(_) => Ok(Verdict::report(ctx.new_issue(
                node,
                ID,
                "Use of weak random number generator (math/rand instead of crypto/rand)",
                Score::High,
                Score::Medium,
            ))),
            None => Ok(Verdict::pass()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};

    #[test]
    fn any_math_rand_call_fires() {
        let issues = scan(
            r#"package main

import "math/rand"

func token() int {
    return rand.Intn(1000)
}
"#,
        );
        assert_eq!(with_rule(&issues, "G404").len(), 1);
    }

    #[test]
    fn crypto_rand_is_quiet() {
        let issues = scan(
            r#"package main

import "crypto/rand"

func token() []byte {
    buf := make([]byte, 16)
    rand.Read(buf)
    return buf
}
"#,
        );
        assert!(with_rule(&issues, "G404").is_empty());
    }
}
