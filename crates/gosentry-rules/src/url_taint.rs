//! Rule G107: HTTP requests with non-constant URLs.
//!
//! A request whose URL cannot be proved constant may be steered by an
//! attacker toward internal services. Confidence rises when the resolver's
//! taint hints name a recognized external source.

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{
    resolve, CallList, Config, Context, Resolution, Rule, RuleError, Score, Verdict,
};
use tree_sitter::Node;

/// Rule ID for variable request URLs.
pub const ID: &str = "G107";

/// Flags `http.Get`-family calls with unresolvable URL arguments.
pub struct UrlTaint {
    calls: CallList,
}

impl UrlTaint {
    /// Builds the rule.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        let mut calls = CallList::new();
        for name in ["Get", "Head", "Post", "PostForm"] {
            calls.add("net/http", name);
        }
        Self { calls }
    }
}

impl Rule for UrlTaint {
    fn id(&self) -> &'static str {
        ID
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CallExpr]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        if self.calls.contains_call_expr(node, ctx).is_none() {
            return Ok(Verdict::pass());
        }
        let args = node
            .child_by_field_name("arguments")
            .map(ast::named_children)
            .unwrap_or_default();
        let Some(url) = args.first() else {
            return Ok(Verdict::pass());
        };
        match resolve::resolve(*url, ctx) {
            Resolution::Known(_) => Ok(Verdict::pass()),
            Resolution::Unknown(hints) => {
                let confidence = if hints.is_empty() {
                    Score::Medium
                } else {
                    Score::High
                };
                Ok(Verdict::report(ctx.new_issue(
                    node,
                    ID,
                    "Potential HTTP request made with variable url",
                    Score::Medium,
                    confidence,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};
    use gosentry_core::Score;

    #[test]
    fn variable_url_fires() {
        let issues = scan(
            r#"package main

import (
    "net/http"
    "os"
)

func fetch() {
    resp, _ := http.Get("https://api.internal/" + os.Args[1])
    _ = resp
}
"#,
        );
        let hits = with_rule(&issues, "G107");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].confidence, Score::High);
    }

    #[test]
    fn constant_url_is_quiet() {
        let issues = scan(
            r#"package main

import "net/http"

const endpoint = "https://api.internal/health"

func fetch() {
    resp, _ := http.Get(endpoint)
    _ = resp
}
"#,
        );
        assert!(with_rule(&issues, "G107").is_empty());
    }
}
