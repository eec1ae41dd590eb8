//! Rule G304: file access through taint input.
//!
//! Fires only when the path argument provably derives from a recognized
//! external source; paths cleaned through the sanitizer set stay quiet.

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{
    resolve, CallList, Config, Context, Resolution, Rule, RuleError, Score, Verdict,
};
use tree_sitter::Node;

/// Rule ID for taint-driven file access.
pub const ID: &str = "G304";

/// Flags file-opening calls with attacker-reachable path arguments.
pub struct FileInclusion {
    calls: CallList,
}

impl FileInclusion {
    /// Builds the rule.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        let mut calls = CallList::new();
        for name in ["Open", "OpenFile", "Create", "ReadFile", "WriteFile"] {
            calls.add("os", name);
        }
        calls.add("io/ioutil", "ReadFile");
        calls.add("io/ioutil", "WriteFile");
        Self { calls }
    }
}

impl Rule for FileInclusion {
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
        let Some(path) = node
            .child_by_field_name("arguments")
            .map(ast::named_children)
            .and_then(|args| args.first().copied())
        else {
            return Ok(Verdict::pass());
        };
        let hints = match resolve::resolve(path, ctx) {
            Resolution::Known(_) => return Ok(Verdict::pass()),
            Resolution::Unknown(hints) => hints,
        };
        let tainted = ast::enclosing_function(node)
            .and_then(|f| ctx.func_analysis(f).ok())
            .and_then(|a| a.taint_of_node(path.id()).cloned())
            .is_some_and(|fact| fact.tainted);
        if tainted || !hints.is_empty() {
            return Ok(Verdict::report(ctx.new_issue(
                node,
                ID,
                "Potential file inclusion via variable",
                Score::Medium,
                Score::High,
            )));
        }
        Ok(Verdict::pass())
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};

    #[test]
    fn tainted_path_fires() {
        let issues = scan(
            r#"package main

import "os"

func read() {
    data, _ := os.ReadFile(os.Args[1])
    _ = data
}
"#,
        );
        assert_eq!(with_rule(&issues, "G304").len(), 1);
    }

    #[test]
    fn cleaned_path_is_quiet() {
        let issues = scan(
            r#"package main

import (
    "os"
    "path/filepath"
)

func read() {
    clean := filepath.Clean(os.Args[1])
    data, _ := os.ReadFile(clean)
    _ = data
}
"#,
        );
        assert!(with_rule(&issues, "G304").is_empty());
    }

    #[test]
    fn untracked_variable_is_quiet() {
        let issues = scan(
            r#"package main

import "os"

func read(path string) {
    data, _ := os.ReadFile(path)
    _ = data
}
"#,
        );
        assert!(with_rule(&issues, "G304").is_empty());
    }
}
