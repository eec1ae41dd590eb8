//! Rule G204: subprocesses launched with non-constant arguments.

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{
    resolve, CallList, Config, Context, Resolution, Rule, RuleError, Score, Verdict,
};
use tree_sitter::Node;

/// Rule ID for subprocess launches.
pub const ID: &str = "G204";

/// Flags process-spawning calls whose arguments an attacker may control.
pub struct Subprocess {
    calls: CallList,
}

impl Subprocess {
    /// Builds the rule.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        let mut calls = CallList::new();
        calls.add("os/exec", "Command");
        calls.add("os/exec", "CommandContext");
        calls.add("syscall", "Exec");
        calls.add("os", "StartProcess");
        Self { calls }
    }
}

impl Rule for Subprocess {
    fn id(&self) -> &'static str {
        ID
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CallExpr]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        let Some((_, name)) = self.calls.contains_call_expr(node, ctx) else {
            return Ok(Verdict::pass());
        };
        let args = node
            .child_by_field_name("arguments")
            .map(ast::named_children)
            .unwrap_or_default();
        let skip = usize::from(name == "CommandContext");

        let analysis = ast::enclosing_function(node).and_then(|f| ctx.func_analysis(f).ok());
        for arg in args.into_iter().skip(skip) {
            if let Resolution::Known(_) = resolve::resolve(arg, ctx) {
                continue;
            }
            let tainted = analysis
                .as_ref()
                .and_then(|a| a.taint_of_node(arg.id()))
                .is_some_and(|fact| fact.tainted);
            let issue = if tainted {
                ctx.new_issue(
                    node,
                    ID,
                    "Subprocess launched with tainted input",
                    Score::High,
                    Score::High,
                )
            } else {
                ctx.new_issue(
                    node,
                    ID,
                    "Subprocess launched with variable",
                    Score::Medium,
                    Score::Medium,
                )
            };
            return Ok(Verdict::report(issue));
        }
        Ok(Verdict::pass())
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};
    use gosentry_core::Score;

    #[test]
    fn tainted_argument_is_high_severity() {
        let issues = scan(
            r#"package main

import (
    "os"
    "os/exec"
)

func run() {
    cmd := exec.Command("sh", "-c", os.Args[1])
    _ = cmd
}
"#,
        );
        let hits = with_rule(&issues, "G204");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Score::High);
    }

    #[test]
    fn unresolvable_argument_is_medium() {
        let issues = scan(
            r#"package main

import "os/exec"

func run(script string) {
    cmd := exec.Command("sh", "-c", script)
    _ = cmd
}
"#,
        );
        let hits = with_rule(&issues, "G204");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Score::Medium);
    }

    #[test]
    fn constant_command_is_quiet() {
        let issues = scan(
            r#"package main

import "os/exec"

const lister = "ls"

func run() {
    cmd := exec.Command(lister, "-l")
    _ = cmd
}
"#,
        );
        assert!(with_rule(&issues, "G204").is_empty());
    }
}
