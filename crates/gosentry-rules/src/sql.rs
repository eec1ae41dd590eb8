//! Rules G201 and G202: SQL injection via string building.
//!
//! Both rules sink on the query-taking methods of database handles. G201
//! flags queries assembled with format strings, G202 queries assembled with
//! string concatenation. Parameter binding (constant query text with
//! placeholder arguments) is the negative case for both.

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{resolve, CallList, Config, Context, Rule, RuleError, Score, Verdict};
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

/// Rule ID for format-string SQL.
pub const FORMAT_ID: &str = "G201";
/// Rule ID for concatenated SQL.
pub const CONCAT_ID: &str = "G202";

static SQL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new("(?i)(SELECT|DELETE|INSERT|UPDATE|INTO|FROM|WHERE)\\b").expect("sql pattern")
});

fn query_sinks() -> CallList {
    let mut calls = CallList::new();
    for receiver in ["database/sql.DB", "database/sql.Tx", "database/sql.Conn"] {
        for name in [
            "Query",
            "QueryRow",
            "QueryContext",
            "QueryRowContext",
            "Exec",
            "ExecContext",
            "Prepare",
            "PrepareContext",
        ] {
            calls.add(receiver, name);
        }
    }
    calls
}

/// The query argument comes after the context for `*Context` variants.
fn query_arg<'t>(call: Node<'t>, sink_name: &str) -> Option<Node<'t>> {
    let args = call
        .child_by_field_name("arguments")
        .map(ast::named_children)?;
    let index = usize::from(sink_name.ends_with("Context"));
    args.get(index).copied()
}

/// Whether the enclosing function's taint facts mark this expression as
/// attacker-reachable.
fn is_tainted(node: Node<'_>, ctx: &Context<'_>) -> bool {
    let Some(func) = ast::enclosing_function(node) else {
        return false;
    };
    let Ok(analysis) = ctx.func_analysis(func) else {
        return false;
    };
    analysis
        .taint_of_node(node.id())
        .is_some_and(|fact| fact.tainted)
}

/// G201: SQL assembled through a formatting call.
pub struct SqlFormat {
    sinks: CallList,
    formatters: CallList,
}

impl SqlFormat {
    /// Builds the rule.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        let mut formatters = CallList::new();
        for name in ["Sprintf", "Sprint", "Sprintln"] {
            formatters.add("fmt", name);
        }
        Self {
            sinks: query_sinks(),
            formatters,
        }
    }
}

impl Rule for SqlFormat {
    fn id(&self) -> &'static str {
        FORMAT_ID
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CallExpr]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        let Some((_, sink_name)) = self.sinks.contains_call_expr(node, ctx) else {
            return Ok(Verdict::pass());
        };
        let Some(query) = query_arg(node, &sink_name) else {
            return Ok(Verdict::pass());
        };
        if resolve::resolve(query, ctx).is_known() {
            return Ok(Verdict::pass());
        }
        // The query must be a formatting call over a SQL-looking template.
        if ast::kind_of(query) != NodeKind::CallExpr
            || self.formatters.contains_call_expr(query, ctx).is_none()
        {
            return Ok(Verdict::pass());
        }
        let template_is_sql = query
            .child_by_field_name("arguments")
            .map(ast::named_children)
            .and_then(|args| args.first().copied())
            .and_then(|t| resolve::resolve_str(t, ctx))
            .is_some_and(|s| SQL_PATTERN.is_match(&s));
        if !template_is_sql {
            return Ok(Verdict::pass());
        }
        let confidence = if is_tainted(query, ctx) {
            Score::High
        } else {
            Score::Medium
        };
        Ok(Verdict::report(ctx.new_issue(
            node,
            FORMAT_ID,
            "SQL string formatting",
            Score::Medium,
            confidence,
        )))
    }
}

/// G202: SQL assembled through string concatenation.
pub struct SqlConcat {
    sinks: CallList,
}

impl SqlConcat {
    /// Builds the rule.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        Self {
            sinks: query_sinks(),
        }
    }

    /// Leftmost operand of a `+` chain.
    fn leftmost<'t>(mut node: Node<'t>) -> Node<'t> {
        while ast::kind_of(node) == NodeKind::BinaryExpr {
            match node.child_by_field_name("left") {
                Some(left) => node = left,
                None => break,
            }
        }
        node
    }
}

impl Rule for SqlConcat {
    fn id(&self) -> &'static str {
        CONCAT_ID
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CallExpr]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        let Some((_, sink_name)) = self.sinks.contains_call_expr(node, ctx) else {
            return Ok(Verdict::pass());
        };
        let Some(query) = query_arg(node, &sink_name) else {
            return Ok(Verdict::pass());
        };
        if ast::kind_of(query) != NodeKind::BinaryExpr {
            return Ok(Verdict::pass());
        }
        if resolve::resolve(query, ctx).is_known() {
            // Fully constant concatenation is just a long literal.
            return Ok(Verdict::pass());
        }
        let prefix_is_sql = resolve::resolve_str(Self::leftmost(query), ctx)
            .is_some_and(|s| SQL_PATTERN.is_match(&s));
        if !prefix_is_sql {
            return Ok(Verdict::pass());
        }
        let confidence = if is_tainted(query, ctx) {
            Score::High
        } else {
            Score::Medium
        };
        Ok(Verdict::report(ctx.new_issue(
            node,
            CONCAT_ID,
            "SQL string concatenation",
            Score::Medium,
            confidence,
        )))
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};
    use gosentry_core::Score;

    #[test]
    fn concatenated_args_fire_with_high_confidence() {
        let issues = scan(
            r#"package main

import (
    "database/sql"
    "os"
)

func query() {
    db, _ := sql.Open("postgres", "dsn")
    rows, _ := db.Query("SELECT * FROM users WHERE name = '" + os.Args[1] + "'")
    _ = rows
}
"#,
        );
        let hits = with_rule(&issues, "G202");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].confidence, Score::High);
    }

    #[test]
    fn constant_concatenation_is_quiet() {
        let issues = scan(
            r#"package main

import "database/sql"

const table = "users"

func query() {
    db, _ := sql.Open("postgres", "dsn")
    rows, _ := db.Query("SELECT * FROM " + table)
    _ = rows
}
"#,
        );
        assert!(with_rule(&issues, "G202").is_empty());
    }

    #[test]
    fn format_string_query_fires() {
        let issues = scan(
            r#"package main

import (
    "database/sql"
    "fmt"
    "os"
)

func query() {
    db, _ := sql.Open("postgres", "dsn")
    rows, _ := db.Query(fmt.Sprintf("SELECT * FROM users WHERE id = %s", os.Args[1]))
    _ = rows
}
"#,
        );
        assert_eq!(with_rule(&issues, "G201").len(), 1);
    }

    #[test]
    fn parameter_binding_is_quiet() {
        let issues = scan(
            r#"package main

import "database/sql"

func query(id string) {
    db, _ := sql.Open("postgres", "dsn")
    rows, _ := db.Query("SELECT * FROM users WHERE id = $1", id)
    _ = rows
}
"#,
        );
        assert!(with_rule(&issues, "G201").is_empty());
        assert!(with_rule(&issues, "G202").is_empty());
    }
}
