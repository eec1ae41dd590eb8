//! Rule G101: hardcoded credentials.
//!
//! Fires when a variable or constant whose name looks credential-like is
//! assigned a string constant, or compared against one. High-entropy values
//! are always reported; low-entropy ones only in audit mode.
//!
//! # Configuration
//!
//! - `pattern`: name regex (default matches password/secret/token variants)
//! - `entropy-threshold`: minimum Shannon entropy in bits (default 2.0)
//! - `ignore-entropy`: report regardless of entropy (default false)
//! - `min-length`: minimum credential length considered (default 6)

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{
    resolve, Config, Context, Issue, PassedValue, Rule, RuleError, Score, Verdict,
};
use regex::Regex;
use tree_sitter::Node;

/// Rule ID for hardcoded credentials.
pub const ID: &str = "G101";

const DEFAULT_PATTERN: &str = "(?i)passwd|password|pwd|secret|token|apikey|api_key|bearer|cred";

/// Key under which credential variable names are shared across nodes of one
/// scan, so later comparisons against those variables also fire.
const PASSED_KEY: &str = "G101:credential-names";

/// Detects hardcoded credentials in assignments, declarations, and
/// comparisons.
pub struct Credentials {
    pattern: Regex,
    entropy_threshold: f64,
    ignore_entropy: bool,
    min_length: usize,
    audit: bool,
}

impl Credentials {
    /// Builds the rule from scan configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let options = config.rule_config(ID);
        let pattern = options
            .map(|o| o.get_str("pattern", DEFAULT_PATTERN).to_string())
            .unwrap_or_else(|| DEFAULT_PATTERN.to_string());
        Self {
            pattern: Regex::new(&pattern)
                .unwrap_or_else(|_| Regex::new(DEFAULT_PATTERN).expect("default pattern")),
            entropy_threshold: options
                .map_or(2.0, |o| o.get_float("entropy-threshold", 2.0)),
            ignore_entropy: options.is_some_and(|o| o.get_bool("ignore-entropy", false)),
            min_length: options.map_or(6, |o| {
                usize::try_from(o.get_int("min-length", 6)).unwrap_or(6)
            }),
            audit: config.global.audit,
        }
    }

    fn value_is_credential(&self, value: &str) -> bool {
        if value.len() < self.min_length {
            return false;
        }
        if self.ignore_entropy || self.audit {
            return true;
        }
        shannon_entropy(value) >= self.entropy_threshold
    }

    fn remember(&self, ctx: &Context<'_>, name: &str) {
        let mut names = match ctx.passed(PASSED_KEY) {
            Some(PassedValue::StrList(list)) => list,
            _ => Vec::new(),
        };
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
            ctx.set_passed(PASSED_KEY, PassedValue::StrList(names));
        }
    }

    fn is_remembered(&self, ctx: &Context<'_>, name: &str) -> bool {
        matches!(
            ctx.passed(PASSED_KEY),
            Some(PassedValue::StrList(list)) if list.iter().any(|n| n == name)
        )
    }

    fn check_bindings(&self, node: Node<'_>, ctx: &Context<'_>) -> Option<Issue> {
        for (name_node, value_node) in binding_pairs(node) {
            let name = ctx.node_text(name_node);
            if !self.pattern.is_match(name) {
                continue;
            }
            self.remember(ctx, name);
            let Some(value) = resolve::resolve_str(value_node, ctx) else {
                continue;
            };
            if self.value_is_credential(&value) {
                return Some(ctx.new_issue(
                    node,
                    ID,
                    "Potential hardcoded credentials",
                    Score::High,
                    Score::Medium,
                ));
            }
        }
        None
    }

    fn check_comparison(&self, node: Node<'_>, ctx: &Context<'_>) -> Option<Issue> {
        let op = ctx.node_text(node.child_by_field_name("operator")?);
        if op != "==" && op != "!=" {
            return None;
        }
        let left = node.child_by_field_name("left")?;
        let right = node.child_by_field_name("right")?;
        for (ident, other) in [(left, right), (right, left)] {
            if ast::kind_of(ident) != NodeKind::Ident {
                continue;
            }
            let name = ctx.node_text(ident);
            if !self.pattern.is_match(name) && !self.is_remembered(ctx, name) {
                continue;
            }
            let Some(value) = resolve::resolve_str(other, ctx) else {
                continue;
            };
            if self.value_is_credential(&value) {
                return Some(ctx.new_issue(
                    node,
                    ID,
                    "Potential hardcoded credentials in comparison",
                    Score::High,
                    Score::Medium,
                ));
            }
        }
        None
    }
}

impl Rule for Credentials {
    fn id(&self) -> &'static str {
        ID
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[
            NodeKind::ShortVarDecl,
            NodeKind::AssignStmt,
            NodeKind::ConstSpec,
            NodeKind::VarSpec,
            NodeKind::BinaryExpr,
        ]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        let found = match ast::kind_of(node) {
            NodeKind::BinaryExpr => self.check_comparison(node, ctx),
            _ => self.check_bindings(node, ctx),
        };
        // The rule fully analyzed the binding's value expressions; the
        // visitor must not rescan them.
        Ok(match found {
            Some(issue) => Verdict::claim(issue),
            None => Verdict::pass(),
        })
    }
}

/// (name, value) pairs of a declaration or assignment node.
fn binding_pairs(node: Node<'_>) -> Vec<(Node<'_>, Node<'_>)> {
    let mut pairs = Vec::new();
    match ast::kind_of(node) {
        NodeKind::ShortVarDecl | NodeKind::AssignStmt => {
            let (Some(left), Some(right)) = (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) else {
                return pairs;
            };
            let targets = ast::named_children(left);
            let values = ast::named_children(right);
            if targets.len() == values.len() {
                for (t, v) in targets.into_iter().zip(values) {
                    if ast::kind_of(t) == NodeKind::Ident {
                        pairs.push((t, v));
                    }
                }
            }
        }
        NodeKind::ConstSpec | NodeKind::VarSpec => {
            let names: Vec<Node<'_>> = ast::named_children(node)
                .into_iter()
                .take_while(|n| matches!(ast::kind_of(*n), NodeKind::Ident | NodeKind::BlankIdent))
                .collect();
            let values = node
                .child_by_field_name("value")
                .map(ast::named_children)
                .unwrap_or_default();
            if names.len() == values.len() {
                for (n, v) in names.into_iter().zip(values) {
                    if ast::kind_of(n) == NodeKind::Ident {
                        pairs.push((n, v));
                    }
                }
            }
        }
        _ => {}
    }
    pairs
}

fn shannon_entropy(value: &str) -> f64 {
    let len = value.chars().count() as f64;
    if len == 0.0 {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    for c in value.chars() {
        *counts.entry(c).or_insert(0usize) += 1;
    }
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{scan, with_rule};

    #[test]
    fn detects_high_entropy_assignment() {
        let issues = scan(
            r#"package main

func login() {
    password := "f62e5bcda4fae4f82370da0c6f20697b8f8447ef"
    _ = password
}
"#,
        );
        let hits = with_rule(&issues, "G101");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Score::High);
    }

    #[test]
    fn low_entropy_value_is_quiet_by_default() {
        let issues = scan(
            r#"package main

func login() {
    password := "aaaaaaaa"
    _ = password
}
"#,
        );
        assert!(with_rule(&issues, "G101").is_empty());
    }

    #[test]
    fn detects_const_credential() {
        let issues = scan(
            r#"package main

const apiKey = "8e9c3bcd12a04ff1bb4f0de203b2a1f9cafe0102"

func main() {}
"#,
        );
        assert_eq!(with_rule(&issues, "G101").len(), 1);
    }

    #[test]
    fn detects_comparison_against_literal() {
        let issues = scan(
            r#"package main

func check() bool {
    password := readSecret()
    if password == "f62e5bcda4fae4f82370da0c6f20697b8f8447ef" {
        return true
    }
    return false
}

func readSecret() string { return "" }
"#,
        );
        assert_eq!(with_rule(&issues, "G101").len(), 1);
    }

    #[test]
    fn entropy_is_computed_in_bits() {
        assert!(shannon_entropy("aaaa") < 0.1);
        assert!(shannon_entropy("f62e5bcda4fae4f82370da0c6f20697b8f8447ef") > 3.0);
    }
}
