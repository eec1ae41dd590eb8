//! Rule G402: unsafe TLS configuration literals.
//!
//! Checks `tls.Config` composite literals for disabled certificate
//! verification and weak minimum protocol versions. A `MinVersion` that
//! cannot be proved (an exported package variable, a computed value) is
//! reported conservatively.

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{resolve, symbols, Config, Context, Rule, RuleError, Score, Verdict};
use tree_sitter::Node;

/// Rule ID for TLS configuration checks.
pub const ID: &str = "G402";

const VERSION_TLS12: i128 = 0x0303;

/// Flags weak `tls.Config` literals.
pub struct TlsConfig {
    min_version: i128,
}

impl TlsConfig {
    /// Builds the rule.
    ///
    /// The `min-version` option overrides the weakest acceptable protocol
    /// version (default TLS 1.2).
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let min_version = config
            .rule_config(ID)
            .map_or(VERSION_TLS12, |o| {
                i128::from(o.get_int("min-version", VERSION_TLS12 as i64))
            });
        Self { min_version }
    }
}

impl Rule for TlsConfig {
    fn id(&self) -> &'static str {
        ID
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CompositeLit]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        let Some(ty) = node.child_by_field_name("type") else {
            return Ok(Verdict::pass());
        };
        if symbols::type_name(ty, ctx.source(), &ctx.imports) != "crypto/tls.Config" {
            return Ok(Verdict::pass());
        }

        if let Some(value) = resolve::struct_field_value(node, "InsecureSkipVerify", ctx.source())
        {
            if resolve::resolve_bool(value, ctx) == Some(true) {
                return Ok(Verdict::report(ctx.new_issue(
                    node,
                    ID,
                    "TLS InsecureSkipVerify set true",
                    Score::High,
                    Score::High,
                )));
            }
        }

        if let Some(value) = resolve::struct_field_value(node, "MinVersion", ctx.source()) {
            match resolve::resolve_int(value, ctx) {
                Some(version) if version < self.min_version => {
                    return Ok(Verdict::report(ctx.new_issue(
                        node,
                        ID,
                        "TLS MinVersion too low",
                        Score::High,
                        Score::High,
                    )));
                }
                Some(_) => {}
                None => {
                    // Unprovable version: external code may lower it.
                    return Ok(Verdict::report(ctx.new_issue(
                        node,
                        ID,
                        "TLS MinVersion may be too low",
                        Score::High,
                        Score::Low,
                    )));
                }
            }
        }
        Ok(Verdict::pass())
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};

    #[test]
    fn zero_min_version_fires() {
        let issues = scan(
            r#"package main

import "crypto/tls"

func client() {
    cfg := &tls.Config{MinVersion: 0}
    _ = cfg
}
"#,
        );
        assert_eq!(with_rule(&issues, "G402").len(), 1);
    }

    #[test]
    fn tls13_is_quiet() {
        let issues = scan(
            r#"package main

import "crypto/tls"

func client() {
    cfg := &tls.Config{MinVersion: tls.VersionTLS13}
    _ = cfg
}
"#,
        );
        assert!(with_rule(&issues, "G402").is_empty());
    }

    #[test]
    fn exported_variable_version_is_conservative() {
        let issues = scan(
            r#"package main

import "crypto/tls"

var MinimumVersion uint16 = tls.VersionTLS10

func client() {
    cfg := &tls.Config{MinVersion: MinimumVersion}
    _ = cfg
}
"#,
        );
        assert_eq!(with_rule(&issues, "G402").len(), 1);
    }

    #[test]
    fn insecure_skip_verify_fires() {
        let issues = scan(
            r#"package main

import "crypto/tls"

func client() {
    cfg := &tls.Config{InsecureSkipVerify: true}
    _ = cfg
}
"#,
        );
        assert_eq!(with_rule(&issues, "G402").len(), 1);
    }

    #[test]
    fn aliased_package_literal_still_matches() {
        let issues = scan(
            r#"package main

import crypto "crypto/tls"

func client() {
    cfg := crypto.Config{MinVersion: crypto.VersionTLS12}
    _ = cfg
}
"#,
        );
        assert!(with_rule(&issues, "G402").is_empty());
    }
}
