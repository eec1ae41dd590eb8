//! Rule G102: network listeners bound to all interfaces.

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{resolve, CallList, Config, Context, Rule, RuleError, Score, Verdict};
use tree_sitter::Node;

/// Rule ID for binding to all interfaces.
pub const ID: &str = "G102";

/// Flags `Listen`-family calls whose address binds every interface.
pub struct BindAllInterfaces {
    calls: CallList,
}

impl BindAllInterfaces {
    /// Builds the rule.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        let mut calls = CallList::new();
        for name in ["Listen", "ListenTCP", "ListenUDP", "ListenPacket", "ListenIP"] {
            calls.add("net", name);
        }
        calls.add("crypto/tls", "Listen");
        Self { calls }
    }
}

impl Rule for BindAllInterfaces {
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
        let Some(address) = args.get(1) else {
            return Ok(Verdict::pass());
        };
        let Some(value) = resolve::resolve_str(*address, ctx) else {
            return Ok(Verdict::pass());
        };
        if binds_all_interfaces(&value) {
            return Ok(Verdict::report(ctx.new_issue(
                node,
                ID,
                "Binds to all network interfaces",
                Score::Medium,
                Score::High,
            )));
        }
        Ok(Verdict::pass())
    }
}

/// An address with an empty, wildcard-v4, or wildcard-v6 host binds every
/// interface.
fn binds_all_interfaces(address: &str) -> bool {
    address.starts_with(':')
        || address.starts_with("0.0.0.0")
        || address.starts_with("[::]")
        || address == "0.0.0.0"
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};

    #[test]
    fn wildcard_and_empty_hosts_fire() {
        let issues = scan(
            r#"package main

import "net"

func serve() {
    l1, _ := net.Listen("tcp", "0.0.0.0:2000")
    l2, _ := net.Listen("tcp", ":2000")
    _ = l1
    _ = l2
}
"#,
        );
        assert_eq!(with_rule(&issues, "G102").len(), 2);
    }

    #[test]
    fn loopback_host_is_quiet() {
        let issues = scan(
            r#"package main

import "net"

func serve() {
    l, _ := net.Listen("tcp", "127.0.0.1:2000")
    _ = l
}
"#,
        );
        assert!(with_rule(&issues, "G102").is_empty());
    }

    #[test]
    fn aliased_import_still_matches() {
        let issues = scan(
            r#"package main

import network "net"

func serve() {
    l, _ := network.Listen("tcp", ":8080")
    _ = l
}
"#,
        );
        assert_eq!(with_rule(&issues, "G102").len(), 1);
    }
}
