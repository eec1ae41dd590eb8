//! Call-expression matching against qualified package paths.

use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

use crate::ast::{self, NodeKind};
use crate::context::Context;
use crate::symbols;

/// Wildcard sentinel: any function of the package matches.
pub const MATCH_ANY: &str = "*";

/// A set of (package path, function name) pairs a rule is interested in.
///
/// Two construction modes: deny-listed pairs via [`CallList::add`], and
/// whole-package entries via [`CallList::add_all`]. Method receivers are
/// listed as `"pkg/path.Type"` with pointer markers stripped.
#[derive(Debug, Clone, Default)]
pub struct CallList {
    items: HashMap<String, HashSet<String>>,
}

impl CallList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one (package, function) pair.
    pub fn add(&mut self, pkg: &str, name: &str) {
        self.items
            .entry(pkg.to_string())
            .or_default()
            .insert(name.to_string());
    }

    /// Adds a whole package: any call into it matches.
    pub fn add_all(&mut self, pkg: &str) {
        self.items
            .entry(pkg.to_string())
            .or_default()
            .insert(MATCH_ANY.to_string());
    }

    /// Membership test for a resolved pair.
    #[must_use]
    pub fn contains(&self, pkg: &str, name: &str) -> bool {
        self.items
            .get(pkg)
            .is_some_and(|fns| fns.contains(MATCH_ANY) || fns.contains(name))
    }

    /// Resolves a call expression and returns the first listed pair it hits.
    #[must_use]
    pub fn contains_call_expr(
        &self,
        call: Node<'_>,
        ctx: &Context<'_>,
    ) -> Option<(String, String)> {
        resolve_call_targets(call, ctx)
            .into_iter()
            .find(|(pkg, name)| self.contains(pkg, name))
    }

    /// Whole-package variant: matches any call into a listed package,
    /// regardless of which function it names.
    #[must_use]
    pub fn contains_pkg_call_expr(
        &self,
        call: Node<'_>,
        ctx: &Context<'_>,
    ) -> Option<(String, String)> {
        resolve_call_targets(call, ctx)
            .into_iter()
            .find(|(pkg, _)| self.items.contains_key(pkg))
    }
}

/// Resolves the possible (package-or-type, function) targets of a call.
///
/// Selector calls resolve their operand through the import table first
/// (aliases included), then through type inference for value receivers,
/// including chained calls. Bare identifiers yield one candidate per dot
/// import of the enclosing file.
#[must_use]
pub fn resolve_call_targets(call: Node<'_>, ctx: &Context<'_>) -> Vec<(String, String)> {
    call.child_by_field_name("function")
        .map(|f| resolve_function(f, ctx))
        .unwrap_or_default()
}

fn resolve_function(function: Node<'_>, ctx: &Context<'_>) -> Vec<(String, String)> {
    match ast::kind_of(function) {
        NodeKind::ParenExpr => function
            .named_child(0)
            .map(|inner| resolve_function(inner, ctx))
            .unwrap_or_default(),
        NodeKind::SelectorExpr => {
            let Some(operand) = function.child_by_field_name("operand") else {
                return Vec::new();
            };
            let Some(field) = function.child_by_field_name("field") else {
                return Vec::new();
            };
            let name = ctx.node_text(field).to_string();

            if ast::kind_of(operand) == NodeKind::Ident {
                let local = ctx.node_text(operand);
                if let Some(path) = ctx.imports.path_for_local(local) {
                    return vec![(path.to_string(), name)];
                }
            }
            // Value receiver, possibly a chained call: follow its type.
            if let Some(ty) =
                symbols::infer_expr_type(operand, ctx.source(), &ctx.imports, &ctx.pkg.symbols)
            {
                let ty = ty.trim_start_matches('*').to_string();
                return vec![(ty, name)];
            }
            Vec::new()
        }
        NodeKind::Ident => {
            let name = ctx.node_text(function).to_string();
            ctx.imports
                .dot_imports()
                .into_iter()
                .map(|path| (path.to_string(), name.clone()))
                .collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_honors_wildcard() {
        let mut list = CallList::new();
        list.add("os/exec", "Command");
        list.add_all("math/rand");

        assert!(list.contains("os/exec", "Command"));
        assert!(!list.contains("os/exec", "Run"));
        assert!(list.contains("math/rand", "Intn"));
        assert!(list.contains("math/rand", "anything"));
        assert!(!list.contains("crypto/rand", "Read"));
    }
}
