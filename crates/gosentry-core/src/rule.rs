//! Rule traits, registration records, and the dispatch registry.

use std::collections::HashMap;
use thiserror::Error;
use tree_sitter::Node;

use crate::ast::NodeKind;
use crate::config::Config;
use crate::context::Context;
use crate::issue::Issue;

/// Whether the visitor keeps descending after a rule ran on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Visit the node's children as usual.
    Descend,
    /// The rule took ownership of this subtree; do not descend.
    Skip,
}

/// A rule's answer for one node.
#[derive(Debug)]
pub struct Verdict {
    /// Issue to report, if any.
    pub issue: Option<Issue>,
    /// Traversal directive for the node's subtree.
    pub walk: Walk,
}

impl Verdict {
    /// Nothing to report, keep walking. The normal negative case.
    #[must_use]
    pub fn pass() -> Self {
        Self {
            issue: None,
            walk: Walk::Descend,
        }
    }

    /// Report an issue and keep walking.
    #[must_use]
    pub fn report(issue: Issue) -> Self {
        Self {
            issue: Some(issue),
            walk: Walk::Descend,
        }
    }

    /// Report an issue and take ownership of the subtree.
    ///
    /// Used sparingly, by rules that fully analyze a sub-AST themselves and
    /// would double-report if the visitor descended.
    #[must_use]
    pub fn claim(issue: Issue) -> Self {
        Self {
            issue: Some(issue),
            walk: Walk::Skip,
        }
    }
}

/// A recoverable failure inside a rule.
///
/// Logged with rule and position context by the visitor; never aborts a scan.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RuleError {
    /// What went wrong.
    pub message: String,
}

impl RuleError {
    /// Creates a rule error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A node rule: fires on individual AST nodes during traversal.
pub trait Rule: Send + Sync {
    /// Stable rule identifier: one uppercase letter plus digits.
    fn id(&self) -> &'static str;

    /// Node kinds this rule wants to see.
    fn kinds(&self) -> &'static [NodeKind];

    /// Examines one node. `Ok(Verdict::pass())` is the normal negative case.
    ///
    /// # Errors
    ///
    /// A returned error is logged and the rule is skipped for this node.
    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError>;
}

/// A whole-package analyzer: runs after traversal, once per file, with the
/// same context node rules see. Used where function-wide dataflow is cheaper
/// than per-node pattern matching.
pub trait PackageAnalyzer: Send + Sync {
    /// Stable rule identifier, same format as node rules.
    fn id(&self) -> &'static str;

    /// Analyzes the current file of the context's package.
    ///
    /// # Errors
    ///
    /// A returned error is logged and the analyzer is skipped for this file.
    fn analyze(&self, ctx: &Context<'_>) -> Result<Vec<Issue>, RuleError>;
}

/// Boxed node rule.
pub type RuleBox = Box<dyn Rule>;
/// Boxed whole-package analyzer.
pub type AnalyzerBox = Box<dyn PackageAnalyzer>;

/// Registration record for a node rule.
pub struct RuleInfo {
    /// Rule identifier.
    pub id: &'static str,
    /// One-line description shown by rule listings.
    pub description: &'static str,
    /// Constructor taking the scan configuration.
    pub build: fn(&Config) -> RuleBox,
}

/// Registration record for a whole-package analyzer.
pub struct AnalyzerInfo {
    /// Analyzer identifier.
    pub id: &'static str,
    /// One-line description shown by rule listings.
    pub description: &'static str,
    /// Constructor taking the scan configuration.
    pub build: fn(&Config) -> AnalyzerBox,
}

/// Built rules indexed by the node kinds they subscribe to.
///
/// Registration order is preserved: rules registered for the same kind fire
/// in the order they were loaded.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<RuleBox>,
    by_kind: HashMap<NodeKind, Vec<usize>>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, indexing it under every kind it subscribes to.
    pub fn register(&mut self, rule: RuleBox) {
        let index = self.rules.len();
        for kind in rule.kinds() {
            self.by_kind.entry(*kind).or_default().push(index);
        }
        self.rules.push(rule);
    }

    /// Rules registered for a node kind, in registration order.
    #[must_use]
    pub fn rules_for(&self, kind: NodeKind) -> &[usize] {
        self.by_kind.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Fetches a rule by registry index.
    #[must_use]
    pub fn get(&self, index: usize) -> &dyn Rule {
        self.rules[index].as_ref()
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
