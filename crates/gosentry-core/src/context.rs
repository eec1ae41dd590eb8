//! Per-traversal context shared by rules.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tree_sitter::Node;

use crate::ast;
use crate::config::Config;
use crate::imports::ImportTracker;
use crate::issue::{cwe_for_rule, Issue, Score};
use crate::loader::{Package, SourceFile};
use crate::rule::RuleError;
use crate::ssa::FuncAnalysis;

/// A fact a rule memoizes for other nodes of the same scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassedValue {
    /// Boolean fact.
    Bool(bool),
    /// Integer fact.
    Int(i64),
    /// String fact.
    Str(String),
    /// String list fact.
    StrList(Vec<String>),
    /// A set of AST node ids, e.g. subtrees a rule already claimed.
    Nodes(HashSet<usize>),
}

/// Mutable state that lives for one package scan and is dropped afterwards.
#[derive(Default)]
pub struct PackageState {
    passed: RefCell<HashMap<String, PassedValue>>,
    analyses: RefCell<FxHashMap<(usize, usize), Rc<FuncAnalysis>>>,
}

impl PackageState {
    /// Fresh state for one package.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Read-mostly view handed to every rule invocation.
///
/// One context exists per (package, file) pair; the package-scoped pieces
/// (`PassedValues`, SSA cache) are shared across the package's files and
/// cleared when the package scan ends.
pub struct Context<'p> {
    /// The package being scanned.
    pub pkg: &'p Package,
    /// Index of the current file within the package.
    pub file_index: usize,
    /// The current file.
    pub file: &'p SourceFile,
    /// Imports of the current file.
    pub imports: ImportTracker,
    /// Scan configuration.
    pub config: &'p Config,
    state: &'p PackageState,
}

impl<'p> Context<'p> {
    /// Builds the context for one file of a package.
    #[must_use]
    pub fn new(
        pkg: &'p Package,
        file_index: usize,
        config: &'p Config,
        state: &'p PackageState,
    ) -> Self {
        let file = &pkg.files[file_index];
        let imports = ImportTracker::from_file(file.root(), &file.source);
        Self {
            pkg,
            file_index,
            file,
            imports,
            config,
            state,
        }
    }

    /// Source text of the current file.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.file.source
    }

    /// Source text of a node in the current file.
    #[must_use]
    pub fn node_text(&self, node: Node<'_>) -> &str {
        ast::text_of(node, &self.file.source)
    }

    /// Creates an issue anchored at a node, filling position, excerpt, and
    /// CWE from the rule ID. Suppression provenance is attached later by the
    /// visitor.
    #[must_use]
    pub fn new_issue(
        &self,
        node: Node<'_>,
        rule_id: &str,
        what: impl Into<String>,
        severity: Score,
        confidence: Score,
    ) -> Issue {
        Issue {
            severity,
            confidence,
            cwe: cwe_for_rule(rule_id),
            rule_id: rule_id.to_string(),
            what: what.into(),
            file: self.file.path.to_string_lossy().into_owned(),
            code: ast::excerpt(node, &self.file.source),
            line: ast::line_field(node),
            column: ast::start_column(node).to_string(),
            no_sec: false,
            suppressions: Vec::new(),
            autofix: None,
        }
    }

    /// Stores a fact under a stable key for later nodes of this scan.
    pub fn set_passed(&self, key: &str, value: PassedValue) {
        self.state.passed.borrow_mut().insert(key.to_string(), value);
    }

    /// Reads back a fact stored by [`Context::set_passed`].
    #[must_use]
    pub fn passed(&self, key: &str) -> Option<PassedValue> {
        self.state.passed.borrow().get(key).cloned()
    }

    /// Marks an AST node id under a key. Convenience over a `Nodes` fact.
    pub fn mark_node(&self, key: &str, id: usize) {
        let mut passed = self.state.passed.borrow_mut();
        match passed
            .entry(key.to_string())
            .or_insert_with(|| PassedValue::Nodes(HashSet::new()))
        {
            PassedValue::Nodes(set) => {
                set.insert(id);
            }
            other => *other = PassedValue::Nodes(HashSet::from([id])),
        }
    }

    /// Whether a node id was marked under a key.
    #[must_use]
    pub fn is_node_marked(&self, key: &str, id: usize) -> bool {
        matches!(
            self.state.passed.borrow().get(key),
            Some(PassedValue::Nodes(set)) if set.contains(&id)
        )
    }

    /// Function-level dataflow analysis (SSA, ranges, taint), materialized on
    /// first request and cached for the package lifetime.
    ///
    /// # Errors
    ///
    /// Fails when the function body cannot be lowered (e.g. unstructured
    /// control flow the engine refuses to model).
    pub fn func_analysis(&self, func: Node<'_>) -> Result<Rc<FuncAnalysis>, RuleError> {
        let key = (self.file_index, func.id());
        if let Some(hit) = self.state.analyses.borrow().get(&key) {
            return Ok(Rc::clone(hit));
        }
        let built = Rc::new(FuncAnalysis::build(func, self)?);
        self.state
            .analyses
            .borrow_mut()
            .insert(key, Rc::clone(&built));
        Ok(built)
    }
}
