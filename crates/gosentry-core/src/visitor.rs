//! Depth-first AST traversal with suppression-aware rule dispatch.

use std::collections::{HashMap, HashSet};
use tracing::info;
use tree_sitter::Node;

use crate::ast::{self, NodeKind};
use crate::context::Context;
use crate::issue::Issue;
use crate::rule::{RuleRegistry, Walk};
use crate::suppress::{Directive, SuppressionEngine};

/// What one file's traversal produced.
#[derive(Debug, Default)]
pub struct FileReport {
    /// Issues in visit order, suppressed ones included when tracking.
    pub issues: Vec<Issue>,
    /// Number of inline suppression directives honored.
    pub nosec: usize,
}

/// Walks one file, dispatching registered rules at every surviving node.
#[must_use]
pub fn walk_file(
    registry: &RuleRegistry,
    engine: &SuppressionEngine,
    ctx: &Context<'_>,
) -> FileReport {
    let directives = engine.file_directives(ctx.file.root(), ctx.source());
    let mut walker = Walker {
        registry,
        engine,
        ctx,
        directives,
        report: FileReport::default(),
        counted_lines: HashSet::new(),
        track: engine.tracking() || ctx.config.global.show_ignored,
    };
    walker.visit(ctx.file.root(), &[]);
    walker.report
}

struct Walker<'a, 'p> {
    registry: &'a RuleRegistry,
    engine: &'a SuppressionEngine,
    ctx: &'a Context<'p>,
    directives: HashMap<usize, Vec<Directive>>,
    report: FileReport,
    counted_lines: HashSet<usize>,
    track: bool,
}

impl Walker<'_, '_> {
    /// Directives attaching directly to a node: same line, or alone on the
    /// immediately preceding line.
    fn attached(&self, node: Node<'_>) -> Vec<Directive> {
        let line = ast::start_line(node);
        let mut out = Vec::new();
        if let Some(ds) = self.directives.get(&line) {
            out.extend(ds.iter().cloned());
        }
        if line > 1 {
            if let Some(ds) = self.directives.get(&(line - 1)) {
                out.extend(ds.iter().filter(|d| d.own_line).cloned());
            }
        }
        out
    }

    fn visit(&mut self, node: Node<'_>, inherited: &[Directive]) {
        let kind = ast::kind_of(node);
        if kind == NodeKind::Comment {
            return;
        }

        let mut active: Vec<Directive> = inherited.to_vec();
        let fresh: Vec<Directive> = self
            .attached(node)
            .into_iter()
            .filter(|d| !active.iter().any(|a| a.line == d.line))
            .collect();
        if !self.track {
            for d in &fresh {
                if self.counted_lines.insert(d.line) {
                    self.report.nosec += 1;
                }
            }
        }
        active.extend(fresh);

        // A blanket directive silences the whole subtree outright unless
        // suppressed issues are being tracked.
        if !self.track && active.iter().any(Directive::matches_all) {
            return;
        }

        let mut descend = true;
        let file_path = self.ctx.file.path.to_string_lossy();
        for index in self.registry.rules_for(kind) {
            let rule = self.registry.get(*index);
            let inline: Vec<&Directive> =
                active.iter().filter(|d| d.matches(rule.id())).collect();
            let external = self.engine.external_for(&file_path, rule.id());
            let suppressed = !inline.is_empty() || !external.is_empty();
            if suppressed && !self.track {
                continue;
            }
            match rule.match_node(node, self.ctx) {
                Ok(verdict) => {
                    if let Some(mut issue) = verdict.issue {
                        if suppressed {
                            issue.no_sec = !inline.is_empty();
                            issue.suppressions =
                                inline.iter().map(|d| d.info()).chain(external).collect();
                        }
                        self.report.issues.push(issue);
                    }
                    if verdict.walk == Walk::Skip {
                        descend = false;
                    }
                }
                Err(e) => {
                    info!(
                        rule = rule.id(),
                        file = %file_path,
                        line = ast::start_line(node),
                        "rule failed: {e}"
                    );
                }
            }
        }

        if descend {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            for child in children {
                self.visit(child, &active);
            }
        }
    }
}

/// Applies suppression to an issue produced outside the traversal (by a
/// whole-package analyzer), resolving attachment against the AST position
/// the issue points at.
///
/// Returns `None` when the issue is suppressed and suppressions are not
/// being tracked; the caller counts the drop in the nosec metric.
#[must_use]
pub fn suppress_analyzer_issue(
    mut issue: Issue,
    engine: &SuppressionEngine,
    ctx: &Context<'_>,
) -> Option<Issue> {
    let directives = engine.file_directives(ctx.file.root(), ctx.source());
    let track = engine.tracking() || ctx.config.global.show_ignored;

    let line = issue.line_start();
    let mut inline: Vec<Directive> = Vec::new();
    // Directly attached directives.
    if let Some(ds) = directives.get(&line) {
        inline.extend(ds.iter().cloned());
    }
    if line > 1 {
        if let Some(ds) = directives.get(&(line - 1)) {
            inline.extend(ds.iter().filter(|d| d.own_line).cloned());
        }
    }
    // Inherited from enclosing declarations.
    if let Some(node) = node_starting_at(ctx.file.root(), line) {
        let mut cur = node.parent();
        while let Some(n) = cur {
            let parent_line = ast::start_line(n);
            if let Some(ds) = directives.get(&parent_line) {
                let to_add: Vec<_> = ds
                    .iter()
                    .filter(|d| !inline.iter().any(|have| have.line == d.line))
                    .cloned()
                    .collect();
                inline.extend(to_add);
            }
            cur = n.parent();
        }
    }

    inline.retain(|d| d.matches(&issue.rule_id));
    let external = engine.external_for(&issue.file, &issue.rule_id);
    if inline.is_empty() && external.is_empty() {
        return Some(issue);
    }
    if !track {
        return None;
    }
    issue.no_sec = !inline.is_empty();
    issue.suppressions = inline.iter().map(Directive::info).chain(external).collect();
    Some(issue)
}

fn node_starting_at<'t>(root: Node<'t>, line: usize) -> Option<Node<'t>> {
    let mut stack = vec![root];
    let mut best: Option<Node<'t>> = None;
    while let Some(n) = stack.pop() {
        if ast::start_line(n) == line && n.kind() != "comment" {
            best = Some(n);
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            if ast::start_line(child) <= line && child.end_position().row + 1 >= line {
                stack.push(child);
            }
        }
    }
    best
}
