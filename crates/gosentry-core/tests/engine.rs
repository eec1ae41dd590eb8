//! Engine-level integration: loader, visitor dispatch, and suppression
//! driven through the public API with a synthetic rule.

use gosentry_core::ast::NodeKind;
use gosentry_core::{
    Analyzer, Config, Context, Rule, RuleError, RuleInfo, Score, Verdict,
};
use std::path::Path;
use tree_sitter::Node;

/// Fires on every call expression; enough to observe dispatch and
/// suppression behavior without real detection logic.
struct EveryCall;

impl Rule for EveryCall {
    fn id(&self) -> &'static str {
        "T100"
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CallExpr]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        Ok(Verdict::report(ctx.new_issue(
            node,
            "T100",
            "call observed",
            Score::Low,
            Score::High,
        )))
    }
}

/// Always errors; the scan must keep going.
struct AlwaysFails;

impl Rule for AlwaysFails {
    fn id(&self) -> &'static str {
        "T200"
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::CallExpr]
    }

    fn match_node(&self, _node: Node<'_>, _ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        Err(RuleError::new("synthetic failure"))
    }
}

fn rules() -> Vec<RuleInfo> {
    vec![
        RuleInfo {
            id: "T100",
            description: "observes calls",
            build: |_| Box::new(EveryCall),
        },
        RuleInfo {
            id: "T200",
            description: "always fails",
            build: |_| Box::new(AlwaysFails),
        },
    ]
}

fn scan(dir: &Path, config: Config) -> gosentry_core::Report {
    let mut analyzer = Analyzer::builder()
        .config(config)
        .exclude_generated(true)
        .build()
        .unwrap();
    analyzer.load_rules(rules());
    analyzer
        .process(&[], &[dir.to_string_lossy().into_owned()])
        .unwrap();
    analyzer.report()
}

#[test]
fn rules_fire_once_per_matching_node() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.go"),
        r#"package main

func work() {
    first()
    second()
}

func first()  {}
func second() {}
"#,
    )
    .unwrap();
    let report = scan(dir.path(), Config::default());
    assert_eq!(report.issues.len(), 2);
    assert!(report.issues.iter().all(|i| i.rule_id == "T100"));
    assert_eq!(report.metrics.files, 1);
    assert!(report.metrics.lines > 0);
}

#[test]
fn rule_errors_never_abort_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.go"),
        "package main\n\nfunc work() {\n    first()\n}\n\nfunc first() {}\n",
    )
    .unwrap();
    // T200 errors on the same node T100 reports on.
    let report = scan(dir.path(), Config::default());
    assert_eq!(report.issues.len(), 1);
}

#[test]
fn blanket_directive_skips_the_subtree() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.go"),
        r#"package main

func work() {
    first() // #nosec
    second()
}

func first()  {}
func second() {}
"#,
    )
    .unwrap();
    let report = scan(dir.path(), Config::default());
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.metrics.nosec, 1);
}

#[test]
fn enclosing_directive_is_inherited() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.go"),
        r#"package main

// #nosec T100 -- fixture helper
func work() {
    first()
    second()
}

func first()  {}
func second() {}
"#,
    )
    .unwrap();
    let report = scan(dir.path(), Config::default());
    // Both calls live under the suppressed declaration.
    assert!(report.issues.is_empty());
}

#[test]
fn line_fields_are_single_or_ranged() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("main.go"),
        r#"package main

func work() {
    multi(
        1,
        2,
    )
}

func multi(a, b int) {}
"#,
    )
    .unwrap();
    let report = scan(dir.path(), Config::default());
    assert_eq!(report.issues.len(), 1);
    let line = &report.issues[0].line;
    let parts: Vec<&str> = line.split('-').collect();
    assert!(!parts[0].is_empty());
    if parts.len() == 2 {
        let start: usize = parts[0].parse().unwrap();
        let end: usize = parts[1].parse().unwrap();
        assert!(start <= end);
    }
}

#[test]
fn multiple_files_share_one_package_context() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.go"),
        "package main\n\nfunc a() { helper() }\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("b.go"),
        "package main\n\nfunc helper() {}\n\nfunc b() { helper() }\n",
    )
    .unwrap();
    let report = scan(dir.path(), Config::default());
    assert_eq!(report.issues.len(), 2);
    assert_eq!(report.metrics.files, 2);
}
