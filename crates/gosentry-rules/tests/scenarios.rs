//! End-to-end scenarios driving the full analyzer through the public API.

use gosentry_core::{sort_issues, Analyzer, Config, Issue, Report, Score, SuppressionKind};
use std::path::Path;

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn scan_dir(dir: &Path, config: Config) -> Report {
    let mut analyzer = Analyzer::builder()
        .config(config)
        .exclude_generated(true)
        .build()
        .unwrap();
    analyzer.load_rules(gosentry_rules::generators());
    analyzer.load_analyzers(gosentry_rules::analyzers());
    analyzer
        .process(&[], &[dir.to_string_lossy().into_owned()])
        .unwrap();
    analyzer.report()
}

fn scan_source(source: &str, config: Config) -> Report {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.go", source);
    scan_dir(dir.path(), config)
}

fn rule_ids(issues: &[Issue]) -> Vec<String> {
    let mut ids: Vec<String> = issues.iter().map(|i| i.rule_id.clone()).collect();
    ids.sort();
    ids
}

const CREDENTIAL_FIXTURE: &str = r#"package main

func login() {
    password := "f62e5bcda4fae4f82370da0c6f20697b8f8447ef"
    _ = password
}
"#;

#[test]
fn hardcoded_credential_reports_high_severity() {
    let report = scan_source(CREDENTIAL_FIXTURE, Config::default());
    assert_eq!(rule_ids(&report.issues), vec!["G101"]);
    assert_eq!(report.issues[0].severity, Score::High);
    assert_eq!(report.metrics.found, 1);
}

#[test]
fn suppressed_credential_is_dropped_when_untracked() {
    let source = r#"package main

func login() {
    password := "f62e5bcda4fae4f82370da0c6f20697b8f8447ef" // #nosec G101 -- test
    _ = password
}
"#;
    let report = scan_source(source, Config::default());
    assert!(report.issues.is_empty());
    assert_eq!(report.metrics.nosec, 1);
    assert_eq!(report.metrics.found, 0);
}

#[test]
fn suppressed_credential_carries_provenance_when_tracked() {
    let source = r#"package main

func login() {
    password := "f62e5bcda4fae4f82370da0c6f20697b8f8447ef" // #nosec G101 -- test
    _ = password
}
"#;
    let config = Config::parse("[global]\ntrack-suppressions = true\n").unwrap();
    let report = scan_source(source, config);
    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert!(issue.no_sec);
    assert_eq!(issue.suppressions.len(), 1);
    assert_eq!(issue.suppressions[0].kind, SuppressionKind::InSource);
    assert_eq!(issue.suppressions[0].justification, "test");
    // Suppressed issues never count toward the failure tally.
    assert_eq!(report.metrics.found, 0);
    assert!(!report.is_failing());
}

#[test]
fn disable_directive_scopes_like_nosec() {
    let source = r#"package main

func login() {
    //gosentry:disable G101 -- rotation fixture
    password := "f62e5bcda4fae4f82370da0c6f20697b8f8447ef"
    _ = password
}
"#;
    let report = scan_source(source, Config::default());
    assert!(report.issues.is_empty());
}

#[test]
fn scoped_suppression_leaves_other_rules_running() {
    let source = r#"package main

import "math/rand"

func draw() int {
    return rand.Intn(6) // #nosec G101 -- wrong scope on purpose
}
"#;
    let report = scan_source(source, Config::default());
    // The directive names G101 only; G404 still fires on the same line.
    assert_eq!(rule_ids(&report.issues), vec!["G404"]);
}

#[test]
fn bare_nosec_suppresses_every_rule_in_subtree() {
    let source = r#"package main

import "math/rand"

func draw() int {
    return rand.Intn(6) // #nosec
}
"#;
    let report = scan_source(source, Config::default());
    assert!(report.issues.is_empty());
    assert_eq!(report.metrics.nosec, 1);
}

#[test]
fn global_nosec_flag_disables_inline_suppression() {
    let source = r#"package main

func login() {
    password := "f62e5bcda4fae4f82370da0c6f20697b8f8447ef" // #nosec
    _ = password
}
"#;
    let config = Config::parse("[global]\nnosec = true\n").unwrap();
    let report = scan_source(source, config);
    assert_eq!(rule_ids(&report.issues), vec!["G101"]);
}

#[test]
fn external_path_suppression_attaches_provenance() {
    let source = r#"package main

import "math/rand"

func draw() int { return rand.Intn(6) }
"#;
    let config = Config::parse(
        r#"
[global]
track-suppressions = true

[[global.suppress]]
path = 'main\.go'
rules = ["G404"]
justification = "simulation code"
"#,
    )
    .unwrap();
    let report = scan_source(source, config);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(
        report.issues[0].suppressions[0].kind,
        SuppressionKind::External
    );
    assert!(!report.issues[0].no_sec);
    assert_eq!(report.metrics.found, 0);
}

#[test]
fn concurrency_never_changes_the_issue_multiset() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..6 {
        let sub = dir.path().join(format!("pkg{i}"));
        std::fs::create_dir(&sub).unwrap();
        write(
            &sub,
            "main.go",
            &format!(
                r#"package pkg{i}

import "math/rand"

func draw() int {{
    token := "8e9c3bcd12a04ff1bb4f0de203b2a1f9cafe010{i}"
    _ = token
    return rand.Intn(10)
}}
"#
            ),
        );
    }
    let arg = format!("{}/...", dir.path().to_string_lossy());

    let mut reports = Vec::new();
    for workers in [1usize, 4] {
        let config =
            Config::parse(&format!("[global]\nconcurrency = {workers}\n")).unwrap();
        let mut analyzer = Analyzer::builder()
            .config(config)
            .exclude_generated(true)
            .build()
            .unwrap();
        analyzer.load_rules(gosentry_rules::generators());
        analyzer.load_analyzers(gosentry_rules::analyzers());
        analyzer.process(&[], &[arg.clone()]).unwrap();
        let mut report = analyzer.report();
        sort_issues(&mut report.issues);
        reports.push(report);
    }
    let first: Vec<(String, String, String)> = reports[0]
        .issues
        .iter()
        .map(|i| (i.rule_id.clone(), i.file.clone(), i.line.clone()))
        .collect();
    let second: Vec<(String, String, String)> = reports[1]
        .issues
        .iter()
        .map(|i| (i.rule_id.clone(), i.file.clone(), i.line.clone()))
        .collect();
    assert_eq!(first, second);
    assert_eq!(reports[0].metrics, reports[1].metrics);
}

#[test]
fn scanning_twice_yields_the_same_issues() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.go", CREDENTIAL_FIXTURE);
    let a = scan_dir(dir.path(), Config::default());
    let b = scan_dir(dir.path(), Config::default());
    assert_eq!(rule_ids(&a.issues), rule_ids(&b.issues));
}

#[test]
fn empty_file_produces_no_issues_and_no_errors() {
    let report = scan_source("package empty\n", Config::default());
    assert!(report.issues.is_empty());
    assert!(report.errors.is_empty());
    assert_eq!(report.metrics.files, 1);
}

#[test]
fn parse_failure_is_an_error_entry_not_a_crash() {
    let report = scan_source("package broken\n\nfunc {{{\n", Config::default());
    assert_eq!(report.errors.len(), 1);
    let errors = report.errors.values().next().unwrap();
    assert!(errors[0].line >= 1);
    assert!(report.is_failing());
}

#[test]
fn severity_floor_filters_low_findings() {
    let source = r#"package main

import "os/exec"

func run(script string) {
    cmd := exec.Command("sh", "-c", script)
    _ = cmd
}
"#;
    // G204 variable case is Medium/Medium; a High floor drops it.
    let config = Config::parse("[global]\nseverity = \"high\"\n").unwrap();
    let report = scan_source(source, config);
    assert!(report.issues.is_empty());
    assert_eq!(report.metrics.found, 0);

    let report = scan_source(source, Config::default());
    assert_eq!(rule_ids(&report.issues), vec!["G204"]);
}

#[test]
fn exclude_rules_filter_prevents_registration() {
    let config = Config::parse("[global]\nexclude-rules = \"G101\"\n").unwrap();
    let report = scan_source(CREDENTIAL_FIXTURE, config);
    assert!(report.issues.is_empty());
}

#[test]
fn zero_enabled_rules_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.go", "package main\n");
    let config = Config::parse("[global]\ninclude-rules = \"G999\"\n").unwrap();
    let mut analyzer = Analyzer::builder().config(config).build().unwrap();
    analyzer.load_rules(gosentry_rules::generators());
    analyzer.load_analyzers(gosentry_rules::analyzers());
    assert!(analyzer
        .process(&[], &[dir.path().to_string_lossy().into_owned()])
        .is_err());
}

#[test]
fn issue_json_has_stable_keys() {
    let report = scan_source(CREDENTIAL_FIXTURE, Config::default());
    let json = serde_json::to_value(&report.issues[0]).unwrap();
    for key in [
        "severity",
        "confidence",
        "cwe",
        "rule_id",
        "details",
        "file",
        "code",
        "line",
        "column",
        "nosec",
        "suppressions",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(json["severity"], "HIGH");
    assert_eq!(json["cwe"]["id"], "798");
    // Encode -> decode -> encode is stable.
    let decoded: Issue = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(serde_json::to_value(&decoded).unwrap(), json);
}

#[test]
fn analyzer_issues_honor_inline_suppression() {
    let source = r#"package main

func narrow(x int64) int32 {
    return int32(x) // #nosec G115 -- truncation audited
}
"#;
    let report = scan_source(source, Config::default());
    assert!(report.issues.is_empty());

    let config = Config::parse("[global]\ntrack-suppressions = true\n").unwrap();
    let report = scan_source(source, config);
    assert_eq!(report.issues.len(), 1);
    assert!(report.issues[0].no_sec);
    assert_eq!(
        report.issues[0].suppressions[0].justification,
        "truncation audited"
    );
}

#[test]
fn guarded_conversion_scenario_from_overflow_family() {
    let guarded = r#"package main

import "math"

func narrow(x int64) int32 {
    if x >= math.MinInt32 && x <= math.MaxInt32 {
        return int32(x)
    }
    return 0
}
"#;
    let report = scan_source(guarded, Config::default());
    assert!(rule_ids(&report.issues).is_empty());

    let unguarded = r#"package main

func narrow(x int64) int32 {
    return int32(x)
}
"#;
    let report = scan_source(unguarded, Config::default());
    assert_eq!(rule_ids(&report.issues), vec!["G115"]);
}
