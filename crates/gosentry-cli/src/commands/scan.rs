//! Scan command implementation.

use anyhow::{Context as _, Result};
use gosentry_core::{sort_issues, Analyzer, Config, Report};
use std::path::PathBuf;

use crate::OutputFormat;

/// Everything the scan command needs.
pub struct ScanArgs {
    /// Path arguments, `dir/...` included.
    pub paths: Vec<String>,
    /// Output format.
    pub format: OutputFormat,
    /// Build tags.
    pub tags: Vec<String>,
    /// Directory exclusion regexes.
    pub exclude: Vec<String>,
    /// Scan `_test` files.
    pub tests: bool,
    /// Skip generated files.
    pub exclude_generated: bool,
    /// Never exit non-zero for findings.
    pub no_fail: bool,
    /// Optional configuration file.
    pub config: Option<PathBuf>,
}

/// Runs a scan and renders the report.
pub fn run(args: ScanArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => Config::default(),
    };

    let mut builder = Analyzer::builder()
        .config(config)
        .scan_tests(args.tests)
        .exclude_generated(args.exclude_generated);
    for pattern in &args.exclude {
        builder = builder.exclude_dir(pattern.clone());
    }
    let mut analyzer = builder.build().context("failed to build analyzer")?;
    analyzer.load_rules(gosentry_rules::generators());
    analyzer.load_analyzers(gosentry_rules::analyzers());

    tracing::info!(
        "scanning {:?} with {} rules",
        args.paths,
        analyzer.rule_count()
    );
    analyzer
        .process(&args.tags, &args.paths)
        .context("scan failed")?;

    let mut report = analyzer.report();
    sort_issues(&mut report.issues);

    match args.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => print_json(&report)?,
    }

    if report.is_failing() && !args.no_fail {
        std::process::exit(1);
    }
    Ok(())
}

fn print_text(report: &Report) {
    for issue in &report.issues {
        println!("{issue}");
        for line in issue.code.lines() {
            println!("    > {line}");
        }
        for suppression in &issue.suppressions {
            println!(
                "    suppressed ({:?}): {}",
                suppression.kind, suppression.justification
            );
        }
        println!();
    }
    for (file, errors) in &report.errors {
        for e in errors {
            eprintln!("error: {file}:{}:{}: {}", e.line, e.column, e.message);
        }
    }
    println!(
        "Summary: {} files, {} lines, {} nosec, {} issues",
        report.metrics.files, report.metrics.lines, report.metrics.nosec, report.metrics.found
    );
}

fn print_json(report: &Report) -> Result<()> {
    let payload = serde_json::json!({
        "issues": report.issues,
        "metrics": report.metrics,
        "errors": report.errors,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
