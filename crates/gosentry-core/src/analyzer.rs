//! Analyzer driver: per-package pipeline, concurrency, and aggregation.

use rayon::prelude::*;
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::context::{Context, PackageState};
use crate::issue::Issue;
use crate::loader::{ErrorMap, LoadError, Loader, Package};
use crate::rule::{AnalyzerBox, AnalyzerInfo, RuleInfo, RuleRegistry};
use crate::suppress::SuppressionEngine;
use crate::visitor::{self, walk_file};

/// Aggregate counters for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    /// Files parsed and walked.
    pub files: usize,
    /// Source lines across those files.
    pub lines: usize,
    /// Inline suppressions honored.
    pub nosec: usize,
    /// True issues: not suppressed, above thresholds.
    pub found: usize,
}

/// Everything a scan produced.
#[derive(Debug, Default)]
pub struct Report {
    /// All surviving issues, unsorted; reporters order them.
    pub issues: Vec<Issue>,
    /// Aggregate counters.
    pub metrics: Metrics,
    /// Per-file load failures.
    pub errors: ErrorMap,
}

impl Report {
    /// True when the scan should fail the process: any true issue or any
    /// recorded error.
    #[must_use]
    pub fn is_failing(&self) -> bool {
        self.metrics.found > 0 || !self.errors.is_empty()
    }
}

/// Fatal analyzer failures. Everything recoverable lands in the report.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Invalid configuration, including zero enabled rules.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fatal loader failure.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Worker pool could not be created.
    #[error("worker pool: {0}")]
    Pool(String),
}

/// Builder for [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    config: Config,
    exclude_dirs: Vec<String>,
    scan_tests: bool,
    exclude_generated: bool,
}

impl AnalyzerBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scan configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Adds a directory-exclusion regex.
    #[must_use]
    pub fn exclude_dir(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_dirs.push(pattern.into());
        self
    }

    /// Includes `_test` files in the scan.
    #[must_use]
    pub fn scan_tests(mut self, scan: bool) -> Self {
        self.scan_tests = scan;
        self
    }

    /// Skips generated files (detected by the standard banner).
    #[must_use]
    pub fn exclude_generated(mut self, exclude: bool) -> Self {
        self.exclude_generated = exclude;
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration (bad suppression regexes).
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let suppression = SuppressionEngine::new(&self.config)?;
        Ok(Analyzer {
            config: self.config,
            exclude_dirs: self.exclude_dirs,
            scan_tests: self.scan_tests,
            exclude_generated: self.exclude_generated,
            registry: RuleRegistry::new(),
            analyzers: Vec::new(),
            suppression,
            issues: Vec::new(),
            metrics: Metrics::default(),
            errors: ErrorMap::new(),
        })
    }
}

/// Drives the per-package pipeline and owns the aggregate results.
pub struct Analyzer {
    config: Config,
    exclude_dirs: Vec<String>,
    scan_tests: bool,
    exclude_generated: bool,
    registry: RuleRegistry,
    analyzers: Vec<AnalyzerBox>,
    suppression: SuppressionEngine,
    issues: Vec<Issue>,
    metrics: Metrics,
    errors: ErrorMap,
}

impl Analyzer {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Registers node rules, honoring the include/exclude filters.
    pub fn load_rules(&mut self, infos: Vec<RuleInfo>) {
        for info in infos {
            if !self.config.is_rule_enabled(info.id) {
                debug!("rule {} filtered out", info.id);
                continue;
            }
            self.registry.register((info.build)(&self.config));
        }
    }

    /// Registers whole-package analyzers, honoring the same filters.
    pub fn load_analyzers(&mut self, infos: Vec<AnalyzerInfo>) {
        for info in infos {
            if !self.config.is_rule_enabled(info.id) {
                debug!("analyzer {} filtered out", info.id);
                continue;
            }
            self.analyzers.push((info.build)(&self.config));
        }
    }

    /// Number of registered rules and analyzers.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.registry.len() + self.analyzers.len()
    }

    /// Loads and scans every package under the given path arguments.
    ///
    /// Package-level parallelism on a pool of `concurrency` workers; each
    /// worker owns its context, results merge under one lock. A loader
    /// failure aborts before any worker starts.
    ///
    /// # Errors
    ///
    /// Fatal conditions only: zero enabled rules, invalid paths or exclusion
    /// patterns, pool construction failure.
    pub fn process(&mut self, build_tags: &[String], paths: &[String]) -> Result<(), AnalyzerError> {
        if self.registry.is_empty() && self.analyzers.is_empty() {
            return Err(ConfigError::NoRulesEnabled.into());
        }

        let loader = Loader::new(
            &self.exclude_dirs,
            build_tags,
            self.scan_tests,
            self.exclude_generated,
        )?;
        let loaded = loader.load(paths)?;
        self.errors.extend(loaded.errors);

        let workers = self
            .config
            .global
            .concurrency
            .unwrap_or_else(num_cpus::get)
            .max(1);
        info!(
            packages = loaded.packages.len(),
            workers, "starting analysis"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| AnalyzerError::Pool(e.to_string()))?;

        let sink: Mutex<(Vec<Issue>, Metrics)> = Mutex::new((Vec::new(), Metrics::default()));
        let this: &Analyzer = &*self;
        pool.install(|| {
            loaded.packages.par_iter().for_each(|pkg| {
                let (issues, metrics) = this.check_package(pkg);
                let mut guard = sink
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                guard.0.extend(issues);
                guard.1.files += metrics.files;
                guard.1.lines += metrics.lines;
                guard.1.nosec += metrics.nosec;
            });
        });

        let (issues, metrics) = sink
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        self.issues.extend(issues);
        self.metrics.files += metrics.files;
        self.metrics.lines += metrics.lines;
        self.metrics.nosec += metrics.nosec;
        Ok(())
    }

    /// Walks one package: every file through the visitor, then the
    /// whole-package analyzers. Context and passed values live exactly this
    /// long.
    fn check_package(&self, pkg: &Package) -> (Vec<Issue>, Metrics) {
        debug!("checking package {}", pkg.dir.display());
        let state = PackageState::new();
        let mut issues = Vec::new();
        let mut metrics = Metrics {
            files: pkg.files.len(),
            ..Metrics::default()
        };

        for index in 0..pkg.files.len() {
            let ctx = Context::new(pkg, index, &self.config, &state);
            metrics.lines += ctx.file.line_count();
            let report = walk_file(&self.registry, &self.suppression, &ctx);
            metrics.nosec += report.nosec;
            issues.extend(report.issues);
        }

        for index in 0..pkg.files.len() {
            let ctx = Context::new(pkg, index, &self.config, &state);
            for analyzer in &self.analyzers {
                match analyzer.analyze(&ctx) {
                    Ok(found) => {
                        for issue in found {
                            match visitor::suppress_analyzer_issue(
                                issue,
                                &self.suppression,
                                &ctx,
                            ) {
                                Some(issue) => issues.push(issue),
                                None => metrics.nosec += 1,
                            }
                        }
                    }
                    Err(e) => info!(
                        analyzer = analyzer.id(),
                        file = %ctx.file.path.display(),
                        "analyzer failed: {e}"
                    ),
                }
            }
        }
        (issues, metrics)
    }

    /// Final results: issues filtered by the severity/confidence floors,
    /// metrics with the true-issue count, and the error map.
    #[must_use]
    pub fn report(&self) -> Report {
        let severity_floor = self.config.global.severity.unwrap_or_default();
        let confidence_floor = self.config.global.confidence.unwrap_or_default();
        let issues: Vec<Issue> = self
            .issues
            .iter()
            .filter(|i| i.severity >= severity_floor && i.confidence >= confidence_floor)
            .cloned()
            .collect();
        let mut metrics = self.metrics;
        metrics.found = issues.iter().filter(|i| i.is_live()).count();
        Report {
            issues,
            metrics,
            errors: self.errors.clone(),
        }
    }
}
