//! # gosentry-core
//!
//! Core engine for gosentry, a static security analyzer for Go-shaped
//! source trees. This crate provides:
//!
//! - [`Loader`] to resolve path arguments into parsed, symbol-indexed
//!   packages
//! - [`Analyzer`] to drive per-package scans on a worker pool
//! - [`Rule`] and [`PackageAnalyzer`] traits for detection logic
//! - The analysis substrate rules share: constant resolution, call
//!   matching, SSA-based integer ranges and taint tracking
//! - The suppression engine honoring `#nosec`-style inline directives and
//!   configured suppressions
//!
//! ## Example
//!
//! ```ignore
//! use gosentry_core::{Analyzer, Config};
//!
//! let mut analyzer = Analyzer::builder()
//!     .config(Config::default())
//!     .exclude_generated(true)
//!     .build()?;
//! analyzer.load_rules(gosentry_rules::generators());
//! analyzer.process(&[], &["./...".to_string()])?;
//! let report = analyzer.report();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analyzer;
pub mod ast;
pub mod calls;
pub mod config;
pub mod context;
pub mod imports;
pub mod issue;
pub mod loader;
pub mod resolve;
pub mod rule;
pub mod ssa;
pub mod suppress;
pub mod symbols;
pub mod visitor;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError, Metrics, Report};
pub use ast::NodeKind;
pub use calls::CallList;
pub use config::{Config, ConfigError, GlobalConfig, RuleConfig};
pub use context::{Context, PackageState, PassedValue};
pub use imports::{ImportRecord, ImportTracker};
pub use issue::{cwe_for_rule, sort_issues, Cwe, Issue, Score, SuppressionInfo, SuppressionKind};
pub use loader::{ErrorMap, FileError, LoadError, Loader, Package, SourceFile};
pub use resolve::{ConstValue, Resolution};
pub use rule::{
    AnalyzerBox, AnalyzerInfo, PackageAnalyzer, Rule, RuleBox, RuleError, RuleInfo, Verdict, Walk,
};
pub use ssa::{FuncAnalysis, TaintFact, TaintKind};
pub use suppress::SuppressionEngine;
