//! # gosentry-rules
//!
//! Built-in security rules for gosentry.
//!
//! ## Available rules
//!
//! | ID | Name | Description |
//! |------|------|-------------|
//! | G101 | `hardcoded-credentials` | Hardcoded credential assignments and comparisons |
//! | G102 | `bind-all-interfaces` | Network listeners bound to all interfaces |
//! | G107 | `url-taint` | HTTP requests with non-constant URLs |
//! | G115 | `conversion-overflow` | Integer conversions that may overflow (analyzer) |
//! | G201 | `sql-format` | SQL built with format strings |
//! | G202 | `sql-concat` | SQL built with string concatenation |
//! | G204 | `subprocess` | Subprocesses launched with non-constant arguments |
//! | G304 | `file-inclusion` | File access through taint input |
//! | G401 | `weak-crypto` | Weak cryptographic primitives |
//! | G402 | `tls-config` | Unsafe TLS configuration |
//! | G404 | `weak-random` | Non-cryptographic random sources |
//! | G501-G505 | `blocklist-imports` | Blocklisted module imports |
//!
//! ## Usage
//!
//! ```ignore
//! use gosentry_core::{Analyzer, Config};
//!
//! let mut analyzer = Analyzer::builder().config(Config::default()).build()?;
//! analyzer.load_rules(gosentry_rules::generators());
//! analyzer.load_analyzers(gosentry_rules::analyzers());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bind_all_interfaces;
mod blocklist_imports;
mod conversion_overflow;
mod file_inclusion;
mod hardcoded_credentials;
mod registry;
mod sql;
mod subprocess;
mod tls_config;
mod url_taint;
mod weak_crypto;
mod weak_random;

pub use bind_all_interfaces::BindAllInterfaces;
pub use blocklist_imports::BlocklistImport;
pub use conversion_overflow::ConversionOverflow;
pub use file_inclusion::FileInclusion;
pub use hardcoded_credentials::Credentials;
pub use registry::{analyzers, generators};
pub use sql::{SqlConcat, SqlFormat};
pub use subprocess::Subprocess;
pub use tls_config::TlsConfig;
pub use url_taint::UrlTaint;
pub use weak_crypto::WeakCrypto;
pub use weak_random::WeakRandom;

/// Re-export core types for convenience.
pub use gosentry_core::{Issue, Rule, Score};

#[cfg(test)]
pub(crate) mod testutil {
    use gosentry_core::{Analyzer, Config, Issue};

    /// Scans a single in-memory file with every built-in rule and analyzer.
    pub fn scan(source: &str) -> Vec<Issue> {
        scan_with(source, Config::default())
    }

    /// Scans with a specific configuration.
    pub fn scan_with(source: &str, config: Config) -> Vec<Issue> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.go"), source).unwrap();

        let mut analyzer = Analyzer::builder()
            .config(config)
            .exclude_generated(true)
            .build()
            .unwrap();
        analyzer.load_rules(crate::generators());
        analyzer.load_analyzers(crate::analyzers());
        analyzer
            .process(&[], &[dir.path().to_string_lossy().into_owned()])
            .unwrap();
        analyzer.report().issues
    }

    /// Issues with a given rule ID.
    pub fn with_rule<'a>(issues: &'a [Issue], rule_id: &str) -> Vec<&'a Issue> {
        issues.iter().filter(|i| i.rule_id == rule_id).collect()
    }
}
