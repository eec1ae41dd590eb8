//! Registration tables for the built-in rule set.

use gosentry_core::{AnalyzerInfo, RuleInfo};

use crate::{
    BindAllInterfaces, BlocklistImport, ConversionOverflow, Credentials, FileInclusion,
    SqlConcat, SqlFormat, Subprocess, TlsConfig, UrlTaint, WeakCrypto, WeakRandom,
};

/// All built-in node rules, in registration order.
///
/// The analyzer applies the configured include/exclude filters on top.
#[must_use]
pub fn generators() -> Vec<RuleInfo> {
    vec![
        RuleInfo {
            id: "G101",
            description: "Potential hardcoded credentials",
            build: |cfg| Box::new(Credentials::new(cfg)),
        },
        RuleInfo {
            id: "G102",
            description: "Binds to all network interfaces",
            build: |cfg| Box::new(BindAllInterfaces::new(cfg)),
        },
        RuleInfo {
            id: "G107",
            description: "HTTP request made with variable url",
            build: |cfg| Box::new(UrlTaint::new(cfg)),
        },
        RuleInfo {
            id: "G201",
            description: "SQL query construction using format string",
            build: |cfg| Box::new(SqlFormat::new(cfg)),
        },
        RuleInfo {
            id: "G202",
            description: "SQL query construction using string concatenation",
            build: |cfg| Box::new(SqlConcat::new(cfg)),
        },
        RuleInfo {
            id: "G204",
            description: "Subprocess launched with possible tainted input",
            build: |cfg| Box::new(Subprocess::new(cfg)),
        },
        RuleInfo {
            id: "G304",
            description: "File path provided as taint input",
            build: |cfg| Box::new(FileInclusion::new(cfg)),
        },
        RuleInfo {
            id: "G401",
            description: "Use of weak cryptographic primitive",
            build: |cfg| Box::new(WeakCrypto::new(cfg)),
        },
        RuleInfo {
            id: "G402",
            description: "Unsafe TLS configuration",
            build: |cfg| Box::new(TlsConfig::new(cfg)),
        },
        RuleInfo {
            id: "G404",
            description: "Use of weak random number generator",
            build: |cfg| Box::new(WeakRandom::new(cfg)),
        },
        RuleInfo {
            id: "G501",
            description: "Blocklisted import: crypto/md5",
            build: |cfg| Box::new(BlocklistImport::md5(cfg)),
        },
        RuleInfo {
            id: "G502",
            description: "Blocklisted import: crypto/des",
            build: |cfg| Box::new(BlocklistImport::des(cfg)),
        },
        RuleInfo {
            id: "G503",
            description: "Blocklisted import: crypto/rc4",
            build: |cfg| Box::new(BlocklistImport::rc4(cfg)),
        },
        RuleInfo {
            id: "G504",
            description: "Blocklisted import: net/http/cgi",
            build: |cfg| Box::new(BlocklistImport::cgi(cfg)),
        },
        RuleInfo {
            id: "G505",
            description: "Blocklisted import: crypto/sha1",
            build: |cfg| Box::new(BlocklistImport::sha1(cfg)),
        },
    ]
}

/// All built-in whole-package analyzers.
#[must_use]
pub fn analyzers() -> Vec<AnalyzerInfo> {
    vec![AnalyzerInfo {
        id: "G115",
        description: "Integer overflow in type conversion",
        build: |cfg| Box::new(ConversionOverflow::new(cfg)),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rule_has_a_wellformed_id() {
        for info in generators() {
            let mut chars = info.id.chars();
            assert!(chars.next().is_some_and(|c| c.is_ascii_uppercase()));
            assert!(chars.all(|c| c.is_ascii_digit()), "bad id {}", info.id);
        }
        assert_eq!(analyzers().len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<&str> = generators().iter().map(|i| i.id).collect();
        ids.extend(analyzers().iter().map(|i| i.id));
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }
}
