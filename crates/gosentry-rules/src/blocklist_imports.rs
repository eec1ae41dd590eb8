//! Rules G501-G505: blocklisted module imports.
//!
//! One rule value per blocked path, registered under its own ID so
//! suppression comments and filters can target them individually.

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{Config, Context, Rule, RuleError, Score, Verdict};
use tree_sitter::Node;

/// Flags an import of one specific blocklisted package.
pub struct BlocklistImport {
    id: &'static str,
    path: &'static str,
    what: &'static str,
}

impl BlocklistImport {
    /// G501: MD5 digest imports.
    #[must_use]
    pub fn md5(_config: &Config) -> Self {
        Self {
            id: "G501",
            path: "crypto/md5",
            what: "Blocklisted import crypto/md5: weak cryptographic primitive",
        }
    }

    /// G502: DES cipher imports.
    #[must_use]
    pub fn des(_config: &Config) -> Self {
        Self {
            id: "G502",
            path: "crypto/des",
            what: "Blocklisted import crypto/des: weak cryptographic primitive",
        }
    }

    /// G503: RC4 cipher imports.
    #[must_use]
    pub fn rc4(_config: &Config) -> Self {
        Self {
            id: "G503",
            path: "crypto/rc4",
            what: "Blocklisted import crypto/rc4: weak cryptographic primitive",
        }
    }

    /// G504: CGI handler imports.
    #[must_use]
    pub fn cgi(_config: &Config) -> Self {
        Self {
            id: "G504",
            path: "net/http/cgi",
            what: "Blocklisted import net/http/cgi: Go versions < 1.6.3 are vulnerable to Httpoxy",
        }
    }

    /// G505: SHA-1 digest imports.
    #[must_use]
    pub fn sha1(_config: &Config) -> Self {
        Self {
            id: "G505",
            path: "crypto/sha1",
            what: "Blocklisted import crypto/sha1: weak cryptographic primitive",
        }
    }
}

impl Rule for BlocklistImport {
    fn id(&self) -> &'static str {
        self.id
    }

    fn kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::ImportSpec]
    }

    fn match_node(&self, node: Node<'_>, ctx: &Context<'_>) -> Result<Verdict, RuleError> {
        let Some(path_node) = node.child_by_field_name("path") else {
            return Ok(Verdict::pass());
        };
        let Some(path) = ast::unquote_string(ctx.node_text(path_node)) else {
            return Ok(Verdict::pass());
        };
        if path == self.path {
            return Ok(Verdict::report(ctx.new_issue(
                node,
                self.id,
                self.what,
                Score::Medium,
                Score::High,
            )));
        }
        Ok(Verdict::pass())
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};

    #[test]
    fn blocked_imports_fire_under_their_own_ids() {
        let issues = scan(
            r#"package main

import (
    "crypto/md5"
    "crypto/sha1"
    "net/http/cgi"
)

func use() {
    _ = md5.Size
    _ = sha1.Size
    _ = cgi.Handler{}
}
"#,
        );
        assert_eq!(with_rule(&issues, "G501").len(), 1);
        assert_eq!(with_rule(&issues, "G505").len(), 1);
        assert_eq!(with_rule(&issues, "G504").len(), 1);
        assert!(with_rule(&issues, "G502").is_empty());
    }

    #[test]
    fn aliased_blocked_import_still_fires() {
        let issues = scan(
            "package main\n\nimport digest \"crypto/md5\"\n\nvar _ = digest.Size\n",
        );
        assert_eq!(with_rule(&issues, "G501").len(), 1);
    }
}
