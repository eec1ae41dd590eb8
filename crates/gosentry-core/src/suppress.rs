//! Inline and configured suppression handling.
//!
//! Inline directives come in two spellings: the `#nosec` token (or its
//! configured alternative) anywhere in a comment, and the
//! `//gosentry:disable` form at the start of one. Both accept an optional
//! rule-ID list and a ` -- justification` tail. Attachment against AST
//! positions (same line, immediately preceding line, enclosing node) is the
//! visitor's job; this module parses and indexes the directives.

use regex::Regex;
use std::collections::HashMap;
use tree_sitter::Node;

use crate::ast;
use crate::config::{Config, ConfigError};
use crate::issue::{SuppressionInfo, SuppressionKind};

/// One parsed suppression directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Suppressed rule IDs; empty means every rule.
    pub rule_ids: Vec<String>,
    /// Justification text following `--`, possibly empty.
    pub justification: String,
    /// 1-based line the directive's comment starts on.
    pub line: usize,
    /// True when the comment is alone on its line; only such directives
    /// attach to the following line.
    pub own_line: bool,
}

impl Directive {
    /// Whether this directive silences a given rule.
    #[must_use]
    pub fn matches(&self, rule_id: &str) -> bool {
        self.rule_ids.is_empty() || self.rule_ids.iter().any(|id| id == rule_id)
    }

    /// Whether this directive silences every rule.
    #[must_use]
    pub fn matches_all(&self) -> bool {
        self.rule_ids.is_empty()
    }

    /// The provenance record attached to issues this directive suppresses.
    #[must_use]
    pub fn info(&self) -> SuppressionInfo {
        SuppressionInfo {
            kind: SuppressionKind::InSource,
            justification: self.justification.clone(),
        }
    }
}

const DISABLE_PREFIX: &str = "gosentry:disable";

/// Decides which rules are suppressed where, and with what provenance.
pub struct SuppressionEngine {
    enabled: bool,
    tag: String,
    track: bool,
    blanket: Vec<String>,
    path_rules: Vec<(Regex, Vec<String>, String)>,
}

impl SuppressionEngine {
    /// Builds the engine from configuration.
    ///
    /// # Errors
    ///
    /// An invalid per-path regex is a configuration error, fatal before any
    /// scanning starts.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mut path_rules = Vec::new();
        for entry in &config.global.suppress {
            let re = Regex::new(&entry.path).map_err(|e| ConfigError::Parse {
                message: format!("invalid suppression path regex {:?}: {e}", entry.path),
            })?;
            path_rules.push((re, entry.rules.clone(), entry.justification.clone()));
        }
        Ok(Self {
            enabled: !config.global.nosec,
            tag: config.nosec_tag().to_string(),
            track: config.global.track_suppressions,
            blanket: config.global.suppress_rules.0.clone(),
            path_rules,
        })
    }

    /// Whether suppressed findings still run their rules and carry
    /// provenance instead of being dropped.
    #[must_use]
    pub fn tracking(&self) -> bool {
        self.track
    }

    /// Parses every directive in a file, indexed by line.
    #[must_use]
    pub fn file_directives(&self, root: Node<'_>, source: &str) -> HashMap<usize, Vec<Directive>> {
        let mut out: HashMap<usize, Vec<Directive>> = HashMap::new();
        if !self.enabled {
            return out;
        }
        let lines: Vec<&str> = source.lines().collect();
        for (line, text) in ast::collect_comments(root, source) {
            let Some((rule_ids, justification)) = self.parse_comment(text) else {
                continue;
            };
            let own_line = lines
                .get(line - 1)
                .is_some_and(|l| l.trim_start().starts_with("//") || l.trim_start().starts_with("/*"));
            out.entry(line).or_default().push(Directive {
                rule_ids,
                justification,
                line,
                own_line,
            });
        }
        out
    }

    /// Extracts `(rule_ids, justification)` from one comment's text.
    #[must_use]
    pub fn parse_comment(&self, text: &str) -> Option<(Vec<String>, String)> {
        // Bidirectional control characters never participate in matching.
        let clean: String = text
            .chars()
            .filter(|c| !matches!(c, '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}'))
            .collect();

        if let Some(idx) = clean.find(&self.tag) {
            return Some(parse_directive_tail(&clean[idx + self.tag.len()..]));
        }
        let body = clean
            .trim_start()
            .trim_start_matches("//")
            .trim_start_matches("/*")
            .trim_start();
        if let Some(rest) = body.strip_prefix(DISABLE_PREFIX) {
            return Some(parse_directive_tail(rest));
        }
        None
    }

    /// External (configuration-driven) suppressions for a rule at a path.
    #[must_use]
    pub fn external_for(&self, path: &str, rule_id: &str) -> Vec<SuppressionInfo> {
        let mut out = Vec::new();
        if self.blanket.iter().any(|id| id == rule_id) {
            out.push(SuppressionInfo {
                kind: SuppressionKind::External,
                justification: String::new(),
            });
        }
        for (re, rules, justification) in &self.path_rules {
            if rules.iter().any(|id| id == rule_id) && re.is_match(path) {
                out.push(SuppressionInfo {
                    kind: SuppressionKind::External,
                    justification: justification.clone(),
                });
            }
        }
        out
    }
}

/// Parses the text following the suppression token: an optional rule-ID
/// list, then an optional ` -- justification`.
fn parse_directive_tail(rest: &str) -> (Vec<String>, String) {
    let (spec, justification) = match rest.split_once("--") {
        Some((head, tail)) => (head, tail.trim().trim_end_matches("*/").trim().to_string()),
        None => (rest, String::new()),
    };
    let mut rule_ids = Vec::new();
    for token in spec.split(|c: char| c == ',' || c.is_whitespace()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if is_rule_id(token) {
            rule_ids.push(token.to_string());
        } else {
            // Free text after the tag ends the ID list.
            break;
        }
    }
    (rule_ids, justification)
}

/// Rule IDs are one uppercase letter followed by digits.
fn is_rule_id(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.clone().next().is_some()
        && chars.all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn engine() -> SuppressionEngine {
        SuppressionEngine::new(&Config::default()).unwrap()
    }

    #[test]
    fn bare_nosec_suppresses_all() {
        let (ids, just) = engine().parse_comment("// #nosec").unwrap();
        assert!(ids.is_empty());
        assert!(just.is_empty());
    }

    #[test]
    fn scoped_nosec_with_justification() {
        let (ids, just) = engine()
            .parse_comment("// #nosec G101,G402 -- test credentials only")
            .unwrap();
        assert_eq!(ids, vec!["G101".to_string(), "G402".to_string()]);
        assert_eq!(just, "test credentials only");
    }

    #[test]
    fn disable_form_scopes_identically() {
        let (ids, just) = engine()
            .parse_comment("//gosentry:disable G304 -- audited")
            .unwrap();
        assert_eq!(ids, vec!["G304".to_string()]);
        assert_eq!(just, "audited");
    }

    #[test]
    fn free_text_ends_the_id_list() {
        let (ids, _) = engine()
            .parse_comment("// #nosec this is fine G101")
            .unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn alternative_tag_is_honored() {
        let config = Config::parse("[global]\nnosec-tag = \"#dontanalyze\"\n").unwrap();
        let engine = SuppressionEngine::new(&config).unwrap();
        assert!(engine.parse_comment("// #dontanalyze G101").is_some());
        // The default token is no longer recognized as the primary tag.
        assert!(engine.parse_comment("// #nosec G101").is_none());
    }

    #[test]
    fn bidi_controls_are_ignored_for_matching() {
        let (ids, _) = engine()
            .parse_comment("// \u{202E}#nosec\u{202C} G101")
            .unwrap_or_else(|| panic!("directive not found"));
        assert_eq!(ids, vec!["G101".to_string()]);
    }

    #[test]
    fn non_directive_comments_are_ignored() {
        assert!(engine().parse_comment("// plain comment").is_none());
        assert!(engine().parse_comment("// nosec without hash").is_none());
    }

    #[test]
    fn blanket_and_path_suppressions() {
        let config = Config::parse(
            r#"
[global]
suppress-rules = "G404"

[[global.suppress]]
path = '.*_legacy\.go'
rules = ["G101"]
justification = "migration pending"
"#,
        )
        .unwrap();
        let engine = SuppressionEngine::new(&config).unwrap();
        assert_eq!(engine.external_for("/src/a.go", "G404").len(), 1);
        assert!(engine.external_for("/src/a.go", "G101").is_empty());
        assert_eq!(engine.external_for("/src/a_legacy.go", "G101").len(), 1);
    }
}
