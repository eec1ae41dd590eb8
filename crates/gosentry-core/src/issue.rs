//! Issue model: what a rule reports and how it serializes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use once_cell::sync::Lazy;

/// Severity or confidence score attached to an issue.
///
/// Ordered: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Score {
    /// Low severity or confidence.
    #[default]
    #[serde(alias = "low")]
    Low,
    /// Medium severity or confidence.
    #[serde(alias = "medium")]
    Medium,
    /// High severity or confidence.
    #[serde(alias = "high")]
    High,
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

impl std::str::FromStr for Score {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown score {other:?}")),
        }
    }
}

/// Common Weakness Enumeration reference for an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cwe {
    /// CWE identifier, e.g. `"190"`.
    pub id: String,
    /// Canonical URL of the weakness definition.
    pub url: String,
}

impl Cwe {
    /// Builds a CWE reference from its numeric identifier.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id: id.to_string(),
            url: format!("https://cwe.mitre.org/data/definitions/{id}.html"),
        }
    }
}

/// How an issue was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuppressionKind {
    /// Suppressed by an inline comment directive.
    InSource,
    /// Suppressed by configuration (blanket or per-path).
    External,
}

/// Provenance record for one suppression of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionInfo {
    /// Where the suppression came from.
    pub kind: SuppressionKind,
    /// Free-text justification supplied with the suppression, may be empty.
    pub justification: String,
}

/// A single finding reported by a rule.
///
/// Immutable once constructed; the analyzer only attaches suppression
/// provenance before aggregating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Impact of the finding.
    pub severity: Score,
    /// How certain the rule is about the finding.
    pub confidence: Score,
    /// Weakness classification.
    pub cwe: Cwe,
    /// Stable rule identifier, e.g. `"G304"`.
    pub rule_id: String,
    /// Human-readable description of the problem.
    #[serde(rename = "details")]
    pub what: String,
    /// Absolute path of the offending file.
    pub file: String,
    /// Source excerpt covering the offending node.
    pub code: String,
    /// Line, or line range rendered `"start-end"` with `start <= end`.
    pub line: String,
    /// Column of the node start.
    pub column: String,
    /// True when an inline suppression was present on the node.
    #[serde(rename = "nosec")]
    pub no_sec: bool,
    /// Suppression provenance; empty for live issues.
    pub suppressions: Vec<SuppressionInfo>,
    /// Suggested replacement text, if a fixer produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autofix: Option<String>,
}

impl Issue {
    /// First line covered by the issue; `0` if the line field is malformed.
    #[must_use]
    pub fn line_start(&self) -> usize {
        let head = self.line.split('-').next().unwrap_or("");
        head.parse().unwrap_or(0)
    }

    /// True when the issue counts toward the failure verdict: it is neither
    /// suppressed nor below any caller-side thresholds.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.suppressions.is_empty() && !self.no_sec
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}:{}:{}] - {} ({}): {} (Confidence: {}, Severity: {})",
            self.file,
            self.line,
            self.column,
            self.rule_id,
            format_args!("CWE-{}", self.cwe.id),
            self.what,
            self.confidence,
            self.severity
        )
    }
}

/// Sorts issues the way reports render them: severity descending, then
/// description, file, and starting line.
pub fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.what.cmp(&b.what))
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line_start().cmp(&b.line_start()))
    });
}

static CWE_BY_RULE: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("G101", 798);
    m.insert("G102", 200);
    m.insert("G107", 88);
    m.insert("G115", 190);
    m.insert("G201", 89);
    m.insert("G202", 89);
    m.insert("G204", 78);
    m.insert("G304", 22);
    m.insert("G401", 328);
    m.insert("G402", 295);
    m.insert("G404", 338);
    m.insert("G501", 327);
    m.insert("G502", 327);
    m.insert("G503", 327);
    m.insert("G504", 327);
    m.insert("G505", 327);
    m
});

/// Looks up the CWE associated with a rule ID.
///
/// Unknown rules map to CWE-693 (protection mechanism failure), the same
/// fallback the report consumers expect.
#[must_use]
pub fn cwe_for_rule(rule_id: &str) -> Cwe {
    Cwe::new(CWE_BY_RULE.get(rule_id).copied().unwrap_or(693))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_issue(rule_id: &str, severity: Score, line: &str) -> Issue {
        Issue {
            severity,
            confidence: Score::High,
            cwe: cwe_for_rule(rule_id),
            rule_id: rule_id.to_string(),
            what: "test finding".to_string(),
            file: "/tmp/main.go".to_string(),
            code: "x := 1".to_string(),
            line: line.to_string(),
            column: "5".to_string(),
            no_sec: false,
            suppressions: Vec::new(),
            autofix: None,
        }
    }

    #[test]
    fn score_ordering() {
        assert!(Score::Low < Score::Medium);
        assert!(Score::Medium < Score::High);
    }

    #[test]
    fn line_start_parses_ranges() {
        assert_eq!(make_issue("G101", Score::High, "12-18").line_start(), 12);
        assert_eq!(make_issue("G101", Score::High, "7").line_start(), 7);
    }

    #[test]
    fn sort_puts_high_severity_first() {
        let mut issues = vec![
            make_issue("G404", Score::Low, "3"),
            make_issue("G101", Score::High, "9"),
        ];
        sort_issues(&mut issues);
        assert_eq!(issues[0].rule_id, "G101");
    }

    #[test]
    fn suppressed_issue_is_not_live() {
        let mut issue = make_issue("G101", Score::High, "1");
        assert!(issue.is_live());
        issue.suppressions.push(SuppressionInfo {
            kind: SuppressionKind::InSource,
            justification: "reviewed".to_string(),
        });
        assert!(!issue.is_live());
    }

    #[test]
    fn json_round_trip_is_stable() {
        let issue = make_issue("G304", Score::Medium, "4");
        let first = serde_json::to_string(&issue).unwrap();
        let back: Issue = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&back).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("\"rule_id\":\"G304\""));
        assert!(first.contains("\"details\":"));
        assert!(first.contains("\"nosec\":false"));
    }

    #[test]
    fn cwe_lookup() {
        assert_eq!(cwe_for_rule("G115").id, "190");
        assert_eq!(cwe_for_rule("G999").id, "693");
        assert!(cwe_for_rule("G304").url.ends_with("/22.html"));
    }
}
