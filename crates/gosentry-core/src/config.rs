//! Configuration types for gosentry.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::issue::Score;

/// Top-level configuration.
///
/// Two reserved regions: the `[global]` table and one `[rules.G###]` table
/// per rule. Rules define their own recognized sub-options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine-wide options.
    #[serde(default)]
    pub global: GlobalConfig,

    /// Per-rule configurations keyed by rule ID.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed. Configuration
    /// errors are the one fatal error class: the caller aborts before any
    /// scanning starts.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Whether a rule survives the include/exclude filters.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        let include = &self.global.include_rules.0;
        if !include.is_empty() && !include.iter().any(|r| r == rule_id) {
            return false;
        }
        !self.global.exclude_rules.0.iter().any(|r| r == rule_id)
    }

    /// The inline suppression token, `#nosec` unless reconfigured.
    #[must_use]
    pub fn nosec_tag(&self) -> &str {
        self.global.nosec_tag.as_deref().unwrap_or("#nosec")
    }

    /// Per-rule options table, if one was configured.
    #[must_use]
    pub fn rule_config(&self, rule_id: &str) -> Option<&RuleConfig> {
        self.rules.get(rule_id)
    }
}

/// The `[global]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    /// Disables all inline suppression when true.
    #[serde(default)]
    pub nosec: bool,

    /// Alternative inline suppression token (e.g. `#dontanalyze`).
    #[serde(default)]
    pub nosec_tag: Option<String>,

    /// Render suppressed issues in reports.
    #[serde(default)]
    pub show_ignored: bool,

    /// Audit mode: rules report conservative findings they would otherwise
    /// downgrade.
    #[serde(default)]
    pub audit: bool,

    /// Only these rule IDs run, when non-empty. CSV or array.
    #[serde(default)]
    pub include_rules: RuleList,

    /// These rule IDs never run. CSV or array.
    #[serde(default)]
    pub exclude_rules: RuleList,

    /// Run rules on suppressed nodes and attach provenance instead of
    /// discarding the issue.
    #[serde(default)]
    pub track_suppressions: bool,

    /// Worker pool size; defaults to the core count.
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Issues below this severity are dropped before reporting.
    #[serde(default)]
    pub severity: Option<Score>,

    /// Issues below this confidence are dropped before reporting.
    #[serde(default)]
    pub confidence: Option<Score>,

    /// Rule IDs suppressed everywhere, recorded as external suppressions.
    #[serde(default)]
    pub suppress_rules: RuleList,

    /// Per-path external suppressions.
    #[serde(default)]
    pub suppress: Vec<PathSuppression>,
}

/// One external suppression entry: a file-path regex and the rule IDs it
/// silences there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSuppression {
    /// Regex matched against the issue's file path.
    pub path: String,
    /// Rule IDs suppressed under matching paths.
    pub rules: Vec<String>,
    /// Recorded on the issue as the suppression justification.
    #[serde(default)]
    pub justification: String,
}

/// A rule-ID list that deserializes from either `"G101,G102"` or
/// `["G101", "G102"]`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleList(pub Vec<String>);

impl<'de> Deserialize<'de> for RuleList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Csv(String),
            List(Vec<String>),
        }
        let ids = match Raw::deserialize(deserializer)? {
            Raw::Csv(s) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            Raw::List(v) => v,
        };
        Ok(Self(ids))
    }
}

/// Per-rule options, opaque to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Rule-specific options as key-value pairs.
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl RuleConfig {
    /// Gets a boolean option with a default value.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(toml::Value::as_bool)
            .unwrap_or(default)
    }

    /// Gets an integer option with a default value.
    #[must_use]
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.options
            .get(key)
            .and_then(toml::Value::as_integer)
            .unwrap_or(default)
    }

    /// Gets a float option with a default value.
    #[must_use]
    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.options
            .get(key)
            .and_then(toml::Value::as_float)
            .unwrap_or(default)
    }

    /// Gets a string option with a default value.
    #[must_use]
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }

    /// Gets a string array option.
    #[must_use]
    pub fn get_str_array(&self, key: &str) -> Vec<String> {
        self.options
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// Every registered rule was filtered out.
    #[error("no rules enabled after applying include/exclude filters")]
    NoRulesEnabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_everything() {
        let config = Config::default();
        assert!(config.is_rule_enabled("G101"));
        assert!(!config.global.track_suppressions);
        assert_eq!(config.nosec_tag(), "#nosec");
    }

    #[test]
    fn parse_global_and_rule_tables() {
        let toml = r##"
[global]
nosec-tag = "#dontanalyze"
include-rules = "G101, G402"
track-suppressions = true
severity = "medium"

[rules.G101]
entropy-threshold = 3.5
ignore-entropy = true
"##;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.nosec_tag(), "#dontanalyze");
        assert!(config.is_rule_enabled("G101"));
        assert!(config.is_rule_enabled("G402"));
        assert!(!config.is_rule_enabled("G404"));
        assert_eq!(config.global.severity, Some(Score::Medium));

        let rule = config.rule_config("G101").unwrap();
        assert!(rule.get_bool("ignore-entropy", false));
        assert!((rule.get_float("entropy-threshold", 0.0) - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn exclude_rules_accepts_array_form() {
        let toml = r#"
[global]
exclude-rules = ["G304", "G404"]
"#;
        let config = Config::parse(toml).unwrap();
        assert!(!config.is_rule_enabled("G304"));
        assert!(config.is_rule_enabled("G101"));
    }

    #[test]
    fn path_suppressions_parse() {
        let toml = r#"
[[global.suppress]]
path = ".*_generated\\.go"
rules = ["G101"]
justification = "generated"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.global.suppress.len(), 1);
        assert_eq!(config.global.suppress[0].rules, vec!["G101".to_string()]);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(Config::parse("[global\nnope").is_err());
    }
}
