//! Per-file import tracking.
//!
//! Imports are file-scoped in the analyzed language, so the tracker is
//! rebuilt for every file before its traversal starts.

use std::collections::HashMap;
use tree_sitter::Node;

use crate::ast;

/// One import binding in the current file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Canonical package path, e.g. `"net/http"`.
    pub path: String,
    /// Local name the package is bound to in this file.
    pub local: String,
    /// True when the local name was explicitly aliased.
    pub aliased: bool,
    /// True for dot imports (`import . "pkg"`).
    pub dot: bool,
    /// True for blank imports (`import _ "pkg"`), kept for initializers only.
    pub blank: bool,
}

/// Recognized imports of a single file.
#[derive(Debug, Clone, Default)]
pub struct ImportTracker {
    records: Vec<ImportRecord>,
    by_local: HashMap<String, String>,
}

impl ImportTracker {
    /// Builds a tracker by scanning a file's import declarations.
    #[must_use]
    pub fn from_file(root: Node<'_>, source: &str) -> Self {
        let mut tracker = Self::default();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() != "import_declaration" {
                continue;
            }
            let mut decl_cursor = child.walk();
            for entry in child.children(&mut decl_cursor) {
                match entry.kind() {
                    "import_spec" => tracker.record_spec(entry, source),
                    "import_spec_list" => {
                        let mut list_cursor = entry.walk();
                        for spec in entry.children(&mut list_cursor) {
                            if spec.kind() == "import_spec" {
                                tracker.record_spec(spec, source);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        tracker
    }

    /// Records one import spec node.
    pub fn record_spec(&mut self, spec: Node<'_>, source: &str) {
        let Some(path_node) = spec.child_by_field_name("path") else {
            return;
        };
        let Some(path) = ast::unquote_string(ast::text_of(path_node, source)) else {
            return;
        };

        let mut record = ImportRecord {
            local: default_local_name(&path).to_string(),
            path,
            aliased: false,
            dot: false,
            blank: false,
        };
        if let Some(name) = spec.child_by_field_name("name") {
            match name.kind() {
                "dot" => record.dot = true,
                "blank_identifier" => record.blank = true,
                _ => {
                    record.local = ast::text_of(name, source).to_string();
                    record.aliased = true;
                }
            }
        }

        if !record.dot && !record.blank {
            self.by_local
                .insert(record.local.clone(), record.path.clone());
        }
        self.records.push(record);
    }

    /// Canonical path bound to a local name, if any.
    #[must_use]
    pub fn path_for_local(&self, local: &str) -> Option<&str> {
        self.by_local.get(local).map(String::as_str)
    }

    /// Paths of all dot imports in this file.
    #[must_use]
    pub fn dot_imports(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.dot)
            .map(|r| r.path.as_str())
            .collect()
    }

    /// Whether a package path is imported at all (any binding form).
    #[must_use]
    pub fn is_imported(&self, path: &str) -> bool {
        self.records.iter().any(|r| r.path == path)
    }

    /// All import records in declaration order.
    #[must_use]
    pub fn records(&self) -> &[ImportRecord] {
        &self.records
    }
}

/// Default local name of an import path: its last segment.
#[must_use]
pub fn default_local_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_go::language())
            .expect("grammar");
        parser.parse(source, None).expect("parse")
    }

    #[test]
    fn tracks_plain_alias_dot_and_blank_imports() {
        let source = r#"package main

import (
    "net/http"
    chi "github.com/go-chi/chi/v5"
    . "math"
    _ "embed"
)
"#;
        let tree = parse(source);
        let tracker = ImportTracker::from_file(tree.root_node(), source);

        assert_eq!(tracker.path_for_local("http"), Some("net/http"));
        assert_eq!(
            tracker.path_for_local("chi"),
            Some("github.com/go-chi/chi/v5")
        );
        assert_eq!(tracker.dot_imports(), vec!["math"]);
        assert!(tracker.is_imported("embed"));
        assert_eq!(tracker.path_for_local("embed"), None);
        assert_eq!(tracker.records().len(), 4);
    }

    #[test]
    fn single_import_form() {
        let source = "package main\n\nimport \"os\"\n";
        let tree = parse(source);
        let tracker = ImportTracker::from_file(tree.root_node(), source);
        assert_eq!(tracker.path_for_local("os"), Some("os"));
    }
}
