//! Package loading: path resolution, parsing, and error bookkeeping.
//!
//! All blocking I/O happens here, before any analysis worker starts. Parse
//! failures never abort a run; they are recorded per file and the rest of the
//! package is still analyzed.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser, Tree};
use walkdir::WalkDir;

use crate::ast;
use crate::symbols::SymbolTable;

/// One recorded load failure for a file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileError {
    /// 1-based line of the failure.
    pub line: usize,
    /// 1-based column of the failure.
    pub column: usize,
    /// Human-readable message.
    pub message: String,
}

/// Per-file error records keyed by path, ordered for stable output.
pub type ErrorMap = BTreeMap<String, Vec<FileError>>;

/// A parsed source file with its syntax tree.
#[derive(Debug)]
pub struct SourceFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Full file contents.
    pub source: String,
    tree: Tree,
}

impl SourceFile {
    /// Root node of the file's syntax tree.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Number of source lines, for metrics.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }
}

/// A loaded package: every parsed file of one directory plus its symbols.
#[derive(Debug)]
pub struct Package {
    /// Directory the package was loaded from.
    pub dir: PathBuf,
    /// Declared package name (from the first file's package clause).
    pub name: String,
    /// Parsed files in path order.
    pub files: Vec<SourceFile>,
    /// Package-level symbol table across all files.
    pub symbols: SymbolTable,
}

/// Result of a load: packages plus the non-fatal error map.
#[derive(Debug, Default)]
pub struct LoadResult {
    /// Packages ready for analysis.
    pub packages: Vec<Package>,
    /// Per-file parse failures.
    pub errors: ErrorMap,
}

/// Fatal loader failures. Everything else lands in the error map.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A user-supplied path does not exist.
    #[error("path does not exist: {0}")]
    InvalidPath(PathBuf),

    /// An exclusion pattern failed to compile.
    #[error("invalid exclude pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Regex error message.
        message: String,
    },

    /// The grammar could not be loaded into the parser.
    #[error("parser initialization failed: {0}")]
    Parser(String),
}

/// Loads packages from user-supplied path arguments.
pub struct Loader {
    exclude: Vec<Regex>,
    build_tags: Vec<String>,
    scan_tests: bool,
    exclude_generated: bool,
}

impl Loader {
    /// Creates a loader.
    ///
    /// # Errors
    ///
    /// Fails when an exclusion pattern is not a valid regex.
    pub fn new(
        exclude_patterns: &[String],
        build_tags: &[String],
        scan_tests: bool,
        exclude_generated: bool,
    ) -> Result<Self, LoadError> {
        let mut exclude = Vec::with_capacity(exclude_patterns.len());
        for pattern in exclude_patterns {
            let re = Regex::new(pattern).map_err(|e| LoadError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            exclude.push(re);
        }
        Ok(Self {
            exclude,
            build_tags: build_tags.to_vec(),
            scan_tests,
            exclude_generated,
        })
    }

    /// Resolves path arguments into parsed packages.
    ///
    /// Accepted forms: a single `.go` file, a package directory, or the
    /// recursive `dir/...` form.
    ///
    /// # Errors
    ///
    /// Only nonexistent roots and parser setup failures are fatal.
    pub fn load(&self, paths: &[String]) -> Result<LoadResult, LoadError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::language())
            .map_err(|e| LoadError::Parser(e.to_string()))?;

        let mut result = LoadResult::default();
        for arg in paths {
            if let Some(root) = arg.strip_suffix("/...") {
                let root = Path::new(root);
                if !root.exists() {
                    return Err(LoadError::InvalidPath(root.to_path_buf()));
                }
                for dir in self.package_dirs(root) {
                    self.load_dir(&mut parser, &dir, &mut result);
                }
            } else {
                let path = Path::new(arg);
                if !path.exists() {
                    return Err(LoadError::InvalidPath(path.to_path_buf()));
                }
                if path.is_dir() {
                    self.load_dir(&mut parser, path, &mut result);
                } else {
                    self.load_files(&mut parser, path.parent().unwrap_or(Path::new(".")), vec![
                        path.to_path_buf(),
                    ], &mut result);
                }
            }
        }
        Ok(result)
    }

    /// All directories under `root` that contain at least one source file.
    fn package_dirs(&self, root: &Path) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_dir()
                && !self.is_excluded(entry.path())
                && has_go_files(entry.path())
            {
                dirs.push(entry.path().to_path_buf());
            }
        }
        dirs
    }

    fn load_dir(&self, parser: &mut Parser, dir: &Path, result: &mut LoadResult) {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "go"))
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        self.load_files(parser, dir, files, result);
    }

    fn load_files(
        &self,
        parser: &mut Parser,
        dir: &Path,
        files: Vec<PathBuf>,
        result: &mut LoadResult,
    ) {
        let mut parsed = Vec::new();
        for path in files {
            if self.is_excluded(&path) {
                debug!("excluding {}", path.display());
                continue;
            }
            if !self.scan_tests && is_test_file(&path) {
                continue;
            }
            let source = match std::fs::read_to_string(&path) {
                Ok(s) => s,
                Err(e) => {
                    record_error(result, &path, 1, 1, &format!("unreadable file: {e}"));
                    continue;
                }
            };
            if self.exclude_generated && is_generated(&source) {
                debug!("skipping generated file {}", path.display());
                continue;
            }
            if !self.tags_satisfied(&source) {
                debug!("build tags exclude {}", path.display());
                continue;
            }
            let path = path.canonicalize().unwrap_or(path);
            let Some(tree) = parser.parse(&source, None) else {
                record_error(result, &path, 1, 1, "parser returned no tree");
                continue;
            };
            if tree.root_node().has_error() {
                let (line, column) = first_error_position(tree.root_node());
                warn!("syntax error in {}", path.display());
                record_error(result, &path, line, column, "syntax error");
                // Partially parsed files still feed AST-only rules.
            }
            parsed.push(SourceFile {
                path,
                source,
                tree,
            });
        }

        if parsed.is_empty() {
            return;
        }
        let name = parsed
            .iter()
            .find_map(|f| package_name(f.root(), &f.source))
            .unwrap_or_else(|| "main".to_string());
        let views: Vec<(Node<'_>, &str)> = parsed
            .iter()
            .map(|f| (f.root(), f.source.as_str()))
            .collect();
        let symbols = SymbolTable::build(&views);
        drop(views);
        result.packages.push(Package {
            dir: dir.to_path_buf(),
            name,
            files: parsed,
            symbols,
        });
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.exclude.iter().any(|re| re.is_match(&text))
    }

    /// Evaluates `//go:build` constraints against the configured tags.
    ///
    /// Only plain `tag` and `!tag` expressions are interpreted; anything more
    /// elaborate keeps the file in the scan.
    fn tags_satisfied(&self, source: &str) -> bool {
        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("package ") {
                break;
            }
            let Some(expr) = trimmed.strip_prefix("//go:build ") else {
                continue;
            };
            let expr = expr.trim();
            if let Some(tag) = expr.strip_prefix('!') {
                if simple_tag(tag) && self.build_tags.iter().any(|t| t == tag) {
                    return false;
                }
            } else if simple_tag(expr) && !self.build_tags.iter().any(|t| t == expr) {
                return false;
            }
        }
        true
    }
}

fn simple_tag(expr: &str) -> bool {
    !expr.is_empty()
        && expr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn has_go_files(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|mut entries| {
        entries.any(|e| {
            e.is_ok_and(|e| {
                e.path().extension().is_some_and(|ext| ext == "go") && e.path().is_file()
            })
        })
    })
}

fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_test.go"))
}

/// Detects the standard generated-code banner on a comment line before the
/// package clause.
fn is_generated(source: &str) -> bool {
    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("package ") {
            return false;
        }
        if trimmed.starts_with("// Code generated") && trimmed.ends_with("DO NOT EDIT.") {
            return true;
        }
    }
    false
}

fn package_name(root: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "package_clause" {
            for sub in ast::named_children(child) {
                if sub.kind() == "package_identifier" {
                    return Some(ast::text_of(sub, source).to_string());
                }
            }
        }
    }
    None
}

fn first_error_position(root: Node<'_>) -> (usize, usize) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return (ast::start_line(node), ast::start_column(node));
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    (1, 1)
}

fn record_error(result: &mut LoadResult, path: &Path, line: usize, column: usize, message: &str) {
    result
        .errors
        .entry(path.to_string_lossy().into_owned())
        .or_default()
        .push(FileError {
            line,
            column,
            message: message.to_string(),
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn loads_a_package_directory() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "main.go", "package main\n\nfunc main() {}\n");
        write(tmp.path(), "util.go", "package main\n\nfunc helper() {}\n");

        let loader = Loader::new(&[], &[], false, true).unwrap();
        let result = loader
            .load(&[tmp.path().to_string_lossy().into_owned()])
            .unwrap();

        assert_eq!(result.packages.len(), 1);
        assert_eq!(result.packages[0].files.len(), 2);
        assert_eq!(result.packages[0].name, "main");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn recursive_form_walks_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        write(tmp.path(), "a.go", "package a\n");
        write(&tmp.path().join("sub"), "b.go", "package b\n");

        let loader = Loader::new(&[], &[], false, true).unwrap();
        let arg = format!("{}/...", tmp.path().to_string_lossy());
        let result = loader.load(&[arg]).unwrap();
        assert_eq!(result.packages.len(), 2);
    }

    #[test]
    fn skips_tests_and_generated_files_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "main.go", "package main\n");
        write(tmp.path(), "main_test.go", "package main\n");
        write(
            tmp.path(),
            "gen.go",
            "// Code generated by protoc. DO NOT EDIT.\npackage main\n",
        );

        let loader = Loader::new(&[], &[], false, true).unwrap();
        let result = loader
            .load(&[tmp.path().to_string_lossy().into_owned()])
            .unwrap();
        assert_eq!(result.packages[0].files.len(), 1);
    }

    #[test]
    fn parse_failure_is_recorded_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "bad.go", "package main\n\nfunc {{{\n");
        write(tmp.path(), "good.go", "package main\n\nfunc ok() {}\n");

        let loader = Loader::new(&[], &[], false, true).unwrap();
        let result = loader
            .load(&[tmp.path().to_string_lossy().into_owned()])
            .unwrap();
        assert_eq!(result.errors.len(), 1);
        // Both files are still in the package; partial trees feed AST rules.
        assert_eq!(result.packages[0].files.len(), 2);
    }

    #[test]
    fn exclude_patterns_drop_paths() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "main.go", "package main\n");
        write(tmp.path(), "legacy.go", "package main\n");

        let loader = Loader::new(&["legacy\\.go$".to_string()], &[], false, true).unwrap();
        let result = loader
            .load(&[tmp.path().to_string_lossy().into_owned()])
            .unwrap();
        assert_eq!(result.packages[0].files.len(), 1);
    }

    #[test]
    fn build_tag_gated_file_is_skipped_without_tags() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "main.go", "package main\n");
        write(
            tmp.path(),
            "tagged.go",
            "//go:build integration\n\npackage main\n",
        );

        let loader = Loader::new(&[], &[], false, true).unwrap();
        let result = loader
            .load(&[tmp.path().to_string_lossy().into_owned()])
            .unwrap();
        assert_eq!(result.packages[0].files.len(), 1);

        let loader = Loader::new(&[], &["integration".to_string()], false, true).unwrap();
        let result = loader
            .load(&[tmp.path().to_string_lossy().into_owned()])
            .unwrap();
        assert_eq!(result.packages[0].files.len(), 2);
    }

    #[test]
    fn missing_path_is_fatal() {
        let loader = Loader::new(&[], &[], false, true).unwrap();
        assert!(loader.load(&["/nonexistent/xyz".to_string()]).is_err());
    }
}
