//! Package symbol tables and best-effort type inference.
//!
//! This is the intraprocedural substitute for a full type checker: enough
//! resolution for the call matcher (receiver types, qualified names) and the
//! constant resolver (cross-file constants, package vars), nothing more.

use std::collections::HashMap;
use tree_sitter::Node;

use crate::ast::{self, NodeKind};
use crate::imports::ImportTracker;

/// Location of a symbol's value expression: file index plus byte range,
/// stable across the package lifetime so the node can be re-located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolLoc {
    /// Index into the package's file list.
    pub file: usize,
    /// Start byte of the value expression.
    pub start: usize,
    /// End byte of the value expression.
    pub end: usize,
}

/// A package-level constant.
#[derive(Debug, Clone)]
pub struct ConstDef {
    /// Whether the name is exported (starts uppercase).
    pub exported: bool,
    /// Location of the initializer expression, if present.
    pub value: Option<SymbolLoc>,
}

/// A package-level variable.
#[derive(Debug, Clone)]
pub struct VarDef {
    /// Whether the name is exported (starts uppercase).
    pub exported: bool,
    /// Location of the initializer expression, if present.
    pub value: Option<SymbolLoc>,
}

/// Signature of a declared function or method.
#[derive(Debug, Clone, Default)]
pub struct FuncSig {
    /// Receiver type for methods, with pointer markers stripped.
    pub receiver: Option<String>,
    /// Declared result type names, pointer markers kept.
    pub results: Vec<String>,
}

/// Symbols declared at package level across all files of one package.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    consts: HashMap<String, ConstDef>,
    vars: HashMap<String, VarDef>,
    funcs: HashMap<String, FuncSig>,
    methods: HashMap<(String, String), FuncSig>,
}

impl SymbolTable {
    /// Builds the table from every file of a package.
    #[must_use]
    pub fn build(files: &[(Node<'_>, &str)]) -> Self {
        let mut table = Self::default();
        for (index, (root, source)) in files.iter().enumerate() {
            table.scan_file(index, *root, source);
        }
        table
    }

    fn scan_file(&mut self, file: usize, root: Node<'_>, source: &str) {
        let mut cursor = root.walk();
        for decl in root.children(&mut cursor) {
            match ast::kind_of(decl) {
                NodeKind::ConstDecl => self.scan_value_decl(file, decl, source, true),
                NodeKind::VarDecl => self.scan_value_decl(file, decl, source, false),
                NodeKind::FunctionDecl => {
                    if let Some(name) = decl.child_by_field_name("name") {
                        let sig = signature_of(decl, source, None);
                        self.funcs.insert(ast::text_of(name, source).to_string(), sig);
                    }
                }
                NodeKind::MethodDecl => {
                    let Some(name) = decl.child_by_field_name("name") else {
                        continue;
                    };
                    let receiver = receiver_type(decl, source);
                    if let Some(recv) = receiver.clone() {
                        let sig = signature_of(decl, source, Some(recv.clone()));
                        self.methods
                            .insert((recv, ast::text_of(name, source).to_string()), sig);
                    }
                }
                _ => {}
            }
        }
    }

    fn scan_value_decl(&mut self, file: usize, decl: Node<'_>, source: &str, is_const: bool) {
        let mut stack = vec![decl];
        while let Some(node) = stack.pop() {
            let kind = ast::kind_of(node);
            if kind == NodeKind::ConstSpec || kind == NodeKind::VarSpec {
                self.scan_spec(file, node, source, is_const);
                continue;
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    fn scan_spec(&mut self, file: usize, spec: Node<'_>, source: &str, is_const: bool) {
        let names: Vec<Node<'_>> = ast::named_children(spec)
            .into_iter()
            .take_while(|n| {
                matches!(ast::kind_of(*n), NodeKind::Ident | NodeKind::BlankIdent)
            })
            .collect();
        let values: Vec<Node<'_>> = spec
            .child_by_field_name("value")
            .map(ast::named_children)
            .unwrap_or_default();

        for (i, name_node) in names.iter().enumerate() {
            let name = ast::text_of(*name_node, source).to_string();
            if name == "_" {
                continue;
            }
            let exported = name.chars().next().is_some_and(char::is_uppercase);
            // Multi-value initializers from a single call are not resolvable
            // constants; only positional pairing counts.
            let value = values.get(i).map(|v| SymbolLoc {
                file,
                start: v.start_byte(),
                end: v.end_byte(),
            });
            if is_const {
                self.consts.insert(name, ConstDef { exported, value });
            } else {
                self.vars.insert(name, VarDef { exported, value });
            }
        }
    }

    /// Looks up a package-level constant.
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<&ConstDef> {
        self.consts.get(name)
    }

    /// Looks up a package-level variable.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VarDef> {
        self.vars.get(name)
    }

    /// Looks up a package-level function signature.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FuncSig> {
        self.funcs.get(name)
    }

    /// Looks up a method signature by receiver type and name.
    #[must_use]
    pub fn method(&self, receiver: &str, name: &str) -> Option<&FuncSig> {
        self.methods.get(&(receiver.to_string(), name.to_string()))
    }
}

fn signature_of(decl: Node<'_>, source: &str, receiver: Option<String>) -> FuncSig {
    let mut results = Vec::new();
    if let Some(result) = decl.child_by_field_name("result") {
        if ast::kind_of(result) == NodeKind::ParameterList {
            for param in ast::named_children(result) {
                if ast::kind_of(param) == NodeKind::ParameterDecl {
                    if let Some(ty) = param.child_by_field_name("type") {
                        results.push(ast::text_of(ty, source).to_string());
                    }
                } else {
                    results.push(ast::text_of(param, source).to_string());
                }
            }
        } else {
            results.push(ast::text_of(result, source).to_string());
        }
    }
    FuncSig { receiver, results }
}

fn receiver_type(decl: Node<'_>, source: &str) -> Option<String> {
    let receiver = decl.child_by_field_name("receiver")?;
    for param in ast::named_children(receiver) {
        if ast::kind_of(param) == NodeKind::ParameterDecl {
            if let Some(ty) = param.child_by_field_name("type") {
                let text = ast::text_of(ty, source);
                return Some(text.trim_start_matches(['*', '(']).trim_end_matches(')').to_string());
            }
        }
    }
    None
}

/// Declared result types of well-known standard-library constructors.
///
/// Used where inference needs to follow a value back through a stdlib call,
/// e.g. `db, _ := sql.Open(...)` giving `db` the type `database/sql.DB`.
#[must_use]
pub fn stdlib_func_results(pkg: &str, name: &str) -> Option<&'static [&'static str]> {
    match (pkg, name) {
        ("database/sql", "Open") => Some(&["*database/sql.DB", "error"]),
        ("database/sql", "OpenDB") => Some(&["*database/sql.DB"]),
        ("os/exec", "Command") => Some(&["*os/exec.Cmd"]),
        ("os/exec", "CommandContext") => Some(&["*os/exec.Cmd"]),
        ("os", "Open") => Some(&["*os.File", "error"]),
        ("os", "Create") => Some(&["*os.File", "error"]),
        ("net/http", "NewRequest") => Some(&["*net/http.Request", "error"]),
        ("crypto/md5", "New") => Some(&["hash.Hash"]),
        ("crypto/sha1", "New") => Some(&["hash.Hash"]),
        ("math/rand", "New") => Some(&["*math/rand.Rand"]),
        _ => None,
    }
}

/// Renders a type node to a (possibly package-qualified) type name.
///
/// Qualified types resolve their package through the file's imports, so
/// `tls.Config` under `import tls "crypto/tls"` becomes `crypto/tls.Config`.
#[must_use]
pub fn type_name(ty: Node<'_>, source: &str, imports: &ImportTracker) -> String {
    match ast::kind_of(ty) {
        NodeKind::PointerType => ty
            .named_child(0)
            .map(|inner| type_name(inner, source, imports))
            .unwrap_or_default(),
        NodeKind::QualifiedType => {
            let pkg = ty
                .child_by_field_name("package")
                .map(|n| ast::text_of(n, source))
                .unwrap_or("");
            let name = ty
                .child_by_field_name("name")
                .map(|n| ast::text_of(n, source))
                .unwrap_or("");
            let path = imports.path_for_local(pkg).unwrap_or(pkg);
            format!("{path}.{name}")
        }
        _ => ast::text_of(ty, source).to_string(),
    }
}

/// Normalizes a declared type string against the file's imports.
fn qualify(raw: &str, imports: &ImportTracker) -> String {
    let stripped = raw.trim_start_matches('*');
    if let Some((pkg, name)) = stripped.split_once('.') {
        if let Some(path) = imports.path_for_local(pkg) {
            return format!("{path}.{name}");
        }
    }
    stripped.to_string()
}

/// Infers the (qualified) type of an expression, best effort.
///
/// Returns `None` when the expression cannot be followed intraprocedurally;
/// callers treat that as "unknown receiver" and fall back conservatively.
#[must_use]
pub fn infer_expr_type(
    node: Node<'_>,
    source: &str,
    imports: &ImportTracker,
    table: &SymbolTable,
) -> Option<String> {
    match ast::kind_of(node) {
        NodeKind::ParenExpr => {
            infer_expr_type(node.named_child(0)?, source, imports, table)
        }
        NodeKind::UnaryExpr => {
            infer_expr_type(node.child_by_field_name("operand")?, source, imports, table)
        }
        NodeKind::CompositeLit => {
            let ty = node.child_by_field_name("type")?;
            Some(type_name(ty, source, imports))
        }
        NodeKind::StringLit | NodeKind::RawStringLit => Some("string".to_string()),
        NodeKind::IntLit => Some("int".to_string()),
        NodeKind::FloatLit => Some("float64".to_string()),
        NodeKind::True | NodeKind::False => Some("bool".to_string()),
        NodeKind::CallExpr => {
            let results = call_result_types(node, source, imports, table)?;
            results.first().map(|t| qualify(t, imports))
        }
        NodeKind::Ident => infer_ident_type(node, source, imports, table),
        _ => None,
    }
}

/// Result type list of a call expression, following declared or well-known
/// signatures.
fn call_result_types(
    call: Node<'_>,
    source: &str,
    imports: &ImportTracker,
    table: &SymbolTable,
) -> Option<Vec<String>> {
    let function = call.child_by_field_name("function")?;
    match ast::kind_of(function) {
        NodeKind::SelectorExpr => {
            let operand = function.child_by_field_name("operand")?;
            let field = function.child_by_field_name("field")?;
            let name = ast::text_of(field, source);
            if ast::kind_of(operand) == NodeKind::Ident {
                let local = ast::text_of(operand, source);
                if let Some(path) = imports.path_for_local(local) {
                    return stdlib_func_results(path, name)
                        .map(|r| r.iter().map(|s| (*s).to_string()).collect());
                }
            }
            // Method call: resolve the receiver's type, then its signature.
            let recv = infer_expr_type(operand, source, imports, table)?;
            let bare = recv.rsplit('.').next().unwrap_or(&recv);
            table
                .method(bare, name)
                .map(|sig| sig.results.clone())
        }
        NodeKind::Ident => {
            let name = ast::text_of(function, source);
            table.function(name).map(|sig| sig.results.clone())
        }
        _ => None,
    }
}

fn infer_ident_type(
    node: Node<'_>,
    source: &str,
    imports: &ImportTracker,
    table: &SymbolTable,
) -> Option<String> {
    let name = ast::text_of(node, source);
    let func = ast::enclosing_function(node)?;

    // Parameters first.
    if let Some(params) = func.child_by_field_name("parameters") {
        for param in ast::named_children(params) {
            if ast::kind_of(param) != NodeKind::ParameterDecl {
                continue;
            }
            let has_name = ast::named_children(param).iter().any(|c| {
                ast::kind_of(*c) == NodeKind::Ident && ast::text_of(*c, source) == name
            });
            if has_name {
                if let Some(ty) = param.child_by_field_name("type") {
                    return Some(qualify(&type_name(ty, source, imports), imports));
                }
            }
        }
    }

    // Last declaration of the name before the use site.
    let mut found: Option<String> = None;
    let mut stack = vec![func];
    while let Some(n) = stack.pop() {
        if n.start_byte() >= node.start_byte() {
            continue;
        }
        match ast::kind_of(n) {
            NodeKind::VarSpec => {
                let binds = ast::named_children(n).iter().any(|c| {
                    ast::kind_of(*c) == NodeKind::Ident && ast::text_of(*c, source) == name
                });
                if binds {
                    if let Some(ty) = n.child_by_field_name("type") {
                        found = Some(qualify(&type_name(ty, source, imports), imports));
                    } else if let Some(values) = n.child_by_field_name("value") {
                        if let Some(v) = ast::named_children(values).first() {
                            found = infer_expr_type(*v, source, imports, table);
                        }
                    }
                }
            }
            NodeKind::ShortVarDecl => {
                if let Some(ty) = short_decl_type(n, name, source, imports, table) {
                    found = Some(ty);
                }
            }
            _ => {}
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }
    found
}

/// Type bound to `name` by a `:=` declaration, honoring multi-value calls.
fn short_decl_type(
    decl: Node<'_>,
    name: &str,
    source: &str,
    imports: &ImportTracker,
    table: &SymbolTable,
) -> Option<String> {
    let left = decl.child_by_field_name("left")?;
    let right = decl.child_by_field_name("right")?;
    let targets = ast::named_children(left);
    let values = ast::named_children(right);

    let position = targets.iter().position(|t| {
        ast::kind_of(*t) == NodeKind::Ident && ast::text_of(*t, source) == name
    })?;

    if values.len() == targets.len() {
        return infer_expr_type(values[position], source, imports, table);
    }
    // Single multi-result call on the right.
    if values.len() == 1 && ast::kind_of(values[0]) == NodeKind::CallExpr {
        let results = call_result_types(values[0], source, imports, table)?;
        return results.get(position).map(|t| qualify(t, imports));
    }
    None
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
    fn builds_package_symbols() {
        let source = r#"package db

const schema = "public"

var retries = 3
var Endpoint = "db.internal"

func Connect(dsn string) (*Conn, error) { return nil, nil }

func (c *Conn) Close() error { return nil }
"#;
        let tree = parse(source);
        let table = SymbolTable::build(&[(tree.root_node(), source)]);

        let schema = table.constant("schema").unwrap();
        assert!(!schema.exported);
        assert!(schema.value.is_some());

        assert!(table.variable("Endpoint").unwrap().exported);
        assert_eq!(table.function("Connect").unwrap().results.len(), 2);
        assert!(table.method("Conn", "Close").is_some());
    }

    #[test]
    fn infers_type_through_stdlib_open() {
        let source = r#"package main

import "database/sql"

func run() {
    db, err := sql.Open("postgres", "dsn")
    _ = err
    db.Ping()
}
"#;
        let tree = parse(source);
        let table = SymbolTable::build(&[(tree.root_node(), source)]);
        let imports = ImportTracker::from_file(tree.root_node(), source);

        // Find the `db` identifier inside db.Ping().
        let mut target = None;
        let mut stack = vec![tree.root_node()];
        while let Some(n) = stack.pop() {
            if n.kind() == "identifier"
                && ast::text_of(n, source) == "db"
                && n.parent().is_some_and(|p| p.kind() == "selector_expression")
            {
                target = Some(n);
            }
            let mut cursor = n.walk();
            for child in n.children(&mut cursor) {
                stack.push(child);
            }
        }
        let ty = infer_expr_type(target.unwrap(), source, &imports, &table);
        assert_eq!(ty.as_deref(), Some("database/sql.DB"));
    }

    #[test]
    fn infers_composite_literal_type() {
        let source = r#"package main

import "crypto/tls"

func run() {
    c := &tls.Config{}
    c.Clone()
}
"#;
        let tree = parse(source);
        let table = SymbolTable::build(&[(tree.root_node(), source)]);
        let imports = ImportTracker::from_file(tree.root_node(), source);

        let mut target = None;
        let mut stack = vec![tree.root_node()];
        while let Some(n) = stack.pop() {
            if n.kind() == "identifier"
                && ast::text_of(n, source) == "c"
                && n.parent().is_some_and(|p| p.kind() == "selector_expression")
            {
                target = Some(n);
            }
            let mut cursor = n.walk();
            for child in n.children(&mut cursor) {
                stack.push(child);
            }
        }
        let ty = infer_expr_type(target.unwrap(), source, &imports, &table);
        assert_eq!(ty.as_deref(), Some("crypto/tls.Config"));
    }
}
