//! Intraprocedural constant resolution.
//!
//! Given an expression, proves its compile-time string/integer/bool value
//! when assignments, imports, and cross-file identifiers allow it. Rules use
//! this to tell hardcoded constants from values an attacker might steer.

use std::collections::BTreeSet;
use tree_sitter::Node;

use crate::ast::{self, NodeKind};
use crate::context::Context;
use crate::imports::ImportTracker;
use crate::loader::Package;
use crate::ssa::taint::{self, TaintKind};

/// A proved compile-time value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// String constant.
    Str(String),
    /// Integer constant.
    Int(i128),
    /// Boolean constant.
    Bool(bool),
    /// Floating-point constant.
    Float(f64),
}

impl ConstValue {
    /// String payload, if this is a string constant.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if this is an integer constant.
    #[must_use]
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean payload, if this is a boolean constant.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Outcome of a resolution attempt.
///
/// `Unknown` carries the taint hints derived from where the expression's
/// value originates, so callers can grade their confidence.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The expression provably evaluates to this value.
    Known(ConstValue),
    /// Not provable; the set holds recognized taint origins found inside.
    Unknown(BTreeSet<TaintKind>),
}

impl Resolution {
    /// True when the value was proved.
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

const MAX_DEPTH: usize = 40;

/// Resolves an expression within the current file of a context.
#[must_use]
pub fn resolve(node: Node<'_>, ctx: &Context<'_>) -> Resolution {
    let scope = Scope {
        pkg: ctx.pkg,
        file_index: ctx.file_index,
        imports: ctx.imports.clone(),
    };
    match resolve_at(&scope, node, 0) {
        Some(value) => Resolution::Known(value),
        None => Resolution::Unknown(hints(&scope, node)),
    }
}

/// Convenience: the string value of an expression, if proved.
#[must_use]
pub fn resolve_str(node: Node<'_>, ctx: &Context<'_>) -> Option<String> {
    match resolve(node, ctx) {
        Resolution::Known(ConstValue::Str(s)) => Some(s),
        _ => None,
    }
}

/// Convenience: the integer value of an expression, if proved.
#[must_use]
pub fn resolve_int(node: Node<'_>, ctx: &Context<'_>) -> Option<i128> {
    match resolve(node, ctx) {
        Resolution::Known(ConstValue::Int(i)) => Some(i),
        _ => None,
    }
}

/// Convenience: the boolean value of an expression, if proved.
#[must_use]
pub fn resolve_bool(node: Node<'_>, ctx: &Context<'_>) -> Option<bool> {
    match resolve(node, ctx) {
        Resolution::Known(ConstValue::Bool(b)) => Some(b),
        _ => None,
    }
}

/// Resolution scope: which file of which package identifiers resolve in.
struct Scope<'p> {
    pkg: &'p Package,
    file_index: usize,
    imports: ImportTracker,
}

impl Scope<'_> {
    fn source(&self) -> &str {
        &self.pkg.files[self.file_index].source
    }

    fn text(&self, node: Node<'_>) -> &str {
        ast::text_of(node, self.source())
    }
}

fn resolve_at(scope: &Scope<'_>, node: Node<'_>, depth: usize) -> Option<ConstValue> {
    if depth > MAX_DEPTH {
        return None;
    }
    match ast::kind_of(node) {
        NodeKind::StringLit | NodeKind::RawStringLit => {
            ast::unquote_string(scope.text(node)).map(ConstValue::Str)
        }
        NodeKind::IntLit => ast::parse_int_literal(scope.text(node)).map(ConstValue::Int),
        NodeKind::FloatLit => scope.text(node).parse().ok().map(ConstValue::Float),
        NodeKind::RuneLit => rune_value(scope.text(node)).map(ConstValue::Int),
        NodeKind::True => Some(ConstValue::Bool(true)),
        NodeKind::False => Some(ConstValue::Bool(false)),
        NodeKind::ParenExpr | NodeKind::LiteralElement => {
            resolve_at(scope, node.named_child(0)?, depth + 1)
        }
        NodeKind::UnaryExpr => resolve_unary(scope, node, depth),
        NodeKind::BinaryExpr => resolve_binary(scope, node, depth),
        NodeKind::Ident => resolve_ident(scope, node, depth),
        NodeKind::SelectorExpr => resolve_selector(scope, node, depth),
        NodeKind::CallExpr => resolve_conversion_call(scope, node, depth),
        NodeKind::TypeConvExpr => {
            // []byte("...") and friends: value passes through unchanged.
            resolve_at(scope, node.child_by_field_name("operand")?, depth + 1)
        }
        _ => None,
    }
}

fn rune_value(text: &str) -> Option<i128> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let decoded = ast::unquote_string(&format!("\"{inner}\""))?;
    let mut chars = decoded.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c as i128)
}

fn resolve_unary(scope: &Scope<'_>, node: Node<'_>, depth: usize) -> Option<ConstValue> {
    let op = scope.text(node.child_by_field_name("operator")?);
    let operand = resolve_at(scope, node.child_by_field_name("operand")?, depth + 1)?;
    match (op, operand) {
        ("-", ConstValue::Int(i)) => Some(ConstValue::Int(-i)),
        ("-", ConstValue::Float(f)) => Some(ConstValue::Float(-f)),
        ("!", ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
        ("^", ConstValue::Int(i)) => Some(ConstValue::Int(!i)),
        ("+", v @ (ConstValue::Int(_) | ConstValue::Float(_))) => Some(v),
        _ => None,
    }
}

fn resolve_binary(scope: &Scope<'_>, node: Node<'_>, depth: usize) -> Option<ConstValue> {
    let op = scope.text(node.child_by_field_name("operator")?).to_string();
    let lhs = resolve_at(scope, node.child_by_field_name("left")?, depth + 1)?;
    let rhs = resolve_at(scope, node.child_by_field_name("right")?, depth + 1)?;
    match (lhs, rhs) {
        (ConstValue::Str(a), ConstValue::Str(b)) if op == "+" => {
            Some(ConstValue::Str(format!("{a}{b}")))
        }
        (ConstValue::Int(a), ConstValue::Int(b)) => {
            let v = match op.as_str() {
                "+" => a.checked_add(b)?,
                "-" => a.checked_sub(b)?,
                "*" => a.checked_mul(b)?,
                "/" => a.checked_div(b)?,
                "%" => a.checked_rem(b)?,
                "&" => a & b,
                "|" => a | b,
                "^" => a ^ b,
                "<<" => a.checked_shl(u32::try_from(b).ok()?)?,
                ">>" => a.checked_shr(u32::try_from(b).ok()?)?,
                _ => return None,
            };
            Some(ConstValue::Int(v))
        }
        _ => None,
    }
}

fn resolve_ident(scope: &Scope<'_>, node: Node<'_>, depth: usize) -> Option<ConstValue> {
    let name = scope.text(node).to_string();

    if let Some(func) = ast::enclosing_function(node) {
        match resolve_local(scope, func, &name, node, depth) {
            LocalLookup::Value(v) => return Some(v),
            LocalLookup::NotConstant => return None,
            LocalLookup::NoBinding => {}
        }
    }

    // Package-level constants resolve across files of the same package.
    if let Some(def) = scope.pkg.symbols.constant(&name) {
        return resolve_symbol(scope, def.value?, depth);
    }
    // Package vars only when unexported and constant-initialized; exported
    // vars can be mutated by other packages.
    if let Some(def) = scope.pkg.symbols.variable(&name) {
        if !def.exported {
            return resolve_symbol(scope, def.value?, depth);
        }
    }
    None
}

fn resolve_symbol(
    scope: &Scope<'_>,
    loc: crate::symbols::SymbolLoc,
    depth: usize,
) -> Option<ConstValue> {
    let file = scope.pkg.files.get(loc.file)?;
    let node = file
        .root()
        .named_descendant_for_byte_range(loc.start, loc.end)?;
    if loc.file == scope.file_index {
        return resolve_at(scope, node, depth + 1);
    }
    let other = Scope {
        pkg: scope.pkg,
        file_index: loc.file,
        imports: ImportTracker::from_file(file.root(), &file.source),
    };
    resolve_at(&other, node, depth + 1)
}

enum LocalLookup {
    /// The last reachable write binds a proved constant.
    Value(ConstValue),
    /// The name is function-local but not provably constant.
    NotConstant,
    /// No function-local binding; fall through to package scope.
    NoBinding,
}

/// Last-write-wins scan of the enclosing function.
///
/// The name resolves only when the last write before the use site binds a
/// resolvable constant and the variable's address is never taken.
fn resolve_local(
    scope: &Scope<'_>,
    func: Node<'_>,
    name: &str,
    use_node: Node<'_>,
    depth: usize,
) -> LocalLookup {
    let source = scope.source();
    let use_start = use_node.start_byte();

    let mut writes: Vec<(usize, Option<Node<'_>>)> = Vec::new();

    let mut stack = vec![func];
    while let Some(n) = stack.pop() {
        match ast::kind_of(n) {
            NodeKind::UnaryExpr => {
                let op = n
                    .child_by_field_name("operator")
                    .map(|o| ast::text_of(o, source));
                let operand = n.child_by_field_name("operand");
                if op == Some("&")
                    && operand.is_some_and(|o| {
                        ast::kind_of(o) == NodeKind::Ident && ast::text_of(o, source) == name
                    })
                {
                    return LocalLookup::NotConstant;
                }
            }
            NodeKind::ShortVarDecl | NodeKind::AssignStmt => {
                if let Some(write) = write_of(n, name, source) {
                    writes.push((n.start_byte(), write));
                }
            }
            NodeKind::VarSpec => {
                let binds = ast::named_children(n).iter().any(|c| {
                    ast::kind_of(*c) == NodeKind::Ident && ast::text_of(*c, source) == name
                });
                if binds {
                    writes.push((n.start_byte(), var_spec_value(n, name, source)));
                }
            }
            NodeKind::IncStmt | NodeKind::DecStmt => {
                let touches = ast::named_children(n).iter().any(|c| {
                    ast::kind_of(*c) == NodeKind::Ident && ast::text_of(*c, source) == name
                });
                if touches {
                    return LocalLookup::NotConstant;
                }
            }
            NodeKind::RangeClause => {
                if let Some(left) = n.child_by_field_name("left") {
                    let binds = ast::named_children(left).iter().any(|c| {
                        ast::kind_of(*c) == NodeKind::Ident && ast::text_of(*c, source) == name
                    });
                    if binds {
                        return LocalLookup::NotConstant;
                    }
                }
            }
            _ => {}
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }

    if writes.is_empty() {
        return LocalLookup::NoBinding;
    }
    // Every reachable write must bind a resolvable constant; the value seen
    // at the use site is the last such write before it.
    let mut last: Option<(usize, ConstValue)> = None;
    for (pos, value) in writes {
        let Some(value) = value else {
            return LocalLookup::NotConstant;
        };
        let Some(resolved) = resolve_at(scope, value, depth + 1) else {
            return LocalLookup::NotConstant;
        };
        if pos < use_start && last.as_ref().is_none_or(|(p, _)| pos > *p) {
            last = Some((pos, resolved));
        }
    }
    match last {
        Some((_, value)) => LocalLookup::Value(value),
        None => LocalLookup::NotConstant,
    }
}

/// The value expression a `:=` or `=` statement assigns to `name`, if the
/// write is a plain positional assignment. `None` means an unresolvable
/// write (compound operator, arity mismatch).
fn write_of<'t>(stmt: Node<'t>, name: &str, source: &str) -> Option<Option<Node<'t>>> {
    let left = stmt.child_by_field_name("left")?;
    let targets = ast::named_children(left);
    let position = targets.iter().position(|t| {
        ast::kind_of(*t) == NodeKind::Ident && ast::text_of(*t, source) == name
    })?;

    if let Some(op) = stmt.child_by_field_name("operator") {
        let op_text = ast::text_of(op, source);
        if op_text != "=" && op_text != ":=" {
            return Some(None);
        }
    }
    let right = stmt.child_by_field_name("right")?;
    let values = ast::named_children(right);
    if values.len() == targets.len() {
        Some(Some(values[position]))
    } else {
        Some(None)
    }
}

fn var_spec_value<'t>(spec: Node<'t>, name: &str, source: &str) -> Option<Node<'t>> {
    let names: Vec<Node<'t>> = ast::named_children(spec)
        .into_iter()
        .take_while(|n| matches!(ast::kind_of(*n), NodeKind::Ident | NodeKind::BlankIdent))
        .collect();
    let position = names
        .iter()
        .position(|n| ast::text_of(*n, source) == name)?;
    let values = spec.child_by_field_name("value")?;
    let values = ast::named_children(values);
    if values.len() == names.len() {
        values.get(position).copied()
    } else {
        None
    }
}

fn resolve_selector(scope: &Scope<'_>, node: Node<'_>, depth: usize) -> Option<ConstValue> {
    let operand = node.child_by_field_name("operand")?;
    let field = node.child_by_field_name("field")?;
    let field_name = scope.text(field);

    if ast::kind_of(operand) == NodeKind::Ident {
        let local = scope.text(operand);
        // Well-known standard-library constants.
        if let Some(path) = scope.imports.path_for_local(local) {
            if let Some(v) = stdlib_constant(path, field_name) {
                return Some(v);
            }
            return None;
        }
        // Field of a struct literal bound to a local variable.
        if let Some(func) = ast::enclosing_function(node) {
            if let LocalLookupLit::Literal(lit) = find_local_literal(scope, func, local, node) {
                let value = struct_field_value(lit, field_name, scope.source())?;
                return resolve_at(scope, value, depth + 1);
            }
        }
    }
    None
}

enum LocalLookupLit<'t> {
    Literal(Node<'t>),
    None,
}

/// Finds the composite literal last assigned to `name` before the use site.
fn find_local_literal<'t>(
    scope: &Scope<'_>,
    func: Node<'t>,
    name: &str,
    use_node: Node<'t>,
) -> LocalLookupLit<'t> {
    let source = scope.source();
    let mut best: Option<(usize, Node<'t>)> = None;
    let mut stack = vec![func];
    while let Some(n) = stack.pop() {
        if matches!(ast::kind_of(n), NodeKind::ShortVarDecl | NodeKind::AssignStmt) {
            if let Some(Some(mut value)) = write_of(n, name, source) {
                if n.start_byte() < use_node.start_byte() {
                    if ast::kind_of(value) == NodeKind::UnaryExpr {
                        if let Some(inner) = value.child_by_field_name("operand") {
                            value = inner;
                        }
                    }
                    if ast::kind_of(value) == NodeKind::CompositeLit
                        && best.is_none_or(|(pos, _)| n.start_byte() > pos)
                    {
                        best = Some((n.start_byte(), value));
                    }
                }
            }
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }
    match best {
        Some((_, lit)) => LocalLookupLit::Literal(lit),
        None => LocalLookupLit::None,
    }
}

/// The value of a named field inside a composite literal body.
#[must_use]
pub fn struct_field_value<'t>(lit: Node<'t>, field: &str, source: &str) -> Option<Node<'t>> {
    let body = lit.child_by_field_name("body")?;
    for element in ast::named_children(body) {
        if ast::kind_of(element) != NodeKind::KeyedElement {
            continue;
        }
        let children = ast::named_children(element);
        let (key, value) = match children.as_slice() {
            [k, v] => (*k, *v),
            _ => continue,
        };
        if ast::text_of(key, source) == field {
            return Some(value);
        }
    }
    None
}

/// Numeric conversions: `int32(x)`, `uint(x)`, `string(x)`.
fn resolve_conversion_call(scope: &Scope<'_>, node: Node<'_>, depth: usize) -> Option<ConstValue> {
    let function = node.child_by_field_name("function")?;
    if ast::kind_of(function) != NodeKind::Ident {
        return None;
    }
    let target = scope.text(function);
    if !is_builtin_conversion(target) {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let args = ast::named_children(args);
    let [arg] = args.as_slice() else {
        return None;
    };
    let value = resolve_at(scope, *arg, depth + 1)?;
    match (target, value) {
        ("string", v @ ConstValue::Str(_)) => Some(v),
        ("string", _) => None,
        ("float32" | "float64", ConstValue::Float(f)) => Some(ConstValue::Float(f)),
        ("float32" | "float64", ConstValue::Int(i)) => Some(ConstValue::Float(i as f64)),
        (_, v @ ConstValue::Int(_)) => Some(v),
        _ => None,
    }
}

fn is_builtin_conversion(name: &str) -> bool {
    matches!(
        name,
        "string"
            | "int"
            | "int8"
            | "int16"
            | "int32"
            | "int64"
            | "uint"
            | "uint8"
            | "uint16"
            | "uint32"
            | "uint64"
            | "uintptr"
            | "byte"
            | "rune"
            | "float32"
            | "float64"
    )
}

/// Well-known standard-library constants rules and guards lean on.
#[must_use]
pub fn stdlib_constant(pkg: &str, name: &str) -> Option<ConstValue> {
    let v: i128 = match (pkg, name) {
        ("math", "MaxInt8") => i128::from(i8::MAX),
        ("math", "MinInt8") => i128::from(i8::MIN),
        ("math", "MaxInt16") => i128::from(i16::MAX),
        ("math", "MinInt16") => i128::from(i16::MIN),
        ("math", "MaxInt32") => i128::from(i32::MAX),
        ("math", "MinInt32") => i128::from(i32::MIN),
        ("math", "MaxInt64" | "MaxInt") => i128::from(i64::MAX),
        ("math", "MinInt64" | "MinInt") => i128::from(i64::MIN),
        ("math", "MaxUint8") => i128::from(u8::MAX),
        ("math", "MaxUint16") => i128::from(u16::MAX),
        ("math", "MaxUint32") => i128::from(u32::MAX),
        ("math", "MaxUint64" | "MaxUint") => i128::from(u64::MAX),
        ("crypto/tls", "VersionSSL30") => 0x0300,
        ("crypto/tls", "VersionTLS10") => 0x0301,
        ("crypto/tls", "VersionTLS11") => 0x0302,
        ("crypto/tls", "VersionTLS12") => 0x0303,
        ("crypto/tls", "VersionTLS13") => 0x0304,
        _ => return None,
    };
    Some(ConstValue::Int(v))
}

/// Taint origins recognizable in an unresolved expression's subtree.
fn hints(scope: &Scope<'_>, node: Node<'_>) -> BTreeSet<TaintKind> {
    let source = scope.source();
    let mut out = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        match ast::kind_of(n) {
            NodeKind::SelectorExpr => {
                if let (Some(operand), Some(field)) = (
                    n.child_by_field_name("operand"),
                    n.child_by_field_name("field"),
                ) {
                    if ast::kind_of(operand) == NodeKind::Ident {
                        let local = ast::text_of(operand, source);
                        if let Some(path) = scope.imports.path_for_local(local) {
                            if let Some(kind) =
                                taint::global_source(path, ast::text_of(field, source))
                            {
                                out.insert(kind);
                            }
                        }
                    }
                }
            }
            NodeKind::CallExpr => {
                if let Some(function) = n.child_by_field_name("function") {
                    if ast::kind_of(function) == NodeKind::SelectorExpr {
                        if let (Some(operand), Some(field)) = (
                            function.child_by_field_name("operand"),
                            function.child_by_field_name("field"),
                        ) {
                            if ast::kind_of(operand) == NodeKind::Ident {
                                let local = ast::text_of(operand, source);
                                if let Some(path) = scope.imports.path_for_local(local) {
                                    if let Some(kind) =
                                        taint::call_source(path, ast::text_of(field, source))
                                    {
                                        out.insert(kind);
                                    }
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::PackageState;
    use crate::loader::Loader;

    fn scan_expr<F: FnMut(Node<'_>, &Context<'_>)>(source: &str, mut f: F) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.go"), source).unwrap();
        let loader = Loader::new(&[], &[], false, true).unwrap();
        let result = loader
            .load(&[tmp.path().to_string_lossy().into_owned()])
            .unwrap();
        let pkg = &result.packages[0];
        let config = Config::default();
        let state = PackageState::new();
        let ctx = Context::new(pkg, 0, &config, &state);
        let mut stack = vec![ctx.file.root()];
        while let Some(n) = stack.pop() {
            f(n, &ctx);
            let mut cursor = n.walk();
            for child in n.children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    fn resolved_strings(source: &str, var: &str) -> Vec<Option<String>> {
        let mut out = Vec::new();
        scan_expr(source, |n, ctx| {
            if ast::kind_of(n) == NodeKind::CallExpr {
                if let Some(args) = n.child_by_field_name("arguments") {
                    if ctx.node_text(n).starts_with(var) {
                        if let Some(arg) = ast::named_children(args).first() {
                            out.push(resolve_str(*arg, ctx));
                        }
                    }
                }
            }
        });
        out
    }

    #[test]
    fn resolves_literals_and_concatenation() {
        let source = r#"package main

func sink(s string) {}

func run() {
    sink("a" + "b" + "c")
}
"#;
        let values = resolved_strings(source, "sink");
        assert_eq!(values, vec![Some("abc".to_string())]);
    }

    #[test]
    fn resolves_cross_scope_constants() {
        let source = r#"package main

const prefix = "SELECT * FROM "

func sink(s string) {}

func run() {
    table := "users"
    sink(prefix + table)
}
"#;
        let values = resolved_strings(source, "sink");
        assert_eq!(values, vec![Some("SELECT * FROM users".to_string())]);
    }

    #[test]
    fn last_write_wins() {
        let source = r#"package main

func sink(s string) {}

func run() {
    q := "one"
    q = "two"
    sink(q)
}
"#;
        let values = resolved_strings(source, "sink");
        assert_eq!(values, vec![Some("two".to_string())]);
    }

    #[test]
    fn address_taken_defeats_resolution() {
        let source = r#"package main

func sink(s string) {}
func mutate(p *string) {}

func run() {
    q := "one"
    mutate(&q)
    sink(q)
}
"#;
        // Both sink(q) and mutate(&q) call sites are scanned; the sink one
        // must be unresolved.
        let values = resolved_strings(source, "sink");
        assert_eq!(values, vec![None]);
    }

    #[test]
    fn exported_package_var_is_not_constant() {
        let source = r#"package main

var Endpoint = "https://internal"
var fallback = "https://localhost"

func sink(s string) {}

func run() {
    sink(Endpoint)
    sink(fallback)
}
"#;
        let mut values = resolved_strings(source, "sink");
        values.sort();
        assert_eq!(values, vec![None, Some("https://localhost".to_string())]);
    }

    #[test]
    fn stdlib_constants_resolve() {
        let source = r#"package main

import "math"

func sink(n int) {}

func run() {
    sink(math.MaxUint32)
}
"#;
        let mut seen = Vec::new();
        scan_expr(source, |n, ctx| {
            if ast::kind_of(n) == NodeKind::SelectorExpr {
                seen.push(resolve_int(n, ctx));
            }
        });
        assert!(seen.contains(&Some(4_294_967_295)));
    }

    #[test]
    fn unknown_carries_taint_hints() {
        let source = r#"package main

import "os"

func sink(s string) {}

func run() {
    sink("q=" + os.Args[1])
}
"#;
        let mut hinted = false;
        scan_expr(source, |n, ctx| {
            if ast::kind_of(n) == NodeKind::BinaryExpr {
                if let Resolution::Unknown(hints) = resolve(n, ctx) {
                    hinted |= hints.contains(&TaintKind::CommandArgs);
                }
            }
        });
        assert!(hinted);
    }
}
