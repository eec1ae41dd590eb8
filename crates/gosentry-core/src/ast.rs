//! Thin AST layer over the tree-sitter grammar.
//!
//! Rules never dispatch on raw kind strings; the visitor maps every node to
//! the closed [`NodeKind`] enum and the dispatch table is keyed on it.

use tree_sitter::Node;

/// Discriminator for the AST node shapes the engine understands.
///
/// Grammar productions with no analysis relevance collapse into
/// [`NodeKind::Other`]; they are still traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NodeKind {
    SourceFile,
    PackageClause,
    ImportDecl,
    ImportSpec,
    FunctionDecl,
    MethodDecl,
    FuncLit,
    Block,
    CallExpr,
    TypeConvExpr,
    SelectorExpr,
    IndexExpr,
    SliceExpr,
    ParenExpr,
    UnaryExpr,
    BinaryExpr,
    CompositeLit,
    LiteralValue,
    KeyedElement,
    LiteralElement,
    Ident,
    TypeIdent,
    FieldIdent,
    PackageIdent,
    BlankIdent,
    StringLit,
    RawStringLit,
    IntLit,
    FloatLit,
    RuneLit,
    True,
    False,
    Nil,
    Iota,
    ShortVarDecl,
    VarDecl,
    VarSpec,
    ConstDecl,
    ConstSpec,
    TypeDecl,
    TypeSpec,
    AssignStmt,
    IncStmt,
    DecStmt,
    IfStmt,
    ForStmt,
    RangeClause,
    ReturnStmt,
    ExprStmt,
    GoStmt,
    DeferStmt,
    ExprSwitchStmt,
    TypeSwitchStmt,
    SelectStmt,
    LabeledStmt,
    GotoStmt,
    BreakStmt,
    ContinueStmt,
    SendStmt,
    QualifiedType,
    PointerType,
    StructType,
    InterfaceType,
    MapType,
    SliceType,
    ArrayType,
    ChannelType,
    FunctionType,
    ParameterList,
    ParameterDecl,
    ExpressionList,
    ArgumentList,
    Comment,
    Other,
}

/// Maps a tree-sitter node onto the closed kind enum.
#[must_use]
pub fn kind_of(node: Node<'_>) -> NodeKind {
    match node.kind() {
        "source_file" => NodeKind::SourceFile,
        "package_clause" => NodeKind::PackageClause,
        "import_declaration" => NodeKind::ImportDecl,
        "import_spec" => NodeKind::ImportSpec,
        "function_declaration" => NodeKind::FunctionDecl,
        "method_declaration" => NodeKind::MethodDecl,
        "func_literal" => NodeKind::FuncLit,
        "block" => NodeKind::Block,
        "call_expression" => NodeKind::CallExpr,
        "type_conversion_expression" => NodeKind::TypeConvExpr,
        "selector_expression" => NodeKind::SelectorExpr,
        "index_expression" => NodeKind::IndexExpr,
        "slice_expression" => NodeKind::SliceExpr,
        "parenthesized_expression" => NodeKind::ParenExpr,
        "unary_expression" => NodeKind::UnaryExpr,
        "binary_expression" => NodeKind::BinaryExpr,
        "composite_literal" => NodeKind::CompositeLit,
        "literal_value" => NodeKind::LiteralValue,
        "keyed_element" => NodeKind::KeyedElement,
        "literal_element" => NodeKind::LiteralElement,
        "identifier" => NodeKind::Ident,
        "type_identifier" => NodeKind::TypeIdent,
        "field_identifier" => NodeKind::FieldIdent,
        "package_identifier" => NodeKind::PackageIdent,
        "blank_identifier" => NodeKind::BlankIdent,
        "interpreted_string_literal" => NodeKind::StringLit,
        "raw_string_literal" => NodeKind::RawStringLit,
        "int_literal" => NodeKind::IntLit,
        "float_literal" => NodeKind::FloatLit,
        "rune_literal" => NodeKind::RuneLit,
        "true" => NodeKind::True,
        "false" => NodeKind::False,
        "nil" => NodeKind::Nil,
        "iota" => NodeKind::Iota,
        "short_var_declaration" => NodeKind::ShortVarDecl,
        "var_declaration" => NodeKind::VarDecl,
        "var_spec" => NodeKind::VarSpec,
        "const_declaration" => NodeKind::ConstDecl,
        "const_spec" => NodeKind::ConstSpec,
        "type_declaration" => NodeKind::TypeDecl,
        "type_spec" => NodeKind::TypeSpec,
        "assignment_statement" => NodeKind::AssignStmt,
        "inc_statement" => NodeKind::IncStmt,
        "dec_statement" => NodeKind::DecStmt,
        "if_statement" => NodeKind::IfStmt,
        "for_statement" => NodeKind::ForStmt,
        "range_clause" => NodeKind::RangeClause,
        "return_statement" => NodeKind::ReturnStmt,
        "expression_statement" => NodeKind::ExprStmt,
        "go_statement" => NodeKind::GoStmt,
        "defer_statement" => NodeKind::DeferStmt,
        "expression_switch_statement" => NodeKind::ExprSwitchStmt,
        "type_switch_statement" => NodeKind::TypeSwitchStmt,
        "select_statement" => NodeKind::SelectStmt,
        "labeled_statement" => NodeKind::LabeledStmt,
        "goto_statement" => NodeKind::GotoStmt,
        "break_statement" => NodeKind::BreakStmt,
        "continue_statement" => NodeKind::ContinueStmt,
        "send_statement" => NodeKind::SendStmt,
        "qualified_type" => NodeKind::QualifiedType,
        "pointer_type" => NodeKind::PointerType,
        "struct_type" => NodeKind::StructType,
        "interface_type" => NodeKind::InterfaceType,
        "map_type" => NodeKind::MapType,
        "slice_type" => NodeKind::SliceType,
        "array_type" => NodeKind::ArrayType,
        "channel_type" => NodeKind::ChannelType,
        "function_type" => NodeKind::FunctionType,
        "parameter_list" => NodeKind::ParameterList,
        "parameter_declaration" | "variadic_parameter_declaration" => NodeKind::ParameterDecl,
        "expression_list" => NodeKind::ExpressionList,
        "argument_list" => NodeKind::ArgumentList,
        "comment" => NodeKind::Comment,
        _ => NodeKind::Other,
    }
}

/// Source text of a node, empty if the span is invalid UTF-8.
#[must_use]
pub fn text_of<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// 1-based start line of a node.
#[must_use]
pub fn start_line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// 1-based start column of a node.
#[must_use]
pub fn start_column(node: Node<'_>) -> usize {
    node.start_position().column + 1
}

/// 1-based inclusive line span of a node.
#[must_use]
pub fn line_span(node: Node<'_>) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

/// Renders the line span the way issues carry it: `"12"` or `"12-18"`.
#[must_use]
pub fn line_field(node: Node<'_>) -> String {
    let (start, end) = line_span(node);
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

/// Named children of a node, collected eagerly.
#[must_use]
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Source excerpt covering a node, clipped to a handful of lines.
#[must_use]
pub fn excerpt(node: Node<'_>, source: &str) -> String {
    const MAX_LINES: usize = 6;
    let text = text_of(node, source);
    let mut lines = text.lines();
    let head: Vec<&str> = lines.by_ref().take(MAX_LINES).collect();
    head.join("\n")
}

/// Nearest enclosing function body owner: function declaration, method
/// declaration, or function literal.
#[must_use]
pub fn enclosing_function<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut cur = node.parent();
    while let Some(n) = cur {
        if matches!(
            kind_of(n),
            NodeKind::FunctionDecl | NodeKind::MethodDecl | NodeKind::FuncLit
        ) {
            return Some(n);
        }
        cur = n.parent();
    }
    None
}

/// All comment nodes of a file with their 1-based line numbers.
#[must_use]
pub fn collect_comments<'s>(root: Node<'_>, source: &'s str) -> Vec<(usize, &'s str)> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "comment" {
            out.push((start_line(node), text_of(node, source)));
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    out.sort_by_key(|(line, _)| *line);
    out
}

/// Decodes a Go string literal node to its value.
///
/// Handles interpreted literals with the full escape set and raw literals.
/// Returns `None` for malformed text (the parser normally rejects those).
#[must_use]
pub fn unquote_string(text: &str) -> Option<String> {
    let text = text.trim();
    if let Some(raw) = text.strip_prefix('`') {
        return raw.strip_suffix('`').map(str::to_string);
    }
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                let byte = u8::from_str_radix(&hex, 16).ok()?;
                out.push(byte as char);
            }
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            'U' => {
                let hex: String = chars.by_ref().take(8).collect();
                out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            d @ '0'..='7' => {
                let mut oct = String::from(d);
                oct.extend(chars.by_ref().take(2));
                let byte = u8::from_str_radix(&oct, 8).ok()?;
                out.push(byte as char);
            }
            _ => return None,
        }
    }
    Some(out)
}

/// Parses a Go integer literal, honoring base prefixes and `_` separators.
#[must_use]
pub fn parse_int_literal(text: &str) -> Option<i128> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let cleaned = cleaned.as_str();
    if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        return i128::from_str_radix(hex, 16).ok();
    }
    if let Some(oct) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        return i128::from_str_radix(oct, 8).ok();
    }
    if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        return i128::from_str_radix(bin, 2).ok();
    }
    if cleaned.len() > 1 && cleaned.starts_with('0') && cleaned.chars().all(|c| c.is_ascii_digit())
    {
        return i128::from_str_radix(&cleaned[1..], 8).ok();
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_interpreted_literal() {
        assert_eq!(unquote_string(r#""hello""#).as_deref(), Some("hello"));
        assert_eq!(unquote_string(r#""a\tb\n""#).as_deref(), Some("a\tb\n"));
        assert_eq!(unquote_string(r#""\x41B""#).as_deref(), Some("AB"));
    }

    #[test]
    fn unquote_raw_literal() {
        assert_eq!(unquote_string("`a\\nb`").as_deref(), Some("a\\nb"));
    }

    #[test]
    fn int_literal_bases() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("0x2A"), Some(42));
        assert_eq!(parse_int_literal("0o52"), Some(42));
        assert_eq!(parse_int_literal("052"), Some(42));
        assert_eq!(parse_int_literal("0b101010"), Some(42));
        assert_eq!(parse_int_literal("1_000_000"), Some(1_000_000));
    }
}
