//! Rule G115: integer conversions that may overflow.
//!
//! A whole-package analyzer over the SSA range engine: a conversion `T(e)`
//! is accepted only when the interval proved for `e` at the conversion site
//! is contained in `T`'s representable range. Guards like
//! `if x >= math.MinInt32 && x <= math.MaxInt32` tighten the interval on
//! the protected path.

use gosentry_core::ast::{self, NodeKind};
use gosentry_core::{Config, Context, Issue, PackageAnalyzer, RuleError, Score};
use tree_sitter::Node;

/// Rule ID for conversion overflow.
pub const ID: &str = "G115";

/// Flags integer conversions the range engine cannot prove safe.
pub struct ConversionOverflow;

impl ConversionOverflow {
    /// Builds the analyzer.
    #[must_use]
    pub fn new(_config: &Config) -> Self {
        Self
    }
}

impl PackageAnalyzer for ConversionOverflow {
    fn id(&self) -> &'static str {
        ID
    }

    fn analyze(&self, ctx: &Context<'_>) -> Result<Vec<Issue>, RuleError> {
        let mut issues = Vec::new();
        for func in functions_in(ctx.file.root()) {
            // Bodies the lowering refuses (unstructured flow) simply have no
            // provable conversions.
            let Ok(analysis) = ctx.func_analysis(func) else {
                continue;
            };
            let mut engine = analysis.range_engine();
            for site in &analysis.ir.conversions {
                let fact = engine.fact_at(site.arg, site.block);
                if site.to.interval().contains(&fact.interval) {
                    continue;
                }
                let node = ctx
                    .file
                    .root()
                    .named_descendant_for_byte_range(site.span.0, site.span.1)
                    .unwrap_or(func);
                let from = site.from_name.clone().unwrap_or_else(|| "int".to_string());
                issues.push(ctx.new_issue(
                    node,
                    ID,
                    format!("integer overflow conversion {} -> {}", from, site.to_name),
                    Score::High,
                    Score::Medium,
                ));
            }
        }
        Ok(issues)
    }
}

/// Every function-shaped node of a file, nested literals included.
fn functions_in(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(
            ast::kind_of(node),
            NodeKind::FunctionDecl | NodeKind::MethodDecl | NodeKind::FuncLit
        ) {
            out.push(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    out.sort_by_key(tree_sitter::Node::start_byte);
    out
}

#[cfg(test)]
mod tests {
    use crate::testutil::{scan, with_rule};

    #[test]
    fn unguarded_max_uint32_to_int32_fires() {
        let issues = scan(
            r#"package main

import "math"

func convert() int32 {
    x := uint64(math.MaxUint32)
    return int32(x)
}
"#,
        );
        assert_eq!(with_rule(&issues, "G115").len(), 1);
    }

    #[test]
    fn range_guard_silences_the_conversion() {
        let issues = scan(
            r#"package main

import "math"

func convert(x int64) int32 {
    if x >= math.MinInt32 && x <= math.MaxInt32 {
        return int32(x)
    }
    return 0
}
"#,
        );
        assert!(with_rule(&issues, "G115").is_empty());
    }

    #[test]
    fn parse_with_matching_bit_size_is_safe() {
        let issues = scan(
            r#"package main

import "strconv"

func parse(s string) int32 {
    v, _ := strconv.ParseInt(s, 10, 32)
    return int32(v)
}
"#,
        );
        assert!(with_rule(&issues, "G115").is_empty());
    }

    #[test]
    fn parse_with_wider_bit_size_fires() {
        let issues = scan(
            r#"package main

import "strconv"

func parse(s string) int32 {
    v, _ := strconv.ParseInt(s, 10, 64)
    return int32(v)
}
"#,
        );
        assert_eq!(with_rule(&issues, "G115").len(), 1);
    }

    #[test]
    fn loop_index_with_bound_is_safe() {
        let issues = scan(
            r#"package main

func sum(items []int) uint8 {
    var total uint8
    for i := 0; i < 200; i++ {
        total = uint8(i)
    }
    return total
}
"#,
        );
        assert!(with_rule(&issues, "G115").is_empty());
    }

    #[test]
    fn masked_value_fits_in_byte() {
        let issues = scan(
            r#"package main

func low(x int) uint8 {
    if x >= 0 {
        return uint8(x & 0xFF)
    }
    return 0
}
"#,
        );
        assert!(with_rule(&issues, "G115").is_empty());
    }
}
