//! SSA-based dataflow substrate: lowering, integer ranges, taint.

mod build;
pub mod ir;
pub mod range;
pub mod taint;

use once_cell::unsync::OnceCell;
use tree_sitter::Node;

use crate::context::Context;
use crate::rule::RuleError;
pub use ir::{ConversionSite, FuncIr, IntType, ValueId};
pub use range::{Interval, RangeEngine, RangeFact, RangeSource};
pub use taint::{TaintFact, TaintKind};

/// Per-function analysis bundle: the lowered IR plus lazily computed facts.
///
/// Built on first demand through [`Context::func_analysis`] and cached for
/// the package lifetime.
pub struct FuncAnalysis {
    /// The lowered function.
    pub ir: FuncIr,
    taint_facts: OnceCell<Vec<TaintFact>>,
}

impl FuncAnalysis {
    /// Lowers a function body and wraps it for fact queries.
    ///
    /// # Errors
    ///
    /// Fails when the body uses control flow the lowering refuses to model;
    /// callers treat that function as having no dataflow facts.
    pub fn build(func: Node<'_>, ctx: &Context<'_>) -> Result<Self, RuleError> {
        Ok(Self {
            ir: build::lower(func, ctx)?,
            taint_facts: OnceCell::new(),
        })
    }

    /// A fresh range engine over this function's IR.
    ///
    /// The engine memoizes internally; keep one alive per query batch.
    #[must_use]
    pub fn range_engine(&self) -> RangeEngine<'_> {
        RangeEngine::new(&self.ir)
    }

    /// Taint facts for every SSA value, computed once per function.
    #[must_use]
    pub fn taint_facts(&self) -> &[TaintFact] {
        self.taint_facts.get_or_init(|| taint::analyze(&self.ir))
    }

    /// Taint fact for the value lowered from an AST node.
    #[must_use]
    pub fn taint_of_node(&self, node_id: usize) -> Option<&TaintFact> {
        let value = self.ir.value_of_node(node_id)?;
        self.taint_facts().get(value as usize)
    }
}
