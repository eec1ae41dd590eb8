//! Function-level IR in static single-assignment form.
//!
//! Lowered from the AST per function body; every value is defined once, phi
//! values merge definitions at joins. The range and taint engines run on
//! this structure, never on the AST directly.

use rustc_hash::FxHashMap;

use crate::resolve::ConstValue;
use crate::ssa::taint::TaintKind;

/// Identifier of an SSA value within one function.
pub type ValueId = u32;
/// Identifier of a basic block within one function.
pub type BlockId = u32;

/// An integer type of the analyzed language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntType {
    /// Signedness.
    pub signed: bool,
    /// Bit width; `int` and `uint` count as 64.
    pub bits: u32,
}

impl IntType {
    /// Maps a builtin type name to its integer shape.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let (signed, bits) = match name {
            "int" | "int64" => (true, 64),
            "int8" => (true, 8),
            "int16" => (true, 16),
            "int32" | "rune" => (true, 32),
            "uint" | "uint64" | "uintptr" => (false, 64),
            "uint8" | "byte" => (false, 8),
            "uint16" => (false, 16),
            "uint32" => (false, 32),
            _ => return None,
        };
        Some(Self { signed, bits })
    }

    /// Smallest representable value.
    #[must_use]
    pub fn min(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.bits - 1))
        } else {
            0
        }
    }

    /// Largest representable value.
    #[must_use]
    pub fn max(&self) -> i128 {
        if self.signed {
            (1i128 << (self.bits - 1)) - 1
        } else {
            (1i128 << self.bits) - 1
        }
    }
}

/// Unary operators the engines interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

/// Binary operators the engines interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LAnd,
    LOr,
    Min,
    Max,
}

impl BinOp {
    /// Parses the operator token text.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "&" => Self::And,
            "|" => Self::Or,
            "^" => Self::Xor,
            "&^" => Self::AndNot,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "&&" => Self::LAnd,
            "||" => Self::LOr,
            _ => return None,
        })
    }

    /// The comparison holding when this one does not.
    #[must_use]
    pub fn negated(self) -> Option<Self> {
        Some(match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
            _ => return None,
        })
    }

    /// True for `== != < <= > >=`.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// How an SSA value is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Rvalue {
    /// A proved compile-time constant.
    Const(ConstValue),
    /// A function parameter.
    Param {
        /// Position in the parameter list.
        index: usize,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnOp,
        /// Operand value.
        arg: ValueId,
    },
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinOp,
        /// Left operand.
        lhs: ValueId,
        /// Right operand.
        rhs: ValueId,
    },
    /// Merge of definitions at a join point.
    Phi {
        /// Incoming values, one per merged path.
        args: Vec<ValueId>,
    },
    /// A call; `target` is the resolved (package-or-type, function) pair.
    Call {
        /// Resolved callee, if the matcher could name it.
        target: Option<(String, String)>,
        /// Receiver (if any) followed by the arguments.
        args: Vec<ValueId>,
    },
    /// `len(x)` or `cap(x)`.
    Len {
        /// The measured value.
        arg: ValueId,
    },
    /// Type conversion.
    Convert {
        /// Destination integer type; `None` for non-integer conversions.
        to: Option<IntType>,
        /// Converted value.
        arg: ValueId,
    },
    /// Indexing into a container.
    Index {
        /// Container value.
        base: ValueId,
        /// Index value.
        index: ValueId,
    },
    /// Struct field read.
    Field {
        /// Base value.
        base: ValueId,
        /// Field name.
        name: String,
    },
    /// A recognized external taint origin.
    Source(TaintKind),
    /// Index variable of a `range` loop; non-negative by construction.
    RangeIndex,
    /// Anything the lowering does not model.
    Opaque,
}

/// One SSA value.
#[derive(Debug, Clone)]
pub struct Value {
    /// Producing operation.
    pub rvalue: Rvalue,
    /// Integer type, when statically known.
    pub ty: Option<IntType>,
    /// Block the definition lives in; guards of that block hold here.
    pub block: BlockId,
}

/// A branch condition known to hold (or not) throughout a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    /// The condition value.
    pub cond: ValueId,
    /// Polarity: true on the then-edge, false on the else-edge.
    pub holds: bool,
}

/// A basic block: only its guard set matters to the demand-driven engines.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Conditions dominating this block, innermost last.
    pub guards: Vec<Guard>,
}

/// An integer conversion site checked by the overflow analyzer.
#[derive(Debug, Clone)]
pub struct ConversionSite {
    /// The converted operand.
    pub arg: ValueId,
    /// Block the conversion executes in.
    pub block: BlockId,
    /// Destination type.
    pub to: IntType,
    /// Destination type as written in source.
    pub to_name: String,
    /// Source type name of the operand, when known.
    pub from_name: Option<String>,
    /// Byte span of the conversion expression.
    pub span: (usize, usize),
}

/// Lowered body of one function.
#[derive(Debug, Default)]
pub struct FuncIr {
    /// All SSA values, indexed by [`ValueId`].
    pub values: Vec<Value>,
    /// All blocks, indexed by [`BlockId`].
    pub blocks: Vec<Block>,
    /// Integer conversion sites in source order.
    pub conversions: Vec<ConversionSite>,
    /// AST node id to the value lowered from it.
    pub node_value: FxHashMap<usize, ValueId>,
}

impl FuncIr {
    /// The value record for an id.
    #[must_use]
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id as usize]
    }

    /// Guard set of a block.
    #[must_use]
    pub fn guards(&self, block: BlockId) -> &[Guard] {
        &self.blocks[block as usize].guards
    }

    /// The value lowered from an AST node, if that node was an expression.
    #[must_use]
    pub fn value_of_node(&self, node_id: usize) -> Option<ValueId> {
        self.node_value.get(&node_id).copied()
    }
}
