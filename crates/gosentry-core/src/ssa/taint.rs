//! Taint tracking over the function IR.
//!
//! Classic fixpoint dataflow: sources set the bit, copies and derivations
//! propagate it, sanitizer calls clear it. Intraprocedural only; unknown
//! callees are conservative (their result is tainted iff a tainted argument
//! flows in).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ssa::ir::{FuncIr, Rvalue, ValueId};

/// Origin class of a tainted value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TaintKind {
    /// HTTP request fields and accessor methods.
    HttpRequest,
    /// Process command-line arguments.
    CommandArgs,
    /// Environment variable reads.
    Environment,
    /// Standard-input reads via recognized entry points.
    Stdin,
}

/// Taint fact for one SSA value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaintFact {
    /// Whether the value derives from an untrusted source.
    pub tainted: bool,
    /// The origins it derives from.
    pub sources: BTreeSet<TaintKind>,
}

impl TaintFact {
    fn source(kind: TaintKind) -> Self {
        Self {
            tainted: true,
            sources: BTreeSet::from([kind]),
        }
    }

    fn join(&self, other: &Self) -> Self {
        let mut sources = self.sources.clone();
        sources.extend(other.sources.iter().copied());
        Self {
            tainted: self.tainted || other.tainted,
            sources,
        }
    }
}

/// Package-level variables that are taint sources, e.g. `os.Args`.
#[must_use]
pub fn global_source(pkg: &str, name: &str) -> Option<TaintKind> {
    match (pkg, name) {
        ("os", "Args") => Some(TaintKind::CommandArgs),
        ("os", "Stdin") => Some(TaintKind::Stdin),
        _ => None,
    }
}

/// Calls whose result is a taint source. The first component is a package
/// path or a receiver type as the call matcher reports it.
#[must_use]
pub fn call_source(target: &str, name: &str) -> Option<TaintKind> {
    match (target, name) {
        ("os", "Getenv" | "LookupEnv" | "Environ" | "ExpandEnv") => {
            Some(TaintKind::Environment)
        }
        (
            "net/http.Request",
            "FormValue" | "PostFormValue" | "Referer" | "UserAgent" | "Cookie" | "BasicAuth",
        ) => Some(TaintKind::HttpRequest),
        ("net/url.URL", "Query" | "String") => Some(TaintKind::HttpRequest),
        ("bufio.Scanner", "Text" | "Bytes") => Some(TaintKind::Stdin),
        ("bufio.Reader", "ReadString" | "ReadBytes" | "ReadLine") => Some(TaintKind::Stdin),
        _ => None,
    }
}

/// Struct fields that are taint sources when read off a request value.
#[must_use]
pub fn field_source(owner_type: &str, field: &str) -> Option<TaintKind> {
    match (owner_type, field) {
        (
            "net/http.Request",
            "URL" | "Body" | "Form" | "PostForm" | "Header" | "RequestURI" | "RemoteAddr"
            | "Host",
        ) => Some(TaintKind::HttpRequest),
        _ => None,
    }
}

/// Calls whose result is clean regardless of input.
///
/// The pinned sanitizer set: path cleaning, HTML escaping, URL escaping, and
/// numeric parses (the parsed number is no longer attacker-controlled text).
#[must_use]
pub fn is_sanitizer(target: &str, name: &str) -> bool {
    matches!(
        (target, name),
        ("path/filepath", "Clean" | "Base")
            | ("path", "Clean" | "Base")
            | ("html", "EscapeString")
            | ("html/template", "HTMLEscapeString" | "JSEscapeString")
            | ("net/url", "QueryEscape" | "PathEscape")
            | ("strconv", "Atoi" | "ParseInt" | "ParseUint" | "ParseFloat" | "Quote")
    )
}

/// Computes taint facts for every value of a function.
///
/// Iterates transfer functions to a fixpoint; the lattice is finite (four
/// source tags) so termination is immediate in practice.
#[must_use]
pub fn analyze(ir: &FuncIr) -> Vec<TaintFact> {
    let mut facts = vec![TaintFact::default(); ir.values.len()];
    loop {
        let mut changed = false;
        for id in 0..ir.values.len() {
            let new = transfer(ir, id as ValueId, &facts);
            if new != facts[id] {
                facts[id] = new;
                changed = true;
            }
        }
        if !changed {
            return facts;
        }
    }
}

fn transfer(ir: &FuncIr, id: ValueId, facts: &[TaintFact]) -> TaintFact {
    let of = |v: ValueId| facts[v as usize].clone();
    match &ir.value(id).rvalue {
        // A constant-proved value is never tainted.
        Rvalue::Const(_) => TaintFact::default(),
        Rvalue::Source(kind) => TaintFact::source(*kind),
        Rvalue::Unary { arg, .. }
        | Rvalue::Len { arg }
        | Rvalue::Convert { arg, .. } => of(*arg),
        Rvalue::Binary { lhs, rhs, .. } => of(*lhs).join(&of(*rhs)),
        Rvalue::Phi { args } => args
            .iter()
            .fold(TaintFact::default(), |acc, a| acc.join(&of(*a))),
        Rvalue::Index { base, index } => of(*base).join(&of(*index)),
        Rvalue::Field { base, .. } => of(*base),
        Rvalue::Call { target, args } => {
            if let Some((pkg, name)) = target {
                if let Some(kind) = call_source(pkg, name) {
                    return TaintFact::source(kind);
                }
                if is_sanitizer(pkg, name) {
                    return TaintFact::default();
                }
            }
            // Unknown callee: result tainted iff a tainted argument flows in.
            args.iter()
                .fold(TaintFact::default(), |acc, a| acc.join(&of(*a)))
        }
        Rvalue::Param { .. } | Rvalue::RangeIndex | Rvalue::Opaque => TaintFact::default(),
    }
}
