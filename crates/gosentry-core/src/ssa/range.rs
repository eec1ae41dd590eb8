//! Integer range analysis over the function IR.
//!
//! Demand-driven interval evaluation with structural guard refinement: a
//! value's raw interval is its operation's transfer result refined by the
//! guards of its defining block; a query at a block additionally applies
//! that block's guards. Phi values over loop back-edges widen directionally.
//!
//! The engine is sound but deliberately imprecise: any interval it reports
//! contains every runtime value, never the reverse.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::resolve::ConstValue;
use crate::ssa::ir::{BinOp, BlockId, FuncIr, Guard, IntType, Rvalue, UnOp, ValueId};

/// One end of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bound {
    /// Unbounded below.
    NegInf,
    /// A finite bound.
    Fin(i128),
    /// Unbounded above.
    PosInf,
}

impl Bound {
    fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Fin(a), Self::Fin(b)) => a.checked_add(b).map_or_else(
                || if a > 0 { Self::PosInf } else { Self::NegInf },
                Self::Fin,
            ),
            (Self::NegInf, _) | (_, Self::NegInf) => Self::NegInf,
            _ => Self::PosInf,
        }
    }

    fn sub(self, other: Self) -> Self {
        self.add(other.neg())
    }

    fn neg(self) -> Self {
        match self {
            Self::NegInf => Self::PosInf,
            Self::PosInf => Self::NegInf,
            Self::Fin(a) => Self::Fin(-a),
        }
    }

    fn mul(self, other: Self) -> Self {
        let sign = |b: Self| match b {
            Self::NegInf => -1,
            Self::PosInf => 1,
            Self::Fin(v) => v.signum() as i32,
        };
        match (self, other) {
            (Self::Fin(a), Self::Fin(b)) => a.checked_mul(b).map_or_else(
                || {
                    if (a > 0) == (b > 0) {
                        Self::PosInf
                    } else {
                        Self::NegInf
                    }
                },
                Self::Fin,
            ),
            (a, b) => {
                let s = sign(a) * sign(b);
                match s {
                    0 => Self::Fin(0),
                    x if x > 0 => Self::PosInf,
                    _ => Self::NegInf,
                }
            }
        }
    }

    fn succ(self) -> Self {
        match self {
            Self::Fin(a) => Self::Fin(a.saturating_add(1)),
            b => b,
        }
    }

    fn pred(self) -> Self {
        match self {
            Self::Fin(a) => Self::Fin(a.saturating_sub(1)),
            b => b,
        }
    }
}

/// A closed integer interval over extended integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// Lower bound, inclusive.
    pub lo: Bound,
    /// Upper bound, inclusive.
    pub hi: Bound,
}

impl Interval {
    /// The unbounded interval.
    #[must_use]
    pub fn full() -> Self {
        Self {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }

    /// The empty interval.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            lo: Bound::Fin(1),
            hi: Bound::Fin(0),
        }
    }

    /// A single point.
    #[must_use]
    pub fn point(v: i128) -> Self {
        Self {
            lo: Bound::Fin(v),
            hi: Bound::Fin(v),
        }
    }

    /// Interval from explicit finite endpoints.
    #[must_use]
    pub fn of(lo: i128, hi: i128) -> Self {
        Self {
            lo: Bound::Fin(lo),
            hi: Bound::Fin(hi),
        }
    }

    /// True when no integer lies inside.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    /// Smallest interval containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Largest interval contained in both.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            lo: self.lo.max(other.lo),
            hi: self.hi.min(other.hi),
        }
    }

    /// Whether every value of `other` lies inside `self`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.is_empty() || (self.lo <= other.lo && other.hi <= self.hi)
    }

    fn binary_combine(a: Self, b: Self, f: impl Fn(Bound, Bound) -> Bound) -> Self {
        if a.is_empty() || b.is_empty() {
            return Self::empty();
        }
        let candidates = [
            f(a.lo, b.lo),
            f(a.lo, b.hi),
            f(a.hi, b.lo),
            f(a.hi, b.hi),
        ];
        Self {
            lo: candidates.iter().copied().min().unwrap_or(Bound::NegInf),
            hi: candidates.iter().copied().max().unwrap_or(Bound::PosInf),
        }
    }

    fn add(a: Self, b: Self) -> Self {
        if a.is_empty() || b.is_empty() {
            return Self::empty();
        }
        Self {
            lo: a.lo.add(b.lo),
            hi: a.hi.add(b.hi),
        }
    }

    fn sub(a: Self, b: Self) -> Self {
        if a.is_empty() || b.is_empty() {
            return Self::empty();
        }
        Self {
            lo: a.lo.sub(b.hi),
            hi: a.hi.sub(b.lo),
        }
    }

    fn neg(a: Self) -> Self {
        if a.is_empty() {
            return Self::empty();
        }
        Self {
            lo: a.hi.neg(),
            hi: a.lo.neg(),
        }
    }

    fn mul(a: Self, b: Self) -> Self {
        Self::binary_combine(a, b, Bound::mul)
    }

    /// Truncating division, split around zero divisors.
    fn div(a: Self, b: Self) -> Self {
        if a.is_empty() || b.is_empty() {
            return Self::empty();
        }
        let neg_part = b.intersect(&Self {
            lo: Bound::NegInf,
            hi: Bound::Fin(-1),
        });
        let pos_part = b.intersect(&Self {
            lo: Bound::Fin(1),
            hi: Bound::PosInf,
        });
        let div_bound = |x: Bound, y: Bound| -> Bound {
            match (x, y) {
                (Bound::Fin(p), Bound::Fin(q)) if q != 0 => Bound::Fin(p / q),
                (Bound::Fin(_), _) => Bound::Fin(0),
                (Bound::PosInf, Bound::Fin(q)) => {
                    if q > 0 {
                        Bound::PosInf
                    } else {
                        Bound::NegInf
                    }
                }
                (Bound::NegInf, Bound::Fin(q)) => {
                    if q > 0 {
                        Bound::NegInf
                    } else {
                        Bound::PosInf
                    }
                }
                (Bound::PosInf | Bound::NegInf, _) => Bound::Fin(0),
            }
        };
        let mut out = Self::empty();
        for part in [neg_part, pos_part] {
            if !part.is_empty() {
                out = out.union(&Self::binary_combine(a, part, div_bound));
            }
        }
        if out.is_empty() {
            Self::full()
        } else {
            out
        }
    }

    /// Remainder: result magnitude below the divisor magnitude, sign follows
    /// the dividend.
    fn rem(a: Self, b: Self) -> Self {
        if a.is_empty() || b.is_empty() {
            return Self::empty();
        }
        let mag = match (b.lo, b.hi) {
            (Bound::Fin(l), Bound::Fin(h)) => Bound::Fin(l.abs().max(h.abs()).saturating_sub(1)),
            _ => Bound::PosInf,
        };
        let nonneg = a.lo >= Bound::Fin(0);
        let nonpos = a.hi <= Bound::Fin(0);
        if nonneg {
            Self {
                lo: Bound::Fin(0),
                hi: mag.min(a.hi),
            }
        } else if nonpos {
            Self {
                lo: mag.neg().max(a.lo),
                hi: Bound::Fin(0),
            }
        } else {
            Self {
                lo: mag.neg(),
                hi: mag,
            }
        }
    }

    /// Bitwise and: a non-negative side caps the result.
    fn bit_and(a: Self, b: Self) -> Self {
        let zero = Bound::Fin(0);
        if a.lo >= zero && b.lo >= zero {
            Self {
                lo: zero,
                hi: a.hi.min(b.hi),
            }
        } else if b.lo >= zero {
            Self { lo: zero, hi: b.hi }
        } else if a.lo >= zero {
            Self { lo: zero, hi: a.hi }
        } else {
            Self::full()
        }
    }

    fn bit_or_xor(a: Self, b: Self) -> Self {
        let zero = Bound::Fin(0);
        if a.lo >= zero && b.lo >= zero {
            let cap = |h: Bound| match h {
                Bound::Fin(v) => {
                    let bits = 128 - v.leading_zeros();
                    1i128
                        .checked_shl(bits)
                        .map_or(Bound::PosInf, |p| Bound::Fin(p - 1))
                }
                other => other,
            };
            Self {
                lo: zero,
                hi: cap(a.hi.max(b.hi)),
            }
        } else {
            Self::full()
        }
    }

    fn and_not(a: Self, _b: Self) -> Self {
        if a.lo >= Bound::Fin(0) {
            Self {
                lo: Bound::Fin(0),
                hi: a.hi,
            }
        } else {
            Self::full()
        }
    }

    fn shl(a: Self, b: Self, ty: Option<IntType>) -> Self {
        let shift = clamp_shift(b);
        match shift {
            Some((bl, bh)) => {
                let f = |x: Bound, s: u32| match x {
                    Bound::Fin(v) => v
                        .checked_shl(s)
                        .filter(|r| (r >> s) == v)
                        .map_or_else(
                            || if v >= 0 { Bound::PosInf } else { Bound::NegInf },
                            Bound::Fin,
                        ),
                    inf => inf,
                };
                let candidates = [f(a.lo, bl), f(a.lo, bh), f(a.hi, bl), f(a.hi, bh)];
                Self {
                    lo: candidates.iter().copied().min().unwrap_or(Bound::NegInf),
                    hi: candidates.iter().copied().max().unwrap_or(Bound::PosInf),
                }
            }
            // Variable shift amount: saturate to the operand's type width.
            None => ty.map_or_else(Self::full, |t| t.interval()),
        }
    }

    fn shr(a: Self, b: Self) -> Self {
        match clamp_shift(b) {
            Some((bl, bh)) => {
                let f = |x: Bound, s: u32| match x {
                    Bound::Fin(v) => Bound::Fin(v >> s.min(127)),
                    inf => inf,
                };
                let candidates = [f(a.lo, bl), f(a.lo, bh), f(a.hi, bl), f(a.hi, bh)];
                Self {
                    lo: candidates.iter().copied().min().unwrap_or(Bound::NegInf),
                    hi: candidates.iter().copied().max().unwrap_or(Bound::PosInf),
                }
            }
            None => {
                // Shifting right only moves toward zero.
                let lo = a.lo.min(Bound::Fin(0));
                let hi = a.hi.max(Bound::Fin(0));
                Self { lo, hi }
            }
        }
    }

    fn bit_not(a: Self) -> Self {
        // ^x == -x - 1
        Self::sub(Self::neg(a), Self::point(1))
    }

    fn min_of(a: Self, b: Self) -> Self {
        Self {
            lo: a.lo.min(b.lo),
            hi: a.hi.min(b.hi),
        }
    }

    fn max_of(a: Self, b: Self) -> Self {
        Self {
            lo: a.lo.max(b.lo),
            hi: a.hi.max(b.hi),
        }
    }
}

fn clamp_shift(b: Interval) -> Option<(u32, u32)> {
    match (b.lo, b.hi) {
        (Bound::Fin(l), Bound::Fin(h)) if l >= 0 && h <= 127 => {
            Some((u32::try_from(l).ok()?, u32::try_from(h).ok()?))
        }
        _ => None,
    }
}

impl IntType {
    /// The full interval of this type.
    #[must_use]
    pub fn interval(&self) -> Interval {
        Interval::of(self.min(), self.max())
    }

    /// The type's name in diagnostics.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}{}", if self.signed { "int" } else { "uint" }, self.bits)
    }
}

/// Provenance of a range fact, weakest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RangeSource {
    /// Nothing is known beyond the type.
    Unknown,
    /// Propagated through arithmetic from known facts.
    Derived,
    /// Tightened by an explicit conditional check.
    Checked,
    /// A compile-time literal.
    Literal,
}

/// The range fact for one SSA value: four bounds folded into one signed
/// interval over extended integers, plus its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFact {
    /// Sound enclosing interval.
    pub interval: Interval,
    /// How the interval was established.
    pub source: RangeSource,
}

impl RangeFact {
    fn new(interval: Interval, source: RangeSource) -> Self {
        Self { interval, source }
    }

    fn unknown() -> Self {
        Self::new(Interval::full(), RangeSource::Unknown)
    }

    /// Meet: interval intersection, weakest source.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        Self::new(
            self.interval.intersect(&other.interval),
            self.source.min(other.source),
        )
    }
}

/// Demand-driven range evaluator for one function.
pub struct RangeEngine<'ir> {
    ir: &'ir FuncIr,
    memo: FxHashMap<ValueId, RangeFact>,
    visiting: FxHashSet<ValueId>,
    self_hit: bool,
}

impl<'ir> RangeEngine<'ir> {
    /// Creates an engine over one lowered function.
    #[must_use]
    pub fn new(ir: &'ir FuncIr) -> Self {
        Self {
            ir,
            memo: FxHashMap::default(),
            visiting: FxHashSet::default(),
            self_hit: false,
        }
    }

    /// The fact for a value as observed in a block: the value's raw fact
    /// refined by every guard dominating that block.
    pub fn fact_at(&mut self, value: ValueId, block: BlockId) -> RangeFact {
        let raw = self.raw(value);
        let guards: Vec<Guard> = self.ir.guards(block).to_vec();
        self.refine(value, raw, &guards)
    }

    /// The value's raw fact: transfer result refined by its defining block's
    /// guards (definitions only execute when those guards hold).
    pub fn raw(&mut self, value: ValueId) -> RangeFact {
        if let Some(hit) = self.memo.get(&value) {
            return *hit;
        }
        if self.visiting.contains(&value) {
            self.self_hit = true;
            return RangeFact::unknown();
        }
        self.visiting.insert(value);
        let base = self.base(value);
        let guards: Vec<Guard> = self.ir.guards(self.ir.value(value).block).to_vec();
        let refined = self.refine(value, base, &guards);
        self.visiting.remove(&value);
        self.memo.insert(value, refined);
        refined
    }

    fn operand(&mut self, arg: ValueId, use_block: BlockId) -> RangeFact {
        let raw = self.raw(arg);
        let guards: Vec<Guard> = self.ir.guards(use_block).to_vec();
        self.refine(arg, raw, &guards)
    }

    fn base(&mut self, value: ValueId) -> RangeFact {
        let v = self.ir.value(value).clone();
        match &v.rvalue {
            Rvalue::Const(ConstValue::Int(k)) => {
                RangeFact::new(Interval::point(*k), RangeSource::Literal)
            }
            Rvalue::Const(_) => RangeFact::new(Interval::full(), RangeSource::Literal),
            Rvalue::Len { .. } | Rvalue::RangeIndex => RangeFact::new(
                Interval {
                    lo: Bound::Fin(0),
                    hi: Bound::PosInf,
                },
                RangeSource::Derived,
            ),
            Rvalue::Unary { op, arg } => {
                let a = self.operand(*arg, v.block);
                let interval = match op {
                    UnOp::Neg => Interval::neg(a.interval),
                    UnOp::BitNot => Interval::bit_not(a.interval),
                    UnOp::Not => Interval::full(),
                };
                RangeFact::new(interval, derived_from(&[a]))
            }
            Rvalue::Binary { op, lhs, rhs } => {
                let a = self.operand(*lhs, v.block);
                let b = self.operand(*rhs, v.block);
                let interval = match op {
                    BinOp::Add => Interval::add(a.interval, b.interval),
                    BinOp::Sub => Interval::sub(a.interval, b.interval),
                    BinOp::Mul => Interval::mul(a.interval, b.interval),
                    BinOp::Div => Interval::div(a.interval, b.interval),
                    BinOp::Rem => Interval::rem(a.interval, b.interval),
                    BinOp::And => Interval::bit_and(a.interval, b.interval),
                    BinOp::Or | BinOp::Xor => Interval::bit_or_xor(a.interval, b.interval),
                    BinOp::AndNot => Interval::and_not(a.interval, b.interval),
                    BinOp::Shl => Interval::shl(a.interval, b.interval, v.ty),
                    BinOp::Shr => Interval::shr(a.interval, b.interval),
                    BinOp::Min => Interval::min_of(a.interval, b.interval),
                    BinOp::Max => Interval::max_of(a.interval, b.interval),
                    _ => Interval::full(),
                };
                RangeFact::new(interval, derived_from(&[a, b]))
            }
            Rvalue::Phi { args } => self.phi(value, args.clone()),
            Rvalue::Convert { to, arg } => {
                let a = self.operand(*arg, v.block);
                match to {
                    Some(t) if t.interval().contains(&a.interval) => a,
                    Some(t) => RangeFact::new(t.interval(), RangeSource::Derived),
                    None => a,
                }
            }
            Rvalue::Call { target, args } => self.call_fact(target.as_deref_pair(), args, v.ty),
            Rvalue::Source(_)
            | Rvalue::Index { .. }
            | Rvalue::Field { .. }
            | Rvalue::Param { .. }
            | Rvalue::Opaque => v
                .ty
                .map_or_else(RangeFact::unknown, |t| {
                    RangeFact::new(t.interval(), RangeSource::Unknown)
                }),
        }
    }

    fn call_fact(
        &mut self,
        target: Option<(&str, &str)>,
        args: &[ValueId],
        ty: Option<IntType>,
    ) -> RangeFact {
        // Parse routines with an explicit bit size yield the canonical
        // interval of that width.
        if let Some((pkg, name)) = target {
            if pkg == "strconv" && (name == "ParseInt" || name == "ParseUint") {
                let signed = name == "ParseInt";
                if let Some(&bits_arg) = args.get(2) {
                    if let Rvalue::Const(ConstValue::Int(bits)) =
                        &self.ir.value(bits_arg).rvalue
                    {
                        let bits = if *bits == 0 { 64 } else { *bits };
                        if let Ok(bits) = u32::try_from(bits) {
                            if matches!(bits, 8 | 16 | 32 | 64) {
                                let t = IntType { signed, bits };
                                return RangeFact::new(t.interval(), RangeSource::Checked);
                            }
                        }
                    }
                }
            }
            if pkg == "strconv" && name == "Atoi" {
                let t = IntType {
                    signed: true,
                    bits: 64,
                };
                return RangeFact::new(t.interval(), RangeSource::Checked);
            }
        }
        ty.map_or_else(RangeFact::unknown, |t| {
            RangeFact::new(t.interval(), RangeSource::Unknown)
        })
    }

    /// Phi transfer: union of inputs, with directional widening for inputs
    /// that cycle back through the phi itself. When all inputs collapse to
    /// one value the phi is transparent.
    fn phi(&mut self, phi: ValueId, args: Vec<ValueId>) -> RangeFact {
        let mut distinct: Vec<ValueId> = args.into_iter().filter(|a| *a != phi).collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() == 1 {
            return self.raw(distinct[0]);
        }

        let mut acyclic = RangeFact::new(Interval::empty(), RangeSource::Literal);
        let mut grows_up = false;
        let mut grows_down = false;
        let mut wild = false;

        for arg in distinct {
            let before = self.self_hit;
            self.self_hit = false;
            let fact = self.raw(arg);
            let cyclic = self.self_hit;
            self.self_hit = before || cyclic;
            if !cyclic {
                acyclic = RangeFact::new(
                    acyclic.interval.union(&fact.interval),
                    acyclic.source.min(fact.source),
                );
                continue;
            }
            match self.cycle_direction(phi, arg) {
                Some(CycleDir::Increasing) => grows_up = true,
                Some(CycleDir::Decreasing) => grows_down = true,
                None => wild = true,
            }
        }

        let mut interval = acyclic.interval;
        if wild || grows_up {
            interval.hi = Bound::PosInf;
        }
        if wild || grows_down {
            interval.lo = Bound::NegInf;
        }
        RangeFact::new(interval, acyclic.source.min(RangeSource::Derived))
    }

    /// Classifies a back-edge input as a monotone step from the phi itself.
    fn cycle_direction(&mut self, phi: ValueId, arg: ValueId) -> Option<CycleDir> {
        let Rvalue::Binary { op, lhs, rhs } = &self.ir.value(arg).rvalue else {
            return None;
        };
        let (op, lhs, rhs) = (*op, *lhs, *rhs);
        let step_of = |engine: &mut Self, step: ValueId| engine.raw(step).interval;
        match op {
            BinOp::Add if lhs == phi || rhs == phi => {
                let step = if lhs == phi { rhs } else { lhs };
                let s = step_of(self, step);
                if s.lo >= Bound::Fin(0) {
                    Some(CycleDir::Increasing)
                } else if s.hi <= Bound::Fin(0) {
                    Some(CycleDir::Decreasing)
                } else {
                    None
                }
            }
            BinOp::Sub if lhs == phi => {
                let s = step_of(self, rhs);
                if s.lo >= Bound::Fin(0) {
                    Some(CycleDir::Decreasing)
                } else if s.hi <= Bound::Fin(0) {
                    Some(CycleDir::Increasing)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Applies a guard list to a fact, upgrading provenance when a guard
    /// actually tightened the interval.
    fn refine(&mut self, target: ValueId, fact: RangeFact, guards: &[Guard]) -> RangeFact {
        let mut out = fact;
        for guard in guards {
            if let Some(constraint) = self.constraint(target, guard.cond, guard.holds) {
                let tightened = out.interval.intersect(&constraint);
                if tightened != out.interval {
                    let source = if out.source == RangeSource::Literal {
                        RangeSource::Literal
                    } else {
                        RangeSource::Checked
                    };
                    out = RangeFact::new(tightened, source);
                }
            }
        }
        out
    }

    /// The interval a condition (with polarity) imposes on a value.
    fn constraint(&mut self, target: ValueId, cond: ValueId, holds: bool) -> Option<Interval> {
        match self.ir.value(cond).rvalue.clone() {
            Rvalue::Unary {
                op: UnOp::Not,
                arg,
            } => self.constraint(target, arg, !holds),
            Rvalue::Binary { op, lhs, rhs } => match op {
                BinOp::LAnd => {
                    let a = self.constraint(target, lhs, holds);
                    let b = self.constraint(target, rhs, holds);
                    if holds {
                        // Both conjuncts hold: intersect whatever each gives.
                        match (a, b) {
                            (Some(x), Some(y)) => Some(x.intersect(&y)),
                            (one, None) | (None, one) => one,
                        }
                    } else {
                        // Negation of a conjunction is a disjunction: only the
                        // union of both refutations is sound.
                        Some(a?.union(&b?))
                    }
                }
                BinOp::LOr => {
                    let a = self.constraint(target, lhs, holds);
                    let b = self.constraint(target, rhs, holds);
                    if holds {
                        Some(a?.union(&b?))
                    } else {
                        match (a, b) {
                            (Some(x), Some(y)) => Some(x.intersect(&y)),
                            (one, None) | (None, one) => one,
                        }
                    }
                }
                _ if op.is_comparison() => {
                    let op = if holds { op } else { op.negated()? };
                    let rhs_range = self.raw(rhs).interval;
                    if let Some(c) = self.constrain_side(target, lhs, op, rhs_range) {
                        return Some(c);
                    }
                    let lhs_range = self.raw(lhs).interval;
                    self.constrain_side(target, rhs, mirror(op)?, lhs_range)
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Pushes a comparison `expr OP other` down to a constraint on `target`,
    /// inverting additive operations on the way (`x + 10 < 100` bounds `x`).
    fn constrain_side(
        &mut self,
        target: ValueId,
        expr: ValueId,
        op: BinOp,
        other: Interval,
    ) -> Option<Interval> {
        if expr == target {
            return Some(match op {
                BinOp::Lt => Interval {
                    lo: Bound::NegInf,
                    hi: other.hi.pred(),
                },
                BinOp::Le => Interval {
                    lo: Bound::NegInf,
                    hi: other.hi,
                },
                BinOp::Gt => Interval {
                    lo: other.lo.succ(),
                    hi: Bound::PosInf,
                },
                BinOp::Ge => Interval {
                    lo: other.lo,
                    hi: Bound::PosInf,
                },
                BinOp::Eq => other,
                // A != constraint never bounds an interval on its own.
                _ => return None,
            });
        }
        match self.ir.value(expr).rvalue.clone() {
            Rvalue::Binary {
                op: BinOp::Add,
                lhs,
                rhs,
            } => {
                if let Some(k) = self.constant_of(rhs) {
                    return self.constrain_side(
                        target,
                        lhs,
                        op,
                        Interval::sub(other, Interval::point(k)),
                    );
                }
                if let Some(k) = self.constant_of(lhs) {
                    return self.constrain_side(
                        target,
                        rhs,
                        op,
                        Interval::sub(other, Interval::point(k)),
                    );
                }
                None
            }
            Rvalue::Binary {
                op: BinOp::Sub,
                lhs,
                rhs,
            } => {
                if let Some(k) = self.constant_of(rhs) {
                    // x - k OP c  =>  x OP c + k
                    return self.constrain_side(
                        target,
                        lhs,
                        op,
                        Interval::add(other, Interval::point(k)),
                    );
                }
                if let Some(k) = self.constant_of(lhs) {
                    // k - x OP c  =>  x mirror(OP) k - c
                    return self.constrain_side(
                        target,
                        rhs,
                        mirror(op)?,
                        Interval::sub(Interval::point(k), other),
                    );
                }
                None
            }
            Rvalue::Convert { to, arg } => {
                // Only recurse through provably lossless conversions.
                let inner = self.raw(arg).interval;
                match to {
                    Some(t) if t.interval().contains(&inner) => {
                        self.constrain_side(target, arg, op, other)
                    }
                    None => self.constrain_side(target, arg, op, other),
                    Some(_) => None,
                }
            }
            _ => None,
        }
    }

    fn constant_of(&mut self, value: ValueId) -> Option<i128> {
        match &self.ir.value(value).rvalue {
            Rvalue::Const(ConstValue::Int(k)) => Some(*k),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
enum CycleDir {
    Increasing,
    Decreasing,
}

fn derived_from(facts: &[RangeFact]) -> RangeSource {
    if facts.iter().any(|f| f.source == RangeSource::Unknown) {
        RangeSource::Unknown
    } else {
        RangeSource::Derived
    }
}

fn mirror(op: BinOp) -> Option<BinOp> {
    Some(match op {
        BinOp::Lt => BinOp::Gt,
        BinOp::Le => BinOp::Ge,
        BinOp::Gt => BinOp::Lt,
        BinOp::Ge => BinOp::Le,
        BinOp::Eq => BinOp::Eq,
        BinOp::Ne => BinOp::Ne,
        _ => return None,
    })
}

/// Helper used by range transfer on calls.
trait AsDerefPair {
    fn as_deref_pair(&self) -> Option<(&str, &str)>;
}

impl AsDerefPair for Option<(String, String)> {
    fn as_deref_pair(&self) -> Option<(&str, &str)> {
        self.as_ref().map(|(a, b)| (a.as_str(), b.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_arithmetic() {
        let a = Interval::of(1, 5);
        let b = Interval::of(-2, 3);
        assert_eq!(Interval::add(a, b), Interval::of(-1, 8));
        assert_eq!(Interval::sub(a, b), Interval::of(-2, 7));
        assert_eq!(Interval::mul(a, b), Interval::of(-10, 15));
        assert_eq!(Interval::neg(a), Interval::of(-5, -1));
    }

    #[test]
    fn division_splits_around_zero() {
        let a = Interval::of(10, 20);
        let b = Interval::of(-2, 2);
        let d = Interval::div(a, b);
        assert!(d.contains(&Interval::point(20)));
        assert!(d.contains(&Interval::point(-20)));
    }

    #[test]
    fn remainder_follows_dividend_sign() {
        let r = Interval::rem(Interval::of(0, 1000), Interval::point(7));
        assert_eq!(r, Interval::of(0, 6));
    }

    #[test]
    fn mask_tightens_nonnegative_values() {
        let r = Interval::bit_and(Interval::full(), Interval::point(0xFF));
        assert_eq!(r, Interval::of(0, 0xFF));
    }

    #[test]
    fn type_intervals() {
        let i8t = IntType {
            signed: true,
            bits: 8,
        };
        assert_eq!(i8t.interval(), Interval::of(-128, 127));
        let u32t = IntType {
            signed: false,
            bits: 32,
        };
        assert_eq!(u32t.interval(), Interval::of(0, 4_294_967_295));
        assert!(u32t.interval().contains(&Interval::of(0, 10)));
        assert!(!IntType { signed: true, bits: 32 }
            .interval()
            .contains(&u32t.interval()));
    }

    #[test]
    fn union_and_intersection() {
        let a = Interval::of(0, 10);
        let b = Interval::of(5, 20);
        assert_eq!(a.union(&b), Interval::of(0, 20));
        assert_eq!(a.intersect(&b), Interval::of(5, 10));
        assert!(a.intersect(&Interval::of(50, 60)).is_empty());
        assert!(a.contains(&Interval::empty()));
    }
}
