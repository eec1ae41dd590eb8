//! Lowering function bodies into SSA form.
//!
//! Structured control flow only: if/else, for, range, switch, select. Phi
//! values are inserted at joins and loop headers while lowering; `goto` and
//! labeled branches abort the analysis for that function (the engines then
//! see no data, which errs on the reporting side).

use rustc_hash::FxHashMap;
use tree_sitter::Node;

use crate::ast::{self, NodeKind};
use crate::calls;
use crate::context::Context;
use crate::resolve::{self, ConstValue, Resolution};
use crate::rule::RuleError;
use crate::ssa::ir::{
    BinOp, Block, BlockId, ConversionSite, FuncIr, Guard, IntType, Rvalue, UnOp, Value, ValueId,
};
use crate::ssa::taint;
use crate::symbols;

type Env = FxHashMap<String, ValueId>;

/// Lowers one function body into [`FuncIr`].
///
/// # Errors
///
/// Fails on unstructured control flow (`goto`, labeled branches).
pub fn lower(func: Node<'_>, ctx: &Context<'_>) -> Result<FuncIr, RuleError> {
    let mut lowerer = Lowerer {
        ctx,
        ir: FuncIr::default(),
        env: Env::default(),
        block: 0,
        reachable: true,
        breaks: Vec::new(),
        continues: Vec::new(),
        failed: None,
    };
    lowerer.ir.blocks.push(Block::default());

    lowerer.lower_params(func);
    if let Some(body) = func.child_by_field_name("body") {
        lowerer.lower_block_stmts(body);
    }
    match lowerer.failed {
        Some(reason) => Err(RuleError::new(reason)),
        None => Ok(lowerer.ir),
    }
}

struct LoopFrame {
    envs: Vec<Env>,
}

struct Lowerer<'c, 'p> {
    ctx: &'c Context<'p>,
    ir: FuncIr,
    env: Env,
    block: BlockId,
    reachable: bool,
    /// Innermost breakable scope last (loops and switches).
    breaks: Vec<LoopFrame>,
    /// Innermost loop last.
    continues: Vec<LoopFrame>,
    failed: Option<String>,
}

impl Lowerer<'_, '_> {
    fn source(&self) -> &str {
        self.ctx.source()
    }

    fn text(&self, node: Node<'_>) -> &str {
        ast::text_of(node, self.ctx.source())
    }

    fn new_value(&mut self, rvalue: Rvalue, ty: Option<IntType>) -> ValueId {
        let id = self.ir.values.len() as ValueId;
        self.ir.values.push(Value {
            rvalue,
            ty,
            block: self.block,
        });
        id
    }

    fn new_block(&mut self, guards: Vec<Guard>) -> BlockId {
        let id = self.ir.blocks.len() as BlockId;
        self.ir.blocks.push(Block { guards });
        id
    }

    fn guards_here(&self) -> Vec<Guard> {
        self.ir.blocks[self.block as usize].guards.clone()
    }

    fn opaque(&mut self) -> ValueId {
        self.new_value(Rvalue::Opaque, None)
    }

    fn lower_params(&mut self, func: Node<'_>) {
        let mut index = 0;
        for field in ["receiver", "parameters"] {
            let Some(list) = func.child_by_field_name(field) else {
                continue;
            };
            for param in ast::named_children(list) {
                if ast::kind_of(param) != NodeKind::ParameterDecl {
                    continue;
                }
                let ty = param
                    .child_by_field_name("type")
                    .and_then(|t| IntType::named(self.text(t).trim_start_matches('*')));
                for child in ast::named_children(param) {
                    if ast::kind_of(child) == NodeKind::Ident {
                        let value = self.new_value(Rvalue::Param { index }, ty);
                        self.env.insert(self.text(child).to_string(), value);
                        index += 1;
                    }
                }
            }
        }
    }

    // --- statements -----------------------------------------------------

    fn lower_block_stmts(&mut self, block: Node<'_>) {
        for stmt in ast::named_children(block) {
            if self.failed.is_some() || !self.reachable {
                return;
            }
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, stmt: Node<'_>) {
        match ast::kind_of(stmt) {
            NodeKind::ExprStmt => {
                if let Some(e) = stmt.named_child(0) {
                    self.lower_expr(e);
                }
            }
            NodeKind::ShortVarDecl | NodeKind::AssignStmt => self.lower_assign(stmt),
            NodeKind::VarDecl | NodeKind::ConstDecl => self.lower_value_decl(stmt),
            NodeKind::IncStmt | NodeKind::DecStmt => self.lower_inc_dec(stmt),
            NodeKind::IfStmt => self.lower_if(stmt),
            NodeKind::ForStmt => self.lower_for(stmt),
            NodeKind::ExprSwitchStmt | NodeKind::TypeSwitchStmt | NodeKind::SelectStmt => {
                self.lower_switch_like(stmt);
            }
            NodeKind::ReturnStmt => {
                for e in ast::named_children(stmt) {
                    self.lower_expr_list_or_expr(e);
                }
                self.reachable = false;
            }
            NodeKind::GoStmt | NodeKind::DeferStmt => {
                if let Some(e) = stmt.named_child(0) {
                    self.lower_expr(e);
                }
            }
            NodeKind::SendStmt => {
                for e in ast::named_children(stmt) {
                    self.lower_expr(e);
                }
            }
            NodeKind::Block => self.lower_block_stmts(stmt),
            NodeKind::BreakStmt => {
                if stmt.named_child_count() > 0 {
                    self.failed = Some("labeled break".to_string());
                    return;
                }
                if let Some(frame) = self.breaks.last_mut() {
                    frame.envs.push(self.env.clone());
                }
                self.reachable = false;
            }
            NodeKind::ContinueStmt => {
                if stmt.named_child_count() > 0 {
                    self.failed = Some("labeled continue".to_string());
                    return;
                }
                if let Some(frame) = self.continues.last_mut() {
                    frame.envs.push(self.env.clone());
                }
                self.reachable = false;
            }
            NodeKind::GotoStmt | NodeKind::LabeledStmt => {
                self.failed = Some("unstructured control flow".to_string());
            }
            _ => {
                // Unmodeled statement: lower nested expressions opaquely.
                for child in ast::named_children(stmt) {
                    self.lower_expr(child);
                }
            }
        }
    }

    fn lower_expr_list_or_expr(&mut self, node: Node<'_>) {
        if ast::kind_of(node) == NodeKind::ExpressionList {
            for e in ast::named_children(node) {
                self.lower_expr(e);
            }
        } else {
            self.lower_expr(node);
        }
    }

    fn lower_assign(&mut self, stmt: Node<'_>) {
        let Some(left) = stmt.child_by_field_name("left") else {
            return;
        };
        let Some(right) = stmt.child_by_field_name("right") else {
            return;
        };
        let targets = ast::named_children(left);
        let values = ast::named_children(right);

        let op_text = stmt
            .child_by_field_name("operator")
            .map(|o| self.text(o).to_string());
        let compound = op_text
            .as_deref()
            .filter(|t| *t != "=" && *t != ":=")
            .and_then(|t| BinOp::from_token(t.trim_end_matches('=')));

        if let Some(op) = compound {
            // x op= rhs  =>  x = x op rhs
            if let (Some(target), Some(value)) = (targets.first(), values.first()) {
                let rhs = self.lower_expr(*value);
                if ast::kind_of(*target) == NodeKind::Ident {
                    let name = self.text(*target).to_string();
                    let old = self
                        .env
                        .get(&name)
                        .copied()
                        .unwrap_or_else(|| self.opaque());
                    let ty = self.ir.value(old).ty;
                    let new = self.new_value(
                        Rvalue::Binary {
                            op,
                            lhs: old,
                            rhs,
                        },
                        ty,
                    );
                    self.env.insert(name, new);
                }
            }
            return;
        }

        let lowered: Vec<ValueId> = values.iter().map(|v| self.lower_expr(*v)).collect();
        for (i, target) in targets.iter().enumerate() {
            let value = if lowered.len() == targets.len() {
                lowered[i]
            } else if i == 0 && lowered.len() == 1 {
                // Multi-value call: first result carries the call's fact.
                lowered[0]
            } else {
                self.opaque()
            };
            if ast::kind_of(*target) == NodeKind::Ident {
                let name = self.text(*target).to_string();
                if name != "_" {
                    self.env.insert(name, value);
                }
            } else {
                // Writes through selectors/indexes are unmodeled heap state.
                self.lower_expr(*target);
            }
        }
    }

    fn lower_value_decl(&mut self, decl: Node<'_>) {
        let mut stack = vec![decl];
        while let Some(node) = stack.pop() {
            let kind = ast::kind_of(node);
            if kind == NodeKind::VarSpec || kind == NodeKind::ConstSpec {
                self.lower_spec(node);
                continue;
            }
            for child in ast::named_children(node) {
                stack.push(child);
            }
        }
    }

    fn lower_spec(&mut self, spec: Node<'_>) {
        let names: Vec<Node<'_>> = ast::named_children(spec)
            .into_iter()
            .take_while(|n| matches!(ast::kind_of(*n), NodeKind::Ident | NodeKind::BlankIdent))
            .collect();
        let declared_ty = spec
            .child_by_field_name("type")
            .and_then(|t| IntType::named(self.text(t).trim_start_matches('*')));
        let values = spec
            .child_by_field_name("value")
            .map(ast::named_children)
            .unwrap_or_default();

        for (i, name_node) in names.iter().enumerate() {
            let name = self.text(*name_node).to_string();
            if name == "_" {
                continue;
            }
            let value = match values.get(i) {
                Some(v) if values.len() == names.len() => self.lower_expr(*v),
                Some(_) | None if declared_ty.is_some() => {
                    // Integer zero value.
                    self.new_value(Rvalue::Const(ConstValue::Int(0)), declared_ty)
                }
                Some(_) | None => self.opaque(),
            };
            self.env.insert(name, value);
        }
    }

    fn lower_inc_dec(&mut self, stmt: Node<'_>) {
        let op = if ast::kind_of(stmt) == NodeKind::IncStmt {
            BinOp::Add
        } else {
            BinOp::Sub
        };
        let Some(target) = stmt.named_child(0) else {
            return;
        };
        if ast::kind_of(target) != NodeKind::Ident {
            self.lower_expr(target);
            return;
        }
        let name = self.text(target).to_string();
        let old = self
            .env
            .get(&name)
            .copied()
            .unwrap_or_else(|| self.opaque());
        let one = self.new_value(Rvalue::Const(ConstValue::Int(1)), None);
        let ty = self.ir.value(old).ty;
        let new = self.new_value(
            Rvalue::Binary {
                op,
                lhs: old,
                rhs: one,
            },
            ty,
        );
        self.env.insert(name, new);
    }

    fn lower_if(&mut self, stmt: Node<'_>) {
        if let Some(init) = stmt.child_by_field_name("initializer") {
            self.lower_stmt(init);
        }
        let Some(cond) = stmt.child_by_field_name("condition") else {
            return;
        };
        let cond_v = self.lower_expr(cond);
        let outer_guards = self.guards_here();
        let base_env = self.env.clone();

        let mut then_guards = outer_guards.clone();
        then_guards.push(Guard {
            cond: cond_v,
            holds: true,
        });
        let then_block = self.new_block(then_guards);
        self.block = then_block;
        self.reachable = true;
        if let Some(consequence) = stmt.child_by_field_name("consequence") {
            self.lower_block_stmts(consequence);
        }
        let then_branch = (self.env.clone(), self.reachable);

        let mut else_guards = outer_guards.clone();
        else_guards.push(Guard {
            cond: cond_v,
            holds: false,
        });
        let else_block = self.new_block(else_guards);
        self.block = else_block;
        self.env = base_env.clone();
        self.reachable = true;
        if let Some(alternative) = stmt.child_by_field_name("alternative") {
            match ast::kind_of(alternative) {
                NodeKind::Block => self.lower_block_stmts(alternative),
                _ => self.lower_stmt(alternative),
            }
        }
        let else_branch = (self.env.clone(), self.reachable);

        let join = self.new_block(outer_guards);
        self.block = join;
        self.merge_branches(&base_env, vec![then_branch, else_branch]);
    }

    /// Merges branch environments at a join block. Only names visible before
    /// the branch survive it; disagreeing definitions become phi values.
    fn merge_branches(&mut self, base: &Env, branches: Vec<(Env, bool)>) {
        let live: Vec<&(Env, bool)> = branches.iter().filter(|(_, r)| *r).collect();
        self.reachable = !live.is_empty();
        if !self.reachable {
            self.env = base.clone();
            return;
        }
        let mut merged = Env::default();
        for (name, base_value) in base {
            let mut incoming: Vec<ValueId> =
                live.iter().map(|(env, _)| env[name.as_str()]).collect();
            incoming.sort_unstable();
            incoming.dedup();
            let value = if incoming.len() == 1 {
                incoming[0]
            } else {
                self.new_value(
                    Rvalue::Phi {
                        args: incoming.clone(),
                    },
                    self.ir.value(*base_value).ty,
                )
            };
            merged.insert(name.clone(), value);
        }
        self.env = merged;
    }

    fn lower_for(&mut self, stmt: Node<'_>) {
        let clause = ast::named_children(stmt)
            .into_iter()
            .find(|n| matches!(n.kind(), "for_clause" | "range_clause"));
        let body = stmt.child_by_field_name("body");

        match clause {
            Some(c) if c.kind() == "range_clause" => self.lower_range_loop(c, body),
            Some(c) => self.lower_c_style_loop(Some(c), body),
            None => {
                // `for cond {}` or bare `for {}`.
                let cond = ast::named_children(stmt)
                    .into_iter()
                    .find(|n| !matches!(ast::kind_of(*n), NodeKind::Block));
                self.lower_cond_loop(cond, body);
            }
        }
    }

    fn lower_c_style_loop(&mut self, clause: Option<Node<'_>>, body: Option<Node<'_>>) {
        if let Some(init) = clause.and_then(|c| c.child_by_field_name("initializer")) {
            self.lower_stmt(init);
        }
        let cond = clause.and_then(|c| c.child_by_field_name("condition"));
        let update = clause.and_then(|c| c.child_by_field_name("update"));
        self.loop_core(cond, update, None, body);
    }

    fn lower_cond_loop(&mut self, cond: Option<Node<'_>>, body: Option<Node<'_>>) {
        self.loop_core(cond, None, None, body);
    }

    fn lower_range_loop(&mut self, clause: Node<'_>, body: Option<Node<'_>>) {
        let subject = clause
            .child_by_field_name("right")
            .map(|r| self.lower_expr(r));
        let bindings = clause.child_by_field_name("left").map(ast::named_children);
        self.loop_core(None, None, Some((subject, bindings)), body);
    }

    #[allow(clippy::type_complexity)]
    fn loop_core(
        &mut self,
        cond: Option<Node<'_>>,
        update: Option<Node<'_>>,
        range: Option<(Option<ValueId>, Option<Vec<Node<'_>>>)>,
        body: Option<Node<'_>>,
    ) {
        let outer_guards = self.guards_here();
        let base_env = self.env.clone();

        // Loop header: one phi per live variable; back-edge operands are
        // filled in after the body.
        let header = self.new_block(outer_guards.clone());
        self.block = header;
        let mut phis: Vec<(String, ValueId)> = Vec::new();
        for (name, value) in base_env.clone() {
            let ty = self.ir.value(value).ty;
            let phi = self.new_value(Rvalue::Phi { args: vec![value] }, ty);
            self.env.insert(name.clone(), phi);
            phis.push((name, phi));
        }
        let is_range = range.is_some();
        if let Some((subject, bindings)) = range {
            if let Some(bindings) = bindings {
                let mut iter = bindings.into_iter();
                if let Some(index_node) = iter.next() {
                    let index = self.new_value(Rvalue::RangeIndex, None);
                    if ast::kind_of(index_node) == NodeKind::Ident {
                        let name = self.text(index_node).to_string();
                        if name != "_" {
                            self.env.insert(name, index);
                        }
                    }
                    if let Some(elem_node) = iter.next() {
                        let elem = match subject {
                            Some(base) => self.new_value(Rvalue::Index { base, index }, None),
                            None => self.opaque(),
                        };
                        if ast::kind_of(elem_node) == NodeKind::Ident {
                            let name = self.text(elem_node).to_string();
                            if name != "_" {
                                self.env.insert(name, elem);
                            }
                        }
                    }
                }
            }
        }
        let cond_v = cond.map(|c| self.lower_expr(c));
        let header_env = self.env.clone();

        // Body block, guarded by the loop condition when there is one.
        let mut body_guards = outer_guards.clone();
        if let Some(cv) = cond_v {
            body_guards.push(Guard {
                cond: cv,
                holds: true,
            });
        }
        let body_block = self.new_block(body_guards);
        self.block = body_block;
        self.reachable = true;
        self.breaks.push(LoopFrame { envs: Vec::new() });
        self.continues.push(LoopFrame { envs: Vec::new() });
        if let Some(b) = body {
            self.lower_block_stmts(b);
        }
        let continue_frame = self.continues.pop().unwrap_or(LoopFrame { envs: Vec::new() });
        if let Some(u) = update {
            if self.reachable {
                self.lower_stmt(u);
            }
        }
        let body_end_env = self.env.clone();
        let body_end_reachable = self.reachable;
        let break_frame = self.breaks.pop().unwrap_or(LoopFrame { envs: Vec::new() });

        // Fill back-edges.
        for (name, phi) in &phis {
            let mut args: Vec<ValueId> = Vec::new();
            if body_end_reachable {
                if let Some(v) = body_end_env.get(name) {
                    args.push(*v);
                }
            }
            for env in &continue_frame.envs {
                if let Some(v) = env.get(name) {
                    if v != phi {
                        // Continue skips the update; the skipped step is
                        // modeled as an unknown contribution.
                        args.push(*v);
                        let wild = self.new_value(Rvalue::Opaque, None);
                        args.push(wild);
                    }
                }
            }
            if let Rvalue::Phi {
                args: ref mut phi_args,
            } = self.ir.values[*phi as usize].rvalue
            {
                phi_args.extend(args);
            }
        }

        // Exit block: negated condition when one exists.
        let mut exit_guards = outer_guards;
        if let Some(cv) = cond_v {
            exit_guards.push(Guard {
                cond: cv,
                holds: false,
            });
        }
        let exit = self.new_block(exit_guards);
        self.block = exit;

        let normal_exit_reachable = cond_v.is_some() || is_range;
        let mut branches: Vec<(Env, bool)> = vec![(header_env, normal_exit_reachable)];
        for env in break_frame.envs {
            branches.push((env, true));
        }
        self.merge_branches(&base_env, branches);
    }

    /// Switch, type switch, and select all lower as a guarded branch fan.
    fn lower_switch_like(&mut self, stmt: Node<'_>) {
        if let Some(init) = stmt.child_by_field_name("initializer") {
            self.lower_stmt(init);
        }
        let subject = stmt
            .child_by_field_name("value")
            .map(|v| self.lower_expr(v));
        let outer_guards = self.guards_here();
        let base_env = self.env.clone();

        self.breaks.push(LoopFrame { envs: Vec::new() });
        let mut branches: Vec<(Env, bool)> = Vec::new();
        let mut has_default = false;
        for case in ast::named_children(stmt) {
            let is_case = matches!(
                case.kind(),
                "expression_case" | "default_case" | "type_case" | "communication_case"
            );
            if !is_case {
                continue;
            }
            if case.kind() == "default_case" {
                has_default = true;
            }
            let case_block = self.new_block(outer_guards.clone());
            self.block = case_block;
            self.env = base_env.clone();
            self.reachable = true;

            if case.kind() == "expression_case" {
                if let (Some(subject_v), Some(values)) =
                    (subject, case.child_by_field_name("value"))
                {
                    let exprs = ast::named_children(values);
                    if let [single] = exprs.as_slice() {
                        let case_v = self.lower_expr(*single);
                        let eq = self.new_value(
                            Rvalue::Binary {
                                op: BinOp::Eq,
                                lhs: subject_v,
                                rhs: case_v,
                            },
                            None,
                        );
                        self.ir.blocks[case_block as usize].guards.push(Guard {
                            cond: eq,
                            holds: true,
                        });
                    } else {
                        for e in exprs {
                            self.lower_expr(e);
                        }
                    }
                }
            }
            for child in ast::named_children(case) {
                if child.kind() != "expression_list" {
                    self.lower_stmt(child);
                }
            }
            branches.push((self.env.clone(), self.reachable));
        }
        let break_frame = self.breaks.pop().unwrap_or(LoopFrame { envs: Vec::new() });
        for env in break_frame.envs {
            branches.push((env, true));
        }
        if !has_default {
            branches.push((base_env.clone(), true));
        }

        let join = self.new_block(outer_guards);
        self.block = join;
        self.merge_branches(&base_env, branches);
    }

    // --- expressions ----------------------------------------------------

    fn lower_expr(&mut self, node: Node<'_>) -> ValueId {
        let id = self.lower_expr_inner(node);
        self.ir.node_value.insert(node.id(), id);
        id
    }

    fn lower_expr_inner(&mut self, node: Node<'_>) -> ValueId {
        // Constant-proved expressions become constants outright; this also
        // covers identifiers bound to constants and well-known selectors.
        if matches!(
            ast::kind_of(node),
            NodeKind::StringLit
                | NodeKind::RawStringLit
                | NodeKind::IntLit
                | NodeKind::FloatLit
                | NodeKind::RuneLit
                | NodeKind::True
                | NodeKind::False
                | NodeKind::Ident
                | NodeKind::SelectorExpr
                | NodeKind::BinaryExpr
                | NodeKind::UnaryExpr
        ) {
            if let Resolution::Known(v) = resolve::resolve(node, self.ctx) {
                return self.new_value(Rvalue::Const(v), None);
            }
        }

        match ast::kind_of(node) {
            NodeKind::ParenExpr => match node.named_child(0) {
                Some(inner) => self.lower_expr(inner),
                None => self.opaque(),
            },
            NodeKind::Ident => {
                let name = self.text(node).to_string();
                self.env
                    .get(&name)
                    .copied()
                    .unwrap_or_else(|| self.opaque())
            }
            NodeKind::SelectorExpr => self.lower_selector(node),
            NodeKind::IndexExpr => {
                let base = match node.child_by_field_name("operand") {
                    Some(b) => self.lower_expr(b),
                    None => self.opaque(),
                };
                let index = match node.child_by_field_name("index") {
                    Some(i) => self.lower_expr(i),
                    None => self.opaque(),
                };
                self.new_value(Rvalue::Index { base, index }, None)
            }
            NodeKind::SliceExpr => {
                let base = match node.child_by_field_name("operand") {
                    Some(b) => self.lower_expr(b),
                    None => self.opaque(),
                };
                self.new_value(Rvalue::Convert { to: None, arg: base }, None)
            }
            NodeKind::UnaryExpr => self.lower_unary(node),
            NodeKind::BinaryExpr => self.lower_binary(node),
            NodeKind::CallExpr => self.lower_call(node),
            NodeKind::TypeConvExpr => {
                let arg = match node.child_by_field_name("operand") {
                    Some(o) => self.lower_expr(o),
                    None => self.opaque(),
                };
                let to = node
                    .child_by_field_name("type")
                    .and_then(|t| IntType::named(self.text(t)));
                if let Some(t) = to {
                    self.record_conversion(node, t, arg);
                }
                self.new_value(Rvalue::Convert { to, arg }, to)
            }
            _ => self.opaque(),
        }
    }

    fn lower_selector(&mut self, node: Node<'_>) -> ValueId {
        let Some(operand) = node.child_by_field_name("operand") else {
            return self.opaque();
        };
        let Some(field) = node.child_by_field_name("field") else {
            return self.opaque();
        };
        let field_name = self.text(field).to_string();

        if ast::kind_of(operand) == NodeKind::Ident {
            let local = self.text(operand);
            if let Some(path) = self.ctx.imports.path_for_local(local) {
                if let Some(kind) = taint::global_source(path, &field_name) {
                    return self.new_value(Rvalue::Source(kind), None);
                }
                // Unresolvable foreign package value.
                return self.opaque();
            }
        }
        // Tainted struct fields, e.g. request.URL.
        if let Some(ty) = symbols::infer_expr_type(
            operand,
            self.source(),
            &self.ctx.imports,
            &self.ctx.pkg.symbols,
        ) {
            let ty = ty.trim_start_matches('*');
            if let Some(kind) = taint::field_source(ty, &field_name) {
                return self.new_value(Rvalue::Source(kind), None);
            }
        }
        let base = self.lower_expr(operand);
        self.new_value(
            Rvalue::Field {
                base,
                name: field_name,
            },
            None,
        )
    }

    fn lower_unary(&mut self, node: Node<'_>) -> ValueId {
        let op_text = node
            .child_by_field_name("operator")
            .map(|o| self.text(o).to_string())
            .unwrap_or_default();
        let Some(operand) = node.child_by_field_name("operand") else {
            return self.opaque();
        };
        match op_text.as_str() {
            "-" | "!" | "^" => {
                let arg = self.lower_expr(operand);
                let op = match op_text.as_str() {
                    "-" => UnOp::Neg,
                    "!" => UnOp::Not,
                    _ => UnOp::BitNot,
                };
                let ty = self.ir.value(arg).ty;
                self.new_value(Rvalue::Unary { op, arg }, ty)
            }
            "*" => {
                let arg = self.lower_expr(operand);
                self.new_value(Rvalue::Convert { to: None, arg }, None)
            }
            _ => {
                self.lower_expr(operand);
                self.opaque()
            }
        }
    }

    fn lower_binary(&mut self, node: Node<'_>) -> ValueId {
        let op = node
            .child_by_field_name("operator")
            .and_then(|o| BinOp::from_token(self.text(o)));
        let lhs = match node.child_by_field_name("left") {
            Some(l) => self.lower_expr(l),
            None => self.opaque(),
        };
        let rhs = match node.child_by_field_name("right") {
            Some(r) => self.lower_expr(r),
            None => self.opaque(),
        };
        match op {
            Some(op) => {
                let ty = self.ir.value(lhs).ty.or(self.ir.value(rhs).ty);
                self.new_value(Rvalue::Binary { op, lhs, rhs }, ty)
            }
            None => self.opaque(),
        }
    }

    fn lower_call(&mut self, node: Node<'_>) -> ValueId {
        let function = node.child_by_field_name("function");
        let arg_nodes = node
            .child_by_field_name("arguments")
            .map(ast::named_children)
            .unwrap_or_default();

        // Builtins with range semantics.
        if let Some(f) = function {
            if ast::kind_of(f) == NodeKind::Ident {
                let fname = self.text(f).to_string();
                match fname.as_str() {
                    "len" | "cap" if arg_nodes.len() == 1 => {
                        let arg = self.lower_expr(arg_nodes[0]);
                        return self.new_value(Rvalue::Len { arg }, None);
                    }
                    "min" | "max" if !arg_nodes.is_empty() => {
                        let op = if fname == "min" { BinOp::Min } else { BinOp::Max };
                        let mut acc = self.lower_expr(arg_nodes[0]);
                        for rest in &arg_nodes[1..] {
                            let rhs = self.lower_expr(*rest);
                            let ty = self.ir.value(acc).ty;
                            acc = self.new_value(
                                Rvalue::Binary { op, lhs: acc, rhs },
                                ty,
                            );
                        }
                        return acc;
                    }
                    _ => {
                        if let Some(to) = IntType::named(&fname) {
                            // int32(x) style conversion.
                            if arg_nodes.len() == 1 {
                                let arg = self.lower_expr(arg_nodes[0]);
                                self.record_conversion(node, to, arg);
                                return self
                                    .new_value(Rvalue::Convert { to: Some(to), arg }, Some(to));
                            }
                        }
                        if matches!(fname.as_str(), "string" | "float32" | "float64") {
                            if arg_nodes.len() == 1 {
                                let arg = self.lower_expr(arg_nodes[0]);
                                return self.new_value(Rvalue::Convert { to: None, arg }, None);
                            }
                        }
                    }
                }
            }
        }

        let target = calls::resolve_call_targets(node, self.ctx)
            .into_iter()
            .next();

        let mut args: Vec<ValueId> = Vec::new();
        // A method receiver participates in propagation like an argument.
        if let Some(f) = function {
            if ast::kind_of(f) == NodeKind::SelectorExpr {
                if let Some(operand) = f.child_by_field_name("operand") {
                    let is_pkg = ast::kind_of(operand) == NodeKind::Ident
                        && self
                            .ctx
                            .imports
                            .path_for_local(self.text(operand))
                            .is_some();
                    if !is_pkg {
                        args.push(self.lower_expr(operand));
                    }
                }
            }
        }
        for a in &arg_nodes {
            args.push(self.lower_expr(*a));
        }

        self.new_value(Rvalue::Call { target, args }, None)
    }

    fn record_conversion(&mut self, node: Node<'_>, to: IntType, arg: ValueId) {
        // Conversions of proved non-integer constants are not overflow
        // candidates.
        if let Rvalue::Const(v) = &self.ir.value(arg).rvalue {
            if !matches!(v, ConstValue::Int(_)) {
                return;
            }
        }
        let to_name = node
            .child_by_field_name("function")
            .or_else(|| node.child_by_field_name("type"))
            .map(|f| self.text(f).to_string())
            .unwrap_or_else(|| to.display_name());
        let from_name = self.ir.value(arg).ty.map(|t| t.display_name());
        self.ir.conversions.push(ConversionSite {
            arg,
            block: self.block,
            to,
            to_name,
            from_name,
            span: (node.start_byte(), node.end_byte()),
        });
    }
}
