//! Expression dispatch and the value-producing reductions.
//!
//! `reduce` is the traversal's single entry: given an expression and
//! the continuation currently in force (if any), it produces the
//! expression's value, or `None` when the value already flowed into the
//! continuation through a collapsed tail call or branch.

use sable_ir::{ExprId, ExprKind, Name};

use crate::cfg::{BlockId, ValueId, ValueKind};
use crate::error::CfgError;
use crate::lower::scope::{BindingKind, Scope};
use crate::lower::Reducer;
use crate::lower::{LowerProblem, ResolvePolicy};

impl Reducer<'_> {
    /// Reduce `e` under the continuation `cont`.
    ///
    /// Returns `Ok(None)` only when `cont` is supplied and the result
    /// was routed into it directly.
    pub(super) fn reduce(
        &mut self,
        e: ExprId,
        cont: Option<BlockId>,
    ) -> Result<Option<ValueId>, CfgError> {
        match *self.arena.kind(e) {
            ExprKind::Lit(value) => Ok(Some(self.cfg.add_value(ValueKind::Lit(value)))),
            ExprKind::Ident(name) => self.reduce_ident(name).map(Some),
            ExprKind::Apply { func, arg } => self.reduce_apply(func, arg).map(Some),
            ExprKind::Call { target } => self.reduce_call(target, cont),
            ExprKind::Code { body } => self.reduce_code(body).map(Some),
            ExprKind::Let { name, def, body } => self.reduce_let(name, def, body, cont),
            ExprKind::Letrec { name, def, body } => self.reduce_letrec(name, def, body, cont),
            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => self.reduce_if(cond, then_expr, else_expr, cont),
            ExprKind::Unary { op, arg } => {
                let arg = self.reduce_value(arg)?;
                self.emit_instr(ValueKind::Unary { op, arg }, Name::EMPTY)
                    .map(Some)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.reduce_value(lhs)?;
                let rhs = self.reduce_value(rhs)?;
                self.emit_instr(ValueKind::Binary { op, lhs, rhs }, Name::EMPTY)
                    .map(Some)
            }
        }
    }

    /// Reduce `e` in value position (no continuation).
    ///
    /// Without a continuation every reduction yields a value: calls and
    /// branches synthesize their own continuation block and return its
    /// phi.
    pub(super) fn reduce_value(&mut self, e: ExprId) -> Result<ValueId, CfgError> {
        match self.reduce(e, None)? {
            Some(value) => Ok(value),
            None => {
                debug_assert!(false, "no value produced in value position");
                Err(CfgError::NoOpenBlock)
            }
        }
    }

    /// Resolve an identifier against the scope.
    ///
    /// Let and letrec bindings substitute their already-reduced
    /// definition (no instruction is emitted); parameter bindings yield
    /// the corresponding argument or phi. A miss is handled per the
    /// resolution policy.
    fn reduce_ident(&mut self, name: Name) -> Result<ValueId, CfgError> {
        if let Some(binding) = self.scope.lookup(name) {
            return Ok(binding.value());
        }
        match self.policy {
            ResolvePolicy::Strict => Err(CfgError::UnresolvedIdentifier(name)),
            ResolvePolicy::Lenient => {
                tracing::warn!(name = name.raw(), "unresolved identifier, passing through");
                self.problems.push(LowerProblem::UnresolvedIdentifier { name });
                let value = self.cfg.add_value(ValueKind::Unresolved(name));
                self.cfg.value_mut(value).name = name;
                Ok(value)
            }
        }
    }

    fn reduce_let(
        &mut self,
        name: Name,
        def: ExprId,
        body: ExprId,
        cont: Option<BlockId>,
    ) -> Result<Option<ValueId>, CfgError> {
        let def_value = self.reduce_value(def)?;
        if self.cfg.value(def_value).name.is_empty() {
            self.cfg.value_mut(def_value).name = name;
        }
        self.scope.push(name, BindingKind::Let(def_value));
        let result = self.reduce(body, cont);
        self.scope.pop(name);
        result
    }

    /// Reduce a recursive binding.
    ///
    /// For a function definition the recursive name must be visible
    /// inside the deferred body, so the scope snapshot is installed
    /// after the binding is created. Other definitions reduce as a
    /// plain let would; the name is simply not in scope for them.
    fn reduce_letrec(
        &mut self,
        name: Name,
        def: ExprId,
        body: ExprId,
        cont: Option<BlockId>,
    ) -> Result<Option<ValueId>, CfgError> {
        let def_value = match *self.arena.kind(def) {
            ExprKind::Code { body: code_body } => self.reduce_code_rec(name, code_body)?,
            _ => self.reduce_value(def)?,
        };
        if self.cfg.value(def_value).name.is_empty() {
            self.cfg.value_mut(def_value).name = name;
        }
        self.scope.push(name, BindingKind::Letrec(def_value));
        let result = self.reduce(body, cont);
        self.scope.pop(name);
        result
    }

    /// Defer a local function body: allocate its block (one phi per
    /// in-scope parameter) and record the body with a scope snapshot,
    /// but lower nothing yet.
    fn reduce_code(&mut self, body: ExprId) -> Result<ValueId, CfgError> {
        let (pending, phis) = self.defer_body(body);
        let snapshot = self.scope.fork_with_params(&phis);
        self.pending.set_scope(pending, snapshot);
        Ok(self.cfg.add_value(ValueKind::CodeRef { pending }))
    }

    /// As [`reduce_code`](Self::reduce_code), with the function's own
    /// name bound recursively in the snapshot.
    fn reduce_code_rec(&mut self, name: Name, body: ExprId) -> Result<ValueId, CfgError> {
        let (pending, phis) = self.defer_body(body);
        let value = self.cfg.add_value(ValueKind::CodeRef { pending });

        let mut snapshot = self.scope.clone();
        snapshot.push(name, BindingKind::Letrec(value));
        let snapshot = snapshot.fork_with_params(&phis);
        self.pending.set_scope(pending, snapshot);
        Ok(value)
    }

    /// Allocate the target block and pending entry for a deferred body.
    /// Phis are named after the parameters they stand in for; the scope
    /// snapshot is installed by the caller.
    fn defer_body(&mut self, body: ExprId) -> (u32, Vec<ValueId>) {
        let params = self.scope.param_values();
        let block = self.cfg.add_block(params.len());
        let phis = self.cfg.block(block).args.clone();
        for (&(name, _), &phi) in params.iter().zip(&phis) {
            self.cfg.value_mut(phi).name = name;
        }
        let pending = self.pending.defer(body, block, Scope::new());
        (pending, phis)
    }
}
