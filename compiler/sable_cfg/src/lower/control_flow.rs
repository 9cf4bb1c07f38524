//! Tail positions and conditionals.

use sable_ir::ExprId;

use crate::cfg::{BlockId, ValueId};
use crate::error::CfgError;
use crate::lower::Reducer;

impl Reducer<'_> {
    /// Reduce `e` in tail position: its value flows into `cont`.
    ///
    /// When the reduction already routed its result into `cont` (a
    /// collapsed tail call or a conditional whose arms both jump there)
    /// no goto is needed here.
    pub(super) fn reduce_tail(&mut self, e: ExprId, cont: BlockId) -> Result<(), CfgError> {
        if let Some(value) = self.reduce(e, Some(cont))? {
            self.create_goto(cont, &[value])?;
        }
        Ok(())
    }

    /// Lower a conditional.
    ///
    /// The condition is evaluated in the open block, which is finished
    /// with a branch to two fresh arm blocks. Both arms inherit the
    /// active continuation; with none active, a one-phi continuation
    /// block is synthesized, emission resumes there afterwards, and its
    /// phi is the conditional's value. Each arm is lowered under its
    /// own scope snapshot so neither sees the other's bindings.
    pub(super) fn reduce_if(
        &mut self,
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
        cont: Option<BlockId>,
    ) -> Result<Option<ValueId>, CfgError> {
        let cond_value = self.reduce_value(cond)?;
        let then_block = self.cfg.add_block(0);
        let else_block = self.cfg.add_block(0);
        let (cont_block, fresh) = match cont {
            Some(block) => (block, false),
            None => (self.cfg.add_block(1), true),
        };
        self.create_branch(cond_value, then_block, else_block)?;

        let saved = self.scope.clone();
        self.start_block(then_block)?;
        self.reduce_tail(then_expr, cont_block)?;
        self.scope = saved.clone();
        self.start_block(else_block)?;
        self.reduce_tail(else_expr, cont_block)?;
        self.scope = saved;

        if fresh {
            self.start_block(cont_block)?;
            Ok(Some(self.cfg.block(cont_block).args[0]))
        } else {
            Ok(None)
        }
    }
}
