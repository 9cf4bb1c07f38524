//! Application, call collapsing, and the pending-block worklist.
//!
//! Calls are curried: `Apply` nodes stack arguments onto a ledger, and
//! the enclosing `Call` consumes them. A call whose callee is a local
//! function becomes a goto into the function's block, with the call's
//! continuation fixed (or synthesized) at that point. Any other callee
//! yields a residual call instruction.

use std::mem;

use sable_ir::{ExprId, Name};

use crate::cfg::{BlockId, ValueId, ValueKind};
use crate::error::CfgError;
use crate::lower::pending::PendingState;
use crate::lower::Reducer;

impl Reducer<'_> {
    /// Reduce a partial application.
    ///
    /// When the function side is a local-function reference the
    /// argument joins the ledger and the reference is passed along;
    /// otherwise a residual apply value is built.
    pub(super) fn reduce_apply(&mut self, func: ExprId, arg: ExprId) -> Result<ValueId, CfgError> {
        let func_value = self.reduce_value(func)?;
        let arg_value = self.reduce_value(arg)?;
        if matches!(self.cfg.value(func_value).kind, ValueKind::CodeRef { .. }) {
            self.pending_args.push(arg_value);
            Ok(func_value)
        } else {
            Ok(self.cfg.add_value(ValueKind::Apply {
                func: func_value,
                arg: arg_value,
            }))
        }
    }

    /// Reduce a call.
    ///
    /// The ledger position is captured first so that only the arguments
    /// of this call's own apply chain are consumed, even when argument
    /// expressions contain further calls.
    pub(super) fn reduce_call(
        &mut self,
        target: ExprId,
        cont: Option<BlockId>,
    ) -> Result<Option<ValueId>, CfgError> {
        let ledger_base = self.pending_args.len();
        let callee = self.reduce_value(target)?;
        if let ValueKind::CodeRef { pending } = self.cfg.value(callee).kind {
            let args = self.pending_args.split_off(ledger_base);
            self.collapse_call(pending, &args, cont)
        } else {
            debug_assert_eq!(
                self.pending_args.len(),
                ledger_base,
                "ledger grew under a non-local callee"
            );
            self.emit_instr(ValueKind::Call { target: callee }, Name::EMPTY)
                .map(Some)
        }
    }

    /// Collapse a call to a local function into a goto.
    ///
    /// All such calls are tail calls: the caller's block ends here, and
    /// the function's result flows to the continuation. The first call
    /// fixes the continuation (synthesizing a one-phi block when the
    /// caller has none active); later calls must agree or lowering
    /// fails. When the continuation was freshly synthesized, emission
    /// resumes there and the call's value is its phi; otherwise the
    /// call produces no local value.
    fn collapse_call(
        &mut self,
        pending: u32,
        args: &[ValueId],
        cont: Option<BlockId>,
    ) -> Result<Option<ValueId>, CfgError> {
        let target = self.pending.entry(pending).block;
        let (cont_block, fresh) = match cont {
            Some(block) => (block, false),
            None => (self.cfg.add_block(1), true),
        };
        if let Some(have) = self.pending.entry(pending).continuation {
            if have != cont_block {
                return Err(CfgError::ContinuationConflict {
                    pending: target,
                    have,
                    got: cont_block,
                });
            }
        }

        self.create_goto(target, args)?;
        self.pending.enqueue(pending, cont_block);

        if fresh {
            self.start_block(cont_block)?;
            Ok(Some(self.cfg.block(cont_block).args[0]))
        } else {
            Ok(None)
        }
    }

    /// Drain the pending worklist, FIFO.
    ///
    /// Each entry's body is lowered into its block under the saved
    /// scope snapshot, flowing into the continuation its callers fixed.
    /// Lowering a body may enqueue further entries; the loop runs until
    /// the queue is empty. Entries still deferred at that point were
    /// never called and their blocks never join the graph.
    pub(super) fn drain_pending(&mut self) -> Result<(), CfgError> {
        while let Some(index) = self.pending.dequeue() {
            let entry = self.pending.entry(index);
            if entry.state == PendingState::Processed {
                continue;
            }
            let Some(cont) = entry.continuation else {
                continue;
            };
            let block = entry.block;
            let body = entry.body;
            let scope = entry.scope.clone();
            tracing::debug!(block = %block, "lowering deferred function body");

            let saved = mem::replace(&mut self.scope, scope);
            self.start_block(block)?;
            self.reduce_tail(body, cont)?;
            self.scope = saved;
            self.pending.mark_processed(index);
        }
        Ok(())
    }
}
