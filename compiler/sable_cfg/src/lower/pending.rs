//! Deferred local-function bodies awaiting lowering.
//!
//! A `Code` definition does not lower its body where it is defined; it
//! allocates a block, records the body and a scope snapshot here, and
//! waits. The first call fixes the block's continuation and queues the
//! entry; the worklist drains in FIFO order after the main traversal.
//!
//! Entries move `Deferred -> Queued -> Processed`, each transition made
//! exactly once and only by the scheduler. An entry that never leaves
//! `Deferred` belongs to a function that was never called; its block is
//! never started and is compacted out of the graph.

use std::collections::VecDeque;

use sable_ir::ExprId;

use crate::cfg::BlockId;
use crate::lower::scope::Scope;

/// Lifecycle of a pending entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PendingState {
    /// Defined, block allocated, no call seen yet.
    Deferred,
    /// A call fixed the continuation and put the entry on the worklist.
    Queued,
    /// The body has been lowered into the block.
    Processed,
}

/// One deferred local-function body.
pub(crate) struct PendingBlock {
    /// The unlowered body expression.
    pub body: ExprId,
    /// The block the body will be lowered into.
    pub block: BlockId,
    /// Scope at the definition site, with enclosing parameters rebound
    /// to this block's phis.
    pub scope: Scope,
    /// Where the body's result goes. Fixed by the first call; every
    /// later call must agree.
    pub continuation: Option<BlockId>,
    pub state: PendingState,
}

/// Table of deferred bodies plus the FIFO worklist over them.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: Vec<PendingBlock>,
    queue: VecDeque<u32>,
}

impl PendingTable {
    /// Record a new deferred body. Returns its index, which is also the
    /// payload of the `CodeRef` value standing in for the function.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "pending counts never exceed u32"
    )]
    pub fn defer(&mut self, body: ExprId, block: BlockId, scope: Scope) -> u32 {
        let index = self.entries.len() as u32;
        self.entries.push(PendingBlock {
            body,
            block,
            scope,
            continuation: None,
            state: PendingState::Deferred,
        });
        index
    }

    pub fn entry(&self, index: u32) -> &PendingBlock {
        &self.entries[index as usize]
    }

    /// Replace the scope snapshot of a deferred entry.
    ///
    /// Used once per entry, right after `defer`, to install the snapshot
    /// that includes the function's own recursive binding.
    pub fn set_scope(&mut self, index: u32, scope: Scope) {
        self.entries[index as usize].scope = scope;
    }

    /// Fix the continuation and move the entry onto the worklist.
    ///
    /// Only `Deferred` entries transition; calling a function whose body
    /// is already queued or lowered just reuses the recorded block.
    pub fn enqueue(&mut self, index: u32, continuation: BlockId) {
        let entry = &mut self.entries[index as usize];
        debug_assert!(
            entry.continuation.is_none() || entry.continuation == Some(continuation),
            "enqueue with a conflicting continuation"
        );
        entry.continuation = Some(continuation);
        if entry.state == PendingState::Deferred {
            entry.state = PendingState::Queued;
            self.queue.push_back(index);
        }
    }

    /// Take the next queued entry, FIFO.
    pub fn dequeue(&mut self) -> Option<u32> {
        self.queue.pop_front()
    }

    pub fn mark_processed(&mut self, index: u32) {
        let entry = &mut self.entries[index as usize];
        debug_assert_eq!(entry.state, PendingState::Queued, "processing an unqueued entry");
        entry.state = PendingState::Processed;
    }
}
