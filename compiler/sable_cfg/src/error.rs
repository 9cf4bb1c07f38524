//! Fatal lowering and normalization errors.

use sable_ir::Name;
use thiserror::Error;

use crate::cfg::BlockId;

/// A fatal error during CFG construction or normalization.
///
/// These indicate malformed input or an internal protocol violation;
/// recoverable conditions (such as an unresolved identifier under the
/// lenient policy) are reported as problems instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CfgError {
    /// A block that already has a terminator was opened for emission.
    #[error("block {block} is already finished")]
    BlockAlreadyFinished { block: BlockId },

    /// A block was opened while another was still being emitted into.
    #[error("cannot start block {requested} while {open} is still open")]
    BlockStillOpen { open: BlockId, requested: BlockId },

    /// An instruction or terminator was emitted with no block open.
    #[error("no block open for emission")]
    NoOpenBlock,

    /// A goto passed a different number of values than the target has
    /// phi arguments.
    #[error("goto to {block} passes {found} values but the block takes {expected}")]
    GotoArityMismatch {
        block: BlockId,
        expected: usize,
        found: usize,
    },

    /// Two call sites of the same local function demanded different
    /// continuations.
    #[error("local function at block {pending} called with conflicting continuations {have} and {got}")]
    ContinuationConflict {
        pending: BlockId,
        have: BlockId,
        got: BlockId,
    },

    /// An identifier failed scope lookup under the strict policy.
    #[error("unresolved identifier (name #{})", .0.raw())]
    UnresolvedIdentifier(Name),

    /// Blocks remain that cannot reach the exit.
    #[error("{count} block(s) unreachable from the exit")]
    UnreachableFromExit { count: usize },

    /// Blocks remain that the entry cannot reach.
    #[error("{count} block(s) unreachable from the entry")]
    UnreachableFromEntry { count: usize },
}
