//! Tree IR to CFG lowering.
//!
//! A single-threaded recursive traversal rewrites the expression tree
//! into basic blocks. Local function definitions are deferred into a
//! pending-block table; calls to them collapse into gotos (every such
//! call is a tail call), with continuation blocks synthesized at the
//! first call site and unified across later ones. After the main
//! traversal the pending worklist is drained FIFO, then the graph is
//! compacted and normalized.
//!
//! The only public entry point is [`lower_function`].

use sable_ir::{ExprArena, ExprId, Name};

use crate::cfg::{BlockId, Cfg, Terminator, ValueId, ValueKind};
use crate::error::CfgError;
use crate::lower::pending::PendingTable;
use crate::lower::scope::{BindingKind, Scope};
use crate::normalize::normalize;

mod calls;
mod control_flow;
mod pending;
mod reduce;
mod scope;


/// How lowering treats an identifier that fails scope lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Pass the identifier through as an unresolved value and record a
    /// problem. Lowering continues.
    #[default]
    Lenient,
    /// Fail lowering with [`CfgError::UnresolvedIdentifier`].
    Strict,
}

/// A recoverable problem found during lowering.
///
/// Problems do not stop lowering; they accompany the result so the
/// caller can decide whether to surface them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LowerProblem {
    /// An identifier failed scope lookup under [`ResolvePolicy::Lenient`].
    UnresolvedIdentifier { name: Name },
}

/// The result of lowering one function body.
pub struct Lowered {
    /// The normalized control-flow graph.
    pub cfg: Cfg,
    /// Recoverable problems found along the way.
    pub problems: Vec<LowerProblem>,
}

/// Lower a function body to a normalized CFG.
///
/// `params` are the function's parameters, in declaration order; they
/// are bound in scope before the body is traversed. The body's value
/// flows into the exit block's single phi.
#[expect(
    clippy::cast_possible_truncation,
    reason = "parameter counts never exceed u32"
)]
pub fn lower_function(
    arena: &ExprArena,
    params: &[Name],
    body: ExprId,
    policy: ResolvePolicy,
) -> Result<Lowered, CfgError> {
    let mut reducer = Reducer::new(arena, policy);
    for (index, &name) in params.iter().enumerate() {
        let value = reducer.cfg.add_value(ValueKind::Arg {
            index: index as u32,
        });
        reducer.cfg.value_mut(value).name = name;
        reducer.scope.push(name, BindingKind::Param(value));
    }

    reducer.current = Some(reducer.cfg.entry());
    let exit = reducer.cfg.exit();
    reducer.reduce_tail(body, exit)?;
    reducer.drain_pending()?;

    let Reducer {
        mut cfg, problems, ..
    } = reducer;
    cfg.compact();
    normalize(&mut cfg)?;
    Ok(Lowered { cfg, problems })
}

/// Lowering state threaded through the traversal.
pub(crate) struct Reducer<'a> {
    arena: &'a ExprArena,
    policy: ResolvePolicy,
    cfg: Cfg,
    /// Current lexical scope. Swapped wholesale when a deferred body is
    /// lowered under its definition-site snapshot.
    scope: Scope,
    /// The block currently being emitted into, if any.
    current: Option<BlockId>,
    pending: PendingTable,
    /// Arguments accumulated by partial applications, consumed by the
    /// next enclosing call.
    pending_args: Vec<ValueId>,
    problems: Vec<LowerProblem>,
}

impl<'a> Reducer<'a> {
    fn new(arena: &'a ExprArena, policy: ResolvePolicy) -> Self {
        Self {
            arena,
            policy,
            cfg: Cfg::new(),
            scope: Scope::new(),
            current: None,
            pending: PendingTable::default(),
            pending_args: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Open `block` for emission.
    ///
    /// Fails if another block is still open or if `block` was already
    /// finished. Opening a block is what commits it to the graph.
    fn start_block(&mut self, block: BlockId) -> Result<(), CfgError> {
        if let Some(open) = self.current {
            return Err(CfgError::BlockStillOpen {
                open,
                requested: block,
            });
        }
        if self.cfg.block(block).terminator.is_some() {
            return Err(CfgError::BlockAlreadyFinished { block });
        }
        self.cfg.block_mut(block).in_cfg = true;
        self.current = Some(block);
        Ok(())
    }

    /// Finish the open block with a goto, writing `args` into the
    /// target's phis at the new predecessor slot.
    fn create_goto(&mut self, target: BlockId, args: &[ValueId]) -> Result<(), CfgError> {
        let Some(block) = self.current else {
            return Err(CfgError::NoOpenBlock);
        };
        let expected = self.cfg.block(target).args.len();
        if args.len() != expected {
            return Err(CfgError::GotoArityMismatch {
                block: target,
                expected,
                found: args.len(),
            });
        }

        let slot = self.cfg.add_predecessor(target, block);
        for (i, &arg) in args.iter().enumerate() {
            let phi = self.cfg.block(target).args[i];
            if let ValueKind::Phi { values } = &mut self.cfg.value_mut(phi).kind {
                values[slot] = arg;
            }
        }
        self.cfg.block_mut(block).terminator = Some(Terminator::Goto { target });
        self.current = None;
        Ok(())
    }

    /// Finish the open block with a two-way branch. Both targets gain
    /// this block as a predecessor (they carry no phis, so there are no
    /// slots to fill).
    fn create_branch(
        &mut self,
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<(), CfgError> {
        let Some(block) = self.current else {
            return Err(CfgError::NoOpenBlock);
        };
        debug_assert!(self.cfg.block(then_block).args.is_empty());
        debug_assert!(self.cfg.block(else_block).args.is_empty());
        self.cfg.add_predecessor(then_block, block);
        self.cfg.add_predecessor(else_block, block);
        self.cfg.block_mut(block).terminator = Some(Terminator::Branch {
            cond,
            then_block,
            else_block,
        });
        self.current = None;
        Ok(())
    }

    /// Append an instruction to the open block.
    fn emit_instr(&mut self, kind: ValueKind, name: Name) -> Result<ValueId, CfgError> {
        let Some(block) = self.current else {
            return Err(CfgError::NoOpenBlock);
        };
        let value = self.cfg.add_value(kind);
        let v = self.cfg.value_mut(value);
        v.block = Some(block);
        v.name = name;
        self.cfg.block_mut(block).instrs.push(value);
        Ok(value)
    }
}
