//! CFG data model — blocks, values, terminators, dominator tree nodes.
//!
//! The graph is a pair of owning tables on [`Cfg`]: one for basic blocks,
//! one for values. Every cross-reference (predecessor, branch target,
//! dominator parent, phi operand) is an integer handle into those tables,
//! so the whole graph is relocatable and there are no aliased pointers to
//! dangle.
//!
//! Blocks hold phi arguments, ordinary instructions, and at most one
//! terminator. A phi has one value slot per predecessor edge, indexed
//! identically to the block's predecessor list. After normalization the
//! block table is dense and topologically ordered: `blocks[id] == block`.

use std::fmt;

use sable_ir::{BinaryOp, LitValue, Name, UnaryOp};
use smallvec::{smallvec, SmallVec};

/// Basic block handle within a [`Cfg`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new block ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        BlockId(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Value handle within a [`Cfg`].
///
/// Identifies literals, argument references, phis, and instructions
/// alike; whether a value is *placed* in a block is recorded on the
/// [`Value`] itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ValueId(u32);

impl ValueId {
    /// Sentinel for an unfilled phi slot.
    pub const NONE: ValueId = ValueId(u32::MAX);

    /// Create a new value ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        ValueId(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` unless this is the [`ValueId::NONE`] sentinel.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

/// A value in the CFG.
///
/// `block` and `instr_id` are unset until the value is placed in a block
/// and the CFG is renumbered; `instr_id == 0` means unnumbered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    pub kind: ValueKind,
    /// Owning block, for placed values (phis and instructions).
    pub block: Option<BlockId>,
    /// Sequential instruction ID, assigned by normalization; 0 = unassigned.
    pub instr_id: u32,
    /// Optional debug name, inherited from the binding or parameter that
    /// introduced the value.
    pub name: Name,
}

/// The kind of a CFG value.
///
/// `Phi`, `Unary`, `Binary`, and `Call` are instructions and get placed
/// in a block; the remaining kinds are pure operands and are referenced
/// directly without placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// A literal constant.
    Lit(LitValue),

    /// Reference to a parameter of the function being lowered.
    Arg { index: u32 },

    /// An identifier that failed scope lookup, passed through under the
    /// lenient resolution policy.
    Unresolved(Name),

    /// Reference to a deferred local function (pending-block entry).
    ///
    /// A call whose callee reduces to a `CodeRef` collapses into a goto;
    /// a `CodeRef` that is never called never materializes any blocks.
    CodeRef { pending: u32 },

    /// Residual partial application of a non-local callee.
    Apply { func: ValueId, arg: ValueId },

    /// Block-entry merge value: one slot per predecessor edge, slot `j`
    /// carrying the value passed along predecessor `j`.
    Phi { values: Vec<ValueId> },

    /// Primitive unary operation.
    Unary { op: UnaryOp, arg: ValueId },

    /// Primitive binary operation.
    Binary {
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
    },

    /// Residual call to a callee that is not a local function.
    Call { target: ValueId },
}

/// Block terminator.
///
/// Every block except the exit block ends in exactly one of these once
/// lowering finishes it; the exit block is the return sink and stays
/// unterminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump. Phi arguments for the edge were written into
    /// the target's phis at this block's predecessor slot.
    Goto { target: BlockId },

    /// Two-way conditional branch.
    Branch {
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },
}

/// Dominator or post-dominator tree node.
///
/// `node_id` and `subtree_size` encode the tree as pre-order intervals,
/// giving O(1) ancestor queries. Populated only after the owning block's
/// position in topological order is final.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub parent: Option<BlockId>,
    pub node_id: u32,
    pub subtree_size: u32,
}

impl Default for TreeNode {
    fn default() -> Self {
        Self {
            parent: None,
            node_id: 0,
            subtree_size: 1,
        }
    }
}

impl TreeNode {
    /// Interval containment: is `other` inside this node's subtree?
    ///
    /// The subtraction wraps when `other` precedes this node in
    /// pre-order, producing a value far above any subtree size.
    #[inline]
    fn contains(&self, other: &TreeNode) -> bool {
        other.node_id.wrapping_sub(self.node_id) < self.subtree_size
    }
}

/// A basic block.
#[derive(Clone, Debug)]
pub struct Block {
    pub id: BlockId,
    /// Phi arguments at the block's head. The count is fixed at block
    /// creation (the block's arity) and never changes.
    pub args: Vec<ValueId>,
    /// Ordinary instructions, in execution order.
    pub instrs: Vec<ValueId>,
    pub terminator: Option<Terminator>,
    /// Sequential ID of the terminator, assigned by renumbering.
    pub term_instr_id: u32,
    /// Predecessor blocks; `preds.len()` always equals each phi's slot
    /// count.
    pub preds: Vec<BlockId>,
    /// Final block ID from the topological sort.
    pub topo_id: u32,
    /// Block ID from the post-topological sort (distance-like order from
    /// the exit).
    pub post_topo_id: u32,
    /// Transient traversal flag, only meaningful inside normalization.
    pub visited: bool,
    pub dom: TreeNode,
    pub post_dom: TreeNode,
    /// Whether the block was ever reached by lowering. Blocks allocated
    /// for local functions that are never called stay out of the CFG and
    /// are compacted away.
    pub(crate) in_cfg: bool,
}

impl Block {
    fn new(id: BlockId) -> Self {
        Self {
            id,
            args: Vec::new(),
            instrs: Vec::new(),
            terminator: None,
            term_instr_id: 0,
            preds: Vec::new(),
            topo_id: 0,
            post_topo_id: 0,
            visited: false,
            dom: TreeNode::default(),
            post_dom: TreeNode::default(),
            in_cfg: false,
        }
    }

    /// Successor blocks, derived from the terminator.
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match self.terminator {
            None => SmallVec::new(),
            Some(Terminator::Goto { target }) => smallvec![target],
            Some(Terminator::Branch {
                then_block,
                else_block,
                ..
            }) => smallvec![then_block, else_block],
        }
    }
}

/// A control-flow graph.
///
/// Holds a distinguished entry and exit block plus the owning tables for
/// blocks and values. After [`normalize`](crate::normalize::normalize)
/// the block table is dense, topologically ordered, and both dominator
/// trees are populated.
pub struct Cfg {
    pub(crate) entry: BlockId,
    pub(crate) exit: BlockId,
    pub(crate) blocks: Vec<Block>,
    pub(crate) values: Vec<Value>,
    pub(crate) num_instrs: u32,
}

impl Cfg {
    /// Create a CFG with an entry block (no phis) and an exit block
    /// (one phi collecting the function's return values).
    pub fn new() -> Self {
        let mut cfg = Self {
            entry: BlockId::new(0),
            exit: BlockId::new(0),
            blocks: Vec::new(),
            values: Vec::new(),
            num_instrs: 0,
        };
        cfg.entry = cfg.add_block(0);
        cfg.exit = cfg.add_block(1);
        cfg.blocks[cfg.entry.index()].in_cfg = true;
        cfg.blocks[cfg.exit.index()].in_cfg = true;
        cfg
    }

    /// The entry block.
    #[inline]
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// The exit block.
    #[inline]
    pub fn exit(&self) -> BlockId {
        self.exit
    }

    /// All blocks, in table order (topological after normalization).
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The instruction-ID counter after renumbering (the next unused ID;
    /// IDs start at 1, so this is one more than the placed count).
    #[inline]
    pub fn num_instrs(&self) -> u32 {
        self.num_instrs
    }

    /// Get a block by handle.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// Get a block by handle, mutably.
    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    /// Get a value by handle.
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    /// Get a value by handle, mutably.
    pub fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id.index()]
    }

    /// Allocate a new block with `nargs` phi arguments.
    ///
    /// The phi count is the block's arity and never changes afterwards.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "block counts never exceed u32"
    )]
    pub fn add_block(&mut self, nargs: usize) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(Block::new(id));
        let mut args = Vec::with_capacity(nargs);
        for _ in 0..nargs {
            let phi = self.add_value(ValueKind::Phi { values: Vec::new() });
            self.values[phi.index()].block = Some(id);
            args.push(phi);
        }
        self.blocks[id.index()].args = args;
        id
    }

    /// Allocate a new value (unplaced).
    #[expect(
        clippy::cast_possible_truncation,
        reason = "value counts never exceed u32"
    )]
    pub fn add_value(&mut self, kind: ValueKind) -> ValueId {
        let id = ValueId::new(self.values.len() as u32);
        self.values.push(Value {
            kind,
            block: None,
            instr_id: 0,
            name: Name::EMPTY,
        });
        id
    }

    /// Register `pred` as a predecessor of `target` and grow every phi
    /// on `target` by one (unfilled) slot. Returns the new edge's slot
    /// index.
    pub fn add_predecessor(&mut self, target: BlockId, pred: BlockId) -> usize {
        let idx = self.blocks[target.index()].preds.len();
        self.blocks[target.index()].preds.push(pred);
        let args = self.blocks[target.index()].args.clone();
        for phi in args {
            if let ValueKind::Phi { values } = &mut self.values[phi.index()].kind {
                values.push(ValueId::NONE);
            }
        }
        idx
    }

    /// Does block `a` dominate block `b`? Valid only after normalization.
    ///
    /// Every block dominates itself.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.blocks[a.index()]
            .dom
            .contains(&self.blocks[b.index()].dom)
    }

    /// Does block `a` post-dominate block `b`? Valid only after
    /// normalization.
    pub fn post_dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.blocks[a.index()]
            .post_dom
            .contains(&self.blocks[b.index()].post_dom)
    }

    /// Drop blocks that lowering never reached and renumber the survivors
    /// densely, preserving creation order.
    ///
    /// Unreached blocks have no predecessors and no successors into the
    /// live graph (they were allocated for local functions that were
    /// never called), so only block IDs need remapping.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "block counts never exceed u32"
    )]
    pub(crate) fn compact(&mut self) {
        let mut remap: Vec<Option<BlockId>> = vec![None; self.blocks.len()];
        let mut next = 0u32;
        for (i, block) in self.blocks.iter().enumerate() {
            if block.in_cfg {
                remap[i] = Some(BlockId::new(next));
                next += 1;
            }
        }
        if next as usize == self.blocks.len() {
            return;
        }

        for value in &mut self.values {
            if let Some(owner) = value.block {
                value.block = remap[owner.index()];
            }
        }
        self.blocks.retain(|b| b.in_cfg);
        for block in &mut self.blocks {
            if let Some(new_id) = remap[block.id.index()] {
                block.id = new_id;
            }
            for pred in &mut block.preds {
                if let Some(new_id) = remap[pred.index()] {
                    *pred = new_id;
                }
            }
            match &mut block.terminator {
                Some(Terminator::Goto { target }) => {
                    if let Some(new_id) = remap[target.index()] {
                        *target = new_id;
                    }
                }
                Some(Terminator::Branch {
                    then_block,
                    else_block,
                    ..
                }) => {
                    if let Some(new_id) = remap[then_block.index()] {
                        *then_block = new_id;
                    }
                    if let Some(new_id) = remap[else_block.index()] {
                        *else_block = new_id;
                    }
                }
                None => {}
            }
        }
        if let Some(new_entry) = remap[self.entry.index()] {
            self.entry = new_entry;
        }
        if let Some(new_exit) = remap[self.exit.index()] {
            self.exit = new_exit;
        }
    }
}

impl Default for Cfg {
    fn default() -> Self {
        Self::new()
    }
}
