//! CFG normalization.
//!
//! Five stages, strictly ordered:
//!
//! 1. Post-topological sort from the exit, following predecessors.
//! 2. Post-dominator computation in that order.
//! 3. Topological sort from the entry, following successors but
//!    visiting a block's post-dominator parent first, so that merge
//!    points sort after everything they merge.
//! 4. Renumbering: blocks get dense IDs in topological order (the block
//!    table is permuted to match), instructions get sequential IDs
//!    starting at 1.
//! 5. Dominator computation over the final order, interleaved with
//!    subtree-size accumulation and pre-order node-ID propagation for
//!    both trees.
//!
//! The dominator algorithm is a single pass: blocks are visited in an
//! order where every forward predecessor is already resolved, so the
//! immediate dominator is the meet of the predecessors' (partial)
//! dominator chains. Back-edges are skipped; their sources resolve
//! later but can never lower the meet. Post-dominators are the mirror
//! image over successors and post-topological IDs.

use crate::cfg::{Block, BlockId, Cfg, Terminator, TreeNode};
use crate::error::CfgError;

#[cfg(test)]
mod tests;

/// Normalize a CFG in place.
///
/// On success the block table is dense and topologically ordered
/// (`blocks[i].id == i`), instruction IDs are sequential from 1, and
/// both dominator trees answer ancestor queries in O(1). Fails if any
/// block cannot reach the exit or cannot be reached from the entry.
///
/// Normalizing an already-normalized graph is a no-op up to the
/// (stable) ordering it produces.
#[expect(
    clippy::cast_possible_truncation,
    reason = "block counts never exceed u32"
)]
pub fn normalize(cfg: &mut Cfg) -> Result<(), CfgError> {
    let n = cfg.blocks.len() as u32;
    for block in &mut cfg.blocks {
        block.visited = false;
        block.topo_id = 0;
        block.post_topo_id = 0;
        block.term_instr_id = 0;
        block.dom = TreeNode::default();
        block.post_dom = TreeNode::default();
    }

    // Stage 1: post-topological sort.
    let exit = cfg.exit;
    let mut id = n;
    post_topo_visit(cfg, exit, &mut id);
    if id != 0 {
        return Err(CfgError::UnreachableFromExit { count: id as usize });
    }

    // Stage 2: post-dominators, in increasing post-topological order so
    // every forward successor is resolved before its predecessors.
    let mut post_order = vec![BlockId::new(0); n as usize];
    for block in &cfg.blocks {
        post_order[block.post_topo_id as usize] = block.id;
    }
    for &block in &post_order {
        compute_post_dominator(cfg, block);
    }
    for block in &mut cfg.blocks {
        block.visited = false;
    }

    // Stage 3: topological sort.
    let entry = cfg.entry;
    let mut id = n;
    topo_visit(cfg, entry, &mut id);
    if id != 0 {
        return Err(CfgError::UnreachableFromEntry { count: id as usize });
    }
    for block in &mut cfg.blocks {
        block.visited = false;
    }

    // Stage 4: permute the block table into topological order and
    // renumber everything.
    renumber(cfg);

    // Stage 5: dominators plus tree metrics. The two trees accumulate
    // in opposite directions: dominator parents precede their children
    // in block order, post-dominator parents follow them.
    for i in 0..cfg.blocks.len() {
        compute_dominator(cfg, i);
        accumulate_subtree(cfg, i, TreeKind::PostDom);
    }
    for i in (0..cfg.blocks.len()).rev() {
        accumulate_subtree(cfg, i, TreeKind::Dom);
        propagate_node_id(cfg, i, TreeKind::PostDom);
    }
    for i in 0..cfg.blocks.len() {
        propagate_node_id(cfg, i, TreeKind::Dom);
    }
    Ok(())
}

/// Depth-first from the exit over predecessors; IDs assigned in
/// decreasing order as the recursion unwinds, so the exit gets 0.
fn post_topo_visit(cfg: &mut Cfg, block: BlockId, id: &mut u32) {
    if cfg.blocks[block.index()].visited {
        return;
    }
    cfg.blocks[block.index()].visited = true;
    let preds = cfg.blocks[block.index()].preds.clone();
    for pred in preds {
        post_topo_visit(cfg, pred, id);
    }
    *id -= 1;
    cfg.blocks[block.index()].post_topo_id = *id;
}

/// Depth-first from the entry over successors, post-dominator parent
/// first; IDs assigned in decreasing order on unwind, so the entry
/// gets 0 and every post-dominator sorts after the blocks it merges.
fn topo_visit(cfg: &mut Cfg, block: BlockId, id: &mut u32) {
    if cfg.blocks[block.index()].visited {
        return;
    }
    cfg.blocks[block.index()].visited = true;
    if let Some(parent) = cfg.blocks[block.index()].post_dom.parent {
        topo_visit(cfg, parent, id);
    }
    for succ in cfg.blocks[block.index()].successors() {
        topo_visit(cfg, succ, id);
    }
    *id -= 1;
    cfg.blocks[block.index()].topo_id = *id;
}

/// Immediate post-dominator of `block`, as the meet of its successors'
/// post-dominator chains. Valid because successors with a smaller
/// post-topological ID are already resolved.
fn compute_post_dominator(cfg: &mut Cfg, block: BlockId) {
    let pid = cfg.blocks[block.index()].post_topo_id;
    let post_id = |cfg: &Cfg, b: BlockId| cfg.blocks[b.index()].post_topo_id;

    let mut candidate: Option<BlockId> = None;
    for succ in cfg.blocks[block.index()].successors() {
        // Back-edge: the successor's own post-dominator isn't final yet.
        if post_id(cfg, succ) >= pid {
            continue;
        }
        let Some(mut cand) = candidate else {
            candidate = Some(succ);
            continue;
        };
        let mut alternate = succ;
        while alternate != cand {
            let walk = if post_id(cfg, cand) > post_id(cfg, alternate) {
                &mut cand
            } else {
                &mut alternate
            };
            let Some(parent) = cfg.blocks[walk.index()].post_dom.parent else {
                debug_assert!(false, "post-dominator chains failed to meet");
                return;
            };
            *walk = parent;
        }
        candidate = Some(cand);
    }
    let node = &mut cfg.blocks[block.index()].post_dom;
    node.parent = candidate;
    node.subtree_size = 1;
}

/// Immediate dominator of the block at `index`, as the meet of its
/// predecessors' dominator chains. Runs after renumbering, so block
/// IDs equal table indices and predecessors with a smaller ID are
/// already resolved.
fn compute_dominator(cfg: &mut Cfg, index: usize) {
    let bid = cfg.blocks[index].id;

    let mut candidate: Option<BlockId> = None;
    let preds = cfg.blocks[index].preds.clone();
    for pred in preds {
        // Back-edge: the predecessor's own dominator isn't final yet.
        if pred >= bid {
            continue;
        }
        let Some(mut cand) = candidate else {
            candidate = Some(pred);
            continue;
        };
        let mut alternate = pred;
        while alternate != cand {
            let walk = if cand > alternate { &mut cand } else { &mut alternate };
            let Some(parent) = cfg.blocks[walk.index()].dom.parent else {
                debug_assert!(false, "dominator chains failed to meet");
                return;
            };
            *walk = parent;
        }
        candidate = Some(cand);
    }
    let node = &mut cfg.blocks[index].dom;
    node.parent = candidate;
    node.subtree_size = 1;
}

/// Permute the block table into topological order, remap every block
/// reference to the new IDs, and assign sequential instruction IDs.
fn renumber(cfg: &mut Cfg) {
    let remap: Vec<BlockId> = cfg.blocks.iter().map(|b| BlockId::new(b.topo_id)).collect();

    for value in &mut cfg.values {
        if let Some(owner) = value.block {
            value.block = Some(remap[owner.index()]);
        }
    }
    for block in &mut cfg.blocks {
        block.id = remap[block.id.index()];
        for pred in &mut block.preds {
            *pred = remap[pred.index()];
        }
        match &mut block.terminator {
            Some(Terminator::Goto { target }) => *target = remap[target.index()],
            Some(Terminator::Branch {
                then_block,
                else_block,
                ..
            }) => {
                *then_block = remap[then_block.index()];
                *else_block = remap[else_block.index()];
            }
            None => {}
        }
        // Dominator parents aren't computed yet; only the post-dominator
        // tree carries pre-permutation IDs at this point.
        if let Some(parent) = block.post_dom.parent {
            block.post_dom.parent = Some(remap[parent.index()]);
        }
    }
    cfg.entry = remap[cfg.entry.index()];
    cfg.exit = remap[cfg.exit.index()];
    cfg.blocks.sort_unstable_by_key(|b| b.id);

    let mut instr_id = 1u32;
    for i in 0..cfg.blocks.len() {
        for j in 0..cfg.blocks[i].args.len() {
            let phi = cfg.blocks[i].args[j];
            cfg.values[phi.index()].instr_id = instr_id;
            instr_id += 1;
        }
        for j in 0..cfg.blocks[i].instrs.len() {
            let instr = cfg.blocks[i].instrs[j];
            cfg.values[instr.index()].instr_id = instr_id;
            instr_id += 1;
        }
        if cfg.blocks[i].terminator.is_some() {
            cfg.blocks[i].term_instr_id = instr_id;
            instr_id += 1;
        }
    }
    cfg.num_instrs = instr_id;
}

#[derive(Clone, Copy)]
enum TreeKind {
    Dom,
    PostDom,
}

fn tree(block: &Block, kind: TreeKind) -> &TreeNode {
    match kind {
        TreeKind::Dom => &block.dom,
        TreeKind::PostDom => &block.post_dom,
    }
}

fn tree_mut(block: &mut Block, kind: TreeKind) -> &mut TreeNode {
    match kind {
        TreeKind::Dom => &mut block.dom,
        TreeKind::PostDom => &mut block.post_dom,
    }
}

/// Add this block's subtree into its parent's running total, leaving
/// the block's node ID as its pre-order offset within the parent.
/// Callers must visit children before parents.
fn accumulate_subtree(cfg: &mut Cfg, index: usize, kind: TreeKind) {
    let Some(parent) = tree(&cfg.blocks[index], kind).parent else {
        return;
    };
    let size = tree(&cfg.blocks[index], kind).subtree_size;
    let parent_node = tree_mut(&mut cfg.blocks[parent.index()], kind);
    let offset = parent_node.subtree_size;
    parent_node.subtree_size += size;
    tree_mut(&mut cfg.blocks[index], kind).node_id = offset;
}

/// Turn pre-order offsets into absolute node IDs by adding the parent's
/// final ID. Callers must visit parents before children.
fn propagate_node_id(cfg: &mut Cfg, index: usize, kind: TreeKind) {
    let Some(parent) = tree(&cfg.blocks[index], kind).parent else {
        return;
    };
    let parent_id = tree(&cfg.blocks[parent.index()], kind).node_id;
    tree_mut(&mut cfg.blocks[index], kind).node_id += parent_id;
}
