//! Shared shorthand for building CFGs by hand in tests.

use sable_ir::LitValue;

use crate::cfg::{BlockId, Cfg, Terminator, ValueId, ValueKind};

/// Add an empty block, committed to the graph.
pub(crate) fn block(cfg: &mut Cfg, nargs: usize) -> BlockId {
    let b = cfg.add_block(nargs);
    cfg.block_mut(b).in_cfg = true;
    b
}

/// An unplaced integer literal value.
pub(crate) fn int(cfg: &mut Cfg, value: i64) -> ValueId {
    cfg.add_value(ValueKind::Lit(LitValue::Int(value)))
}

/// Finish `from` with a goto to `to`, writing `args` into `to`'s phis.
pub(crate) fn goto(cfg: &mut Cfg, from: BlockId, to: BlockId, args: &[ValueId]) {
    let slot = cfg.add_predecessor(to, from);
    let phis = cfg.block(to).args.clone();
    assert_eq!(args.len(), phis.len(), "goto arity mismatch in test setup");
    for (&phi, &arg) in phis.iter().zip(args) {
        if let ValueKind::Phi { values } = &mut cfg.value_mut(phi).kind {
            values[slot] = arg;
        }
    }
    cfg.block_mut(from).terminator = Some(Terminator::Goto { target: to });
}

/// Finish `from` with a branch to two (phi-less) targets.
pub(crate) fn branch(
    cfg: &mut Cfg,
    from: BlockId,
    cond: ValueId,
    then_block: BlockId,
    else_block: BlockId,
) {
    cfg.add_predecessor(then_block, from);
    cfg.add_predecessor(else_block, from);
    cfg.block_mut(from).terminator = Some(Terminator::Branch {
        cond,
        then_block,
        else_block,
    });
}
