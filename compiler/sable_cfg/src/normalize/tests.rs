use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use sable_ir::{BinaryOp, ExprArena, ExprId, Name};

use crate::cfg::{Block, BlockId, Cfg, Terminator, ValueKind};
use crate::error::CfgError;
use crate::lower::{lower_function, ResolvePolicy};
use crate::normalize::normalize;
use crate::test_helpers::{block, branch, goto, int};

/// entry -> branch -> (then | else) -> exit.
fn diamond() -> Cfg {
    let mut cfg = Cfg::new();
    let entry = cfg.entry();
    let exit = cfg.exit();
    let then_block = block(&mut cfg, 0);
    let else_block = block(&mut cfg, 0);
    let cond = int(&mut cfg, 0);
    let v1 = int(&mut cfg, 1);
    let v2 = int(&mut cfg, 2);
    branch(&mut cfg, entry, cond, then_block, else_block);
    goto(&mut cfg, then_block, exit, &[v1]);
    goto(&mut cfg, else_block, exit, &[v2]);
    cfg
}

/// entry -> header -> (body -> header | after -> exit), one back edge.
fn single_loop() -> Cfg {
    let mut cfg = Cfg::new();
    let entry = cfg.entry();
    let exit = cfg.exit();
    let header = block(&mut cfg, 1);
    let body = block(&mut cfg, 0);
    let after = block(&mut cfg, 0);
    let init = int(&mut cfg, 0);
    let step = int(&mut cfg, 1);
    let cond = int(&mut cfg, 0);
    let acc = cfg.block(header).args[0];
    goto(&mut cfg, entry, header, &[init]);
    branch(&mut cfg, header, cond, body, after);
    goto(&mut cfg, body, header, &[step]);
    goto(&mut cfg, after, exit, &[acc]);
    cfg
}

#[test]
fn diamond_gets_dense_topological_ids() {
    let mut cfg = diamond();
    assert_eq!(normalize(&mut cfg), Ok(()));

    assert_eq!(cfg.blocks().len(), 4);
    for (i, b) in cfg.blocks().iter().enumerate() {
        assert_eq!(b.id.index(), i);
    }
    assert_eq!(cfg.entry(), BlockId::new(0));
    // The merge point sorts after everything it merges.
    assert_eq!(cfg.exit(), BlockId::new(3));
}

#[test]
fn diamond_dominator_trees() {
    let mut cfg = diamond();
    assert_eq!(normalize(&mut cfg), Ok(()));

    let entry = cfg.entry();
    let exit = cfg.exit();
    for b in cfg.blocks() {
        assert!(cfg.dominates(entry, b.id));
        assert!(cfg.post_dominates(exit, b.id));
        assert!(cfg.dominates(b.id, b.id));
        assert!(cfg.post_dominates(b.id, b.id));
    }
    // Neither arm dominates the merge; it is dominated by the branch.
    assert_eq!(cfg.block(exit).dom.parent, Some(entry));
    assert_eq!(cfg.block(entry).post_dom.parent, Some(exit));
    let arms: Vec<_> = cfg
        .blocks()
        .iter()
        .filter(|b| b.id != entry && b.id != exit)
        .collect();
    assert_eq!(arms.len(), 2);
    for arm in arms {
        assert!(!cfg.dominates(arm.id, exit));
        assert_eq!(arm.dom.parent, Some(entry));
        assert_eq!(arm.post_dom.parent, Some(exit));
    }
}

#[test]
fn loop_back_edge_dominators() {
    let mut cfg = single_loop();
    assert_eq!(normalize(&mut cfg), Ok(()));

    let entry = cfg.entry();
    let exit = cfg.exit();
    let Some(header) = cfg.blocks().iter().find(|b| b.preds.len() == 2) else {
        panic!("no loop header after normalization");
    };
    let header = header.id;
    let Some(body) = cfg.blocks().iter().find(|b| {
        b.id != entry && b.terminator == Some(Terminator::Goto { target: header })
    }) else {
        panic!("no loop body after normalization");
    };
    let body = body.id;

    assert!(cfg.dominates(header, body));
    assert!(!cfg.dominates(body, header));
    assert!(cfg.post_dominates(header, body));
    assert!(cfg.post_dominates(exit, header));
    assert_eq!(cfg.block(body).dom.parent, Some(header));

    // The back edge grew the header's phi to two slots.
    for &phi in &cfg.block(header).args {
        let ValueKind::Phi { values } = &cfg.value(phi).kind else {
            panic!("non-phi block argument");
        };
        assert_eq!(values.len(), cfg.block(header).preds.len());
        assert!(values.iter().all(|v| v.is_valid()));
    }
}

#[test]
fn instruction_ids_are_sequential_from_one() {
    let mut cfg = single_loop();
    assert_eq!(normalize(&mut cfg), Ok(()));

    let mut expected = 1u32;
    for b in cfg.blocks() {
        for &arg in &b.args {
            assert_eq!(cfg.value(arg).instr_id, expected);
            expected += 1;
        }
        for &instr in &b.instrs {
            assert_eq!(cfg.value(instr).instr_id, expected);
            expected += 1;
        }
        if b.terminator.is_some() {
            assert_eq!(b.term_instr_id, expected);
            expected += 1;
        }
    }
    assert_eq!(cfg.num_instrs(), expected);
}

#[test]
fn normalize_is_idempotent() {
    fn snapshot(cfg: &Cfg) -> Vec<(u32, Vec<BlockId>, Option<Terminator>, u32, u32)> {
        cfg.blocks()
            .iter()
            .map(|b| {
                (
                    b.id.raw(),
                    b.preds.clone(),
                    b.terminator,
                    b.dom.node_id,
                    b.post_dom.node_id,
                )
            })
            .collect()
    }

    let mut cfg = single_loop();
    assert_eq!(normalize(&mut cfg), Ok(()));
    let first = snapshot(&cfg);
    assert_eq!(normalize(&mut cfg), Ok(()));
    assert_eq!(snapshot(&cfg), first);
}

#[test]
fn block_that_cannot_reach_exit_is_fatal() {
    let mut cfg = Cfg::new();
    let entry = cfg.entry();
    let exit = cfg.exit();
    let v = int(&mut cfg, 1);
    goto(&mut cfg, entry, exit, &[v]);
    let stuck = block(&mut cfg, 0);
    goto(&mut cfg, stuck, stuck, &[]);

    assert_eq!(
        normalize(&mut cfg),
        Err(CfgError::UnreachableFromExit { count: 1 })
    );
}

#[test]
fn block_not_reached_from_entry_is_fatal() {
    let mut cfg = Cfg::new();
    let entry = cfg.entry();
    let exit = cfg.exit();
    let v1 = int(&mut cfg, 1);
    let v2 = int(&mut cfg, 2);
    goto(&mut cfg, entry, exit, &[v1]);
    let orphan = block(&mut cfg, 0);
    goto(&mut cfg, orphan, exit, &[v2]);

    assert_eq!(
        normalize(&mut cfg),
        Err(CfgError::UnreachableFromEntry { count: 1 })
    );
}

/// Expression shapes for the property test below.
#[derive(Clone, Debug)]
enum Shape {
    Lit(i64),
    Param,
    Bin(Box<Shape>, Box<Shape>),
    If(Box<Shape>, Box<Shape>, Box<Shape>),
    Let(Box<Shape>, Box<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        any::<i8>().prop_map(|v| Shape::Lit(i64::from(v))),
        Just(Shape::Param),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Shape::Bin(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(c, t, e)| Shape::If(
                Box::new(c),
                Box::new(t),
                Box::new(e)
            )),
            (inner.clone(), inner).prop_map(|(d, b)| Shape::Let(Box::new(d), Box::new(b))),
        ]
    })
}

fn build(arena: &mut ExprArena, shape: &Shape, param: Name, scratch: Name) -> ExprId {
    match shape {
        Shape::Lit(v) => arena.int(*v),
        Shape::Param => arena.ident(param),
        Shape::Bin(a, b) => {
            let lhs = build(arena, a, param, scratch);
            let rhs = build(arena, b, param, scratch);
            arena.binary(BinaryOp::Add, lhs, rhs)
        }
        Shape::If(c, t, e) => {
            let cond = build(arena, c, param, scratch);
            let then_expr = build(arena, t, param, scratch);
            let else_expr = build(arena, e, param, scratch);
            arena.if_else(cond, then_expr, else_expr)
        }
        Shape::Let(d, b) => {
            let def = build(arena, d, param, scratch);
            let body = build(arena, b, param, scratch);
            arena.let_in(scratch, def, body)
        }
    }
}

fn dom_chain_contains(cfg: &Cfg, a: BlockId, b: &Block) -> bool {
    let mut cur = Some(b.id);
    while let Some(c) = cur {
        if c == a {
            return true;
        }
        cur = cfg.block(c).dom.parent;
    }
    false
}

fn post_dom_chain_contains(cfg: &Cfg, a: BlockId, b: &Block) -> bool {
    let mut cur = Some(b.id);
    while let Some(c) = cur {
        if c == a {
            return true;
        }
        cur = cfg.block(c).post_dom.parent;
    }
    false
}

proptest! {
    /// Every lowered graph is in normal form: dense topological IDs,
    /// phi arity matching predecessor counts, sequential instruction
    /// IDs, and interval ancestor queries agreeing with explicit
    /// parent-chain walks on both trees.
    #[test]
    fn lowered_cfgs_are_in_normal_form(shape in shape_strategy()) {
        let mut arena = ExprArena::new();
        let param = Name::from_raw(1);
        let scratch = Name::from_raw(2);
        let body = build(&mut arena, &shape, param, scratch);
        let lowered = match lower_function(&arena, &[param], body, ResolvePolicy::Strict) {
            Ok(lowered) => lowered,
            Err(err) => return Err(TestCaseError::fail(format!("lowering failed: {err}"))),
        };
        let cfg = lowered.cfg;

        for (i, b) in cfg.blocks().iter().enumerate() {
            prop_assert_eq!(b.id.index(), i);
        }
        for b in cfg.blocks() {
            for &phi in &b.args {
                if let ValueKind::Phi { values } = &cfg.value(phi).kind {
                    prop_assert_eq!(values.len(), b.preds.len());
                }
            }
        }
        for a in cfg.blocks() {
            for b in cfg.blocks() {
                prop_assert_eq!(cfg.dominates(a.id, b.id), dom_chain_contains(&cfg, a.id, b));
                prop_assert_eq!(
                    cfg.post_dominates(a.id, b.id),
                    post_dom_chain_contains(&cfg, a.id, b)
                );
            }
        }

        let mut expected = 1u32;
        for b in cfg.blocks() {
            for &arg in &b.args {
                prop_assert_eq!(cfg.value(arg).instr_id, expected);
                expected += 1;
            }
            for &instr in &b.instrs {
                prop_assert_eq!(cfg.value(instr).instr_id, expected);
                expected += 1;
            }
            if b.terminator.is_some() {
                prop_assert_eq!(b.term_instr_id, expected);
                expected += 1;
            }
        }
        prop_assert_eq!(cfg.num_instrs(), expected);
        prop_assert!(cfg.dominates(cfg.entry(), cfg.exit()));
        prop_assert!(cfg.post_dominates(cfg.exit(), cfg.entry()));
    }
}
