//! End-to-end lowering through the public API.

use sable_cfg::{lower_function, CfgError, ResolvePolicy, ValueKind};
use sable_ir::{BinaryOp, ExprArena, StringInterner};

#[test]
fn countdown_loop_end_to_end() {
    // letrec loop = code(if 0 < x then loop(x - 1) else x) in loop(x)
    let mut interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let x = interner.intern("x");
    let f = interner.intern("loop");

    let x1 = arena.ident(x);
    let zero = arena.int(0);
    let cond = arena.binary(BinaryOp::Lt, zero, x1);
    let x2 = arena.ident(x);
    let one = arena.int(1);
    let dec = arena.binary(BinaryOp::Sub, x2, one);
    let f_ref = arena.ident(f);
    let rec_call = arena.call_with(f_ref, &[dec]);
    let x3 = arena.ident(x);
    let if_expr = arena.if_else(cond, rec_call, x3);
    let f_def = arena.code(if_expr);
    let f_ref2 = arena.ident(f);
    let x4 = arena.ident(x);
    let outer_call = arena.call_with(f_ref2, &[x4]);
    let tree = arena.letrec_in(f, f_def, outer_call);

    let Ok(lowered) = lower_function(&arena, &[x], tree, ResolvePolicy::Strict) else {
        panic!("lowering failed");
    };
    let cfg = &lowered.cfg;
    assert!(lowered.problems.is_empty());
    // entry, loop header, two arms, exit
    assert_eq!(cfg.blocks().len(), 5);

    for (i, block) in cfg.blocks().iter().enumerate() {
        assert_eq!(block.id.index(), i);
        assert!(cfg.dominates(cfg.entry(), block.id));
        assert!(cfg.post_dominates(cfg.exit(), block.id));
        if block.id == cfg.exit() {
            assert!(block.terminator.is_none());
        } else {
            assert!(block.terminator.is_some());
        }
        // Calls to the local function collapsed into jumps.
        for &instr in &block.instrs {
            assert!(!matches!(
                cfg.value(instr).kind,
                ValueKind::Call { .. } | ValueKind::Apply { .. }
            ));
        }
    }

    let rendered = cfg.display(&interner).to_string();
    assert!(rendered.contains("branch"));
    assert!(rendered.contains("phi"));
}

#[test]
fn strict_mode_rejects_unresolved_identifiers() {
    let mut interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let unknown = interner.intern("undefined");
    let body = arena.ident(unknown);

    let result = lower_function(&arena, &[], body, ResolvePolicy::Strict);
    assert!(matches!(
        result,
        Err(CfgError::UnresolvedIdentifier(name)) if name == unknown
    ));
}
