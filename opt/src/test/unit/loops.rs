//! Loop canonicalization, unrolling, and vectorization.

use ingot_ir::{Arena, BinaryOp, CompareOp, Expr, Literal, LoopKind, ScalarType, Target};

use crate::error::Error;
use crate::passes::{canonicalize_loops, unroll_loops, vectorize_loops};
use crate::test::helpers::{bound_tensor, count_exprs, find_expr, func_with};

#[test]
fn poly_for_becomes_counted_for() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[8]);
    let i = arena.var("i", ScalarType::int32());
    let init = arena.int32(0);
    let i2 = arena.var("i", ScalarType::int32());
    let extent = arena.int32(8);
    let cond = arena.try_compare(CompareOp::Lt, i2, extent).unwrap();
    let inc = arena.int32(1);
    let v = arena.float32(0.0);
    let store = arena.store(t, [i], v);
    let body = arena.block([store]);
    let poly = arena.push(Expr::PolyFor { var: i, init, condition: cond, inc, body });

    let mut func = func_with(arena, poly);
    canonicalize_loops(&mut func).unwrap();

    match func.arena.expr(func.body) {
        Expr::For { extent: e, kind: LoopKind::Serial, .. } => {
            assert_eq!(func.arena.expr(*e).as_imm(), Some((ScalarType::int32(), Literal::Int(8))));
        }
        other => panic!("expected canonical For, got {other:?}"),
    }
}

#[test]
fn poly_for_with_nonzero_init_is_rejected() {
    let mut arena = Arena::new();
    let i = arena.var("i", ScalarType::int32());
    let init = arena.int32(1);
    let i2 = arena.var("i", ScalarType::int32());
    let extent = arena.int32(8);
    let cond = arena.try_compare(CompareOp::Lt, i2, extent).unwrap();
    let inc = arena.int32(1);
    let body = arena.block([]);
    let poly = arena.push(Expr::PolyFor { var: i, init, condition: cond, inc, body });

    let mut func = func_with(arena, poly);
    let err = canonicalize_loops(&mut func).unwrap_err();
    assert!(matches!(err, Error::PreconditionViolation { pass: "canonicalize_loops", .. }));
}

#[test]
fn hinted_loop_unrolls_to_its_extent() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[4]);
    let i = arena.var("i", ScalarType::int32());
    let extent = arena.int32(3);
    let v = arena.float32(1.0);
    let store = arena.store(t, [i], v);
    let body = arena.block([store]);
    let loop_ = arena.for_loop(i, extent, body, LoopKind::Unrolled { limit: 4 });

    let mut func = func_with(arena, loop_);
    unroll_loops(&mut func).unwrap();

    let Expr::Block { stmts } = func.arena.expr(func.body) else {
        panic!("loop should have been replaced by a block");
    };
    assert_eq!(stmts.len(), 3);
    // Each copy's store index is the substituted iteration constant.
    for (iteration, stmt) in stmts.clone().into_iter().enumerate() {
        let store = find_expr(&func.arena, stmt, &|e| matches!(e, Expr::Store { .. })).unwrap();
        let Expr::Store { indices, .. } = func.arena.expr(store) else {
            unreachable!();
        };
        assert_eq!(
            func.arena.expr(indices[0]).as_imm(),
            Some((ScalarType::int32(), Literal::Int(iteration as i64)))
        );
    }
}

#[test]
fn over_limit_extent_leaves_loop_untouched() {
    let mut arena = Arena::new();
    let i = arena.var("i", ScalarType::int32());
    let extent = arena.int32(16);
    let body = arena.block([]);
    let loop_ = arena.for_loop(i, extent, body, LoopKind::Unrolled { limit: 4 });

    let mut func = func_with(arena, loop_);
    unroll_loops(&mut func).unwrap();
    assert!(matches!(func.arena.expr(func.body), Expr::For { .. }));
}

#[test]
fn vector_hinted_loop_becomes_lane_ops() {
    let mut arena = Arena::new();
    let a = bound_tensor(&mut arena, "a", &[4]);
    let b = bound_tensor(&mut arena, "b", &[4]);
    let c = bound_tensor(&mut arena, "c", &[4]);

    let i = arena.var("i", ScalarType::int32());
    let extent = arena.int32(4);
    let ia = arena.var("i", ScalarType::int32());
    let ib = arena.var("i", ScalarType::int32());
    let ic = arena.var("i", ScalarType::int32());
    let la = arena.load(a, [ia]);
    let lb = arena.load(b, [ib]);
    let sum = arena.try_binary(BinaryOp::Add, la, lb).unwrap();
    let store = arena.store(c, [ic], sum);
    let body = arena.block([store]);
    let loop_ = arena.for_loop(i, extent, body, LoopKind::Vectorized);

    let mut func = func_with(arena, loop_);
    vectorize_loops(&mut func, &Target::host()).unwrap();

    assert!(find_expr(&func.arena, func.body, &|e| matches!(e, Expr::For { .. })).is_none());
    let store = find_expr(&func.arena, func.body, &|e| matches!(e, Expr::Store { .. })).unwrap();
    let Expr::Store { indices, value, .. } = func.arena.expr(store) else {
        unreachable!();
    };
    assert!(matches!(func.arena.expr(indices[0]), Expr::Ramp { stride: 1, lanes: 4, .. }));
    assert_eq!(func.arena.type_of(*value), Some(ScalarType::float32().with_lanes(4)));
    assert_eq!(count_exprs(&func.arena, func.body, &|e| matches!(e, Expr::Ramp { .. })), 3);
}

#[test]
fn vector_factor_beyond_target_lanes_is_rejected() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[8]);
    let i = arena.var("i", ScalarType::int32());
    let extent = arena.int32(8);
    let iv = arena.var("i", ScalarType::int32());
    let v = arena.float32(0.0);
    let store = arena.store(t, [iv], v);
    let body = arena.block([store]);
    let loop_ = arena.for_loop(i, extent, body, LoopKind::Vectorized);

    // 128-bit target: four float32 lanes, eight requested.
    let mut func = func_with(arena, loop_);
    let err = vectorize_loops(&mut func, &Target::host()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedConstruct { pass: "vectorize_loops", .. }));
}

#[test]
fn symbolic_vector_extent_is_a_precondition_violation() {
    let mut arena = Arena::new();
    let i = arena.var("i", ScalarType::int32());
    let extent = arena.var("n", ScalarType::int32());
    let body = arena.block([]);
    let loop_ = arena.for_loop(i, extent, body, LoopKind::Vectorized);

    let mut func = func_with(arena, loop_);
    let err = vectorize_loops(&mut func, &Target::host()).unwrap_err();
    assert!(matches!(err, Error::PreconditionViolation { pass: "vectorize_loops", .. }));
}
