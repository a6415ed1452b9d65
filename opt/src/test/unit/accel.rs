//! Accelerator axis binding, loop stripping, and barrier placement.

use ingot_ir::{AccelAxis, Arena, CallKind, Expr, LoopKind, ScalarType, StorageScope};
use smallvec::SmallVec;

use crate::passes::{ACCEL_BARRIER, bind_accel_axes, insert_sync_barriers, strip_accel_loops};
use crate::test::helpers::{bound_tensor, find_expr, func_with};

fn bound_loop(arena: &mut Arena, axis: AccelAxis, extent: i32, body: ingot_ir::ExprId) -> ingot_ir::ExprId {
    let var = arena.var("tx", ScalarType::int32());
    let extent = arena.int32(extent);
    arena.for_loop(var, extent, body, LoopKind::Bound(axis))
}

#[test]
fn axis_binding_records_dimensions() {
    let mut arena = Arena::new();
    let inner_body = arena.block([]);
    let inner = bound_loop(&mut arena, AccelAxis::ThreadX, 64, inner_body);
    let outer_body = arena.block([inner]);
    let outer = bound_loop(&mut arena, AccelAxis::BlockX, 16, outer_body);

    let mut func = func_with(arena, outer);
    bind_accel_axes(&mut func).unwrap();

    let dims = func.accel_dims.expect("axis info should be recorded");
    assert_eq!(dims.0[AccelAxis::BlockX.dim_index()], 16);
    assert_eq!(dims.0[AccelAxis::ThreadX.dim_index()], 64);
    assert_eq!(dims.0[AccelAxis::ThreadY.dim_index()], 1);
}

#[test]
fn stripping_replaces_loop_var_with_axis_index() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[64]);
    let idx = arena.var("tx", ScalarType::int32());
    let v = arena.float32(0.0);
    let store = arena.store(t, [idx], v);
    let body = arena.block([store]);
    let loop_ = bound_loop(&mut arena, AccelAxis::ThreadX, 64, body);

    let mut func = func_with(arena, loop_);
    strip_accel_loops(&mut func).unwrap();

    assert!(find_expr(&func.arena, func.body, &|e| matches!(e, Expr::For { .. })).is_none());
    let index = find_expr(&func.arena, func.body, &|e| matches!(e, Expr::AccelIndex { .. })).unwrap();
    assert!(matches!(func.arena.expr(index), Expr::AccelIndex { axis: AccelAxis::ThreadX }));
}

fn barrier(arena: &mut Arena) -> ingot_ir::ExprId {
    arena.push(Expr::Call {
        name: ACCEL_BARRIER.into(),
        args: SmallVec::new(),
        ret: None,
        kind: CallKind::Intrinsic,
        outputs: SmallVec::new(),
    })
}

#[test]
fn trailing_barrier_is_hoisted_out_of_conditional() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[4]);
    let cond = arena.var("p", ScalarType::bool_());
    let idx = arena.int32(0);
    let v = arena.float32(1.0);
    let store = arena.store(t, [idx], v);
    let sync = barrier(&mut arena);
    let then_block = arena.block([store, sync]);
    let guarded = arena.if_then_else(cond, then_block, None);
    let body = arena.block([guarded]);

    let mut func = func_with(arena, body);
    insert_sync_barriers(&mut func).unwrap();

    let Expr::Block { stmts } = func.arena.expr(func.body) else {
        panic!("body must stay a block");
    };
    assert_eq!(stmts.len(), 2, "barrier should follow the conditional");
    assert!(matches!(func.arena.expr(stmts[0]), Expr::IfThenElse { .. }));
    assert!(matches!(func.arena.expr(stmts[1]), Expr::Call { name, .. } if name == ACCEL_BARRIER));
    // And the then-branch no longer ends with it.
    let Expr::Block { stmts: inner } = func.arena.expr(then_block) else {
        panic!();
    };
    assert_eq!(inner.len(), 1);
}

#[test]
fn local_store_under_guard_gets_barrier() {
    let mut arena = Arena::new();
    let extents = vec![ingot_ir::Extent::Const(4)];
    let buffer = arena.add_buffer(
        ingot_ir::Buffer::new("scratch", ScalarType::float32(), extents.clone()).with_scope(StorageScope::Local),
    );
    let t = arena.add_tensor(ingot_ir::Tensor::new("scratch_view", extents).bound_to(buffer));

    let cond = arena.var("p", ScalarType::bool_());
    let idx = arena.int32(0);
    let v = arena.float32(1.0);
    let store = arena.store(t, [idx], v);
    let then_block = arena.block([store]);
    let guarded = arena.if_then_else(cond, then_block, None);
    let body = arena.block([guarded]);

    let mut func = func_with(arena, body);
    insert_sync_barriers(&mut func).unwrap();

    let Expr::Block { stmts } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(stmts.len(), 2);
    assert!(matches!(func.arena.expr(stmts[1]), Expr::Call { name, .. } if name == ACCEL_BARRIER));
}

#[test]
fn global_store_under_guard_needs_no_barrier() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[4]);
    let cond = arena.var("p", ScalarType::bool_());
    let idx = arena.int32(0);
    let v = arena.float32(1.0);
    let store = arena.store(t, [idx], v);
    let then_block = arena.block([store]);
    let guarded = arena.if_then_else(cond, then_block, None);
    let body = arena.block([guarded]);

    let mut func = func_with(arena, body);
    insert_sync_barriers(&mut func).unwrap();

    let Expr::Block { stmts } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(stmts.len(), 1);
}
