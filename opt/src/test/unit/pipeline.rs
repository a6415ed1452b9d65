//! Whole-pipeline contracts: non-mutation, idempotence, pass ordering.

use ingot_ir::{
    Arena, BinaryOp, CallKind, CompareOp, Expr, Extent, LoopKind, LoweredFunc, Module, ScalarType, Target,
};

use crate::passes::{
    DEBUG_LOG_CALLEE, flatten_blocks, insert_debug_log, map_extern_calls, normalize_bool, simplify,
    substitute_params,
};
use crate::test::helpers::{bound_tensor, count_exprs, find_expr, first_call_name, func_with};
use crate::{OptimizeOpts, PassContext, optimize, optimize_module};

/// A small but representative function: a serial loop storing `a[i] + 0`,
/// with a foldable conditional around it.
fn sample_func() -> LoweredFunc {
    let mut arena = Arena::new();
    let a = bound_tensor(&mut arena, "a", &[8]);
    let out = bound_tensor(&mut arena, "out", &[8]);

    let i = arena.var("i", ScalarType::int32());
    let extent = arena.int32(8);
    let ia = arena.var("i", ScalarType::int32());
    let io = arena.var("i", ScalarType::int32());
    let load = arena.load(a, [ia]);
    let zero = arena.float32(0.0);
    let sum = arena.try_binary(BinaryOp::Add, load, zero).unwrap();
    let store = arena.store(out, [io], sum);
    let loop_body = arena.block([store]);
    let loop_ = arena.for_loop(i, extent, loop_body, LoopKind::Serial);

    let yes = arena.bool_imm(true);
    let wrapped = arena.block([loop_]);
    let guarded = arena.if_then_else(yes, wrapped, None);
    let body = arena.block([guarded]);
    func_with(arena, body)
}

#[test]
fn optimize_never_mutates_its_input() {
    let func = sample_func();
    let snapshot = func.clone();
    let optimized = optimize(&func, &Target::host(), &PassContext::default(), OptimizeOpts::default()).unwrap();
    assert_eq!(func, snapshot, "input tree must be structurally identical after optimization");
    assert_ne!(optimized, func);
}

#[test]
fn optimize_folds_identity_and_conditional() {
    let func = sample_func();
    let optimized = optimize(&func, &Target::host(), &PassContext::default(), OptimizeOpts::default()).unwrap();
    // The `+ 0.0` disappeared and the constant-true guard folded away.
    assert!(find_expr(&optimized.arena, optimized.body, &|e| matches!(e, Expr::Binary { .. })).is_none());
    assert!(find_expr(&optimized.arena, optimized.body, &|e| matches!(e, Expr::IfThenElse { .. })).is_none());
    assert!(find_expr(&optimized.arena, optimized.body, &|e| matches!(e, Expr::For { .. })).is_some());
}

#[test]
fn simplify_is_idempotent() {
    let mut func = sample_func();
    simplify(&mut func).unwrap();
    let after_once = func.clone();
    simplify(&mut func).unwrap();
    assert_eq!(func, after_once);
}

#[test]
fn normalize_bool_is_idempotent() {
    let mut arena = Arena::new();
    let a = arena.var("a", ScalarType::int32());
    let b = arena.var("b", ScalarType::int32());
    let cmp = arena.try_compare(CompareOp::Lt, a, b).unwrap();
    let call = arena.call("any", [cmp], Some(ScalarType::bool_()), CallKind::Extern);
    let mut func = func_with(arena, call);

    normalize_bool(&mut func).unwrap();
    let after_once = func.clone();
    normalize_bool(&mut func).unwrap();
    assert_eq!(func, after_once);
}

/// Running signature mapping before boolean normalization produces a
/// different (wrong) result: the table is keyed on the normalized int8
/// argument type, so the pipeline order maps the call and the swapped
/// order leaves it untouched.
#[test]
fn pass_order_is_a_correctness_contract() {
    let build = || {
        let mut arena = Arena::new();
        let a = arena.var("a", ScalarType::int32());
        let b = arena.var("b", ScalarType::int32());
        let cmp = arena.try_compare(CompareOp::Lt, a, b).unwrap();
        let call = arena.call("any", [cmp], Some(ScalarType::bool_()), CallKind::Extern);
        func_with(arena, call)
    };
    let target = Target::host();
    let ctx = PassContext::default();

    let mut specified = build();
    normalize_bool(&mut specified).unwrap();
    map_extern_calls(&mut specified, &target, &ctx).unwrap();
    assert_eq!(first_call_name(&specified.arena, specified.body).as_deref(), Some("ingot_cpu_any_i8"));

    let mut swapped = build();
    map_extern_calls(&mut swapped, &target, &ctx).unwrap();
    normalize_bool(&mut swapped).unwrap();
    assert_eq!(first_call_name(&swapped.arena, swapped.body).as_deref(), Some("any"));

    assert_ne!(
        first_call_name(&specified.arena, specified.body),
        first_call_name(&swapped.arena, swapped.body),
    );
}

#[test]
fn bool_call_arguments_gain_storage_casts() {
    let mut arena = Arena::new();
    let a = arena.var("a", ScalarType::int32());
    let b = arena.var("b", ScalarType::int32());
    let cmp = arena.try_compare(CompareOp::Lt, a, b).unwrap();
    let call = arena.call("any", [cmp], Some(ScalarType::bool_()), CallKind::Extern);
    let mut func = func_with(arena, call);

    normalize_bool(&mut func).unwrap();
    let Expr::Call { args, .. } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(func.arena.type_of(args[0]), Some(ScalarType::int8()));
    assert!(matches!(func.arena.expr(args[0]), Expr::Cast { .. }));
}

#[test]
fn substitute_params_resolves_vars_and_extents() {
    let mut arena = Arena::new();
    let n_buf = arena.add_buffer(ingot_ir::Buffer::new(
        "buf",
        ScalarType::float32(),
        vec![Extent::Param("n".into())],
    ));
    let t = arena.add_tensor(ingot_ir::Tensor::new("t", vec![Extent::Param("n".into())]).bound_to(n_buf));
    let i = arena.var("i", ScalarType::int32());
    let n = arena.var("n", ScalarType::int32());
    let v = arena.float32(0.0);
    let store = arena.store(t, [i], v);
    let body = arena.block([store]);
    let loop_ = arena.for_loop(i, n, body, LoopKind::Serial);

    let ctx = PassContext::default().with_param("n", 12);
    let mut func = func_with(arena, loop_);
    substitute_params(&mut func, &ctx).unwrap();

    let Expr::For { extent, .. } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(func.arena.expr(*extent).as_imm().map(|(_, v)| v), Some(ingot_ir::Literal::Int(12)));
    let (_, buffer) = func.arena.buffers().next().unwrap();
    assert_eq!(buffer.shape, vec![Extent::Const(12)]);
}

#[test]
fn nested_blocks_flatten() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[1]);
    let idx = arena.int32(0);
    let v = arena.float32(1.0);
    let s1 = arena.store(t, [idx], v);
    let s2 = arena.store(t, [idx], v);
    let inner = arena.block([s1]);
    let middle = arena.block([inner, s2]);
    let empty = arena.block([]);
    let outer = arena.block([middle, empty]);

    let mut func = func_with(arena, outer);
    flatten_blocks(&mut func).unwrap();

    let Expr::Block { stmts } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(stmts.len(), 2);
    assert!(stmts.iter().all(|s| matches!(func.arena.expr(*s), Expr::Store { .. })));
}

#[test]
fn debug_instrumentation_interleaves_log_calls() {
    let func = sample_func();
    let opts = OptimizeOpts { debug_info: true, strip_accel_loops: false };
    let optimized = optimize(&func, &Target::host(), &PassContext::default(), opts).unwrap();

    let log_calls = count_exprs(&optimized.arena, optimized.body, &|e| {
        matches!(e, Expr::Call { name, .. } if name == DEBUG_LOG_CALLEE)
    });
    assert!(log_calls > 0, "debug_info must insert logging callees");

    // It is the last pass: every log call still carries its string payload.
    let stray = find_expr(&optimized.arena, optimized.body, &|e| {
        matches!(e, Expr::Call { name, args, .. } if name == DEBUG_LOG_CALLEE && args.len() != 1)
    });
    assert!(stray.is_none());
}

#[test]
fn debug_instrumentation_pairs_logs_with_statements() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[1]);
    let idx = arena.int32(0);
    let v = arena.float32(1.0);
    let s1 = arena.store(t, [idx], v);
    let s2 = arena.store(t, [idx], v);
    let body = arena.block([s1, s2]);

    let mut func = func_with(arena, body);
    insert_debug_log(&mut func).unwrap();

    let Expr::Block { stmts } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(stmts.len(), 4);
    assert!(matches!(func.arena.expr(stmts[0]), Expr::Call { name, .. } if name == DEBUG_LOG_CALLEE));
    assert!(matches!(func.arena.expr(stmts[1]), Expr::Store { .. }));
}

/// Independent compilations share only the read-only builtin intrinsic
/// table; each thread owns its tree and context.
#[test]
fn independent_compilations_run_concurrently() {
    // One-time initialization happens before the threads start.
    let _ = crate::IntrinsicTable::builtin_shared();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                let func = sample_func();
                let ctx = PassContext::default();
                optimize(&func, &Target::host(), &ctx, OptimizeOpts::default()).unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for result in &results[1..] {
        assert_eq!(result, &results[0], "optimization is deterministic across threads");
    }
}

#[test]
fn module_pipeline_removes_schedule_blocks_and_packs_calls() {
    let mut arena = Arena::new();
    let t = bound_tensor(&mut arena, "t", &[4]);
    let idx = arena.int32(0);
    let v = arena.float32(1.0);
    let store = arena.store(t, [idx], v);
    let annotated_body = arena.block([store]);
    let annotated = arena.push(Expr::ScheduleBlock { name: "s0".into(), body: annotated_body });
    let a1 = arena.int32(1);
    let call = arena.call("ingot_runtime_launch", [a1], None, CallKind::Runtime);
    let body = arena.block([annotated, call]);

    let mut module = Module::new("m");
    module.add_function(func_with(arena, body));
    let snapshot = module.clone();

    let optimized = optimize_module(&module, &Target::host(), &PassContext::default()).unwrap();
    assert_eq!(module, snapshot, "module input must not be mutated");

    let func = &optimized.functions[0];
    assert!(find_expr(&func.arena, func.body, &|e| matches!(e, Expr::ScheduleBlock { .. })).is_none());
    let call = find_expr(&func.arena, func.body, &|e| matches!(e, Expr::Call { .. })).unwrap();
    let Expr::Call { args, .. } = func.arena.expr(call) else {
        panic!();
    };
    assert!(matches!(func.arena.expr(args[0]), Expr::ArgPack { .. }));
}
