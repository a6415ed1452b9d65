//! Call packing, signature mapping, multi-output materialization, and
//! module-level call lowering.

use ingot_ir::{
    Arena, BinaryOp, CallKind, Expr, LoweredFunc, Module, ScalarType, Target, TargetFeature,
};
use smallvec::smallvec;

use crate::passes::{
    FMA_INTRINSIC, bind_call_vars, lower_intrin, map_extern_calls, materialize_multi_output_calls, pack_call_args,
};
use crate::test::helpers::{bound_tensor, find_expr, first_call_name, func_with};
use crate::{Error, PassContext};

#[test]
fn runtime_call_args_get_packed() {
    let mut arena = Arena::new();
    let a = arena.int32(1);
    let b = arena.float32(2.0);
    let c = arena.int32(3);
    let call = arena.call("ingot_runtime_launch", [a, b, c], None, CallKind::Runtime);

    let mut func = func_with(arena, call);
    pack_call_args(&mut func).unwrap();

    let Expr::Call { args, .. } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(args.len(), 1);
    let Expr::ArgPack { args: packed } = func.arena.expr(args[0]) else {
        panic!("single argument should be a pack");
    };
    assert_eq!(packed.len(), 3);

    // Packing is idempotent.
    pack_call_args(&mut func).unwrap();
    let Expr::Call { args, .. } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(args.len(), 1);
}

#[test]
fn extern_call_is_mapped_per_target_and_width() {
    let mut arena = Arena::new();
    let x32 = arena.var("x", ScalarType::float32());
    let call32 = arena.call("tanh", [x32], Some(ScalarType::float32()), CallKind::Extern);
    let x64 = arena.var("y", ScalarType::float64());
    let call64 = arena.call("tanh", [x64], Some(ScalarType::float64()), CallKind::Extern);
    let body = arena.block([call32, call64]);

    let mut func = func_with(arena, body);
    map_extern_calls(&mut func, &Target::host(), &PassContext::default()).unwrap();

    assert!(matches!(func.arena.expr(call32), Expr::Call { name, .. } if name == "ingot_cpu_tanh_fp32"));
    assert!(matches!(func.arena.expr(call64), Expr::Call { name, .. } if name == "ingot_cpu_tanh_fp64"));
}

#[test]
fn unknown_extern_call_passes_through() {
    let mut arena = Arena::new();
    let x = arena.var("x", ScalarType::float32());
    let call = arena.call("bessel_j0", [x], Some(ScalarType::float32()), CallKind::Extern);
    let mut func = func_with(arena, call);
    map_extern_calls(&mut func, &Target::host(), &PassContext::default()).unwrap();
    assert!(matches!(func.arena.expr(func.body), Expr::Call { name, .. } if name == "bessel_j0"));
}

#[test]
fn multi_output_call_grows_shallow_stores() {
    let mut arena = Arena::new();
    let t0 = bound_tensor(&mut arena, "out0", &[4]);
    let t1 = bound_tensor(&mut arena, "out1", &[4]);
    let arg = arena.var("x", ScalarType::float32());
    let call = arena.push(Expr::Call {
        name: "split".into(),
        args: smallvec![arg],
        ret: Some(ScalarType::float32()),
        kind: CallKind::Extern,
        outputs: smallvec![t0, t1],
    });
    let body = arena.block([call]);

    let mut func = func_with(arena, body);
    materialize_multi_output_calls(&mut func).unwrap();

    let Expr::Block { stmts } = func.arena.expr(func.body) else {
        panic!();
    };
    assert_eq!(stmts.len(), 2);
    let Expr::ShallowStore { tensor, value } = func.arena.expr(stmts[1]) else {
        panic!("extra output should become a shallow store");
    };
    assert_eq!(*tensor, t1);
    assert!(matches!(func.arena.expr(*value), Expr::TupleGet { index: 1, .. }));
}

#[test]
fn intra_module_call_args_lower_to_buffers() {
    let mut caller_arena = Arena::new();
    let t = bound_tensor(&mut caller_arena, "t", &[4]);
    let arg = caller_arena.push(Expr::TensorRef { tensor: t });
    let call = caller_arena.call("kernel", [arg], None, CallKind::Runtime);
    let caller = LoweredFunc::new("main", Vec::new(), caller_arena, call);

    let mut callee_arena = Arena::new();
    let callee_body = callee_arena.block([]);
    let callee = LoweredFunc::new("kernel", Vec::new(), callee_arena, callee_body);

    let mut module = Module::new("m");
    module.add_function(callee);
    module.add_function(caller);
    bind_call_vars(&mut module).unwrap();

    let caller = module.function("main").unwrap();
    let Expr::Call { args, .. } = caller.arena.expr(caller.body) else {
        panic!();
    };
    assert!(matches!(caller.arena.expr(args[0]), Expr::BufferRef { .. }));
}

#[test]
fn unbound_tensor_at_call_site_is_fatal() {
    let mut arena = Arena::new();
    let t = arena.add_tensor(ingot_ir::Tensor::new("loose", vec![ingot_ir::Extent::Const(4)]));
    let arg = arena.push(Expr::TensorRef { tensor: t });
    let call = arena.call("kernel", [arg], None, CallKind::Runtime);
    let caller = LoweredFunc::new("main", Vec::new(), arena, call);

    let mut callee_arena = Arena::new();
    let callee_body = callee_arena.block([]);
    let callee = LoweredFunc::new("kernel", Vec::new(), callee_arena, callee_body);

    let mut module = Module::new("m");
    module.add_function(callee);
    module.add_function(caller);
    let err = bind_call_vars(&mut module).unwrap_err();
    assert!(matches!(err, Error::Ir { source: ingot_ir::Error::UnboundTensor { .. } }));
}

#[test]
fn fma_contracts_when_the_target_has_it() {
    let mut arena = Arena::new();
    let a = arena.var("a", ScalarType::float32());
    let b = arena.var("b", ScalarType::float32());
    let c = arena.var("c", ScalarType::float32());
    let mul = arena.try_binary(BinaryOp::Mul, a, b).unwrap();
    let add = arena.try_binary(BinaryOp::Add, mul, c).unwrap();
    let mut func = func_with(arena, add);

    lower_intrin(&mut func, &Target::host()).unwrap();
    assert!(find_expr(&func.arena, func.body, &|e| matches!(e, Expr::Call { .. })).is_none());

    let fma_target = Target::host().with_feature(TargetFeature::Fma);
    lower_intrin(&mut func, &fma_target).unwrap();
    assert_eq!(first_call_name(&func.arena, func.body).as_deref(), Some(FMA_INTRINSIC));
    let Expr::Call { args, ret, kind: CallKind::Intrinsic, .. } = func.arena.expr(func.body) else {
        panic!("fma call expected");
    };
    assert_eq!(args.len(), 3);
    assert_eq!(*ret, Some(ScalarType::float32()));
}
