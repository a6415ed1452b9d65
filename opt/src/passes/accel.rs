//! Accelerator specialization: axis binding, loop-wrapper stripping, and
//! synchronization barriers.
//!
//! Only run for accelerator-class targets. The native CPU backend never
//! sees the IR these passes produce; emitting accelerator modules belongs
//! to the external emission collaborator.

use ingot_ir::{CallKind, Expr, ExprId, Literal, LoopKind, LoweredFunc, StorageScope};
use smallvec::SmallVec;

use super::helpers::{subtree_any, substitute_var, walk_mut};
use crate::error::{Error, Result};

/// Work-group synchronization intrinsic.
pub const ACCEL_BARRIER: &str = "accel.barrier";

/// Record the execution-dimension extents of axis-bound loops on the
/// function. The recorded dimension is the maximum bound extent per axis.
pub fn bind_accel_axes(func: &mut LoweredFunc) -> Result<()> {
    const PASS: &str = "bind_accel_axes";

    let body = func.body;
    let mut dims = func.accel_dims.unwrap_or_default();
    let mut found = func.accel_dims.is_some();
    let mut failure: Option<Error> = None;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::For { extent, kind: LoopKind::Bound(axis), .. } = *arena.expr(id) else {
            return;
        };
        match arena.expr(extent).as_imm() {
            Some((_, Literal::Int(n))) if n >= 0 => {
                let slot = &mut dims.0[axis.dim_index()];
                *slot = (*slot).max(n);
                found = true;
            }
            _ => {
                failure = Some(Error::PreconditionViolation {
                    pass: PASS,
                    detail: format!("extent of loop bound to {axis:?} is not a constant"),
                });
            }
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }
    if found {
        func.accel_dims = Some(dims);
    }
    Ok(())
}

/// Remove now-redundant axis-bound loop wrappers, substituting the
/// execution-dimension index for the loop variable.
///
/// Runs after [`bind_accel_axes`], so each stripped loop's extent is already
/// recorded as the axis dimension and no residual guard is needed.
pub fn strip_accel_loops(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::For { var, body, kind: LoopKind::Bound(axis), .. } = *arena.expr(id) else {
            return;
        };
        let Expr::Var { name, .. } = arena.expr(var).clone() else {
            return;
        };
        let replaced = substitute_var(arena, body, &name, &Expr::AccelIndex { axis });
        let replaced = arena.expr(replaced).clone();
        arena.replace(id, replaced);
    });
    Ok(())
}

/// Place work-group barriers around thread-divergent control flow.
///
/// Two rewrites per block:
/// - a barrier call that terminates a conditional's body is hoisted out
///   behind the conditional (a barrier under a divergent guard deadlocks),
/// - a conditional that stores into Local-scope storage gets a barrier
///   inserted after it, unless one is already there.
pub fn insert_sync_barriers(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::Block { stmts } = arena.expr(id) else {
            return;
        };
        let stmts = stmts.clone();
        let mut rebuilt: SmallVec<[ExprId; 8]> = SmallVec::new();
        let mut changed = false;

        for stmt in stmts {
            if !matches!(arena.expr(stmt), Expr::IfThenElse { .. }) {
                rebuilt.push(stmt);
                continue;
            }

            let hoisted = hoist_trailing_barrier(arena, stmt);
            rebuilt.push(stmt);
            if let Some(barrier) = hoisted {
                rebuilt.push(barrier);
                changed = true;
                continue;
            }
            if stores_to_local(arena, stmt) {
                rebuilt.push(barrier_call(arena));
                changed = true;
            }
        }

        if changed {
            arena.replace(id, Expr::Block { stmts: rebuilt });
        }
    });
    Ok(())
}

/// If the conditional's then-branch ends with a barrier call, remove it
/// there and hand it back for reinsertion after the conditional.
fn hoist_trailing_barrier(arena: &mut ingot_ir::Arena, if_stmt: ExprId) -> Option<ExprId> {
    let Expr::IfThenElse { then_case, .. } = *arena.expr(if_stmt) else {
        return None;
    };
    let Expr::Block { stmts } = arena.expr(then_case) else {
        return None;
    };
    let last = *stmts.last()?;
    if !is_barrier(arena.expr(last)) {
        return None;
    }
    let mut stmts = stmts.clone();
    stmts.pop();
    arena.replace(then_case, Expr::Block { stmts });
    Some(last)
}

fn stores_to_local(arena: &ingot_ir::Arena, root: ExprId) -> bool {
    subtree_any(arena, root, &|arena, expr| {
        let Expr::Store { tensor, .. } = expr else {
            return false;
        };
        arena
            .tensor(*tensor)
            .binding
            .is_some_and(|b| arena.buffer(b).scope == StorageScope::Local)
    })
}

fn is_barrier(expr: &Expr) -> bool {
    matches!(expr, Expr::Call { name, .. } if name == ACCEL_BARRIER)
}

fn barrier_call(arena: &mut ingot_ir::Arena) -> ExprId {
    arena.push(Expr::Call {
        name: ACCEL_BARRIER.into(),
        args: SmallVec::new(),
        ret: None,
        kind: CallKind::Intrinsic,
        outputs: SmallVec::new(),
    })
}
