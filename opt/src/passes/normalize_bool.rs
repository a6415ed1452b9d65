//! Boolean-result normalization and cast cleanup.
//!
//! Guarantees downstream passes (notably external-call signature mapping)
//! that every comparison/logical result crossing a call or store boundary is
//! carried in the canonical 8-bit boolean storage representation (int8), and
//! folds the cast noise this and earlier passes leave behind:
//!
//! - `cast<T>(imm)` folds to a typed immediate,
//! - `cast<T>(x)` where `x` already has type `T` disappears,
//! - `cast<T>(cast<W>(x))` collapses when the inner cast only widened
//!   within the same kind,
//! - boolean-typed arguments of Extern/Runtime calls and boolean values
//!   stored into non-boolean buffers gain an explicit int8 cast.

use ingot_dtype::{ScalarType, TypeKind};
use ingot_ir::{CallKind, Expr, ExprId, LoweredFunc};

use super::helpers::walk_mut;
use crate::error::Result;

pub fn normalize_bool(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        match arena.expr(id).clone() {
            Expr::Cast { ty, value } => {
                // Immediate casts fold directly.
                if let Some((_, lit)) = arena.expr(value).as_imm() {
                    if ty.lanes == 1 {
                        arena.replace(id, Expr::Imm { ty, value: lit.cast(ty) });
                    }
                    return;
                }
                let Some(inner_ty) = arena.type_of(value) else {
                    return;
                };
                // Identity cast.
                if inner_ty == ty {
                    let inner = arena.expr(value).clone();
                    arena.replace(id, inner);
                    return;
                }
                // cast<T>(cast<W>(x)): drop a purely widening inner cast of
                // the same kind.
                if let Expr::Cast { ty: mid_ty, value: innermost } = *arena.expr(value)
                    && let Some(src_ty) = arena.type_of(innermost)
                    && mid_ty.kind == src_ty.kind
                    && mid_ty.lanes == src_ty.lanes
                    && mid_ty.bits >= src_ty.bits
                {
                    arena.replace(id, Expr::Cast { ty, value: innermost });
                }
            }
            Expr::Call { kind: CallKind::Extern | CallKind::Runtime, args, .. } => {
                let boolean_args: Vec<(usize, ExprId)> = args
                    .iter()
                    .enumerate()
                    .filter(|(_, arg)| arena.type_of(**arg).is_some_and(|t| t.is_bool()))
                    .map(|(i, arg)| (i, *arg))
                    .collect();
                if boolean_args.is_empty() {
                    return;
                }
                let wrapped: Vec<(usize, ExprId)> =
                    boolean_args.into_iter().map(|(i, arg)| (i, storage_cast(arena, arg))).collect();
                let Expr::Call { args, .. } = arena.expr_mut(id) else {
                    unreachable!("matched above");
                };
                for (i, new_arg) in wrapped {
                    args[i] = new_arg;
                }
            }
            Expr::Store { tensor, indices, value } => {
                let elem = match arena.tensor(tensor).binding {
                    Some(buffer) => arena.buffer(buffer).elem,
                    // Unbound tensors are codegen's error to report.
                    None => return,
                };
                if arena.type_of(value).is_some_and(|t| t.is_bool()) && !elem.is_bool() {
                    let value = storage_cast(arena, value);
                    arena.replace(id, Expr::Store { tensor, indices, value });
                }
            }
            _ => {}
        }
    });
    Ok(())
}

/// Cast a boolean-typed value to its int8 storage representation, folding
/// immediates on the spot.
fn storage_cast(arena: &mut ingot_ir::Arena, value: ExprId) -> ExprId {
    let lanes = arena.type_of(value).map_or(1, |t| t.lanes);
    let ty = ScalarType::new(TypeKind::Int, 8).with_lanes(lanes);
    match arena.expr(value).as_imm() {
        Some((_, lit)) if lanes == 1 => arena.push(Expr::Imm { ty, value: lit.cast(ty) }),
        _ => arena.push(Expr::Cast { ty, value }),
    }
}
