//! Rewrite loops carrying a vector hint into vector-width operations.
//!
//! The loop's resolved extent is the lane count (the scheduler already split
//! the loop to the width it wants, as with the original polyhedral
//! schedules); the pass widens the body into straight-line vector code:
//!
//! - the induction variable becomes `ramp(0, 1, n)`,
//! - scalars meeting vectors are wrapped in `broadcast`,
//! - loads/stores must end in a unit-stride lane index (`ramp + base`),
//!   anything else cannot be expressed as one contiguous vector access.
//!
//! Runs after unrolling, which resolves the trip counts this pass needs.

use ingot_dtype::ScalarType;
use ingot_ir::{Arena, Expr, ExprId, Literal, LoopKind, LoweredFunc, Target};
use smallvec::SmallVec;

use super::helpers::{substitute_var, walk_mut};
use crate::error::{Error, Result};

const PASS: &str = "vectorize_loops";

pub fn vectorize_loops(func: &mut LoweredFunc, target: &Target) -> Result<()> {
    let body = func.body;
    let mut failure: Option<Error> = None;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        if failure.is_some() {
            return;
        }
        let Expr::For { var, extent, body, kind: LoopKind::Vectorized } = *arena.expr(id) else {
            return;
        };
        let Some((_, Literal::Int(n))) = arena.expr(extent).as_imm() else {
            failure = Some(Error::PreconditionViolation {
                pass: PASS,
                detail: "vector-hinted loop extent did not resolve to a constant".into(),
            });
            return;
        };
        let Expr::Var { name, ty: var_ty } = arena.expr(var).clone() else {
            return;
        };

        if n <= 1 {
            // Degenerate vector loop: a single iteration at lane 0.
            let zero = Expr::Imm { ty: var_ty, value: Literal::Int(0).cast(var_ty) };
            let replacement = substitute_var(arena, body, &name, &zero);
            let replacement = arena.expr(replacement).clone();
            arena.replace(id, replacement);
            return;
        }
        let lanes = n as u16;

        match widen(arena, body, &name, var_ty, lanes, target) {
            Ok(widened) => {
                let widened = arena.expr(widened).clone();
                arena.replace(id, widened);
            }
            Err(err) => failure = Some(err),
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Rebuild the subtree with lane-widened types.
fn widen(
    arena: &mut Arena,
    id: ExprId,
    var: &str,
    var_ty: ScalarType,
    lanes: u16,
    target: &Target,
) -> Result<ExprId, Error> {
    let expr = arena.expr(id).clone();
    let widened = match expr {
        Expr::Var { ref name, .. } if name == var => {
            let base = arena.push(Expr::Imm { ty: var_ty, value: Literal::Int(0) });
            Expr::Ramp { base, stride: 1, lanes }
        }
        leaf @ (Expr::Imm { .. } | Expr::StrImm { .. } | Expr::Var { .. } | Expr::AccelIndex { .. }) => leaf,
        Expr::Binary { op, ty, lhs, rhs } => {
            let lhs = widen(arena, lhs, var, var_ty, lanes, target)?;
            let rhs = widen(arena, rhs, var, var_ty, lanes, target)?;
            let (lhs, rhs, vector) = unify_lanes(arena, lhs, rhs, lanes);
            Expr::Binary { op, ty: if vector { ty.with_lanes(lanes) } else { ty }, lhs, rhs }
        }
        Expr::Compare { op, lhs, rhs } => {
            let lhs = widen(arena, lhs, var, var_ty, lanes, target)?;
            let rhs = widen(arena, rhs, var, var_ty, lanes, target)?;
            let (lhs, rhs, _) = unify_lanes(arena, lhs, rhs, lanes);
            Expr::Compare { op, lhs, rhs }
        }
        Expr::Logical { op, lhs, rhs } => {
            let lhs = widen(arena, lhs, var, var_ty, lanes, target)?;
            let rhs = widen(arena, rhs, var, var_ty, lanes, target)?;
            let (lhs, rhs, _) = unify_lanes(arena, lhs, rhs, lanes);
            Expr::Logical { op, lhs, rhs }
        }
        Expr::Unary { op, operand } => Expr::Unary { op, operand: widen(arena, operand, var, var_ty, lanes, target)? },
        Expr::Cast { ty, value } => {
            let value = widen(arena, value, var, var_ty, lanes, target)?;
            let vector = arena.type_of(value).is_some_and(|t| t.lanes > 1);
            Expr::Cast { ty: if vector { ty.with_lanes(lanes) } else { ty }, value }
        }
        Expr::Load { tensor, indices } => {
            let elem = tensor_elem(arena, tensor);
            check_lane_capacity(elem, lanes, target)?;
            Expr::Load { tensor, indices: widen_indices(arena, &indices, var, var_ty, lanes, target)? }
        }
        Expr::Store { tensor, indices, value } => {
            let elem = tensor_elem(arena, tensor);
            check_lane_capacity(elem, lanes, target)?;
            let indices = widen_indices(arena, &indices, var, var_ty, lanes, target)?;
            let mut value = widen(arena, value, var, var_ty, lanes, target)?;
            if arena.type_of(value).is_some_and(|t| t.lanes == 1) {
                value = arena.push(Expr::Broadcast { value, lanes });
            }
            Expr::Store { tensor, indices, value }
        }
        Expr::Block { stmts } => {
            let stmts = stmts
                .iter()
                .map(|s| widen(arena, *s, var, var_ty, lanes, target))
                .collect::<Result<SmallVec<[ExprId; 8]>, Error>>()?;
            Expr::Block { stmts }
        }
        other => {
            return Err(Error::UnsupportedConstruct {
                pass: PASS,
                what: format!("cannot vectorize across {other:?}"),
            });
        }
    };
    Ok(arena.push(widened))
}

fn widen_indices<const N: usize>(
    arena: &mut Arena,
    indices: &SmallVec<[ExprId; N]>,
    var: &str,
    var_ty: ScalarType,
    lanes: u16,
    target: &Target,
) -> Result<SmallVec<[ExprId; N]>, Error> {
    let last = indices.len().saturating_sub(1);
    indices
        .iter()
        .enumerate()
        .map(|(i, idx)| {
            let widened = widen(arena, *idx, var, var_ty, lanes, target)?;
            let is_vector = arena.type_of(widened).is_some_and(|t| t.lanes > 1);
            if !is_vector {
                return Ok(widened);
            }
            if i != last {
                return Err(Error::UnsupportedConstruct {
                    pass: PASS,
                    what: "vector lane index on a non-innermost dimension".into(),
                });
            }
            normalize_ramp(arena, widened)
        })
        .collect()
}

/// Canonicalize a widened lane index into a unit-stride `Ramp`.
///
/// `ramp + s` and `s + ramp` fold the scalar into the ramp base; any other
/// vector shape is not a contiguous access.
fn normalize_ramp(arena: &mut Arena, id: ExprId) -> Result<ExprId, Error> {
    if matches!(arena.expr(id), Expr::Ramp { stride: 1, .. }) {
        return Ok(id);
    }
    if let Expr::Binary { op: ingot_ir::BinaryOp::Add, ty, lhs, rhs } = *arena.expr(id) {
        let pick = |a: ExprId, b: ExprId, arena: &Arena| -> Option<(ExprId, u16, ExprId)> {
            if let Expr::Ramp { base, stride: 1, lanes } = *arena.expr(a)
                && arena.type_of(b).is_some_and(|t| t.lanes == 1)
            {
                Some((base, lanes, b))
            } else {
                None
            }
        };
        if let Some((base, lanes, scalar)) = pick(lhs, rhs, arena).or_else(|| pick(rhs, lhs, arena)) {
            let new_base =
                arena.push(Expr::Binary { op: ingot_ir::BinaryOp::Add, ty: ty.base(), lhs: base, rhs: scalar });
            return Ok(arena.push(Expr::Ramp { base: new_base, stride: 1, lanes }));
        }
    }
    Err(Error::UnsupportedConstruct { pass: PASS, what: "non-unit-stride vector memory access".into() })
}

fn unify_lanes(arena: &mut Arena, lhs: ExprId, rhs: ExprId, lanes: u16) -> (ExprId, ExprId, bool) {
    let l_vec = arena.type_of(lhs).is_some_and(|t| t.lanes > 1);
    let r_vec = arena.type_of(rhs).is_some_and(|t| t.lanes > 1);
    match (l_vec, r_vec) {
        (true, true) => (lhs, rhs, true),
        (true, false) => (lhs, arena.push(Expr::Broadcast { value: rhs, lanes }), true),
        (false, true) => (arena.push(Expr::Broadcast { value: lhs, lanes }), rhs, true),
        (false, false) => (lhs, rhs, false),
    }
}

fn tensor_elem(arena: &Arena, tensor: ingot_ir::TensorId) -> ScalarType {
    arena.tensor(tensor).binding.map_or(ScalarType::int8(), |b| arena.buffer(b).elem)
}

fn check_lane_capacity(elem: ScalarType, lanes: u16, target: &Target) -> Result<(), Error> {
    if lanes > target.lanes_for(elem) {
        return Err(Error::UnsupportedConstruct {
            pass: PASS,
            what: format!(
                "vector factor {lanes} exceeds the target's {} lanes for {elem}",
                target.lanes_for(elem)
            ),
        });
    }
    Ok(())
}
