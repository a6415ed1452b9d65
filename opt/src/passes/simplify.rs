//! Algebraic simplification: constant folding and identity elimination,
//! applied to a fixed point.
//!
//! Folding follows the codegen semantics exactly so a folded immediate and
//! the instruction it replaces agree: integer div/mod truncate toward zero,
//! 32-bit float results round through f32, and float min/max are left
//! unfolded when a NaN is involved (the emitted instructions propagate NaN).

use ingot_dtype::{ScalarType, TypeKind};
use ingot_ir::{BinaryOp, CompareOp, Expr, Literal, LogicalOp, LoweredFunc, UnaryOp, types::round_float};

use super::helpers::walk_mut;
use crate::error::{Error, Result};

const PASS: &str = "simplify";
const MAX_ROUNDS: usize = 100;

pub fn simplify(func: &mut LoweredFunc) -> Result<()> {
    for _ in 0..MAX_ROUNDS {
        if !simplify_round(func) {
            return Ok(());
        }
    }
    Err(Error::PreconditionViolation { pass: PASS, detail: format!("no fixed point after {MAX_ROUNDS} rounds") })
}

/// One bottom-up rewrite sweep; returns whether anything changed.
fn simplify_round(func: &mut LoweredFunc) -> bool {
    let body = func.body;
    let mut changed = false;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let replacement = match arena.expr(id) {
            Expr::Binary { op, ty, lhs, rhs } => {
                let (op, ty, lhs, rhs) = (*op, *ty, *lhs, *rhs);
                match (arena.expr(lhs).as_imm(), arena.expr(rhs).as_imm()) {
                    (Some((_, a)), Some((_, b))) => {
                        fold_binary(op, ty, a, b).map(|value| Expr::Imm { ty, value })
                    }
                    (Some((_, a)), None) => fold_identity_left(op, a, rhs, ty, arena),
                    (None, Some((_, b))) => fold_identity_right(op, b, lhs, ty, arena),
                    (None, None) => None,
                }
            }
            Expr::Compare { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                match (arena.expr(lhs).as_imm(), arena.expr(rhs).as_imm()) {
                    (Some((_, a)), Some((_, b))) => fold_compare(op, a, b)
                        .map(|v| Expr::Imm { ty: ScalarType::bool_(), value: Literal::Bool(v) }),
                    _ => None,
                }
            }
            Expr::Logical { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                match (arena.expr(lhs).as_imm(), arena.expr(rhs).as_imm()) {
                    (Some((_, Literal::Bool(a))), Some((_, Literal::Bool(b)))) => {
                        let v = if op == LogicalOp::And { a && b } else { a || b };
                        Some(Expr::Imm { ty: ScalarType::bool_(), value: Literal::Bool(v) })
                    }
                    (Some((_, Literal::Bool(a))), None) => logical_short(op, a, rhs, arena),
                    (None, Some((_, Literal::Bool(b)))) => logical_short(op, b, lhs, arena),
                    _ => None,
                }
            }
            Expr::Unary { op, operand } => {
                let (op, operand) = (*op, *operand);
                match (op, arena.expr(operand).as_imm()) {
                    (UnaryOp::Neg, Some((ty, lit))) => fold_neg(ty, lit).map(|value| Expr::Imm { ty, value }),
                    (UnaryOp::Not, Some((ty, Literal::Bool(b)))) => {
                        Some(Expr::Imm { ty, value: Literal::Bool(!b) })
                    }
                    _ => None,
                }
            }
            Expr::Cast { ty, value } => {
                let (ty, value) = (*ty, *value);
                match arena.expr(value).as_imm() {
                    Some((_, lit)) if ty.lanes == 1 => Some(Expr::Imm { ty, value: lit.cast(ty) }),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(expr) = replacement {
            arena.replace(id, expr);
            changed = true;
        }
    });
    changed
}

/// `imm <op> x` identities.
fn fold_identity_left(
    op: BinaryOp,
    imm: Literal,
    other: ingot_ir::ExprId,
    ty: ScalarType,
    arena: &ingot_ir::Arena,
) -> Option<Expr> {
    match op {
        BinaryOp::Add if imm.is_zero() => Some(arena.expr(other).clone()),
        BinaryOp::Mul if imm.is_one() => Some(arena.expr(other).clone()),
        BinaryOp::Mul if imm.is_zero() && !ty.is_float() => Some(Expr::Imm { ty, value: imm }),
        _ => None,
    }
}

/// `x <op> imm` identities.
fn fold_identity_right(
    op: BinaryOp,
    imm: Literal,
    other: ingot_ir::ExprId,
    ty: ScalarType,
    arena: &ingot_ir::Arena,
) -> Option<Expr> {
    match op {
        BinaryOp::Add | BinaryOp::Sub if imm.is_zero() => Some(arena.expr(other).clone()),
        BinaryOp::Mul | BinaryOp::Div if imm.is_one() => Some(arena.expr(other).clone()),
        BinaryOp::Mul if imm.is_zero() && !ty.is_float() => Some(Expr::Imm { ty, value: imm }),
        _ => None,
    }
}

fn logical_short(op: LogicalOp, imm: bool, other: ingot_ir::ExprId, arena: &ingot_ir::Arena) -> Option<Expr> {
    match (op, imm) {
        (LogicalOp::And, true) | (LogicalOp::Or, false) => Some(arena.expr(other).clone()),
        (LogicalOp::And, false) => Some(Expr::Imm { ty: ScalarType::bool_(), value: Literal::Bool(false) }),
        (LogicalOp::Or, true) => Some(Expr::Imm { ty: ScalarType::bool_(), value: Literal::Bool(true) }),
    }
}

fn fold_neg(ty: ScalarType, lit: Literal) -> Option<Literal> {
    match lit {
        Literal::Int(v) => Some(Literal::Int(v.wrapping_neg()).cast(ty)),
        Literal::Float(v) => Some(Literal::Float(-v)),
        // Unsigned/boolean negation is not meaningful; leave it to codegen's
        // type checking.
        Literal::UInt(_) | Literal::Bool(_) => None,
    }
}

fn fold_binary(op: BinaryOp, ty: ScalarType, a: Literal, b: Literal) -> Option<Literal> {
    if ty.lanes != 1 {
        return None;
    }
    match ty.kind {
        TypeKind::Int => {
            let (a, b) = (int_of(a)?, int_of(b)?);
            let v = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                // Division by a zero immediate stays unfolded; codegen emits
                // the trapping native instruction.
                BinaryOp::Div => a.checked_div(b)?,
                BinaryOp::Mod => a.checked_rem(b)?,
                BinaryOp::Min => a.min(b),
                BinaryOp::Max => a.max(b),
            };
            Some(Literal::Int(v).cast(ty))
        }
        TypeKind::UInt => {
            let (a, b) = (uint_of(a)?, uint_of(b)?);
            let v = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a.checked_div(b)?,
                BinaryOp::Mod => a.checked_rem(b)?,
                BinaryOp::Min => a.min(b),
                BinaryOp::Max => a.max(b),
            };
            Some(Literal::UInt(v).cast(ty))
        }
        TypeKind::Float => {
            let (Literal::Float(a), Literal::Float(b)) = (a, b) else {
                return None;
            };
            let v = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                // fmod: truncated division remainder.
                BinaryOp::Mod => a - (a / b).trunc() * b,
                // The emitted fmin/fmax propagate NaN; Rust's min/max do
                // not, so NaN operands stay unfolded.
                BinaryOp::Min if !a.is_nan() && !b.is_nan() => a.min(b),
                BinaryOp::Max if !a.is_nan() && !b.is_nan() => a.max(b),
                BinaryOp::Min | BinaryOp::Max => return None,
            };
            Some(Literal::Float(round_float(v, ty.bits)))
        }
        TypeKind::Bool => None,
    }
}

fn fold_compare(op: CompareOp, a: Literal, b: Literal) -> Option<bool> {
    match (a, b) {
        (Literal::Int(a), Literal::Int(b)) => Some(compare(op, &a, &b)),
        (Literal::UInt(a), Literal::UInt(b)) => Some(compare(op, &a, &b)),
        (Literal::Bool(a), Literal::Bool(b)) => Some(compare(op, &a, &b)),
        // IEEE comparisons: every operator is false on NaN except Ne.
        (Literal::Float(a), Literal::Float(b)) => Some(match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        }),
        _ => None,
    }
}

fn compare<T: PartialOrd>(op: CompareOp, a: &T, b: &T) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

fn int_of(lit: Literal) -> Option<i64> {
    match lit {
        Literal::Int(v) => Some(v),
        _ => None,
    }
}

fn uint_of(lit: Literal) -> Option<u64> {
    match lit {
        Literal::UInt(v) => Some(v),
        _ => None,
    }
}
