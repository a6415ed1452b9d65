//! Rewrite schedule-style `PolyFor` loops into canonical counted `For`s.
//!
//! A schedule-produced loop must have the shape
//! `poly_for (v = 0; v < extent; v += 1)`; anything else means the upstream
//! scheduler handed over IR this pipeline does not accept.

use ingot_ir::{CompareOp, Expr, Literal, LoopKind, LoweredFunc};

use super::helpers::walk_mut;
use crate::error::{Error, Result};

const PASS: &str = "canonicalize_loops";

pub fn canonicalize_loops(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    let mut failure: Option<Error> = None;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::PolyFor { var, init, condition, inc, body } = *arena.expr(id) else {
            return;
        };
        if failure.is_some() {
            return;
        }

        let var_name = match arena.expr(var) {
            Expr::Var { name, .. } => name.clone(),
            other => {
                failure = Some(precondition(format!("loop variable is not a Var: {other:?}")));
                return;
            }
        };
        if !matches!(arena.expr(init).as_imm(), Some((_, Literal::Int(0)))) {
            failure = Some(precondition(format!("loop `{var_name}` does not start at 0")));
            return;
        }
        if !matches!(arena.expr(inc).as_imm(), Some((_, Literal::Int(1)))) {
            failure = Some(precondition(format!("loop `{var_name}` does not step by 1")));
            return;
        }
        let extent = match arena.expr(condition) {
            Expr::Compare { op: CompareOp::Lt, lhs, rhs }
                if matches!(arena.expr(*lhs), Expr::Var { name, .. } if *name == var_name) =>
            {
                *rhs
            }
            _ => {
                failure = Some(precondition(format!("loop `{var_name}` condition is not `{var_name} < extent`")));
                return;
            }
        };

        arena.replace(id, Expr::For { var, extent, body, kind: LoopKind::Serial });
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn precondition(detail: String) -> Error {
    Error::PreconditionViolation { pass: PASS, detail }
}
