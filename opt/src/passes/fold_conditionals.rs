//! Eliminate branches whose condition folded to a constant.

use ingot_ir::{Expr, Literal, LoweredFunc};
use smallvec::SmallVec;

use super::helpers::walk_mut;
use crate::error::Result;

pub fn fold_conditionals(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::IfThenElse { cond, then_case, else_case } = *arena.expr(id) else {
            return;
        };
        let Some((_, Literal::Bool(taken))) = arena.expr(cond).as_imm() else {
            return;
        };
        let replacement = if taken {
            arena.expr(then_case).clone()
        } else {
            match else_case {
                Some(e) => arena.expr(e).clone(),
                None => Expr::Block { stmts: SmallVec::new() },
            }
        };
        arena.replace(id, replacement);
    });
    Ok(())
}
