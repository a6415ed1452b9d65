//! Dead schedule-block removal.
//!
//! Schedule annotations have served their purpose once the loop passes ran;
//! the wrappers are unwrapped and empty ones disappear from their enclosing
//! blocks.

use ingot_ir::{Expr, ExprId, LoweredFunc};
use smallvec::SmallVec;

use super::helpers::walk_mut;
use crate::error::Result;

pub fn remove_schedule_blocks(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        match arena.expr(id) {
            Expr::ScheduleBlock { body, .. } => {
                let inner = arena.expr(*body).clone();
                arena.replace(id, inner);
            }
            Expr::Block { stmts } => {
                let is_dead = |arena: &ingot_ir::Arena, id: ExprId| {
                    matches!(arena.expr(id), Expr::Block { stmts } if stmts.is_empty())
                };
                if !stmts.iter().any(|s| is_dead(arena, *s)) {
                    return;
                }
                let kept: SmallVec<[ExprId; 8]> =
                    stmts.clone().into_iter().filter(|s| !is_dead(arena, *s)).collect();
                arena.replace(id, Expr::Block { stmts: kept });
            }
            _ => {}
        }
    });
    Ok(())
}
