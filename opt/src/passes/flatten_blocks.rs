//! Collapse redundant scope wrappers earlier passes leave behind.
//!
//! Unrolling, conditional folding, and multi-output materialization all
//! splice blocks into blocks; this pass flattens the nesting and drops empty
//! block statements.

use ingot_ir::{Expr, ExprId, LoweredFunc};
use smallvec::SmallVec;

use super::helpers::walk_mut;
use crate::error::Result;

pub fn flatten_blocks(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::Block { stmts } = arena.expr(id) else {
            return;
        };
        let needs_work = stmts
            .iter()
            .any(|s| matches!(arena.expr(*s), Expr::Block { .. }));
        if !needs_work {
            return;
        }
        let stmts = stmts.clone();
        let mut flat: SmallVec<[ExprId; 8]> = SmallVec::new();
        for stmt in stmts {
            match arena.expr(stmt) {
                Expr::Block { stmts: inner } => flat.extend(inner.iter().copied()),
                _ => flat.push(stmt),
            }
        }
        arena.replace(id, Expr::Block { stmts: flat });
    });
    Ok(())
}
