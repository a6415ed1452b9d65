//! Materialize the extra outputs of multi-output calls.
//!
//! A statement-position call declaring more than one output tensor is
//! wrapped in a block that follows the call with one shallow store per
//! extra output, projecting it from the call. The shallow stores make the
//! callee's writes visible to downstream passes without emitting a second
//! memory write.

use ingot_ir::{Expr, ExprId, LoweredFunc};
use smallvec::SmallVec;

use super::helpers::walk_mut;
use crate::error::Result;

pub fn materialize_multi_output_calls(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::Block { stmts } = arena.expr(id) else {
            return;
        };
        let needs_work = stmts.iter().any(|s| is_multi_output_call(arena, *s));
        if !needs_work {
            return;
        }
        let stmts = stmts.clone();
        let mut rebuilt: SmallVec<[ExprId; 8]> = SmallVec::new();
        for stmt in stmts {
            rebuilt.push(stmt);
            if !is_multi_output_call(arena, stmt) {
                continue;
            }
            let Expr::Call { outputs, .. } = arena.expr(stmt) else {
                continue;
            };
            for (index, tensor) in outputs.clone().into_iter().enumerate().skip(1) {
                let projection = arena.push(Expr::TupleGet { call: stmt, index });
                rebuilt.push(arena.push(Expr::ShallowStore { tensor, value: projection }));
            }
        }
        arena.replace(id, Expr::Block { stmts: rebuilt });
    });
    Ok(())
}

fn is_multi_output_call(arena: &ingot_ir::Arena, id: ExprId) -> bool {
    matches!(arena.expr(id), Expr::Call { outputs, .. } if outputs.len() > 1)
}
