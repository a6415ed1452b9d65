//! Optional runtime debug instrumentation.
//!
//! Interleaves a host logging callee before every statement, carrying a
//! rendered summary of what follows. Always the last pass: nothing
//! downstream may rewrite the instrumented form.

use ingot_ir::{CallKind, Expr, ExprId, LoweredFunc};
use smallvec::{SmallVec, smallvec};

use super::helpers::walk_mut;
use crate::error::Result;

/// Host runtime logging entry point.
pub const DEBUG_LOG_CALLEE: &str = "ingot_debug_log";

pub fn insert_debug_log(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::Block { stmts } = arena.expr(id) else {
            return;
        };
        let stmts = stmts.clone();
        let mut rebuilt: SmallVec<[ExprId; 8]> = SmallVec::with_capacity(stmts.len() * 2);
        for stmt in stmts {
            let summary = arena.render(stmt);
            let message = arena.str_imm(summary);
            rebuilt.push(arena.push(Expr::Call {
                name: DEBUG_LOG_CALLEE.into(),
                args: smallvec![message],
                ret: None,
                kind: CallKind::Runtime,
                outputs: SmallVec::new(),
            }));
            rebuilt.push(stmt);
        }
        arena.replace(id, Expr::Block { stmts: rebuilt });
    });
    Ok(())
}
