//! Unroll loops carrying an unroll hint.
//!
//! A hinted loop whose extent resolved to a constant `n <= limit` is
//! replaced by `n` copies of its body with the induction variable
//! substituted; symbolic or over-limit extents leave the loop untouched.
//! Inner loops unroll first, so hinted nests flatten completely.

use ingot_ir::{Expr, Literal, LoopKind, LoweredFunc};
use smallvec::SmallVec;

use super::helpers::{substitute_var, walk_mut};
use crate::error::Result;

pub fn unroll_loops(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::For { var, extent, body, kind: LoopKind::Unrolled { limit } } = *arena.expr(id) else {
            return;
        };
        let Some((_, Literal::Int(n))) = arena.expr(extent).as_imm() else {
            return;
        };
        if n < 0 || n > limit as i64 {
            return;
        }
        let Expr::Var { name, ty } = arena.expr(var).clone() else {
            return;
        };

        let mut stmts: SmallVec<[_; 8]> = SmallVec::new();
        for i in 0..n {
            let iteration = Expr::Imm { ty, value: Literal::Int(i).cast(ty) };
            stmts.push(substitute_var(arena, body, &name, &iteration));
        }
        arena.replace(id, Expr::Block { stmts });
    });
    Ok(())
}
