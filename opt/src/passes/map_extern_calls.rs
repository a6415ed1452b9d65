//! Rewrite external calls through the per-target intrinsic signature table.
//!
//! Lookup is keyed on the callee name and the first argument's scalar type,
//! which is why this pass must run after boolean-result normalization:
//! boolean arguments only match their table entries once they carry the
//! int8 storage cast. Unknown callees pass through untouched.

use ingot_ir::{CallKind, Expr, LoweredFunc, Target};

use super::helpers::walk_mut;
use crate::context::PassContext;
use crate::error::Result;

pub fn map_extern_calls(func: &mut LoweredFunc, target: &Target, ctx: &PassContext) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::Call { kind: CallKind::Extern, name, args, .. } = arena.expr(id) else {
            return;
        };
        let Some(first_ty) = args.first().and_then(|a| arena.type_of(*a)) else {
            return;
        };
        let Some(symbol) = ctx.intrinsics.lookup(target, name, first_ty.base()) else {
            return;
        };
        let symbol = symbol.to_owned();
        let Expr::Call { name, .. } = arena.expr_mut(id) else {
            unreachable!("matched above");
        };
        *name = symbol;
    });
    Ok(())
}
