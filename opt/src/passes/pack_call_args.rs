//! Uniformize runtime call argument lists into one packed argument array.
//!
//! Host runtime entry points take a single opaque pointer to an argument
//! array instead of a variadic list; every `Runtime`-convention call is
//! rewritten so its arguments travel inside one `ArgPack` value. Codegen
//! lowers the pack to a stack array passed as (pointer, length).

use ingot_ir::{CallKind, Expr, LoweredFunc};
use smallvec::smallvec;

use super::helpers::walk_mut;
use crate::error::Result;

pub fn pack_call_args(func: &mut LoweredFunc) -> Result<()> {
    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::Call { kind: CallKind::Runtime, args, .. } = arena.expr(id) else {
            return;
        };
        // Already packed.
        if args.len() == 1 && matches!(arena.expr(args[0]), Expr::ArgPack { .. }) {
            return;
        }
        let unpacked = args.clone();
        let packed = arena.push(Expr::ArgPack { args: unpacked });
        let Expr::Call { args, .. } = arena.expr_mut(id) else {
            unreachable!("matched above");
        };
        *args = smallvec![packed];
    });
    Ok(())
}
