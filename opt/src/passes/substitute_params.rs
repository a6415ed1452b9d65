//! Replace named integer parameters with literal constants.
//!
//! Symbolic parameters the caller has resolved (via
//! [`crate::PassContext::const_params`]) are substituted both in expressions
//! and in buffer/tensor shape extents, so downstream passes and codegen see
//! static trip counts and allocation sizes.

use ingot_ir::{Expr, Extent, Literal, LoweredFunc};

use super::helpers::walk_mut;
use crate::context::PassContext;
use crate::error::Result;

pub fn substitute_params(func: &mut LoweredFunc, ctx: &PassContext) -> Result<()> {
    if ctx.const_params.is_empty() {
        return Ok(());
    }

    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::Var { name, ty } = arena.expr(id) else {
            return;
        };
        if let Some(value) = ctx.const_params.get(name) {
            let ty = *ty;
            arena.replace(id, Expr::Imm { ty, value: Literal::Int(*value).cast(ty) });
        }
    });

    let resolve = |extents: &mut Vec<Extent>| {
        for extent in extents {
            if let Extent::Param(name) = extent
                && let Some(value) = ctx.const_params.get(name)
            {
                *extent = Extent::Const(*value);
            }
        }
    };
    for buffer in func.arena.buffers_mut() {
        resolve(&mut buffer.shape);
    }
    for tensor in func.arena.tensors_mut() {
        resolve(&mut tensor.shape);
        resolve(&mut tensor.domain);
    }
    Ok(())
}
