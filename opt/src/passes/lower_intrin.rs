//! Target-specific intrinsic lowering.
//!
//! With the `Fma` feature, float `a * b + c` contracts into an intrinsic
//! `fma` call that codegen emits as the native fused multiply-add.

use ingot_ir::{BinaryOp, CallKind, Expr, LoweredFunc, Target, TargetFeature};
use smallvec::{SmallVec, smallvec};

use super::helpers::walk_mut;
use crate::error::Result;

/// Fused multiply-add intrinsic name.
pub const FMA_INTRINSIC: &str = "fma";

pub fn lower_intrin(func: &mut LoweredFunc, target: &Target) -> Result<()> {
    if !target.features.contains(TargetFeature::Fma) {
        return Ok(());
    }

    let body = func.body;
    walk_mut(&mut func.arena, body, &mut |arena, id| {
        let Expr::Binary { op: BinaryOp::Add, ty, lhs, rhs } = *arena.expr(id) else {
            return;
        };
        if !ty.is_float() {
            return;
        }
        let (mul, addend) = if let Expr::Binary { op: BinaryOp::Mul, .. } = arena.expr(lhs) {
            (lhs, rhs)
        } else if let Expr::Binary { op: BinaryOp::Mul, .. } = arena.expr(rhs) {
            (rhs, lhs)
        } else {
            return;
        };
        let Expr::Binary { lhs: a, rhs: b, .. } = *arena.expr(mul) else {
            unreachable!("matched above");
        };
        let args: SmallVec<[_; 4]> = smallvec![a, b, addend];
        arena.replace(
            id,
            Expr::Call { name: FMA_INTRINSIC.into(), args, ret: Some(ty), kind: CallKind::Intrinsic, outputs: SmallVec::new() },
        );
    });
    Ok(())
}
