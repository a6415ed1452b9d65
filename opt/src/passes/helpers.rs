//! Shared traversal and substitution utilities.

use ingot_ir::{Arena, Expr, ExprId};
use smallvec::SmallVec;

use crate::error::Result;

/// Apply `f` to every node of the subtree at `root`, children before
/// parents. `f` may rewrite the visited node in place.
pub(crate) fn walk_mut<F>(arena: &mut Arena, root: ExprId, f: &mut F)
where
    F: FnMut(&mut Arena, ExprId),
{
    let children = arena.expr(root).child_ids();
    for child in children {
        walk_mut(arena, child, f);
    }
    f(arena, root);
}

/// Fallible variant of [`walk_mut`].
pub(crate) fn try_walk_mut<F>(arena: &mut Arena, root: ExprId, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Arena, ExprId) -> Result<()>,
{
    let children = arena.expr(root).child_ids();
    for child in children {
        try_walk_mut(arena, child, f)?;
    }
    f(arena, root)
}

/// Deep-copy the subtree at `root` into fresh nodes, letting `f` replace any
/// node wholesale (it sees the original node and may push a substitute).
pub(crate) fn clone_subtree_map<F>(arena: &mut Arena, root: ExprId, f: &mut F) -> ExprId
where
    F: FnMut(&mut Arena, &Expr) -> Option<ExprId>,
{
    let expr = arena.expr(root).clone();
    if let Some(replacement) = f(arena, &expr) {
        return replacement;
    }
    let rebuilt = match expr {
        leaf @ (Expr::Imm { .. }
        | Expr::StrImm { .. }
        | Expr::Var { .. }
        | Expr::BufferRef { .. }
        | Expr::TensorRef { .. }
        | Expr::Alloc { .. }
        | Expr::Free { .. }
        | Expr::AccelIndex { .. }) => leaf,
        Expr::Binary { op, ty, lhs, rhs } => Expr::Binary {
            op,
            ty,
            lhs: clone_subtree_map(arena, lhs, f),
            rhs: clone_subtree_map(arena, rhs, f),
        },
        Expr::Compare { op, lhs, rhs } => Expr::Compare {
            op,
            lhs: clone_subtree_map(arena, lhs, f),
            rhs: clone_subtree_map(arena, rhs, f),
        },
        Expr::Logical { op, lhs, rhs } => Expr::Logical {
            op,
            lhs: clone_subtree_map(arena, lhs, f),
            rhs: clone_subtree_map(arena, rhs, f),
        },
        Expr::Unary { op, operand } => Expr::Unary { op, operand: clone_subtree_map(arena, operand, f) },
        Expr::Cast { ty, value } => Expr::Cast { ty, value: clone_subtree_map(arena, value, f) },
        Expr::Ramp { base, stride, lanes } => Expr::Ramp { base: clone_subtree_map(arena, base, f), stride, lanes },
        Expr::Broadcast { value, lanes } => Expr::Broadcast { value: clone_subtree_map(arena, value, f), lanes },
        Expr::Store { tensor, indices, value } => Expr::Store {
            tensor,
            indices: clone_ids(arena, &indices, f),
            value: clone_subtree_map(arena, value, f),
        },
        Expr::ShallowStore { tensor, value } => {
            Expr::ShallowStore { tensor, value: clone_subtree_map(arena, value, f) }
        }
        Expr::Load { tensor, indices } => Expr::Load { tensor, indices: clone_ids(arena, &indices, f) },
        Expr::Call { name, args, ret, kind, outputs } => {
            Expr::Call { name, args: clone_ids(arena, &args, f), ret, kind, outputs }
        }
        Expr::TupleGet { call, index } => Expr::TupleGet { call: clone_subtree_map(arena, call, f), index },
        Expr::ArgPack { args } => Expr::ArgPack { args: clone_ids(arena, &args, f) },
        Expr::For { var, extent, body, kind } => Expr::For {
            var: clone_subtree_map(arena, var, f),
            extent: clone_subtree_map(arena, extent, f),
            body: clone_subtree_map(arena, body, f),
            kind,
        },
        Expr::PolyFor { var, init, condition, inc, body } => Expr::PolyFor {
            var: clone_subtree_map(arena, var, f),
            init: clone_subtree_map(arena, init, f),
            condition: clone_subtree_map(arena, condition, f),
            inc: clone_subtree_map(arena, inc, f),
            body: clone_subtree_map(arena, body, f),
        },
        Expr::IfThenElse { cond, then_case, else_case } => Expr::IfThenElse {
            cond: clone_subtree_map(arena, cond, f),
            then_case: clone_subtree_map(arena, then_case, f),
            else_case: else_case.map(|e| clone_subtree_map(arena, e, f)),
        },
        Expr::Block { stmts } => Expr::Block { stmts: clone_ids(arena, &stmts, f) },
        Expr::ScheduleBlock { name, body } => Expr::ScheduleBlock { name, body: clone_subtree_map(arena, body, f) },
    };
    arena.push(rebuilt)
}

fn clone_ids<F, const N: usize>(arena: &mut Arena, ids: &SmallVec<[ExprId; N]>, f: &mut F) -> SmallVec<[ExprId; N]>
where
    F: FnMut(&mut Arena, &Expr) -> Option<ExprId>,
{
    ids.iter().map(|id| clone_subtree_map(arena, *id, f)).collect()
}

/// Deep-copy the subtree at `root`, substituting every `Var` named `name`
/// with a fresh copy of `replacement`.
pub(crate) fn substitute_var(arena: &mut Arena, root: ExprId, name: &str, replacement: &Expr) -> ExprId {
    clone_subtree_map(arena, root, &mut |arena, expr| match expr {
        Expr::Var { name: n, .. } if n == name => Some(arena.push(replacement.clone())),
        _ => None,
    })
}

/// Whether any node of the subtree satisfies `pred`.
pub(crate) fn subtree_any<F>(arena: &Arena, root: ExprId, pred: &F) -> bool
where
    F: Fn(&Arena, &Expr) -> bool,
{
    if pred(arena, arena.expr(root)) {
        return true;
    }
    arena.expr(root).child_ids().into_iter().any(|c| subtree_any(arena, c, pred))
}
