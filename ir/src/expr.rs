//! The closed expression variant.

use smallvec::SmallVec;

use crate::arena::{BufferId, ExprId, TensorId};
use crate::types::{AccelAxis, BinaryOp, CallKind, CompareOp, Literal, LogicalOp, LoopKind, UnaryOp};
use ingot_dtype::ScalarType;

/// IR expression node.
///
/// Each variant encodes its operand structure directly, so operand count and
/// roles are verified at compile time and every consumer matches
/// exhaustively; adding a variant breaks every unhandled match.
///
/// Children are [`ExprId`] handles into the owning [`crate::Arena`]; buffers
/// and tensors are referenced by id and resolved through the arena's side
/// tables (never by back-pointer).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Typed immediate.
    Imm { ty: ScalarType, value: Literal },
    /// String immediate; only meaningful as a call argument.
    StrImm { value: String },
    /// Named scalar variable (loop induction vars, symbolic parameters).
    Var { name: String, ty: ScalarType },

    /// Binary arithmetic; `ty` is the declared result type, operands are
    /// expected to already be unified to it.
    Binary { op: BinaryOp, ty: ScalarType, lhs: ExprId, rhs: ExprId },
    /// Comparison; always yields boolean storage.
    Compare { op: CompareOp, lhs: ExprId, rhs: ExprId },
    /// Logical combination of boolean operands.
    Logical { op: LogicalOp, lhs: ExprId, rhs: ExprId },
    Unary { op: UnaryOp, operand: ExprId },
    Cast { ty: ScalarType, value: ExprId },

    /// Lane-indexed vector `base + i * stride`, i in 0..lanes.
    Ramp { base: ExprId, stride: i64, lanes: u16 },
    /// Scalar value replicated across lanes.
    Broadcast { value: ExprId, lanes: u16 },

    BufferRef { buffer: BufferId },
    TensorRef { tensor: TensorId },

    Alloc { buffer: BufferId },
    Free { buffer: BufferId },
    /// Write `value` at the row-major flattened offset of `indices` in the
    /// tensor's bound buffer.
    Store { tensor: TensorId, indices: SmallVec<[ExprId; 4]>, value: ExprId },
    /// Marker for an extra output of a multi-output call: the value is
    /// evaluated for effect, the callee itself performed the write.
    ShallowStore { tensor: TensorId, value: ExprId },
    Load { tensor: TensorId, indices: SmallVec<[ExprId; 4]> },

    Call {
        name: String,
        args: SmallVec<[ExprId; 4]>,
        /// `None` for statement-position calls with no value.
        ret: Option<ScalarType>,
        kind: CallKind,
        /// Output tensors of a multi-output call.
        outputs: SmallVec<[TensorId; 2]>,
    },
    /// Projection of output `index` of a multi-output call.
    TupleGet { call: ExprId, index: usize },
    /// Packed opaque argument-array value for runtime calls.
    ArgPack { args: SmallVec<[ExprId; 4]> },

    /// Counted loop: `var` ranges over `0..extent`.
    For { var: ExprId, extent: ExprId, body: ExprId, kind: LoopKind },
    /// Schedule-style loop; canonicalized into [`Expr::For`] by the pipeline.
    PolyFor { var: ExprId, init: ExprId, condition: ExprId, inc: ExprId, body: ExprId },
    IfThenElse { cond: ExprId, then_case: ExprId, else_case: Option<ExprId> },
    Block { stmts: SmallVec<[ExprId; 8]> },
    /// Schedule annotation wrapper; removed by the module pipeline.
    ScheduleBlock { name: String, body: ExprId },
    /// Accelerator execution-dimension index; produced when a bound loop
    /// wrapper is stripped.
    AccelIndex { axis: AccelAxis },
}

impl Expr {
    /// Child expression handles, in evaluation order.
    pub fn child_ids(&self) -> SmallVec<[ExprId; 4]> {
        let mut out = SmallVec::new();
        match self {
            Expr::Imm { .. }
            | Expr::StrImm { .. }
            | Expr::Var { .. }
            | Expr::BufferRef { .. }
            | Expr::TensorRef { .. }
            | Expr::Alloc { .. }
            | Expr::Free { .. }
            | Expr::AccelIndex { .. } => {}
            Expr::Binary { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            Expr::Unary { operand, .. } => out.push(*operand),
            Expr::Cast { value, .. } | Expr::Broadcast { value, .. } => out.push(*value),
            Expr::Ramp { base, .. } => out.push(*base),
            Expr::Store { indices, value, .. } => {
                out.extend(indices.iter().copied());
                out.push(*value);
            }
            Expr::ShallowStore { value, .. } => out.push(*value),
            Expr::Load { indices, .. } => out.extend(indices.iter().copied()),
            Expr::Call { args, .. } | Expr::ArgPack { args } => out.extend(args.iter().copied()),
            Expr::TupleGet { call, .. } => out.push(*call),
            Expr::For { var, extent, body, .. } => {
                out.push(*var);
                out.push(*extent);
                out.push(*body);
            }
            Expr::PolyFor { var, init, condition, inc, body } => {
                out.push(*var);
                out.push(*init);
                out.push(*condition);
                out.push(*inc);
                out.push(*body);
            }
            Expr::IfThenElse { cond, then_case, else_case } => {
                out.push(*cond);
                out.push(*then_case);
                if let Some(e) = else_case {
                    out.push(*e);
                }
            }
            Expr::Block { stmts } => out.extend(stmts.iter().copied()),
            Expr::ScheduleBlock { body, .. } => out.push(*body),
        }
        out
    }

    /// Whether the node is a statement (produces no value).
    pub fn is_stmt(&self) -> bool {
        match self {
            Expr::Alloc { .. }
            | Expr::Free { .. }
            | Expr::Store { .. }
            | Expr::ShallowStore { .. }
            | Expr::For { .. }
            | Expr::PolyFor { .. }
            | Expr::IfThenElse { .. }
            | Expr::Block { .. }
            | Expr::ScheduleBlock { .. } => true,
            Expr::Call { ret, .. } => ret.is_none(),
            _ => false,
        }
    }

    pub fn as_imm(&self) -> Option<(ScalarType, Literal)> {
        match self {
            Expr::Imm { ty, value } => Some((*ty, *value)),
            _ => None,
        }
    }
}
