//! Node storage and handles.

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::memory::{Buffer, Tensor};
use crate::types::{BinaryOp, CallKind, CompareOp, Literal, LogicalOp, LoopKind, UnaryOp};
use ingot_dtype::{ScalarType, cast};

/// Handle of an expression node in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub(crate) u32);

/// Handle of a buffer declaration in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u32);

/// Handle of a tensor declaration in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorId(pub(crate) u32);

impl std::fmt::Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Flat node store for one compilation unit.
///
/// Nodes are appended and never removed; rewrites replace a node in place or
/// splice in freshly pushed nodes, leaving unreachable nodes behind as inert
/// garbage. `Clone` is the deep copy the optimizer takes before rewriting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arena {
    exprs: Vec<Expr>,
    buffers: Vec<Buffer>,
    tensors: Vec<Tensor>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0 as usize]
    }

    /// Replace the node at `id`, returning the previous one.
    pub fn replace(&mut self, id: ExprId, expr: Expr) -> Expr {
        std::mem::replace(self.expr_mut(id), expr)
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    // =========================================================================
    // Buffer / tensor tables
    // =========================================================================

    pub fn add_buffer(&mut self, buffer: Buffer) -> BufferId {
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(buffer);
        id
    }

    pub fn buffer(&self, id: BufferId) -> &Buffer {
        &self.buffers[id.0 as usize]
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> &mut Buffer {
        &mut self.buffers[id.0 as usize]
    }

    pub fn buffers(&self) -> impl Iterator<Item = (BufferId, &Buffer)> {
        self.buffers.iter().enumerate().map(|(i, b)| (BufferId(i as u32), b))
    }

    pub fn buffers_mut(&mut self) -> impl Iterator<Item = &mut Buffer> {
        self.buffers.iter_mut()
    }

    pub fn add_tensor(&mut self, tensor: Tensor) -> TensorId {
        let id = TensorId(self.tensors.len() as u32);
        self.tensors.push(tensor);
        id
    }

    pub fn tensor(&self, id: TensorId) -> &Tensor {
        &self.tensors[id.0 as usize]
    }

    pub fn tensor_mut(&mut self, id: TensorId) -> &mut Tensor {
        &mut self.tensors[id.0 as usize]
    }

    pub fn tensors(&self) -> impl Iterator<Item = (TensorId, &Tensor)> {
        self.tensors.iter().enumerate().map(|(i, t)| (TensorId(i as u32), t))
    }

    pub fn tensors_mut(&mut self) -> impl Iterator<Item = &mut Tensor> {
        self.tensors.iter_mut()
    }

    /// Bind `tensor` to `buffer`. Stores and loads require the binding.
    pub fn bind(&mut self, tensor: TensorId, buffer: BufferId) {
        self.tensor_mut(tensor).binding = Some(buffer);
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn imm(&mut self, ty: ScalarType, value: Literal) -> ExprId {
        debug_assert!(value.matches(ty), "literal {value:?} does not match {ty}");
        self.push(Expr::Imm { ty, value })
    }

    pub fn int32(&mut self, v: i32) -> ExprId {
        self.imm(ScalarType::int32(), Literal::Int(v as i64))
    }

    pub fn int64(&mut self, v: i64) -> ExprId {
        self.imm(ScalarType::int64(), Literal::Int(v))
    }

    pub fn uint32(&mut self, v: u32) -> ExprId {
        self.imm(ScalarType::uint32(), Literal::UInt(v as u64))
    }

    pub fn float32(&mut self, v: f32) -> ExprId {
        self.imm(ScalarType::float32(), Literal::Float(v as f64))
    }

    pub fn float64(&mut self, v: f64) -> ExprId {
        self.imm(ScalarType::float64(), Literal::Float(v))
    }

    pub fn bool_imm(&mut self, v: bool) -> ExprId {
        self.imm(ScalarType::bool_(), Literal::Bool(v))
    }

    pub fn str_imm(&mut self, v: impl Into<String>) -> ExprId {
        self.push(Expr::StrImm { value: v.into() })
    }

    pub fn var(&mut self, name: impl Into<String>, ty: ScalarType) -> ExprId {
        self.push(Expr::Var { name: name.into(), ty })
    }

    /// Binary operation over operands of equal type; the declared result
    /// type is the unified operand type.
    pub fn try_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> Result<ExprId> {
        let lt = self.type_of(lhs).ok_or(Error::ValuelessOperand { context: "binary operand" })?;
        let rt = self.type_of(rhs).ok_or(Error::ValuelessOperand { context: "binary operand" })?;
        if lt != rt {
            return Err(Error::TypeMismatch { lhs: lt, rhs: rt });
        }
        Ok(self.push(Expr::Binary { op, ty: lt, lhs, rhs }))
    }

    /// Comparison over operands of equal type. Mixed signedness or mixed
    /// int/float operands must be unified by an explicit cast first.
    pub fn try_compare(&mut self, op: CompareOp, lhs: ExprId, rhs: ExprId) -> Result<ExprId> {
        let lt = self.type_of(lhs).ok_or(Error::ValuelessOperand { context: "comparison operand" })?;
        let rt = self.type_of(rhs).ok_or(Error::ValuelessOperand { context: "comparison operand" })?;
        if lt != rt {
            return Err(Error::TypeMismatch { lhs: lt, rhs: rt });
        }
        Ok(self.push(Expr::Compare { op, lhs, rhs }))
    }

    pub fn try_logical(&mut self, op: LogicalOp, lhs: ExprId, rhs: ExprId) -> Result<ExprId> {
        for operand in [lhs, rhs] {
            let ty = self.type_of(operand).ok_or(Error::ValuelessOperand { context: "logical operand" })?;
            if !ty.is_bool() {
                return Err(Error::NotBoolean { ty });
            }
        }
        Ok(self.push(Expr::Logical { op, lhs, rhs }))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.push(Expr::Unary { op, operand })
    }

    pub fn cast(&mut self, ty: ScalarType, value: ExprId) -> ExprId {
        self.push(Expr::Cast { ty, value })
    }

    pub fn block(&mut self, stmts: impl IntoIterator<Item = ExprId>) -> ExprId {
        self.push(Expr::Block { stmts: stmts.into_iter().collect() })
    }

    pub fn for_loop(&mut self, var: ExprId, extent: ExprId, body: ExprId, kind: LoopKind) -> ExprId {
        self.push(Expr::For { var, extent, body, kind })
    }

    pub fn if_then_else(&mut self, cond: ExprId, then_case: ExprId, else_case: Option<ExprId>) -> ExprId {
        self.push(Expr::IfThenElse { cond, then_case, else_case })
    }

    pub fn store(&mut self, tensor: TensorId, indices: impl IntoIterator<Item = ExprId>, value: ExprId) -> ExprId {
        self.push(Expr::Store { tensor, indices: indices.into_iter().collect(), value })
    }

    pub fn load(&mut self, tensor: TensorId, indices: impl IntoIterator<Item = ExprId>) -> ExprId {
        self.push(Expr::Load { tensor, indices: indices.into_iter().collect() })
    }

    pub fn call(
        &mut self,
        name: impl Into<String>,
        args: impl IntoIterator<Item = ExprId>,
        ret: Option<ScalarType>,
        kind: CallKind,
    ) -> ExprId {
        self.push(Expr::Call {
            name: name.into(),
            args: args.into_iter().collect(),
            ret,
            kind,
            outputs: SmallVec::new(),
        })
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// Value type of a node; `None` for statements.
    pub fn type_of(&self, id: ExprId) -> Option<ScalarType> {
        match self.expr(id) {
            Expr::Imm { ty, .. } | Expr::Var { ty, .. } | Expr::Cast { ty, .. } | Expr::Binary { ty, .. } => Some(*ty),
            Expr::StrImm { .. } => None,
            Expr::Compare { lhs, .. } => {
                let operand = self.type_of(*lhs)?;
                Some(cast::compare_result(operand))
            }
            Expr::Logical { lhs, .. } => self.type_of(*lhs),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => self.type_of(*operand),
                UnaryOp::Not => Some(ScalarType::bool_().with_lanes(self.type_of(*operand)?.lanes)),
            },
            Expr::Ramp { base, lanes, .. } => Some(self.type_of(*base)?.with_lanes(*lanes)),
            Expr::Broadcast { value, lanes } => Some(self.type_of(*value)?.with_lanes(*lanes)),
            Expr::BufferRef { .. } | Expr::TensorRef { .. } => None,
            Expr::Load { tensor, indices } => {
                let elem = self.buffer(self.tensor(*tensor).binding?).elem;
                let lanes = indices.last().and_then(|i| self.type_of(*i)).map_or(1, |t| t.lanes);
                Some(elem.with_lanes(lanes))
            }
            Expr::Call { ret, .. } => *ret,
            Expr::TupleGet { call, .. } => match self.expr(*call) {
                Expr::Call { ret, .. } => *ret,
                _ => None,
            },
            Expr::ArgPack { .. } => None,
            Expr::AccelIndex { .. } => Some(ScalarType::int32()),
            Expr::Alloc { .. }
            | Expr::Free { .. }
            | Expr::Store { .. }
            | Expr::ShallowStore { .. }
            | Expr::For { .. }
            | Expr::PolyFor { .. }
            | Expr::IfThenElse { .. }
            | Expr::Block { .. }
            | Expr::ScheduleBlock { .. } => None,
        }
    }
}

impl std::ops::Index<ExprId> for Arena {
    type Output = Expr;

    fn index(&self, id: ExprId) -> &Expr {
        self.expr(id)
    }
}
