//! Compact single-line rendering for logs and diagnostics.

use std::fmt::{self, Write as _};

use crate::arena::{Arena, ExprId};
use crate::expr::Expr;
use crate::types::{BinaryOp, CompareOp, Literal, LogicalOp, UnaryOp};

impl Arena {
    /// Render the subtree at `id` on one line.
    pub fn render(&self, id: ExprId) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_expr(&mut out, id);
        out
    }

    fn write_expr(&self, out: &mut String, id: ExprId) -> fmt::Result {
        match self.expr(id) {
            Expr::Imm { ty, value } => match value {
                Literal::Int(v) => write!(out, "({v}:{ty})"),
                Literal::UInt(v) => write!(out, "({v}:{ty})"),
                Literal::Float(v) => write!(out, "({v}:{ty})"),
                Literal::Bool(v) => write!(out, "({v}:{ty})"),
            },
            Expr::StrImm { value } => write!(out, "{value:?}"),
            Expr::Var { name, .. } => write!(out, "{name}"),
            Expr::Binary { op, lhs, rhs, .. } => self.write_infix(out, binary_symbol(*op), *lhs, *rhs),
            Expr::Compare { op, lhs, rhs } => self.write_infix(out, compare_symbol(*op), *lhs, *rhs),
            Expr::Logical { op, lhs, rhs } => {
                self.write_infix(out, if *op == LogicalOp::And { "&&" } else { "||" }, *lhs, *rhs)
            }
            Expr::Unary { op, operand } => {
                write!(out, "{}", if *op == UnaryOp::Neg { "-" } else { "!" })?;
                self.write_expr(out, *operand)
            }
            Expr::Cast { ty, value } => {
                write!(out, "cast<{ty}>(")?;
                self.write_expr(out, *value)?;
                write!(out, ")")
            }
            Expr::Ramp { base, stride, lanes } => {
                write!(out, "ramp(")?;
                self.write_expr(out, *base)?;
                write!(out, ", {stride}, {lanes})")
            }
            Expr::Broadcast { value, lanes } => {
                write!(out, "broadcast(")?;
                self.write_expr(out, *value)?;
                write!(out, ", {lanes})")
            }
            Expr::BufferRef { buffer } => write!(out, "&{}", self.buffer(*buffer).name),
            Expr::TensorRef { tensor } => write!(out, "{}", self.tensor(*tensor).name),
            Expr::Alloc { buffer } => write!(out, "alloc({})", self.buffer(*buffer).name),
            Expr::Free { buffer } => write!(out, "free({})", self.buffer(*buffer).name),
            Expr::Store { tensor, indices, value } => {
                write!(out, "{}[", self.tensor(*tensor).name)?;
                self.write_list(out, indices)?;
                write!(out, "] = ")?;
                self.write_expr(out, *value)
            }
            Expr::ShallowStore { tensor, value } => {
                write!(out, "{} <- ", self.tensor(*tensor).name)?;
                self.write_expr(out, *value)
            }
            Expr::Load { tensor, indices } => {
                write!(out, "{}[", self.tensor(*tensor).name)?;
                self.write_list(out, indices)?;
                write!(out, "]")
            }
            Expr::Call { name, args, .. } => {
                write!(out, "{name}(")?;
                self.write_list(out, args)?;
                write!(out, ")")
            }
            Expr::TupleGet { call, index } => {
                self.write_expr(out, *call)?;
                write!(out, ".{index}")
            }
            Expr::ArgPack { args } => {
                write!(out, "pack[")?;
                self.write_list(out, args)?;
                write!(out, "]")
            }
            Expr::For { var, extent, body, .. } => {
                write!(out, "for (")?;
                self.write_expr(out, *var)?;
                write!(out, ", 0, ")?;
                self.write_expr(out, *extent)?;
                write!(out, ") ")?;
                self.write_expr(out, *body)
            }
            Expr::PolyFor { var, init, condition, body, .. } => {
                write!(out, "poly_for (")?;
                self.write_expr(out, *var)?;
                write!(out, " = ")?;
                self.write_expr(out, *init)?;
                write!(out, "; ")?;
                self.write_expr(out, *condition)?;
                write!(out, ") ")?;
                self.write_expr(out, *body)
            }
            Expr::IfThenElse { cond, then_case, else_case } => {
                write!(out, "if (")?;
                self.write_expr(out, *cond)?;
                write!(out, ") ")?;
                self.write_expr(out, *then_case)?;
                if let Some(e) = else_case {
                    write!(out, " else ")?;
                    self.write_expr(out, *e)?;
                }
                Ok(())
            }
            Expr::Block { stmts } => {
                write!(out, "{{ ")?;
                for stmt in stmts {
                    self.write_expr(out, *stmt)?;
                    write!(out, "; ")?;
                }
                write!(out, "}}")
            }
            Expr::ScheduleBlock { name, body } => {
                write!(out, "schedule[{name}] ")?;
                self.write_expr(out, *body)
            }
            Expr::AccelIndex { axis } => {
                let name: &'static str = (*axis).into();
                write!(out, "axis.{name}")
            }
        }
    }

    fn write_infix(&self, out: &mut String, symbol: &str, lhs: ExprId, rhs: ExprId) -> fmt::Result {
        write!(out, "(")?;
        self.write_expr(out, lhs)?;
        write!(out, " {symbol} ")?;
        self.write_expr(out, rhs)?;
        write!(out, ")")
    }

    fn write_list(&self, out: &mut String, ids: &[ExprId]) -> fmt::Result {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                write!(out, ", ")?;
            }
            self.write_expr(out, *id)?;
        }
        Ok(())
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Min => "min",
        BinaryOp::Max => "max",
    }
}

fn compare_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}
