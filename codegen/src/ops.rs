//! Per-operation Cranelift instruction selection.
//!
//! These helpers are pure instruction selection over already-emitted operand
//! values; operand/result types were checked by the renderer before calling
//! in. Dispatch is by float/signed split, matching the type contract:
//! integer div/mod truncate toward zero, float mod expands to
//! `a - trunc(a/b) * b`, float min/max are Cranelift's NaN-propagating
//! `fmin`/`fmax`, and comparisons always yield the 8-bit boolean type.

use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{InstBuilder, MemFlags, Value};
use cranelift_frontend::FunctionBuilder;

use ingot_dtype::cast::CastKind;
use ingot_dtype::{ScalarType, TypeKind};
use ingot_ir::{BinaryOp, CompareOp, Literal, LogicalOp, UnaryOp};

use crate::error::{Error, Result};
use crate::types::scalar_to_cl_type;

/// Emit a typed immediate.
pub fn emit_const(ty: ScalarType, value: Literal, builder: &mut FunctionBuilder) -> Result<Value> {
    let cl_type = scalar_to_cl_type(ty)?;
    let value = match value {
        Literal::Int(v) => builder.ins().iconst(cl_type, v),
        Literal::UInt(v) => builder.ins().iconst(cl_type, v as i64),
        Literal::Float(v) => {
            if ty.bits == 32 {
                builder.ins().f32const(v as f32)
            } else {
                builder.ins().f64const(v)
            }
        }
        Literal::Bool(v) => builder.ins().iconst(cl_type, v as i64),
    };
    Ok(value)
}

/// Emit a binary arithmetic operation over unified operands of type `ty`.
pub fn emit_binary(op: BinaryOp, lhs: Value, rhs: Value, ty: ScalarType, builder: &mut FunctionBuilder) -> Value {
    let fp = ty.is_float();
    let signed = ty.is_signed();
    match op {
        BinaryOp::Add => {
            if fp {
                builder.ins().fadd(lhs, rhs)
            } else {
                builder.ins().iadd(lhs, rhs)
            }
        }
        BinaryOp::Sub => {
            if fp {
                builder.ins().fsub(lhs, rhs)
            } else {
                builder.ins().isub(lhs, rhs)
            }
        }
        BinaryOp::Mul => {
            if fp {
                builder.ins().fmul(lhs, rhs)
            } else {
                builder.ins().imul(lhs, rhs)
            }
        }
        BinaryOp::Div => {
            if fp {
                builder.ins().fdiv(lhs, rhs)
            } else if signed {
                builder.ins().sdiv(lhs, rhs)
            } else {
                builder.ins().udiv(lhs, rhs)
            }
        }
        BinaryOp::Mod => {
            if fp {
                // No frem in Cranelift: fmod as a - trunc(a/b) * b.
                let div = builder.ins().fdiv(lhs, rhs);
                let truncated = builder.ins().trunc(div);
                let scaled = builder.ins().fmul(truncated, rhs);
                builder.ins().fsub(lhs, scaled)
            } else if signed {
                builder.ins().srem(lhs, rhs)
            } else {
                builder.ins().urem(lhs, rhs)
            }
        }
        BinaryOp::Min => {
            if fp {
                builder.ins().fmin(lhs, rhs)
            } else if signed {
                builder.ins().smin(lhs, rhs)
            } else {
                builder.ins().umin(lhs, rhs)
            }
        }
        BinaryOp::Max => {
            if fp {
                builder.ins().fmax(lhs, rhs)
            } else if signed {
                builder.ins().smax(lhs, rhs)
            } else {
                builder.ins().umax(lhs, rhs)
            }
        }
    }
}

/// Emit a comparison over unified operands of type `operand_ty`; the result
/// is the 8-bit boolean type regardless of operand width.
pub fn emit_compare(
    op: CompareOp,
    lhs: Value,
    rhs: Value,
    operand_ty: ScalarType,
    builder: &mut FunctionBuilder,
) -> Value {
    if operand_ty.is_float() {
        let cc = match op {
            CompareOp::Eq => FloatCC::Equal,
            CompareOp::Ne => FloatCC::NotEqual,
            CompareOp::Lt => FloatCC::LessThan,
            CompareOp::Le => FloatCC::LessThanOrEqual,
            CompareOp::Gt => FloatCC::GreaterThan,
            CompareOp::Ge => FloatCC::GreaterThanOrEqual,
        };
        builder.ins().fcmp(cc, lhs, rhs)
    } else {
        let signed = operand_ty.is_signed();
        let cc = match op {
            CompareOp::Eq => IntCC::Equal,
            CompareOp::Ne => IntCC::NotEqual,
            CompareOp::Lt if signed => IntCC::SignedLessThan,
            CompareOp::Lt => IntCC::UnsignedLessThan,
            CompareOp::Le if signed => IntCC::SignedLessThanOrEqual,
            CompareOp::Le => IntCC::UnsignedLessThanOrEqual,
            CompareOp::Gt if signed => IntCC::SignedGreaterThan,
            CompareOp::Gt => IntCC::UnsignedGreaterThan,
            CompareOp::Ge if signed => IntCC::SignedGreaterThanOrEqual,
            CompareOp::Ge => IntCC::UnsignedGreaterThanOrEqual,
        };
        builder.ins().icmp(cc, lhs, rhs)
    }
}

pub fn emit_logical(op: LogicalOp, lhs: Value, rhs: Value, builder: &mut FunctionBuilder) -> Value {
    match op {
        LogicalOp::And => builder.ins().band(lhs, rhs),
        LogicalOp::Or => builder.ins().bor(lhs, rhs),
    }
}

pub fn emit_unary(op: UnaryOp, operand: Value, ty: ScalarType, builder: &mut FunctionBuilder) -> Value {
    match op {
        UnaryOp::Neg => {
            if ty.is_float() {
                builder.ins().fneg(operand)
            } else {
                builder.ins().ineg(operand)
            }
        }
        // Boolean storage holds {0,1}: flip the low bit.
        UnaryOp::Not => builder.ins().bxor_imm(operand, 1),
    }
}

/// Emit a cast from `src_ty` to `dst_ty` per the cast contract: the only
/// raw bit reinterpretation is the same-width signed/unsigned (and boolean
/// storage) case; every cross-kind cast is an explicit value conversion,
/// with float-to-int truncating toward zero.
pub fn emit_cast(
    value: Value,
    src_ty: ScalarType,
    dst_ty: ScalarType,
    builder: &mut FunctionBuilder,
) -> Result<Value> {
    let Some(kind) = ingot_dtype::cast::classify(src_ty, dst_ty) else {
        return Err(Error::TypeError { detail: format!("cast cannot change lanes: {src_ty} -> {dst_ty}") });
    };
    let dst = scalar_to_cl_type(dst_ty)?;
    let result = match kind {
        CastKind::Identity | CastKind::Reinterpret => value,
        CastKind::IntResize => {
            if src_ty.bits > dst_ty.bits {
                builder.ins().ireduce(dst, value)
            } else if src_ty.is_signed() {
                builder.ins().sextend(dst, value)
            } else {
                builder.ins().uextend(dst, value)
            }
        }
        CastKind::IntToFloat => {
            // Width-align the integer first; conversions are defined on the
            // matching register class width.
            let adjusted = align_int_width(value, src_ty, dst_ty, builder);
            if src_ty.is_signed() {
                builder.ins().fcvt_from_sint(dst, adjusted)
            } else {
                builder.ins().fcvt_from_uint(dst, adjusted)
            }
        }
        CastKind::FloatToInt => {
            if dst_ty.is_signed() {
                builder.ins().fcvt_to_sint(dst, value)
            } else {
                builder.ins().fcvt_to_uint(dst, value)
            }
        }
        CastKind::FloatResize => {
            if src_ty.bits > dst_ty.bits {
                builder.ins().fdemote(dst, value)
            } else {
                builder.ins().fpromote(dst, value)
            }
        }
        CastKind::ToBool => {
            if src_ty.is_float() {
                let zero = emit_const(src_ty, Literal::Float(0.0), builder)?;
                builder.ins().fcmp(FloatCC::NotEqual, value, zero)
            } else {
                builder.ins().icmp_imm(IntCC::NotEqual, value, 0)
            }
        }
        CastKind::FromBool => {
            if dst_ty.is_float() {
                builder.ins().fcvt_from_uint(dst, value)
            } else {
                builder.ins().uextend(dst, value)
            }
        }
    };
    Ok(result)
}

fn align_int_width(value: Value, src_ty: ScalarType, dst_ty: ScalarType, builder: &mut FunctionBuilder) -> Value {
    let want_bits = dst_ty.bits.max(32);
    let aligned_ty = ScalarType::new(if src_ty.is_signed() { TypeKind::Int } else { TypeKind::UInt }, want_bits);
    let Ok(cl) = scalar_to_cl_type(aligned_ty) else {
        return value;
    };
    if src_ty.bits > want_bits {
        builder.ins().ireduce(cl, value)
    } else if src_ty.bits < want_bits {
        if src_ty.is_signed() { builder.ins().sextend(cl, value) } else { builder.ins().uextend(cl, value) }
    } else {
        value
    }
}

/// Load/store memory flags used for tensor accesses.
pub fn mem_flags() -> MemFlags {
    MemFlags::new()
}
