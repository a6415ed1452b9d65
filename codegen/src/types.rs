//! Scalar type to Cranelift type mapping.

use cranelift_codegen::ir::{Type, types};
use ingot_dtype::{ScalarType, TypeKind};

use crate::error::{Error, Result};

/// Convert a scalar descriptor to a Cranelift type, including vectors.
pub fn scalar_to_cl_type(ty: ScalarType) -> Result<Type> {
    let lane = lane_to_cl_type(ty)?;
    if ty.lanes == 1 {
        return Ok(lane);
    }
    lane.by(ty.lanes as u32).ok_or_else(|| Error::UnsupportedConstruct {
        what: format!("vector type {ty} has no Cranelift representation"),
    })
}

fn lane_to_cl_type(ty: ScalarType) -> Result<Type> {
    let cl = match (ty.kind, ty.bits) {
        // Cranelift has no i1; booleans use their 8-bit storage type.
        (TypeKind::Bool, 8) => types::I8,
        (TypeKind::Int | TypeKind::UInt, 8) => types::I8,
        (TypeKind::Int | TypeKind::UInt, 16) => types::I16,
        (TypeKind::Int | TypeKind::UInt, 32) => types::I32,
        (TypeKind::Int | TypeKind::UInt, 64) => types::I64,
        (TypeKind::Float, 16) => types::F16,
        (TypeKind::Float, 32) => types::F32,
        (TypeKind::Float, 64) => types::F64,
        _ => {
            return Err(Error::UnsupportedConstruct { what: format!("scalar type {ty}") });
        }
    };
    Ok(cl)
}

pub fn is_float(ty: ScalarType) -> bool {
    ty.is_float()
}

pub fn is_signed(ty: ScalarType) -> bool {
    ty.is_signed()
}
