//! Helper structures for the code generation walk.

use cranelift_codegen::ir::Value;

/// Lexically scoped name-to-value bindings for loop variables and scalar
/// parameters. Inner bindings shadow outer ones.
#[derive(Debug, Default)]
pub struct VarScope {
    bindings: Vec<(String, Value)>,
}

impl VarScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.push((name.into(), value));
    }

    pub fn pop(&mut self) {
        self.bindings.pop();
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.iter().rev().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

/// Row-major flattened element offset of `indices` against `extents` (last
/// index fastest-varying). `None` when the arities differ.
pub fn linear_offset(extents: &[i64], indices: &[i64]) -> Option<i64> {
    if extents.len() != indices.len() {
        return None;
    }
    let mut offset = 0i64;
    for (extent, index) in extents.iter().zip(indices) {
        offset = offset * extent + index;
    }
    Some(offset)
}

/// Row-major element strides for `extents`.
pub fn row_major_strides(extents: &[i64]) -> Vec<i64> {
    let mut strides = vec![1i64; extents.len()];
    for i in (0..extents.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * extents[i + 1];
    }
    strides
}
