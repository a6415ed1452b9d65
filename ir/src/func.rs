//! Lowered functions and modules.

use crate::arena::{Arena, BufferId, ExprId};
use crate::memory::Buffer;
use ingot_dtype::ScalarType;

/// Kind of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Memory region passed by pointer.
    Buffer(BufferId),
    /// Scalar value.
    Scalar(ScalarType),
}

/// Ordered function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    pub fn buffer(name: impl Into<String>, buffer: BufferId) -> Self {
        Self { name: name.into(), kind: ParamKind::Buffer(buffer) }
    }

    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self { name: name.into(), kind: ParamKind::Scalar(ty) }
    }
}

/// Declared return semantics of a lowered function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnKind {
    #[default]
    Void,
    /// Returns int32 0, the host runtime's success code.
    Status,
}

/// Accelerator execution-dimension extents recorded by the axis-binding
/// pass: blocks x/y/z then threads x/y/z, defaulting to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelDims(pub [i64; 6]);

impl Default for AccelDims {
    fn default() -> Self {
        Self([1; 6])
    }
}

/// A lowered function: ordered parameters and a body block, self-contained
/// with the arena its nodes live in. `Clone` deep-copies the whole tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredFunc {
    pub name: String,
    pub params: Vec<Param>,
    pub body: ExprId,
    pub ret: ReturnKind,
    pub arena: Arena,
    pub accel_dims: Option<AccelDims>,
}

impl LoweredFunc {
    pub fn new(name: impl Into<String>, params: Vec<Param>, arena: Arena, body: ExprId) -> Self {
        Self { name: name.into(), params, body, ret: ReturnKind::default(), arena, accel_dims: None }
    }

    pub fn with_return(mut self, ret: ReturnKind) -> Self {
        self.ret = ret;
        self
    }
}

/// Ordered collection of lowered functions plus global buffer declarations.
///
/// Function and buffer names must each be unique within a module; the
/// codegen symbol table rejects violations as duplicate definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Buffer>,
    pub functions: Vec<LoweredFunc>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), globals: Vec::new(), functions: Vec::new() }
    }

    pub fn add_function(&mut self, func: LoweredFunc) {
        self.functions.push(func);
    }

    pub fn function(&self, name: &str) -> Option<&LoweredFunc> {
        self.functions.iter().find(|f| f.name == name)
    }
}
