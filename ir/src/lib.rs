//! Intermediate representation for the ingot compiler.
//!
//! Expressions live in a per-function [`Arena`] and reference each other by
//! stable [`ExprId`] handles; buffers and tensors live in side tables of the
//! same arena and are referenced by [`BufferId`]/[`TensorId`]. This keeps the
//! deep ownership graph (module > function > block > expression, buffers
//! shared by many tensors) cycle-free and makes the whole-tree deep copy the
//! optimizer starts from a plain `Clone`.
//!
//! # Module Organization
//!
//! - [`types`] - operation kind enums and literal values
//! - [`expr`] - the closed expression variant
//! - [`arena`] - node storage, handles, and typed constructors
//! - [`memory`] - buffers, tensors, shape extents
//! - [`func`] - lowered functions and modules
//! - [`target`] - target descriptor consulted by the pipeline and codegen
//! - [`display`] - compact single-line rendering for logs and diagnostics

pub mod arena;
pub mod display;
pub mod error;
pub mod expr;
pub mod func;
pub mod memory;
pub mod target;
pub mod types;


pub use arena::{Arena, BufferId, ExprId, TensorId};
pub use error::{Error, Result};
pub use expr::Expr;
pub use func::{AccelDims, LoweredFunc, Module, Param, ParamKind, ReturnKind};
pub use memory::{Buffer, Extent, StorageScope, Tensor};
pub use target::{ArchClass, Target, TargetFeature};
pub use types::{AccelAxis, BinaryOp, CallKind, CompareOp, Literal, LogicalOp, LoopKind, UnaryOp};

// Re-export the type layer for convenience.
pub use ingot_dtype::{ScalarType, TypeKind};
