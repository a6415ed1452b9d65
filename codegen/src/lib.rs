//! Code generation backend for the ingot compiler.
//!
//! Translates canonical IR (the optimization pipeline's output) into native
//! low-level instructions — Cranelift IR — in a single depth-first walk per
//! function. A symbol table enforces the module's single-definition
//! invariants for buffers, tensors, and functions, and the per-function
//! walk enforces Alloc/Free balance.
//!
//! The result is a [`NativeModule`] of named Cranelift functions plus the
//! extern-symbol table; finalizing it into runnable code (JIT or object
//! emission) is the external execution collaborator's job.

pub mod error;
pub mod helpers;
pub mod module;
pub mod ops;
pub mod renderer;
pub mod symbols;
pub mod types;


pub use error::{Error, Result};
pub use module::{NativeFunc, NativeModule};
pub use renderer::{compile_func, compile_module};
pub use symbols::SymbolTable;
