//! Error types for code generation.
//!
//! Every variant is fatal to the compilation unit: codegen never emits a
//! partial module, and nothing here is locally recovered — miscompiled
//! tensor arithmetic would be strictly worse than a rejected build.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Node or feature the native backend cannot express, including
    /// canonical-form violations (a surviving schedule-style loop means the
    /// pipeline was skipped).
    #[snafu(display("unsupported construct: {what}"))]
    UnsupportedConstruct { what: String },

    /// Operand/result type mismatch in a binary, comparison, or cast.
    #[snafu(display("type error: {detail}"))]
    TypeError { detail: String },

    /// Tensor used by a store/load without a buffer binding.
    #[snafu(display("tensor `{name}` is not bound to a buffer"))]
    UnboundResource { name: String },

    /// Buffer or function name already present in the symbol table.
    #[snafu(display("duplicate definition of {kind} `{name}`"))]
    DuplicateDefinition { kind: &'static str, name: String },

    /// Alloc without matching Free (or vice versa) within one function.
    #[snafu(display("unbalanced alloc/free for buffer `{name}`: {detail}"))]
    UnbalancedResource { name: String, detail: &'static str },

    /// Required value not available at this point of the walk.
    #[snafu(display("missing {what}"))]
    Missing { what: String },
}
