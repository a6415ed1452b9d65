use snafu::Snafu;

use ingot_dtype::ScalarType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Operand types of a binary/comparison node differ.
    #[snafu(display("type mismatch: cannot combine {lhs} and {rhs} without an explicit cast"))]
    TypeMismatch { lhs: ScalarType, rhs: ScalarType },

    /// A boolean operation received a non-boolean operand.
    #[snafu(display("logical operand must be bool, got {ty}"))]
    NotBoolean { ty: ScalarType },

    /// A statement node was used where a value was required.
    #[snafu(display("{context} produces no value"))]
    ValuelessOperand { context: &'static str },

    /// A tensor was used for a store/load without a buffer binding.
    #[snafu(display("tensor `{name}` is not bound to a buffer"))]
    UnboundTensor { name: String },
}
