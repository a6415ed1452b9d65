use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal pipeline errors. None of these are recovered: a pass that rejects
/// its input aborts the compilation, and no partial IR is handed onward.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A pass received IR not in the form an earlier pass guarantees.
    #[snafu(display("pass `{pass}` precondition violated: {detail}"))]
    PreconditionViolation { pass: &'static str, detail: String },

    /// A node or feature the current target cannot express.
    #[snafu(display("pass `{pass}` cannot lower construct: {what}"))]
    UnsupportedConstruct { pass: &'static str, what: String },

    /// Error surfaced from the IR layer.
    #[snafu(context(false), display("{source}"))]
    Ir { source: ingot_ir::Error },
}
