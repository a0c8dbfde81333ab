//! Runtime error and control-flow signal types.

use thiserror::Error;

use ember_util::Span;

use crate::value::Value;

/// A runtime error: message plus the source position of the token that
/// triggered it.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct RuntimeError {
    /// The diagnostic message.
    pub message: String,
    /// Position of the offending token.
    pub span: Span,
}

impl RuntimeError {
    /// Creates a runtime error at the given position.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Non-local control flow inside the evaluator.
///
/// Every statement and expression evaluator returns
/// `Result<_, Signal>`. A `return` statement raises `Signal::Return`,
/// which unwinds enclosing blocks and loops (restoring the environment
/// at each level) until the function call site interprets it as the
/// call's value. Runtime errors travel the same channel and unwind all
/// the way to the top-level statement list.
#[derive(Debug)]
pub enum Signal {
    /// A `return` statement in flight. Invisible to the caller of the
    /// function call and never reported as an error.
    Return(Value),
    /// A runtime error in flight.
    Error(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Self {
        Signal::Error(err)
    }
}

/// Result type used throughout the evaluator.
pub type EvalResult<T> = Result<T, Signal>;
