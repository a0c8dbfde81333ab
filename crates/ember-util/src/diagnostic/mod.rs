//! Diagnostic module - Error reporting infrastructure.
//!
//! Every interpreter phase reports problems into a shared [`Handler`].
//! The handler records each [`Diagnostic`] and answers the two sticky
//! questions the driver gates the pipeline on: were there compile-time
//! errors (lex, parse, resolve), and were there runtime errors?
//!
//! # Examples
//!
//! ```
//! use ember_util::diagnostic::{Diagnostic, Handler};
//! use ember_util::span::Span;
//!
//! let handler = Handler::new();
//! handler.emit(Diagnostic::error("Unexpected character: @", Span::DUMMY));
//!
//! assert!(handler.has_errors());
//! assert!(!handler.has_runtime_errors());
//! ```

mod render;

use std::cell::RefCell;
use std::fmt;

use crate::span::Span;

/// Diagnostic severity level.
///
/// Lex, parse, and resolve problems are all `Error`; only the evaluator
/// produces `RuntimeError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A compile-time error (lexing, parsing, or resolution).
    Error,
    /// An error raised while evaluating the program.
    RuntimeError,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "Error"),
            Level::RuntimeError => write!(f, "RuntimeError"),
        }
    }
}

/// Token context for a diagnostic: the `<Where>` part of the rendered
/// message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Context {
    /// No token context (lexer and runtime errors).
    None,
    /// The error occurred at the end of input.
    AtEnd,
    /// The error occurred at a specific lexeme.
    AtLexeme(String),
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::None => Ok(()),
            Context::AtEnd => write!(f, " at end"),
            Context::AtLexeme(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

/// A diagnostic message with severity, location, and token context.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level.
    pub level: Level,
    /// Main diagnostic message.
    pub message: String,
    /// Source location.
    pub span: Span,
    /// Token context for rendering.
    pub context: Context,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(level: Level, message: impl Into<String>, span: Span, context: Context) -> Self {
        Self {
            level,
            message: message.into(),
            span,
            context,
        }
    }

    /// Create a compile-time error with no token context.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span, Context::None)
    }

    /// Create a compile-time error anchored to a lexeme.
    pub fn error_at(message: impl Into<String>, span: Span, lexeme: impl Into<String>) -> Self {
        Self::new(Level::Error, message, span, Context::AtLexeme(lexeme.into()))
    }

    /// Create a compile-time error at the end of input.
    pub fn error_at_end(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span, Context::AtEnd)
    }

    /// Create a runtime error.
    pub fn runtime(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::RuntimeError, message, span, Context::None)
    }
}

/// Handler for collecting and querying diagnostics.
///
/// The handler uses interior mutability so every phase can share one
/// instance behind a plain reference. Diagnostics accumulate until the
/// driver drains them with [`Handler::take`] (script mode flushes once
/// per run, the REPL once per line).
pub struct Handler {
    /// Collected diagnostics.
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new, empty handler.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Record a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Check whether any compile-time errors have been reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Check whether any runtime errors have been reported.
    pub fn has_runtime_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::RuntimeError)
    }

    /// Number of compile-time errors reported so far.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Get a copy of all recorded diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Drain all recorded diagnostics, leaving the handler empty but
    /// keeping nothing sticky; callers that need the flags afterwards
    /// must check them first.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Clear all diagnostics. The REPL calls this at the start of every
    /// line so one bad line does not poison the next.
    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "Error");
        assert_eq!(format!("{}", Level::RuntimeError), "RuntimeError");
    }

    #[test]
    fn test_context_display() {
        assert_eq!(format!("{}", Context::None), "");
        assert_eq!(format!("{}", Context::AtEnd), " at end");
        assert_eq!(
            format!("{}", Context::AtLexeme("var".to_string())),
            " at 'var'"
        );
    }

    #[test]
    fn test_handler_new_is_clean() {
        let handler = Handler::new();
        assert!(!handler.has_errors());
        assert!(!handler.has_runtime_errors());
        assert_eq!(handler.error_count(), 0);
    }

    #[test]
    fn test_handler_error_flag() {
        let handler = Handler::new();
        handler.emit(Diagnostic::error("bad", Span::DUMMY));
        assert!(handler.has_errors());
        assert!(!handler.has_runtime_errors());
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn test_handler_runtime_flag() {
        let handler = Handler::new();
        handler.emit(Diagnostic::runtime("boom", Span::DUMMY));
        assert!(!handler.has_errors());
        assert!(handler.has_runtime_errors());
        assert_eq!(handler.error_count(), 0);
    }

    #[test]
    fn test_handler_clear() {
        let handler = Handler::new();
        handler.emit(Diagnostic::error("bad", Span::DUMMY));
        handler.clear();
        assert!(!handler.has_errors());
        assert!(handler.diagnostics().is_empty());
    }

    #[test]
    fn test_handler_take_drains() {
        let handler = Handler::new();
        handler.emit(Diagnostic::error("one", Span::DUMMY));
        handler.emit(Diagnostic::runtime("two", Span::DUMMY));

        let drained = handler.take();
        assert_eq!(drained.len(), 2);
        assert!(handler.diagnostics().is_empty());
    }
}
