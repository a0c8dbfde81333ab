//! ember-util - Shared infrastructure for the Ember interpreter.
//!
//! This crate provides the pieces every pipeline phase depends on:
//!
//! - [`Span`] - source location tracking (byte range, line, column)
//! - [`Diagnostic`] / [`Handler`] - the shared error sink that the lexer,
//!   parser, resolver, and evaluator all report into
//! - Fast hash map re-exports used across the phase crates
//!
//! The diagnostic handler is deliberately a constructor-injected
//! collaborator rather than a process-wide singleton: each phase receives
//! a reference to the same `Handler` and writes into it. Two sticky
//! queries drive the pipeline gates: [`Handler::has_errors`] (lex, parse,
//! and resolve diagnostics) and [`Handler::has_runtime_errors`]
//! (evaluator diagnostics).

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Context, Diagnostic, Handler, Level};
pub use span::Span;

pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
