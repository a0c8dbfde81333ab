//! Edge case tests for ember-lex.
