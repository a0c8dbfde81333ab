//! Edge case tests for ember-par.
