//! Edge case tests for ember-sem.
