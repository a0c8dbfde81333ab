//! Lexical environments.
//!
//! An [`Environment`] maps names to values and optionally links to an
//! enclosing environment, forming a chain walked inner to outer. A
//! function value keeps an `Rc` to the environment active at its
//! declaration site, which keeps that environment (and everything
//! reachable through it) alive for as long as the function is - the
//! closure lifetime invariant.
//!
//! Environments are mutated under aliasing: several closures may share
//! one environment, and an assignment through any of them is visible to
//! the others. That is the point of closures, and why bindings live in a
//! `RefCell`.

use std::cell::RefCell;
use std::rc::Rc;

use ember_util::FxHashMap;

use crate::value::Value;

/// A name-to-value scope with an optional enclosing scope.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<FxHashMap<String, Value>>,
    enclosing: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a root environment with no parent (the globals).
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(FxHashMap::default()),
            enclosing: None,
        })
    }

    /// Creates a child environment.
    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(FxHashMap::default()),
            enclosing: Some(enclosing),
        })
    }

    /// Defines (or redefines) a binding in this scope only.
    pub fn define(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Reads a name, searching this scope and then the chain outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.enclosing.as_ref().and_then(|parent| parent.get(name))
    }

    /// Assigns to an existing binding, searching the chain outward.
    /// Returns false if no scope binds the name.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.enclosing {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// Reads a name from exactly the `distance`-th ancestor, as
    /// annotated by the resolver. Returns `None` only if the hop-count
    /// invariant is broken.
    pub fn get_at(&self, distance: usize, name: &str) -> Option<Value> {
        if distance == 0 {
            return self.bindings.borrow().get(name).cloned();
        }
        self.enclosing.as_ref()?.get_at(distance - 1, name)
    }

    /// Writes a name at exactly the `distance`-th ancestor. Returns
    /// false only if the hop-count invariant is broken.
    pub fn assign_at(&self, distance: usize, name: &str, value: Value) -> bool {
        if distance == 0 {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.enclosing {
            Some(parent) => parent.assign_at(distance - 1, name, value),
            None => false,
        }
    }
}
