//! Lexical scope stack for the resolver.

use ember_util::FxHashMap;

/// A stack of lexical scopes, each mapping a name to whether its
/// initializer has finished ("defined").
///
/// The stack always contains an initial outermost scope; `begin_scope` /
/// `end_scope` push and pop around blocks, function bodies, and class
/// bodies. Lookup walks innermost-out and reports the **hop count**: the
/// number of enclosing environments between the reference and its
/// binding (innermost = 0).
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<FxHashMap<String, bool>>,
}

impl ScopeStack {
    /// Creates a stack holding the initial outermost scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    /// Enters a new innermost scope.
    pub fn begin_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Leaves the innermost scope. The initial outermost scope is never
    /// popped.
    pub fn end_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declares a name in the innermost scope, marking it not yet
    /// defined. Returns false if the name was already present there.
    pub fn declare(&mut self, name: &str) -> bool {
        let scope = self.innermost();
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(name.to_string(), false);
        true
    }

    /// Marks a declared name as defined in the innermost scope.
    pub fn define(&mut self, name: &str) {
        self.innermost().insert(name.to_string(), true);
    }

    /// Inserts a name directly as defined; used for the implicit `this`
    /// and `super` bindings of class bodies.
    pub fn inject(&mut self, name: &str) {
        self.innermost().insert(name.to_string(), true);
    }

    /// Returns true if the innermost scope has declared the name but not
    /// yet defined it (a read inside its own initializer).
    pub fn in_own_initializer(&self, name: &str) -> bool {
        self.scopes
            .last()
            .and_then(|scope| scope.get(name))
            .is_some_and(|defined| !defined)
    }

    /// Finds the hop count of a name: 0 for the innermost scope, one per
    /// enclosing scope. Returns `None` when no scope binds the name, in
    /// which case the reference is treated as a global.
    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .position(|scope| scope.contains_key(name))
    }

    fn innermost(&mut self) -> &mut FxHashMap<String, bool> {
        // The stack is never empty: new() seeds the outermost scope and
        // end_scope refuses to pop it.
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
