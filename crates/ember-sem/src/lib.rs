//! ember-sem - Static name resolution for the Ember language.
//!
//! A single pre-pass over the AST that assigns every variable-bearing
//! expression a static **hop count**: the number of enclosing
//! environments between the reference and the environment that binds its
//! name at evaluation time. The evaluator then accesses exactly that
//! ancestor instead of searching the chain, which is what makes closures
//! see the bindings that were lexically in force at their definition
//! rather than whatever happens to shadow them later.
//!
//! Names not found in any lexical scope are left out of the side table
//! and fall back to dynamic lookup in the global environment.
//!
//! The resolver also performs the static checks that do not need runtime
//! values: reads of a variable inside its own initializer, duplicate
//! declarations in one scope, `return` placement, and `this` / `super`
//! placement. All findings are reported to the shared handler and
//! traversal always continues, so one bad statement cannot hide the
//! next.

mod edge_cases;
pub mod scope;

pub use scope::ScopeStack;

use std::mem;

use ember_lex::Token;
use ember_par::ast::{ClassStmt, Expr, FunctionDecl, Stmt};
use ember_par::ExprId;
use ember_util::{Context, Diagnostic, Handler, Level};
use rustc_hash::FxHashMap;

/// The resolver's side table: node identity to hop count.
///
/// Entries accumulate across REPL lines (node identities are unique per
/// session), so the evaluator merges each line's map into the one it
/// already owns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolutionMap {
    map: FxHashMap<ExprId, usize>,
}

impl ResolutionMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the hop count for a node.
    pub fn insert(&mut self, id: ExprId, depth: usize) {
        self.map.insert(id, depth);
    }

    /// Looks up the hop count for a node. `None` means the reference is
    /// a global.
    pub fn get(&self, id: ExprId) -> Option<usize> {
        self.map.get(&id).copied()
    }

    /// Absorbs another map's entries.
    pub fn merge(&mut self, other: ResolutionMap) {
        self.map.extend(other.map);
    }

    /// Number of resolved nodes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no nodes were resolved.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// What kind of function body the resolver is currently inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body the resolver is currently inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// The resolver. One instance resolves one program (or REPL line).
pub struct Resolver<'a> {
    /// Error handler for reporting resolution errors.
    handler: &'a Handler,

    /// Stack of lexical scopes.
    scopes: ScopeStack,

    /// Function context for `return` checks.
    current_function: FunctionKind,

    /// Class context for `this` / `super` checks.
    current_class: ClassKind,

    /// Output side table.
    resolutions: ResolutionMap,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver reporting into the given handler.
    pub fn new(handler: &'a Handler) -> Self {
        Self {
            handler,
            scopes: ScopeStack::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            resolutions: ResolutionMap::new(),
        }
    }

    /// Resolves a program and returns the hop-count side table.
    pub fn resolve(mut self, statements: &[Stmt]) -> ResolutionMap {
        self.resolve_stmts(statements);
        self.resolutions
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Var(var) => {
                self.declare(&var.name);
                if let Some(init) = &var.init {
                    self.resolve_expr(init);
                }
                self.define(&var.name);
            }
            Stmt::Block(statements) => {
                self.scopes.begin_scope();
                self.resolve_stmts(statements);
                self.scopes.end_scope();
            }
            Stmt::If(if_stmt) => {
                self.resolve_expr(&if_stmt.cond);
                self.resolve_stmt(&if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                self.resolve_expr(&while_stmt.cond);
                self.resolve_stmt(&while_stmt.body);
            }
            Stmt::Function(decl) => {
                // Declared and defined before the body so the function
                // can call itself.
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Return(ret) => {
                if self.current_function == FunctionKind::None {
                    self.error(&ret.keyword, "Cannot return from top-level code.");
                }
                if let Some(value) = &ret.value {
                    if self.current_function == FunctionKind::Initializer {
                        self.error(&ret.keyword, "Cannot return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class(class) => self.resolve_class(class),
        }
    }

    fn resolve_class(&mut self, class: &ClassStmt) {
        let enclosing = mem::replace(&mut self.current_class, ClassKind::Class);

        self.declare(&class.name);
        self.define(&class.name);

        if let Some(superclass) = &class.superclass {
            if superclass.name.lexeme == class.name.lexeme {
                self.error(&superclass.name, "A class cannot inherit from itself.");
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_local(superclass.id, &superclass.name.lexeme);
            self.scopes.begin_scope();
            self.scopes.inject("super");
        }

        self.scopes.begin_scope();
        self.scopes.inject("this");

        for method in &class.methods {
            let kind = if method.name.lexeme == "init" {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }

        self.scopes.end_scope();
        if class.superclass.is_some() {
            self.scopes.end_scope();
        }

        self.current_class = enclosing;
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
        let enclosing = mem::replace(&mut self.current_function, kind);

        self.scopes.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.scopes.end_scope();

        self.current_function = enclosing;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Binary(binary) => {
                self.resolve_expr(&binary.left);
                self.resolve_expr(&binary.right);
            }
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Literal(_) => {}
            Expr::Logical(logical) => {
                self.resolve_expr(&logical.left);
                self.resolve_expr(&logical.right);
            }
            Expr::Unary(unary) => self.resolve_expr(&unary.right),
            Expr::Variable(var) => {
                if self.scopes.in_own_initializer(&var.name.lexeme) {
                    self.error(
                        &var.name,
                        "Can't read local variable in its own initializer.",
                    );
                }
                self.resolve_local(var.id, &var.name.lexeme);
            }
            Expr::Assign(assign) => {
                self.resolve_expr(&assign.value);
                self.resolve_local(assign.id, &assign.name.lexeme);
            }
            Expr::Call(call) => {
                self.resolve_expr(&call.callee);
                for arg in &call.args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get(get) => self.resolve_expr(&get.object),
            Expr::Set(set) => {
                self.resolve_expr(&set.value);
                self.resolve_expr(&set.object);
            }
            Expr::This(this) => {
                if self.current_class == ClassKind::None {
                    self.error(&this.keyword, "Cannot use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(this.id, "this");
            }
            Expr::Super(sup) => {
                match self.current_class {
                    ClassKind::None => {
                        self.error(&sup.keyword, "Cannot use 'super' outside of a class.");
                        return;
                    }
                    ClassKind::Class => {
                        self.error(
                            &sup.keyword,
                            "Cannot use 'super' in a class with no superclass.",
                        );
                        return;
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(sup.id, "super");
            }
        }
    }

    /// Records the hop count for a node if any lexical scope binds the
    /// name; otherwise leaves it to dynamic global lookup.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        if let Some(depth) = self.scopes.depth_of(name) {
            self.resolutions.insert(id, depth);
        }
    }

    fn declare(&mut self, name: &Token) {
        if !self.scopes.declare(&name.lexeme) {
            self.error(
                name,
                "Variable with this name already declared in this scope.",
            );
        }
    }

    fn define(&mut self, name: &Token) {
        self.scopes.define(&name.lexeme);
    }

    fn error(&self, token: &Token, message: &str) {
        let context = if token.is_eof() {
            Context::AtEnd
        } else {
            Context::AtLexeme(token.lexeme.clone())
        };
        self.handler
            .emit(Diagnostic::new(Level::Error, message, token.span, context));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_lex::tokenize;
    use ember_par::{NodeIds, Parser};

    fn resolve_source(source: &str) -> (ResolutionMap, Vec<Stmt>, Handler) {
        let handler = Handler::new();
        let ids = NodeIds::new();
        let tokens = tokenize(source, &handler);
        let mut parser = Parser::new(tokens, &handler, &ids);
        let program = parser.parse();
        assert!(!handler.has_errors(), "parse errors in {:?}", source);

        let map = Resolver::new(&handler).resolve(&program);
        (map, program, handler)
    }

    fn resolve_expecting_errors(source: &str) -> (Vec<String>, ResolutionMap) {
        let handler = Handler::new();
        let ids = NodeIds::new();
        let tokens = tokenize(source, &handler);
        let mut parser = Parser::new(tokens, &handler, &ids);
        let program = parser.parse();

        let map = Resolver::new(&handler).resolve(&program);
        let messages = handler
            .diagnostics()
            .into_iter()
            .map(|d| d.message)
            .collect();
        (messages, map)
    }

    /// Collects every `Variable` reference with its id, in source order.
    fn collect_variables(statements: &[Stmt], out: &mut Vec<(String, ExprId)>) {
        for statement in statements {
            collect_stmt(statement, out);
        }
    }

    fn collect_stmt(statement: &Stmt, out: &mut Vec<(String, ExprId)>) {
        match statement {
            Stmt::Expression(e) => collect_expr(e, out),
            Stmt::Var(v) => {
                if let Some(init) = &v.init {
                    collect_expr(init, out);
                }
            }
            Stmt::Block(stmts) => collect_variables(stmts, out),
            Stmt::If(i) => {
                collect_expr(&i.cond, out);
                collect_stmt(&i.then_branch, out);
                if let Some(e) = &i.else_branch {
                    collect_stmt(e, out);
                }
            }
            Stmt::While(w) => {
                collect_expr(&w.cond, out);
                collect_stmt(&w.body, out);
            }
            Stmt::Function(f) => collect_variables(&f.body, out),
            Stmt::Return(r) => {
                if let Some(v) = &r.value {
                    collect_expr(v, out);
                }
            }
            Stmt::Class(c) => {
                for m in &c.methods {
                    collect_variables(&m.body, out);
                }
            }
        }
    }

    fn collect_expr(expr: &Expr, out: &mut Vec<(String, ExprId)>) {
        match expr {
            Expr::Binary(b) => {
                collect_expr(&b.left, out);
                collect_expr(&b.right, out);
            }
            Expr::Grouping(g) => collect_expr(g, out),
            Expr::Literal(_) => {}
            Expr::Logical(l) => {
                collect_expr(&l.left, out);
                collect_expr(&l.right, out);
            }
            Expr::Unary(u) => collect_expr(&u.right, out),
            Expr::Variable(v) => out.push((v.name.lexeme.clone(), v.id)),
            Expr::Assign(a) => collect_expr(&a.value, out),
            Expr::Call(c) => {
                collect_expr(&c.callee, out);
                for arg in &c.args {
                    collect_expr(arg, out);
                }
            }
            Expr::Get(g) => collect_expr(&g.object, out),
            Expr::Set(s) => {
                collect_expr(&s.object, out);
                collect_expr(&s.value, out);
            }
            Expr::This(_) | Expr::Super(_) => {}
        }
    }

    fn depth_of(source: &str, name: &str) -> Option<usize> {
        let (map, program, _) = resolve_source(source);
        let mut vars = Vec::new();
        collect_variables(&program, &mut vars);
        let (_, id) = vars
            .into_iter()
            .find(|(n, _)| n == name)
            .unwrap_or_else(|| panic!("no variable named {}", name));
        map.get(id)
    }

    #[test]
    fn test_top_level_reference_resolves_to_outermost() {
        assert_eq!(depth_of("var a = 1; a;", "a"), Some(0));
    }

    #[test]
    fn test_block_local_depth_zero() {
        assert_eq!(depth_of("{ var x = 1; x; }", "x"), Some(0));
    }

    #[test]
    fn test_depth_counts_enclosing_blocks() {
        assert_eq!(depth_of("{ var x = 1; { { x; } } }", "x"), Some(2));
    }

    #[test]
    fn test_unbound_name_falls_back_to_global() {
        // `print` is a native; no lexical scope binds it.
        assert_eq!(depth_of("var a = 1; print(a);", "print"), None);
    }

    #[test]
    fn test_function_param_depth_zero() {
        assert_eq!(depth_of("fun f(a) { a; }", "a"), Some(0));
    }

    #[test]
    fn test_recursive_function_sees_itself() {
        // Body scope -> outermost: one hop.
        assert_eq!(depth_of("fun f() { f(); }", "f"), Some(1));
    }

    #[test]
    fn test_closure_skips_later_shadowing() {
        // `a` inside show resolves past the block scope where a later
        // `var a` would live, straight to the outermost binding.
        let source = "var a = 1; { fun show() { a; } var a = 2; }";
        assert_eq!(depth_of(source, "a"), Some(2));
    }

    #[test]
    fn test_this_depth_in_method() {
        let source = "class C { m() { return this; } }";
        let (map, program, handler) = resolve_source(source);
        assert!(!handler.has_errors());

        let Stmt::Class(class) = &program[0] else {
            panic!("expected class");
        };
        let Stmt::Return(ret) = &class.methods[0].body[0] else {
            panic!("expected return");
        };
        let Some(Expr::This(this)) = &ret.value else {
            panic!("expected this");
        };
        // Method body scope (0) -> this scope (1).
        assert_eq!(map.get(this.id), Some(1));
    }

    #[test]
    fn test_super_depth_in_subclass_method() {
        let source = "class A { } class B < A { m() { return super.m; } }";
        let (map, program, handler) = resolve_source(source);
        assert!(!handler.has_errors());

        let Stmt::Class(class) = &program[1] else {
            panic!("expected class");
        };
        let Stmt::Return(ret) = &class.methods[0].body[0] else {
            panic!("expected return");
        };
        let Some(Expr::Super(sup)) = &ret.value else {
            panic!("expected super");
        };
        // Method body (0) -> this scope (1) -> super scope (2).
        assert_eq!(map.get(sup.id), Some(2));
    }

    #[test]
    fn test_read_in_own_initializer() {
        let (messages, _) = resolve_expecting_errors("{ var a = a; }");
        assert!(messages.contains(&"Can't read local variable in its own initializer.".to_string()));
    }

    #[test]
    fn test_duplicate_declaration_in_scope() {
        let (messages, _) = resolve_expecting_errors("{ var a = 1; var a = 2; }");
        assert!(messages
            .contains(&"Variable with this name already declared in this scope.".to_string()));
    }

    #[test]
    fn test_duplicate_declaration_at_top_level() {
        // The outermost scope participates in the declare protocol too.
        let (messages, _) = resolve_expecting_errors("var a = 1; var a = 2;");
        assert!(messages
            .contains(&"Variable with this name already declared in this scope.".to_string()));
    }

    #[test]
    fn test_shadowing_in_inner_scope_is_fine() {
        let (_, _, handler) = resolve_source("var a = 1; { var a = 2; a; }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_return_at_top_level() {
        let (messages, _) = resolve_expecting_errors("return 1;");
        assert!(messages.contains(&"Cannot return from top-level code.".to_string()));
    }

    #[test]
    fn test_return_value_from_initializer() {
        let (messages, _) = resolve_expecting_errors("class C { init() { return 5; } }");
        assert!(messages.contains(&"Cannot return a value from an initializer.".to_string()));
    }

    #[test]
    fn test_bare_return_from_initializer_is_fine() {
        let (_, _, handler) = resolve_source("class C { init() { return; } }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_this_outside_class() {
        let (messages, _) = resolve_expecting_errors("this;");
        assert!(messages.contains(&"Cannot use 'this' outside of a class.".to_string()));
    }

    #[test]
    fn test_this_in_nested_function_inside_method_is_fine() {
        let (_, _, handler) = resolve_source("class C { m() { fun inner() { return this; } } }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_super_outside_class() {
        let (messages, _) = resolve_expecting_errors("super.m;");
        assert!(messages.contains(&"Cannot use 'super' outside of a class.".to_string()));
    }

    #[test]
    fn test_super_without_superclass() {
        let (messages, _) = resolve_expecting_errors("class C { m() { return super.m; } }");
        assert!(messages.contains(&"Cannot use 'super' in a class with no superclass.".to_string()));
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        let (messages, _) = resolve_expecting_errors("class A < A { }");
        assert!(messages.contains(&"A class cannot inherit from itself.".to_string()));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let handler = Handler::new();
        let ids = NodeIds::new();
        let tokens = tokenize(
            "var a = 1; { var b = a; fun f(c) { return a + b + c; } }",
            &handler,
        );
        let mut parser = Parser::new(tokens, &handler, &ids);
        let program = parser.parse();

        let first = Resolver::new(&handler).resolve(&program);
        let second = Resolver::new(&handler).resolve(&program);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_errors_do_not_halt_traversal() {
        // The bad return must not stop resolution of the block below it.
        let (messages, map) = resolve_expecting_errors("return 1; { var x = 1; x; }");
        assert!(messages.contains(&"Cannot return from top-level code.".to_string()));
        assert!(!map.is_empty());
    }

    #[test]
    fn test_merge_accumulates() {
        let mut base = ResolutionMap::new();
        base.insert(ExprId(0), 1);

        let mut next = ResolutionMap::new();
        next.insert(ExprId(1), 2);

        base.merge(next);
        assert_eq!(base.get(ExprId(0)), Some(1));
        assert_eq!(base.get(ExprId(1)), Some(2));
        assert_eq!(base.len(), 2);
    }
}
