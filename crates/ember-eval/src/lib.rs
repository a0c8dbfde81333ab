//! ember-eval - Tree-walking evaluator for the Ember language.
//!
//! Takes the AST from `ember-par` together with the resolver's hop-count
//! side table from `ember-sem` and evaluates the program against a chain
//! of lexical environments.
//!
//! # Dispatch
//!
//! Evaluation is a `match` over the tagged AST unions; there is no
//! visitor machinery. Every statement evaluator returns
//! `Result<(), Signal>` and every expression evaluator
//! `Result<Value, Signal>`, where [`Signal`] is either a runtime error
//! or a `return` in flight. Call sites interpret `Signal::Return`; the
//! top-level statement loop turns `Signal::Error` into a diagnostic and
//! aborts the current list.
//!
//! # Environments
//!
//! The interpreter keeps one current-environment pointer. Blocks swap in
//! a fresh child environment and restore the previous one on every exit
//! path, including unwinds, which is what keeps the resolver's hop
//! counts valid: for a node annotated with distance `d`, exactly `d`
//! hops from the current environment reach the binding.
//!
//! Function calls chain their environment off the function's *captured*
//! closure, never the caller's environment. Class declarations with a
//! superclass insert one extra environment binding `super`; binding a
//! method inserts one binding `this`.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use ember_eval::Interpreter;
//! use ember_lex::tokenize;
//! use ember_par::{NodeIds, Parser};
//! use ember_sem::Resolver;
//! use ember_util::Handler;
//!
//! let handler = Rc::new(Handler::new());
//! let ids = NodeIds::new();
//! let tokens = tokenize("var x = 20 + 22;", &handler);
//! let program = Parser::new(tokens, &handler, &ids).parse();
//! let resolutions = Resolver::new(&handler).resolve(&program);
//!
//! let mut interpreter = Interpreter::new(Rc::clone(&handler));
//! interpreter.add_resolutions(resolutions);
//! interpreter.interpret(&program);
//!
//! assert!(!handler.has_runtime_errors());
//! ```

pub mod class;
pub mod env;
pub mod error;
pub mod native;
pub mod value;

pub use class::{Class, Function, Instance};
pub use env::Environment;
pub use error::{EvalResult, RuntimeError, Signal};
pub use native::{NativeFunction, OutputSink};
pub use value::Value;

use std::cell::RefCell;
use std::io;
use std::mem;
use std::rc::Rc;

use indexmap::IndexMap;

use ember_lex::{Token, TokenKind};
use ember_par::ast::{
    AssignExpr, BinaryExpr, CallExpr, ClassStmt, Expr, GetExpr, LitValue, LogicalExpr, SetExpr,
    Stmt, SuperExpr, UnaryExpr,
};
use ember_sem::ResolutionMap;
use ember_util::{Diagnostic, Handler};

/// The tree-walking interpreter.
///
/// Holds the global environment, the current environment, and the
/// resolver side table. One instance lives for a whole script run or
/// REPL session; globals and resolution entries accumulate.
pub struct Interpreter {
    /// Shared diagnostic sink; runtime errors are reported here.
    handler: Rc<Handler>,

    /// The global environment, holding natives and top-level bindings.
    globals: Rc<Environment>,

    /// The environment evaluation currently runs in.
    environment: Rc<Environment>,

    /// Resolver side table: node identity to hop count.
    resolutions: ResolutionMap,
}

impl Interpreter {
    /// Creates an interpreter writing to the process stdout.
    pub fn new(handler: Rc<Handler>) -> Self {
        Self::with_output(handler, Rc::new(RefCell::new(io::stdout())))
    }

    /// Creates an interpreter with an injected output stream. The
    /// native registry (`print`, `input`, `clock`, `Object`) is
    /// installed into the globals here.
    pub fn with_output(handler: Rc<Handler>, out: OutputSink) -> Self {
        let globals = Environment::new();
        native::install(&globals, out);
        Self {
            handler,
            environment: Rc::clone(&globals),
            globals,
            resolutions: ResolutionMap::new(),
        }
    }

    /// The global environment.
    pub fn globals(&self) -> &Rc<Environment> {
        &self.globals
    }

    /// Merges a program's resolution map into the interpreter's own.
    /// Node identities are session-unique, so entries never collide.
    pub fn add_resolutions(&mut self, resolutions: ResolutionMap) {
        self.resolutions.merge(resolutions);
    }

    /// Executes a top-level statement list.
    ///
    /// A runtime error aborts the rest of the list and is reported to
    /// the handler, setting its runtime-error flag. The interpreter
    /// itself stays usable (the REPL relies on this).
    pub fn interpret(&mut self, statements: &[Stmt]) {
        for statement in statements {
            if let Err(signal) = self.execute(statement) {
                match signal {
                    Signal::Error(err) => {
                        self.handler
                            .emit(Diagnostic::runtime(err.message, err.span));
                    }
                    // The resolver rejects top-level returns, so a
                    // Return can only get here if resolution was
                    // skipped; treat it as end of execution.
                    Signal::Return(_) => {}
                }
                return;
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn execute(&mut self, statement: &Stmt) -> EvalResult<()> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Var(var) => {
                let value = match &var.init {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };
                self.environment.define(&var.name.lexeme, value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let child = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, child)
            }
            Stmt::If(if_stmt) => {
                if self.evaluate(&if_stmt.cond)?.is_truthy() {
                    self.execute(&if_stmt.then_branch)
                } else if let Some(else_branch) = &if_stmt.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While(while_stmt) => {
                while self.evaluate(&while_stmt.cond)?.is_truthy() {
                    self.execute(&while_stmt.body)?;
                }
                Ok(())
            }
            Stmt::Function(decl) => {
                let function =
                    Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Err(Signal::Return(value))
            }
            Stmt::Class(class) => self.execute_class(class),
        }
    }

    /// Executes statements in the given environment, restoring the
    /// previous environment on every exit path (normal completion,
    /// return unwind, or error unwind).
    fn execute_block(&mut self, statements: &[Stmt], environment: Rc<Environment>) -> EvalResult<()> {
        let previous = mem::replace(&mut self.environment, environment);
        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));
        self.environment = previous;
        result
    }

    fn execute_class(&mut self, class: &ClassStmt) -> EvalResult<()> {
        let superclass = match &class.superclass {
            Some(sup) => match self.look_up(&sup.name, sup.id)? {
                Value::Class(c) => Some(c),
                _ => {
                    return Err(RuntimeError::new(
                        "Superclass must be a class.",
                        sup.name.span,
                    )
                    .into())
                }
            },
            None => None,
        };

        // Two-stage definition so methods can refer to the class name.
        self.environment.define(&class.name.lexeme, Value::Nil);

        let mut method_env = Rc::clone(&self.environment);
        if let Some(sup) = &superclass {
            method_env = Environment::with_enclosing(method_env);
            method_env.define("super", Value::Class(Rc::clone(sup)));
        }

        let mut methods = IndexMap::new();
        for decl in &class.methods {
            let is_initializer = decl.name.lexeme == "init";
            let method = Function::new(Rc::clone(decl), Rc::clone(&method_env), is_initializer);
            methods.insert(decl.name.lexeme.clone(), Rc::new(method));
        }

        let value = Value::Class(Rc::new(Class {
            name: class.name.lexeme.clone(),
            superclass,
            methods,
        }));
        self.environment.assign(&class.name.lexeme, value);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(literal_value(lit)),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Unary(unary) => self.eval_unary(unary),
            Expr::Binary(binary) => self.eval_binary(binary),
            Expr::Logical(logical) => self.eval_logical(logical),
            Expr::Variable(var) => self.look_up(&var.name, var.id),
            Expr::Assign(assign) => self.eval_assign(assign),
            Expr::Call(call) => self.eval_call(call),
            Expr::Get(get) => self.eval_get(get),
            Expr::Set(set) => self.eval_set(set),
            Expr::This(this) => self.look_up(&this.keyword, this.id),
            Expr::Super(sup) => self.eval_super(sup),
        }
    }

    fn eval_unary(&mut self, unary: &UnaryExpr) -> EvalResult<Value> {
        let right = self.evaluate(&unary.right)?;
        match unary.op.kind {
            TokenKind::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                Value::Nil => Err(RuntimeError::new(
                    "Unary minus on nil is not supported.",
                    unary.op.span,
                )
                .into()),
                _ => Err(RuntimeError::new("Operand must be a number.", unary.op.span).into()),
            },
            TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(RuntimeError::new("Invalid unary operator.", unary.op.span).into()),
        }
    }

    fn eval_binary(&mut self, binary: &BinaryExpr) -> EvalResult<Value> {
        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;
        self.apply_binary(&binary.op, left, right)
    }

    /// Applies a binary operator to already-evaluated operands. Shared
    /// between binary expressions and compound-assignment desugaring.
    fn apply_binary(&mut self, op: &Token, left: Value, right: Value) -> EvalResult<Value> {
        match op.kind {
            TokenKind::Plus => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                // Either side a string concatenates; the other side is
                // stringified.
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    Ok(Value::Str(format!("{}{}", left, right).into()))
                }
                _ => Err(RuntimeError::new(
                    "Operands must be two numbers or two strings.",
                    op.span,
                )
                .into()),
            },
            TokenKind::Minus => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Number(a - b))
            }
            TokenKind::Star => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Number(a * b))
            }
            TokenKind::Slash => {
                // Division by zero follows IEEE-754: ±inf or NaN.
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Number(a / b))
            }
            TokenKind::Percent => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Number(a % b))
            }
            TokenKind::Gt => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Bool(a > b))
            }
            TokenKind::GtEq => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }
            TokenKind::Lt => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Bool(a < b))
            }
            TokenKind::LtEq => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }
            TokenKind::EqEq => Ok(Value::Bool(left.equals(&right))),
            TokenKind::BangEq => Ok(Value::Bool(!left.equals(&right))),
            _ => Err(RuntimeError::new("Invalid binary operator.", op.span).into()),
        }
    }

    fn eval_logical(&mut self, logical: &LogicalExpr) -> EvalResult<Value> {
        let left = self.evaluate(&logical.left)?;

        // Short-circuit, returning the actual operand value rather than
        // a coerced boolean.
        if logical.op.kind == TokenKind::Or {
            if left.is_truthy() {
                return Ok(left);
            }
        } else if !left.is_truthy() {
            return Ok(left);
        }

        self.evaluate(&logical.right)
    }

    fn eval_assign(&mut self, assign: &AssignExpr) -> EvalResult<Value> {
        let mut value = self.evaluate(&assign.value)?;

        // Compound assignment: read the current value, combine, write
        // back.
        if let Some(op) = &assign.op {
            let current = self.look_up(&assign.name, assign.id)?;
            value = self.apply_binary(op, current, value)?;
        }

        let written = match self.resolutions.get(assign.id) {
            Some(distance) => {
                self.environment
                    .assign_at(distance, &assign.name.lexeme, value.clone())
            }
            None => self.globals.assign(&assign.name.lexeme, value.clone()),
        };

        if written {
            Ok(value)
        } else {
            Err(undefined_variable(&assign.name))
        }
    }

    fn eval_call(&mut self, call: &CallExpr) -> EvalResult<Value> {
        let callee = self.evaluate(&call.callee)?;

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.evaluate(arg)?);
        }

        match callee {
            Value::Function(function) => {
                self.check_arity(function.arity(), args.len(), &call.paren)?;
                self.call_function(&function, args)
            }
            Value::Native(native) => {
                self.check_arity(native.arity, args.len(), &call.paren)?;
                native
                    .call(&args)
                    .map_err(|message| RuntimeError::new(message, call.paren.span).into())
            }
            Value::Class(class) => {
                self.check_arity(class.arity(), args.len(), &call.paren)?;
                self.instantiate(&class, args)
            }
            _ => Err(RuntimeError::new(
                "Can only call functions and classes.",
                call.paren.span,
            )
            .into()),
        }
    }

    fn eval_get(&mut self, get: &GetExpr) -> EvalResult<Value> {
        match self.evaluate(&get.object)? {
            Value::Instance(instance) => Instance::get(&instance, &get.name.lexeme)
                .ok_or_else(|| undefined_property(&get.name)),
            _ => Err(RuntimeError::new("Only instances have properties.", get.name.span).into()),
        }
    }

    fn eval_set(&mut self, set: &SetExpr) -> EvalResult<Value> {
        let object = self.evaluate(&set.object)?;
        let Value::Instance(instance) = object else {
            return Err(
                RuntimeError::new("Only instances have properties.", set.name.span).into(),
            );
        };

        let mut value = self.evaluate(&set.value)?;

        // Compound assignment reads the property first, so a missing
        // field reports exactly like a read would.
        if let Some(op) = &set.op {
            let current = Instance::get(&instance, &set.name.lexeme)
                .ok_or_else(|| undefined_property(&set.name))?;
            value = self.apply_binary(op, current, value)?;
        }

        instance.set(&set.name.lexeme, value.clone());
        Ok(value)
    }

    fn eval_super(&mut self, sup: &SuperExpr) -> EvalResult<Value> {
        // The resolver guarantees an annotation for every surviving
        // `super` node; a missing one means resolution was skipped.
        let distance = self
            .resolutions
            .get(sup.id)
            .ok_or_else(|| undefined_variable(&sup.keyword))?;

        let superclass = match self.environment.get_at(distance, "super") {
            Some(Value::Class(c)) => c,
            _ => return Err(undefined_variable(&sup.keyword)),
        };
        let instance = match self.environment.get_at(distance.saturating_sub(1), "this") {
            Some(Value::Instance(i)) => i,
            _ => return Err(undefined_variable(&sup.keyword)),
        };

        let method = superclass
            .find_method(&sup.method.lexeme)
            .ok_or_else(|| undefined_property(&sup.method))?;
        Ok(Value::Function(Rc::new(method.bind(instance))))
    }

    // ------------------------------------------------------------------
    // Calling
    // ------------------------------------------------------------------

    /// Calls a user function: fresh environment chained off the
    /// *captured* closure, parameters bound, body executed, non-local
    /// return interpreted here. Initializers yield `this` no matter how
    /// the body completes.
    pub fn call_function(&mut self, function: &Function, args: Vec<Value>) -> EvalResult<Value> {
        let env = Environment::with_enclosing(Rc::clone(function.closure()));
        for (param, arg) in function.declaration().params.iter().zip(args) {
            env.define(&param.lexeme, arg);
        }

        let completed = self.execute_block(&function.declaration().body, env);

        match completed {
            Ok(()) => {
                if function.is_initializer() {
                    self.initializer_this(function)
                } else {
                    Ok(Value::Nil)
                }
            }
            Err(Signal::Return(value)) => {
                if function.is_initializer() {
                    self.initializer_this(function)
                } else {
                    Ok(value)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Constructs an instance: make it, then run `init` from anywhere
    /// on the chain bound to it. The call always yields the instance.
    fn instantiate(&mut self, class: &Rc<Class>, args: Vec<Value>) -> EvalResult<Value> {
        let instance = Rc::new(Instance::new(Rc::clone(class)));
        if let Some(init) = class.find_method("init") {
            let bound = init.bind(Rc::clone(&instance));
            self.call_function(&bound, args)?;
        }
        Ok(Value::Instance(instance))
    }

    fn initializer_this(&self, function: &Function) -> EvalResult<Value> {
        // A bound initializer's closure has `this` at depth 0.
        function
            .closure()
            .get_at(0, "this")
            .ok_or_else(|| undefined_variable(&function.declaration().name))
    }

    fn check_arity(&self, arity: usize, got: usize, paren: &Token) -> EvalResult<()> {
        if arity == got {
            Ok(())
        } else {
            Err(RuntimeError::new(
                format!("Expected {} arguments but got {}.", arity, got),
                paren.span,
            )
            .into())
        }
    }

    // ------------------------------------------------------------------
    // Variable access
    // ------------------------------------------------------------------

    /// Reads a variable: through the hop count when the resolver
    /// annotated the node, otherwise dynamically from the globals.
    fn look_up(&self, name: &Token, id: ember_par::ExprId) -> EvalResult<Value> {
        match self.resolutions.get(id) {
            Some(distance) => self
                .environment
                .get_at(distance, &name.lexeme)
                .ok_or_else(|| undefined_variable(name)),
            None => self
                .globals
                .get(&name.lexeme)
                .ok_or_else(|| undefined_variable(name)),
        }
    }
}

fn literal_value(lit: &LitValue) -> Value {
    match lit {
        LitValue::Number(n) => Value::Number(*n),
        LitValue::Str(s) => Value::Str(Rc::from(s.as_str())),
        LitValue::Bool(b) => Value::Bool(*b),
        LitValue::Nil => Value::Nil,
    }
}

fn number_operands(op: &Token, left: &Value, right: &Value) -> Result<(f64, f64), Signal> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new("Operands must be numbers.", op.span).into()),
    }
}

fn undefined_variable(name: &Token) -> Signal {
    RuntimeError::new(
        format!("Undefined variable '{}'.", name.lexeme),
        name.span,
    )
    .into()
}

fn undefined_property(name: &Token) -> Signal {
    RuntimeError::new(
        format!("Undefined property '{}'.", name.lexeme),
        name.span,
    )
    .into()
}
