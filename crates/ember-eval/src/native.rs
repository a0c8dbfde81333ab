//! Built-in host operations.
//!
//! A small, fixed registry injected into the globals when the
//! interpreter is constructed:
//!
//! | Name     | Arity | Effect                                             |
//! |----------|-------|----------------------------------------------------|
//! | `print`  | 1     | stringify to the output stream, trailing newline   |
//! | `input`  | 1     | write the prompt, read one line from stdin         |
//! | `clock`  | 0     | wall-clock milliseconds since the epoch            |
//! | `Object` | class | a built-in empty class                             |
//!
//! `print` and `input` write to an injectable stream so tests can
//! capture output instead of touching the process stdout.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use crate::class::Class;
use crate::env::Environment;
use crate::value::Value;

/// Shared handle to the interpreter's output stream.
pub type OutputSink = Rc<RefCell<dyn Write>>;

/// A native (host-implemented) callable.
///
/// Failures surface as plain messages; the interpreter attaches the call
/// site's position when turning them into runtime errors.
pub struct NativeFunction {
    /// Name, for the globals table and diagnostics.
    pub name: &'static str,
    /// Required argument count.
    pub arity: usize,
    func: Box<dyn Fn(&[Value]) -> Result<Value, String>>,
}

impl NativeFunction {
    /// Creates a native function.
    pub fn new(
        name: &'static str,
        arity: usize,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self {
            name,
            arity,
            func: Box::new(func),
        }
    }

    /// Invokes the native. The interpreter has already checked arity.
    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Installs the native registry into the global environment.
pub fn install(globals: &Rc<Environment>, out: OutputSink) {
    let sink = Rc::clone(&out);
    globals.define(
        "print",
        Value::Native(Rc::new(NativeFunction::new("print", 1, move |args| {
            let value = args.first().cloned().unwrap_or(Value::Nil);
            let mut out = sink.borrow_mut();
            writeln!(out, "{}", value).map_err(|e| e.to_string())?;
            Ok(Value::Nil)
        }))),
    );

    let sink = Rc::clone(&out);
    globals.define(
        "input",
        Value::Native(Rc::new(NativeFunction::new("input", 1, move |args| {
            let prompt = args.first().cloned().unwrap_or(Value::Nil);
            {
                let mut out = sink.borrow_mut();
                write!(out, "{}", prompt).map_err(|e| e.to_string())?;
                out.flush().map_err(|e| e.to_string())?;
            }

            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| e.to_string())?;
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(Value::Str(line.into()))
        }))),
    );

    globals.define(
        "clock",
        Value::Native(Rc::new(NativeFunction::new("clock", 0, |_args| {
            let elapsed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| e.to_string())?;
            Ok(Value::Number(elapsed.as_millis() as f64))
        }))),
    );

    globals.define(
        "Object",
        Value::Class(Rc::new(Class {
            name: "Object".to_string(),
            superclass: None,
            methods: IndexMap::new(),
        })),
    );
}
