//! ember-drv - Interpreter driver.
//!
//! Orchestrates the pipeline over one source unit at a time:
//!
//! ```text
//! Source text
//!      │
//!      ▼
//! [Lexer] ──▶ tokens          stop if any error was reported
//!      │
//!      ▼
//! [Parser] ──▶ AST            stop if any error was reported
//!      │
//!      ▼
//! [Resolver] ──▶ hop counts   stop if any error was reported
//!      │
//!      ▼
//! [Evaluator] ──▶ side effects
//! ```
//!
//! Each phase writes into the shared diagnostic handler; after a run the
//! driver renders everything collected to stderr and maps the sticky
//! flags to an exit code: 0 on success, 65 for compile-time errors, 70
//! for runtime errors. The REPL reuses one [`Session`] across lines so
//! globals, node identities, and resolution entries persist, and clears
//! the handler at each line so one bad line does not poison the next.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context as _, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use ember_eval::Interpreter;
use ember_lex::tokenize;
use ember_par::{NodeIds, Parser};
use ember_sem::Resolver;
use ember_util::Handler;

/// Successful run.
pub const EXIT_OK: i32 = 0;
/// Command line misuse.
pub const EXIT_USAGE: i32 = 64;
/// At least one lex, parse, or resolve error.
pub const EXIT_COMPILE_ERROR: i32 = 65;
/// At least one runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 70;
/// Input file could not be read.
pub const EXIT_IO_ERROR: i32 = 74;

/// What the driver should produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmitKind {
    /// Print the token stream and stop.
    Tokens,
    /// Print the parsed AST and stop.
    Ast,
    /// Evaluate the program.
    #[default]
    Run,
}

/// State for one interpreter invocation: a script run or a whole REPL
/// session.
pub struct Session {
    /// Display name of the source ("main.em", "<repl>").
    file: String,

    /// Shared diagnostic sink, threaded through every phase.
    handler: Rc<Handler>,

    /// Node identity generator; lives here so REPL lines never reuse
    /// an identity.
    ids: NodeIds,

    /// The evaluator, holding globals and the resolution side table.
    interpreter: Interpreter,

    /// Debug emit mode.
    emit: EmitKind,
}

impl Session {
    /// Creates a session that evaluates programs.
    pub fn new(file: impl Into<String>) -> Self {
        Self::with_emit(file, EmitKind::Run)
    }

    /// Creates a session with an emit mode.
    pub fn with_emit(file: impl Into<String>, emit: EmitKind) -> Self {
        let handler = Rc::new(Handler::new());
        let interpreter = Interpreter::new(Rc::clone(&handler));
        Self {
            file: file.into(),
            handler,
            ids: NodeIds::new(),
            interpreter,
            emit,
        }
    }

    /// Runs one source unit through the pipeline and returns the exit
    /// code for it. Diagnostics are rendered to stderr.
    pub fn run_source(&mut self, source: &str) -> i32 {
        tracing::debug!(file = %self.file, "lexing");
        let tokens = tokenize(source, &self.handler);
        if self.handler.has_errors() {
            return self.finish(source);
        }
        if self.emit == EmitKind::Tokens {
            for token in &tokens {
                println!("{:?}", token);
            }
            return EXIT_OK;
        }

        tracing::debug!(tokens = tokens.len(), "parsing");
        let program = Parser::new(tokens, &self.handler, &self.ids).parse();
        if self.handler.has_errors() {
            return self.finish(source);
        }
        if self.emit == EmitKind::Ast {
            println!("{:#?}", program);
            return EXIT_OK;
        }

        tracing::debug!(statements = program.len(), "resolving");
        let resolutions = Resolver::new(&self.handler).resolve(&program);
        if self.handler.has_errors() {
            return self.finish(source);
        }

        tracing::debug!(resolved = resolutions.len(), "evaluating");
        self.interpreter.add_resolutions(resolutions);
        self.interpreter.interpret(&program);
        self.finish(source)
    }

    /// Renders collected diagnostics and maps the sticky flags to an
    /// exit code. Compile-time errors shadow runtime ones.
    fn finish(&self, source: &str) -> i32 {
        let had_error = self.handler.has_errors();
        let had_runtime_error = self.handler.has_runtime_errors();

        for diagnostic in self.handler.take() {
            eprintln!("{}", diagnostic.render(&self.file, source));
        }

        if had_error {
            EXIT_COMPILE_ERROR
        } else if had_runtime_error {
            EXIT_RUNTIME_ERROR
        } else {
            EXIT_OK
        }
    }

    /// Script mode: read the file, run it once, return its exit code.
    pub fn run_file(path: &Path, emit: EmitKind) -> Result<i32> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let mut session = Session::with_emit(path.display().to_string(), emit);
        Ok(session.run_source(&source))
    }

    /// REPL mode: evaluate lines until `exit` or end of input. Errors
    /// never terminate the loop, and the error flags reset each line.
    pub fn run_repl() -> Result<i32> {
        let mut session = Session::new("<repl>");
        let mut editor = DefaultEditor::new()?;

        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if trimmed == "exit" {
                        break;
                    }
                    let _ = editor.add_history_entry(&line);

                    session.handler.clear();
                    session.run_source(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(EXIT_OK)
    }
}
