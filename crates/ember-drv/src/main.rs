//! Ember CLI entry point.
//!
//! Two modes: `ember script.em` runs a file, `ember` starts the REPL.
//! Exit codes follow the sysexits convention the interpreter uses
//! throughout: 0 success, 64 usage, 65 compile error, 70 runtime error,
//! 74 unreadable input.

use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ember_drv::{EmitKind, Session, EXIT_IO_ERROR, EXIT_USAGE};

/// Interpreter for the Ember scripting language.
#[derive(Parser, Debug)]
#[command(name = "ember")]
#[command(author = "Ember Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interpreter for the Ember scripting language", long_about = None)]
struct Cli {
    /// Script to run; starts the REPL when omitted
    #[arg(value_name = "script")]
    script: Option<PathBuf>,

    /// Enable verbose phase logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the token stream and stop
    #[arg(long, conflicts_with = "emit_ast")]
    emit_tokens: bool,

    /// Print the parsed AST and stop
    #[arg(long)]
    emit_ast: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::UnknownArgument | ErrorKind::TooManyValues
            ) =>
        {
            eprintln!("Usage: ember [script]");
            process::exit(EXIT_USAGE);
        }
        Err(err) => err.exit(),
    };

    init_tracing(cli.verbose);

    let emit = if cli.emit_tokens {
        EmitKind::Tokens
    } else if cli.emit_ast {
        EmitKind::Ast
    } else {
        EmitKind::Run
    };

    let result = match cli.script {
        Some(path) => Session::run_file(&path, emit),
        None => Session::run_repl(),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            process::exit(EXIT_IO_ERROR);
        }
    }
}

/// Logging goes to stderr so program output on stdout stays clean.
/// `EMBER_LOG` overrides the level the same way `RUST_LOG` would.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("EMBER_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
