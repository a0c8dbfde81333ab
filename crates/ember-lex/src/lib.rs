//! ember-lex - Lexical analyzer for the Ember language.
//!
//! Transforms source text into a stream of [`Token`]s. The lexer is
//! character-driven and single-pass: it never backtracks beyond one
//! character of lookahead (two for the fractional-number rule), and it
//! never fails. Problems are reported to the shared diagnostic handler
//! and lexing continues with the next character.
//!
//! # Token categories
//!
//! - Single-character punctuation: `( ) { } , . ;`
//! - Operators, each with a compound `=` form: `+ - * / % ! = < >`
//!   (`+=`, `!=`, `==`, `<=`, ... )
//! - Literals: identifiers, numbers (`12`, `3.5`), `"`-delimited strings
//!   (multi-line, no escape sequences)
//! - The 15 reserved words (`and` ... `while`)
//! - An `Eof` sentinel closing every token stream
//!
//! # Position tracking
//!
//! Lines are 1-based. Columns are 0-based, advance by one per character,
//! and by four for a literal tab; a newline resets the column. The column
//! recorded for a token is the column after scanning minus the lexeme
//! length, i.e. the column of the lexeme's first character.
//!
//! # Example
//!
//! ```
//! use ember_lex::{tokenize, TokenKind};
//! use ember_util::Handler;
//!
//! let handler = Handler::new();
//! let tokens = tokenize("var answer = 42;", &handler);
//!
//! let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         TokenKind::Var,
//!         TokenKind::Identifier,
//!         TokenKind::Eq,
//!         TokenKind::Number,
//!         TokenKind::Semicolon,
//!         TokenKind::Eof,
//!     ]
//! );
//! assert!(!handler.has_errors());
//! ```

pub mod cursor;
mod edge_cases;
pub mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::{tokenize, Lexer};
pub use token::{keyword_from_ident, Literal, Token, TokenKind};
