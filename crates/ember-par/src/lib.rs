//! ember-par - Recursive-descent parser for the Ember language.
//!
//! Consumes the token stream produced by `ember-lex` and builds the AST
//! defined in [`ast`]. The grammar is recorded in the repository's
//! `grammar.md`.
//!
//! # Precedence (tightest first)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | primary | literals, `this`, `super`, grouping | - |
//! | call | `()`, `.` | Left |
//! | unary | `!`, `-` | Right (prefix) |
//! | factor | `*`, `/`, `%` | Left |
//! | term | `+`, `-` | Left |
//! | comparison | `<`, `<=`, `>`, `>=` | Left |
//! | equality | `==`, `!=` | Left |
//! | logic and | `and` | Left |
//! | logic or | `or` | Left |
//! | assignment | `=`, `+=`, `-=`, `*=`, `/=`, `%=` | Right |
//!
//! Assignment only accepts an l-value (a variable or property access) on
//! its left-hand side. Compound assignments desugar at parse time into
//! `Assign`/`Set` nodes tagged with the base arithmetic operator.
//!
//! # Error recovery
//!
//! Any parse error inside a declaration triggers panic-mode
//! synchronization: tokens are discarded until just past a semicolon or
//! just before a likely declaration keyword, the broken declaration is
//! replaced with an inert `nil` expression statement, and parsing
//! continues so later errors still surface. Every error is reported to
//! the shared diagnostic handler before the `ParseError` unwinds.

pub mod ast;
mod edge_cases;
mod expr;
mod stmt;

pub use ast::{Expr, ExprId, NodeIds, Stmt};

use thiserror::Error;

use ember_lex::{Token, TokenKind};
use ember_util::{Context, Diagnostic, Handler, Level, Span};

/// Marker error raised after a diagnostic has already been emitted.
///
/// Carrying no payload keeps `?` propagation honest: the message lives in
/// the handler, never in the error value.
#[derive(Debug, Error)]
#[error("parse error")]
pub struct ParseError;

pub(crate) type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser over an EOF-terminated token stream.
///
/// # Example
///
/// ```
/// use ember_lex::tokenize;
/// use ember_par::{NodeIds, Parser};
/// use ember_util::Handler;
///
/// let handler = Handler::new();
/// let ids = NodeIds::new();
/// let tokens = tokenize("print(1 + 2);", &handler);
///
/// let mut parser = Parser::new(tokens, &handler, &ids);
/// let program = parser.parse();
///
/// assert_eq!(program.len(), 1);
/// assert!(!handler.has_errors());
/// ```
pub struct Parser<'a> {
    /// Token stream, terminated by an `Eof` sentinel.
    tokens: Vec<Token>,

    /// Index of the next token to consume.
    current: usize,

    /// Error handler for reporting parse errors.
    handler: &'a Handler,

    /// Identity generator for variable-bearing nodes.
    ids: &'a NodeIds,
}

impl<'a> Parser<'a> {
    /// Creates a parser for the given token stream.
    pub fn new(tokens: Vec<Token>, handler: &'a Handler, ids: &'a NodeIds) -> Self {
        let mut tokens = tokens;
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, "", None, Span::DUMMY));
        }
        Self {
            tokens,
            current: 0,
            handler,
            ids,
        }
    }

    /// Parses the whole stream into a list of top-level statements.
    ///
    /// Never fails: broken declarations are replaced with inert
    /// statements and reported through the handler.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.declaration());
        }
        statements
    }

    // ------------------------------------------------------------------
    // Token stream helpers
    // ------------------------------------------------------------------

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    pub(crate) fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consumes the next token if it matches any of the given kinds.
    pub(crate) fn match_kind(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.iter().any(|&k| self.check(k)) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes a token of the expected kind or raises a parse error
    /// with the given message.
    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(self.error(&token, message))
        }
    }

    /// Reports a parse error at the given token and returns the marker
    /// error for the caller to raise (or drop, for non-fatal reports).
    pub(crate) fn error(&self, token: &Token, message: &str) -> ParseError {
        let context = if token.is_eof() {
            Context::AtEnd
        } else {
            Context::AtLexeme(token.lexeme.clone())
        };
        self.handler
            .emit(Diagnostic::new(Level::Error, message, token.span, context));
        ParseError
    }

    /// Panic-mode recovery: discard tokens until just past a semicolon
    /// or just before a token that likely starts a declaration.
    pub(crate) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    pub(crate) fn fresh_id(&self) -> ExprId {
        self.ids.fresh()
    }
}
