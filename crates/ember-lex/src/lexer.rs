//! Main lexer implementation for the Ember language.

use ember_util::{Diagnostic, Handler, Span};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Literal, Token, TokenKind};

/// Lexer for Ember source code.
///
/// The lexer transforms source text into a stream of tokens. It handles
/// whitespace, line comments, identifiers, keywords, operators, and
/// literals. Errors are reported to the diagnostic handler; the offending
/// character is discarded and lexing continues.
///
/// # Example
///
/// ```
/// use ember_lex::{Lexer, TokenKind};
/// use ember_util::Handler;
///
/// let handler = Handler::new();
/// let mut lexer = Lexer::new("1 + 2", &handler);
///
/// assert_eq!(lexer.next_token().kind, TokenKind::Number);
/// assert_eq!(lexer.next_token().kind, TokenKind::Plus);
/// assert_eq!(lexer.next_token().kind, TokenKind::Number);
/// assert_eq!(lexer.next_token().kind, TokenKind::Eof);
/// ```
pub struct Lexer<'a> {
    /// Character cursor for source traversal.
    cursor: Cursor<'a>,

    /// Error handler for reporting lexical errors.
    handler: &'a Handler,

    /// Starting byte offset of the current token.
    token_start: usize,

    /// Line number where the current token starts (1-based).
    token_start_line: u32,

    /// Column number where the current token starts (0-based).
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source code.
    pub fn new(source: &'a str, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 0,
        }
    }

    /// Returns the next token from the source code.
    ///
    /// This is the main entry point for tokenization. It skips whitespace
    /// and comments, then dispatches on the current character. Unknown
    /// characters are reported and skipped, so this always makes progress
    /// and always terminates with `TokenKind::Eof`.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace_and_comments();

            self.token_start = self.cursor.position();
            self.token_start_line = self.cursor.line();
            self.token_start_column = self.cursor.column();

            if self.cursor.is_at_end() {
                return self.make_token(TokenKind::Eof);
            }

            let c = self.cursor.current_char();
            match c {
                '(' => return self.single(TokenKind::LParen),
                ')' => return self.single(TokenKind::RParen),
                '{' => return self.single(TokenKind::LBrace),
                '}' => return self.single(TokenKind::RBrace),
                ',' => return self.single(TokenKind::Comma),
                '.' => return self.single(TokenKind::Dot),
                ';' => return self.single(TokenKind::Semicolon),
                '+' => return self.operator(TokenKind::Plus, TokenKind::PlusEq),
                '-' => return self.operator(TokenKind::Minus, TokenKind::MinusEq),
                '*' => return self.operator(TokenKind::Star, TokenKind::StarEq),
                '/' => return self.operator(TokenKind::Slash, TokenKind::SlashEq),
                '%' => return self.operator(TokenKind::Percent, TokenKind::PercentEq),
                '!' => return self.operator(TokenKind::Bang, TokenKind::BangEq),
                '=' => return self.operator(TokenKind::Eq, TokenKind::EqEq),
                '<' => return self.operator(TokenKind::Lt, TokenKind::LtEq),
                '>' => return self.operator(TokenKind::Gt, TokenKind::GtEq),
                '"' => {
                    if let Some(token) = self.lex_string() {
                        return token;
                    }
                    // Unterminated string: the error is reported and the
                    // cursor sits at end of input, so loop to emit Eof.
                }
                c if c.is_ascii_digit() => return self.lex_number(),
                c if is_ident_start(c) => return self.lex_identifier(),
                c => {
                    self.report_error(format!("Unexpected character: {}", c));
                    self.cursor.advance();
                }
            }
        }
    }

    /// Lexes a single-character token.
    fn single(&mut self, kind: TokenKind) -> Token {
        self.cursor.advance();
        self.make_token(kind)
    }

    /// Lexes an operator that has a compound `=` form (`+` / `+=`,
    /// `<` / `<=`, ...).
    fn operator(&mut self, plain: TokenKind, compound: TokenKind) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(compound)
        } else {
            self.make_token(plain)
        }
    }

    /// Lexes a string literal.
    ///
    /// Strings are `"`-delimited, may span multiple lines, and have no
    /// escape sequences. Returns `None` if the string is unterminated,
    /// after reporting the error.
    fn lex_string(&mut self) -> Option<Token> {
        self.cursor.advance();

        while !self.cursor.is_at_end() && self.cursor.current_char() != '"' {
            self.cursor.advance();
        }

        if self.cursor.is_at_end() {
            self.report_error("Unterminated string.".to_string());
            return None;
        }

        self.cursor.advance();

        let lexeme = self.cursor.slice_from(self.token_start);
        let value = lexeme[1..lexeme.len() - 1].to_string();
        Some(self.make_token_with(TokenKind::Str, Some(Literal::Str(value))))
    }

    /// Lexes a number literal: one or more digits, optionally followed by
    /// a `.` and one or more digits. No sign, no exponent, no hex.
    fn lex_number(&mut self) -> Token {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        // The fractional rule needs the lexer's only two-character
        // lookahead: `1.5` is one token, `1.x` stays `1` `.` `x`.
        if self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit() {
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        let text = self.cursor.slice_from(self.token_start);
        let value = match text.parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                self.report_error(format!("Invalid number literal: {}", text));
                0.0
            }
        };
        self.make_token_with(TokenKind::Number, Some(Literal::Number(value)))
    }

    /// Lexes an identifier or keyword.
    fn lex_identifier(&mut self) -> Token {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }

        let text = self.cursor.slice_from(self.token_start);
        let kind = keyword_from_ident(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    /// Skips spaces, carriage returns, tabs, newlines, and `//` line
    /// comments. Column and line adjustments happen inside the cursor.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current_char() {
                ' ' | '\r' | '\t' | '\n' => self.cursor.advance(),
                '/' if self.cursor.peek_char(1) == '/' => {
                    while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                        self.cursor.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn make_token(&mut self, kind: TokenKind) -> Token {
        self.make_token_with(kind, None)
    }

    /// Builds a token from the scanned range. The recorded column is the
    /// column after the scan minus the lexeme length, pointing at the
    /// lexeme's first character.
    fn make_token_with(&mut self, kind: TokenKind, literal: Option<Literal>) -> Token {
        let lexeme = self.cursor.slice_from(self.token_start);
        let length = lexeme.chars().count() as u32;
        let span = Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.cursor.column().saturating_sub(length),
        );
        Token::new(kind, lexeme, literal, span)
    }

    /// Reports a lexical error at the current token position.
    fn report_error(&self, message: String) {
        let span = Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        );
        self.handler.emit(Diagnostic::error(message, span));
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}

/// Tokenizes an entire source string, returning the token sequence
/// terminated by an `Eof` sentinel.
pub fn tokenize(source: &str, handler: &Handler) -> Vec<Token> {
    let mut lexer = Lexer::new(source, handler);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.is_eof();
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
