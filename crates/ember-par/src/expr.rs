//! Expression parsing - the precedence climb.
//!
//! One function per precedence level, each delegating to the next-tighter
//! level and folding left-associative operators in a loop. Assignment is
//! the only right-associative level and recurses into itself.

use ember_lex::{Token, TokenKind};

use crate::ast::*;
use crate::{ParseResult, Parser};

/// Maximum number of call arguments (and function parameters). The
/// 255th entry is reported but parsing continues.
pub(crate) const MAX_ARGS: usize = 254;

/// Maps a compound-assignment token kind to its base arithmetic kind.
fn compound_base(kind: TokenKind) -> Option<TokenKind> {
    let base = match kind {
        TokenKind::PlusEq => TokenKind::Plus,
        TokenKind::MinusEq => TokenKind::Minus,
        TokenKind::StarEq => TokenKind::Star,
        TokenKind::SlashEq => TokenKind::Slash,
        TokenKind::PercentEq => TokenKind::Percent,
        _ => return None,
    };
    Some(base)
}

impl<'a> Parser<'a> {
    /// Entry point for expression parsing.
    pub(crate) fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    /// assignment -> ( call "." )? IDENTIFIER ( "=" | "+=" | ... ) assignment
    ///             | logic_or
    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.logic_or()?;

        if self.match_kind(&[TokenKind::Eq]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;
            return Ok(self.make_assign(expr, &equals, None, value));
        }

        if let Some(base_kind) = compound_base(self.peek().kind) {
            self.advance();
            let compound = self.previous().clone();
            let value = self.assignment()?;
            // The desugared node carries the base operator with the
            // compound token's position, so `a += b` evaluates like
            // `a = a + b` but still points diagnostics at the `+=`.
            let base = Token::new(
                base_kind,
                compound.lexeme.trim_end_matches('=').to_string(),
                None,
                compound.span,
            );
            return Ok(self.make_assign(expr, &compound, Some(base), value));
        }

        Ok(expr)
    }

    /// Turns an expression into an assignment target, or reports
    /// "Invalid assignment target." and keeps the left-hand side.
    fn make_assign(&mut self, target: Expr, equals: &Token, op: Option<Token>, value: Expr) -> Expr {
        match target {
            Expr::Variable(var) => Expr::Assign(AssignExpr {
                name: var.name,
                op,
                value: Box::new(value),
                id: self.fresh_id(),
            }),
            Expr::Get(get) => Expr::Set(SetExpr {
                object: get.object,
                name: get.name,
                op,
                value: Box::new(value),
            }),
            other => {
                self.error(equals, "Invalid assignment target.");
                other
            }
        }
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.logic_and()?;

        while self.match_kind(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.logic_and()?;
            expr = Expr::Logical(LogicalExpr {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while self.match_kind(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical(LogicalExpr {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while self.match_kind(&[TokenKind::BangEq, TokenKind::EqEq]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = binary(expr, op, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while self.match_kind(&[
            TokenKind::Gt,
            TokenKind::GtEq,
            TokenKind::Lt,
            TokenKind::LtEq,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = binary(expr, op, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while self.match_kind(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = binary(expr, op, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while self.match_kind(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = binary(expr, op, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_kind(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary(UnaryExpr {
                op,
                right: Box::new(right),
            }));
        }

        self.call()
    }

    /// call -> primary ( "(" arguments? ")" | "." IDENTIFIER )*
    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_kind(&[TokenKind::LParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(&[TokenKind::Dot]) {
                let name = self.consume(TokenKind::Identifier, "Expected property name after '.'.")?;
                expr = Expr::Get(GetExpr {
                    object: Box::new(expr),
                    name,
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut args = Vec::new();

        if !self.check(TokenKind::RParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    // Report without raising so the rest of the list
                    // still parses and later errors surface.
                    let token = self.peek().clone();
                    self.error(&token, "Cannot have more than 255 arguments.");
                }
                args.push(self.expression()?);
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenKind::RParen, "Expected ')' after arguments.")?;

        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            paren,
            args,
        }))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.match_kind(&[TokenKind::False]) {
            return Ok(Expr::Literal(LitValue::Bool(false)));
        }
        if self.match_kind(&[TokenKind::True]) {
            return Ok(Expr::Literal(LitValue::Bool(true)));
        }
        if self.match_kind(&[TokenKind::Nil]) {
            return Ok(Expr::Literal(LitValue::Nil));
        }

        if self.match_kind(&[TokenKind::Number, TokenKind::Str]) {
            let token = self.previous().clone();
            let value = match token.literal {
                Some(ember_lex::Literal::Number(n)) => LitValue::Number(n),
                Some(ember_lex::Literal::Str(s)) => LitValue::Str(s),
                // The lexer always attaches a literal to these kinds.
                None => LitValue::Nil,
            };
            return Ok(Expr::Literal(value));
        }

        if self.match_kind(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expected '.' after 'super'.")?;
            let method =
                self.consume(TokenKind::Identifier, "Expected superclass method name.")?;
            return Ok(Expr::Super(SuperExpr {
                keyword,
                method,
                id: self.fresh_id(),
            }));
        }

        if self.match_kind(&[TokenKind::This]) {
            let keyword = self.previous().clone();
            return Ok(Expr::This(ThisExpr {
                keyword,
                id: self.fresh_id(),
            }));
        }

        if self.match_kind(&[TokenKind::Identifier]) {
            let name = self.previous().clone();
            return Ok(Expr::Variable(VariableExpr {
                name,
                id: self.fresh_id(),
            }));
        }

        if self.match_kind(&[TokenKind::LParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RParen, "Expected ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let token = self.peek().clone();
        Err(self.error(&token, "Expected expression."))
    }
}

fn binary(left: Expr, op: Token, right: Expr) -> Expr {
    Expr::Binary(BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}
