//! Statement and declaration parsing.

use std::rc::Rc;

use ember_lex::TokenKind;

use crate::ast::*;
use crate::expr::MAX_ARGS;
use crate::{ParseResult, Parser};

impl<'a> Parser<'a> {
    /// declaration -> var_decl | fun_decl | class_decl | statement
    ///
    /// This is the panic-mode boundary: an error anywhere inside the
    /// declaration synchronizes and yields an inert `nil` statement so
    /// the statement list keeps its shape.
    pub(crate) fn declaration(&mut self) -> Stmt {
        let result = if self.match_kind(&[TokenKind::Var]) {
            self.var_declaration()
        } else if self.match_kind(&[TokenKind::Fun]) {
            self.function("function").map(Stmt::Function)
        } else if self.match_kind(&[TokenKind::Class]) {
            self.class_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => stmt,
            Err(_) => {
                self.synchronize();
                Stmt::Expression(Expr::Literal(LitValue::Nil))
            }
        }
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expected variable name.")?;

        let init = if self.match_kind(&[TokenKind::Eq]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::Semicolon,
            "Expected ';' after variable declaration.",
        )?;
        Ok(Stmt::Var(VarStmt { name, init }))
    }

    /// Parses a function or method. `kind` is only used in diagnostics
    /// ("function" or "method").
    pub(crate) fn function(&mut self, kind: &str) -> ParseResult<Rc<FunctionDecl>> {
        let name = self.consume(TokenKind::Identifier, &format!("Expected {} name.", kind))?;
        self.consume(
            TokenKind::LParen,
            &format!("Expected '(' after {} name.", kind),
        )?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    let token = self.peek().clone();
                    self.error(&token, "Cannot have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expected parameter name.")?);
                if !self.match_kind(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expected ')' after parameters.")?;

        self.consume(
            TokenKind::LBrace,
            &format!("Expected '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expected class name.")?;

        let superclass = if self.match_kind(&[TokenKind::Lt]) {
            let super_name = self.consume(TokenKind::Identifier, "Expected superclass name.")?;
            Some(VariableExpr {
                name: super_name,
                id: self.fresh_id(),
            })
        } else {
            None
        };

        self.consume(TokenKind::LBrace, "Expected '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenKind::RBrace, "Expected '}' after class body.")?;

        Ok(Stmt::Class(ClassStmt {
            name,
            superclass,
            methods,
        }))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_kind(&[TokenKind::For]) {
            self.for_statement()
        } else if self.match_kind(&[TokenKind::If]) {
            self.if_statement()
        } else if self.match_kind(&[TokenKind::Return]) {
            self.return_statement()
        } else if self.match_kind(&[TokenKind::While]) {
            self.while_statement()
        } else if self.match_kind(&[TokenKind::LBrace]) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    /// for_stmt -> "for" "(" ( var_decl | expr_stmt | ";" ) expr? ";" expr? ")" statement
    ///
    /// Lowered at parse time to `{ init?; while (cond-or-true) { body; inc?; } }`
    /// so the evaluator never sees a `for` node.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LParen, "Expected '(' after 'for'.")?;

        let init = if self.match_kind(&[TokenKind::Semicolon]) {
            None
        } else if self.match_kind(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let cond = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after loop condition.")?;

        let inc = if !self.check(TokenKind::RParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RParen, "Expected ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(inc) = inc {
            body = Stmt::Block(vec![body, Stmt::Expression(inc)]);
        }

        let cond = cond.unwrap_or(Expr::Literal(LitValue::Bool(true)));
        body = Stmt::While(WhileStmt {
            cond,
            body: Box::new(body),
        });

        if let Some(init) = init {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LParen, "Expected '(' after 'if'.")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(IfStmt {
            cond,
            then_branch,
            else_branch,
        }))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LParen, "Expected '(' after 'while'.")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While(WhileStmt { cond, body }))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expected ';' after return value.")?;
        Ok(Stmt::Return(ReturnStmt { keyword, value }))
    }

    pub(crate) fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.declaration());
        }

        self.consume(TokenKind::RBrace, "Expected '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeIds;
    use ember_lex::tokenize;
    use ember_util::Handler;

    fn parse_source(source: &str) -> (Vec<Stmt>, Handler) {
        let handler = Handler::new();
        let ids = NodeIds::new();
        let tokens = tokenize(source, &handler);
        let mut parser = Parser::new(tokens, &handler, &ids);
        let program = parser.parse();
        (program, handler)
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "errors parsing {:?}", source);
        program
    }

    #[test]
    fn test_var_declaration() {
        let program = parse_ok("var x = 1;");
        match &program[0] {
            Stmt::Var(v) => {
                assert_eq!(v.name.lexeme, "x");
                assert!(v.init.is_some());
            }
            other => panic!("expected Var, got {:?}", other),
        }
    }

    #[test]
    fn test_var_declaration_without_initializer() {
        let program = parse_ok("var x;");
        assert!(matches!(&program[0], Stmt::Var(v) if v.init.is_none()));
    }

    #[test]
    fn test_function_declaration() {
        let program = parse_ok("fun add(a, b) { return a + b; }");
        match &program[0] {
            Stmt::Function(f) => {
                assert_eq!(f.name.lexeme, "add");
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.body.len(), 1);
                assert!(matches!(f.body[0], Stmt::Return(_)));
            }
            other => panic!("expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_class_declaration() {
        let program = parse_ok("class Point { init(x) { this.x = x; } length() { return 0; } }");
        match &program[0] {
            Stmt::Class(c) => {
                assert_eq!(c.name.lexeme, "Point");
                assert!(c.superclass.is_none());
                assert_eq!(c.methods.len(), 2);
                assert_eq!(c.methods[0].name.lexeme, "init");
                assert_eq!(c.methods[1].name.lexeme, "length");
            }
            other => panic!("expected Class, got {:?}", other),
        }
    }

    #[test]
    fn test_class_with_superclass() {
        let program = parse_ok("class B < A { }");
        match &program[0] {
            Stmt::Class(c) => {
                let superclass = c.superclass.as_ref().expect("superclass present");
                assert_eq!(superclass.name.lexeme, "A");
            }
            other => panic!("expected Class, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else() {
        let program = parse_ok("if (a) b = 1; else b = 2;");
        match &program[0] {
            Stmt::If(i) => assert!(i.else_branch.is_some()),
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let program = parse_ok("if (a) if (b) c = 1; else c = 2;");
        match &program[0] {
            Stmt::If(outer) => {
                assert!(outer.else_branch.is_none());
                assert!(
                    matches!(&*outer.then_branch, Stmt::If(inner) if inner.else_branch.is_some())
                );
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_while_statement() {
        let program = parse_ok("while (x < 3) x = x + 1;");
        assert!(matches!(&program[0], Stmt::While(_)));
    }

    #[test]
    fn test_block_statement() {
        let program = parse_ok("{ var a = 1; var b = 2; }");
        assert!(matches!(&program[0], Stmt::Block(stmts) if stmts.len() == 2));
    }

    #[test]
    fn test_for_desugars_to_while_in_block() {
        let program = parse_ok("for (var i = 0; i < 3; i = i + 1) print(i);");
        // { var i = 0; while (i < 3) { print(i); i = i + 1; } }
        match &program[0] {
            Stmt::Block(outer) => {
                assert_eq!(outer.len(), 2);
                assert!(matches!(outer[0], Stmt::Var(_)));
                match &outer[1] {
                    Stmt::While(w) => match &*w.body {
                        Stmt::Block(inner) => {
                            assert_eq!(inner.len(), 2);
                            assert!(matches!(inner[0], Stmt::Expression(Expr::Call(_))));
                            assert!(matches!(inner[1], Stmt::Expression(Expr::Assign(_))));
                        }
                        other => panic!("expected Block body, got {:?}", other),
                    },
                    other => panic!("expected While, got {:?}", other),
                }
            }
            other => panic!("expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_for_without_clauses() {
        let program = parse_ok("for (;;) stop();");
        // No initializer and no increment: bare while with a true condition.
        match &program[0] {
            Stmt::While(w) => {
                assert!(matches!(w.cond, Expr::Literal(LitValue::Bool(true))));
                assert!(matches!(&*w.body, Stmt::Expression(Expr::Call(_))));
            }
            other => panic!("expected While, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_expression_initializer() {
        let program = parse_ok("for (i = 0; i < 2;) tick();");
        match &program[0] {
            Stmt::Block(outer) => {
                assert!(matches!(outer[0], Stmt::Expression(Expr::Assign(_))));
                assert!(matches!(outer[1], Stmt::While(_)));
            }
            other => panic!("expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_return_without_value() {
        let program = parse_ok("fun f() { return; }");
        match &program[0] {
            Stmt::Function(f) => {
                assert!(matches!(&f.body[0], Stmt::Return(r) if r.value.is_none()));
            }
            other => panic!("expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_parameter_limit() {
        let params: Vec<String> = (0..255).map(|i| format!("p{}", i)).collect();
        let source = format!("fun big({}) {{ }}", params.join(", "));
        let (_, handler) = parse_source(&source);
        assert!(handler.has_errors());
        assert_eq!(
            handler.diagnostics()[0].message,
            "Cannot have more than 255 parameters."
        );
    }

    #[test]
    fn test_missing_semicolon_message() {
        let (_, handler) = parse_source("f()");
        assert!(handler.has_errors());
        assert_eq!(
            handler.diagnostics()[0].message,
            "Expected ';' after expression."
        );
    }

    #[test]
    fn test_method_error_mentions_method() {
        let (_, handler) = parse_source("class C { 42 }");
        assert!(handler.has_errors());
        assert_eq!(handler.diagnostics()[0].message, "Expected method name.");
    }
}
