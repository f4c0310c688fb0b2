//! Statement parsing implementation
//!
//! # Grammar
//!
//! ```text
//! statement ::= var_decl | function_decl | if_stmt | while_stmt | for_stmt
//!             | do_while_stmt | return_stmt | break_stmt | continue_stmt
//!             | throw_stmt | try_stmt | block | ';' | expr_stmt
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        match self.peek().kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let kind = match self.advance().kind {
                    TokenKind::Let => DeclKind::Let,
                    TokenKind::Const => DeclKind::Const,
                    _ => DeclKind::Var,
                };
                let stmt = self.parse_declarators(kind, loc)?;
                self.consume_semicolon()?;
                Ok(stmt)
            }
            TokenKind::Function => {
                self.advance();
                let function = self.parse_function(true, loc)?;
                Ok(Stmt::FunctionDecl {
                    function,
                    location: loc,
                })
            }
            TokenKind::If => {
                self.advance();
                self.parse_if_statement(loc)
            }
            TokenKind::While => {
                self.advance();
                self.parse_while_statement(loc)
            }
            TokenKind::Do => {
                self.advance();
                self.parse_do_while_statement(loc)
            }
            TokenKind::For => {
                self.advance();
                self.parse_for_statement(loc)
            }
            TokenKind::Return => {
                self.advance();
                self.parse_return_statement(loc)
            }
            TokenKind::Break => {
                self.advance();
                if self.loop_depth == 0 {
                    return Err(ParseError {
                        message: "unlabeled break must be inside loop".to_string(),
                        location: loc,
                        at_end: false,
                    });
                }
                self.consume_semicolon()?;
                Ok(Stmt::Break { location: loc })
            }
            TokenKind::Continue => {
                self.advance();
                if self.loop_depth == 0 {
                    return Err(ParseError {
                        message: "continue must be inside loop".to_string(),
                        location: loc,
                        at_end: false,
                    });
                }
                self.consume_semicolon()?;
                Ok(Stmt::Continue { location: loc })
            }
            TokenKind::Throw => {
                self.advance();
                if self.peek().newline_before {
                    return Err(self.error_here("syntax error"));
                }
                let value = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw {
                    value,
                    location: loc,
                })
            }
            TokenKind::Try => {
                self.advance();
                self.parse_try_statement(loc)
            }
            TokenKind::LBrace => {
                self.advance();
                let statements =
                    self.parse_block_body("missing } in compound statement")?;
                Ok(Stmt::Block {
                    statements,
                    location: loc,
                })
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty { location: loc })
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Expression {
                    expr,
                    location: loc,
                })
            }
        }
    }

    /// Parses `( expr )` after `if`/`while`, warning on a bare assignment.
    fn parse_condition(&mut self) -> Result<Expr, ParseError> {
        self.expect_token(&TokenKind::LParen, "missing ( before condition")?;
        let condition = self.parse_expression()?;
        if let Expr::Assign { op: None, location, .. } = &condition {
            self.warn(
                "test for equality (==) mistyped as assignment (=)?".to_string(),
                *location,
                true,
            );
        }
        self.expect_token(&TokenKind::RParen, "missing ) after condition")?;
        Ok(condition)
    }

    fn parse_if_statement(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        let condition = self.parse_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            location,
        })
    }

    fn parse_loop_body(&mut self) -> Result<Box<Stmt>, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        Ok(Box::new(body?))
    }

    fn parse_while_statement(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        let condition = self.parse_condition()?;
        let body = self.parse_loop_body()?;
        Ok(Stmt::While {
            condition,
            body,
            location,
        })
    }

    fn parse_do_while_statement(
        &mut self,
        location: SourceLocation,
    ) -> Result<Stmt, ParseError> {
        let body = self.parse_loop_body()?;
        self.expect_token(&TokenKind::While, "missing while after do-loop body")?;
        let condition = self.parse_condition()?;
        // A semicolon after do-while is always optional.
        self.match_token(&TokenKind::Semicolon);
        Ok(Stmt::DoWhile {
            body,
            condition,
            location,
        })
    }

    fn parse_for_statement(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_token(&TokenKind::LParen, "missing ( after for")?;

        let init_loc = self.current_location();
        let init = match self.peek().kind {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let kind = match self.advance().kind {
                    TokenKind::Let => DeclKind::Let,
                    TokenKind::Const => DeclKind::Const,
                    _ => DeclKind::Var,
                };
                Some(Box::new(self.parse_declarators(kind, init_loc)?))
            }
            _ => Some(Box::new(Stmt::Expression {
                expr: self.parse_expression()?,
                location: init_loc,
            })),
        };
        self.expect_token(&TokenKind::Semicolon, "missing ; after for-loop initializer")?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_token(&TokenKind::Semicolon, "missing ; after for-loop condition")?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_token(&TokenKind::RParen, "missing ) after for-loop control")?;

        let body = self.parse_loop_body()?;

        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
            location,
        })
    }

    fn parse_return_statement(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        if self.function_depth == 0 {
            return Err(ParseError {
                message: "return not in function".to_string(),
                location,
                at_end: false,
            });
        }

        let next = self.peek();
        let value = if next.newline_before
            || matches!(
                next.kind,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
            ) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;

        Ok(Stmt::Return { value, location })
    }

    fn parse_try_statement(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_token(&TokenKind::LBrace, "missing { before try block")?;
        let block = self.parse_block_body("missing } after try block")?;

        let handler = if self.match_token(&TokenKind::Catch) {
            self.expect_token(&TokenKind::LParen, "missing ( before catch")?;
            let param = self.expect_identifier("missing identifier in catch")?;
            self.expect_token(&TokenKind::RParen, "missing ) after catch")?;
            self.expect_token(&TokenKind::LBrace, "missing { before catch block")?;
            let body = self.parse_block_body("missing } after catch block")?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.match_token(&TokenKind::Finally) {
            self.expect_token(&TokenKind::LBrace, "missing { before finally block")?;
            Some(self.parse_block_body("missing } after finally block")?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_here("missing catch or finally after try"));
        }

        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{parse_program, ParseOptions};

    fn parse(source: &str) -> Vec<Stmt> {
        parse_program(source, ParseOptions::new(1)).unwrap().0.body
    }

    #[test]
    fn test_for_loop() {
        let body = parse("for (var i = 0; i < 10; i++) { }");
        assert!(matches!(
            &body[0],
            Stmt::For { init: Some(_), condition: Some(_), update: Some(_), .. }
        ));
    }

    #[test]
    fn test_try_catch_finally() {
        let body = parse("try { f(); } catch (e) { g(e); } finally { h(); }");
        match &body[0] {
            Stmt::Try {
                handler: Some(handler),
                finalizer: Some(finalizer),
                ..
            } => {
                assert_eq!(handler.param, "e");
                assert_eq!(finalizer.len(), 1);
            }
            other => panic!("expected try statement, got {:?}", other),
        }
    }

    #[test]
    fn test_return_outside_function() {
        let err = parse_program("return 1;", ParseOptions::new(1)).unwrap_err();
        assert_eq!(err.message, "return not in function");
    }

    #[test]
    fn test_break_outside_loop() {
        assert!(parse_program("break;", ParseOptions::new(1)).is_err());
        assert!(parse_program("while (1) { break; }", ParseOptions::new(1)).is_ok());
    }

    #[test]
    fn test_assignment_in_condition_is_strict_warning() {
        let mut options = ParseOptions::new(1);
        options.strict = true;
        let (_, warnings) = parse_program("var a; if (a = 1) a;", options).unwrap();
        assert_eq!(
            warnings[0].message,
            "test for equality (==) mistyped as assignment (=)?"
        );
    }

    #[test]
    fn test_unclosed_block_needs_more_input() {
        let err = parse_program("while (1) {\n", ParseOptions::new(1)).unwrap_err();
        assert!(err.at_end);
    }
}
