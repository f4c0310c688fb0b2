//! Declaration parsing
//!
//! `var`/`let`/`const` declarator lists and function literals. Function
//! bodies open a fresh hoisting scope so each [`FunctionDef`] knows the
//! `var` names it has to pre-declare.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parses the declarator list after `var`, `let` or `const` (the keyword
    /// itself has been consumed). Does not consume the terminator.
    pub(crate) fn parse_declarators(
        &mut self,
        kind: DeclKind,
        location: SourceLocation,
    ) -> Result<Stmt, ParseError> {
        let mut declarations = Vec::new();

        loop {
            let decl_location = self.current_location();
            let name = self.expect_identifier("missing variable name")?;
            let init = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                if kind == DeclKind::Const {
                    return Err(self.error_here("missing = in const declaration"));
                }
                None
            };

            if kind == DeclKind::Var {
                self.declare_var(&name, decl_location);
            }
            declarations.push(Declarator {
                name,
                init,
                location: decl_location,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(Stmt::VarDecl {
            kind,
            declarations,
            location,
        })
    }

    /// Parses `function name(params) { body }`; `function` has been consumed.
    /// The name is required for declarations and optional for expressions.
    pub(crate) fn parse_function(
        &mut self,
        require_name: bool,
        location: SourceLocation,
    ) -> Result<Rc<FunctionDef>, ParseError> {
        let name = match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ if require_name => return Err(self.error_here("missing name after function")),
            _ => None,
        };

        self.expect_token(&TokenKind::LParen, "missing ( before formal parameters")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier("missing formal parameter")?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_token(&TokenKind::RParen, "missing ) after formal parameters")?;
        self.expect_token(&TokenKind::LBrace, "missing { before function body")?;

        self.var_scopes.push(Vec::new());
        self.function_depth += 1;
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);

        let body = self.parse_block_body("missing } after function body");

        self.loop_depth = saved_loop_depth;
        self.function_depth -= 1;
        let var_names = self.var_scopes.pop().unwrap_or_default();
        let body = body?;

        Ok(Rc::new(FunctionDef {
            name,
            params,
            body,
            var_names,
            location,
        }))
    }

    /// Parses statements up to and including the closing `}`.
    pub(crate) fn parse_block_body(
        &mut self,
        missing_brace: &str,
    ) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.error_here(missing_brace));
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        self.check_unreachable(&statements);
        Ok(statements)
    }

    /// Warns about a statement directly following a `return` in the same block.
    fn check_unreachable(&mut self, statements: &[Stmt]) {
        let mut after_return = false;
        for stmt in statements {
            match stmt {
                Stmt::FunctionDecl { .. } | Stmt::Empty { .. } => {}
                _ if after_return => {
                    self.warn(
                        "unreachable code after return statement".to_string(),
                        stmt.location(),
                        false,
                    );
                    return;
                }
                Stmt::Return { .. } => after_return = true,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{parse_program, ParseOptions};

    #[test]
    fn test_function_hoisting_scope() {
        let (program, _) =
            parse_program("var g; function f(a, b) { var x; var y; }", ParseOptions::new(1))
                .unwrap();
        assert_eq!(program.var_names, vec!["g"]);
        match &program.body[1] {
            Stmt::FunctionDecl { function, .. } => {
                assert_eq!(function.name.as_deref(), Some("f"));
                assert_eq!(function.params, vec!["a", "b"]);
                assert_eq!(function.var_names, vec!["x", "y"]);
            }
            other => panic!("expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_warning() {
        let (_, warnings) = parse_program(
            "function f() { return 1; f(); }",
            ParseOptions::new(1),
        )
        .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "unreachable code after return statement");
        assert!(!warnings[0].strict);
    }

    #[test]
    fn test_const_requires_initializer() {
        let err = parse_program("const x;", ParseOptions::new(1)).unwrap_err();
        assert_eq!(err.message, "missing = in const declaration");
    }
}
