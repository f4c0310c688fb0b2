//! Expression parsing implementation
//!
//! Recursive descent for assignment, ternary, logical and unary forms, and
//! precedence climbing for the binary operators.
//!
//! # Precedence (lowest first)
//!
//! ```text
//! ,  =/op=  ?:  ||  &&  |  ^  &  == != === !==  < <= > >=  << >> >>>  + -  * / %
//! unary  postfix  call/member  primary
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

/// Binding power and operator for every binary token.
fn binary_operator(kind: &TokenKind) -> Option<(u8, BinOp)> {
    let entry = match kind {
        TokenKind::Pipe => (1, BinOp::BitOr),
        TokenKind::Caret => (2, BinOp::BitXor),
        TokenKind::Amp => (3, BinOp::BitAnd),
        TokenKind::EqEq => (4, BinOp::Eq),
        TokenKind::NotEq => (4, BinOp::Ne),
        TokenKind::EqEqEq => (4, BinOp::StrictEq),
        TokenKind::NotEqEq => (4, BinOp::StrictNe),
        TokenKind::Lt => (5, BinOp::Lt),
        TokenKind::Le => (5, BinOp::Le),
        TokenKind::Gt => (5, BinOp::Gt),
        TokenKind::Ge => (5, BinOp::Ge),
        TokenKind::LtLt => (6, BinOp::BitShl),
        TokenKind::GtGt => (6, BinOp::BitShr),
        TokenKind::GtGtGt => (6, BinOp::BitUShr),
        TokenKind::Plus => (7, BinOp::Add),
        TokenKind::Minus => (7, BinOp::Sub),
        TokenKind::Star => (8, BinOp::Mul),
        TokenKind::Slash => (8, BinOp::Div),
        TokenKind::Percent => (8, BinOp::Mod),
        _ => return None,
    };
    Some(entry)
}

/// `None` for plain `=`, `Some(op)` for compound assignment.
fn assignment_operator(kind: &TokenKind) -> Option<Option<BinOp>> {
    let op = match kind {
        TokenKind::Eq => None,
        TokenKind::PlusEq => Some(BinOp::Add),
        TokenKind::MinusEq => Some(BinOp::Sub),
        TokenKind::StarEq => Some(BinOp::Mul),
        TokenKind::SlashEq => Some(BinOp::Div),
        TokenKind::PercentEq => Some(BinOp::Mod),
        TokenKind::AmpEq => Some(BinOp::BitAnd),
        TokenKind::PipeEq => Some(BinOp::BitOr),
        TokenKind::CaretEq => Some(BinOp::BitXor),
        TokenKind::LtLtEq => Some(BinOp::BitShl),
        TokenKind::GtGtEq => Some(BinOp::BitShr),
        TokenKind::GtGtGtEq => Some(BinOp::BitUShr),
        _ => return None,
    };
    Some(op)
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(expr, Expr::Ident(..) | Expr::Member { .. } | Expr::Index { .. })
}

impl Parser {
    /// Parse expression (top-level entry point, includes the comma operator)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let location = first.location();
        let mut exprs = vec![first];
        while self.match_token(&TokenKind::Comma) {
            exprs.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence(exprs, location))
    }

    /// Parse assignment or ternary (right-associative)
    pub(crate) fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_ternary()?;

        let Some(op) = assignment_operator(&self.peek().kind) else {
            return Ok(target);
        };
        let location = self.current_location();
        if !is_assignable(&target) {
            return Err(ParseError {
                message: "invalid assignment left-hand side".to_string(),
                location: target.location(),
                at_end: false,
            });
        }
        self.advance();
        let value = self.parse_assignment()?;

        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
            location,
        })
    }

    /// Parse ternary: condition ? then_expr : else_expr
    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_logical_or()?;

        if !self.match_token(&TokenKind::Question) {
            return Ok(condition);
        }
        let location = condition.location();
        let then_expr = self.parse_assignment()?;
        self.expect_token(&TokenKind::Colon, "missing : in conditional expression")?;
        let else_expr = self.parse_assignment()?;

        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            location,
        })
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.match_token(&TokenKind::OrOr) {
            let location = self.previous().location;
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }

        Ok(left)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_binary(1)?;

        while self.match_token(&TokenKind::AndAnd) {
            let location = self.previous().location;
            let right = self.parse_binary(1)?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }

        Ok(left)
    }

    /// Precedence climbing over the left-associative binary operators.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some((precedence, op)) = binary_operator(&self.peek().kind) {
            if precedence < min_precedence {
                break;
            }
            let location = self.current_location();
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }

        Ok(left)
    }

    /// Parse unary operators: `-`, `+`, `!`, `~`, `typeof`, `void`, prefix `++`/`--`
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let op = match self.peek().kind {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Plus => UnOp::Plus,
            TokenKind::Bang => UnOp::Not,
            TokenKind::Tilde => UnOp::BitNot,
            TokenKind::Typeof => UnOp::Typeof,
            TokenKind::Void => UnOp::Void,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.check(&TokenKind::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance();
                let target = self.parse_unary()?;
                return self.make_update(op, true, target, location);
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            location,
        })
    }

    fn make_update(
        &self,
        op: UpdateOp,
        prefix: bool,
        target: Expr,
        location: SourceLocation,
    ) -> Result<Expr, ParseError> {
        if !is_assignable(&target) {
            return Err(ParseError {
                message: "invalid increment/decrement operand".to_string(),
                location: target.location(),
                at_end: false,
            });
        }
        Ok(Expr::Update {
            op,
            prefix,
            target: Box::new(target),
            location,
        })
    }

    /// Parse postfix `++`/`--` (not across a line break).
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_call_member()?;
        let next = self.peek();
        if next.newline_before {
            return Ok(expr);
        }
        let op = match next.kind {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        let location = next.location;
        self.advance();
        self.make_update(op, false, expr, location)
    }

    /// Parse member access, indexing and calls (left-to-right).
    fn parse_call_member(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let location = self.current_location();
            if self.match_token(&TokenKind::Dot) {
                let property = self.expect_identifier("missing name after . operator")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    location,
                };
            } else if self.match_token(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect_token(&TokenKind::RBracket, "missing ] in index expression")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    location,
                };
            } else if self.match_token(&TokenKind::LParen) {
                let args = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    location,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parse a call's argument list; `(` has been consumed.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.match_token(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assignment()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RParen, "missing ) after argument list")?;
        Ok(args)
    }

    /// Parse primary expressions: literals, identifiers, grouping, array and
    /// object literals, function expressions.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();

        let expr = match &self.peek().kind {
            TokenKind::Number(n) => Expr::Number(*n, location),
            TokenKind::Str(s) => Expr::Str(Rc::from(s.as_str()), location),
            TokenKind::True => Expr::Bool(true, location),
            TokenKind::False => Expr::Bool(false, location),
            TokenKind::Null => Expr::Null(location),
            TokenKind::Ident(name) => Expr::Ident(name.clone(), location),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_token(&TokenKind::RParen, "missing ) in parenthetical")?;
                return Ok(inner);
            }
            TokenKind::LBracket => {
                self.advance();
                return self.parse_array_literal(location);
            }
            TokenKind::LBrace => {
                self.advance();
                return self.parse_object_literal(location);
            }
            TokenKind::Function => {
                self.advance();
                let function = self.parse_function(false, location)?;
                return Ok(Expr::Function(function, location));
            }
            _ => return Err(self.error_here("syntax error")),
        };

        self.advance();
        Ok(expr)
    }

    fn parse_array_literal(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBracket, "missing ] after element list")?;
        Ok(Expr::Array(elements, location))
    }

    fn parse_object_literal(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = match &self.peek().kind {
                TokenKind::Ident(name) => name.clone(),
                TokenKind::Str(s) => s.clone(),
                TokenKind::Number(n) => crate::memory::value::format_number(*n),
                _ => return Err(self.error_here("invalid property id")),
            };
            self.advance();
            self.expect_token(&TokenKind::Colon, "missing : after property id")?;
            properties.push((key, self.parse_assignment()?));
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBrace, "missing } after property list")?;
        Ok(Expr::Object(properties, location))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{parse_program, ParseOptions};

    fn parse_expr(source: &str) -> Expr {
        let (program, _) = parse_program(source, ParseOptions::new(1)).unwrap();
        match program.body.into_iter().next() {
            Some(Stmt::Expression { expr, .. }) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        match parse_expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsigned_shift_then_method() {
        match parse_expr("(x >>> 0).toString(16)") {
            Expr::Call { callee, args, .. } => {
                assert_eq!(args.len(), 1);
                assert!(matches!(*callee, Expr::Member { ref property, .. } if property == "toString"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_compound_assignment_to_member() {
        assert!(matches!(
            parse_expr("a.b[0] += 1"),
            Expr::Assign { op: Some(BinOp::Add), .. }
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_program("1 = 2", ParseOptions::new(1)).unwrap_err();
        assert_eq!(err.message, "invalid assignment left-hand side");
    }

    #[test]
    fn test_postfix_does_not_cross_newline() {
        let (program, _) = parse_program("a\n++b", ParseOptions::new(1)).unwrap();
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_object_and_array_literals() {
        assert!(matches!(parse_expr("x = {a: 1, 'b': [1, 2,]}"), Expr::Assign { .. }));
    }
}
