//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, semicolon insertion
//! - `declarations`: `var`/`let`/`const` and function declarations
//! - `statements`: Parsing statements (if, while, for, try, etc.)
//! - `expressions`: Parsing expressions with precedence climbing
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
    /// Parsing failed only because the input ended early.
    pub at_end: bool,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
            at_end: err.at_end,
        }
    }
}

/// A non-fatal diagnostic found while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub message: String,
    pub location: SourceLocation,
    /// Only emitted when strict checking is enabled.
    pub strict: bool,
}

/// Options that change what the parser accepts or warns about.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub start_line: usize,
    /// Recognise `let`/`const` as keywords.
    pub let_keywords: bool,
    pub strict: bool,
}

impl ParseOptions {
    pub fn new(start_line: usize) -> Self {
        ParseOptions {
            start_line,
            let_keywords: true,
            strict: false,
        }
    }
}

/// Recursive descent parser for the script language
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) options: ParseOptions,
    pub(crate) warnings: Vec<ParseWarning>,
    /// One entry per enclosing function body; collects hoisted `var` names.
    pub(crate) var_scopes: Vec<Vec<String>>,
    pub(crate) function_depth: usize,
    pub(crate) loop_depth: usize,
}

impl Parser {
    pub fn new(source: &str, options: ParseOptions) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source, options.start_line.max(1))
            .with_let_keywords(options.let_keywords);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            options,
            warnings: Vec::new(),
            var_scopes: vec![Vec::new()],
            function_depth: 0,
            loop_depth: 0,
        })
    }

    /// Parse a whole compilation unit.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program {
            body,
            var_names: self.var_scopes.pop().unwrap_or_default(),
        })
    }

    /// Warnings collected so far.
    pub fn take_warnings(&mut self) -> Vec<ParseWarning> {
        std::mem::take(&mut self.warnings)
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    /// Error at the current token. Errors raised at end of input are marked
    /// so the interactive loop can keep reading.
    pub(crate) fn error_here(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            location: self.current_location(),
            at_end: self.is_at_end(),
        }
    }

    pub(crate) fn expect_token(
        &mut self,
        kind: &TokenKind,
        message: &str,
    ) -> Result<(), ParseError> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    pub(crate) fn expect_identifier(
        &mut self,
        message: &str,
    ) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(message)),
        }
    }

    /// Consumes a statement terminator, inserting one where a line break,
    /// a closing brace or the end of input allows it.
    pub(crate) fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(());
        }
        let next = self.peek();
        if next.newline_before || matches!(next.kind, TokenKind::RBrace | TokenKind::Eof) {
            return Ok(());
        }
        Err(self.error_here("missing ; before statement"))
    }

    pub(crate) fn warn(&mut self, message: String, location: SourceLocation, strict: bool) {
        if strict && !self.options.strict {
            return;
        }
        self.warnings.push(ParseWarning {
            message,
            location,
            strict,
        });
    }

    /// Records a hoisted `var` in the innermost function scope.
    pub(crate) fn declare_var(&mut self, name: &str, location: SourceLocation) {
        let duplicate = self
            .var_scopes
            .last()
            .is_some_and(|scope| scope.iter().any(|n| n == name));
        if duplicate {
            self.warn(format!("redeclaration of var {}", name), location, true);
        } else if let Some(scope) = self.var_scopes.last_mut() {
            scope.push(name.to_string());
        }
    }
}

/// Parses `source` into a program, returning the program and its warnings.
pub fn parse_program(
    source: &str,
    options: ParseOptions,
) -> Result<(Program, Vec<ParseWarning>), ParseError> {
    let mut parser = Parser::new(source, options)?;
    let program = parser.parse_program()?;
    Ok((program, parser.take_warnings()))
}

/// Returns `false` only when `source` fails to parse because it ends too
/// early, i.e. more input could still complete it.
pub fn is_compilable_unit(source: &str, options: ParseOptions) -> bool {
    match parse_program(source, options) {
        Ok(_) => true,
        Err(err) => !err.at_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        parse_program(source, ParseOptions::new(1)).unwrap().0
    }

    #[test]
    fn test_semicolon_insertion() {
        let program = parse("var a = 1\nvar b = 2\nb");
        assert_eq!(program.body.len(), 3);
        assert_eq!(program.var_names, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_semicolon_on_same_line() {
        let err = parse_program("a b", ParseOptions::new(1)).unwrap_err();
        assert_eq!(err.message, "missing ; before statement");
        assert_eq!(err.location.offset, 2);
        assert!(!err.at_end);
    }

    #[test]
    fn test_compilable_unit() {
        let options = ParseOptions::new(1);
        assert!(is_compilable_unit("1+1\n", options));
        assert!(!is_compilable_unit("function f() {\n", options));
        assert!(!is_compilable_unit("f(1,\n", options));
        assert!(is_compilable_unit("}\n", options));
        assert!(is_compilable_unit("", options));
    }

    #[test]
    fn test_strict_redeclaration_warning() {
        let mut options = ParseOptions::new(1);
        let (_, warnings) = parse_program("var a; var a;", options).unwrap();
        assert!(warnings.is_empty());

        options.strict = true;
        let (_, warnings) = parse_program("var a; var a;", options).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "redeclaration of var a");
        assert!(warnings[0].strict);
    }
}
