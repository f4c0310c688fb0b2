//! Script source parser
//!
//! This module transforms script text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST), compilable-unit detection
//! - [`ast`]: AST node definitions
//!
//! # Supported Language Subset
//!
//! - Values: numbers, strings, booleans, `null`, arrays, object literals, functions
//! - Statements: `var`/`let`/`const`, `if`, `while`, `do`/`while`, `for`,
//!   `break`, `continue`, `return`, `throw`, `try`/`catch`/`finally`
//! - Expressions: arithmetic, comparison, logical, bitwise (including `>>>`),
//!   ternary, assignment and compound assignment, calls, member access
//! - Automatic semicolon insertion at line breaks, `}` and end of input
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{is_compilable_unit, parse_program, ParseError, ParseOptions, ParseWarning};
