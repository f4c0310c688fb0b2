//! # Introduction
//!
//! minjs is a small script shell. It embeds a tree-walking engine for a
//! JavaScript subset and exposes host capabilities to scripts: running files,
//! an interactive prompt, diagnostics with source carets, and a raw native
//! bridge that calls native functions by address and reads or writes process
//! memory.
//!
//! ## Execution pipeline
//!
//! ```text
//! Arguments → Shell → Source → Lexer → Parser → AST → Runtime ⇄ Host (Session)
//! ```
//!
//! 1. [`shell`]: parses the command line into ordered actions, reads units
//!    from files or the prompt, renders diagnostics, and enforces the branch
//!    and stack limits.
//! 2. [`parser`]: tokenises the source and builds an AST.
//! 3. [`interpreter`]: compiles and executes units; reaches the embedder
//!    only through the [`interpreter::Host`] trait.
//! 4. [`memory`]: runtime values, objects, scopes and the collected heap.
//! 5. [`native`]: unsafe native calls and raw memory access for scripts.
//!
//! ## Supported language subset
//!
//! Values: `undefined`, `null`, booleans, numbers, strings, objects, arrays,
//! closures.
//! Statements: `var`/`let`/`const`, `function`, `if/else`, `while`,
//! `do-while`, `for`, `break`, `continue`, `return`, `throw`,
//! `try/catch/finally`.
//! Not supported: `this`, `new`, prototypes, `switch`, `for-in`, regular
//! expressions.

pub mod interpreter;
pub mod memory;
pub mod native;
pub mod parser;
pub mod shell;
