//! Script execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: [`Runtime`] (globals, heap, options) and the tree-walking evaluator
//! - [`host`]: the [`Host`] trait through which the engine talks to its embedder
//! - [`errors`]: runtime error types
//! - [`report`]: diagnostics handed to the host
//!
//! # Execution Model
//!
//! A unit is compiled into a [`Script`] and then executed in the global
//! scope. Loop back-edges notify the host (when enabled) so it can count
//! branches, trigger collections or abort the run.
//!
//! # Built-in Functions
//!
//! The standard globals (`String`, `Math`, `parseInt`, ...) live in
//! `builtins`; shell functions such as `print` are registered by the
//! embedder through [`Runtime::define_functions`].

mod builtins;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
pub mod host;
mod jumps;
mod loops;
pub mod report;
mod statements;

pub use engine::{Runtime, Script};
pub use errors::{ErrorKind, RuntimeError};
pub use host::{BranchAction, BranchSite, Host, HostCall, HostFn, HostFunctionSpec};
pub use report::{DiagnosticReport, Severity};
