//! Runtime error types for the script engine
//!
//! This module defines [`RuntimeError`], the abrupt completion of script
//! evaluation, and [`ErrorKind`], the classes of error objects the engine
//! creates for scripts to catch.
//!
//! Only [`RuntimeError::Thrown`] is visible to scripts. [`RuntimeError::Aborted`]
//! unwinds everything, skipping `catch` and `finally`; whoever aborted has
//! already told the host why.

use crate::memory::value::Value;
use std::rc::Rc;
use thiserror::Error;

/// Built-in error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    ReferenceError,
    SyntaxError,
    RangeError,
    InternalError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

/// Abrupt termination of script evaluation
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// A script-visible exception.
    #[error("uncaught exception: {}", .value.to_display_string())]
    Thrown {
        value: Value,
        filename: Option<Rc<str>>,
        /// 0 until the evaluator attaches the line that raised it.
        line: usize,
    },

    /// Execution stopped by the host (branch limit, `quit`).
    #[error("execution aborted")]
    Aborted,
}

impl RuntimeError {
    /// An exception with no position yet.
    pub fn thrown(value: Value) -> Self {
        RuntimeError::Thrown {
            value,
            filename: None,
            line: 0,
        }
    }

    /// Attaches a position to an exception that lacks one.
    pub fn located(self, filename: Option<&Rc<str>>, at_line: usize) -> Self {
        match self {
            RuntimeError::Thrown {
                value,
                filename: None,
                line: 0,
            } => RuntimeError::Thrown {
                value,
                filename: filename.cloned(),
                line: at_line,
            },
            other => other,
        }
    }

    pub fn is_catchable(&self) -> bool {
        matches!(self, RuntimeError::Thrown { .. })
    }
}
