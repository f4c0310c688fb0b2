//! The embedding seam between the engine and its host
//!
//! The engine never writes to a terminal or decides an exit code itself.
//! Everything observable goes through [`Host`]: diagnostics, loop back-edge
//! notifications, script output and quit requests. Native functions are
//! plain `fn` pointers receiving a [`HostCall`].

use crate::interpreter::engine::Runtime;
use crate::interpreter::errors::{ErrorKind, RuntimeError};
use crate::interpreter::report::DiagnosticReport;
use crate::memory::value::Value;
use std::io::Write;
use std::rc::Rc;

/// Where a loop back-edge happened.
#[derive(Debug, Clone, Copy)]
pub struct BranchSite<'a> {
    pub filename: Option<&'a str>,
    pub line: usize,
}

/// The host's answer to a back-edge notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchAction {
    Continue,
    /// Continue after an opportunistic collection.
    Collect,
    /// Stop execution without a script-visible exception.
    Abort,
}

pub trait Host {
    /// Receives every compile error, uncaught exception and warning.
    fn report(&mut self, report: &DiagnosticReport);

    /// Called on every loop back-edge while the branch callback is enabled.
    fn on_branch(&mut self, site: &BranchSite<'_>) -> BranchAction;

    /// Stream receiving script output.
    fn output(&mut self) -> &mut dyn Write;

    /// Records a request to stop the session, optionally with an exit code.
    fn request_quit(&mut self, exit_code: Option<i32>);
}

/// Signature of every native function.
pub type HostFn = fn(&mut HostCall<'_>) -> Result<Value, RuntimeError>;

/// A named native function with its declared arity.
#[derive(Clone, Copy)]
pub struct HostFunctionSpec {
    pub name: &'static str,
    pub arity: u32,
    pub handler: HostFn,
}

/// Arguments and context of one native call.
pub struct HostCall<'a> {
    pub runtime: &'a mut Runtime,
    pub host: &'a mut dyn Host,
    pub args: &'a [Value],
    /// Unit and line of the calling script code.
    pub filename: Option<Rc<str>>,
    pub line: usize,
}

impl HostCall<'_> {
    /// Argument `index`, or `undefined` when absent.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Builds a script-visible exception of the given kind.
    pub fn error(&mut self, kind: ErrorKind, message: impl Into<String>) -> RuntimeError {
        let value = self.runtime.make_error(kind, &message.into());
        RuntimeError::Thrown {
            value,
            filename: self.filename.clone(),
            line: self.line,
        }
    }
}
