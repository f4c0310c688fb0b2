//! Shell functions available to every script
//!
//! | Function | Behavior |
//! |---|---|
//! | `print(...)` | arguments joined by spaces, then a newline |
//! | `load(file...)` | runs each file in the global scope |
//! | `quit([code])` | stops the session, optionally setting the exit code |
//! | `gc()` | collects and prints heap statistics |
//! | `read(file)` | file contents, one character per byte |
//! | `version([n])` | the language version, optionally replacing it |

use crate::interpreter::{ErrorKind, HostCall, HostFunctionSpec, RuntimeError};
use crate::memory::value::Value;
use std::fs;
use std::io::Write;

pub const SHELL_FUNCTIONS: &[HostFunctionSpec] = &[
    HostFunctionSpec { name: "load", arity: 1, handler: load },
    HostFunctionSpec { name: "print", arity: 0, handler: print },
    HostFunctionSpec { name: "quit", arity: 0, handler: quit },
    HostFunctionSpec { name: "gc", arity: 0, handler: gc },
    HostFunctionSpec { name: "read", arity: 1, handler: read },
    HostFunctionSpec { name: "version", arity: 0, handler: version },
];

/// `std::io::Error` text without the trailing ` (os error N)`.
pub fn describe_io_error(err: &std::io::Error) -> String {
    let text = err.to_string();
    match text.find(" (os error ") {
        Some(index) => text[..index].to_string(),
        None => text,
    }
}

fn print(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let line: Vec<String> = call.args.iter().map(Value::to_display_string).collect();
    let out = call.host.output();
    let _ = writeln!(out, "{}", line.join(" "));
    let _ = out.flush();
    Ok(Value::Undefined)
}

fn load(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    for arg in call.args {
        let filename = arg.to_display_string();
        let bytes = match fs::read(&filename) {
            Ok(bytes) => bytes,
            Err(err) => {
                let message = format!("can't open {}: {}", filename, describe_io_error(&err));
                return Err(call.error(ErrorKind::Error, message));
            }
        };
        let source = String::from_utf8_lossy(&bytes);
        tracing::debug!(file = %filename, "loading");
        let script = call
            .runtime
            .compile_nested(&source, Some(filename.as_str()), 1, &mut *call.host)?;
        call.runtime.execute_nested(script, &mut *call.host)?;
    }
    Ok(Value::Undefined)
}

fn quit(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let code = match call.arg(0) {
        Value::Undefined => None,
        value => Some(value.to_int32()),
    };
    call.host.request_quit(code);
    Err(RuntimeError::Aborted)
}

/// Current program break, or 0 where there is no such thing.
fn program_break() -> usize {
    #[cfg(unix)]
    {
        unsafe { libc::sbrk(0) as usize }
    }
    #[cfg(not(unix))]
    {
        0
    }
}

fn gc(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let stats = call.runtime.gc();
    let out = call.host.output();
    let _ = writeln!(
        out,
        "before {}, after {}, break {:08x}",
        stats.before,
        stats.after,
        program_break()
    );
    let _ = out.flush();
    Ok(Value::Undefined)
}

fn read(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let filename = call.arg(0).to_display_string();
    match fs::read(&filename) {
        // One character per byte.
        Ok(bytes) => Ok(Value::from(
            bytes.iter().map(|&b| b as char).collect::<String>(),
        )),
        Err(err) => {
            let message = format!("can't open {}: {}", filename, describe_io_error(&err));
            Err(call.error(ErrorKind::Error, message))
        }
    }
}

fn version(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let previous = call.runtime.version();
    if let Value::Number(n) = call.arg(0) {
        call.runtime.set_version(u32::try_from(n as i64).unwrap_or(0));
    }
    Ok(Value::Number(previous as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_describe_io_error_strips_os_code() {
        let err = std::io::Error::from_raw_os_error(2);
        assert_eq!(describe_io_error(&err), "No such file or directory");
    }
}
