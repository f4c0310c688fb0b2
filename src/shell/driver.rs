//! The execution driver
//!
//! [`Shell`] ties a [`Session`] to a [`Runtime`]: it applies command-line
//! actions in order, runs script files, and runs the interactive loop.

use super::args::{parse_arguments, Action};
use super::builtins::{describe_io_error, SHELL_FUNCTIONS};
use super::constants::{
    usage_text, CONTINUATION_PROMPT, EXIT_FILE_NOT_FOUND, EXIT_USAGE, INTERACTIVE_FILENAME,
    LINE_BUFFER_SIZE, PROMPT,
};
use super::session::Session;
use super::source::{read_line_bounded, SourceReader};
use crate::interpreter::{DiagnosticReport, Runtime};
use crate::memory::value::Value;
use crate::native::BRIDGE_FUNCTIONS;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

pub struct Shell {
    session: Session,
    runtime: Runtime,
    /// Standard input: the interactive prompt and the `-` script.
    input: Box<dyn BufRead>,
}

impl Shell {
    /// A shell reading from the process's standard input.
    pub fn new(session: Session) -> Self {
        Shell::with_input(session, Box::new(io::stdin().lock()))
    }

    pub fn with_input(session: Session, input: Box<dyn BufRead>) -> Self {
        let mut runtime = Runtime::new();
        runtime.define_functions(SHELL_FUNCTIONS);
        runtime.define_functions(BRIDGE_FUNCTIONS);
        Shell {
            session,
            runtime,
            input,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Runs a whole command line and returns the process exit code.
    pub fn run(&mut self, args: &[String]) -> i32 {
        let invocation = match parse_arguments(args) {
            Ok(invocation) => invocation,
            Err(err) => {
                tracing::debug!(%err, "usage error");
                let err_stream = self.session.err();
                let _ = err_stream.write_all(usage_text().as_bytes());
                let _ = err_stream.flush();
                return EXIT_USAGE;
            }
        };

        let script_args = invocation
            .script_args
            .iter()
            .map(|arg| Value::from(arg.as_str()))
            .collect();
        let arguments = self.runtime.new_array(script_args);
        self.runtime.define_global("arguments", arguments);

        for action in &invocation.actions {
            self.apply(action);
        }

        if let Some(filename) = &invocation.filename {
            self.run_unit(Some(filename.as_str()));
        } else if invocation.interactive() {
            self.run_interactive();
        }
        self.session.exit_code()
    }

    fn apply(&mut self, action: &Action) {
        tracing::debug!(?action, "applying option");
        match action {
            Action::SetVersion(version) => {
                self.runtime.set_version(*version);
            }
            Action::Warnings(enabled) => self.session.set_report_warnings(*enabled),
            Action::ToggleStrict => {
                self.runtime.toggle_strict();
            }
            Action::Seal => {
                self.runtime.seal_global();
            }
            Action::ChunkSize(size) => self.runtime.set_stack_chunk_size(*size),
            Action::BranchLimit(limit) => {
                self.session.guard_mut().set_branch_limit(*limit);
                self.runtime.set_branch_callback(true);
            }
            Action::RunFile(filename) => self.run_unit(Some(filename.as_str())),
            Action::MaxStack(size) => self.session.guard_mut().set_max_stack_size(*size),
        }
    }

    fn read_unit(&mut self, filename: Option<&str>) -> io::Result<String> {
        match filename {
            None | Some("-") => {
                let mut reader = SourceReader::new(&mut self.input);
                reader.skip_shebang()?;
                reader.read_to_string()
            }
            Some(path) => {
                let mut reader = SourceReader::new(BufReader::new(File::open(path)?));
                reader.skip_shebang()?;
                reader.read_to_string()
            }
        }
    }

    /// Compiles and runs one script file; `None` or `-` is standard input.
    /// Failures are reported, never returned.
    pub fn run_unit(&mut self, filename: Option<&str>) {
        let source = match self.read_unit(filename) {
            Ok(source) => source,
            Err(err) => {
                let name = filename.unwrap_or("-");
                let message = format!("can't open {}: {}", name, describe_io_error(&err));
                self.session.report(&DiagnosticReport::error(message));
                self.session.set_exit_code(EXIT_FILE_NOT_FOUND);
                return;
            }
        };
        tracing::debug!(file = filename, bytes = source.len(), "running unit");

        self.runtime
            .set_stack_limit(self.session.guard().stack_limit());
        let Ok(script) = self
            .runtime
            .compile(&source, filename, 1, &mut self.session)
        else {
            return;
        };
        let _ = self.runtime.execute(script, &mut self.session);
    }

    /// Read-compile-execute loop on standard input.
    pub fn run_interactive(&mut self) {
        self.runtime
            .set_stack_limit(self.session.guard().stack_limit());
        let mut line_number = 0;

        loop {
            let start_line = line_number + 1;
            let mut bytes = Vec::new();
            let mut buffer = String::new();
            let mut hit_eof = false;

            loop {
                let prompt = if buffer.is_empty() {
                    PROMPT
                } else {
                    CONTINUATION_PROMPT
                };
                let out = self.session.out();
                let _ = out.write_all(prompt.as_bytes());
                let _ = out.flush();

                match read_line_bounded(&mut self.input, LINE_BUFFER_SIZE) {
                    Ok(Some(line)) => {
                        bytes.extend_from_slice(&line);
                        buffer = String::from_utf8_lossy(&bytes).into_owned();
                        line_number += 1;
                    }
                    Ok(None) => {
                        hit_eof = true;
                        break;
                    }
                    Err(err) => {
                        tracing::debug!(%err, "interactive read failed");
                        hit_eof = true;
                        break;
                    }
                }
                // A piece cut inside a multi-byte character is never a whole unit.
                let split_char =
                    matches!(std::str::from_utf8(&bytes), Err(err) if err.error_len().is_none());
                if !split_char && self.runtime.is_compilable_unit(&buffer) {
                    break;
                }
            }

            if let Ok(script) = self.runtime.compile(
                &buffer,
                Some(INTERACTIVE_FILENAME),
                start_line,
                &mut self.session,
            ) {
                if let Ok(result) = self.runtime.execute(script, &mut self.session) {
                    if !result.is_undefined() {
                        let out = self.session.out();
                        let _ = writeln!(out, "{}", result.to_display_string());
                        let _ = out.flush();
                    }
                }
            }

            if hit_eof || self.session.is_quitting() {
                break;
            }
        }

        let out = self.session.out();
        let _ = out.write_all(b"\n");
        let _ = out.flush();
    }
}
