//! Per-process shell state
//!
//! The [`Session`] owns the output and error streams, the exit code, the
//! quit flag and the [`Guard`]. It is the engine's [`Host`].

use super::constants::EXIT_RUNTIME_ERROR;
use super::diagnostics;
use super::guard::{BranchTick, Guard};
use crate::interpreter::{BranchAction, BranchSite, DiagnosticReport, Host};
use std::io::{self, Write};

pub struct Session {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    exit_code: i32,
    quitting: bool,
    report_warnings: bool,
    guard: Guard,
}

impl Session {
    /// A session on the process's stdout and stderr.
    pub fn stdio(stack_base: usize) -> Self {
        Session::new(Box::new(io::stdout()), Box::new(io::stderr()), stack_base)
    }

    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>, stack_base: usize) -> Self {
        Session {
            out,
            err,
            exit_code: 0,
            quitting: false,
            report_warnings: true,
            guard: Guard::new(stack_base),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = code;
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    pub fn report_warnings(&self) -> bool {
        self.report_warnings
    }

    pub fn set_report_warnings(&mut self, enabled: bool) {
        self.report_warnings = enabled;
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut Guard {
        &mut self.guard
    }

    pub fn out(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    pub fn err(&mut self) -> &mut dyn Write {
        self.err.as_mut()
    }

    /// Writes `report` to the error stream. Warnings are dropped while
    /// warning reporting is off; anything else sets the exit code.
    pub fn report(&mut self, report: &DiagnosticReport) {
        if report.is_warning() && !self.report_warnings {
            return;
        }
        let text = diagnostics::render(report);
        let _ = self.err.write_all(text.as_bytes());
        let _ = self.err.flush();
        if !report.is_warning() {
            self.exit_code = EXIT_RUNTIME_ERROR;
        }
    }
}

impl Host for Session {
    fn report(&mut self, report: &DiagnosticReport) {
        Session::report(self, report);
    }

    fn on_branch(&mut self, site: &BranchSite<'_>) -> BranchAction {
        match self.guard.tick() {
            BranchTick::Continue => BranchAction::Continue,
            BranchTick::Collect => BranchAction::Collect,
            BranchTick::LimitReached => {
                tracing::debug!(
                    file = site.filename,
                    line = site.line,
                    limit = self.guard.branch_limit(),
                    "branch limit reached"
                );
                let report =
                    DiagnosticReport::error("script branches too much").at(site.filename, site.line);
                Session::report(self, &report);
                BranchAction::Abort
            }
        }
    }

    fn output(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    fn request_quit(&mut self, exit_code: Option<i32>) {
        if let Some(code) = exit_code {
            self.exit_code = code;
        }
        self.quitting = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    fn session() -> (Session, SharedBuffer) {
        let err = SharedBuffer::default();
        let session = Session::new(Box::new(io::sink()), Box::new(err.clone()), 0);
        (session, err)
    }

    #[test]
    fn test_warnings_keep_exit_code() {
        let (mut session, err) = session();
        session.report(&DiagnosticReport::warning("careful", false));
        assert_eq!(session.exit_code(), 0);
        assert_eq!(err.text(), "warning: careful\n");

        session.report(&DiagnosticReport::error("boom"));
        assert_eq!(session.exit_code(), EXIT_RUNTIME_ERROR);
    }

    #[test]
    fn test_suppressed_warnings() {
        let (mut session, err) = session();
        session.set_report_warnings(false);
        session.report(&DiagnosticReport::warning("hidden", true));
        assert!(err.text().is_empty());
    }

    #[test]
    fn test_branch_limit_reports_and_aborts() {
        let (mut session, err) = session();
        session.guard_mut().set_branch_limit(2);
        let site = BranchSite {
            filename: Some("loop.js"),
            line: 3,
        };
        assert_eq!(session.on_branch(&site), BranchAction::Continue);
        assert_eq!(session.on_branch(&site), BranchAction::Abort);
        assert_eq!(err.text(), "loop.js:3: script branches too much\n");
        assert_eq!(session.exit_code(), EXIT_RUNTIME_ERROR);
        assert_eq!(session.guard().branch_count(), 0);
    }

    #[test]
    fn test_request_quit() {
        let (mut session, _) = session();
        session.request_quit(None);
        assert!(session.is_quitting());
        assert_eq!(session.exit_code(), 0);
        session.request_quit(Some(7));
        assert_eq!(session.exit_code(), 7);
    }
}
