//! Rendering of diagnostic reports for the error stream
//!
//! A report renders as
//!
//! ```text
//! file:line: [strict ]warning: message:
//! file:line: <source line>
//! file:line: ......^
//! ```
//!
//! Each part of the prefix is present only when known. Without a source line
//! the message is simply terminated by a newline.

use crate::interpreter::{DiagnosticReport, Severity};
use std::fmt::Write;

pub fn prefix(report: &DiagnosticReport) -> String {
    let mut prefix = String::new();
    if let Some(filename) = &report.filename {
        prefix.push_str(filename);
        prefix.push(':');
    }
    if report.line != 0 {
        let _ = write!(prefix, "{}: ", report.line);
    }
    match report.severity {
        Severity::Warning => prefix.push_str("warning: "),
        Severity::StrictWarning => prefix.push_str("strict warning: "),
        Severity::Error => {}
    }
    prefix
}

pub fn render(report: &DiagnosticReport) -> String {
    let prefix = prefix(report);
    let mut out = String::new();

    // Every embedded line gets its own prefix.
    let mut message = report.message.as_str();
    while let Some(newline) = message.find('\n') {
        out.push_str(&prefix);
        out.push_str(&message[..=newline]);
        message = &message[newline + 1..];
    }
    out.push_str(&prefix);
    out.push_str(message);

    let Some(line_buffer) = &report.line_buffer else {
        out.push('\n');
        return out;
    };

    out.push_str(":\n");
    out.push_str(&prefix);
    out.push_str(line_buffer);
    if !line_buffer.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&prefix);
    out.push_str(&caret_line(line_buffer, report.token_offset));
    out
}

/// One `.` per column before the token, tabs advancing to the next multiple
/// of 8, then `^` and a newline.
pub fn caret_line(line_buffer: &str, token_offset: usize) -> String {
    let mut end = token_offset.min(line_buffer.len());
    while !line_buffer.is_char_boundary(end) {
        end -= 1;
    }

    let mut caret = String::new();
    let mut column = 0;
    for c in line_buffer[..end].chars() {
        let next = if c == '\t' { (column + 8) & !7 } else { column + 1 };
        while column < next {
            caret.push('.');
            column += 1;
        }
    }
    caret.push_str("^\n");
    caret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_line_plain() {
        assert_eq!(caret_line("var x = ;\n", 8), "........^\n");
        assert_eq!(caret_line("x", 0), "^\n");
    }

    #[test]
    fn test_caret_line_tabs() {
        assert_eq!(caret_line("\tx", 1), "........^\n");
        assert_eq!(caret_line("ab\tc", 3), "........^\n");
        assert_eq!(caret_line("\t\tc", 2), "................^\n");
    }

    #[test]
    fn test_render_without_line_buffer() {
        let report = DiagnosticReport::error("can't open nope.js: No such file or directory");
        assert_eq!(
            render(&report),
            "can't open nope.js: No such file or directory\n"
        );
    }

    #[test]
    fn test_render_with_source() {
        let report = DiagnosticReport::error("syntax error")
            .at(Some("a.js"), 2)
            .with_source("x = 1;\ny = ;\n", 11);
        assert_eq!(
            render(&report),
            "a.js:2: syntax error:\na.js:2: y = ;\na.js:2: ....^\n"
        );
    }

    #[test]
    fn test_render_strict_warning_with_embedded_newline() {
        let report = DiagnosticReport::warning("first\nsecond", true).at(Some("w.js"), 4);
        assert_eq!(
            render(&report),
            "w.js:4: strict warning: first\nw.js:4: strict warning: second\n"
        );
    }

    #[test]
    fn test_render_source_line_without_newline() {
        let report = DiagnosticReport::error("missing ) after argument list")
            .at(Some("typein"), 1)
            .with_source("f(", 2);
        assert_eq!(
            render(&report),
            "typein:1: missing ) after argument list:\ntypein:1: f(\ntypein:1: ..^\n"
        );
    }
}
