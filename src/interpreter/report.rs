//! Diagnostic reports handed to the embedder
//!
//! Every compile error, uncaught exception and warning reaches the host as a
//! [`DiagnosticReport`]. Formatting is the host's business.

/// Severity of a report. Warnings never change the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    StrictWarning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub message: String,
    pub filename: Option<String>,
    /// 0 when no line is known.
    pub line: usize,
    /// Source line containing the offending token, with its terminator.
    pub line_buffer: Option<String>,
    /// Byte offset of the offending token within `line_buffer`.
    pub token_offset: usize,
    pub severity: Severity,
}

impl DiagnosticReport {
    pub fn error(message: impl Into<String>) -> Self {
        DiagnosticReport {
            message: message.into(),
            filename: None,
            line: 0,
            line_buffer: None,
            token_offset: 0,
            severity: Severity::Error,
        }
    }

    pub fn warning(message: impl Into<String>, strict: bool) -> Self {
        DiagnosticReport {
            severity: if strict {
                Severity::StrictWarning
            } else {
                Severity::Warning
            },
            ..DiagnosticReport::error(message)
        }
    }

    pub fn at(mut self, filename: Option<&str>, line: usize) -> Self {
        self.filename = filename.map(str::to_string);
        self.line = line;
        self
    }

    /// Attaches the source line containing byte `offset` of `source`.
    pub fn with_source(mut self, source: &str, offset: usize) -> Self {
        let offset = floor_char_boundary(source, offset.min(source.len()));
        let start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
        let end = source[offset..]
            .find('\n')
            .map_or(source.len(), |i| offset + i + 1);
        self.line_buffer = Some(source[start..end].to_string());
        self.token_offset = offset - start;
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity != Severity::Error
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_extraction() {
        let source = "var a = 1;\nvar b = ;\nvar c;\n";
        let report = DiagnosticReport::error("syntax error").with_source(source, 19);
        assert_eq!(report.line_buffer.as_deref(), Some("var b = ;\n"));
        assert_eq!(report.token_offset, 8);
    }

    #[test]
    fn test_line_buffer_at_end_of_source() {
        let report = DiagnosticReport::error("x").with_source("f(", 2);
        assert_eq!(report.line_buffer.as_deref(), Some("f("));
        assert_eq!(report.token_offset, 2);
    }
}
