use std::fmt;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use gofix_span::{LineIndex, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

impl DiagnosticSeverity {
    fn report_kind(self) -> ReportKind<'static> {
        match self {
            DiagnosticSeverity::Error => ReportKind::Error,
            DiagnosticSeverity::Warning => ReportKind::Warning,
            DiagnosticSeverity::Info => ReportKind::Advice,
        }
    }

    fn color(self) -> Color {
        match self {
            DiagnosticSeverity::Error => Color::Red,
            DiagnosticSeverity::Warning => Color::Yellow,
            DiagnosticSeverity::Info => Color::Cyan,
        }
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        })
    }
}

/// A positioned message about a source file, rendered with ariadne.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub source_id: String,
    pub span: Span,
    pub message: String,
    pub suggestion: Option<String>,
    pub help: Option<String>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(
        severity: DiagnosticSeverity,
        source_id: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            source_id: source_id.into(),
            span,
            message: message.into(),
            suggestion: None,
            help: None,
            notes: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// `path:line:col: message`, the form printed by `gofix check`.
    pub fn short(&self, index: &LineIndex) -> String {
        let (line, col) = index.line_col(self.span.start as usize);
        format!("{}:{}:{}: {}", self.source_id, line, col, self.message)
    }

    /// Renders the diagnostic with a source excerpt.
    pub fn render(&self, source: &str, color: bool) -> String {
        let id = self.source_id.clone();
        let range = clamp(self.span, source.len());
        let mut label = Label::new((id.clone(), range.clone()));
        if let Some(suggestion) = &self.suggestion {
            label = label.with_message(suggestion);
        }
        if color {
            label = label.with_color(self.severity.color());
        }

        let mut report = Report::build(self.severity.report_kind(), id.clone(), range.start)
            .with_config(Config::default().with_color(color))
            .with_message(&self.message)
            .with_label(label);
        if let Some(help) = &self.help {
            report = report.with_help(help);
        }
        for note in &self.notes {
            report = report.with_note(note);
        }

        let mut out = Vec::new();
        if report
            .finish()
            .write((id, Source::from(source)), &mut out)
            .is_err()
        {
            return self.to_string();
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}: {}",
            self.severity, self.source_id, self.span, self.message
        )
    }
}

fn clamp(span: Span, len: usize) -> std::ops::Range<usize> {
    let start = (span.start as usize).min(len);
    let end = (span.end as usize).clamp(start, len);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form_uses_line_and_column() {
        let source = "package p\n\nfunc f() {}\n";
        let index = LineIndex::new(source);
        let diag = Diagnostic::new(
            DiagnosticSeverity::Error,
            "p/a.go",
            Span::new(16, 17),
            "something is wrong",
        );
        assert_eq!(diag.short(&index), "p/a.go:3:6: something is wrong");
    }

    #[test]
    fn test_render_includes_message_and_help() {
        let source = "package p\nvar x = )\n";
        let diag = Diagnostic::new(
            DiagnosticSeverity::Error,
            "a.go",
            Span::new(18, 19),
            "unexpected token",
        )
        .with_help("remove the parenthesis");
        let rendered = diag.render(source, false);
        assert!(rendered.contains("unexpected token"));
        assert!(rendered.contains("remove the parenthesis"));
    }
}
