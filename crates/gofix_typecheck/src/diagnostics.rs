use gofix_span::Span;
use gofix_utils::errors::{Diagnostic, DiagnosticSeverity};

use crate::error::CheckError;
use crate::program::Program;

/// Converts checker errors into diagnostics attributed to their files.
pub fn from_check_errors(program: &Program, errors: &[CheckError]) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|error| match error {
            CheckError::Parse { path, error, .. } => error.to_diagnostic(path),
            other => {
                let (source_id, span) = match other.pos() {
                    Some(pos) => (
                        program.file(pos.file).path.clone(),
                        Span::point(pos.offset as usize),
                    ),
                    None => (String::new(), Span::default()),
                };
                let diagnostic =
                    Diagnostic::new(DiagnosticSeverity::Error, source_id, span, other.to_string());
                match other {
                    CheckError::Undefined { .. } => {
                        diagnostic.with_help("Check the spelling and that the package is imported.")
                    }
                    CheckError::ImportCycle { .. } => {
                        diagnostic.with_note("Packages on an import cycle are checked without their dependencies.")
                    }
                    _ => diagnostic,
                }
            }
        })
        .collect()
}
