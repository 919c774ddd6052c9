use chumsky::error::SimpleReason;
use chumsky::prelude::Simple;
use gofix_lexer::{LexerError, TokenKind};
use gofix_span::Span;
use gofix_utils::errors::{Diagnostic, DiagnosticSeverity};
use std::error::Error;
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct ParserError {
    pub message: String,
    pub span: Span,
}

impl ParserError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn to_diagnostic(&self, source_id: &str) -> Diagnostic {
        let mut diag = Diagnostic::new(
            DiagnosticSeverity::Error,
            source_id,
            self.span,
            self.message.clone(),
        );

        if self.message.contains("unexpected token") {
            diag = diag
                .with_suggestion("Check for missing or extra tokens")
                .with_help("Generic declarations and select statements are not supported.");
        } else if self.message.contains("unexpected end of input") {
            diag = diag
                .with_suggestion("Check for missing closing brackets, parentheses, or quotes")
                .with_help("The parser reached the end of the file while expecting more tokens.");
        }

        diag
    }
}

impl From<Simple<TokenKind>> for ParserError {
    fn from(value: Simple<TokenKind>) -> Self {
        let span_range = value.span();
        let span = Span::new(span_range.start, span_range.end);
        if let SimpleReason::Custom(message) = value.reason() {
            return Self::new(message.clone(), span);
        }
        let mut expected: Vec<String> = value
            .expected()
            .filter_map(|token| token.as_ref().map(|token| format!("'{token}'")))
            .collect();
        expected.sort();
        let message = match value.found() {
            Some(found) if expected.is_empty() => format!("unexpected token: '{found}'"),
            Some(found) => format!(
                "unexpected token: '{found}', expected {}",
                expected.join(" or ")
            ),
            None => "unexpected end of input".to_string(),
        };
        Self { message, span }
    }
}

impl From<LexerError> for ParserError {
    fn from(value: LexerError) -> Self {
        Self::new(value.to_string(), value.span())
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParserError at {}: {}", self.span, self.message)
    }
}

impl Error for ParserError {}
