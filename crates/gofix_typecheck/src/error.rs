use gofix_parser::ParserError;
use gofix_span::{FileId, Pos};
use thiserror::Error;

/// A problem found while loading or checking a program.
///
/// Checking continues past every error; the affected expressions are given
/// the invalid type.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("{path}: {error}")]
    Parse {
        path: String,
        file: Option<FileId>,
        error: ParserError,
    },
    #[error("undefined: {name}")]
    Undefined { name: String, pos: Pos },
    #[error("{name} redeclared in this block")]
    Redeclared { name: String, pos: Pos },
    #[error("{name} is not a type")]
    NotAType { name: String, pos: Pos },
    #[error("invalid recursive type or initialization cycle involving {name}")]
    Cycle { name: String, pos: Pos },
    #[error("import cycle not allowed: {path}")]
    ImportCycle { path: String },
    #[error("{message}")]
    Invalid { message: String, pos: Pos },
}

impl CheckError {
    pub fn pos(&self) -> Option<Pos> {
        match self {
            CheckError::Parse { file, error, .. } => {
                file.map(|file| Pos::new(file, error.span.start))
            }
            CheckError::Undefined { pos, .. }
            | CheckError::Redeclared { pos, .. }
            | CheckError::NotAType { pos, .. }
            | CheckError::Cycle { pos, .. }
            | CheckError::Invalid { pos, .. } => Some(*pos),
            CheckError::ImportCycle { .. } => None,
        }
    }

    pub(crate) fn invalid(pos: Pos, message: impl Into<String>) -> Self {
        CheckError::Invalid {
            message: message.into(),
            pos,
        }
    }
}
