use std::path::PathBuf;

use bioalign_core::BioalignError;
use thiserror::Error;

/// Errors raised while reading or writing corpus files.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Tag, alignment or record errors from the core crate.
    #[error(transparent)]
    Core(#[from] BioalignError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file is empty or its first line is not a container header.
    #[error("{path} is not a document container")]
    MissingHeader { path: PathBuf },

    /// The container header names another format or a newer version.
    #[error("{path}: unsupported container {format:?} version {version}")]
    UnsupportedContainer {
        path: PathBuf,
        format: String,
        version: u32,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CorpusError {
    /// One-based line number for errors tied to a corpus line.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Core(BioalignError::MalformedLine { line, .. }) => Some(*line),
            _ => None,
        }
    }
}

/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_pass_through() {
        let err: CorpusError = BioalignError::MalformedLine {
            line: 7,
            content: "x".into(),
        }
        .into();
        assert_eq!(err.line(), Some(7));
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn test_header_messages() {
        let err = CorpusError::UnsupportedContainer {
            path: PathBuf::from("train1.docbin"),
            format: "other".into(),
            version: 9,
        };
        assert!(err.to_string().contains("train1.docbin"));
        assert_eq!(err.line(), None);
    }
}
