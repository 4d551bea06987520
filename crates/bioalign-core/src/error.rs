use thiserror::Error;

/// Errors that can occur during bioalign operations.
///
/// Only conditions that invalidate a whole file or batch are errors. A bad
/// span or an unalignable prediction is reported as a rejection value next
/// to the result instead.
#[derive(Debug, Error)]
pub enum BioalignError {
    /// Reading or writing a corpus file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON record, container line or configuration could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    RegexError(#[from] regex::Error),

    /// Gold and predicted label sequences differ in length at `index`.
    #[error("label sequence {index} has {gold} gold tags but {predicted} predicted tags")]
    LengthMismatch {
        /// Position of the offending sequence in the batch.
        index: usize,
        /// Gold sequence length.
        gold: usize,
        /// Predicted sequence length.
        predicted: usize,
    },

    /// Gold and predicted batches hold a different number of sequences.
    #[error("batch has {gold} gold sequences but {predicted} predicted sequences")]
    SequenceCountMismatch {
        /// Number of gold sequences.
        gold: usize,
        /// Number of predicted sequences.
        predicted: usize,
    },

    /// A corpus line could not be split into a token and a tag.
    #[error("malformed corpus line {line}: {content:?}")]
    MalformedLine {
        /// One-based line number.
        line: usize,
        /// The raw line content.
        content: String,
    },

    /// A tag string is not `O`, `B-<label>` or `I-<label>`.
    #[error("unknown tag: {0:?}")]
    UnknownTag(String),

    /// An integer tag index has no entry in the tag set.
    #[error("tag index {index} out of range for tag set of {len} tags")]
    TagIndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Size of the tag set.
        len: usize,
    },

    /// A pre-tokenized record carries a different number of tokens and tags.
    #[error("record has {tokens} tokens but {tags} tags")]
    TokenTagCountMismatch {
        /// Token count.
        tokens: usize,
        /// Tag count.
        tags: usize,
    },

    /// A pre-tokenized record holds an empty token, which no tag can be kept on.
    #[error("token {index} is empty")]
    EmptyToken {
        /// Position of the token in the record.
        index: usize,
    },

    /// A sub-word piece could not be located in its sentence.
    #[error("token {token:?} not found after char offset {offset}")]
    TokenNotFound {
        /// The raw piece that was searched for.
        token: String,
        /// Char offset the search started at.
        offset: usize,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for bioalign operations.
pub type Result<T> = std::result::Result<T, BioalignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = BioalignError::LengthMismatch {
            index: 3,
            gold: 5,
            predicted: 4,
        };
        assert_eq!(
            err.to_string(),
            "label sequence 3 has 5 gold tags but 4 predicted tags"
        );

        let err = BioalignError::MalformedLine {
            line: 12,
            content: "lonely".into(),
        };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("lonely"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.txt");
        let err: BioalignError = io.into();
        assert!(matches!(err, BioalignError::Io(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BioalignError>();
    }
}
