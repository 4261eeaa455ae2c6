use thiserror::Error;

/// Errors that can occur during Matome core operations.
#[derive(Debug, Error)]
pub enum MatomeError {
    /// The input string is empty or contains only whitespace.
    #[error("input is empty or whitespace-only")]
    EmptyInput,

    /// An unknown summarization model identifier was requested.
    #[error("unsupported model {given:?}; supported models are {supported}")]
    UnsupportedModel {
        /// The identifier that was rejected.
        given: String,
        /// Comma-separated list of accepted identifiers.
        supported: String,
    },

    /// A label was encountered that is not part of the fixed vocabulary.
    #[error("unknown label {0:?}: not in the fixed vocabulary")]
    UnknownLabel(String),

    /// A label vector does not match the vocabulary width.
    #[error("label vector has length {got}, vocabulary has {expected} labels")]
    LabelWidthMismatch { got: usize, expected: usize },

    /// The model weights or config could not be loaded.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Tokenization failed.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The model inference failed.
    #[error("inference error: {0}")]
    Inference(String),

    /// Candle ML framework error.
    #[error("ML error: {0}")]
    Candle(#[from] candle_core::Error),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),
}

/// Result type alias for Matome operations.
pub type Result<T> = std::result::Result<T, MatomeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = MatomeError::EmptyInput;
        assert_eq!(err.to_string(), "input is empty or whitespace-only");

        let err = MatomeError::UnsupportedModel {
            given: "xyz".into(),
            supported: "t5-small, flan-t5-small".into(),
        };
        assert!(err.to_string().contains("xyz"));
        assert!(err.to_string().contains("t5-small"));
        assert!(err.to_string().contains("flan-t5-small"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MatomeError>();
    }
}
