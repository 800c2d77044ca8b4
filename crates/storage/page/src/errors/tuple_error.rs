use binary_helpers::bin_error::BinaryError;
use thiserror::Error;

/// Errors raised while constructing or (de)serializing a tuple.
#[derive(Debug, Error)]
pub enum TupleError {
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },
    #[error("field {index} does not match the declared field type")]
    FieldTypeMismatch { index: usize },
    #[error("text value of {len} bytes exceeds the {capacity}-byte field capacity")]
    TextTooLong { len: usize, capacity: usize },
    #[error("text field holds invalid utf-8")]
    InvalidText(#[from] std::string::FromUtf8Error),
    #[error("error while interpreting binary data")]
    Binary(#[from] BinaryError),
}
