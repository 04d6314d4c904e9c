use thiserror::Error;

/// Errors raised while decoding or encoding a wire payload.
///
/// A small closed enum with one variant per failure mode instead of a
/// string-only error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("truncated payload: expected at least {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("unknown value tag: {0:#04x}")]
    UnknownTag(u8),

    #[error("invalid action code: {0}")]
    UnknownAction(u8),

    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    #[error("field '{field}' has the wrong type: expected {expected}, got {got}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("request failed validation: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
