//! Error types for message decoding and validation.

use std::fmt;

/// Errors raised while turning log payloads into messages, or messages into
/// log payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The payload is not a well-formed record of any known schema.
    /// Such records are dropped by the consumer and never retried.
    Decode(String),

    /// The payload declares a schema version this build does not understand.
    UnsupportedVersion(u32),

    /// A required field is empty or absent.
    MissingField(&'static str),

    /// The message could not be serialized for the log.
    Encode(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Decode(msg) => write!(f, "Malformed message record: {}", msg),
            Error::UnsupportedVersion(version) => {
                write!(f, "Unsupported message schema version: {}", version)
            }
            Error::MissingField(field) => write!(f, "Missing required field: {}", field),
            Error::Encode(msg) => write!(f, "Failed to encode message record: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether this error came from the content of an otherwise readable
    /// record, as opposed to an unreadable payload.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingField(_))
    }
}

