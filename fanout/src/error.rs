//! Error types for the fan-out core.

use std::fmt;

use crate::UserId;

/// Errors raised by the fan-out core.
///
/// Every variant is local to the call that produced it: an error while
/// processing one log record never affects another record, chat or
/// subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid or missing input, either on a Subscribe call or inside an
    /// inbound record. Surfaced to the caller or logged and skipped; never
    /// retried.
    Input(String),

    /// A referenced chat or connection does not exist.
    NotFound(String),

    /// Writing to one subscriber's stream failed. Terminates only that session.
    Transport(String),

    /// A log record could not be decoded. The record is dropped.
    Decode(messages::Error),

    /// The session's queue overflowed under the disconnect policy and the
    /// engine evicted it.
    Evicted(UserId),

    /// The durable log rejected an append or commit.
    Log(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Input(msg) => write!(f, "Invalid input: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::Decode(err) => write!(f, "Decode error: {}", err),
            Error::Evicted(user_id) => {
                write!(f, "Slow consumer evicted: {}", user_id)
            }
            Error::Log(msg) => write!(f, "Message log error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Decode(err) => Some(err),
            _ => None,
        }
    }
}

// Content problems in a readable record are input errors; unreadable payloads
// are decode errors.
impl From<messages::Error> for Error {
    fn from(err: messages::Error) -> Self {
        if err.is_validation() {
            Error::Input(err.to_string())
        } else {
            Error::Decode(err)
        }
    }
}
