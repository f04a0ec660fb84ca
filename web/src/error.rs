use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use fanout::Error as FanOutError;
use messages::Error as MessageError;

pub type Result<T> = core::result::Result<T, Error>;

/// Failure of a request handler, rendered as an HTTP status.
#[derive(Debug)]
pub enum Error {
    FanOut(FanOutError),
    Message(MessageError),
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::FanOut(e) => Some(e),
            Error::Message(e) => Some(e),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        match self {
            Error::FanOut(e) => write!(fmt, "{e}"),
            Error::Message(e) => write!(fmt, "{e}"),
        }
    }
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::FanOut(e) => match e {
                FanOutError::Input(_) => StatusCode::BAD_REQUEST,
                FanOutError::NotFound(_) => StatusCode::NOT_FOUND,
                FanOutError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FanOutError::Evicted(_) => StatusCode::CONFLICT,
                FanOutError::Transport(_) | FanOutError::Log(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Error::Message(e) if e.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Message(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            debug!("Request rejected ({status}): {self}");
        }

        (status, self.to_string()).into_response()
    }
}

impl From<FanOutError> for Error {
    fn from(err: FanOutError) -> Self {
        Error::FanOut(err)
    }
}

impl From<MessageError> for Error {
    fn from(err: MessageError) -> Self {
        Error::Message(err)
    }
}
