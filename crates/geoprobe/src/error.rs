//! Error types for the geoprobe crate.

use std::fmt;

use serde::Serialize;

/// Result type for geoprobe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, executing or presenting a request.
#[derive(Debug)]
pub enum Error {
    /// Transport-level failure (connection, TLS, timeout).
    Network {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// The backend answered with a non-success status.
    Service {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The message carried by the response body.
        message: String,
    },
    /// The response body could not be decoded.
    MalformedResponse {
        /// The URL whose response was malformed.
        url: String,
        /// The decoder's error message.
        message: String,
    },
    /// A resolved value could not be turned into a display tree.
    Materialization {
        /// The error message.
        message: String,
    },
    /// The request could not be constructed.
    InvalidRequest {
        /// Description of what was invalid.
        detail: String,
    },
    /// A run was started while another one was still in flight.
    Busy,
    /// A failure raised by a custom request descriptor, displayed verbatim.
    Other(String),
}

impl Error {
    /// The coarse category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network { .. } => ErrorKind::Network,
            Error::Service { .. } => ErrorKind::Service,
            Error::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Error::Materialization { .. } => ErrorKind::Materialization,
            Error::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Error::Busy => ErrorKind::Busy,
            Error::Other(_) => ErrorKind::Other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Network { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::Service {
                url,
                status,
                message,
            } => {
                write!(f, "{message} (http {status} from {url})")
            }
            Error::MalformedResponse { url, message } => {
                write!(f, "malformed response from {url}: {message}")
            }
            Error::Materialization { message } => {
                write!(f, "failed to materialize response: {message}")
            }
            Error::InvalidRequest { detail } => write!(f, "invalid request: {detail}"),
            Error::Busy => write!(f, "a request is already in flight"),
            Error::Other(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Materialization {
            message: e.to_string(),
        }
    }
}

/// Coarse error category exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Service,
    MalformedResponse,
    Materialization,
    InvalidRequest,
    Busy,
    Other,
}

/// The failure half of a terminal outcome.
///
/// This is what the caller presents; the original [`Error`] is logged by the
/// executor and then reduced to its kind and human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for ErrorInfo {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<Error> for ErrorInfo {
    fn from(e: Error) -> Self {
        Self::from(&e)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
