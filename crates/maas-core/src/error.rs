//! Error types for MAAS operations.
//!
//! Three layers of error live here:
//!
//! - [`TransportError`] is what the wire produces: a non-2xx status with its body,
//!   or a connection-level failure.
//! - [`CallError`] is a failed request primitive, carrying the method, path and
//!   sub-operation that failed so the call never has to be re-issued to diagnose it.
//! - [`Error`] is the semantic taxonomy handed to callers. Every variant maps onto
//!   exactly one [`ErrorKind`].

use reqwest::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::schema::SchemaError;

/// Semantic category of a failure, independent of the status code that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input detected locally before any network call.
    NotValid,
    /// The server rejected the authenticated identity.
    PermissionDenied,
    /// The requested resource or constraint cannot be satisfied.
    NoMatch,
    /// The server rejected the request as malformed.
    BadRequest,
    /// The target's current state forbids the action.
    CannotComplete,
    /// No protocol version supported by both sides.
    UnsupportedVersion,
    /// Anything not otherwise classified.
    Unexpected,
}

impl ErrorKind {
    /// Returns the stable error code for this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotValid => "NOT_VALID",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::NoMatch => "NO_MATCH",
            Self::BadRequest => "BAD_REQUEST",
            Self::CannotComplete => "CANNOT_COMPLETE",
            Self::UnsupportedVersion => "UNSUPPORTED_VERSION",
            Self::Unexpected => "UNEXPECTED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotValid => "not valid",
            Self::PermissionDenied => "permission denied",
            Self::NoMatch => "no match",
            Self::BadRequest => "bad request",
            Self::CannotComplete => "cannot complete",
            Self::UnsupportedVersion => "unsupported version",
            Self::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("server responded {status}: {body}")]
    Server {
        /// HTTP status code
        status: StatusCode,
        /// Raw response body text
        body: String,
    },

    /// The API key could not be turned into signing credentials.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The base URL or request path could not form a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other HTTP client failure.
    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl TransportError {
    /// Status code of a server-side failure.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body text of a server-side failure.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Server { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

/// Why a request primitive failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallFailure {
    /// The round trip itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response arrived but was not valid JSON.
    #[error("invalid JSON response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for CallFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A failed request primitive, with enough context to diagnose it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{method} {}: {failure}", target(.path, .op))]
pub struct CallError {
    /// HTTP method of the call
    pub method: Method,
    /// Normalized resource path
    pub path: String,
    /// Sub-operation, if any
    pub op: Option<String>,
    /// Underlying failure
    #[source]
    pub failure: CallFailure,
}

fn target(path: &str, op: &Option<String>) -> String {
    match op {
        Some(op) => format!("{path}?op={op}"),
        None => path.to_string(),
    }
}

impl CallError {
    /// Create a call error for the given request.
    #[must_use]
    pub fn new(
        method: Method,
        path: impl Into<String>,
        op: Option<&str>,
        failure: CallFailure,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            op: op.map(str::to_owned),
            failure,
        }
    }

    /// Status code when the server answered with a non-2xx response.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match &self.failure {
            CallFailure::Transport(err) => err.status(),
            CallFailure::Decode(_) => None,
        }
    }

    /// Server body text, used as the human-readable message of classified errors.
    #[must_use]
    pub fn body_message(&self) -> Option<&str> {
        match &self.failure {
            CallFailure::Transport(err) => err.body(),
            CallFailure::Decode(_) => None,
        }
    }
}

/// Main error type for MAAS operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Caller input rejected before any network call
    #[error("not valid: {0}")]
    NotValid(String),

    /// Server rejected the authenticated identity
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Server-provided message
        message: String,
        /// Underlying call failure
        #[source]
        cause: Option<Box<CallError>>,
    },

    /// No resource matches the request
    #[error("no match: {message}")]
    NoMatch {
        /// Server-provided message
        message: String,
        /// Underlying call failure
        #[source]
        cause: Option<Box<CallError>>,
    },

    /// Server rejected the request as malformed
    #[error("bad request: {message}")]
    BadRequest {
        /// Server-provided message
        message: String,
        /// Underlying call failure
        #[source]
        cause: Option<Box<CallError>>,
    },

    /// Resource state forbids the action
    #[error("cannot complete: {message}")]
    CannotComplete {
        /// Server-provided message
        message: String,
        /// Underlying call failure
        #[source]
        cause: Option<Box<CallError>>,
    },

    /// No mutually supported protocol version
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    /// A response did not have the expected shape
    #[error("failed to deserialize {context}: {source}")]
    Deserialization {
        /// What was being decoded
        context: String,
        /// Which field failed and why
        source: SchemaError,
    },

    /// Anything not otherwise classified
    #[error("unexpected: {message}")]
    Unexpected {
        /// Description of the failure
        message: String,
        /// Underlying call failure
        #[source]
        cause: Option<Box<CallError>>,
    },

    /// A transport could not be set up
    #[error("unexpected: {context}: {source}")]
    Transport {
        /// What was being attempted
        context: String,
        /// Transport construction failure
        #[source]
        source: TransportError,
    },

    /// Reading local input failed
    #[error("unexpected: {context}: {source}")]
    Io {
        /// What was being read
        context: String,
        /// The read failure
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Specialized result type for MAAS operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an error of the given kind from a failed call.
    ///
    /// The server body is used as the message when there is one; otherwise the
    /// call error's own description is.
    #[must_use]
    pub fn from_call(kind: ErrorKind, err: CallError) -> Self {
        if kind == ErrorKind::Unexpected {
            return Self::unexpected(err);
        }
        let message = err
            .body_message()
            .map_or_else(|| err.to_string(), str::to_owned);
        let cause = Some(Box::new(err));
        match kind {
            ErrorKind::NotValid => Self::NotValid(message),
            ErrorKind::PermissionDenied => Self::PermissionDenied { message, cause },
            ErrorKind::NoMatch => Self::NoMatch { message, cause },
            ErrorKind::BadRequest => Self::BadRequest { message, cause },
            ErrorKind::CannotComplete => Self::CannotComplete { message, cause },
            ErrorKind::UnsupportedVersion => Self::UnsupportedVersion(message),
            ErrorKind::Unexpected => Self::Unexpected { message, cause },
        }
    }

    /// Wrap a call failure that no policy classified.
    #[must_use]
    pub fn unexpected(err: CallError) -> Self {
        Self::Unexpected {
            message: err.to_string(),
            cause: Some(Box::new(err)),
        }
    }

    /// Wrap a transport that could not be built.
    #[must_use]
    pub fn transport(context: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// Wrap a failed read of caller-supplied input.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    /// A locally detected bad request, with no underlying call.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            cause: None,
        }
    }

    /// The semantic kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotValid(_) => ErrorKind::NotValid,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::NoMatch { .. } => ErrorKind::NoMatch,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::CannotComplete { .. } => ErrorKind::CannotComplete,
            Self::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            Self::Deserialization { .. }
            | Self::Unexpected { .. }
            | Self::Transport { .. }
            | Self::Io { .. } => ErrorKind::Unexpected,
        }
    }

    /// Returns the error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Deserialization { .. } => "DESERIALIZATION",
            other => other.kind().code(),
        }
    }

    /// The failed call behind this error, if there was one.
    #[must_use]
    pub fn call(&self) -> Option<&CallError> {
        match self {
            Self::PermissionDenied { cause, .. }
            | Self::NoMatch { cause, .. }
            | Self::BadRequest { cause, .. }
            | Self::CannotComplete { cause, .. }
            | Self::Unexpected { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

impl From<CallError> for Error {
    fn from(err: CallError) -> Self {
        Self::unexpected(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::NotValid(format!("invalid URL: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::NotValid(err.to_string())
    }
}
