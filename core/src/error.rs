//! Error types for poller construction, polling and operation dispatch.
//!
//! # Design
//! `PollError` is one flat enum covering every way a long-running operation
//! can go wrong. `ErrorKind` groups the variants so callers can tell a
//! well-formed `Failed` from the service apart from a dropped connection or a
//! response the poller could not make sense of. Nothing here is retried; the
//! transport owns retry policy.

use thiserror::Error;

use crate::status::PollStatus;

/// Returned by a `Transport` when the round-trip itself failed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Broad category of a `PollError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The initiating response did not carry a usable locator.
    Construction,
    /// The poll request never produced a response.
    Transport,
    /// A response arrived but its shape was not understood.
    Protocol,
    /// The service reported a terminal `Failed` or `Canceled` status.
    OperationFailure,
    /// The caller's cancellation token fired.
    Cancelled,
    /// The initiating request could not be built.
    Request,
    /// The poller was driven after it had already finished.
    Misuse,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("response with HTTP {status} carried no `{header}` header to poll")]
    MissingLocator { status: u16, header: &'static str },

    #[error("`{header}` value {value:?} is not an absolute URL: {reason}")]
    InvalidLocator {
        header: &'static str,
        value: String,
        reason: String,
    },

    #[error("`Location` {location:?} has no `{parameter}` query parameter")]
    MissingQueryParameter { parameter: String, location: String },

    #[error("unexpected HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("expected a JSON status payload with HTTP {status}, got content-type {content_type:?}")]
    UnexpectedContentType {
        status: u16,
        content_type: Option<String>,
    },

    #[error("decoding response body: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("unrecognised operation status {0:?}")]
    UnknownStatus(String),

    #[error("executing poll request: {0}")]
    Transport(#[from] TransportError),

    #[error("operation {status}{}: {message}", code_suffix(.code))]
    OperationFailed {
        status: PollStatus,
        code: Option<String>,
        message: String,
    },

    #[error("polling was cancelled")]
    Cancelled,

    #[error("invalid request URL {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("encoding request body: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("poller was driven again after reaching terminal status {0}")]
    AlreadyTerminal(PollStatus),
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::MissingLocator { .. }
            | PollError::InvalidLocator { .. }
            | PollError::MissingQueryParameter { .. } => ErrorKind::Construction,
            PollError::Transport(_) => ErrorKind::Transport,
            PollError::UnexpectedStatus { .. }
            | PollError::UnexpectedContentType { .. }
            | PollError::Deserialization(_)
            | PollError::UnknownStatus(_) => ErrorKind::Protocol,
            PollError::OperationFailed { .. } => ErrorKind::OperationFailure,
            PollError::Cancelled => ErrorKind::Cancelled,
            PollError::InvalidUrl { .. } | PollError::Serialization(_) => ErrorKind::Request,
            PollError::AlreadyTerminal(_) => ErrorKind::Misuse,
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

/// A `PollError` tagged with the name of the operation that raised it.
#[derive(Debug, Error)]
#[error("{operation}: {source}")]
pub struct OperationError {
    pub operation: String,
    #[source]
    pub source: PollError,
}

impl OperationError {
    pub fn new(operation: impl Into<String>, source: PollError) -> Self {
        Self {
            operation: operation.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
