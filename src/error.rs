//! Error types for tokengate.
//!
//! Faults raised through this module are distinct from protocol rejections:
//! a rejection is recorded on a transaction context via `reject` and surfaced
//! to the host as [`Response`](crate::response::Response) data, while an
//! [`Error`] aborts the dispatch for that request and is never turned into a
//! response.

/// A boxed error type for fault sources supplied by host code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// tokengate error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A handler descriptor was built without one of its required fields.
    #[error("invalid handler descriptor: {0}")]
    Descriptor(String),

    /// No server configuration could be obtained. This aborts the whole
    /// authentication attempt rather than rejecting it.
    #[error("server configuration unavailable: {0}")]
    Configuration(String),

    /// The dispatch was cancelled through the transaction's cancellation
    /// token. Distinct from a rejection.
    #[error("dispatch cancelled")]
    Cancelled,

    /// A handler raised a fault of its own.
    #[error("handler fault: {0}")]
    Handler(#[source] BoxError),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a descriptor construction error.
    pub fn descriptor(message: impl Into<String>) -> Self {
        Error::Descriptor(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Wrap a host-side error as a handler fault.
    pub fn handler(source: impl Into<BoxError>) -> Self {
        Error::Handler(source.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }
}

/// Result type alias for tokengate
pub type Result<T> = std::result::Result<T, Error>;
