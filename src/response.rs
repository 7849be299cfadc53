//! Protocol error codes and the response sink.
//!
//! A transaction context carries a [`Response`] that the pipeline's handlers
//! fill in: the error triple (`error`, `error_description`, `error_uri`) plus
//! any custom parameters. The error codes themselves come from the closed
//! [`ProtocolError`] set -- rejections never invent ad-hoc codes, although
//! host-registered handlers may copy a code string verbatim from a nested
//! validation outcome.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol error codes surfaced to clients on rejection.
///
/// Each variant renders as the wire-level error code carried in the
/// response's `error` field (and, at the transport layer, in a
/// `WWW-Authenticate` header the host builds from the response).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// No bearer token was attached to a request that requires one.
    MissingToken,
    /// The request could not be processed; also the generic fallback when a
    /// nested validation rejects without supplying an explicit code.
    InvalidRequest,
    /// The provided token is malformed, expired, or failed verification.
    InvalidToken,
    /// The token was accepted but does not grant the requested access.
    InsufficientAccess,
    /// The validator itself failed while processing the request.
    ServerError,
}

impl ProtocolError {
    /// Returns the wire-level error code for this error.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolError::MissingToken => "missing_token",
            ProtocolError::InvalidRequest => "invalid_request",
            ProtocolError::InvalidToken => "invalid_token",
            ProtocolError::InsufficientAccess => "insufficient_access",
            ProtocolError::ServerError => "server_error",
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ProtocolError> for String {
    fn from(error: ProtocolError) -> Self {
        error.as_str().to_string()
    }
}

/// The response sink attached to every transaction context.
///
/// Handlers write the protocol error triple and custom parameters here; the
/// host reads the terminal response back after dispatch and renders it onto
/// its transport. Custom parameters serialize flattened next to the error
/// fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    /// Protocol error code, one of the [`ProtocolError`] codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Human-readable description of the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI of a page documenting the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,

    #[serde(flatten)]
    parameters: HashMap<String, serde_json::Value>,
}

impl Response {
    /// Create an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom parameter, replacing any existing value under the same
    /// name.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.parameters.insert(name.into(), value.into());
    }

    /// Get a custom parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&serde_json::Value> {
        self.parameters.get(name)
    }

    /// All custom parameters set on this response.
    pub fn parameters(&self) -> &HashMap<String, serde_json::Value> {
        &self.parameters
    }
}
