//! Per-request transaction state shared across the validation flows.
//!
//! A [`Transaction`] correlates the authentication, challenge, and error
//! contexts produced for one inbound request. It carries the request's
//! cancellation token and a typed outcome map: when a flow's dispatch
//! completes, the dispatcher records a [`FlowOutcome`] snapshot under the
//! flow's [`ContextKind`], which later flows read back (the challenge flow
//! reuses the error recorded by the authentication attempt this way).
//!
//! One transaction is created per inbound request and discarded once the
//! response has been produced. Contexts reference it via `Arc<Transaction>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::Disposition;
use crate::response::Response;

/// The closed set of transaction context kinds.
///
/// Used as the key of the transaction's outcome map, replacing stringly-typed
/// property-bag keys: each flow records its outcome under exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// The authentication flow.
    Authentication,
    /// The challenge flow.
    Challenge,
    /// The error flow.
    Error,
    /// The nested token-validation sub-flow.
    ValidateToken,
}

impl ContextKind {
    /// Returns the kind's name as used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Authentication => "authentication",
            ContextKind::Challenge => "challenge",
            ContextKind::Error => "error",
            ContextKind::ValidateToken => "validate_token",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a completed flow, recorded on the transaction.
///
/// Captures the terminal disposition and the response's error triple at the
/// moment the flow's dispatch finished.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    /// The disposition the flow ended with.
    pub disposition: Disposition,
    /// Error code recorded on the flow's response, if any.
    pub error: Option<String>,
    /// Error description recorded on the flow's response, if any.
    pub error_description: Option<String>,
    /// Error URI recorded on the flow's response, if any.
    pub error_uri: Option<String>,
}

impl FlowOutcome {
    /// Capture an outcome from a flow's disposition and response.
    pub fn capture(disposition: &Disposition, response: &Response) -> Self {
        Self {
            disposition: disposition.clone(),
            error: response.error.clone(),
            error_description: response.error_description.clone(),
            error_uri: response.error_uri.clone(),
        }
    }
}

/// A cancellation token shared by every context of one transaction.
///
/// Cloning the token shares the underlying flag. Handlers that perform
/// suspending operations observe the token at each suspension point and abort
/// with [`Error::Cancelled`](crate::error::Error::Cancelled), which is
/// distinct from a protocol rejection.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Correlation object spanning one inbound request's validation flows.
#[derive(Debug, Default)]
pub struct Transaction {
    cancellation: CancellationToken,
    outcomes: Mutex<HashMap<ContextKind, FlowOutcome>>,
}

impl Transaction {
    /// Create a new transaction for one inbound request.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cancellation token carried by every context of this transaction.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Record a flow's outcome, replacing any earlier record for the same
    /// kind.
    pub fn record_outcome(&self, kind: ContextKind, outcome: FlowOutcome) {
        let mut outcomes = self.outcomes.lock().unwrap();
        outcomes.insert(kind, outcome);
    }

    /// Read back the recorded outcome of a flow, if it has completed.
    pub fn outcome(&self, kind: ContextKind) -> Option<FlowOutcome> {
        let outcomes = self.outcomes.lock().unwrap();
        outcomes.get(&kind).cloned()
    }
}
