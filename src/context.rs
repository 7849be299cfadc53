//! Transaction contexts for the three validation flows and the nested
//! token-validation sub-flow.
//!
//! Each inbound request produces fresh context instances that share one
//! [`Transaction`]. A context carries the request-scoped mutable state its
//! flow's handlers operate on: the [`Response`] sink, a custom parameters
//! map, and the [`Disposition`] that tells the dispatcher whether to keep
//! executing handlers.
//!
//! The terminal outcome is a tagged enum rather than independent flags, so at
//! most one terminal state can ever be set. `reject` transitions the
//! disposition and populates the response's error triple in one step.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::config::ServerConfiguration;
use crate::dispatch::Dispatcher;
use crate::principal::Principal;
use crate::response::Response;
use crate::transaction::{CancellationToken, Transaction};

/// Terminal decision of a flow.
///
/// `Continuing` is the implicit initial state; the three remaining variants
/// are terminal -- once one is set, the dispatcher invokes no further
/// handlers for that context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Disposition {
    /// No terminal decision yet; the next handler in the chain runs.
    #[default]
    Continuing,
    /// A handler fully produced the response; remaining handlers are
    /// absorbed.
    Handled,
    /// A handler decided this request is not for this validator.
    Skipped,
    /// The request was rejected with a protocol error.
    Rejected {
        /// Protocol error code, if one was supplied.
        error: Option<String>,
        /// Human-readable description, if one was supplied.
        description: Option<String>,
        /// Documentation URI, if one was supplied.
        uri: Option<String>,
    },
}

impl Disposition {
    /// Returns true if this disposition halts the handler chain.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Disposition::Continuing)
    }

    /// Returns true if the flow was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Disposition::Rejected { .. })
    }
}

/// Classification of the endpoint an inbound request targets.
///
/// Only `Unknown` endpoints -- arbitrary API routes guarded by bearer-token
/// authentication -- make the validator autonomously extract and enforce a
/// token. Endpoints the validator's own stack owns have bespoke handling
/// elsewhere and are left alone by the built-in handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndpointType {
    /// An arbitrary endpoint not owned by this validator.
    #[default]
    Unknown,
    /// The validator's protected-resource-metadata discovery endpoint.
    ResourceMetadata,
}

impl EndpointType {
    /// Returns true if the endpoint belongs to the validator's own stack.
    pub fn is_owned(&self) -> bool {
        !matches!(self, EndpointType::Unknown)
    }
}

/// Hint describing which token formats a nested validation may resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenTypeHint {
    /// A bearer access token.
    AccessToken,
    /// A refresh token.
    RefreshToken,
    /// An identity token.
    IdentityToken,
}

impl TokenTypeHint {
    /// Returns the hint's wire-level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenTypeHint::AccessToken => "access_token",
            TokenTypeHint::RefreshToken => "refresh_token",
            TokenTypeHint::IdentityToken => "id_token",
        }
    }
}

impl fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared by every transaction context kind.
///
/// Holds the transaction handle, the response sink, the custom parameters
/// map, and the flow's disposition. The dispatcher installs a handle to
/// itself here before running the chain so handlers can trigger nested
/// dispatches.
#[derive(Debug)]
pub struct FlowState {
    transaction: Arc<Transaction>,
    response: Response,
    parameters: HashMap<String, serde_json::Value>,
    disposition: Disposition,
    dispatcher: Option<Dispatcher>,
}

impl FlowState {
    fn new(transaction: Arc<Transaction>) -> Self {
        Self {
            transaction,
            response: Response::new(),
            parameters: HashMap::new(),
            disposition: Disposition::Continuing,
            dispatcher: None,
        }
    }

    fn reject(&mut self, error: String, description: String, uri: String) {
        let error = non_empty(error);
        let description = non_empty(description);
        let uri = non_empty(uri);

        self.response.error = error.clone();
        self.response.error_description = description.clone();
        self.response.error_uri = uri.clone();
        self.disposition = Disposition::Rejected {
            error,
            description,
            uri,
        };
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

macro_rules! impl_flow_context {
    ($context:ident) => {
        impl $context {
            /// The transaction correlating this request's flows.
            pub fn transaction(&self) -> &Arc<Transaction> {
                &self.flow.transaction
            }

            /// The response sink for this flow.
            pub fn response(&self) -> &Response {
                &self.flow.response
            }

            /// Mutable access to the response sink.
            pub fn response_mut(&mut self) -> &mut Response {
                &mut self.flow.response
            }

            /// Custom parameters attached by the host for this flow.
            pub fn parameters(&self) -> &HashMap<String, serde_json::Value> {
                &self.flow.parameters
            }

            /// Attach a custom parameter, replacing any existing value under
            /// the same name.
            pub fn set_parameter(
                &mut self,
                name: impl Into<String>,
                value: impl Into<serde_json::Value>,
            ) {
                self.flow.parameters.insert(name.into(), value.into());
            }

            /// The cancellation token carried by this context's transaction.
            pub fn cancellation(&self) -> &CancellationToken {
                self.flow.transaction.cancellation()
            }

            /// Check if this request has been cancelled.
            pub fn is_cancelled(&self) -> bool {
                self.cancellation().is_cancelled()
            }

            /// The flow's current disposition.
            pub fn disposition(&self) -> &Disposition {
                &self.flow.disposition
            }

            /// Mark the request as fully handled, absorbing the remaining
            /// handler chain.
            pub fn mark_handled(&mut self) {
                self.flow.disposition = Disposition::Handled;
            }

            /// Mark the request as skipped by this validator.
            pub fn mark_skipped(&mut self) {
                self.flow.disposition = Disposition::Skipped;
            }

            /// Reject the request with a protocol error.
            ///
            /// Sets the rejected disposition and populates the response's
            /// error triple in one step. Empty strings are recorded as
            /// absent fields.
            pub fn reject(
                &mut self,
                error: impl Into<String>,
                description: impl Into<String>,
                uri: impl Into<String>,
            ) {
                self.flow
                    .reject(error.into(), description.into(), uri.into());
            }

            /// The dispatcher driving this context, available while a
            /// dispatch is in progress. Handlers use this to run nested
            /// sub-dispatches.
            pub fn dispatcher(&self) -> Option<&Dispatcher> {
                self.flow.dispatcher.as_ref()
            }

            pub(crate) fn install_dispatcher(&mut self, dispatcher: Dispatcher) {
                self.flow.dispatcher = Some(dispatcher);
            }
        }
    };
}

/// Context for the authentication flow.
///
/// The host sets [`endpoint`](Self::endpoint) and
/// [`access_token`](Self::access_token) before dispatch (transport-level
/// extraction of the bearer credential is the host's responsibility). The
/// four behavior flags are resolved by the built-in
/// [`EvaluateValidatedTokens`](crate::handlers::EvaluateValidatedTokens)
/// handler and read by the handlers that follow it.
#[derive(Debug)]
pub struct AuthenticationContext {
    flow: FlowState,
    /// Classification of the endpoint targeted by the request.
    pub endpoint: EndpointType,
    /// The raw bearer credential, if one was attached to the request.
    pub access_token: Option<String>,
    /// Whether a bearer token should be extracted for this request.
    pub extract_access_token: bool,
    /// Whether the absence of a bearer token rejects the request.
    pub require_access_token: bool,
    /// Whether an attached bearer token should be validated.
    pub validate_access_token: bool,
    /// Whether a failed validation rejects the request.
    pub reject_access_token: bool,
    /// Issuer metadata resolved for this request.
    pub configuration: Option<Arc<ServerConfiguration>>,
    /// The verified identity, present only after successful validation.
    pub principal: Option<Principal>,
}

impl AuthenticationContext {
    /// Create an authentication context for the given transaction.
    pub fn new(transaction: Arc<Transaction>) -> Self {
        Self {
            flow: FlowState::new(transaction),
            endpoint: EndpointType::default(),
            access_token: None,
            extract_access_token: false,
            require_access_token: false,
            validate_access_token: false,
            reject_access_token: false,
            configuration: None,
            principal: None,
        }
    }
}

impl_flow_context!(AuthenticationContext);

/// Context for the challenge flow, producing an error response when
/// authentication was insufficient.
#[derive(Debug)]
pub struct ChallengeContext {
    flow: FlowState,
}

impl ChallengeContext {
    /// Create a challenge context for the given transaction.
    pub fn new(transaction: Arc<Transaction>) -> Self {
        Self {
            flow: FlowState::new(transaction),
        }
    }
}

impl_flow_context!(ChallengeContext);

/// Context for the error flow, rendering a structured protocol error.
///
/// The host sets the error triple before dispatch; the built-in handlers
/// copy it onto the response.
#[derive(Debug)]
pub struct ErrorContext {
    flow: FlowState,
    /// Protocol error code to render.
    pub error: Option<String>,
    /// Human-readable description to render.
    pub error_description: Option<String>,
    /// Documentation URI to render.
    pub error_uri: Option<String>,
}

impl ErrorContext {
    /// Create an error context for the given transaction.
    pub fn new(transaction: Arc<Transaction>) -> Self {
        Self {
            flow: FlowState::new(transaction),
            error: None,
            error_description: None,
            error_uri: None,
        }
    }
}

impl_flow_context!(ErrorContext);

/// Sub-transaction context resolving a raw credential into a verified
/// identity.
///
/// Built by the [`ValidateAccessToken`](crate::handlers::ValidateAccessToken)
/// handler and dispatched through the same catalog; handlers for this
/// context either attach a [`Principal`], set a terminal disposition, or
/// leave the context untouched for the next handler.
#[derive(Debug)]
pub struct ValidateTokenContext {
    flow: FlowState,
    /// The raw credential under validation.
    pub token: String,
    /// The token formats this validation may resolve.
    pub valid_token_types: HashSet<TokenTypeHint>,
    /// The verified identity, attached by a successful handler.
    pub principal: Option<Principal>,
}

impl ValidateTokenContext {
    /// Create a token-validation context for the given transaction.
    pub fn new(transaction: Arc<Transaction>, token: impl Into<String>) -> Self {
        Self {
            flow: FlowState::new(transaction),
            token: token.into(),
            valid_token_types: HashSet::new(),
            principal: None,
        }
    }
}

impl_flow_context!(ValidateTokenContext);
