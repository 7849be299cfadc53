//! # tokengate
//!
//! An extensible, ordered handler-dispatch pipeline for resource-server
//! bearer-token validation.
//!
//! tokengate drives the three transaction flows of a credential validator --
//! **authentication** (verify a bearer credential attached to an inbound
//! request), **challenge** (produce an error response when authentication is
//! insufficient), and **error** (render a structured protocol error) --
//! through one deterministic pipeline. Hosts extend any flow by registering
//! handlers; credential verification itself runs in a nested sub-dispatch so
//! the outer flow stays decoupled from specific token formats.
//!
//! # Architecture
//!
//! - **Handler Catalog** ([`HandlerCatalog`]): an immutable, per-flow list of
//!   handler descriptors, assembled once at startup from the built-ins plus
//!   host registrations and stable-sorted by order key. Equal orders keep
//!   their registration order, so dispatch order is a pure function of the
//!   registration sequence.
//!
//! - **Dispatcher** ([`Dispatcher`]): runs a flow's handlers in ascending
//!   order, skips those whose filter predicates reject the current context
//!   state, and stops at the first terminal [`Disposition`] (handled,
//!   skipped, or rejected).
//!
//! - **Transaction Contexts** ([`AuthenticationContext`],
//!   [`ChallengeContext`], [`ErrorContext`], [`ValidateTokenContext`]): the
//!   request-scoped state handlers operate on, correlated by a shared
//!   [`Transaction`] that also carries the request's cancellation token.
//!
//! - **Built-in Handlers** ([`handlers`]): resolve issuer metadata, decide
//!   which endpoints enforce bearer tokens, reject missing tokens, run the
//!   nested token validation, and shape challenge/error responses.
//!
//! - **Collaborator boundaries**: issuer metadata comes from a
//!   [`ConfigurationSource`] (with [`CachedConfigurationSource`] collapsing
//!   concurrent refreshes); token verification is any handler registered for
//!   [`ValidateTokenContext`], such as the JWT handler in [`jwt`].
//!
//! Rejections are data, not errors: a handler records them on its context
//! via `reject`, and the host reads the terminal [`Response`] back. An `Err`
//! from dispatch is a fault (configuration unavailable, cancellation, a
//! broken handler) and never becomes a protocol response.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tokengate::jwt::JwtTokenHandler;
//! use tokengate::{
//!     AuthenticationContext, ChallengeContext, Disposition, Dispatcher, EndpointType,
//!     HandlerCatalog, ServerConfiguration, StaticConfigurationSource, Transaction,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tokengate::Error> {
//!     // Assembled once at startup.
//!     let source = Arc::new(StaticConfigurationSource::new(
//!         ServerConfiguration::new("https://auth.example.com"),
//!     ));
//!     let validator = JwtTokenHandler::from_secret(b"shared-secret")
//!         .expected_issuer("https://auth.example.com");
//!     let catalog = HandlerCatalog::builder(source)
//!         .register(validator.descriptor())
//!         .build();
//!     let dispatcher = Dispatcher::new(catalog);
//!
//!     // One transaction per inbound request; the host extracts the bearer
//!     // credential from its transport.
//!     let transaction = Arc::new(Transaction::new());
//!     let mut ctx = AuthenticationContext::new(transaction.clone());
//!     ctx.endpoint = EndpointType::Unknown;
//!     ctx.access_token =
//!         tokengate::bearer::extract_bearer_token("Bearer eyJhbGci...").map(str::to_string);
//!
//!     dispatcher.dispatch(&mut ctx).await?;
//!
//!     match ctx.disposition() {
//!         Disposition::Continuing => {
//!             let principal = ctx.principal.as_ref().expect("validated");
//!             println!("authenticated subject: {:?}", principal.subject);
//!         }
//!         Disposition::Rejected { .. } => {
//!             // Render the challenge for the transport.
//!             let mut challenge = ChallengeContext::new(transaction.clone());
//!             dispatcher.dispatch(&mut challenge).await?;
//!             println!("challenge error: {:?}", challenge.response().error);
//!         }
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Extending a flow
//!
//! Handlers register through descriptors built with
//! [`HandlerDescriptor::builder`]: pick an order key relative to the
//! [`handlers::order`] constants, optionally add filter predicates, and
//! choose between one shared instance (`.instance()`) or a fresh instance
//! per dispatch (`.factory()`).
//!
//! # Feature Flags
//!
//! - `jwt` *(default)* - JWT validation for the nested sub-dispatch via the
//!   [`jwt`] module.

pub mod bearer;
pub mod catalog;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod handlers;
#[cfg(feature = "jwt")]
pub mod jwt;
pub mod principal;
pub mod response;
pub mod transaction;

// Re-exports
pub use catalog::{CatalogBuilder, HandlerCatalog, HandlerSet};
pub use config::{
    CachedConfigurationSource, ConfigurationSource, ServerConfiguration, StaticConfigurationSource,
};
pub use context::{
    AuthenticationContext, ChallengeContext, Disposition, EndpointType, ErrorContext,
    TokenTypeHint, ValidateTokenContext,
};
pub use descriptor::{DescriptorBuilder, HandlerDescriptor, HandlerFilter, HandlerKind};
pub use dispatch::{DispatchContext, Dispatcher};
pub use error::{BoxError, Error, Result};
pub use handler::{FnHandler, Handler, handler_fn};
pub use principal::{Audience, Principal};
pub use response::{ProtocolError, Response};
pub use transaction::{CancellationToken, ContextKind, FlowOutcome, Transaction};

#[cfg(feature = "jwt")]
pub use jwt::JwtTokenHandler;
