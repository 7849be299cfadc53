//! The dispatcher driving a flow's handler chain.
//!
//! For a given context, the dispatcher walks the catalog's descriptor list
//! for that context kind in ascending order, skips descriptors whose filters
//! reject the current state, and stops as soon as a handler sets a terminal
//! disposition. Cancellation is observed before every invocation and aborts
//! with [`Error::Cancelled`]. A fault raised by a handler propagates to the
//! caller as `Err`; it is never converted into a protocol rejection.
//!
//! Execution within one context is strictly sequential. A handler may itself
//! suspend -- on the configuration collaborator or on a nested sub-dispatch
//! -- and the chain resumes at the same point once the awaited operation
//! completes.

use std::sync::Arc;

use crate::catalog::{CatalogBuilder, HandlerCatalog, HandlerSet};
use crate::context::{
    AuthenticationContext, ChallengeContext, Disposition, ErrorContext, ValidateTokenContext,
};
use crate::descriptor::HandlerDescriptor;
use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::response::Response;
use crate::transaction::{ContextKind, FlowOutcome, Transaction};

mod sealed {
    pub trait Sealed {}

    impl Sealed for crate::context::AuthenticationContext {}
    impl Sealed for crate::context::ChallengeContext {}
    impl Sealed for crate::context::ErrorContext {}
    impl Sealed for crate::context::ValidateTokenContext {}
}

/// A transaction context the dispatcher knows how to drive.
///
/// Implemented by the four context kinds; this trait is sealed. It routes a
/// context type to its catalog slot and exposes the state the dispatch loop
/// inspects between handlers.
pub trait DispatchContext: sealed::Sealed + Send {
    /// The kind under which this context records its outcome.
    const KIND: ContextKind;

    #[doc(hidden)]
    fn handler_set(catalog: &HandlerCatalog) -> &HandlerSet<Self>
    where
        Self: Sized;

    #[doc(hidden)]
    fn handler_bucket(builder: &mut CatalogBuilder) -> &mut Vec<HandlerDescriptor<Self>>
    where
        Self: Sized;

    /// The transaction correlating this request's flows.
    fn transaction(&self) -> &Arc<Transaction>;

    /// The flow's current disposition.
    fn disposition(&self) -> &Disposition;

    /// The flow's response sink.
    fn response(&self) -> &Response;

    /// Check if this request has been cancelled.
    fn is_cancelled(&self) -> bool;

    #[doc(hidden)]
    fn install_dispatcher(&mut self, dispatcher: Dispatcher);

    /// Record the flow's outcome on the transaction once dispatch completes,
    /// so later flows (challenge, error) can read it back.
    fn finalize(&mut self) {
        let outcome = FlowOutcome::capture(self.disposition(), self.response());
        self.transaction().record_outcome(Self::KIND, outcome);
    }
}

macro_rules! impl_dispatch_context {
    ($context:ident, $kind:expr, $slot:ident) => {
        impl DispatchContext for $context {
            const KIND: ContextKind = $kind;

            fn handler_set(catalog: &HandlerCatalog) -> &HandlerSet<Self> {
                &catalog.$slot
            }

            fn handler_bucket(builder: &mut CatalogBuilder) -> &mut Vec<HandlerDescriptor<Self>> {
                &mut builder.$slot
            }

            fn transaction(&self) -> &Arc<Transaction> {
                $context::transaction(self)
            }

            fn disposition(&self) -> &Disposition {
                $context::disposition(self)
            }

            fn response(&self) -> &Response {
                $context::response(self)
            }

            fn is_cancelled(&self) -> bool {
                $context::is_cancelled(self)
            }

            fn install_dispatcher(&mut self, dispatcher: Dispatcher) {
                $context::install_dispatcher(self, dispatcher);
            }
        }
    };
}

impl_dispatch_context!(
    AuthenticationContext,
    ContextKind::Authentication,
    authentication
);
impl_dispatch_context!(ChallengeContext, ContextKind::Challenge, challenge);
impl_dispatch_context!(ErrorContext, ContextKind::Error, error);
impl_dispatch_context!(
    ValidateTokenContext,
    ContextKind::ValidateToken,
    validate_token
);

/// Executes handler chains against transaction contexts.
///
/// Cheap to clone; clones share the same immutable catalog. The dispatcher
/// installs a handle to itself on each context it drives, which is how the
/// built-in [`ValidateAccessToken`](crate::handlers::ValidateAccessToken)
/// handler reaches the nested token-validation sub-dispatch.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    catalog: Arc<HandlerCatalog>,
}

impl Dispatcher {
    /// Create a dispatcher over a frozen catalog.
    pub fn new(catalog: HandlerCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// The catalog this dispatcher executes.
    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// Run the handler chain for the context's kind.
    ///
    /// Handlers execute in catalog order; descriptors whose filters reject
    /// the current state are skipped. The chain stops at the first terminal
    /// disposition. On completion the flow's outcome is recorded on the
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when the transaction's cancellation
    /// token fires, or the fault raised by a handler. Faults leave no
    /// outcome record and must not be rendered as protocol responses.
    pub async fn dispatch<C: DispatchContext>(&self, ctx: &mut C) -> Result<()> {
        ctx.install_dispatcher(self.clone());

        for descriptor in C::handler_set(&self.catalog).iter() {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if ctx.disposition().is_terminal() {
                break;
            }
            if !descriptor.accepts(&*ctx) {
                tracing::trace!(
                    context = %C::KIND,
                    handler = descriptor.name(),
                    "handler skipped by filter"
                );
                continue;
            }

            tracing::trace!(
                context = %C::KIND,
                handler = descriptor.name(),
                order = descriptor.order(),
                "invoking handler"
            );
            descriptor.instantiate().handle(ctx).await?;
        }

        if let Disposition::Rejected { error, .. } = ctx.disposition() {
            tracing::debug!(
                context = %C::KIND,
                error = error.as_deref().unwrap_or(""),
                "request rejected"
            );
        }

        ctx.finalize();
        Ok(())
    }
}
