//! The handler contract executed by the dispatcher.
//!
//! A handler is one unit of logic in a flow's chain. It mutates its context
//! -- recording a rejection, attaching a principal, filling response fields
//! -- and returns `Ok(())` unless it raises a fault. Terminal decisions are
//! context data, never `Err`: returning an error aborts the whole dispatch
//! instead of producing a protocol response.

use async_trait::async_trait;

use crate::error::Result;

/// A pipeline handler for contexts of type `C`.
///
/// Implementations must be cheap to share: singleton handlers are stored
/// behind an `Arc` in the catalog and invoked concurrently for unrelated
/// requests (each invocation still owns its context exclusively).
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use tokengate::{AuthenticationContext, Handler, ProtocolError, Result};
///
/// struct DenyAll;
///
/// #[async_trait]
/// impl Handler<AuthenticationContext> for DenyAll {
///     async fn handle(&self, ctx: &mut AuthenticationContext) -> Result<()> {
///         ctx.reject(ProtocolError::InvalidRequest, "This resource is closed.", "");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<C: Send>: Send + Sync {
    /// Process the context.
    ///
    /// A returned error is a fault that terminates the dispatch; protocol
    /// rejections are recorded on the context instead.
    async fn handle(&self, ctx: &mut C) -> Result<()>;
}

/// A [`Handler`] built from a synchronous closure.
///
/// Created by [`handler_fn`]. Covers the common case of handlers whose logic
/// does not suspend; implement [`Handler`] directly when the step awaits an
/// external operation.
pub struct FnHandler<F> {
    f: F,
}

/// Build a handler from a synchronous closure over the context.
///
/// # Example
///
/// ```rust
/// use tokengate::{ValidateTokenContext, handler_fn};
///
/// let handler = handler_fn(|ctx: &mut ValidateTokenContext| {
///     ctx.mark_skipped();
///     Ok(())
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<C, F>(f: F) -> FnHandler<F>
where
    C: Send,
    F: Fn(&mut C) -> Result<()> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<C, F> Handler<C> for FnHandler<F>
where
    C: Send,
    F: Fn(&mut C) -> Result<()> + Send + Sync,
{
    async fn handle(&self, ctx: &mut C) -> Result<()> {
        (self.f)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::{AuthenticationContext, Disposition};
    use crate::response::ProtocolError;
    use crate::transaction::Transaction;

    #[tokio::test]
    async fn test_handler_fn_runs_closure() {
        let handler = handler_fn(|ctx: &mut AuthenticationContext| {
            ctx.reject(ProtocolError::InvalidToken, "", "");
            Ok(())
        });

        let mut ctx = AuthenticationContext::new(Arc::new(Transaction::new()));
        handler.handle(&mut ctx).await.unwrap();
        assert!(matches!(ctx.disposition(), Disposition::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_handler_fn_propagates_fault() {
        let handler = handler_fn(|_ctx: &mut AuthenticationContext| {
            Err(crate::Error::internal("boom"))
        });

        let mut ctx = AuthenticationContext::new(Arc::new(Transaction::new()));
        let result = handler.handle(&mut ctx).await;
        assert!(matches!(result, Err(crate::Error::Internal(_))));
    }
}
