//! Handler descriptors: immutable metadata for one pipeline step.
//!
//! A descriptor ties together the handler factory, its `i32` order key, and
//! zero or more filter predicates. Hosts construct descriptors through
//! [`DescriptorBuilder`], which validates the required fields (order and
//! factory) synchronously and fails construction rather than deferring the
//! problem to first use.
//!
//! The execution kind is fixed at registration time: `.instance()` registers
//! a process-wide singleton, `.factory()` a closure invoked once per
//! dispatch. There is no runtime lifetime switching.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::handler::Handler;

/// A filter predicate deciding whether a handler runs for a given context.
///
/// Filters must be pure: they are evaluated against the context's current
/// state and may be short-circuited, so they cannot rely on side effects.
pub type HandlerFilter<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// Execution kind of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// One shared instance serves every dispatch.
    Singleton,
    /// A fresh instance is produced for every dispatch.
    Scoped,
}

enum HandlerFactory<C> {
    Singleton(Arc<dyn Handler<C>>),
    Scoped(Arc<dyn Fn() -> Arc<dyn Handler<C>> + Send + Sync>),
}

impl<C> Clone for HandlerFactory<C> {
    fn clone(&self) -> Self {
        match self {
            HandlerFactory::Singleton(handler) => HandlerFactory::Singleton(handler.clone()),
            HandlerFactory::Scoped(factory) => HandlerFactory::Scoped(factory.clone()),
        }
    }
}

/// Immutable metadata for one pipeline step.
///
/// The context type a descriptor applies to is its type parameter, so the
/// catalog can only ever hand a handler a context of the kind it was
/// registered for.
///
/// # Example
///
/// ```rust
/// use tokengate::{AuthenticationContext, HandlerDescriptor, handler_fn};
///
/// let descriptor = HandlerDescriptor::builder()
///     .name("audit_token_use")
///     .order(50_000)
///     .filter(|ctx: &AuthenticationContext| ctx.validate_access_token)
///     .instance(handler_fn(|_ctx: &mut AuthenticationContext| Ok(())))
///     .build()
///     .unwrap();
///
/// assert_eq!(descriptor.order(), 50_000);
/// ```
pub struct HandlerDescriptor<C> {
    name: Cow<'static, str>,
    order: i32,
    filters: Vec<HandlerFilter<C>>,
    factory: HandlerFactory<C>,
}

impl<C> Clone for HandlerDescriptor<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            order: self.order,
            filters: self.filters.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<C> fmt::Debug for HandlerDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("kind", &self.kind())
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl<C> HandlerDescriptor<C> {
    /// Start building a descriptor.
    pub fn builder() -> DescriptorBuilder<C> {
        DescriptorBuilder::new()
    }

    /// Descriptor for a built-in singleton handler; all required fields are
    /// supplied by construction.
    pub(crate) fn from_instance(
        name: &'static str,
        order: i32,
        handler: Arc<dyn Handler<C>>,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            order,
            filters: Vec::new(),
            factory: HandlerFactory::Singleton(handler),
        }
    }

    pub(crate) fn with_filter(
        mut self,
        filter: impl Fn(&C) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// The descriptor's name, used in log output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The descriptor's order key. Lower orders run first; equal orders run
    /// in registration order.
    pub fn order(&self) -> i32 {
        self.order
    }

    /// The handler's execution kind.
    pub fn kind(&self) -> HandlerKind {
        match &self.factory {
            HandlerFactory::Singleton(_) => HandlerKind::Singleton,
            HandlerFactory::Scoped(_) => HandlerKind::Scoped,
        }
    }

    /// Evaluate the descriptor's filters against the context's current
    /// state. The handler runs only if every filter returns true.
    pub fn accepts(&self, ctx: &C) -> bool {
        self.filters.iter().all(|filter| filter(ctx))
    }

    pub(crate) fn instantiate(&self) -> Arc<dyn Handler<C>> {
        match &self.factory {
            HandlerFactory::Singleton(handler) => handler.clone(),
            HandlerFactory::Scoped(factory) => factory(),
        }
    }
}

/// Builder for [`HandlerDescriptor`].
///
/// `order` and exactly one of `instance`/`factory` are required;
/// [`build`](Self::build) fails with [`Error::Descriptor`] when either is
/// missing. Missing required fields are a precondition violation surfaced at
/// construction time, never at dispatch time.
pub struct DescriptorBuilder<C> {
    name: Option<Cow<'static, str>>,
    order: Option<i32>,
    filters: Vec<HandlerFilter<C>>,
    factory: Option<HandlerFactory<C>>,
}

impl<C> DescriptorBuilder<C> {
    fn new() -> Self {
        Self {
            name: None,
            order: None,
            filters: Vec::new(),
            factory: None,
        }
    }

    /// Set the descriptor's name for log output.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the descriptor's order key. Required.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Add a filter predicate. A handler with several filters runs only when
    /// all of them return true.
    pub fn filter(mut self, filter: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Register a singleton handler instance shared by every dispatch.
    pub fn instance(mut self, handler: impl Handler<C> + 'static) -> Self
    where
        C: Send,
    {
        self.factory = Some(HandlerFactory::Singleton(Arc::new(handler)));
        self
    }

    /// Register a factory producing a fresh handler instance per dispatch.
    pub fn factory(
        mut self,
        factory: impl Fn() -> Arc<dyn Handler<C>> + Send + Sync + 'static,
    ) -> Self
    where
        C: Send,
    {
        self.factory = Some(HandlerFactory::Scoped(Arc::new(factory)));
        self
    }

    /// Validate the required fields and build the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Descriptor`] when `order` or the handler
    /// instance/factory is missing.
    pub fn build(self) -> Result<HandlerDescriptor<C>> {
        let order = self
            .order
            .ok_or_else(|| Error::descriptor("an order key is required"))?;
        let factory = self
            .factory
            .ok_or_else(|| Error::descriptor("a handler instance or factory is required"))?;

        Ok(HandlerDescriptor {
            name: self.name.unwrap_or(Cow::Borrowed("handler")),
            order,
            filters: self.filters,
            factory,
        })
    }
}
