//! The handler catalog: ordered, immutable descriptor collections.
//!
//! A catalog is assembled once at validator startup -- built-in descriptors
//! first, host extensions appended -- and never mutated afterwards. Each
//! context kind has its own descriptor list, stable-sorted by order key, so
//! execution order is a pure function of `(order, insertion index)`: two
//! catalogs built from the same registration sequence always dispatch in the
//! same order.

use std::sync::Arc;

use crate::config::ConfigurationSource;
use crate::context::{AuthenticationContext, ChallengeContext, ErrorContext, ValidateTokenContext};
use crate::descriptor::HandlerDescriptor;
use crate::dispatch::DispatchContext;
use crate::handlers::{
    AttachCustomChallengeParameters, AttachCustomErrorParameters, AttachDefaultChallengeError,
    AttachErrorParameters, EvaluateValidatedTokens, ResolveServerConfiguration,
    ValidateAccessToken, ValidateRequiredTokens,
};

/// The ordered descriptor list for one context kind.
pub struct HandlerSet<C> {
    entries: Vec<HandlerDescriptor<C>>,
}

impl<C> std::fmt::Debug for HandlerSet<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl<C> HandlerSet<C> {
    fn from_registrations(mut entries: Vec<HandlerDescriptor<C>>) -> Self {
        // sort_by_key is stable: equal orders keep their registration order.
        entries.sort_by_key(|descriptor| descriptor.order());
        Self { entries }
    }

    /// Iterate the descriptors in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &HandlerDescriptor<C>> {
        self.entries.iter()
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no descriptors are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable catalog of handler descriptors for every context kind.
///
/// Build one with [`HandlerCatalog::builder`] (built-ins included) or
/// [`CatalogBuilder::empty`] (full host control), then hand it to a
/// [`Dispatcher`](crate::dispatch::Dispatcher).
#[derive(Debug)]
pub struct HandlerCatalog {
    pub(crate) authentication: HandlerSet<AuthenticationContext>,
    pub(crate) challenge: HandlerSet<ChallengeContext>,
    pub(crate) error: HandlerSet<ErrorContext>,
    pub(crate) validate_token: HandlerSet<ValidateTokenContext>,
}

impl HandlerCatalog {
    /// Start a builder pre-seeded with the built-in handlers for all three
    /// flows, wired to the given configuration source.
    ///
    /// Token-validation handlers for the nested sub-dispatch are not seeded;
    /// the host registers at least one (for example a
    /// [`JwtTokenHandler`](crate::jwt::JwtTokenHandler) descriptor).
    pub fn builder(source: Arc<dyn ConfigurationSource>) -> CatalogBuilder {
        CatalogBuilder::empty()
            .register(ResolveServerConfiguration::descriptor(source))
            .register(EvaluateValidatedTokens::descriptor())
            .register(ValidateRequiredTokens::descriptor())
            .register(ValidateAccessToken::descriptor())
            .register(AttachDefaultChallengeError::descriptor())
            .register(AttachCustomChallengeParameters::descriptor())
            .register(AttachErrorParameters::descriptor())
            .register(AttachCustomErrorParameters::descriptor())
    }

    /// Descriptors for the authentication flow, in execution order.
    pub fn authentication(&self) -> &HandlerSet<AuthenticationContext> {
        &self.authentication
    }

    /// Descriptors for the challenge flow, in execution order.
    pub fn challenge(&self) -> &HandlerSet<ChallengeContext> {
        &self.challenge
    }

    /// Descriptors for the error flow, in execution order.
    pub fn error(&self) -> &HandlerSet<ErrorContext> {
        &self.error
    }

    /// Descriptors for the nested token-validation flow, in execution order.
    pub fn validate_token(&self) -> &HandlerSet<ValidateTokenContext> {
        &self.validate_token
    }
}

/// Builder assembling a [`HandlerCatalog`] from descriptor registrations.
///
/// Registrations are append-only; [`build`](Self::build) performs the stable
/// sort and freezes the catalog.
#[derive(Default)]
pub struct CatalogBuilder {
    pub(crate) authentication: Vec<HandlerDescriptor<AuthenticationContext>>,
    pub(crate) challenge: Vec<HandlerDescriptor<ChallengeContext>>,
    pub(crate) error: Vec<HandlerDescriptor<ErrorContext>>,
    pub(crate) validate_token: Vec<HandlerDescriptor<ValidateTokenContext>>,
}

impl CatalogBuilder {
    /// Start a builder with no registrations at all, not even the built-in
    /// handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a descriptor; the context kind is carried by the
    /// descriptor's type.
    pub fn register<C: DispatchContext>(mut self, descriptor: HandlerDescriptor<C>) -> Self {
        C::handler_bucket(&mut self).push(descriptor);
        self
    }

    /// Stable-sort every registration list and freeze the catalog.
    pub fn build(self) -> HandlerCatalog {
        HandlerCatalog {
            authentication: HandlerSet::from_registrations(self.authentication),
            challenge: HandlerSet::from_registrations(self.challenge),
            error: HandlerSet::from_registrations(self.error),
            validate_token: HandlerSet::from_registrations(self.validate_token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfiguration, StaticConfigurationSource};
    use crate::handler::handler_fn;

    fn descriptor(name: &'static str, order: i32) -> HandlerDescriptor<AuthenticationContext> {
        HandlerDescriptor::builder()
            .name(name)
            .order(order)
            .instance(handler_fn(|_ctx: &mut AuthenticationContext| Ok(())))
            .build()
            .unwrap()
    }

    fn names(set: &HandlerSet<AuthenticationContext>) -> Vec<&str> {
        set.iter().map(|d| d.name()).collect()
    }

    #[test]
    fn test_sorted_by_order() {
        let catalog = CatalogBuilder::empty()
            .register(descriptor("third", 300))
            .register(descriptor("first", 100))
            .register(descriptor("second", 200))
            .build();

        assert_eq!(
            names(catalog.authentication()),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_equal_orders_preserve_registration_order() {
        let catalog = CatalogBuilder::empty()
            .register(descriptor("a", 100))
            .register(descriptor("b", 100))
            .register(descriptor("c", 50))
            .register(descriptor("d", 100))
            .build();

        assert_eq!(names(catalog.authentication()), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_same_registrations_same_order() {
        let build = || {
            CatalogBuilder::empty()
                .register(descriptor("x", 10))
                .register(descriptor("y", 10))
                .register(descriptor("z", 5))
                .build()
        };

        let first = build();
        let second = build();
        assert_eq!(
            names(first.authentication()),
            names(second.authentication())
        );
    }

    #[test]
    fn test_builder_seeds_builtins_in_ascending_order() {
        let source = Arc::new(StaticConfigurationSource::new(ServerConfiguration::new(
            "https://auth.example.com",
        )));
        let catalog = HandlerCatalog::builder(source).build();

        assert_eq!(
            names(catalog.authentication()),
            vec![
                "resolve_server_configuration",
                "evaluate_validated_tokens",
                "validate_required_tokens",
                "validate_access_token",
            ]
        );
        assert_eq!(catalog.challenge().len(), 2);
        assert_eq!(catalog.error().len(), 2);
        assert!(catalog.validate_token().is_empty());
    }

    #[test]
    fn test_host_extension_lands_between_builtins() {
        let source = Arc::new(StaticConfigurationSource::new(ServerConfiguration::new(
            "https://auth.example.com",
        )));
        let catalog = HandlerCatalog::builder(source)
            .register(descriptor("audit", 3_500))
            .build();

        let order: Vec<&str> = names(catalog.authentication());
        assert_eq!(order[2], "validate_required_tokens");
        assert_eq!(order[3], "audit");
        assert_eq!(order[4], "validate_access_token");
    }
}
