//! Built-in handlers for the authentication flow.

use std::sync::Arc;

use async_trait::async_trait;

use super::order;
use crate::config::ConfigurationSource;
use crate::context::{AuthenticationContext, Disposition, TokenTypeHint, ValidateTokenContext};
use crate::descriptor::HandlerDescriptor;
use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::response::ProtocolError;

/// Resolves the issuer metadata for the authentication attempt.
///
/// Runs first so every later handler can rely on
/// [`configuration`](AuthenticationContext::configuration) being attached.
/// A context that already carries a configuration is left untouched. A
/// source failure is fatal for the whole attempt: it propagates as a fault
/// rather than rejecting the request.
pub struct ResolveServerConfiguration {
    source: Arc<dyn ConfigurationSource>,
}

impl ResolveServerConfiguration {
    /// Create the handler over the given configuration source.
    pub fn new(source: Arc<dyn ConfigurationSource>) -> Self {
        Self { source }
    }

    /// The built-in descriptor for this handler.
    pub fn descriptor(
        source: Arc<dyn ConfigurationSource>,
    ) -> HandlerDescriptor<AuthenticationContext> {
        HandlerDescriptor::from_instance(
            "resolve_server_configuration",
            order::RESOLVE_SERVER_CONFIGURATION,
            Arc::new(Self::new(source)),
        )
    }
}

#[async_trait]
impl Handler<AuthenticationContext> for ResolveServerConfiguration {
    async fn handle(&self, ctx: &mut AuthenticationContext) -> Result<()> {
        if ctx.configuration.is_some() {
            return Ok(());
        }

        let cancellation = ctx.cancellation().clone();
        let configuration = self.source.configuration(&cancellation).await?;
        ctx.configuration = Some(configuration);
        Ok(())
    }
}

/// Resolves the four token-handling flags from the endpoint type.
///
/// Only `Unknown` endpoints -- arbitrary API routes this validator does not
/// own -- require it to autonomously extract and enforce a bearer token, so
/// they get all four flags; owned endpoints have bespoke handling elsewhere
/// and get none.
pub struct EvaluateValidatedTokens;

impl EvaluateValidatedTokens {
    /// The built-in descriptor for this handler.
    pub fn descriptor() -> HandlerDescriptor<AuthenticationContext> {
        HandlerDescriptor::from_instance(
            "evaluate_validated_tokens",
            order::EVALUATE_VALIDATED_TOKENS,
            Arc::new(Self),
        )
    }
}

#[async_trait]
impl Handler<AuthenticationContext> for EvaluateValidatedTokens {
    async fn handle(&self, ctx: &mut AuthenticationContext) -> Result<()> {
        let enforce = !ctx.endpoint.is_owned();
        ctx.extract_access_token = enforce;
        ctx.require_access_token = enforce;
        ctx.validate_access_token = enforce;
        ctx.reject_access_token = enforce;
        Ok(())
    }
}

/// Rejects requests that require a bearer token but carry none.
pub struct ValidateRequiredTokens;

impl ValidateRequiredTokens {
    /// The built-in descriptor for this handler.
    pub fn descriptor() -> HandlerDescriptor<AuthenticationContext> {
        HandlerDescriptor::from_instance(
            "validate_required_tokens",
            order::VALIDATE_REQUIRED_TOKENS,
            Arc::new(Self),
        )
    }
}

#[async_trait]
impl Handler<AuthenticationContext> for ValidateRequiredTokens {
    async fn handle(&self, ctx: &mut AuthenticationContext) -> Result<()> {
        if !ctx.require_access_token {
            return Ok(());
        }
        if ctx.access_token.as_deref().unwrap_or("").is_empty() {
            ctx.reject(
                ProtocolError::MissingToken,
                "The bearer token is missing from the request.",
                "",
            );
        }
        Ok(())
    }
}

/// Resolves the attached bearer token through the nested token-validation
/// sub-dispatch.
///
/// Registered with a filter on
/// [`validate_access_token`](AuthenticationContext::validate_access_token);
/// a no-op when a principal is already attached or no token is present.
/// The sub-flow's outcome maps onto the outer context: handled absorbs the
/// remaining pipeline, skipped skips it, and a rejection rejects the outer
/// context only when
/// [`reject_access_token`](AuthenticationContext::reject_access_token) is
/// set -- with a generic `invalid_request` error when the sub-flow supplied
/// none. A sub-flow that completes without attaching a principal counts as
/// a rejection without an explicit error.
pub struct ValidateAccessToken;

impl ValidateAccessToken {
    /// The built-in descriptor for this handler.
    pub fn descriptor() -> HandlerDescriptor<AuthenticationContext> {
        HandlerDescriptor::from_instance(
            "validate_access_token",
            order::VALIDATE_ACCESS_TOKEN,
            Arc::new(Self),
        )
        .with_filter(|ctx: &AuthenticationContext| ctx.validate_access_token)
    }
}

#[async_trait]
impl Handler<AuthenticationContext> for ValidateAccessToken {
    async fn handle(&self, ctx: &mut AuthenticationContext) -> Result<()> {
        if ctx.principal.is_some() {
            return Ok(());
        }
        let Some(token) = ctx.access_token.clone().filter(|token| !token.is_empty()) else {
            return Ok(());
        };

        let dispatcher = ctx
            .dispatcher()
            .cloned()
            .ok_or_else(|| Error::internal("validate_access_token invoked outside a dispatch"))?;

        let mut sub = ValidateTokenContext::new(ctx.transaction().clone(), token);
        sub.valid_token_types.insert(TokenTypeHint::AccessToken);
        dispatcher.dispatch(&mut sub).await?;

        match sub.disposition().clone() {
            Disposition::Handled => ctx.mark_handled(),
            Disposition::Skipped => ctx.mark_skipped(),
            Disposition::Rejected {
                error,
                description,
                uri,
            } => {
                if ctx.reject_access_token {
                    reject_with_default(ctx, error, description, uri);
                }
            }
            Disposition::Continuing => match sub.principal.take() {
                Some(principal) => ctx.principal = Some(principal),
                None => {
                    if ctx.reject_access_token {
                        reject_with_default(ctx, None, None, None);
                    }
                }
            },
        }
        Ok(())
    }
}

fn reject_with_default(
    ctx: &mut AuthenticationContext,
    error: Option<String>,
    description: Option<String>,
    uri: Option<String>,
) {
    ctx.reject(
        error.unwrap_or_else(|| ProtocolError::InvalidRequest.into()),
        description.unwrap_or_else(|| "The provided access token is not valid.".to_string()),
        uri.unwrap_or_default(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, HandlerCatalog};
    use crate::config::{ServerConfiguration, StaticConfigurationSource};
    use crate::context::EndpointType;
    use crate::dispatch::Dispatcher;
    use crate::handler::handler_fn;
    use crate::principal::Principal;
    use crate::transaction::{CancellationToken, Transaction};

    fn context() -> AuthenticationContext {
        AuthenticationContext::new(Arc::new(Transaction::new()))
    }

    fn static_source() -> Arc<StaticConfigurationSource> {
        Arc::new(StaticConfigurationSource::new(ServerConfiguration::new(
            "https://auth.example.com",
        )))
    }

    /// Dispatcher over a catalog holding only [`ValidateAccessToken`] and the
    /// given token-validation sub-handlers.
    fn validation_dispatcher(
        sub_handlers: Vec<HandlerDescriptor<ValidateTokenContext>>,
    ) -> Dispatcher {
        let mut builder = CatalogBuilder::empty().register(ValidateAccessToken::descriptor());
        for descriptor in sub_handlers {
            builder = builder.register(descriptor);
        }
        Dispatcher::new(builder.build())
    }

    fn sub_descriptor(
        handler: impl Handler<ValidateTokenContext> + 'static,
    ) -> HandlerDescriptor<ValidateTokenContext> {
        HandlerDescriptor::builder()
            .order(1_000)
            .instance(handler)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_configuration_attaches_metadata() {
        let handler = ResolveServerConfiguration::new(static_source());
        let mut ctx = context();

        handler.handle(&mut ctx).await.unwrap();
        assert_eq!(
            ctx.configuration.as_ref().unwrap().issuer,
            "https://auth.example.com"
        );
    }

    #[tokio::test]
    async fn test_resolve_configuration_reuses_attached_metadata() {
        struct FailingSource;

        #[async_trait]
        impl ConfigurationSource for FailingSource {
            async fn configuration(
                &self,
                _cancellation: &CancellationToken,
            ) -> Result<Arc<ServerConfiguration>> {
                Err(Error::configuration("issuer unreachable"))
            }
        }

        let handler = ResolveServerConfiguration::new(Arc::new(FailingSource));
        let mut ctx = context();
        ctx.configuration = Some(Arc::new(ServerConfiguration::new("https://cached.example.com")));

        // Already resolved: the failing source is never consulted.
        handler.handle(&mut ctx).await.unwrap();
        assert_eq!(
            ctx.configuration.as_ref().unwrap().issuer,
            "https://cached.example.com"
        );
    }

    #[tokio::test]
    async fn test_resolve_configuration_failure_is_fault() {
        struct FailingSource;

        #[async_trait]
        impl ConfigurationSource for FailingSource {
            async fn configuration(
                &self,
                _cancellation: &CancellationToken,
            ) -> Result<Arc<ServerConfiguration>> {
                Err(Error::configuration("issuer unreachable"))
            }
        }

        let handler = ResolveServerConfiguration::new(Arc::new(FailingSource));
        let mut ctx = context();

        let result = handler.handle(&mut ctx).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert_eq!(ctx.disposition(), &Disposition::Continuing);
    }

    #[tokio::test]
    async fn test_evaluate_flags_for_unknown_endpoint() {
        let mut ctx = context();
        ctx.endpoint = EndpointType::Unknown;

        EvaluateValidatedTokens.handle(&mut ctx).await.unwrap();
        assert!(ctx.extract_access_token);
        assert!(ctx.require_access_token);
        assert!(ctx.validate_access_token);
        assert!(ctx.reject_access_token);
    }

    #[tokio::test]
    async fn test_evaluate_flags_for_owned_endpoint() {
        let mut ctx = context();
        ctx.endpoint = EndpointType::ResourceMetadata;
        ctx.require_access_token = true;

        EvaluateValidatedTokens.handle(&mut ctx).await.unwrap();
        assert!(!ctx.extract_access_token);
        assert!(!ctx.require_access_token);
        assert!(!ctx.validate_access_token);
        assert!(!ctx.reject_access_token);
    }

    #[tokio::test]
    async fn test_required_token_missing_rejects() {
        let mut ctx = context();
        ctx.require_access_token = true;
        ctx.access_token = Some(String::new());

        ValidateRequiredTokens.handle(&mut ctx).await.unwrap();
        assert!(ctx.disposition().is_rejected());
        assert_eq!(ctx.response().error.as_deref(), Some("missing_token"));
    }

    #[tokio::test]
    async fn test_required_token_absent_flag_never_rejects() {
        let mut ctx = context();
        ctx.require_access_token = false;
        ctx.access_token = None;

        ValidateRequiredTokens.handle(&mut ctx).await.unwrap();
        assert_eq!(ctx.disposition(), &Disposition::Continuing);
    }

    #[tokio::test]
    async fn test_required_token_present_continues() {
        let mut ctx = context();
        ctx.require_access_token = true;
        ctx.access_token = Some("token".to_string());

        ValidateRequiredTokens.handle(&mut ctx).await.unwrap();
        assert_eq!(ctx.disposition(), &Disposition::Continuing);
    }

    #[tokio::test]
    async fn test_validation_attaches_principal() {
        let dispatcher = validation_dispatcher(vec![sub_descriptor(handler_fn(
            |ctx: &mut ValidateTokenContext| {
                assert!(ctx.valid_token_types.contains(&TokenTypeHint::AccessToken));
                ctx.principal = Some(Principal {
                    subject: Some("user-42".to_string()),
                    ..Principal::default()
                });
                Ok(())
            },
        ))]);

        let mut ctx = context();
        ctx.validate_access_token = true;
        ctx.reject_access_token = true;
        ctx.access_token = Some("valid-token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.disposition(), &Disposition::Continuing);
        assert_eq!(
            ctx.principal.as_ref().unwrap().subject.as_deref(),
            Some("user-42")
        );
    }

    #[tokio::test]
    async fn test_validation_skipped_when_principal_attached() {
        let invoked = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let dispatcher = {
            let invoked = invoked.clone();
            validation_dispatcher(vec![sub_descriptor(handler_fn(
                move |_ctx: &mut ValidateTokenContext| {
                    invoked.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(())
                },
            ))])
        };

        let mut ctx = context();
        ctx.validate_access_token = true;
        ctx.access_token = Some("valid-token".to_string());
        ctx.principal = Some(Principal::default());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(invoked.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_skipped_without_token() {
        let invoked = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let dispatcher = {
            let invoked = invoked.clone();
            validation_dispatcher(vec![sub_descriptor(handler_fn(
                move |_ctx: &mut ValidateTokenContext| {
                    invoked.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(())
                },
            ))])
        };

        let mut ctx = context();
        ctx.validate_access_token = true;

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(invoked.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(ctx.disposition(), &Disposition::Continuing);
    }

    #[tokio::test]
    async fn test_sub_rejection_with_reject_flag_rejects_outer() {
        let dispatcher = validation_dispatcher(vec![sub_descriptor(handler_fn(
            |ctx: &mut ValidateTokenContext| {
                ctx.reject(ProtocolError::InvalidToken, "The token signature is invalid.", "");
                Ok(())
            },
        ))]);

        let mut ctx = context();
        ctx.validate_access_token = true;
        ctx.reject_access_token = true;
        ctx.access_token = Some("bad-token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().error.as_deref(), Some("invalid_token"));
        assert_eq!(
            ctx.response().error_description.as_deref(),
            Some("The token signature is invalid.")
        );
    }

    #[tokio::test]
    async fn test_sub_rejection_without_reject_flag_continues() {
        let dispatcher = validation_dispatcher(vec![sub_descriptor(handler_fn(
            |ctx: &mut ValidateTokenContext| {
                ctx.reject(ProtocolError::InvalidToken, "", "");
                Ok(())
            },
        ))]);

        let mut ctx = context();
        ctx.validate_access_token = true;
        ctx.reject_access_token = false;
        ctx.access_token = Some("bad-token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.disposition(), &Disposition::Continuing);
        assert!(ctx.response().error.is_none());
    }

    #[tokio::test]
    async fn test_sub_rejection_without_error_uses_generic_code() {
        let dispatcher = validation_dispatcher(vec![sub_descriptor(handler_fn(
            |ctx: &mut ValidateTokenContext| {
                ctx.reject("", "", "");
                Ok(())
            },
        ))]);

        let mut ctx = context();
        ctx.validate_access_token = true;
        ctx.reject_access_token = true;
        ctx.access_token = Some("bad-token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().error.as_deref(), Some("invalid_request"));
    }

    #[tokio::test]
    async fn test_sub_handled_absorbs_outer_pipeline() {
        let dispatcher = validation_dispatcher(vec![sub_descriptor(handler_fn(
            |ctx: &mut ValidateTokenContext| {
                ctx.mark_handled();
                Ok(())
            },
        ))]);

        let mut ctx = context();
        ctx.validate_access_token = true;
        ctx.access_token = Some("token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.disposition(), &Disposition::Handled);
    }

    #[tokio::test]
    async fn test_sub_skipped_skips_outer_pipeline() {
        let dispatcher = validation_dispatcher(vec![sub_descriptor(handler_fn(
            |ctx: &mut ValidateTokenContext| {
                ctx.mark_skipped();
                Ok(())
            },
        ))]);

        let mut ctx = context();
        ctx.validate_access_token = true;
        ctx.access_token = Some("token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.disposition(), &Disposition::Skipped);
    }

    #[tokio::test]
    async fn test_unresolved_token_counts_as_unexplained_rejection() {
        // No sub-handler claims the token.
        let dispatcher = validation_dispatcher(Vec::new());

        let mut ctx = context();
        ctx.validate_access_token = true;
        ctx.reject_access_token = true;
        ctx.access_token = Some("token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.response().error.as_deref(), Some("invalid_request"));
        assert_eq!(
            ctx.response().error_description.as_deref(),
            Some("The provided access token is not valid.")
        );
    }

    #[tokio::test]
    async fn test_filter_gates_validation() {
        let invoked = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let dispatcher = {
            let invoked = invoked.clone();
            validation_dispatcher(vec![sub_descriptor(handler_fn(
                move |_ctx: &mut ValidateTokenContext| {
                    invoked.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(())
                },
            ))])
        };

        let mut ctx = context();
        ctx.validate_access_token = false;
        ctx.access_token = Some("token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(invoked.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_builtin_chain_happy_path() {
        let catalog = HandlerCatalog::builder(static_source())
            .register(sub_descriptor(handler_fn(
                |ctx: &mut ValidateTokenContext| {
                    ctx.principal = Some(Principal {
                        subject: Some("user-42".to_string()),
                        ..Principal::default()
                    });
                    Ok(())
                },
            )))
            .build();
        let dispatcher = Dispatcher::new(catalog);

        let mut ctx = context();
        ctx.endpoint = EndpointType::Unknown;
        ctx.access_token = Some("valid-token".to_string());

        dispatcher.dispatch(&mut ctx).await.unwrap();
        assert_eq!(ctx.disposition(), &Disposition::Continuing);
        assert!(ctx.principal.is_some());
        assert!(ctx.configuration.is_some());
    }
}
