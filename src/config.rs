//! Server configuration and the configuration collaborator boundary.
//!
//! The pipeline never fetches issuer metadata itself: the built-in
//! [`ResolveServerConfiguration`](crate::handlers::ResolveServerConfiguration)
//! handler asks a [`ConfigurationSource`] for it. Remote retrieval (OIDC
//! discovery, static files, control planes) lives behind that trait in host
//! code; this module ships the metadata model, a static source, and a
//! memoizing wrapper that performs at most one refresh under concurrent
//! misses.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::transaction::CancellationToken;

/// Issuer metadata for the authorization server this validator trusts.
///
/// # Example
///
/// ```rust
/// use tokengate::ServerConfiguration;
///
/// let configuration = ServerConfiguration::new("https://auth.example.com")
///     .jwks_uri("https://auth.example.com/.well-known/jwks.json")
///     .introspection_endpoint("https://auth.example.com/introspect")
///     .signing_algorithm("RS256");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfiguration {
    /// The authorization server's issuer identifier URL.
    pub issuer: String,

    /// URL of the issuer's JSON Web Key Set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// URL of the issuer's token introspection endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,

    /// Signing algorithms the issuer uses for access tokens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_algorithms: Vec<String>,
}

impl ServerConfiguration {
    /// Create a configuration with the issuer identifier URL.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            jwks_uri: None,
            introspection_endpoint: None,
            signing_algorithms: Vec::new(),
        }
    }

    /// Set the JSON Web Key Set URL.
    pub fn jwks_uri(mut self, uri: impl Into<String>) -> Self {
        self.jwks_uri = Some(uri.into());
        self
    }

    /// Set the token introspection endpoint URL.
    pub fn introspection_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.introspection_endpoint = Some(endpoint.into());
        self
    }

    /// Add a supported signing algorithm.
    pub fn signing_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.signing_algorithms.push(algorithm.into());
        self
    }
}

/// Collaborator resolving the issuer metadata for this validator.
///
/// Implementations are expected to memoize: the resolve handler calls this
/// once per authentication attempt. Failure is fatal for the attempt --
/// surfaced as [`Error::Configuration`], a fault rather than a rejection.
/// Retries, if any, belong to the implementation, never to the dispatcher.
#[async_trait]
pub trait ConfigurationSource: Send + Sync {
    /// Resolve the configuration, observing the cancellation token at every
    /// suspension point.
    async fn configuration(
        &self,
        cancellation: &CancellationToken,
    ) -> Result<Arc<ServerConfiguration>>;
}

/// A configuration source backed by a fixed, pre-built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigurationSource {
    configuration: Arc<ServerConfiguration>,
}

impl StaticConfigurationSource {
    /// Create a source that always returns the given configuration.
    pub fn new(configuration: ServerConfiguration) -> Self {
        Self {
            configuration: Arc::new(configuration),
        }
    }
}

#[async_trait]
impl ConfigurationSource for StaticConfigurationSource {
    async fn configuration(
        &self,
        _cancellation: &CancellationToken,
    ) -> Result<Arc<ServerConfiguration>> {
        Ok(self.configuration.clone())
    }
}

/// Memoizing wrapper around another configuration source.
///
/// The first successful resolution is cached for the process lifetime.
/// Concurrent misses are collapsed into a single refresh of the inner
/// source; a failed refresh leaves the cache empty so a later request may
/// trigger another attempt.
pub struct CachedConfigurationSource<S> {
    inner: S,
    cache: OnceCell<Arc<ServerConfiguration>>,
}

impl<S> CachedConfigurationSource<S> {
    /// Wrap a source with process-lifetime memoization.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: OnceCell::new(),
        }
    }
}

#[async_trait]
impl<S: ConfigurationSource> ConfigurationSource for CachedConfigurationSource<S> {
    async fn configuration(
        &self,
        cancellation: &CancellationToken,
    ) -> Result<Arc<ServerConfiguration>> {
        self.cache
            .get_or_try_init(|| async {
                if cancellation.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                self.inner.configuration(cancellation).await
            })
            .await
            .cloned()
    }
}
