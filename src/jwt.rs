//! JWT token-validation handler for the nested sub-dispatch.
//!
//! [`JwtTokenHandler`] resolves a JWT access token into a
//! [`Principal`](crate::principal::Principal) using static decoding keys.
//! Supports RSA, HMAC, and EC algorithms via the `jsonwebtoken` crate.
//! Register its descriptor on the catalog to enable JWT validation:
//!
//! ```rust
//! use std::sync::Arc;
//! use tokengate::jwt::JwtTokenHandler;
//! use tokengate::{HandlerCatalog, ServerConfiguration, StaticConfigurationSource};
//!
//! let source = Arc::new(StaticConfigurationSource::new(
//!     ServerConfiguration::new("https://auth.example.com"),
//! ));
//! let handler = JwtTokenHandler::from_secret(b"shared-secret")
//!     .expected_issuer("https://auth.example.com")
//!     .expected_audience("https://api.example.com");
//!
//! let catalog = HandlerCatalog::builder(source)
//!     .register(handler.descriptor())
//!     .build();
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::context::{TokenTypeHint, ValidateTokenContext};
use crate::descriptor::HandlerDescriptor;
use crate::error::Result;
use crate::handler::Handler;
use crate::principal::Principal;
use crate::response::ProtocolError;

const ORDER: i32 = 1_000;

/// Sub-dispatch handler validating JWT access tokens with static keys.
///
/// Its descriptor carries a filter restricting it to validations that allow
/// the `access_token` type hint. A definitive verification failure rejects
/// the sub-context with `invalid_token`; the outer authentication flow
/// decides whether that rejection propagates.
#[derive(Clone)]
pub struct JwtTokenHandler {
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtTokenHandler {
    /// Create a default `Validation` with audience validation disabled.
    ///
    /// By default, `jsonwebtoken::Validation` requires audience claims and
    /// an `exp` claim; both are opt-in here, since access tokens may omit
    /// them.
    fn default_validation(algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation
    }

    /// Create a handler from an HMAC secret.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(Self::default_validation(Algorithm::HS256)),
        }
    }

    /// Create a handler from an RSA PEM-encoded public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM data is invalid.
    pub fn from_rsa_pem(pem: &[u8]) -> std::result::Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            decoding_key: Arc::new(DecodingKey::from_rsa_pem(pem)?),
            validation: Arc::new(Self::default_validation(Algorithm::RS256)),
        })
    }

    /// Create a handler from an EC PEM-encoded public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM data is invalid.
    pub fn from_ec_pem(pem: &[u8]) -> std::result::Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            decoding_key: Arc::new(DecodingKey::from_ec_pem(pem)?),
            validation: Arc::new(Self::default_validation(Algorithm::ES256)),
        })
    }

    /// Set the expected audience; tokens without a matching `aud` claim are
    /// rejected.
    pub fn expected_audience(mut self, audience: &str) -> Self {
        let mut validation = (*self.validation).clone();
        validation.set_audience(&[audience]);
        self.validation = Arc::new(validation);
        self
    }

    /// Set the expected issuer; tokens without a matching `iss` claim are
    /// rejected.
    pub fn expected_issuer(mut self, issuer: &str) -> Self {
        let mut validation = (*self.validation).clone();
        validation.set_issuer(&[issuer]);
        self.validation = Arc::new(validation);
        self
    }

    /// Disable expiration validation.
    ///
    /// Use with caution -- tokens without expiration checks may be reused
    /// indefinitely.
    pub fn disable_exp_validation(mut self) -> Self {
        let mut validation = (*self.validation).clone();
        validation.validate_exp = false;
        self.validation = Arc::new(validation);
        self
    }

    /// Set the allowed signing algorithms.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        let mut validation = (*self.validation).clone();
        validation.algorithms = algorithms;
        self.validation = Arc::new(validation);
        self
    }

    /// Build the sub-dispatch descriptor for this handler.
    pub fn descriptor(self) -> HandlerDescriptor<ValidateTokenContext> {
        HandlerDescriptor::from_instance("validate_jwt_token", ORDER, Arc::new(self)).with_filter(
            |ctx: &ValidateTokenContext| ctx.valid_token_types.contains(&TokenTypeHint::AccessToken),
        )
    }
}

#[async_trait]
impl Handler<ValidateTokenContext> for JwtTokenHandler {
    async fn handle(&self, ctx: &mut ValidateTokenContext) -> Result<()> {
        if ctx.principal.is_some() {
            return Ok(());
        }

        match jsonwebtoken::decode::<Principal>(&ctx.token, &self.decoding_key, &self.validation) {
            Ok(data) => ctx.principal = Some(data.claims),
            Err(error) => match error.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ctx.reject(
                    ProtocolError::InvalidToken,
                    "The access token has expired.",
                    "",
                ),
                jsonwebtoken::errors::ErrorKind::InvalidAudience => ctx.reject(
                    ProtocolError::InvalidToken,
                    "The token audience does not match this resource server.",
                    "",
                ),
                _ => ctx.reject(ProtocolError::InvalidToken, error.to_string(), ""),
            },
        }
        Ok(())
    }
}
