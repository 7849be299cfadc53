//! Built-in handlers for the challenge flow.

use std::sync::Arc;

use async_trait::async_trait;

use super::order;
use crate::context::ChallengeContext;
use crate::descriptor::HandlerDescriptor;
use crate::error::Result;
use crate::handler::Handler;
use crate::response::ProtocolError;
use crate::transaction::ContextKind;

/// Fills the challenge response's error fields from the authentication
/// attempt.
///
/// Reads the authentication outcome recorded on the transaction: if the
/// attempt recorded an error, it is reused; otherwise the challenge defaults
/// to `insufficient_access`, since an attempt that rejected nothing usually
/// means the request failed an authorization check further up the stack.
/// Fields the host already set on the response are left untouched.
pub struct AttachDefaultChallengeError;

impl AttachDefaultChallengeError {
    /// The built-in descriptor for this handler.
    pub fn descriptor() -> HandlerDescriptor<ChallengeContext> {
        HandlerDescriptor::from_instance(
            "attach_default_challenge_error",
            order::ATTACH_DEFAULT_CHALLENGE_ERROR,
            Arc::new(Self),
        )
    }
}

#[async_trait]
impl Handler<ChallengeContext> for AttachDefaultChallengeError {
    async fn handle(&self, ctx: &mut ChallengeContext) -> Result<()> {
        let outcome = ctx.transaction().outcome(ContextKind::Authentication);
        let (error, description, uri) = match outcome {
            Some(outcome) if outcome.error.is_some() => (
                outcome.error,
                outcome.error_description,
                outcome.error_uri,
            ),
            _ => (
                Some(ProtocolError::InsufficientAccess.into()),
                Some(
                    "The identified user is not allowed to perform the requested action."
                        .to_string(),
                ),
                None,
            ),
        };

        let response = ctx.response_mut();
        if response.error.is_none() {
            response.error = error;
        }
        if response.error_description.is_none() {
            response.error_description = description;
        }
        if response.error_uri.is_none() {
            response.error_uri = uri;
        }
        Ok(())
    }
}

/// Copies the host's custom parameters onto the challenge response.
///
/// Runs after the default handlers, so a custom value wins over anything
/// they attached.
pub struct AttachCustomChallengeParameters;

impl AttachCustomChallengeParameters {
    /// The built-in descriptor for this handler.
    pub fn descriptor() -> HandlerDescriptor<ChallengeContext> {
        HandlerDescriptor::from_instance(
            "attach_custom_challenge_parameters",
            order::ATTACH_CUSTOM_CHALLENGE_PARAMETERS,
            Arc::new(Self),
        )
    }
}

#[async_trait]
impl Handler<ChallengeContext> for AttachCustomChallengeParameters {
    async fn handle(&self, ctx: &mut ChallengeContext) -> Result<()> {
        let parameters: Vec<(String, serde_json::Value)> = ctx
            .parameters()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, value) in parameters {
            ctx.response_mut().set_parameter(name, value);
        }
        Ok(())
    }
}
