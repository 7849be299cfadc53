//! Built-in handlers for the error flow.

use std::sync::Arc;

use async_trait::async_trait;

use super::order;
use crate::context::ErrorContext;
use crate::descriptor::HandlerDescriptor;
use crate::error::Result;
use crate::handler::Handler;

/// Copies the context's error triple onto the response.
///
/// Unconditional: whatever the host put on the context is what gets
/// rendered, including absent fields.
pub struct AttachErrorParameters;

impl AttachErrorParameters {
    /// The built-in descriptor for this handler.
    pub fn descriptor() -> HandlerDescriptor<ErrorContext> {
        HandlerDescriptor::from_instance(
            "attach_error_parameters",
            order::ATTACH_ERROR_PARAMETERS,
            Arc::new(Self),
        )
    }
}

#[async_trait]
impl Handler<ErrorContext> for AttachErrorParameters {
    async fn handle(&self, ctx: &mut ErrorContext) -> Result<()> {
        let error = ctx.error.clone();
        let description = ctx.error_description.clone();
        let uri = ctx.error_uri.clone();

        let response = ctx.response_mut();
        response.error = error;
        response.error_description = description;
        response.error_uri = uri;
        Ok(())
    }
}

/// Copies the host's custom parameters onto the error response.
///
/// Runs after the default handlers, so a custom value wins over anything
/// they attached.
pub struct AttachCustomErrorParameters;

impl AttachCustomErrorParameters {
    /// The built-in descriptor for this handler.
    pub fn descriptor() -> HandlerDescriptor<ErrorContext> {
        HandlerDescriptor::from_instance(
            "attach_custom_error_parameters",
            order::ATTACH_CUSTOM_ERROR_PARAMETERS,
            Arc::new(Self),
        )
    }
}

#[async_trait]
impl Handler<ErrorContext> for AttachCustomErrorParameters {
    async fn handle(&self, ctx: &mut ErrorContext) -> Result<()> {
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
