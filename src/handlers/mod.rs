//! Built-in pipeline handlers for the three validation flows.
//!
//! These are the descriptors [`HandlerCatalog::builder`] seeds:
//!
//! - authentication: [`ResolveServerConfiguration`], [`EvaluateValidatedTokens`],
//!   [`ValidateRequiredTokens`], [`ValidateAccessToken`];
//! - challenge: [`AttachDefaultChallengeError`], [`AttachCustomChallengeParameters`];
//! - error: [`AttachErrorParameters`], [`AttachCustomErrorParameters`].
//!
//! Host extensions slot between built-ins by picking order keys relative to
//! the [`order`] constants. Default-attaching handlers run at
//! [`order::ATTACH_DEFAULT_CHALLENGE_ERROR`] and custom-parameter handlers at
//! the strictly greater [`order::ATTACH_CUSTOM_CHALLENGE_PARAMETERS`], so
//! custom values win over defaults by construction rather than by
//! registration order.
//!
//! [`HandlerCatalog::builder`]: crate::catalog::HandlerCatalog::builder

mod authentication;
mod challenge;
mod error;

pub use authentication::{
    EvaluateValidatedTokens, ResolveServerConfiguration, ValidateAccessToken,
    ValidateRequiredTokens,
};
pub use challenge::{AttachCustomChallengeParameters, AttachDefaultChallengeError};
pub use error::{AttachCustomErrorParameters, AttachErrorParameters};

/// Order keys of the built-in handlers.
pub mod order {
    /// Order of [`ResolveServerConfiguration`](super::ResolveServerConfiguration).
    pub const RESOLVE_SERVER_CONFIGURATION: i32 = 1_000;
    /// Order of [`EvaluateValidatedTokens`](super::EvaluateValidatedTokens).
    pub const EVALUATE_VALIDATED_TOKENS: i32 = 2_000;
    /// Order of [`ValidateRequiredTokens`](super::ValidateRequiredTokens).
    pub const VALIDATE_REQUIRED_TOKENS: i32 = 3_000;
    /// Order of [`ValidateAccessToken`](super::ValidateAccessToken).
    pub const VALIDATE_ACCESS_TOKEN: i32 = 4_000;

    /// Order of [`AttachDefaultChallengeError`](super::AttachDefaultChallengeError).
    pub const ATTACH_DEFAULT_CHALLENGE_ERROR: i32 = 100_000;
    /// Order of [`AttachCustomChallengeParameters`](super::AttachCustomChallengeParameters);
    /// strictly after the defaults so custom values win.
    pub const ATTACH_CUSTOM_CHALLENGE_PARAMETERS: i32 = 200_000;

    /// Order of [`AttachErrorParameters`](super::AttachErrorParameters).
    pub const ATTACH_ERROR_PARAMETERS: i32 = 100_000;
    /// Order of [`AttachCustomErrorParameters`](super::AttachCustomErrorParameters);
    /// strictly after the defaults so custom values win.
    pub const ATTACH_CUSTOM_ERROR_PARAMETERS: i32 = 200_000;
}
