//! Bearer credential helpers for the host boundary.
//!
//! Transport-level extraction of the credential stays with the host; these
//! helpers only parse an `Authorization` header value it already obtained,
//! ready to be placed on
//! [`AuthenticationContext::access_token`](crate::context::AuthenticationContext::access_token).

/// Extract a bearer token from an `Authorization` header value.
///
/// Matching is scheme-sensitive: only the `Bearer ` prefix is recognized.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.trim().strip_prefix("Bearer ").map(|t| t.trim())
}
