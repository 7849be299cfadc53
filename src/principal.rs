//! The verified identity resolved from a bearer credential.
//!
//! A [`Principal`] carries the standard token claims plus a flattened map of
//! anything else the credential asserted. It is produced by the nested
//! token-validation sub-dispatch and attached to the authentication context
//! on success.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Audience claim value, which can be a single string or array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience string.
    Single(String),
    /// Multiple audience strings.
    Multiple(Vec<String>),
}

impl Audience {
    /// Check if the audience contains a specific value.
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Audience::Single(s) => s == value,
            Audience::Multiple(v) => v.iter().any(|s| s == value),
        }
    }
}

/// The identity resolved from a validated credential.
///
/// Standard claims are typed fields; everything else the token asserted
/// lands in [`claims`](Self::claims).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Principal {
    /// Subject (user or client identifier).
    #[serde(default, rename = "sub", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Issuer URL of the credential.
    #[serde(default, rename = "iss", skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Audience the credential was issued for.
    #[serde(default, rename = "aud", skip_serializing_if = "Option::is_none")]
    pub audience: Option<Audience>,

    /// Expiration time (Unix timestamp).
    #[serde(default, rename = "exp", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,

    /// Space-delimited scope string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// OAuth client ID the credential was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Additional claims not covered by the typed fields.
    #[serde(flatten)]
    pub claims: HashMap<String, serde_json::Value>,
}

impl Principal {
    /// Parse the scope string into a set of individual scopes.
    pub fn scopes(&self) -> HashSet<String> {
        self.scope
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .map(String::from)
            .collect()
    }

    /// Check if the principal was granted a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().contains(scope)
    }

    /// Check if the audience matches the given resource identifier.
    pub fn audience_matches(&self, resource: &str) -> bool {
        match &self.audience {
            Some(audience) => audience.contains(resource),
            None => true, // No audience claim means no restriction
        }
    }

    /// Check if the credential has expired based on the current time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                now > expires_at
            }
            None => false, // No exp claim means no expiration
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_single() {
        let audience = Audience::Single("https://api.example.com".to_string());
        assert!(audience.contains("https://api.example.com"));
        assert!(!audience.contains("https://other.example.com"));
    }

    #[test]
    fn test_audience_multiple() {
        let audience = Audience::Multiple(vec![
            "https://a.example.com".to_string(),
            "https://b.example.com".to_string(),
        ]);
        assert!(audience.contains("https://a.example.com"));
        assert!(audience.contains("https://b.example.com"));
        assert!(!audience.contains("https://c.example.com"));
    }

    #[test]
    fn test_scopes() {
        let principal = Principal {
            scope: Some("api:read api:write".to_string()),
            ..Principal::default()
        };

        assert_eq!(principal.scopes().len(), 2);
        assert!(principal.has_scope("api:read"));
        assert!(principal.has_scope("api:write"));
        assert!(!principal.has_scope("api:admin"));
    }

    #[test]
    fn test_empty_scope() {
        let principal = Principal::default();
        assert!(principal.scopes().is_empty());
        assert!(!principal.has_scope("api:read"));
    }

    #[test]
    fn test_audience_matches() {
        let principal = Principal {
            audience: Some(Audience::Single("https://api.example.com".to_string())),
            ..Principal::default()
        };
        assert!(principal.audience_matches("https://api.example.com"));
        assert!(!principal.audience_matches("https://other.example.com"));

        // No audience claim means no restriction
        assert!(Principal::default().audience_matches("anything"));
    }

    #[test]
    fn test_expiry() {
        let expired = Principal {
            expires_at: Some(0),
            ..Principal::default()
        };
        assert!(expired.is_expired());

        let future = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        let live = Principal {
            expires_at: Some(future),
            ..Principal::default()
        };
        assert!(!live.is_expired());

        assert!(!Principal::default().is_expired());
    }

    #[test]
    fn test_claims_roundtrip() {
        let json = serde_json::json!({
            "sub": "user-42",
            "iss": "https://auth.example.com",
            "scope": "api:read",
            "department": "engineering"
        });

        let principal: Principal = serde_json::from_value(json).unwrap();
        assert_eq!(principal.subject.as_deref(), Some("user-42"));
        assert_eq!(principal.issuer.as_deref(), Some("https://auth.example.com"));
        assert_eq!(
            principal.claims.get("department"),
            Some(&serde_json::json!("engineering"))
        );
    }
}
