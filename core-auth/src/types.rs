use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider name reported in auth events.
pub const PROVIDER_NAME: &str = "GoogleDrive";

/// Opaque bearer credential for the Drive API.
///
/// Validity is decided by the provider (token introspection or a 401), not by
/// `expires_at`, which is informational.
///
/// # Security
///
/// `Debug` never prints the token value.
///
/// ```
/// use core_auth::AccessToken;
///
/// let token = AccessToken::new("ya29.a0");
/// assert_eq!(token.as_str(), "ya29.a0");
/// assert!(!format!("{:?}", token).contains("ya29"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Token that the provider said expires `expires_in` seconds from now.
    pub fn with_expires_in(value: impl Into<String>, expires_in: i64) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
        }
    }

    pub(crate) fn from_parts(value: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { value, expires_at }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// `true` only when an expiry is known and has passed.
    pub fn is_past_expiry(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Whether the user may access the listing.
///
/// ```text
/// SignedOut -> SigningIn -> SignedIn
///     ^            |            |
///     +------------+------------+  (cancel, failure, logout, 401)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    SignedOut,
    SigningIn,
    SignedIn,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthState::SignedOut => "signed out",
            AuthState::SigningIn => "signing in",
            AuthState::SignedIn => "signed in",
        };
        f.write_str(label)
    }
}
