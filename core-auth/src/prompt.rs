//! Host-side authorization prompt.
//!
//! The popup window or browser round-trip is owned by the host. The gate only
//! hands over the authorization URL and waits for the redirect parameters.

use crate::error::Result;
use async_trait::async_trait;

/// Outcome of showing the authorization page to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResponse {
    /// The provider redirected back with a code.
    Code { code: String, state: String },
    /// The user closed the prompt.
    Cancelled,
    /// The provider redirected back with an `error` parameter
    /// (for example `access_denied`).
    Denied { error: String },
}

/// Presents the authorization URL and reports how the user responded.
///
/// # Example
///
/// ```ignore
/// struct LoopbackPrompt;
///
/// #[async_trait]
/// impl AuthorizationPrompt for LoopbackPrompt {
///     async fn authorize(&self, url: &str) -> Result<AuthorizationResponse> {
///         open::that(url)?;
///         wait_for_redirect().await
///     }
/// }
/// ```
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    async fn authorize(&self, authorization_url: &str) -> Result<AuthorizationResponse>;
}
