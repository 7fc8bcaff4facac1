//! Session Token Storage
//!
//! Persists the single Drive access token under a fixed key in the host's
//! [`SecureStore`]. Presence of the key means "possibly authenticated",
//! absence means the user has to sign in.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{AccessToken, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//!
//! token_store.store(&AccessToken::with_expires_in("ya29.a0", 3599)).await?;
//! let token = token_store.retrieve().await?;
//! token_store.delete().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::AccessToken;
use bridge_traits::storage::SecureStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key under which the token lives in secure storage.
pub const TOKEN_STORAGE_KEY: &str = "drive_access_token";

/// Secure storage for the session token.
///
/// Token values are never logged; only presence and expiry metadata are.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing TokenStore");
        Self { secure_store }
    }

    /// Persist the token, overwriting any previous one.
    pub async fn store(&self, token: &AccessToken) -> Result<()> {
        let stored = StoredToken {
            access_token: token.as_str().to_string(),
            expires_at: token.expires_at(),
        };

        let json = serde_json::to_vec(&stored).map_err(|e| {
            warn!(error = %e, "Failed to serialize token");
            AuthError::SerializationFailed {
                context: "session token".to_string(),
                source: e,
            }
        })?;

        self.secure_store
            .set_secret(TOKEN_STORAGE_KEY, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store token in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(expires_at = ?stored.expires_at, "Session token stored");
        Ok(())
    }

    /// Load the stored token.
    ///
    /// Returns `Ok(None)` when nothing is stored. Data that cannot be decoded
    /// is deleted and reported as [`AuthError::TokenCorrupted`].
    pub async fn retrieve(&self) -> Result<Option<AccessToken>> {
        let data = self
            .secure_store
            .get_secret(TOKEN_STORAGE_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read token from secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        let Some(data) = data else {
            debug!("No session token in storage");
            return Ok(None);
        };

        let stored: StoredToken = match serde_json::from_slice(&data) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Stored session token is corrupted, deleting it");

                if let Err(delete_err) = self.secure_store.delete_secret(TOKEN_STORAGE_KEY).await {
                    warn!(error = %delete_err, "Failed to delete corrupted token");
                }

                return Err(AuthError::TokenCorrupted {
                    reason: e.to_string(),
                });
            }
        };

        if stored.access_token.is_empty() {
            warn!("Stored session token is empty, deleting it");
            if let Err(delete_err) = self.secure_store.delete_secret(TOKEN_STORAGE_KEY).await {
                warn!(error = %delete_err, "Failed to delete empty token");
            }
            return Err(AuthError::TokenCorrupted {
                reason: "empty access token".to_string(),
            });
        }

        debug!(expires_at = ?stored.expires_at, "Session token retrieved");
        Ok(Some(AccessToken::from_parts(
            stored.access_token,
            stored.expires_at,
        )))
    }

    /// Remove the token. Succeeds when nothing is stored.
    pub async fn delete(&self) -> Result<()> {
        self.secure_store
            .delete_secret(TOKEN_STORAGE_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete token from secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Session token deleted");
        Ok(())
    }

    /// Whether a token is stored, without decoding it.
    pub async fn has_token(&self) -> Result<bool> {
        self.secure_store
            .has_secret(TOKEN_STORAGE_KEY)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::MemorySecureStore;

    fn store() -> (TokenStore, MemorySecureStore) {
        let secure_store = MemorySecureStore::new();
        (TokenStore::new(Arc::new(secure_store.clone())), secure_store)
    }

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let (token_store, _) = store();
        let token = AccessToken::with_expires_in("ya29.token", 3600);

        token_store.store(&token).await.expect("store");
        let retrieved = token_store
            .retrieve()
            .await
            .expect("retrieve")
            .expect("token present");

        assert_eq!(retrieved, token);
    }

    #[tokio::test]
    async fn test_retrieve_missing() {
        let (token_store, _) = store();
        assert!(token_store.retrieve().await.unwrap().is_none());
        assert!(!token_store.has_token().await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (token_store, _) = store();
        token_store.store(&AccessToken::new("first")).await.unwrap();
        token_store.store(&AccessToken::new("second")).await.unwrap();

        let retrieved = token_store.retrieve().await.unwrap().unwrap();
        assert_eq!(retrieved.as_str(), "second");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (token_store, _) = store();
        token_store.store(&AccessToken::new("t")).await.unwrap();
        assert!(token_store.has_token().await.unwrap());

        token_store.delete().await.unwrap();
        token_store.delete().await.unwrap();
        assert!(!token_store.has_token().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_token_is_deleted() {
        let (token_store, secure_store) = store();
        secure_store
            .set_secret(TOKEN_STORAGE_KEY, b"{not json")
            .await
            .unwrap();

        let result = token_store.retrieve().await;
        assert!(matches!(result, Err(AuthError::TokenCorrupted { .. })));
        assert!(!token_store.has_token().await.unwrap());
    }

    #[tokio::test]
    async fn test_token_without_expiry_is_accepted() {
        let (token_store, secure_store) = store();
        secure_store
            .set_secret(TOKEN_STORAGE_KEY, br#"{"access_token":"legacy"}"#)
            .await
            .unwrap();

        let token = token_store.retrieve().await.unwrap().unwrap();
        assert_eq!(token.as_str(), "legacy");
        assert!(token.expires_at().is_none());
    }

    #[tokio::test]
    async fn test_stored_value_never_contains_debug_redaction() {
        let (token_store, secure_store) = store();
        token_store.store(&AccessToken::new("raw-value")).await.unwrap();

        let raw = secure_store
            .get_secret(TOKEN_STORAGE_KEY)
            .await
            .unwrap()
            .unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.contains("raw-value"));
        assert!(!text.contains("REDACTED"));
    }
}
