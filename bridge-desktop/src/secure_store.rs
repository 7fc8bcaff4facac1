//! Secure Credential Storage using OS Keychain

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::{debug, error};

const DEFAULT_SERVICE_NAME: &str = "drive-media-browser";

/// Keyring-based secure storage implementation
///
/// Uses platform-specific secure storage:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: kernel keyutils keyring
///
/// Values are base64 encoded because keyring entries hold strings.
pub struct KeyringSecureStore {
    service_name: String,
}

impl KeyringSecureStore {
    pub fn new() -> Self {
        Self::with_service_name(DEFAULT_SERVICE_NAME)
    }

    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(Self::map_keyring_error)
    }

    fn map_keyring_error(e: keyring::Error) -> BridgeError {
        BridgeError::OperationFailed(format!("Keyring error: {}", e))
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entry(key)?
            .set_password(&STANDARD.encode(value))
            .map_err(Self::map_keyring_error)?;

        debug!(key, "Stored secret in keyring");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entry(key)?.get_password() {
            Ok(encoded) => {
                let decoded = STANDARD.decode(&encoded).map_err(|e| {
                    error!(key, error = %e, "Failed to decode secret");
                    BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
                })?;
                Ok(Some(decoded))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(key, "Secret not found in keyring");
                Ok(None)
            }
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key, "Deleted secret from keyring");
                Ok(())
            }
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_name() {
        let store = KeyringSecureStore::default();
        assert_eq!(store.service_name, "drive-media-browser");
    }

    #[tokio::test]
    async fn test_set_and_get_secret() {
        let store = KeyringSecureStore::with_service_name("drive-media-browser-test");
        let key = "test-key-unique-123";

        let _ = store.delete_secret(key).await;

        // Sandboxed machines may deny access to the keyring.
        if let Err(e) = store.set_secret(key, b"secret-value").await {
            println!("Keyring not available ({}), skipping test", e);
            return;
        }

        // A successful write must be readable back through a fresh entry.
        let retrieved = store.get_secret(key).await.unwrap();
        assert_eq!(retrieved, Some(b"secret-value".to_vec()));

        store.delete_secret(key).await.unwrap();
        assert_eq!(store.get_secret(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_secret_survives_new_store_instance() {
        let key = "test-key-reopen-456";
        let writer = KeyringSecureStore::with_service_name("drive-media-browser-test");
        let _ = writer.delete_secret(key).await;

        if let Err(e) = writer.set_secret(key, b"persisted").await {
            println!("Keyring not available ({}), skipping test", e);
            return;
        }

        let reader = KeyringSecureStore::with_service_name("drive-media-browser-test");
        assert_eq!(
            reader.get_secret(key).await.unwrap(),
            Some(b"persisted".to_vec())
        );
        reader.delete_secret(key).await.unwrap();
    }
}
