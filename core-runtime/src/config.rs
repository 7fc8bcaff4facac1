//! # Core Configuration Module
//!
//! Builder-based configuration for the drive media core.
//!
//! ## Overview
//!
//! [`CoreConfig`] carries the host bridges (`HttpClient`, `SecureStore`) plus
//! two groups of settings:
//!
//! - [`DriveSettings`]: OAuth client credentials, endpoints, page size and
//!   request timeout
//! - [`SearchSettings`]: the local-vs-remote search threshold and the
//!   debounce window
//!
//! When the `desktop-shims` feature is enabled, desktop defaults for both
//! bridges are injected automatically if not provided.
//!
//! Client credentials are *not* validated here. A missing client id or API
//! key only becomes an error when the user tries to sign in.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, DriveSettings};
//!
//! let config = CoreConfig::builder()
//!     .drive(DriveSettings::from_env())
//!     .local_search_threshold(50)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, SecureStore};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/tokeninfo";
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8765/callback";

/// Files requested per listing or search call. Only the first page is used.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Listings smaller than this are searched locally.
pub const DEFAULT_LOCAL_SEARCH_THRESHOLD: usize = 50;
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Drive API maximum for `pageSize`.
const MAX_PAGE_SIZE: u32 = 1000;
const MAX_SEARCH_DEBOUNCE: Duration = Duration::from_secs(10);

pub const ENV_CLIENT_ID: &str = "DRIVE_CLIENT_ID";
pub const ENV_API_KEY: &str = "DRIVE_API_KEY";
pub const ENV_CLIENT_SECRET: &str = "DRIVE_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "DRIVE_REDIRECT_URI";

/// Provider credentials and endpoints.
#[derive(Clone, PartialEq, Eq)]
pub struct DriveSettings {
    /// OAuth client identifier
    pub client_id: Option<String>,
    /// API key sent as the `key` query parameter on Drive calls
    pub api_key: Option<String>,
    /// Only needed for confidential (non-PKCE) client registrations
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub tokeninfo_url: String,
    pub api_base_url: String,
    pub page_size: u32,
    pub request_timeout: Duration,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            api_key: None,
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: vec![DRIVE_READONLY_SCOPE.to_string()],
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            tokeninfo_url: DEFAULT_TOKENINFO_URL.to_string(),
            api_base_url: DEFAULT_DRIVE_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl fmt::Debug for DriveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("DriveSettings")
            .field("client_id", &self.client_id)
            .field("api_key", &redacted(&self.api_key))
            .field("client_secret", &redacted(&self.client_secret))
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("api_base_url", &self.api_base_url)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl DriveSettings {
    /// Read credentials from `DRIVE_CLIENT_ID`, `DRIVE_API_KEY`,
    /// `DRIVE_CLIENT_SECRET` and `DRIVE_REDIRECT_URI`. Everything else keeps
    /// its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut settings = Self {
            client_id: read(ENV_CLIENT_ID),
            api_key: read(ENV_API_KEY),
            client_secret: read(ENV_CLIENT_SECRET),
            ..Self::default()
        };
        if let Some(redirect_uri) = read(ENV_REDIRECT_URI) {
            settings.redirect_uri = redirect_uri;
        }
        settings
    }

    /// Whether both values required for sign-in are present.
    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.api_key.is_some()
    }

    /// Checks numeric bounds and endpoint shapes. Credentials are not checked.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        for (name, url) in [
            ("auth_url", &self.auth_url),
            ("token_url", &self.token_url),
            ("tokeninfo_url", &self.tokeninfo_url),
            ("api_base_url", &self.api_base_url),
            ("redirect_uri", &self.redirect_uri),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if self.scopes.is_empty() {
            return Err(Error::Config(
                "At least one OAuth scope is required".to_string(),
            ));
        }

        Ok(())
    }
}

/// Tuning for the search controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    /// Listings with fewer files than this are filtered locally; anything at
    /// or above it goes to the remote search. Zero means always remote.
    pub local_search_threshold: usize,
    /// Quiet period after the last keystroke before a search is evaluated.
    pub debounce: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            local_search_threshold: DEFAULT_LOCAL_SEARCH_THRESHOLD,
            debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.debounce > MAX_SEARCH_DEBOUNCE {
            return Err(Error::Config(format!(
                "Search debounce exceeds maximum of {}ms",
                MAX_SEARCH_DEBOUNCE.as_millis()
            )));
        }
        Ok(())
    }
}

/// Core configuration. Use [`CoreConfig::builder`] to construct.
#[derive(Clone)]
pub struct CoreConfig {
    pub http_client: Arc<dyn HttpClient>,
    /// Where the session token is persisted
    pub secure_store: Arc<dyn SecureStore>,
    pub drive: DriveSettings,
    pub search: SearchSettings,
    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("drive", &self.drive)
            .field("search", &self.search)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.drive.validate()?;
        self.search.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default. \
             Other hosts: inject a platform-native adapter.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    Ok(Arc::new(KeyringSecureStore::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(capability_missing("SecureStore", "session token persistence"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new(timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "Drive and OAuth requests"))
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    drive: Option<DriveSettings>,
    search: Option<SearchSettings>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client. Defaults to reqwest with `desktop-shims`.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the token store backend. Defaults to the OS keychain with
    /// `desktop-shims`.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Replaces all drive settings at once.
    pub fn drive(mut self, drive: DriveSettings) -> Self {
        self.drive = Some(drive);
        self
    }

    /// Replaces all search settings at once.
    pub fn search(mut self, search: SearchSettings) -> Self {
        self.search = Some(search);
        self
    }

    fn drive_mut(&mut self) -> &mut DriveSettings {
        self.drive.get_or_insert_with(DriveSettings::default)
    }

    fn search_mut(&mut self) -> &mut SearchSettings {
        self.search.get_or_insert_with(SearchSettings::default)
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.drive_mut().client_id = Some(client_id.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.drive_mut().api_key = Some(api_key.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.drive_mut().client_secret = Some(client_secret.into());
        self
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.drive_mut().redirect_uri = redirect_uri.into();
        self
    }

    /// Default: 100
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.drive_mut().page_size = page_size;
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.drive_mut().request_timeout = timeout;
        self
    }

    /// Default: 50
    pub fn local_search_threshold(mut self, threshold: usize) -> Self {
        self.search_mut().local_search_threshold = threshold;
        self
    }

    /// Default: 300 ms
    pub fn search_debounce(mut self, debounce: Duration) -> Self {
        self.search_mut().debounce = debounce;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Validates settings, fills in platform defaults for missing bridges and
    /// returns the config.
    pub fn build(self) -> Result<CoreConfig> {
        let drive = self.drive.unwrap_or_default();
        let search = self.search.unwrap_or_default();

        // Settings first so a bad value is reported before any bridge is created.
        drive.validate()?;
        search.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(drive.request_timeout)?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let config = CoreConfig {
            http_client,
            secure_store,
            drive,
            search,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };
        config.validate()?;

        Ok(config)
    }
}
