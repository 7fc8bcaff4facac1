//! # Session Gate
//!
//! Owns whether the user is authenticated and gates access to the listing.
//!
//! ## Lifecycle
//!
//! - [`SessionGate::restore_session`] runs at startup. A stored token is
//!   only trusted after the provider's introspection endpoint accepts it.
//! - [`SessionGate::authenticate`] runs the interactive sign-in: PKCE URL,
//!   host prompt, code exchange, persistence.
//! - [`SessionGate::clear`] is an explicit logout; [`SessionGate::expire_session`]
//!   is the forced logout after the provider answered 401.
//!
//! Nothing here retries. Every failure is surfaced to the caller and mirrored
//! on the event bus as an [`AuthEvent`].
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{AuthorizationPrompt, SessionGate};
//! use core_runtime::config::CoreConfig;
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//!
//! # async fn example(config: CoreConfig, prompt: Arc<dyn AuthorizationPrompt>) -> core_auth::Result<()> {
//! let event_bus = EventBus::new(config.event_buffer_size);
//! let gate = SessionGate::from_config(&config, prompt, event_bus);
//!
//! let token = match gate.restore_session().await? {
//!     Some(token) => token,
//!     None => gate.authenticate().await?,
//! };
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, OAuthFlowManager};
use crate::prompt::{AuthorizationPrompt, AuthorizationResponse};
use crate::token_store::TokenStore;
use crate::types::{AccessToken, AuthState, PROVIDER_NAME};
use bridge_traits::http::{HttpClient, HttpRequest};
use core_runtime::config::{CoreConfig, DriveSettings};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// How long the host prompt may stay open before sign-in is abandoned.
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct SessionGate {
    settings: DriveSettings,
    token_store: TokenStore,
    http_client: Arc<dyn HttpClient>,
    prompt: Arc<dyn AuthorizationPrompt>,
    event_bus: EventBus,
    state: RwLock<AuthState>,
    sign_in_lock: Mutex<()>,
    prompt_timeout: Duration,
}

impl SessionGate {
    pub fn new(
        settings: DriveSettings,
        token_store: TokenStore,
        http_client: Arc<dyn HttpClient>,
        prompt: Arc<dyn AuthorizationPrompt>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            settings,
            token_store,
            http_client,
            prompt,
            event_bus,
            state: RwLock::new(AuthState::SignedOut),
            sign_in_lock: Mutex::new(()),
            prompt_timeout: DEFAULT_PROMPT_TIMEOUT,
        }
    }

    pub fn from_config(
        config: &CoreConfig,
        prompt: Arc<dyn AuthorizationPrompt>,
        event_bus: EventBus,
    ) -> Self {
        Self::new(
            config.drive.clone(),
            TokenStore::new(config.secure_store.clone()),
            config.http_client.clone(),
            prompt,
            event_bus,
        )
    }

    pub fn with_prompt_timeout(mut self, prompt_timeout: Duration) -> Self {
        self.prompt_timeout = prompt_timeout;
        self
    }

    /// The store shared with the directory client.
    pub fn token_store(&self) -> &TokenStore {
        &self.token_store
    }

    /// Current state, reconciled with storage.
    ///
    /// If the token vanished while signed in (the directory client deletes
    /// it on 401) the gate reports `SignedOut` from then on.
    pub async fn auth_state(&self) -> AuthState {
        let state = *self.state.read().await;
        if state != AuthState::SignedIn {
            return state;
        }

        match self.token_store.has_token().await {
            Ok(true) => AuthState::SignedIn,
            Ok(false) => {
                debug!("Session token disappeared from storage");
                self.set_state(AuthState::SignedOut).await;
                AuthState::SignedOut
            }
            Err(e) => {
                warn!(error = %e, "Could not confirm stored token");
                state
            }
        }
    }

    /// Run the interactive sign-in and persist the resulting token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Configuration`] when the client id or API key is missing
    /// - [`AuthError::SignInInProgress`] when another sign-in is running
    /// - [`AuthError::Cancelled`] when the user closed the prompt
    /// - whatever the code exchange or token storage reported
    #[instrument(skip(self), fields(provider = PROVIDER_NAME))]
    pub async fn authenticate(&self) -> Result<AccessToken> {
        let _guard = self.sign_in_lock.try_lock().map_err(|_| {
            warn!("Sign-in already in progress");
            AuthError::SignInInProgress
        })?;

        if let Err(e) = self.check_credentials() {
            self.emit_error(&e);
            return Err(e);
        }

        let previous = *self.state.read().await;
        self.set_state(AuthState::SigningIn).await;

        match self.run_sign_in().await {
            Ok(token) => {
                self.set_state(AuthState::SignedIn).await;
                info!("Signed in");
                self.emit(AuthEvent::SignedIn {
                    provider: PROVIDER_NAME.to_string(),
                    restored: false,
                });
                Ok(token)
            }
            Err(e) => {
                let fallback = if previous == AuthState::SignedIn
                    && self.token_store.has_token().await.unwrap_or(false)
                {
                    AuthState::SignedIn
                } else {
                    AuthState::SignedOut
                };
                self.set_state(fallback).await;
                warn!(error = %e, "Sign-in failed");
                self.emit_error(&e);
                Err(e)
            }
        }
    }

    /// Ask the provider's introspection endpoint whether `token` is usable.
    ///
    /// Only a 200 counts as valid; transport failures count as invalid.
    #[instrument(skip(self, token))]
    pub async fn is_valid(&self, token: &AccessToken) -> bool {
        let mut url = match Url::parse(&self.settings.tokeninfo_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Invalid token introspection URL");
                return false;
            }
        };
        url.query_pairs_mut()
            .append_pair("access_token", token.as_str());

        let request = HttpRequest::get(url.to_string()).timeout(self.settings.request_timeout);

        match self.http_client.execute(request).await {
            Ok(response) => {
                debug!(status = response.status, "Token introspection answered");
                response.status == 200
            }
            Err(e) => {
                warn!(error = %e, "Token introspection failed");
                false
            }
        }
    }

    /// Startup path: trust the stored token only if introspection accepts it.
    ///
    /// A token that fails introspection is left in storage; the caller sees
    /// `Ok(None)` and must not attempt the listing. Corrupted storage is
    /// cleaned up by the token store and also reported as `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Result<Option<AccessToken>> {
        let token = match self.token_store.retrieve().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No stored session");
                self.set_state(AuthState::SignedOut).await;
                return Ok(None);
            }
            Err(AuthError::TokenCorrupted { reason }) => {
                warn!(reason = %reason, "Discarded corrupted session token");
                self.set_state(AuthState::SignedOut).await;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !self.is_valid(&token).await {
            info!("Stored session token was rejected by the provider");
            self.set_state(AuthState::SignedOut).await;
            return Ok(None);
        }

        self.set_state(AuthState::SignedIn).await;
        info!(expires_at = ?token.expires_at(), "Session restored");
        self.emit(AuthEvent::SignedIn {
            provider: PROVIDER_NAME.to_string(),
            restored: true,
        });
        Ok(Some(token))
    }

    /// Remove the stored token unconditionally.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        self.token_store.delete().await?;
        self.set_state(AuthState::SignedOut).await;
        info!("Signed out");
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    /// Forced logout after the provider rejected the token.
    #[instrument(skip(self))]
    pub async fn expire_session(&self) -> Result<()> {
        let deleted = self.token_store.delete().await;
        self.set_state(AuthState::SignedOut).await;
        warn!("Session expired");
        self.emit(AuthEvent::SessionExpired);
        deleted
    }

    fn check_credentials(&self) -> Result<()> {
        if self.settings.client_id.is_none() {
            return Err(AuthError::Configuration(
                "client id is not configured".to_string(),
            ));
        }
        if self.settings.api_key.is_none() {
            return Err(AuthError::Configuration(
                "API key is not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn run_sign_in(&self) -> Result<AccessToken> {
        let config = OAuthConfig::from_settings(&self.settings)?;
        let flow = OAuthFlowManager::new(config, self.http_client.clone());
        let (auth_url, verifier) = flow.build_auth_url()?;

        self.emit(AuthEvent::SigningIn {
            provider: PROVIDER_NAME.to_string(),
        });

        let response = timeout(self.prompt_timeout, self.prompt.authorize(&auth_url))
            .await
            .map_err(|_| AuthError::OperationTimeout {
                operation: "authorization prompt".to_string(),
            })??;

        match response {
            AuthorizationResponse::Code { code, state } => {
                let token = flow.exchange_code(&code, &state, &verifier).await?;
                self.token_store.store(&token).await?;
                Ok(token)
            }
            AuthorizationResponse::Cancelled => Err(AuthError::Cancelled),
            AuthorizationResponse::Denied { error } => Err(AuthError::AuthenticationFailed(
                format!("Authorization denied: {}", error),
            )),
        }
    }

    async fn set_state(&self, state: AuthState) {
        *self.state.write().await = state;
    }

    fn emit(&self, event: AuthEvent) {
        self.event_bus.emit(CoreEvent::Auth(event)).ok();
    }

    fn emit_error(&self, error: &AuthError) {
        self.emit(AuthEvent::AuthError {
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        });
    }
}
