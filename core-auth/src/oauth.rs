//! OAuth 2.0 Authorization Code Flow with PKCE
//!
//! Implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) for the Drive sign-in.
//!
//! # Overview
//!
//! - Building the authorization URL with a PKCE challenge and CSRF state
//! - Exchanging the authorization code for an access token
//!
//! There is no refresh path. When the token stops working the user signs in
//! again.
//!
//! # Security
//!
//! The code verifier never leaves this process except in the token exchange
//! body. Codes, verifiers and tokens are never logged.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowManager};
//! use core_runtime::config::DriveSettings;
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let settings = DriveSettings {
//!     client_id: Some("your-client-id".to_string()),
//!     ..DriveSettings::default()
//! };
//! let config = OAuthConfig::from_settings(&settings)?;
//!
//! let flow = OAuthFlowManager::new(config, http_client);
//! let (auth_url, pkce_verifier) = flow.build_auth_url()?;
//! // Hand auth_url to the host prompt...
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{AccessToken, PROVIDER_NAME};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::DriveSettings;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// OAuth 2.0 client registration and endpoints.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Optional for public (PKCE-only) clients
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    /// Derive the OAuth configuration from the drive settings.
    ///
    /// Fails with [`AuthError::Configuration`] when no client id is set.
    pub fn from_settings(settings: &DriveSettings) -> Result<Self> {
        let client_id = settings
            .client_id
            .clone()
            .ok_or_else(|| AuthError::Configuration("client id is not configured".to_string()))?;

        Ok(Self {
            client_id,
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            scopes: settings.scopes.clone(),
            auth_url: settings.auth_url.clone(),
            token_url: settings.token_url.clone(),
        })
    }
}

/// PKCE code verifier plus CSRF state for one sign-in attempt.
///
/// Only the challenge derived from the verifier is sent with the
/// authorization request.
#[derive(Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    /// 32 random bytes for the verifier and 16 for the state, both
    /// URL-safe base64 without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// S256 method: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceVerifier")
            .field("verifier", &"[REDACTED]")
            .field("state", &self.state)
            .finish()
    }
}

/// Authorization code flow driver.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Build the URL the user must visit, together with the verifier that
    /// has to be presented again in [`exchange_code`](Self::exchange_code).
    #[instrument(skip(self), fields(provider = PROVIDER_NAME))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Configuration(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", verifier.state())
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");

        debug!("Built authorization URL");
        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::StateMismatch`] when the callback state differs from
    ///   the one issued with the verifier
    /// - [`AuthError::NetworkError`] on transport failure
    /// - [`AuthError::InvalidAuthCode`] when the token endpoint rejects the code
    #[instrument(skip(self, code, verifier), fields(provider = PROVIDER_NAME))]
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        verifier: &PkceVerifier,
    ) -> Result<AccessToken> {
        if state != verifier.state() {
            warn!("OAuth state mismatch on authorization callback");
            return Err(AuthError::StateMismatch {
                expected: verifier.state().to_string(),
                actual: state.to_string(),
            });
        }

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];
        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        let encoded_body = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        debug!("Exchanging authorization code for token");

        let request =
            HttpRequest::new(HttpMethod::Post, self.config.token_url.clone()).form(encoded_body);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status, error = %error_body, "Token exchange rejected");

            return Err(AuthError::InvalidAuthCode(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response.json().map_err(|e| {
            AuthError::AuthenticationFailed(format!("Failed to parse token response: {}", e))
        })?;

        if token_response.access_token.is_empty() {
            return Err(AuthError::AuthenticationFailed(
                "Token endpoint returned an empty access token".to_string(),
            ));
        }

        info!(
            expires_in = ?token_response.expires_in,
            "Exchanged authorization code for token"
        );

        Ok(match token_response.expires_in {
            Some(expires_in) => AccessToken::with_expires_in(token_response.access_token, expires_in),
            None => AccessToken::new(token_response.access_token),
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use mockall::mock;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "test-client".to_string(),
            client_secret: None,
            redirect_uri: "http://127.0.0.1:8765/callback".to_string(),
            scopes: vec!["scope1".to_string(), "scope2".to_string()],
            auth_url: "https://provider.com/auth".to_string(),
            token_url: "https://provider.com/token".to_string(),
        }
    }

    #[test]
    fn test_pkce_verifier_generation() {
        let verifier = PkceVerifier::new();

        assert!(!verifier.verifier().is_empty());
        assert!(!verifier.state().is_empty());
        assert_eq!(verifier.challenge(), verifier.challenge());

        let other = PkceVerifier::new();
        assert_ne!(verifier.verifier(), other.verifier());
        assert_ne!(verifier.state(), other.state());
    }

    #[test]
    fn test_pkce_challenge_known_value() {
        // RFC 7636 appendix B
        let verifier = PkceVerifier {
            verifier: "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string(),
            state: "state".to_string(),
        };

        assert_eq!(
            verifier.challenge(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verifier_debug_is_redacted() {
        let verifier = PkceVerifier::new();
        assert!(!format!("{:?}", verifier).contains(verifier.verifier()));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = DriveSettings {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            ..DriveSettings::default()
        };

        let config = OAuthConfig::from_settings(&settings).unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.client_secret.as_deref(), Some("secret"));
        assert_eq!(config.scopes, settings.scopes);

        let missing = OAuthConfig::from_settings(&DriveSettings::default());
        assert!(matches!(missing, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_build_auth_url() {
        let manager = OAuthFlowManager::new(config(), Arc::new(MockHttp::new()));
        let (url, verifier) = manager.build_auth_url().unwrap();

        assert!(url.starts_with("https://provider.com/auth?"));
        assert!(url.contains("client_id=test-client"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=scope1+scope2") || url.contains("scope=scope1%20scope2"));
        assert!(url.contains(&format!("state={}", verifier.state())));
        assert!(url.contains(&format!("code_challenge={}", verifier.challenge())));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(!url.contains("access_type=offline"));
    }

    #[test]
    fn test_build_auth_url_invalid_url() {
        let mut config = config();
        config.auth_url = "not a valid url".to_string();

        let manager = OAuthFlowManager::new(config, Arc::new(MockHttp::new()));
        assert!(matches!(
            manager.build_auth_url(),
            Err(AuthError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let verifier = PkceVerifier::new();
        let expected_verifier = verifier.verifier().to_string();

        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(move |request| {
                let body = request
                    .body
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).to_string())
                    .unwrap_or_default();
                request.method == HttpMethod::Post
                    && request.url == "https://provider.com/token"
                    && body.contains("grant_type=authorization_code")
                    && body.contains("code=auth-code")
                    && body.contains(&format!("code_verifier={}", expected_verifier))
                    && !body.contains("client_secret")
            })
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"access_token":"ya29.new","expires_in":3599,"token_type":"Bearer"}"#,
                ))
            });

        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let token = manager
            .exchange_code("auth-code", verifier.state(), &verifier)
            .await
            .unwrap();

        assert_eq!(token.as_str(), "ya29.new");
        assert!(token.expires_at().is_some());
    }

    #[tokio::test]
    async fn test_exchange_code_state_mismatch_skips_request() {
        let mut http = MockHttp::new();
        http.expect_execute().times(0);

        let verifier = PkceVerifier::new();
        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let result = manager.exchange_code("code", "forged", &verifier).await;

        assert!(matches!(result, Err(AuthError::StateMismatch { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(400, r#"{"error":"invalid_grant"}"#)));

        let verifier = PkceVerifier::new();
        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let result = manager
            .exchange_code("code", verifier.state(), &verifier)
            .await;

        match result {
            Err(AuthError::InvalidAuthCode(message)) => assert!(message.contains("invalid_grant")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_transport_failure() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Err(BridgeError::Transport("connection refused".to_string())));

        let verifier = PkceVerifier::new();
        let manager = OAuthFlowManager::new(config(), Arc::new(http));
        let result = manager
            .exchange_code("code", verifier.state(), &verifier)
            .await;

        assert!(matches!(result, Err(AuthError::NetworkError(_))));
    }

    #[test]
    fn test_token_response_deserialization_minimal() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"token"}"#).unwrap();
        assert_eq!(response.access_token, "token");
        assert_eq!(response.expires_in, None);
    }
}
