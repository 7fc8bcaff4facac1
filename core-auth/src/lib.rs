//! # Authentication Module
//!
//! Session gate for the Drive media browser.
//!
//! ## Overview
//!
//! Handles the OAuth 2.0 sign-in against Google, persists the resulting
//! access token in the host's secure store and decides whether a stored token
//! is still usable by asking the provider's introspection endpoint.
//!
//! ## Features
//!
//! - OAuth 2.0 authorization code flow with PKCE
//! - Host-provided authorization prompt ([`AuthorizationPrompt`])
//! - Single session token under a fixed storage key ([`TokenStore`])
//! - Auth state event emission

pub mod error;
pub mod gate;
pub mod oauth;
pub mod prompt;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use gate::SessionGate;
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use prompt::{AuthorizationPrompt, AuthorizationResponse};
pub use token_store::{TokenStore, TOKEN_STORAGE_KEY};
pub use types::{AccessToken, AuthState, PROVIDER_NAME};
