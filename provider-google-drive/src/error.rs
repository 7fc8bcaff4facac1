//! Error types for the Google Drive connector

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Google Drive connector errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// No session token is stored
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// The API answered 401; the stored token has been removed
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// API request returned a non-success status other than 401
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<GoogleDriveError> for BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::NotAuthenticated(msg) => BridgeError::NotAuthenticated(msg),
            GoogleDriveError::SessionExpired(msg) => BridgeError::SessionExpired(msg),
            GoogleDriveError::ApiError {
                status_code,
                message,
            } => BridgeError::Transport(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            GoogleDriveError::ParseError(msg) => {
                BridgeError::Transport(format!("Parse error: {}", msg))
            }
            GoogleDriveError::NetworkError(msg) => BridgeError::Transport(msg),
            GoogleDriveError::BridgeError(e) => e,
        }
    }
}
