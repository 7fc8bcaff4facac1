use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// No session token is stored; the caller has to authenticate first.
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// The provider rejected the stored token with an unauthorized response.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl BridgeError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, BridgeError::SessionExpired(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
