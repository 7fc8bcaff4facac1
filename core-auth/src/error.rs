use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Client id or API key missing. Reported at sign-in, never at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Sign-in was cancelled by the user")]
    Cancelled,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("A sign-in is already in progress")]
    SignInInProgress,

    #[error("OAuth state mismatch: expected {expected}, got {actual}")]
    StateMismatch { expected: String, actual: String },

    #[error("Invalid authorization code: {0}")]
    InvalidAuthCode(String),

    #[error("Operation timed out: {operation}")]
    OperationTimeout { operation: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Stored token is corrupted: {reason}")]
    TokenCorrupted { reason: String },

    #[error("Failed to serialize {context}: {source}")]
    SerializationFailed {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// Whether trying the same operation again may succeed without the user
    /// changing anything.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuthError::Cancelled
                | AuthError::NetworkError(_)
                | AuthError::OperationTimeout { .. }
                | AuthError::SignInInProgress
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
