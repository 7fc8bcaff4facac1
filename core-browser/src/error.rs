use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    /// The provider rejected the session; the user has been signed out.
    #[error("Session expired, sign in again")]
    SessionExpired,

    /// The listing could not be fetched. The view is empty until a retry.
    #[error("Transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, BrowserError>;
