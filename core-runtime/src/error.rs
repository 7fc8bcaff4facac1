use thiserror::Error;

/// Errors raised while assembling the runtime: settings validation and
/// bridge wiring.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting is out of range or an endpoint is not a valid URL.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No bridge implementation was injected and no desktop default exists.
    #[error("No {capability} available: {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime failure: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
