//! # Host Bridge Traits
//!
//! Capabilities the drive media core needs from its host platform.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP
//! - [`SecureStore`](storage::SecureStore) - Session token persistence
//! - [`MediaDirectory`](directory::MediaDirectory) - Remote media listing and search
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Web      | host-provided adapters |
//!
//! ## Error Handling
//!
//! Every trait returns [`BridgeError`](error::BridgeError). Two variants carry
//! meaning beyond "something failed":
//!
//! - `NotAuthenticated`: no token is stored, the user must sign in
//! - `SessionExpired`: the provider answered 401 and the token is gone
//!
//! Callers branch on these variants, never on message text.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! behind `Arc` across async tasks.

pub mod directory;
pub mod error;
pub mod http;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

pub use directory::{ListingPage, MediaDirectory, MediaFile};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::SecureStore;
