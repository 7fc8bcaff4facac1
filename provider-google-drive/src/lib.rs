//! # Google Drive Provider
//!
//! Implements [`bridge_traits::MediaDirectory`] for Google Drive API v3.
//!
//! ## Overview
//!
//! - Single-page listing of image and video files, newest first
//! - Name search with the same mime-type restriction
//! - Session expiry detection on 401, clearing the stored token

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{GoogleDriveError, Result};
pub use bridge_traits::ListingPage;
pub use types::{DriveFile, FilesListResponse};
