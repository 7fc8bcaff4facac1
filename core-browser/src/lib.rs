//! # Drive Media Browser
//!
//! Client-side core for browsing the image and video files of a Google Drive
//! account.
//!
//! ## Overview
//!
//! - [`DriveBrowser`] drives the whole flow: session restore or sign-in,
//!   listing load, search, sign-out
//! - [`SearchController`] reconciles keystrokes with a local filter or a
//!   remote query, debounced and ordered by sequence number
//! - [`filter_by_name`] is the local case-insensitive name filter
//!
//! State reaches the presentation layer through a `watch` channel carrying
//! the current [`SearchView`] and the [`EventBus`](core_runtime::events::EventBus).

pub mod browser;
pub mod error;
pub mod filter;
pub mod search;

pub use browser::{BrowserSnapshot, DriveBrowser, ListingState};
pub use error::{BrowserError, Result};
pub use filter::filter_by_name;
pub use search::{
    SearchController, SearchPhase, SearchPolicy, SearchView, SessionExpiryHandler, ViewSource,
};
