//! Drive media browser.
//!
//! Umbrella crate over the workspace. Hosts depend on `drive-media-browser`
//! and get the browser façade plus the `desktop-shims` feature (reqwest HTTP
//! client and OS keyring token storage) without wiring each crate.

pub use core_browser::*;
