//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the drive media core:
//! - Logging and tracing setup
//! - Configuration management
//! - Event bus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
