//! Pluginreg Core Library
//!
//! This crate provides the core functionality for pluginreg, including:
//! - Registry store (load, atomic persist, TOML/JSON formats)
//! - Plugin, redirect, ref and blacklist mutations with uniqueness checks
//! - Whole-registry validation
//! - Operations that fetch, validate and reconcile manifests
//! - Statistics and configuration

pub mod commands;
pub mod config;
pub mod error;
pub mod registry;
pub mod stats;
pub mod utils;

pub use error::{Error, Result};
pub use pluginreg_manifest as manifest;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::registry::{BlacklistEntry, PluginRecord, PluginRef, Registry};
    pub use pluginreg_manifest::Schema;
}
