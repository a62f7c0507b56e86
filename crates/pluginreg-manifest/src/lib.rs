//! Pluginreg Manifest Handling
//!
//! Everything needed to turn a plugin's remote `MANIFEST.toml` into a
//! checked record:
//! - Schema constants (trust levels, categories, field rules)
//! - Manifest records and typed manifests
//! - Validation that reports every violation at once
//! - API version and versioning scheme parsing
//! - Fetching manifests from GitHub/GitLab hosted repositories

pub mod fetcher;
pub mod record;
pub mod schema;
pub mod validator;
pub mod version;

use thiserror::Error;

pub use fetcher::{HttpSource, ManifestFetcher, ManifestSource, manifest_url};
pub use record::{Manifest, ManifestRecord};
pub use schema::{Constraint, FieldKind, FieldSpec, Schema};
pub use validator::validate;
pub use version::{ApiVersion, VersioningScheme};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Only GitHub and GitLab URLs are supported: {0}")]
    UnsupportedHost(String),

    #[error("Manifest not found at {0}")]
    NotFound(String),

    #[error("Failed to fetch manifest from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid manifest TOML: {0}")]
    Parse(String),

    #[error("Manifest validation failed: {}", .0.join(", "))]
    Invalid(Vec<String>),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),
}

pub type ManifestResult<T> = Result<T, ManifestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_error_lists_every_message() {
        let err = ManifestError::Invalid(vec![
            "Missing required field: version".to_string(),
            "Invalid category: nope".to_string(),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("Manifest validation failed"));
        assert!(text.contains("version"));
        assert!(text.contains("nope"));
    }
}
