//! Error types for pluginreg

use pluginreg_manifest::ManifestError;
use thiserror::Error;

/// Result type alias using pluginreg's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Pluginreg error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    // Remote errors (E100-E199)
    #[error("Failed to fetch manifest: {0}")]
    Fetch(String),

    #[error("Failed to parse manifest: {0}")]
    Parse(String),

    // Validation errors (E200-E299)
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    // Consistency errors (E300-E399)
    #[error("{entity} with {field} '{value}' already exists")]
    Conflict {
        entity: String,
        field: String,
        value: String,
    },

    #[error("UUID mismatch for plugin '{id}': registry has {expected}, manifest has {found}")]
    IdentityMismatch {
        id: String,
        expected: String,
        found: String,
    },

    #[error("Plugin is blacklisted ({identifier}): {reason}")]
    Blacklisted { identifier: String, reason: String },

    // Storage errors (E400-E499)
    #[error("Failed to load registry {path}: {reason}")]
    RegistryLoad { path: String, reason: String },

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a validation error with a single message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            entity: entity.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a registry load error
    pub fn registry_load(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::RegistryLoad {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "E001",
            Self::Fetch(_) => "E100",
            Self::Parse(_) => "E101",
            Self::Validation(_) => "E200",
            Self::Conflict { .. } => "E300",
            Self::IdentityMismatch { .. } => "E301",
            Self::Blacklisted { .. } => "E302",
            Self::RegistryLoad { .. } => "E400",
            Self::Config(_) => "E600",
            Self::Io(_) => "E9999",
        }
    }

    /// Error class name as reported on the command line
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundError",
            Self::Fetch(_) => "FetchError",
            Self::Parse(_) => "ParseError",
            Self::Validation(_) => "ValidationError",
            Self::Conflict { .. } => "ConflictError",
            Self::IdentityMismatch { .. } => "IdentityMismatchError",
            Self::Blacklisted { .. } => "BlacklistedError",
            Self::RegistryLoad { .. } => "RegistryLoadError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound { entity, .. } if entity == "Plugin" => {
                Some("pluginreg plugin list".to_string())
            }
            Self::NotFound { entity, .. } if entity == "Blacklist entry" => {
                Some("pluginreg blacklist list".to_string())
            }
            Self::Fetch(_) => Some("Check the repository URL and git ref".to_string()),
            Self::Blacklisted { .. } => Some("pluginreg blacklist list".to_string()),
            Self::IdentityMismatch { id, .. } => Some(format!("pluginreg plugin show {}", id)),
            Self::RegistryLoad { .. } => Some("pluginreg validate".to_string()),
            Self::Config(_) => Some("pluginreg config list".to_string()),
            _ => None,
        }
    }
}

impl From<ManifestError> for Error {
    fn from(error: ManifestError) -> Self {
        match error {
            ManifestError::Parse(message) => Self::Parse(message),
            ManifestError::Invalid(errors) => Self::Validation(errors),
            ManifestError::InvalidVersion(message) => Self::Validation(vec![message]),
            other => Self::Fetch(other.to_string()),
        }
    }
}
