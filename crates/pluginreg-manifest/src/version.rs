//! API versions and version tagging schemes

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::{ManifestError, ManifestResult};

/// Dotted numeric application API version such as `3.0` or `4.99`
///
/// Comparison is component-wise with missing trailing components treated as
/// zero, so `4` == `4.0` and `3.99` < `4.0`.
#[derive(Debug, Clone)]
pub struct ApiVersion {
    raw: String,
    parts: Vec<u64>,
}

impl ApiVersion {
    pub fn parse(value: &str) -> ManifestResult<Self> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err(ManifestError::InvalidVersion(
                "API version cannot be empty".to_string(),
            ));
        }

        let parts = raw
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                part.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                ManifestError::InvalidVersion(format!(
                    "'{}' is not a dotted numeric API version",
                    value
                ))
            })?;

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn component(&self, index: usize) -> u64 {
        self.parts.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ApiVersion {}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl FromStr for ApiVersion {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Check that `min <= max` when both bounds are given
pub fn check_api_range(min: Option<&str>, max: Option<&str>) -> ManifestResult<()> {
    let min = min.map(ApiVersion::parse).transpose()?;
    let max = max.map(ApiVersion::parse).transpose()?;

    if let (Some(min), Some(max)) = (&min, &max)
        && min > max
    {
        return Err(ManifestError::InvalidVersion(format!(
            "min_api_version {} is greater than max_api_version {}",
            min, max
        )));
    }
    Ok(())
}

/// How a plugin tags its releases
#[derive(Debug, Clone)]
pub enum VersioningScheme {
    Semver,
    Calver,
    /// Custom tag pattern, stored as `regex:<pattern>`
    Regex(Regex),
}

impl VersioningScheme {
    pub const REGEX_PREFIX: &'static str = "regex:";

    pub fn parse(value: &str) -> ManifestResult<Self> {
        match value.trim() {
            "semver" => Ok(Self::Semver),
            "calver" => Ok(Self::Calver),
            other => {
                let pattern = other.strip_prefix(Self::REGEX_PREFIX).ok_or_else(|| {
                    ManifestError::InvalidVersion(format!(
                        "Unknown versioning scheme '{}'. Use 'semver', 'calver' or 'regex:<pattern>'",
                        value
                    ))
                })?;
                if pattern.is_empty() {
                    return Err(ManifestError::InvalidVersion(
                        "Versioning scheme regex pattern cannot be empty".to_string(),
                    ));
                }
                let regex = Regex::new(pattern).map_err(|e| {
                    ManifestError::InvalidVersion(format!(
                        "Invalid versioning scheme pattern '{}': {}",
                        pattern, e
                    ))
                })?;
                Ok(Self::Regex(regex))
            }
        }
    }
}

impl fmt::Display for VersioningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semver => f.write_str("semver"),
            Self::Calver => f.write_str("calver"),
            Self::Regex(regex) => write!(f, "{}{}", Self::REGEX_PREFIX, regex.as_str()),
        }
    }
}
