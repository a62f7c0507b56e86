//! Registry record types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pluginreg_manifest::Manifest;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ref used when a plugin stores none
pub const DEFAULT_REF: &str = "main";

/// A plugin entry in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginRecord {
    pub id: String,
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub git_url: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub trust_level: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning_scheme: Option<String>,
    /// Former git URLs that still resolve to this plugin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_from: Vec<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_i18n: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_i18n: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<PluginRef>,
}

impl PluginRecord {
    /// Build a new record from a validated manifest
    pub fn from_manifest(
        id: impl Into<String>,
        git_url: impl Into<String>,
        trust_level: impl Into<String>,
        categories: Vec<String>,
        manifest: &Manifest,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            uuid: manifest.uuid.clone(),
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            git_url: git_url.into(),
            categories,
            trust_level: trust_level.into(),
            authors: manifest.authors.clone(),
            maintainers: manifest.maintainers.clone(),
            versioning_scheme: None,
            redirect_from: Vec::new(),
            added_at: now,
            updated_at: now,
            name_i18n: manifest.name_i18n.clone(),
            description_i18n: manifest.description_i18n.clone(),
            refs: Vec::new(),
        }
    }

    /// Copy the manifest-derived metadata onto this record
    pub(crate) fn apply_manifest(&mut self, manifest: &Manifest, now: DateTime<Utc>) {
        self.name = manifest.name.clone();
        self.description = manifest.description.clone();
        self.authors = manifest.authors.clone();
        self.maintainers = manifest.maintainers.clone();
        self.name_i18n = manifest.name_i18n.clone();
        self.description_i18n = manifest.description_i18n.clone();
        self.updated_at = now;
    }

    /// The ref manifests are fetched from: the first stored ref, or `main`
    pub fn default_ref(&self) -> &str {
        self.refs
            .first()
            .map(|r| r.name.as_str())
            .unwrap_or(DEFAULT_REF)
    }

    pub fn find_ref(&self, name: &str) -> Option<&PluginRef> {
        self.refs.iter().find(|r| r.name == name)
    }
}

/// A named git reference with an optional application API range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_api_version: Option<String>,
}

impl PluginRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            min_api_version: None,
            max_api_version: None,
        }
    }

    /// Human readable API range: `API 3.0-3.99`, `API 4.0+` or `API <=3.99`
    pub fn api_range(&self) -> Option<String> {
        match (&self.min_api_version, &self.max_api_version) {
            (Some(min), Some(max)) => Some(format!("API {}-{}", min, max)),
            (Some(min), None) => Some(format!("API {}+", min)),
            (None, Some(max)) => Some(format!("API <={}", max)),
            (None, None) => None,
        }
    }

    /// Whether this is a bare `main` ref, equivalent to storing no refs
    pub fn is_implicit_default(&self) -> bool {
        self.name == DEFAULT_REF
            && self.description.is_none()
            && self.min_api_version.is_none()
            && self.max_api_version.is_none()
    }

    /// Parse one `name[:min[-max]]` ref specification
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (name, range) = match spec.split_once(':') {
            Some((name, range)) => (name.trim(), Some(range.trim())),
            None => (spec, None),
        };
        if name.is_empty() {
            return Err(Error::validation(format!(
                "Invalid ref specification '{}': ref name cannot be empty",
                spec
            )));
        }

        let mut git_ref = Self::new(name);
        if let Some(range) = range.filter(|r| !r.is_empty()) {
            match range.split_once('-') {
                Some((min, max)) => {
                    git_ref.min_api_version = non_empty(min);
                    git_ref.max_api_version = non_empty(max);
                }
                None => git_ref.min_api_version = Some(range.to_string()),
            }
        }
        Ok(git_ref)
    }

    /// Parse a comma separated list of ref specifications
    ///
    /// `"main:4.0,picard-v3:3.0-3.99"` yields `main` (API 4.0+) and
    /// `picard-v3` (API 3.0 to 3.99).
    pub fn parse_list(specs: &str) -> Result<Vec<Self>> {
        specs
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Self::parse_spec)
            .collect()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// A blacklist entry. At least one of `uuid`, `url` or `url_regex` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlacklistEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_regex: Option<String>,
    pub reason: String,
    pub blacklisted_at: DateTime<Utc>,
}

impl BlacklistEntry {
    pub fn has_identifier(&self) -> bool {
        self.uuid.is_some() || self.url.is_some() || self.url_regex.is_some()
    }

    /// Identifiers as `UUID:..., URL:..., REGEX:...`
    pub fn identifiers(&self) -> String {
        let mut parts = Vec::new();
        if let Some(uuid) = &self.uuid {
            parts.push(format!("UUID:{}", uuid));
        }
        if let Some(url) = &self.url {
            parts.push(format!("URL:{}", url));
        }
        if let Some(url_regex) = &self.url_regex {
            parts.push(format!("REGEX:{}", url_regex));
        }
        parts.join(", ")
    }

    pub(crate) fn same_identifiers(&self, other: &BlacklistEntry) -> bool {
        self.uuid == other.uuid && self.url == other.url && self.url_regex == other.url_regex
    }
}
