//! Raw manifest records and the typed manifest extracted from them

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ManifestError, ManifestResult, Schema, validator};

/// A parsed `MANIFEST.toml`, field name to raw value
///
/// Kept untyped until validated so that every problem can be reported,
/// rather than the first one a typed deserializer trips over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestRecord(toml::Table);

impl ManifestRecord {
    /// Parse manifest text
    pub fn parse(text: &str) -> ManifestResult<Self> {
        let table: toml::Table =
            toml::from_str(text).map_err(|e| ManifestError::Parse(e.message().to_string()))?;
        Ok(Self(table))
    }

    pub fn as_table(&self) -> &toml::Table {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&toml::Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<toml::Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<toml::Value> {
        self.0.remove(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(toml::Value::as_str)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.str_field("uuid")
    }

    /// Run the validator over this record
    pub fn validate(&self, schema: &Schema) -> Vec<String> {
        validator::validate(self, schema)
    }

    /// Validate and convert into a typed [`Manifest`]
    pub fn to_manifest(&self, schema: &Schema) -> ManifestResult<Manifest> {
        let errors = self.validate(schema);
        if !errors.is_empty() {
            return Err(ManifestError::Invalid(errors));
        }
        toml::Value::Table(self.0.clone())
            .try_into()
            .map_err(|e: toml::de::Error| ManifestError::Invalid(vec![e.message().to_string()]))
    }
}

/// Typed view of a validated manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub uuid: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub api: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub maintainers: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub license_url: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub name_i18n: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub description_i18n: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub long_description_i18n: Option<BTreeMap<String, String>>,
}
