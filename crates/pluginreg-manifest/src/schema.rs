//! Schema constants for manifests and registry records
//!
//! The defaults describe the Picard plugin ecosystem. A [`Schema`] is plain
//! data and can be overridden from configuration, so the validator never
//! hard-codes an enumeration.

use serde::{Deserialize, Serialize};

/// Trust levels a registry entry may carry, most trusted first
pub const TRUST_LEVELS: &[&str] = &["official", "trusted", "community"];

/// Categories a plugin may be tagged with
pub const CATEGORIES: &[&str] = &["metadata", "coverart", "ui", "scripting", "formats", "other"];

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 200;
pub const MAX_LONG_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_ID_LENGTH: usize = 64;

/// Shape a manifest field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A single string
    String,
    /// An array of strings
    StringList,
    /// A table mapping strings to strings (translations)
    Table,
}

impl FieldKind {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::StringList => "a list of strings",
            Self::Table => "a table of strings",
        }
    }
}

/// Extra rule applied to a field's value(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Canonical hyphenated UUID
    Uuid,
    /// Each element must be a known category
    Category,
    /// Value must be a known trust level
    TrustLevel,
    /// Each element must be a dotted numeric API version
    ApiVersion,
}

/// Rules for one manifest field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            max_length: None,
            constraint: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }
}

/// Validation schema shared by the manifest validator and the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub trust_levels: Vec<String>,
    pub categories: Vec<String>,
    pub id_max_length: usize,
    pub fields: Vec<FieldSpec>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            trust_levels: TRUST_LEVELS.iter().map(|s| s.to_string()).collect(),
            categories: CATEGORIES.iter().map(|s| s.to_string()).collect(),
            id_max_length: MAX_ID_LENGTH,
            fields: default_fields(),
        }
    }
}

fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("uuid", FieldKind::String).required().constraint(Constraint::Uuid),
        FieldSpec::new("name", FieldKind::String).required().max_length(MAX_NAME_LENGTH),
        FieldSpec::new("version", FieldKind::String).required(),
        FieldSpec::new("description", FieldKind::String)
            .required()
            .max_length(MAX_DESCRIPTION_LENGTH),
        FieldSpec::new("api", FieldKind::StringList)
            .required()
            .constraint(Constraint::ApiVersion),
        FieldSpec::new("authors", FieldKind::StringList),
        FieldSpec::new("maintainers", FieldKind::StringList),
        FieldSpec::new("categories", FieldKind::StringList).constraint(Constraint::Category),
        FieldSpec::new("license", FieldKind::String),
        FieldSpec::new("license_url", FieldKind::String),
        FieldSpec::new("homepage", FieldKind::String),
        FieldSpec::new("long_description", FieldKind::String).max_length(MAX_LONG_DESCRIPTION_LENGTH),
        FieldSpec::new("name_i18n", FieldKind::Table),
        FieldSpec::new("description_i18n", FieldKind::Table),
        FieldSpec::new("long_description_i18n", FieldKind::Table),
    ]
}

impl Schema {
    pub fn is_trust_level(&self, value: &str) -> bool {
        self.trust_levels.iter().any(|t| t == value)
    }

    pub fn is_category(&self, value: &str) -> bool {
        self.categories.iter().any(|c| c == value)
    }

    /// The least trusted level, used when none is requested
    pub fn default_trust_level(&self) -> Option<&str> {
        self.trust_levels.last().map(String::as_str)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Check the schema itself is usable
    pub fn check(&self) -> Result<(), String> {
        if self.trust_levels.is_empty() {
            return Err("schema must define at least one trust level".to_string());
        }
        if self.categories.is_empty() {
            return Err("schema must define at least one category".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(format!("schema defines field '{}' twice", field.name));
            }
        }
        Ok(())
    }
}
