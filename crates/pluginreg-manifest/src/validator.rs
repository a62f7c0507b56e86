//! Manifest validation
//!
//! Runs every check and returns all violations so a submitter can fix the
//! manifest in one pass. The phases run in a fixed order:
//! 1. required fields are present
//! 2. present fields have the declared shape
//! 3. enumerated values are allowed (trust level, each category)
//! 4. identifier fields are well formed (UUID, API versions)
//! 5. free text is non-empty and within its length limit

use crate::{
    ApiVersion, ManifestRecord,
    schema::{Constraint, FieldKind, FieldSpec, Schema},
};

/// Validate a manifest record against a schema. Empty result = valid.
pub fn validate(record: &ManifestRecord, schema: &Schema) -> Vec<String> {
    let mut errors = Vec::new();

    for field in schema.required_fields() {
        if !record.contains(&field.name) {
            errors.push(format!("Missing required field: {}", field.name));
        }
    }

    let well_typed: Vec<(&FieldSpec, &toml::Value)> = schema
        .fields
        .iter()
        .filter_map(|field| record.get(&field.name).map(|value| (field, value)))
        .filter(|(field, value)| {
            if has_kind(value, field.kind) {
                true
            } else {
                errors.push(format!("Field '{}' must be {}", field.name, field.kind.describe()));
                false
            }
        })
        .collect();

    for (field, value) in &well_typed {
        match field.constraint {
            Some(Constraint::Category) => {
                for category in strings(value) {
                    if !schema.is_category(category) {
                        errors.push(format!(
                            "Invalid category: {} (allowed: {})",
                            category,
                            schema.categories.join(", ")
                        ));
                    }
                }
            }
            Some(Constraint::TrustLevel) => {
                for level in strings(value) {
                    if !schema.is_trust_level(level) {
                        errors.push(format!(
                            "Invalid trust level: {} (allowed: {})",
                            level,
                            schema.trust_levels.join(", ")
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    for (field, value) in &well_typed {
        match field.constraint {
            Some(Constraint::Uuid) => {
                for uuid in strings(value) {
                    if !is_valid_uuid(uuid) {
                        errors.push(format!("Invalid {}: '{}' is not a valid UUID", field.name, uuid));
                    }
                }
            }
            Some(Constraint::ApiVersion) => {
                for version in strings(value) {
                    if ApiVersion::parse(version).is_err() {
                        errors.push(format!(
                            "Invalid API version in '{}': '{}'",
                            field.name, version
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    for (field, value) in &well_typed {
        check_text(field, value, &mut errors);
    }

    errors
}

fn has_kind(value: &toml::Value, kind: FieldKind) -> bool {
    match kind {
        FieldKind::String => value.is_str(),
        FieldKind::StringList => value
            .as_array()
            .is_some_and(|items| items.iter().all(toml::Value::is_str)),
        FieldKind::Table => value
            .as_table()
            .is_some_and(|table| table.values().all(toml::Value::is_str)),
    }
}

/// All string values held by a field, whatever its kind
fn strings(value: &toml::Value) -> Vec<&str> {
    match value {
        toml::Value::String(s) => vec![s.as_str()],
        toml::Value::Array(items) => items.iter().filter_map(toml::Value::as_str).collect(),
        toml::Value::Table(table) => table.values().filter_map(toml::Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn check_text(field: &FieldSpec, value: &toml::Value, errors: &mut Vec<String>) {
    match field.kind {
        FieldKind::String => {
            if let Some(text) = value.as_str() {
                check_length(&field.name, text, field.max_length, errors);
            }
        }
        FieldKind::StringList => {
            let items = strings(value);
            if field.required && items.is_empty() {
                errors.push(format!("Field '{}' cannot be empty", field.name));
            }
            if items.iter().any(|item| item.trim().is_empty()) {
                errors.push(format!("Field '{}' cannot contain empty entries", field.name));
            }
        }
        FieldKind::Table => {
            if let Some(table) = value.as_table() {
                for (locale, text) in table {
                    if let Some(text) = text.as_str() {
                        let key = format!("{}.{}", field.name, locale);
                        check_length(&key, text, field.max_length, errors);
                    }
                }
            }
        }
    }
}

fn check_length(name: &str, text: &str, max_length: Option<usize>, errors: &mut Vec<String>) {
    if text.trim().is_empty() {
        errors.push(format!("Field '{}' cannot be empty", name));
        return;
    }
    if let Some(max) = max_length {
        let len = text.chars().count();
        if len > max {
            errors.push(format!(
                "Field '{}' is too long ({} characters, maximum {})",
                name, len, max
            ));
        }
    }
}

/// Canonical hyphenated form only: 8-4-4-4-12 hex digits
pub fn is_valid_uuid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::try_parse(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> ManifestRecord {
        ManifestRecord::parse(
            r#"
uuid = "12345678-1234-4234-8234-123456789abc"
name = "Test Plugin"
version = "1.0.0"
description = "A test plugin"
api = ["3.0"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_manifest() {
        assert_eq!(validate(&valid_record(), &Schema::default()), Vec::<String>::new());
    }

    #[test]
    fn test_missing_required_fields() {
        let mut record = valid_record();
        record.remove("version");
        record.remove("description");
        record.remove("api");

        let errors = validate(&record, &Schema::default());
        assert!(errors.contains(&"Missing required field: version".to_string()));
        assert!(errors.contains(&"Missing required field: description".to_string()));
        assert!(errors.contains(&"Missing required field: api".to_string()));
    }

    #[test]
    fn test_invalid_uuid() {
        let mut record = valid_record();
        record.insert("uuid", "not-a-uuid");

        let errors = validate(&record, &Schema::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_lowercase().contains("uuid"));
    }

    #[test]
    fn test_uuid_must_be_hyphenated() {
        assert!(is_valid_uuid("12345678-1234-4234-8234-123456789abc"));
        assert!(!is_valid_uuid("12345678123442348234123456789abc"));
        assert!(!is_valid_uuid("{12345678-1234-4234-8234-123456789abc}"));
    }

    #[test]
    fn test_each_category_checked() {
        let mut record = valid_record();
        record.insert(
            "categories",
            toml::Value::Array(vec!["metadata".into(), "invalid_category".into(), "bogus".into()]),
        );

        let errors = validate(&record, &Schema::default());
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.contains("Invalid category")));
        assert!(errors[0].contains("invalid_category"));
        assert!(errors[1].contains("bogus"));
    }

    #[test]
    fn test_wrong_types_reported() {
        let mut record = valid_record();
        record.insert("name", 42_i64);
        record.insert("api", "3.0");

        let errors = validate(&record, &Schema::default());
        assert!(errors.contains(&"Field 'name' must be a string".to_string()));
        assert!(errors.contains(&"Field 'api' must be a list of strings".to_string()));
    }

    #[test]
    fn test_free_text_limits() {
        let mut record = valid_record();
        record.insert("name", "   ");
        record.insert("description", "x".repeat(201));

        let errors = validate(&record, &Schema::default());
        assert!(errors.iter().any(|e| e.contains("'name' cannot be empty")));
        assert!(errors.iter().any(|e| e.contains("'description' is too long")));
    }

    #[test]
    fn test_api_versions_checked() {
        let mut record = valid_record();
        record.insert("api", toml::Value::Array(vec![]));
        let errors = validate(&record, &Schema::default());
        assert_eq!(errors, vec!["Field 'api' cannot be empty".to_string()]);

        record.insert("api", toml::Value::Array(vec!["three".into()]));
        let errors = validate(&record, &Schema::default());
        assert!(errors[0].contains("Invalid API version"));
    }

    #[test]
    fn test_errors_accumulate_in_phase_order() {
        let mut record = ManifestRecord::default();
        record.insert("uuid", "bad");
        record.insert("name", "");
        record.insert("categories", toml::Value::Array(vec!["nope".into()]));

        let errors = validate(&record, &Schema::default());
        let missing = errors.iter().position(|e| e.starts_with("Missing")).unwrap();
        let category = errors.iter().position(|e| e.contains("Invalid category")).unwrap();
        let uuid = errors.iter().position(|e| e.contains("UUID")).unwrap();
        let empty = errors.iter().position(|e| e.contains("cannot be empty")).unwrap();
        assert!(missing < category && category < uuid && uuid < empty);
    }

    #[test]
    fn test_trust_level_constraint() {
        let mut schema = Schema::default();
        schema
            .fields
            .push(FieldSpec::new("trust", FieldKind::String).constraint(Constraint::TrustLevel));

        let mut record = valid_record();
        record.insert("trust", "blessed");
        let errors = validate(&record, &schema);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid trust level: blessed"));
    }
}
