//! Ref mutations

use pluginreg_manifest::version::check_api_range;
use tracing::info;

use super::{PluginRef, Registry};
use crate::error::{Error, Result};
use crate::utils;

/// Changes applied by [`Registry::edit_ref`]
///
/// For the optional fields, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefEdit {
    pub new_name: Option<String>,
    pub description: Option<Option<String>>,
    pub min_api_version: Option<Option<String>>,
    pub max_api_version: Option<Option<String>>,
}

impl RefEdit {
    pub fn is_empty(&self) -> bool {
        self.new_name.is_none()
            && self.description.is_none()
            && self.min_api_version.is_none()
            && self.max_api_version.is_none()
    }

    fn apply(&self, git_ref: &mut PluginRef) {
        if let Some(name) = &self.new_name {
            git_ref.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            git_ref.description = description.clone();
        }
        if let Some(min) = &self.min_api_version {
            git_ref.min_api_version = min.clone();
        }
        if let Some(max) = &self.max_api_version {
            git_ref.max_api_version = max.clone();
        }
    }
}

/// What is wrong with a ref, if anything: it needs a name and a
/// well-formed, ordered API range
pub(crate) fn ref_problem(git_ref: &PluginRef) -> Option<String> {
    if git_ref.name.trim().is_empty() {
        return Some("Ref name cannot be empty".to_string());
    }
    check_api_range(
        git_ref.min_api_version.as_deref(),
        git_ref.max_api_version.as_deref(),
    )
    .err()
    .map(|e| format!("Ref '{}': {}", git_ref.name, e))
}

fn check_ref(git_ref: &PluginRef) -> Result<()> {
    match ref_problem(git_ref) {
        Some(problem) => Err(Error::validation(problem)),
        None => Ok(()),
    }
}

impl Registry {
    /// Append a ref to a plugin
    pub fn add_ref(&mut self, id: &str, git_ref: PluginRef) -> Result<()> {
        check_ref(&git_ref)?;

        let plugin = self.get_plugin_mut(id)?;
        if plugin.find_ref(&git_ref.name).is_some() {
            return Err(Error::conflict("Ref", "name", git_ref.name));
        }

        info!(id = %id, git_ref = %git_ref.name, "Adding ref");
        plugin.refs.push(git_ref);
        plugin.updated_at = utils::now();
        Ok(())
    }

    /// Rename or re-describe a ref, returning the edited ref
    pub fn edit_ref(&mut self, id: &str, name: &str, edit: &RefEdit) -> Result<&PluginRef> {
        if edit.is_empty() {
            return Err(Error::validation("No changes specified"));
        }

        let plugin = self.get_plugin_mut(id)?;
        let position = plugin
            .refs
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| Error::not_found("Ref", name))?;

        let mut edited = plugin.refs[position].clone();
        edit.apply(&mut edited);
        check_ref(&edited)?;

        if edited.name != name && plugin.find_ref(&edited.name).is_some() {
            return Err(Error::conflict("Ref", "name", edited.name));
        }

        info!(id = %id, git_ref = %name, "Edited ref");
        plugin.refs[position] = edited;
        plugin.updated_at = utils::now();
        Ok(&plugin.refs[position])
    }

    pub fn remove_ref(&mut self, id: &str, name: &str) -> Result<PluginRef> {
        let plugin = self.get_plugin_mut(id)?;
        let position = plugin
            .refs
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| Error::not_found("Ref", name))?;

        info!(id = %id, git_ref = %name, "Removing ref");
        let removed = plugin.refs.remove(position);
        plugin.updated_at = utils::now();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::{plugin, registry_with};

    fn registry() -> Registry {
        registry_with(vec![plugin("example", "11111111-1111-4111-8111-111111111111")])
    }

    fn bounded(name: &str, min: Option<&str>, max: Option<&str>) -> PluginRef {
        PluginRef {
            min_api_version: min.map(String::from),
            max_api_version: max.map(String::from),
            ..PluginRef::new(name)
        }
    }

    #[test]
    fn test_add_ref() {
        let mut registry = registry();
        registry.add_ref("example", bounded("main", Some("4.0"), None)).unwrap();
        registry
            .add_ref("example", bounded("picard-v3", Some("3.0"), Some("3.99")))
            .unwrap();

        let plugin = registry.find_plugin("example").unwrap();
        assert_eq!(plugin.refs.len(), 2);
        assert_eq!(plugin.default_ref(), "main");
    }

    #[test]
    fn test_add_duplicate_ref() {
        let mut registry = registry();
        registry.add_ref("example", PluginRef::new("main")).unwrap();
        let err = registry.add_ref("example", PluginRef::new("main")).unwrap_err();
        assert_eq!(err.kind(), "ConflictError");
    }

    #[test]
    fn test_add_ref_with_inverted_range() {
        let mut registry = registry();
        let err = registry
            .add_ref("example", bounded("main", Some("4.0"), Some("3.99")))
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(err.to_string().contains("min_api_version 4.0"));

        let err = registry
            .add_ref("example", bounded("main", Some("four"), None))
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(registry.find_plugin("example").unwrap().refs.is_empty());
    }

    #[test]
    fn test_add_ref_unknown_plugin() {
        let mut registry = registry();
        let err = registry.add_ref("missing", PluginRef::new("main")).unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
    }

    #[test]
    fn test_edit_ref() {
        let mut registry = registry();
        registry
            .add_ref("example", bounded("picard-v3", Some("3.0"), Some("3.99")))
            .unwrap();

        let edit = RefEdit {
            new_name: Some("v3".to_string()),
            description: Some(Some("Picard 3 series".to_string())),
            max_api_version: Some(None),
            ..RefEdit::default()
        };
        let edited = registry.edit_ref("example", "picard-v3", &edit).unwrap();
        assert_eq!(edited.name, "v3");
        assert_eq!(edited.description.as_deref(), Some("Picard 3 series"));
        assert_eq!(edited.min_api_version.as_deref(), Some("3.0"));
        assert_eq!(edited.max_api_version, None);
    }

    #[test]
    fn test_edit_ref_inverted_range_is_rejected() {
        let mut registry = registry();
        registry.add_ref("example", PluginRef::new("main")).unwrap();
        let before = registry.clone();

        let edit = RefEdit {
            min_api_version: Some(Some("4.0".to_string())),
            max_api_version: Some(Some("3.99".to_string())),
            ..RefEdit::default()
        };
        let err = registry.edit_ref("example", "main", &edit).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(registry, before);
    }

    #[test]
    fn test_edit_ref_rename_conflict() {
        let mut registry = registry();
        registry.add_ref("example", PluginRef::new("main")).unwrap();
        registry.add_ref("example", PluginRef::new("develop")).unwrap();

        let edit = RefEdit {
            new_name: Some("main".to_string()),
            ..RefEdit::default()
        };
        let err = registry.edit_ref("example", "develop", &edit).unwrap_err();
        assert_eq!(err.kind(), "ConflictError");

        let err = registry.edit_ref("example", "absent", &edit).unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
    }

    #[test]
    fn test_remove_ref() {
        let mut registry = registry();
        registry.add_ref("example", PluginRef::new("main")).unwrap();

        let removed = registry.remove_ref("example", "main").unwrap();
        assert_eq!(removed.name, "main");
        assert_eq!(registry.find_plugin("example").unwrap().default_ref(), "main");

        let err = registry.remove_ref("example", "main").unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
    }
}
