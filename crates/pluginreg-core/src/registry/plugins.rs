//! Plugin and redirect mutations

use pluginreg_manifest::{Manifest, Schema, VersioningScheme};
use tracing::info;

use super::{PluginRecord, Registry};
use crate::error::{Error, Result};
use crate::utils;

/// Changes applied by [`Registry::edit_plugin`]; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginEdit {
    pub trust_level: Option<String>,
    pub categories: Option<Vec<String>>,
    pub git_url: Option<String>,
    /// `Some(None)` removes the versioning scheme
    pub versioning_scheme: Option<Option<String>>,
}

impl PluginEdit {
    pub fn is_empty(&self) -> bool {
        self.trust_level.is_none()
            && self.categories.is_none()
            && self.git_url.is_none()
            && self.versioning_scheme.is_none()
    }

    fn check(&self, schema: &Schema) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(trust_level) = &self.trust_level
            && !schema.is_trust_level(trust_level)
        {
            errors.push(format!(
                "Invalid trust level: {} (allowed: {})",
                trust_level,
                schema.trust_levels.join(", ")
            ));
        }
        if let Some(categories) = &self.categories {
            errors.extend(check_categories(categories, schema));
        }
        if let Some(git_url) = &self.git_url
            && git_url.trim().is_empty()
        {
            errors.push("Field 'git_url' cannot be empty".to_string());
        }
        if let Some(Some(scheme)) = &self.versioning_scheme
            && let Err(e) = VersioningScheme::parse(scheme)
        {
            errors.push(e.to_string());
        }
        errors
    }
}

/// Categories must be a non-empty subset of the schema's enumeration
pub(crate) fn check_categories(categories: &[String], schema: &Schema) -> Vec<String> {
    if categories.is_empty() {
        return vec!["Field 'categories' cannot be empty".to_string()];
    }
    categories
        .iter()
        .filter(|c| !schema.is_category(c))
        .map(|c| {
            format!(
                "Invalid category: {} (allowed: {})",
                c,
                schema.categories.join(", ")
            )
        })
        .collect()
}

impl Registry {
    /// Insert a new plugin record
    ///
    /// Fails with a conflict if the id, uuid, git URL or any redirect is
    /// already known; the registry is left untouched.
    pub fn add_plugin(&mut self, record: PluginRecord) -> Result<()> {
        if let Some(conflict) = self.index().conflict(&record, None) {
            return Err(conflict);
        }
        info!(id = %record.id, uuid = %record.uuid, git_url = %record.git_url, "Adding plugin");
        self.plugins.push(record);
        Ok(())
    }

    /// Delete a plugin record and return it
    pub fn remove_plugin(&mut self, id: &str) -> Result<PluginRecord> {
        let position = self
            .index()
            .position_of(id)
            .ok_or_else(|| Error::not_found("Plugin", id))?;
        info!(id = %id, "Removing plugin");
        Ok(self.plugins.remove(position))
    }

    /// Refresh a plugin's metadata from a newly fetched manifest
    ///
    /// The manifest must carry the uuid already on record.
    pub fn update_plugin(&mut self, id: &str, manifest: &Manifest) -> Result<&PluginRecord> {
        let plugin = self.get_plugin_mut(id)?;
        if plugin.uuid != manifest.uuid {
            return Err(Error::IdentityMismatch {
                id: id.to_string(),
                expected: plugin.uuid.clone(),
                found: manifest.uuid.clone(),
            });
        }
        plugin.apply_manifest(manifest, utils::now());
        info!(id = %id, name = %plugin.name, "Updated plugin metadata");
        Ok(plugin)
    }

    /// Change the registry-owned fields of a plugin
    pub fn edit_plugin(
        &mut self,
        id: &str,
        edit: &PluginEdit,
        schema: &Schema,
    ) -> Result<&PluginRecord> {
        let position = self
            .index()
            .position_of(id)
            .ok_or_else(|| Error::not_found("Plugin", id))?;

        if edit.is_empty() {
            return Err(Error::validation("No changes specified"));
        }
        let errors = edit.check(schema);
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        let mut edited = self.plugins[position].clone();
        if let Some(trust_level) = &edit.trust_level {
            edited.trust_level = trust_level.clone();
        }
        if let Some(categories) = &edit.categories {
            edited.categories = categories.clone();
        }
        if let Some(git_url) = &edit.git_url {
            edited.git_url = git_url.trim().to_string();
            // Moving back to a former URL retires that redirect
            edited.redirect_from.retain(|r| *r != edited.git_url);
        }
        if let Some(scheme) = &edit.versioning_scheme {
            edited.versioning_scheme = scheme.clone();
        }

        if let Some(conflict) = self.index().conflict(&edited, Some(position)) {
            return Err(conflict);
        }

        edited.updated_at = utils::now();
        info!(id = %id, "Edited plugin");
        self.plugins[position] = edited;
        Ok(&self.plugins[position])
    }

    /// Record `url` as a former location of plugin `id`
    ///
    /// Returns `false` when the redirect was already present.
    pub fn add_redirect(&mut self, id: &str, url: &str) -> Result<bool> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::validation("Redirect URL cannot be empty"));
        }

        let index = self.index();
        let position = index
            .position_of(id)
            .ok_or_else(|| Error::not_found("Plugin", id))?;
        let plugin = &self.plugins[position];

        if plugin.git_url == url {
            return Err(Error::validation(format!(
                "Redirect {} is the current git_url of plugin '{}'",
                url, id
            )));
        }
        if plugin.redirect_from.iter().any(|r| r == url) {
            return Ok(false);
        }
        if let Some(found) = index.resolve_url(url)
            && found.position() != position
        {
            let field = match found {
                super::UrlMatch::Active(_) => "git_url",
                super::UrlMatch::Redirect(_) => "redirect",
            };
            return Err(Error::conflict("Plugin", field, url));
        }

        let plugin = &mut self.plugins[position];
        plugin.redirect_from.push(url.to_string());
        plugin.updated_at = utils::now();
        info!(id = %id, redirect = %url, "Added redirect");
        Ok(true)
    }

    pub fn remove_redirect(&mut self, id: &str, url: &str) -> Result<()> {
        let plugin = self.get_plugin_mut(id)?;
        let before = plugin.redirect_from.len();
        plugin.redirect_from.retain(|r| r != url);
        if plugin.redirect_from.len() == before {
            return Err(Error::not_found("Redirect", url));
        }
        plugin.updated_at = utils::now();
        info!(id = %id, redirect = %url, "Removed redirect");
        Ok(())
    }
}
