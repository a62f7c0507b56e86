//! Plugin commands: add, update, edit, remove and redirects
//!
//! `add` and `update` are the only commands that touch the network: they
//! fetch the plugin's manifest once through the given fetcher and reconcile
//! it with the registry.

use pluginreg_manifest::{ManifestFetcher, ManifestSource, Schema, VersioningScheme};
use tracing::{debug, info};

use super::mutate;
use crate::error::{Error, Result};
use crate::registry::{
    DEFAULT_REF, PluginEdit, PluginRecord, PluginRef, Registry, check_categories, ref_problem,
};
use crate::utils::{self, derive_plugin_id};

/// Everything needed to add a plugin besides its manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddRequest {
    pub git_url: String,
    /// Defaults to the least trusted level of the schema
    pub trust_level: Option<String>,
    /// Defaults to the categories declared by the manifest
    pub categories: Option<Vec<String>>,
    /// The manifest is fetched from the first ref, or `main` if none
    pub refs: Vec<PluginRef>,
    pub versioning_scheme: Option<String>,
}

impl AddRequest {
    pub fn new(git_url: impl Into<String>) -> Self {
        Self {
            git_url: git_url.into(),
            ..Self::default()
        }
    }

    fn fetch_ref(&self) -> &str {
        self.refs
            .first()
            .map(|r| r.name.as_str())
            .unwrap_or(DEFAULT_REF)
    }

    /// Checks that need neither the network nor the registry
    fn check(&self, trust_level: &str, schema: &Schema) -> Result<()> {
        let mut errors = Vec::new();

        if !schema.is_trust_level(trust_level) {
            errors.push(format!(
                "Invalid trust level: {} (allowed: {})",
                trust_level,
                schema.trust_levels.join(", ")
            ));
        }
        if let Some(scheme) = &self.versioning_scheme
            && let Err(e) = VersioningScheme::parse(scheme)
        {
            errors.push(e.to_string());
        }
        let mut names = std::collections::HashSet::new();
        for git_ref in &self.refs {
            if !names.insert(git_ref.name.as_str()) {
                errors.push(format!("Duplicate ref name: {}", git_ref.name));
            }
            errors.extend(ref_problem(git_ref));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }
}

/// Fetch a plugin's manifest and add it to the registry
///
/// Order of checks: request options and derived id, the URL against the
/// blacklist, then (after the fetch) the manifest itself and its uuid
/// against the blacklist. Only then is the id or URL checked for a
/// collision, so a blacklisted plugin is always reported as blacklisted.
pub async fn add<S: ManifestSource>(
    registry: Registry,
    fetcher: &ManifestFetcher<S>,
    schema: &Schema,
    request: AddRequest,
) -> Result<(Registry, PluginRecord)> {
    let git_url = request.git_url.trim().to_string();
    if git_url.is_empty() {
        return Err(Error::validation("Git URL cannot be empty"));
    }
    let trust_level = match &request.trust_level {
        Some(level) => level.clone(),
        None => schema
            .default_trust_level()
            .ok_or_else(|| Error::Config("schema defines no trust levels".to_string()))?
            .to_string(),
    };
    request.check(&trust_level, schema)?;

    let id = derive_plugin_id(&git_url)?;
    registry.ensure_not_blacklisted(None, Some(git_url.as_str()))?;

    let fetch_ref = request.fetch_ref();
    info!(id = %id, git_url = %git_url, git_ref = %fetch_ref, "Fetching manifest");
    let manifest = fetcher
        .fetch(&git_url, fetch_ref)
        .await?
        .to_manifest(schema)?;
    debug!(id = %id, uuid = %manifest.uuid, name = %manifest.name, "Manifest validated");

    registry.ensure_not_blacklisted(Some(manifest.uuid.as_str()), Some(git_url.as_str()))?;
    if registry.find_plugin(&id).is_some() {
        return Err(Error::conflict("Plugin", "id", id));
    }
    if registry.find_by_url(&git_url).is_some() {
        return Err(Error::conflict("Plugin", "git_url", git_url));
    }

    let categories = request
        .categories
        .clone()
        .unwrap_or_else(|| manifest.categories.clone());
    let errors = check_categories(&categories, schema);
    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    let mut record = PluginRecord::from_manifest(
        id,
        git_url,
        trust_level,
        categories,
        &manifest,
        utils::now(),
    );
    record.versioning_scheme = request.versioning_scheme;
    record.refs = request.refs;
    if record.refs.len() == 1 && record.refs[0].is_implicit_default() {
        record.refs.clear();
    }

    mutate(registry, schema, |r| {
        r.add_plugin(record.clone())?;
        Ok(record)
    })
}

/// Re-fetch a plugin's manifest and refresh its metadata
///
/// Uses `git_ref` if given, else the plugin's first ref, else `main`.
pub async fn update<S: ManifestSource>(
    registry: Registry,
    fetcher: &ManifestFetcher<S>,
    schema: &Schema,
    id: &str,
    git_ref: Option<&str>,
) -> Result<(Registry, PluginRecord)> {
    let plugin = registry.get_plugin(id)?;
    let git_url = plugin.git_url.clone();
    let fetch_ref = git_ref.unwrap_or_else(|| plugin.default_ref()).to_string();

    info!(id = %id, git_url = %git_url, git_ref = %fetch_ref, "Fetching manifest");
    let manifest = fetcher
        .fetch(&git_url, &fetch_ref)
        .await?
        .to_manifest(schema)?;

    mutate(registry, schema, |r| {
        let updated = r.update_plugin(id, &manifest)?.clone();
        r.ensure_not_blacklisted(Some(updated.uuid.as_str()), Some(updated.git_url.as_str()))?;
        Ok(updated)
    })
}

pub fn edit(
    registry: Registry,
    schema: &Schema,
    id: &str,
    edit: &PluginEdit,
) -> Result<(Registry, PluginRecord)> {
    mutate(registry, schema, |r| r.edit_plugin(id, edit, schema).cloned())
}

pub fn remove(registry: Registry, schema: &Schema, id: &str) -> Result<(Registry, PluginRecord)> {
    mutate(registry, schema, |r| r.remove_plugin(id))
}

/// Returns `false` when the redirect was already recorded
pub fn add_redirect(
    registry: Registry,
    schema: &Schema,
    id: &str,
    url: &str,
) -> Result<(Registry, bool)> {
    mutate(registry, schema, |r| r.add_redirect(id, url))
}

pub fn remove_redirect(
    registry: Registry,
    schema: &Schema,
    id: &str,
    url: &str,
) -> Result<(Registry, ())> {
    mutate(registry, schema, |r| r.remove_redirect(id, url))
}
