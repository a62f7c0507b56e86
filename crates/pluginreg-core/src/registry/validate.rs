//! Whole-registry consistency checks

use std::collections::{HashMap, HashSet};

use pluginreg_manifest::{Schema, VersioningScheme, validator::is_valid_uuid};
use regex::Regex;

use super::{Registry, refs::ref_problem};

impl Registry {
    /// Every violation of the registry invariants, in a stable order
    ///
    /// Reports duplicate ids, uuids and active URLs; redirects that collide
    /// with another plugin; per-plugin field problems (trust level,
    /// categories, uuid format, id format, refs, versioning scheme); and
    /// malformed blacklist entries. An empty result means the registry is
    /// consistent.
    pub fn validate_registry(&self, schema: &Schema) -> Vec<String> {
        let mut errors = Vec::new();
        let index = self.index();

        let ids_at = |positions: &[usize]| {
            positions
                .iter()
                .map(|p| self.plugins[*p].id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let duplicated = |map: &HashMap<&str, Vec<usize>>, key: &str, position: usize| {
            map.get(key)
                .filter(|positions| positions.len() > 1 && positions[0] == position)
                .cloned()
        };

        for (position, plugin) in self.plugins.iter().enumerate() {
            if duplicated(index.ids(), plugin.id.as_str(), position).is_some() {
                errors.push(format!("Duplicate plugin id: {}", plugin.id));
            }
            if let Some(positions) = duplicated(index.uuids(), plugin.uuid.as_str(), position) {
                errors.push(format!(
                    "Duplicate uuid {} in plugins: {}",
                    plugin.uuid,
                    ids_at(&positions)
                ));
            }
            if let Some(positions) = duplicated(index.urls(), plugin.git_url.as_str(), position) {
                errors.push(format!(
                    "Duplicate git_url {} in plugins: {}",
                    plugin.git_url,
                    ids_at(&positions)
                ));
            }

            let mut seen_redirects = HashSet::new();
            for redirect in &plugin.redirect_from {
                if !seen_redirects.insert(redirect.as_str()) {
                    continue;
                }
                if *redirect == plugin.git_url {
                    errors.push(format!(
                        "Plugin '{}': redirect {} equals its own git_url",
                        plugin.id, redirect
                    ));
                }
                if let Some(owners) = index.urls().get(redirect.as_str()) {
                    for owner in owners.iter().filter(|o| **o != position) {
                        errors.push(format!(
                            "Redirect {} of plugin '{}' is the active git_url of plugin '{}'",
                            redirect, plugin.id, self.plugins[*owner].id
                        ));
                    }
                }
                let shared = duplicated(index.redirects(), redirect.as_str(), position);
                if let Some(positions) = shared {
                    let owners: HashSet<usize> = positions.iter().copied().collect();
                    if owners.len() > 1 {
                        errors.push(format!(
                            "Redirect {} appears on multiple plugins: {}",
                            redirect,
                            ids_at(&positions)
                        ));
                    }
                }
            }

            self.check_plugin_fields(position, schema, &mut errors);
        }

        for (number, entry) in self.blacklist.iter().enumerate() {
            let label = format!("Blacklist entry {}", number + 1);
            if !entry.has_identifier() {
                errors.push(format!("{}: no uuid, url or url_regex", label));
            }
            if entry.reason.trim().is_empty() {
                errors.push(format!("{}: reason cannot be empty", label));
            }
            if let Some(pattern) = &entry.url_regex
                && let Err(e) = Regex::new(pattern)
            {
                errors.push(format!("{}: invalid url_regex '{}': {}", label, pattern, e));
            }
        }

        errors
    }

    fn check_plugin_fields(&self, position: usize, schema: &Schema, errors: &mut Vec<String>) {
        let plugin = &self.plugins[position];
        let id = &plugin.id;

        if !is_valid_id(id, schema.id_max_length) {
            errors.push(format!(
                "Plugin '{}': invalid id (lowercase letters, digits and hyphens, at most {} characters)",
                id, schema.id_max_length
            ));
        }
        if !is_valid_uuid(&plugin.uuid) {
            errors.push(format!("Plugin '{}': invalid uuid '{}'", id, plugin.uuid));
        }
        if !schema.is_trust_level(&plugin.trust_level) {
            errors.push(format!(
                "Plugin '{}': invalid trust level '{}' (allowed: {})",
                id,
                plugin.trust_level,
                schema.trust_levels.join(", ")
            ));
        }
        if plugin.categories.is_empty() {
            errors.push(format!("Plugin '{}': categories cannot be empty", id));
        }
        for category in plugin.categories.iter().filter(|c| !schema.is_category(c)) {
            errors.push(format!(
                "Plugin '{}': invalid category '{}' (allowed: {})",
                id,
                category,
                schema.categories.join(", ")
            ));
        }

        let mut ref_names = HashSet::new();
        for git_ref in &plugin.refs {
            if !ref_names.insert(git_ref.name.as_str()) {
                errors.push(format!("Plugin '{}': duplicate ref name '{}'", id, git_ref.name));
            }
            if let Some(problem) = ref_problem(git_ref) {
                errors.push(format!("Plugin '{}': {}", id, problem));
            }
        }

        if let Some(scheme) = &plugin.versioning_scheme
            && let Err(e) = VersioningScheme::parse(scheme)
        {
            errors.push(format!("Plugin '{}': {}", id, e));
        }
    }
}

fn is_valid_id(id: &str, max_length: usize) -> bool {
    !id.is_empty()
        && id.len() <= max_length
        && !id.starts_with('-')
        && !id.ends_with('-')
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
