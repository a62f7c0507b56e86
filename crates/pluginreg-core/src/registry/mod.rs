//! Registry store
//!
//! The registry is a flat file (TOML by default, JSON when the path ends in
//! `.json`) holding the plugin records and the blacklist. A [`Registry`]
//! value is loaded once per invocation, mutated in memory and written back
//! atomically.
//!
//! # File layout
//!
//! ```toml
//! api_version = "3.0"
//!
//! [[plugins]]
//! id = "example"
//! uuid = "..."
//! # ...
//!
//! [[blacklist]]
//! url = "https://github.com/badorg/plugin"
//! reason = "..."
//! blacklisted_at = "2024-01-01T00:00:00Z"
//! ```
//!
//! Plugins are written sorted by id; empty collections are omitted.

mod blacklist;
mod index;
mod plugins;
mod record;
mod refs;
mod validate;

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use blacklist::{BlacklistMatch, BlacklistSpec};
pub use index::{RegistryIndex, UrlMatch};
pub use plugins::PluginEdit;
pub use record::{BlacklistEntry, DEFAULT_REF, PluginRecord, PluginRef};
pub use refs::RefEdit;

pub(crate) use plugins::check_categories;
pub(crate) use refs::ref_problem;

/// API version of registries created from scratch
pub const DEFAULT_API_VERSION: &str = "3.0";

/// On-disk serialization format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistryFormat {
    #[default]
    Toml,
    Json,
}

impl RegistryFormat {
    /// Pick the format from a file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl FromStr for RegistryFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            other => Err(Error::validation(format!(
                "Unknown output format '{}'. Use 'toml' or 'json'",
                other
            ))),
        }
    }
}

impl fmt::Display for RegistryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => f.write_str("toml"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// The plugin registry: plugin records plus the blacklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub plugins: Vec<PluginRecord>,
    #[serde(default)]
    pub blacklist: Vec<BlacklistEntry>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION)
    }
}

/// Serialized shape: plugins sorted by id, empty collections left out
#[derive(Serialize)]
struct RegistryView<'a> {
    api_version: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    plugins: Vec<&'a PluginRecord>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    blacklist: &'a [BlacklistEntry],
}

impl Registry {
    /// An empty registry
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            plugins: Vec::new(),
            blacklist: Vec::new(),
        }
    }

    /// Load a registry file, failing if it is missing or malformed
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::registry_load(path, e))?;
        let registry = Self::parse(&text, RegistryFormat::from_path(path))
            .map_err(|reason| Error::registry_load(path, reason))?;
        debug!(
            path = %path.display(),
            plugins = registry.plugins.len(),
            blacklist = registry.blacklist.len(),
            "Loaded registry"
        );
        Ok(registry)
    }

    /// Load a registry file, or start an empty one if it does not exist yet
    pub fn open(path: &Path, api_version: &str) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Registry file not found, starting empty");
            return Ok(Self::new(api_version));
        }
        Self::load(path)
    }

    /// Parse registry text in the given format
    pub fn parse(text: &str, format: RegistryFormat) -> std::result::Result<Self, String> {
        match format {
            RegistryFormat::Toml => toml::from_str(text).map_err(|e| e.message().to_string()),
            RegistryFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }

    /// Render the whole registry; the output parses back to an equal value
    pub fn render(&self, format: RegistryFormat) -> Result<String> {
        let mut plugins: Vec<&PluginRecord> = self.plugins.iter().collect();
        plugins.sort_by(|a, b| a.id.cmp(&b.id));
        let view = RegistryView {
            api_version: &self.api_version,
            plugins,
            blacklist: &self.blacklist,
        };

        let mut text = match format {
            RegistryFormat::Toml => toml::to_string_pretty(&view)
                .map_err(|e| Error::Parse(format!("Failed to serialize registry: {}", e)))?,
            RegistryFormat::Json => serde_json::to_string_pretty(&view)
                .map_err(|e| Error::Parse(format!("Failed to serialize registry: {}", e)))?,
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }

    /// Write the registry to `path` through a temporary file in the same
    /// directory, so readers see either the old or the new file.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let text = self.render(RegistryFormat::from_path(path))?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        // The temporary file is created owner-only; keep the target's mode
        if let Ok(meta) = fs::metadata(path) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        info!(
            path = %path.display(),
            plugins = self.plugins.len(),
            blacklist = self.blacklist.len(),
            "Saved registry"
        );
        Ok(())
    }

    /// Lookup tables over the current plugin list
    pub fn index(&self) -> RegistryIndex<'_> {
        RegistryIndex::build(&self.plugins)
    }

    pub fn find_plugin(&self, id: &str) -> Option<&PluginRecord> {
        self.plugins.iter().find(|p| p.id == id)
    }

    pub fn get_plugin(&self, id: &str) -> Result<&PluginRecord> {
        self.find_plugin(id).ok_or_else(|| Error::not_found("Plugin", id))
    }

    pub(crate) fn get_plugin_mut(&mut self, id: &str) -> Result<&mut PluginRecord> {
        self.plugins
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::not_found("Plugin", id))
    }

    /// Find the plugin answering to `url`, either as active URL or redirect
    pub fn find_by_url(&self, url: &str) -> Option<&PluginRecord> {
        self.index()
            .resolve_url(url)
            .map(|found| &self.plugins[found.position()])
    }

    /// Plugins sorted by id, optionally filtered by trust level and category
    pub fn list_plugins(
        &self,
        trust_level: Option<&str>,
        category: Option<&str>,
    ) -> Vec<&PluginRecord> {
        let mut plugins: Vec<&PluginRecord> = self
            .plugins
            .iter()
            .filter(|p| trust_level.is_none_or(|t| p.trust_level == t))
            .filter(|p| category.is_none_or(|c| p.categories.iter().any(|pc| pc == c)))
            .collect();
        plugins.sort_by(|a, b| a.id.cmp(&b.id));
        plugins
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// A valid record hosted at `https://github.com/user/<id>`
    pub fn plugin(id: &str, uuid: &str) -> PluginRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PluginRecord {
            id: id.to_string(),
            uuid: uuid.to_string(),
            name: format!("{} plugin", id),
            description: "A test plugin".to_string(),
            git_url: format!("https://github.com/user/{}", id),
            categories: vec!["metadata".to_string()],
            trust_level: "community".to_string(),
            authors: vec!["Test Author".to_string()],
            maintainers: None,
            versioning_scheme: None,
            redirect_from: Vec::new(),
            added_at: at,
            updated_at: at,
            name_i18n: None,
            description_i18n: None,
            refs: Vec::new(),
        }
    }

    pub fn registry_with(plugins: Vec<PluginRecord>) -> Registry {
        Registry {
            plugins,
            ..Registry::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_registry() -> Registry {
        let mut second = plugin("zeta", "22222222-2222-4222-8222-222222222222");
        second.trust_level = "official".to_string();
        second.categories = vec!["coverart".to_string(), "ui".to_string()];
        second.maintainers = Some(vec!["Maintainer".to_string()]);
        second.versioning_scheme = Some("semver".to_string());
        second.redirect_from = vec!["https://github.com/old/zeta".to_string()];
        second.name_i18n = Some(BTreeMap::from([("de".to_string(), "Zeta DE".to_string())]));
        second.refs = vec![
            PluginRef::parse_spec("main:4.0").unwrap(),
            PluginRef::parse_spec("picard-v3:3.0-3.99").unwrap(),
        ];

        let mut registry = registry_with(vec![
            second,
            plugin("alpha", "11111111-1111-4111-8111-111111111111"),
        ]);
        registry.blacklist.push(BlacklistEntry {
            uuid: None,
            url: None,
            url_regex: Some("^https://github\\.com/badorg/.*".to_string()),
            reason: "Malicious organization".to_string(),
            blacklisted_at: chrono::Utc::now(),
        });
        registry
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(RegistryFormat::from_path(Path::new("plugins.toml")), RegistryFormat::Toml);
        assert_eq!(RegistryFormat::from_path(Path::new("plugins.json")), RegistryFormat::Json);
        assert_eq!(RegistryFormat::from_path(Path::new("plugins")), RegistryFormat::Toml);
        assert_eq!("JSON".parse::<RegistryFormat>().unwrap(), RegistryFormat::Json);
        assert!("yaml".parse::<RegistryFormat>().is_err());
    }

    #[test]
    fn test_persist_and_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plugins.toml");
        let registry = sample_registry();

        registry.persist(&path).unwrap();
        let loaded = Registry::load(&path).unwrap();

        assert_eq!(loaded.api_version, registry.api_version);
        assert_eq!(loaded.blacklist, registry.blacklist);
        let ids: Vec<_> = loaded.plugins.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert_eq!(loaded.find_plugin("zeta"), registry.find_plugin("zeta"));
        assert_eq!(loaded.find_plugin("alpha"), registry.find_plugin("alpha"));
    }

    #[test]
    fn test_persist_and_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plugins.json");
        let registry = sample_registry();

        registry.persist(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.trim_start().starts_with('{'));

        let loaded = Registry::load(&path).unwrap();
        assert_eq!(loaded.find_plugin("zeta"), registry.find_plugin("zeta"));
        assert_eq!(loaded.blacklist, registry.blacklist);
    }

    #[test]
    fn test_reload_persist_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plugins.toml");
        sample_registry().persist(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        Registry::load(&path).unwrap().persist(&path).unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_collections_omitted() {
        let text = Registry::default().render(RegistryFormat::Toml).unwrap();
        assert_eq!(text.trim(), "api_version = \"3.0\"");

        let parsed = Registry::parse(&text, RegistryFormat::Toml).unwrap();
        assert!(parsed.plugins.is_empty());
        assert!(parsed.blacklist.is_empty());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = Registry::load(&dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.kind(), "RegistryLoadError");
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(&dir.path().join("absent.toml"), "4.0").unwrap();
        assert_eq!(registry.api_version, "4.0");
        assert!(registry.plugins.is_empty());
    }

    #[test]
    fn test_load_rejects_malformed_files() {
        let dir = TempDir::new().unwrap();

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[[plugins]\nid = ").unwrap();
        assert_eq!(Registry::load(&broken).unwrap_err().kind(), "RegistryLoadError");

        let missing_fields = dir.path().join("missing.toml");
        fs::write(&missing_fields, "api_version = \"3.0\"\n[[plugins]]\nid = \"x\"\n").unwrap();
        assert_eq!(Registry::load(&missing_fields).unwrap_err().kind(), "RegistryLoadError");

        let unknown = dir.path().join("unknown.toml");
        fs::write(&unknown, "api_version = \"3.0\"\nextra = 1\n").unwrap();
        assert_eq!(Registry::load(&unknown).unwrap_err().kind(), "RegistryLoadError");
    }

    #[test]
    fn test_persist_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("plugins.toml");
        Registry::default().persist(&path).unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plugins.toml");
        Registry::default().persist(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        sample_registry().persist(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert_eq!(Registry::load(&path).unwrap().plugins.len(), 2);
    }

    #[test]
    fn test_find_by_url_follows_redirects() {
        let registry = sample_registry();
        assert_eq!(
            registry.find_by_url("https://github.com/old/zeta").map(|p| p.id.as_str()),
            Some("zeta")
        );
        assert_eq!(
            registry.find_by_url("https://github.com/user/alpha").map(|p| p.id.as_str()),
            Some("alpha")
        );
        assert!(registry.find_by_url("https://github.com/user/none").is_none());
    }

    #[test]
    fn test_list_plugins_filters() {
        let registry = sample_registry();
        let all: Vec<_> = registry.list_plugins(None, None).iter().map(|p| p.id.clone()).collect();
        assert_eq!(all, vec!["alpha", "zeta"]);

        let official = registry.list_plugins(Some("official"), None);
        assert_eq!(official.len(), 1);
        assert_eq!(official[0].id, "zeta");

        let metadata = registry.list_plugins(None, Some("metadata"));
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].id, "alpha");

        assert!(registry.list_plugins(Some("trusted"), None).is_empty());
    }
}
