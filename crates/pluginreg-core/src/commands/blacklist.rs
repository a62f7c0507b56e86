//! Blacklist commands

use pluginreg_manifest::Schema;

use super::mutate;
use crate::error::Result;
use crate::registry::{BlacklistEntry, BlacklistSpec, Registry};

pub fn add(
    registry: Registry,
    schema: &Schema,
    spec: BlacklistSpec,
) -> Result<(Registry, BlacklistEntry)> {
    mutate(registry, schema, |r| r.blacklist_add(spec).cloned())
}

/// Returns how many entries were removed
pub fn remove(
    registry: Registry,
    schema: &Schema,
    url: Option<&str>,
    uuid: Option<&str>,
    url_regex: Option<&str>,
) -> Result<(Registry, usize)> {
    mutate(registry, schema, |r| r.blacklist_remove(url, uuid, url_regex))
}
