//! Ref commands

use pluginreg_manifest::Schema;

use super::mutate;
use crate::error::Result;
use crate::registry::{PluginRef, RefEdit, Registry};

pub fn add(
    registry: Registry,
    schema: &Schema,
    id: &str,
    git_ref: PluginRef,
) -> Result<(Registry, ())> {
    mutate(registry, schema, |r| r.add_ref(id, git_ref))
}

/// Returns the ref as it reads after the edit
pub fn edit(
    registry: Registry,
    schema: &Schema,
    id: &str,
    name: &str,
    edit: &RefEdit,
) -> Result<(Registry, PluginRef)> {
    mutate(registry, schema, |r| r.edit_ref(id, name, edit).cloned())
}

pub fn remove(
    registry: Registry,
    schema: &Schema,
    id: &str,
    name: &str,
) -> Result<(Registry, PluginRef)> {
    mutate(registry, schema, |r| r.remove_ref(id, name))
}
