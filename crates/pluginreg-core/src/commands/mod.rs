//! Commands module - registry operations as library functions
//!
//! Mutating commands take the registry by value and hand it back with their
//! result. On any error the registry is dropped, so a caller that persists
//! only on success never writes a half-applied change.

pub mod blacklist;
pub mod plugin;
pub mod refs;

use std::collections::HashSet;

use pluginreg_manifest::Schema;
use tracing::warn;

use crate::error::{Error, Result};
use crate::registry::Registry;

/// Run a mutation and re-validate the registry afterwards
///
/// Violations that were already present before the mutation are tolerated;
/// any new one fails the whole operation with a validation error.
pub fn mutate<T>(
    mut registry: Registry,
    schema: &Schema,
    op: impl FnOnce(&mut Registry) -> Result<T>,
) -> Result<(Registry, T)> {
    let before: HashSet<String> = registry.validate_registry(schema).into_iter().collect();

    let value = op(&mut registry)?;

    let introduced: Vec<String> = registry
        .validate_registry(schema)
        .into_iter()
        .filter(|error| !before.contains(error))
        .collect();
    if !introduced.is_empty() {
        warn!(count = introduced.len(), "Mutation introduced registry violations");
        return Err(Error::Validation(introduced));
    }
    Ok((registry, value))
}
