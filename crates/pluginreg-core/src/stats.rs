//! Registry statistics

use std::collections::BTreeMap;

use serde::Serialize;

use crate::registry::Registry;

/// Counts over a registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total_plugins: usize,
    pub blacklist_entries: usize,
    pub by_trust_level: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

impl RegistryStats {
    pub fn collect(registry: &Registry) -> Self {
        let mut stats = Self {
            total_plugins: registry.plugins.len(),
            blacklist_entries: registry.blacklist.len(),
            ..Self::default()
        };

        for plugin in &registry.plugins {
            *stats
                .by_trust_level
                .entry(plugin.trust_level.clone())
                .or_default() += 1;
            for category in &plugin.categories {
                *stats.by_category.entry(category.clone()).or_default() += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::{plugin, registry_with};

    #[test]
    fn test_collect() {
        let mut official = plugin("official", "22222222-2222-4222-8222-222222222222");
        official.trust_level = "official".to_string();
        official.categories = vec!["metadata".to_string(), "coverart".to_string()];
        let registry = registry_with(vec![
            plugin("first", "11111111-1111-4111-8111-111111111111"),
            official,
        ]);

        let stats = RegistryStats::collect(&registry);
        assert_eq!(stats.total_plugins, 2);
        assert_eq!(stats.blacklist_entries, 0);
        assert_eq!(stats.by_trust_level.get("community"), Some(&1));
        assert_eq!(stats.by_trust_level.get("official"), Some(&1));
        assert_eq!(stats.by_category.get("metadata"), Some(&2));
        assert_eq!(stats.by_category.get("coverart"), Some(&1));
    }

    #[test]
    fn test_empty_registry() {
        assert_eq!(RegistryStats::collect(&Registry::default()), RegistryStats::default());
    }
}
