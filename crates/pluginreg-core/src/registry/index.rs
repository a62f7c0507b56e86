//! Lookup tables over the plugin list
//!
//! Rebuilt for every check; the registry is small and short lived, so there
//! is no incremental maintenance to get wrong.

use std::collections::HashMap;

use super::record::PluginRecord;
use crate::error::Error;

/// Positions of plugins keyed by id, uuid, active URL and redirect URL
///
/// Every key maps to all positions holding it, so duplicates in a
/// hand-edited file stay visible.
#[derive(Debug, Default)]
pub struct RegistryIndex<'a> {
    by_id: HashMap<&'a str, Vec<usize>>,
    by_uuid: HashMap<&'a str, Vec<usize>>,
    by_url: HashMap<&'a str, Vec<usize>>,
    by_redirect: HashMap<&'a str, Vec<usize>>,
}

/// How a URL is known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlMatch {
    Active(usize),
    Redirect(usize),
}

impl UrlMatch {
    pub fn position(self) -> usize {
        match self {
            Self::Active(position) | Self::Redirect(position) => position,
        }
    }
}

impl<'a> RegistryIndex<'a> {
    pub fn build(plugins: &'a [PluginRecord]) -> Self {
        let mut index = Self::default();
        for (position, plugin) in plugins.iter().enumerate() {
            index.by_id.entry(&plugin.id).or_default().push(position);
            index.by_uuid.entry(&plugin.uuid).or_default().push(position);
            index.by_url.entry(&plugin.git_url).or_default().push(position);
            for redirect in &plugin.redirect_from {
                index.by_redirect.entry(redirect).or_default().push(position);
            }
        }
        index
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        first(&self.by_id, id)
    }

    /// Resolve a URL, preferring an active URL over a redirect
    pub fn resolve_url(&self, url: &str) -> Option<UrlMatch> {
        first(&self.by_url, url)
            .map(UrlMatch::Active)
            .or_else(|| first(&self.by_redirect, url).map(UrlMatch::Redirect))
    }

    pub fn ids(&self) -> &HashMap<&'a str, Vec<usize>> {
        &self.by_id
    }

    pub fn uuids(&self) -> &HashMap<&'a str, Vec<usize>> {
        &self.by_uuid
    }

    pub fn urls(&self) -> &HashMap<&'a str, Vec<usize>> {
        &self.by_url
    }

    pub fn redirects(&self) -> &HashMap<&'a str, Vec<usize>> {
        &self.by_redirect
    }

    /// First collision between `candidate` and any plugin other than the one
    /// at `skip`
    ///
    /// Checks the id, the uuid, the active URL against active URLs and
    /// redirects, then each redirect against the same.
    pub fn conflict(&self, candidate: &PluginRecord, skip: Option<usize>) -> Option<Error> {
        let taken = |map: &HashMap<&'a str, Vec<usize>>, key: &str| {
            map.get(key)
                .is_some_and(|positions| positions.iter().any(|p| Some(*p) != skip))
        };

        if taken(&self.by_id, candidate.id.as_str()) {
            return Some(Error::conflict("Plugin", "id", &candidate.id));
        }
        if taken(&self.by_uuid, candidate.uuid.as_str()) {
            return Some(Error::conflict("Plugin", "uuid", &candidate.uuid));
        }
        if taken(&self.by_url, candidate.git_url.as_str())
            || taken(&self.by_redirect, candidate.git_url.as_str())
        {
            return Some(Error::conflict("Plugin", "git_url", &candidate.git_url));
        }
        candidate
            .redirect_from
            .iter()
            .find(|url| {
                taken(&self.by_url, url.as_str()) || taken(&self.by_redirect, url.as_str())
            })
            .map(|url| Error::conflict("Plugin", "redirect", url))
    }
}

fn first(map: &HashMap<&str, Vec<usize>>, key: &str) -> Option<usize> {
    map.get(key).and_then(|positions| positions.first().copied())
}
