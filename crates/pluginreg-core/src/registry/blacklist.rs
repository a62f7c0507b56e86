//! Blacklist management and matching

use regex::Regex;
use tracing::{info, warn};

use super::{BlacklistEntry, Registry};
use crate::error::{Error, Result};
use crate::utils;

/// Identifiers and reason for a new blacklist entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlacklistSpec {
    pub uuid: Option<String>,
    pub url: Option<String>,
    pub url_regex: Option<String>,
    pub reason: String,
}

/// Why a plugin is blocked
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlacklistMatch<'a> {
    Uuid(&'a BlacklistEntry),
    Url(&'a BlacklistEntry),
    UrlRegex(&'a BlacklistEntry),
}

impl<'a> BlacklistMatch<'a> {
    pub fn entry(&self) -> &'a BlacklistEntry {
        match self {
            Self::Uuid(entry) | Self::Url(entry) | Self::UrlRegex(entry) => entry,
        }
    }

    /// Turn the match into a [`Error::Blacklisted`] naming what matched
    pub fn into_error(self, uuid: Option<&str>, url: Option<&str>) -> Error {
        let identifier = match self {
            Self::Uuid(_) => format!("uuid {}", uuid.unwrap_or_default()),
            Self::Url(_) => format!("url {}", url.unwrap_or_default()),
            Self::UrlRegex(entry) => format!(
                "url {} matches {}",
                url.unwrap_or_default(),
                entry.url_regex.as_deref().unwrap_or_default()
            ),
        };
        Error::Blacklisted {
            identifier,
            reason: self.entry().reason.clone(),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Registry {
    /// Add a blacklist entry
    ///
    /// At least one identifier and a non-empty reason are required, and a
    /// `url_regex` must compile.
    pub fn blacklist_add(&mut self, spec: BlacklistSpec) -> Result<&BlacklistEntry> {
        let entry = BlacklistEntry {
            uuid: clean(spec.uuid),
            url: clean(spec.url),
            url_regex: clean(spec.url_regex),
            reason: spec.reason.trim().to_string(),
            blacklisted_at: utils::now(),
        };

        let mut errors = Vec::new();
        if entry.reason.is_empty() {
            errors.push("Reason is required for blacklisting".to_string());
        }
        if !entry.has_identifier() {
            errors.push("At least one of url, uuid, or url_regex must be provided".to_string());
        }
        if let Some(pattern) = &entry.url_regex
            && let Err(e) = Regex::new(pattern)
        {
            errors.push(format!("Invalid url_regex '{}': {}", pattern, e));
        }
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        if self.blacklist.iter().any(|e| e.same_identifiers(&entry)) {
            return Err(Error::conflict(
                "Blacklist entry",
                "identifiers",
                entry.identifiers(),
            ));
        }

        info!(identifiers = %entry.identifiers(), reason = %entry.reason, "Blacklisting");
        let identifiers = entry.identifiers();
        self.blacklist.push(entry);
        self.blacklist
            .last()
            .ok_or_else(|| Error::not_found("Blacklist entry", identifiers))
    }

    /// Remove every entry carrying one of the given identifiers
    ///
    /// Returns the number of entries removed; removing nothing is an error.
    pub fn blacklist_remove(
        &mut self,
        url: Option<&str>,
        uuid: Option<&str>,
        url_regex: Option<&str>,
    ) -> Result<usize> {
        if url.is_none() && uuid.is_none() && url_regex.is_none() {
            return Err(Error::validation(
                "At least one of url, uuid, or url_regex must be provided",
            ));
        }

        let before = self.blacklist.len();
        self.blacklist.retain(|entry| {
            let hit = |wanted: Option<&str>, held: &Option<String>| {
                wanted.is_some() && wanted == held.as_deref()
            };
            !(hit(url, &entry.url) || hit(uuid, &entry.uuid) || hit(url_regex, &entry.url_regex))
        });

        let removed = before - self.blacklist.len();
        if removed == 0 {
            let identifier = [url, uuid, url_regex]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::not_found("Blacklist entry", identifier));
        }
        info!(removed, "Removed blacklist entries");
        Ok(removed)
    }

    /// Entries whose exact url or uuid equals the given ones
    pub fn blacklist_find(&self, url: Option<&str>, uuid: Option<&str>) -> Vec<&BlacklistEntry> {
        self.blacklist
            .iter()
            .filter(|entry| {
                (url.is_some() && entry.url.as_deref() == url)
                    || (uuid.is_some() && entry.uuid.as_deref() == uuid)
            })
            .collect()
    }

    /// Check a plugin's uuid and URL against the blacklist
    ///
    /// A uuid entry blocks the plugin wherever it is hosted, so uuids are
    /// checked across all entries before any URL. An exact `url` wins over a
    /// `url_regex`. Patterns that fail to compile are skipped.
    pub fn blacklist_match(
        &self,
        uuid: Option<&str>,
        url: Option<&str>,
    ) -> Option<BlacklistMatch<'_>> {
        if let Some(uuid) = uuid
            && let Some(entry) = self
                .blacklist
                .iter()
                .find(|e| e.uuid.as_deref() == Some(uuid))
        {
            return Some(BlacklistMatch::Uuid(entry));
        }

        let url = url?;
        if let Some(entry) = self.blacklist.iter().find(|e| e.url.as_deref() == Some(url)) {
            return Some(BlacklistMatch::Url(entry));
        }

        self.blacklist.iter().find_map(|entry| {
            let pattern = entry.url_regex.as_deref()?;
            match Regex::new(pattern) {
                Ok(regex) => regex.is_match(url).then_some(BlacklistMatch::UrlRegex(entry)),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Skipping invalid blacklist pattern");
                    None
                }
            }
        })
    }

    /// Fail with [`Error::Blacklisted`] if the uuid or URL is blocked
    pub fn ensure_not_blacklisted(&self, uuid: Option<&str>, url: Option<&str>) -> Result<()> {
        match self.blacklist_match(uuid, url) {
            Some(found) => Err(found.into_error(uuid, url)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAD_UUID: &str = "11111111-1111-4111-8111-111111111111";

    fn spec(url: Option<&str>, uuid: Option<&str>, url_regex: Option<&str>) -> BlacklistSpec {
        BlacklistSpec {
            uuid: uuid.map(String::from),
            url: url.map(String::from),
            url_regex: url_regex.map(String::from),
            reason: "Security issue".to_string(),
        }
    }

    #[test]
    fn test_add_requires_identifier_and_reason() {
        let mut registry = Registry::default();

        let err = registry.blacklist_add(spec(None, None, None)).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");

        let mut no_reason = spec(Some("https://github.com/bad/plugin"), None, None);
        no_reason.reason = "  ".to_string();
        let err = registry.blacklist_add(no_reason).unwrap_err();
        assert!(err.to_string().contains("Reason is required"));

        let err = registry.blacklist_add(spec(None, None, Some("(unclosed"))).unwrap_err();
        assert!(err.to_string().contains("Invalid url_regex"));

        assert!(registry.blacklist.is_empty());
    }

    #[test]
    fn test_add_blacklist_entry() {
        let mut registry = Registry::default();
        let entry = registry
            .blacklist_add(spec(Some("https://github.com/bad/plugin"), Some(BAD_UUID), None))
            .unwrap();
        assert_eq!(entry.url.as_deref(), Some("https://github.com/bad/plugin"));
        assert_eq!(entry.uuid.as_deref(), Some(BAD_UUID));
        assert_eq!(entry.reason, "Security issue");

        let second = registry
            .blacklist_add(spec(None, None, Some(r"^https://github\.com/badorg/.*")))
            .unwrap()
            .clone();
        assert_eq!(registry.blacklist.len(), 2);
        assert_eq!(registry.blacklist.last(), Some(&second));
        assert_eq!(second.url_regex.as_deref(), Some(r"^https://github\.com/badorg/.*"));

        let err = registry
            .blacklist_add(spec(Some("https://github.com/bad/plugin"), Some(BAD_UUID), None))
            .unwrap_err();
        assert_eq!(err.kind(), "ConflictError");
    }

    #[test]
    fn test_uuid_blocks_regardless_of_url() {
        let mut registry = Registry::default();
        registry.blacklist_add(spec(None, Some(BAD_UUID), None)).unwrap();

        let found = registry
            .blacklist_match(Some(BAD_UUID), Some("https://github.com/anyone/anything"))
            .unwrap();
        assert!(matches!(found, BlacklistMatch::Uuid(_)));
        assert!(registry.blacklist_match(Some(BAD_UUID), None).is_some());
        assert!(
            registry
                .blacklist_match(
                    Some("22222222-2222-4222-8222-222222222222"),
                    Some("https://github.com/anyone/anything")
                )
                .is_none()
        );
    }

    #[test]
    fn test_uuid_checked_before_urls() {
        let mut registry = Registry::default();
        registry
            .blacklist_add(spec(Some("https://github.com/bad/plugin"), None, None))
            .unwrap();
        registry.blacklist_add(spec(None, Some(BAD_UUID), None)).unwrap();

        let found = registry
            .blacklist_match(Some(BAD_UUID), Some("https://github.com/bad/plugin"))
            .unwrap();
        assert!(matches!(found, BlacklistMatch::Uuid(_)));
    }

    #[test]
    fn test_regex_blocks_matching_urls_only() {
        let mut registry = Registry::default();
        registry
            .blacklist_add(spec(None, None, Some(r"^https://github\.com/badorg/.*")))
            .unwrap();

        let found = registry.blacklist_match(None, Some("https://github.com/badorg/x"));
        assert!(matches!(found, Some(BlacklistMatch::UrlRegex(_))));
        assert!(registry.blacklist_match(None, Some("https://github.com/goodorg/x")).is_none());

        let err = registry
            .ensure_not_blacklisted(None, Some("https://github.com/badorg/x"))
            .unwrap_err();
        assert_eq!(err.kind(), "BlacklistedError");
        assert!(err.to_string().contains("Security issue"));
    }

    #[test]
    fn test_invalid_stored_pattern_is_skipped() {
        let mut registry = Registry::default();
        registry.blacklist.push(BlacklistEntry {
            uuid: None,
            url: None,
            url_regex: Some("(".to_string()),
            reason: "Broken".to_string(),
            blacklisted_at: utils::now(),
        });
        assert!(registry.blacklist_match(None, Some("https://github.com/x/y")).is_none());
    }

    #[test]
    fn test_remove_and_find() {
        let mut registry = Registry::default();
        registry
            .blacklist_add(spec(Some("https://github.com/bad/plugin"), None, None))
            .unwrap();
        registry.blacklist_add(spec(None, Some(BAD_UUID), None)).unwrap();
        registry
            .blacklist_add(spec(None, None, Some(r"^https://github\.com/badorg/.*")))
            .unwrap();

        assert_eq!(registry.blacklist_find(None, Some(BAD_UUID)).len(), 1);
        assert_eq!(
            registry
                .blacklist_find(Some("https://github.com/bad/plugin"), None)
                .len(),
            1
        );

        assert_eq!(registry.blacklist_remove(None, Some(BAD_UUID), None).unwrap(), 1);
        assert_eq!(
            registry
                .blacklist_remove(None, None, Some(r"^https://github\.com/badorg/.*"))
                .unwrap(),
            1
        );
        assert_eq!(registry.blacklist.len(), 1);

        let err = registry.blacklist_remove(None, Some(BAD_UUID), None).unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
        assert!(registry.blacklist_remove(None, None, None).is_err());
    }
}
