//! Utility functions

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{Error, Result};

/// Repository name prefixes dropped when deriving a plugin id
const ID_PREFIXES: &[&str] = &["picard-plugin-", "picard-", "plugin-"];

/// Current UTC time truncated to whole seconds
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Derive a plugin id from a git repository URL
///
/// Takes the repository name, drops a conventional prefix and normalizes
/// the rest to lowercase letters, digits and single hyphens:
/// `https://github.com/user/picard-plugin-Last_FM.git` becomes `last-fm`.
pub fn derive_plugin_id(git_url: &str) -> Result<String> {
    let trimmed = git_url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let repo_name = match trimmed.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name,
        _ => {
            return Err(Error::validation(format!(
                "Cannot derive plugin ID from URL: {}",
                git_url
            )));
        }
    };

    let lower = repo_name.to_lowercase();
    let name = ID_PREFIXES
        .iter()
        .find_map(|prefix| lower.strip_prefix(prefix))
        .unwrap_or(&lower);

    let mut id = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' };
        if c == '-' && id.ends_with('-') {
            continue;
        }
        id.push(c);
    }
    let id = id.trim_matches('-');

    if id.is_empty() {
        return Err(Error::validation(format!(
            "Cannot derive valid plugin ID from URL: {}",
            git_url
        )));
    }
    Ok(id.to_string())
}

/// Split a comma separated list, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_plugin_id() {
        let cases = [
            ("https://github.com/user/picard-plugin-name", "name"),
            ("https://github.com/user/my-plugin", "my-plugin"),
            ("https://github.com/user/picard-lastfm.git", "lastfm"),
            ("https://github.com/user/plugin-discogs/", "discogs"),
            ("https://github.com/user/Picard-Plugin-Last_FM", "last-fm"),
            ("https://gitlab.com/group/Cover Art  Finder", "cover-art-finder"),
            ("https://github.com/user/__weird__name__", "weird-name"),
        ];
        for (url, expected) in cases {
            assert_eq!(derive_plugin_id(url).unwrap(), expected, "url: {}", url);
        }
    }

    #[test]
    fn test_only_first_prefix_stripped() {
        assert_eq!(
            derive_plugin_id("https://github.com/user/picard-plugin-plugin-x").unwrap(),
            "plugin-x"
        );
    }

    #[test]
    fn test_derive_plugin_id_failures() {
        let err = derive_plugin_id("https://github.com/user/___").unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(derive_plugin_id("no-slashes-here").is_err());
        assert!(derive_plugin_id("https://github.com/user/picard-plugin-").is_err());
    }

    #[test]
    fn test_now_has_no_fraction() {
        assert_eq!(now().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("metadata, coverart,,"), vec!["metadata", "coverart"]);
        assert!(split_list(" ").is_empty());
    }
}
