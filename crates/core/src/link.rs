//! Per-repository account links.
//!
//! A link is a `.ghmulti` marker at the repository root:
//!
//! ```json
//! { "account": "work" }
//! ```
//!
//! The same name is mirrored into the repository's local git config under
//! [`LINK_MIRROR_KEY`] for tools that only read that value. The marker is
//! authoritative; the mirror is never read back.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::{LinkError, StoreError};
use crate::git::ScopedConfig;
use crate::models::Scope;

pub const LINK_FILE_NAME: &str = ".ghmulti";
pub const LINK_MIRROR_KEY: &str = "ghmulti.linkedaccount";

/// Reads and writes repository links.
pub struct LinkStore<'a> {
    config: &'a dyn ScopedConfig,
}

impl<'a> LinkStore<'a> {
    pub fn new(config: &'a dyn ScopedConfig) -> Self {
        Self { config }
    }

    pub fn marker_path(repo: &Path) -> PathBuf {
        repo.join(LINK_FILE_NAME)
    }

    /// The linked account name, or `None` when there is no usable marker.
    pub fn get(&self, repo: &Path) -> Option<String> {
        let path = Self::marker_path(repo);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "link marker unreadable, ignoring");
                return None;
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "link marker malformed, ignoring");
                return None;
            }
        };

        let name = value
            .get("account")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        if name.is_none() {
            warn!(path = %path.display(), "link marker has no account name, ignoring");
        }
        name
    }

    /// Write the marker, then the mirror.
    pub fn set(&self, repo: &Path, name: &str) -> Result<(), LinkError> {
        let path = Self::marker_path(repo);
        let body = serde_json::json!({ "account": name });
        let mut json = serde_json::to_string_pretty(&body).map_err(|e| StoreError::Serialize {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        json.push('\n');
        std::fs::write(&path, json).map_err(|source| StoreError::Write {
            path: path.display().to_string(),
            source,
        })?;

        self.config.set(Scope::Local, LINK_MIRROR_KEY, name, repo)?;
        info!(repo = %repo.display(), account = name, "linked repository");
        Ok(())
    }

    /// Remove the marker and the mirror. Neither needs to exist.
    pub fn clear(&self, repo: &Path) -> Result<(), LinkError> {
        let path = Self::marker_path(repo);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed link marker"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Remove {
                    path: path.display().to_string(),
                    source,
                }
                .into())
            }
        }

        self.config.unset(Scope::Local, LINK_MIRROR_KEY, repo)?;
        info!(repo = %repo.display(), "unlinked repository");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MemoryConfig;

    #[test]
    fn test_set_get_clear_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new();
        let links = LinkStore::new(&config);

        assert_eq!(links.get(dir.path()), None);

        links.set(dir.path(), "work").unwrap();
        assert_eq!(links.get(dir.path()).as_deref(), Some("work"));
        assert_eq!(
            config.get(Scope::Local, LINK_MIRROR_KEY, dir.path()).as_deref(),
            Some("work")
        );

        links.clear(dir.path()).unwrap();
        assert_eq!(links.get(dir.path()), None);
        assert!(!LinkStore::marker_path(dir.path()).exists());
        assert_eq!(config.get(Scope::Local, LINK_MIRROR_KEY, dir.path()), None);
    }

    #[test]
    fn test_clear_without_marker_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new();
        assert!(LinkStore::new(&config).clear(dir.path()).is_ok());
    }

    #[test]
    fn test_malformed_marker_is_no_link() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new();
        let links = LinkStore::new(&config);
        let marker = LinkStore::marker_path(dir.path());

        for body in ["not json", "{\"account\": 7}", "{\"account\": \"  \"}", "[]"] {
            std::fs::write(&marker, body).unwrap();
            assert_eq!(links.get(dir.path()), None, "marker body {body:?}");
        }
    }

    #[test]
    fn test_marker_wins_over_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new();
        config
            .set(Scope::Local, LINK_MIRROR_KEY, "personal", dir.path())
            .unwrap();
        let links = LinkStore::new(&config);
        assert_eq!(links.get(dir.path()), None);

        std::fs::write(LinkStore::marker_path(dir.path()), r#"{"account":"work"}"#).unwrap();
        assert_eq!(links.get(dir.path()).as_deref(), Some("work"));
    }

    #[test]
    fn test_mirror_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new();
        config.fail_writes_to(LINK_MIRROR_KEY);
        let err = LinkStore::new(&config).set(dir.path(), "work").unwrap_err();
        assert!(matches!(err, LinkError::Mirror(_)));
    }
}
