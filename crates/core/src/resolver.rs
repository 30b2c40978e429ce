//! Effective identity resolution.
//!
//! A valid repository link wins over the global default. A link or default
//! that names a profile no longer in the document is a stale reference: it
//! is reported as a warning and resolution moves on to the next level.

use std::path::Path;

use tracing::warn;

use crate::link::LinkStore;
use crate::models::{IdentitySource, ProfileDocument, ResolvedIdentity};

/// Outcome of one resolution, with any stale-reference warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: Option<ResolvedIdentity>,
    /// Linked name as read from the marker, even when stale.
    pub linked_name: Option<String>,
    pub warnings: Vec<String>,
}

impl Resolution {
    pub fn identity(&self) -> Option<&ResolvedIdentity> {
        self.resolved.as_ref()
    }
}

/// Resolve the identity for `repo` (the repository root, when inside one).
///
/// Never fails and never rewrites the link or the document.
pub fn resolve(doc: &ProfileDocument, links: &LinkStore<'_>, repo: Option<&Path>) -> Resolution {
    let mut resolution = Resolution::default();

    if let Some(repo) = repo {
        resolution.linked_name = links.get(repo);
    }

    if let Some(name) = resolution.linked_name.as_deref() {
        match doc.find(name) {
            Some(profile) => {
                resolution.resolved = Some(ResolvedIdentity {
                    profile: profile.clone(),
                    source: IdentitySource::Linked,
                });
                return resolution;
            }
            None => {
                let msg = format!(
                    "Linked account '{}' not found; falling back to the global default.",
                    name
                );
                warn!("{}", msg);
                resolution.warnings.push(msg);
            }
        }
    }

    if let Some(name) = doc.active.as_deref() {
        match doc.find(name) {
            Some(profile) => {
                resolution.resolved = Some(ResolvedIdentity {
                    profile: profile.clone(),
                    source: IdentitySource::Global,
                });
            }
            None => {
                let msg = format!("Global active account '{}' not found.", name);
                warn!("{}", msg);
                resolution.warnings.push(msg);
            }
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MemoryConfig;
    use crate::models::Profile;

    fn document(active: Option<&str>) -> ProfileDocument {
        ProfileDocument {
            accounts: vec![
                Profile::new("work", "alice"),
                Profile::new("personal", "alice-home"),
            ],
            active: active.map(str::to_string),
        }
    }

    #[test]
    fn test_link_wins_over_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new();
        let links = LinkStore::new(&config);
        links.set(dir.path(), "work").unwrap();

        let res = resolve(&document(Some("personal")), &links, Some(dir.path()));
        let id = res.identity().unwrap();
        assert_eq!(id.profile.name, "work");
        assert_eq!(id.source, IdentitySource::Linked);
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn test_stale_link_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new();
        let links = LinkStore::new(&config);
        links.set(dir.path(), "gone").unwrap();

        let res = resolve(&document(Some("personal")), &links, Some(dir.path()));
        let id = res.identity().unwrap();
        assert_eq!(id.profile.name, "personal");
        assert_eq!(id.source, IdentitySource::Global);
        assert_eq!(res.linked_name.as_deref(), Some("gone"));
        assert_eq!(res.warnings.len(), 1);
        assert!(res.warnings[0].contains("'gone'"));

        // The stale marker is left alone.
        assert_eq!(links.get(dir.path()).as_deref(), Some("gone"));
    }

    #[test]
    fn test_stale_link_and_no_default_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig::new();
        let links = LinkStore::new(&config);
        links.set(dir.path(), "gone").unwrap();

        let res = resolve(&document(None), &links, Some(dir.path()));
        assert!(res.resolved.is_none());
        assert_eq!(res.warnings.len(), 1);
    }

    #[test]
    fn test_stale_default_warns() {
        let config = MemoryConfig::new();
        let links = LinkStore::new(&config);
        let res = resolve(&document(Some("deleted")), &links, None);
        assert!(res.resolved.is_none());
        assert_eq!(res.warnings, vec!["Global active account 'deleted' not found.".to_string()]);
    }

    #[test]
    fn test_nothing_configured_is_none_without_warnings() {
        let config = MemoryConfig::new();
        let links = LinkStore::new(&config);
        let res = resolve(&ProfileDocument::default(), &links, None);
        assert_eq!(res, Resolution::default());
    }
}
