//! JSON-backed profile store.
//!
//! The document format:
//!
//! ```json
//! {
//!   "accounts": [
//!     { "name": "work", "username": "alice", "gpg_key_id": "ABC123" },
//!     { "name": "personal", "username": "alice-home", "ssh_key_path": "~/.ssh/id_home" }
//!   ],
//!   "active": "work"
//! }
//! ```
//!
//! Loading never fails: a missing or malformed document degrades to the
//! empty default. Normalization happens in memory only; the file is not
//! rewritten until an explicit [`ProfileStore::save`].

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::StoreError;
use crate::models::{Profile, ProfileDocument};

/// Reads and writes the profile document at a fixed path.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and normalize the document.
    pub fn load(&self) -> ProfileDocument {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "profile document not found, using empty default");
                return ProfileDocument::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "profile document unreadable, using empty default");
                return ProfileDocument::default();
            }
        };

        if contents.trim().is_empty() {
            return ProfileDocument::default();
        }

        match parse_document(&contents) {
            Ok((doc, mut warnings)) => {
                let (doc, dropped) = normalize(doc);
                warnings.extend(dropped);
                for w in &warnings {
                    warn!(path = %self.path.display(), "{}", w);
                }
                debug!(count = doc.accounts.len(), "loaded profile document");
                doc
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "profile document malformed, using empty default");
                ProfileDocument::default()
            }
        }
    }

    /// Write the document wholesale, replacing the file atomically.
    pub fn save(&self, doc: &ProfileDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc).map_err(|e| StoreError::Serialize {
            path: self.path.display().to_string(),
            detail: e.to_string(),
        })?;

        let write_err = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        info!(path = %self.path.display(), count = doc.accounts.len(), "saved profile document");
        Ok(())
    }
}

/// Parse the document one account entry at a time.
///
/// An entry that does not deserialize as a profile is dropped with a
/// warning; the rest of the document survives. Only JSON that is not an
/// object at all is an error.
fn parse_document(contents: &str) -> Result<(ProfileDocument, Vec<String>), serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    let mut warnings = Vec::new();

    let Some(root) = value.as_object() else {
        warnings.push("profile document is not a JSON object".to_string());
        return Ok((ProfileDocument::default(), warnings));
    };

    let mut accounts = Vec::new();
    match root.get("accounts") {
        Some(serde_json::Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                match serde_json::from_value::<Profile>(entry.clone()) {
                    Ok(profile) => accounts.push(profile),
                    Err(e) => warnings.push(format!(
                        "dropping account entry {}: {}",
                        index, e
                    )),
                }
            }
        }
        Some(serde_json::Value::Null) | None => {}
        Some(_) => warnings.push("'accounts' is not a list; ignoring it".to_string()),
    }

    let active = match root.get("active") {
        Some(serde_json::Value::String(name)) => Some(name.clone()),
        Some(serde_json::Value::Null) | None => None,
        Some(_) => {
            warnings.push("'active' is not a string; ignoring it".to_string());
            None
        }
    };

    Ok((ProfileDocument { accounts, active }, warnings))
}

/// Trim fields, drop unusable entries and duplicate names.
///
/// Returns the cleaned document and a warning per dropped entry. A default
/// pointer naming nothing is left in place for the resolver to report.
pub fn normalize(doc: ProfileDocument) -> (ProfileDocument, Vec<String>) {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut accounts = Vec::with_capacity(doc.accounts.len());

    for raw in doc.accounts {
        let profile = Profile {
            name: raw.name.trim().to_string(),
            username: raw.username.trim().to_string(),
            signing_key: clean_optional(raw.signing_key),
            ssh_key_path: clean_optional(raw.ssh_key_path),
        };

        if profile.name.is_empty() {
            warnings.push("dropping account entry with an empty name".to_string());
            continue;
        }
        if profile.username.is_empty() {
            warnings.push(format!(
                "dropping account '{}': username is empty",
                profile.name
            ));
            continue;
        }
        if !seen.insert(profile.name.clone()) {
            warnings.push(format!(
                "dropping duplicate account '{}' (first entry wins)",
                profile.name
            ));
            continue;
        }
        accounts.push(profile);
    }

    let active = clean_optional(doc.active);
    (ProfileDocument { accounts, active }, warnings)
}

/// Trim an optional string, mapping blank to `None`.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
