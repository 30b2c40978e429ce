//! Data models shared across the ghmulti core library.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A named GitHub identity.
///
/// The token is not part of the record; it lives in the secret vault keyed
/// by `username`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique alias, e.g. `work` or `personal`.
    #[serde(default)]
    pub name: String,

    /// GitHub login; also the vault key for the token.
    #[serde(default)]
    pub username: String,

    /// GPG key id or SSH signing key written to `user.signingkey`.
    #[serde(
        default,
        rename = "gpg_key_id",
        alias = "signing_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub signing_key: Option<String>,

    /// Private key used for `core.sshCommand`; may start with `~`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            signing_key: None,
            ssh_key_path: None,
        }
    }

    pub fn with_signing_key(mut self, key: impl Into<String>) -> Self {
        self.signing_key = Some(key.into());
        self
    }

    pub fn with_ssh_key_path(mut self, path: impl Into<String>) -> Self {
        self.ssh_key_path = Some(path.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Persisted document
// ---------------------------------------------------------------------------

/// The user-scope document holding every profile plus the global default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub accounts: Vec<Profile>,

    /// Global default pointer, by profile name.
    #[serde(default)]
    pub active: Option<String>,
}

impl ProfileDocument {
    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.accounts.iter().find(|p| p.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.accounts.iter_mut().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The profile named by the default pointer, if it still exists.
    pub fn default_profile(&self) -> Option<&Profile> {
        self.active.as_deref().and_then(|name| self.find(name))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Which precedence level produced the effective identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    Linked,
    Global,
}

impl std::fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linked => write!(f, "linked"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// The effective profile for a working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIdentity {
    pub profile: Profile,
    pub source: IdentitySource,
}

// ---------------------------------------------------------------------------
// Config scopes
// ---------------------------------------------------------------------------

/// One of git's two identity-bearing configuration layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// `.git/config` of one repository.
    Local,
    /// The user's `~/.gitconfig`.
    Global,
}

impl Scope {
    /// The `git config` flag selecting this scope.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Local => "--local",
            Self::Global => "--global",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Global => write!(f, "global"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_json_uses_gpg_key_id() {
        let profile = Profile::new("work", "alice").with_signing_key("ABC123");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["gpg_key_id"], "ABC123");
        assert!(json.get("ssh_key_path").is_none());
    }

    #[test]
    fn test_profile_accepts_signing_key_alias() {
        let profile: Profile =
            serde_json::from_str(r#"{"name":"w","username":"u","signing_key":"K"}"#).unwrap();
        assert_eq!(profile.signing_key.as_deref(), Some("K"));
    }

    #[test]
    fn test_default_profile_ignores_dangling_pointer() {
        let doc = ProfileDocument {
            accounts: vec![Profile::new("work", "alice")],
            active: Some("gone".into()),
        };
        assert!(doc.default_profile().is_none());
    }

    #[test]
    fn test_scope_flags() {
        assert_eq!(Scope::Local.flag(), "--local");
        assert_eq!(Scope::Global.flag(), "--global");
        assert_eq!(IdentitySource::Linked.to_string(), "linked");
    }
}
