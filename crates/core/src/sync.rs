//! Pushing a profile into git's identity settings.
//!
//! Every synchronized field is either written or unset, so a field the
//! profile does not define never keeps a previous profile's value. All
//! fields are attempted even after a failure, and every failure is returned
//! together.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::errors::{FieldFailure, SyncError};
use crate::git::ScopedConfig;
use crate::models::{Profile, Scope};

pub const DEFAULT_HOST: &str = "github.com";

pub const KEY_USER_NAME: &str = "user.name";
pub const KEY_USER_EMAIL: &str = "user.email";
pub const KEY_SIGNING_KEY: &str = "user.signingkey";
pub const KEY_SSH_COMMAND: &str = "core.sshCommand";

/// `(label, key)` for each synchronized field, in write order.
pub const SYNCED_FIELDS: [(&str, &str); 4] = [
    ("user name", KEY_USER_NAME),
    ("user email", KEY_USER_EMAIL),
    ("signing key", KEY_SIGNING_KEY),
    ("SSH command", KEY_SSH_COMMAND),
];

/// The four git values a profile maps to; `None` means "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityValues {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub signing_key: Option<String>,
    pub ssh_command: Option<String>,
}

impl IdentityValues {
    fn by_key(&self, key: &str) -> Option<&str> {
        match key {
            KEY_USER_NAME => self.user_name.as_deref(),
            KEY_USER_EMAIL => self.user_email.as_deref(),
            KEY_SIGNING_KEY => self.signing_key.as_deref(),
            KEY_SSH_COMMAND => self.ssh_command.as_deref(),
            _ => None,
        }
    }

    /// Current values in one scope.
    pub fn read(config: &dyn ScopedConfig, scope: Scope, repo: &Path) -> Self {
        Self {
            user_name: config.get(scope, KEY_USER_NAME, repo),
            user_email: config.get(scope, KEY_USER_EMAIL, repo),
            signing_key: config.get(scope, KEY_SIGNING_KEY, repo),
            ssh_command: config.get(scope, KEY_SSH_COMMAND, repo),
        }
    }
}

/// Writes profiles into a [`ScopedConfig`].
#[derive(Debug, Clone)]
pub struct IdentitySync {
    host: String,
}

impl IdentitySync {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `{username}@users.noreply.{host}`.
    pub fn noreply_email(&self, username: &str) -> String {
        format!("{}@users.noreply.{}", username, self.host)
    }

    /// The values `apply` would write for `profile`.
    pub fn values_for(&self, profile: &Profile) -> IdentityValues {
        IdentityValues {
            user_name: Some(profile.username.clone()),
            user_email: Some(self.noreply_email(&profile.username)),
            signing_key: profile.signing_key.clone(),
            ssh_command: profile.ssh_key_path.as_deref().map(ssh_command_for),
        }
    }

    #[instrument(skip(self, config, profile), fields(account = %profile.name))]
    pub fn apply(
        &self,
        config: &dyn ScopedConfig,
        profile: &Profile,
        scope: Scope,
        repo: &Path,
    ) -> Result<(), SyncError> {
        let values = self.values_for(profile);
        write_fields(config, &values, scope, repo)?;
        info!(scope = %scope, account = %profile.name, "applied identity");
        Ok(())
    }

    /// Unset every synchronized field in `scope`.
    #[instrument(skip(self, config))]
    pub fn clear(&self, config: &dyn ScopedConfig, scope: Scope, repo: &Path) -> Result<(), SyncError> {
        write_fields(config, &IdentityValues::default(), scope, repo)?;
        info!(scope = %scope, "cleared identity");
        Ok(())
    }
}

impl Default for IdentitySync {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

fn write_fields(
    config: &dyn ScopedConfig,
    values: &IdentityValues,
    scope: Scope,
    repo: &Path,
) -> Result<(), SyncError> {
    let mut failures = Vec::new();

    for (field, key) in SYNCED_FIELDS {
        let result = match values.by_key(key) {
            Some(value) => {
                debug!(scope = %scope, key, "setting");
                config.set(scope, key, value, repo)
            }
            None => {
                debug!(scope = %scope, key, "unsetting");
                config.unset(scope, key, repo)
            }
        };
        if let Err(source) = result {
            warn!(scope = %scope, key, error = %source, "identity field sync failed");
            failures.push(FieldFailure { field, key, source });
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(SyncError::FieldsFailed {
            scope: scope.to_string(),
            failures,
        })
    }
}

/// `ssh -i <path>` with `~` expanded; quoted when the path has whitespace.
///
/// On Windows the path uses `/` separators; git runs the command through sh,
/// which would eat backslashes.
pub fn ssh_command_for(key_path: &str) -> String {
    let path = expand_tilde(key_path);
    let path = if cfg!(windows) {
        forward_slashes(&path)
    } else {
        path
    };
    if path.chars().any(char::is_whitespace) {
        format!("ssh -i \"{}\"", path)
    } else {
        format!("ssh -i {}", path)
    }
}

fn forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Expand a leading `~` or `~/` to the home directory.
pub fn expand_tilde(path: &str) -> String {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(""), Some(home)) => home.display().to_string(),
        (Some(rest), Some(home)) => home.join(rest).display().to_string(),
        _ => path.to_string(),
    }
}
