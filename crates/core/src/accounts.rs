//! Account lifecycle: add, rename, remove, update, switch default, link.
//!
//! [`AccountManager`] is the single writer of the profile document. Every
//! mutation that touches a name keeps the global default pointer and the
//! current repository's link pointing at something that exists.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::errors::AccountError;
use crate::git::{GitRepo, ScopedConfig};
use crate::link::LinkStore;
use crate::models::{Profile, ProfileDocument, Scope};
use crate::resolver::{self, Resolution};
use crate::store::{clean_optional, ProfileStore};
use crate::sync::IdentitySync;
use crate::vault::SecretVault;

/// Input for [`AccountManager::add`].
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub signing_key: Option<String>,
    pub ssh_key_path: Option<String>,
    pub token: Option<String>,
}

/// Field changes for [`AccountManager::update`].
///
/// `Some("")` for the signing key or SSH path clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub username: Option<String>,
    pub signing_key: Option<String>,
    pub ssh_key_path: Option<String>,
    pub token: Option<String>,
    pub clear_token: bool,
    pub set_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub default_repointed: bool,
    pub link_repointed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: Profile,
    /// Default after removal, when the removed profile was the default.
    pub new_default: Option<String>,
    pub default_changed: bool,
    pub unlinked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub profile: Profile,
    pub repo_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlinkOutcome {
    pub previously_linked_account: Option<String>,
    pub unlinked: bool,
    pub reset_local_git: bool,
}

/// One row of `ghmulti list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub name: String,
    pub username: String,
    pub signing_key: Option<String>,
    pub ssh_key_path: Option<String>,
    pub default: bool,
    pub linked: bool,
}

/// Root of the work tree containing `path`.
pub fn repo_root(path: &Path) -> Result<PathBuf, AccountError> {
    GitRepo::discover(path)
        .map(|repo| repo.root().to_path_buf())
        .map_err(|_| AccountError::NotARepository(path.display().to_string()))
}

/// Owns the stores and applies lifecycle operations.
pub struct AccountManager {
    store: ProfileStore,
    vault: Box<dyn SecretVault>,
    config: Box<dyn ScopedConfig>,
    sync: IdentitySync,
}

impl AccountManager {
    pub fn new(
        store: ProfileStore,
        vault: Box<dyn SecretVault>,
        config: Box<dyn ScopedConfig>,
        sync: IdentitySync,
    ) -> Self {
        Self {
            store,
            vault,
            config,
            sync,
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn vault(&self) -> &dyn SecretVault {
        self.vault.as_ref()
    }

    pub fn config(&self) -> &dyn ScopedConfig {
        self.config.as_ref()
    }

    pub fn sync(&self) -> &IdentitySync {
        &self.sync
    }

    pub fn links(&self) -> LinkStore<'_> {
        LinkStore::new(self.config.as_ref())
    }

    pub fn load(&self) -> ProfileDocument {
        self.store.load()
    }

    /// Resolve the identity for `cwd`, using the repository root when inside one.
    pub fn resolve(&self, cwd: &Path) -> Resolution {
        let doc = self.store.load();
        let root = repo_root(cwd).ok();
        resolver::resolve(&doc, &self.links(), root.as_deref())
    }

    /// Token stored for `profile`, if any.
    pub fn token_for(&self, profile: &Profile) -> Result<Option<String>, AccountError> {
        Ok(self.vault.get(&profile.username)?)
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn add(&self, new: NewAccount) -> Result<Profile, AccountError> {
        let name = new.name.trim().to_string();
        let username = new.username.trim().to_string();
        if name.is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        if username.is_empty() {
            return Err(invalid("username", "must not be empty"));
        }

        let mut doc = self.store.load();
        if doc.contains(&name) {
            return Err(AccountError::AlreadyExists(name));
        }

        let profile = Profile {
            name,
            username,
            signing_key: clean_optional(new.signing_key),
            ssh_key_path: clean_optional(new.ssh_key_path),
        };
        doc.accounts.push(profile.clone());
        self.store.save(&doc)?;

        if let Some(token) = clean_optional(new.token) {
            self.vault.set(&profile.username, &token)?;
        }
        info!(name = %profile.name, username = %profile.username, "added account");
        Ok(profile)
    }

    /// Rename `old` to `new`, repointing the default and the link in `repo`.
    #[instrument(skip(self))]
    pub fn rename(
        &self,
        old: &str,
        new: &str,
        repo: Option<&Path>,
    ) -> Result<RenameOutcome, AccountError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(invalid("new name", "must not be empty"));
        }
        if old == new {
            return Err(invalid("new name", "old and new account names are the same"));
        }

        let mut doc = self.store.load();
        if !doc.contains(old) {
            return Err(AccountError::NotFound(old.to_string()));
        }
        if doc.contains(new) {
            return Err(AccountError::AlreadyExists(new.to_string()));
        }

        if let Some(profile) = doc.find_mut(old) {
            profile.name = new.to_string();
        }
        let default_repointed = doc.active.as_deref() == Some(old);
        if default_repointed {
            doc.active = Some(new.to_string());
        }
        self.store.save(&doc)?;

        let mut link_repointed = false;
        if let Some(root) = repo.and_then(|r| repo_root(r).ok()) {
            let links = self.links();
            if links.get(&root).as_deref() == Some(old) {
                links.set(&root, new)?;
                link_repointed = true;
            }
        }

        info!(old, new, default_repointed, link_repointed, "renamed account");
        Ok(RenameOutcome {
            default_repointed,
            link_repointed,
        })
    }

    /// Delete `name`, its token, and any default or link pointing at it.
    #[instrument(skip(self))]
    pub fn remove(&self, name: &str, repo: Option<&Path>) -> Result<RemoveOutcome, AccountError> {
        let mut doc = self.store.load();
        let index = doc
            .accounts
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| AccountError::NotFound(name.to_string()))?;
        let removed = doc.accounts.remove(index);

        let default_changed = doc.active.as_deref() == Some(name);
        if default_changed {
            doc.active = doc.accounts.first().map(|p| p.name.clone());
        }
        self.store.save(&doc)?;
        self.vault.delete(&removed.username)?;

        let mut unlinked = false;
        if let Some(root) = repo.and_then(|r| repo_root(r).ok()) {
            let links = self.links();
            if links.get(&root).as_deref() == Some(name) {
                links.clear(&root)?;
                unlinked = true;
            }
        }

        info!(name, default_changed, unlinked, "removed account");
        Ok(RemoveOutcome {
            removed,
            new_default: if default_changed { doc.active } else { None },
            default_changed,
            unlinked,
        })
    }

    /// Apply `req` to `name`; returns whether anything changed.
    #[instrument(skip(self, req))]
    pub fn update(&self, name: &str, req: UpdateRequest) -> Result<bool, AccountError> {
        let new_token = req.token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if new_token.is_some() && req.clear_token {
            return Err(AccountError::ConflictingOptions(
                "use either --token or --clear-token, not both".to_string(),
            ));
        }

        let mut doc = self.store.load();
        let Some(profile) = doc.find_mut(name) else {
            return Err(AccountError::NotFound(name.to_string()));
        };

        let old_username = profile.username.clone();
        let mut changed = false;

        if let Some(username) = req.username.as_deref() {
            let username = username.trim();
            if username.is_empty() {
                return Err(invalid("username", "must not be empty"));
            }
            profile.username = username.to_string();
            changed = true;
        }
        if let Some(key) = req.signing_key {
            profile.signing_key = clean_optional(Some(key));
            changed = true;
        }
        if let Some(path) = req.ssh_key_path {
            profile.ssh_key_path = clean_optional(Some(path));
            changed = true;
        }
        let new_username = profile.username.clone();
        let updated = profile.clone();

        if req.set_active {
            doc.active = Some(name.to_string());
            changed = true;
        }
        if new_token.is_some() || req.clear_token {
            changed = true;
        }
        if !changed {
            debug!(name, "no changes requested");
            return Ok(false);
        }

        self.store.save(&doc)?;

        if old_username != new_username {
            if new_token.is_none() && !req.clear_token {
                if let Some(token) = self.vault.get(&old_username)? {
                    self.vault.set(&new_username, &token)?;
                    debug!(from = %old_username, to = %new_username, "migrated token");
                }
            }
            self.vault.delete(&old_username)?;
        }
        if let Some(token) = new_token {
            self.vault.set(&new_username, token)?;
        }
        if req.clear_token {
            self.vault.delete(&new_username)?;
        }

        if req.set_active {
            self.sync
                .apply(self.config.as_ref(), &updated, Scope::Global, Path::new("."))?;
        }

        info!(name, "updated account");
        Ok(true)
    }

    /// Make `name` the global default and apply it to the global scope.
    #[instrument(skip(self))]
    pub fn switch_default(&self, name: &str) -> Result<Profile, AccountError> {
        let mut doc = self.store.load();
        let profile = doc
            .find(name)
            .cloned()
            .ok_or_else(|| AccountError::NotFound(name.to_string()))?;
        doc.active = Some(profile.name.clone());
        self.store.save(&doc)?;

        self.sync
            .apply(self.config.as_ref(), &profile, Scope::Global, Path::new("."))?;
        info!(name, "switched global default");
        Ok(profile)
    }

    /// Link the repository containing `repo` to `name` and apply it locally.
    #[instrument(skip(self))]
    pub fn link(&self, name: &str, repo: &Path) -> Result<LinkOutcome, AccountError> {
        let doc = self.store.load();
        let profile = doc
            .find(name)
            .cloned()
            .ok_or_else(|| AccountError::NotFound(name.to_string()))?;
        let root = repo_root(repo)?;

        self.links().set(&root, &profile.name)?;
        self.sync
            .apply(self.config.as_ref(), &profile, Scope::Local, &root)?;
        Ok(LinkOutcome {
            profile,
            repo_root: root,
        })
    }

    /// Remove the link; with `reset_local` also unset the local identity.
    #[instrument(skip(self))]
    pub fn unlink(&self, repo: &Path, reset_local: bool) -> Result<UnlinkOutcome, AccountError> {
        let root = repo_root(repo)?;
        let links = self.links();
        let previous = links.get(&root);
        links.clear(&root)?;

        if reset_local {
            self.sync.clear(self.config.as_ref(), Scope::Local, &root)?;
        }
        if previous.is_none() {
            warn!(repo = %root.display(), "repository was not linked");
        }
        Ok(UnlinkOutcome {
            previously_linked_account: previous,
            unlinked: true,
            reset_local_git: reset_local,
        })
    }

    /// Every profile, with default and linked-here flags.
    pub fn list(&self, cwd: Option<&Path>) -> Vec<AccountSummary> {
        let doc = self.store.load();
        let linked = cwd
            .and_then(|c| repo_root(c).ok())
            .and_then(|root| self.links().get(&root));
        doc.accounts
            .iter()
            .map(|p| AccountSummary {
                name: p.name.clone(),
                username: p.username.clone(),
                signing_key: p.signing_key.clone(),
                ssh_key_path: p.ssh_key_path.clone(),
                default: doc.active.as_deref() == Some(p.name.as_str()),
                linked: linked.as_deref() == Some(p.name.as_str()),
            })
            .collect()
    }
}

fn invalid(field: &str, detail: &str) -> AccountError {
    AccountError::InvalidInput {
        field: field.to_string(),
        detail: detail.to_string(),
    }
}
