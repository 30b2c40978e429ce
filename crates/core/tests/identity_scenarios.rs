//! End-to-end identity scenarios.
//!
//! These tests drive `AccountManager` the way the CLI does, with:
//! - Real git work trees created through `git2`
//! - A real profile document on disk (temp directory)
//! - In-memory vault and config scopes, or the `git config` binary with a
//!   redirected global file where noted
//!
//! Tests that need the `git` binary skip gracefully when it is missing.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use ghmulti_core::accounts::{AccountManager, NewAccount};
use ghmulti_core::git::{GitConfigCli, MemoryConfig, ScopedConfig};
use ghmulti_core::link::{LinkStore, LINK_MIRROR_KEY};
use ghmulti_core::models::{IdentitySource, Profile, Scope};
use ghmulti_core::store::ProfileStore;
use ghmulti_core::sync::IdentitySync;
use ghmulti_core::vault::MemoryVault;

// ===========================================================================
// Helpers
// ===========================================================================

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

struct Env {
    home: TempDir,
    repo: TempDir,
    other_repo: TempDir,
    mgr: AccountManager,
}

impl Env {
    fn new() -> Self {
        Self::with_config(Box::new(MemoryConfig::new()))
    }

    fn with_config(config: Box<dyn ScopedConfig>) -> Self {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let other_repo = TempDir::new().unwrap();
        git2::Repository::init(repo.path()).unwrap();
        git2::Repository::init(other_repo.path()).unwrap();

        let mgr = AccountManager::new(
            ProfileStore::new(home.path().join(".ghmulti.json")),
            Box::new(MemoryVault::new()),
            config,
            IdentitySync::default(),
        );
        Self {
            home,
            repo,
            other_repo,
            mgr,
        }
    }

    fn add(&self, name: &str, username: &str, token: Option<&str>) {
        self.mgr
            .add(NewAccount {
                name: name.into(),
                username: username.into(),
                token: token.map(str::to_string),
                ..Default::default()
            })
            .unwrap();
    }

    fn repo(&self) -> &Path {
        self.repo.path()
    }

    fn resolved(&self, dir: &Path) -> Option<(String, IdentitySource)> {
        self.mgr
            .resolve(dir)
            .resolved
            .map(|id| (id.profile.name, id.source))
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

#[test]
fn test_nothing_resolves_until_default_is_set() {
    let env = Env::new();
    env.add("work", "alice", Some("T1"));

    assert_eq!(env.resolved(env.repo()), None);

    env.mgr.switch_default("work").unwrap();
    assert_eq!(
        env.resolved(env.repo()),
        Some(("work".to_string(), IdentitySource::Global))
    );
}

#[test]
fn test_link_beats_default_only_in_its_repository() {
    let env = Env::new();
    env.add("work", "alice", None);
    env.add("personal", "alice-home", None);
    env.mgr.switch_default("personal").unwrap();

    env.mgr.link("work", env.repo()).unwrap();

    assert_eq!(
        env.resolved(env.repo()),
        Some(("work".to_string(), IdentitySource::Linked))
    );
    assert_eq!(
        env.resolved(env.other_repo.path()),
        Some(("personal".to_string(), IdentitySource::Global))
    );
}

#[test]
fn test_link_from_subdirectory_lands_at_root() {
    let env = Env::new();
    env.add("work", "alice", None);
    let nested = env.repo().join("src").join("deep");
    std::fs::create_dir_all(&nested).unwrap();

    let outcome = env.mgr.link("work", &nested).unwrap();
    assert!(LinkStore::marker_path(&outcome.repo_root).exists());
    assert_eq!(
        env.resolved(&nested),
        Some(("work".to_string(), IdentitySource::Linked))
    );
}

#[test]
fn test_hand_edited_stale_link_falls_back() {
    let env = Env::new();
    env.add("personal", "alice-home", None);
    env.mgr.switch_default("personal").unwrap();
    std::fs::write(env.repo().join(".ghmulti"), r#"{"account": "deleted"}"#).unwrap();

    let resolution = env.mgr.resolve(env.repo());
    let id = resolution.resolved.unwrap();
    assert_eq!(id.profile.name, "personal");
    assert_eq!(id.source, IdentitySource::Global);
    assert_eq!(resolution.warnings.len(), 1);
}

#[test]
fn test_corrupt_document_is_empty_and_left_alone() {
    let env = Env::new();
    let path = env.home.path().join(".ghmulti.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(env.mgr.load().accounts.is_empty());
    assert_eq!(env.resolved(env.repo()), None);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

// ===========================================================================
// Lifecycle consistency
// ===========================================================================

#[test]
fn test_rename_linked_default_updates_both_pointers() {
    let env = Env::new();
    env.add("work", "alice", None);
    env.mgr.switch_default("work").unwrap();
    env.mgr.link("work", env.repo()).unwrap();

    let outcome = env.mgr.rename("work", "job", Some(env.repo())).unwrap();
    assert!(outcome.default_repointed);
    assert!(outcome.link_repointed);

    let doc = env.mgr.load();
    assert!(!doc.contains("work"));
    assert_eq!(doc.active.as_deref(), Some("job"));
    assert_eq!(
        env.resolved(env.repo()),
        Some(("job".to_string(), IdentitySource::Linked))
    );
    assert_eq!(
        env.mgr
            .config()
            .get(Scope::Local, LINK_MIRROR_KEY, env.repo())
            .as_deref(),
        Some("job")
    );
}

#[test]
fn test_remove_linked_default_clears_link_and_reassigns() {
    let env = Env::new();
    env.add("work", "alice", Some("T1"));
    env.add("personal", "alice-home", None);
    env.mgr.switch_default("work").unwrap();
    env.mgr.link("work", env.repo()).unwrap();

    let outcome = env.mgr.remove("work", Some(env.repo())).unwrap();
    assert!(outcome.unlinked);
    assert_eq!(outcome.new_default.as_deref(), Some("personal"));

    assert!(!LinkStore::marker_path(env.repo()).exists());
    assert_eq!(env.mgr.vault().get("alice").unwrap(), None);
    assert_eq!(
        env.resolved(env.repo()),
        Some(("personal".to_string(), IdentitySource::Global))
    );
}

#[test]
fn test_remove_last_account_unsets_default() {
    let env = Env::new();
    env.add("work", "alice", None);
    env.mgr.switch_default("work").unwrap();

    let outcome = env.mgr.remove("work", None).unwrap();
    assert_eq!(outcome.new_default, None);
    assert_eq!(env.resolved(env.repo()), None);
}

#[test]
fn test_unlink_with_reset_clears_local_identity() {
    let env = Env::new();
    env.add("work", "alice", None);
    env.mgr.link("work", env.repo()).unwrap();
    assert_eq!(
        env.mgr
            .config()
            .get(Scope::Local, "user.name", env.repo())
            .as_deref(),
        Some("alice")
    );

    let outcome = env.mgr.unlink(env.repo(), true).unwrap();
    assert_eq!(outcome.previously_linked_account.as_deref(), Some("work"));
    assert!(outcome.reset_local_git);
    assert_eq!(env.mgr.config().get(Scope::Local, "user.name", env.repo()), None);

    let again = env.mgr.unlink(env.repo(), false).unwrap();
    assert_eq!(again.previously_linked_account, None);
}

// ===========================================================================
// Synchronization against real git
// ===========================================================================

#[test]
fn test_switching_profiles_clears_signing_key_in_git() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let scratch = TempDir::new().unwrap();
    let global_file: PathBuf = scratch.path().join("gitconfig");
    let env = Env::with_config(Box::new(GitConfigCli::new().with_global_file(&global_file)));

    env.mgr
        .add(NewAccount {
            name: "signed".into(),
            username: "alice".into(),
            signing_key: Some("ABC123".into()),
            ssh_key_path: Some("/keys/id_alice".into()),
            token: None,
        })
        .unwrap();
    env.add("plain", "bob", None);

    env.mgr.switch_default("signed").unwrap();
    let config = env.mgr.config();
    let home = env.home.path();
    assert_eq!(config.get(Scope::Global, "user.signingkey", home).as_deref(), Some("ABC123"));
    assert_eq!(
        config.get(Scope::Global, "core.sshCommand", home).as_deref(),
        Some("ssh -i /keys/id_alice")
    );

    env.mgr.switch_default("plain").unwrap();
    assert_eq!(config.get(Scope::Global, "user.signingkey", home), None);
    assert_eq!(config.get(Scope::Global, "core.sshCommand", home), None);
    assert_eq!(
        config.get(Scope::Global, "user.email", home).as_deref(),
        Some("bob@users.noreply.github.com")
    );
}

#[test]
fn test_link_writes_local_config_in_real_repository() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let scratch = TempDir::new().unwrap();
    let env = Env::with_config(Box::new(
        GitConfigCli::new().with_global_file(scratch.path().join("gitconfig")),
    ));
    env.add("work", "alice", None);

    env.mgr.link("work", env.repo()).unwrap();

    let repo = git2::Repository::open(env.repo()).unwrap();
    let local = repo.config().unwrap().open_level(git2::ConfigLevel::Local).unwrap();
    assert_eq!(local.get_string("user.name").unwrap(), "alice");
    assert_eq!(local.get_string(LINK_MIRROR_KEY).unwrap(), "work");
}

#[test]
fn test_apply_is_idempotent_through_the_trait() {
    let config = MemoryConfig::new();
    let sync = IdentitySync::default();
    let profile = Profile::new("work", "alice").with_signing_key("ABC123");
    let repo = Path::new("/repo");

    sync.apply(&config, &profile, Scope::Local, repo).unwrap();
    let first = config.snapshot(Scope::Local, repo);
    sync.apply(&config, &profile, Scope::Local, repo).unwrap();
    assert_eq!(config.snapshot(Scope::Local, repo), first);
}
