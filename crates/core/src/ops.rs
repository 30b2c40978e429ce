//! Network operations run as the resolved identity.
//!
//! Each operation resolves an account, looks its token up, and runs git
//! through a [`GitRunner`] inside a [`crate::credential`] session. Staging
//! and committing happen before the session opens; they need no credentials.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::accounts::{repo_root, AccountManager};
use crate::credential::with_credentials;
use crate::errors::AccountError;
use crate::git::remote::{account_remote_name, choose_remote, clone_directory_name, redact_url};
use crate::git::{GitInvocation, GitRepo, GitRunner};
use crate::models::{IdentitySource, Profile};

pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub branch: String,
    /// When set, `git add .` and `git commit -m` run first.
    pub message: Option<String>,
    pub remote: Option<String>,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            branch: DEFAULT_BRANCH.to_string(),
            message: None,
            remote: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PullOptions {
    pub branch: String,
    pub remote: Option<String>,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            branch: DEFAULT_BRANCH.to_string(),
            remote: None,
        }
    }
}

/// What a push or pull ran against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub profile: Profile,
    pub source: IdentitySource,
    pub remote: String,
    /// The remote is the linked account's own `origin-<name>`.
    pub account_remote: bool,
    pub authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    pub directory: PathBuf,
    pub authenticated: bool,
    pub linked: Option<String>,
}

/// Pick the identity, remote and token for a network call in `cwd`.
pub fn plan_remote(
    mgr: &AccountManager,
    cwd: &Path,
    requested: Option<&str>,
) -> Result<(RemoteTarget, PathBuf, Option<String>), AccountError> {
    let root = repo_root(cwd)?;
    let resolution = mgr.resolve(&root);
    let identity = resolution.resolved.ok_or(AccountError::NoIdentity)?;

    let linked = match identity.source {
        IdentitySource::Linked => Some(identity.profile.name.as_str()),
        IdentitySource::Global => None,
    };
    let available = GitRepo::discover(&root)?.remote_names()?;
    let remote = choose_remote(linked, requested, &available);
    let account_remote = linked.is_some_and(|name| remote == account_remote_name(name));

    let token = mgr.token_for(&identity.profile)?;
    Ok((
        RemoteTarget {
            authenticated: token.is_some(),
            profile: identity.profile,
            source: identity.source,
            remote,
            account_remote,
        },
        root,
        token,
    ))
}

#[instrument(skip(mgr, runner, opts))]
pub fn push(
    mgr: &AccountManager,
    runner: &dyn GitRunner,
    cwd: &Path,
    opts: &PushOptions,
) -> Result<RemoteTarget, AccountError> {
    let (target, root, token) = plan_remote(mgr, cwd, opts.remote.as_deref())?;

    if let Some(message) = opts.message.as_deref() {
        runner.run(&GitInvocation::new(&root, ["add", "."]))?;
        runner.run(&GitInvocation::new(&root, ["commit", "-m", message]))?;
    }

    let args = ["push", target.remote.as_str(), opts.branch.as_str()];
    with_credentials(token.as_deref(), |env| {
        runner
            .run(&GitInvocation::new(&root, args).with_env(env))
            .map_err(AccountError::from)
    })?;

    info!(account = %target.profile.name, remote = %target.remote, branch = %opts.branch, "push complete");
    Ok(target)
}

#[instrument(skip(mgr, runner, opts))]
pub fn pull(
    mgr: &AccountManager,
    runner: &dyn GitRunner,
    cwd: &Path,
    opts: &PullOptions,
) -> Result<RemoteTarget, AccountError> {
    let (target, root, token) = plan_remote(mgr, cwd, opts.remote.as_deref())?;

    let args = ["pull", target.remote.as_str(), opts.branch.as_str()];
    with_credentials(token.as_deref(), |env| {
        runner
            .run(&GitInvocation::new(&root, args).with_env(env))
            .map_err(AccountError::from)
    })?;

    info!(account = %target.profile.name, remote = %target.remote, branch = %opts.branch, "pull complete");
    Ok(target)
}

/// Clone `url` into `cwd`, authenticating as `account` when given.
///
/// With `link_to`, the new work tree is linked to that account afterwards.
#[instrument(skip(mgr, runner, url), fields(repo_url = %redact_url(url)))]
pub fn clone(
    mgr: &AccountManager,
    runner: &dyn GitRunner,
    cwd: &Path,
    url: &str,
    account: Option<&str>,
    link_to: Option<&str>,
) -> Result<CloneOutcome, AccountError> {
    let doc = mgr.load();
    let token = match account {
        Some(name) => {
            let profile = doc
                .find(name)
                .ok_or_else(|| AccountError::NotFound(name.to_string()))?;
            mgr.token_for(profile)?
        }
        None => None,
    };

    with_credentials(token.as_deref(), |env| {
        runner
            .run(&GitInvocation::new(cwd, ["clone", url]).with_env(env))
            .map_err(AccountError::from)
    })?;

    let directory = cwd.join(clone_directory_name(url));
    let linked = match link_to {
        Some(name) => Some(mgr.link(name, &directory)?.profile.name),
        None => None,
    };

    info!(url = %redact_url(url), directory = %directory.display(), "clone complete");
    Ok(CloneOutcome {
        directory,
        authenticated: token.is_some(),
        linked,
    })
}

/// Add `origin-<account>` pointing at `url` in the repository containing `cwd`.
///
/// Returns the remote name.
#[instrument(skip(url))]
pub fn add_account_remote(cwd: &Path, account: &str, url: &str) -> Result<String, AccountError> {
    let (repo, name) = account_remote_target(cwd, account)?;
    if url.trim().is_empty() {
        return Err(AccountError::InvalidInput {
            field: "url".to_string(),
            detail: "must not be empty".to_string(),
        });
    }
    repo.add_remote(&name, url.trim())?;
    Ok(name)
}

/// Remove `origin-<account>` from the repository containing `cwd`.
#[instrument]
pub fn remove_account_remote(cwd: &Path, account: &str) -> Result<String, AccountError> {
    let (repo, name) = account_remote_target(cwd, account)?;
    repo.remove_remote(&name)?;
    Ok(name)
}

fn account_remote_target(cwd: &Path, account: &str) -> Result<(GitRepo, String), AccountError> {
    let account = account.trim();
    if account.is_empty() {
        return Err(AccountError::InvalidInput {
            field: "account".to_string(),
            detail: "must not be empty".to_string(),
        });
    }
    let root = repo_root(cwd)?;
    Ok((GitRepo::discover(&root)?, account_remote_name(account)))
}
