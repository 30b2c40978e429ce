//! Local repository inspection via `git2`.

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::{debug, info, instrument};

use crate::errors::GitError;
use crate::git::remote::redact_url;

/// Thin wrapper around a discovered `git2::Repository`.
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

impl GitRepo {
    /// Find the work tree containing `path`, searching parent directories.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::discover(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitError::RepositoryNotFound(path.display().to_string()))?;
        debug!(root = %root.display(), "discovered git work tree");
        Ok(Self { repo, root })
    }

    /// Whether `path` is inside a git work tree.
    pub fn is_work_tree<P: AsRef<Path>>(path: P) -> bool {
        Self::discover(path).is_ok()
    }

    /// Root of the work tree (where the link marker lives).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of all configured remotes.
    pub fn remote_names(&self) -> Result<Vec<String>, GitError> {
        let remotes = self.repo.remotes()?;
        Ok(remotes.iter().flatten().map(str::to_string).collect())
    }

    /// URL of a remote, or `None` when the remote does not exist.
    pub fn remote_url(&self, name: &str) -> Option<String> {
        self.repo
            .find_remote(name)
            .ok()
            .and_then(|r| r.url().map(str::to_string))
    }

    /// Every remote URL, for matching against a username.
    pub fn remote_urls(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .remote_names()?
            .iter()
            .filter_map(|name| self.remote_url(name))
            .collect())
    }

    #[instrument(skip(self, url))]
    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        if self.repo.find_remote(name).is_ok() {
            return Err(GitError::RemoteExists(name.to_string()));
        }
        self.repo.remote(name, url)?;
        info!(name, url = %redact_url(url), "added remote");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn remove_remote(&self, name: &str) -> Result<(), GitError> {
        if self.repo.find_remote(name).is_err() {
            return Err(GitError::RemoteNotFound(name.to_string()));
        }
        self.repo.remote_delete(name)?;
        info!(name, "removed remote");
        Ok(())
    }
}
