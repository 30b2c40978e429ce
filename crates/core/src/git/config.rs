//! Scoped access to git's configuration store.
//!
//! [`ScopedConfig`] is the narrow `get/set/unset(scope, key)` contract the
//! rest of the crate programs against. [`GitConfigCli`] implements it by
//! running `git config`; [`MemoryConfig`] keeps values in process memory.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, warn};

use crate::errors::GitError;
use crate::models::Scope;

/// Exit status `git config --unset` uses when the key is not present.
const GIT_CONFIG_KEY_ABSENT: i32 = 5;

/// Key/value access to one of git's configuration scopes.
///
/// `repo` selects the repository for [`Scope::Local`] and is ignored for
/// [`Scope::Global`].
pub trait ScopedConfig {
    /// Read a value; unset keys and read failures are both `None`.
    fn get(&self, scope: Scope, key: &str, repo: &Path) -> Option<String>;

    /// Replace every value of `key` with `value`.
    fn set(&self, scope: Scope, key: &str, value: &str, repo: &Path) -> Result<(), GitError>;

    /// Remove every value of `key`; an already-absent key is not an error.
    fn unset(&self, scope: Scope, key: &str, repo: &Path) -> Result<(), GitError>;
}

// ---------------------------------------------------------------------------
// git CLI
// ---------------------------------------------------------------------------

/// [`ScopedConfig`] backed by the `git config` command.
#[derive(Debug, Clone)]
pub struct GitConfigCli {
    program: String,
    global_file: Option<PathBuf>,
}

impl GitConfigCli {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
            global_file: None,
        }
    }

    /// Redirect the global scope to an explicit file instead of `~/.gitconfig`.
    pub fn with_global_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_file = Some(path.into());
        self
    }

    fn scope_args(&self, scope: Scope) -> Vec<String> {
        match (scope, &self.global_file) {
            (Scope::Global, Some(file)) => {
                vec!["--file".to_string(), file.to_string_lossy().to_string()]
            }
            _ => vec![scope.flag().to_string()],
        }
    }

    fn run_git_config(&self, scope: Scope, repo: &Path, args: &[&str]) -> Result<Output, GitError> {
        let mut cmd = Command::new(&self.program);
        if scope == Scope::Local {
            cmd.current_dir(repo);
        }
        cmd.arg("config")
            .args(self.scope_args(scope))
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(scope = %scope, args = ?args, "running git config");
        cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound(self.program.clone())
            } else {
                GitError::IoError(e)
            }
        })
    }

    fn describe(&self, scope: Scope, args: &[&str]) -> String {
        format!("git config {} {}", scope.flag(), args.join(" "))
    }
}

impl Default for GitConfigCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopedConfig for GitConfigCli {
    fn get(&self, scope: Scope, key: &str, repo: &Path) -> Option<String> {
        match self.run_git_config(scope, repo, &["--get", key]) {
            Ok(output) if output.status.success() => {
                let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (!value.is_empty()).then_some(value)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(scope = %scope, key, error = %e, "git config read failed");
                None
            }
        }
    }

    fn set(&self, scope: Scope, key: &str, value: &str, repo: &Path) -> Result<(), GitError> {
        let output = self.run_git_config(scope, repo, &["--replace-all", key, value])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(scope = %scope, key, exit_code, %stderr, "git config write failed");
            return Err(GitError::CommandFailed {
                command: self.describe(scope, &["--replace-all", key]),
                exit_code,
                stderr,
            });
        }
        Ok(())
    }

    fn unset(&self, scope: Scope, key: &str, repo: &Path) -> Result<(), GitError> {
        let output = self.run_git_config(scope, repo, &["--unset-all", key])?;
        match output.status.code() {
            Some(0) | Some(GIT_CONFIG_KEY_ABSENT) => Ok(()),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let exit_code = code.unwrap_or(-1);
                warn!(scope = %scope, key, exit_code, %stderr, "git config unset failed");
                Err(GitError::CommandFailed {
                    command: self.describe(scope, &["--unset-all", key]),
                    exit_code,
                    stderr,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

type ConfigKey = (Scope, Option<PathBuf>, String);

/// [`ScopedConfig`] held in memory, with optional write-failure injection.
#[derive(Debug, Default)]
pub struct MemoryConfig {
    values: RefCell<BTreeMap<ConfigKey, String>>,
    failing_keys: RefCell<HashSet<String>>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `set`/`unset` of `key` fail.
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.borrow_mut().insert(key.to_string());
    }

    /// All values in one scope, sorted by key.
    pub fn snapshot(&self, scope: Scope, repo: &Path) -> BTreeMap<String, String> {
        let location = Self::location(scope, repo);
        self.values
            .borrow()
            .iter()
            .filter(|((s, loc, _), _)| *s == scope && *loc == location)
            .map(|((_, _, k), v)| (k.clone(), v.clone()))
            .collect()
    }

    fn location(scope: Scope, repo: &Path) -> Option<PathBuf> {
        match scope {
            Scope::Local => Some(repo.to_path_buf()),
            Scope::Global => None,
        }
    }

    fn check_writable(&self, scope: Scope, key: &str) -> Result<(), GitError> {
        if self.failing_keys.borrow().contains(key) {
            return Err(GitError::CommandFailed {
                command: format!("git config {} {}", scope.flag(), key),
                exit_code: 255,
                stderr: "error: could not lock config file".to_string(),
            });
        }
        Ok(())
    }
}

impl ScopedConfig for MemoryConfig {
    fn get(&self, scope: Scope, key: &str, repo: &Path) -> Option<String> {
        self.values
            .borrow()
            .get(&(scope, Self::location(scope, repo), key.to_string()))
            .cloned()
    }

    fn set(&self, scope: Scope, key: &str, value: &str, repo: &Path) -> Result<(), GitError> {
        self.check_writable(scope, key)?;
        self.values.borrow_mut().insert(
            (scope, Self::location(scope, repo), key.to_string()),
            value.to_string(),
        );
        Ok(())
    }

    fn unset(&self, scope: Scope, key: &str, repo: &Path) -> Result<(), GitError> {
        self.check_writable(scope, key)?;
        self.values
            .borrow_mut()
            .remove(&(scope, Self::location(scope, repo), key.to_string()));
        Ok(())
    }
}
