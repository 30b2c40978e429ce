//! Running git as a child process for network operations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::errors::GitError;
use crate::git::remote::redact_url;

/// One git command line plus the environment overlay to run it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInvocation {
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl GitInvocation {
    pub fn new<I, S>(cwd: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Arguments with URL credentials removed.
    pub fn redacted_args(&self) -> Vec<String> {
        self.args.iter().map(|a| redact_url(a)).collect()
    }

    /// `git <subcommand>`, used to label failures.
    pub fn label(&self) -> String {
        match self.args.first() {
            Some(sub) => format!("git {}", sub),
            None => "git".to_string(),
        }
    }
}

/// Executes git invocations.
pub trait GitRunner {
    fn run(&self, invocation: &GitInvocation) -> Result<(), GitError>;
}

/// Runs the real `git` binary with inherited stdio, blocking until exit.
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: String,
}

impl SystemGit {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRunner for SystemGit {
    fn run(&self, invocation: &GitInvocation) -> Result<(), GitError> {
        // Overlay keys only; values may be secrets.
        debug!(
            args = ?invocation.redacted_args(),
            cwd = %invocation.cwd.display(),
            env_keys = ?invocation.env.keys().collect::<Vec<_>>(),
            "running git"
        );

        let status = Command::new(&self.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(&invocation.env)
            .stdin(Stdio::inherit())
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GitError::BinaryNotFound(self.program.clone())
                } else {
                    GitError::IoError(e)
                }
            })?;

        if !status.success() {
            warn!(command = %invocation.label(), %status, "git command failed");
            return Err(GitError::ProcessFailed {
                command: invocation.label(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// `git --version` output, or the reason it could not be run.
pub fn git_version(cwd: &Path) -> Result<String, GitError> {
    let output = Command::new("git")
        .arg("--version")
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound("git".into())
            } else {
                GitError::IoError(e)
            }
        })?;
    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: "git --version".into(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
