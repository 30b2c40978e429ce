//! Error types for the ghmulti core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! Stale references (a link or default naming a removed account) and
//! malformed persisted state never appear here: both are recovered by the
//! resolver and the stores and reported as warnings instead.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Account lifecycle errors
// ---------------------------------------------------------------------------

/// Errors from account lifecycle and identity operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// No account with this name exists.
    #[error("account '{0}' not found")]
    NotFound(String),

    /// An account with this name already exists.
    #[error("account '{0}' already exists")]
    AlreadyExists(String),

    /// Two options were given that cannot be combined.
    #[error("conflicting options: {0}")]
    ConflictingOptions(String),

    /// A field value was rejected.
    #[error("invalid value for '{field}': {detail}")]
    InvalidInput { field: String, detail: String },

    /// The operation needs a git work tree.
    #[error("'{0}' does not appear to be a git repository")]
    NotARepository(String),

    /// Neither a repository link nor a global default resolved to an account.
    #[error("no active account found; use `ghmulti use <name>` or `ghmulti link <name>`")]
    NoIdentity,

    #[error("account store error: {0}")]
    Store(#[from] StoreError),

    #[error("secret vault error: {0}")]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Git(#[from] GitError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from invoking git, either as a child process or through `git2`.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A captured git command exited with a non-zero status.
    #[error("{command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// An interactive git command (inherited stdio) exited unsuccessfully.
    #[error("{command} failed: {status}")]
    ProcessFailed { command: String, status: String },

    /// The path is not inside a git work tree.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    #[error("remote '{0}' already exists")]
    RemoteExists(String),

    #[error("remote '{0}' does not exist")]
    RemoteNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Identity synchronization errors
// ---------------------------------------------------------------------------

/// One synchronized field that could not be written or unset.
#[derive(Debug)]
pub struct FieldFailure {
    /// Human-readable field label, e.g. `signing key`.
    pub field: &'static str,
    /// Git config key, e.g. `user.signingkey`.
    pub key: &'static str,
    pub source: GitError,
}

impl std::fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sync of {} ({}) failed: {}", self.field, self.key, self.source)
    }
}

/// Errors from pushing an identity into a git config scope.
#[derive(Debug, Error)]
pub enum SyncError {
    /// At least one field failed; every attempted failure is listed.
    #[error("identity sync to {scope} config failed: {}", join_failures(.failures))]
    FieldsFailed {
        scope: String,
        failures: Vec<FieldFailure>,
    },
}

impl SyncError {
    pub fn failures(&self) -> &[FieldFailure] {
        match self {
            Self::FieldsFailed { failures, .. } => failures,
        }
    }
}

fn join_failures(failures: &[FieldFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

/// Errors writing the profile document or a repository marker.
///
/// Reads never fail: unreadable state degrades to empty.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize '{path}': {detail}")]
    Serialize { path: String, detail: String },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove '{path}': {source}")]
    Remove {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Repository link errors
// ---------------------------------------------------------------------------

/// Errors updating a repository link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The `.ghmulti` marker could not be written or removed.
    #[error("link marker update failed: {0}")]
    Marker(#[from] StoreError),

    /// The compatibility mirror in local git config could not be updated.
    #[error("link mirror update failed: {0}")]
    Mirror(#[from] GitError),
}

// ---------------------------------------------------------------------------
// Secret vault errors
// ---------------------------------------------------------------------------

/// Errors from the platform secret store.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("keyring error for '{key}': {detail}")]
    Backend { key: String, detail: String },
}

// ---------------------------------------------------------------------------
// Credential session errors
// ---------------------------------------------------------------------------

/// Errors creating the single-use askpass helper.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to create askpass helper: {0}")]
    HelperCreate(#[source] std::io::Error),

    #[error("failed to remove askpass helper: {0}")]
    HelperRemove(#[source] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from settings loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the settings file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = AccountError::NotFound("work".into());
        assert_eq!(err.to_string(), "account 'work' not found");

        let err = AccountError::AlreadyExists("work".into());
        assert_eq!(err.to_string(), "account 'work' already exists");

        let err = GitError::ProcessFailed {
            command: "git push".into(),
            status: "exit status: 1".into(),
        };
        assert!(err.to_string().starts_with("git push failed"));

        let err = ConfigError::InvalidValue {
            field: "github.host".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("github.host"));
    }

    #[test]
    fn test_sync_error_lists_every_field() {
        let err = SyncError::FieldsFailed {
            scope: "global".into(),
            failures: vec![
                FieldFailure {
                    field: "signing key",
                    key: "user.signingkey",
                    source: GitError::CommandFailed {
                        command: "git config --global user.signingkey".into(),
                        exit_code: 255,
                        stderr: "could not lock config file".into(),
                    },
                },
                FieldFailure {
                    field: "SSH command",
                    key: "core.sshCommand",
                    source: GitError::BinaryNotFound("git".into()),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("sync of signing key"));
        assert!(msg.contains("sync of SSH command"));
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = AccountError::NoIdentity.into();
        assert!(matches!(core_err, CoreError::Account(_)));

        let core_err: CoreError = GitError::RepositoryNotFound("/tmp/x".into()).into();
        assert!(matches!(core_err, CoreError::Git(_)));
    }
}
