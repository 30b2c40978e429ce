//! Transient credentials for a single git invocation.
//!
//! A [`CredentialSession`] owns a throwaway `GIT_ASKPASS` helper whose only
//! job is to print `$GHMULTI_GIT_PASSWORD`. The secret travels to git in the
//! child's environment, never on a command line, and the helper file itself
//! holds no secret bytes. The helper is deleted when the session is dropped,
//! so it cannot outlive the invocation on any exit path, unwinding included.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::errors::CredentialError;

pub const ASKPASS_ENV: &str = "GIT_ASKPASS";
pub const SECRET_ENV: &str = "GHMULTI_GIT_PASSWORD";
pub const TERMINAL_PROMPT_ENV: &str = "GIT_TERMINAL_PROMPT";

#[cfg(windows)]
const HELPER_SUFFIX: &str = ".cmd";
#[cfg(not(windows))]
const HELPER_SUFFIX: &str = ".sh";

#[cfg(windows)]
fn helper_script() -> String {
    format!("@echo off\r\necho %{}%\r\n", SECRET_ENV)
}

#[cfg(not(windows))]
fn helper_script() -> String {
    format!("#!/bin/sh\nprintf '%s\\n' \"${}\"\n", SECRET_ENV)
}

/// Environment overlay plus the helper backing it.
pub struct CredentialSession {
    helper: Option<TempPath>,
    env: BTreeMap<String, String>,
}

impl CredentialSession {
    /// Without a secret (or with an empty one) the overlay is empty.
    pub fn open(secret: Option<&str>) -> Result<Self, CredentialError> {
        let Some(secret) = secret.filter(|s| !s.is_empty()) else {
            return Ok(Self {
                helper: None,
                env: BTreeMap::new(),
            });
        };

        let helper = create_helper()?;
        let mut env = BTreeMap::new();
        env.insert(ASKPASS_ENV.to_string(), helper.display().to_string());
        env.insert(SECRET_ENV.to_string(), secret.to_string());
        env.insert(TERMINAL_PROMPT_ENV.to_string(), "0".to_string());
        debug!(helper = %helper.display(), "opened credential session");

        Ok(Self {
            helper: Some(helper),
            env,
        })
    }

    /// Variables to add to the child's inherited environment.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn helper_path(&self) -> Option<&Path> {
        self.helper.as_deref()
    }

    pub fn has_secret(&self) -> bool {
        self.helper.is_some()
    }

    /// Delete the helper now, reporting a failed removal.
    pub fn close(mut self) -> Result<(), CredentialError> {
        match self.helper.take() {
            Some(helper) => {
                helper.close().map_err(CredentialError::HelperRemove)?;
                debug!("closed credential session");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for CredentialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSession")
            .field("helper", &self.helper_path())
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn create_helper() -> Result<TempPath, CredentialError> {
    let mut file = tempfile::Builder::new()
        .prefix("ghmulti-askpass-")
        .suffix(HELPER_SUFFIX)
        .tempfile()
        .map_err(CredentialError::HelperCreate)?;
    file.write_all(helper_script().as_bytes())
        .map_err(CredentialError::HelperCreate)?;
    file.flush().map_err(CredentialError::HelperCreate)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o700))
            .map_err(CredentialError::HelperCreate)?;
    }

    // Close the handle so the helper can be executed.
    Ok(file.into_temp_path())
}

/// Run `f` with the overlay for `secret`; the helper is gone when this returns.
///
/// The result is `f`'s result. A helper that cannot be removed afterwards is
/// logged, not reported as a failure of `f`.
pub fn with_credentials<T, E, F>(secret: Option<&str>, f: F) -> Result<T, E>
where
    F: FnOnce(&BTreeMap<String, String>) -> Result<T, E>,
    E: From<CredentialError>,
{
    let session = CredentialSession::open(secret)?;
    let result = f(session.env());
    if let Err(e) = session.close() {
        warn!(error = %e, "askpass helper cleanup failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_no_secret_is_empty_overlay() {
        let session = CredentialSession::open(None).unwrap();
        assert!(session.env().is_empty());
        assert!(session.helper_path().is_none());

        let session = CredentialSession::open(Some("")).unwrap();
        assert!(!session.has_secret());
    }

    #[test]
    fn test_overlay_and_helper_contents() {
        let session = CredentialSession::open(Some("ghp_secret")).unwrap();
        let helper = session.helper_path().unwrap().to_path_buf();
        let env = session.env();

        assert_eq!(env[ASKPASS_ENV], helper.display().to_string());
        assert_eq!(env[SECRET_ENV], "ghp_secret");
        assert_eq!(env[TERMINAL_PROMPT_ENV], "0");

        let script = std::fs::read_to_string(&helper).unwrap();
        assert!(script.contains(SECRET_ENV));
        assert!(!script.contains("ghp_secret"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let session = CredentialSession::open(Some("ghp_secret")).unwrap();
        assert!(!format!("{:?}", session).contains("ghp_secret"));
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_is_owner_executable() {
        use std::os::unix::fs::PermissionsExt;
        let session = CredentialSession::open(Some("x")).unwrap();
        let mode = std::fs::metadata(session.helper_path().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_prints_secret_from_env() {
        let session = CredentialSession::open(Some("ghp_secret")).unwrap();
        let output = std::process::Command::new(session.helper_path().unwrap())
            .envs(session.env())
            .output()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ghp_secret");
    }

    #[test]
    fn test_helper_removed_on_success() {
        let mut seen = None;
        let out: Result<u8, CredentialError> = with_credentials(Some("tok"), |env| {
            let path = PathBuf::from(&env[ASKPASS_ENV]);
            assert!(path.exists());
            seen = Some(path);
            Ok(7)
        });
        assert_eq!(out.unwrap(), 7);
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn test_cleanup_failure_keeps_success() {
        let out: Result<&str, CredentialError> = with_credentials(Some("tok"), |env| {
            // Removing the helper early makes the later cleanup fail.
            std::fs::remove_file(&env[ASKPASS_ENV]).unwrap();
            Ok("pushed")
        });
        assert_eq!(out.unwrap(), "pushed");
    }

    #[test]
    fn test_helper_removed_on_failure() {
        #[derive(Debug)]
        struct Failed;
        impl From<CredentialError> for Failed {
            fn from(_: CredentialError) -> Self {
                Failed
            }
        }

        let mut seen = None;
        let out: Result<(), Failed> = with_credentials(Some("tok"), |env| {
            seen = Some(PathBuf::from(&env[ASKPASS_ENV]));
            Err(Failed)
        });
        assert!(out.is_err());
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn test_helper_removed_on_panic() {
        let mut seen = None;
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let session = CredentialSession::open(Some("tok")).unwrap();
            seen = Some(session.helper_path().unwrap().to_path_buf());
            panic!("git exploded");
        }));
        assert!(caught.is_err());
        assert!(!seen.unwrap().exists());
    }
}
