//! Machine-readable status for a working directory.
//!
//! The report compares the effective git identity (local value, else
//! global) against the profile that resolution picked and lists every
//! disagreement as a warning.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::accounts::{repo_root, AccountManager};
use crate::git::TokenValidation;
use crate::models::{IdentitySource, Profile, Scope};
use crate::sync::{IdentityValues, IdentitySync};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRef {
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveAccount {
    pub name: String,
    pub username: String,
    pub source: IdentitySource,
}

/// The four synchronized values as currently set in one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentitySnapshot {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub signing_key: Option<String>,
    pub ssh_command: Option<String>,
}

impl From<IdentityValues> for IdentitySnapshot {
    fn from(v: IdentityValues) -> Self {
        Self {
            user_name: v.user_name,
            user_email: v.user_email,
            signing_key: v.signing_key,
            ssh_command: v.ssh_command,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenStatus {
    pub present: bool,
    pub valid: Option<bool>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub linked_account: Option<String>,
    pub global_active_account: Option<AccountRef>,
    pub effective_active_account: Option<EffectiveAccount>,
    pub local_identity: IdentitySnapshot,
    pub global_identity: IdentitySnapshot,
    pub token_status: TokenStatus,
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub repo_root: Option<PathBuf>,
}

impl StatusReport {
    /// Fold a completed token check into the report.
    pub fn record_token_check(&mut self, check: TokenValidation) {
        self.token_status.valid = check.valid;
        self.token_status.message = check.message;
    }
}

/// Build the report for `cwd`. Also returns the token to validate, if any.
///
/// Nothing here fails: an unreachable keyring is reported in `token_status`.
pub fn build_status_report(mgr: &AccountManager, cwd: &Path) -> (StatusReport, Option<String>) {
    let doc = mgr.load();
    let resolution = mgr.resolve(cwd);
    let root = repo_root(cwd).ok();
    let config = mgr.config();

    let local_identity: IdentitySnapshot = match root.as_deref() {
        Some(root) => IdentityValues::read(config, Scope::Local, root).into(),
        None => IdentitySnapshot::default(),
    };
    let global_identity: IdentitySnapshot =
        IdentityValues::read(config, Scope::Global, root.as_deref().unwrap_or(cwd)).into();

    let mut warnings = resolution.warnings.clone();
    let effective = resolution.resolved.as_ref();
    if let Some(identity) = effective {
        warnings.extend(identity_mismatches(
            mgr.sync(),
            &identity.profile,
            &local_identity,
            &global_identity,
        ));
    }

    let (token_status, token) = match effective {
        None => (
            TokenStatus {
                present: false,
                valid: None,
                message: "No effective account.".to_string(),
            },
            None,
        ),
        Some(identity) => match mgr.token_for(&identity.profile) {
            Ok(Some(token)) => (
                TokenStatus {
                    present: true,
                    valid: None,
                    message: "Token check skipped.".to_string(),
                },
                Some(token),
            ),
            Ok(None) => (
                TokenStatus {
                    present: false,
                    valid: None,
                    message: "Token not found in keyring.".to_string(),
                },
                None,
            ),
            Err(e) => (
                TokenStatus {
                    present: false,
                    valid: None,
                    message: format!("Keyring unavailable: {}", e),
                },
                None,
            ),
        },
    };

    let report = StatusReport {
        linked_account: resolution.linked_name.clone(),
        global_active_account: doc.default_profile().map(|p| AccountRef {
            name: p.name.clone(),
            username: p.username.clone(),
        }),
        effective_active_account: effective.map(|id| EffectiveAccount {
            name: id.profile.name.clone(),
            username: id.profile.username.clone(),
            source: id.source,
        }),
        local_identity,
        global_identity,
        token_status,
        warnings,
        repo_root: root,
    };
    (report, token)
}

fn identity_mismatches(
    sync: &IdentitySync,
    profile: &Profile,
    local: &IdentitySnapshot,
    global: &IdentitySnapshot,
) -> Vec<String> {
    let expected = sync.values_for(profile);
    let effective = |l: &Option<String>, g: &Option<String>| l.clone().or_else(|| g.clone());

    let checks = [
        ("user.name", expected.user_name, effective(&local.user_name, &global.user_name)),
        ("user.email", expected.user_email, effective(&local.user_email, &global.user_email)),
        ("user.signingkey", expected.signing_key, effective(&local.signing_key, &global.signing_key)),
        ("core.sshCommand", expected.ssh_command, effective(&local.ssh_command, &global.ssh_command)),
    ];

    let mut warnings = Vec::new();
    for (key, want, have) in checks {
        match (want, have) {
            (Some(want), Some(have)) if want != have => warnings.push(format!(
                "Git {} '{}' does not match account '{}' (expected '{}').",
                key, have, profile.name, want
            )),
            (Some(want), None) => warnings.push(format!(
                "Git {} is not set (account '{}' expects '{}').",
                key, profile.name, want
            )),
            (None, Some(have)) => warnings.push(format!(
                "Git {} is '{}' but account '{}' does not define it.",
                key, have, profile.name
            )),
            _ => {}
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::NewAccount;
    use crate::git::MemoryConfig;
    use crate::store::ProfileStore;
    use crate::vault::MemoryVault;

    fn manager(home: &Path) -> AccountManager {
        AccountManager::new(
            ProfileStore::new(home.join("accounts.json")),
            Box::new(MemoryVault::new()),
            Box::new(MemoryConfig::new()),
            IdentitySync::default(),
        )
    }

    #[test]
    fn test_status_without_accounts() {
        let home = tempfile::tempdir().unwrap();
        let mgr = manager(home.path());
        let (report, token) = build_status_report(&mgr, home.path());

        assert_eq!(report.effective_active_account, None);
        assert_eq!(report.linked_account, None);
        assert!(!report.token_status.present);
        assert!(token.is_none());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_status_global_default_in_sync() {
        let home = tempfile::tempdir().unwrap();
        let mgr = manager(home.path());
        mgr.add(NewAccount {
            name: "work".into(),
            username: "alice".into(),
            token: Some("T1".into()),
            ..Default::default()
        })
        .unwrap();
        mgr.switch_default("work").unwrap();

        let (report, token) = build_status_report(&mgr, home.path());
        let effective = report.effective_active_account.unwrap();
        assert_eq!(effective.name, "work");
        assert_eq!(effective.source, IdentitySource::Global);
        assert_eq!(report.global_identity.user_name.as_deref(), Some("alice"));
        assert!(report.token_status.present);
        assert_eq!(token.as_deref(), Some("T1"));
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_status_reports_mismatches() {
        let home = tempfile::tempdir().unwrap();
        let mgr = manager(home.path());
        mgr.add(NewAccount {
            name: "work".into(),
            username: "alice".into(),
            signing_key: Some("ABC".into()),
            ..Default::default()
        })
        .unwrap();
        mgr.switch_default("work").unwrap();
        mgr.config()
            .set(Scope::Global, "user.name", "someone-else", home.path())
            .unwrap();
        mgr.config()
            .unset(Scope::Global, "user.signingkey", home.path())
            .unwrap();

        let (report, _) = build_status_report(&mgr, home.path());
        assert_eq!(report.warnings.len(), 2, "{:?}", report.warnings);
        assert!(report.warnings[0].contains("user.name 'someone-else'"));
        assert!(report.warnings[1].contains("user.signingkey is not set"));
    }

    #[test]
    fn test_record_token_check() {
        let home = tempfile::tempdir().unwrap();
        let mgr = manager(home.path());
        let (mut report, _) = build_status_report(&mgr, home.path());
        report.record_token_check(TokenValidation {
            valid: Some(false),
            message: "Token is invalid or expired.".into(),
            status_code: Some(401),
            login: None,
        });
        assert_eq!(report.token_status.valid, Some(false));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("repo_root").is_none());
        assert_eq!(json["token_status"]["valid"], false);
    }
}
