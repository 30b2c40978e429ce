//! Environment diagnostics.

use std::path::Path;

use serde::Serialize;

use crate::accounts::{repo_root, AccountManager};
use crate::git::runner::git_version;

/// Vault key read to exercise the backend; it normally does not exist.
const PROBE_KEY: &str = "ghmulti-doctor-probe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl DoctorCheck {
    fn new(name: &str, ok: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: if ok { CheckStatus::Ok } else { CheckStatus::Error },
            detail: detail.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CheckStatus::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorReport {
    pub ok: bool,
    pub checks: Vec<DoctorCheck>,
}

pub fn run_doctor(mgr: &AccountManager, cwd: &Path) -> DoctorReport {
    let mut checks = Vec::new();

    checks.push(match git_version(cwd) {
        Ok(version) => DoctorCheck::new("git", true, version),
        Err(e) => DoctorCheck::new("git", false, format!("not available ({})", e)),
    });

    let doc = mgr.load();
    checks.push(DoctorCheck::new(
        "config",
        true,
        format!(
            "{} account(s) configured in {}",
            doc.accounts.len(),
            mgr.store().path().display()
        ),
    ));

    checks.push(match (doc.active.as_deref(), doc.default_profile()) {
        (_, Some(profile)) => DoctorCheck::new("active-account", true, format!("active={}", profile.name)),
        (Some(stale), None) => DoctorCheck::new(
            "active-account",
            false,
            format!("active account '{}' not found", stale),
        ),
        (None, None) => DoctorCheck::new("active-account", false, "no active account"),
    });

    let vault = mgr.vault();
    checks.push(match vault.get(PROBE_KEY) {
        Ok(_) => DoctorCheck::new("keyring-backend", true, vault.describe()),
        Err(e) => DoctorCheck::new("keyring-backend", false, format!("unavailable ({})", e)),
    });

    checks.push(match repo_root(cwd) {
        Ok(root) => match mgr.links().get(&root) {
            Some(name) if doc.contains(&name) => {
                DoctorCheck::new("repo-link", true, format!("linked={}", name))
            }
            Some(name) => DoctorCheck::new(
                "repo-link",
                false,
                format!("linked account '{}' not found", name),
            ),
            None => DoctorCheck::new("repo-link", true, "repo not linked"),
        },
        Err(_) => DoctorCheck::new("repo-link", true, "not in a git repository"),
    });

    let ok = checks.iter().all(DoctorCheck::is_ok);
    DoctorReport { ok, checks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::NewAccount;
    use crate::git::MemoryConfig;
    use crate::store::ProfileStore;
    use crate::sync::IdentitySync;
    use crate::vault::MemoryVault;

    fn manager(home: &Path) -> AccountManager {
        AccountManager::new(
            ProfileStore::new(home.join("accounts.json")),
            Box::new(MemoryVault::new()),
            Box::new(MemoryConfig::new()),
            IdentitySync::default(),
        )
    }

    fn check<'a>(report: &'a DoctorReport, name: &str) -> &'a DoctorCheck {
        report.checks.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn test_doctor_flags_missing_active_account() {
        let home = tempfile::tempdir().unwrap();
        let report = run_doctor(&manager(home.path()), home.path());
        assert!(!report.ok);
        assert_eq!(check(&report, "active-account").status, CheckStatus::Error);
        assert_eq!(check(&report, "keyring-backend").detail, "in-memory");
        assert_eq!(check(&report, "repo-link").detail, "not in a git repository");
    }

    #[test]
    fn test_doctor_check_names_and_active() {
        let home = tempfile::tempdir().unwrap();
        let mgr = manager(home.path());
        mgr.add(NewAccount {
            name: "work".into(),
            username: "alice".into(),
            ..Default::default()
        })
        .unwrap();
        mgr.switch_default("work").unwrap();

        let report = run_doctor(&mgr, home.path());
        let names: Vec<_> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["git", "config", "active-account", "keyring-backend", "repo-link"]);
        assert_eq!(check(&report, "active-account").detail, "active=work");
        assert!(check(&report, "config").detail.starts_with("1 account(s)"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["checks"][2]["status"], "ok");
    }
}
