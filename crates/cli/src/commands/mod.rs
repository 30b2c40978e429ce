//! Subcommand implementations.

pub mod accounts;
pub mod doctor;
pub mod link;
pub mod remote;
pub mod settings;
pub mod status;
pub mod style;

use std::path::PathBuf;

use tracing::debug;

use ghmulti_core::config::Settings;
use ghmulti_core::git::GitConfigCli;
use ghmulti_core::store::ProfileStore;
use ghmulti_core::sync::IdentitySync;
use ghmulti_core::vault::KeyringVault;
use ghmulti_core::AccountManager;

/// Everything a subcommand needs: settings, the account manager, and the
/// directory ghmulti was started in.
pub struct App {
    pub settings: Settings,
    pub mgr: AccountManager,
    pub cwd: PathBuf,
}

impl App {
    pub fn new(settings: Settings, cwd: PathBuf) -> Self {
        debug!(
            accounts = %settings.accounts_path().display(),
            service = %settings.keyring.service,
            "initializing account manager"
        );
        let mgr = AccountManager::new(
            ProfileStore::new(settings.accounts_path()),
            Box::new(KeyringVault::new(settings.keyring.service.clone())),
            Box::new(GitConfigCli::new()),
            IdentitySync::new(settings.github.host.clone()),
        );
        Self { settings, mgr, cwd }
    }
}

/// Pretty-print a serializable payload to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
