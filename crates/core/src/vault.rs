//! Secret vault for per-account tokens.
//!
//! [`KeyringVault`] uses the `keyring` crate to reach the platform store:
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring / KWallet)
//! - Windows: Credential Manager
//!
//! Secrets are keyed by GitHub username under one service name.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::{debug, info};

use crate::errors::VaultError;

pub const DEFAULT_KEYRING_SERVICE: &str = "ghmulti";

/// Opaque per-identity secret storage.
pub trait SecretVault {
    /// Read the secret for `key`; a missing entry is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>, VaultError>;

    fn set(&self, key: &str, secret: &str) -> Result<(), VaultError>;

    /// Delete the secret for `key`; deleting a missing entry succeeds.
    fn delete(&self, key: &str) -> Result<(), VaultError>;

    /// Short backend description for diagnostics.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// OS keychain
// ---------------------------------------------------------------------------

/// Vault backed by the OS keychain.
#[derive(Debug, Clone)]
pub struct KeyringVault {
    service: String,
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, VaultError> {
        keyring::Entry::new(&self.service, key).map_err(|e| backend_error(key, e))
    }
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new(DEFAULT_KEYRING_SERVICE)
    }
}

impl SecretVault for KeyringVault {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        match self.entry(key)?.get_password() {
            Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
            Ok(_) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, key, "no secret stored");
                Ok(None)
            }
            Err(e) => Err(backend_error(key, e)),
        }
    }

    fn set(&self, key: &str, secret: &str) -> Result<(), VaultError> {
        self.entry(key)?
            .set_password(secret)
            .map_err(|e| backend_error(key, e))?;
        info!(service = %self.service, key, "stored secret");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), VaultError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                info!(service = %self.service, key, "deleted secret");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(backend_error(key, e)),
        }
    }

    fn describe(&self) -> String {
        format!("os-keyring (service '{}')", self.service)
    }
}

fn backend_error(key: &str, e: keyring::Error) -> VaultError {
    VaultError::Backend {
        key: key.to_string(),
        detail: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local vault; nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryVault {
    secrets: RefCell<HashMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.secrets.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.borrow().is_empty()
    }
}

impl SecretVault for MemoryVault {
    fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        Ok(self.secrets.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, secret: &str) -> Result<(), VaultError> {
        self.secrets
            .borrow_mut()
            .insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), VaultError> {
        self.secrets.borrow_mut().remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
