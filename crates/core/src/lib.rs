//! ghmulti core library.
//!
//! This crate provides the pieces behind the `ghmulti` CLI: the profile and
//! link stores, the identity resolver (a repository link beats the global
//! default), the synchronizer that writes the resolved identity into git's
//! config scopes, and the credential session that hands a token to one git
//! invocation without putting it on disk.

pub mod accounts;
pub mod config;
pub mod credential;
pub mod doctor;
pub mod errors;
pub mod git;
pub mod link;
pub mod models;
pub mod ops;
pub mod resolver;
pub mod status;
pub mod store;
pub mod sync;
pub mod vault;

// Re-exports for convenience.
pub use accounts::AccountManager;
pub use config::Settings;
pub use credential::{with_credentials, CredentialSession};
pub use link::LinkStore;
pub use models::{IdentitySource, Profile, ProfileDocument, ResolvedIdentity, Scope};
pub use resolver::{resolve, Resolution};
pub use store::ProfileStore;
pub use sync::IdentitySync;
pub use vault::{KeyringVault, MemoryVault, SecretVault};
