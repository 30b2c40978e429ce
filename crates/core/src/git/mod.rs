//! Git plumbing for ghmulti.

pub mod config;
pub mod github;
pub mod remote;
pub mod repo;
pub mod runner;

pub use config::{GitConfigCli, MemoryConfig, ScopedConfig};
pub use github::{validate_token, GitHubClient, TokenValidation};
pub use repo::GitRepo;
pub use runner::{GitInvocation, GitRunner, SystemGit};
