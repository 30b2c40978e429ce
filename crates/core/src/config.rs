//! TOML settings for ghmulti.
//!
//! The settings file is optional; every field has a default. Environment
//! variables override the file after loading:
//!
//! | Variable                  | Field                    |
//! |---------------------------|--------------------------|
//! | `GHMULTI_ACCOUNTS_FILE`   | `general.accounts_file`  |
//! | `GHMULTI_KEYRING_SERVICE` | `keyring.service`        |
//! | `GHMULTI_HOST`            | `github.host`            |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::sync::{expand_tilde, DEFAULT_HOST};
use crate::vault::DEFAULT_KEYRING_SERVICE;

pub const ENV_ACCOUNTS_FILE: &str = "GHMULTI_ACCOUNTS_FILE";
pub const ENV_KEYRING_SERVICE: &str = "GHMULTI_KEYRING_SERVICE";
pub const ENV_HOST: &str = "GHMULTI_HOST";

// ---------------------------------------------------------------------------
// Top-level settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub keyring: KeyringSettings,

    #[serde(default)]
    pub github: GitHubSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Log filter used when neither `--log-level` nor `GHMULTI_LOG` is set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Profile document location; `~` is expanded.
    #[serde(default = "default_accounts_file")]
    pub accounts_file: String,
}

fn default_log_level() -> String {
    "warn".into()
}

fn default_accounts_file() -> String {
    "~/.ghmulti.json".into()
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            accounts_file: default_accounts_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringSettings {
    /// Service name tokens are stored under.
    #[serde(default = "default_keyring_service")]
    pub service: String,
}

fn default_keyring_service() -> String {
    DEFAULT_KEYRING_SERVICE.into()
}

impl Default for KeyringSettings {
    fn default() -> Self {
        Self {
            service: default_keyring_service(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubSettings {
    /// Host used in the noreply email and remote URLs.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_token_check_timeout")]
    pub token_check_timeout_secs: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

fn default_token_check_timeout() -> u64 {
    5
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_url: default_api_url(),
            token_check_timeout_secs: default_token_check_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl Settings {
    /// `<config_dir>/ghmulti/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ghmulti").join("config.toml"))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading settings");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("settings parsed successfully");
        Ok(settings)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(v) = get(ENV_ACCOUNTS_FILE) {
            debug!(env = ENV_ACCOUNTS_FILE, "override");
            self.general.accounts_file = v;
        }
        if let Some(v) = get(ENV_KEYRING_SERVICE) {
            debug!(env = ENV_KEYRING_SERVICE, "override");
            self.keyring.service = v;
        }
        if let Some(v) = get(ENV_HOST) {
            debug!(env = ENV_HOST, "override");
            self.github.host = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.accounts_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "general.accounts_file".into(),
                detail: "accounts file path must not be empty".into(),
            });
        }
        if self.keyring.service.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "keyring.service".into(),
                detail: "keyring service must not be empty".into(),
            });
        }
        if self.github.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.host".into(),
                detail: "GitHub host must not be empty".into(),
            });
        }
        if !(self.github.api_url.starts_with("https://") || self.github.api_url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                field: "github.api_url".into(),
                detail: "API URL must start with http:// or https://".into(),
            });
        }
        if self.github.token_check_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "github.token_check_timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Load `path` (or the default location), apply env overrides, validate.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load_and_resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(p) => Self::load_from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::load_from_file(&p)?,
                _ => {
                    debug!("no settings file, using defaults");
                    Self::default()
                }
            },
        };
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// The profile document path with `~` expanded.
    pub fn accounts_path(&self) -> PathBuf {
        PathBuf::from(expand_tilde(self.general.accounts_file.trim()))
    }

    pub fn token_check_timeout(&self) -> Duration {
        Duration::from_secs(self.github.token_check_timeout_secs)
    }

    /// Commented template written by `ghmulti config init`.
    pub fn default_template() -> &'static str {
        r#"# ghmulti settings

[general]
# Log filter when neither --log-level nor GHMULTI_LOG is set.
log_level = "warn"
# Where account profiles are stored.
accounts_file = "~/.ghmulti.json"

[keyring]
# Service name tokens are stored under in the OS keychain.
service = "ghmulti"

[github]
# Host for noreply emails and remote URLs (GitHub Enterprise: your host).
host = "github.com"
api_url = "https://api.github.com"
token_check_timeout_secs = 5
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_file() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.general.log_level, "warn");
        assert_eq!(settings.keyring.service, "ghmulti");
        assert_eq!(settings.github.host, "github.com");
        assert_eq!(settings.token_check_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[github]
host = "ghe.example.com"
"#,
        )
        .unwrap();
        assert_eq!(settings.github.host, "ghe.example.com");
        assert_eq!(settings.github.api_url, "https://api.github.com");
        assert_eq!(settings.general.accounts_file, "~/.ghmulti.json");
    }

    #[test]
    fn test_load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"[keyring]\nservice = \"ghmulti-test\"\n").unwrap();
        let settings = Settings::load_from_file(tmp.path()).unwrap();
        assert_eq!(settings.keyring.service, "ghmulti-test");
    }

    #[test]
    fn test_file_not_found() {
        let result = Settings::load_from_file("/nonexistent/ghmulti/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"[github\nhost = 1").unwrap();
        assert!(matches!(
            Settings::load_from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_ACCOUNTS_FILE, "/tmp/accounts.json"),
            (ENV_KEYRING_SERVICE, "  "),
            (ENV_HOST, "ghe.example.com"),
        ]);
        let mut settings = Settings::default();
        settings.apply_overrides_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.accounts_path(), PathBuf::from("/tmp/accounts.json"));
        assert_eq!(settings.keyring.service, "ghmulti");
        assert_eq!(settings.github.host, "ghe.example.com");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.github.api_url = "ftp://api.github.com".into();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "github.api_url"
        ));

        let mut settings = Settings::default();
        settings.github.token_check_timeout_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.keyring.service = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_default_template_is_valid() {
        let settings: Settings = toml::from_str(Settings::default_template()).unwrap();
        assert_eq!(settings, Settings::default());
        settings.validate().unwrap();
    }
}
