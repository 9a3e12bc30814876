//! Centralized CLI configuration.
//!
//! Loaded via the `config` crate from `ROADFLEET__*` environment variables,
//! for example `ROADFLEET__API__BASE_URL` or `ROADFLEET__STORAGE_DIR`.
//! Command-line flags override whatever the environment provides.
//!
//! See [`ApiConfig`] for the backend connection settings.

use std::path::PathBuf;

use roadfleet_access::DEFAULT_LOGIN_PATH;
use roadfleet_api::ApiConfig;
use serde::Deserialize;

/// Environment variable prefix.
const ENV_PREFIX: &str = "ROADFLEET";

/// CLI configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Backend connection configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Directory holding the persisted session.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Login entry point reported by `check` for signed-out users.
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

fn default_storage_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".roadfleet")
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage_dir: default_storage_dir(),
            login_path: default_login_path(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(environment())
    }

    fn from_environment(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
