//! The on-disk configuration: provider credentials and http settings.
//!
//! The configuration is loaded once by the entry point with [`Config::load_or_create`]
//! and then passed around explicitly, see [`crate::api::QueryBuilder::new`].

use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The commented template written on first run.
pub const DEFAULT_CONFIG_STR: &str = include_str!("default.toml");

/// The config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

const APP_NAME: &str = "multibooru";

/// Errors of resolving, reading or creating the config.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No home directory is known for the current user.
    #[error("unable to resolve the config directory of the current user")]
    NoConfigDir,
    /// Reading the file, or creating the default, failed.
    #[error("failed to access config at {path}: {source}")]
    Io {
        /// The config file.
        path: PathBuf,
        /// The underlying io error.
        source: std::io::Error,
    },
    /// The file is not valid toml or has values of the wrong type.
    #[error("invalid config {path}: {source}")]
    Parse {
        /// The config file.
        path: PathBuf,
        /// The underlying toml error.
        source: toml::de::Error,
    },
}

/// Credentials of a single provider.
///
/// Missing values are blank, nothing is validated before use.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Credentials {
    /// The api key of the account.
    pub api_key: String,
    /// The user name or user id, depending on the provider.
    #[serde(alias = "username", alias = "user_id")]
    pub login: String,
}

/// The content of `config.toml`, every key is optional.
#[non_exhaustive]
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Request timeout in seconds, `0` means no override.
    pub timeout: u64,
    /// Cap of concurrent downloads, `None` means one task per image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<NonZeroUsize>,
    /// The `[danbooru]` table.
    pub danbooru: Credentials,
    /// The `[gelbooru]` table.
    pub gelbooru: Credentials,
}

impl Config {
    /// The platform config directory of this program, e.g. `~/.config/multibooru` on linux.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Read `config.toml` from `dir`.
    ///
    /// If the file doesn't exist, `dir` is created and [`DEFAULT_CONFIG_STR`] is written into it,
    /// then the default config is returned.
    ///
    /// # Errors
    ///
    /// If the file exists but can't be read or parsed, or if the default can't be written.
    pub fn load_or_create(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let path = dir.join(CONFIG_FILE_NAME);
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.clone(),
            source,
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!("no config found, writing default to {}", path.display());
                std::fs::create_dir_all(dir).map_err(io_err)?;
                std::fs::write(&path, DEFAULT_CONFIG_STR).map_err(io_err)?;
                Ok(Self::default())
            }
            Err(err) => Err(io_err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() -> anyhow::Result<()> {
        let config: Config = toml::from_str(DEFAULT_CONFIG_STR)?;
        assert_eq!(config.timeout, 0);
        assert_eq!(config.jobs, None);
        assert_eq!(config.danbooru, Credentials::default());
        assert_eq!(config.gelbooru, Credentials::default());
        Ok(())
    }

    #[test]
    fn test_parse_missing_keys() -> anyhow::Result<()> {
        let toml = r#"
            [gelbooru]
            api_key = "secret"
        "#;
        let config: Config = toml::from_str(toml)?;
        assert_eq!(config.gelbooru.api_key, "secret");
        assert_eq!(config.gelbooru.login, "");
        assert_eq!(config.danbooru.api_key, "");
        Ok(())
    }

    #[test]
    fn test_parse_user_aliases() -> anyhow::Result<()> {
        let toml = r#"
            jobs = 4

            [danbooru]
            username = "alice"

            [gelbooru]
            user_id = "1234"
        "#;
        let config: Config = toml::from_str(toml)?;
        assert_eq!(config.danbooru.login, "alice");
        assert_eq!(config.gelbooru.login, "1234");
        assert_eq!(config.jobs, NonZeroUsize::new(4));
        Ok(())
    }

    #[test]
    fn test_parse_zero_jobs() {
        let toml = "jobs = 0";
        toml::from_str::<Config>(toml).expect_err("zero jobs should be invalid");
    }

    #[test]
    fn test_load_or_create() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let config_dir = temp_dir.path().join("nested").join(APP_NAME);

        let config = Config::load_or_create(&config_dir)?;
        assert_eq!(config.timeout, 0);
        let written = std::fs::read_to_string(config_dir.join(CONFIG_FILE_NAME))?;
        assert_eq!(written, DEFAULT_CONFIG_STR);

        std::fs::write(
            config_dir.join(CONFIG_FILE_NAME),
            "timeout = 30\n[danbooru]\napi_key = \"key\"\n",
        )?;
        let config = Config::load_or_create(&config_dir)?;
        assert_eq!(config.timeout, 30);
        assert_eq!(config.danbooru.api_key, "key");
        Ok(())
    }

    #[test]
    fn test_load_invalid() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "timeout = \"soon\"")?;

        let err = Config::load_or_create(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        Ok(())
    }
}
