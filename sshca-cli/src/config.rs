//! CLI configuration.
//!
//! Values are layered: command-line flags override environment variables,
//! which override the config file. A missing default config file is not an
//! error; a missing file passed with `--config` is.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding `ca_url`.
pub const ENV_CA_URL: &str = "SSHCA_CA_URL";
/// Environment variable overriding `root`.
pub const ENV_ROOT: &str = "SSHCA_ROOT";
/// Environment variable overriding `provisioner`.
pub const ENV_PROVISIONER: &str = "SSHCA_PROVISIONER";
/// Environment variable overriding `provisioner_key`.
pub const ENV_PROVISIONER_KEY: &str = "SSHCA_PROVISIONER_KEY";

/// Errors loading or completing the configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read config at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required setting '{setting}': use '--{flag}', {env}, or the config file")]
    Missing {
        setting: &'static str,
        flag: &'static str,
        env: &'static str,
    },
}

/// Settings shared by every invocation against one authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Base URL of the certificate authority.
    pub ca_url: Option<String>,
    /// PEM root certificate trusted for the authority's TLS endpoint.
    pub root: Option<PathBuf>,
    /// Provisioner name used as the token issuer.
    pub provisioner: Option<String>,
    /// OpenSSH Ed25519 private key of the provisioner.
    pub provisioner_key: Option<PathBuf>,
}

impl CliConfig {
    /// Default config location under the platform config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("com", "sshca", "sshca")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from [`CliConfig::default_path`] when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    tracing::debug!("no config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `SSHCA_*` environment overrides.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    fn with_env_from(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            ca_url: get(ENV_CA_URL).or(self.ca_url),
            root: get(ENV_ROOT).map(PathBuf::from).or(self.root),
            provisioner: get(ENV_PROVISIONER).or(self.provisioner),
            provisioner_key: get(ENV_PROVISIONER_KEY)
                .map(PathBuf::from)
                .or(self.provisioner_key),
        }
    }

    /// Apply values given on the command line.
    #[must_use]
    pub fn with_overrides(self, flags: CliConfig) -> Self {
        Self {
            ca_url: flags.ca_url.or(self.ca_url),
            root: flags.root.or(self.root),
            provisioner: flags.provisioner.or(self.provisioner),
            provisioner_key: flags.provisioner_key.or(self.provisioner_key),
        }
    }

    /// The authority URL without a trailing slash.
    pub fn ca_url(&self) -> Result<&str, ConfigError> {
        self.ca_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing {
                setting: "ca_url",
                flag: "ca-url",
                env: ENV_CA_URL,
            })
    }
}
