//! CLI configuration.
//!
//! Read from `~/.config/pcs/config.toml` unless `--config` names another
//! file. The access token may also come from `PCS_ACCESS_TOKEN`, which
//! takes precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use pcs_client::{AccessToken, ClientConfig};
use pcs_upload::UploadConfig;
use serde::{Deserialize, Serialize};

/// Environment variable holding the access token.
pub const TOKEN_ENV: &str = "PCS_ACCESS_TOKEN";

/// Everything the CLI reads from its config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
    pub client: ClientConfig,
    pub upload: UploadConfig,
}

impl CliConfig {
    /// Loads the config file, then overlays the environment.
    ///
    /// A missing file at the default location yields defaults; a missing
    /// file named explicitly is an error.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overlays values from the environment, looked up through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.access_token = Some(AccessToken::new(token.trim()));
        }
    }

    /// Checks both sections without touching the network.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.client.validate()?;
        self.upload.validate()?;
        Ok(())
    }

    /// The access token, required by every remote command.
    pub fn token(&self) -> anyhow::Result<AccessToken> {
        match &self.access_token {
            Some(token) if !token.is_empty() => Ok(token.clone()),
            _ => bail!("no access token: set {TOKEN_ENV} or access_token in the config file"),
        }
    }
}

/// `~/.config/pcs/config.toml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    config_base_dir().map(|d| d.join("pcs").join("config.toml"))
}

fn config_base_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
    }
}
