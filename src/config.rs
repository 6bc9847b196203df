//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_addr")]
    pub addr: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload body in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding uploaded records and photos
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Root of the static client application
    #[serde(default = "default_app_dir")]
    pub app_dir: PathBuf,

    /// Fixed location of the temporary transfer archive
    #[serde(default = "default_temp_archive")]
    pub temp_archive: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Timeout for pushing an archive to a remote server
    #[serde(default = "default_export_timeout")]
    pub timeout_secs: u64,
}

/// Shared secrets. Normally supplied through the environment rather than the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Upload password; `None` leaves the server open
    #[serde(default)]
    pub password: Option<String>,

    /// The Blue Alliance API key handed to the client through `scripts/keys.js`
    #[serde(default)]
    pub tba_key: Option<String>,
}

// Defaults
fn default_addr() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_max_upload_mb() -> usize { 512 }
fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_app_dir() -> PathBuf { PathBuf::from(".") }
fn default_temp_archive() -> PathBuf { PathBuf::from("tmp.zip") }
fn default_export_timeout() -> u64 { 60 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            app_dir: default_app_dir(),
            temp_archive: default_temp_archive(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_export_timeout(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Load a config file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Password with empty strings treated as unset
    pub fn password(&self) -> Option<&str> {
        self.auth.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb * 1024 * 1024
    }
}
