use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use icon_types::{AllowList, Privilege};

use crate::error::{ServerError, ServerResult};

/// Which storage adapters back the repository.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite metadata plus on-disk blob store under `data_dir`.
    #[default]
    Sqlite,
    /// Everything in memory; lost on exit.
    Memory,
}

/// One API user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    /// Bearer token presented in the `Authorization` header.
    pub token: String,
    #[serde(default)]
    pub privileges: Vec<Privilege>,
}

/// Application configuration, read from a TOML file.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Holds `metadata.db` and `blobs/`.
    pub data_dir: PathBuf,
    pub backend: Backend,
    /// Wipe both stores at startup.
    pub reset_data: bool,
    pub log_level: String,
    pub allowed_formats: AllowList,
    pub users: Vec<UserConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8090)),
            data_dir: PathBuf::from("./icon-data"),
            backend: Backend::default(),
            reset_data: false,
            log_level: "info".into(),
            allowed_formats: AllowList::default(),
            users: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.db")
    }

    pub fn blobs_path(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}
