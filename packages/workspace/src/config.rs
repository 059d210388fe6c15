use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "placesync.config.json";

/// Placesync configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding one `.place` file per project
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,

    /// Projection root for the open project
    #[serde(default = "default_unpack_dir")]
    pub unpack_dir: PathBuf,

    /// Address the relay hub listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Hub the control client connects to
    #[serde(default = "default_relay_url")]
    pub relay_url: String,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from("projects")
}

fn default_unpack_dir() -> PathBuf {
    PathBuf::from("unpacked")
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_relay_url() -> String {
    "ws://127.0.0.1:5000".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

impl Config {
    /// Load `placesync.config.json` from a directory, or the defaults if absent
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_dir: default_projects_dir(),
            unpack_dir: default_unpack_dir(),
            listen_addr: default_listen_addr(),
            relay_url: default_relay_url(),
            debounce_ms: default_debounce_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}
