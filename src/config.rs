//! Hub configuration.
//!
//! The hub keeps everything it learns about the clusters in
//! `<state_dir>/config.yml`, so later phases (and a restarted hub) can pick
//! up where initialize left off.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cluster::{Cluster, Version};
use crate::error::{Result, UpgradeError};

pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Environment variable overriding the default state directory.
pub const STATE_DIR_ENV: &str = "CLUSTERUP_HOME";

pub const DEFAULT_AGENT_PORT: u16 = 6416;
pub const DEFAULT_HUB_PORT: u16 = 7527;

/// Resolve the state directory: explicit value, else `$CLUSTERUP_HOME`,
/// else `~/.clusterup`.
pub fn resolve_state_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".clusterup"))
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory; set {}", STATE_DIR_ENV).into())
}

/// Versions of the source and target installations, resolved once during
/// initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source_version: Version,
    pub target_version: Version,
}

impl Connection {
    pub fn new(source_version: Version, target_version: Version) -> Self {
        Self {
            source_version,
            target_version,
        }
    }
}

fn default_agent_port() -> u16 {
    DEFAULT_AGENT_PORT
}

fn default_hub_port() -> u16 {
    DEFAULT_HUB_PORT
}

fn is_false(b: &bool) -> bool {
    !b
}

/// Persistent hub state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Where this file and the status record live. Not serialized; set from
    /// the directory the config was loaded from.
    #[serde(skip)]
    pub state_dir: PathBuf,

    #[serde(default = "default_agent_port")]
    pub agent_port: u16,

    #[serde(default = "default_hub_port")]
    pub hub_port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Cluster>,

    /// The freshly initialized cluster the source is upgraded into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_target: Option<Cluster>,

    /// Installation root of the target software.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_install_dir: Option<PathBuf>,

    /// Catalog version of the intermediate target, recorded right after it
    /// is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_catalog_version: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub use_link_mode: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
}

impl HubConfig {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            agent_port: DEFAULT_AGENT_PORT,
            hub_port: DEFAULT_HUB_PORT,
            source: None,
            intermediate_target: None,
            target_install_dir: None,
            target_catalog_version: None,
            use_link_mode: false,
            connection: None,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE_NAME)
    }

    /// Load `<state_dir>/config.yml`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` if the file doesn't exist.
    /// Returns `ConfigParseError` if the YAML is invalid.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UpgradeError::ConfigNotFound { path: path.clone() }
            } else {
                UpgradeError::Io(e)
            }
        })?;

        let mut config: HubConfig =
            serde_yaml::from_str(&content).map_err(|e| UpgradeError::ConfigParseError {
                path: path.clone(),
                message: e.to_string(),
            })?;
        config.state_dir = state_dir.to_path_buf();
        Ok(config)
    }

    /// Load the config, or start a fresh one if none was saved yet.
    pub fn load_or_new(state_dir: &Path) -> Result<Self> {
        match Self::load(state_dir) {
            Err(UpgradeError::ConfigNotFound { .. }) => Ok(Self::new(state_dir)),
            other => other,
        }
    }

    /// Write atomically: temp file, then rename over the old one.
    pub fn save(&self) -> Result<()> {
        let path = self.path();
        let yaml = serde_yaml::to_string(self).map_err(anyhow::Error::from)?;

        let temp_path = path.with_extension("yml.tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(yaml.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}
