//! Configuration schema (querytrail.toml)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which trajectory store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-memory store (nothing survives the process)
    Memory,

    /// Append-only JSONL files on local disk
    Jsonl,
}

impl Default for StoreKind {
    fn default() -> Self {
        Self::Memory
    }
}

/// Trajectory persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Store backend
    #[serde(default)]
    pub store: StoreKind,

    /// Directory for JSONL trajectory files
    #[serde(default = "default_trajectory_dir")]
    pub dir: PathBuf,
}

fn default_trajectory_dir() -> PathBuf {
    PathBuf::from("trajectories")
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            dir: default_trajectory_dir(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the dbt manifest.json
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,

    /// Trajectory persistence settings
    #[serde(default)]
    pub trajectory: TrajectoryConfig,

    /// How many similarity-search results to keep per query
    #[serde(default = "default_search_k")]
    pub search_k: usize,

    /// Extra intent domains: domain name -> keyword list
    #[serde(default)]
    pub domains: BTreeMap<String, Vec<String>>,
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_search_k() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_path: default_manifest_path(),
            trajectory: TrajectoryConfig::default(),
            search_k: default_search_k(),
            domains: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(String, String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
