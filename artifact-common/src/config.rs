//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the target database file inside the root folder
pub const DATABASE_FILE_NAME: &str = "artifacts.db";

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "ARTIFACT_ROOT_FOLDER";
/// Environment variable overriding the listen port
pub const ENV_PORT: &str = "ARTIFACT_PORT";
/// Environment variable naming a separate origin database
pub const ENV_SOURCE_DB: &str = "ARTIFACT_SOURCE_DB";

const APP_DIR_NAME: &str = "artifact-explorer";

/// Settings as they appear in `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub source_database: Option<PathBuf>,
    pub port: Option<u16>,
    pub fetch_limit: Option<i64>,
    pub min_classification_count: Option<i64>,
    pub fetch_cache_capacity: Option<usize>,
    pub session_max_batches: Option<usize>,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from an explicit path or the platform location.
    ///
    /// A missing or broken file never aborts startup: the problem is logged and
    /// an empty config (all defaults) is returned.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match default_config_file() {
                Some(p) => p,
                None => {
                    info!("No config file found, using defaults");
                    return Self::default();
                }
            },
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Compiled fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub port: u16,
    pub fetch_limit: i64,
    pub min_classification_count: i64,
    pub fetch_cache_capacity: usize,
    pub session_max_batches: usize,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            port: 5730,
            fetch_limit: 2500,
            min_classification_count: 2500,
            fetch_cache_capacity: 32,
            session_max_batches: 64,
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub source_database: Option<PathBuf>,
    pub port: Option<u16>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerConfig {
    pub root_folder: PathBuf,
    /// Origin store; `None` means the target store is also the source
    pub source_database: Option<PathBuf>,
    pub port: u16,
    pub fetch_limit: i64,
    pub min_classification_count: i64,
    pub fetch_cache_capacity: usize,
    pub session_max_batches: usize,
}

impl ExplorerConfig {
    /// Merge CLI, environment, TOML and compiled defaults
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::for_current_platform();

        let root_folder = cli
            .root_folder
            .clone()
            .or_else(|| env_path(ENV_ROOT_FOLDER))
            .or_else(|| toml.root_folder.clone())
            .unwrap_or(defaults.root_folder);

        let source_database = cli
            .source_database
            .clone()
            .or_else(|| env_path(ENV_SOURCE_DB))
            .or_else(|| toml.source_database.clone());

        let port = match cli.port {
            Some(port) => port,
            None => match std::env::var(ENV_PORT) {
                Ok(raw) => raw.trim().parse::<u16>().map_err(|_| {
                    Error::Config(format!("{} is not a valid port: {}", ENV_PORT, raw))
                })?,
                Err(_) => toml.port.unwrap_or(defaults.port),
            },
        };

        let config = Self {
            root_folder,
            source_database,
            port,
            fetch_limit: toml.fetch_limit.unwrap_or(defaults.fetch_limit),
            min_classification_count: toml
                .min_classification_count
                .unwrap_or(defaults.min_classification_count),
            fetch_cache_capacity: toml
                .fetch_cache_capacity
                .unwrap_or(defaults.fetch_cache_capacity),
            session_max_batches: toml
                .session_max_batches
                .unwrap_or(defaults.session_max_batches),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.fetch_limit < 1 {
            return Err(Error::Config(format!(
                "fetch_limit must be at least 1, got {}",
                self.fetch_limit
            )));
        }
        if self.fetch_cache_capacity == 0 {
            return Err(Error::Config("fetch_cache_capacity must be at least 1".to_string()));
        }
        if self.session_max_batches == 0 {
            return Err(Error::Config("session_max_batches must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Target database file inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Platform config file, if one exists
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./artifact_data"))
}
