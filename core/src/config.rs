use crate::errors::{CoordError, CoordResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1024;
/// Largest datagram size a socket may be configured for
pub const MAX_DATAGRAM_SIZE_LIMIT: usize = 64 * 1024;
pub const DEFAULT_RECOVERY_TICKS: u32 = 300;
pub const DEFAULT_TICK_INTERVAL_MICROS: u64 = 1_000_000;

const APP_NAME: &str = "coord";

/// Top-level configuration shared by the daemon and worker binaries
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CoordConfig {
    /// Directory holding the rendezvous sockets. Resolved at runtime when unset.
    pub socket_dir: Option<PathBuf>,
    pub max_datagram_size: usize,
    /// How often the daemon drains its inbox
    pub poll_interval_ms: u64,
    pub recovery: RecoveryConfig,
    pub wait: WaitConfig,
}

/// Crash-recovery settings, see `coord_recovery::RecoveryBinding`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RecoveryConfig {
    pub recoverable: bool,
    pub ticks: u32,
    pub tick_interval_micros: u64,
}

/// Dependency-wait settings used by workers before they start
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WaitConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for CoordConfig {
    fn default() -> Self {
        Self {
            socket_dir: None,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            poll_interval_ms: 500,
            recovery: RecoveryConfig::default(),
            wait: WaitConfig::default(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            recoverable: true,
            ticks: DEFAULT_RECOVERY_TICKS,
            tick_interval_micros: DEFAULT_TICK_INTERVAL_MICROS,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            max_attempts: 30,
        }
    }
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl CoordConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> CoordResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CoordError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            CoordError::ConfigError(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `<config_dir>/coord/config.toml`, falling back to defaults
    pub fn load_default() -> CoordResult<Self> {
        Self::load_from_file(&get_default_config_file()?)
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> CoordResult<()> {
        let content = toml::to_string(self)
            .map_err(|e| CoordError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CoordError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .map_err(|e| CoordError::ConfigError(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    pub fn validate(&self) -> CoordResult<()> {
        if self.max_datagram_size == 0 {
            return Err(CoordError::ConfigError(
                "max_datagram_size must be greater than zero".to_string(),
            ));
        }
        if self.max_datagram_size > MAX_DATAGRAM_SIZE_LIMIT {
            return Err(CoordError::ConfigError(format!(
                "max_datagram_size must not exceed {} bytes",
                MAX_DATAGRAM_SIZE_LIMIT
            )));
        }
        if self.wait.max_attempts == 0 {
            return Err(CoordError::ConfigError(
                "wait.max_attempts must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(CoordError::ConfigError(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket directory from the config, or the runtime-resolved default
    pub fn resolve_socket_dir(&self) -> PathBuf {
        self.socket_dir.clone().unwrap_or_else(default_socket_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `$XDG_RUNTIME_DIR/coord` when available, otherwise the system temp directory
pub fn default_socket_dir() -> PathBuf {
    match dirs::runtime_dir() {
        Some(runtime) => runtime.join(APP_NAME),
        None => std::env::temp_dir(),
    }
}

/// Helper function to get default config file path
pub fn get_default_config_file() -> CoordResult<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        CoordError::ConfigError("Could not determine config directory".to_string())
    })?;
    Ok(config_dir.join(APP_NAME).join("config.toml"))
}
