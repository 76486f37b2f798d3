use anyhow::{Context, Result};
use clap::Args;
use coord_core::CoordConfig;
use std::path::PathBuf;

/// Flags shared by every coord binary. Anything set here overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(short, long, env = "COORD_CONFIG")]
    /// Path to the configuration file (defaults to <config dir>/coord/config.toml)
    pub config: Option<PathBuf>,

    #[arg(long, env = "COORD_SOCKET_DIR")]
    /// Directory holding the rendezvous sockets
    pub socket_dir: Option<PathBuf>,

    #[arg(long, env = "COORD_MAX_DATAGRAM_SIZE")]
    /// Largest datagram accepted by this process's socket, in bytes
    pub max_datagram_size: Option<usize>,

    #[arg(long)]
    /// Never run the crash-recovery healing loop
    pub no_recovery: bool,

    #[arg(long)]
    /// Number of healing ticks after a crash
    pub recovery_ticks: Option<u32>,

    #[arg(long)]
    /// Length of one healing tick, in microseconds
    pub tick_interval_micros: Option<u64>,

    #[arg(long, env = "COORD_LOG_LEVEL", default_value = "info")]
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl CommonArgs {
    pub fn load_config(&self) -> Result<CoordConfig> {
        let mut config = match &self.config {
            Some(path) => CoordConfig::load_from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => CoordConfig::load_default().context("Failed to load default configuration")?,
        };

        if let Some(socket_dir) = &self.socket_dir {
            config.socket_dir = Some(socket_dir.clone());
        }
        if let Some(max) = self.max_datagram_size {
            config.max_datagram_size = max;
        }
        if self.no_recovery {
            config.recovery.recoverable = false;
        }
        if let Some(ticks) = self.recovery_ticks {
            config.recovery.ticks = ticks;
        }
        if let Some(micros) = self.tick_interval_micros {
            config.recovery.tick_interval_micros = micros;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_datagram_size = 2048\n[recovery]\nticks = 10\n").unwrap();

        let cli = TestCli::try_parse_from([
            "test",
            "--config",
            path.to_str().unwrap(),
            "--socket-dir",
            "/tmp/coord-sockets",
            "--recovery-ticks",
            "3",
            "--no-recovery",
        ])
        .unwrap();
        let config = cli.common.load_config().unwrap();

        assert_eq!(config.socket_dir, Some(PathBuf::from("/tmp/coord-sockets")));
        assert_eq!(config.max_datagram_size, 2048);
        assert_eq!(config.recovery.ticks, 3);
        assert!(!config.recovery.recoverable);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let dir = tempdir().unwrap();
        let args = CommonArgs {
            config: Some(dir.path().join("absent.toml")),
            max_datagram_size: Some(0),
            ..Default::default()
        };
        assert!(args.load_config().is_err());
    }
}
