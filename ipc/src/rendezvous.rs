use coord_core::{CoordConfig, CoordError, CoordResult, ServiceName};
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_DATAGRAM_SIZE: NonZeroUsize =
    match NonZeroUsize::new(coord_core::config::DEFAULT_MAX_DATAGRAM_SIZE) {
        Some(size) => size,
        None => panic!("default datagram size must be non-zero"),
    };

/// Where a named service listens and how large a datagram it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousDescriptor {
    path: PathBuf,
    max_datagram_size: NonZeroUsize,
}

impl RendezvousDescriptor {
    pub fn new(path: impl Into<PathBuf>, max_datagram_size: NonZeroUsize) -> Self {
        Self {
            path: path.into(),
            max_datagram_size,
        }
    }

    /// `<base_dir>/<service>.ipc` with the default datagram limit
    pub fn for_service(service: ServiceName, base_dir: &Path) -> Self {
        Self::new(base_dir.join(service.socket_file_name()), DEFAULT_MAX_DATAGRAM_SIZE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size.get()
    }
}

/// Resolves service names to descriptors under one shared directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketDirectory {
    base_dir: PathBuf,
    max_datagram_size: NonZeroUsize,
}

impl SocketDirectory {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }

    pub fn with_max_datagram_size(mut self, max_datagram_size: NonZeroUsize) -> Self {
        self.max_datagram_size = max_datagram_size;
        self
    }

    pub fn from_config(config: &CoordConfig) -> CoordResult<Self> {
        config.validate()?;
        let max = NonZeroUsize::new(config.max_datagram_size).ok_or_else(|| {
            CoordError::ConfigError("max_datagram_size must be greater than zero".to_string())
        })?;
        Ok(Self::new(config.resolve_socket_dir()).with_max_datagram_size(max))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn descriptor(&self, service: ServiceName) -> RendezvousDescriptor {
        RendezvousDescriptor::new(
            self.base_dir.join(service.socket_file_name()),
            self.max_datagram_size,
        )
    }

    pub fn ensure_exists(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base_dir)
    }
}
