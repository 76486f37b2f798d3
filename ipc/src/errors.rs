use coord_core::ServiceName;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the datagram transport itself
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind IPC socket at {}: {source}", .path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Datagram of {len} bytes exceeds the {max} byte limit of {}", .path.display())]
    Overflow { path: PathBuf, len: usize, max: usize },

    #[error("Failed to write to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        code: Option<i32>,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read from IPC socket: {source}")]
    Read {
        code: Option<i32>,
        #[source]
        source: io::Error,
    },

    #[error("Transport is not bound to a rendezvous path")]
    NotBound,
}

impl TransportError {
    pub(crate) fn write(path: PathBuf, source: io::Error) -> Self {
        TransportError::Write {
            path,
            code: source.raw_os_error(),
            source,
        }
    }

    pub(crate) fn read(source: io::Error) -> Self {
        TransportError::Read {
            code: source.raw_os_error(),
            source,
        }
    }

    /// OS error number behind a read or write failure, if any
    pub fn os_code(&self) -> Option<i32> {
        match self {
            TransportError::Write { code, .. } | TransportError::Read { code, .. } => *code,
            TransportError::Bind { source, .. } => source.raw_os_error(),
            TransportError::Overflow { .. } | TransportError::NotBound => None,
        }
    }
}

/// Malformed frames, on either side of the codec
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame truncated: {0}")]
    Truncated(#[from] io::Error),

    #[error("Unsupported frame version {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown frame code {0}")]
    UnknownCode(u16),

    #[error("Unknown sender service tag {0:?}")]
    UnknownService(String),

    #[error("Invalid sender pid {0}")]
    InvalidPid(u32),

    #[error("Frame field `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("Frame field `{field}` is {len} bytes, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Invalid payload presence flag {0}")]
    InvalidPayloadFlag(u8),

    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),
}

/// Anything that can go wrong while sending a message
#[derive(Error, Debug)]
pub enum IpcError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Terminal outcomes of waiting for a dependency service
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Failed to connect to {service} after {attempts} attempts")]
    Unreachable {
        service: ServiceName,
        attempts: u32,
        #[source]
        last: Option<IpcError>,
    },

    #[error("Cancelled while waiting for {service}")]
    Cancelled { service: ServiceName },
}
