use crate::errors::CoordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical daemon/worker roles that can send or receive frames.
///
/// The name doubles as the wire tag and as the stem of the rendezvous socket
/// file, so renaming a variant's label is a protocol change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceName {
    Daemon,
    Worker,
    Scheduler,
}

impl ServiceName {
    pub const ALL: [ServiceName; 3] = [ServiceName::Daemon, ServiceName::Worker, ServiceName::Scheduler];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Daemon => "daemon",
            ServiceName::Worker => "worker",
            ServiceName::Scheduler => "scheduler",
        }
    }

    /// File name of the rendezvous socket, e.g. `daemon.ipc`.
    pub fn socket_file_name(&self) -> String {
        format!("{}.ipc", self.as_str())
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceName::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| CoordError::ParsingError(format!("unknown service name: {}", s)))
    }
}
