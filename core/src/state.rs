use crate::errors::CoordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Execution state a process reports to its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Started,
    Working,
    Idle,
    Healing,
    Stopping,
}

impl ExecutionState {
    pub const ALL: [ExecutionState; 5] = [
        ExecutionState::Started,
        ExecutionState::Working,
        ExecutionState::Idle,
        ExecutionState::Healing,
        ExecutionState::Stopping,
    ];

    /// Label carried as the payload of a state report frame.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Started => "started",
            ExecutionState::Working => "working",
            ExecutionState::Idle => "idle",
            ExecutionState::Healing => "healing",
            ExecutionState::Stopping => "stopping",
        }
    }

    /// Parses a report payload. Returns `None` for anything that is not a known label.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        std::str::from_utf8(payload).ok()?.parse().ok()
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionState {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExecutionState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CoordError::ParsingError(format!("unknown execution state: {}", s)))
    }
}

/// Shared holder for the current process's execution state.
///
/// Owned by the supervising loop and cloned into the sender role (which reports
/// it) and the recovery supervisor (which transitions it).
#[derive(Debug, Clone)]
pub struct StateHandle {
    inner: Arc<RwLock<ExecutionState>>,
}

impl StateHandle {
    pub fn new(initial: ExecutionState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> ExecutionState {
        *self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `next` and returns the previous state.
    pub fn set(&self, next: ExecutionState) -> ExecutionState {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, next)
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new(ExecutionState::Started)
    }
}
