// Shared building blocks for the coord daemon/worker suite:
// - Service identity and execution state
// - Cooperative shutdown flag and the sleep seam used by polling loops
// - Configuration loading
// - Shared error types

pub mod config;
pub use config::{CoordConfig, RecoveryConfig, WaitConfig};

pub mod errors;
pub use errors::*;

pub mod service;
pub use service::ServiceName;

pub mod state;
pub use state::{ExecutionState, StateHandle};

pub mod shutdown;
pub use shutdown::ShutdownSignal;

pub mod sleep;
pub use sleep::{Sleeper, ThreadSleeper};
