use crate::errors::CoordResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Cooperative termination flag checked by every polling loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag and registers a Ctrl-C/SIGTERM handler that raises it.
    ///
    /// The handler can only be registered once per process.
    pub fn install() -> CoordResult<Self> {
        let signal = Self::new();
        let flag = signal.requested.clone();
        ctrlc::set_handler(move || {
            info!("Received termination signal");
            flag.store(true, Ordering::SeqCst);
        })?;
        Ok(signal)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
