use coord_core::config::{DEFAULT_RECOVERY_TICKS, DEFAULT_TICK_INTERVAL_MICROS};
use coord_core::RecoveryConfig;
use std::time::Duration;

/// Whether, and for how long, a process heals after a crash.
///
/// Declared once at startup and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryBinding {
    recoverable: bool,
    ticks: u32,
    tick_interval: Duration,
}

impl RecoveryBinding {
    pub fn new(recoverable: bool, ticks: u32, tick_interval_micros: u64) -> Self {
        Self {
            recoverable,
            ticks,
            tick_interval: Duration::from_micros(tick_interval_micros),
        }
    }

    /// A binding that never heals.
    pub fn disabled() -> Self {
        Self::new(false, 0, 0)
    }

    pub fn from_config(config: &RecoveryConfig) -> Self {
        Self::new(config.recoverable, config.ticks, config.tick_interval_micros)
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable && self.ticks > 0 && !self.tick_interval.is_zero()
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Total healing time when no termination interrupts it
    pub fn expected_wait(&self) -> Duration {
        self.tick_interval.saturating_mul(self.ticks)
    }
}

impl Default for RecoveryBinding {
    fn default() -> Self {
        Self::new(true, DEFAULT_RECOVERY_TICKS, DEFAULT_TICK_INTERVAL_MICROS)
    }
}
