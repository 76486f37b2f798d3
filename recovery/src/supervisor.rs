use crate::binding::RecoveryBinding;
use coord_core::{ExecutionState, ShutdownSignal, Sleeper, StateHandle};
use tracing::{info, instrument, warn};

/// Healing ticks between two checks of the shutdown flag.
pub const CANCELLATION_CHECK_EVERY: u32 = 3;

/// Process-specific work around the healing wait.
pub trait HealingHooks {
    /// Best-effort release of pooled connections, buffered diagnostics and
    /// large caches before the wait starts.
    fn before_healing_start(&mut self) {}

    /// Runs once the state is back to `Started`; used to announce the restart.
    fn on_restarted(&mut self, _state: &StateHandle) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl HealingHooks for NoopHooks {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// All ticks elapsed and the state is `Started` again
    Recovered,
    /// Termination was requested; the caller should exit now
    Interrupted { completed_ticks: u32 },
    /// The binding does not allow recovery
    Skipped,
}

/// Drives `STARTED -> HEALING -> STARTED` after an abnormal restart.
pub struct RecoverySupervisor<S, H> {
    binding: RecoveryBinding,
    state: StateHandle,
    shutdown: ShutdownSignal,
    sleeper: S,
    hooks: H,
}

impl<S: Sleeper, H: HealingHooks> RecoverySupervisor<S, H> {
    pub fn new(
        binding: RecoveryBinding,
        state: StateHandle,
        shutdown: ShutdownSignal,
        sleeper: S,
        hooks: H,
    ) -> Self {
        Self {
            binding,
            state,
            shutdown,
            sleeper,
            hooks,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.binding.is_recoverable()
    }

    pub fn binding(&self) -> &RecoveryBinding {
        &self.binding
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    /// Waits out the healing period, honouring termination every
    /// [`CANCELLATION_CHECK_EVERY`] ticks.
    #[instrument(skip(self), fields(ticks = self.binding.ticks()))]
    pub fn handle_recovery_after_crash(&mut self) -> RecoveryOutcome {
        if !self.is_recoverable() {
            warn!("Process is not recoverable, skipping healing");
            return RecoveryOutcome::Skipped;
        }

        self.state.set(ExecutionState::Healing);
        info!(
            expected_wait = ?self.binding.expected_wait(),
            "Healing after abnormal termination"
        );
        self.hooks.before_healing_start();

        let ticks = self.binding.ticks();
        let interval = self.binding.tick_interval();
        for tick in 1..=ticks {
            self.sleeper.sleep(interval);
            if tick % CANCELLATION_CHECK_EVERY == 0 && self.shutdown.is_requested() {
                warn!(tick, ticks, "Termination requested during healing");
                self.state.set(ExecutionState::Stopping);
                return RecoveryOutcome::Interrupted {
                    completed_ticks: tick,
                };
            }
        }

        self.on_healing_finished()
    }

    pub fn on_healing_finished(&mut self) -> RecoveryOutcome {
        if self.shutdown.is_requested() {
            warn!("Termination requested at the end of healing");
            self.state.set(ExecutionState::Stopping);
            return RecoveryOutcome::Interrupted {
                completed_ticks: self.binding.ticks(),
            };
        }

        self.state.set(ExecutionState::Started);
        info!("Process restarted");
        self.hooks.on_restarted(&self.state);
        RecoveryOutcome::Recovered
    }
}
