// Crash detection and the tick-based healing loop run after an abnormal restart.

pub mod binding;
pub use binding::RecoveryBinding;

pub mod errors;
pub use errors::RecoveryError;

pub mod marker;
pub use marker::{CrashMarker, PreviousRun};

pub mod supervisor;
pub use supervisor::{
    HealingHooks, NoopHooks, RecoveryOutcome, RecoverySupervisor, CANCELLATION_CHECK_EVERY,
};
