use crate::cli::CommonArgs;
use anyhow::{Context, Result};
use clap::Parser;
use coord_core::{ExecutionState, ServiceName, ShutdownSignal, Sleeper, StateHandle, ThreadSleeper};
use coord_ipc::{wait_for, Announce, Sender, SocketDirectory, WaitError};
use coord_recovery::{
    CrashMarker, HealingHooks, RecoveryBinding, RecoveryOutcome, RecoverySupervisor,
};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "coord-worker",
    about = "Worker that reports its execution state to coord-daemon",
    version
)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long, env = "COORD_WORKER_NAME")]
    /// Label reported to the daemon and crash marker instance (defaults to
    /// worker-<pid> for reports and "worker" for the marker)
    pub name: Option<String>,

    #[arg(long, default_value_t = 0)]
    /// Work cycles to run before exiting; 0 runs until terminated
    pub cycles: u64,

    #[arg(long, default_value_t = 1000)]
    /// Time spent in each of the working and idle phases, in milliseconds
    pub phase_ms: u64,
}

/// Reports the recovered state to the daemon once healing ends.
pub struct WorkerHooks<'a> {
    sender: &'a Sender,
    label: &'a str,
}

impl<'a> WorkerHooks<'a> {
    pub fn new(sender: &'a Sender, label: &'a str) -> Self {
        Self { sender, label }
    }
}

impl HealingHooks for WorkerHooks<'_> {
    fn on_restarted(&mut self, _state: &StateHandle) {
        report(self.sender, self.label);
    }
}

/// Reports the current state to the daemon, logging instead of failing.
/// Crash marker instance for a worker. Unnamed workers share one stable
/// instance so a restart finds the marker its crashed predecessor left.
fn marker_instance(name: Option<&str>) -> &str {
    name.unwrap_or(ServiceName::Worker.as_str())
}

fn report(sender: &Sender, label: &str) {
    if let Err(e) = sender.send_current_state(ServiceName::Daemon, label) {
        warn!(error = %e, state = %sender.state().get(), "Failed to report state");
    }
}

pub fn run_worker(args: WorkerArgs, shutdown: ShutdownSignal) -> Result<()> {
    let config = args.common.load_config()?;
    let directory = SocketDirectory::from_config(&config)?;
    directory
        .ensure_exists()
        .with_context(|| format!("Failed to create socket directory {}", directory.base_dir().display()))?;

    let label = args
        .name
        .clone()
        .unwrap_or_else(|| format!("worker-{}", std::process::id()));
    let state = StateHandle::new(ExecutionState::Started);
    let sender = Sender::new(directory.clone(), state.clone());
    let (marker, previous) =
        CrashMarker::acquire(directory.base_dir(), marker_instance(args.name.as_deref()))?;

    if previous.crashed() {
        let mut supervisor = RecoverySupervisor::new(
            RecoveryBinding::from_config(&config.recovery),
            state.clone(),
            shutdown.clone(),
            ThreadSleeper,
            WorkerHooks::new(&sender, &label),
        );
        if let RecoveryOutcome::Interrupted { completed_ticks } = supervisor.handle_recovery_after_crash() {
            info!(completed_ticks, "Shutting down during healing");
            marker.release()?;
            return Ok(());
        }
    }

    let waited = wait_for(
        &sender,
        ServiceName::Daemon,
        &label,
        config.wait.interval(),
        config.wait.max_attempts,
        &shutdown,
        &ThreadSleeper,
    );
    match waited {
        Ok(attempt) => info!(attempt, "Connected to daemon"),
        Err(WaitError::Cancelled { .. }) => {
            info!("Shutdown requested while waiting for the daemon");
            marker.release()?;
            return Ok(());
        }
        Err(e) => {
            marker.release()?;
            return Err(e).context("Daemon is unreachable");
        }
    }

    let completed = work(&sender, &label, &args, &shutdown, &ThreadSleeper);
    info!(completed, "Worker stopping");
    state.set(ExecutionState::Stopping);
    report(&sender, &label);
    marker.release()?;
    Ok(())
}

/// Alternates working and idle phases, reporting each transition. Returns the
/// number of completed cycles.
fn work<S: Sleeper>(
    sender: &Sender,
    label: &str,
    args: &WorkerArgs,
    shutdown: &ShutdownSignal,
    sleeper: &S,
) -> u64 {
    let phase = Duration::from_millis(args.phase_ms);
    let mut completed = 0;

    while args.cycles == 0 || completed < args.cycles {
        for next in [ExecutionState::Working, ExecutionState::Idle] {
            sender.state().set(next);
            report(sender, label);
            sleeper.sleep(phase);
            if shutdown.is_requested() {
                return completed;
            }
        }
        completed += 1;
    }
    completed
}
