use crate::cli::CommonArgs;
use anyhow::{Context, Result};
use clap::Parser;
use coord_core::{ExecutionState, ServiceName, ShutdownSignal, StateHandle, ThreadSleeper};
use coord_ipc::{Announce, Receiver, SocketDirectory};
use coord_recovery::{
    CrashMarker, HealingHooks, RecoveryBinding, RecoveryOutcome, RecoverySupervisor,
};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

#[derive(Parser, Debug)]
#[command(
    name = "coord-daemon",
    about = "Collects execution-state reports from sibling workers",
    version
)]
pub struct DaemonArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long, env = "COORD_POLL_INTERVAL_MS")]
    /// How often to drain the inbox, in milliseconds
    pub poll_interval_ms: Option<u64>,

    #[arg(long, value_delimiter = ',')]
    /// Services told about this daemon's state after it recovers from a crash
    pub notify: Vec<ServiceName>,
}

/// Healing hooks for the daemon; they hold the receiver while it heals.
pub struct DaemonHooks {
    receiver: Receiver,
    notify: Vec<ServiceName>,
}

impl DaemonHooks {
    pub fn new(receiver: Receiver, notify: Vec<ServiceName>) -> Self {
        Self { receiver, notify }
    }

    pub fn into_receiver(self) -> Receiver {
        self.receiver
    }
}

impl HealingHooks for DaemonHooks {
    fn before_healing_start(&mut self) {
        // Anything queued or remembered predates the crash.
        match self.receiver.transport().receive() {
            Ok(stale) if !stale.is_empty() => {
                info!("Discarded {} datagrams queued before healing", stale.len())
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to discard queued datagrams"),
        }
        self.receiver.clear_siblings();
    }

    fn on_restarted(&mut self, state: &StateHandle) {
        let label = self.receiver.identity().as_str();
        for service in &self.notify {
            match self.receiver.send_current_state(*service, label) {
                Ok(()) => debug!(%service, state = %state.get(), "Announced restart"),
                Err(e) => warn!(%service, error = %e, "Failed to announce restart"),
            }
        }
    }
}

/// Binds the inbox, heals if the last run crashed, then polls until shutdown.
pub fn run_daemon(args: DaemonArgs, shutdown: ShutdownSignal) -> Result<()> {
    let mut config = args.common.load_config()?;
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    config.validate().context("Invalid configuration")?;

    let directory = SocketDirectory::from_config(&config)?;
    directory
        .ensure_exists()
        .with_context(|| format!("Failed to create socket directory {}", directory.base_dir().display()))?;

    let identity = ServiceName::Daemon;
    let (marker, previous) = CrashMarker::acquire(directory.base_dir(), identity.as_str())?;
    let state = StateHandle::new(ExecutionState::Started);
    let receiver = match Receiver::bind(identity, directory, state.clone()) {
        Ok(receiver) => receiver,
        Err(e) => {
            // A failed bind is a startup failure, not a crash to heal from,
            // but an earlier crash stays recorded for the next start.
            if !previous.crashed() {
                marker.release()?;
            }
            return Err(e).context("Failed to bind daemon socket");
        }
    };

    let receiver = if previous.crashed() {
        let mut supervisor = RecoverySupervisor::new(
            RecoveryBinding::from_config(&config.recovery),
            state.clone(),
            shutdown.clone(),
            ThreadSleeper,
            DaemonHooks::new(receiver, args.notify.clone()),
        );
        let outcome = supervisor.handle_recovery_after_crash();
        let receiver = supervisor.into_hooks().into_receiver();
        if let RecoveryOutcome::Interrupted { completed_ticks } = outcome {
            info!(completed_ticks, "Shutting down during healing");
            marker.release()?;
            return Ok(());
        }
        receiver
    } else {
        receiver
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to build runtime")?;
    state.set(ExecutionState::Working);
    let receiver = runtime.block_on(serve(receiver, config.poll_interval(), shutdown));

    state.set(ExecutionState::Stopping);
    info!(siblings = receiver.siblings().len(), "Daemon stopped");
    drop(receiver);
    marker.release()?;
    Ok(())
}

/// Drains the inbox once per tick. Transport errors are logged, never fatal.
///
/// Polls at least once, and returns within one tick of `shutdown` being raised.
#[instrument(skip_all, fields(path = %receiver.socket_path().display()))]
pub async fn serve(mut receiver: Receiver, poll_interval: Duration, shutdown: ShutdownSignal) -> Receiver {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match receiver.poll_inbox() {
            Ok(report) if !report.is_empty() => debug!(
                events = report.events.len(),
                rejected = report.rejected,
                invalid_states = report.invalid_states,
                "Processed inbox"
            ),
            Ok(_) => {}
            Err(e) => error!(error = %e, "Failed to drain IPC inbox"),
        }
        if shutdown.is_requested() {
            info!("Shutdown requested, leaving poll loop");
            break;
        }
    }
    receiver
}
