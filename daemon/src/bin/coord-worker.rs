use anyhow::Result;
use clap::Parser;
use coord_core::ShutdownSignal;
use coord_daemon::telemetry::init_tracing;
use coord_daemon::worker::{run_worker, WorkerArgs};
use tracing::{error, info};

fn main() -> Result<()> {
    let args = WorkerArgs::parse();
    init_tracing(&args.common.log_level);

    info!("Starting coord worker...");
    let shutdown = ShutdownSignal::install()?;

    if let Err(e) = run_worker(args, shutdown) {
        error!("coord worker failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
