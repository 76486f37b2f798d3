use anyhow::Result;
use clap::Parser;
use coord_core::ShutdownSignal;
use coord_daemon::daemon::{run_daemon, DaemonArgs};
use coord_daemon::telemetry::init_tracing;
use tracing::{error, info};

fn main() -> Result<()> {
    let args = DaemonArgs::parse();
    init_tracing(&args.common.log_level);

    info!("Starting coord daemon...");
    let shutdown = ShutdownSignal::install()?;

    if let Err(e) = run_daemon(args, shutdown) {
        error!("coord daemon failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
