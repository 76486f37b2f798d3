pub mod cli;
pub mod daemon;
pub mod telemetry;
pub mod worker;
