use thiserror::Error;

/// Errors shared by every coord crate
#[derive(Error, Debug)]
pub enum CoordError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("Signal Handler Error: {0}")]
    SignalError(#[from] ctrlc::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Result type for coord-core operations
pub type CoordResult<T> = Result<T, CoordError>;
