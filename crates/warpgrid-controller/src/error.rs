//! Controller error types.

use thiserror::Error;

use warpgrid_autoscale::ScaleError;

/// Errors that can occur while reconciling workloads or loading config.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("scale error: {0}")]
    Scale(#[from] ScaleError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type ControllerResult<T> = Result<T, ControllerError>;
