//! Driver error type

use thiserror::Error;

use halo_core::CommandError;

/// Errors surfaced by the driver to its host
#[derive(Error, Debug)]
pub enum RadarError {
    /// Socket setup or send failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command could not be synthesised; nothing was sent
    #[error(transparent)]
    Command(#[from] CommandError),
}
