//! # Sample Error Types

use thiserror::Error;

use tessera_core::WorldError;

/// Errors raised while setting up or running the sample simulation.
#[derive(Error, Debug)]
pub enum SampleError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was requested.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration did not parse or holds out-of-range values.
    #[error("invalid sample configuration: {0}")]
    InvalidConfig(String),

    /// The world rejected an operation.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Result alias for the sample crate.
pub type SampleResult<T> = Result<T, SampleError>;
