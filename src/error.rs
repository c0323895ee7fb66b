//! Error types for convection-evo
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// IO error during checkpoint
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Checkpoint version is too new
    #[error("Checkpoint version {found} is newer than supported version {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    /// Checkpoint file not found
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// Corrupted checkpoint data
    #[error("Corrupted checkpoint: {0}")]
    Corrupted(String),
}

/// Top-level error type for evolution operations
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Invalid configuration (bad partition count, non-positive sizes, wrong lifecycle phase)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Empty population
    #[error("Empty population")]
    EmptyPopulation,

    /// Writing a checkpoint failed; the run stops here
    #[error("Failed to save checkpoint '{}': {source}", path.display())]
    CheckpointWrite {
        /// Destination the checkpoint was meant to replace
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: CheckpointError,
    },

    /// Reading a checkpoint failed
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Failure raised by a pluggable step (generation, statistics, constructor)
    #[error("Step failed: {0}")]
    Step(String),
}

/// Result type alias for evolution operations
pub type EvoResult<T> = Result<T, EvolutionError>;
