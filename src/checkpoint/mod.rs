//! Checkpointing support for scheduler state persistence
//!
//! This module provides atomic serialization and recovery of scheduler state,
//! so long-running runs survive crashes and can be resumed.

mod recovery;
mod state;

pub use recovery::*;
pub use state::*;

/// Prelude for checkpoint module
pub mod prelude {
    pub use super::recovery::*;
    pub use super::state::*;
}
