//! Evolutionary algorithms
//!
//! The island scheduler and a selection-driven generation step for it.

pub mod island;
pub mod stable_generation;

pub mod prelude {
    pub use super::island::*;
    pub use super::stable_generation::*;
}
