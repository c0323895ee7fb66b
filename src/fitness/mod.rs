//! Fitness values
//!
//! Fitness is assigned by an external evaluator; this crate only reads it.

pub mod traits;

pub mod prelude {
    pub use super::traits::*;
}
