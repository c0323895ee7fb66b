//! Genome abstraction

pub mod traits;

pub mod prelude {
    pub use super::traits::*;
}
