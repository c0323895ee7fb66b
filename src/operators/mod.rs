//! Evolutionary operators
//!
//! Selection operators usable inside a generation step.

pub mod selection;
pub mod traits;

pub mod prelude {
    pub use super::selection::*;
    pub use super::traits::*;
}
