//! # convection-evo
//!
//! Island-model scheduling for evolutionary algorithms.
//!
//! A population is periodically split into islands that evolve independently
//! and are merged back together. How individuals are assigned to islands is a
//! [`SplitPolicy`](allocation::SplitPolicy): equal numbers, equal numbers
//! drawn at random, or equal-width fitness bands. The scheduler state can be
//! checkpointed atomically and resumed.
//!
//! ## Core Concepts
//!
//! - **Islands are transient**: membership is recomputed at every split
//! - **Pluggable steps**: population construction, statistics, per-island
//!   generations and end-of-run reduction are supplied by the caller
//! - **Convection selection**: tournament winners drawn from fitness bands
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use convection_evo::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//!
//! let mut scheduler = IslandScheduler::builder()
//!     .population_size(100)
//!     .num_islands(5)
//!     .merge_period(10)
//!     .split_policy(SplitPolicy::EqualWidth)
//!     .constructor_fn(random_population)
//!     .generation_step(StableGeneration::new(
//!         ConvectionSelection::new(3, 4)?,
//!         reproduce,
//!     ))
//!     .build()?;
//!
//! scheduler.init(&mut rng)?;
//! let population = scheduler.run(100, &mut rng)?;
//! ```

pub mod algorithms;
pub mod allocation;
pub mod checkpoint;
pub mod diagnostics;
pub mod error;
pub mod fitness;
pub mod genome;
pub mod operators;
pub mod population;
pub mod steps;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::allocation::*;
    pub use crate::checkpoint::prelude::*;
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::population::prelude::*;
    pub use crate::steps::*;
}
