//! Operator traits
//!
//! This module defines the selection trait used by generation steps.

use rand::Rng;

use crate::error::EvoResult;
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::population::individual::Individual;

/// Selection operator trait
///
/// Selects individuals from a population for reproduction.
pub trait SelectionOperator<G, F = f64>: Send + Sync
where
    G: Genome,
    F: FitnessValue,
{
    /// Select a single individual from the population
    ///
    /// Returns the index of the selected individual.
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual<G, F>],
        rng: &mut R,
    ) -> EvoResult<usize>;

    /// Select multiple individuals from the population
    fn select_many<R: Rng + ?Sized>(
        &self,
        population: &[Individual<G, F>],
        count: usize,
        rng: &mut R,
    ) -> EvoResult<Vec<usize>> {
        (0..count).map(|_| self.select(population, rng)).collect()
    }
}
