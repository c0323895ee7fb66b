//! Population helpers
//!
//! A population is a plain ordered sequence of individuals. Islands use the
//! same representation; their index is only meaningful for logging.

use crate::error::{EvoResult, EvolutionError};
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::population::individual::Individual;

/// A population of individuals
pub type Population<G, F = f64> = Vec<Individual<G, F>>;

/// A subpopulation evolved in isolation between merges
pub type Island<G, F = f64> = Vec<Individual<G, F>>;

/// Sort individuals ascending by fitness (worst first).
///
/// The sort is stable, so ties keep their incoming order.
pub fn sort_ascending<G, F>(individuals: &mut [Individual<G, F>])
where
    G: Genome,
    F: FitnessValue,
{
    individuals.sort_by(|a, b| a.cmp_fitness(b));
}

/// Indices of `individuals` ordered ascending by fitness, stable on ties
pub fn ascending_indices<G, F>(individuals: &[Individual<G, F>]) -> Vec<usize>
where
    G: Genome,
    F: FitnessValue,
{
    let mut indices: Vec<usize> = (0..individuals.len()).collect();
    indices.sort_by(|&a, &b| individuals[a].cmp_fitness(&individuals[b]));
    indices
}

/// Index of the best individual. The first one wins on ties.
pub fn best_index<G, F>(individuals: &[Individual<G, F>]) -> Option<usize>
where
    G: Genome,
    F: FitnessValue,
{
    let mut best: Option<usize> = None;
    for (i, individual) in individuals.iter().enumerate() {
        match best {
            Some(b) if !individual.is_better_than(&individuals[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Worst and best individual, by index
pub fn fitness_extrema<G, F>(individuals: &[Individual<G, F>]) -> EvoResult<(usize, usize)>
where
    G: Genome,
    F: FitnessValue,
{
    let first = individuals.first().ok_or(EvolutionError::EmptyPopulation)?;
    let (mut worst, mut best) = (0, 0);
    let (mut worst_fit, mut best_fit) = (&first.fitness, &first.fitness);
    for (i, individual) in individuals.iter().enumerate().skip(1) {
        if individual.fitness.is_worse_than(worst_fit) {
            worst = i;
            worst_fit = &individual.fitness;
        }
        if individual.fitness.is_better_than(best_fit) {
            best = i;
            best_fit = &individual.fitness;
        }
    }
    Ok((worst, best))
}

/// Concatenate islands back into one population, island 0 first
pub fn merge_islands<G, F>(islands: Vec<Island<G, F>>) -> Population<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    let total = islands.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    for island in islands {
        merged.extend(island);
    }
    merged
}
