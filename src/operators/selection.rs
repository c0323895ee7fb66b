//! Selection operators
//!
//! Plain tournament selection and convection selection, its two-level
//! variant that runs one tournament per fitness band.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::allocation::chunk_sizes;
use crate::error::{EvoResult, EvolutionError};
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::operators::traits::SelectionOperator;
use crate::population::individual::Individual;
use crate::population::population::ascending_indices;

/// Best of `candidates` by fitness; the earliest candidate wins ties
fn fittest<G, F>(population: &[Individual<G, F>], candidates: &[usize]) -> Option<usize>
where
    G: Genome,
    F: FitnessValue,
{
    candidates.iter().copied().fold(None, |best, idx| match best {
        Some(b) if !population[idx].is_better_than(&population[b]) => Some(b),
        _ => Some(idx),
    })
}

/// Tournament selection operator
///
/// Selects the best individual from a random subset of the population.
#[derive(Clone, Debug)]
pub struct TournamentSelection {
    /// Tournament size (number of individuals competing)
    pub tournament_size: usize,
}

impl TournamentSelection {
    /// Create a new tournament selection with the given size
    pub fn new(tournament_size: usize) -> EvoResult<Self> {
        if tournament_size < 1 {
            return Err(EvolutionError::InvalidConfiguration(
                "tournament size must be at least 1".to_string(),
            ));
        }
        Ok(Self { tournament_size })
    }
}

impl<G, F> SelectionOperator<G, F> for TournamentSelection
where
    G: Genome,
    F: FitnessValue,
{
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual<G, F>],
        rng: &mut R,
    ) -> EvoResult<usize> {
        if population.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }

        let tournament_size = self.tournament_size.min(population.len());
        let indices: Vec<usize> = (0..population.len()).collect();
        let tournament: Vec<usize> = indices
            .choose_multiple(rng, tournament_size)
            .copied()
            .collect();

        fittest(population, &tournament).ok_or(EvolutionError::EmptyPopulation)
    }
}

/// Convection selection
///
/// Sorts the population by fitness and cuts it into `number_of_divisions`
/// contiguous bands. Each band holds a tournament of `tournament_size`
/// draws with replacement, and the fittest band winner is selected. Small
/// bands still draw the full tournament, so their few members are drawn
/// repeatedly.
#[derive(Clone, Debug)]
pub struct ConvectionSelection {
    /// Draws per band tournament
    pub tournament_size: usize,
    /// Number of fitness bands
    pub number_of_divisions: usize,
}

impl ConvectionSelection {
    /// Create a new convection selection
    pub fn new(tournament_size: usize, number_of_divisions: usize) -> EvoResult<Self> {
        if tournament_size < 1 {
            return Err(EvolutionError::InvalidConfiguration(
                "tournament size must be at least 1".to_string(),
            ));
        }
        if number_of_divisions < 1 {
            return Err(EvolutionError::InvalidConfiguration(
                "number of divisions must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            tournament_size,
            number_of_divisions,
        })
    }

    /// Indices of each fitness band, worst band first.
    ///
    /// Bands are empty when there are fewer individuals than divisions.
    pub fn bands<G, F>(&self, population: &[Individual<G, F>]) -> Vec<Vec<usize>>
    where
        G: Genome,
        F: FitnessValue,
    {
        let order = ascending_indices(population);
        let mut remaining = order.into_iter();
        chunk_sizes(population.len(), self.number_of_divisions)
            .into_iter()
            .map(|size| remaining.by_ref().take(size).collect())
            .collect()
    }

    /// Run the band tournaments and return the overall winner
    pub fn select_next<'a, G, F, R>(
        &self,
        population: &'a [Individual<G, F>],
        rng: &mut R,
    ) -> EvoResult<&'a Individual<G, F>>
    where
        G: Genome,
        F: FitnessValue,
        R: Rng + ?Sized,
    {
        let idx = self.select(population, rng)?;
        Ok(&population[idx])
    }
}

impl<G, F> SelectionOperator<G, F> for ConvectionSelection
where
    G: Genome,
    F: FitnessValue,
{
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual<G, F>],
        rng: &mut R,
    ) -> EvoResult<usize> {
        if population.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }

        let mut winners = Vec::with_capacity(self.number_of_divisions);
        for band in self.bands(population).iter().filter(|b| !b.is_empty()) {
            let draws: Vec<usize> = (0..self.tournament_size)
                .filter_map(|_| band.choose(rng).copied())
                .collect();
            if let Some(winner) = fittest(population, &draws) {
                winners.push(winner);
            }
        }

        fittest(population, &winners).ok_or(EvolutionError::EmptyPopulation)
    }
}
