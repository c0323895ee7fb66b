//! Diagnostics and statistics
//!
//! A ready-made statistics step. The scheduler runs its statistics pipeline
//! before and after every island advance and once on each merged population.
//! [`StatsRecorder`] records a [`PopulationStats`] row per observation and
//! never changes membership.

use std::sync::{Arc, Mutex, MutexGuard};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvoResult, EvolutionError};
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::population::individual::Individual;
use crate::population::population::Population;
use crate::steps::PopulationStep;

/// Fitness summary of one observed (sub)population
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    /// Sequence number of this observation since the last reset
    pub observation: usize,
    /// Number of individuals observed
    pub size: usize,
    /// Best fitness
    pub best_fitness: f64,
    /// Worst fitness
    pub worst_fitness: f64,
    /// Mean fitness
    pub mean_fitness: f64,
    /// Median fitness
    pub median_fitness: f64,
    /// Fitness standard deviation (sample)
    pub fitness_std: f64,
}

impl PopulationStats {
    /// Compute statistics from a slice of individuals
    pub fn from_individuals<G, F>(individuals: &[Individual<G, F>], observation: usize) -> Self
    where
        G: Genome,
        F: FitnessValue,
    {
        let mut fitnesses: Vec<f64> = individuals.iter().map(Individual::fitness_f64).collect();

        if fitnesses.is_empty() {
            return Self {
                observation,
                size: 0,
                best_fitness: f64::NEG_INFINITY,
                worst_fitness: f64::INFINITY,
                mean_fitness: 0.0,
                median_fitness: 0.0,
                fitness_std: 0.0,
            };
        }

        fitnesses.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = fitnesses.len();
        let best = fitnesses[n - 1];
        let worst = fitnesses[0];
        let mean = fitnesses.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (fitnesses[n / 2 - 1] + fitnesses[n / 2]) / 2.0
        } else {
            fitnesses[n / 2]
        };

        let variance = if n > 1 {
            fitnesses.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        Self {
            observation,
            size: n,
            best_fitness: best,
            worst_fitness: worst,
            mean_fitness: mean,
            median_fitness: median,
            fitness_std: variance.sqrt(),
        }
    }
}

/// Shared handle to the rows recorded by a [`StatsRecorder`]
#[derive(Clone, Debug, Default)]
pub struct StatsHistory {
    rows: Arc<Mutex<Vec<PopulationStats>>>,
}

impl StatsHistory {
    fn lock(&self) -> EvoResult<MutexGuard<'_, Vec<PopulationStats>>> {
        self.rows
            .lock()
            .map_err(|_| EvolutionError::Step("statistics history lock poisoned".to_string()))
    }

    /// Copy of all recorded rows
    pub fn snapshot(&self) -> EvoResult<Vec<PopulationStats>> {
        Ok(self.lock()?.clone())
    }

    /// Number of recorded rows
    pub fn len(&self) -> EvoResult<usize> {
        Ok(self.lock()?.len())
    }

    /// Best fitness seen across every observation
    pub fn best_fitness(&self) -> EvoResult<Option<f64>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|row| row.size > 0)
            .map(|row| row.best_fitness)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)))
    }
}

/// Statistics step that records one row per observed population
#[derive(Debug, Default)]
pub struct StatsRecorder {
    history: StatsHistory,
    observations: usize,
}

impl StatsRecorder {
    /// Create a new recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for reading the recorded rows while the recorder is owned by a scheduler
    pub fn history(&self) -> StatsHistory {
        self.history.clone()
    }
}

impl<G, F> PopulationStep<G, F> for StatsRecorder
where
    G: Genome,
    F: FitnessValue,
{
    fn init(&mut self) -> EvoResult<()> {
        self.observations = 0;
        self.history.lock()?.clear();
        Ok(())
    }

    fn apply(
        &mut self,
        population: Population<G, F>,
        _rng: &mut dyn RngCore,
    ) -> EvoResult<Population<G, F>> {
        let stats = PopulationStats::from_individuals(&population, self.observations);
        self.observations += 1;

        debug!(
            observation = stats.observation,
            size = stats.size,
            best = stats.best_fitness,
            mean = stats.mean_fitness,
            "population statistics"
        );
        self.history.lock()?.push(stats);
        Ok(population)
    }
}

pub mod prelude {
    pub use super::{PopulationStats, StatsHistory, StatsRecorder};
}
