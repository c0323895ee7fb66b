//! Individual wrapper type
//!
//! This module provides the Individual type that pairs a genome with its fitness.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;

/// An individual in the population
///
/// The fitness is assigned by an external evaluator. Within one scheduling
/// decision it is treated as stable; the genome may still be rewritten by
/// variation operators between generations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Individual<G, F = f64>
where
    G: Genome,
    F: FitnessValue,
{
    /// The genome of this individual
    pub genome: G,
    /// The fitness value
    pub fitness: F,
}

impl<G, F> Individual<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    /// Create a new individual with a known fitness
    pub fn new(genome: G, fitness: F) -> Self {
        Self { genome, fitness }
    }

    /// Get the fitness as f64
    pub fn fitness_f64(&self) -> f64 {
        self.fitness.to_f64()
    }

    /// Set the fitness value
    pub fn set_fitness(&mut self, fitness: F) {
        self.fitness = fitness;
    }

    /// Take the genome out of this individual
    pub fn into_genome(self) -> G {
        self.genome
    }

    /// Get a reference to the genome
    pub fn genome(&self) -> &G {
        &self.genome
    }

    /// Get a mutable reference to the genome
    pub fn genome_mut(&mut self) -> &mut G {
        &mut self.genome
    }

    /// Check if this individual is better than another
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.fitness.is_better_than(&other.fitness)
    }

    /// Fitness ordering, ascending (worst first)
    pub fn cmp_fitness(&self, other: &Self) -> Ordering {
        self.fitness.compare(&other.fitness)
    }
}

impl<G, F> PartialEq for Individual<G, F>
where
    G: Genome + PartialEq,
    F: FitnessValue,
{
    fn eq(&self, other: &Self) -> bool {
        self.genome == other.genome && self.fitness == other.fitness
    }
}

impl<G, F> PartialOrd for Individual<G, F>
where
    G: Genome + PartialEq,
    F: FitnessValue,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.fitness.partial_cmp(&other.fitness)
    }
}
