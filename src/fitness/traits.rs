//! Fitness traits
//!
//! This module defines the fitness value bound and the evaluation trait used
//! by generation steps.

use std::cmp::Ordering;
use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::genome::traits::Genome;

/// Trait bound for fitness values
///
/// Fitness values must be comparable and convertible to f64 so that
/// equal-width allocation can place them on a number line. They must also be
/// serializable for checkpointing. Higher is better.
pub trait FitnessValue:
    PartialOrd + Clone + Send + Sync + Debug + Serialize + DeserializeOwned + 'static
{
    /// Convert fitness to f64 for interval arithmetic
    fn to_f64(&self) -> f64;

    /// Check if this fitness is better than another
    fn is_better_than(&self, other: &Self) -> bool;

    /// Check if this fitness is worse than another
    fn is_worse_than(&self, other: &Self) -> bool {
        other.is_better_than(self)
    }

    /// Total order used for sorting; incomparable values (NaN) compare equal
    fn compare(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

impl FitnessValue for f64 {
    fn to_f64(&self) -> f64 {
        *self
    }

    fn is_better_than(&self, other: &Self) -> bool {
        self > other
    }
}

impl FitnessValue for f32 {
    fn to_f64(&self) -> f64 {
        *self as f64
    }

    fn is_better_than(&self, other: &Self) -> bool {
        self > other
    }
}

impl FitnessValue for i64 {
    fn to_f64(&self) -> f64 {
        *self as f64
    }

    fn is_better_than(&self, other: &Self) -> bool {
        self > other
    }
}

impl FitnessValue for i32 {
    fn to_f64(&self) -> f64 {
        *self as f64
    }

    fn is_better_than(&self, other: &Self) -> bool {
        self > other
    }
}

impl FitnessValue for usize {
    fn to_f64(&self) -> f64 {
        *self as f64
    }

    fn is_better_than(&self, other: &Self) -> bool {
        self > other
    }
}

/// Fitness evaluation
///
/// The scheduler never calls this itself. Generation steps use it to score
/// offspring before they re-enter an island.
pub trait Fitness: Send + Sync {
    /// The genome type being evaluated
    type Genome: Genome;
    /// The fitness value type
    type Value: FitnessValue;

    /// Evaluate a genome
    fn evaluate(&self, genome: &Self::Genome) -> Self::Value;
}

/// Fitness function wrapping a closure
pub struct FnFitness<G, F, Func>
where
    Func: Fn(&G) -> F + Send + Sync,
{
    func: Func,
    _phantom: std::marker::PhantomData<fn(&G) -> F>,
}

impl<G, F, Func> FnFitness<G, F, Func>
where
    Func: Fn(&G) -> F + Send + Sync,
{
    /// Create a new closure-backed fitness function
    pub fn new(func: Func) -> Self {
        Self {
            func,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<G, F, Func> Fitness for FnFitness<G, F, Func>
where
    G: Genome,
    F: FitnessValue,
    Func: Fn(&G) -> F + Send + Sync,
{
    type Genome = G;
    type Value = F;

    fn evaluate(&self, genome: &G) -> F {
        (self.func)(genome)
    }
}
