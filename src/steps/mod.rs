//! Pluggable steps
//!
//! The scheduler is driven by collaborators it does not implement itself:
//!
//! - a [`GenerationStep`] advances one island by one generation;
//! - population constructors, statistics passes and end-of-run reductions
//!   are whole-population transformations, expressed as [`Step`]s and chained
//!   with [`UnionStep`].
//!
//! A [`Step`] is either a plain function or a stateful object with an
//! explicit `init` hook. `UnionStep::init` calls each hook once; `apply`
//! threads the output of one stage into the next.

use rand::RngCore;

use crate::error::EvoResult;
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::population::population::{Island, Population};

/// Advances one island by one generation.
///
/// Implementations may change the island's size. `advance` takes `&self` so
/// islands can be advanced on independent workers; all randomness must come
/// from the supplied generator.
pub trait GenerationStep<G, F = f64>: Send + Sync
where
    G: Genome,
    F: FitnessValue,
{
    /// Called once before the first generation
    fn init(&mut self) -> EvoResult<()> {
        Ok(())
    }

    /// Produce the next generation of `island`
    fn advance(&self, island: Island<G, F>, rng: &mut dyn RngCore) -> EvoResult<Island<G, F>>;
}

/// Generation step backed by a closure
pub struct FnGeneration<Func> {
    func: Func,
}

impl<Func> FnGeneration<Func> {
    /// Wrap a closure as a generation step
    pub fn new<G, F>(func: Func) -> Self
    where
        G: Genome,
        F: FitnessValue,
        Func: Fn(Island<G, F>, &mut dyn RngCore) -> EvoResult<Island<G, F>> + Send + Sync,
    {
        Self { func }
    }
}

impl<G, F, Func> GenerationStep<G, F> for FnGeneration<Func>
where
    G: Genome,
    F: FitnessValue,
    Func: Fn(Island<G, F>, &mut dyn RngCore) -> EvoResult<Island<G, F>> + Send + Sync,
{
    fn advance(&self, island: Island<G, F>, rng: &mut dyn RngCore) -> EvoResult<Island<G, F>> {
        (self.func)(island, rng)
    }
}

/// Stateful whole-population step with an explicit reset hook
pub trait PopulationStep<G, F = f64>: Send
where
    G: Genome,
    F: FitnessValue,
{
    /// Reset internal state; called once per `init` of the owning pipeline
    fn init(&mut self) -> EvoResult<()> {
        Ok(())
    }

    /// Transform the population
    fn apply(
        &mut self,
        population: Population<G, F>,
        rng: &mut dyn RngCore,
    ) -> EvoResult<Population<G, F>>;
}

/// Boxed population-transforming function
pub type StepFn<G, F> = Box<dyn FnMut(Population<G, F>) -> EvoResult<Population<G, F>> + Send>;

/// One stage of a population pipeline
pub enum Step<G, F = f64>
where
    G: Genome,
    F: FitnessValue,
{
    /// Pure function of the population
    Function(StepFn<G, F>),
    /// Stateful step with an init hook
    Stateful(Box<dyn PopulationStep<G, F>>),
}

impl<G, F> Step<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    /// Stage from a function
    pub fn function<Func>(func: Func) -> Self
    where
        Func: FnMut(Population<G, F>) -> EvoResult<Population<G, F>> + Send + 'static,
    {
        Self::Function(Box::new(func))
    }

    /// Stage from a stateful step
    pub fn stateful<P>(step: P) -> Self
    where
        P: PopulationStep<G, F> + 'static,
    {
        Self::Stateful(Box::new(step))
    }

    fn init(&mut self) -> EvoResult<()> {
        match self {
            Self::Function(_) => Ok(()),
            Self::Stateful(step) => step.init(),
        }
    }

    fn apply(
        &mut self,
        population: Population<G, F>,
        rng: &mut dyn RngCore,
    ) -> EvoResult<Population<G, F>> {
        match self {
            Self::Function(func) => func(population),
            Self::Stateful(step) => step.apply(population, rng),
        }
    }
}

impl<G, F> std::fmt::Debug for Step<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Step::Function"),
            Self::Stateful(_) => f.write_str("Step::Stateful"),
        }
    }
}

/// Sequential union of steps
///
/// An empty union is the identity.
#[derive(Debug)]
pub struct UnionStep<G, F = f64>
where
    G: Genome,
    F: FitnessValue,
{
    stages: Vec<Step<G, F>>,
}

impl<G, F> UnionStep<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    /// Create an empty union
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage
    pub fn then(mut self, stage: Step<G, F>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a stage in place
    pub fn push(&mut self, stage: Step<G, F>) {
        self.stages.push(stage);
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the union has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<G, F> Default for UnionStep<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<G, F> From<Vec<Step<G, F>>> for UnionStep<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    fn from(stages: Vec<Step<G, F>>) -> Self {
        Self { stages }
    }
}

impl<G, F> PopulationStep<G, F> for UnionStep<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    fn init(&mut self) -> EvoResult<()> {
        self.stages.iter_mut().try_for_each(Step::init)
    }

    fn apply(
        &mut self,
        population: Population<G, F>,
        rng: &mut dyn RngCore,
    ) -> EvoResult<Population<G, F>> {
        self.stages
            .iter_mut()
            .try_fold(population, |population, stage| stage.apply(population, &mut *rng))
    }
}
