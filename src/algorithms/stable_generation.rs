//! Selection-driven generation step
//!
//! Draws parents from an island with a selection operator and hands them to a
//! reproduction pipeline. By default the next generation has the same size
//! as the island it came from.

use rand::RngCore;
use tracing::trace;

use crate::error::EvoResult;
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::operators::traits::SelectionOperator;
use crate::population::population::Island;
use crate::steps::GenerationStep;

/// Generation step: select parents, then reproduce
#[derive(Clone, Debug)]
pub struct StableGeneration<S, P> {
    selection: S,
    reproduction: P,
    population_size: Option<usize>,
}

impl<S, P> StableGeneration<S, P> {
    /// Select as many parents as the island holds
    pub fn new(selection: S, reproduction: P) -> Self {
        Self {
            selection,
            reproduction,
            population_size: None,
        }
    }

    /// Select a fixed number of parents regardless of island size
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = Some(size);
        self
    }

    /// The selection operator
    pub fn selection(&self) -> &S {
        &self.selection
    }
}

impl<G, F, S, P> GenerationStep<G, F> for StableGeneration<S, P>
where
    G: Genome,
    F: FitnessValue,
    S: SelectionOperator<G, F>,
    P: GenerationStep<G, F>,
{
    fn init(&mut self) -> EvoResult<()> {
        self.reproduction.init()
    }

    fn advance(&self, island: Island<G, F>, rng: &mut dyn RngCore) -> EvoResult<Island<G, F>> {
        // Nothing to select from; an empty island stays empty.
        if island.is_empty() {
            return Ok(island);
        }

        let count = self.population_size.unwrap_or(island.len());
        let parents: Island<G, F> = self
            .selection
            .select_many(&island, count, &mut *rng)?
            .into_iter()
            .map(|idx| island[idx].clone())
            .collect();

        trace!(parents = parents.len(), "selected parents");
        self.reproduction.advance(parents, rng)
    }
}
