//! Island Model Scheduling
//!
//! Partitions the population into islands that evolve independently and
//! periodically pools them back together. Islands are transient: membership
//! is recomputed from the merged population at every split.
//!
//! Per generation `i` of [`IslandScheduler::run`]:
//!
//! 1. If the flat population is live (first generation of a fresh run, or the
//!    generation after a merge), split it into `num_islands` islands.
//! 2. Run the statistics pipeline on every island.
//! 3. Advance every island with the generation step.
//! 4. Run the statistics pipeline on every island again.
//! 5. If `i % merge_period == 0` or `i` is the last generation, concatenate
//!    the islands (island 0 first) and run statistics on the result.
//! 6. If checkpointing is configured and `i % checkpoint_interval == 0`,
//!    atomically save the full state.
//!
//! Islands may be advanced in parallel with the `parallel` feature; each one
//! gets its own generator seeded from the caller's, so results do not depend
//! on the feature.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::allocation::{split, SplitPolicy};
use crate::checkpoint::{
    load_checkpoint, CheckpointFormat, CheckpointStore, LiveView, SchedulerPhase, SchedulerState,
};
use crate::error::{EvoResult, EvolutionError};
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::population::individual::Individual;
use crate::population::population::{merge_islands, Island, Population};
use crate::steps::{GenerationStep, PopulationStep, Step, UnionStep};

/// Configuration for the island scheduler
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandSchedulerConfig {
    /// Expected size of the constructed population
    pub population_size: usize,
    /// Number of islands per split
    pub num_islands: usize,
    /// Generations between merges
    pub merge_period: usize,
    /// Allocation policy used at each split
    pub split_policy: SplitPolicy,
    /// Checkpoint destination; checkpointing is off unless both this and the interval are set
    pub checkpoint_path: Option<PathBuf>,
    /// Generations between checkpoints
    pub checkpoint_interval: Option<usize>,
    /// Checkpoint serialization format
    pub checkpoint_format: CheckpointFormat,
}

impl Default for IslandSchedulerConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            num_islands: 5,
            merge_period: 10,
            split_policy: SplitPolicy::EqualNumber,
            checkpoint_path: None,
            checkpoint_interval: None,
            checkpoint_format: CheckpointFormat::Binary,
        }
    }
}

impl IslandSchedulerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> EvoResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EvolutionError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every size and period is positive
    pub fn validate(&self) -> EvoResult<()> {
        let positive = [
            ("population_size", self.population_size),
            ("num_islands", self.num_islands),
            ("merge_period", self.merge_period),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(EvolutionError::InvalidConfiguration(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        if self.checkpoint_interval == Some(0) {
            return Err(EvolutionError::InvalidConfiguration(
                "checkpoint_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Individuals a split of `population_len` loses under the configured policy
    pub fn dropped_per_split(&self, population_len: usize) -> usize {
        if self.split_policy.may_drop() && self.num_islands > 0 {
            population_len % self.num_islands
        } else {
            0
        }
    }

    /// Whether generation `generation` ends with a merge
    pub fn merges_at(&self, generation: usize, last_generation: usize) -> bool {
        generation % self.merge_period == 0 || generation == last_generation
    }

    /// Checkpoint store to use after generation `generation`, if one is due
    pub fn checkpoint_due(&self, generation: usize) -> Option<CheckpointStore> {
        match (&self.checkpoint_path, self.checkpoint_interval) {
            (Some(path), Some(interval)) if generation % interval == 0 => {
                Some(CheckpointStore::new(path).with_format(self.checkpoint_format))
            }
            _ => None,
        }
    }
}

/// Island-model scheduler
///
/// Owns the population state and drives the generation loop. Collaborators
/// are code and are not part of a checkpoint; restore a checkpoint into a
/// scheduler built with the same collaborators.
pub struct IslandScheduler<G, F, S>
where
    G: Genome,
    F: FitnessValue,
    S: GenerationStep<G, F>,
{
    state: SchedulerState<G, F>,
    constructors: UnionStep<G, F>,
    generation_step: S,
    statistics: UnionStep<G, F>,
    end_steps: UnionStep<G, F>,
}

impl<G, F, S> IslandScheduler<G, F, S>
where
    G: Genome,
    F: FitnessValue,
    S: GenerationStep<G, F>,
{
    /// Current generation
    pub fn generation(&self) -> usize {
        self.state.generation
    }

    /// Lifecycle phase
    pub fn phase(&self) -> SchedulerPhase {
        self.state.phase
    }

    /// Accumulated seconds spent inside generations
    pub fn running_time(&self) -> f64 {
        self.state.running_time
    }

    /// Active configuration
    pub fn config(&self) -> &IslandSchedulerConfig {
        &self.state.config
    }

    /// Full state, as it would be checkpointed
    pub fn state(&self) -> &SchedulerState<G, F> {
        &self.state
    }

    /// Flat population, if it is the live view
    pub fn population(&self) -> Option<&[Individual<G, F>]> {
        self.state.population()
    }

    /// Islands, if they are the live view
    pub fn islands(&self) -> Option<&[Island<G, F>]> {
        self.state.islands()
    }

    fn init_collaborators(&mut self) -> EvoResult<()> {
        self.constructors.init()?;
        self.generation_step.init()?;
        self.statistics.init()?;
        self.end_steps.init()
    }

    /// Build the initial population and reset every collaborator
    pub fn init<R: Rng>(&mut self, rng: &mut R) -> EvoResult<()> {
        self.init_collaborators()?;

        let population = self.constructors.apply(Vec::new(), rng)?;
        if population.len() != self.state.config.population_size {
            warn!(
                expected = self.state.config.population_size,
                actual = population.len(),
                "constructed population size differs from configuration"
            );
        }
        let dropped = self.state.config.dropped_per_split(population.len());
        if dropped > 0 {
            warn!(
                dropped,
                policy = %self.state.config.split_policy,
                "population does not divide evenly; each split will drop individuals"
            );
        }

        self.state.generation = 0;
        self.state.view = LiveView::Population(population);
        self.state.phase = SchedulerPhase::Initialized;
        info!(size = self.state.view.len(), "population initialized");
        Ok(())
    }

    /// Run generations `generation + 1 ..= num_generations` and return the
    /// terminal population.
    ///
    /// Resumes where a restored checkpoint left off. Any collaborator error
    /// or checkpoint failure aborts the run and is returned unchanged. A
    /// generation that fails leaves the state as it was before that
    /// generation, so `run` may be called again.
    pub fn run<R: Rng>(&mut self, num_generations: usize, rng: &mut R) -> EvoResult<&[Individual<G, F>]> {
        match self.state.phase {
            SchedulerPhase::Initialized | SchedulerPhase::Running => {}
            SchedulerPhase::Uninitialized => {
                return Err(EvolutionError::InvalidConfiguration(
                    "init() must be called before run()".to_string(),
                ))
            }
            SchedulerPhase::Terminated => {
                return Err(EvolutionError::InvalidConfiguration(
                    "run already terminated; call init() or restore a checkpoint".to_string(),
                ))
            }
        }
        self.state.config.validate()?;
        self.state.phase = SchedulerPhase::Running;

        for generation in self.state.generation + 1..=num_generations {
            let started = Instant::now();
            let previous = self.state.view.clone();
            self.state.generation = generation;
            if let Err(err) = self.step(generation, num_generations, rng) {
                warn!(generation, error = %err, "generation failed, state rolled back");
                self.state.view = previous;
                self.state.generation = generation - 1;
                return Err(err);
            }

            let elapsed = started.elapsed().as_secs_f64();
            self.state.running_time += elapsed;
            info!(
                generation,
                individuals = self.state.view.len(),
                elapsed,
                "generation complete"
            );

            if let Some(store) = self.state.config.checkpoint_due(generation) {
                store.save(&self.state)?;
            }
        }

        // The live view stays intact until the end steps succeed.
        let population = match &self.state.view {
            LiveView::Population(population) => population.clone(),
            LiveView::Islands(islands) => merge_islands(islands.clone()),
        };
        let population = self.end_steps.apply(population, rng)?;
        self.state.view = LiveView::Population(population);
        self.state.phase = SchedulerPhase::Terminated;

        Ok(self.state.population().unwrap_or(&[]))
    }

    fn step<R: Rng>(&mut self, generation: usize, last_generation: usize, rng: &mut R) -> EvoResult<()> {
        let config = &self.state.config;
        let (num_islands, policy) = (config.num_islands, config.split_policy);
        let merge = config.merges_at(generation, last_generation);

        let islands = match std::mem::take(&mut self.state.view) {
            LiveView::Population(population) => split(population, num_islands, policy, rng)?,
            LiveView::Islands(islands) => islands,
        };

        let islands = self.observe_islands(islands, rng)?;
        let islands = self.advance_islands(islands, rng)?;
        let islands = self.observe_islands(islands, rng)?;

        self.state.view = if merge {
            let merged = merge_islands(islands);
            debug!(generation, size = merged.len(), "merged islands");
            LiveView::Population(self.statistics.apply(merged, rng)?)
        } else {
            LiveView::Islands(islands)
        };
        Ok(())
    }

    fn observe_islands<R: Rng>(&mut self, islands: Vec<Island<G, F>>, rng: &mut R) -> EvoResult<Vec<Island<G, F>>> {
        islands
            .into_iter()
            .map(|island| self.statistics.apply(island, &mut *rng))
            .collect()
    }

    fn advance_islands<R: Rng>(&self, islands: Vec<Island<G, F>>, rng: &mut R) -> EvoResult<Vec<Island<G, F>>> {
        let seeded: Vec<(Island<G, F>, <StdRng as SeedableRng>::Seed)> =
            islands.into_iter().map(|island| (island, rng.gen())).collect();
        let step = &self.generation_step;

        #[cfg(feature = "parallel")]
        let islands = seeded.into_par_iter();
        #[cfg(not(feature = "parallel"))]
        let islands = seeded.into_iter();

        islands
            .map(|(island, seed)| step.advance(island, &mut StdRng::from_seed(seed)))
            .collect()
    }

    /// Atomically write the current state to the configured checkpoint path
    pub fn save_checkpoint(&self) -> EvoResult<()> {
        let path = self.state.config.checkpoint_path.as_ref().ok_or_else(|| {
            EvolutionError::InvalidConfiguration("no checkpoint path configured".to_string())
        })?;
        CheckpointStore::new(path)
            .with_format(self.state.config.checkpoint_format)
            .save(&self.state)
    }

    /// Replace the scheduler state with a previously saved one.
    ///
    /// Collaborators are reset through their init hooks; the population is
    /// not rebuilt. A following `run` continues from `generation + 1`.
    pub fn load_state(&mut self, state: SchedulerState<G, F>) -> EvoResult<()> {
        state.config.validate()?;
        self.init_collaborators()?;
        self.state = state;
        if self.state.phase == SchedulerPhase::Uninitialized {
            warn!("loaded state was never initialized");
        }
        Ok(())
    }

    /// Load a checkpoint file into this scheduler
    pub fn restore_checkpoint(&mut self, path: impl AsRef<Path>) -> EvoResult<()> {
        let state = load_checkpoint(path)?;
        self.load_state(state)
    }

    /// Consume the scheduler, returning its state
    pub fn into_state(self) -> SchedulerState<G, F> {
        self.state
    }
}

impl<G, F> IslandScheduler<G, F, ()>
where
    G: Genome,
    F: FitnessValue,
{
    /// Create a builder for IslandScheduler
    pub fn builder() -> IslandSchedulerBuilder<G, F, ()> {
        IslandSchedulerBuilder::new()
    }
}

/// The unit type stands in for a generation step that has not been chosen yet
impl<G, F> GenerationStep<G, F> for ()
where
    G: Genome,
    F: FitnessValue,
{
    fn advance(
        &self,
        island: Island<G, F>,
        _rng: &mut dyn rand::RngCore,
    ) -> EvoResult<Island<G, F>> {
        Ok(island)
    }
}

/// Builder for IslandScheduler
pub struct IslandSchedulerBuilder<G, F, S>
where
    G: Genome,
    F: FitnessValue,
{
    config: IslandSchedulerConfig,
    constructors: UnionStep<G, F>,
    generation_step: Option<S>,
    statistics: UnionStep<G, F>,
    end_steps: UnionStep<G, F>,
}

impl<G, F> IslandSchedulerBuilder<G, F, ()>
where
    G: Genome,
    F: FitnessValue,
{
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: IslandSchedulerConfig::default(),
            constructors: UnionStep::new(),
            generation_step: None,
            statistics: UnionStep::new(),
            end_steps: UnionStep::new(),
        }
    }
}

impl<G, F> Default for IslandSchedulerBuilder<G, F, ()>
where
    G: Genome,
    F: FitnessValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<G, F, S> IslandSchedulerBuilder<G, F, S>
where
    G: Genome,
    F: FitnessValue,
{
    /// Replace the whole configuration
    pub fn config(mut self, config: IslandSchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the expected population size
    pub fn population_size(mut self, size: usize) -> Self {
        self.config.population_size = size;
        self
    }

    /// Set number of islands
    pub fn num_islands(mut self, n: usize) -> Self {
        self.config.num_islands = n;
        self
    }

    /// Set generations between merges
    pub fn merge_period(mut self, period: usize) -> Self {
        self.config.merge_period = period;
        self
    }

    /// Set the split policy
    pub fn split_policy(mut self, policy: SplitPolicy) -> Self {
        self.config.split_policy = policy;
        self
    }

    /// Enable checkpointing every `interval` generations
    pub fn checkpoint(mut self, path: impl Into<PathBuf>, interval: usize) -> Self {
        self.config.checkpoint_path = Some(path.into());
        self.config.checkpoint_interval = Some(interval);
        self
    }

    /// Set the checkpoint format
    pub fn checkpoint_format(mut self, format: CheckpointFormat) -> Self {
        self.config.checkpoint_format = format;
        self
    }

    /// Append a population constructor
    pub fn constructor(mut self, step: Step<G, F>) -> Self {
        self.constructors.push(step);
        self
    }

    /// Append a constructor function
    pub fn constructor_fn<Func>(self, func: Func) -> Self
    where
        Func: FnMut(Population<G, F>) -> EvoResult<Population<G, F>> + Send + 'static,
    {
        self.constructor(Step::function(func))
    }

    /// Append a statistics stage
    pub fn statistics(mut self, step: Step<G, F>) -> Self {
        self.statistics.push(step);
        self
    }

    /// Append a stateful statistics stage
    pub fn statistics_step<P>(self, step: P) -> Self
    where
        P: PopulationStep<G, F> + 'static,
    {
        self.statistics(Step::stateful(step))
    }

    /// Append an end-of-run stage
    pub fn end_step(mut self, step: Step<G, F>) -> Self {
        self.end_steps.push(step);
        self
    }

    /// Set the generation step
    pub fn generation_step<NewS>(self, step: NewS) -> IslandSchedulerBuilder<G, F, NewS>
    where
        NewS: GenerationStep<G, F>,
    {
        IslandSchedulerBuilder {
            config: self.config,
            constructors: self.constructors,
            generation_step: Some(step),
            statistics: self.statistics,
            end_steps: self.end_steps,
        }
    }
}

impl<G, F, S> IslandSchedulerBuilder<G, F, S>
where
    G: Genome,
    F: FitnessValue,
    S: GenerationStep<G, F>,
{
    /// Build the scheduler
    pub fn build(self) -> EvoResult<IslandScheduler<G, F, S>> {
        self.config.validate()?;
        let generation_step = self.generation_step.ok_or_else(|| {
            EvolutionError::InvalidConfiguration("generation step must be specified".to_string())
        })?;

        Ok(IslandScheduler {
            state: SchedulerState::new(self.config),
            constructors: self.constructors,
            generation_step,
            statistics: self.statistics,
            end_steps: self.end_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::StatsRecorder;
    use crate::steps::FnGeneration;
    use rand::RngCore;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    type Identity = FnGeneration<fn(Island<usize>, &mut dyn RngCore) -> EvoResult<Island<usize>>>;

    fn identity() -> Identity {
        fn keep(island: Island<usize>, _: &mut dyn RngCore) -> EvoResult<Island<usize>> {
            Ok(island)
        }
        FnGeneration::new(keep as fn(Island<usize>, &mut dyn RngCore) -> EvoResult<Island<usize>>)
    }

    fn spread(n: usize) -> impl FnMut(Population<usize>) -> EvoResult<Population<usize>> + Send {
        move |_| Ok((0..n).map(|i| Individual::new(i, i as f64 * 100.0 / (n - 1) as f64)).collect())
    }

    /// Records the island sizes seen by each statistics call
    fn size_log() -> (Arc<Mutex<Vec<usize>>>, Step<usize>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let step = Step::function(move |pop: Population<usize>| {
            sink.lock().unwrap().push(pop.len());
            Ok(pop)
        });
        (log, step)
    }

    #[test]
    fn test_config_validation() {
        assert!(IslandSchedulerConfig::default().validate().is_ok());

        let mut config = IslandSchedulerConfig::default();
        config.num_islands = 0;
        assert!(matches!(
            config.validate(),
            Err(EvolutionError::InvalidConfiguration(_))
        ));

        let mut config = IslandSchedulerConfig::default();
        config.checkpoint_interval = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config = IslandSchedulerConfig::from_json_str(
            r#"{"num_islands": 4, "merge_period": 3, "split_policy": "EqualWidth"}"#,
        )
        .unwrap();

        assert_eq!(config.num_islands, 4);
        assert_eq!(config.merge_period, 3);
        assert_eq!(config.split_policy, SplitPolicy::EqualWidth);
        assert_eq!(config.population_size, 100);

        assert!(IslandSchedulerConfig::from_json_str(r#"{"merge_period": 0}"#).is_err());
    }

    #[test]
    fn test_merge_cadence() {
        let mut config = IslandSchedulerConfig::default();
        config.merge_period = 3;

        let merges: Vec<usize> = (1..=8).filter(|&g| config.merges_at(g, 8)).collect();
        assert_eq!(merges, vec![3, 6, 8]);
    }

    #[test]
    fn test_dropped_per_split() {
        let mut config = IslandSchedulerConfig::default();
        config.num_islands = 5;

        assert_eq!(config.dropped_per_split(101), 0);

        config.split_policy = SplitPolicy::EqualRange;
        assert_eq!(config.dropped_per_split(101), 1);
        assert_eq!(config.dropped_per_split(100), 0);
    }

    #[test]
    fn test_builder_requires_valid_config() {
        let result = IslandScheduler::<usize, f64, ()>::builder()
            .merge_period(0)
            .generation_step(identity())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_run_before_init_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut scheduler = IslandScheduler::builder()
            .generation_step(identity())
            .build()
            .unwrap();

        let result = scheduler.run(3, &mut rng);
        assert!(matches!(
            result,
            Err(EvolutionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_init_builds_population() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut scheduler = IslandScheduler::builder()
            .population_size(10)
            .constructor_fn(spread(10))
            .constructor_fn(|mut pop: Population<usize>| {
                pop.truncate(8);
                Ok(pop)
            })
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        assert_eq!(scheduler.phase(), SchedulerPhase::Initialized);
        assert_eq!(scheduler.generation(), 0);
        assert_eq!(scheduler.population().map(<[_]>::len), Some(8));
    }

    #[test]
    fn test_merge_after_period_keeps_everyone() {
        // 100 individuals spread over [0, 100], five islands, merge every 3.
        let mut rng = StdRng::seed_from_u64(42);
        let (log, stats) = size_log();
        let mut scheduler = IslandScheduler::builder()
            .population_size(100)
            .num_islands(5)
            .merge_period(3)
            .constructor_fn(spread(100))
            .statistics(stats)
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        let terminal = scheduler.run(3, &mut rng).unwrap();
        assert_eq!(terminal.len(), 100);

        let log = log.lock().unwrap();
        // Three generations of pre/post observations on five islands, then the merge.
        assert_eq!(log.len(), 3 * 2 * 5 + 1);
        assert!(log[..30].iter().all(|&size| size == 20));
        assert_eq!(log[30], 100);
    }

    #[test]
    fn test_equal_range_drops_remainder_at_split() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut scheduler = IslandScheduler::builder()
            .population_size(101)
            .num_islands(5)
            .merge_period(3)
            .split_policy(SplitPolicy::EqualRange)
            .constructor_fn(spread(101))
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        assert_eq!(scheduler.run(3, &mut rng).unwrap().len(), 100);
    }

    #[test]
    fn test_equal_width_merge_keeps_spread_population() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut scheduler = IslandScheduler::builder()
            .population_size(100)
            .num_islands(5)
            .merge_period(3)
            .split_policy(SplitPolicy::EqualWidth)
            .constructor_fn(spread(100))
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        let terminal = scheduler.run(3, &mut rng).unwrap();

        let mut ids: Vec<usize> = terminal.iter().map(|i| i.genome).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_equal_width_duplicates_fill_empty_bins() {
        // Nine individuals at 0 and one at 100: with four bins, bins 1 and 2
        // are empty and each receives a copy of bin 0.
        let mut rng = StdRng::seed_from_u64(42);
        let mut scheduler = IslandScheduler::builder()
            .population_size(10)
            .num_islands(4)
            .merge_period(1)
            .split_policy(SplitPolicy::EqualWidth)
            .constructor_fn(|_| {
                Ok((0..10)
                    .map(|i| Individual::new(i, if i == 9 { 100.0 } else { 0.0 }))
                    .collect())
            })
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        let terminal = scheduler.run(1, &mut rng).unwrap();

        assert_eq!(terminal.len(), 9 * 3 + 1);
        assert_eq!(terminal.iter().filter(|i| i.genome == 9).count(), 1);
        for id in 0..9 {
            assert_eq!(terminal.iter().filter(|i| i.genome == id).count(), 3);
        }
    }

    #[test]
    fn test_islands_live_between_merges() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut scheduler = IslandScheduler::builder()
            .population_size(20)
            .num_islands(4)
            .merge_period(5)
            .constructor_fn(spread(20))
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        scheduler.state.phase = SchedulerPhase::Running;
        scheduler.step(1, 10, &mut rng).unwrap();
        assert_eq!(scheduler.islands().map(<[_]>::len), Some(4));
        assert!(scheduler.population().is_none());

        scheduler.step(5, 10, &mut rng).unwrap();
        assert_eq!(scheduler.population().map(<[_]>::len), Some(20));
    }

    #[test]
    fn test_resplit_after_each_merge() {
        let mut rng = StdRng::seed_from_u64(3);
        let splits = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&splits);
        let step = FnGeneration::new(move |island: Island<usize>, _: &mut dyn RngCore| {
            seen.lock().unwrap().push(island.len());
            Ok(island)
        });
        let mut scheduler = IslandScheduler::builder()
            .population_size(12)
            .num_islands(3)
            .merge_period(2)
            .constructor_fn(spread(12))
            .end_step(Step::function(|mut pop: Population<usize>| {
                pop.retain(|i| i.fitness > 50.0);
                Ok(pop)
            }))
            .generation_step(step)
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        let terminal = scheduler.run(5, &mut rng).unwrap();

        assert!(terminal.iter().all(|i| i.fitness > 50.0));
        assert_eq!(splits.lock().unwrap().len(), 5 * 3);
        assert_eq!(scheduler.phase(), SchedulerPhase::Terminated);
        assert!(scheduler.run(6, &mut rng).is_err());
    }

    #[test]
    fn test_split_only_when_population_is_live() {
        let mut rng = StdRng::seed_from_u64(9);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let step = FnGeneration::new(move |island: Island<usize>, _: &mut dyn RngCore| {
            let mut ids: Vec<usize> = island.iter().map(|i| i.genome).collect();
            ids.sort_unstable();
            seen.lock().unwrap().push(ids);
            Ok(island)
        });
        let mut scheduler = IslandScheduler::builder()
            .population_size(12)
            .num_islands(3)
            .merge_period(2)
            .split_policy(SplitPolicy::EqualRange)
            .constructor_fn(spread(12))
            .generation_step(step)
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        scheduler.run(5, &mut rng).unwrap();

        // One partition per generation; island order within a generation does not matter
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 5 * 3);
        let partitions: Vec<BTreeSet<Vec<usize>>> = calls
            .chunks(3)
            .map(|generation| generation.iter().cloned().collect())
            .collect();

        // Splits at 1, 3 and 5; generations 2 and 4 keep the islands they inherited
        assert_eq!(partitions[1], partitions[0]);
        assert_eq!(partitions[3], partitions[2]);
        assert_ne!(partitions[2], partitions[1]);
        assert_ne!(partitions[4], partitions[3]);
    }

    #[test]
    fn test_generation_step_may_resize_islands() {
        let mut rng = StdRng::seed_from_u64(3);
        let grow = FnGeneration::new(|mut island: Island<usize>, _: &mut dyn RngCore| {
            if let Some(first) = island.first().cloned() {
                island.push(first);
            }
            Ok(island)
        });
        let mut scheduler = IslandScheduler::builder()
            .population_size(8)
            .num_islands(2)
            .merge_period(2)
            .constructor_fn(spread(8))
            .generation_step(grow)
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        // Two islands grow by one per generation: 8 -> 10 -> 12 -> 14
        assert_eq!(scheduler.run(3, &mut rng).unwrap().len(), 14);
    }

    #[test]
    fn test_collaborator_errors_propagate_unchanged() {
        let mut rng = StdRng::seed_from_u64(3);
        let failing = FnGeneration::new(|_: Island<usize>, _: &mut dyn RngCore| {
            Err(EvolutionError::Step("evaluation failed".to_string()))
        });
        let mut scheduler = IslandScheduler::builder()
            .population_size(4)
            .num_islands(2)
            .constructor_fn(spread(4))
            .generation_step(failing)
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        let err = scheduler.run(2, &mut rng).unwrap_err();
        assert!(matches!(err, EvolutionError::Step(msg) if msg == "evaluation failed"));
    }

    #[test]
    fn test_failed_generation_rolls_back() {
        let mut rng = StdRng::seed_from_u64(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let flaky = FnGeneration::new(move |island: Island<usize>, _: &mut dyn RngCore| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(EvolutionError::Step("transient failure".to_string()));
            }
            Ok(island)
        });
        let mut scheduler = IslandScheduler::builder()
            .population_size(12)
            .num_islands(3)
            .merge_period(2)
            .constructor_fn(spread(12))
            .generation_step(flaky)
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        assert!(scheduler.run(4, &mut rng).is_err());

        assert_eq!(scheduler.generation(), 0);
        assert_eq!(scheduler.phase(), SchedulerPhase::Running);
        assert_eq!(scheduler.population().map(<[_]>::len), Some(12));

        let terminal = scheduler.run(4, &mut rng).unwrap();
        assert_eq!(terminal.len(), 12);
        assert_eq!(scheduler.generation(), 4);
    }

    #[test]
    fn test_failed_end_step_keeps_population() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut failed = false;
        let mut scheduler = IslandScheduler::builder()
            .population_size(8)
            .num_islands(2)
            .merge_period(3)
            .constructor_fn(spread(8))
            .end_step(Step::function(move |pop: Population<usize>| {
                if !failed {
                    failed = true;
                    return Err(EvolutionError::Step("report sink offline".to_string()));
                }
                Ok(pop)
            }))
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        assert!(scheduler.run(2, &mut rng).is_err());
        assert_eq!(scheduler.generation(), 2);
        assert_eq!(scheduler.population().map(<[_]>::len), Some(8));

        assert_eq!(scheduler.run(2, &mut rng).unwrap().len(), 8);
        assert_eq!(scheduler.phase(), SchedulerPhase::Terminated);
    }

    #[test]
    fn test_same_seed_same_result() {
        let run_once = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let shuffle = FnGeneration::new(|mut island: Island<usize>, rng: &mut dyn RngCore| {
                use rand::seq::SliceRandom;
                island.shuffle(rng);
                island.truncate(island.len().saturating_sub(1).max(1));
                Ok(island)
            });
            let mut scheduler = IslandScheduler::builder()
                .population_size(30)
                .num_islands(3)
                .merge_period(2)
                .split_policy(SplitPolicy::EqualRange)
                .constructor_fn(spread(30))
                .generation_step(shuffle)
                .build()
                .unwrap();
            scheduler.init(&mut rng).unwrap();
            let genomes: Vec<usize> = scheduler
                .run(4, &mut rng)
                .unwrap()
                .iter()
                .map(|i| i.genome)
                .collect();
            genomes
        };

        assert_eq!(run_once(17), run_once(17));
    }

    #[test]
    fn test_statistics_recorder_sees_every_observation() {
        let mut rng = StdRng::seed_from_u64(5);
        let recorder = StatsRecorder::new();
        let history = recorder.history();
        let mut scheduler = IslandScheduler::builder()
            .population_size(10)
            .num_islands(2)
            .merge_period(2)
            .constructor_fn(spread(10))
            .statistics_step(recorder)
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        scheduler.run(2, &mut rng).unwrap();

        // 2 generations * 2 passes * 2 islands + 1 merge
        assert_eq!(history.len().unwrap(), 9);
        assert_eq!(history.best_fitness().unwrap(), Some(100.0));
    }

    /// Island membership as (genome, fitness) pairs, island by island
    fn members(view: &LiveView<usize>) -> Vec<Vec<(usize, f64)>> {
        let pairs = |group: &[Individual<usize>]| -> Vec<(usize, f64)> {
            group.iter().map(|i| (i.genome, i.fitness)).collect()
        };
        match view {
            LiveView::Population(population) => vec![pairs(population)],
            LiveView::Islands(islands) => islands.iter().map(|island| pairs(island)).collect(),
        }
    }

    #[test]
    fn test_checkpoint_and_resume() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("islands.ckpt");
        let build = |path: &Path| {
            IslandScheduler::builder()
                .population_size(20)
                .num_islands(4)
                .merge_period(3)
                .checkpoint(path, 5)
                .constructor_fn(spread(20))
                .generation_step(identity())
                .build()
                .unwrap()
        };

        // Merges land on 3, 6 and 7; the only checkpoint is taken after
        // generation 5, between a split and a merge.
        let mut rng = StdRng::seed_from_u64(11);
        let mut first = build(&path);
        first.init(&mut rng).unwrap();
        first.run(7, &mut rng).unwrap();
        let running_time = first.running_time();

        let mut resumed = build(&path);
        resumed.restore_checkpoint(&path).unwrap();
        assert_eq!(resumed.generation(), 5);
        assert_eq!(resumed.phase(), SchedulerPhase::Running);
        assert_eq!(resumed.islands().map(<[_]>::len), Some(4));
        let restored_time = resumed.running_time();
        assert!(restored_time <= running_time);

        let terminal = resumed.run(8, &mut rng).unwrap();
        assert_eq!(terminal.len(), 20);
        assert_eq!(resumed.generation(), 8);
        assert_eq!(resumed.phase(), SchedulerPhase::Terminated);
        assert!(resumed.running_time() >= restored_time);
    }

    #[test]
    fn test_restore_reproduces_saved_islands() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exact.ckpt");
        let shuffle = || {
            FnGeneration::new(|mut island: Island<usize>, rng: &mut dyn RngCore| {
                use rand::seq::SliceRandom;
                island.shuffle(rng);
                Ok(island)
            })
        };
        let build = |path: &Path| {
            IslandScheduler::builder()
                .population_size(12)
                .num_islands(3)
                .merge_period(4)
                .split_policy(SplitPolicy::EqualRange)
                .checkpoint(path, 100)
                .constructor_fn(spread(12))
                .generation_step(shuffle())
                .build()
                .unwrap()
        };

        let mut rng = StdRng::seed_from_u64(21);
        let mut original = build(&path);
        original.init(&mut rng).unwrap();
        original.state.phase = SchedulerPhase::Running;
        for generation in 1..=2 {
            original.state.generation = generation;
            original.step(generation, 10, &mut rng).unwrap();
        }
        original.save_checkpoint().unwrap();

        let mut restored = build(&path);
        restored.restore_checkpoint(&path).unwrap();

        assert_eq!(restored.generation(), 2);
        assert_eq!(restored.phase(), SchedulerPhase::Running);
        assert_eq!(restored.running_time(), original.running_time());
        assert_eq!(restored.config(), original.config());
        assert_eq!(members(&restored.state().view), members(&original.state().view));
        assert_eq!(restored.islands().map(<[_]>::len), Some(3));
    }

    #[test]
    fn test_checkpoint_write_failure_stops_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.ckpt");
        std::fs::create_dir(crate::checkpoint::temp_path(&path)).unwrap();

        let mut rng = StdRng::seed_from_u64(2);
        let mut scheduler = IslandScheduler::builder()
            .population_size(6)
            .num_islands(2)
            .checkpoint(&path, 1)
            .constructor_fn(spread(6))
            .generation_step(identity())
            .build()
            .unwrap();

        scheduler.init(&mut rng).unwrap();
        let err = scheduler.run(5, &mut rng).unwrap_err();

        assert!(matches!(err, EvolutionError::CheckpointWrite { .. }));
        assert_eq!(scheduler.generation(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_save_checkpoint_requires_path() {
        let scheduler = IslandScheduler::builder()
            .generation_step(identity())
            .build()
            .unwrap();
        assert!(matches!(
            scheduler.save_checkpoint(),
            Err(EvolutionError::InvalidConfiguration(_))
        ));
    }
}
