//! Checkpoint state structures
//!
//! Complete scheduler state for checkpointing and recovery.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::algorithms::island::IslandSchedulerConfig;
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::population::individual::Individual;
use crate::population::population::{Island, Population};

/// Current checkpoint format version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Lifecycle of an island scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerPhase {
    /// Built, population not constructed yet
    Uninitialized,
    /// Initial population constructed
    Initialized,
    /// Inside the generation loop
    Running,
    /// End-of-run reduction applied
    Terminated,
}

/// The live view of the population
///
/// Islands are live between a split and the next merge; the flat population
/// is live after a merge, at initialization and at termination.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum LiveView<G, F = f64>
where
    G: Genome,
    F: FitnessValue,
{
    /// One flat population
    Population(Population<G, F>),
    /// Disjoint subpopulations, indexed by island number
    Islands(Vec<Island<G, F>>),
}

impl<G, F> LiveView<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    /// Total number of individuals across the view
    pub fn len(&self) -> usize {
        match self {
            Self::Population(population) => population.len(),
            Self::Islands(islands) => islands.iter().map(Vec::len).sum(),
        }
    }

    /// Whether the view holds no individuals
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<G, F> Default for LiveView<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    fn default() -> Self {
        Self::Population(Vec::new())
    }
}

/// Complete scheduler state for checkpointing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SchedulerState<G, F = f64>
where
    G: Genome,
    F: FitnessValue,
{
    /// Schema version for forward compatibility
    pub version: u32,
    /// Lifecycle phase
    pub phase: SchedulerPhase,
    /// Last completed generation
    pub generation: usize,
    /// Population or islands, whichever is live
    pub view: LiveView<G, F>,
    /// Accumulated wall-clock seconds spent in generations, across resumes
    pub running_time: f64,
    /// Configuration the run was started with
    pub config: IslandSchedulerConfig,
    /// Custom metadata
    pub metadata: HashMap<String, String>,
}

impl<G, F> SchedulerState<G, F>
where
    G: Genome,
    F: FitnessValue,
{
    /// Fresh, uninitialized state
    pub fn new(config: IslandSchedulerConfig) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            phase: SchedulerPhase::Uninitialized,
            generation: 0,
            view: LiveView::default(),
            running_time: 0.0,
            config,
            metadata: HashMap::new(),
        }
    }

    /// Add custom metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check if the state is compatible with the current version
    pub fn is_compatible(&self) -> bool {
        self.version <= CHECKPOINT_VERSION
    }

    /// Flat population, if it is the live view
    pub fn population(&self) -> Option<&[Individual<G, F>]> {
        match &self.view {
            LiveView::Population(population) => Some(population),
            LiveView::Islands(_) => None,
        }
    }

    /// Islands, if they are the live view
    pub fn islands(&self) -> Option<&[Island<G, F>]> {
        match &self.view {
            LiveView::Population(_) => None,
            LiveView::Islands(islands) => Some(islands),
        }
    }
}
