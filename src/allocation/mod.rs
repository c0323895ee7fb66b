//! Population allocation
//!
//! Splits a population into islands under one of three policies:
//!
//! - **Equal-number** (`ena`): rank-based. Sort by fitness and cut into
//!   contiguous chunks whose sizes differ by at most one.
//! - **Equal-range** (`era`): random. Every island receives exactly
//!   `N / k` individuals drawn without replacement; the `N % k` leftovers are
//!   not assigned to any island.
//! - **Equal-width** (`ewa`): fitness intervals. The range between the worst and
//!   best fitness is cut into `k` equal-width intervals. An interval with no
//!   members borrows the previous island's members so no island is empty.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EvoResult, EvolutionError};
use crate::fitness::traits::FitnessValue;
use crate::genome::traits::Genome;
use crate::population::population::{fitness_extrema, sort_ascending, Island, Population};

/// Policy used to split a population into islands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitPolicy {
    /// Sorted, near-equal contiguous chunks
    #[default]
    EqualNumber,
    /// Uniform random draw, equal bin sizes, remainder dropped
    EqualRange,
    /// Equal-width fitness intervals
    EqualWidth,
}

impl SplitPolicy {
    /// Short name of the policy
    pub fn name(&self) -> &'static str {
        match self {
            Self::EqualNumber => "ena",
            Self::EqualRange => "era",
            Self::EqualWidth => "ewa",
        }
    }

    /// Whether the policy can leave individuals out of every island
    pub fn may_drop(&self) -> bool {
        matches!(self, Self::EqualRange)
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SplitPolicy {
    type Err = EvolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ena" | "equal_number_allocation" => Ok(Self::EqualNumber),
            "era" | "random_allocation" | "equal_range_allocation" => Ok(Self::EqualRange),
            "ewa" | "equal_width_allocation" => Ok(Self::EqualWidth),
            other => Err(EvolutionError::InvalidConfiguration(format!(
                "unknown split policy '{other}'"
            ))),
        }
    }
}

/// Split `population` into `num_groups` islands using `policy`.
///
/// Fails with [`EvolutionError::InvalidConfiguration`] when `num_groups` is
/// zero, and with [`EvolutionError::EmptyPopulation`] when the policy needs
/// fitness extrema of an empty population.
pub fn split<G, F, R>(
    population: Population<G, F>,
    num_groups: usize,
    policy: SplitPolicy,
    rng: &mut R,
) -> EvoResult<Vec<Island<G, F>>>
where
    G: Genome,
    F: FitnessValue,
    R: Rng + ?Sized,
{
    if num_groups < 1 {
        return Err(EvolutionError::InvalidConfiguration(
            "number of groups must be at least 1".to_string(),
        ));
    }

    let islands = match policy {
        SplitPolicy::EqualNumber => equal_number_allocation(population, num_groups),
        SplitPolicy::EqualRange => equal_range_allocation(population, num_groups, rng),
        SplitPolicy::EqualWidth => equal_width_allocation(population, num_groups)?,
    };

    debug!(
        policy = %policy,
        sizes = ?islands.iter().map(Vec::len).collect::<Vec<_>>(),
        "split population"
    );
    Ok(islands)
}

/// Sizes of `k` contiguous chunks of `n` items; the first `n % k` chunks get one extra
pub fn chunk_sizes(n: usize, k: usize) -> Vec<usize> {
    let base = n / k;
    let extra = n % k;
    (0..k).map(|i| if i < extra { base + 1 } else { base }).collect()
}

/// Sort ascending by fitness and cut into `num_groups` near-equal contiguous chunks
pub fn equal_number_allocation<G, F>(
    mut population: Population<G, F>,
    num_groups: usize,
) -> Vec<Island<G, F>>
where
    G: Genome,
    F: FitnessValue,
{
    sort_ascending(&mut population);

    let sizes = chunk_sizes(population.len(), num_groups);
    let mut remaining = population.into_iter();
    sizes
        .into_iter()
        .map(|size| remaining.by_ref().take(size).collect())
        .collect()
}

/// Draw `N / num_groups` individuals per island uniformly without replacement.
///
/// Individuals left after the last island is filled are dropped.
pub fn equal_range_allocation<G, F, R>(
    population: Population<G, F>,
    num_groups: usize,
    rng: &mut R,
) -> Vec<Island<G, F>>
where
    G: Genome,
    F: FitnessValue,
    R: Rng + ?Sized,
{
    let per_island = population.len() / num_groups;
    let mut pool = population;

    let islands = (0..num_groups)
        .map(|_| {
            (0..per_island)
                .map(|_| {
                    let idx = rng.gen_range(0..pool.len());
                    pool.swap_remove(idx)
                })
                .collect()
        })
        .collect();

    if !pool.is_empty() {
        warn!(
            dropped = pool.len(),
            num_groups, "equal-range allocation left individuals unassigned"
        );
    }
    islands
}

/// Bin individuals by equal-width fitness intervals between the worst and best.
///
/// Island 0 covers `[b0, b1]`, island `i > 0` covers `(b_i, b_{i+1}]`. An empty
/// island is filled with a copy of the previous island (island 0 with the
/// worst individual alone), so islands may share members when fitness is
/// poorly spread.
pub fn equal_width_allocation<G, F>(
    population: Population<G, F>,
    num_groups: usize,
) -> EvoResult<Vec<Island<G, F>>>
where
    G: Genome,
    F: FitnessValue,
{
    let (worst_idx, best_idx) = fitness_extrema(&population)?;
    let worst = population[worst_idx].fitness_f64();
    let best = population[best_idx].fitness_f64();
    let breakpoints = width_breakpoints(worst, best, num_groups);

    let mut islands: Vec<Island<G, F>> = Vec::with_capacity(num_groups);
    for i in 0..num_groups {
        let (lo, hi) = (breakpoints[i], breakpoints[i + 1]);
        let members: Island<G, F> = population
            .iter()
            .filter(|ind| {
                let f = ind.fitness_f64();
                let above = if i == 0 { lo <= f } else { lo < f };
                above && f <= hi
            })
            .cloned()
            .collect();

        if !members.is_empty() {
            islands.push(members);
            continue;
        }

        warn!(bin = i, "equal-width interval is empty, reusing neighbouring island");
        let fallback = match islands.last() {
            Some(previous) => previous.clone(),
            None => vec![population[worst_idx].clone()],
        };
        islands.push(fallback);
    }
    Ok(islands)
}

/// `num_groups + 1` equally spaced breakpoints from `worst` to `best` inclusive
pub fn width_breakpoints(worst: f64, best: f64, num_groups: usize) -> Vec<f64> {
    let span = best - worst;
    let mut breakpoints: Vec<f64> = (0..=num_groups)
        .map(|i| worst + span * i as f64 / num_groups as f64)
        .collect();
    // Rounding must never push the best individual out of the last bin.
    if let Some(last) = breakpoints.last_mut() {
        *last = best;
    }
    breakpoints
}
