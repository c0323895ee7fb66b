//! Island Scheduling
//!
//! Evolves a population on a 10-D sphere under each split policy and prints
//! what the statistics pipeline recorded.
//!
//! Run with `RUST_LOG=convection_evo=debug` to see each split and merge.

use convection_evo::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing_subscriber::EnvFilter;

const DIM: usize = 10;
const POPULATION: usize = 100;

fn sphere(genome: &Vec<f64>) -> f64 {
    -genome.iter().map(|x| x * x).sum::<f64>()
}

fn random_population(seed: u64) -> impl FnMut(Population<Vec<f64>>) -> EvoResult<Population<Vec<f64>>> + Send {
    move |_| {
        let mut rng = StdRng::seed_from_u64(seed);
        Ok((0..POPULATION)
            .map(|_| {
                let genome: Vec<f64> = (0..DIM).map(|_| rng.gen_range(-5.12..5.12)).collect();
                let fitness = sphere(&genome);
                Individual::new(genome, fitness)
            })
            .collect())
    }
}

fn mutate(parents: Island<Vec<f64>>, rng: &mut dyn RngCore) -> EvoResult<Island<Vec<f64>>> {
    Ok(parents
        .into_iter()
        .map(|parent| {
            let genome: Vec<f64> = parent
                .genome
                .iter()
                .map(|x| if rng.gen_bool(0.2) { x + rng.gen_range(-0.3..0.3) } else { *x })
                .collect();
            let fitness = sphere(&genome);
            Individual::new(genome, fitness)
        })
        .collect())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Island Scheduling ===\n");
    println!("Problem: {}-D sphere (maximizing negated sum of squares)", DIM);
    println!("Islands: 5, merge every 10 generations, 100 generations\n");

    for policy in [
        SplitPolicy::EqualNumber,
        SplitPolicy::EqualRange,
        SplitPolicy::EqualWidth,
    ] {
        let mut rng = StdRng::seed_from_u64(42);
        let recorder = StatsRecorder::new();
        let history = recorder.history();

        let mut scheduler = IslandScheduler::builder()
            .population_size(POPULATION)
            .num_islands(5)
            .merge_period(10)
            .split_policy(policy)
            .constructor_fn(random_population(7))
            .statistics_step(recorder)
            .generation_step(StableGeneration::new(
                ConvectionSelection::new(3, 4)?,
                FnGeneration::new(mutate),
            ))
            .build()?;

        scheduler.init(&mut rng)?;
        let population = scheduler.run(100, &mut rng)?;
        let best = best_index(population).map(|idx| population[idx].fitness);
        let final_size = population.len();

        println!("Policy {:?} ({})", policy, policy);
        println!("  Final size:        {}", final_size);
        println!("  Best fitness:      {:.6}", best.unwrap_or(f64::NAN));
        println!("  Best ever seen:    {:.6}", history.best_fitness()?.unwrap_or(f64::NAN));
        println!("  Observations:      {}", history.len()?);
        println!("  Running time:      {:.3}s\n", scheduler.running_time());
    }

    Ok(())
}
