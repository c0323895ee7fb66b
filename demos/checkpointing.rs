//! Checkpointing and Recovery
//!
//! Runs the island scheduler with a checkpoint every 5 generations, stops it
//! early as if the process had died, and resumes from the last checkpoint in
//! a freshly built scheduler.

use convection_evo::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DIM: usize = 5;
const POPULATION: usize = 60;

type Genes = Vec<f64>;

fn sphere(genome: &Genes) -> f64 {
    -genome.iter().map(|x| x * x).sum::<f64>()
}

fn perturb(parents: Island<Genes>, rng: &mut dyn RngCore) -> EvoResult<Island<Genes>> {
    Ok(parents
        .into_iter()
        .map(|parent| {
            let genome: Genes = parent.genome.iter().map(|x| x + rng.gen_range(-0.1..0.1)).collect();
            let fitness = sphere(&genome);
            Individual::new(genome, fitness)
        })
        .collect())
}

fn build(
    path: &Path,
) -> EvoResult<IslandScheduler<Genes, f64, impl GenerationStep<Genes, f64>>> {
    IslandScheduler::builder()
        .population_size(POPULATION)
        .num_islands(3)
        .merge_period(4)
        .split_policy(SplitPolicy::EqualWidth)
        .checkpoint(path, 5)
        .checkpoint_format(CheckpointFormat::Json)
        .constructor_fn(|_| {
            let mut rng = StdRng::seed_from_u64(7);
            Ok((0..POPULATION)
                .map(|_| {
                    let genome: Genes = (0..DIM).map(|_| rng.gen_range(-5.0..5.0)).collect();
                    let fitness = sphere(&genome);
                    Individual::new(genome, fitness)
                })
                .collect())
        })
        .generation_step(StableGeneration::new(
            TournamentSelection::new(2)?,
            FnGeneration::new(perturb),
        ))
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Checkpointing and Recovery ===\n");

    let checkpoint_dir = std::env::temp_dir().join("convection_evo_checkpoints");
    std::fs::create_dir_all(&checkpoint_dir)?;
    let path: PathBuf = checkpoint_dir.join("run.json");

    // First run: checkpoints land after generations 5 and 10, then the run
    // "dies" at generation 12.
    let mut rng = StdRng::seed_from_u64(42);
    let mut scheduler = build(&path)?;
    scheduler.init(&mut rng)?;
    scheduler.run(12, &mut rng)?;
    println!("First run finished generation {}", scheduler.generation());
    drop(scheduler);

    // Second run: a new scheduler picks up after the last checkpoint.
    let mut resumed = build(&path)?;
    resumed.restore_checkpoint(&path)?;
    println!(
        "Restored generation {} ({:.3}s of prior running time, islands live: {})",
        resumed.generation(),
        resumed.running_time(),
        resumed.islands().is_some()
    );

    let population = resumed.run(30, &mut rng)?;
    let best = best_index(population).map(|idx| population[idx].fitness);
    println!("Resumed run finished with {} individuals", population.len());
    println!("Best fitness: {:.6}", best.unwrap_or(f64::NAN));

    std::fs::remove_dir_all(&checkpoint_dir)?;
    println!("\nCheckpoint directory cleaned up.");
    Ok(())
}
