//! Headless runner: builds a producer/recycler ecology, runs it for a fixed
//! number of ticks and emits the run summary as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use microcosm_core::{mixture, Cell, Gene, Genome, SimConfig, World};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "microcosm", about = "Run a chemical micro-ecology simulation")]
struct Args {
    /// Grid width in tiles.
    #[arg(long, default_value_t = 80)]
    cols: usize,

    /// Grid height in tiles.
    #[arg(long, default_value_t = 60)]
    rows: usize,

    /// Master seed; equal seeds replay identical runs.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 2000)]
    ticks: usize,

    /// Sample metrics every N ticks.
    #[arg(long, default_value_t = 10)]
    sample_every: usize,

    /// Initial producer cells (A -> B + C).
    #[arg(long, default_value_t = 30)]
    producers: usize,

    /// Initial recycler cells (B -> A, C -> A).
    #[arg(long, default_value_t = 30)]
    recyclers: usize,

    /// Total amount of nutrient A seeded into the field.
    #[arg(long, default_value_t = 5000.0)]
    nutrient: f64,

    /// Deposit the nutrient as this many Gaussian clusters; 0 seeds it
    /// uniformly instead.
    #[arg(long, default_value_t = 50)]
    clusters: usize,

    /// Freeze genomes: daughters inherit exact copies.
    #[arg(long)]
    no_mutation: bool,

    /// Write the JSON summary here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// A -> 0.5 B + 0.5 C. Tolerant of its own feedstock so clustered nutrient
/// does not poison it.
fn producer_genome() -> Genome {
    Genome::new(vec![Gene::stoichiometric(
        mixture(&[("A", 1.0)]),
        mixture(&[("B", 0.5), ("C", 0.5)]),
        0.2,
        0.98,
        2.5,
    )
    .with_tolerance(mixture(&[("A", 100.0)]))])
}

/// B -> 0.6 A and C -> 0.6 A: closes the nutrient loop the producers open.
fn recycler_genome() -> Genome {
    Genome::new(vec![
        Gene::stoichiometric(
            mixture(&[("B", 1.0)]),
            mixture(&[("A", 0.6)]),
            0.25,
            0.95,
            1.5,
        )
        .with_tolerance(mixture(&[("B", 100.0), ("C", 100.0)])),
        Gene::stoichiometric(
            mixture(&[("C", 1.0)]),
            mixture(&[("A", 0.6)]),
            0.25,
            0.95,
            1.5,
        ),
    ])
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = SimConfig {
        cols: args.cols,
        rows: args.rows,
        seed: args.seed,
        enable_mutation: !args.no_mutation,
        ..SimConfig::default()
    };
    let mut world = World::try_new(config).context("invalid configuration")?;

    if args.clusters > 0 {
        world.seed_clusters("A", args.nutrient, args.clusters);
    } else {
        let per_tile = args.nutrient / (args.cols * args.rows) as f64;
        world.seed("A", per_tile);
    }

    let mut placement = ChaCha12Rng::seed_from_u64(args.seed);
    let initial_energy = world.config().initial_energy;
    for _ in 0..args.producers {
        let x = placement.random_range(0..args.cols);
        let y = placement.random_range(0..args.rows);
        world.add_cell(Cell::new(producer_genome(), initial_energy), x, y);
    }
    for _ in 0..args.recyclers {
        let x = placement.random_range(0..args.cols);
        let y = placement.random_range(0..args.rows);
        world.add_cell(Cell::new(recycler_genome(), initial_energy), x, y);
    }

    let summary = world
        .try_run(args.ticks, args.sample_every)
        .context("run failed")?;

    let stats = world.population_stats();
    eprintln!(
        "{} ticks: {} alive, {} divisions, {} deaths",
        args.ticks, stats.alive_count, stats.total_divisions, stats.total_deaths
    );

    let json = serde_json::to_string_pretty(&summary).context("serializing summary")?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("writing summary to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
