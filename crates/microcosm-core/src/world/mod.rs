//! The orchestrator: owns the chemistry field and the cell collection, and
//! sequences the four tick phases (physics, decision, execution, lifecycle).

pub mod lifecycle;
pub mod metrics;

pub use metrics::*;

use crate::cell::Cell;
use crate::config::{SimConfig, SimConfigError};
use crate::field::ChemistryField;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};

pub struct World {
    pub(crate) field: ChemistryField,
    pub(crate) cells: Vec<Cell>,
    pub(crate) config: SimConfig,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) next_cell_id: u64,
    pub(crate) tick_index: u64,
    pub(crate) divisions_last_tick: usize,
    pub(crate) deaths_last_tick: usize,
    pub(crate) total_divisions: usize,
    pub(crate) total_deaths: usize,
    pub(crate) lifespans: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    InvalidSampleEvery,
    TooManyTicks { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            RunError::TooManyTicks { max, actual } => {
                write!(f, "ticks ({actual}) exceed supported maximum ({max})")
            }
            RunError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for RunError {}

impl World {
    pub const MAX_RUN_TICKS: usize = 1_000_000;
    pub const MAX_RUN_SAMPLES: usize = 50_000;

    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let field = ChemistryField::new(config.cols, config.rows);
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        Ok(Self {
            field,
            cells: Vec::new(),
            config,
            rng,
            next_cell_id: 0,
            tick_index: 0,
            divisions_last_tick: 0,
            deaths_last_tick: 0,
            total_divisions: 0,
            total_deaths: 0,
            lifespans: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn field(&self) -> &ChemistryField {
        &self.field
    }

    pub fn tick(&self) -> u64 {
        self.tick_index
    }

    /// Places a cell on the grid (position clamped to bounds), assigns it a
    /// stable id, and returns that id.
    pub fn add_cell(&mut self, mut cell: Cell, x: usize, y: usize) -> u64 {
        let (x, y) = self.field.clamp_tile(x, y);
        cell.x = x;
        cell.y = y;
        cell.id = self.next_cell_id;
        self.next_cell_id += 1;
        let id = cell.id;
        self.cells.push(cell);
        id
    }

    /// Adds `amount` of `molecule` uniformly across the field.
    pub fn seed(&mut self, molecule: &str, amount: f64) {
        self.field.seed(molecule, amount);
    }

    /// Deposits `total_amount` of `molecule` as Gaussian clusters, drawing
    /// placement from the world RNG.
    pub fn seed_clusters(&mut self, molecule: &str, total_amount: f64, num_clusters: usize) {
        self.field
            .seed_clusters(molecule, total_amount, num_clusters, &mut self.rng);
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Runs `ticks` ticks, sampling metrics every `sample_every` ticks.
    pub fn run(&mut self, ticks: usize, sample_every: usize) -> RunSummary {
        self.try_run(ticks, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run(&mut self, ticks: usize, sample_every: usize) -> Result<RunSummary, RunError> {
        if sample_every == 0 {
            return Err(RunError::InvalidSampleEvery);
        }
        if ticks > Self::MAX_RUN_TICKS {
            return Err(RunError::TooManyTicks {
                max: Self::MAX_RUN_TICKS,
                actual: ticks,
            });
        }
        let estimated_samples = if ticks == 0 {
            0
        } else {
            ((ticks - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_RUN_SAMPLES {
            return Err(RunError::TooManySamples {
                max: Self::MAX_RUN_SAMPLES,
                actual: estimated_samples,
            });
        }

        self.lifespans.clear();
        let divisions_before = self.total_divisions;
        let mut samples = Vec::with_capacity(estimated_samples);
        for t in 1..=ticks {
            self.step();
            if t % sample_every == 0 || t == ticks {
                samples.push(self.collect_step_metrics());
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            ticks,
            sample_every,
            final_alive_count: self.cells.len(),
            samples,
            lifespans: std::mem::take(&mut self.lifespans),
            total_divisions: self.total_divisions - divisions_before,
        })
    }
}

/// Seed for one cell's per-tick decision RNG stream: an FNV-1a fold of the
/// master seed, the tick index and the cell id. Independent of thread
/// scheduling, so the parallel decision phase stays deterministic.
pub(crate) fn decision_seed(seed: u64, tick: u64, cell_id: u64) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut h = OFFSET;
    for word in [seed, tick, cell_id] {
        for byte in word.to_le_bytes() {
            h ^= byte as u64;
            h = h.wrapping_mul(PRIME);
        }
    }
    h
}
