//! Serializable observer types: per-tick metrics, per-cell snapshots and run
//! summaries. Everything here is read-only over the world state; external
//! observers (rendering, UI) consume these and never mutate the simulation.

use super::World;
use crate::chemistry::ChemMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub tick: u64,
    pub alive_count: usize,
    pub divisions: usize,
    pub deaths: usize,
    pub mean_energy: f64,
    pub mean_age: f64,
    /// Sum of all internal molecule amounts across living cells.
    pub total_biomass: f64,
    /// Number of distinct genome hashes among living cells.
    pub distinct_genomes: usize,
    /// Whole-field mass per molecule.
    pub field_totals: BTreeMap<String, f64>,
}

/// Read-only view of one living cell for external observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub id: u64,
    pub x: usize,
    pub y: usize,
    pub energy: f64,
    pub age: u64,
    pub chemistry: ChemMap,
    pub genome_hash: u64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub ticks: usize,
    pub sample_every: usize,
    pub final_alive_count: usize,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub lifespans: Vec<u64>,
    #[serde(default)]
    pub total_divisions: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PopulationStats {
    pub alive_count: usize,
    pub total_divisions: usize,
    pub total_deaths: usize,
    pub mean_energy: f64,
    pub mean_age: f64,
}

impl World {
    pub(crate) fn collect_step_metrics(&self) -> StepMetrics {
        let alive = self.cells.len();
        let denom = alive.max(1) as f64;
        let mut energy_sum = 0.0;
        let mut age_sum = 0.0;
        let mut biomass = 0.0;
        let mut hashes = BTreeSet::new();
        for cell in &self.cells {
            energy_sum += cell.energy;
            age_sum += cell.age as f64;
            biomass += cell.biomass();
            hashes.insert(cell.genome.hash());
        }
        StepMetrics {
            tick: self.tick_index,
            alive_count: alive,
            divisions: self.divisions_last_tick,
            deaths: self.deaths_last_tick,
            mean_energy: energy_sum / denom,
            mean_age: age_sum / denom,
            total_biomass: biomass,
            distinct_genomes: hashes.len(),
            field_totals: self.field.totals(),
        }
    }

    /// Snapshot of every living cell, in list order.
    pub fn cell_snapshots(&self) -> Vec<CellSnapshot> {
        self.cells
            .iter()
            .map(|cell| CellSnapshot {
                id: cell.id,
                x: cell.x,
                y: cell.y,
                energy: cell.energy,
                age: cell.age,
                chemistry: cell.chemistry.clone(),
                genome_hash: cell.genome.hash(),
            })
            .collect()
    }

    /// Whole-field mass per molecule.
    pub fn field_totals(&self) -> BTreeMap<String, f64> {
        self.field.totals()
    }

    pub fn population_stats(&self) -> PopulationStats {
        let alive = self.cells.len();
        let denom = alive.max(1) as f64;
        PopulationStats {
            alive_count: alive,
            total_divisions: self.total_divisions,
            total_deaths: self.total_deaths,
            mean_energy: self.cells.iter().map(|c| c.energy).sum::<f64>() / denom,
            mean_age: self.cells.iter().map(|c| c.age as f64).sum::<f64>() / denom,
        }
    }
}
