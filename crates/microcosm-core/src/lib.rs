//! A 2D chemical micro-ecology: a diffusing molecular field inhabited by
//! metabolizing, dividing, mutating cells.
//!
//! The field ([`field::ChemistryField`]) carries named molecule
//! concentrations on a discrete grid. Cells ([`cell::Cell`]) carry genomes
//! of reaction genes ([`gene::Gene`]) that convert absorbed molecules into
//! energy and byproducts; whatever a genome produces but cannot consume is
//! its waste, so producer/recycler ecologies emerge from gene structure
//! alone. The world ([`world::World`]) owns both and advances them in four
//! strict phases per tick: diffusion, parallel decision, sequential
//! first-come-first-served execution, then lifecycle (death and division).
//!
//! Runs are deterministic: one master seed drives the world RNG and every
//! derived per-cell decision stream, so equal seeds replay equal histories.

pub mod cell;
pub mod chemistry;
pub mod config;
pub mod driver;
pub mod field;
pub mod gene;
pub mod genome;
pub mod world;

pub use cell::{Action, Cell, TileView};
pub use chemistry::{mixture, ChemMap};
pub use config::{SimConfig, SimConfigError};
pub use driver::FixedStepDriver;
pub use field::{BoundaryPolicy, ChemistryField, Direction};
pub use gene::{Gene, ReactionKind};
pub use genome::{Genome, GenomeError, MutationRates};
pub use world::{
    CellSnapshot, PopulationStats, RunError, RunSummary, StepMetrics, World, WorldInitError,
};
