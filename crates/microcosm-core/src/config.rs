//! Simulation configuration and fail-fast validation.

use crate::field::BoundaryPolicy;
use crate::genome::MutationRates;
use std::{error::Error, fmt};

#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Grid width in tiles.
    pub cols: usize,
    /// Grid height in tiles.
    pub rows: usize,
    /// Master seed for the world RNG and all derived per-cell streams.
    pub seed: u64,

    /// Fraction of each tile's content exchanged with its neighbors per tick.
    pub diffusion_rate: f64,
    /// Edge behavior for the diffusion pass.
    pub diffusion_boundary: BoundaryPolicy,
    /// Edge behavior for perception and movement.
    pub perception_boundary: BoundaryPolicy,

    /// Fraction of the locally available amount a cell asks to absorb.
    pub absorb_fraction: f64,
    /// Energy price per unit absorbed; absorption is clamped to what the
    /// cell can afford.
    pub absorb_cost_per_unit: f64,
    /// When an internal amount exceeds tolerance, release down to this
    /// fraction of tolerance rather than to the exact boundary.
    pub tolerance_headroom: f64,
    /// Tolerance assumed for molecules no gene declares one for.
    pub tolerance_baseline: f64,

    /// Local utility above which a cell stays put.
    pub satiation_threshold: f64,
    /// Minimum energy below which no move is proposed.
    pub move_min_energy: f64,
    /// A neighbor must beat local utility by this factor to attract a move.
    pub move_gain_margin: f64,
    /// Energy cost of a chemotactic move.
    pub move_cost: f64,
    /// Probability of a random wander when no gradient qualifies.
    pub wander_prob: f64,
    /// Energy cost of a wander step.
    pub wander_cost: f64,

    /// Flat energy drain per tick.
    pub base_upkeep: f64,
    /// Additional drain per tick per unit of age.
    pub age_upkeep: f64,
    /// Energy damage per unit of internal amount above tolerance.
    pub toxicity_rate: f64,

    /// Energy a cell must exceed to become division-eligible.
    pub divide_energy_threshold: f64,
    /// Total internal biomass a cell must exceed to become division-eligible.
    pub divide_biomass_threshold: f64,
    /// Ticks a newborn must wait before it can divide.
    pub division_cooldown: u32,
    /// Fraction of the parent's energy each daughter receives; the rest is
    /// reproduction overhead.
    pub daughter_energy_fraction: f64,

    /// Energy of cells created through `World::add_cell` helpers.
    pub initial_energy: f64,
    /// Disable to freeze genomes across divisions (useful in experiments).
    pub enable_mutation: bool,
    pub mutation: MutationRates,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 60,
            seed: 0,
            diffusion_rate: 0.1,
            diffusion_boundary: BoundaryPolicy::Wrap,
            perception_boundary: BoundaryPolicy::Clamp,
            absorb_fraction: 0.5,
            absorb_cost_per_unit: 0.02,
            tolerance_headroom: 0.8,
            tolerance_baseline: 10.0,
            satiation_threshold: 0.5,
            move_min_energy: 1.0,
            move_gain_margin: 1.05,
            move_cost: 0.5,
            wander_prob: 0.05,
            wander_cost: 0.0,
            base_upkeep: 0.1,
            age_upkeep: 1e-4,
            toxicity_rate: 0.2,
            divide_energy_threshold: 5.0,
            divide_biomass_threshold: 8.0,
            division_cooldown: 5,
            daughter_energy_fraction: 0.45,
            initial_energy: 10.0,
            enable_mutation: true,
            mutation: MutationRates::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    ZeroGridDimension { cols: usize, rows: usize },
    RateOutOfRange { name: &'static str, value: f64 },
    MarginBelowOne { value: f64 },
    DaughterFractionOutOfRange { value: f64 },
    NegativeParameter { name: &'static str, value: f64 },
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::ZeroGridDimension { cols, rows } => {
                write!(f, "grid dimensions must be positive (got {cols}x{rows})")
            }
            SimConfigError::RateOutOfRange { name, value } => {
                write!(f, "{name} ({value}) must lie in [0, 1]")
            }
            SimConfigError::MarginBelowOne { value } => {
                write!(f, "move_gain_margin ({value}) must be >= 1")
            }
            SimConfigError::DaughterFractionOutOfRange { value } => {
                write!(
                    f,
                    "daughter_energy_fraction ({value}) must lie in (0, 0.5]"
                )
            }
            SimConfigError::NegativeParameter { name, value } => {
                write!(f, "{name} ({value}) must be non-negative")
            }
        }
    }
}

impl Error for SimConfigError {}

impl SimConfig {
    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(SimConfigError::ZeroGridDimension {
                cols: self.cols,
                rows: self.rows,
            });
        }
        for (name, value) in [
            ("diffusion_rate", self.diffusion_rate),
            ("absorb_fraction", self.absorb_fraction),
            ("tolerance_headroom", self.tolerance_headroom),
            ("wander_prob", self.wander_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimConfigError::RateOutOfRange { name, value });
            }
        }
        if self.move_gain_margin < 1.0 {
            return Err(SimConfigError::MarginBelowOne {
                value: self.move_gain_margin,
            });
        }
        if !(self.daughter_energy_fraction > 0.0 && self.daughter_energy_fraction <= 0.5) {
            return Err(SimConfigError::DaughterFractionOutOfRange {
                value: self.daughter_energy_fraction,
            });
        }
        for (name, value) in [
            ("absorb_cost_per_unit", self.absorb_cost_per_unit),
            ("tolerance_baseline", self.tolerance_baseline),
            ("move_cost", self.move_cost),
            ("wander_cost", self.wander_cost),
            ("base_upkeep", self.base_upkeep),
            ("age_upkeep", self.age_upkeep),
            ("toxicity_rate", self.toxicity_rate),
        ] {
            if value < 0.0 {
                return Err(SimConfigError::NegativeParameter { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_grid_dimension_is_rejected() {
        let config = SimConfig {
            cols: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::ZeroGridDimension { cols: 0, rows: 60 })
        );
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let config = SimConfig {
            diffusion_rate: 1.5,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::RateOutOfRange {
                name: "diffusion_rate",
                ..
            })
        ));
    }

    #[test]
    fn daughter_fraction_must_not_exceed_half() {
        let config = SimConfig {
            daughter_energy_fraction: 0.6,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::DaughterFractionOutOfRange { .. })
        ));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = SimConfigError::ZeroGridDimension { cols: 0, rows: 5 };
        assert!(err.to_string().contains("0x5"));
    }
}
