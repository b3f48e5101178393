//! The agent: internal chemistry, energy, age, and the per-tick
//! observe → decide → act protocol.
//!
//! A cell never touches the field directly. It receives a `TileView`
//! snapshot, returns transport/movement requests as `Action`s, and leaves
//! all shared-state mutation to the world's executor. Metabolism is the one
//! exception: it only touches the cell's own state, so it runs immediately
//! during the decision phase rather than being arbitrated.

use crate::chemistry::ChemMap;
use crate::config::SimConfig;
use crate::field::Direction;
use crate::genome::Genome;
use rand::Rng;
use std::collections::BTreeSet;

/// An ephemeral transport or movement request, produced during decision and
/// consumed by the world's executor the same tick.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Absorb { molecule: String, amount: f64 },
    Release { molecule: String, amount: f64 },
    Move { direction: Direction, cost: f64 },
}

/// Read-only perception snapshot handed to `decide_actions`: the local tile
/// plus the four neighbor tiles in `Direction::ALL` order. A direction
/// pointing off-grid carries an empty mapping.
#[derive(Clone, Debug, Default)]
pub struct TileView {
    pub local: ChemMap,
    pub neighbors: [ChemMap; 4],
}

#[derive(Clone, Debug)]
pub struct Cell {
    /// Stable identifier, assigned by the world; also salts the cell's
    /// per-tick decision RNG stream.
    pub id: u64,
    pub genome: Genome,
    pub chemistry: ChemMap,
    pub energy: f64,
    pub age: u64,
    pub alive: bool,
    /// One-shot division flag, reset at the start of every internal step.
    pub ready_to_divide: bool,
    /// Ticks remaining before this cell may divide again.
    pub division_cooldown: u32,
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub fn new(genome: Genome, energy: f64) -> Self {
        Self {
            id: 0,
            genome,
            chemistry: ChemMap::new(),
            energy,
            age: 0,
            alive: true,
            ready_to_divide: false,
            division_cooldown: 0,
            x: 0,
            y: 0,
        }
    }

    /// Sum of all internal molecule amounts.
    pub fn biomass(&self) -> f64 {
        self.chemistry.values().sum()
    }

    /// The decision function: proposes absorb/release/move actions against
    /// the perception snapshot and runs involuntary metabolism on the cell's
    /// own state. Never touches shared state.
    pub fn decide_actions<R: Rng + ?Sized>(
        &mut self,
        view: &TileView,
        config: &SimConfig,
        rng: &mut R,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        let needs = self.genome.needs();

        // Absorb half of whatever needed molecules are locally available,
        // skipping requests the current energy cannot pay for.
        for molecule in &needs {
            let Some(&available) = view.local.get(molecule) else {
                continue;
            };
            if available <= 0.0 {
                continue;
            }
            let amount = available * config.absorb_fraction;
            if amount * config.absorb_cost_per_unit <= self.energy {
                actions.push(Action::Absorb {
                    molecule: molecule.clone(),
                    amount,
                });
            }
        }

        // Dump genome waste entirely; shed only the excess above 80% of
        // tolerance for everything else, to avoid thrashing at the boundary.
        let waste = self.genome.waste_set();
        for (molecule, &stored) in &self.chemistry {
            if waste.contains(molecule) {
                actions.push(Action::Release {
                    molecule: molecule.clone(),
                    amount: stored,
                });
            } else {
                let tolerance = self
                    .genome
                    .tolerance_for(molecule, config.tolerance_baseline);
                if stored > tolerance {
                    actions.push(Action::Release {
                        molecule: molecule.clone(),
                        amount: stored - config.tolerance_headroom * tolerance,
                    });
                }
            }
        }

        self.metabolize(rng);

        if let Some(mv) = self.consider_move(view, &needs, config, rng) {
            actions.push(mv);
        }
        actions
    }

    /// Runs every currently satisfiable gene once. Involuntary: not an
    /// action, not arbitrated by the world.
    fn metabolize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for gene in self.genome.genes() {
            if gene.can_react(&self.chemistry, self.energy) {
                self.energy = gene.apply(&mut self.chemistry, self.energy, rng);
            }
        }
    }

    /// Chemotaxis: move toward the best neighbor tile when it beats the
    /// local utility by the configured margin; otherwise occasionally wander
    /// so the population stays mixed absent gradients.
    fn consider_move<R: Rng + ?Sized>(
        &self,
        view: &TileView,
        needs: &BTreeSet<String>,
        config: &SimConfig,
        rng: &mut R,
    ) -> Option<Action> {
        let utility = |tile: &ChemMap| -> f64 {
            needs
                .iter()
                .map(|mol| tile.get(mol).copied().unwrap_or(0.0))
                .sum()
        };

        let here = utility(&view.local);
        if here > config.satiation_threshold || self.energy < config.move_min_energy {
            return None;
        }

        let mut best: Option<(Direction, f64)> = None;
        for (dir, tile) in Direction::ALL.iter().zip(&view.neighbors) {
            let gain = utility(tile);
            if gain > here * config.move_gain_margin
                && best.map_or(true, |(_, b)| gain > b)
            {
                best = Some((*dir, gain));
            }
        }
        if let Some((direction, _)) = best {
            return Some(Action::Move {
                direction,
                cost: config.move_cost,
            });
        }

        if rng.random::<f64>() < config.wander_prob {
            let direction = Direction::ALL[rng.random_range(0..4)];
            return Some(Action::Move {
                direction,
                cost: config.wander_cost,
            });
        }
        None
    }

    /// Lifecycle update run by the world after action execution: dissipation
    /// (upkeep grows with age), toxicity damage, aging, cooldown, division
    /// eligibility, death.
    pub fn internal_step(&mut self, config: &SimConfig) {
        self.ready_to_divide = false;
        if !self.alive {
            return;
        }

        self.energy -= config.base_upkeep + config.age_upkeep * self.age as f64;

        for (molecule, &stored) in &self.chemistry {
            let tolerance = self
                .genome
                .tolerance_for(molecule, config.tolerance_baseline);
            if stored > tolerance {
                self.energy -= config.toxicity_rate * (stored - tolerance);
            }
        }

        self.age += 1;
        if self.division_cooldown > 0 {
            self.division_cooldown -= 1;
        }

        if self.energy < 0.0 {
            self.alive = false;
            return;
        }
        if self.division_cooldown == 0
            && self.energy > config.divide_energy_threshold
            && self.biomass() > config.divide_biomass_threshold
        {
            self.ready_to_divide = true;
        }
    }

    /// Takes up to `amount`, clamped to what the cell's energy can pay for
    /// at `cost_per_unit`. Returns the amount actually absorbed.
    pub fn absorb(&mut self, molecule: &str, amount: f64, cost_per_unit: f64) -> f64 {
        let affordable = if cost_per_unit > 0.0 {
            self.energy / cost_per_unit
        } else {
            f64::INFINITY
        };
        let actual = amount.min(affordable).max(0.0);
        if actual <= 0.0 {
            return 0.0;
        }
        *self.chemistry.entry(molecule.to_string()).or_insert(0.0) += actual;
        self.energy -= actual * cost_per_unit;
        actual
    }

    /// Removes up to `amount` of a stored molecule. Returns the amount
    /// actually released.
    pub fn release(&mut self, molecule: &str, amount: f64) -> f64 {
        let Some(stored) = self.chemistry.get_mut(molecule) else {
            return 0.0;
        };
        let actual = amount.clamp(0.0, *stored);
        *stored -= actual;
        if *stored <= 1e-12 {
            self.chemistry.remove(molecule);
        }
        actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::mixture;
    use crate::gene::Gene;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn producer_genome() -> Genome {
        Genome::new(vec![Gene::stoichiometric(
            mixture(&[("A", 1.0)]),
            mixture(&[("B", 0.5)]),
            0.2,
            1.0,
            2.5,
        )])
    }

    fn config() -> SimConfig {
        SimConfig::default()
    }

    fn rng() -> ChaCha12Rng {
        ChaCha12Rng::seed_from_u64(0)
    }

    #[test]
    fn proposes_absorbing_half_of_needed_molecules() {
        let mut cell = Cell::new(producer_genome(), 10.0);
        let view = TileView {
            local: mixture(&[("A", 4.0), ("X", 9.0)]),
            ..TileView::default()
        };
        let actions = cell.decide_actions(&view, &config(), &mut rng());
        assert!(actions.contains(&Action::Absorb {
            molecule: "A".to_string(),
            amount: 2.0
        }));
        // X is not an input of any gene.
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::Absorb { molecule, .. } if molecule == "X")));
    }

    #[test]
    fn unaffordable_absorb_is_skipped() {
        let mut cell = Cell::new(producer_genome(), 0.0);
        cell.energy = 0.01;
        let view = TileView {
            local: mixture(&[("A", 1000.0)]),
            ..TileView::default()
        };
        let actions = cell.decide_actions(&view, &config(), &mut rng());
        assert!(!actions.iter().any(|a| matches!(a, Action::Absorb { .. })));
    }

    #[test]
    fn releases_waste_fully_and_excess_above_headroom() {
        let mut cell = Cell::new(producer_genome(), 10.0);
        // B is waste for this genome, D is merely over tolerance (baseline 10).
        cell.chemistry = mixture(&[("B", 3.0), ("D", 12.0)]);
        let actions = cell.decide_actions(&TileView::default(), &config(), &mut rng());
        assert!(actions.contains(&Action::Release {
            molecule: "B".to_string(),
            amount: 3.0
        }));
        // Excess above 80% of tolerance: 12 - 0.8 * 10 = 4.
        assert!(actions.contains(&Action::Release {
            molecule: "D".to_string(),
            amount: 4.0
        }));
    }

    #[test]
    fn metabolism_runs_as_a_side_effect_of_deciding() {
        let mut cell = Cell::new(producer_genome(), 10.0);
        cell.chemistry = mixture(&[("A", 2.0)]);
        cell.decide_actions(&TileView::default(), &config(), &mut rng());
        assert_eq!(cell.chemistry.get("A"), Some(&1.0));
        assert_eq!(cell.chemistry.get("B"), Some(&0.5));
        assert!((cell.energy - 12.3).abs() < 1e-12);
    }

    #[test]
    fn satiated_cell_does_not_move() {
        let mut cell = Cell::new(producer_genome(), 10.0);
        let mut view = TileView {
            local: mixture(&[("A", 0.9)]),
            ..TileView::default()
        };
        view.neighbors[0] = mixture(&[("A", 100.0)]);
        let actions = cell.decide_actions(&view, &config(), &mut rng());
        assert!(!actions.iter().any(|a| matches!(a, Action::Move { .. })));
    }

    #[test]
    fn follows_the_steepest_qualifying_gradient() {
        let mut cell = Cell::new(producer_genome(), 10.0);
        let mut view = TileView {
            local: mixture(&[("A", 0.1)]),
            ..TileView::default()
        };
        view.neighbors[1] = mixture(&[("A", 0.2)]); // south
        view.neighbors[2] = mixture(&[("A", 0.4)]); // east
        let actions = cell.decide_actions(&view, &config(), &mut rng());
        let cfg = config();
        assert!(actions.contains(&Action::Move {
            direction: Direction::East,
            cost: cfg.move_cost
        }));
    }

    #[test]
    fn broke_cell_never_moves() {
        let mut cell = Cell::new(producer_genome(), 0.5);
        let mut view = TileView::default();
        view.neighbors[0] = mixture(&[("A", 50.0)]);
        let actions = cell.decide_actions(&view, &config(), &mut rng());
        assert!(!actions.iter().any(|a| matches!(a, Action::Move { .. })));
    }

    #[test]
    fn absorb_clamps_to_affordable_energy() {
        let mut cell = Cell::new(producer_genome(), 1.0);
        let absorbed = cell.absorb("A", 1000.0, 0.02);
        assert!((absorbed - 50.0).abs() < 1e-9);
        assert!(cell.energy.abs() < 1e-9);
        assert_eq!(cell.chemistry.get("A"), Some(&absorbed));
    }

    #[test]
    fn release_clamps_to_stored_amount() {
        let mut cell = Cell::new(producer_genome(), 10.0);
        cell.chemistry = mixture(&[("B", 2.0)]);
        assert_eq!(cell.release("B", 5.0), 2.0);
        assert!(!cell.chemistry.contains_key("B"));
        assert_eq!(cell.release("B", 1.0), 0.0);
    }

    #[test]
    fn internal_step_ages_dissipates_and_kills() {
        let mut cell = Cell::new(producer_genome(), 0.05);
        cell.internal_step(&config());
        assert_eq!(cell.age, 1);
        assert!(!cell.alive, "upkeep drove energy below zero");
    }

    #[test]
    fn toxicity_damages_energy_proportionally_to_excess() {
        let mut cell = Cell::new(producer_genome(), 10.0);
        cell.chemistry = mixture(&[("D", 15.0)]);
        cell.internal_step(&config());
        // upkeep 0.1 + toxicity 0.2 * (15 - 10) = 1.1 total drain
        assert!((cell.energy - 8.9).abs() < 1e-12);
    }

    #[test]
    fn cooldown_suppresses_division_until_it_reaches_zero() {
        let cfg = config();
        let mut cell = Cell::new(producer_genome(), 100.0);
        cell.chemistry = mixture(&[("D", 9.0)]); // above biomass threshold
        cell.division_cooldown = 2;
        cell.internal_step(&cfg);
        assert!(!cell.ready_to_divide);
        assert_eq!(cell.division_cooldown, 1);
        cell.internal_step(&cfg);
        assert!(cell.ready_to_divide, "cooldown expired this tick");
    }

    #[test]
    fn division_needs_both_energy_and_biomass() {
        let cfg = config();
        let mut rich_but_empty = Cell::new(producer_genome(), 100.0);
        rich_but_empty.internal_step(&cfg);
        assert!(!rich_but_empty.ready_to_divide);

        let mut full_but_poor = Cell::new(producer_genome(), 1.0);
        full_but_poor.chemistry = mixture(&[("D", 9.0)]);
        full_but_poor.internal_step(&cfg);
        assert!(!full_but_poor.ready_to_divide);
    }
}
