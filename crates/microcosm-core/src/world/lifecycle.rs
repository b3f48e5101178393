//! The tick: physics → decision → execution → lifecycle, in strict phase
//! order. Given the fixed seed and the first-come-first-served executor,
//! a whole run is a pure function of the initial state.

use super::{decision_seed, World};
use crate::cell::{Action, Cell, TileView};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;

impl World {
    /// Advances the simulation by exactly one tick. Atomic to the caller:
    /// no observable intermediate state.
    pub fn step(&mut self) {
        self.tick_index += 1;
        self.divisions_last_tick = 0;
        self.deaths_last_tick = 0;

        // Phase 1: physics. One diffusion pass from a consistent snapshot.
        self.field
            .diffuse(self.config.diffusion_rate, self.config.diffusion_boundary);

        // Phase 2: perception + decision. Read-only against the field, so it
        // runs in parallel; results land in cell order before phase 3 starts.
        let actions = self.collect_decisions();

        // Phase 3: action execution against the live field, earlier list
        // position winning contested resources.
        self.execute_actions(actions);

        // Phase 4: lifecycle. Internal updates, then cull and divide.
        self.run_lifecycle();
    }

    fn collect_decisions(&mut self) -> Vec<Vec<Action>> {
        let field = &self.field;
        let config = &self.config;
        let tick = self.tick_index;
        self.cells
            .par_iter_mut()
            .map(|cell| {
                if !cell.alive {
                    return Vec::new();
                }
                let view = TileView {
                    local: field.local(cell.x, cell.y),
                    neighbors: field.neighbors(cell.x, cell.y, config.perception_boundary),
                };
                let mut rng =
                    ChaCha12Rng::seed_from_u64(decision_seed(config.seed, tick, cell.id));
                cell.decide_actions(&view, config, &mut rng)
            })
            .collect()
    }

    fn execute_actions(&mut self, all_actions: Vec<Vec<Action>>) {
        debug_assert_eq!(all_actions.len(), self.cells.len());
        for (idx, actions) in all_actions.into_iter().enumerate() {
            for action in actions {
                let (x, y) = (self.cells[idx].x, self.cells[idx].y);
                match action {
                    Action::Absorb { molecule, amount } => {
                        // Clamp to what is still on the tile: earlier cells
                        // this tick may already have drained it.
                        let available = self.field.amount(&molecule, x, y);
                        let granted = amount.min(available);
                        if granted <= 0.0 {
                            continue;
                        }
                        let absorbed = self.cells[idx].absorb(
                            &molecule,
                            granted,
                            self.config.absorb_cost_per_unit,
                        );
                        if absorbed > 0.0 {
                            self.field.take(&molecule, x, y, absorbed);
                        }
                    }
                    Action::Release { molecule, amount } => {
                        let released = self.cells[idx].release(&molecule, amount);
                        if released > 0.0 {
                            self.field.add(&molecule, x, y, released);
                        }
                    }
                    Action::Move { direction, cost } => {
                        let (nx, ny) =
                            self.field
                                .step_from(x, y, direction, self.config.perception_boundary);
                        let cell = &mut self.cells[idx];
                        cell.x = nx;
                        cell.y = ny;
                        // May drive energy negative; phase 4 catches it.
                        cell.energy -= cost;
                    }
                }
            }
        }
    }

    fn run_lifecycle(&mut self) {
        for cell in &mut self.cells {
            cell.internal_step(&self.config);
        }

        let old = std::mem::take(&mut self.cells);
        let mut next = Vec::with_capacity(old.len());
        for cell in old {
            if !cell.alive {
                self.deaths_last_tick += 1;
                self.total_deaths += 1;
                self.lifespans.push(cell.age);
                continue;
            }
            if cell.ready_to_divide {
                let (first, second) = self.divide(cell);
                next.push(first);
                next.push(second);
                self.divisions_last_tick += 1;
                self.total_divisions += 1;
            } else {
                next.push(cell);
            }
        }
        self.cells = next;
    }

    /// Division consumes the parent and yields two fresh daughters: cloned
    /// genomes mutated independently, a fixed share of the parent's energy
    /// each (the remainder is reproduction overhead), and an exact
    /// per-molecule split of the internal chemistry.
    fn divide(&mut self, parent: Cell) -> (Cell, Cell) {
        let mut genome_a = parent.genome.clone();
        let mut genome_b = parent.genome;
        if self.config.enable_mutation {
            genome_a.mutate(&mut self.rng, &self.config.mutation);
            genome_b.mutate(&mut self.rng, &self.config.mutation);
        }

        let energy = parent.energy * self.config.daughter_energy_fraction;
        let mut first = Cell::new(genome_a, energy);
        let mut second = Cell::new(genome_b, energy);
        first.division_cooldown = self.config.division_cooldown;
        second.division_cooldown = self.config.division_cooldown;

        // First daughter gets floor(amount / 2) of each molecule, second the
        // remainder; nothing is created or destroyed.
        for (molecule, amount) in parent.chemistry {
            let half = (amount / 2.0).floor();
            let rest = amount - half;
            if half > 0.0 {
                first.chemistry.insert(molecule.clone(), half);
            }
            if rest > 0.0 {
                second.chemistry.insert(molecule, rest);
            }
        }

        first.x = parent.x;
        first.y = parent.y;
        let direction = crate::field::Direction::ALL[self.rng.random_range(0..4)];
        let (sx, sy) =
            self.field
                .step_from(parent.x, parent.y, direction, self.config.perception_boundary);
        second.x = sx;
        second.y = sy;

        first.id = self.next_cell_id;
        second.id = self.next_cell_id + 1;
        self.next_cell_id += 2;
        (first, second)
    }
}
