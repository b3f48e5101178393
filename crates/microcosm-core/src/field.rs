//! Per-molecule 2D concentration grids with diffusion and seeding.
//!
//! One dense row-major grid per molecule, allocated lazily on first write.
//! All values stay non-negative. Diffusion is computed from a pre-step
//! snapshot so the update never reads its own output.

use crate::chemistry::ChemMap;
use rand::Rng;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// How grid edges behave, configurable independently for diffusion and for
/// perception/movement. The default asymmetry (diffusion wraps, perception
/// clamps) keeps the physics update uniform while leaving world edges
/// behaviorally meaningful to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Toroidal indexing: stepping off one edge re-enters on the opposite one.
    Wrap,
    /// Hard edges: off-grid neighbors do not exist; moves saturate at the rim.
    Clamp,
}

/// Cardinal tile directions, in the fixed order used by perception views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Tile offset as (dx, dy), with north = -y.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

/// Number of Gaussian sub-drops each cluster is split into.
const CLUSTER_DROPS: usize = 50;

#[derive(Clone, Debug)]
pub struct ChemistryField {
    cols: usize,
    rows: usize,
    grids: BTreeMap<String, Vec<f64>>,
}

impl ChemistryField {
    pub fn new(cols: usize, rows: usize) -> Self {
        debug_assert!(cols > 0 && rows > 0, "grid dimensions must be positive");
        Self {
            cols,
            rows,
            grids: BTreeMap::new(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.cols && y < self.rows);
        y * self.cols + x
    }

    /// Lazily allocates an all-zero grid for `molecule`.
    pub fn ensure(&mut self, molecule: &str) -> &mut Vec<f64> {
        let tiles = self.cols * self.rows;
        self.grids
            .entry(molecule.to_string())
            .or_insert_with(|| vec![0.0; tiles])
    }

    /// Amount of `molecule` at one tile; zero for unallocated molecules.
    pub fn amount(&self, molecule: &str, x: usize, y: usize) -> f64 {
        let i = self.idx(x, y);
        self.grids.get(molecule).map_or(0.0, |g| g[i])
    }

    pub fn add(&mut self, molecule: &str, x: usize, y: usize, amount: f64) {
        debug_assert!(amount >= 0.0);
        let i = self.idx(x, y);
        self.ensure(molecule)[i] += amount;
    }

    /// Withdraws up to `amount` of `molecule` at one tile, clamped to what is
    /// present. Returns the amount actually taken.
    pub fn take(&mut self, molecule: &str, x: usize, y: usize, amount: f64) -> f64 {
        let i = self.idx(x, y);
        let Some(grid) = self.grids.get_mut(molecule) else {
            return 0.0;
        };
        let taken = amount.clamp(0.0, grid[i]);
        grid[i] -= taken;
        taken
    }

    /// Adds `amount` of `molecule` uniformly to every tile.
    pub fn seed(&mut self, molecule: &str, amount: f64) {
        debug_assert!(amount >= 0.0);
        for v in self.ensure(molecule) {
            *v += amount;
        }
    }

    /// Distributes `total_amount` as `num_clusters` Gaussian-splattered
    /// deposits, producing rich zones and deserts. `num_clusters == 0` is a
    /// no-op. Each cluster center is uniform on the grid; sub-drop offsets are
    /// Gaussian with std = radius / 2, clamped to the grid.
    pub fn seed_clusters<R: Rng + ?Sized>(
        &mut self,
        molecule: &str,
        total_amount: f64,
        num_clusters: usize,
        rng: &mut R,
    ) {
        if num_clusters == 0 {
            return;
        }
        let radius = (self.cols.min(self.rows) / 6).max(1) as f64;
        let drop_amount = total_amount / num_clusters as f64 / CLUSTER_DROPS as f64;

        for _ in 0..num_clusters {
            let cx = rng.random_range(0..self.cols) as f64;
            let cy = rng.random_range(0..self.rows) as f64;
            for _ in 0..CLUSTER_DROPS {
                let ox = gaussian(rng, cx, radius / 2.0).round();
                let oy = gaussian(rng, cy, radius / 2.0).round();
                let x = (ox.max(0.0) as usize).min(self.cols - 1);
                let y = (oy.max(0.0) as usize).min(self.rows - 1);
                self.add(molecule, x, y, drop_amount);
            }
        }
    }

    /// One diffusion pass over every molecule grid:
    /// `new = old * (1 - rate) + neighbor_sum * rate / 4`,
    /// computed from a consistent snapshot of the pre-step state.
    ///
    /// Under `Clamp`, flux toward a missing neighbor stays in the source tile
    /// (reflecting boundary), so total mass is conserved either way.
    pub fn diffuse(&mut self, rate: f64, policy: BoundaryPolicy) {
        debug_assert!((0.0..=1.0).contains(&rate));
        let (cols, rows) = (self.cols, self.rows);
        for grid in self.grids.values_mut() {
            let snapshot = grid.clone();
            for y in 0..rows {
                for x in 0..cols {
                    let mut neighbor_sum = 0.0;
                    let mut missing = 0u32;
                    for dir in Direction::ALL {
                        let (dx, dy) = dir.offset();
                        match neighbor_tile(x, y, dx, dy, cols, rows, policy) {
                            Some((nx, ny)) => neighbor_sum += snapshot[ny * cols + nx],
                            None => missing += 1,
                        }
                    }
                    let here = snapshot[y * cols + x];
                    let retained = here * (1.0 - rate) + here * rate * missing as f64 / 4.0;
                    grid[y * cols + x] = retained + neighbor_sum * rate / 4.0;
                    debug_assert!(grid[y * cols + x] >= 0.0);
                }
            }
        }
    }

    /// Sparse mapping of the non-zero molecule amounts at one tile.
    pub fn local(&self, x: usize, y: usize) -> ChemMap {
        let i = self.idx(x, y);
        self.grids
            .iter()
            .filter(|(_, g)| g[i] > 0.0)
            .map(|(name, g)| (name.clone(), g[i]))
            .collect()
    }

    /// The four adjacent tiles' local mappings, in `Direction::ALL` order.
    /// Under `Clamp`, a direction pointing off-grid yields an empty mapping.
    pub fn neighbors(&self, x: usize, y: usize, policy: BoundaryPolicy) -> [ChemMap; 4] {
        Direction::ALL.map(|dir| {
            let (dx, dy) = dir.offset();
            match neighbor_tile(x, y, dx, dy, self.cols, self.rows, policy) {
                Some((nx, ny)) => self.local(nx, ny),
                None => ChemMap::new(),
            }
        })
    }

    /// Destination tile for a one-tile step. Under `Clamp`, a step off the
    /// grid saturates at the current tile.
    pub fn step_from(
        &self,
        x: usize,
        y: usize,
        dir: Direction,
        policy: BoundaryPolicy,
    ) -> (usize, usize) {
        let (dx, dy) = dir.offset();
        neighbor_tile(x, y, dx, dy, self.cols, self.rows, policy).unwrap_or((x, y))
    }

    pub fn clamp_tile(&self, x: usize, y: usize) -> (usize, usize) {
        (x.min(self.cols - 1), y.min(self.rows - 1))
    }

    /// Total mass of one molecule across the whole field.
    pub fn total(&self, molecule: &str) -> f64 {
        self.grids
            .get(molecule)
            .map_or(0.0, |g| g.iter().sum())
    }

    /// Totals of every allocated molecule.
    pub fn totals(&self) -> BTreeMap<String, f64> {
        self.grids
            .iter()
            .map(|(name, g)| (name.clone(), g.iter().sum()))
            .collect()
    }

    /// Read-only view of one molecule's grid, row-major.
    pub fn grid(&self, molecule: &str) -> Option<&[f64]> {
        self.grids.get(molecule).map(|g| g.as_slice())
    }

    pub fn molecules(&self) -> impl Iterator<Item = &str> {
        self.grids.keys().map(|s| s.as_str())
    }
}

fn neighbor_tile(
    x: usize,
    y: usize,
    dx: isize,
    dy: isize,
    cols: usize,
    rows: usize,
    policy: BoundaryPolicy,
) -> Option<(usize, usize)> {
    let nx = x as isize + dx;
    let ny = y as isize + dy;
    match policy {
        BoundaryPolicy::Wrap => Some((
            nx.rem_euclid(cols as isize) as usize,
            ny.rem_euclid(rows as isize) as usize,
        )),
        BoundaryPolicy::Clamp => {
            if nx < 0 || ny < 0 || nx >= cols as isize || ny >= rows as isize {
                None
            } else {
                Some((nx as usize, ny as usize))
            }
        }
    }
}

// Box-Muller transform; avoids a rand_distr dependency.
fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + z0 * std_dev
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn seed_is_uniform() {
        let mut field = ChemistryField::new(4, 3);
        field.seed("A", 2.0);
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(field.amount("A", x, y), 2.0);
            }
        }
        assert!((field.total("A") - 24.0).abs() < 1e-12);
    }

    #[test]
    fn unseeded_molecule_reads_zero() {
        let field = ChemistryField::new(4, 4);
        assert_eq!(field.amount("A", 2, 2), 0.0);
        assert_eq!(field.total("A"), 0.0);
        assert!(field.local(0, 0).is_empty());
    }

    #[test]
    fn diffusion_conserves_mass_under_wrap() {
        let mut field = ChemistryField::new(8, 8);
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        field.seed_clusters("A", 100.0, 3, &mut rng);
        let before = field.total("A");
        for _ in 0..20 {
            field.diffuse(0.1, BoundaryPolicy::Wrap);
        }
        assert!((field.total("A") - before).abs() < 1e-9);
    }

    #[test]
    fn diffusion_conserves_mass_under_clamp() {
        let mut field = ChemistryField::new(5, 5);
        field.add("A", 0, 0, 10.0);
        field.add("A", 4, 4, 5.0);
        let before = field.total("A");
        for _ in 0..50 {
            field.diffuse(0.25, BoundaryPolicy::Clamp);
        }
        assert!((field.total("A") - before).abs() < 1e-9);
    }

    #[test]
    fn diffusion_on_zero_field_is_noop() {
        let mut field = ChemistryField::new(6, 6);
        field.ensure("A");
        field.diffuse(0.2, BoundaryPolicy::Wrap);
        assert_eq!(field.total("A"), 0.0);
        assert!(field.grid("A").unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn diffusion_spreads_toward_neighbors() {
        let mut field = ChemistryField::new(3, 3);
        field.add("A", 1, 1, 8.0);
        field.diffuse(0.5, BoundaryPolicy::Clamp);
        assert!((field.amount("A", 1, 1) - 4.0).abs() < 1e-12);
        assert!((field.amount("A", 1, 0) - 1.0).abs() < 1e-12);
        assert!((field.amount("A", 0, 1) - 1.0).abs() < 1e-12);
        assert_eq!(field.amount("A", 0, 0), 0.0);
    }

    #[test]
    fn seed_clusters_zero_is_noop() {
        let mut field = ChemistryField::new(8, 8);
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        field.seed_clusters("A", 100.0, 0, &mut rng);
        assert_eq!(field.total("A"), 0.0);
        assert_eq!(field.molecules().count(), 0);
    }

    #[test]
    fn seed_clusters_deposits_full_amount_nonuniformly() {
        let mut field = ChemistryField::new(16, 16);
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        field.seed_clusters("A", 500.0, 4, &mut rng);
        assert!((field.total("A") - 500.0).abs() < 1e-9);
        let grid = field.grid("A").unwrap();
        let zeros = grid.iter().filter(|&&v| v == 0.0).count();
        assert!(zeros > 0, "cluster seeding should leave deserts");
    }

    #[test]
    fn take_clamps_to_available() {
        let mut field = ChemistryField::new(2, 2);
        field.add("A", 0, 0, 3.0);
        assert_eq!(field.take("A", 0, 0, 10.0), 3.0);
        assert_eq!(field.amount("A", 0, 0), 0.0);
        assert_eq!(field.take("A", 0, 0, 1.0), 0.0);
        assert_eq!(field.take("B", 1, 1, 1.0), 0.0);
    }

    #[test]
    fn clamped_neighbors_are_empty_off_grid() {
        let mut field = ChemistryField::new(3, 3);
        field.seed("A", 1.0);
        let views = field.neighbors(0, 0, BoundaryPolicy::Clamp);
        // Direction order: N, S, E, W. North and west point off-grid.
        assert!(views[0].is_empty());
        assert_eq!(views[1].get("A"), Some(&1.0));
        assert_eq!(views[2].get("A"), Some(&1.0));
        assert!(views[3].is_empty());
    }

    #[test]
    fn wrapped_neighbors_cross_the_edge() {
        let mut field = ChemistryField::new(3, 3);
        field.add("A", 0, 2, 5.0);
        let views = field.neighbors(0, 0, BoundaryPolicy::Wrap);
        assert_eq!(views[0].get("A"), Some(&5.0), "north of (0,0) wraps to (0,2)");
    }

    #[test]
    fn step_from_saturates_under_clamp_and_wraps_under_wrap() {
        let field = ChemistryField::new(4, 4);
        assert_eq!(
            field.step_from(0, 0, Direction::West, BoundaryPolicy::Clamp),
            (0, 0)
        );
        assert_eq!(
            field.step_from(0, 0, Direction::West, BoundaryPolicy::Wrap),
            (3, 0)
        );
        assert_eq!(
            field.step_from(2, 1, Direction::South, BoundaryPolicy::Clamp),
            (2, 2)
        );
    }
}
