//! One catalytic reaction rule: inputs, outputs, activation cost, success
//! probability, energy yield, and environmental tolerances.
//!
//! Two incompatible reaction encodings exist and are kept behind one
//! capability surface (`can_react` / `apply`): the continuous named-molecule
//! stoichiometry, and the fixed-width "digital chemistry" bitmask where a
//! molecule is an 8-bit value and the gene is an enzyme mask.

use crate::chemistry::{self, ChemMap};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Energy gained per extracted bit in a digital reaction.
pub const DIGITAL_ENERGY_PER_BIT: f64 = 2.0;
/// Flat activation cost of a digital enzyme.
pub const DIGITAL_COST_BASE: f64 = 1.0;
/// Extra activation cost per set bit of the enzyme mask.
pub const DIGITAL_COST_PER_BIT: f64 = 0.2;

#[derive(Clone, Debug, PartialEq)]
pub enum ReactionKind {
    /// Continuous chemistry: consume `inputs`, produce `outputs`.
    Stoichiometric {
        inputs: BTreeMap<String, f64>,
        outputs: BTreeMap<String, f64>,
    },
    /// 8-bit alchemy: react with one unit of any stored molecule whose table
    /// value overlaps `mask`. Extracted bits become energy, the remaining
    /// bits become a waste molecule.
    Digital { mask: u8 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Gene {
    pub kind: ReactionKind,
    /// Energy paid on every attempt, success or not.
    pub cost: f64,
    /// Success probability in [0, 1].
    pub prob: f64,
    /// Energy gained on success (stoichiometric only; digital yield is
    /// computed from the extracted bits).
    pub energy_yield: f64,
    /// Per-molecule tolerance overrides.
    pub tolerance: BTreeMap<String, f64>,
}

impl Gene {
    pub fn stoichiometric(
        inputs: ChemMap,
        outputs: ChemMap,
        cost: f64,
        prob: f64,
        energy_yield: f64,
    ) -> Self {
        Self {
            kind: ReactionKind::Stoichiometric { inputs, outputs },
            cost,
            prob: prob.clamp(0.0, 1.0),
            energy_yield,
            tolerance: BTreeMap::new(),
        }
    }

    /// Digital enzyme; activation cost scales with mask complexity.
    pub fn digital(mask: u8, prob: f64) -> Self {
        Self {
            kind: ReactionKind::Digital { mask },
            cost: DIGITAL_COST_BASE + mask.count_ones() as f64 * DIGITAL_COST_PER_BIT,
            prob: prob.clamp(0.0, 1.0),
            energy_yield: 0.0,
            tolerance: BTreeMap::new(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: ChemMap) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Molecules this gene can consume. For digital genes this is every table
    /// molecule overlapping the mask.
    pub fn input_molecules(&self) -> BTreeSet<String> {
        match &self.kind {
            ReactionKind::Stoichiometric { inputs, .. } => inputs.keys().cloned().collect(),
            ReactionKind::Digital { mask } => chemistry::names_matching(*mask)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Molecules this gene can produce. For digital genes this is the waste
    /// residue of every reachable substrate.
    pub fn output_molecules(&self) -> BTreeSet<String> {
        match &self.kind {
            ReactionKind::Stoichiometric { outputs, .. } => outputs.keys().cloned().collect(),
            ReactionKind::Digital { mask } => chemistry::names_matching(*mask)
                .into_iter()
                .filter_map(|name| {
                    let value = chemistry::bit_value(name)?;
                    let waste = value & !mask;
                    (waste != 0).then(|| chemistry::bit_name(waste))
                })
                .collect(),
        }
    }

    /// True iff `energy` covers the activation cost and every required
    /// substrate is stored in sufficient quantity.
    pub fn can_react(&self, chemistry: &ChemMap, energy: f64) -> bool {
        if energy < self.cost {
            return false;
        }
        match &self.kind {
            ReactionKind::Stoichiometric { inputs, .. } => inputs
                .iter()
                .all(|(mol, &need)| chemistry.get(mol).copied().unwrap_or(0.0) >= need),
            ReactionKind::Digital { mask } => chemistry
                .iter()
                .any(|(mol, &amt)| amt >= 1.0 && overlaps(mol, *mask)),
        }
    }

    /// Attempts the reaction. The activation cost is always paid; on a failed
    /// probability draw the chemistry is left untouched. Returns the new
    /// energy level.
    pub fn apply<R: Rng + ?Sized>(&self, chem: &mut ChemMap, energy: f64, rng: &mut R) -> f64 {
        if rng.random::<f64>() > self.prob {
            return energy - self.cost;
        }
        match &self.kind {
            ReactionKind::Stoichiometric { inputs, outputs } => {
                for (mol, need) in inputs {
                    if let Some(stored) = chem.get_mut(mol) {
                        *stored -= need;
                        if *stored <= 1e-12 {
                            chem.remove(mol);
                        }
                    }
                }
                for (mol, produced) in outputs {
                    *chem.entry(mol.clone()).or_insert(0.0) += produced;
                }
                energy - self.cost + self.energy_yield
            }
            ReactionKind::Digital { mask } => {
                let Some(substrate) = chem
                    .iter()
                    .find(|(mol, &amt)| amt >= 1.0 && overlaps(mol, *mask))
                    .map(|(mol, _)| mol.clone())
                else {
                    return energy - self.cost;
                };
                let value = chemistry::bit_value(&substrate).unwrap_or(0);
                let stored = chem.get_mut(&substrate).expect("substrate just found");
                *stored -= 1.0;
                if *stored <= 1e-12 {
                    chem.remove(&substrate);
                }
                let extracted = value & mask;
                let waste = value ^ extracted;
                if waste != 0 {
                    *chem.entry(chemistry::bit_name(waste)).or_insert(0.0) += 1.0;
                }
                energy - self.cost + extracted.count_ones() as f64 * DIGITAL_ENERGY_PER_BIT
            }
        }
    }

    /// Deterministic identity string over sorted inputs/outputs, cost, yield
    /// and tolerances. Used for deduplication and lineage display; the
    /// success probability deliberately does not participate.
    pub fn identity(&self) -> String {
        let tol = fmt_map(&self.tolerance);
        match &self.kind {
            ReactionKind::Stoichiometric { inputs, outputs } => format!(
                "in:{}|out:{}|cost:{:.4}|yield:{:.4}|tol:{}",
                fmt_map(inputs),
                fmt_map(outputs),
                self.cost,
                self.energy_yield,
                tol,
            ),
            ReactionKind::Digital { mask } => format!(
                "mask:{mask:08b}|cost:{:.4}|yield:{:.4}|tol:{}",
                self.cost, self.energy_yield, tol,
            ),
        }
    }
}

fn overlaps(molecule: &str, mask: u8) -> bool {
    chemistry::bit_value(molecule).is_some_and(|v| v & mask != 0)
}

fn fmt_map(map: &BTreeMap<String, f64>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}={v:.4}"))
        .collect::<Vec<_>>()
        .join(",")
}
