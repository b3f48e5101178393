//! Ordered, mutable collection of genes defining a cell's metabolic
//! capability set, plus its mutation model and lineage identity.

use crate::gene::Gene;
use rand::Rng;
use std::collections::BTreeSet;
use std::{error::Error, fmt};

#[derive(Clone, Debug, PartialEq)]
pub struct Genome {
    genes: Vec<Gene>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenomeError {
    Empty,
}

impl fmt::Display for GenomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenomeError::Empty => write!(f, "a genome must contain at least one gene"),
        }
    }
}

impl Error for GenomeError {}

/// Per-division mutation probabilities and magnitudes. Point tweaks apply per
/// gene; duplication and deletion apply once per genome.
#[derive(Clone, Copy, Debug)]
pub struct MutationRates {
    pub cost_rate: f64,
    pub cost_delta: f64,
    /// Costs never drop below this floor.
    pub cost_floor: f64,
    pub prob_rate: f64,
    pub prob_delta: f64,
    pub duplication_rate: f64,
    pub deletion_rate: f64,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            cost_rate: 0.08,
            cost_delta: 0.1,
            cost_floor: 0.1,
            prob_rate: 0.05,
            prob_delta: 0.1,
            duplication_rate: 0.01,
            deletion_rate: 0.01,
        }
    }
}

impl Genome {
    pub fn new(genes: Vec<Gene>) -> Self {
        Self::try_new(genes).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(genes: Vec<Gene>) -> Result<Self, GenomeError> {
        if genes.is_empty() {
            return Err(GenomeError::Empty);
        }
        Ok(Self { genes })
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Union of all molecules consumable by some gene.
    pub fn needs(&self) -> BTreeSet<String> {
        self.genes
            .iter()
            .flat_map(|g| g.input_molecules())
            .collect()
    }

    /// Molecules producible by some gene but consumed by none: the genome's
    /// waste. Emergent from genome composition, so producer/recycler
    /// relationships arise purely from gene structure.
    pub fn waste_set(&self) -> BTreeSet<String> {
        let needs = self.needs();
        self.genes
            .iter()
            .flat_map(|g| g.output_molecules())
            .filter(|mol| !needs.contains(mol))
            .collect()
    }

    /// Tolerance for one molecule: the maximum any gene declares, or
    /// `baseline` when no gene declares one.
    pub fn tolerance_for(&self, molecule: &str, baseline: f64) -> f64 {
        self.genes
            .iter()
            .filter_map(|g| g.tolerance.get(molecule).copied())
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))))
            .unwrap_or(baseline)
    }

    /// Applies point mutations, duplication and deletion in place. Deletion
    /// never reduces the genome below one gene.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R, rates: &MutationRates) {
        for gene in &mut self.genes {
            if rng.random::<f64>() < rates.cost_rate {
                let delta = rng.random_range(-rates.cost_delta..=rates.cost_delta);
                gene.cost = (gene.cost + delta).max(rates.cost_floor);
            }
            if rng.random::<f64>() < rates.prob_rate {
                let delta = rng.random_range(-rates.prob_delta..=rates.prob_delta);
                gene.prob = (gene.prob + delta).clamp(0.0, 1.0);
            }
        }

        if rng.random::<f64>() < rates.duplication_rate {
            let target = rng.random_range(0..self.genes.len());
            let copy = self.genes[target].clone();
            self.genes.push(copy);
        }

        if self.genes.len() > 1 && rng.random::<f64>() < rates.deletion_rate {
            let target = rng.random_range(0..self.genes.len());
            self.genes.remove(target);
        }
    }

    /// Content digest over the sorted set of gene identities. Genomes with
    /// the same functional gene multiset hash identically regardless of gene
    /// order.
    pub fn hash(&self) -> u64 {
        let mut ids: Vec<String> = self.genes.iter().map(|g| g.identity()).collect();
        ids.sort();
        ids.dedup();
        let mut h = FNV_OFFSET_BASIS;
        for id in &ids {
            h = fnv1a_fold(h, id.as_bytes());
            h = fnv1a_fold(h, b"\x00");
        }
        h
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a_fold(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::mixture;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn producer_gene() -> Gene {
        // A -> B + C
        Gene::stoichiometric(
            mixture(&[("A", 1.0)]),
            mixture(&[("B", 0.5), ("C", 0.5)]),
            0.2,
            0.98,
            2.5,
        )
    }

    fn recycler_gene() -> Gene {
        // B -> A
        Gene::stoichiometric(mixture(&[("B", 1.0)]), mixture(&[("A", 0.6)]), 0.25, 0.95, 1.5)
    }

    #[test]
    fn empty_genome_is_rejected() {
        assert_eq!(Genome::try_new(Vec::new()), Err(GenomeError::Empty));
    }

    #[test]
    fn waste_is_output_consumed_by_no_gene() {
        let producer_only = Genome::new(vec![producer_gene()]);
        let waste = producer_only.waste_set();
        assert!(waste.contains("B") && waste.contains("C"));

        // Adding a consumer of B removes B from the waste set.
        let with_recycler = Genome::new(vec![producer_gene(), recycler_gene()]);
        let waste = with_recycler.waste_set();
        assert!(!waste.contains("B"));
        assert!(waste.contains("C"));
        // A is both consumed and produced, so it is never waste.
        assert!(!waste.contains("A"));
    }

    #[test]
    fn needs_union_all_gene_inputs() {
        let genome = Genome::new(vec![producer_gene(), recycler_gene()]);
        let needs = genome.needs();
        assert!(needs.contains("A") && needs.contains("B"));
        assert!(!needs.contains("C"));
    }

    #[test]
    fn tolerance_defaults_to_baseline_and_takes_the_declared_max() {
        let lenient = producer_gene().with_tolerance(mixture(&[("B", 100.0)]));
        let strict = recycler_gene().with_tolerance(mixture(&[("B", 20.0)]));
        let genome = Genome::new(vec![lenient, strict]);
        assert_eq!(genome.tolerance_for("B", 10.0), 100.0);
        assert_eq!(genome.tolerance_for("C", 10.0), 10.0);
    }

    #[test]
    fn hash_is_order_independent() {
        let ab = Genome::new(vec![producer_gene(), recycler_gene()]);
        let ba = Genome::new(vec![recycler_gene(), producer_gene()]);
        assert_eq!(ab.hash(), ba.hash());
        let a = Genome::new(vec![producer_gene()]);
        assert_ne!(ab.hash(), a.hash());
    }

    #[test]
    fn hash_ignores_duplicated_genes() {
        let single = Genome::new(vec![producer_gene()]);
        let doubled = Genome::new(vec![producer_gene(), producer_gene()]);
        assert_eq!(single.hash(), doubled.hash());
    }

    #[test]
    fn mutation_is_deterministic_for_fixed_seed() {
        let mut a = Genome::new(vec![producer_gene(), recycler_gene()]);
        let mut b = a.clone();
        let rates = MutationRates::default();
        let mut rng_a = ChaCha12Rng::seed_from_u64(123);
        let mut rng_b = ChaCha12Rng::seed_from_u64(123);
        for _ in 0..100 {
            a.mutate(&mut rng_a, &rates);
            b.mutate(&mut rng_b, &rates);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn deletion_never_empties_the_genome() {
        let mut genome = Genome::new(vec![producer_gene()]);
        let rates = MutationRates {
            deletion_rate: 1.0,
            duplication_rate: 0.0,
            ..MutationRates::default()
        };
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        for _ in 0..50 {
            genome.mutate(&mut rng, &rates);
        }
        assert_eq!(genome.len(), 1);
    }

    #[test]
    fn mutation_respects_cost_floor_and_prob_bounds() {
        let mut genome = Genome::new(vec![producer_gene()]);
        let rates = MutationRates {
            cost_rate: 1.0,
            prob_rate: 1.0,
            duplication_rate: 0.0,
            deletion_rate: 0.0,
            ..MutationRates::default()
        };
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        for _ in 0..500 {
            genome.mutate(&mut rng, &rates);
            let gene = &genome.genes()[0];
            assert!(gene.cost >= rates.cost_floor);
            assert!((0.0..=1.0).contains(&gene.prob));
        }
    }
}
