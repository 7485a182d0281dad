//! End-to-end phenotype simulation: causal-site selection, genetic values and
//! environmental noise, for one or more independent traits.
//!
//! # Example
//!
//! ```no_run
//! use treepheno_core::ancestry::TreeSequence;
//! use treepheno_core::simulate::{PhenotypeSimulator, TraitModel};
//!
//! let ts = TreeSequence::from_json_file("ancestry.json")?;
//! let result = PhenotypeSimulator::new(&ts)
//!     .seed(42)
//!     .add_trait(TraitModel::new(10).sd(1.0).h2(0.3))
//!     .run()?;
//! println!("{} phenotypes", result.phenotypes.len());
//! # Ok::<(), treepheno_core::SimError>(())
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::ancestry::Ancestry;
use crate::data::{CausalSiteRecord, CausalSiteTable, GeneticValueTable, PhenotypeTable};
use crate::error::{Result, SimError};

use super::causal::choose_causal;
use super::environment::environment;
use super::genetic::genetic_value;

/// Parameters of one simulated trait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitModel {
    /// Number of causal mutations.
    pub num_causal: usize,
    /// Mean of the effect-size distribution.
    pub mean: f64,
    /// Standard deviation of the effect-size distribution.
    pub sd: f64,
    /// Narrow-sense heritability in `[0, 1]`.
    pub h2: f64,
}

impl TraitModel {
    /// A trait with `num_causal` causal sites, effect sizes from `Normal(0, 1)`
    /// and heritability 0.5.
    pub fn new(num_causal: usize) -> Self {
        Self {
            num_causal,
            mean: 0.0,
            sd: 1.0,
            h2: 0.5,
        }
    }

    /// Set the mean effect size (default: 0).
    pub fn mean(mut self, mean: f64) -> Self {
        self.mean = mean;
        self
    }

    /// Set the effect-size standard deviation (default: 1).
    pub fn sd(mut self, sd: f64) -> Self {
        self.sd = sd;
        self
    }

    /// Set the heritability (default: 0.5).
    pub fn h2(mut self, h2: f64) -> Self {
        self.h2 = h2;
        self
    }
}

/// Tables produced by one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub phenotypes: PhenotypeTable,
    pub genetic_values: GeneticValueTable,
    pub causal_sites: CausalSiteTable,
}

/// Builder-style driver for multi-trait phenotype simulation.
///
/// Traits are independent and numbered in the order they are added. All
/// randomness comes from one generator, consumed trait by trait: causal
/// sites, then effect sizes, then environmental noise.
pub struct PhenotypeSimulator<'a, A: Ancestry + ?Sized> {
    ancestry: &'a A,
    traits: Vec<TraitModel>,
    seed: Option<u64>,
}

impl<'a, A: Ancestry + ?Sized> PhenotypeSimulator<'a, A> {
    /// Create a simulator over `ancestry` with no traits and no fixed seed.
    pub fn new(ancestry: &'a A) -> Self {
        Self {
            ancestry,
            traits: Vec::new(),
            seed: None,
        }
    }

    /// Fix the random seed for reproducible output.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add a trait; it receives the next trait ID.
    pub fn add_trait(mut self, model: TraitModel) -> Self {
        self.traits.push(model);
        self
    }

    /// Replace all traits.
    pub fn traits(mut self, models: &[TraitModel]) -> Self {
        self.traits = models.to_vec();
        self
    }

    /// Run with a generator seeded from the configured seed, or from entropy
    /// when no seed was given.
    pub fn run(&self) -> Result<SimulationResult> {
        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(&mut rng)
    }

    /// Run using a caller-supplied generator.
    ///
    /// # Errors
    /// Returns a validation error if no trait was added, the ancestry has no
    /// mutations, or any trait parameter is out of range. No output is
    /// produced on error.
    pub fn run_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SimulationResult> {
        if self.traits.is_empty() {
            return Err(SimError::validation("At least one trait must be simulated"));
        }
        let num_mutations = self.ancestry.num_mutations();
        if num_mutations == 0 {
            return Err(SimError::validation("No mutation in the provided data"));
        }

        let mut phenotypes = PhenotypeTable::new();
        let mut genetic_values = GeneticValueTable::new();
        let mut causal_sites = CausalSiteTable::new();

        for (trait_id, model) in self.traits.iter().enumerate() {
            let selection =
                choose_causal(num_mutations, model.num_causal, model.mean, model.sd, rng)?;
            let gv = genetic_value(self.ancestry, &selection.mutation_ids, &selection.betas)?;
            let pheno = environment(&gv.values, model.h2, trait_id, rng)?;

            causal_sites
                .rows
                .extend(gv.sites.iter().map(|s| CausalSiteRecord {
                    trait_id,
                    mutation_id: s.mutation_id,
                    site_id: s.site,
                    position: s.position,
                    node: s.node,
                    effect_size: s.beta,
                }));
            genetic_values.extend_trait(trait_id, &gv.values);
            pheno.append_to(&mut phenotypes);
        }

        log::info!(
            "Simulated {} trait(s) for {} individuals ({} causal sites)",
            self.traits.len(),
            self.ancestry.num_individuals(),
            causal_sites.len()
        );

        Ok(SimulationResult {
            phenotypes,
            genetic_values,
            causal_sites,
        })
    }
}

/// Simulate a single trait with effect sizes from `Normal(0, trait_sd)`.
///
/// Returns the phenotype table and the causal-site table.
///
/// # Errors
/// Propagates the validation errors of each stage.
pub fn phenotype_sim<A: Ancestry + ?Sized>(
    ancestry: &A,
    num_causal: usize,
    trait_sd: f64,
    h2: f64,
    seed: Option<u64>,
) -> Result<(PhenotypeTable, CausalSiteTable)> {
    let model = TraitModel::new(num_causal).sd(trait_sd).h2(h2);
    let mut sim = PhenotypeSimulator::new(ancestry).add_trait(model);
    if let Some(s) = seed {
        sim = sim.seed(s);
    }
    let result = sim.run()?;
    Ok((result.phenotypes, result.causal_sites))
}

/// Run one independent replicate per seed, in parallel.
///
/// Each replicate owns its generator, so the output for a given seed does
/// not depend on how many replicates run or in which order.
///
/// # Errors
/// Returns the first error encountered by any replicate.
pub fn simulate_replicates<A: Ancestry + Sync + ?Sized>(
    ancestry: &A,
    traits: &[TraitModel],
    seeds: &[u64],
) -> Result<Vec<SimulationResult>> {
    seeds
        .par_iter()
        .map(|&seed| {
            PhenotypeSimulator::new(ancestry)
                .traits(traits)
                .seed(seed)
                .run()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ancestry::{Mutation, Site, TreeSequence, TreeTopology};
    use crate::types::NodeId;

    fn comb_sequence(n: usize) -> TreeSequence {
        let tree = TreeTopology::comb(n, 100.0).unwrap();
        let num_nodes = tree.num_nodes();
        let samples: Vec<NodeId> = (0..n as NodeId).collect();
        // One mutation above every non-root node.
        let sites = (0..num_nodes - 1)
            .map(|j| Site { position: j as f64 })
            .collect();
        let mutations = (0..num_nodes - 1)
            .map(|j| Mutation {
                site: j,
                node: j as NodeId,
            })
            .collect();
        TreeSequence::single_tree(tree, &samples, sites, mutations).unwrap()
    }

    #[test]
    fn test_phenotype_sim_shapes() {
        let ts = comb_sequence(20);
        for &num_causal in &[1usize, 2, 10] {
            let (pheno, sites) = phenotype_sim(&ts, num_causal, 1.0, 0.3, Some(1)).unwrap();
            assert_eq!(pheno.len(), 10);
            assert_eq!(sites.len(), num_causal);
            assert!(pheno.rows.iter().all(|r| r.phenotype.is_finite()));
        }
    }

    #[test]
    fn test_no_mutation_rejected() {
        let tree = TreeTopology::comb(4, 1.0).unwrap();
        let ts = TreeSequence::single_tree(tree, &[0, 1, 2, 3], vec![], vec![]).unwrap();
        let err = phenotype_sim(&ts, 2, 1.0, 0.3, Some(1)).unwrap_err();
        assert_eq!(err.to_string(), "No mutation in the provided data");
    }

    #[test]
    fn test_no_traits_rejected() {
        let ts = comb_sequence(4);
        let err = PhenotypeSimulator::new(&ts).seed(1).run().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_multi_trait_ids() {
        let ts = comb_sequence(8);
        let result = PhenotypeSimulator::new(&ts)
            .seed(3)
            .add_trait(TraitModel::new(2).h2(0.4))
            .add_trait(TraitModel::new(5).mean(1.0).sd(0.5).h2(0.9))
            .run()
            .unwrap();
        assert_eq!(result.phenotypes.len(), 8);
        assert_eq!(result.phenotypes.for_trait(1).count(), 4);
        assert_eq!(result.causal_sites.len(), 7);
        assert_eq!(
            result.genetic_values.trait_ids().into_iter().collect::<Vec<_>>(),
            vec![0, 1]
        );
    }

    #[test]
    fn test_replicates_match_sequential_runs() {
        let ts = comb_sequence(10);
        let traits = [TraitModel::new(3).h2(0.5)];
        let seeds = [5u64, 6, 7];
        let parallel = simulate_replicates(&ts, &traits, &seeds).unwrap();
        for (result, &seed) in parallel.iter().zip(&seeds) {
            let single = PhenotypeSimulator::new(&ts)
                .traits(&traits)
                .seed(seed)
                .run()
                .unwrap();
            assert_eq!(result, &single);
        }
    }
}
