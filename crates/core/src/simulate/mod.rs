//! The simulation pipeline: causal-site selection, push-down accumulation
//! over trees, genetic-value aggregation, and environmental noise.

pub mod causal;
pub mod environment;
pub mod genetic;
pub mod phenotype;
pub mod traversal;

pub use causal::{causal_count, choose_causal, CausalSelection};
pub use environment::{
    environment, sim_env, sim_environment, Heritability, TraitPhenotype, ZERO_H2_NOISE_SD,
};
pub use genetic::{genetic_value, CausalSite, GeneticValues};
pub use phenotype::{
    phenotype_sim, simulate_replicates, PhenotypeSimulator, SimulationResult, TraitModel,
};
pub use traversal::propagate;
