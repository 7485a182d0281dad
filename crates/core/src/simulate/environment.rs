//! Environmental noise calibrated to a target narrow-sense heritability.
//!
//! For a trait with genetic variance `V_G` and heritability `h2`, noise is
//! drawn from `Normal(0, sqrt((1 - h2) / h2 * V_G))` so that
//! `V_G / (V_G + V_E)` matches `h2` in expectation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::data::tables::check_trait_ids;
use crate::data::{GeneticValueTable, PhenotypeRecord, PhenotypeTable};
use crate::error::{Result, SimError};
use crate::types::TraitId;

/// Standard deviation of the noise when `h2 == 0`, where the genetic
/// variance plays no part and the phenotype is the noise alone.
pub const ZERO_H2_NOISE_SD: f64 = 1.0;

/// Heritability as supplied by a caller: one value, or one value per trait.
#[derive(Debug, Clone, PartialEq)]
pub enum Heritability {
    Scalar(f64),
    PerTrait(Vec<f64>),
}

impl Heritability {
    /// Resolve into a per-trait vector indexed by trait ID.
    ///
    /// A scalar counts as a vector of length one, so it only matches a
    /// single-trait table.
    ///
    /// # Errors
    /// Returns a validation error if the length does not equal `num_traits`
    /// or any value lies outside `(0, 1]`.
    pub fn resolve(&self, num_traits: usize) -> Result<Vec<f64>> {
        let h2 = match self {
            Heritability::Scalar(v) => vec![*v],
            Heritability::PerTrait(v) => v.clone(),
        };
        if h2.len() != num_traits {
            return Err(SimError::validation(
                "Length of h2 must match the number of traits",
            ));
        }
        if h2.iter().any(|&v| !(v > 0.0 && v <= 1.0)) {
            return Err(SimError::validation(
                "Narrow-sense heritability must be 0 < h2 <= 1",
            ));
        }
        Ok(h2)
    }
}

impl From<f64> for Heritability {
    fn from(v: f64) -> Self {
        Heritability::Scalar(v)
    }
}

impl From<Vec<f64>> for Heritability {
    fn from(v: Vec<f64>) -> Self {
        Heritability::PerTrait(v)
    }
}

impl From<&[f64]> for Heritability {
    fn from(v: &[f64]) -> Self {
        Heritability::PerTrait(v.to_vec())
    }
}

/// Genetic values of one trait together with simulated noise and phenotype.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitPhenotype {
    pub trait_id: TraitId,
    pub genetic_value: Vec<f64>,
    pub environmental_noise: Vec<f64>,
    pub phenotype: Vec<f64>,
}

impl TraitPhenotype {
    /// Append this trait's rows (individual IDs `0..n`) to `table`.
    pub fn append_to(&self, table: &mut PhenotypeTable) {
        for (individual_id, ((&g, &e), &p)) in self
            .genetic_value
            .iter()
            .zip(&self.environmental_noise)
            .zip(&self.phenotype)
            .enumerate()
        {
            table.rows.push(PhenotypeRecord {
                trait_id: self.trait_id,
                individual_id,
                genetic_value: g,
                environmental_noise: e,
                phenotype: p,
            });
        }
    }
}

/// Add environmental noise to one trait's genetic values.
///
/// Uses the population variance of `genetic_values`. With `h2 == 1` the
/// noise is zero; with `h2 == 0` the noise is drawn from
/// `Normal(0, ZERO_H2_NOISE_SD)` and the phenotype is the noise alone.
///
/// # Errors
/// Returns a validation error if `genetic_values` is empty or `h2` is not a
/// number in `[0, 1]`.
pub fn environment<R: Rng + ?Sized>(
    genetic_values: &[f64],
    h2: f64,
    trait_id: TraitId,
    rng: &mut R,
) -> Result<TraitPhenotype> {
    if genetic_values.is_empty() {
        return Err(SimError::validation("No individuals in the simulation model"));
    }
    if !(0.0..=1.0).contains(&h2) {
        return Err(SimError::validation("Heritability should be 0 <= h2 <= 1"));
    }

    let n = genetic_values.len();
    let (noise, phenotype) = if h2 == 1.0 {
        (vec![0.0; n], genetic_values.to_vec())
    } else if h2 == 0.0 {
        let noise = draw_noise(n, ZERO_H2_NOISE_SD, rng)?;
        (noise.clone(), noise)
    } else {
        let var = variance(genetic_values, 0);
        if var == 0.0 {
            log::warn!("Trait {}: genetic variance is zero, noise will be zero", trait_id);
        }
        let sd = ((1.0 - h2) / h2 * var).sqrt();
        let noise = draw_noise(n, sd, rng)?;
        let phenotype = genetic_values.iter().zip(&noise).map(|(g, e)| g + e).collect();
        (noise, phenotype)
    };

    Ok(TraitPhenotype {
        trait_id,
        genetic_value: genetic_values.to_vec(),
        environmental_noise: noise,
        phenotype,
    })
}

/// Add environmental noise to every row of a multi-trait genetic table.
///
/// `h2[t]` is the heritability of trait `t`. Each trait uses the sample
/// variance of its own genetic values; noise is drawn row by row in table
/// order.
///
/// # Errors
/// Returns a validation error if the table is empty, trait IDs are not
/// `0..k`, `h2` does not have `k` entries, or an entry lies outside `(0, 1]`.
pub fn sim_environment<R: Rng + ?Sized>(
    genetic: &GeneticValueTable,
    h2: &[f64],
    rng: &mut R,
) -> Result<PhenotypeTable> {
    if genetic.is_empty() {
        return Err(SimError::validation("No individuals in the simulation model"));
    }
    let num_traits = check_trait_ids(&genetic.trait_ids())?;
    let h2 = Heritability::PerTrait(h2.to_vec()).resolve(num_traits)?;

    let mut per_trait: Vec<Vec<f64>> = vec![Vec::new(); num_traits];
    for row in &genetic.rows {
        per_trait[row.trait_id].push(row.genetic_value);
    }

    let mut noise_dists = Vec::with_capacity(num_traits);
    for (trait_id, values) in per_trait.iter().enumerate() {
        if values.len() < 2 {
            log::warn!(
                "Trait {} has {} individual(s); sample variance taken as zero",
                trait_id,
                values.len()
            );
        }
        let var = variance(values, 1);
        let sd = ((1.0 - h2[trait_id]) / h2[trait_id] * var).sqrt();
        log::debug!(
            "Trait {}: genetic variance {:.6}, environmental sd {:.6}",
            trait_id,
            var,
            sd
        );
        noise_dists.push(noise_distribution(sd)?);
    }

    let rows = genetic
        .rows
        .iter()
        .map(|row| {
            let noise = noise_dists[row.trait_id].sample(&mut *rng);
            PhenotypeRecord {
                trait_id: row.trait_id,
                individual_id: row.individual_id,
                genetic_value: row.genetic_value,
                environmental_noise: noise,
                phenotype: row.genetic_value + noise,
            }
        })
        .collect();

    Ok(PhenotypeTable { rows })
}

/// Table-form entry point: resolve heritability, seed a generator and run
/// [`sim_environment`]. Without a seed the generator is seeded from entropy.
///
/// # Errors
/// See [`sim_environment`] and [`Heritability::resolve`].
pub fn sim_env(
    genetic: &GeneticValueTable,
    h2: impl Into<Heritability>,
    seed: Option<u64>,
) -> Result<PhenotypeTable> {
    if genetic.is_empty() {
        return Err(SimError::validation("No individuals in the simulation model"));
    }
    let num_traits = check_trait_ids(&genetic.trait_ids())?;
    let h2 = h2.into().resolve(num_traits)?;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    sim_environment(genetic, &h2, &mut rng)
}

/// Variance with `ddof` delta degrees of freedom; zero when `n <= ddof`.
fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    ss / (n - ddof) as f64
}

fn noise_distribution(sd: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, sd).map_err(|_| {
        SimError::validation(format!(
            "Environmental standard deviation {} is not a finite non-negative number",
            sd
        ))
    })
}

fn draw_noise<R: Rng + ?Sized>(n: usize, sd: f64, rng: &mut R) -> Result<Vec<f64>> {
    let dist = noise_distribution(sd)?;
    Ok((0..n).map(|_| dist.sample(&mut *rng)).collect())
}
