use rand::seq::index;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Result, SimError};

/// Causal mutations chosen for one trait, paired 1:1 with their effect sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct CausalSelection {
    /// Distinct mutation IDs in ascending order.
    pub mutation_ids: Vec<usize>,
    /// Effect size of each mutation in `mutation_ids`.
    pub betas: Vec<f64>,
}

impl CausalSelection {
    pub fn len(&self) -> usize {
        self.mutation_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutation_ids.is_empty()
    }
}

/// Convert a signed causal-site count coming from user input.
///
/// # Errors
/// Returns a validation error if `num_causal` is negative.
pub fn causal_count(num_causal: i64) -> Result<usize> {
    usize::try_from(num_causal).map_err(|_| {
        SimError::validation("Number of causal sites should be a non-negative integer")
    })
}

/// Choose `num_causal` distinct mutations uniformly from `0..num_mutations`
/// and draw an effect size for each from `Normal(trait_mean, trait_sd)`.
///
/// IDs are drawn first, then sorted, then one effect is drawn per ID. Only
/// the state of `rng` is consumed.
///
/// # Errors
/// Returns a validation error if `num_causal > num_mutations`, or if
/// `trait_sd` is negative or not finite.
pub fn choose_causal<R: Rng + ?Sized>(
    num_mutations: usize,
    num_causal: usize,
    trait_mean: f64,
    trait_sd: f64,
    rng: &mut R,
) -> Result<CausalSelection> {
    if num_causal > num_mutations {
        return Err(SimError::validation(
            "There are more causal sites than the number of mutations inside the tree sequence",
        ));
    }
    if !(trait_sd >= 0.0) || !trait_sd.is_finite() {
        return Err(SimError::validation(
            "Standard deviation should be a non-negative number",
        ));
    }
    if !trait_mean.is_finite() {
        return Err(SimError::validation("Trait mean should be a finite number"));
    }

    if num_causal == 0 {
        return Ok(CausalSelection {
            mutation_ids: Vec::new(),
            betas: Vec::new(),
        });
    }

    let mut mutation_ids = index::sample(rng, num_mutations, num_causal).into_vec();
    mutation_ids.sort_unstable();

    let normal = Normal::new(trait_mean, trait_sd).map_err(|e| {
        SimError::validation(format!("Invalid effect-size distribution: {}", e))
    })?;
    let betas: Vec<f64> = (0..num_causal).map(|_| normal.sample(&mut *rng)).collect();

    log::debug!(
        "Selected {} causal sites out of {} mutations",
        num_causal,
        num_mutations
    );

    Ok(CausalSelection {
        mutation_ids,
        betas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_choose_causal_shapes() {
        for &num_mutations in &[10usize, 100, 1000] {
            for &num_causal in &[1usize, 2, 10] {
                for &sd in &[0.1, 0.5, 0.9] {
                    for &mean in &[-1.0, 0.0, 1.0] {
                        let mut rng = StdRng::seed_from_u64(1);
                        let sel = choose_causal(num_mutations, num_causal, mean, sd, &mut rng)
                            .unwrap();
                        assert_eq!(sel.len(), num_causal);
                        assert_eq!(sel.betas.len(), num_causal);
                        assert!(sel.mutation_ids.iter().all(|&m| m < num_mutations));
                        assert!(sel.betas.iter().all(|b| b.is_finite()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_ids_distinct_and_sorted() {
        let mut rng = StdRng::seed_from_u64(7);
        let sel = choose_causal(10, 10, 0.0, 1.0, &mut rng).unwrap();
        assert_eq!(sel.mutation_ids, (0..10).collect::<Vec<_>>());

        let sel = choose_causal(10, 3, 0.0, 1.0, &mut rng).unwrap();
        assert!(sel.mutation_ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_zero_causal_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let sel = choose_causal(10, 0, 0.0, 1.0, &mut rng).unwrap();
        assert!(sel.is_empty());
        assert!(sel.betas.is_empty());
    }

    #[test]
    fn test_zero_sd_gives_constant_effects() {
        let mut rng = StdRng::seed_from_u64(3);
        let sel = choose_causal(20, 5, 0.25, 0.0, &mut rng).unwrap();
        assert!(sel.betas.iter().all(|&b| b == 0.25));
    }

    #[test]
    fn test_more_causal_than_mutations() {
        let mut rng = StdRng::seed_from_u64(2);
        for &num_mutations in &[1usize, 2, 10, 100] {
            for &extra in &[1usize, 2, 10, 100] {
                let err = choose_causal(num_mutations, num_mutations + extra, 0.0, 1.0, &mut rng)
                    .unwrap_err();
                assert!(err
                    .to_string()
                    .contains("more causal sites than the number of mutations"));
            }
        }
    }

    #[test]
    fn test_negative_sd_rejected() {
        let mut rng = StdRng::seed_from_u64(4);
        for &sd in &[-0.1, -1.0, -10.0, f64::NAN] {
            let err = choose_causal(10, 2, 0.0, sd, &mut rng).unwrap_err();
            assert!(err.is_validation());
            assert!(err.to_string().contains("Standard deviation"));
        }
    }

    #[test]
    fn test_causal_count_conversion() {
        assert_eq!(causal_count(0).unwrap(), 0);
        assert_eq!(causal_count(12).unwrap(), 12);
        let err = causal_count(-1).unwrap_err();
        assert!(err.to_string().contains("non-negative integer"));
    }

    #[test]
    fn test_same_seed_same_selection() {
        let a = choose_causal(500, 20, 0.0, 1.0, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = choose_causal(500, 20, 0.0, 1.0, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
    }
}
