//! Typed row tables exchanged between the simulation stages, with conversion
//! to and from [`DataFrame`] for CSV output.

use std::collections::BTreeSet;

use crate::error::{Result, SimError};
use crate::types::{NodeId, TraitId};

use super::dataframe::DataFrame;

/// Columns a genetic-value table must provide.
pub const GENETIC_COLUMNS: [&str; 3] = ["trait_id", "individual_id", "genetic_value"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneticValueRecord {
    pub trait_id: TraitId,
    pub individual_id: usize,
    pub genetic_value: f64,
}

/// Genetic value of each individual for each trait.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneticValueTable {
    pub rows: Vec<GeneticValueRecord>,
}

impl GeneticValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row per individual for `trait_id`.
    pub fn extend_trait(&mut self, trait_id: TraitId, values: &[f64]) {
        self.rows.extend(
            values
                .iter()
                .enumerate()
                .map(|(individual_id, &genetic_value)| GeneticValueRecord {
                    trait_id,
                    individual_id,
                    genetic_value,
                }),
        );
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct trait IDs, ascending.
    pub fn trait_ids(&self) -> BTreeSet<TraitId> {
        self.rows.iter().map(|r| r.trait_id).collect()
    }

    /// Build from a DataFrame holding the [`GENETIC_COLUMNS`]. Extra columns
    /// are ignored.
    ///
    /// # Errors
    /// Returns [`SimError::ColumnNotFound`] if a required column is missing and
    /// [`SimError::Data`] if an ID column holds a negative or fractional value.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        df.require_columns(&GENETIC_COLUMNS)?;
        let trait_ids = df.get_index("trait_id")?;
        let individual_ids = df.get_index("individual_id")?;
        let values = df.get_f64("genetic_value")?;

        let rows = trait_ids
            .into_iter()
            .zip(individual_ids)
            .zip(values)
            .map(|((trait_id, individual_id), genetic_value)| GeneticValueRecord {
                trait_id,
                individual_id,
                genetic_value,
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut df = DataFrame::new();
        df.add_integer_column("trait_id", self.rows.iter().map(|r| r.trait_id as i64).collect())?;
        df.add_integer_column(
            "individual_id",
            self.rows.iter().map(|r| r.individual_id as i64).collect(),
        )?;
        df.add_float_column("genetic_value", self.rows.iter().map(|r| r.genetic_value).collect())?;
        Ok(df)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhenotypeRecord {
    pub trait_id: TraitId,
    pub individual_id: usize,
    pub genetic_value: f64,
    pub environmental_noise: f64,
    pub phenotype: f64,
}

/// Final phenotypes with their genetic and environmental components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhenotypeTable {
    pub rows: Vec<PhenotypeRecord>,
}

impl PhenotypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows belonging to `trait_id`, in stored order.
    pub fn for_trait(&self, trait_id: TraitId) -> impl Iterator<Item = &PhenotypeRecord> {
        self.rows.iter().filter(move |r| r.trait_id == trait_id)
    }

    pub fn phenotypes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.phenotype).collect()
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut df = DataFrame::new();
        df.add_integer_column(
            "individual_id",
            self.rows.iter().map(|r| r.individual_id as i64).collect(),
        )?;
        df.add_integer_column("trait_id", self.rows.iter().map(|r| r.trait_id as i64).collect())?;
        df.add_float_column("genetic_value", self.rows.iter().map(|r| r.genetic_value).collect())?;
        df.add_float_column(
            "environmental_noise",
            self.rows.iter().map(|r| r.environmental_noise).collect(),
        )?;
        df.add_float_column("phenotype", self.rows.iter().map(|r| r.phenotype).collect())?;
        Ok(df)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CausalSiteRecord {
    pub trait_id: TraitId,
    pub mutation_id: usize,
    pub site_id: usize,
    pub position: f64,
    pub node: NodeId,
    pub effect_size: f64,
}

/// Causal mutations of each trait and where they sit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CausalSiteTable {
    pub rows: Vec<CausalSiteRecord>,
}

impl CausalSiteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut df = DataFrame::new();
        df.add_integer_column("trait_id", self.rows.iter().map(|r| r.trait_id as i64).collect())?;
        df.add_integer_column(
            "mutation_id",
            self.rows.iter().map(|r| r.mutation_id as i64).collect(),
        )?;
        df.add_integer_column("site_id", self.rows.iter().map(|r| r.site_id as i64).collect())?;
        df.add_float_column("position", self.rows.iter().map(|r| r.position).collect())?;
        df.add_integer_column("node", self.rows.iter().map(|r| r.node as i64).collect())?;
        df.add_float_column("effect_size", self.rows.iter().map(|r| r.effect_size).collect())?;
        Ok(df)
    }
}

/// Check that trait IDs form the dense range `0..k` and return `k`.
pub(crate) fn check_trait_ids(trait_ids: &BTreeSet<TraitId>) -> Result<usize> {
    let k = trait_ids.len();
    let dense = match (trait_ids.first(), trait_ids.last()) {
        (Some(&lo), Some(&hi)) => lo == 0 && hi == k - 1,
        _ => false,
    };
    if !dense {
        return Err(SimError::validation(
            "trait_id must be consecutive and start from 0",
        ));
    }
    Ok(k)
}
