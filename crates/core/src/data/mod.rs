mod dataframe;
mod io;
pub mod tables;

pub use dataframe::{Column, DataFrame};
pub use tables::{
    CausalSiteRecord, CausalSiteTable, GeneticValueRecord, GeneticValueTable, PhenotypeRecord,
    PhenotypeTable, GENETIC_COLUMNS,
};
