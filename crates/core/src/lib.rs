pub mod ancestry;
pub mod data;
pub mod error;
pub mod simulate;
pub mod types;

pub use error::{Result, SimError};
