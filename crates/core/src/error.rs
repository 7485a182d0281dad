use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    /// A checked precondition on simulation inputs failed.
    #[error("{0}")]
    Validation(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Column '{0}' not found in DataFrame")]
    ColumnNotFound(String),

    #[error("Dimension mismatch: expected {expected}, got {got} in {context}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: String,
    },

    #[error("Malformed tree topology: {0}")]
    Topology(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        SimError::Validation(message.into())
    }

    /// Returns `true` for input-validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, SimError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
