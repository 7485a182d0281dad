use indexmap::IndexMap;

use crate::error::{Result, SimError};

/// A single column in a [`DataFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// A column of 64-bit floating-point values.
    Float(Vec<f64>),
    /// A column of 64-bit signed integers.
    Integer(Vec<i64>),
}

impl Column {
    /// Returns the number of elements in the column.
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Integer(v) => v.len(),
        }
    }

    /// Returns `true` if the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the value at `row` for text output.
    pub(crate) fn format_value(&self, row: usize) -> String {
        match self {
            Column::Float(v) => v[row].to_string(),
            Column::Integer(v) => v[row].to_string(),
        }
    }
}

/// A lightweight columnar table for simulation inputs and outputs.
///
/// Columns are stored in insertion order using an [`IndexMap`]. All columns
/// must have the same number of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    /// Ordered map of column name -> column data.
    pub(crate) columns: IndexMap<String, Column>,
    /// Number of rows. Zero when the DataFrame is empty.
    pub(crate) nrows: usize,
}

impl DataFrame {
    /// Create an empty DataFrame with no columns and no rows.
    pub fn new() -> Self {
        DataFrame {
            columns: IndexMap::new(),
            nrows: 0,
        }
    }

    /// Add a floating-point column.
    ///
    /// # Errors
    /// Returns an error if the column length does not match existing rows,
    /// or if a column with the same name already exists.
    pub fn add_float_column(&mut self, name: &str, data: Vec<f64>) -> Result<()> {
        self.validate_and_insert(name, Column::Float(data))
    }

    /// Add an integer column.
    ///
    /// # Errors
    /// Returns an error if the column length does not match existing rows,
    /// or if a column with the same name already exists.
    pub fn add_integer_column(&mut self, name: &str, data: Vec<i64>) -> Result<()> {
        self.validate_and_insert(name, Column::Integer(data))
    }

    /// Retrieve a column by name.
    ///
    /// # Errors
    /// Returns [`SimError::ColumnNotFound`] if no column with the given name exists.
    pub fn get_column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| SimError::ColumnNotFound(name.to_string()))
    }

    /// Read a numeric column as `f64`, widening integers.
    ///
    /// # Errors
    /// Returns [`SimError::ColumnNotFound`] if the column does not exist.
    pub fn get_f64(&self, name: &str) -> Result<Vec<f64>> {
        Ok(match self.get_column(name)? {
            Column::Float(v) => v.clone(),
            Column::Integer(v) => v.iter().map(|&x| x as f64).collect(),
        })
    }

    /// Read a column of non-negative whole numbers as indices.
    ///
    /// Float columns are accepted when every value is integral, since CSV
    /// input does not always preserve the integer type.
    ///
    /// # Errors
    /// Returns an error if the column is missing or holds a negative or
    /// fractional value.
    pub fn get_index(&self, name: &str) -> Result<Vec<usize>> {
        let to_index = |row: usize, x: f64| -> Result<usize> {
            if x.is_finite() && x >= 0.0 && x.fract() == 0.0 {
                Ok(x as usize)
            } else {
                Err(SimError::Data(format!(
                    "Column '{}' row {}: {} is not a non-negative integer",
                    name, row, x
                )))
            }
        };
        match self.get_column(name)? {
            Column::Integer(v) => v
                .iter()
                .enumerate()
                .map(|(row, &x)| {
                    usize::try_from(x).map_err(|_| {
                        SimError::Data(format!(
                            "Column '{}' row {}: {} is not a non-negative integer",
                            name, row, x
                        ))
                    })
                })
                .collect(),
            Column::Float(v) => v
                .iter()
                .enumerate()
                .map(|(row, &x)| to_index(row, x))
                .collect(),
        }
    }

    /// Check that every column in `required` is present.
    ///
    /// # Errors
    /// Returns [`SimError::ColumnNotFound`] for the first missing column.
    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        match required.iter().find(|name| !self.columns.contains_key(**name)) {
            Some(missing) => Err(SimError::ColumnNotFound(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Returns the number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns.
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Returns a vector of column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|s| s.as_str()).collect()
    }

    // ---- internal helpers ----

    /// Validate column length and name uniqueness, then insert.
    pub(crate) fn validate_and_insert(&mut self, name: &str, column: Column) -> Result<()> {
        if self.columns.contains_key(name) {
            return Err(SimError::Data(format!(
                "Column '{}' already exists in DataFrame",
                name
            )));
        }

        let col_len = column.len();

        if self.columns.is_empty() {
            self.nrows = col_len;
        } else if col_len != self.nrows {
            return Err(SimError::DimensionMismatch {
                expected: self.nrows,
                got: col_len,
                context: format!("adding column '{}'", name),
            });
        }

        self.columns.insert(name.to_string(), column);
        Ok(())
    }
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}
