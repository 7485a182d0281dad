use std::io::Write;
use std::path::Path;

use crate::error::{Result, SimError};

use super::dataframe::{Column, DataFrame};

impl DataFrame {
    /// Read a CSV file into a DataFrame.
    ///
    /// The first row is treated as a header. Each column is auto-detected:
    /// - If **every** value parses as `i64`, it becomes an `Integer` column.
    /// - Otherwise, if every value parses as `f64`, it becomes a `Float` column.
    /// - Otherwise the file is rejected; simulation tables are purely numeric.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, if the CSV is malformed,
    /// if rows have inconsistent numbers of fields, or if a column is not
    /// numeric.
    ///
    /// # Examples
    /// ```no_run
    /// use treepheno_core::data::DataFrame;
    ///
    /// let df = DataFrame::from_csv("genetic_values.csv").unwrap();
    /// println!("rows = {}, cols = {}", df.nrows(), df.ncols());
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;
        Self::from_csv_reader(reader)
    }

    /// Read CSV text (header first) into a DataFrame.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if headers.is_empty() {
            return Ok(DataFrame::new());
        }

        let ncols = headers.len();

        // Read all records into column-oriented vectors of strings.
        let mut string_columns: Vec<Vec<String>> = vec![Vec::new(); ncols];

        for result in reader.records() {
            let record = result?;
            if record.len() != ncols {
                return Err(SimError::Data(format!(
                    "Row has {} fields but header has {} columns",
                    record.len(),
                    ncols
                )));
            }
            for (i, field) in record.iter().enumerate() {
                string_columns[i].push(field.to_string());
            }
        }

        let mut df = DataFrame::new();

        for (header, raw) in headers.iter().zip(string_columns) {
            let ints: std::result::Result<Vec<i64>, _> =
                raw.iter().map(|s| s.parse::<i64>()).collect();
            if let Ok(values) = ints {
                df.add_integer_column(header, values)?;
                continue;
            }

            let floats: std::result::Result<Vec<f64>, _> =
                raw.iter().map(|s| s.parse::<f64>()).collect();
            match floats {
                Ok(values) => df.add_float_column(header, values)?,
                Err(_) => {
                    return Err(SimError::Data(format!(
                        "Column '{}' contains non-numeric values",
                        header
                    )));
                }
            }
        }

        Ok(df)
    }

    /// Write the DataFrame as CSV with a header row.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_csv(file)
    }

    /// Write the DataFrame as CSV into any writer.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.columns.keys())?;
        let columns: Vec<&Column> = self.columns.values().collect();
        for row in 0..self.nrows {
            wtr.write_record(columns.iter().map(|c| c.format_value(row)))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Render the DataFrame as a CSV string.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| SimError::Data(e.to_string()))
    }
}
