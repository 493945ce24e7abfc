use std::io::Read;
use std::path::Path;

use crate::error::{R2Error, Result};

use super::dataframe::{Column, DataFrame};

/// Tokens read as a missing numeric value.
const MISSING_TOKENS: [&str; 5] = ["", "NA", "NaN", "nan", "."];

/// Returns `true` if a CSV field denotes a missing value.
pub fn is_missing_token(field: &str) -> bool {
    MISSING_TOKENS.contains(&field)
}

impl DataFrame {
    /// Read a CSV file into a DataFrame.
    ///
    /// The first row is treated as a header. A column whose every field either
    /// parses as `f64` or is a missing token (`""`, `NA`, `NaN`, `nan`, `.`)
    /// becomes a `Float` column with `NaN` for the missing entries. Any other
    /// column is kept as `Text`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, if the CSV is malformed,
    /// or if rows have inconsistent numbers of fields.
    ///
    /// # Examples
    /// ```no_run
    /// use mlm_r2_core::data::DataFrame;
    ///
    /// let df = DataFrame::from_csv("teachers.csv").unwrap();
    /// println!("rows = {}, cols = {}", df.nrows(), df.ncols());
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Read CSV data from any reader. See [`DataFrame::from_csv`].
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(source);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if headers.is_empty() {
            return Ok(DataFrame::new());
        }

        let ncols = headers.len();
        let mut string_columns: Vec<Vec<String>> = vec![Vec::new(); ncols];

        for result in reader.records() {
            let record = result?;
            if record.len() != ncols {
                return Err(R2Error::Data(format!(
                    "Row has {} fields but header has {} columns",
                    record.len(),
                    ncols
                )));
            }
            for (i, field) in record.iter().enumerate() {
                string_columns[i].push(field.to_string());
            }
        }

        if string_columns[0].is_empty() {
            return Ok(DataFrame::new());
        }

        let mut df = DataFrame::new();
        for (header, raw) in headers.iter().zip(string_columns) {
            df.insert_column(header, parse_column(raw))?;
        }

        log::debug!(
            "read CSV with {} rows and {} columns",
            df.nrows(),
            df.ncols()
        );
        Ok(df)
    }
}

fn parse_column(raw: Vec<String>) -> Column {
    let parsed: Option<Vec<f64>> = raw
        .iter()
        .map(|s| {
            if is_missing_token(s) {
                Some(f64::NAN)
            } else {
                s.parse::<f64>().ok()
            }
        })
        .collect();

    match parsed {
        Some(values) => Column::Float(values),
        None => Column::Text(raw),
    }
}
