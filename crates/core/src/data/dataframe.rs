use indexmap::IndexMap;

use crate::error::{R2Error, Result};

/// A single column in a [`DataFrame`].
///
/// Missing numeric values are stored as `NaN`.
#[derive(Debug, Clone)]
pub enum Column {
    /// A column of 64-bit floating-point values.
    Float(Vec<f64>),
    /// Free text, typically a cluster identifier. Never usable as a predictor.
    Text(Vec<String>),
}

impl Column {
    /// Returns the number of elements in the column.
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    /// Returns `true` if the column is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for `Float` columns.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Column::Text(_))
    }
}

/// A lightweight columnar DataFrame holding the predictor data a multilevel
/// model was fit on.
///
/// Columns are stored in insertion order using an [`IndexMap`], so they can be
/// addressed either by name or by 0-based position. All columns must have the
/// same number of rows.
#[derive(Debug, Clone)]
pub struct DataFrame {
    pub(crate) columns: IndexMap<String, Column>,
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

    /// Add a floating-point column. Use `f64::NAN` for missing values.
    ///
    /// # Errors
    /// Returns an error if the column length does not match existing rows,
    /// or if a column with the same name already exists.
    pub fn add_float_column(&mut self, name: &str, data: Vec<f64>) -> Result<()> {
        self.insert_column(name, Column::Float(data))
    }

    /// Add a text column (e.g. cluster labels).
    ///
    /// # Errors
    /// Returns an error if the column length does not match existing rows,
    /// or if a column with the same name already exists.
    pub fn add_text_column(&mut self, name: &str, data: &[&str]) -> Result<()> {
        let values = data.iter().map(|s| s.to_string()).collect();
        self.insert_column(name, Column::Text(values))
    }

    /// Retrieve a column by name.
    ///
    /// # Errors
    /// Returns [`R2Error::ColumnNotFound`] if no column with the given name exists.
    pub fn get_column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| R2Error::ColumnNotFound(name.to_string()))
    }

    /// Retrieve a numeric column as an owned vector.
    ///
    /// # Errors
    /// Returns an error if the column does not exist or holds text.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        match self.get_column(name)? {
            Column::Float(v) => Ok(v.clone()),
            Column::Text(_) => Err(R2Error::Data(format!(
                "Column '{}' is not numeric and cannot be used as a predictor",
                name
            ))),
        }
    }

    /// Name of the column at 0-based position `index`.
    ///
    /// # Errors
    /// Returns [`R2Error::ColumnNotFound`] if the index is out of range.
    pub fn column_name(&self, index: usize) -> Result<&str> {
        self.columns
            .get_index(index)
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| R2Error::ColumnNotFound(format!("#{}", index)))
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

    /// Validate column length and name uniqueness, then insert.
    pub(crate) fn insert_column(&mut self, name: &str, column: Column) -> Result<()> {
        if self.columns.contains_key(name) {
            return Err(R2Error::Data(format!(
                "Column '{}' already exists in DataFrame",
                name
            )));
        }

        let col_len = column.len();

        if self.columns.is_empty() {
            self.nrows = col_len;
        } else if col_len != self.nrows {
            return Err(R2Error::DimensionMismatch {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_text_column("school", &["S1", "S1", "S2"]).unwrap();
        df.add_float_column("salary", vec![0.5, -0.5, f64::NAN]).unwrap();
        df.add_float_column("size", vec![120.0, 120.0, 340.0]).unwrap();
        df
    }

    #[test]
    fn test_new_is_empty() {
        let df = DataFrame::new();
        assert_eq!(df.nrows(), 0);
        assert_eq!(df.ncols(), 0);
        assert!(df.column_names().is_empty());
    }

    #[test]
    fn test_add_columns_and_dimensions() {
        let df = sample_df();
        assert_eq!(df.nrows(), 3);
        assert_eq!(df.ncols(), 3);
        assert_eq!(df.column_names(), vec!["school", "salary", "size"]);
    }

    #[test]
    fn test_numeric_column_keeps_missing() {
        let df = sample_df();
        assert_eq!(df.numeric_column("size").unwrap(), vec![120.0, 120.0, 340.0]);
        let salary = df.numeric_column("salary").unwrap();
        assert_eq!(&salary[..2], &[0.5, -0.5]);
        assert!(salary[2].is_nan());
    }

    #[test]
    fn test_numeric_column_rejects_text() {
        let df = sample_df();
        let err = df.numeric_column("school").unwrap_err();
        assert!(matches!(err, R2Error::Data(_)));
    }

    #[test]
    fn test_column_name_by_index() {
        let df = sample_df();
        assert_eq!(df.column_name(1).unwrap(), "salary");
        assert!(matches!(
            df.column_name(7).unwrap_err(),
            R2Error::ColumnNotFound(_)
        ));
    }

    #[test]
    fn test_get_column_not_found() {
        let df = sample_df();
        let err = df.get_column("missing").unwrap_err();
        assert!(matches!(err, R2Error::ColumnNotFound(_)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut df = DataFrame::new();
        df.add_float_column("a", vec![1.0, 2.0]).unwrap();
        let err = df.add_float_column("b", vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, R2Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_duplicate_column_name() {
        let mut df = DataFrame::new();
        df.add_float_column("x", vec![1.0]).unwrap();
        let err = df.add_float_column("x", vec![2.0]).unwrap_err();
        assert!(matches!(err, R2Error::Data(_)));
    }

    #[test]
    fn test_column_is_numeric() {
        assert!(Column::Float(vec![1.0]).is_numeric());
        assert!(!Column::Text(vec!["a".into()]).is_numeric());
        assert!(Column::Float(vec![]).is_empty());
    }
}
