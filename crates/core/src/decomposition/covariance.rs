//! Empirical covariance structures of the predictors.
//!
//! An empty predictor list yields [`Structure::Empty`], which annihilates any
//! quadratic form it takes part in.

use std::collections::HashSet;

use crate::data::DataFrame;
use crate::error::{R2Error, Result};
use crate::matrix::{column_means, covariance, diag_and_lower, quadratic_form};
use crate::model::ModelSpec;
use crate::types::{DenseMatrix, DenseVector};

/// A covariance matrix over a possibly empty set of columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    Empty,
    Present(DenseMatrix),
}

impl Structure {
    fn from_columns(columns: &[Vec<f64>], what: &str) -> Result<Self> {
        if columns.is_empty() {
            return Ok(Structure::Empty);
        }
        let (cov, used) = covariance(columns)?;
        let total = columns[0].len();
        if used < total {
            log::debug!(
                "{} covariance: dropped {} of {} rows with missing values",
                what,
                total - used,
                total
            );
        }
        Ok(Structure::Present(cov))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Structure::Empty)
    }

    /// Dimension of the matrix, 0 when empty.
    pub fn dim(&self) -> usize {
        match self {
            Structure::Empty => 0,
            Structure::Present(m) => m.nrows(),
        }
    }

    /// x' S x, or 0 for an empty structure.
    ///
    /// # Errors
    /// Returns [`R2Error::DimensionMismatch`] if `x` does not match the matrix.
    pub fn quadratic(&self, x: &DenseVector, context: &str) -> Result<f64> {
        match self {
            Structure::Empty => Ok(0.0),
            Structure::Present(m) => {
                if x.len() != m.nrows() {
                    return Err(R2Error::DimensionMismatch {
                        expected: m.nrows(),
                        got: x.len(),
                        context: context.to_string(),
                    });
                }
                Ok(quadratic_form(m, x))
            }
        }
    }

    /// Diagonal and strictly-lower triangle, both empty for an empty structure.
    pub fn diag_and_lower(&self) -> (DenseVector, DenseVector) {
        match self {
            Structure::Empty => (DenseVector::zeros(0), DenseVector::zeros(0)),
            Structure::Present(m) => diag_and_lower(m),
        }
    }
}

/// Predictor column names after resolving indices against the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub within: Vec<String>,
    pub between: Vec<String>,
    pub random: Vec<String>,
}

impl ResolvedSelection {
    /// Resolve every column of `spec` and re-check disjointness by name, since
    /// a name and an index can refer to the same column.
    pub fn resolve(df: &DataFrame, spec: &ModelSpec) -> Result<Self> {
        let within = spec
            .within()
            .iter()
            .map(|p| p.column.resolve(df))
            .collect::<Result<Vec<_>>>()?;
        let between = spec
            .between()
            .iter()
            .map(|p| p.column.resolve(df))
            .collect::<Result<Vec<_>>>()?;
        let random = spec
            .random_slopes()
            .iter()
            .map(|c| c.resolve(df))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        for name in within.iter().chain(&between) {
            if !seen.insert(name.as_str()) {
                return Err(R2Error::ModelSpec(format!(
                    "column '{}' is selected more than once",
                    name
                )));
            }
        }
        let within_set: HashSet<&str> = within.iter().map(String::as_str).collect();
        let mut random_seen = HashSet::new();
        for name in &random {
            if !within_set.contains(name.as_str()) || !random_seen.insert(name.as_str()) {
                return Err(R2Error::ModelSpec(format!(
                    "random slope column '{}' must be a distinct level-1 predictor",
                    name
                )));
            }
        }

        Ok(Self {
            within,
            between,
            random,
        })
    }
}

/// Covariance of the random-slope predictors (with the constant column first)
/// and their column means.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomStructure {
    pub cov: Structure,
    /// Means of [1, random-slope predictors]; just `[1]` with no random slopes.
    pub means: DenseVector,
}

/// Every covariance structure the variance components are built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceStructures {
    /// [1?, level-1, level-2] pooled together.
    pub pooled: Structure,
    /// Level-1 predictors alone.
    pub within: Structure,
    /// [1?, level-2].
    pub between: Structure,
    pub random: RandomStructure,
}

impl CovarianceStructures {
    /// Compute all structures from the data. The constant column is included
    /// in `pooled` and `between` only when the model has an intercept.
    pub fn build(df: &DataFrame, sel: &ResolvedSelection, has_intercept: bool) -> Result<Self> {
        let fetch = |names: &[String]| -> Result<Vec<Vec<f64>>> {
            names.iter().map(|n| df.numeric_column(n)).collect()
        };
        let within_cols = fetch(&sel.within)?;
        let between_cols = fetch(&sel.between)?;
        let random_cols = fetch(&sel.random)?;
        let constant = vec![1.0; df.nrows()];

        let with_constant = |include: bool, cols: &[Vec<f64>]| -> Vec<Vec<f64>> {
            let mut out = Vec::with_capacity(cols.len() + 1);
            if include {
                out.push(constant.clone());
            }
            out.extend(cols.iter().cloned());
            out
        };

        let pooled = if within_cols.is_empty() && between_cols.is_empty() {
            Structure::Empty
        } else {
            let mut cols = with_constant(has_intercept, &within_cols);
            cols.extend(between_cols.iter().cloned());
            Structure::from_columns(&cols, "pooled")?
        };

        let within = Structure::from_columns(&within_cols, "level-1")?;

        let between = if between_cols.is_empty() {
            Structure::Empty
        } else {
            Structure::from_columns(&with_constant(has_intercept, &between_cols), "level-2")?
        };

        let random = if random_cols.is_empty() {
            RandomStructure {
                cov: Structure::Empty,
                means: DenseVector::from_element(1, 1.0),
            }
        } else {
            let cols = with_constant(true, &random_cols);
            let cov = Structure::from_columns(&cols, "random-slope")?;
            let means = column_means(&cols);
            RandomStructure { cov, means }
        };

        log::debug!(
            "covariance structures: pooled {}, within {}, between {}, random {}",
            pooled.dim(),
            within.dim(),
            between.dim(),
            random.cov.dim()
        );

        Ok(Self {
            pooled,
            within,
            between,
            random,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn df() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_text_column("cluster", &["a", "a", "b", "b"]).unwrap();
        df.add_float_column("x", vec![-1.0, 1.0, -2.0, 2.0]).unwrap();
        df.add_float_column("w", vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        df
    }

    fn spec(random: bool) -> ModelSpec {
        let mut b = ModelSpec::builder().intercept(3.0).between("w", 1.5);
        b = if random {
            b.within_random("x", 0.5)
                .tau(DMatrix::from_row_slice(2, 2, &[0.8, 0.1, 0.1, 0.3]))
        } else {
            b.within("x", 0.5).tau(DMatrix::from_element(1, 1, 0.8))
        };
        b.sigma2(2.0).build().unwrap()
    }

    #[test]
    fn test_build_all_structures() {
        let df = df();
        let sel = ResolvedSelection::resolve(&df, &spec(true)).unwrap();
        let s = CovarianceStructures::build(&df, &sel, true).unwrap();

        let Structure::Present(pooled) = &s.pooled else {
            panic!("pooled should be present")
        };
        assert_eq!(pooled.nrows(), 3);
        assert_relative_eq!(pooled[(0, 0)], 0.0, epsilon = 1e-15);
        assert_relative_eq!(pooled[(1, 1)], 10.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(pooled[(2, 2)], 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(pooled[(1, 2)], 0.0, epsilon = 1e-12);

        assert_eq!(s.within.dim(), 1);
        assert_eq!(s.between.dim(), 2);
        assert_eq!(s.random.cov.dim(), 2);
        assert_relative_eq!(s.random.means[0], 1.0);
        assert_relative_eq!(s.random.means[1], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_no_intercept_drops_constant() {
        let df = df();
        let sel = ResolvedSelection::resolve(&df, &spec(true)).unwrap();
        let s = CovarianceStructures::build(&df, &sel, false).unwrap();
        assert_eq!(s.pooled.dim(), 2);
        assert_eq!(s.between.dim(), 1);
        // The random structure always carries the constant column.
        assert_eq!(s.random.cov.dim(), 2);
    }

    #[test]
    fn test_empty_lists_are_empty_structures() {
        let df = df();
        let spec = ModelSpec::builder()
            .intercept(1.0)
            .tau(DMatrix::from_element(1, 1, 0.5))
            .sigma2(1.0)
            .build()
            .unwrap();
        let sel = ResolvedSelection::resolve(&df, &spec).unwrap();
        let s = CovarianceStructures::build(&df, &sel, true).unwrap();
        assert!(s.pooled.is_empty());
        assert!(s.within.is_empty());
        assert!(s.between.is_empty());
        assert!(s.random.cov.is_empty());
        assert_eq!(s.random.means.as_slice(), &[1.0]);
    }

    #[test]
    fn test_empty_structure_annihilates() {
        let x = DenseVector::from_vec(vec![5.0, 7.0]);
        assert_eq!(Structure::Empty.quadratic(&x, "test").unwrap(), 0.0);
        let (d, l) = Structure::Empty.diag_and_lower();
        assert!(d.is_empty() && l.is_empty());
    }

    #[test]
    fn test_quadratic_dimension_checked() {
        let s = Structure::Present(DMatrix::identity(2, 2));
        let x = DenseVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            s.quadratic(&x, "test").unwrap_err(),
            R2Error::DimensionMismatch { expected: 2, got: 3, .. }
        ));
    }

    #[test]
    fn test_text_predictor_rejected() {
        let df = df();
        let spec = ModelSpec::builder()
            .within("cluster", 1.0)
            .tau(DMatrix::from_element(1, 1, 0.5))
            .sigma2(1.0)
            .build()
            .unwrap();
        let sel = ResolvedSelection::resolve(&df, &spec).unwrap();
        assert!(matches!(
            CovarianceStructures::build(&df, &sel, true).unwrap_err(),
            R2Error::Data(_)
        ));
    }

    #[test]
    fn test_name_and_index_alias_rejected() {
        let df = df();
        // Column #1 is "x".
        let spec = ModelSpec::builder()
            .within("x", 1.0)
            .between(1usize, 2.0)
            .tau(DMatrix::from_element(1, 1, 0.5))
            .sigma2(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            ResolvedSelection::resolve(&df, &spec).unwrap_err(),
            R2Error::ModelSpec(_)
        ));
    }

    #[test]
    fn test_unknown_column() {
        let df = df();
        let spec = ModelSpec::builder()
            .within("salary", 1.0)
            .tau(DMatrix::from_element(1, 1, 0.5))
            .sigma2(1.0)
            .build()
            .unwrap();
        assert!(matches!(
            ResolvedSelection::resolve(&df, &spec).unwrap_err(),
            R2Error::ColumnNotFound(_)
        ));
    }
}
