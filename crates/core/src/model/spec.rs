use std::collections::HashSet;

use crate::error::{R2Error, Result};
use crate::matrix::{is_positive_semidefinite, is_symmetric};
use crate::types::{DenseMatrix, DenseVector};

use super::column::ColumnRef;

const SYMMETRY_TOL: f64 = 1e-8;
const PSD_TOL: f64 = 1e-8;

/// A predictor column paired with its fixed-effect estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictor {
    pub column: ColumnRef,
    pub estimate: f64,
}

/// Parameter estimates of one fitted two-level model, each paired with the
/// predictor it belongs to.
///
/// Row/column 0 of `tau` is the random intercept; rows 1.. follow the order
/// in which random slopes were declared.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    intercept: Option<f64>,
    within: Vec<Predictor>,
    between: Vec<Predictor>,
    random_slopes: Vec<ColumnRef>,
    tau: DenseMatrix,
    sigma2: f64,
}

impl ModelSpec {
    pub fn builder() -> ModelSpecBuilder {
        ModelSpecBuilder::new()
    }

    /// Build from parallel lists in the manual-entry layout: `gamma_w` matches
    /// `within`, `gamma_b` matches `between` with the intercept first when
    /// `has_intercept` is set.
    ///
    /// # Errors
    /// Returns [`R2Error::DimensionMismatch`] when a vector's length does not
    /// match its predictor list, plus any error from [`ModelSpecBuilder::build`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_parallel(
        within: &[ColumnRef],
        between: &[ColumnRef],
        random: &[ColumnRef],
        gamma_w: &[f64],
        gamma_b: &[f64],
        tau: DenseMatrix,
        sigma2: f64,
        has_intercept: bool,
    ) -> Result<Self> {
        if gamma_w.len() != within.len() {
            return Err(R2Error::DimensionMismatch {
                expected: within.len(),
                got: gamma_w.len(),
                context: "gamma_w vs level-1 predictors".into(),
            });
        }
        let offset = usize::from(has_intercept);
        if gamma_b.len() != between.len() + offset {
            return Err(R2Error::DimensionMismatch {
                expected: between.len() + offset,
                got: gamma_b.len(),
                context: "gamma_b vs level-2 predictors (plus intercept)".into(),
            });
        }

        let mut builder = ModelSpecBuilder::new().tau(tau).sigma2(sigma2);
        if has_intercept {
            builder = builder.intercept(gamma_b[0]);
        }
        for (col, &g) in within.iter().zip(gamma_w) {
            builder = builder.within(col.clone(), g);
        }
        for (col, &g) in between.iter().zip(&gamma_b[offset..]) {
            builder = builder.between(col.clone(), g);
        }
        for col in random {
            builder = builder.random_slope(col.clone());
        }
        builder.build()
    }

    pub fn intercept(&self) -> Option<f64> {
        self.intercept
    }

    pub fn within(&self) -> &[Predictor] {
        &self.within
    }

    pub fn between(&self) -> &[Predictor] {
        &self.between
    }

    pub fn random_slopes(&self) -> &[ColumnRef] {
        &self.random_slopes
    }

    pub fn tau(&self) -> &DenseMatrix {
        &self.tau
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Level-1 slopes in declaration order.
    pub fn gamma_w(&self) -> DenseVector {
        DenseVector::from_iterator(self.within.len(), self.within.iter().map(|p| p.estimate))
    }

    /// Level-2 slopes in declaration order, without the intercept.
    pub fn gamma_b(&self) -> DenseVector {
        DenseVector::from_iterator(
            self.between.len(),
            self.between.iter().map(|p| p.estimate),
        )
    }
}

/// Builder for a validated [`ModelSpec`].
#[derive(Debug, Default)]
pub struct ModelSpecBuilder {
    intercept: Option<f64>,
    within: Vec<Predictor>,
    between: Vec<Predictor>,
    random_slopes: Vec<ColumnRef>,
    tau: Option<DenseMatrix>,
    sigma2: Option<f64>,
}

impl ModelSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fixed intercept.
    pub fn intercept(mut self, estimate: f64) -> Self {
        self.intercept = Some(estimate);
        self
    }

    /// Add a level-1 (within-cluster) predictor with a fixed slope only.
    pub fn within(mut self, column: impl Into<ColumnRef>, estimate: f64) -> Self {
        self.within.push(Predictor {
            column: column.into(),
            estimate,
        });
        self
    }

    /// Add a level-1 predictor that also carries a random slope. The slope
    /// takes the next row of Tau.
    pub fn within_random(self, column: impl Into<ColumnRef>, estimate: f64) -> Self {
        let column = column.into();
        self.within(column.clone(), estimate).random_slope(column)
    }

    /// Mark an already declared level-1 predictor as having a random slope.
    pub fn random_slope(mut self, column: impl Into<ColumnRef>) -> Self {
        self.random_slopes.push(column.into());
        self
    }

    /// Add a level-2 (between-cluster) predictor.
    pub fn between(mut self, column: impl Into<ColumnRef>, estimate: f64) -> Self {
        self.between.push(Predictor {
            column: column.into(),
            estimate,
        });
        self
    }

    /// Random-effect covariance matrix, intercept first.
    pub fn tau(mut self, tau: DenseMatrix) -> Self {
        self.tau = Some(tau);
        self
    }

    /// Residual variance.
    pub fn sigma2(mut self, sigma2: f64) -> Self {
        self.sigma2 = Some(sigma2);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    /// - [`R2Error::ModelSpec`] for missing Tau/sigma2, duplicated predictors,
    ///   a predictor listed at both levels, or a random slope on a column that
    ///   is not a level-1 predictor.
    /// - [`R2Error::DimensionMismatch`] if Tau is not (1 + random slopes) square.
    /// - [`R2Error::InvalidParameter`] for non-finite estimates, negative
    ///   sigma2, or a Tau that is asymmetric or not positive semi-definite.
    pub fn build(self) -> Result<ModelSpec> {
        let tau = self
            .tau
            .ok_or_else(|| R2Error::ModelSpec("No random-effect covariance matrix (Tau)".into()))?;
        let sigma2 = self
            .sigma2
            .ok_or_else(|| R2Error::ModelSpec("No residual variance (sigma2)".into()))?;

        if !sigma2.is_finite() || sigma2 < 0.0 {
            return Err(R2Error::InvalidParameter(format!(
                "sigma2 must be finite and >= 0, got {}",
                sigma2
            )));
        }

        let all_estimates = self
            .intercept
            .iter()
            .chain(self.within.iter().map(|p| &p.estimate))
            .chain(self.between.iter().map(|p| &p.estimate));
        if let Some(bad) = all_estimates.into_iter().find(|g| !g.is_finite()) {
            return Err(R2Error::InvalidParameter(format!(
                "fixed-effect estimates must be finite, got {}",
                bad
            )));
        }

        check_unique(self.within.iter().map(|p| &p.column), "level-1 predictors")?;
        check_unique(self.between.iter().map(|p| &p.column), "level-2 predictors")?;
        check_unique(self.random_slopes.iter(), "random slopes")?;

        let within_cols: HashSet<&ColumnRef> = self.within.iter().map(|p| &p.column).collect();
        if let Some(p) = self.between.iter().find(|p| within_cols.contains(&p.column)) {
            return Err(R2Error::ModelSpec(format!(
                "column {} is listed as both a level-1 and a level-2 predictor",
                p.column
            )));
        }
        if let Some(c) = self.random_slopes.iter().find(|c| !within_cols.contains(c)) {
            return Err(R2Error::ModelSpec(format!(
                "random slope on {} which is not a level-1 predictor",
                c
            )));
        }

        let expected = 1 + self.random_slopes.len();
        if tau.nrows() != expected || tau.ncols() != expected {
            return Err(R2Error::DimensionMismatch {
                expected,
                got: tau.nrows().max(tau.ncols()),
                context: format!(
                    "Tau ({}x{}) vs 1 + {} random slopes",
                    tau.nrows(),
                    tau.ncols(),
                    self.random_slopes.len()
                ),
            });
        }
        if tau.iter().any(|x| !x.is_finite()) {
            return Err(R2Error::InvalidParameter("Tau has non-finite entries".into()));
        }
        if !is_symmetric(&tau, SYMMETRY_TOL) {
            return Err(R2Error::InvalidParameter("Tau is not symmetric".into()));
        }
        if !is_positive_semidefinite(&tau, PSD_TOL) {
            return Err(R2Error::InvalidParameter(
                "Tau is not positive semi-definite".into(),
            ));
        }

        Ok(ModelSpec {
            intercept: self.intercept,
            within: self.within,
            between: self.between,
            random_slopes: self.random_slopes,
            tau,
            sigma2,
        })
    }
}

fn check_unique<'a>(cols: impl Iterator<Item = &'a ColumnRef>, what: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for c in cols {
        if !seen.insert(c) {
            return Err(R2Error::ModelSpec(format!(
                "column {} appears twice among {}",
                c, what
            )));
        }
    }
    Ok(())
}
