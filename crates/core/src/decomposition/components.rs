use crate::error::{R2Error, Result};
use crate::matrix::quadratic_form;
use crate::model::ModelSpec;
use crate::types::DenseVector;

use super::covariance::CovarianceStructures;

/// Model-implied outcome variance split into its sources, plus the totals
/// each level's R-squared measures divide by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceComponents {
    /// gamma_w' Phi_w gamma_w
    pub fixed_within: f64,
    /// gamma_b' Phi_b gamma_b
    pub fixed_between: f64,
    /// gamma' Phi gamma over the pooled predictor covariance.
    pub fixed_pooled: f64,
    /// v' psi + 2 r' kappa
    pub slope_variation: f64,
    /// m' Tau m, which is Tau[0, 0] when the slope predictors have zero mean.
    pub mean_variation: f64,
    /// sigma2
    pub residual: f64,
    pub total_within: f64,
    pub total_between: f64,
    pub total: f64,
    /// Total computed directly over the pooled covariance, without separating
    /// the levels.
    pub total_notdecomp: f64,
}

impl VarianceComponents {
    /// Combine parameter estimates with the predictor covariance structures.
    ///
    /// `has_intercept` decides whether the constant column in `pooled` and
    /// `between` is paired with the fixed intercept.
    pub fn compute(
        spec: &ModelSpec,
        structures: &CovarianceStructures,
        has_intercept: bool,
    ) -> Result<Self> {
        let intercept = match (has_intercept, spec.intercept()) {
            (true, Some(g0)) => Some(g0),
            (false, None) => None,
            (true, None) => {
                return Err(R2Error::ModelSpec(
                    "has_intercept is set but no fixed intercept was given".into(),
                ))
            }
            (false, Some(_)) => {
                return Err(R2Error::ModelSpec(
                    "a fixed intercept was given but has_intercept is false".into(),
                ))
            }
        };

        let gamma_w = spec.gamma_w();
        let gamma_b = prepend(intercept, spec.gamma_b().as_slice());
        let gamma = {
            let mut all: Vec<f64> = intercept.into_iter().collect();
            all.extend(gamma_w.iter());
            all.extend(spec.gamma_b().iter());
            DenseVector::from_vec(all)
        };

        let fixed_within = structures.within.quadratic(&gamma_w, "gamma_w vs Phi_w")?;
        let fixed_between = structures.between.quadratic(&gamma_b, "gamma_b vs Phi_b")?;
        let fixed_pooled = structures.pooled.quadratic(&gamma, "gamma vs Phi")?;

        let tau = spec.tau();
        let (v, r) = structures.random.cov.diag_and_lower();
        let slope_variation = if v.is_empty() {
            0.0
        } else {
            let (psi, kappa) = crate::matrix::diag_and_lower(tau);
            if psi.len() != v.len() {
                return Err(R2Error::DimensionMismatch {
                    expected: v.len(),
                    got: psi.len(),
                    context: "Tau vs random-slope covariance".into(),
                });
            }
            v.dot(&psi) + 2.0 * r.dot(&kappa)
        };

        let m = &structures.random.means;
        if m.len() != tau.nrows() {
            return Err(R2Error::DimensionMismatch {
                expected: tau.nrows(),
                got: m.len(),
                context: "Tau vs random-slope means".into(),
            });
        }
        let mean_variation = quadratic_form(tau, m);

        let residual = spec.sigma2();

        // The between level carries the general m' Tau m so that every cell of
        // the mean-variation row shares one numerator.
        let total_within = fixed_within + slope_variation + residual;
        let total_between = fixed_between + mean_variation;
        let total = total_within + total_between;
        let total_notdecomp = fixed_pooled + slope_variation + mean_variation + residual;

        log::debug!(
            "variance components: fixed_within={:.6} fixed_between={:.6} slopes={:.6} means={:.6} sigma2={:.6}",
            fixed_within,
            fixed_between,
            slope_variation,
            mean_variation,
            residual
        );

        Ok(Self {
            fixed_within,
            fixed_between,
            fixed_pooled,
            slope_variation,
            mean_variation,
            residual,
            total_within,
            total_between,
            total,
            total_notdecomp,
        })
    }
}

fn prepend(first: Option<f64>, rest: &[f64]) -> DenseVector {
    let mut v: Vec<f64> = first.into_iter().collect();
    v.extend_from_slice(rest);
    DenseVector::from_vec(v)
}
