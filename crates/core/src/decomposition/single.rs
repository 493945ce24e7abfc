use crate::data::DataFrame;
use crate::error::{R2Error, Result};
use crate::model::{DecompositionOptions, ModelSpec};
use crate::plot;

use super::components::VarianceComponents;
use super::covariance::{CovarianceStructures, ResolvedSelection};
use super::rsquared::{self, Tables};
use super::table::{Component, Level, LevelTable, Measure};

/// Named R-squared cells in output order, mapped to their table position.
const NAMED_CELLS: [(&str, Measure, Level); 12] = [
    ("f1", Measure::F1, Level::Total),
    ("f2", Measure::F2, Level::Total),
    ("v", Measure::V, Level::Total),
    ("m", Measure::M, Level::Total),
    ("f", Measure::F, Level::Total),
    ("fv", Measure::Fv, Level::Total),
    ("fvm", Measure::Fvm, Level::Total),
    ("f_w", Measure::F1, Level::Within),
    ("v_w", Measure::V, Level::Within),
    ("fv_w", Measure::Fv, Level::Within),
    ("f_b", Measure::F2, Level::Between),
    ("m_b", Measure::M, Level::Between),
];

/// Variance decomposition of a single model.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub options: DecompositionOptions,
    pub components: VarianceComponents,
    /// Share of each component in the total, within and between variance.
    pub proportions: LevelTable<Component>,
    pub r_squared: LevelTable<Measure>,
    /// SVG bar chart, present when `options.with_graph` is set.
    pub chart: Option<String>,
}

/// Decompose the outcome variance of one model.
///
/// All validation happens before any table is built, so an error never
/// leaves a partial result behind.
///
/// # Errors
/// Returns an error if a column is missing or not numeric, if the intercept
/// flag disagrees with the estimates, or if too few complete rows remain to
/// estimate a covariance.
///
/// # Examples
/// ```
/// use mlm_r2_core::data::DataFrame;
/// use mlm_r2_core::{decompose, DecompositionOptions, ModelSpec};
/// use nalgebra::DMatrix;
///
/// let mut df = DataFrame::new();
/// df.add_float_column("x", vec![-1.0, 1.0, -2.0, 2.0]).unwrap();
/// df.add_float_column("w", vec![0.0, 0.0, 2.0, 2.0]).unwrap();
///
/// let spec = ModelSpec::builder()
///     .intercept(3.0)
///     .within_random("x", 0.5)
///     .between("w", 1.5)
///     .tau(DMatrix::from_row_slice(2, 2, &[0.8, 0.1, 0.1, 0.3]))
///     .sigma2(2.0)
///     .build()
///     .unwrap();
///
/// let result = decompose(&df, &spec, DecompositionOptions::default()).unwrap();
/// let fvm = result.measure("fvm").unwrap();
/// assert!((fvm - 169.0 / 229.0).abs() < 1e-12);
/// ```
pub fn decompose(
    df: &DataFrame,
    spec: &ModelSpec,
    options: DecompositionOptions,
) -> Result<Decomposition> {
    let selection = ResolvedSelection::resolve(df, spec)?;
    let structures = CovarianceStructures::build(df, &selection, options.has_intercept)?;
    let components = VarianceComponents::compute(spec, &structures, options.has_intercept)?;

    let Tables {
        proportions,
        r_squared,
    } = if options.cluster_mean_centered {
        rsquared::centered(&components)
    } else {
        rsquared::pooled(&components)
    };

    let mut result = Decomposition {
        options,
        components,
        proportions,
        r_squared,
        chart: None,
    };
    if options.with_graph {
        result.chart = Some(plot::decomposition_chart(&result));
    }
    Ok(result)
}

impl Decomposition {
    /// Look up an R-squared measure by name: `f1`, `f2`, `v`, `m`, `f`, `fv`,
    /// `fvm`, or a level-specific `f_w`, `v_w`, `fv_w`, `f_b`, `m_b`.
    ///
    /// # Errors
    /// - [`R2Error::InvalidParameter`] for an unknown name.
    /// - [`R2Error::Unsupported`] for a measure this configuration does not
    ///   define, e.g. a level-specific measure without centering.
    pub fn measure(&self, name: &str) -> Result<f64> {
        let (_, measure, level) = NAMED_CELLS
            .iter()
            .find(|(n, _, _)| *n == name)
            .ok_or_else(|| {
                R2Error::InvalidParameter(format!("unknown R-squared measure '{}'", name))
            })?;

        self.r_squared.value(*measure, *level).ok_or_else(|| {
            R2Error::Unsupported(format!(
                "measure '{}' requires cluster-mean-centered level-1 predictors",
                name
            ))
        })
    }

    /// Every defined R-squared measure, keyed by name, in output order.
    pub fn named_measures(&self) -> Vec<(&'static str, f64)> {
        named_cells(&self.r_squared)
    }

    /// Plain-text report of both tables.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Multilevel R-squared Decomposition ===\n\n");
        s.push_str(&format!(
            "Intercept: {}   Cluster-mean-centered: {}\n",
            self.options.has_intercept, self.options.cluster_mean_centered
        ));
        let c = &self.components;
        if self.options.cluster_mean_centered {
            s.push_str(&format!(
                "Total variance: {:.6}   (within: {:.6}, between: {:.6})\n\n",
                c.total, c.total_within, c.total_between
            ));
        } else {
            s.push_str(&format!("Total variance: {:.6}\n\n", c.total_notdecomp));
        }
        s.push_str(&self.proportions.format("Decomposition"));
        s.push('\n');
        s.push_str(&self.r_squared.format("R-squared"));
        s
    }
}

pub(crate) fn named_cells(table: &LevelTable<Measure>) -> Vec<(&'static str, f64)> {
    NAMED_CELLS
        .iter()
        .filter_map(|(name, measure, level)| table.value(*measure, *level).map(|x| (*name, x)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn df() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_float_column("x", vec![-1.0, 1.0, -2.0, 2.0]).unwrap();
        df.add_float_column("w", vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        df
    }

    fn spec() -> ModelSpec {
        ModelSpec::builder()
            .intercept(3.0)
            .within_random("x", 0.5)
            .between("w", 1.5)
            .tau(DMatrix::from_row_slice(2, 2, &[0.8, 0.1, 0.1, 0.3]))
            .sigma2(2.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_named_measures_centered() {
        let d = decompose(&df(), &spec(), DecompositionOptions::new().with_graph(false)).unwrap();
        let names: Vec<&str> = d.named_measures().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["f1", "f2", "v", "m", "f", "fv", "fvm", "f_w", "v_w", "fv_w", "f_b", "m_b"]
        );
        assert_relative_eq!(d.measure("f_b").unwrap(), 15.0 / 19.0, epsilon = 1e-12);
        assert!(d.chart.is_none());
    }

    #[test]
    fn test_level_measure_without_centering_is_unsupported() {
        let opts = DecompositionOptions::new().cluster_mean_centered(false);
        let d = decompose(&df(), &spec(), opts).unwrap();
        assert!(matches!(d.measure("f_w").unwrap_err(), R2Error::Unsupported(_)));
        assert!(matches!(d.measure("f1").unwrap_err(), R2Error::Unsupported(_)));
        assert!(d.measure("fvm").is_ok());
        assert_eq!(d.named_measures().len(), 5);
    }

    #[test]
    fn test_unknown_measure() {
        let d = decompose(&df(), &spec(), DecompositionOptions::default()).unwrap();
        assert!(matches!(
            d.measure("r2_total").unwrap_err(),
            R2Error::InvalidParameter(_)
        ));
    }

    #[test]
    fn test_chart_rendered_on_request() {
        let d = decompose(&df(), &spec(), DecompositionOptions::default()).unwrap();
        let svg = d.chart.as_deref().unwrap();
        assert!(svg.starts_with("<svg"));
    }

    #[test]
    fn test_summary_mentions_tables() {
        let d = decompose(&df(), &spec(), DecompositionOptions::default()).unwrap();
        let text = d.summary();
        assert!(text.contains("--- Decomposition ---"));
        assert!(text.contains("--- R-squared ---"));
        assert!(text.contains("fixed, between"));
    }
}
