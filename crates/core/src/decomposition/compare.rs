use crate::data::DataFrame;
use crate::error::{R2Error, Result};
use crate::model::{DecompositionOptions, ModelSpec};
use crate::plot;

use super::single::{decompose, named_cells, Decomposition};
use super::table::{LevelRow, LevelTable, Measure};

/// Two models decomposed on the same data, and their R-squared differences.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub model_a: Decomposition,
    pub model_b: Decomposition,
    /// R²(B) − R²(A) for every cell defined in both models.
    pub differences: LevelTable<Measure>,
    /// Grouped SVG bar chart of both models, present when requested.
    pub chart: Option<String>,
}

/// Decompose models A and B independently and subtract their R-squared
/// tables.
///
/// # Errors
/// Returns [`R2Error::Unsupported`] when `options.cluster_mean_centered` is
/// false, and any error from [`decompose`] for either model.
pub fn compare(
    df: &DataFrame,
    model_a: &ModelSpec,
    model_b: &ModelSpec,
    options: DecompositionOptions,
) -> Result<Comparison> {
    if !options.cluster_mean_centered {
        return Err(R2Error::Unsupported(
            "model comparison requires cluster-mean-centered level-1 predictors".into(),
        ));
    }

    let inner = options.with_graph(false);
    let a = decompose(df, model_a, inner)?;
    let b = decompose(df, model_b, inner)?;
    let differences = difference_table(&a.r_squared, &b.r_squared);

    let mut result = Comparison {
        model_a: a,
        model_b: b,
        differences,
        chart: None,
    };
    if options.with_graph {
        result.chart = Some(plot::comparison_chart(&result));
    }
    Ok(result)
}

fn difference_table(a: &LevelTable<Measure>, b: &LevelTable<Measure>) -> LevelTable<Measure> {
    let delta = |x: Option<f64>, y: Option<f64>| x.zip(y).map(|(x, y)| y - x);
    let rows = a
        .rows()
        .iter()
        .filter_map(|(measure, ra)| {
            b.row(*measure).map(|rb| {
                (
                    *measure,
                    LevelRow {
                        total: rb.total - ra.total,
                        within: delta(ra.within, rb.within),
                        between: delta(ra.between, rb.between),
                    },
                )
            })
        })
        .collect();
    LevelTable::new(a.levels().to_vec(), rows)
}

impl Comparison {
    /// Difference B − A of a named measure (see [`Decomposition::measure`]).
    pub fn delta(&self, name: &str) -> Result<f64> {
        Ok(self.model_b.measure(name)? - self.model_a.measure(name)?)
    }

    /// Every defined difference, keyed by measure name, in output order.
    pub fn named_differences(&self) -> Vec<(&'static str, f64)> {
        named_cells(&self.differences)
    }

    /// Plain-text report of both models and their differences.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Model A ===\n");
        s.push_str(&self.model_a.r_squared.format("R-squared"));
        s.push_str("\n=== Model B ===\n");
        s.push_str(&self.model_b.r_squared.format("R-squared"));
        s.push('\n');
        s.push_str(&self.differences.format("R-squared differences (B - A)"));
        s
    }
}
