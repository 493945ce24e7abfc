//! Assembly of proportion and R-squared tables from variance components.
//!
//! Centered and non-centered predictors get distinct assemblers: without
//! cluster-mean-centering the fixed part cannot be split by level, so only
//! pooled measures over `total_notdecomp` exist.

use super::components::VarianceComponents;
use super::table::{Component, Level, LevelRow, LevelTable, Measure};

/// Proportions of variance and R-squared measures for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    pub proportions: LevelTable<Component>,
    pub r_squared: LevelTable<Measure>,
}

/// `num / den`, with 0/0 read as "nothing to explain" and reported as 0.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 && num == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Tables for cluster-mean-centered level-1 predictors: total, within and
/// between columns.
pub fn centered(c: &VarianceComponents) -> Tables {
    let t = |x: f64| ratio(x, c.total);
    let w = |x: f64| ratio(x, c.total_within);
    let b = |x: f64| ratio(x, c.total_between);

    let f1 = t(c.fixed_within);
    let f2 = t(c.fixed_between);
    let v = t(c.slope_variation);
    let m = t(c.mean_variation);
    let f_w = w(c.fixed_within);
    let v_w = w(c.slope_variation);
    let f_b = b(c.fixed_between);
    let m_b = b(c.mean_variation);

    let proportions = LevelTable::new(
        Level::ALL.to_vec(),
        vec![
            (Component::FixedWithin, row(f1, Some(f_w), None)),
            (Component::FixedBetween, row(f2, None, Some(f_b))),
            (Component::SlopeVariation, row(v, Some(v_w), None)),
            (Component::MeanVariation, row(m, None, Some(m_b))),
            (
                Component::Residual,
                row(t(c.residual), Some(w(c.residual)), None),
            ),
        ],
    );

    let f = f1 + f2;
    let r_squared = LevelTable::new(
        Level::ALL.to_vec(),
        vec![
            (Measure::F1, row(f1, Some(f_w), None)),
            (Measure::F2, row(f2, None, Some(f_b))),
            (Measure::V, row(v, Some(v_w), None)),
            (Measure::M, row(m, None, Some(m_b))),
            (Measure::F, row(f, None, None)),
            (Measure::Fv, row(f + v, Some(f_w + v_w), None)),
            (Measure::Fvm, row(f + v + m, None, None)),
        ],
    );

    warn_out_of_range(&r_squared);
    Tables {
        proportions,
        r_squared,
    }
}

/// Tables for predictors that are not cluster-mean-centered: one total
/// column over the undecomposed total variance.
pub fn pooled(c: &VarianceComponents) -> Tables {
    let t = |x: f64| ratio(x, c.total_notdecomp);

    let f = t(c.fixed_pooled);
    let v = t(c.slope_variation);
    let m = t(c.mean_variation);

    let proportions = LevelTable::new(
        vec![Level::Total],
        vec![
            (Component::Fixed, LevelRow::total_only(f)),
            (Component::SlopeVariation, LevelRow::total_only(v)),
            (Component::MeanVariation, LevelRow::total_only(m)),
            (Component::Residual, LevelRow::total_only(t(c.residual))),
        ],
    );

    let r_squared = LevelTable::new(
        vec![Level::Total],
        vec![
            (Measure::F, LevelRow::total_only(f)),
            (Measure::V, LevelRow::total_only(v)),
            (Measure::M, LevelRow::total_only(m)),
            (Measure::Fv, LevelRow::total_only(f + v)),
            (Measure::Fvm, LevelRow::total_only(f + v + m)),
        ],
    );

    warn_out_of_range(&r_squared);
    Tables {
        proportions,
        r_squared,
    }
}

fn row(total: f64, within: Option<f64>, between: Option<f64>) -> LevelRow {
    LevelRow {
        total,
        within,
        between,
    }
}

fn warn_out_of_range(table: &LevelTable<Measure>) {
    const SLACK: f64 = 1e-9;
    for (measure, row) in table.rows() {
        for &level in table.levels() {
            if let Some(x) = row.get(level) {
                if !(-SLACK..=1.0 + SLACK).contains(&x) {
                    log::warn!(
                        "R-squared {} ({}) = {:.6} lies outside [0, 1]; check Tau and the estimates",
                        measure,
                        level,
                        x
                    );
                }
            }
        }
    }
}
