use anyhow::{bail, Context, Result};
use nalgebra::DMatrix;
use serde::Deserialize;

use mlm_r2_core::{ColumnRef, ModelSpec};

/// A column given as a 0-based index or a name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnArg {
    Index(usize),
    Name(String),
}

impl From<ColumnArg> for ColumnRef {
    fn from(arg: ColumnArg) -> Self {
        match arg {
            ColumnArg::Index(i) => ColumnRef::Index(i),
            ColumnArg::Name(n) => ColumnRef::Name(n),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TermFile {
    pub column: ColumnArg,
    pub estimate: f64,
    /// Level-1 only: the predictor has a random slope. Tau rows follow the
    /// order of flagged predictors unless `random_slopes` is given.
    #[serde(default)]
    pub random: bool,
}

/// Parameter estimates of one model as read from JSON.
#[derive(Debug, Deserialize)]
pub struct ModelFile {
    #[serde(default)]
    pub intercept: Option<f64>,
    #[serde(default)]
    pub within: Vec<TermFile>,
    #[serde(default)]
    pub between: Vec<TermFile>,
    /// Random-slope predictors in Tau order. Replaces the per-term `random`
    /// flags when the Tau order differs from the level-1 order.
    #[serde(default)]
    pub random_slopes: Option<Vec<ColumnArg>>,
    pub tau: Vec<Vec<f64>>,
    pub sigma2: f64,
}

impl ModelFile {
    pub fn from_path(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file '{}'", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid model file '{}'", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn has_intercept(&self) -> bool {
        self.intercept.is_some()
    }

    pub fn into_spec(self) -> Result<ModelSpec> {
        let tau = tau_matrix(&self.tau)?;
        let mut builder = ModelSpec::builder().tau(tau).sigma2(self.sigma2);
        if let Some(g0) = self.intercept {
            builder = builder.intercept(g0);
        }
        match self.random_slopes {
            Some(order) => {
                if self.within.iter().any(|t| t.random) {
                    bail!("use either random_slopes or per-term random flags, not both");
                }
                for term in self.within {
                    builder = builder.within(term.column, term.estimate);
                }
                for column in order {
                    builder = builder.random_slope(column);
                }
            }
            None => {
                for term in self.within {
                    builder = if term.random {
                        builder.within_random(term.column, term.estimate)
                    } else {
                        builder.within(term.column, term.estimate)
                    };
                }
            }
        }
        for term in self.between {
            if term.random {
                bail!("random slopes are only allowed on level-1 predictors");
            }
            builder = builder.between(term.column, term.estimate);
        }
        Ok(builder.build()?)
    }
}

fn tau_matrix(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let k = rows.len();
    if k == 0 {
        bail!("tau must have at least one row (the random intercept)");
    }
    if let Some(bad) = rows.iter().find(|r| r.len() != k) {
        bail!("tau must be square: found a row of length {} in a {}-row matrix", bad.len(), k);
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(k, k, &flat))
}
