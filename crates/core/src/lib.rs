//! Variance decomposition and R-squared measures for two-level multilevel
//! linear models.
//!
//! Given fixed-effect estimates, a random-effect covariance matrix, a residual
//! variance and the predictor data the model was fit on, the crate splits the
//! model-implied outcome variance into fixed-within, fixed-between,
//! slope-variation, mean-variation and residual parts, and derives the
//! R-squared family of Rights & Sterba (2019) at the total, within-cluster and
//! between-cluster levels.

pub mod data;
pub mod decomposition;
pub mod error;
pub mod matrix;
pub mod model;
pub mod plot;
pub mod types;

pub use decomposition::{compare, decompose, Comparison, Decomposition};
pub use error::{R2Error, Result};
pub use model::{ColumnRef, DecompositionOptions, ModelSpec, ModelSpecBuilder};
