mod column;
mod options;
mod spec;

pub use column::ColumnRef;
pub use options::DecompositionOptions;
pub use spec::{ModelSpec, ModelSpecBuilder, Predictor};
