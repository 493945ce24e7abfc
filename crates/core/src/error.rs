use thiserror::Error;

#[derive(Error, Debug)]
pub enum R2Error {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Column '{0}' not found in DataFrame")]
    ColumnNotFound(String),

    #[error("Dimension mismatch: expected {expected}, got {got} in {context}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Model specification error: {0}")]
    ModelSpec(String),

    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, R2Error>;
