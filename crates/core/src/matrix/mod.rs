pub mod dense;

pub use dense::{
    column_means, complete_rows, covariance, diag_and_lower, is_positive_semidefinite,
    is_symmetric, quadratic_form,
};
