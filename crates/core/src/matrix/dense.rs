use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{R2Error, Result};

/// Indices of rows where every column is non-missing (listwise deletion).
pub fn complete_rows(columns: &[Vec<f64>]) -> Vec<usize> {
    let nrows = columns.first().map_or(0, |c| c.len());
    (0..nrows)
        .filter(|&i| columns.iter().all(|c| !c[i].is_nan()))
        .collect()
}

/// Sample covariance matrix (denominator n - 1) of the given columns,
/// computed over the rows complete in every column.
///
/// Returns the matrix together with the number of rows used.
///
/// # Errors
/// Returns an error if fewer than two complete rows remain.
pub fn covariance(columns: &[Vec<f64>]) -> Result<(DMatrix<f64>, usize)> {
    let rows = complete_rows(columns);
    let n = rows.len();
    if n < 2 {
        return Err(R2Error::Data(format!(
            "covariance needs at least 2 complete rows, found {}",
            n
        )));
    }

    let p = columns.len();
    let data = DMatrix::from_fn(n, p, |i, j| columns[j][rows[i]]);
    let means = data.row_mean();
    let mut centered = data;
    for j in 0..p {
        let mu = means[j];
        centered.column_mut(j).add_scalar_mut(-mu);
    }

    let cov = (centered.transpose() * &centered) / (n - 1) as f64;
    Ok((cov, n))
}

/// Per-column means, each ignoring that column's missing values.
///
/// A column with no observed values yields `NaN`.
pub fn column_means(columns: &[Vec<f64>]) -> DVector<f64> {
    DVector::from_iterator(
        columns.len(),
        columns.iter().map(|c| {
            let (sum, count) = c
                .iter()
                .filter(|x| !x.is_nan())
                .fold((0.0, 0usize), |(s, k), &x| (s + x, k + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        }),
    )
}

/// Compute x' A x.
pub fn quadratic_form(a: &DMatrix<f64>, x: &DVector<f64>) -> f64 {
    x.dot(&(a * x))
}

/// Split a square matrix into its diagonal and its strictly-lower triangle,
/// the latter read column by column.
pub fn diag_and_lower(a: &DMatrix<f64>) -> (DVector<f64>, DVector<f64>) {
    let k = a.nrows();
    let diag = a.diagonal();
    let lower: Vec<f64> = (0..k)
        .flat_map(|col| ((col + 1)..k).map(move |row| (row, col)))
        .map(|(row, col)| a[(row, col)])
        .collect();
    (diag, DVector::from_vec(lower))
}

/// Returns `true` if `a` is square and symmetric within a relative tolerance.
pub fn is_symmetric(a: &DMatrix<f64>, tol: f64) -> bool {
    if !a.is_square() {
        return false;
    }
    let scale = a.amax().max(1.0);
    let k = a.nrows();
    (0..k).all(|i| (0..i).all(|j| (a[(i, j)] - a[(j, i)]).abs() <= tol * scale))
}

/// Positive semi-definiteness check with a tolerance relative to the largest
/// absolute eigenvalue.
pub fn is_positive_semidefinite(a: &DMatrix<f64>, tol: f64) -> bool {
    let eig = SymmetricEigen::new(a.clone()).eigenvalues;
    let scale = eig.amax().max(f64::MIN_POSITIVE);
    eig.min() >= -tol * scale
}
