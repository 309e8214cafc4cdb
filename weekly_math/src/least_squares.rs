//! Dense ordinary least squares
//!
//! Fits `y = intercept + Σ βⱼ xⱼ` through the normal equations of the centred
//! design matrix, with an optional ridge penalty on the coefficients. Sized
//! for feature tables of a few hundred rows and a few dozen columns.

use crate::{MathError, Result};

/// Coefficients of a fitted linear model
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    /// Intercept term
    pub intercept: f64,
    /// One coefficient per input column
    pub coefficients: Vec<f64>,
}

impl LeastSquaresFit {
    /// Evaluate the fitted model on one row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(beta, x)| beta * x)
                .sum::<f64>()
    }
}

/// Fit ordinary (or ridge, when `ridge > 0`) least squares
pub fn fit_least_squares(rows: &[Vec<f64>], targets: &[f64], ridge: f64) -> Result<LeastSquaresFit> {
    if rows.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Design matrix has {} rows but {} targets were given",
            rows.len(),
            targets.len()
        )));
    }
    if rows.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot fit least squares on an empty design matrix".to_string(),
        ));
    }
    if ridge < 0.0 || !ridge.is_finite() {
        return Err(MathError::InvalidInput(format!(
            "Ridge penalty must be a non-negative finite number, got {}",
            ridge
        )));
    }

    let n = rows.len() as f64;
    let p = rows[0].len();
    if let Some(bad) = rows.iter().position(|r| r.len() != p) {
        return Err(MathError::InvalidInput(format!(
            "Row {} has {} columns, expected {}",
            bad,
            rows[bad].len(),
            p
        )));
    }

    let mut x_mean = vec![0.0; p];
    for row in rows {
        for (m, x) in x_mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    x_mean.iter_mut().for_each(|m| *m /= n);
    let y_mean = targets.iter().sum::<f64>() / n;

    if p == 0 {
        return Ok(LeastSquaresFit {
            intercept: y_mean,
            coefficients: Vec::new(),
        });
    }

    // Normal equations on centred data: (XᵀX + λI) β = Xᵀy
    let mut gram = vec![vec![0.0; p]; p];
    let mut moment = vec![0.0; p];
    for (row, &y) in rows.iter().zip(targets) {
        let centred: Vec<f64> = row.iter().zip(&x_mean).map(|(x, m)| x - m).collect();
        let yc = y - y_mean;
        for i in 0..p {
            moment[i] += centred[i] * yc;
            for j in i..p {
                gram[i][j] += centred[i] * centred[j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            gram[i][j] = gram[j][i];
        }
        gram[i][i] += ridge;
    }

    let coefficients = solve_linear_system(gram, moment)?;
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_mean)
            .map(|(beta, m)| beta * m)
            .sum::<f64>();

    Ok(LeastSquaresFit {
        intercept,
        coefficients,
    })
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(
            "Linear system must be square and match the right-hand side".to_string(),
        ));
    }

    let scale = a
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0_f64, f64::max)
        .max(1.0);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);

        if a[pivot_row][col].abs() < 1e-12 * scale {
            return Err(MathError::CalculationError(format!(
                "Singular system: column {} is linearly dependent on the others",
                col
            )));
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_exact_plane() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let targets: Vec<f64> = rows.iter().map(|r| 3.0 + 2.0 * r[0] - 0.5 * r[1]).collect();

        let fit = fit_least_squares(&rows, &targets, 0.0).unwrap();
        assert_relative_eq!(fit.intercept, 3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[1], -0.5, epsilon = 1e-9);
        assert_relative_eq!(fit.predict(&[10.0, 2.0]), 22.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_columns_are_rejected() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|i| i as f64).collect();

        assert!(matches!(
            fit_least_squares(&rows, &targets, 0.0),
            Err(MathError::CalculationError(_))
        ));
        // A ridge penalty makes the same system solvable
        assert!(fit_least_squares(&rows, &targets, 1e-3).is_ok());
    }

    #[test]
    fn test_input_validation() {
        assert!(fit_least_squares(&[], &[], 0.0).is_err());
        assert!(fit_least_squares(&[vec![1.0]], &[1.0, 2.0], 0.0).is_err());
        assert!(fit_least_squares(&[vec![1.0]], &[1.0], -1.0).is_err());
    }
}
