//! Ordinary least squares and fit diagnostics.
//!
//! Design matrices are row-major `Vec<Vec<f64>>` with one entry per column,
//! intercept included explicitly. Fits solve the normal equations with
//! partial pivoting; a column that is (numerically) a linear combination of
//! earlier ones gets a zero coefficient instead of failing the fit, and no
//! standard error.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// Relative pivot size below which a column counts as collinear.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Fitted linear model: `y = Σ coefficient_i * x_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub columns: Vec<&'static str>,
    pub coefficients: Vec<f64>,
    /// `sqrt(σ² (XᵀX)⁻¹)` diagonal. `None` for a collinear column, or for
    /// every column when no residual degrees of freedom remain.
    pub std_errors: Vec<Option<f64>>,
    pub observations: usize,
    /// Number of estimable columns.
    pub rank: usize,
    /// R² on the rows the model was fitted to.
    pub r_squared: Option<f64>,
}

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientEstimate {
    pub column: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub t_value: Option<f64>,
    /// Two-sided, from Student's t with the residual degrees of freedom.
    pub p_value: Option<f64>,
}

/// Inference for a fitted model. Assumes the design includes an intercept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    pub observations: usize,
    pub df_residual: usize,
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    pub f_statistic: Option<f64>,
    pub f_p_value: Option<f64>,
    pub coefficients: Vec<CoefficientEstimate>,
}

impl LinearModel {
    /// Fits OLS of `y` on the rows of `x`.
    pub fn fit(columns: &[&'static str], x: &[Vec<f64>], y: &[f64]) -> Self {
        let (xtx, xty) = normal_equations(x, y);
        let (coefficients, pivots) = solve(xtx.clone(), xty);

        let fitted: Vec<f64> = x.iter().map(|row| dot(&coefficients, row)).collect();
        let ssr: f64 = y.iter().zip(&fitted).map(|(a, f)| (a - f).powi(2)).sum();

        let observations = y.len();
        let rank = pivots.len();
        let mut std_errors = vec![None; coefficients.len()];

        let df = observations.saturating_sub(rank);
        if df > 0 {
            let sigma2 = ssr / df as f64;
            let reduced: Vec<Vec<f64>> = pivots
                .iter()
                .map(|&i| pivots.iter().map(|&j| xtx[i][j]).collect())
                .collect();
            if let Some(inverse) = invert(reduced) {
                for (k, &col) in pivots.iter().enumerate() {
                    let variance = sigma2 * inverse[k][k];
                    std_errors[col] = (variance >= 0.0).then(|| variance.sqrt());
                }
            }
        }

        Self {
            columns: columns.to_vec(),
            coefficients,
            std_errors,
            observations,
            rank,
            r_squared: r_squared(y, &fitted),
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        dot(&self.coefficients, row)
    }

    pub fn predict_all(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict(row)).collect()
    }

    /// Residual degrees of freedom.
    pub fn df_residual(&self) -> usize {
        self.observations.saturating_sub(self.rank)
    }

    /// Coefficient table, adjusted R² and the overall F test.
    pub fn summary(&self) -> FitSummary {
        let df = self.df_residual();
        let t_dist = StudentsT::new(0.0, 1.0, df as f64).ok().filter(|_| df > 0);

        let coefficients = self
            .columns
            .iter()
            .zip(&self.coefficients)
            .zip(&self.std_errors)
            .map(|((column, &estimate), &std_error)| {
                let t_value = std_error.filter(|se| *se > 0.0).map(|se| estimate / se);
                let p_value = t_value
                    .zip(t_dist.as_ref())
                    .map(|(t, dist)| 2.0 * dist.sf(t.abs()));
                CoefficientEstimate {
                    column: column.to_string(),
                    estimate,
                    std_error,
                    t_value,
                    p_value,
                }
            })
            .collect();

        let adj_r_squared = self.r_squared.filter(|_| df > 0).map(|r2| {
            1.0 - (1.0 - r2) * (self.observations - 1) as f64 / df as f64
        });

        // every estimable column except the intercept
        let regressors = self.rank.saturating_sub(1);
        let f_statistic = self
            .r_squared
            .filter(|r2| df > 0 && regressors > 0 && *r2 < 1.0)
            .map(|r2| (r2 / regressors as f64) / ((1.0 - r2) / df as f64));
        let f_p_value = f_statistic.and_then(|f| {
            FisherSnedecor::new(regressors as f64, df as f64)
                .ok()
                .map(|dist| dist.sf(f))
        });

        FitSummary {
            observations: self.observations,
            df_residual: df,
            r_squared: self.r_squared,
            adj_r_squared,
            f_statistic,
            f_p_value,
            coefficients,
        }
    }
}

fn dot(coefficients: &[f64], row: &[f64]) -> f64 {
    coefficients.iter().zip(row).map(|(b, v)| b * v).sum()
}

fn normal_equations(x: &[Vec<f64>], y: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let p = x.first().map_or(0, Vec::len);
    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];

    for (row, target) in x.iter().zip(y) {
        for i in 0..p {
            xty[i] += row[i] * target;
            for j in 0..p {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    (xtx, xty)
}

/// Least-squares coefficients for `x β ≈ y`.
pub fn least_squares(x: &[Vec<f64>], y: &[f64]) -> Vec<f64> {
    let (xtx, xty) = normal_equations(x, y);
    solve(xtx, xty).0
}

/// Gaussian elimination with partial pivoting. Columns without a usable
/// pivot are left at zero. Also returns the pivot columns, ascending.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> (Vec<f64>, Vec<usize>) {
    let n = b.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let tolerance = scale * PIVOT_TOLERANCE;

    let mut pivot_columns = Vec::with_capacity(n);
    let mut row = 0;
    for col in 0..n {
        if row == n {
            break;
        }
        let best = (row..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(row);
        if a[best][col].abs() <= tolerance {
            continue;
        }

        a.swap(row, best);
        b.swap(row, best);
        let pivot = a[row].clone();
        for r in row + 1..n {
            let factor = a[r][col] / pivot[col];
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[r][c] -= factor * pivot[c];
            }
            b[r] -= factor * b[row];
        }

        pivot_columns.push(col);
        row += 1;
    }

    let mut beta = vec![0.0; n];
    for (r, &col) in pivot_columns.iter().enumerate().rev() {
        let tail: f64 = (col + 1..n).map(|c| a[r][c] * beta[c]).sum();
        beta[col] = (b[r] - tail) / a[r][col];
    }
    (beta, pivot_columns)
}

/// Gauss-Jordan inverse. `None` if the matrix is singular.
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let tolerance = scale * PIVOT_TOLERANCE;
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let best = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[best][col].abs() <= tolerance {
            return None;
        }
        a.swap(col, best);
        inv.swap(col, best);

        let pivot = a[col][col];
        for c in 0..n {
            a[col][c] /= pivot;
            inv[col][c] /= pivot;
        }

        let (pivot_row, pivot_inv) = (a[col].clone(), inv[col].clone());
        for r in (0..n).filter(|&r| r != col) {
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..n {
                a[r][c] -= factor * pivot_row[c];
                inv[r][c] -= factor * pivot_inv[c];
            }
        }
    }
    Some(inv)
}

/// `1 - SSR / SST`, with SST taken around the mean of `actual`.
///
/// `None` when `actual` has no variation.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() {
        return None;
    }
    let avg = actual.iter().sum::<f64>() / actual.len() as f64;
    let sst: f64 = actual.iter().map(|y| (y - avg).powi(2)).sum();
    let ssr: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    (sst > 0.0).then(|| 1.0 - ssr / sst)
}

/// Variance inflation factor of every column of `x`: `1 / (1 - R²)` from
/// regressing that column on all the others.
///
/// `None` for a constant column (the intercept, for one); infinite for a
/// column the others reproduce exactly.
pub fn variance_inflation_factors(x: &[Vec<f64>]) -> Vec<Option<f64>> {
    let p = x.first().map_or(0, Vec::len);

    (0..p)
        .map(|j| {
            let target: Vec<f64> = x.iter().map(|row| row[j]).collect();
            let others: Vec<Vec<f64>> = x
                .iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .filter(|(k, _)| *k != j)
                        .map(|(_, v)| *v)
                        .collect()
                })
                .collect();

            let beta = least_squares(&others, &target);
            let fitted: Vec<f64> = others.iter().map(|row| dot(&beta, row)).collect();

            r_squared(&target, &fitted).map(|r2| {
                if r2 >= 1.0 {
                    f64::INFINITY
                } else {
                    1.0 / (1.0 - r2)
                }
            })
        })
        .collect()
}
