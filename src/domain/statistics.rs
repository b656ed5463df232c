// Statistics kernel - regression and residual helpers shared by the trend models
//
// Every function here is pure. Degenerate input (empty or too short) never
// panics; it returns a neutral result and the trend models decide what to do.
use nalgebra::{DMatrix, DVector};

/// Singular values at or below this are treated as zero by the polynomial solve.
const SINGULAR_VALUE_EPS: f64 = 1e-10;

/// Result of an ordinary least squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Ordinary least squares over parallel `x`/`y` slices.
///
/// Mismatched or single-point input gives a flat line through the mean, and a
/// zero denominator (all `x` equal) gives a flat line through the mean of `y`.
pub fn linear_regression(x: &[f64], y: &[f64]) -> LinearFit {
    if x.len() != y.len() || y.len() < 2 {
        return LinearFit {
            slope: 0.0,
            intercept: mean(y),
        };
    }

    let n = y.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_xx: f64 = x.iter().map(|a| a * a).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return LinearFit {
            slope: 0.0,
            intercept: sum_y / n,
        };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    LinearFit { slope, intercept }
}

/// Least squares polynomial fit over the Vandermonde design matrix, solved
/// by SVD so rank-deficient input (repeated `x`) still gets the minimum-norm
/// solution.
///
/// Returns coefficients lowest power first. When there are not more points
/// than the degree, or the solve fails, returns `[mean(y)]`.
pub fn polynomial_regression(x: &[f64], y: &[f64], degree: usize) -> Vec<f64> {
    if x.len() != y.len() || y.len() <= degree {
        return vec![mean(y)];
    }

    let terms = degree + 1;
    let design = DMatrix::from_fn(x.len(), terms, |row, power| x[row].powi(power as i32));
    let observed = DVector::from_column_slice(y);

    match design.svd(true, true).solve(&observed, SINGULAR_VALUE_EPS) {
        Ok(coefficients) if coefficients.iter().all(|c| c.is_finite()) => {
            coefficients.iter().copied().collect()
        }
        _ => vec![mean(y)],
    }
}

/// Evaluate `c0 + c1*x + c2*x^2 + ...` using Horner's scheme.
pub fn evaluate_polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Residual variance `sum((actual - predicted)^2) / (n - 1)`.
///
/// Infinite when the slices disagree in length, hold fewer than two points,
/// or the residuals are not finite, so a bad fit can never rank first.
pub fn error_variance(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.len() < 2 {
        return f64::INFINITY;
    }

    let sum_sq: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let variance = sum_sq / (actual.len() - 1) as f64;

    if variance.is_finite() { variance } else { f64::INFINITY }
}
