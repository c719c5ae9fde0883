use nalgebra::{Matrix2, Vector2};
use tracing::debug;

use crate::error::{Error, Result};

const MAX_ITERATIONS: usize = 1000;
const TOLERANCE: f64 = 1e-10;
const MAX_DAMPING: f64 = 1e20;
const DIAGONAL_FLOOR: f64 = 1e-12;

/// Least-squares fit of `a * exp(-b * x)` with the Levenberg-Marquardt algorithm, starting from
/// `a = b = 0`. Returns `(a, b)`.
pub(crate) fn fit_exponential(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch {
            expected: x.len(),
            found: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(Error::InsufficientData {
            required: 2,
            found: x.len(),
        });
    }

    let mut params = Vector2::zeros();
    let mut cost = sum_of_squares(x, y, &params);
    let mut damping = 1e-3;

    for iteration in 0..MAX_ITERATIONS {
        if cost == 0.0 {
            return Ok((params[0], params[1]));
        }

        let (jtj, gradient) = normal_equations(x, y, &params);

        // Marquardt's scaling, the floor keeps the system solvable when a column vanishes.
        let mut damped = jtj;
        for i in 0..2 {
            damped[(i, i)] += damping * jtj[(i, i)].max(DIAGONAL_FLOOR);
        }

        let candidate = damped.try_inverse().map(|inverse| params + inverse * gradient);
        let candidate = candidate.map(|params| (params, sum_of_squares(x, y, &params)));

        match candidate {
            Some((candidate, candidate_cost))
                if candidate_cost.is_finite() && candidate_cost < cost =>
            {
                let improvement = (cost - candidate_cost) / cost;
                let step = (candidate - params).norm();

                params = candidate;
                cost = candidate_cost;
                damping = (damping / 10.0).max(f64::EPSILON);

                if improvement < TOLERANCE || step < TOLERANCE * (params.norm() + TOLERANCE) {
                    debug!(iteration, cost, "exponential fit converged");
                    return Ok((params[0], params[1]));
                }
            }
            _ => {
                damping *= 10.0;

                // No step in any direction reduces the cost any more.
                if damping > MAX_DAMPING {
                    debug!(iteration, cost, "exponential fit reached a minimum");
                    return Ok((params[0], params[1]));
                }
            }
        }
    }

    Err(Error::FitDidNotConverge(MAX_ITERATIONS))
}

fn model(x: f64, params: &Vector2<f64>) -> f64 {
    params[0] * (-params[1] * x).exp()
}

fn sum_of_squares(x: &[f64], y: &[f64], params: &Vector2<f64>) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&x, &y)| (y - model(x, params)).powi(2))
        .sum()
}

/// Returns `J^T J` and `J^T r` for the residuals `r = y - f(x)`.
fn normal_equations(x: &[f64], y: &[f64], params: &Vector2<f64>) -> (Matrix2<f64>, Vector2<f64>) {
    let mut jtj = Matrix2::zeros();
    let mut gradient = Vector2::zeros();

    for (&x, &y) in x.iter().zip(y) {
        let decay = (-params[1] * x).exp();
        let jacobian = Vector2::new(decay, -params[0] * x * decay);
        let residual = y - params[0] * decay;

        jtj += jacobian * jacobian.transpose();
        gradient += jacobian * residual;
    }

    (jtj, gradient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exponential_decay() {
        let x: Vec<f64> = (0..20).map(|i| 50.0 + 100.0 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|x| 0.2 * (-0.005 * x).exp()).collect();

        let (a, b) = fit_exponential(&x, &y).unwrap();

        assert!((a - 0.2).abs() < 1e-4, "a = {a}");
        assert!((b - 0.005).abs() < 1e-6, "b = {b}");
    }

    #[test]
    fn flat_data() {
        let x = [1.0, 2.0, 3.0];
        let y = [0.3, 0.3, 0.3];

        let (a, b) = fit_exponential(&x, &y).unwrap();

        assert!((a - 0.3).abs() < 1e-6);
        assert!(b.abs() < 1e-6);
    }

    #[test]
    fn zero_data_is_exact() {
        assert_eq!(fit_exponential(&[1.0, 2.0], &[0.0, 0.0]).unwrap(), (0.0, 0.0));
    }

    #[test]
    fn insufficient_data() {
        assert!(matches!(
            fit_exponential(&[1.0], &[0.5]),
            Err(Error::InsufficientData {
                required: 2,
                found: 1
            })
        ));
        assert!(matches!(
            fit_exponential(&[1.0, 2.0], &[0.5]),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
