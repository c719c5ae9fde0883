//! Sampled curves produced by the degree statistics.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    stats,
};

/// A curve sampled at the points `x`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Curve {
    /// Creates a curve, both coordinate vectors must be the same length.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::curve::Curve;
    ///
    /// assert!(Curve::new(vec![0.0, 1.0], vec![1.0]).is_err());
    ///
    /// let curve = Curve::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 1.0]).unwrap();
    /// assert_eq!(curve.area(), 1.5);
    /// ```
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::DimensionMismatch {
                expected: x.len(),
                found: y.len(),
            });
        }

        Ok(Self { x, y })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Iterates over the `(x, y)` samples.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// The area under the curve, integrated with the trapezoidal rule.
    pub fn area(&self) -> f64 {
        stats::trapezoid(&self.x, &self.y)
    }

    /// Returns the value sampled exactly at `x`, if any.
    pub fn value_at(&self, x: f64) -> Option<f64> {
        self.points().find(|(px, _)| *px == x).map(|(_, y)| y)
    }

    /// The mean of the sampled values, NaN samples excluded.
    pub fn nan_mean(&self) -> f64 {
        stats::nan_mean(&self.y)
    }
}

/// The expected value of a curve under a null model, with its spread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlCurve {
    pub x: Vec<f64>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl ControlCurve {
    /// Returns the `(mean, std)` sampled exactly at `x`, if any.
    pub fn value_at(&self, x: f64) -> Option<(f64, f64)> {
        self.x
            .iter()
            .position(|px| *px == x)
            .map(|i| (self.mean[i], self.std[i]))
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_at() {
        let curve = Curve::new(vec![1.0, 2.0], vec![0.5, 0.25]).unwrap();

        assert_eq!(curve.value_at(2.0), Some(0.25));
        assert_eq!(curve.value_at(3.0), None);
    }

    #[test]
    fn nan_mean_skips_gaps() {
        let curve = Curve::new(vec![1.0, 2.0, 3.0], vec![1.0, f64::NAN, 3.0]).unwrap();

        assert_eq!(curve.nan_mean(), 2.0);
    }

    #[test]
    fn single_point_has_no_area() {
        let curve = Curve::new(vec![0.0], vec![1.0]).unwrap();

        assert_eq!(curve.area(), 0.0);
    }

    #[test]
    fn control_value_at() {
        let control = ControlCurve {
            x: vec![1.0, 2.0],
            mean: vec![0.1, 0.2],
            std: vec![0.01, 0.02],
        };

        assert_eq!(control.value_at(2.0), Some((0.2, 0.02)));
        assert_eq!(control.value_at(0.0), None);
    }
}
