use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{Error, Result},
    modelling::{
        extract::{BipolarDistanceData, DistanceDependentData},
        fit::fit_exponential,
    },
};

/// A fitted model of the probability that a pair of neurons is connected.
///
/// # Examples
///
/// ```
/// use connalysis::modelling::ConnectionModel;
///
/// let model = ConnectionModel::BipolarDistanceDependent {
///     a_neg: 0.2,
///     b_neg: 0.01,
///     a_pos: 0.1,
///     b_pos: 0.01,
/// };
///
/// assert_eq!(model.probability(0.0, -1.0), 0.2);
/// assert_eq!(model.probability(0.0, 1.0), 0.1);
/// // Pairs at the same depth average both branches.
/// assert!((model.probability(0.0, 0.0) - 0.15).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ConnectionModel {
    /// `a * exp(-b * d)` for pairs at distance `d`.
    DistanceDependent { a: f64, b: f64 },
    /// Distance dependent with separate parameters depending on the sign of the depth difference
    /// `dz` between the pre- and post-synaptic neuron.
    BipolarDistanceDependent {
        a_neg: f64,
        b_neg: f64,
        a_pos: f64,
        b_pos: f64,
    },
}

impl ConnectionModel {
    /// Connection probability at distance `distance` and depth difference `dz`, the latter is
    /// ignored by [`ConnectionModel::DistanceDependent`].
    pub fn probability(&self, distance: f64, dz: f64) -> f64 {
        match *self {
            Self::DistanceDependent { a, b } => exponential(a, b, distance),
            Self::BipolarDistanceDependent {
                a_neg,
                b_neg,
                a_pos,
                b_pos,
            } => {
                let neg = exponential(a_neg, b_neg, distance);
                let pos = exponential(a_pos, b_pos, distance);

                if dz < 0.0 {
                    neg
                } else if dz > 0.0 {
                    pos
                } else {
                    0.5 * (neg + pos)
                }
            }
        }
    }

    /// The number of inputs the model takes, 1 (distance) or 2 (distance and depth difference).
    pub fn input_count(&self) -> usize {
        match self {
            Self::DistanceDependent { .. } => 1,
            Self::BipolarDistanceDependent { .. } => 2,
        }
    }
}

impl fmt::Display for ConnectionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::DistanceDependent { a, b } => write!(f, "f(x) = {a:.3} * exp(-{b:.3} * x)"),
            Self::BipolarDistanceDependent {
                a_neg,
                b_neg,
                a_pos,
                b_pos,
            } => write!(
                f,
                "f(x, dz) = {a_neg:.3} * exp(-{b_neg:.3} * x) if dz < 0, \
                 {a_pos:.3} * exp(-{b_pos:.3} * x) if dz > 0, \
                 the average of both if dz == 0"
            ),
        }
    }
}

/// Fits a [`ConnectionModel::DistanceDependent`] model to the probabilities of every distance bin,
/// taken at the bin centers. Bins with a non-finite probability are left out.
pub fn build_2nd_order(data: &DistanceDependentData) -> Result<ConnectionModel> {
    let centers = bin_centers(&data.dist_bins)?;
    let (x, y): (Vec<f64>, Vec<f64>) = centers
        .iter()
        .zip(&data.p_conn_dist)
        .filter(|(_, p)| p.is_finite())
        .map(|(x, p)| (*x, *p))
        .unzip();

    let (a, b) = fit_exponential(&x, &y)?;
    let model = ConnectionModel::DistanceDependent { a, b };
    info!(%model, "model fit");

    Ok(model)
}

/// Fits a [`ConnectionModel::BipolarDistanceDependent`] model, one exponential for either sign of
/// the depth difference. Bins where either probability is not finite are left out.
pub fn build_3rd_order(data: &BipolarDistanceData) -> Result<ConnectionModel> {
    let centers = bin_centers(&data.dist_bins)?;
    let rows: Vec<(f64, [f64; 2])> = centers
        .iter()
        .zip(&data.p_conn_dist_bip)
        .filter(|(_, p)| p.iter().all(|p| p.is_finite()))
        .map(|(x, p)| (*x, *p))
        .collect();

    let x: Vec<f64> = rows.iter().map(|(x, _)| *x).collect();
    let neg: Vec<f64> = rows.iter().map(|(_, p)| p[0]).collect();
    let pos: Vec<f64> = rows.iter().map(|(_, p)| p[1]).collect();

    let (a_neg, b_neg) = fit_exponential(&x, &neg)?;
    let (a_pos, b_pos) = fit_exponential(&x, &pos)?;
    let model = ConnectionModel::BipolarDistanceDependent {
        a_neg,
        b_neg,
        a_pos,
        b_pos,
    };
    info!(%model, "bipolar model fit");

    Ok(model)
}

fn exponential(a: f64, b: f64, x: f64) -> f64 {
    a * (-b * x).exp()
}

/// Bin lower edges shifted by half the width of the first bin.
fn bin_centers(bins: &[f64]) -> Result<Vec<f64>> {
    match bins {
        [first, second, ..] => {
            let offset = 0.5 * (second - first);
            Ok(bins[..bins.len() - 1].iter().map(|b| b + offset).collect())
        }
        _ => Err(Error::InsufficientData {
            required: 2,
            found: bins.len(),
        }),
    }
}
