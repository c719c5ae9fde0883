//! Extraction of connection probabilities from pairs of neurons, binned by pairwise properties.

use std::ops::Range;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    graph::Connectome,
    modelling::ModelBuildingConfig,
    neurons::NeuronTable,
};

/// Pair counts binned along one or more dependencies, stored in row-major order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinnedCounts {
    /// The number of bins along every dependency.
    pub shape: Vec<usize>,
    /// Summed connection weights of the pairs in every bin.
    pub count_conn: Vec<f64>,
    /// Number of pairs in every bin.
    pub count_all: Vec<f64>,
    /// Connection probability of every bin, 0 for empty bins.
    pub p_conn: Vec<f64>,
}

impl BinnedCounts {
    fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();

        Self {
            shape,
            count_conn: vec![0.0; len],
            count_all: vec![0.0; len],
            p_conn: vec![0.0; len],
        }
    }

    /// Adds the counts of `other`, which must have the same shape, and updates the probabilities.
    fn accumulate(&mut self, other: &Self) {
        debug_assert_eq!(self.shape, other.shape);

        for (total, count) in self.count_conn.iter_mut().zip(&other.count_conn) {
            *total += count;
        }
        for (total, count) in self.count_all.iter_mut().zip(&other.count_all) {
            *total += count;
        }
        self.update_probabilities();
    }

    fn update_probabilities(&mut self) {
        self.p_conn = self
            .count_conn
            .iter()
            .zip(&self.count_all)
            .map(|(conn, all)| {
                let p = conn / all;
                if p.is_nan() {
                    0.0
                } else {
                    p
                }
            })
            .collect();
    }

    /// Returns `(p_conn, count_conn, count_all)` for a multi-dimensional bin index.
    pub fn get(&self, index: &[usize]) -> Option<(f64, f64, f64)> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }

        let flat = index
            .iter()
            .zip(&self.shape)
            .fold(0, |flat, (i, n)| flat * n + i);

        Some((self.p_conn[flat], self.count_conn[flat], self.count_all[flat]))
    }
}

/// Distance-dependent connection probabilities (2nd order).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceDependentData {
    pub p_conn_dist: Vec<f64>,
    pub count_conn: Vec<f64>,
    pub count_all: Vec<f64>,
    pub dist_bins: Vec<f64>,
}

/// Bipolar distance-dependent connection probabilities (3rd order). The inner pairs hold the
/// values for post-synaptic neurons below (`[0]`) and above (`[1]`) the pre-synaptic neuron.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BipolarDistanceData {
    pub p_conn_dist_bip: Vec<[f64; 2]>,
    pub count_conn: Vec<[f64; 2]>,
    pub count_all: Vec<[f64; 2]>,
    pub dist_bins: Vec<f64>,
    pub bip_bins: [f64; 3],
}

/// Computes the distances between every pair of source and target positions. Zero distances,
/// a neuron paired with itself, are replaced with NaN so they are never counted.
pub fn compute_dist_matrix(src_positions: &[[f64; 3]], tgt_positions: &[[f64; 3]]) -> DMatrix<f64> {
    DMatrix::from_fn(src_positions.len(), tgt_positions.len(), |i, j| {
        let (s, t) = (src_positions[i], tgt_positions[j]);
        let distance = s
            .iter()
            .zip(&t)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();

        if distance == 0.0 {
            f64::NAN
        } else {
            distance
        }
    })
}

/// Computes the sign of the depth difference between every pair of source and target neurons:
/// -1 when the post-synaptic neuron lies deeper, 1 when it lies shallower and 0 at equal depth.
pub fn compute_bip_matrix(src_depths: &[f64], tgt_depths: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(src_depths.len(), tgt_depths.len(), |i, j| {
        let delta = src_depths[i] - tgt_depths[j];

        if delta == 0.0 {
            0.0
        } else {
            delta.signum()
        }
    })
}

/// Extracts the connection probability of pairs of neurons binned along D dependency matrices.
///
/// Bin `k` of a dependency holds the values in `[bins[k], bins[k + 1])`, the last bin also
/// includes its upper edge. Pairs with a NaN or out-of-range value are ignored.
///
/// # Examples
///
/// ```
/// use nalgebra::dmatrix;
/// use connalysis::modelling::extract_dependent_p_conn;
///
/// let adjacency = dmatrix![0.0, 1.0;
///                          0.0, 0.0];
/// let distances = dmatrix![f64::NAN, 10.0;
///                          10.0, f64::NAN];
///
/// let counts = extract_dependent_p_conn(&adjacency, &[distances], &[vec![0.0, 10.0]]).unwrap();
///
/// assert_eq!(counts.p_conn, vec![0.5]);
/// assert_eq!(counts.count_all, vec![2.0]);
/// ```
pub fn extract_dependent_p_conn(
    adjacency: &DMatrix<f64>,
    dep_matrices: &[DMatrix<f64>],
    dep_bins: &[Vec<f64>],
) -> Result<BinnedCounts> {
    if dep_matrices.len() != dep_bins.len() {
        return Err(Error::DimensionMismatch {
            expected: dep_matrices.len(),
            found: dep_bins.len(),
        });
    }
    for matrix in dep_matrices {
        if matrix.shape() != adjacency.shape() {
            return Err(Error::DimensionMismatch {
                expected: adjacency.len(),
                found: matrix.len(),
            });
        }
    }
    if let Some(bins) = dep_bins.iter().find(|bins| bins.len() < 2) {
        return Err(Error::InvalidParameter(format!(
            "at least two bin edges are required, got {}",
            bins.len()
        )));
    }

    let shape: Vec<usize> = dep_bins.iter().map(|bins| bins.len() - 1).collect();
    debug!(?shape, "extracting connection probabilities");

    let mut counts = BinnedCounts::zeros(shape);

    for j in 0..adjacency.ncols() {
        'pairs: for i in 0..adjacency.nrows() {
            let mut flat = 0;
            for (matrix, bins) in dep_matrices.iter().zip(dep_bins) {
                match bin_index(bins, matrix[(i, j)]) {
                    Some(k) => flat = flat * (bins.len() - 1) + k,
                    None => continue 'pairs,
                }
            }

            counts.count_all[flat] += 1.0;
            counts.count_conn[flat] += adjacency[(i, j)];
        }
    }

    counts.update_probabilities();

    Ok(counts)
}

/// Extracts the distance-dependent connection probability (2nd order).
pub fn extract_2nd_order(
    m: &Connectome,
    neurons: &NeuronTable,
    config: &ModelBuildingConfig,
) -> Result<DistanceDependentData> {
    check_inputs(m, neurons, config)?;
    let positions = neurons.positions();

    let (counts, dist_bins) = if config.n_split == 1 {
        let dist_mat = compute_dist_matrix(&positions, &positions);
        let max_range = match config.max_range_um {
            Some(max_range) => max_range,
            None => nan_max(&dist_mat)?,
        };
        let dist_bins = distance_bins(max_range, config.bin_size_um)?;

        let adjacency = adjacency_rows(m, 0..m.vertex_count());
        let counts = extract_dependent_p_conn(&adjacency, &[dist_mat], &[dist_bins.clone()])?;

        (counts, dist_bins)
    } else {
        // Always set when split, see `ModelBuildingConfig::validate`.
        let max_range = config.max_range_um.unwrap_or_default();
        let dist_bins = distance_bins(max_range, config.bin_size_um)?;
        let bins = [dist_bins.clone()];

        let counts = extract_in_splits(m, config.n_split, &bins, |rows| {
            vec![compute_dist_matrix(&positions[rows], &positions)]
        })?;

        (counts, dist_bins)
    };

    Ok(DistanceDependentData {
        p_conn_dist: counts.p_conn,
        count_conn: counts.count_conn,
        count_all: counts.count_all,
        dist_bins,
    })
}

/// Extracts the bipolar distance-dependent connection probability (3rd order): distance bins
/// crossed with whether the post-synaptic neuron lies below or above the pre-synaptic one.
pub fn extract_3rd_order(
    m: &Connectome,
    neurons: &NeuronTable,
    config: &ModelBuildingConfig,
) -> Result<BipolarDistanceData> {
    check_inputs(m, neurons, config)?;
    let positions = neurons.positions();
    let depths = neurons.depths()?;

    let (counts, dist_bins, bip_bins) = if config.n_split == 1 {
        let dist_mat = compute_dist_matrix(&positions, &positions);
        let bip_mat = compute_bip_matrix(&depths, &depths);

        let max_range = match config.max_range_um {
            Some(max_range) => max_range,
            None => nan_max(&dist_mat)?,
        };
        let dist_bins = distance_bins(max_range, config.bin_size_um)?;
        let bip_bins = [nan_min(&bip_mat)?, 0.0, nan_max(&bip_mat)?];

        let adjacency = adjacency_rows(m, 0..m.vertex_count());
        let counts = extract_dependent_p_conn(
            &adjacency,
            &[dist_mat, bip_mat],
            &[dist_bins.clone(), bip_bins.to_vec()],
        )?;

        (counts, dist_bins, bip_bins)
    } else {
        let max_range = config.max_range_um.unwrap_or_default();
        let dist_bins = distance_bins(max_range, config.bin_size_um)?;
        let bip_bins = [-1.0, 0.0, 1.0];
        let bins = [dist_bins.clone(), bip_bins.to_vec()];

        let counts = extract_in_splits(m, config.n_split, &bins, |rows| {
            vec![
                compute_dist_matrix(&positions[rows.clone()], &positions),
                compute_bip_matrix(&depths[rows], &depths),
            ]
        })?;

        (counts, dist_bins, bip_bins)
    };

    let pairs = |values: &[f64]| values.chunks_exact(2).map(|c| [c[0], c[1]]).collect();

    Ok(BipolarDistanceData {
        p_conn_dist_bip: pairs(&counts.p_conn),
        count_conn: pairs(&counts.count_conn),
        count_all: pairs(&counts.count_all),
        dist_bins,
        bip_bins,
    })
}

//
// Helpers
//

fn check_inputs(m: &Connectome, neurons: &NeuronTable, config: &ModelBuildingConfig) -> Result<()> {
    config.validate()?;

    if neurons.len() != m.vertex_count() {
        return Err(Error::DimensionMismatch {
            expected: m.vertex_count(),
            found: neurons.len(),
        });
    }

    Ok(())
}

/// Bins `[0, bin_size)`, `[bin_size, 2 bin_size)`... covering `max_range`.
fn distance_bins(max_range: f64, bin_size: f64) -> Result<Vec<f64>> {
    let num_bins = (max_range / bin_size).ceil() as usize;
    if num_bins == 0 {
        return Err(Error::InvalidParameter(format!(
            "no distance bins fit in a range of {max_range}"
        )));
    }

    Ok((0..=num_bins).map(|k| k as f64 * bin_size).collect())
}

/// Finds the bin of `value`: `[bins[k], bins[k + 1])`, the last bin being closed.
fn bin_index(bins: &[f64], value: f64) -> Option<usize> {
    let num_bins = bins.len() - 1;
    let k = bins.partition_point(|edge| *edge <= value).checked_sub(1)?;

    if k < num_bins {
        Some(k)
    } else if value == bins[num_bins] {
        Some(num_bins - 1)
    } else {
        None
    }
}

/// The dense adjacency matrix restricted to the given rows.
fn adjacency_rows(m: &Connectome, rows: Range<usize>) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(rows.len(), m.vertex_count());
    for (edge, weight) in m.edges() {
        if rows.contains(&edge.source()) {
            matrix[(edge.source() - rows.start, edge.target())] = weight;
        }
    }

    matrix
}

/// Runs the extraction over `n_split` chunks of rows, so only a chunk of every pairwise matrix is
/// held in memory at a time, and sums the counts.
fn extract_in_splits<F>(
    m: &Connectome,
    n_split: usize,
    bins: &[Vec<f64>],
    dependencies: F,
) -> Result<BinnedCounts>
where
    F: Fn(Range<usize>) -> Vec<DMatrix<f64>>,
{
    let n = m.vertex_count();
    let split_size = n.div_ceil(n_split);

    let mut counts = BinnedCounts::zeros(bins.iter().map(|b| b.len() - 1).collect());
    for split in 0..n_split {
        let rows = (split * split_size).min(n)..((split + 1) * split_size).min(n);
        info!(split = split + 1, n_split, ?rows, "extracting split");

        let adjacency = adjacency_rows(m, rows.clone());
        let split_counts = extract_dependent_p_conn(&adjacency, &dependencies(rows), bins)?;
        counts.accumulate(&split_counts);
    }

    Ok(counts)
}

fn nan_max(matrix: &DMatrix<f64>) -> Result<f64> {
    matrix
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .max_by(|a, b| a.total_cmp(b))
        .ok_or_else(|| Error::InvalidParameter("no pair of distinct neurons".to_string()))
}

fn nan_min(matrix: &DMatrix<f64>) -> Result<f64> {
    matrix
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .min_by(|a, b| a.total_cmp(b))
        .ok_or_else(|| Error::InvalidParameter("no pair of distinct neurons".to_string()))
}
