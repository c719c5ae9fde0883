//! Degree distribution statistics: Gini coefficients and rich-club curves, raw and normalized
//! against null models.

use std::collections::BTreeMap;

use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    curve::{ControlCurve, Curve},
    error::{Error, Result},
    graph::{Connectome, Direction},
    randomization::generate_degree_based_control,
    stats,
};

//
// Gini
//

/// Computes the Gini (Lorenz) curve of the degree distribution: the cumulative share of the
/// total degree held by the neurons, sorted from the highest degree down.
///
/// # Examples
///
/// ```
/// use connalysis::degree::gini_curve;
/// use connalysis::edge::Edge;
/// use connalysis::graph::{Connectome, Direction};
///
/// let connectome =
///     Connectome::from_edges(2, [Edge::new(0, 1)]).unwrap();
/// let curve = gini_curve(&connectome, Direction::Efferent).unwrap();
///
/// assert_eq!(curve.x(), &[0.0, 1.0]);
/// assert_eq!(curve.y(), &[1.0, 1.0]);
/// ```
pub fn gini_curve(m: &Connectome, direction: Direction) -> Result<Curve> {
    if direction == Direction::Both {
        return Err(Error::UnsupportedDirection(direction));
    }

    let degrees = m
        .degrees(direction)
        .into_iter()
        .sorted_by(|a, b| b.total_cmp(a))
        .collect_vec();
    let total: f64 = degrees.iter().sum();

    if total == 0.0 {
        return Err(Error::EmptyConnectome);
    }

    let y = stats::cumsum(degrees.iter().map(|d| d / total));
    let x = stats::linspace(0.0, 1.0, y.len());

    Curve::new(x, y)
}

/// The area under the Gini curve.
pub fn gini_coefficient(m: &Connectome, direction: Direction) -> Result<f64> {
    Ok(gini_curve(m, direction)?.area())
}

/// The Gini curve expected from a random connectome of the same size and density, where every
/// degree follows a binomial distribution. Only the number of connections is taken into account,
/// not their weights.
pub fn analytical_expected_gini_curve(m: &Connectome, direction: Direction) -> Result<Curve> {
    if direction == Direction::Both {
        return Err(Error::UnsupportedDirection(direction));
    }
    if m.edge_count() == 0 {
        return Err(Error::EmptyConnectome);
    }

    // Possible partners per neuron and possible connections overall.
    let n = m.vertex_count() as u64 - 1;
    let c = (m.vertex_count() as u64 * n) as f64;
    let p = m.edge_count() as f64 / c;

    let degrees = (0..=n).rev().collect_vec();
    let pmf = degrees
        .iter()
        .map(|&k| stats::binomial_pmf(k, n, p))
        .collect_vec();

    let pmf_total: f64 = pmf.iter().sum();
    let weighted = degrees
        .iter()
        .zip(&pmf)
        .map(|(&k, pk)| k as f64 * pk)
        .collect_vec();
    let weighted_total: f64 = weighted.iter().sum();

    let x = stats::cumsum(pmf.iter().map(|pk| pk / pmf_total));
    let y = stats::cumsum(weighted.iter().map(|w| w / weighted_total));

    Curve::new(x, y)
}

/// Twice the difference between the Gini coefficient and the area under the analytically
/// expected Gini curve.
pub fn normalized_gini_coefficient(m: &Connectome, direction: Direction) -> Result<f64> {
    let gini = gini_coefficient(m, direction)?;
    let expected = analytical_expected_gini_curve(m, direction)?;

    Ok(2.0 * (gini - expected.area()))
}

//
// Binning
//

/// Degrees grouped into evenly spaced bins.
#[derive(Clone, Debug, PartialEq)]
pub struct DegreeBins {
    /// The center of every bin.
    pub centers: Vec<f64>,
    /// The bin every neuron falls into.
    pub assignments: Vec<usize>,
}

impl DegreeBins {
    pub fn bin_count(&self) -> usize {
        self.centers.len()
    }
}

/// Bins non-integer degrees: at least 10% of the number of neurons in bins (and up to 30 when
/// there are few neurons), spanning the observed range with the maximum included in the last bin.
///
/// # Examples
///
/// ```
/// use connalysis::degree::bin_degrees;
///
/// let bins = bin_degrees(&[0.0, 1.0, 2.0, 3.0]).unwrap();
///
/// assert_eq!(bins.bin_count(), 4);
/// assert_eq!(bins.assignments, vec![0, 1, 2, 3]);
/// ```
pub fn bin_degrees(degrees: &[f64]) -> Result<DegreeBins> {
    let nbins = (degrees.len() / 10).max(degrees.len().min(30));

    let (mn, mx) = degrees
        .iter()
        .copied()
        .filter(|d| !d.is_nan())
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()
        .ok_or(Error::EmptyConnectome)?;

    let edges = stats::linspace(mn, mx + 1e-6 * (mx - mn), nbins + 1);
    let centers = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
    let assignments = degrees
        .iter()
        .map(|d| edges.iter().filter(|e| *e <= d).count().saturating_sub(1))
        .collect();

    Ok(DegreeBins {
        centers,
        assignments,
    })
}

//
// Rich club
//

/// Computes the rich-club curve: for each degree threshold, the connection density among the
/// neurons at or above it. Binary connectomes use every integer threshold from 1 to the maximum
/// degree, weighted connectomes bin their degrees first (see [`bin_degrees`]) and sum weights.
///
/// # Examples
///
/// ```
/// use connalysis::degree::rich_club_curve;
/// use connalysis::edge::Edge;
/// use connalysis::graph::{Connectome, Direction};
///
/// // Neurons 0 and 1 are reciprocally connected and both project to 2.
/// let connectome = Connectome::from_edges(
///     3,
///     [Edge::new(0, 1), Edge::new(1, 0), Edge::new(0, 2), Edge::new(1, 2)],
/// )
/// .unwrap();
/// let curve = rich_club_curve(&connectome, Direction::Efferent).unwrap();
///
/// assert_eq!(curve.x(), &[1.0, 2.0]);
/// assert_eq!(curve.y(), &[1.0, 1.0]);
/// ```
pub fn rich_club_curve(m: &Connectome, direction: Direction) -> Result<Curve> {
    if direction == Direction::Both {
        return Err(Error::UnsupportedDirection(direction));
    }

    let (x, levels, thresholds) = if m.is_binary() {
        let degrees = m
            .binary_degrees(direction)
            .into_iter()
            .map(|d| d as f64)
            .collect_vec();
        let max = degrees.iter().copied().fold(0.0, f64::max);
        let thresholds = (1..=max as usize).map(|d| d as f64).collect_vec();

        (thresholds.clone(), degrees, thresholds)
    } else {
        let bins = bin_degrees(&m.degrees(direction))?;
        let levels = bins.assignments.iter().map(|b| *b as f64).collect_vec();
        let thresholds = (0..bins.bin_count()).map(|b| b as f64).collect_vec();

        (bins.centers, levels, thresholds)
    };

    let y = rich_club_values(
        &levels,
        m.edges().map(|(e, w)| (e.source(), e.target(), w)),
        &thresholds,
    );

    Curve::new(x, y)
}

/// Options for [`efficient_rich_club_curve`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RichnessOptions {
    /// The degree that defines richness when no richness is supplied.
    pub direction: Direction,
    /// A pre-computed richness for every neuron, used instead of the degree.
    pub richness: Option<Vec<f64>>,
    /// Only evaluate thresholds at richness values that actually occur.
    pub sparse_bins: bool,
}

/// Computes a rich-club curve from connection counts alone, which scales to large connectomes and
/// supports arbitrary richness values. The value at threshold `t` is the number of connections
/// whose endpoints both have richness of at least `t`, divided by the number of ordered pairs of
/// such neurons. Thresholds are ascending.
///
/// Neurons with a richness of 0, such as neurons without connections in the chosen direction,
/// count towards threshold 0. The value at threshold 0 is therefore the density of the whole
/// connectome, not of its connected neurons.
///
/// # Examples
///
/// ```
/// use connalysis::degree::{efficient_rich_club_curve, RichnessOptions};
/// use connalysis::edge::Edge;
/// use connalysis::graph::{Connectome, Direction};
///
/// let connectome = Connectome::from_edges(
///     3,
///     [Edge::new(0, 1), Edge::new(1, 0), Edge::new(0, 2), Edge::new(1, 2)],
/// )
/// .unwrap();
/// let options = RichnessOptions {
///     direction: Direction::Efferent,
///     ..Default::default()
/// };
/// let curve = efficient_rich_club_curve(&connectome, &options).unwrap();
///
/// assert_eq!(curve.x(), &[0.0, 1.0, 2.0]);
/// assert_eq!(curve.y(), &[4.0 / 6.0, 1.0, 1.0]);
/// ```
pub fn efficient_rich_club_curve(m: &Connectome, options: &RichnessOptions) -> Result<Curve> {
    let richness = match &options.richness {
        Some(richness) if richness.len() != m.vertex_count() => {
            return Err(Error::DimensionMismatch {
                expected: m.vertex_count(),
                found: richness.len(),
            })
        }
        Some(richness) => richness.clone(),
        None => m
            .binary_degrees(options.direction)
            .into_iter()
            .map(|d| d as f64)
            .collect(),
    };

    let max = richness
        .iter()
        .copied()
        .filter(|r| !r.is_nan())
        .max_by(|a, b| a.total_cmp(b))
        .ok_or(Error::EmptyConnectome)?;

    // The last bin edge only closes the histogram, it never serves as a threshold.
    let thresholds = if options.sparse_bins {
        richness
            .iter()
            .copied()
            .chain([0.0, max + 1.0])
            .filter(|r| !r.is_nan())
            .sorted_by(|a, b| a.total_cmp(b))
            .dedup()
            .collect_vec()
    } else {
        (0..)
            .map(|t| t as f64)
            .take_while(|t| *t < max + 2.0)
            .collect_vec()
    };
    let thresholds = thresholds
        .split_last()
        .map_or(&[][..], |(_, thresholds)| thresholds);

    let y = rich_club_values(
        &richness,
        m.edges().map(|(e, _)| (e.source(), e.target(), 1.0)),
        thresholds,
    );

    Curve::new(thresholds.to_vec(), y)
}

/// The rich-club curve expected when every neuron keeps its degrees but picks its partners at
/// random. Each neuron's connections into the rich set are hypergeometrically distributed.
pub fn analytical_expected_rich_club_curve(
    m: &Connectome,
    direction: Direction,
) -> Result<ControlCurve> {
    if !m.is_binary() {
        return Err(Error::NotBinary);
    }

    let indegree = m.binary_degrees(Direction::Afferent);
    let outdegree = m.binary_degrees(Direction::Efferent);
    let degrees = match direction {
        Direction::Afferent => &indegree,
        Direction::Efferent => &outdegree,
        Direction::Both => return Err(Error::UnsupportedDirection(direction)),
    };

    let max = degrees.iter().copied().max().unwrap_or(0);
    let total_indegree: usize = indegree.iter().sum();

    let mut control = ControlCurve {
        x: Vec::with_capacity(max),
        mean: Vec::with_capacity(max),
        std: Vec::with_capacity(max),
    };

    for threshold in 1..=max {
        let valid = (0..degrees.len())
            .filter(|&i| degrees[i] >= threshold)
            .collect_vec();
        let pairs = (valid.len() * valid.len().saturating_sub(1)) as f64;
        let rich_indegree: usize = valid.iter().map(|&i| indegree[i]).sum();

        let (mean, variance) = valid
            .iter()
            .map(|&i| {
                stats::hypergeometric_stats(
                    (total_indegree - indegree[i]) as f64,
                    (rich_indegree - indegree[i]) as f64,
                    outdegree[i] as f64,
                )
            })
            .fold((0.0, 0.0), |(m, v), (mi, vi)| (m + mi, v + vi));

        control.x.push(threshold as f64);
        control.mean.push(mean / pairs);
        // Variances add up, the deviation is scaled afterwards.
        control.std.push(variance.sqrt() / pairs);
    }

    Ok(control)
}

/// The rich-club curve expected under degree-preserving randomization, estimated from `samples`
/// shuffled controls (see [`generate_degree_based_control`]). Curves are aligned by threshold and
/// thresholds missing from a sample are ignored.
pub fn randomized_control_rich_club_curve<R>(
    m: &Connectome,
    direction: Direction,
    samples: usize,
    rng: &mut R,
) -> Result<ControlCurve>
where
    R: Rng + ?Sized,
{
    let options = RichnessOptions {
        direction,
        ..Default::default()
    };

    // Thresholds are integer degrees here.
    let mut aligned: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for sample in 0..samples {
        debug!(sample, samples, "rich-club control sample");

        let control = generate_degree_based_control(m, direction, rng)?;
        for (x, y) in efficient_rich_club_curve(&control, &options)?.points() {
            aligned.entry(x as i64).or_default().push(y);
        }
    }

    let mut control = ControlCurve {
        x: Vec::with_capacity(aligned.len()),
        mean: Vec::with_capacity(aligned.len()),
        std: Vec::with_capacity(aligned.len()),
    };
    for (x, values) in aligned {
        control.x.push(x as f64);
        control.mean.push(stats::nan_mean(&values));
        control.std.push(stats::nan_std(&values));
    }

    Ok(control)
}

/// How the rich-club curve is compared to its control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Ratio to the control mean.
    Mean,
    /// Z-score against the control mean and deviation.
    #[default]
    Std,
}

/// The null model the rich-club curve is compared to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Analytical,
    Shuffled { samples: usize },
}

impl Default for Control {
    fn default() -> Self {
        Self::Shuffled { samples: 10 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichClubOptions {
    pub direction: Direction,
    pub normalization: Normalization,
    pub control: Control,
}

/// The rich-club curve of a binary connectome normalized against a null model. Thresholds the
/// control never reached are dropped.
pub fn normalized_rich_club_curve<R>(
    m: &Connectome,
    options: &RichClubOptions,
    rng: &mut R,
) -> Result<Curve>
where
    R: Rng + ?Sized,
{
    if !m.is_binary() {
        return Err(Error::NotBinary);
    }

    let data = rich_club_curve(m, options.direction)?;
    let control = match options.control {
        Control::Analytical => analytical_expected_rich_club_curve(m, options.direction)?,
        Control::Shuffled { samples } => {
            randomized_control_rich_club_curve(m, options.direction, samples, rng)?
        }
    };

    normalize(&data, &control, options.normalization)
}

/// The rich-club coefficient: the mean z-score of the rich-club curve against its control,
/// undefined thresholds excluded. The normalization in `options` is ignored.
pub fn rich_club_coefficient<R>(
    m: &Connectome,
    options: &RichClubOptions,
    rng: &mut R,
) -> Result<f64>
where
    R: Rng + ?Sized,
{
    let options = RichClubOptions {
        normalization: Normalization::Std,
        ..*options
    };

    Ok(normalized_rich_club_curve(m, &options, rng)?.nan_mean())
}

//
// Helpers
//

/// Compares `data` to `control` threshold by threshold, thresholds missing from the control are
/// dropped.
fn normalize(data: &Curve, control: &ControlCurve, normalization: Normalization) -> Result<Curve> {
    let (x, y): (Vec<f64>, Vec<f64>) = data
        .points()
        .filter_map(|(x, y)| {
            let (mean, std) = control.value_at(x)?;
            let value = match normalization {
                Normalization::Mean => y / mean,
                Normalization::Std => (y - mean) / std,
            };

            Some((x, value))
        })
        .unzip();

    Curve::new(x, y)
}

/// For every threshold, the weight of the connections among neurons whose level reaches it
/// divided by the number of ordered pairs of such neurons.
fn rich_club_values(
    levels: &[f64],
    edges: impl Iterator<Item = (usize, usize, f64)>,
    thresholds: &[f64],
) -> Vec<f64> {
    let sorted_levels = levels
        .iter()
        .copied()
        .filter(|l| !l.is_nan())
        .sorted_by(|a, b| a.total_cmp(b))
        .collect_vec();

    // A connection belongs to the club of every threshold up to its weaker endpoint.
    let edge_levels = edges
        .map(|(source, target, weight)| (levels[source].min(levels[target]), weight))
        .filter(|(level, _)| !level.is_nan())
        .sorted_by(|a, b| a.0.total_cmp(&b.0))
        .collect_vec();
    let mut suffix_weights = vec![0.0; edge_levels.len() + 1];
    for (i, (_, weight)) in edge_levels.iter().enumerate().rev() {
        suffix_weights[i] = suffix_weights[i + 1] + weight;
    }

    thresholds
        .iter()
        .map(|&t| {
            let members = sorted_levels.len() - sorted_levels.partition_point(|l| *l < t);
            let weight = suffix_weights[edge_levels.partition_point(|(l, _)| *l < t)];
            let pairs = members as f64 * (members as f64 - 1.0);

            weight / pairs
        })
        .collect()
}
