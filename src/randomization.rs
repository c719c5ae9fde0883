//! Null models: randomized connectomes that keep some of the statistics of an observed one.

use rand::{seq::index, Rng};
use tracing::debug;

use crate::{
    edge::Edge,
    error::{Error, Result},
    graph::{Connectome, Direction},
};

/// Shuffles a connectome while preserving its degree distribution.
///
/// With [`Direction::Efferent`] every neuron keeps its exact out-degree and draws its targets
/// without replacement, with probability proportional to their observed in-degree, so in-degrees
/// are approximately preserved. [`Direction::Afferent`] is the mirror image. Autapses are never
/// generated and the result is binary.
///
/// # Examples
///
/// ```
/// use rand::{rngs::StdRng, SeedableRng};
/// use connalysis::edge::Edge;
/// use connalysis::graph::{Connectome, Direction};
/// use connalysis::randomization::generate_degree_based_control;
///
/// let connectome =
///     Connectome::from_edges(3, [Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 0)]).unwrap();
/// let mut rng = StdRng::seed_from_u64(42);
///
/// let control = generate_degree_based_control(&connectome, Direction::Efferent, &mut rng).unwrap();
/// assert_eq!(
///     control.binary_degrees(Direction::Efferent),
///     connectome.binary_degrees(Direction::Efferent)
/// );
/// ```
pub fn generate_degree_based_control<R>(
    m: &Connectome,
    direction: Direction,
    rng: &mut R,
) -> Result<Connectome>
where
    R: Rng + ?Sized,
{
    // The preserved side and the side whose degrees weight the draw.
    let (kept, weighted) = match direction {
        Direction::Efferent => (Direction::Efferent, Direction::Afferent),
        Direction::Afferent => (Direction::Afferent, Direction::Efferent),
        Direction::Both => return Err(Error::UnsupportedDirection(direction)),
    };

    debug!(?direction, neurons = m.vertex_count(), "generating degree based control");

    let counts = m.binary_degrees(kept);
    let weights = m.degrees(weighted);

    let mut control = Connectome::new(m.vertex_count());
    for (vertex, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }

        let partners = sample_without_replacement(&weights, vertex, count, rng).ok_or_else(|| {
            Error::InsufficientCandidates {
                vertex,
                required: count,
                available: eligible(&weights, vertex).count(),
            }
        })?;

        for partner in partners {
            let edge = match direction {
                Direction::Efferent => Edge::new(vertex, partner),
                _ => Edge::new(partner, vertex),
            };
            control.insert_unchecked(edge);
        }
    }

    Ok(control)
}

/// Candidates with a positive weight, other than `exclude`.
fn eligible(weights: &[f64], exclude: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
    weights
        .iter()
        .copied()
        .enumerate()
        .filter(move |(i, w)| *i != exclude && *w > 0.0)
}

/// Draws `count` distinct indices with probability proportional to `weights`, never `exclude`.
/// Returns `None` when fewer than `count` candidates have a positive weight.
fn sample_without_replacement<R>(
    weights: &[f64],
    exclude: usize,
    count: usize,
    rng: &mut R,
) -> Option<Vec<usize>>
where
    R: Rng + ?Sized,
{
    let weight = |i: usize| if i == exclude { 0.0 } else { weights[i].max(0.0) };

    index::sample_weighted(rng, weights.len(), weight, count)
        .ok()
        .map(|sample| sample.into_vec())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn random_connectome(size: usize, p: f64, rng: &mut StdRng) -> Connectome {
        let mut connectome = Connectome::new(size);
        for i in 0..size {
            for j in 0..size {
                if i != j && rng.random::<f64>() < p {
                    connectome.insert(Edge::new(i, j)).unwrap();
                }
            }
        }

        connectome
    }

    #[test]
    fn efferent_preserves_out_degrees() {
        let mut rng = StdRng::seed_from_u64(11);
        let connectome = random_connectome(30, 0.2, &mut rng);

        let control =
            generate_degree_based_control(&connectome, Direction::Efferent, &mut rng).unwrap();

        assert_eq!(control.edge_count(), connectome.edge_count());
        assert_eq!(
            control.binary_degrees(Direction::Efferent),
            connectome.binary_degrees(Direction::Efferent)
        );
        assert!(control.edges().all(|(edge, weight)| !edge.is_loop() && weight == 1.0));
    }

    #[test]
    fn afferent_preserves_in_degrees() {
        let mut rng = StdRng::seed_from_u64(12);
        let connectome = random_connectome(30, 0.2, &mut rng);

        let control =
            generate_degree_based_control(&connectome, Direction::Afferent, &mut rng).unwrap();

        assert_eq!(
            control.binary_degrees(Direction::Afferent),
            connectome.binary_degrees(Direction::Afferent)
        );
        assert!(control.edges().all(|(edge, _)| !edge.is_loop()));
    }

    #[test]
    fn only_neurons_with_inputs_are_targeted() {
        // Neuron 3 never receives a connection so it can't be drawn as a target.
        let connectome =
            Connectome::from_edges(4, [Edge::new(3, 0), Edge::new(3, 1), Edge::new(0, 2)]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..20 {
            let control =
                generate_degree_based_control(&connectome, Direction::Efferent, &mut rng).unwrap();

            assert!(control.edges().all(|(edge, _)| edge.target() != 3));
        }
    }

    #[test]
    fn insufficient_candidates() {
        // Neuron 0 needs two targets but only neuron 1 is eligible once autapses are excluded.
        let connectome = Connectome::from_edges(2, [Edge::new(0, 0), Edge::new(0, 1)]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            generate_degree_based_control(&connectome, Direction::Efferent, &mut rng),
            Err(Error::InsufficientCandidates {
                vertex: 0,
                required: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn both_is_unsupported() {
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            generate_degree_based_control(&Connectome::new(2), Direction::Both, &mut rng),
            Err(Error::UnsupportedDirection(Direction::Both))
        ));
    }

    #[test]
    fn sampling_is_distinct_and_weighted() {
        let mut rng = StdRng::seed_from_u64(99);
        let weights = [1.0, 0.0, 100.0, 1.0, 1.0];

        let mut hits = 0;
        for _ in 0..200 {
            let sample = sample_without_replacement(&weights, 0, 2, &mut rng).unwrap();
            let unique: HashSet<usize> = sample.iter().copied().collect();

            assert_eq!(unique.len(), 2);
            assert!(!unique.contains(&0) && !unique.contains(&1));
            if unique.contains(&2) {
                hits += 1;
            }
        }

        // The heavy candidate is nearly always drawn.
        assert!(hits > 190);
        assert!(sample_without_replacement(&weights, 0, 4, &mut rng).is_none());
    }
}
