//! A module for working with connectomes.

use std::{collections::BTreeMap, ops::Sub};

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::{
    betweenness::compute_betweenness,
    closeness::compute_closeness,
    edge::Edge,
    error::{Error, Result},
};

pub(crate) const MIN_NUM_THREADS: usize = 1;
pub(crate) const MAX_NUM_THREADS: usize = 128;

/// Relative gap under which two eigenvalues are considered equal.
const EIGENVALUE_TOLERANCE: f64 = 1e-9;

/// Which side of a neuron's connections to look at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Outgoing connections, the row sums of the connectivity matrix.
    #[default]
    Efferent,
    /// Incoming connections, the column sums of the connectivity matrix.
    Afferent,
    /// Outgoing and incoming connections combined.
    Both,
}

/// A directed, optionally weighted, connectivity matrix.
///
/// Neurons are indexed `0..size`. Rows are pre-synaptic and columns post-synaptic, so the entry
/// at `(i, j)` holds the weight of the connection from neuron `i` to neuron `j`. Neurons without
/// any connections still count towards the size of the connectome.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "ConnectomeRecord", into = "ConnectomeRecord")]
pub struct Connectome {
    /// The number of neurons.
    size: usize,
    /// The connections and their weights, sorted in row-major order.
    edges: BTreeMap<Edge, f64>,
    /// Cache the adjacency matrix when possible.
    adjacency_matrix: Option<DMatrix<f64>>,
    /// Cache the binary, symmetric adjacency matrix when possible.
    undirected_adjacency_matrix: Option<DMatrix<f64>>,
    /// Cache the degree matrix of the undirected view when possible.
    degree_matrix: Option<DMatrix<f64>>,
    /// Cache the laplacian matrix of the undirected view when possible.
    laplacian_matrix: Option<DMatrix<f64>>,
}

impl PartialEq for Connectome {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.edges == other.edges
    }
}

impl Connectome {
    /// Creates a connectome of `size` unconnected neurons.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::graph::Connectome;
    ///
    /// let connectome = Connectome::new(3);
    /// assert_eq!(connectome.vertex_count(), 3);
    /// assert_eq!(connectome.edge_count(), 0);
    /// ```
    pub fn new(size: usize) -> Self {
        Self {
            size,
            edges: Default::default(),
            adjacency_matrix: None,
            undirected_adjacency_matrix: None,
            degree_matrix: None,
            laplacian_matrix: None,
        }
    }

    /// Creates a binary connectome from a collection of connections.
    pub fn from_edges<I>(size: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = Edge>,
    {
        let mut connectome = Self::new(size);
        for edge in edges {
            connectome.insert(edge)?;
        }

        Ok(connectome)
    }

    /// Creates a weighted connectome from a collection of connections.
    pub fn from_weighted_edges<I>(size: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Edge, f64)>,
    {
        let mut connectome = Self::new(size);
        for (edge, weight) in edges {
            connectome.insert_weighted(edge, weight)?;
        }

        Ok(connectome)
    }

    /// Inserts a connection with unit weight, returns whether it is new.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let mut connectome = Connectome::new(2);
    ///
    /// assert_eq!(connectome.insert(Edge::new(0, 1)).unwrap(), true);
    /// assert_eq!(connectome.insert(Edge::new(0, 1)).unwrap(), false);
    /// assert!(connectome.insert(Edge::new(0, 2)).is_err());
    /// ```
    pub fn insert(&mut self, edge: Edge) -> Result<bool> {
        self.insert_weighted(edge, 1.0)
    }

    /// Inserts a connection with the given weight, returns whether it is new. The weight of an
    /// existing connection is overwritten.
    pub fn insert_weighted(&mut self, edge: Edge, weight: f64) -> Result<bool> {
        self.check_bounds(edge.source())?;
        self.check_bounds(edge.target())?;

        // A zero weight is the absence of a connection.
        if !weight.is_finite() || weight == 0.0 {
            return Err(Error::InvalidWeight(weight));
        }

        let previous = self.edges.insert(edge, weight);

        // Delete the cached objects if anything changed because we can't reliably update them from
        // the new connection alone.
        if previous != Some(weight) {
            self.clear_cache();
        }

        Ok(previous.is_none())
    }

    /// Removes a connection and returns whether it was present.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let mut connectome = Connectome::from_edges(3, [Edge::new(0, 1)]).unwrap();
    ///
    /// assert_eq!(connectome.remove(&Edge::new(0, 1)), true);
    /// assert_eq!(connectome.remove(&Edge::new(0, 2)), false);
    /// ```
    pub fn remove(&mut self, edge: &Edge) -> bool {
        let is_removed = self.edges.remove(edge).is_some();

        if is_removed {
            self.clear_cache()
        }

        is_removed
    }

    /// Checks if the connectome contains a connection.
    pub fn contains(&self, edge: &Edge) -> bool {
        self.edges.contains_key(edge)
    }

    /// Returns the weight of a connection, if present.
    pub fn weight(&self, edge: &Edge) -> Option<f64> {
        self.edges.get(edge).copied()
    }

    /// Iterates over the connections and their weights in row-major order.
    pub fn edges(&self) -> impl Iterator<Item = (Edge, f64)> + '_ {
        self.edges.iter().map(|(edge, weight)| (*edge, *weight))
    }

    /// Returns the number of neurons, connected or not.
    pub fn vertex_count(&self) -> usize {
        self.size
    }

    /// Returns the number of connections.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Computes the density of the connectome, the ratio of connections with respect to the
    /// maximum possible number of directed connections without autapses.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let mut connectome = Connectome::new(3);
    ///
    /// connectome.insert(Edge::new(0, 1)).unwrap();
    /// assert_eq!(connectome.density(), 1.0 / 6.0);
    ///
    /// connectome.insert(Edge::new(1, 0)).unwrap();
    /// assert_eq!(connectome.density(), 2.0 / 6.0);
    /// ```
    pub fn density(&self) -> f64 {
        let vc = self.vertex_count() as f64;
        let ec = self.edge_count() as f64;

        ec / (vc * (vc - 1.0))
    }

    /// Returns whether every connection has unit weight.
    pub fn is_binary(&self) -> bool {
        self.edges.values().all(|weight| *weight == 1.0)
    }

    /// Returns the weighted degree of every neuron.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::{Connectome, Direction};
    ///
    /// let connectome = Connectome::from_weighted_edges(
    ///     3,
    ///     [(Edge::new(0, 1), 2.0), (Edge::new(0, 2), 0.5)],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(connectome.degrees(Direction::Efferent), vec![2.5, 0.0, 0.0]);
    /// assert_eq!(connectome.degrees(Direction::Afferent), vec![0.0, 2.0, 0.5]);
    /// ```
    pub fn degrees(&self, direction: Direction) -> Vec<f64> {
        let mut degrees = vec![0.0; self.size];
        for (edge, weight) in &self.edges {
            if direction != Direction::Afferent {
                degrees[edge.source()] += weight;
            }
            if direction != Direction::Efferent {
                degrees[edge.target()] += weight;
            }
        }

        degrees
    }

    /// Returns the number of connections of every neuron, ignoring weights.
    pub fn binary_degrees(&self, direction: Direction) -> Vec<usize> {
        let mut degrees = vec![0; self.size];
        for edge in self.edges.keys() {
            if direction != Direction::Afferent {
                degrees[edge.source()] += 1;
            }
            if direction != Direction::Efferent {
                degrees[edge.target()] += 1;
            }
        }

        degrees
    }

    /// Returns the connectome induced by the selected neurons, relabelled in selection order.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let connectome =
    ///     Connectome::from_edges(3, [Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 0)]).unwrap();
    /// let sub = connectome.subgraph(&[2, 0]).unwrap();
    ///
    /// assert_eq!(sub.vertex_count(), 2);
    /// assert!(sub.contains(&Edge::new(0, 1)));
    /// assert_eq!(sub.edge_count(), 1);
    /// ```
    pub fn subgraph(&self, selection: &[usize]) -> Result<Self> {
        let mut relabel: Vec<Option<usize>> = vec![None; self.size];
        for (new, &old) in selection.iter().enumerate() {
            self.check_bounds(old)?;
            if relabel[old].replace(new).is_some() {
                return Err(Error::InvalidParameter(format!(
                    "neuron {old} is selected more than once"
                )));
            }
        }

        let mut sub = Self::new(selection.len());
        for (edge, weight) in &self.edges {
            if let (Some(i), Some(j)) = (relabel[edge.source()], relabel[edge.target()]) {
                sub.edges.insert(Edge::new(i, j), *weight);
            }
        }

        Ok(sub)
    }

    /// Constructs the (weighted, directed) adjacency matrix of the connectome.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::dmatrix;
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let mut connectome = Connectome::from_edges(2, [Edge::new(0, 1)]).unwrap();
    /// assert_eq!(
    ///     connectome.adjacency_matrix(),
    ///     dmatrix![0.0, 1.0;
    ///              0.0, 0.0]
    /// );
    /// ```
    pub fn adjacency_matrix(&mut self) -> DMatrix<f64> {
        // Check the cache.
        if let Some(matrix) = self.adjacency_matrix.clone() {
            return matrix;
        }

        let mut matrix = DMatrix::<f64>::zeros(self.size, self.size);
        for (edge, weight) in &self.edges {
            matrix[(edge.source(), edge.target())] = *weight;
        }

        // Cache the matrix.
        self.adjacency_matrix = Some(matrix.clone());

        matrix
    }

    /// Constructs the binary, symmetric adjacency matrix of the connectome with directions and
    /// weights dropped. Autapses are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::dmatrix;
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let mut connectome = Connectome::from_edges(2, [Edge::new(0, 1)]).unwrap();
    /// assert_eq!(
    ///     connectome.undirected_adjacency_matrix(),
    ///     dmatrix![0.0, 1.0;
    ///              1.0, 0.0]
    /// );
    /// ```
    pub fn undirected_adjacency_matrix(&mut self) -> DMatrix<f64> {
        // Check the cache.
        if let Some(matrix) = self.undirected_adjacency_matrix.clone() {
            return matrix;
        }

        let mut matrix = DMatrix::<f64>::zeros(self.size, self.size);
        for edge in self.edges.keys().filter(|edge| !edge.is_loop()) {
            // Both triangles are written so reciprocal connections collapse onto one entry.
            matrix[(edge.source(), edge.target())] = 1.0;
            matrix[(edge.target(), edge.source())] = 1.0;
        }

        // Cache the matrix.
        self.undirected_adjacency_matrix = Some(matrix.clone());

        matrix
    }

    /// Constructs the degree matrix of the undirected view of the connectome.
    pub fn degree_matrix(&mut self) -> DMatrix<f64> {
        // Check the cache.
        if let Some(matrix) = self.degree_matrix.clone() {
            return matrix;
        }

        let adjacency_matrix = self.undirected_adjacency_matrix();
        let mut matrix = DMatrix::<f64>::zeros(self.size, self.size);

        for (i, row) in adjacency_matrix.row_iter().enumerate() {
            matrix[(i, i)] = row.sum()
        }

        // Cache the matrix.
        self.degree_matrix = Some(matrix.clone());

        matrix
    }

    /// Constructs the laplacian matrix of the undirected view of the connectome.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::dmatrix;
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let mut connectome = Connectome::from_edges(3, [Edge::new(0, 1), Edge::new(2, 0)]).unwrap();
    /// assert_eq!(
    ///     connectome.laplacian_matrix(),
    ///     dmatrix![2.0, -1.0, -1.0;
    ///              -1.0, 1.0, 0.0;
    ///              -1.0, 0.0, 1.0]
    /// );
    /// ```
    pub fn laplacian_matrix(&mut self) -> DMatrix<f64> {
        // Check the cache.
        if let Some(matrix) = self.laplacian_matrix.clone() {
            return matrix;
        }

        let degree_matrix = self.degree_matrix();
        let adjacency_matrix = self.undirected_adjacency_matrix();

        let matrix = degree_matrix.sub(&adjacency_matrix);

        // Cache the matrix.
        self.laplacian_matrix = Some(matrix.clone());

        matrix
    }

    /// Returns the difference between the highest and lowest degree in the undirected view of the
    /// connectome.
    pub fn degree_centrality_delta(&mut self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }

        let degree_matrix = self.degree_matrix();

        let max = degree_matrix.diagonal().max();
        let min = degree_matrix.diagonal().min();

        max - min
    }

    /// Returns the eigenvector centrality (the relative importance) of every neuron in the
    /// undirected view of the connectome, scaled so the values average to 1.
    ///
    /// When the leading eigenvalue is shared, as with identical disconnected components, every
    /// neuron gets the norm of its components across the whole leading eigenspace so no component
    /// is favoured.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let mut connectome = Connectome::from_edges(4, [Edge::new(0, 1), Edge::new(2, 3)]).unwrap();
    /// let centrality = connectome.eigenvector_centrality();
    ///
    /// assert!(centrality.iter().all(|c| (c - 1.0).abs() < 1e-9));
    /// ```
    pub fn eigenvector_centrality(&mut self) -> Vec<f64> {
        let adjacency_matrix = self.undirected_adjacency_matrix();

        // Autapses aside, there is nothing to rank.
        if adjacency_matrix.iter().all(|value| *value == 0.0) {
            return vec![0.0; self.size];
        }

        // Compute the eigenvectors and corresponding eigenvalues and sort in descending order.
        let ascending = false;
        let pairs = sorted_eigenvalue_vector_pairs(adjacency_matrix, ascending);
        let highest_eigenvalue = pairs[0].0;
        let tolerance = EIGENVALUE_TOLERANCE * highest_eigenvalue.abs().max(1.0);

        // The per-neuron norm over the leading eigenspace doesn't depend on the basis the solver
        // picked, and is the absolute eigenvector when the eigenvalue is simple.
        let mut squares = DVector::<f64>::zeros(self.size);
        for (_, eigenvector) in pairs
            .iter()
            .take_while(|(value, _)| highest_eigenvalue - value <= tolerance)
        {
            squares += eigenvector.component_mul(eigenvector);
        }
        let centrality = squares.map(f64::sqrt);

        // The eigenvector is only defined up to scale, normalising by its mean makes the scores
        // absolute.
        let mean = centrality.sum() / self.size as f64;

        centrality.unscale(mean).iter().copied().collect()
    }

    /// Returns the algebraic connectivity (Fiedler eigenvalue) of the undirected view of the
    /// connectome and every neuron's component in the associated Fiedler eigenvector.
    pub fn fiedler(&mut self) -> (f64, Vec<f64>) {
        // The second-smallest eigenvalue requires at least two neurons.
        if self.size < 2 {
            return (0.0, vec![]);
        }

        let laplacian_matrix = self.laplacian_matrix();

        let ascending = true;
        let pairs = sorted_eigenvalue_vector_pairs(laplacian_matrix, ascending);
        let (algebraic_connectivity, fiedler_vector) = &pairs[1];

        (
            *algebraic_connectivity,
            fiedler_vector.iter().copied().collect(),
        )
    }

    /// Computes the betweenness centrality of every neuron along directed shortest paths, spread
    /// over `num_threads` workers. When `normalize` is set, values are divided by the number of
    /// ordered pairs of other neurons, `(n - 1)(n - 2)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    /// use connalysis::graph::Connectome;
    ///
    /// let connectome =
    ///     Connectome::from_edges(3, [Edge::new(0, 1), Edge::new(1, 2)]).unwrap();
    ///
    /// assert_eq!(connectome.betweenness_centrality(2, false).unwrap(), vec![0.0, 1.0, 0.0]);
    /// ```
    pub fn betweenness_centrality(&self, num_threads: usize, normalize: bool) -> Result<Vec<f64>> {
        compute_betweenness(self.adjacency_lists(), num_threads, normalize)
    }

    /// Computes the closeness centrality of every neuron along outgoing connections: the number of
    /// reachable neurons divided by the sum of their distances, or 0 if none are reachable.
    pub fn closeness_centrality(&self, num_threads: usize) -> Result<Vec<f64>> {
        compute_closeness(self.adjacency_lists(), num_threads)
    }

    //
    // Crate
    //

    /// Returns the post-synaptic partners of every neuron, in ascending order.
    pub(crate) fn adjacency_lists(&self) -> Vec<Vec<usize>> {
        let mut lists = vec![Vec::new(); self.size];
        for edge in self.edges.keys() {
            lists[edge.source()].push(edge.target());
        }

        lists
    }

    /// Inserts a unit connection whose bounds are already known to be valid.
    pub(crate) fn insert_unchecked(&mut self, edge: Edge) {
        debug_assert!(edge.source() < self.size && edge.target() < self.size);

        self.edges.insert(edge, 1.0);
        self.clear_cache();
    }

    //
    // Private
    //

    /// Clears the computed state.
    ///
    /// This should be called every time the set of connections is mutated since the cached state
    /// won't correspond to the new connectome.
    fn clear_cache(&mut self) {
        self.adjacency_matrix = None;
        self.undirected_adjacency_matrix = None;
        self.degree_matrix = None;
        self.laplacian_matrix = None;
    }

    fn check_bounds(&self, vertex: usize) -> Result<()> {
        if vertex < self.size {
            Ok(())
        } else {
            Err(Error::VertexOutOfBounds {
                vertex,
                size: self.size,
            })
        }
    }
}

//
// Serialization
//

/// The on-disk shape of a connectome: its size and a list of `[source, target, weight]` triples.
#[derive(Serialize, Deserialize)]
struct ConnectomeRecord {
    size: usize,
    edges: Vec<(usize, usize, f64)>,
}

impl TryFrom<ConnectomeRecord> for Connectome {
    type Error = Error;

    fn try_from(record: ConnectomeRecord) -> Result<Self> {
        Connectome::from_weighted_edges(
            record.size,
            record
                .edges
                .into_iter()
                .map(|(source, target, weight)| (Edge::new(source, target), weight)),
        )
    }
}

impl From<Connectome> for ConnectomeRecord {
    fn from(connectome: Connectome) -> Self {
        Self {
            size: connectome.size,
            edges: connectome
                .edges()
                .map(|(edge, weight)| (edge.source(), edge.target(), weight))
                .collect(),
        }
    }
}

//
// Helpers
//

/// Computes the eigenvalues and corresponding eigenvectors of the supplied symmetric matrix.
fn sorted_eigenvalue_vector_pairs(
    matrix: DMatrix<f64>,
    ascending: bool,
) -> Vec<(f64, DVector<f64>)> {
    // Early return if the matrix is empty, the rest of the computation requires a matrix with
    // at least a dim of 1x1.
    if matrix.is_empty() {
        return vec![];
    }

    let eigen = SymmetricEigen::new(matrix);

    // Map eigenvalues to their eigenvectors.
    let mut pairs: Vec<(f64, DVector<f64>)> = eigen
        .eigenvalues
        .iter()
        .zip(eigen.eigenvectors.column_iter())
        .map(|(value, vector)| (*value, vector.clone_owned()))
        .collect();

    pairs.sort_unstable_by(|(a, _), (b, _)| {
        if ascending {
            a.total_cmp(b)
        } else {
            b.total_cmp(a)
        }
    });

    pairs
}

#[cfg(test)]
mod tests {
    use nalgebra::dmatrix;

    use super::*;

    macro_rules! connectome {
          ($size:expr; $($path:expr),*) => {{
              let mut connectome = Connectome::new($size);

              $(
                  let mut iter = $path.into_iter().peekable();
                  while let (Some(a), Some(b)) = (iter.next(), iter.peek()) {
                      connectome.insert(Edge::new(a, *b)).unwrap();
                  }
              )*

              connectome
          }}
      }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn new() {
        let connectome = Connectome::new(4);

        assert_eq!(connectome.vertex_count(), 4);
        assert_eq!(connectome.edge_count(), 0);
    }

    #[test]
    fn insert() {
        let mut connectome = Connectome::new(2);
        let edge = Edge::new(0, 1);

        assert!(connectome.insert(edge).unwrap());
        assert!(!connectome.insert(edge).unwrap());
        assert!(connectome.insert(edge.reversed()).unwrap());
        assert_eq!(connectome.edge_count(), 2);
    }

    #[test]
    fn insert_out_of_bounds() {
        let mut connectome = Connectome::new(2);

        assert!(matches!(
            connectome.insert(Edge::new(0, 2)),
            Err(Error::VertexOutOfBounds { vertex: 2, size: 2 })
        ));
    }

    #[test]
    fn insert_invalid_weight() {
        let mut connectome = Connectome::new(2);

        assert!(connectome.insert_weighted(Edge::new(0, 1), 0.0).is_err());
        assert!(connectome.insert_weighted(Edge::new(0, 1), f64::NAN).is_err());
        assert_eq!(connectome.edge_count(), 0);
    }

    #[test]
    fn insert_weighted_overwrites() {
        let mut connectome = Connectome::new(2);
        let edge = Edge::new(0, 1);

        assert!(connectome.insert_weighted(edge, 2.0).unwrap());
        assert!(!connectome.insert_weighted(edge, 3.0).unwrap());
        assert_eq!(connectome.weight(&edge), Some(3.0));
        assert!(!connectome.is_binary());
    }

    #[test]
    fn remove() {
        let edge = Edge::new(0, 1);
        let mut connectome = Connectome::from_edges(3, [edge]).unwrap();

        assert!(connectome.remove(&edge));
        assert!(!connectome.remove(&Edge::new(0, 2)));
    }

    #[test]
    fn density() {
        let connectome = Connectome::new(1);
        assert!(connectome.density().is_nan());

        let mut connectome = connectome!(2; [0, 1]);
        assert_eq!(connectome.density(), 0.5);

        connectome.insert(Edge::new(1, 0)).unwrap();
        assert_eq!(connectome.density(), 1.0);
    }

    #[test]
    fn degrees() {
        let connectome = connectome!(4; [0, 1, 2], [0, 2]);

        assert_eq!(connectome.binary_degrees(Direction::Efferent), vec![2, 1, 0, 0]);
        assert_eq!(connectome.binary_degrees(Direction::Afferent), vec![0, 1, 2, 0]);
        assert_eq!(connectome.binary_degrees(Direction::Both), vec![2, 2, 2, 0]);
        assert_eq!(connectome.degrees(Direction::Both), vec![2.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn subgraph() {
        let connectome = connectome!(4; [0, 1, 2, 3, 0]);
        let sub = connectome.subgraph(&[1, 2, 3]).unwrap();

        assert_eq!(sub.vertex_count(), 3);
        assert!(sub.contains(&Edge::new(0, 1)));
        assert!(sub.contains(&Edge::new(1, 2)));
        assert_eq!(sub.edge_count(), 2);
    }

    #[test]
    fn subgraph_rejects_duplicates() {
        let connectome = connectome!(3; [0, 1]);

        assert!(matches!(
            connectome.subgraph(&[0, 0]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(connectome.subgraph(&[0, 3]).is_err());
    }

    #[test]
    fn adjacency_matrix() {
        let mut connectome = Connectome::new(0);
        assert_eq!(connectome.adjacency_matrix(), dmatrix![]);

        let mut connectome = Connectome::new(3);
        connectome.insert_weighted(Edge::new(0, 1), 2.0).unwrap();
        connectome.insert(Edge::new(2, 0)).unwrap();
        assert_eq!(
            connectome.adjacency_matrix(),
            dmatrix![0.0, 2.0, 0.0;
                     0.0, 0.0, 0.0;
                     1.0, 0.0, 0.0]
        );

        // Sanity check the matrix gets stored.
        assert!(connectome.adjacency_matrix.is_some());
    }

    #[test]
    fn undirected_adjacency_matrix_collapses_reciprocal_connections() {
        let mut connectome = connectome!(2; [0, 1, 0]);

        assert_eq!(
            connectome.undirected_adjacency_matrix(),
            dmatrix![0.0, 1.0;
                     1.0, 0.0]
        );
        assert_eq!(
            connectome.degree_matrix(),
            dmatrix![1.0, 0.0;
                     0.0, 1.0]
        );
    }

    #[test]
    fn degree_centrality_delta() {
        let mut connectome = Connectome::new(0);
        assert_eq!(connectome.degree_centrality_delta(), 0.0);

        let mut connectome = connectome!(3; [0, 1]);
        assert_eq!(connectome.degree_centrality_delta(), 1.0);

        connectome.insert(Edge::new(0, 2)).unwrap();
        assert_eq!(connectome.degree_centrality_delta(), 1.0);

        connectome.insert(Edge::new(1, 2)).unwrap();
        assert_eq!(connectome.degree_centrality_delta(), 0.0);
    }

    #[test]
    fn eigenvector_centrality() {
        let mut connectome = Connectome::new(2);
        assert_eq!(connectome.eigenvector_centrality(), vec![0.0, 0.0]);

        connectome.insert(Edge::new(0, 1)).unwrap();
        let centrality = connectome.eigenvector_centrality();
        assert_close(centrality[0], 1.0);
        assert_close(centrality[1], 1.0);

        let mut connectome = connectome!(3; [0, 1], [2, 0]);
        let centrality = connectome.eigenvector_centrality();
        assert_close(centrality[0], 1.2426406871192854);
        assert_close(centrality[1], 0.8786796564403571);
        assert_close(centrality[2], 0.8786796564403571);
    }

    #[test]
    fn eigenvector_centrality_of_identical_components() {
        let mut connectome = connectome!(6; [0, 1], [2, 3], [4, 5]);
        let centrality = connectome.eigenvector_centrality();

        for value in centrality {
            assert_close(value, 1.0);
        }

        // A larger component dominates, the others get nothing.
        let mut connectome = connectome!(5; [0, 1], [2, 3], [2, 4]);
        let centrality = connectome.eigenvector_centrality();

        assert_close(centrality[0], 0.0);
        assert_close(centrality[1], 0.0);
        assert_close(centrality[3], centrality[4]);
        assert_close(centrality[2], 2.0f64.sqrt() * centrality[3]);
    }

    #[test]
    fn fiedler() {
        // Disconnected.
        let mut connectome = connectome!(4; [0, 1], [2, 3]);
        let (algebraic_connectivity, _) = connectome.fiedler();
        assert_close(algebraic_connectivity, 0.0);

        // Connect the halves into a path.
        connectome.insert(Edge::new(1, 2)).unwrap();
        let (algebraic_connectivity, fiedler_vector) = connectome.fiedler();
        assert_close(algebraic_connectivity, 2.0 - 2.0f64.sqrt());

        // The path splits in the middle, the sign of the vector is arbitrary.
        assert_close(fiedler_vector[0].abs(), 0.6532814824381882);
        assert_close(fiedler_vector[1].abs(), 0.27059805007309845);
        assert!(fiedler_vector[0] * fiedler_vector[3] < 0.0);
        assert!(fiedler_vector[0] * fiedler_vector[1] > 0.0);
    }

    #[test]
    fn fiedler_single_neuron() {
        let mut connectome = Connectome::new(1);

        assert_eq!(connectome.fiedler(), (0.0, vec![]));
    }

    #[test]
    fn betweenness() {
        let connectome = connectome!(4; [0, 1, 2, 3]);

        assert_eq!(
            connectome.betweenness_centrality(2, false).unwrap(),
            vec![0.0, 2.0, 2.0, 0.0]
        );

        let normalized = connectome.betweenness_centrality(3, true).unwrap();
        assert_close(normalized[1], 1.0 / 3.0);
        assert_close(normalized[2], 1.0 / 3.0);
    }

    #[test]
    fn betweenness_splits_between_shortest_paths() {
        // Two shortest paths from 0 to 3, through 1 and through 2.
        let connectome = connectome!(4; [0, 1, 3], [0, 2, 3]);

        assert_eq!(
            connectome.betweenness_centrality(1, false).unwrap(),
            vec![0.0, 0.5, 0.5, 0.0]
        );
    }

    #[test]
    fn closeness() {
        let connectome = connectome!(4; [0, 1, 2, 3]);
        let closeness = connectome.closeness_centrality(2).unwrap();

        assert_close(closeness[0], 0.5);
        assert_close(closeness[1], 2.0 / 3.0);
        assert_close(closeness[2], 1.0);
        assert_close(closeness[3], 0.0);
    }

    #[test]
    fn serde_round_trip_validates() {
        let connectome = connectome!(3; [0, 1, 2]);
        let json = serde_json::to_string(&connectome).unwrap();

        assert_eq!(json, r#"{"size":3,"edges":[[0,1,1.0],[1,2,1.0]]}"#);
        assert_eq!(
            serde_json::from_str::<Connectome>(&json).unwrap(),
            connectome
        );

        let invalid = r#"{"size":2,"edges":[[0,5,1.0]]}"#;
        assert!(serde_json::from_str::<Connectome>(invalid).is_err());
    }

    //
    // Private
    //

    #[test]
    fn clear_cache_on_insert() {
        let mut connectome = connectome!(3; [0, 1]);

        // The laplacian requires the computation of the undirected adjacency and degree matrices.
        connectome.laplacian_matrix();
        connectome.adjacency_matrix();

        assert!(connectome.adjacency_matrix.is_some());
        assert!(connectome.undirected_adjacency_matrix.is_some());
        assert!(connectome.degree_matrix.is_some());
        assert!(connectome.laplacian_matrix.is_some());

        connectome.insert(Edge::new(0, 2)).unwrap();

        assert!(connectome.adjacency_matrix.is_none());
        assert!(connectome.undirected_adjacency_matrix.is_none());
        assert!(connectome.degree_matrix.is_none());
        assert!(connectome.laplacian_matrix.is_none());
    }

    #[test]
    fn keep_cache_on_noop_insert() {
        let mut connectome = connectome!(3; [0, 1]);
        connectome.adjacency_matrix();

        connectome.insert(Edge::new(0, 1)).unwrap();

        assert!(connectome.adjacency_matrix.is_some());
    }

    #[test]
    fn clear_cache_on_remove() {
        let edge = Edge::new(0, 1);
        let mut connectome = connectome!(2; [0, 1]);
        connectome.laplacian_matrix();

        connectome.remove(&edge);

        assert!(connectome.undirected_adjacency_matrix.is_none());
        assert!(connectome.degree_matrix.is_none());
        assert!(connectome.laplacian_matrix.is_none());
    }
}
