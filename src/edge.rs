//! A module for working with connections.

use serde::{Deserialize, Serialize};

/// A directed connection between two neurons, from the pre-synaptic `source` to the post-synaptic
/// `target`. Neurons are identified by their row/column index in the connectome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    source: usize,
    target: usize,
}

impl Edge {
    /// Creates a new connection from two neuron indices.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    ///
    /// let edge = Edge::new(0, 1);
    /// assert_ne!(edge, Edge::new(1, 0));
    /// ```
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }

    /// Returns the pre-synaptic neuron.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    ///
    /// let edge = Edge::new(0, 1);
    /// assert_eq!(edge.source(), 0);
    /// ```
    pub fn source(&self) -> usize {
        self.source
    }

    /// Returns the post-synaptic neuron.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    ///
    /// let edge = Edge::new(0, 1);
    /// assert_eq!(edge.target(), 1);
    /// ```
    pub fn target(&self) -> usize {
        self.target
    }

    /// Returns whether the connection starts or ends at the given neuron.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::edge::Edge;
    ///
    /// let edge = Edge::new(0, 1);
    ///
    /// assert_eq!(edge.contains(0), true);
    /// assert_eq!(edge.contains(1), true);
    /// assert_eq!(edge.contains(2), false);
    /// ```
    pub fn contains(&self, vertex: usize) -> bool {
        self.source == vertex || self.target == vertex
    }

    /// Returns the same connection pointing the other way.
    pub fn reversed(&self) -> Self {
        Self::new(self.target, self.source)
    }

    /// Autapses connect a neuron to itself.
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}
