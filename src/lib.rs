//! Connalysis is a small toolkit for analysing connectomes, the directed and possibly weighted
//! graphs of connections between neurons.
//!
//! # Basic usage
//!
//! The library is centered around the [`Connectome`](graph::Connectome) structure which can be
//! constructed from one or more [`Edge`](edge::Edge) instances. Once constructed, degree
//! statistics ([`degree`]), null models ([`randomization`]) and connectivity models
//! ([`modelling`]) can be computed from it.
//!
//! ```rust
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! use connalysis::degree::{self, Normalization, RichClubOptions};
//! use connalysis::edge::Edge;
//! use connalysis::graph::{Connectome, Direction};
//!
//! // Four neurons projecting onto a hub.
//! let connectome = Connectome::from_edges(
//!     5,
//!     [Edge::new(1, 0), Edge::new(2, 0), Edge::new(3, 0), Edge::new(4, 0), Edge::new(0, 1)],
//! )
//! .unwrap();
//!
//! // Inputs are concentrated on a single neuron.
//! let gini = degree::gini_coefficient(&connectome, Direction::Afferent).unwrap();
//! assert!(gini > 0.5);
//!
//! // Rich-club curves are returned as points, normalized against shuffled controls.
//! let mut rng = StdRng::seed_from_u64(0);
//! let curve = degree::rich_club_curve(&connectome, Direction::Efferent).unwrap();
//! assert_eq!(curve.x(), &[1.0]);
//!
//! // Every control keeps the five connections among the same five neurons.
//! let options = RichClubOptions {
//!     normalization: Normalization::Mean,
//!     ..Default::default()
//! };
//! let normalized = degree::normalized_rich_club_curve(&connectome, &options, &mut rng).unwrap();
//! assert_eq!(normalized.x(), &[1.0]);
//! assert_eq!(normalized.y(), &[1.0]);
//!
//! // Matrices can be pretty printed.
//! let mut connectome = connectome;
//! println!("{}", connectome.adjacency_matrix());
//! ```

mod betweenness;
mod closeness;
pub mod curve;
pub mod degree;
pub mod edge;
pub mod error;
pub mod graph;
pub mod modelling;
pub mod neurons;
pub mod randomization;
mod stats;

pub use error::{Error, Result};
