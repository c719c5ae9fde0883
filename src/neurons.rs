//! Per-neuron properties used alongside a connectome.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A neuron's position (in micrometers) and, optionally, its cortical depth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

impl Neuron {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, depth: None }
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// The neurons of a connectome, in the same order as its rows and columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeuronTable {
    neurons: Vec<Neuron>,
}

impl NeuronTable {
    pub fn new(neurons: Vec<Neuron>) -> Self {
        Self { neurons }
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.neurons.iter().map(Neuron::position).collect()
    }

    /// Returns every neuron's depth, failing on the first neuron without one.
    ///
    /// # Examples
    ///
    /// ```
    /// use connalysis::neurons::{Neuron, NeuronTable};
    ///
    /// let table = NeuronTable::new(vec![
    ///     Neuron::new(0.0, 0.0, 0.0).with_depth(100.0),
    ///     Neuron::new(1.0, 0.0, 0.0),
    /// ]);
    ///
    /// assert!(table.depths().is_err());
    /// assert_eq!(table.select(&[0]).unwrap().depths().unwrap(), vec![100.0]);
    /// ```
    pub fn depths(&self) -> Result<Vec<f64>> {
        self.neurons
            .iter()
            .enumerate()
            .map(|(i, neuron)| neuron.depth.ok_or(Error::MissingDepth(i)))
            .collect()
    }

    /// Returns the table restricted to the selected neurons, in selection order.
    pub fn select(&self, selection: &[usize]) -> Result<Self> {
        selection
            .iter()
            .map(|&i| {
                self.neurons
                    .get(i)
                    .copied()
                    .ok_or(Error::VertexOutOfBounds {
                        vertex: i,
                        size: self.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }
}

impl FromIterator<Neuron> for NeuronTable {
    fn from_iter<I: IntoIterator<Item = Neuron>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_records() {
        let json = r#"[{"x": 1.0, "y": 2.0, "z": 3.0, "depth": 50.0}, {"x": 0, "y": 0, "z": 0}]"#;
        let table: NeuronTable = serde_json::from_str(json).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.positions()[0], [1.0, 2.0, 3.0]);
        assert_eq!(table.neurons()[0].depth, Some(50.0));
        assert!(matches!(table.depths(), Err(Error::MissingDepth(1))));
    }

    #[test]
    fn select_out_of_bounds() {
        let table: NeuronTable = (0..3).map(|i| Neuron::new(i as f64, 0.0, 0.0)).collect();

        assert_eq!(table.select(&[2, 0]).unwrap().positions()[0], [2.0, 0.0, 0.0]);
        assert!(table.select(&[3]).is_err());
    }
}
