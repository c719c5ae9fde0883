//! Building simple models of connectivity from a connectome and the positions of its neurons.
//!
//! Model building extracts the connection probability of pairs of neurons binned by their
//! distance (2nd order) or by their distance and relative depth (3rd order), then fits an
//! exponential decay to it.
//!
//! # Examples
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use connalysis::edge::Edge;
//! use connalysis::graph::Connectome;
//! use connalysis::modelling::{run_model_building, ModelBuildingConfig, ModelOrder};
//! use connalysis::neurons::{Neuron, NeuronTable};
//!
//! // Neurons on a line, each connected to its two successors.
//! let neurons: NeuronTable = (0..10).map(|i| Neuron::new(i as f64 * 50.0, 0.0, 0.0)).collect();
//! let edges = (0..10).flat_map(|i| [(i, i + 1), (i, i + 2)]).filter(|(_, j)| *j < 10);
//! let connectome = Connectome::from_edges(10, edges.map(|(i, j)| Edge::new(i, j))).unwrap();
//!
//! let config = ModelBuildingConfig {
//!     bin_size_um: 100.0,
//!     ..Default::default()
//! };
//! let mut rng = StdRng::seed_from_u64(0);
//!
//! let (_data, model) =
//!     run_model_building(&connectome, &neurons, "line", ModelOrder::Second, &config, &mut rng)
//!         .unwrap();
//!
//! // Close pairs are more likely to be connected than distant ones.
//! assert!(model.probability(50.0, 0.0) > model.probability(400.0, 0.0));
//! ```

mod config;
mod extract;
mod fit;
mod model;

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use self::{
    config::ModelBuildingConfig,
    extract::{
        compute_bip_matrix, compute_dist_matrix, extract_2nd_order, extract_3rd_order,
        extract_dependent_p_conn, BinnedCounts, BipolarDistanceData, DistanceDependentData,
    },
    model::{build_2nd_order, build_3rd_order, ConnectionModel},
};
use crate::{
    error::{Error, Result},
    graph::Connectome,
    neurons::NeuronTable,
};

/// The order of a connectivity model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelOrder {
    /// Distance dependent.
    Second,
    /// Bipolar distance dependent.
    Third,
}

impl TryFrom<u8> for ModelOrder {
    type Error = Error;

    fn try_from(order: u8) -> Result<Self> {
        match order {
            2 => Ok(Self::Second),
            3 => Ok(Self::Third),
            _ => Err(Error::InvalidParameter(format!(
                "order-{order} model building is not supported"
            ))),
        }
    }
}

/// The connection probabilities a model was fitted to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelData {
    SecondOrder(DistanceDependentData),
    ThirdOrder(BipolarDistanceData),
}

/// Extracts connection probabilities and fits a model of the given order.
///
/// When `sample_size` is configured and smaller than the number of neurons, the model is built on
/// a random subset of that many neurons. The subset is drawn from `sample_seed` if set, from
/// `rng` otherwise. The data and the model are written to `data_dir` and `model_dir`, if set, as
/// `<name>__data.json` and `<name>__model.json`.
pub fn run_model_building<R>(
    m: &Connectome,
    neurons: &NeuronTable,
    name: &str,
    order: ModelOrder,
    config: &ModelBuildingConfig,
    rng: &mut R,
) -> Result<(ModelData, ConnectionModel)>
where
    R: Rng + ?Sized,
{
    config.validate()?;
    info!(name, ?order, ?config, "running model building");

    let n = neurons.len();
    let subsample = match config.sample_size {
        Some(size) if size > 0 && size < n => {
            info!(size, n, "subsampling neurons");

            let mut selection = match config.sample_seed {
                Some(seed) => index::sample(&mut StdRng::seed_from_u64(seed), n, size),
                None => index::sample(rng, n, size),
            }
            .into_vec();
            selection.sort_unstable();

            Some((m.subgraph(&selection)?, neurons.select(&selection)?))
        }
        _ => None,
    };
    let (m, neurons) = match &subsample {
        Some((m, neurons)) => (m, neurons),
        None => (m, neurons),
    };

    let (data, model) = match order {
        ModelOrder::Second => {
            let data = extract_2nd_order(m, neurons, config)?;
            let model = build_2nd_order(&data)?;
            (ModelData::SecondOrder(data), model)
        }
        ModelOrder::Third => {
            let data = extract_3rd_order(m, neurons, config)?;
            let model = build_3rd_order(&data)?;
            (ModelData::ThirdOrder(data), model)
        }
    };

    save_data(&data, config.data_dir.as_deref(), name, "data")?;
    save_data(&model, config.model_dir.as_deref(), name, "model")?;

    Ok((data, model))
}

/// Writes `value` as pretty printed JSON to `<dir>/<name>__<spec>.json`, or `<dir>/<name>.json`
/// when `spec` is empty, creating `dir` if needed. Nothing is written without a directory.
/// Returns the path of the written file.
pub fn save_data<T>(value: &T, dir: Option<&Path>, name: &str, spec: &str) -> Result<Option<PathBuf>>
where
    T: Serialize + ?Sized,
{
    let Some(dir) = dir else {
        return Ok(None);
    };

    fs::create_dir_all(dir)?;

    let file_name = if spec.is_empty() {
        format!("{name}.json")
    } else {
        format!("{name}__{spec}.json")
    };
    let path = dir.join(file_name);

    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    info!(path = %path.display(), "written");

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{edge::Edge, neurons::Neuron};

    /// Neurons on a grid, connected with a probability decaying with distance.
    fn spatial_network(rng: &mut StdRng) -> (Connectome, NeuronTable) {
        let neurons: NeuronTable = (0..64)
            .map(|i| {
                let (x, y) = ((i % 8) as f64 * 40.0, (i / 8) as f64 * 40.0);
                Neuron::new(x, y, 0.0).with_depth(y)
            })
            .collect();
        let positions = neurons.positions();
        let distances = compute_dist_matrix(&positions, &positions);

        let mut connectome = Connectome::new(neurons.len());
        for ((i, j), d) in distances.iter().enumerate().map(|(k, d)| ((k % 64, k / 64), d)) {
            if d.is_finite() && rng.random::<f64>() < 0.8 * (-0.01 * d).exp() {
                connectome.insert(Edge::new(i, j)).unwrap();
            }
        }

        (connectome, neurons)
    }

    #[test]
    fn model_order_from_u8() {
        assert_eq!(ModelOrder::try_from(2).unwrap(), ModelOrder::Second);
        assert_eq!(ModelOrder::try_from(3).unwrap(), ModelOrder::Third);
        assert!(matches!(
            ModelOrder::try_from(4),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn second_order_model_decays() {
        let mut rng = StdRng::seed_from_u64(1);
        let (connectome, neurons) = spatial_network(&mut rng);

        let (data, model) = run_model_building(
            &connectome,
            &neurons,
            "grid",
            ModelOrder::Second,
            &ModelBuildingConfig {
                bin_size_um: 40.0,
                ..Default::default()
            },
            &mut rng,
        )
        .unwrap();

        assert!(matches!(data, ModelData::SecondOrder(_)));
        let ConnectionModel::DistanceDependent { a, b } = model else {
            panic!("expected a distance dependent model");
        };
        assert!(a > 0.0);
        assert!(b > 0.0);
    }

    #[test]
    fn third_order_writes_files() {
        let mut rng = StdRng::seed_from_u64(2);
        let (connectome, neurons) = spatial_network(&mut rng);
        let dir = tempfile::tempdir().unwrap();

        let config = ModelBuildingConfig {
            bin_size_um: 40.0,
            data_dir: Some(dir.path().join("data")),
            model_dir: Some(dir.path().join("models")),
            ..Default::default()
        };
        let (data, model) = run_model_building(
            &connectome,
            &neurons,
            "grid",
            ModelOrder::Third,
            &config,
            &mut rng,
        )
        .unwrap();

        assert_eq!(model.input_count(), 2);

        let written = fs::read_to_string(dir.path().join("models/grid__model.json")).unwrap();
        assert_eq!(serde_json::from_str::<ConnectionModel>(&written).unwrap(), model);

        let written = fs::read_to_string(dir.path().join("data/grid__data.json")).unwrap();
        let ModelData::ThirdOrder(data) = data else {
            panic!("expected bipolar data");
        };
        assert_eq!(serde_json::from_str::<BipolarDistanceData>(&written).unwrap(), data);
    }

    #[test]
    fn seeded_subsampling_is_reproducible() {
        let mut rng = StdRng::seed_from_u64(3);
        let (connectome, neurons) = spatial_network(&mut rng);
        let config = ModelBuildingConfig {
            bin_size_um: 40.0,
            sample_size: Some(40),
            sample_seed: Some(17),
            ..Default::default()
        };

        let (first, _) = run_model_building(
            &connectome,
            &neurons,
            "a",
            ModelOrder::Second,
            &config,
            &mut rng,
        )
        .unwrap();
        let (second, _) = run_model_building(
            &connectome,
            &neurons,
            "b",
            ModelOrder::Second,
            &config,
            &mut rng,
        )
        .unwrap();

        assert_eq!(first, second);
        let ModelData::SecondOrder(data) = first else {
            panic!("expected distance dependent data");
        };
        // 40 neurons form 40 * 39 ordered pairs.
        assert_eq!(data.count_all.iter().sum::<f64>(), 1560.0);
    }

    #[test]
    fn save_without_directory() {
        assert_eq!(save_data(&1, None, "unused", "data").unwrap(), None);
    }

    #[test]
    fn save_without_spec() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");

        let path = save_data(&[1.0, 2.0], Some(&nested), "values", "").unwrap();

        assert_eq!(path, Some(nested.join("values.json")));
        let written = fs::read_to_string(nested.join("values.json")).unwrap();
        assert_eq!(serde_json::from_str::<Vec<f64>>(&written).unwrap(), vec![1.0, 2.0]);
    }
}
