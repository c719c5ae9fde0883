use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings for building connectivity models.
///
/// Every field has a default, so a configuration file only needs to list what it changes:
///
/// ```
/// use connalysis::modelling::ModelBuildingConfig;
///
/// let config: ModelBuildingConfig = serde_json::from_str(r#"{"bin_size_um": 50.0}"#).unwrap();
///
/// assert_eq!(config.bin_size_um, 50.0);
/// assert_eq!(config.n_split, 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelBuildingConfig {
    /// Width of the distance bins, in micrometers.
    pub bin_size_um: f64,
    /// Largest distance taken into account, the largest observed distance when unset. Required
    /// when the extraction is split.
    pub max_range_um: Option<f64>,
    /// Number of row chunks the pairwise matrices are computed in, trading speed for memory.
    pub n_split: usize,
    /// Build the model on a random subset of this many neurons.
    pub sample_size: Option<usize>,
    /// Seed of the subset selection.
    pub sample_seed: Option<u64>,
    /// Directory the extracted data is written to.
    pub data_dir: Option<PathBuf>,
    /// Directory the fitted model is written to.
    pub model_dir: Option<PathBuf>,
}

impl Default for ModelBuildingConfig {
    fn default() -> Self {
        Self {
            bin_size_um: 100.0,
            max_range_um: None,
            n_split: 1,
            sample_size: None,
            sample_seed: None,
            data_dir: None,
            model_dir: None,
        }
    }
}

impl ModelBuildingConfig {
    /// Reads a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.bin_size_um.is_finite() && self.bin_size_um > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "bin size must be positive, got {}",
                self.bin_size_um
            )));
        }

        if let Some(max_range) = self.max_range_um {
            if !(max_range.is_finite() && max_range > 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "max range must be positive, got {max_range}"
                )));
            }
        }

        if self.n_split == 0 {
            return Err(Error::InvalidParameter(
                "number of data splits must be larger than 0".to_string(),
            ));
        }

        if self.n_split > 1 && self.max_range_um.is_none() {
            return Err(Error::InvalidParameter(
                "max range must be specified if the data is split".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let config = ModelBuildingConfig::default();

        assert_eq!(config.bin_size_um, 100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn split_requires_max_range() {
        let config = ModelBuildingConfig {
            n_split: 4,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));

        let config = ModelBuildingConfig {
            n_split: 4,
            max_range_um: Some(500.0),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_values() {
        for config in [
            ModelBuildingConfig {
                bin_size_um: 0.0,
                ..Default::default()
            },
            ModelBuildingConfig {
                max_range_um: Some(-1.0),
                ..Default::default()
            },
            ModelBuildingConfig {
                n_split: 0,
                ..Default::default()
            },
        ] {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_range_um": 300.0, "n_split": 2, "sample_seed": 7}}"#).unwrap();

        let config = ModelBuildingConfig::from_path(file.path()).unwrap();

        assert_eq!(config.max_range_um, Some(300.0));
        assert_eq!(config.n_split, 2);
        assert_eq!(config.sample_seed, Some(7));
        assert_eq!(config.bin_size_um, 100.0);
    }

    #[test]
    fn from_path_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"n_split": 2}}"#).unwrap();

        assert!(ModelBuildingConfig::from_path(file.path()).is_err());
    }
}
