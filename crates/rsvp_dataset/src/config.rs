//! Dataset configuration

use std::path::{Path, PathBuf};

use rsvp_types::SAMPLE_RATE_HZ;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};

/// Configuration for opening the dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory holding the extracted `S*-S*.mat` folders and the
    /// published archives
    pub root: PathBuf,
    /// Hash files during verification; when false only presence is checked
    pub verify_sha256: bool,
    /// Sampling rate assigned to loaded recordings. The files do not carry
    /// it themselves.
    pub sample_rate_hz: u32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./datasets/thu"),
            verify_sha256: true,
            sample_rate_hz: SAMPLE_RATE_HZ,
        }
    }
}

impl DatasetConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> DatasetResult<Self> {
        let config: DatasetConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file such as `config.json`.
    pub fn from_json_file(path: impl AsRef<Path>) -> DatasetResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| DatasetError::from_io(path, e))?;
        Self::from_json(&contents).map_err(|e| match e {
            DatasetError::Format { message, .. } => DatasetError::format(path, message),
            other => other,
        })
    }

    pub fn to_json(&self) -> DatasetResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> DatasetResult<()> {
        if self.sample_rate_hz == 0 {
            return Err(DatasetError::Format {
                path: None,
                message: "sample_rate_hz must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = DatasetConfig::default();
        assert_eq!(config.root, PathBuf::from("./datasets/thu"));
        assert!(config.verify_sha256);
        assert_eq!(config.sample_rate_hz, 250);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = DatasetConfig::from_json(r#"{ "root": "/mnt/thu", "verify_sha256": false }"#)
            .unwrap();
        assert_eq!(config.root, PathBuf::from("/mnt/thu"));
        assert!(!config.verify_sha256);
        assert_eq!(config.sample_rate_hz, 250);
    }

    #[test]
    fn test_invalid_config() {
        let err = DatasetConfig::from_json(r#"{ "sample_rate_hz": 0 }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        let err = DatasetConfig::from_json("{ not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_config_file_round_trip() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");

        let err = DatasetConfig::from_json_file(&config_path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let config = DatasetConfig {
            verify_sha256: false,
            ..DatasetConfig::new(temp_dir.path())
        };
        std::fs::write(&config_path, config.to_json().unwrap()).unwrap();
        assert_eq!(DatasetConfig::from_json_file(&config_path).unwrap(), config);

        std::fs::write(&config_path, r#"{ "root": 5 }"#).unwrap();
        let err = DatasetConfig::from_json_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("config.json"));
    }
}
