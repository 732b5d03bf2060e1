//! Application configuration, loaded from YAML.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "FACE_OVERLAY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "face-overlay.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub models: ModelConfig,
    pub detector: DetectorConfig,
    pub camera: CameraConfig,
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the ONNX bundles.
    pub dir: PathBuf,
    /// Missing bundles are fetched from `{base_url}/{file name}` when set.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub input_size: u32,
    pub score_threshold: f32,
    pub iou_threshold: f32,
    pub max_faces: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub expression_min_confidence: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            base_url: None,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_size: 512,
            score_threshold: 0.5,
            iou_threshold: 0.4,
            max_faces: 10,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            expression_min_confidence: 0.1,
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// `$FACE_OVERLAY_CONFIG`, then `face-overlay.yaml`, then defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detector;
        if d.input_size == 0 || d.input_size % 32 != 0 {
            return Err(ConfigError::Invalid(format!(
                "detector.input_size must be a positive multiple of 32, got {}",
                d.input_size
            )));
        }
        for (name, value) in [
            ("detector.score_threshold", d.score_threshold),
            ("detector.iou_threshold", d.iou_threshold),
            (
                "overlay.expression_min_confidence",
                self.overlay.expression_min_confidence,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if d.max_faces == 0 {
            return Err(ConfigError::Invalid(
                "detector.max_faces must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.detector.input_size, 512);
        assert_eq!(config.detector.score_threshold, 0.5);
        assert_eq!(config.models.dir, PathBuf::from("models"));
        assert!(config.models.base_url.is_none());
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.overlay.expression_min_confidence, 0.1);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let yaml = "detector:\n  input_size: 416\ncamera:\n  index: 2\nmodels:\n  base_url: https://example.invalid/models\n";
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.detector.input_size, 416);
        assert_eq!(config.detector.score_threshold, 0.5);
        assert_eq!(config.camera.index, 2);
        assert_eq!(
            config.models.base_url.as_deref(),
            Some("https://example.invalid/models")
        );
    }

    #[test]
    fn rejects_input_size_not_multiple_of_32() {
        let err = AppConfig::from_yaml("detector:\n  input_size: 500\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let err = AppConfig::from_yaml("detector:\n  score_threshold: 1.5\n").unwrap_err();
        assert!(err.to_string().contains("detector.score_threshold"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = AppConfig::from_yaml("detector: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("face-overlay-missing-config.yaml");
        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
