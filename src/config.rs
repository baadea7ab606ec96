//! Configuration structures for the map-to-table pipeline.
//!
//! This module defines the tunable parameters of legend reading, value
//! inference and table assembly, grouped the way the pipeline runs.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use choropleth_extract::PipelineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = PipelineConfig::from_json_file(Path::new("config.json"))?;
//!
//! // Or use defaults
//! let config = PipelineConfig::default();
//! # Ok::<(), choropleth_extract::ExtractionError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`SwatchSamplingConfig`]: legend swatch scanning
//! - [`LegendModelConfig`]: color matching for discrete legends
//! - [`DatasetConfig`]: result table labels and the missing-value sentinel
//! - [`ArtifactConfig`]: where intermediate CSV files go

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::ColorMetric;
use crate::constants::{artifacts, table};
use crate::{ExtractionError, Result};

/// Complete pipeline configuration.
///
/// Can be serialized to/from JSON for reproducible runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub swatch_sampling: SwatchSamplingConfig,
    pub legend_model: LegendModelConfig,
    pub dataset: DatasetConfig,
    pub artifacts: ArtifactConfig,
}

/// Swatch scanning parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwatchSamplingConfig {
    /// Largest per-channel difference still treated as the same color
    pub color_tolerance: u8,

    /// Give up after scanning this many pixels; `None` scans to the border
    pub max_scan_px: Option<u32>,
}

/// Legend model parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendModelConfig {
    /// Distance used by discrete legends to find the nearest swatch
    pub color_metric: ColorMetric,
}

/// Result table parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Header of the first column
    pub region_column: String,

    /// First cell of the trailing provenance row
    pub provenance_label: String,

    /// Cell value meaning "no observation"; replaced by the column median
    pub missing_sentinel: f64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            region_column: table::REGION_COLUMN.to_string(),
            provenance_label: table::PROVENANCE_LABEL.to_string(),
            missing_sentinel: table::MISSING_SENTINEL,
        }
    }
}

/// Intermediate and final artifact locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory for CSV artifacts; nothing is written when unset
    pub output_dir: Option<PathBuf>,

    pub classification_file: String,
    pub objects_file: String,
    pub state_segmentation_file: String,
    pub ocr_output_file: String,
    pub result_file: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            classification_file: artifacts::CLASSIFICATION.to_string(),
            objects_file: artifacts::OBJECTS.to_string(),
            state_segmentation_file: artifacts::STATE_SEGMENTATION.to_string(),
            ocr_output_file: artifacts::OCR_OUTPUT.to_string(),
            result_file: artifacts::COLOR_TO_DATA.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ExtractionError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| ExtractionError::InvalidParameter {
            parameter: format!("config {}", path.display()),
            value: e.to_string(),
        })
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ExtractionError::Processing(format!("config serialization: {e}")))?;
        std::fs::write(path, json).map_err(|e| ExtractionError::io(path, e))
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.swatch_sampling.max_scan_px == Some(0) {
            return Err(ExtractionError::InvalidParameter {
                parameter: "swatch_sampling.max_scan_px".into(),
                value: "0".into(),
            });
        }
        if !self.dataset.missing_sentinel.is_finite() {
            return Err(ExtractionError::InvalidParameter {
                parameter: "dataset.missing_sentinel".into(),
                value: self.dataset.missing_sentinel.to_string(),
            });
        }
        if self.dataset.region_column.is_empty() {
            return Err(ExtractionError::InvalidParameter {
                parameter: "dataset.region_column".into(),
                value: String::new(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_artifact_names() {
        let config = PipelineConfig::default();
        assert_eq!(config.dataset.region_column, "State_Name");
        assert_eq!(config.dataset.provenance_label, "File_Name");
        assert_eq!(config.dataset.missing_sentinel, 0.0);
        assert_eq!(config.artifacts.result_file, "Color_To_Data_Mapping.csv");
        assert_eq!(config.legend_model.color_metric, ColorMetric::Rgb);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PipelineConfig::default();
        config.swatch_sampling.color_tolerance = 6;
        config.legend_model.color_metric = ColorMetric::Lab;
        config.to_json_file(&path).unwrap();

        let loaded = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"swatch_sampling": {"color_tolerance": 3}}"#).unwrap();
        assert_eq!(config.swatch_sampling.color_tolerance, 3);
        assert_eq!(config.swatch_sampling.max_scan_px, None);
        assert_eq!(config.dataset, DatasetConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_scan() {
        let mut config = PipelineConfig::default();
        config.swatch_sampling.max_scan_px = Some(0);
        assert!(config.validate().is_err());
    }
}
