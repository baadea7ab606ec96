//! # Choropleth Extract
//!
//! Recover per-region numbers from choropleth map images.
//!
//! Given the legend of a map (label text plus the swatch color next to each
//! label) and the fill color sampled inside every segmented region, this
//! crate:
//! - Parses legend labels into values and units
//! - Samples each label's swatch color from the legend image
//! - Builds a color-to-value model per map (nearest color for discrete
//!   legends, ramp interpolation for continuous ones)
//! - Resolves every region's value and assembles a region × map table with
//!   median imputation of missing cells
//!
//! ## Example
//!
//! ```rust,no_run
//! use choropleth_extract::{artifacts, build_dataset, PipelineConfig};
//! use std::path::Path;
//!
//! let ocr = artifacts::read_file(Path::new("outputs/OCR_output.csv"))?;
//! let segmentation =
//!     artifacts::read_file(Path::new("outputs/output_objects_state_segmentation.csv"))?;
//!
//! let records = artifacts::map_records_from_ocr(&ocr);
//! let observations = artifacts::observations_from_segmentation(&segmentation);
//! let table = build_dataset(&records, &observations, &PipelineConfig::default());
//! println!("{}", table.to_json_records());
//! # Ok::<(), choropleth_extract::ExtractionError>(())
//! ```

use std::path::Path;

pub mod artifacts;
pub mod color;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod image_loader;
pub mod legend;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod resolve;

pub use color::Rgb;
pub use config::PipelineConfig;
pub use dataset::{DatasetAssembler, ResultTable};
pub use error::{ExtractionError, Result};
pub use legend::{LegendEntry, LegendTokenParser, MapRecord, MapType, Unit};
pub use model::{ColorToValueModel, LegendModelBuilder};
pub use resolve::{RegionObservation, RegionValueResolver, ResolvedValue};

/// Resolve every region of every map and assemble the result table
pub fn build_dataset(
    records: &[MapRecord],
    observations: &[RegionObservation],
    config: &PipelineConfig,
) -> ResultTable {
    let builder = LegendModelBuilder::with_config(&config.legend_model);
    let resolved = resolve::resolve_batch(&builder, records, observations);
    DatasetAssembler::with_config(&config.dataset).assemble(records, &resolved)
}

/// Rebuild the result table from the OCR and region segmentation CSVs of
/// an earlier run
///
/// # Errors
///
/// Returns an error if either file is missing or does not match its schema.
pub fn assemble_from_artifacts(
    ocr_output: &Path,
    segmentation: &Path,
    config: &PipelineConfig,
) -> Result<ResultTable> {
    let ocr_rows: Vec<artifacts::OcrOutputRow> = artifacts::read_file(ocr_output)?;
    let segmentation_rows: Vec<artifacts::StateSegmentationRow> =
        artifacts::read_file(segmentation)?;

    let records = artifacts::map_records_from_ocr(&ocr_rows);
    let observations = artifacts::observations_from_segmentation(&segmentation_rows);
    Ok(build_dataset(&records, &observations, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dataset_discrete_map() {
        let records = vec![MapRecord {
            file_name: "income.png".into(),
            map_type: MapType::Discrete,
            map_title: "Income".into(),
            legend: vec![
                LegendEntry::with_value(1.0, Unit::Suffix('k'), Rgb::new(255, 0, 0)),
                LegendEntry::with_value(2.0, Unit::Suffix('k'), Rgb::new(0, 255, 0)),
            ],
        }];
        let observations = vec![RegionObservation {
            file_name: "income.png".into(),
            region_name: "Ohio".into(),
            sampled_color: Rgb::new(250, 5, 5),
        }];

        let table = build_dataset(&records, &observations, &PipelineConfig::default());
        assert_eq!(table.column_labels(), vec!["Income (k)"]);
        assert_eq!(table.cell("Ohio", "Income (k)"), Some(1.0));
    }
}
