//! Batch orchestration: map images in, result table out
//!
//! A run walks every map through the six stages in order (classification,
//! component segmentation, region segmentation, OCR and color mapping),
//! stage by stage across the whole batch. A map that fails in one stage is
//! logged, recorded in [`BatchOutput::skipped`] and left out of later
//! stages; the rest of the batch carries on.
//!
//! [`BatchEngine`] holds a single lock around the whole run, so concurrent
//! sessions queue up instead of interleaving their artifacts.

pub mod models;
pub mod progress;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::artifacts::{
    self, ArtifactStore, ClassificationRow, NumberTuple, ObjectsRow, OcrOutputRow,
    StateSegmentationRow,
};
use crate::color::{ChannelOrder, Rgb};
use crate::config::PipelineConfig;
use crate::dataset::{DatasetAssembler, ResultTable};
use crate::image_loader::{self, crop, image_from_raw, load_image, BoundingBox};
use crate::legend::{LegendReader, MapRecord, MapType};
use crate::model::LegendModelBuilder;
use crate::resolve::{resolve_batch, RegionObservation};
use crate::{ExtractionError, Result};

pub use models::{
    ComponentDetection, ComponentKind, ComponentSegmenter, MapClassifier, Models,
    RegionDetection, RegionSegmenter, TextRecognizer,
};
pub use progress::{ProgressLog, ProgressStep, Stage, StepStatus};

/// One uploaded map
#[derive(Debug, Clone)]
pub struct MapImage {
    pub file_name: String,
    pub image: RgbImage,
}

impl MapImage {
    pub fn new(file_name: impl Into<String>, image: RgbImage) -> Self {
        Self {
            file_name: file_name.into(),
            image,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, load_image(path)?))
    }

    /// Wrap a packed 3-channel buffer handed over by a decoder or model
    /// backend, reordering channels once if the backend stores them BGR
    pub fn from_raw(
        file_name: impl Into<String>,
        data: &[u8],
        width: u32,
        height: u32,
        order: ChannelOrder,
    ) -> Result<Self> {
        Ok(Self::new(file_name, image_from_raw(data, width, height, order)?))
    }
}

/// Everything one request needs, threaded through the run
#[derive(Debug)]
pub struct RunContext {
    pub session_id: String,
    pub maps: Vec<MapImage>,
    /// Overrides `artifacts.output_dir` of the engine config
    pub output_dir: Option<PathBuf>,
    pub progress: ProgressLog,
}

impl RunContext {
    pub fn new(session_id: impl Into<String>, maps: Vec<MapImage>) -> Self {
        Self {
            session_id: session_id.into(),
            maps,
            output_dir: None,
            progress: ProgressLog::new(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_progress(mut self, progress: ProgressLog) -> Self {
        self.progress = progress;
        self
    }

    /// Load every supported image of `dir`, sorted by file name
    pub fn from_dir(session_id: impl Into<String>, dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| ExtractionError::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(image_loader::is_supported_extension)
            })
            .collect();
        paths.sort();

        let maps = paths
            .iter()
            .map(|path| MapImage::load(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(session_id, maps))
    }
}

/// A map left out of the run, and why
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedMap {
    pub file_name: String,
    pub reason: String,
}

/// Result of a batch run
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub records: Vec<MapRecord>,
    pub observations: Vec<RegionObservation>,
    pub table: ResultTable,
    pub skipped: Vec<SkippedMap>,
    /// Path of the written result table, if artifacts were enabled
    pub result_path: Option<PathBuf>,
}

/// Map that made it through classification and component detection
struct LocatedMap<'a> {
    map: &'a MapImage,
    map_type: MapType,
    legend: BoundingBox,
    title: Option<BoundingBox>,
}

/// Runs whole batches, one at a time
#[derive(Debug)]
pub struct BatchEngine {
    models: Models,
    config: PipelineConfig,
    lock: Mutex<()>,
}

impl BatchEngine {
    pub fn new(models: Models, config: PipelineConfig) -> Self {
        Self {
            models,
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every map of `ctx`.
    ///
    /// Blocks while another run holds the engine. Recoverable per-map
    /// failures (see [`ExtractionError::is_recoverable`]) skip that map;
    /// any other error, such as invalid input, configuration or artifact
    /// I/O, fails the whole run.
    pub fn run(&self, ctx: &mut RunContext) -> Result<BatchOutput> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.config.validate()?;
        ctx.progress.start(Stage::Upload);
        if ctx.maps.is_empty() {
            return Err(ExtractionError::InvalidParameter {
                parameter: "maps".into(),
                value: "no images provided".into(),
            });
        }
        ctx.progress.complete(Stage::Upload);
        info!(session = %ctx.session_id, maps = ctx.maps.len(), "starting batch run");

        let store = match ctx.output_dir.as_ref().or(self.config.artifacts.output_dir.as_ref()) {
            Some(dir) => Some(ArtifactStore::create(dir, &self.config.artifacts)?),
            None => None,
        };
        let mut skipped = Vec::new();

        // Classification
        ctx.progress.start(Stage::Classification);
        let mut classified = Vec::new();
        for map in &ctx.maps {
            match self.models.classifier.classify(&map.image) {
                Ok(map_type) => {
                    debug!(file = %map.file_name, %map_type, "classified map");
                    classified.push((map, map_type));
                }
                Err(e) => skip(&mut skipped, &map.file_name, e)?,
            }
        }
        if let Some(store) = &store {
            let rows: Vec<ClassificationRow> = classified
                .iter()
                .map(|(map, map_type)| ClassificationRow {
                    file_name: map.file_name.clone(),
                    map_type: *map_type,
                })
                .collect();
            store.write(&rows)?;
        }
        ctx.progress.complete(Stage::Classification);

        // Title and legend detection
        ctx.progress.start(Stage::ComponentSegmentation);
        let mut object_rows = Vec::new();
        let mut located = Vec::new();
        for (map, map_type) in classified {
            let detections = match self.models.components.detect(&map.image) {
                Ok(detections) => detections,
                Err(e) => {
                    skip(&mut skipped, &map.file_name, e)?;
                    continue;
                }
            };
            let legend = last_of(&detections, ComponentKind::Legend);
            let title = last_of(&detections, ComponentKind::Title);
            object_rows.push(ObjectsRow {
                file_name: map.file_name.clone(),
                legend,
                title,
            });

            match legend {
                Some(legend) => located.push(LocatedMap {
                    map,
                    map_type,
                    legend,
                    title,
                }),
                None => skip(
                    &mut skipped,
                    &map.file_name,
                    ExtractionError::collaborator("component segmentation", "no legend detected"),
                )?,
            }
        }
        if let Some(store) = &store {
            store.write(&object_rows)?;
        }
        ctx.progress.complete(Stage::ComponentSegmentation);

        // Region segmentation
        ctx.progress.start(Stage::RegionSegmentation);
        let mut segmentation_rows = Vec::new();
        let mut segmented = Vec::new();
        for entry in &located {
            let map = entry.map;
            let detections = match self.models.regions.segment(&map.image) {
                Ok(detections) => detections,
                Err(e) => {
                    skip(&mut skipped, &map.file_name, e)?;
                    continue;
                }
            };
            for (i, detection) in detections.iter().enumerate() {
                let Some(color) = centroid_color(&map.image, detection.centroid) else {
                    warn!(
                        file = %map.file_name,
                        region = %detection.class_name,
                        "region centroid outside image"
                    );
                    continue;
                };
                let bbox = detection.bbox;
                segmentation_rows.push(StateSegmentationRow {
                    file_name: map.file_name.clone(),
                    class_name: detection.class_name.clone(),
                    object_number: i as u32 + 1,
                    centroid: NumberTuple(vec![detection.centroid.0, detection.centroid.1]),
                    bounding_box: NumberTuple(
                        [bbox.y0, bbox.x0, bbox.y1, bbox.x1].map(f64::from).to_vec(),
                    ),
                    color,
                });
            }
            segmented.push(entry);
        }
        if let Some(store) = &store {
            store.write(&segmentation_rows)?;
        }
        let observations = artifacts::observations_from_segmentation(&segmentation_rows);
        ctx.progress.complete(Stage::RegionSegmentation);

        // Legend and title OCR
        ctx.progress.start(Stage::TextExtraction);
        let reader = LegendReader::with_config(&self.config.swatch_sampling);
        let mut records = Vec::new();
        for entry in segmented {
            match self.read_map(&reader, entry) {
                Ok(record) => records.push(record),
                Err(e) => skip(&mut skipped, &entry.map.file_name, e)?,
            }
        }
        let ocr_rows: Vec<OcrOutputRow> = records
            .iter()
            .flat_map(artifacts::ocr_rows_from_record)
            .collect();
        if let Some(store) = &store {
            store.write(&ocr_rows)?;
        }
        ctx.progress.complete(Stage::TextExtraction);

        // Color to value mapping
        ctx.progress.start(Stage::ColorMapping);
        let builder = LegendModelBuilder::with_config(&self.config.legend_model);
        let resolved = resolve_batch(&builder, &records, &observations);
        let table =
            DatasetAssembler::with_config(&self.config.dataset).assemble(&records, &resolved);
        let result_path = match &store {
            Some(store) => Some(store.write_result(&table)?),
            None => None,
        };
        ctx.progress.complete(Stage::ColorMapping);

        info!(
            session = %ctx.session_id,
            columns = table.columns().len(),
            rows = table.rows().len(),
            skipped = skipped.len(),
            "batch run finished"
        );

        Ok(BatchOutput {
            records,
            observations,
            table,
            skipped,
            result_path,
        })
    }

    fn read_map(&self, reader: &LegendReader, entry: &LocatedMap<'_>) -> Result<MapRecord> {
        let map = entry.map;
        let map_title = match entry.title {
            Some(bbox) => {
                let title_crop = crop_component(&map.image, &bbox, ComponentKind::Title)?;
                self.models
                    .ocr
                    .recognize(&title_crop)?
                    .into_iter()
                    .next()
                    .map(|token| token.text)
            }
            None => None,
        }
        .unwrap_or_else(|| {
            warn!(file = %map.file_name, "no title text, using file name");
            map.file_name.clone()
        });

        let legend_crop = crop_component(&map.image, &entry.legend, ComponentKind::Legend)?;
        let tokens = self.models.ocr.recognize(&legend_crop)?;
        let record =
            reader.read_record(&map.file_name, entry.map_type, &map_title, &legend_crop, &tokens);
        debug!(
            file = %map.file_name,
            tokens = tokens.len(),
            entries = record.legend.len(),
            "read legend"
        );
        Ok(record)
    }
}

/// Record a recoverable per-map failure; hand anything else back
fn skip(skipped: &mut Vec<SkippedMap>, file_name: &str, error: ExtractionError) -> Result<()> {
    if !error.is_recoverable() {
        return Err(error);
    }
    warn!("skipping map {}: {}", file_name, error);
    skipped.push(SkippedMap {
        file_name: file_name.to_string(),
        reason: error.to_string(),
    });
    Ok(())
}

/// A detected box that misses the image is the detector's failure
fn crop_component(image: &RgbImage, bbox: &BoundingBox, kind: ComponentKind) -> Result<RgbImage> {
    crop(image, bbox).map_err(|e| {
        let stage = match kind {
            ComponentKind::Title => "title crop",
            ComponentKind::Legend => "legend crop",
        };
        ExtractionError::collaborator(stage, e.to_string())
    })
}

/// The last detection of a kind wins
fn last_of(detections: &[ComponentDetection], kind: ComponentKind) -> Option<BoundingBox> {
    detections.iter().rev().find(|d| d.kind == kind).map(|d| d.bbox)
}

fn centroid_color(image: &RgbImage, (row, col): (f64, f64)) -> Option<Rgb> {
    if row < 0.0 || col < 0.0 {
        return None;
    }
    image
        .get_pixel_checked(col as u32, row as u32)
        .map(|p| Rgb::from(*p))
}
