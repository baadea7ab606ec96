//! Seams for the learned models a batch run depends on
//!
//! Classification, segmentation and OCR are external models; the engine
//! only sees these traits, so any backend (or a test double) can be plugged
//! in.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::image_loader::BoundingBox;
use crate::legend::{MapType, OcrToken};
use crate::Result;

/// Decides whether a map uses a discrete or a continuous legend
pub trait MapClassifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> Result<MapType>;
}

/// Kinds of map component the layout model detects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Title,
    Legend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDetection {
    pub kind: ComponentKind,
    pub bbox: BoundingBox,
}

/// Finds the title and legend areas of a map
pub trait ComponentSegmenter: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<ComponentDetection>>;
}

/// One detected region instance.
///
/// Detections carry no color: the engine samples the region's fill from
/// the map pixel at `centroid` and records it as the observation's
/// sampled color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDetection {
    pub class_name: String,
    /// `(row, column)` in map pixels
    pub centroid: (f64, f64),
    pub bbox: BoundingBox,
}

/// Finds the named regions drawn on a map; colors are sampled by the
/// engine, not the segmenter
pub trait RegionSegmenter: Send + Sync {
    fn segment(&self, image: &RgbImage) -> Result<Vec<RegionDetection>>;
}

/// Reads the text tokens of an image crop, in reading order
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrToken>>;
}

/// The four collaborators of a batch run
pub struct Models {
    pub classifier: Box<dyn MapClassifier>,
    pub components: Box<dyn ComponentSegmenter>,
    pub regions: Box<dyn RegionSegmenter>,
    pub ocr: Box<dyn TextRecognizer>,
}

impl Models {
    pub fn new(
        classifier: impl MapClassifier + 'static,
        components: impl ComponentSegmenter + 'static,
        regions: impl RegionSegmenter + 'static,
        ocr: impl TextRecognizer + 'static,
    ) -> Self {
        Self {
            classifier: Box::new(classifier),
            components: Box::new(components),
            regions: Box::new(regions),
            ocr: Box::new(ocr),
        }
    }
}

impl std::fmt::Debug for Models {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Models").finish_non_exhaustive()
    }
}
