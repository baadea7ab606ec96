//! Legend reading module
//!
//! This module turns the text and swatches of a map legend into an
//! ordered sequence of value/color entries.

pub mod builder;
pub mod swatch;
pub mod token;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::ExtractionError;

pub use builder::LegendReader;
pub use swatch::{SwatchColorSampler, TextBox};
pub use token::{LegendTokenParser, ParsedToken, Unit, ValueRange};

/// Legend style reported by the map classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    /// One color per value
    Discrete,
    /// Color ramp over a numeric range
    Continuous,
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapType::Discrete => f.write_str("discrete"),
            MapType::Continuous => f.write_str("continuous"),
        }
    }
}

impl FromStr for MapType {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discrete" => Ok(MapType::Discrete),
            "continuous" => Ok(MapType::Continuous),
            other => Err(ExtractionError::InvalidParameter {
                parameter: "map type".into(),
                value: other.to_string(),
            }),
        }
    }
}

/// One recognized text token inside a cropped legend image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrToken {
    /// Corner points: top-left, top-right, bottom-right, bottom-left
    pub quad: [[f32; 2]; 4],
    pub text: String,
    pub confidence: f32,
}

/// A legend label paired with the swatch color next to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub raw_text: String,
    /// `None` for labels that carry no number
    pub range: Option<ValueRange>,
    pub unit: Unit,
    pub color: Rgb,
}

impl LegendEntry {
    pub fn new(token: ParsedToken, color: Rgb) -> Self {
        Self {
            raw_text: token.raw_text,
            range: token.range,
            unit: token.unit,
            color,
        }
    }

    /// Entry with a known single value, as stored in the OCR artifact
    pub fn with_value(value: f64, unit: Unit, color: Rgb) -> Self {
        Self {
            raw_text: value.to_string(),
            range: Some(ValueRange::single(value)),
            unit,
            color,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.range.is_some()
    }

    /// Midpoint of the label's range
    pub fn value(&self) -> Option<f64> {
        self.range.map(|r| r.midpoint())
    }
}

/// Everything extracted from one map image's legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub file_name: String,
    pub map_type: MapType,
    pub map_title: String,
    /// Entries in OCR emission order
    pub legend: Vec<LegendEntry>,
}

impl MapRecord {
    /// Valid entries, keeping legend order
    pub fn valid_entries(&self) -> impl Iterator<Item = &LegendEntry> {
        self.legend.iter().filter(|e| e.is_valid())
    }

    pub fn has_values(&self) -> bool {
        self.legend.iter().any(LegendEntry::is_valid)
    }
}
