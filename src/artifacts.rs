//! Tabular artifacts written between pipeline stages
//!
//! Each CSV file has a named-field record type and a fixed header. Files
//! are always written with their header row, even when empty, and the
//! header is checked on read before any row is decoded.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Rgb;
use crate::config::ArtifactConfig;
use crate::constants::is_known_region;
use crate::dataset::ResultTable;
use crate::image_loader::BoundingBox;
use crate::legend::{LegendEntry, MapRecord, MapType, Unit};
use crate::resolve::RegionObservation;
use crate::{ExtractionError, Result};

/// A CSV schema: record type plus its exact header
pub trait Artifact: Serialize + DeserializeOwned {
    const HEADERS: &'static [&'static str];

    /// File name of this artifact under `config`
    fn file_name(config: &ArtifactConfig) -> &str;
}

/// Serialize through `Display`, deserialize through `FromStr`
mod as_text {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Display, S: Serializer>(
        value: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Like [`as_text`], with the empty string standing for `None`
mod optional_text {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Display, S: Serializer>(
        value: &Option<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        if text.trim().is_empty() {
            Ok(None)
        } else {
            text.parse().map(Some).map_err(de::Error::custom)
        }
    }
}

/// Parenthesized number list such as a centroid `(412.5, 230.25)`
#[derive(Debug, Clone, PartialEq)]
pub struct NumberTuple(pub Vec<f64>);

impl fmt::Display for NumberTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

impl FromStr for NumberTuple {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        if inner.trim().is_empty() {
            return Ok(NumberTuple(Vec::new()));
        }
        inner
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| ExtractionError::InvalidParameter {
                        parameter: "number tuple".into(),
                        value: s.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(NumberTuple)
    }
}

/// `classification.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRow {
    #[serde(rename = "file name")]
    pub file_name: String,
    #[serde(rename = "Type")]
    pub map_type: MapType,
}

impl Artifact for ClassificationRow {
    const HEADERS: &'static [&'static str] = &["file name", "Type"];

    fn file_name(config: &ArtifactConfig) -> &str {
        &config.classification_file
    }
}

/// `output_objects.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectsRow {
    #[serde(rename = "file name")]
    pub file_name: String,
    #[serde(rename = "legend bounding box", with = "optional_text")]
    pub legend: Option<BoundingBox>,
    #[serde(rename = "title bounding box", with = "optional_text")]
    pub title: Option<BoundingBox>,
}

impl Artifact for ObjectsRow {
    const HEADERS: &'static [&'static str] =
        &["file name", "legend bounding box", "title bounding box"];

    fn file_name(config: &ArtifactConfig) -> &str {
        &config.objects_file
    }
}

/// `output_objects_state_segmentation.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSegmentationRow {
    #[serde(rename = "File Name")]
    pub file_name: String,
    #[serde(rename = "Class Name")]
    pub class_name: String,
    #[serde(rename = "Object Number")]
    pub object_number: u32,
    #[serde(rename = "Centroid", with = "as_text")]
    pub centroid: NumberTuple,
    #[serde(rename = "BoundingBox", with = "as_text")]
    pub bounding_box: NumberTuple,
    #[serde(rename = "RGB Color", with = "as_text")]
    pub color: Rgb,
}

impl Artifact for StateSegmentationRow {
    const HEADERS: &'static [&'static str] = &[
        "File Name",
        "Class Name",
        "Object Number",
        "Centroid",
        "BoundingBox",
        "RGB Color",
    ];

    fn file_name(config: &ArtifactConfig) -> &str {
        &config.state_segmentation_file
    }
}

/// `OCR_output.csv`: one row per valid legend entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOutputRow {
    pub file_name: String,
    pub map_type: MapType,
    pub map_title: String,
    pub value: f64,
    pub unit: Unit,
    #[serde(rename = "RGB color", with = "as_text")]
    pub color: Rgb,
}

impl Artifact for OcrOutputRow {
    const HEADERS: &'static [&'static str] =
        &["file_name", "map_type", "map_title", "value", "unit", "RGB color"];

    fn file_name(config: &ArtifactConfig) -> &str {
        &config.ocr_output_file
    }
}

/// Write `rows` with the artifact header
pub fn write_to<A: Artifact, W: io::Write>(writer: W, rows: &[A], artifact: &str) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer
        .write_record(A::HEADERS)
        .map_err(|e| ExtractionError::csv(artifact, e))?;
    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(|e| ExtractionError::csv(artifact, e))?;
    }
    csv_writer
        .flush()
        .map_err(|e| ExtractionError::csv(artifact, e.into()))
}

/// Read rows after checking the header matches the artifact schema
pub fn read_from<A: Artifact, R: io::Read>(reader: R, artifact: &str) -> Result<Vec<A>> {
    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| ExtractionError::csv(artifact, e))?;
    let found: Vec<&str> = headers.iter().map(str::trim).collect();
    if found != A::HEADERS {
        return Err(ExtractionError::schema(
            artifact,
            format!("expected columns {:?}, found {:?}", A::HEADERS, found),
        ));
    }

    csv_reader
        .deserialize()
        .map(|row| row.map_err(|e| ExtractionError::csv(artifact, e)))
        .collect()
}

/// Write the final table, provenance row last
pub fn write_table<W: io::Write>(writer: W, table: &ResultTable, artifact: &str) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer
        .write_record(table.header())
        .map_err(|e| ExtractionError::csv(artifact, e))?;
    for row in table.text_rows() {
        csv_writer
            .write_record(&row)
            .map_err(|e| ExtractionError::csv(artifact, e))?;
    }
    csv_writer
        .flush()
        .map_err(|e| ExtractionError::csv(artifact, e.into()))
}

/// Artifact files of one run inside an output directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    config: ArtifactConfig,
}

impl ArtifactStore {
    /// Create the store, creating `dir` if needed
    pub fn create(dir: impl Into<PathBuf>, config: &ArtifactConfig) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| ExtractionError::io(&dir, e))?;
        Ok(Self {
            dir,
            config: config.clone(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of<A: Artifact>(&self) -> PathBuf {
        self.dir.join(A::file_name(&self.config))
    }

    pub fn result_path(&self) -> PathBuf {
        self.dir.join(&self.config.result_file)
    }

    pub fn write<A: Artifact>(&self, rows: &[A]) -> Result<PathBuf> {
        let path = self.path_of::<A>();
        write_file(&path, rows)?;
        Ok(path)
    }

    pub fn read<A: Artifact>(&self) -> Result<Vec<A>> {
        read_file(&self.path_of::<A>())
    }

    pub fn write_result(&self, table: &ResultTable) -> Result<PathBuf> {
        let path = self.result_path();
        write_table_file(&path, table)?;
        Ok(path)
    }
}

fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn write_file<A: Artifact>(path: &Path, rows: &[A]) -> Result<()> {
    let file = File::create(path).map_err(|e| ExtractionError::io(path, e))?;
    write_to(file, rows, &artifact_name(path))?;
    debug!(path = %path.display(), rows = rows.len(), "wrote artifact");
    Ok(())
}

pub fn read_file<A: Artifact>(path: &Path) -> Result<Vec<A>> {
    let file = File::open(path).map_err(|e| ExtractionError::io(path, e))?;
    read_from(file, &artifact_name(path))
}

pub fn write_table_file(path: &Path, table: &ResultTable) -> Result<()> {
    let file = File::create(path).map_err(|e| ExtractionError::io(path, e))?;
    write_table(file, table, &artifact_name(path))
}

/// Rebuild map records from OCR output rows, grouped by file in
/// first-appearance order with row order kept inside each legend
pub fn map_records_from_ocr(rows: &[OcrOutputRow]) -> Vec<MapRecord> {
    let mut records: Vec<MapRecord> = Vec::new();
    for row in rows {
        let entry = LegendEntry::with_value(row.value, row.unit, row.color);
        match records.iter_mut().find(|r| r.file_name == row.file_name) {
            Some(record) => record.legend.push(entry),
            None => records.push(MapRecord {
                file_name: row.file_name.clone(),
                map_type: row.map_type,
                map_title: row.map_title.clone(),
                legend: vec![entry],
            }),
        }
    }
    records
}

/// OCR output rows for the valid entries of `record`
pub fn ocr_rows_from_record(record: &MapRecord) -> Vec<OcrOutputRow> {
    record
        .valid_entries()
        .filter_map(|entry| {
            entry.value().map(|value| OcrOutputRow {
                file_name: record.file_name.clone(),
                map_type: record.map_type,
                map_title: record.map_title.clone(),
                value,
                unit: entry.unit,
                color: entry.color,
            })
        })
        .collect()
}

/// Observations for the segmented regions whose class is a known region.
///
/// Rows labelled with anything else (the segmenter writes `Unknown` for
/// unmatched instances) stay in the artifact but are dropped here.
pub fn observations_from_segmentation(rows: &[StateSegmentationRow]) -> Vec<RegionObservation> {
    rows.iter()
        .filter(|row| {
            let known = is_known_region(&row.class_name);
            if !known {
                debug!(file = %row.file_name, region = %row.class_name, "unknown region dropped");
            }
            known
        })
        .map(|row| RegionObservation {
            file_name: row.file_name.clone(),
            region_name: row.class_name.clone(),
            sampled_color: row.color,
        })
        .collect()
}
