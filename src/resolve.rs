//! Region value resolution
//!
//! Applies each map's color-to-value model to the fill colors sampled from
//! its segmented regions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::color::Rgb;
use crate::legend::{MapRecord, Unit};
use crate::model::{ColorToValueModel, LegendModelBuilder};

/// One segmented region instance on one map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionObservation {
    pub file_name: String,
    pub region_name: String,
    pub sampled_color: Rgb,
}

/// Inferred value of one region on one map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedValue {
    pub file_name: String,
    pub region_name: String,
    pub value: Option<f64>,
    pub unit: Unit,
}

/// Resolves the regions of a single map
#[derive(Debug, Clone)]
pub struct RegionValueResolver<'a> {
    file_name: &'a str,
    model: &'a ColorToValueModel,
}

impl<'a> RegionValueResolver<'a> {
    pub fn new(file_name: &'a str, model: &'a ColorToValueModel) -> Self {
        Self { file_name, model }
    }

    /// One result per observation belonging to this map, in input order.
    /// Duplicate detections of a region are all kept.
    pub fn resolve(&self, observations: &[RegionObservation]) -> Vec<ResolvedValue> {
        observations
            .iter()
            .filter(|obs| obs.file_name == self.file_name)
            .map(|obs| {
                let inference = self.model.infer(&obs.sampled_color);
                debug!(
                    file = %obs.file_name,
                    region = %obs.region_name,
                    color = %obs.sampled_color,
                    value = ?inference.value,
                    "resolved region"
                );
                ResolvedValue {
                    file_name: obs.file_name.clone(),
                    region_name: obs.region_name.clone(),
                    value: inference.value,
                    unit: inference.unit,
                }
            })
            .collect()
    }
}

/// Resolve every map of a batch.
///
/// A map whose legend yields no model is logged and contributes nothing;
/// the remaining maps are still resolved.
pub fn resolve_batch(
    builder: &LegendModelBuilder,
    records: &[MapRecord],
    observations: &[RegionObservation],
) -> Vec<ResolvedValue> {
    let mut resolved = Vec::new();

    for record in records {
        let model = match builder.build(record) {
            Ok(model) => model,
            Err(e) => {
                warn!("skipping map {}: {}", record.file_name, e);
                continue;
            }
        };

        let rows = RegionValueResolver::new(&record.file_name, &model).resolve(observations);
        if rows.is_empty() {
            warn!("map {} has no segmented regions", record.file_name);
        }
        resolved.extend(rows);
    }

    info!(maps = records.len(), values = resolved.len(), "resolved region values");
    resolved
}
