//! Color-to-value models
//!
//! A [`ColorToValueModel`] is built once per map from its legend and then
//! answers, for any region fill color, which value that color encodes.
//! Discrete legends use nearest-color lookup; continuous legends
//! interpolate along the ramp of legend swatches.

pub mod continuous;
pub mod discrete;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{ColorMetric, Rgb};
use crate::config::LegendModelConfig;
use crate::legend::{MapRecord, MapType, Unit};
use crate::{ExtractionError, Result};

pub use continuous::{ContinuousRamp, RampStop};
pub use discrete::{DiscreteNearestColor, Reference};

/// Value inferred for one color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    /// `None` when the model cannot place the color
    pub value: Option<f64>,
    pub unit: Unit,
}

impl Inference {
    pub fn missing(unit: Unit) -> Self {
        Self { value: None, unit }
    }
}

/// Immutable mapping from a region color to a legend value
#[derive(Debug, Clone, PartialEq)]
pub enum ColorToValueModel {
    Discrete(DiscreteNearestColor),
    Continuous(ContinuousRamp),
}

impl ColorToValueModel {
    pub fn infer(&self, color: &Rgb) -> Inference {
        match self {
            ColorToValueModel::Discrete(model) => model.infer(color),
            ColorToValueModel::Continuous(model) => model.infer(color),
        }
    }

    pub fn map_type(&self) -> MapType {
        match self {
            ColorToValueModel::Discrete(_) => MapType::Discrete,
            ColorToValueModel::Continuous(_) => MapType::Continuous,
        }
    }
}

/// Builds the model matching a map's legend style
#[derive(Debug, Clone, Default)]
pub struct LegendModelBuilder {
    metric: ColorMetric,
}

impl LegendModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &LegendModelConfig) -> Self {
        Self {
            metric: config.color_metric,
        }
    }

    /// Build the model for `record` from its valid legend entries.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::EmptyLegend` if no entry carries a value.
    pub fn build(&self, record: &MapRecord) -> Result<ColorToValueModel> {
        if !record.has_values() {
            return Err(ExtractionError::EmptyLegend {
                file_name: record.file_name.clone(),
            });
        }

        let model = match record.map_type {
            MapType::Discrete => {
                let references = record
                    .valid_entries()
                    .filter_map(|entry| {
                        entry.value().map(|value| Reference {
                            color: entry.color,
                            value,
                            unit: entry.unit,
                        })
                    })
                    .collect();
                ColorToValueModel::Discrete(DiscreteNearestColor::new(references, self.metric))
            }
            MapType::Continuous => {
                let unit = record
                    .valid_entries()
                    .next()
                    .map(|entry| entry.unit)
                    .unwrap_or_default();
                let stops = record
                    .valid_entries()
                    .filter_map(|entry| {
                        entry.value().map(|value| RampStop {
                            color: entry.color,
                            value,
                        })
                    })
                    .collect();
                ColorToValueModel::Continuous(ContinuousRamp::new(stops, unit))
            }
        };

        debug!(
            file = %record.file_name,
            map_type = %record.map_type,
            entries = record.legend.len(),
            "built legend model"
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::{LegendEntry, LegendTokenParser};

    fn record(map_type: MapType, tokens: &[(&str, Rgb)]) -> MapRecord {
        let parser = LegendTokenParser::new();
        MapRecord {
            file_name: "map.png".into(),
            map_type,
            map_title: "Map".into(),
            legend: tokens
                .iter()
                .map(|(text, color)| LegendEntry::new(parser.parse(text), *color))
                .collect(),
        }
    }

    #[test]
    fn test_builds_variant_per_map_type() {
        let tokens = [("1k", Rgb::new(255, 0, 0)), ("2k", Rgb::new(0, 255, 0))];
        let builder = LegendModelBuilder::new();

        let discrete = builder.build(&record(MapType::Discrete, &tokens)).unwrap();
        assert_eq!(discrete.map_type(), MapType::Discrete);

        let continuous = builder.build(&record(MapType::Continuous, &tokens)).unwrap();
        assert_eq!(continuous.map_type(), MapType::Continuous);
    }

    #[test]
    fn test_invalid_entries_excluded() {
        let tokens = [
            ("N/A", Rgb::new(250, 0, 0)),
            ("1", Rgb::new(200, 0, 0)),
            ("2", Rgb::new(0, 0, 200)),
        ];
        let model = LegendModelBuilder::new()
            .build(&record(MapType::Discrete, &tokens))
            .unwrap();

        // nearest swatch is the N/A one, which cannot answer
        let inference = model.infer(&Rgb::new(255, 0, 0));
        assert_eq!(inference.value, Some(1.0));

        match model {
            ColorToValueModel::Discrete(d) => assert_eq!(d.references().len(), 2),
            other => panic!("expected discrete model, got {other:?}"),
        }
    }

    #[test]
    fn test_continuous_unit_from_first_entry() {
        let tokens = [
            ("0-10%", Rgb::new(255, 255, 255)),
            ("10-20", Rgb::new(128, 128, 128)),
            ("20-30k", Rgb::new(0, 0, 0)),
        ];
        let model = LegendModelBuilder::new()
            .build(&record(MapType::Continuous, &tokens))
            .unwrap();
        let inference = model.infer(&Rgb::new(255, 255, 255));
        assert_eq!(inference.unit, Unit::Suffix('%'));
        assert_eq!(inference.value, Some(5.0));
    }

    #[test]
    fn test_empty_legend_rejected() {
        let tokens = [("N/A", Rgb::new(1, 1, 1)), ("-", Rgb::new(2, 2, 2))];
        let err = LegendModelBuilder::new()
            .build(&record(MapType::Discrete, &tokens))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyLegend { .. }));
    }

    #[test]
    fn test_lab_metric_from_config() {
        let config = LegendModelConfig {
            color_metric: ColorMetric::Lab,
        };
        let tokens = [("1", Rgb::new(255, 0, 0)), ("2", Rgb::new(0, 0, 255))];
        let model = LegendModelBuilder::with_config(&config)
            .build(&record(MapType::Discrete, &tokens))
            .unwrap();
        assert_eq!(model.infer(&Rgb::new(230, 20, 30)).value, Some(1.0));
    }
}
