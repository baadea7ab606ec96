//! Nearest-color lookup for discrete legends

use crate::color::{ColorMetric, Rgb};
use crate::legend::Unit;
use crate::model::Inference;

/// One legend swatch with its value
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub color: Rgb,
    pub value: f64,
    pub unit: Unit,
}

/// 1-nearest-neighbour classifier over the legend swatches
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteNearestColor {
    references: Vec<Reference>,
    metric: ColorMetric,
}

impl DiscreteNearestColor {
    pub fn new(references: Vec<Reference>, metric: ColorMetric) -> Self {
        Self { references, metric }
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Index of the closest reference and its distance.
    ///
    /// Ties keep the earliest reference in legend order.
    pub fn nearest(&self, color: &Rgb) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, reference) in self.references.iter().enumerate() {
            let distance = self.metric.distance(color, &reference.color);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }
        best
    }

    pub fn infer(&self, color: &Rgb) -> Inference {
        match self.nearest(color) {
            Some((i, _)) => {
                let reference = &self.references[i];
                Inference {
                    value: Some(reference.value),
                    unit: reference.unit,
                }
            }
            None => Inference::missing(Unit::Unspecified),
        }
    }
}
