//! Color space conversion and color distance
//!
//! Provides the conversions the legend models need:
//! - 8-bit RGB to CIE Lab (D65)
//! - Hex color representation
//! - Distance metrics for nearest-color matching

use palette::{FromColor, Lab, Srgb};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::{ExtractionError, Result};

/// Distance used to compare a region color against legend swatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMetric {
    /// Sum of squared RGB channel differences
    #[default]
    Rgb,
    /// CIE76 ΔE in Lab space
    Lab,
}

impl ColorMetric {
    pub fn distance(&self, a: &Rgb, b: &Rgb) -> f64 {
        match self {
            ColorMetric::Rgb => a.squared_distance(b) as f64,
            ColorMetric::Lab => {
                let converter = ColorConverter::new();
                converter.delta_e(converter.rgb_to_lab(a), converter.rgb_to_lab(b)) as f64
            }
        }
    }
}

/// Color converter between 8-bit RGB, Lab and hex strings
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorConverter;

impl ColorConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert an 8-bit RGB color to Lab under D65
    pub fn rgb_to_lab(&self, color: &Rgb) -> Lab {
        let srgb: Srgb<u8> = (*color).into();
        Lab::from_color(srgb.into_format::<f32>())
    }

    /// Convert to a hexadecimal color string (e.g. "#FF0000")
    pub fn to_hex(&self, color: &Rgb) -> String {
        format!("#{:02X}{:02X}{:02X}", color.red, color.green, color.blue)
    }

    /// Parse a hexadecimal color string, with or without leading `#`
    ///
    /// # Errors
    ///
    /// Returns error if hex string is invalid
    pub fn hex_to_rgb(&self, hex: &str) -> Result<Rgb> {
        let digits = hex.trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ExtractionError::InvalidParameter {
                parameter: "hex color".into(),
                value: hex.to_string(),
            });
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|e| ExtractionError::InvalidParameter {
                parameter: "hex color".into(),
                value: format!("{hex} ({e})"),
            })
        };

        Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Compute Delta E (CIE76, Euclidean distance in Lab)
    pub fn delta_e(&self, lab1: Lab, lab2: Lab) -> f32 {
        let dl = lab1.l - lab2.l;
        let da = lab1.a - lab2.a;
        let db = lab1.b - lab2.b;
        (dl * dl + da * da + db * db).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_lab_black() {
        let converter = ColorConverter::new();
        let lab = converter.rgb_to_lab(&Rgb::new(0, 0, 0));
        assert!(lab.l < 1.0);
    }

    #[test]
    fn test_rgb_to_lab_white() {
        let converter = ColorConverter::new();
        let lab = converter.rgb_to_lab(&Rgb::new(255, 255, 255));
        assert!(lab.l > 99.0);
        assert!(lab.a.abs() < 1.0);
        assert!(lab.b.abs() < 1.0);
    }

    #[test]
    fn test_to_hex() {
        let converter = ColorConverter::new();
        assert_eq!(converter.to_hex(&Rgb::new(255, 0, 0)), "#FF0000");
        assert_eq!(converter.to_hex(&Rgb::new(0, 255, 16)), "#00FF10");
    }

    #[test]
    fn test_hex_to_rgb() {
        let converter = ColorConverter::new();
        assert_eq!(converter.hex_to_rgb("#FF0000").unwrap(), Rgb::new(255, 0, 0));
        assert_eq!(converter.hex_to_rgb("00ff10").unwrap(), Rgb::new(0, 255, 16));
        assert!(converter.hex_to_rgb("#FF").is_err());
        assert!(converter.hex_to_rgb("#GGGGGG").is_err());
    }

    #[test]
    fn test_metrics_agree_on_identity() {
        let color = Rgb::new(40, 80, 120);
        assert_eq!(ColorMetric::Rgb.distance(&color, &color), 0.0);
        assert!(ColorMetric::Lab.distance(&color, &color) < 1e-3);
    }

    #[test]
    fn test_lab_metric_orders_like_rgb_for_clear_cases() {
        let red = Rgb::new(255, 0, 0);
        let near = Rgb::new(240, 10, 10);
        let far = Rgb::new(0, 0, 255);
        assert!(ColorMetric::Lab.distance(&red, &near) < ColorMetric::Lab.distance(&red, &far));
        assert!(ColorMetric::Rgb.distance(&red, &near) < ColorMetric::Rgb.distance(&red, &far));
    }
}
