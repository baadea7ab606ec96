//! Legend swatch color sampling
//!
//! Locates the solid color block drawn to the left of a legend label and
//! samples one representative color from it:
//! - Start at the label's left edge, half-way down the label
//! - Scan left along the row above while pixels match the label background
//! - The first differing pixel is the swatch's right edge
//! - Continue left while pixels match the swatch color to find its left edge
//! - Sample the midpoint of that run

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::config::SwatchSamplingConfig;
use crate::{ExtractionError, Result};

/// Axis-aligned box of an OCR token inside the legend crop, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Derive the box from an OCR quadrilateral (top-left, top-right,
    /// bottom-right, bottom-left).
    pub fn from_quad(quad: &[[f32; 2]; 4]) -> Self {
        let [p0, p1, p2, _] = quad;
        Self {
            x: p0[0],
            y: p0[1],
            width: (p0[0] - p1[0]).abs(),
            height: (p1[1] - p2[1]).abs(),
        }
    }

    /// Pixel at the left edge, half-way down the token
    fn anchor(&self) -> (i64, i64) {
        let x = self.x as i64;
        let y = (self.y + (self.height / 2.0).floor()) as i64;
        (x, y)
    }
}

/// Samples the swatch color associated with a legend label
#[derive(Debug, Clone)]
pub struct SwatchColorSampler {
    tolerance: u8,
    max_scan_px: Option<u32>,
}

impl Default for SwatchColorSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SwatchColorSampler {
    /// Create a sampler that requires exact color matches
    pub fn new() -> Self {
        Self {
            tolerance: 0,
            max_scan_px: None,
        }
    }

    pub fn with_config(config: &SwatchSamplingConfig) -> Self {
        Self {
            tolerance: config.color_tolerance,
            max_scan_px: config.max_scan_px,
        }
    }

    /// Sample the swatch color next to `text_box`
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::SwatchNotFound` if the anchor lies outside
    /// the image or the scan reaches the left border (or the scan limit)
    /// before the background changes.
    pub fn sample(&self, image: &RgbImage, text_box: &TextBox, token: &str) -> Result<Rgb> {
        let not_found = |reason: String| ExtractionError::SwatchNotFound {
            token: token.to_string(),
            reason,
        };

        let (x1, y1) = text_box.anchor();
        let y2 = y1 - 1;

        let reference = pixel(image, x1, y1)
            .ok_or_else(|| not_found(format!("anchor ({x1}, {y1}) outside legend image")))?;
        if pixel(image, x1, y2).is_none() {
            return Err(not_found(format!("row {y2} outside legend image")));
        }

        let limit = self.max_scan_px.map(i64::from).unwrap_or(i64::MAX);

        // Walk left across the label background until the color changes
        let mut right_edge = x1;
        loop {
            let current = pixel(image, right_edge, y2)
                .ok_or_else(|| not_found("reached the left border before a swatch".into()))?;
            if !current.matches(&reference, self.tolerance) {
                break;
            }
            if x1 - right_edge >= limit {
                return Err(not_found(format!("no color change within {limit} px")));
            }
            right_edge -= 1;
        }

        // Walk left across the swatch itself
        let swatch = pixel(image, right_edge, y2)
            .ok_or_else(|| not_found("swatch edge outside legend image".into()))?;
        let mut left_edge = right_edge;
        while let Some(next) = pixel(image, left_edge - 1, y2) {
            if !next.matches(&swatch, self.tolerance) || right_edge - left_edge >= limit {
                break;
            }
            left_edge -= 1;
        }

        let center = (left_edge + right_edge) / 2;
        pixel(image, center, y2).ok_or_else(|| not_found("swatch center outside image".into()))
    }
}

fn pixel(image: &RgbImage, x: i64, y: i64) -> Option<Rgb> {
    let x = u32::try_from(x).ok()?;
    let y = u32::try_from(y).ok()?;
    image.get_pixel_checked(x, y).map(|p| Rgb::from(*p))
}
