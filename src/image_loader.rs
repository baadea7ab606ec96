//! Image loading and cropping for map and legend images
//!
//! All decoded images are returned as `image::RgbImage`, so pixels are in
//! red-green-blue order everywhere downstream. Raw buffers from libraries
//! that store blue-green-red are reordered here, once, via
//! [`ChannelOrder`].
//!
//! ## Supported Formats
//!
//! PNG and JPEG, via the `image` crate.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::{ImageReader, RgbImage};
use serde::{Deserialize, Serialize};

use crate::color::ChannelOrder;
use crate::error::{ExtractionError, Result};

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

/// Get list of all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &["jpg", "jpeg", "png"]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}

/// Load an image from disk as RGB
///
/// # Errors
///
/// Returns `ExtractionError::ImageLoad` if the file cannot be opened or
/// decoded, and `InvalidParameter` for unsupported extensions.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    if ImageFormat::from_extension(path).is_none() {
        return Err(ExtractionError::InvalidParameter {
            parameter: "image format".into(),
            value: path.display().to_string(),
        });
    }

    let reader = ImageReader::open(path).map_err(|e| {
        ExtractionError::image_load(format!("Failed to open image file: {}", path.display()), e)
    })?;

    let img = reader.decode().map_err(|e| {
        ExtractionError::image_load(format!("Failed to decode image: {}", path.display()), e)
    })?;

    Ok(img.to_rgb8())
}

/// Build an RGB image from a tightly packed 3-channel buffer stored in `order`
pub fn image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    order: ChannelOrder,
) -> Result<RgbImage> {
    let expected = width as usize * height as usize * 3;
    if data.len() != expected {
        return Err(ExtractionError::InvalidParameter {
            parameter: "raw image buffer".into(),
            value: format!("{} bytes for {}x{} (expected {})", data.len(), width, height, expected),
        });
    }

    let rgb: Vec<u8> = data
        .chunks_exact(3)
        .flat_map(|px| order.to_rgb([px[0], px[1], px[2]]))
        .collect();

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| ExtractionError::Processing("raw buffer does not fit image".into()))
}

/// Pixel box `(y0, x0, y1, x1)`, end-exclusive, as written in `output_objects.csv`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub y0: u32,
    pub x0: u32,
    pub y1: u32,
    pub x1: u32,
}

impl BoundingBox {
    pub fn new(y0: u32, x0: u32, y1: u32, x1: u32) -> Self {
        Self { y0, x0, y1, x1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.y0, self.x0, self.y1, self.x1)
    }
}

impl FromStr for BoundingBox {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ExtractionError::InvalidParameter {
            parameter: "bounding box".into(),
            value: s.to_string(),
        };

        let values: Vec<u32> = s
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(|part| part.trim().parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<_>>()?;

        match values.as_slice() {
            [y0, x0, y1, x1] => Ok(BoundingBox::new(*y0, *x0, *y1, *x1)),
            _ => Err(invalid()),
        }
    }
}

/// Crop `image` to `bbox`, clamped to the image bounds
///
/// # Errors
///
/// Returns `InvalidParameter` if nothing of the box lies inside the image.
pub fn crop(image: &RgbImage, bbox: &BoundingBox) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    let x0 = bbox.x0.min(width);
    let y0 = bbox.y0.min(height);
    let x1 = bbox.x1.min(width);
    let y1 = bbox.y1.min(height);

    if x1 <= x0 || y1 <= y0 {
        return Err(ExtractionError::InvalidParameter {
            parameter: "crop box".into(),
            value: format!("{} outside {}x{} image", bbox, width, height),
        });
    }

    Ok(image::imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image())
}
