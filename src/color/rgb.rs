//! 8-bit RGB color with an explicit channel order
//!
//! Every color inside the crate is stored red-green-blue. Buffers that come
//! from imaging libraries storing blue-green-red are reordered exactly once,
//! through [`ChannelOrder`], at the point where pixels enter the crate.

use std::fmt;
use std::str::FromStr;

use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::color::ColorConverter;
use crate::{ExtractionError, Result};

/// Channel layout of a raw 3-byte pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// red, green, blue
    #[default]
    Rgb,
    /// blue, green, red (OpenCV-style buffers)
    Bgr,
}

impl ChannelOrder {
    /// Reorder a pixel from this layout into red-green-blue
    pub fn to_rgb(self, channels: [u8; 3]) -> [u8; 3] {
        match self {
            ChannelOrder::Rgb => channels,
            ChannelOrder::Bgr => [channels[2], channels[1], channels[0]],
        }
    }
}

/// An sRGB color with 8-bit channels, always in red-green-blue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Build a color from raw channels stored in `order`
    pub fn from_channels(channels: [u8; 3], order: ChannelOrder) -> Self {
        let [red, green, blue] = order.to_rgb(channels);
        Self { red, green, blue }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Sum of squared per-channel differences
    pub fn squared_distance(&self, other: &Rgb) -> u32 {
        self.channels()
            .iter()
            .zip(other.channels().iter())
            .map(|(&a, &b)| {
                let d = a as i32 - b as i32;
                (d * d) as u32
            })
            .sum()
    }

    /// True when no channel differs by more than `tolerance`
    pub fn matches(&self, other: &Rgb, tolerance: u8) -> bool {
        self.channels()
            .iter()
            .zip(other.channels().iter())
            .all(|(&a, &b)| a.abs_diff(b) <= tolerance)
    }
}

impl From<Srgb<u8>> for Rgb {
    fn from(color: Srgb<u8>) -> Self {
        Self::new(color.red, color.green, color.blue)
    }
}

impl From<Rgb> for Srgb<u8> {
    fn from(color: Rgb) -> Self {
        Srgb::new(color.red, color.green, color.blue)
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(pixel: image::Rgb<u8>) -> Self {
        Self::from_channels(pixel.0, ChannelOrder::Rgb)
    }
}

/// Tuple form used by the CSV artifacts, e.g. `(255, 0, 0)`
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.red, self.green, self.blue)
    }
}

/// Parses the tuple form (numpy scalars included) or `#RRGGBB`
impl FromStr for Rgb {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ExtractionError::InvalidParameter {
            parameter: "rgb color".into(),
            value: s.to_string(),
        };

        let text = s.trim();
        if text.starts_with('#') {
            return ColorConverter::new().hex_to_rgb(text);
        }

        let inner = text
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let channels: Vec<u8> = inner
            .split(',')
            .map(|part| {
                // numpy 2 writes scalars as `np.uint8(12)`
                let part = part.trim();
                let part = part
                    .strip_prefix("np.uint8(")
                    .and_then(|p| p.strip_suffix(')'))
                    .unwrap_or(part);
                part.parse::<u8>().map_err(|_| invalid())
            })
            .collect::<Result<_>>()?;

        match channels.as_slice() {
            [red, green, blue] => Ok(Rgb::new(*red, *green, *blue)),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_reordering() {
        let color = Rgb::from_channels([10, 20, 30], ChannelOrder::Bgr);
        assert_eq!(color, Rgb::new(30, 20, 10));

        let same = Rgb::from_channels([10, 20, 30], ChannelOrder::Rgb);
        assert_eq!(same, Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_squared_distance() {
        let a = Rgb::new(255, 0, 0);
        let b = Rgb::new(250, 5, 5);
        assert_eq!(a.squared_distance(&b), 75);
        assert_eq!(a.squared_distance(&a), 0);
        assert_eq!(Rgb::new(0, 0, 0).squared_distance(&Rgb::new(255, 255, 255)), 195_075);
    }

    #[test]
    fn test_matches_with_tolerance() {
        let a = Rgb::new(100, 100, 100);
        assert!(a.matches(&Rgb::new(100, 100, 100), 0));
        assert!(!a.matches(&Rgb::new(101, 100, 100), 0));
        assert!(a.matches(&Rgb::new(103, 97, 100), 3));
    }

    #[test]
    fn test_display_and_parse() {
        let color = Rgb::new(12, 34, 56);
        assert_eq!(color.to_string(), "(12, 34, 56)");
        assert_eq!("(12, 34, 56)".parse::<Rgb>().unwrap(), color);
        assert_eq!("(12,34,56)".parse::<Rgb>().unwrap(), color);
        assert_eq!(
            "(np.uint8(12), np.uint8(34), np.uint8(56))".parse::<Rgb>().unwrap(),
            color
        );
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!("#0C2238".parse::<Rgb>().unwrap(), Rgb::new(12, 34, 56));
        assert_eq!(" #ff0000 ".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 0));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("12, 34, 56".parse::<Rgb>().is_err());
        assert!("(12, 34)".parse::<Rgb>().is_err());
        assert!("(12, 34, 300)".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_palette_roundtrip() {
        let color = Rgb::new(1, 2, 3);
        let srgb: Srgb<u8> = color.into();
        assert_eq!(Rgb::from(srgb), color);
    }
}
