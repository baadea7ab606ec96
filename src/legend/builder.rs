//! Legend reading: OCR tokens plus swatch samples to legend entries

use image::RgbImage;
use tracing::{debug, warn};

use crate::config::SwatchSamplingConfig;
use crate::legend::{
    LegendEntry, LegendTokenParser, MapRecord, MapType, OcrToken, SwatchColorSampler, TextBox,
};

/// Reads the ordered legend entries of one cropped legend image
#[derive(Debug, Clone, Default)]
pub struct LegendReader {
    parser: LegendTokenParser,
    sampler: SwatchColorSampler,
}

impl LegendReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &SwatchSamplingConfig) -> Self {
        Self {
            parser: LegendTokenParser::new(),
            sampler: SwatchColorSampler::with_config(config),
        }
    }

    /// Parse and sample every token, in the order OCR emitted them.
    ///
    /// Tokens whose swatch cannot be found are dropped; invalid labels are
    /// kept so the legend keeps its positional shape.
    pub fn read_entries(&self, legend: &RgbImage, tokens: &[OcrToken]) -> Vec<LegendEntry> {
        let mut entries = Vec::with_capacity(tokens.len());

        for token in tokens {
            let text_box = TextBox::from_quad(&token.quad);
            match self.sampler.sample(legend, &text_box, &token.text) {
                Ok(color) => {
                    let parsed = self.parser.parse(&token.text);
                    debug!(
                        token = %token.text,
                        valid = parsed.is_valid(),
                        color = %color,
                        "legend entry"
                    );
                    entries.push(LegendEntry::new(parsed, color));
                }
                Err(e) => warn!("skipping legend token: {}", e),
            }
        }

        entries
    }

    /// Build the full record for one map
    pub fn read_record(
        &self,
        file_name: &str,
        map_type: MapType,
        map_title: &str,
        legend: &RgbImage,
        tokens: &[OcrToken],
    ) -> MapRecord {
        MapRecord {
            file_name: file_name.to_string(),
            map_type,
            map_title: map_title.to_string(),
            legend: self.read_entries(legend, tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use image::Rgb as Px;

    fn token(text: &str, x: f32, y: f32) -> OcrToken {
        OcrToken {
            quad: [[x, y], [x + 30.0, y], [x + 30.0, y + 10.0], [x, y + 10.0]],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    /// Three legend rows: swatch at columns 5..15, label starting at 25
    fn legend_image() -> RgbImage {
        let colors = [[240, 220, 220], [200, 100, 100], [0, 0, 0]];
        RgbImage::from_fn(80, 60, |x, y| {
            let row = (y / 20) as usize;
            if (5..15).contains(&x) && row < colors.len() {
                Px(colors[row])
            } else {
                Px([255, 255, 255])
            }
        })
    }

    #[test]
    fn test_read_entries_in_order() {
        let tokens = vec![
            token("0-10", 25.0, 2.0),
            token("N/A", 25.0, 22.0),
            token("20-30%", 25.0, 42.0),
        ];
        let entries = LegendReader::new().read_entries(&legend_image(), &tokens);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].color, Rgb::new(240, 220, 220));
        assert_eq!(entries[0].value(), Some(5.0));
        assert!(!entries[1].is_valid());
        assert_eq!(entries[1].color, Rgb::new(200, 100, 100));
        assert_eq!(entries[2].value(), Some(25.0));
        assert_eq!(entries[2].unit.to_string(), "%");
    }

    #[test]
    fn test_unsampled_tokens_are_dropped() {
        // second token sits left of every swatch: the scan overruns
        let tokens = vec![token("1", 25.0, 2.0), token("2", 3.0, 22.0)];
        let record = LegendReader::new().read_record(
            "m.png",
            MapType::Discrete,
            "Rates",
            &legend_image(),
            &tokens,
        );

        assert_eq!(record.legend.len(), 1);
        assert_eq!(record.legend[0].value(), Some(1.0));
        assert_eq!(record.map_title, "Rates");
    }
}
