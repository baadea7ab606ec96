//! Legend label parsing
//!
//! Turns one OCR token from a legend crop (`"10-20%"`, `"1,500"`, `"5k"`,
//! `"N/A"`) into a numeric range and a unit suffix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::legend::{
    PLACEHOLDER_TOKENS, RANGE_SEPARATOR, THOUSANDS_SEPARATOR, UNSPECIFIED_UNIT,
};

/// Unit suffix of a legend label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    /// The label carried no suffix; written as `u`
    #[default]
    Unspecified,
    /// Trailing non-digit character such as `%`, `k` or `M`
    Suffix(char),
}

impl Unit {
    pub fn is_specified(&self) -> bool {
        matches!(self, Unit::Suffix(_))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Unspecified => f.write_str(UNSPECIFIED_UNIT),
            Unit::Suffix(c) => write!(f, "{c}"),
        }
    }
}

impl FromStr for Unit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        Ok(match (chars.next(), chars.next()) {
            (Some(c), None) if s != UNSPECIFIED_UNIT => Unit::Suffix(c),
            _ => Unit::Unspecified,
        })
    }
}

impl From<String> for Unit {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(unit) => unit,
            Err(never) => match never {},
        }
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.to_string()
    }
}

/// Closed numeric interval read from a legend label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub lower: f64,
    pub upper: f64,
}

impl ValueRange {
    pub fn single(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// Representative value used for inference
    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }
}

/// Outcome of parsing one legend token
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToken {
    pub raw_text: String,
    /// `None` when the token is a placeholder or not numeric
    pub range: Option<ValueRange>,
    pub unit: Unit,
}

impl ParsedToken {
    pub fn is_valid(&self) -> bool {
        self.range.is_some()
    }

    pub fn value(&self) -> Option<f64> {
        self.range.map(|r| r.midpoint())
    }
}

/// Parser for legend label text
#[derive(Debug, Clone, Copy, Default)]
pub struct LegendTokenParser;

impl LegendTokenParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw OCR token.
    ///
    /// Never fails: malformed text yields a token with `range == None`.
    pub fn parse(&self, raw: &str) -> ParsedToken {
        let invalid = || ParsedToken {
            raw_text: raw.to_string(),
            range: None,
            unit: Unit::Unspecified,
        };

        let trimmed = raw.trim();
        if PLACEHOLDER_TOKENS.contains(&trimmed) || !trimmed.chars().any(|c| c.is_ascii_digit()) {
            return invalid();
        }

        let cleaned: String = trimmed.chars().filter(|&c| c != THOUSANDS_SEPARATOR).collect();
        let (lower_text, upper_text) = split_range(&cleaned);

        let Some((lower, lower_unit)) = parse_bound(lower_text) else {
            return invalid();
        };
        let Some((upper, upper_unit)) = parse_bound(upper_text) else {
            return invalid();
        };

        // the upper bound's suffix wins; fall back to the lower bound's
        let unit = if upper_unit.is_specified() {
            upper_unit
        } else {
            lower_unit
        };

        ParsedToken {
            raw_text: raw.to_string(),
            range: Some(ValueRange { lower, upper }),
            unit,
        }
    }
}

/// Split `"10-20"` into its two bounds; a leading minus sign is not a separator.
fn split_range(text: &str) -> (&str, &str) {
    let separator = text
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == RANGE_SEPARATOR)
        .map(|(i, _)| i);

    match separator {
        Some(i) => (&text[..i], &text[i + RANGE_SEPARATOR.len_utf8()..]),
        None => (text, text),
    }
}

/// Parse one bound, peeling off a single trailing unit character.
fn parse_bound(text: &str) -> Option<(f64, Unit)> {
    let text = text.trim();
    let last = text.chars().last()?;

    let (number, unit) = if last.is_ascii_digit() {
        (text, Unit::Unspecified)
    } else {
        (&text[..text.len() - last.len_utf8()], Unit::Suffix(last))
    };

    // currency or comparison prefixes such as `$`, `<`, `>`
    let number = number
        .trim()
        .trim_start_matches(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'));

    number.parse::<f64>().ok().map(|v| (v, unit))
}
