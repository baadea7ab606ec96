//! Color representation and conversion module
//!
//! This module defines the crate's single color type and the
//! distance metrics used to match region fills against legend swatches.

pub mod conversion;
pub mod rgb;

pub use conversion::{ColorConverter, ColorMetric};
pub use rgb::{ChannelOrder, Rgb};
