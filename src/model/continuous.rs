//! Piecewise-linear color ramp for continuous legends
//!
//! Consecutive legend stops form the ramp's segments. For a query color
//! each segment yields a blend fraction `A` (1 at the segment's first stop,
//! 0 at its second); the segment accepts when `A` lies in
//! `[delta, 1 + delta]`, with a widened window on the first and last
//! segments. The last accepting segment determines the value.

use crate::color::Rgb;
use crate::constants::ramp::{FIRST_PAIR_DELTA, INTERIOR_PAIR_DELTA, LAST_PAIR_DELTA};
use crate::legend::Unit;
use crate::model::Inference;

/// A ramp stop: swatch color and the value it stands for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampStop {
    pub color: Rgb,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousRamp {
    stops: Vec<RampStop>,
    unit: Unit,
}

impl ContinuousRamp {
    /// `unit` is the unit of the legend's first entry
    pub fn new(stops: Vec<RampStop>, unit: Unit) -> Self {
        Self { stops, unit }
    }

    pub fn stops(&self) -> &[RampStop] {
        &self.stops
    }

    /// Acceptance window offset for segment `index`
    fn window_delta(&self, index: usize) -> f64 {
        if index == 0 {
            FIRST_PAIR_DELTA
        } else if index + 2 == self.stops.len() {
            LAST_PAIR_DELTA
        } else {
            INTERIOR_PAIR_DELTA
        }
    }

    /// Interpolate the value of `color`.
    ///
    /// When no segment accepts, the value is `None`.
    pub fn infer(&self, color: &Rgb) -> Inference {
        let mut assigned = None;

        for (index, pair) in self.stops.windows(2).enumerate() {
            let (first, second) = (pair[0], pair[1]);
            let delta = self.window_delta(index);
            let a = blend_fraction(color, &first.color, &second.color);

            if delta <= a && a <= 1.0 + delta {
                assigned = Some(a * first.value + (1.0 - a) * second.value);
            }
        }

        Inference {
            value: assigned,
            unit: self.unit,
        }
    }
}

/// Mean of the per-channel positions of `color` between `first` (1) and
/// `second` (0).
///
/// Channels where the stops agree, and channels whose position is exactly
/// zero, are left out of the mean; with nothing left the fraction is 0.
pub fn blend_fraction(color: &Rgb, first: &Rgb, second: &Rgb) -> f64 {
    let fractions: Vec<f64> = color
        .channels()
        .iter()
        .zip(first.channels().iter().zip(second.channels().iter()))
        .filter(|(_, (c1, c2))| c1 != c2)
        .map(|(&q, (&c1, &c2))| (q as f64 - c2 as f64) / (c1 as f64 - c2 as f64))
        .filter(|&a| a != 0.0)
        .collect();

    if fractions.is_empty() {
        0.0
    } else {
        fractions.iter().sum::<f64>() / fractions.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stop((red, green, blue): (u8, u8, u8), value: f64) -> RampStop {
        RampStop {
            color: Rgb::new(red, green, blue),
            value,
        }
    }

    /// white -> mid grey -> black, values 10, 20, 30
    fn grey_ramp() -> ContinuousRamp {
        ContinuousRamp::new(
            vec![
                stop((255, 255, 255), 10.0),
                stop((128, 128, 128), 20.0),
                stop((0, 0, 0), 30.0),
            ],
            Unit::Suffix('%'),
        )
    }

    #[test]
    fn test_blend_fraction_endpoints() {
        let first = Rgb::new(200, 100, 0);
        let second = Rgb::new(100, 100, 200);
        assert_relative_eq!(blend_fraction(&first, &first, &second), 1.0);
        // the second stop's color gives 0 on every differing channel
        assert_relative_eq!(blend_fraction(&second, &first, &second), 0.0);
        let mid = Rgb::new(150, 100, 100);
        assert_relative_eq!(blend_fraction(&mid, &first, &second), 0.5);
    }

    #[test]
    fn test_blend_fraction_equal_stops() {
        let stop = Rgb::new(7, 7, 7);
        assert_eq!(blend_fraction(&Rgb::new(90, 1, 3), &stop, &stop), 0.0);
    }

    #[test]
    fn test_first_stop_returns_own_value() {
        let ramp = grey_ramp();
        let inference = ramp.infer(&Rgb::new(255, 255, 255));
        assert_relative_eq!(inference.value.unwrap(), 10.0);
        assert_eq!(inference.unit, Unit::Suffix('%'));
    }

    #[test]
    fn test_last_stop_returns_own_value() {
        let inference = grey_ramp().infer(&Rgb::new(0, 0, 0));
        assert_relative_eq!(inference.value.unwrap(), 30.0);
    }

    #[test]
    fn test_window_beyond_ramp_start() {
        // colors past the first stop extrapolate: A in [1, 2]
        let ramp = ContinuousRamp::new(
            vec![
                stop((100, 100, 100), 10.0),
                stop((50, 50, 50), 20.0),
                stop((0, 0, 0), 30.0),
            ],
            Unit::Unspecified,
        );
        // A = (125 - 50) / 50 = 1.5 on the first segment
        let inference = ramp.infer(&Rgb::new(125, 125, 125));
        assert_relative_eq!(inference.value.unwrap(), 5.0);
    }

    #[test]
    fn test_last_segment_window() {
        let ramp = grey_ramp();
        // A = 32 / 128 = 0.25 on the last segment, inside [-0.5, 0.5]
        let inference = ramp.infer(&Rgb::new(32, 32, 32));
        assert_relative_eq!(inference.value.unwrap(), 0.25 * 20.0 + 0.75 * 30.0);
    }

    #[test]
    fn test_no_accepting_segment_is_missing() {
        // the middle stop: A = 0 on the first segment, 1 on the last
        let inference = grey_ramp().infer(&Rgb::new(128, 128, 128));
        assert_eq!(inference.value, None);
        assert_eq!(inference.unit, Unit::Suffix('%'));
    }

    #[test]
    fn test_two_stop_ramp_uses_first_window() {
        let ramp = ContinuousRamp::new(
            vec![
                stop((200, 0, 0), 100.0),
                stop((100, 0, 0), 0.0),
            ],
            Unit::Unspecified,
        );
        assert_relative_eq!(ramp.infer(&Rgb::new(200, 0, 0)).value.unwrap(), 100.0);
        assert_relative_eq!(ramp.infer(&Rgb::new(250, 0, 0)).value.unwrap(), 150.0);
        assert_eq!(ramp.infer(&Rgb::new(150, 0, 0)).value, None);
    }

    #[test]
    fn test_interior_segment() {
        let ramp = ContinuousRamp::new(
            vec![
                stop((0, 0, 240), 0.0),
                stop((0, 0, 180), 10.0),
                stop((0, 0, 120), 20.0),
                stop((0, 0, 60), 30.0),
            ],
            Unit::Unspecified,
        );
        // A = (150 - 120) / 60 = 0.5 on the interior segment
        assert_relative_eq!(ramp.infer(&Rgb::new(0, 0, 150)).value.unwrap(), 15.0);
    }

    #[test]
    fn test_single_stop_has_no_segments() {
        let ramp = ContinuousRamp::new(
            vec![stop((1, 1, 1), 4.0)],
            Unit::Unspecified,
        );
        assert_eq!(ramp.infer(&Rgb::new(1, 1, 1)).value, None);
    }
}
