//! Timing - Tween duration and easing curves.

use crate::types::Timestamp;

/// Easing curve applied to tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicInOut,
}

impl Easing {
    /// Map linear progress `u` in `[0, 1]` onto the curve.
    pub fn apply(self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        match self {
            Easing::Linear => u,
            Easing::QuadIn => u * u,
            Easing::QuadOut => u * (2.0 - u),
            Easing::QuadInOut => {
                if u < 0.5 {
                    2.0 * u * u
                } else {
                    -1.0 + (4.0 - 2.0 * u) * u
                }
            }
            Easing::CubicInOut => {
                if u < 0.5 {
                    4.0 * u * u * u
                } else {
                    let v = 2.0 * u - 2.0;
                    0.5 * v * v * v + 1.0
                }
            }
        }
    }
}

/// How a state change is animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Tween length in milliseconds.
    pub duration: Timestamp,
    pub easing: Easing,
}

impl Timing {
    pub fn new(duration: Timestamp, easing: Easing) -> Self {
        Self { duration, easing }
    }

    pub fn linear(duration: Timestamp) -> Self {
        Self::new(duration, Easing::Linear)
    }

    /// Eased progress at `elapsed` milliseconds. Zero-length timings finish at once.
    pub fn progress(&self, elapsed: Timestamp) -> f64 {
        if self.duration == 0 {
            return 1.0;
        }
        self.easing.apply(elapsed as f64 / self.duration as f64)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new(250, Easing::QuadInOut)
    }
}
