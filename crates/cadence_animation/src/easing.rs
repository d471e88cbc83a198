// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curves applied to the normalized segment parameter.

use serde::{Deserialize, Serialize};

/// Iterations of the bisection used to invert the bezier x polynomial
const SOLVE_ITERATIONS: usize = 32;

/// Cubic bezier easing from `(0, 0)` to `(1, 1)` with two inner control points.
///
/// The x coordinates of the control points are kept inside `[0, 1]`, which
/// keeps the curve monotonic in x so it can be inverted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Easing {
    /// First control point `(x, y)`
    pub cp0: [f64; 2],
    /// Second control point `(x, y)`
    pub cp1: [f64; 2],
}

impl Easing {
    /// Identity easing, the default for every new keyframe
    pub const LINEAR: Easing = Easing { cp0: [0.0, 0.0], cp1: [1.0, 1.0] };
    /// Slow start
    pub const EASE_IN: Easing = Easing { cp0: [0.42, 0.0], cp1: [1.0, 1.0] };
    /// Slow end
    pub const EASE_OUT: Easing = Easing { cp0: [0.0, 0.0], cp1: [0.58, 1.0] };
    /// Slow start and end
    pub const EASE_IN_OUT: Easing = Easing { cp0: [0.42, 0.0], cp1: [0.58, 1.0] };

    /// Create an easing curve, clamping control x coordinates to `[0, 1]`
    pub fn new(cp0: [f64; 2], cp1: [f64; 2]) -> Self {
        Self {
            cp0: [cp0[0].clamp(0.0, 1.0), cp0[1]],
            cp1: [cp1[0].clamp(0.0, 1.0), cp1[1]],
        }
    }

    /// Whether this is the identity curve
    pub fn is_default(&self) -> bool {
        *self == Self::LINEAR
    }

    /// Remap a normalized parameter `u` in `[0, 1]`.
    pub fn convert_t(&self, u: f64) -> f64 {
        if self.is_default() {
            return u;
        }
        let u = u.clamp(0.0, 1.0);
        let s = self.solve_x(u);
        cubic(self.cp0[1], self.cp1[1], s)
    }

    fn solve_x(&self, x: f64) -> f64 {
        let mut lo = 0.0;
        let mut hi = 1.0;
        let mut mid = x;
        for _ in 0..SOLVE_ITERATIONS {
            let value = cubic(self.cp0[0], self.cp1[0], mid);
            if (value - x).abs() < 1e-9 {
                break;
            }
            if value < x {
                lo = mid;
            } else {
                hi = mid;
            }
            mid = 0.5 * (lo + hi);
        }
        mid
    }
}

impl Default for Easing {
    fn default() -> Self {
        Self::LINEAR
    }
}

/// Bezier polynomial with fixed end points 0 and 1
fn cubic(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * p1 * mt * mt * t + 3.0 * p2 * mt * t * t + t * t * t
}
