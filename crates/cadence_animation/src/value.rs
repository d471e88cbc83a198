// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values stored per keyframe in the animation tracks.
//!
//! Blendable values implement [`Interpolatable`]; drawings and speech are
//! discrete and only ever snap to a keyframe.

use crate::interpolation::{lerp, lerp_2, Monospline};
use serde::{Deserialize, Serialize};

/// A value that can be blended between keyframes.
///
/// The monospline variants mirror [`Monospline`]'s evaluation functions: the
/// segment always runs from the second to the third argument for the mid
/// form, from the first to the second for the first form, and from the second
/// to the third for the end form.
pub trait Interpolatable: Clone {
    /// Blend from `f0` (`t == 0`) to `f1` (`t == 1`)
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self;

    /// Monotone cubic from `f1` to `f2`, shaped by the following `f3`
    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self;

    /// Monotone cubic from `f1` to `f2`, shaped by `f0` and `f3`
    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self;

    /// Monotone cubic from `f1` to `f2`, shaped by the preceding `f0`
    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self;
}

impl Interpolatable for f64 {
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self {
        lerp(*f0, *f1, t)
    }

    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        ms.first_value(*f1, *f2, *f3)
    }

    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        ms.value(*f0, *f1, *f2, *f3)
    }

    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self {
        ms.end_value(*f0, *f1, *f2)
    }
}

impl Interpolatable for [f64; 2] {
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self {
        lerp_2(*f0, *f1, t)
    }

    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        [ms.first_value(f1[0], f2[0], f3[0]), ms.first_value(f1[1], f2[1], f3[1])]
    }

    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        [ms.value(f0[0], f1[0], f2[0], f3[0]), ms.value(f0[1], f1[1], f2[1], f3[1])]
    }

    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self {
        [ms.end_value(f0[0], f1[0], f2[0]), ms.end_value(f0[1], f1[1], f2[1])]
    }
}

/// A 2D point in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn xy(self) -> [f64; 2] {
        [self.x, self.y]
    }

    fn from_xy(xy: [f64; 2]) -> Self {
        Self { x: xy[0], y: xy[1] }
    }
}

impl Interpolatable for Point {
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self {
        Self::from_xy(<[f64; 2]>::linear(&f0.xy(), &f1.xy(), t))
    }

    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        Self::from_xy(<[f64; 2]>::first_monospline(&f1.xy(), &f2.xy(), &f3.xy(), ms))
    }

    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        Self::from_xy(<[f64; 2]>::monospline(&f0.xy(), &f1.xy(), &f2.xy(), &f3.xy(), ms))
    }

    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self {
        Self::from_xy(<[f64; 2]>::end_monospline(&f0.xy(), &f1.xy(), &f2.xy(), ms))
    }
}

/// A stroke: an ordered list of control points
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    /// Control points
    pub points: Vec<Point>,
}

impl Line {
    /// Create a line from points
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }
}

/// A hand drawn sketch snapshot; never blended
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Drawing {
    /// Strokes of the sketch
    pub lines: Vec<Line>,
}

impl Drawing {
    /// Create a drawing from strokes
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }
}

/// Outline of an animated shape (cell)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    /// Closed or open outline strokes
    pub lines: Vec<Line>,
}

impl Geometry {
    /// Create a geometry from outline strokes
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    /// Whether every geometry has the same stroke and point layout
    fn same_layout(geometries: &[&Geometry]) -> bool {
        let Some((first, rest)) = geometries.split_first() else {
            return true;
        };
        rest.iter().all(|g| {
            g.lines.len() == first.lines.len()
                && g.lines
                    .iter()
                    .zip(&first.lines)
                    .all(|(a, b)| a.points.len() == b.points.len())
        })
    }

    /// Build a geometry point by point from same-layout inputs
    fn map_points(
        layout: &Geometry,
        mut f: impl FnMut(usize, usize) -> Point,
    ) -> Geometry {
        let lines = layout
            .lines
            .iter()
            .enumerate()
            .map(|(li, line)| Line::new((0..line.points.len()).map(|pi| f(li, pi)).collect()))
            .collect();
        Geometry { lines }
    }

    /// Snap to whichever end of the segment is closer in parameter space
    fn nearest(f1: &Geometry, f2: &Geometry, t: f64) -> Geometry {
        if t < 0.5 { f1.clone() } else { f2.clone() }
    }
}

impl Interpolatable for Geometry {
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self {
        if !Self::same_layout(&[f0, f1]) {
            return Self::nearest(f0, f1, t);
        }
        Self::map_points(f0, |l, p| {
            Point::linear(&f0.lines[l].points[p], &f1.lines[l].points[p], t)
        })
    }

    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        if !Self::same_layout(&[f1, f2, f3]) {
            return Self::linear(f1, f2, ms.t);
        }
        Self::map_points(f1, |l, p| {
            Point::first_monospline(
                &f1.lines[l].points[p],
                &f2.lines[l].points[p],
                &f3.lines[l].points[p],
                ms,
            )
        })
    }

    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        if !Self::same_layout(&[f0, f1, f2, f3]) {
            return Self::linear(f1, f2, ms.t);
        }
        Self::map_points(f1, |l, p| {
            Point::monospline(
                &f0.lines[l].points[p],
                &f1.lines[l].points[p],
                &f2.lines[l].points[p],
                &f3.lines[l].points[p],
                ms,
            )
        })
    }

    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self {
        if !Self::same_layout(&[f0, f1, f2]) {
            return Self::linear(f1, f2, ms.t);
        }
        Self::map_points(f1, |l, p| {
            Point::end_monospline(
                &f0.lines[l].points[p],
                &f1.lines[l].points[p],
                &f2.lines[l].points[p],
                ms,
            )
        })
    }
}

/// Shortest signed hue difference from `from` to `to`, in turns, in `[-0.5, 0.5)`
fn hue_delta(from: f64, to: f64) -> f64 {
    (to - from + 0.5).rem_euclid(1.0) - 0.5
}

/// Unwrap a run of hues so consecutive entries never differ by more than half a turn
fn unwrap_hues<const N: usize>(hues: [f64; N]) -> [f64; N] {
    let mut out = hues;
    for i in 1..N {
        out[i] = out[i - 1] + hue_delta(out[i - 1], hues[i]);
    }
    out
}

/// Color in hue / saturation / lightness space.
///
/// Hue is measured in turns (`0.0..1.0`) and blends along the shorter arc of
/// the color wheel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Hue in turns
    pub hue: f64,
    /// Saturation in `[0, 1]`
    pub saturation: f64,
    /// Lightness in `[0, 1]`
    pub lightness: f64,
}

impl Color {
    /// Neutral white
    pub const WHITE: Color = Color { hue: 0.0, saturation: 0.0, lightness: 1.0 };
    /// Neutral black
    pub const BLACK: Color = Color { hue: 0.0, saturation: 0.0, lightness: 0.0 };

    /// Create a color, wrapping hue into `[0, 1)`
    pub fn new(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self { hue: hue.rem_euclid(1.0), saturation, lightness }
    }

    fn from_unwrapped(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self::new(hue, saturation.clamp(0.0, 1.0), lightness.clamp(0.0, 1.0))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Interpolatable for Color {
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self {
        // The unwrapped hue sum does not round-trip through `rem_euclid`
        if t <= 0.0 {
            return *f0;
        }
        if t >= 1.0 {
            return *f1;
        }
        let hue = f0.hue + hue_delta(f0.hue, f1.hue) * t;
        Self::from_unwrapped(
            hue,
            lerp(f0.saturation, f1.saturation, t),
            lerp(f0.lightness, f1.lightness, t),
        )
    }

    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        let [h1, h2, h3] = unwrap_hues([f1.hue, f2.hue, f3.hue]);
        Self::from_unwrapped(
            ms.first_value(h1, h2, h3),
            ms.first_value(f1.saturation, f2.saturation, f3.saturation),
            ms.first_value(f1.lightness, f2.lightness, f3.lightness),
        )
    }

    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        let [h0, h1, h2, h3] = unwrap_hues([f0.hue, f1.hue, f2.hue, f3.hue]);
        Self::from_unwrapped(
            ms.value(h0, h1, h2, h3),
            ms.value(f0.saturation, f1.saturation, f2.saturation, f3.saturation),
            ms.value(f0.lightness, f1.lightness, f2.lightness, f3.lightness),
        )
    }

    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self {
        let [h0, h1, h2] = unwrap_hues([f0.hue, f1.hue, f2.hue]);
        Self::from_unwrapped(
            ms.end_value(h0, h1, h2),
            ms.end_value(f0.saturation, f1.saturation, f2.saturation),
            ms.end_value(f0.lightness, f1.lightness, f2.lightness),
        )
    }
}

/// Fill and stroke appearance of a cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Fill color
    pub color: Color,
    /// Stroke color
    pub line_color: Color,
    /// Stroke width in canvas units
    pub line_width: f64,
    /// Opacity in `[0, 1]`
    pub opacity: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            line_color: Color::BLACK,
            line_width: 1.0,
            opacity: 1.0,
        }
    }
}

impl Interpolatable for Material {
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self {
        Self {
            color: Color::linear(&f0.color, &f1.color, t),
            line_color: Color::linear(&f0.line_color, &f1.line_color, t),
            line_width: lerp(f0.line_width, f1.line_width, t).max(0.0),
            opacity: lerp(f0.opacity, f1.opacity, t).clamp(0.0, 1.0),
        }
    }

    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        Self {
            color: Color::first_monospline(&f1.color, &f2.color, &f3.color, ms),
            line_color: Color::first_monospline(&f1.line_color, &f2.line_color, &f3.line_color, ms),
            line_width: ms.first_value(f1.line_width, f2.line_width, f3.line_width).max(0.0),
            opacity: ms.first_value(f1.opacity, f2.opacity, f3.opacity).clamp(0.0, 1.0),
        }
    }

    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        Self {
            color: Color::monospline(&f0.color, &f1.color, &f2.color, &f3.color, ms),
            line_color: Color::monospline(
                &f0.line_color,
                &f1.line_color,
                &f2.line_color,
                &f3.line_color,
                ms,
            ),
            line_width: ms.value(f0.line_width, f1.line_width, f2.line_width, f3.line_width).max(0.0),
            opacity: ms.value(f0.opacity, f1.opacity, f2.opacity, f3.opacity).clamp(0.0, 1.0),
        }
    }

    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self {
        Self {
            color: Color::end_monospline(&f0.color, &f1.color, &f2.color, ms),
            line_color: Color::end_monospline(&f0.line_color, &f1.line_color, &f2.line_color, ms),
            line_width: ms.end_value(f0.line_width, f1.line_width, f2.line_width).max(0.0),
            opacity: ms.end_value(f0.opacity, f1.opacity, f2.opacity).clamp(0.0, 1.0),
        }
    }
}

/// Secondary oscillation layered on top of a transform
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Wiggle {
    /// Peak offset on each axis
    pub amplitude: [f64; 2],
    /// Oscillations per beat
    pub frequency: f64,
}

impl Wiggle {
    /// Offset of the oscillation at `phase` beats
    pub fn offset(&self, phase: f64) -> [f64; 2] {
        let s = (std::f64::consts::TAU * self.frequency * phase).sin();
        [self.amplitude[0] * s, self.amplitude[1] * s]
    }
}

impl Interpolatable for Wiggle {
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self {
        Self {
            amplitude: <[f64; 2]>::linear(&f0.amplitude, &f1.amplitude, t),
            frequency: lerp(f0.frequency, f1.frequency, t),
        }
    }

    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        Self {
            amplitude: <[f64; 2]>::first_monospline(&f1.amplitude, &f2.amplitude, &f3.amplitude, ms),
            frequency: ms.first_value(f1.frequency, f2.frequency, f3.frequency),
        }
    }

    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        Self {
            amplitude: <[f64; 2]>::monospline(
                &f0.amplitude,
                &f1.amplitude,
                &f2.amplitude,
                &f3.amplitude,
                ms,
            ),
            frequency: ms.value(f0.frequency, f1.frequency, f2.frequency, f3.frequency),
        }
    }

    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self {
        Self {
            amplitude: <[f64; 2]>::end_monospline(&f0.amplitude, &f1.amplitude, &f2.amplitude, ms),
            frequency: ms.end_value(f0.frequency, f1.frequency, f2.frequency),
        }
    }
}

/// 2D transform of the whole animated object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation (x, y)
    pub translation: [f64; 2],
    /// Scale (x, y)
    pub scale: [f64; 2],
    /// Rotation in radians
    pub rotation: f64,
    /// Secondary oscillation
    pub wiggle: Wiggle,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
            wiggle: Wiggle::default(),
        }
    }
}

impl Interpolatable for Transform {
    fn linear(f0: &Self, f1: &Self, t: f64) -> Self {
        Self {
            translation: <[f64; 2]>::linear(&f0.translation, &f1.translation, t),
            scale: <[f64; 2]>::linear(&f0.scale, &f1.scale, t),
            rotation: lerp(f0.rotation, f1.rotation, t),
            wiggle: Wiggle::linear(&f0.wiggle, &f1.wiggle, t),
        }
    }

    fn first_monospline(f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        Self {
            translation: <[f64; 2]>::first_monospline(
                &f1.translation,
                &f2.translation,
                &f3.translation,
                ms,
            ),
            scale: <[f64; 2]>::first_monospline(&f1.scale, &f2.scale, &f3.scale, ms),
            rotation: ms.first_value(f1.rotation, f2.rotation, f3.rotation),
            wiggle: Wiggle::first_monospline(&f1.wiggle, &f2.wiggle, &f3.wiggle, ms),
        }
    }

    fn monospline(f0: &Self, f1: &Self, f2: &Self, f3: &Self, ms: &Monospline) -> Self {
        Self {
            translation: <[f64; 2]>::monospline(
                &f0.translation,
                &f1.translation,
                &f2.translation,
                &f3.translation,
                ms,
            ),
            scale: <[f64; 2]>::monospline(&f0.scale, &f1.scale, &f2.scale, &f3.scale, ms),
            rotation: ms.value(f0.rotation, f1.rotation, f2.rotation, f3.rotation),
            wiggle: Wiggle::monospline(&f0.wiggle, &f1.wiggle, &f2.wiggle, &f3.wiggle, ms),
        }
    }

    fn end_monospline(f0: &Self, f1: &Self, f2: &Self, ms: &Monospline) -> Self {
        Self {
            translation: <[f64; 2]>::end_monospline(
                &f0.translation,
                &f1.translation,
                &f2.translation,
                ms,
            ),
            scale: <[f64; 2]>::end_monospline(&f0.scale, &f1.scale, &f2.scale, ms),
            rotation: ms.end_value(f0.rotation, f1.rotation, f2.rotation),
            wiggle: Wiggle::end_monospline(&f0.wiggle, &f1.wiggle, &f2.wiggle, ms),
        }
    }
}

/// Text overlay (speech balloon); never blended
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Speech {
    /// Displayed text
    pub text: String,
}

impl Speech {
    /// Create a speech value
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
