// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scalar blending helpers and the monotone cubic parameter pack.
//!
//! [`Monospline`] precomputes everything that depends only on the abscissas
//! (keyframe times) and the evaluation point, so a track holding many scalars
//! can evaluate each of them with a handful of multiplications.

/// Linear interpolation between two scalars, exact at `t == 0` and `t == 1`
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Linear interpolation of two 2D points
#[inline]
pub fn lerp_2(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t)]
}

#[inline]
fn sign(s: f64) -> f64 {
    if s > 0.0 { 1.0 } else { -1.0 }
}

#[inline]
fn recip(h: f64) -> f64 {
    if h == 0.0 { 0.0 } else { 1.0 / h }
}

/// Parameter pack for shape preserving cubic interpolation over 3 or 4 samples.
///
/// Slopes follow Steffen's monotone method, so the curve never overshoots the
/// neighbouring samples. The pack is built once per update and shared by every
/// track; `t` is the eased linear parameter, kept for values that cannot be
/// splined (mismatched shapes, discrete data).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Monospline {
    h0: f64,
    h1: f64,
    h2: f64,
    inv_h0: f64,
    inv_h1: f64,
    inv_h2: f64,
    inv_h0_h1: f64,
    inv_h1_h2: f64,
    inv_h1_h1: f64,
    xx1: f64,
    xx2: f64,
    xx3: f64,
    /// Eased linear parameter of the segment
    pub t: f64,
}

impl Monospline {
    fn with_spans(h0: f64, h1: f64, h2: f64, xx1: f64, t: f64) -> Self {
        Self {
            h0,
            h1,
            h2,
            inv_h0: recip(h0),
            inv_h1: recip(h1),
            inv_h2: recip(h2),
            inv_h0_h1: recip(h0 + h1),
            inv_h1_h2: recip(h1 + h2),
            inv_h1_h1: recip(h1 * h1),
            xx1,
            xx2: xx1 * xx1,
            xx3: xx1 * xx1 * xx1,
            t,
        }
    }

    /// Pack for the first segment of a run: samples at `x1, x2, x3`, no predecessor.
    pub fn first(x1: f64, x2: f64, x3: f64, x: f64, t: f64) -> Self {
        Self::with_spans(0.0, x2 - x1, x3 - x2, x - x1, t)
    }

    /// Pack for an inner segment: samples at `x0, x1, x2, x3`, evaluated in `[x1, x2]`.
    pub fn mid(x0: f64, x1: f64, x2: f64, x3: f64, x: f64, t: f64) -> Self {
        Self::with_spans(x1 - x0, x2 - x1, x3 - x2, x - x1, t)
    }

    /// Pack for the last segment of a run: samples at `x0, x1, x2`, no successor.
    pub fn end(x0: f64, x1: f64, x2: f64, x: f64, t: f64) -> Self {
        Self::with_spans(x1 - x0, x2 - x1, 0.0, x - x1, t)
    }

    /// Evaluate between `f1` and `f2` with only the following sample `f3` known.
    pub fn first_value(&self, f1: f64, f2: f64, f3: f64) -> f64 {
        let s1 = (f2 - f1) * self.inv_h1;
        let s2 = (f3 - f2) * self.inv_h2;
        let y1 = self.boundary_slope(s1, s2);
        let y2 = self.inner_slope(s1, s2, self.h1, self.h2, self.inv_h1_h2);
        self.hermite(f1, s1, y1, y2)
    }

    /// Evaluate between `f1` and `f2` with both neighbours known.
    pub fn value(&self, f0: f64, f1: f64, f2: f64, f3: f64) -> f64 {
        let s0 = (f1 - f0) * self.inv_h0;
        let s1 = (f2 - f1) * self.inv_h1;
        let s2 = (f3 - f2) * self.inv_h2;
        let y1 = self.inner_slope(s0, s1, self.h0, self.h1, self.inv_h0_h1);
        let y2 = self.inner_slope(s1, s2, self.h1, self.h2, self.inv_h1_h2);
        self.hermite(f1, s1, y1, y2)
    }

    /// Evaluate between `f1` and `f2` with only the preceding sample `f0` known.
    pub fn end_value(&self, f0: f64, f1: f64, f2: f64) -> f64 {
        let s0 = (f1 - f0) * self.inv_h0;
        let s1 = (f2 - f1) * self.inv_h1;
        let y1 = self.inner_slope(s0, s1, self.h0, self.h1, self.inv_h0_h1);
        let y2 = self.boundary_slope(s1, s0);
        self.hermite(f1, s1, y1, y2)
    }

    fn inner_slope(&self, sa: f64, sb: f64, ha: f64, hb: f64, inv_sum: f64) -> f64 {
        let p = (hb * sa + ha * sb) * inv_sum;
        (sign(sa) + sign(sb)) * sa.abs().min(sb.abs()).min(0.5 * p.abs())
    }

    /// One sided slope at an open end, clamped to keep the segment monotone
    fn boundary_slope(&self, s_near: f64, s_far: f64) -> f64 {
        let w = self.h1 * recip(self.h0.max(self.h2) + self.h1);
        let p = s_near * (1.0 + w) - s_far * w;
        if p * s_near <= 0.0 {
            0.0
        } else if p.abs() > 2.0 * s_near.abs() {
            2.0 * s_near
        } else {
            p
        }
    }

    fn hermite(&self, f1: f64, s1: f64, y1: f64, y2: f64) -> f64 {
        let a = (y1 + y2 - 2.0 * s1) * self.inv_h1_h1;
        let b = (3.0 * s1 - 2.0 * y1 - y2) * self.inv_h1;
        a * self.xx3 + b * self.xx2 + y1 * self.xx1 + f1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
        assert_eq!(lerp_2([0.0, 10.0], [10.0, 0.0], 0.25), [2.5, 7.5]);
    }

    #[test]
    fn test_lerp_is_exact_at_both_ends() {
        for (a, b) in [(5.28, -4.9), (0.1, 0.7), (1e16, 3.3), (-0.3, 0.2)] {
            assert_eq!(lerp(a, b, 0.0), a);
            assert_eq!(lerp(a, b, 1.0), b);
        }
        assert_eq!(lerp_2([5.28, 0.1], [-4.9, 0.7], 1.0), [-4.9, 0.7]);
    }

    #[test]
    fn test_mid_hits_samples() {
        let at_start = Monospline::mid(0.0, 10.0, 20.0, 30.0, 10.0, 0.0);
        assert_abs_diff_eq!(at_start.value(1.0, 3.0, 4.0, 9.0), 3.0, epsilon = EPS);
        let at_end = Monospline::mid(0.0, 10.0, 20.0, 30.0, 20.0, 1.0);
        assert_abs_diff_eq!(at_end.value(1.0, 3.0, 4.0, 9.0), 4.0, epsilon = EPS);
    }

    #[test]
    fn test_first_and_end_hit_samples() {
        let first = Monospline::first(0.0, 10.0, 20.0, 10.0, 1.0);
        assert_abs_diff_eq!(first.first_value(0.0, 5.0, 6.0), 5.0, epsilon = EPS);
        let end = Monospline::end(0.0, 10.0, 20.0, 10.0, 0.0);
        assert_abs_diff_eq!(end.end_value(0.0, 5.0, 6.0), 5.0, epsilon = EPS);
    }

    #[test]
    fn test_monotone_data_stays_monotone() {
        let ys = [0.0, 1.0, 1.1, 5.0];
        let mut last = f64::MIN;
        for i in 0..=20 {
            let x = 10.0 + f64::from(i) * 0.5;
            let pack = Monospline::mid(0.0, 10.0, 20.0, 30.0, x, f64::from(i) / 20.0);
            let v = pack.value(ys[0], ys[1], ys[2], ys[3]);
            assert!(v >= last - EPS);
            assert!((1.0 - EPS..=1.1 + EPS).contains(&v));
            last = v;
        }
    }

    #[test]
    fn test_flat_segment_stays_flat() {
        let pack = Monospline::mid(0.0, 1.0, 2.0, 3.0, 1.5, 0.5);
        assert_abs_diff_eq!(pack.value(0.0, 2.0, 2.0, 7.0), 2.0, epsilon = EPS);
    }
}
