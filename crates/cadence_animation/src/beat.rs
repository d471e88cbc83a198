// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exact rational time.
//!
//! Keyframe times, loop offsets and durations are all [`Beat`]s so that long
//! timelines never accumulate floating point drift. Values are only converted
//! to `f64` at the last moment, when a blend parameter is needed.

use crate::error::BeatError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A reduced fraction of beats.
///
/// The denominator is always positive and `gcd(numerator, denominator) == 1`,
/// so derived equality and hashing are exact. Arithmetic is carried out in
/// 128 bits and reduced before narrowing back, so only results that are
/// themselves unrepresentable overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct Beat {
    numerator: i64,
    denominator: i64,
}

pub(crate) fn gcd(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Reduce `numerator / denominator` and narrow it; `denominator` is non-zero
fn reduce(numerator: i128, denominator: i128) -> Option<Beat> {
    let g = gcd(numerator, denominator).max(1);
    let sign = denominator.signum();
    Some(Beat {
        numerator: i64::try_from(sign * numerator / g).ok()?,
        denominator: i64::try_from(sign * denominator / g).ok()?,
    })
}

#[track_caller]
fn overflow(op: &str) -> ! {
    panic!("Beat overflow in {op}")
}

impl Beat {
    /// Zero beats
    pub const ZERO: Beat = Beat { numerator: 0, denominator: 1 };
    /// One beat
    pub const ONE: Beat = Beat { numerator: 1, denominator: 1 };

    /// Create a beat value from a fraction.
    ///
    /// # Panics
    /// Panics if `denominator` is zero or the reduced fraction overflows.
    #[track_caller]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self::try_new(numerator, denominator).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Create a beat value, rejecting a zero denominator
    pub fn try_new(numerator: i64, denominator: i64) -> Result<Self, BeatError> {
        if denominator == 0 {
            return Err(BeatError::ZeroDenominator { numerator });
        }
        reduce(numerator.into(), denominator.into()).ok_or(BeatError::Overflow)
    }

    /// Whole number of beats
    pub const fn whole(beats: i64) -> Self {
        Self { numerator: beats, denominator: 1 }
    }

    /// Numerator of the reduced fraction
    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    /// Denominator of the reduced fraction (always positive)
    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Whether this is exactly zero
    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// Lossy conversion used when building blend parameters
    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Ratio `self / other` as a float.
    ///
    /// # Panics
    /// Panics if `other` is zero.
    #[track_caller]
    pub fn ratio(self, other: Beat) -> f64 {
        assert!(!other.is_zero(), "division of a Beat by zero");
        match self.checked_div(other) {
            Some(ratio) => ratio.to_f64(),
            None => self.to_f64() / other.to_f64(),
        }
    }

    /// Exact sum, `None` if it does not fit
    pub fn checked_add(self, rhs: Beat) -> Option<Beat> {
        let (a, b) = (i128::from(self.denominator), i128::from(rhs.denominator));
        let numerator = i128::from(self.numerator) * b + i128::from(rhs.numerator) * a;
        reduce(numerator, a * b)
    }

    /// Exact difference, `None` if it does not fit
    pub fn checked_sub(self, rhs: Beat) -> Option<Beat> {
        let (a, b) = (i128::from(self.denominator), i128::from(rhs.denominator));
        let numerator = i128::from(self.numerator) * b - i128::from(rhs.numerator) * a;
        reduce(numerator, a * b)
    }

    /// Exact product, `None` if it does not fit
    pub fn checked_mul(self, rhs: Beat) -> Option<Beat> {
        reduce(
            i128::from(self.numerator) * i128::from(rhs.numerator),
            i128::from(self.denominator) * i128::from(rhs.denominator),
        )
    }

    /// Exact quotient, `None` if `rhs` is zero or the result does not fit
    pub fn checked_div(self, rhs: Beat) -> Option<Beat> {
        if rhs.is_zero() {
            return None;
        }
        reduce(
            i128::from(self.numerator) * i128::from(rhs.denominator),
            i128::from(self.denominator) * i128::from(rhs.numerator),
        )
    }

    /// Least non-negative remainder of `self` modulo `|rhs|`, `None` if `rhs` is zero
    pub fn checked_rem_euclid(self, rhs: Beat) -> Option<Beat> {
        if rhs.is_zero() {
            return None;
        }
        let (a, b) = (i128::from(self.denominator), i128::from(rhs.denominator));
        let modulus = (i128::from(rhs.numerator) * a).abs();
        reduce((i128::from(self.numerator) * b).rem_euclid(modulus), a * b)
    }

    /// Least non-negative remainder of `self` modulo `|rhs|`.
    ///
    /// # Panics
    /// Panics if `rhs` is zero.
    #[track_caller]
    pub fn rem_euclid(self, rhs: Beat) -> Beat {
        assert!(!rhs.is_zero(), "division of a Beat by zero");
        self.checked_rem_euclid(rhs).unwrap_or_else(|| overflow("rem_euclid"))
    }
}

impl Default for Beat {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Beat {
    fn from(beats: i64) -> Self {
        Self::whole(beats)
    }
}

impl TryFrom<(i64, i64)> for Beat {
    type Error = BeatError;

    fn try_from((numerator, denominator): (i64, i64)) -> Result<Self, BeatError> {
        Self::try_new(numerator, denominator)
    }
}

impl From<Beat> for (i64, i64) {
    fn from(beat: Beat) -> Self {
        (beat.numerator, beat.denominator)
    }
}

impl PartialOrd for Beat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Beat {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.numerator) * i128::from(other.denominator);
        let rhs = i128::from(other.numerator) * i128::from(self.denominator);
        lhs.cmp(&rhs)
    }
}

impl Add for Beat {
    type Output = Beat;

    #[track_caller]
    fn add(self, rhs: Beat) -> Beat {
        self.checked_add(rhs).unwrap_or_else(|| overflow("add"))
    }
}

impl Sub for Beat {
    type Output = Beat;

    #[track_caller]
    fn sub(self, rhs: Beat) -> Beat {
        self.checked_sub(rhs).unwrap_or_else(|| overflow("sub"))
    }
}

impl Neg for Beat {
    type Output = Beat;

    #[track_caller]
    fn neg(self) -> Beat {
        Beat::ZERO.checked_sub(self).unwrap_or_else(|| overflow("neg"))
    }
}

impl Mul for Beat {
    type Output = Beat;

    #[track_caller]
    fn mul(self, rhs: Beat) -> Beat {
        self.checked_mul(rhs).unwrap_or_else(|| overflow("mul"))
    }
}

impl Div for Beat {
    type Output = Beat;

    #[track_caller]
    fn div(self, rhs: Beat) -> Beat {
        assert!(!rhs.is_zero(), "division of a Beat by zero");
        self.checked_div(rhs).unwrap_or_else(|| overflow("div"))
    }
}

impl AddAssign for Beat {
    #[track_caller]
    fn add_assign(&mut self, rhs: Beat) {
        *self = *self + rhs;
    }
}

impl SubAssign for Beat {
    #[track_caller]
    fn sub_assign(&mut self, rhs: Beat) {
        *self = *self - rhs;
    }
}

impl fmt::Display for Beat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reduction() {
        let b = Beat::new(6, -4);
        assert_eq!(b.numerator(), -3);
        assert_eq!(b.denominator(), 2);
        assert_eq!(Beat::new(0, 7), Beat::ZERO);
    }

    #[test]
    fn test_exact_accumulation() {
        let third = Beat::new(1, 3);
        let mut total = Beat::ZERO;
        for _ in 0..3_000 {
            total += third;
        }
        assert_eq!(total, Beat::whole(1_000));
    }

    #[test]
    fn test_ordering_and_arithmetic() {
        assert!(Beat::new(1, 3) < Beat::new(1, 2));
        assert_eq!(Beat::new(1, 2) + Beat::new(1, 3), Beat::new(5, 6));
        assert_eq!(Beat::new(1, 2) - Beat::new(1, 3), Beat::new(1, 6));
        assert_eq!(Beat::new(2, 3) * Beat::new(3, 4), Beat::new(1, 2));
        assert_eq!(Beat::new(1, 2) / Beat::new(1, 4), Beat::whole(2));
        assert_relative_eq!(Beat::new(5, 10).ratio(Beat::whole(10)), 0.05);
    }

    #[test]
    fn test_display() {
        assert_eq!(Beat::whole(4).to_string(), "4");
        assert_eq!(Beat::new(3, 6).to_string(), "1/2");
    }

    #[test]
    fn test_wide_intermediates_reduce() {
        let half = Beat::new(5_000_000_000_000_000_001, 2);
        assert_eq!(half + half, Beat::whole(5_000_000_000_000_000_001));
        let big = Beat::new(4_000_000_007, 3_000_000_019);
        assert_eq!(big * Beat::new(3_000_000_019, 4_000_000_007), Beat::ONE);
        assert_eq!(big - big, Beat::ZERO);
    }

    #[test]
    fn test_unrepresentable_sum() {
        let a = Beat::new(1, 4_000_000_007);
        let b = Beat::new(1, 3_000_000_019);
        assert_eq!(a.checked_add(b), None);
        assert_eq!(a.checked_sub(b), None);
        assert!(a < b || b < a);
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn test_unrepresentable_sum_panics() {
        let _ = Beat::new(1, 4_000_000_007) + Beat::new(1, 3_000_000_019);
    }

    #[test]
    fn test_rem_euclid() {
        assert_eq!(Beat::whole(1_000_000_000_003).rem_euclid(Beat::whole(12)), Beat::whole(7));
        assert_eq!(Beat::new(-1, 2).rem_euclid(Beat::whole(3)), Beat::new(5, 2));
        assert_eq!(Beat::new(7, 3).rem_euclid(Beat::new(1, 2)), Beat::new(1, 3));
        assert_eq!(Beat::ONE.checked_rem_euclid(Beat::ZERO), None);
    }

    #[test]
    fn test_zero_denominator_is_rejected() {
        assert_eq!(Beat::try_from((7, 0)), Err(BeatError::ZeroDenominator { numerator: 7 }));
        assert!(ron::from_str::<Beat>("(7, 0)").is_err());
        assert_eq!(ron::from_str::<Beat>("(6, -4)").unwrap(), Beat::new(-3, 2));
    }

    #[test]
    #[should_panic(expected = "denominator")]
    fn test_zero_denominator_panics() {
        let _ = Beat::new(1, 0);
    }
}
