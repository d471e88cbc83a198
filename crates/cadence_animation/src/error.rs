// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types.
//!
//! [`ContractViolation`] describes a caller bug: the panicking entry points
//! format it into their panic message, the `try_*` variants hand it back
//! without having touched any state. [`DocumentError`] is the only error a
//! well-behaved caller should expect to handle, since it comes from data.

use crate::beat::Beat;
use thiserror::Error;

/// Broken precondition of a structural edit or track attachment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// The caller supplied the wrong number of values for a track family
    #[error("expected {expected} {track} value(s) for the new keyframe, got {found}")]
    ValueCountMismatch {
        /// Track family ("cell", "material", "transform", "speech")
        track: &'static str,
        /// Live track count
        expected: usize,
        /// Supplied value count
        found: usize,
    },

    /// A track's value array is out of step with the keyframe sequence
    #[error("{track} track holds {found} value(s) but the animation has {expected} keyframe(s)")]
    TrackLengthMismatch {
        /// Track family
        track: &'static str,
        /// Keyframe count
        expected: usize,
        /// Value count
        found: usize,
    },

    /// Keyframe index outside the sequence
    #[error("keyframe index {index} out of range for {len} keyframe(s)")]
    IndexOutOfRange {
        /// Offending index
        index: usize,
        /// Keyframe count
        len: usize,
    },

    /// A replacement sequence has a different length
    #[error("replacement has {found} keyframe(s), expected {expected}")]
    KeyframeCountMismatch {
        /// Current keyframe count
        expected: usize,
        /// Supplied keyframe count
        found: usize,
    },

    /// Keyframe times would not be strictly increasing
    #[error("keyframe time {time} at index {index} is not after the previous keyframe")]
    NonIncreasingTime {
        /// Index of the first out-of-order keyframe
        index: usize,
        /// Its time
        time: Beat,
    },

    /// An animation needs at least one keyframe
    #[error("an animation must keep at least one keyframe")]
    EmptyKeyframes,
}

/// A fraction that cannot be a [`Beat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BeatError {
    /// The denominator is zero
    #[error("beat {numerator}/0 has a zero denominator")]
    ZeroDenominator {
        /// Numerator as written
        numerator: i64,
    },

    /// The reduced fraction does not fit in 64-bit integers
    #[error("beat arithmetic overflowed")]
    Overflow,
}

/// Errors reading or writing a persisted animation
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Malformed RON text
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] ron::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Times too fine grained or too far out to be resolved exactly
    #[error("Time {time} is outside the supported range: {reason}")]
    TimeOutOfRange {
        /// Offending time
        time: Beat,
        /// Which limit it breaks
        reason: &'static str,
    },

    /// Internally inconsistent document
    #[error("Inconsistent document: {0}")]
    Inconsistent(#[from] ContractViolation),
}
