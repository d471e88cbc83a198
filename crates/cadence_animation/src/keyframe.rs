// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for the animation timeline.

use crate::beat::Beat;
use crate::easing::Easing;
use serde::{Deserialize, Serialize};

/// Interpolation mode from a keyframe to the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Interpolation {
    /// Monotone cubic through neighbouring keyframes
    #[default]
    Spline,
    /// Spline that is never smoothed across this keyframe's segment
    Bound,
    /// Straight blend to the next keyframe
    Linear,
    /// Hold until the next keyframe
    None,
}

impl Interpolation {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Spline => "Spline",
            Self::Bound => "Bound",
            Self::Linear => "Linear",
            Self::None => "None",
        }
    }
}

/// Loop region role of a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Loop {
    /// The region starts at this keyframe
    pub is_start: bool,
    /// The region ends at this keyframe and replays from its start
    pub is_end: bool,
}

impl Loop {
    /// No loop role
    pub const NONE: Loop = Loop { is_start: false, is_end: false };
    /// Opens a loop region
    pub const START: Loop = Loop { is_start: true, is_end: false };
    /// Closes a loop region
    pub const END: Loop = Loop { is_start: false, is_end: true };
}

/// Keyframe label shown on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Label {
    /// Main (key) drawing
    #[default]
    Main,
    /// In-between
    Sub,
}

/// A timed anchor on the animation timeline.
///
/// Keyframes are plain values; the per-track samples live in the tracks at
/// the same index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in beats
    pub time: Beat,
    /// Easing applied to the segment leaving this keyframe
    #[serde(default)]
    pub easing: Easing,
    /// Interpolation mode to the next keyframe
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Loop region role
    #[serde(default, rename = "loop")]
    pub loop_: Loop,
    /// Timeline label
    #[serde(default)]
    pub label: Label,
}

impl Keyframe {
    /// Create a spline keyframe with default easing at `time`
    pub fn new(time: Beat) -> Self {
        Self {
            time,
            easing: Easing::LINEAR,
            interpolation: Interpolation::Spline,
            loop_: Loop::NONE,
            label: Label::Main,
        }
    }

    /// Set interpolation mode
    pub fn with_interpolation(mut self, mode: Interpolation) -> Self {
        self.interpolation = mode;
        self
    }

    /// Set easing
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Set loop role
    pub fn with_loop(mut self, loop_: Loop) -> Self {
        self.loop_ = loop_;
        self
    }

    /// Set label
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }

    /// Copy of this keyframe moved to `time`
    pub fn at(mut self, time: Beat) -> Self {
        self.time = time;
        self
    }
}

impl Default for Keyframe {
    fn default() -> Self {
        Self::new(Beat::ZERO)
    }
}
