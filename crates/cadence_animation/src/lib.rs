// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe animation evaluation for Cadence.
//!
//! This crate resolves a playback time into values for every track of an
//! animated object:
//! - Drawing snapshots (stepped)
//! - Cell geometry (blended point by point)
//! - Materials (hue along the shortest arc)
//! - 2D transform with wiggle
//! - Speech text (stepped)
//!
//! ## Architecture
//!
//! The evaluator is built on:
//! - Exact rational time ([`Beat`])
//! - Loop regions unrolled into a strictly increasing virtual timeline
//! - Step, linear and monotone cubic blending chosen per segment
//! - Parallel per-keyframe value arrays kept in lockstep by atomic edits

pub mod animation;
pub mod beat;
pub mod document;
pub mod easing;
pub mod error;
pub mod interpolation;
pub mod keyframe;
pub mod loop_table;
pub mod playback;
pub mod track;
pub mod value;

pub use animation::{Animation, KeyframeValues, Resolution, Segment};
pub use beat::Beat;
pub use document::{AnimationDocument, CellDocument, MaterialDocument};
pub use easing::Easing;
pub use error::{BeatError, ContractViolation, DocumentError};
pub use interpolation::Monospline;
pub use keyframe::{Interpolation, Keyframe, Label, Loop};
pub use loop_table::{expand_loops, LoopedEntry};
pub use playback::{PlaybackController, PlaybackState};
pub use track::{
    CellId, CellTrack, DrawingTrack, MaterialId, MaterialTrack, SpeechTrack, Track, TrackType,
    TransformTrack,
};
pub use value::{Color, Drawing, Geometry, Interpolatable, Line, Material, Point, Speech, Transform, Wiggle};
