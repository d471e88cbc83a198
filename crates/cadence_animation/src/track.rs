// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for the animation.
//!
//! Every track keeps one value per keyframe and a `current` value that the
//! renderer reads after [`Animation::update`](crate::Animation::update). The
//! resolver drives all of them through the [`Track`] trait with keyframe
//! indices, never with times.

use crate::interpolation::Monospline;
use crate::value::{Drawing, Geometry, Interpolatable, Material, Speech, Transform};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a cell (animated shape)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub Uuid);

impl CellId {
    /// Create a new random cell ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub Uuid);

impl MaterialId {
    /// Create a new random material ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MaterialId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackType {
    /// Sketch snapshots
    Drawing,
    /// Shape geometry
    Cell,
    /// Fill and stroke appearance
    Material,
    /// Object transform
    Transform,
    /// Text overlay
    Speech,
}

impl TrackType {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Drawing => "drawing",
            Self::Cell => "cell",
            Self::Material => "material",
            Self::Transform => "transform",
            Self::Speech => "speech",
        }
    }
}

/// The operations the resolver dispatches to every live track.
///
/// Indices address the track's per-keyframe values. Each call overwrites the
/// track's current value; nothing is returned.
pub trait Track {
    /// Which family this track belongs to
    fn track_type(&self) -> TrackType;

    /// Number of stored per-keyframe values
    fn value_count(&self) -> usize;

    /// Snap to the value at `i`
    fn step(&mut self, i: usize);

    /// Blend from `i0` to `i1` by the eased parameter `t`
    fn linear(&mut self, i0: usize, i1: usize, t: f64);

    /// Cubic from `i1` to `i2` shaped by `i3`
    fn first_monospline(&mut self, i1: usize, i2: usize, i3: usize, ms: &Monospline);

    /// Cubic from `i1` to `i2` shaped by `i0` and `i3`
    fn monospline(&mut self, i0: usize, i1: usize, i2: usize, i3: usize, ms: &Monospline);

    /// Cubic from `i1` to `i2` shaped by `i0`
    fn end_monospline(&mut self, i0: usize, i1: usize, i2: usize, ms: &Monospline);
}

/// Sketch snapshot track; a drawing is never blended so every operation steps
/// to the segment's left keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingTrack {
    drawings: Vec<Drawing>,
    drawing: Drawing,
}

impl DrawingTrack {
    /// Create a track from per-keyframe drawings
    pub fn new(drawings: Vec<Drawing>) -> Self {
        let drawing = drawings.first().cloned().unwrap_or_default();
        Self { drawings, drawing }
    }

    /// Per-keyframe drawings
    pub fn drawings(&self) -> &[Drawing] {
        &self.drawings
    }

    /// Drawing shown at the current time
    pub fn current(&self) -> &Drawing {
        &self.drawing
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<Drawing> {
        &mut self.drawings
    }
}

impl Track for DrawingTrack {
    fn track_type(&self) -> TrackType {
        TrackType::Drawing
    }

    fn value_count(&self) -> usize {
        self.drawings.len()
    }

    fn step(&mut self, i: usize) {
        self.drawing = self.drawings[i].clone();
    }

    fn linear(&mut self, i0: usize, _i1: usize, _t: f64) {
        self.step(i0);
    }

    fn first_monospline(&mut self, i1: usize, _i2: usize, _i3: usize, _ms: &Monospline) {
        self.step(i1);
    }

    fn monospline(&mut self, _i0: usize, i1: usize, _i2: usize, _i3: usize, _ms: &Monospline) {
        self.step(i1);
    }

    fn end_monospline(&mut self, _i0: usize, i1: usize, _i2: usize, _ms: &Monospline) {
        self.step(i1);
    }
}

/// Geometry track of one animated shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTrack {
    /// Cell this track animates
    pub id: CellId,
    geometries: Vec<Geometry>,
    geometry: Geometry,
}

impl CellTrack {
    /// Create a track from per-keyframe geometries
    pub fn new(id: CellId, geometries: Vec<Geometry>) -> Self {
        let geometry = geometries.first().cloned().unwrap_or_default();
        Self { id, geometries, geometry }
    }

    /// Per-keyframe geometries
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    /// Geometry at the current time
    pub fn current(&self) -> &Geometry {
        &self.geometry
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<Geometry> {
        &mut self.geometries
    }
}

impl Track for CellTrack {
    fn track_type(&self) -> TrackType {
        TrackType::Cell
    }

    fn value_count(&self) -> usize {
        self.geometries.len()
    }

    fn step(&mut self, i: usize) {
        self.geometry = self.geometries[i].clone();
    }

    fn linear(&mut self, i0: usize, i1: usize, t: f64) {
        let g = &self.geometries;
        self.geometry = Geometry::linear(&g[i0], &g[i1], t);
    }

    fn first_monospline(&mut self, i1: usize, i2: usize, i3: usize, ms: &Monospline) {
        let g = &self.geometries;
        self.geometry = Geometry::first_monospline(&g[i1], &g[i2], &g[i3], ms);
    }

    fn monospline(&mut self, i0: usize, i1: usize, i2: usize, i3: usize, ms: &Monospline) {
        let g = &self.geometries;
        self.geometry = Geometry::monospline(&g[i0], &g[i1], &g[i2], &g[i3], ms);
    }

    fn end_monospline(&mut self, i0: usize, i1: usize, i2: usize, ms: &Monospline) {
        let g = &self.geometries;
        self.geometry = Geometry::end_monospline(&g[i0], &g[i1], &g[i2], ms);
    }
}

/// Appearance track of one material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTrack {
    /// Material this track animates
    pub id: MaterialId,
    materials: Vec<Material>,
    material: Material,
}

impl MaterialTrack {
    /// Create a track from per-keyframe materials
    pub fn new(id: MaterialId, materials: Vec<Material>) -> Self {
        let material = materials.first().copied().unwrap_or_default();
        Self { id, materials, material }
    }

    /// Per-keyframe materials
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Material at the current time
    pub fn current(&self) -> &Material {
        &self.material
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<Material> {
        &mut self.materials
    }
}

impl Track for MaterialTrack {
    fn track_type(&self) -> TrackType {
        TrackType::Material
    }

    fn value_count(&self) -> usize {
        self.materials.len()
    }

    fn step(&mut self, i: usize) {
        self.material = self.materials[i];
    }

    fn linear(&mut self, i0: usize, i1: usize, t: f64) {
        let m = &self.materials;
        self.material = Material::linear(&m[i0], &m[i1], t);
    }

    fn first_monospline(&mut self, i1: usize, i2: usize, i3: usize, ms: &Monospline) {
        let m = &self.materials;
        self.material = Material::first_monospline(&m[i1], &m[i2], &m[i3], ms);
    }

    fn monospline(&mut self, i0: usize, i1: usize, i2: usize, i3: usize, ms: &Monospline) {
        let m = &self.materials;
        self.material = Material::monospline(&m[i0], &m[i1], &m[i2], &m[i3], ms);
    }

    fn end_monospline(&mut self, i0: usize, i1: usize, i2: usize, ms: &Monospline) {
        let m = &self.materials;
        self.material = Material::end_monospline(&m[i0], &m[i1], &m[i2], ms);
    }
}

/// Transform track with translation, scale, rotation and wiggle channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformTrack {
    transforms: Vec<Transform>,
    transform: Transform,
}

impl TransformTrack {
    /// Create a track from per-keyframe transforms
    pub fn new(transforms: Vec<Transform>) -> Self {
        let transform = transforms.first().copied().unwrap_or_default();
        Self { transforms, transform }
    }

    /// Per-keyframe transforms
    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Transform at the current time
    pub fn current(&self) -> &Transform {
        &self.transform
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<Transform> {
        &mut self.transforms
    }
}

impl Track for TransformTrack {
    fn track_type(&self) -> TrackType {
        TrackType::Transform
    }

    fn value_count(&self) -> usize {
        self.transforms.len()
    }

    fn step(&mut self, i: usize) {
        self.transform = self.transforms[i];
    }

    fn linear(&mut self, i0: usize, i1: usize, t: f64) {
        let v = &self.transforms;
        self.transform = Transform::linear(&v[i0], &v[i1], t);
    }

    fn first_monospline(&mut self, i1: usize, i2: usize, i3: usize, ms: &Monospline) {
        let v = &self.transforms;
        self.transform = Transform::first_monospline(&v[i1], &v[i2], &v[i3], ms);
    }

    fn monospline(&mut self, i0: usize, i1: usize, i2: usize, i3: usize, ms: &Monospline) {
        let v = &self.transforms;
        self.transform = Transform::monospline(&v[i0], &v[i1], &v[i2], &v[i3], ms);
    }

    fn end_monospline(&mut self, i0: usize, i1: usize, i2: usize, ms: &Monospline) {
        let v = &self.transforms;
        self.transform = Transform::end_monospline(&v[i0], &v[i1], &v[i2], ms);
    }
}

/// Text overlay track; text is discrete so every operation steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechTrack {
    speeches: Vec<Speech>,
    speech: Speech,
}

impl SpeechTrack {
    /// Create a track from per-keyframe text
    pub fn new(speeches: Vec<Speech>) -> Self {
        let speech = speeches.first().cloned().unwrap_or_default();
        Self { speeches, speech }
    }

    /// Per-keyframe text
    pub fn speeches(&self) -> &[Speech] {
        &self.speeches
    }

    /// Text shown at the current time
    pub fn current(&self) -> &Speech {
        &self.speech
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<Speech> {
        &mut self.speeches
    }
}

impl Track for SpeechTrack {
    fn track_type(&self) -> TrackType {
        TrackType::Speech
    }

    fn value_count(&self) -> usize {
        self.speeches.len()
    }

    fn step(&mut self, i: usize) {
        self.speech = self.speeches[i].clone();
    }

    fn linear(&mut self, i0: usize, _i1: usize, _t: f64) {
        self.step(i0);
    }

    fn first_monospline(&mut self, i1: usize, _i2: usize, _i3: usize, _ms: &Monospline) {
        self.step(i1);
    }

    fn monospline(&mut self, _i0: usize, i1: usize, _i2: usize, _i3: usize, _ms: &Monospline) {
        self.step(i1);
    }

    fn end_monospline(&mut self, _i0: usize, i1: usize, _i2: usize, _ms: &Monospline) {
        self.step(i1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Color, Line, Point};

    fn square(offset: f64) -> Geometry {
        Geometry::new(vec![Line::new(vec![
            Point::new(offset, offset),
            Point::new(offset + 1.0, offset),
            Point::new(offset + 1.0, offset + 1.0),
        ])])
    }

    #[test]
    fn test_drawing_track_never_blends() {
        let a = Drawing::new(vec![Line::new(vec![Point::new(0.0, 0.0)])]);
        let b = Drawing::new(vec![Line::new(vec![Point::new(5.0, 5.0)])]);
        let mut track = DrawingTrack::new(vec![a.clone(), b.clone()]);
        track.linear(0, 1, 0.9);
        assert_eq!(track.current(), &a);
        track.step(1);
        assert_eq!(track.current(), &b);
    }

    #[test]
    fn test_cell_track_linear_continuity() {
        let mut track = CellTrack::new(CellId::new(), vec![square(0.0), square(10.0)]);
        track.linear(0, 1, 0.0);
        let at_start = track.current().clone();
        track.step(0);
        assert_eq!(&at_start, track.current());

        track.linear(0, 1, 1.0);
        let at_end = track.current().clone();
        track.step(1);
        assert_eq!(&at_end, track.current());

        let mut track = CellTrack::new(CellId::new(), vec![square(5.28), square(-4.9)]);
        track.linear(0, 1, 1.0);
        let at_end = track.current().clone();
        track.step(1);
        assert_eq!(&at_end, track.current());
    }

    #[test]
    fn test_material_track_spline() {
        let materials: Vec<Material> = [0.0, 0.25, 0.5]
            .iter()
            .map(|&h| Material { color: Color::new(h, 1.0, 0.5), ..Material::default() })
            .collect();
        let mut track = MaterialTrack::new(MaterialId::new(), materials);
        let ms = Monospline::first(0.0, 1.0, 2.0, 0.5, 0.5);
        track.first_monospline(0, 1, 2, &ms);
        let hue = track.current().color.hue;
        assert!(hue > 0.0 && hue < 0.25);
    }

    #[test]
    fn test_speech_track_steps_left() {
        let mut track = SpeechTrack::new(vec![Speech::new("hi"), Speech::new("bye")]);
        let ms = Monospline::end(0.0, 1.0, 2.0, 1.5, 0.5);
        track.end_monospline(0, 1, 0, &ms);
        assert_eq!(track.current().text, "bye");
        assert_eq!(track.value_count(), 2);
        assert_eq!(track.track_type().name(), "speech");
    }
}
