// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted animation format.
//!
//! A document is the keyframe list plus one parallel value list per track.
//! It is stored as RON. Loading a document with no keyframes is the one
//! place where data is repaired instead of rejected: a default keyframe at
//! time zero is substituted and every track keeps a single value.

use crate::animation::Animation;
use crate::beat::{gcd, Beat};
use crate::error::DocumentError;
use crate::keyframe::Keyframe;
use crate::track::{CellId, CellTrack, MaterialId, MaterialTrack, SpeechTrack, TransformTrack};
use crate::value::{Drawing, Geometry, Material, Speech, Transform};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Persisted geometry track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDocument {
    /// Cell id
    pub id: CellId,
    /// One geometry per keyframe
    pub geometries: Vec<Geometry>,
}

/// Persisted material track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDocument {
    /// Material id
    pub id: MaterialId,
    /// One material per keyframe
    pub materials: Vec<Material>,
}

/// Serialized form of an [`Animation`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationDocument {
    /// Keyframes in time order
    pub keyframes: Vec<Keyframe>,
    /// Total duration; `None` means the shortest valid length
    #[serde(default)]
    pub time_length: Option<Beat>,
    /// One drawing per keyframe
    #[serde(default)]
    pub drawings: Vec<Drawing>,
    /// Geometry tracks
    #[serde(default)]
    pub cells: Vec<CellDocument>,
    /// Material tracks
    #[serde(default)]
    pub materials: Vec<MaterialDocument>,
    /// Transform track
    #[serde(default)]
    pub transforms: Option<Vec<Transform>>,
    /// Speech track
    #[serde(default)]
    pub speeches: Option<Vec<Speech>>,
}

/// Keep at most one value, inventing a default when there is none
fn single<T: Default>(values: Vec<T>) -> Vec<T> {
    vec![values.into_iter().next().unwrap_or_default()]
}

impl AnimationDocument {
    /// Largest common denominator of all persisted times
    pub const MAX_DENOMINATOR: i64 = 1 << 24;
    /// Largest persisted time magnitude, in whole beats
    pub const MAX_BEATS: i64 = 1 << 24;

    /// Capture an animation's keyframes and track values
    pub fn from_animation(animation: &Animation) -> Self {
        Self {
            keyframes: animation.keyframes().to_vec(),
            time_length: Some(animation.time_length()),
            drawings: animation.drawing_track().drawings().to_vec(),
            cells: animation
                .cell_tracks()
                .map(|t| CellDocument { id: t.id, geometries: t.geometries().to_vec() })
                .collect(),
            materials: animation
                .material_tracks()
                .map(|t| MaterialDocument { id: t.id, materials: t.materials().to_vec() })
                .collect(),
            transforms: animation.transform_track().map(|t| t.transforms().to_vec()),
            speeches: animation.speech_track().map(|t| t.speeches().to_vec()),
        }
    }

    /// Replace an empty keyframe list with one default keyframe
    fn repair(&mut self) {
        if !self.keyframes.is_empty() {
            return;
        }
        tracing::warn!("Animation document has no keyframes, inserting a default keyframe");
        self.keyframes.push(Keyframe::default());
        self.drawings = single(std::mem::take(&mut self.drawings));
        for cell in &mut self.cells {
            cell.geometries = single(std::mem::take(&mut cell.geometries));
        }
        for material in &mut self.materials {
            material.materials = single(std::mem::take(&mut material.materials));
        }
        if let Some(transforms) = &mut self.transforms {
            *transforms = single(std::mem::take(transforms));
        }
        if let Some(speeches) = &mut self.speeches {
            *speeches = single(std::mem::take(speeches));
        }
    }

    /// Keep every time on a grid coarse enough that loop unrolling and
    /// segment arithmetic stay exact.
    fn check_times(&self) -> Result<()> {
        let limit = Beat::whole(Self::MAX_BEATS);
        let mut grid: i128 = 1;
        let times = self.keyframes.iter().map(|k| k.time).chain(self.time_length);
        for time in times {
            if time > limit || time < -limit {
                return Err(DocumentError::TimeOutOfRange { time, reason: "too far from zero" });
            }
            let denominator = i128::from(time.denominator());
            grid = grid / gcd(grid, denominator) * denominator;
            if grid > i128::from(Self::MAX_DENOMINATOR) {
                return Err(DocumentError::TimeOutOfRange { time, reason: "subdivision too fine" });
            }
        }
        Ok(())
    }

    /// Build a live animation, failing on inconsistent track lengths
    pub fn into_animation(mut self) -> Result<Animation> {
        self.repair();
        self.check_times()?;
        let mut animation = Animation::try_new(self.keyframes, self.drawings)?;
        for cell in self.cells {
            animation.try_add_cell_track(CellTrack::new(cell.id, cell.geometries))?;
        }
        for material in self.materials {
            animation.try_add_material_track(MaterialTrack::new(material.id, material.materials))?;
        }
        animation.try_set_transform_track(self.transforms.map(TransformTrack::new))?;
        animation.try_set_speech_track(self.speeches.map(SpeechTrack::new))?;
        if let Some(time_length) = self.time_length {
            animation.set_time_length(time_length);
        }
        Ok(animation)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Save document to file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Load document from file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }
}

impl From<&Animation> for AnimationDocument {
    fn from(animation: &Animation) -> Self {
        Self::from_animation(animation)
    }
}

impl TryFrom<AnimationDocument> for Animation {
    type Error = DocumentError;

    fn try_from(document: AnimationDocument) -> Result<Self> {
        document.into_animation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::error::ContractViolation;
    use crate::keyframe::{Interpolation, Label, Loop};
    use crate::value::{Color, Line, Point, Wiggle};

    fn geometry(x: f64) -> Geometry {
        Geometry::new(vec![Line::new(vec![Point::new(x, 0.0), Point::new(x, 1.0)])])
    }

    fn sample_document() -> AnimationDocument {
        let cell = CellId::new();
        AnimationDocument {
            keyframes: vec![
                Keyframe::new(Beat::ZERO).with_loop(Loop::START),
                Keyframe::new(Beat::new(3, 2))
                    .with_easing(Easing::EASE_OUT)
                    .with_label(Label::Sub),
                Keyframe::new(Beat::whole(4))
                    .with_interpolation(Interpolation::Bound)
                    .with_loop(Loop::END),
            ],
            time_length: Some(Beat::whole(12)),
            drawings: vec![Drawing::default(); 3],
            cells: vec![CellDocument { id: cell, geometries: vec![geometry(0.0), geometry(1.0), geometry(2.0)] }],
            materials: vec![MaterialDocument {
                id: MaterialId::new(),
                materials: vec![
                    Material { color: Color::new(0.1, 0.5, 0.5), ..Material::default() },
                    Material::default(),
                    Material { opacity: 0.25, ..Material::default() },
                ],
            }],
            transforms: Some(vec![
                Transform::default(),
                Transform { rotation: 1.5, ..Transform::default() },
                Transform {
                    wiggle: Wiggle { amplitude: [2.0, 0.0], frequency: 3.0 },
                    ..Transform::default()
                },
            ]),
            speeches: Some(vec![Speech::new("Hi"), Speech::new(""), Speech::new("Bye")]),
        }
    }

    #[test]
    fn test_ron_roundtrip() {
        let document = sample_document();
        let ron = document.to_ron().unwrap();
        assert!(ron.contains("loop"));
        let parsed = AnimationDocument::from_ron(&ron).unwrap();
        assert_eq!(parsed, document);
    }

    #[test]
    fn test_animation_roundtrip() {
        let document = sample_document();
        let animation = document.clone().into_animation().unwrap();
        assert_eq!(animation.keyframes().len(), 3);
        assert_eq!(animation.time_length(), Beat::whole(12));
        assert_eq!(animation.cell_tracks().count(), 1);
        assert!(animation.validate().is_ok());
        assert_eq!(AnimationDocument::from_animation(&animation), document);
    }

    #[test]
    fn test_minimal_ron_uses_defaults() {
        let ron = "(keyframes: [(time: (0, 1)), (time: (2, 1), interpolation: Linear)], drawings: [(lines: []), (lines: [])])";
        let animation = Animation::try_from(AnimationDocument::from_ron(ron).unwrap()).unwrap();
        assert_eq!(animation.keyframes()[1].interpolation, Interpolation::Linear);
        assert_eq!(animation.time_length(), Beat::whole(3));
        assert!(animation.transform_track().is_none());
    }

    #[test]
    fn test_empty_document_is_repaired() {
        let document = AnimationDocument {
            cells: vec![CellDocument { id: CellId::new(), geometries: Vec::new() }],
            speeches: Some(vec![Speech::new("a"), Speech::new("b")]),
            ..AnimationDocument::default()
        };
        let animation = document.into_animation().unwrap();
        assert_eq!(animation.keyframes(), &[Keyframe::default()]);
        assert!(animation.validate().is_ok());
        assert_eq!(animation.speech_track().unwrap().current().text, "a");
    }

    #[test]
    fn test_inconsistent_document_is_rejected() {
        let mut document = sample_document();
        document.cells[0].geometries.pop();
        let err = document.into_animation().unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Inconsistent(ContractViolation::TrackLengthMismatch { track: "cell", expected: 3, found: 2 })
        ));
    }

    #[test]
    fn test_unordered_keyframes_are_rejected() {
        let mut document = sample_document();
        document.keyframes.swap(0, 1);
        assert!(matches!(
            document.into_animation(),
            Err(DocumentError::Inconsistent(ContractViolation::NonIncreasingTime { index: 1, .. }))
        ));
    }

    #[test]
    fn test_zero_denominator_is_a_parse_error() {
        let ron = "(keyframes: [(time: (0, 1)), (time: (3, 0))], drawings: [(lines: []), (lines: [])])";
        assert!(matches!(AnimationDocument::from_ron(ron), Err(DocumentError::Parse(_))));

        let ron = "(keyframes: [(time: (0, 1))], time_length: Some((7, 0)), drawings: [(lines: [])])";
        assert!(matches!(AnimationDocument::from_ron(ron), Err(DocumentError::Parse(_))));
    }

    #[test]
    fn test_times_off_the_grid_are_rejected() {
        let mut document = sample_document();
        document.keyframes[1].time = Beat::new(1, 4_000_000_007);
        document.keyframes[2].time = Beat::new(2, 3_000_000_019);
        assert!(matches!(
            document.into_animation(),
            Err(DocumentError::TimeOutOfRange { reason: "subdivision too fine", .. })
        ));

        let mut document = sample_document();
        document.time_length = Some(Beat::whole(i64::MAX));
        assert!(matches!(
            document.into_animation(),
            Err(DocumentError::TimeOutOfRange { reason: "too far from zero", .. })
        ));
    }

    #[test]
    fn test_fine_but_representable_grid_is_accepted() {
        let mut document = sample_document();
        document.keyframes[1].time = Beat::new(1, 4096);
        document.keyframes[2].time = Beat::new(5, 3);
        assert!(document.into_animation().is_ok());
    }

    #[test]
    fn test_malformed_ron() {
        assert!(matches!(AnimationDocument::from_ron("(keyframes: ["), Err(DocumentError::Parse(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("cadence-document-{}.ron", uuid::Uuid::new_v4()));
        let document = sample_document();
        document.save(&path).unwrap();
        let loaded = AnimationDocument::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, document);
    }
}
