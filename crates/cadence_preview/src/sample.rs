// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline sampling

use crate::settings::PreviewSettings;
use cadence_animation::{Animation, Beat, CellId, Drawing, Geometry, Material, MaterialId, Transform};
use serde::Serialize;

/// Every track value at one point of the timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Sample time as `(numerator, denominator)`
    pub time: Beat,
    /// Sample time in beats
    pub beats: f64,
    /// Active keyframe
    pub keyframe: usize,
    /// Row of the unrolled loop table
    pub looped_index: usize,
    /// Blend selected by the resolver
    pub segment: &'static str,
    /// Interpolation mode of the active keyframe
    pub mode: &'static str,
    /// Whether the time fell between keyframes
    pub interpolated: bool,
    /// Current drawing, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawing: Option<Drawing>,
    /// Current geometry per cell
    pub cells: Vec<(CellId, Geometry)>,
    /// Current material per material track
    pub materials: Vec<(MaterialId, Material)>,
    /// Current transform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    /// Wiggle displacement of the transform at the sample time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wiggle: Option<[f64; 2]>,
    /// Current speech text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech: Option<String>,
}

impl Sample {
    /// Move the animation to `time` and read back every track
    pub fn capture(animation: &mut Animation, time: Beat, include_drawing: bool) -> Self {
        let resolution = animation.resolve(time);
        animation.update(time);
        let transform = animation.transform_track().map(|t| *t.current());
        Self {
            time,
            beats: time.to_f64(),
            keyframe: animation.edit_index(),
            looped_index: resolution.looped_index,
            segment: resolution.segment.name(),
            mode: animation.edit_keyframe().interpolation.name(),
            interpolated: animation.is_interpolated(),
            drawing: include_drawing.then(|| animation.drawing_track().current().clone()),
            cells: animation.cell_tracks().map(|t| (t.id, t.current().clone())).collect(),
            materials: animation.material_tracks().map(|t| (t.id, *t.current())).collect(),
            transform,
            wiggle: transform.map(|t| t.wiggle.offset(time.to_f64())),
            speech: animation.speech_track().map(|t| t.current().text.clone()),
        }
    }
}

/// Sample times from zero to `time_length` inclusive
pub fn sample_times(time_length: Beat, step: Beat) -> Vec<Beat> {
    let mut times = Vec::new();
    if step <= Beat::ZERO {
        return times;
    }
    let mut time = Beat::ZERO;
    while time < time_length {
        times.push(time);
        time += step;
    }
    times.push(time_length);
    times
}

/// Sample the whole timeline
pub fn sample_animation(animation: &mut Animation, settings: &PreviewSettings) -> Vec<Sample> {
    if let Some(time_length) = settings.time_length {
        animation.set_time_length(time_length);
    }
    sample_times(animation.time_length(), settings.step)
        .into_iter()
        .map(|time| Sample::capture(animation, time, settings.include_drawing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cadence_animation::{CellTrack, Interpolation, Keyframe, Line, Point, TransformTrack, Wiggle};

    fn animation() -> Animation {
        let keyframes = vec![
            Keyframe::new(Beat::ZERO).with_interpolation(Interpolation::Linear),
            Keyframe::new(Beat::whole(2)),
        ];
        let mut animation = Animation::new(keyframes, vec![Drawing::default(); 2]);
        let geometry = |x| Geometry::new(vec![Line::new(vec![Point::new(x, 0.0)])]);
        animation.add_cell_track(CellTrack::new(CellId::new(), vec![geometry(0.0), geometry(4.0)]));
        animation
    }

    #[test]
    fn test_sample_times_end_inclusive() {
        let times = sample_times(Beat::whole(1), Beat::new(1, 3));
        assert_eq!(times, vec![Beat::ZERO, Beat::new(1, 3), Beat::new(2, 3), Beat::ONE]);
        assert!(sample_times(Beat::ONE, Beat::ZERO).is_empty());
    }

    #[test]
    fn test_sample_animation() {
        let mut animation = animation();
        let settings = PreviewSettings { step: Beat::ONE, ..PreviewSettings::default() };
        let samples = sample_animation(&mut animation, &settings);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[1].segment, "linear");
        assert_eq!(samples[1].mode, "Linear");
        assert_eq!(samples[3].mode, "Spline");
        assert!(samples[1].interpolated);
        assert_eq!(samples[1].cells[0].1.lines[0].points[0].x, 2.0);
        assert_eq!(samples[3].keyframe, 1);
        assert!(samples[0].drawing.is_none());
    }

    #[test]
    fn test_time_length_override_and_json() {
        let mut animation = animation();
        let settings = PreviewSettings {
            step: Beat::whole(2),
            include_drawing: true,
            time_length: Some(Beat::whole(6)),
            ..PreviewSettings::default()
        };
        let samples = sample_animation(&mut animation, &settings);
        assert_eq!(samples.len(), 4);
        assert!(samples[0].drawing.is_some());

        let json = serde_json::to_value(&samples[1]).unwrap();
        assert_eq!(json["time"], serde_json::json!([2, 1]));
        assert_eq!(json["segment"], "step");
        assert!(json.get("speech").is_none());
        assert!(json.get("wiggle").is_none());
    }

    #[test]
    fn test_wiggle_follows_sample_time() {
        let mut animation = animation();
        let wiggle = Wiggle { amplitude: [2.0, 0.0], frequency: 1.0 };
        let transform = Transform { wiggle, ..Transform::default() };
        animation.set_transform_track(Some(TransformTrack::new(vec![transform; 2])));
        let quarter = Sample::capture(&mut animation, Beat::new(1, 4), false);
        let offset = quarter.wiggle.unwrap();
        assert_abs_diff_eq!(offset[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(offset[1], 0.0, epsilon = 1e-9);
        let start = Sample::capture(&mut animation, Beat::ZERO, false);
        assert_eq!(start.wiggle, Some([0.0, 0.0]));
    }
}
