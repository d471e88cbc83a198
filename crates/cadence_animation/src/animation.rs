// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation: keyframes, tracks and the time resolver.
//!
//! ## Invariant
//!
//! Every live track holds exactly one value per keyframe. The only ways to
//! change the keyframe count are [`Animation::insert_keyframe`] and
//! [`Animation::remove_keyframe`], and both validate the whole edit before
//! touching any array, then apply it to every array in one pass. A rejected
//! edit leaves the animation exactly as it was.
//!
//! ## Resolution
//!
//! [`Animation::resolve`] maps a time to a [`Segment`] of the loop table:
//! a step, a linear blend, or one of three monotone cubic variants depending
//! on which neighbours exist and whether a `Bound` keyframe blocks them.
//! [`Animation::update`] then dispatches that segment to every track.

use crate::beat::Beat;
use crate::error::ContractViolation;
use crate::interpolation::Monospline;
use crate::keyframe::{Interpolation, Keyframe};
use crate::loop_table::{expand_loops, LoopedEntry};
use crate::track::{
    CellId, CellTrack, DrawingTrack, MaterialId, MaterialTrack, SpeechTrack, Track, TrackType,
    TransformTrack,
};
use crate::value::{Drawing, Geometry, Material, Speech, Transform};
use indexmap::IndexMap;
use std::cell::OnceCell;

/// One value for every live track, inserted alongside a new keyframe
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyframeValues {
    /// Drawing snapshot
    pub drawing: Drawing,
    /// One geometry per cell track, in track order
    pub geometries: Vec<Geometry>,
    /// One material per material track, in track order
    pub materials: Vec<Material>,
    /// Required exactly when a transform track exists
    pub transform: Option<Transform>,
    /// Required exactly when a speech track exists
    pub speech: Option<Speech>,
}

/// Which blend the resolver selected for a time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Snap to one keyframe
    Step {
        /// Keyframe index
        index: usize,
    },
    /// Blend between two keyframes
    Linear {
        /// Left keyframe index
        i0: usize,
        /// Right keyframe index
        i1: usize,
        /// Eased parameter
        t: f64,
    },
    /// Cubic over `i1, i2, i3`, no usable predecessor
    FirstMonospline {
        /// Left keyframe index
        i1: usize,
        /// Right keyframe index
        i2: usize,
        /// Following keyframe index
        i3: usize,
        /// Parameter pack
        pack: Monospline,
    },
    /// Cubic over `i0, i1, i2, i3`
    Monospline {
        /// Preceding keyframe index
        i0: usize,
        /// Left keyframe index
        i1: usize,
        /// Right keyframe index
        i2: usize,
        /// Following keyframe index
        i3: usize,
        /// Parameter pack
        pack: Monospline,
    },
    /// Cubic over `i0, i1, i2`, no usable successor
    EndMonospline {
        /// Preceding keyframe index
        i0: usize,
        /// Left keyframe index
        i1: usize,
        /// Right keyframe index
        i2: usize,
        /// Parameter pack
        pack: Monospline,
    },
}

impl Segment {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Segment::Step { .. } => "step",
            Segment::Linear { .. } => "linear",
            Segment::FirstMonospline { .. } => "first_monospline",
            Segment::Monospline { .. } => "monospline",
            Segment::EndMonospline { .. } => "end_monospline",
        }
    }

    /// Whether the segment blends rather than snaps
    pub fn is_interpolating(&self) -> bool {
        !matches!(self, Segment::Step { .. })
    }

    /// Forward this segment to a track
    pub fn apply<T: Track + ?Sized>(&self, track: &mut T) {
        match *self {
            Segment::Step { index } => track.step(index),
            Segment::Linear { i0, i1, t } => track.linear(i0, i1, t),
            Segment::FirstMonospline { i1, i2, i3, ref pack } => {
                track.first_monospline(i1, i2, i3, pack);
            }
            Segment::Monospline { i0, i1, i2, i3, ref pack } => {
                track.monospline(i0, i1, i2, i3, pack);
            }
            Segment::EndMonospline { i0, i1, i2, ref pack } => {
                track.end_monospline(i0, i1, i2, pack);
            }
        }
    }
}

/// Outcome of resolving a time against the loop table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Position in the loop table
    pub looped_index: usize,
    /// The loop table row active at the time
    pub entry: LoopedEntry,
    /// Selected blend
    pub segment: Segment,
}

/// A keyframed animated object
#[derive(Debug, Clone)]
pub struct Animation {
    keyframes: Vec<Keyframe>,
    edit_index: usize,
    selection_indexes: Vec<Vec<usize>>,
    time: Beat,
    time_length: Beat,
    is_interpolated: bool,
    looped_entries: OnceCell<Vec<LoopedEntry>>,
    drawing_track: DrawingTrack,
    cell_tracks: IndexMap<CellId, CellTrack>,
    material_tracks: IndexMap<MaterialId, MaterialTrack>,
    transform_track: Option<TransformTrack>,
    speech_track: Option<SpeechTrack>,
}

fn check_increasing(keyframes: &[Keyframe]) -> Result<(), ContractViolation> {
    if keyframes.is_empty() {
        return Err(ContractViolation::EmptyKeyframes);
    }
    for (index, pair) in keyframes.windows(2).enumerate() {
        if pair[1].time <= pair[0].time {
            return Err(ContractViolation::NonIncreasingTime { index: index + 1, time: pair[1].time });
        }
    }
    Ok(())
}

fn check_length(track: &dyn Track, expected: usize) -> Result<(), ContractViolation> {
    let found = track.value_count();
    if found == expected {
        Ok(())
    } else {
        Err(ContractViolation::TrackLengthMismatch { track: track.track_type().name(), expected, found })
    }
}

fn check_count(track: TrackType, expected: usize, found: usize) -> Result<(), ContractViolation> {
    if expected == found {
        Ok(())
    } else {
        Err(ContractViolation::ValueCountMismatch { track: track.name(), expected, found })
    }
}

impl Animation {
    /// Create an animation from keyframes and their drawings.
    ///
    /// # Panics
    /// Panics on any [`ContractViolation`]; see [`Animation::try_new`].
    #[track_caller]
    pub fn new(keyframes: Vec<Keyframe>, drawings: Vec<Drawing>) -> Self {
        Self::try_new(keyframes, drawings).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Create an animation, rejecting empty or unordered keyframes and a
    /// drawing list of the wrong length.
    pub fn try_new(keyframes: Vec<Keyframe>, drawings: Vec<Drawing>) -> Result<Self, ContractViolation> {
        check_increasing(&keyframes)?;
        let drawing_track = DrawingTrack::new(drawings);
        check_length(&drawing_track, keyframes.len())?;
        let time_length = keyframes.last().map_or(Beat::ONE, |k| k.time + Beat::ONE);
        let mut animation = Self {
            keyframes,
            edit_index: 0,
            selection_indexes: Vec::new(),
            time: Beat::ZERO,
            time_length,
            is_interpolated: false,
            looped_entries: OnceCell::new(),
            drawing_track,
            cell_tracks: IndexMap::new(),
            material_tracks: IndexMap::new(),
            transform_track: None,
            speech_track: None,
        };
        animation.update(Beat::ZERO);
        Ok(animation)
    }

    /// Set the total duration (builder form of [`Animation::set_time_length`])
    pub fn with_time_length(mut self, time_length: Beat) -> Self {
        self.set_time_length(time_length);
        self
    }

    // ------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------

    /// Attach a cell track.
    ///
    /// # Panics
    /// Panics if the track's length differs from the keyframe count.
    #[track_caller]
    pub fn add_cell_track(&mut self, track: CellTrack) {
        self.try_add_cell_track(track).unwrap_or_else(|e| panic!("{e}"));
    }

    /// Attach a cell track, checking its length
    pub fn try_add_cell_track(&mut self, mut track: CellTrack) -> Result<(), ContractViolation> {
        check_length(&track, self.keyframes.len())?;
        self.current_segment().apply(&mut track);
        self.cell_tracks.insert(track.id, track);
        Ok(())
    }

    /// Detach a cell track
    pub fn remove_cell_track(&mut self, id: CellId) -> Option<CellTrack> {
        self.cell_tracks.shift_remove(&id)
    }

    /// Attach a material track.
    ///
    /// # Panics
    /// Panics if the track's length differs from the keyframe count.
    #[track_caller]
    pub fn add_material_track(&mut self, track: MaterialTrack) {
        self.try_add_material_track(track).unwrap_or_else(|e| panic!("{e}"));
    }

    /// Attach a material track, checking its length
    pub fn try_add_material_track(&mut self, mut track: MaterialTrack) -> Result<(), ContractViolation> {
        check_length(&track, self.keyframes.len())?;
        self.current_segment().apply(&mut track);
        self.material_tracks.insert(track.id, track);
        Ok(())
    }

    /// Detach a material track
    pub fn remove_material_track(&mut self, id: MaterialId) -> Option<MaterialTrack> {
        self.material_tracks.shift_remove(&id)
    }

    /// Attach or clear the transform track.
    ///
    /// # Panics
    /// Panics if the track's length differs from the keyframe count.
    #[track_caller]
    pub fn set_transform_track(&mut self, track: Option<TransformTrack>) {
        self.try_set_transform_track(track).unwrap_or_else(|e| panic!("{e}"));
    }

    /// Attach or clear the transform track, checking its length
    pub fn try_set_transform_track(&mut self, track: Option<TransformTrack>) -> Result<(), ContractViolation> {
        if let Some(mut track) = track {
            check_length(&track, self.keyframes.len())?;
            self.current_segment().apply(&mut track);
            self.transform_track = Some(track);
        } else {
            self.transform_track = None;
        }
        Ok(())
    }

    /// Attach or clear the speech track.
    ///
    /// # Panics
    /// Panics if the track's length differs from the keyframe count.
    #[track_caller]
    pub fn set_speech_track(&mut self, track: Option<SpeechTrack>) {
        self.try_set_speech_track(track).unwrap_or_else(|e| panic!("{e}"));
    }

    /// Attach or clear the speech track, checking its length
    pub fn try_set_speech_track(&mut self, track: Option<SpeechTrack>) -> Result<(), ContractViolation> {
        if let Some(mut track) = track {
            check_length(&track, self.keyframes.len())?;
            self.current_segment().apply(&mut track);
            self.speech_track = Some(track);
        } else {
            self.speech_track = None;
        }
        Ok(())
    }

    /// Drawing track
    pub fn drawing_track(&self) -> &DrawingTrack {
        &self.drawing_track
    }

    /// Cell tracks in insertion order
    pub fn cell_tracks(&self) -> impl Iterator<Item = &CellTrack> {
        self.cell_tracks.values()
    }

    /// Cell track by id
    pub fn cell_track(&self, id: CellId) -> Option<&CellTrack> {
        self.cell_tracks.get(&id)
    }

    /// Material tracks in insertion order
    pub fn material_tracks(&self) -> impl Iterator<Item = &MaterialTrack> {
        self.material_tracks.values()
    }

    /// Material track by id
    pub fn material_track(&self, id: MaterialId) -> Option<&MaterialTrack> {
        self.material_tracks.get(&id)
    }

    /// Transform track, if any
    pub fn transform_track(&self) -> Option<&TransformTrack> {
        self.transform_track.as_ref()
    }

    /// Speech track, if any
    pub fn speech_track(&self) -> Option<&SpeechTrack> {
        self.speech_track.as_ref()
    }

    /// Every live track, drawing first
    pub fn tracks(&self) -> Vec<&dyn Track> {
        let mut tracks: Vec<&dyn Track> = vec![&self.drawing_track];
        tracks.extend(self.cell_tracks.values().map(|t| t as &dyn Track));
        tracks.extend(self.material_tracks.values().map(|t| t as &dyn Track));
        if let Some(t) = &self.transform_track {
            tracks.push(t);
        }
        if let Some(t) = &self.speech_track {
            tracks.push(t);
        }
        tracks
    }

    /// Check that every live track holds one value per keyframe
    pub fn validate(&self) -> Result<(), ContractViolation> {
        let len = self.keyframes.len();
        self.tracks().into_iter().try_for_each(|t| check_length(t, len))
    }

    // ------------------------------------------------------------------
    // Time resolution
    // ------------------------------------------------------------------

    /// Unrolled loop table, rebuilt on first use after an edit
    pub fn looped_entries(&self) -> &[LoopedEntry] {
        self.looped_entries.get_or_init(|| {
            let entries = expand_loops(&self.keyframes, self.time_length);
            tracing::debug!(
                keyframes = self.keyframes.len(),
                entries = entries.len(),
                "Rebuilt loop table"
            );
            entries
        })
    }

    fn invalidate_loop_table(&mut self) {
        self.looped_entries = OnceCell::new();
    }

    /// Loop table position active at `time`
    pub fn looped_index(&self, time: Beat) -> usize {
        self.looped_entries()
            .iter()
            .rposition(|e| e.virtual_time <= time)
            .unwrap_or(0)
    }

    fn step_at(&self, looped_index: usize) -> Resolution {
        let entry = self.looped_entries()[looped_index];
        Resolution {
            looped_index,
            entry,
            segment: Segment::Step { index: entry.original_index },
        }
    }

    /// Work out which blend applies at `time` without touching any track
    pub fn resolve(&self, time: Beat) -> Resolution {
        let entries = self.looped_entries();
        let last = entries.len() - 1;
        if time <= entries[0].virtual_time {
            return self.step_at(0);
        }
        if time >= self.time_length {
            return self.step_at(last);
        }

        let li = self.looped_index(time);
        let entry = entries[li];
        let keyframe = &self.keyframes[entry.original_index];
        let start = entry.virtual_time;
        let next_time = entries.get(li + 1).map_or(self.time_length, |e| e.virtual_time);
        let offset = time - start;
        let duration = next_time - start;
        if offset.is_zero()
            || duration <= Beat::ZERO
            || li == last
            || keyframe.interpolation == Interpolation::None
        {
            return self.step_at(li);
        }

        let t = keyframe.easing.convert_t(offset.ratio(duration));
        let i1 = entry.original_index;
        let i2 = entries[li + 1].original_index;
        let resolution = |segment| Resolution { looped_index: li, entry, segment };

        if keyframe.interpolation == Interpolation::Linear || self.keyframes.len() <= 2 {
            return resolution(Segment::Linear { i0: i1, i1: i2, t });
        }

        let not_bound = |row: &LoopedEntry| self.keyframes[row.original_index].interpolation != Interpolation::Bound;
        let use_previous = li >= 1 && not_bound(&entries[li - 1]);
        let use_next_next = li + 2 < entries.len() && not_bound(&entries[li + 1]);

        // Identity easing feeds the absolute time; any other easing feeds the
        // eased parameter rescaled onto the segment.
        let x = if keyframe.easing.is_default() {
            time.to_f64()
        } else {
            t * duration.to_f64() + start.to_f64()
        };
        let x1 = start.to_f64();
        let x2 = next_time.to_f64();

        match (use_previous, use_next_next) {
            (true, true) => {
                let x0 = entries[li - 1].virtual_time.to_f64();
                let x3 = entries[li + 2].virtual_time.to_f64();
                resolution(Segment::Monospline {
                    i0: entries[li - 1].original_index,
                    i1,
                    i2,
                    i3: entries[li + 2].original_index,
                    pack: Monospline::mid(x0, x1, x2, x3, x, t),
                })
            }
            (true, false) => {
                let x0 = entries[li - 1].virtual_time.to_f64();
                resolution(Segment::EndMonospline {
                    i0: entries[li - 1].original_index,
                    i1,
                    i2,
                    pack: Monospline::end(x0, x1, x2, x, t),
                })
            }
            (false, true) => {
                let x3 = entries[li + 2].virtual_time.to_f64();
                resolution(Segment::FirstMonospline {
                    i1,
                    i2,
                    i3: entries[li + 2].original_index,
                    pack: Monospline::first(x1, x2, x3, x, t),
                })
            }
            (false, false) => resolution(Segment::Linear { i0: i1, i1: i2, t }),
        }
    }

    fn current_segment(&self) -> Segment {
        self.resolve(self.time).segment
    }

    /// Move to `time` and push the resolved values into every track
    pub fn update(&mut self, time: Beat) {
        self.time = time;
        let resolution = self.resolve(time);
        tracing::trace!(%time, segment = ?resolution.segment, "Resolved animation time");
        self.edit_index = resolution.entry.original_index;
        self.is_interpolated = resolution.segment.is_interpolating();

        let segment = resolution.segment;
        segment.apply(&mut self.drawing_track);
        for track in self.cell_tracks.values_mut() {
            segment.apply(track);
        }
        for track in self.material_tracks.values_mut() {
            segment.apply(track);
        }
        if let Some(track) = &mut self.transform_track {
            segment.apply(track);
        }
        if let Some(track) = &mut self.speech_track {
            segment.apply(track);
        }
    }

    /// Whether the last update landed between keyframes
    pub fn is_interpolated(&self) -> bool {
        self.is_interpolated
    }

    /// Current time
    pub fn time(&self) -> Beat {
        self.time
    }

    /// Keyframe index active at the current time
    pub fn edit_index(&self) -> usize {
        self.edit_index
    }

    /// Keyframe active at the current time
    pub fn edit_keyframe(&self) -> &Keyframe {
        &self.keyframes[self.edit_index]
    }

    /// Keyframe index active at `time`
    pub fn keyframe_index_at(&self, time: Beat) -> usize {
        self.looped_entries()[self.looped_index(time)].original_index
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Insert a keyframe and one value per live track at `index`.
    ///
    /// # Panics
    /// Panics on any [`ContractViolation`]; see [`Animation::try_insert_keyframe`].
    #[track_caller]
    pub fn insert_keyframe(&mut self, keyframe: Keyframe, values: KeyframeValues, index: usize) {
        self.try_insert_keyframe(keyframe, values, index).unwrap_or_else(|e| panic!("{e}"));
    }

    /// Insert a keyframe and its values, or reject the edit without changing anything
    pub fn try_insert_keyframe(
        &mut self,
        keyframe: Keyframe,
        values: KeyframeValues,
        index: usize,
    ) -> Result<(), ContractViolation> {
        let len = self.keyframes.len();
        if index > len {
            return Err(ContractViolation::IndexOutOfRange { index, len });
        }
        check_count(TrackType::Cell, self.cell_tracks.len(), values.geometries.len())?;
        check_count(TrackType::Material, self.material_tracks.len(), values.materials.len())?;
        check_count(
            TrackType::Transform,
            usize::from(self.transform_track.is_some()),
            usize::from(values.transform.is_some()),
        )?;
        check_count(
            TrackType::Speech,
            usize::from(self.speech_track.is_some()),
            usize::from(values.speech.is_some()),
        )?;
        self.validate()?;
        let after_previous = index == 0 || self.keyframes[index - 1].time < keyframe.time;
        let before_next = index == len || keyframe.time < self.keyframes[index].time;
        if !(after_previous && before_next) {
            return Err(ContractViolation::NonIncreasingTime { index, time: keyframe.time });
        }

        // Everything is checked; the commit below cannot fail part way.
        let KeyframeValues { drawing, geometries, materials, transform, speech } = values;
        self.keyframes.insert(index, keyframe);
        self.drawing_track.values_mut().insert(index, drawing);
        for (track, geometry) in self.cell_tracks.values_mut().zip(geometries) {
            track.values_mut().insert(index, geometry);
        }
        for (track, material) in self.material_tracks.values_mut().zip(materials) {
            track.values_mut().insert(index, material);
        }
        if let (Some(track), Some(transform)) = (&mut self.transform_track, transform) {
            track.values_mut().insert(index, transform);
        }
        if let (Some(track), Some(speech)) = (&mut self.speech_track, speech) {
            track.values_mut().insert(index, speech);
        }
        for group in &mut self.selection_indexes {
            for i in group.iter_mut().filter(|i| **i >= index) {
                *i += 1;
            }
        }

        tracing::debug!(index, keyframes = self.keyframes.len(), "Inserted keyframe");
        self.keyframes_changed();
        Ok(())
    }

    /// Remove the keyframe at `index` and its value in every track.
    ///
    /// # Panics
    /// Panics on any [`ContractViolation`]; see [`Animation::try_remove_keyframe`].
    #[track_caller]
    pub fn remove_keyframe(&mut self, index: usize) {
        self.try_remove_keyframe(index).unwrap_or_else(|e| panic!("{e}"));
    }

    /// Remove a keyframe slot from every array, or reject the edit without changing anything
    pub fn try_remove_keyframe(&mut self, index: usize) -> Result<(), ContractViolation> {
        let len = self.keyframes.len();
        if index >= len {
            return Err(ContractViolation::IndexOutOfRange { index, len });
        }
        if len == 1 {
            return Err(ContractViolation::EmptyKeyframes);
        }
        self.validate()?;

        self.keyframes.remove(index);
        self.drawing_track.values_mut().remove(index);
        for track in self.cell_tracks.values_mut() {
            track.values_mut().remove(index);
        }
        for track in self.material_tracks.values_mut() {
            track.values_mut().remove(index);
        }
        if let Some(track) = &mut self.transform_track {
            track.values_mut().remove(index);
        }
        if let Some(track) = &mut self.speech_track {
            track.values_mut().remove(index);
        }
        for group in &mut self.selection_indexes {
            group.retain(|&i| i != index);
            for i in group.iter_mut().filter(|i| **i > index) {
                *i -= 1;
            }
        }
        self.selection_indexes.retain(|group| !group.is_empty());

        tracing::debug!(index, keyframes = self.keyframes.len(), "Removed keyframe");
        self.keyframes_changed();
        Ok(())
    }

    /// Replace keyframe metadata in place; track values are untouched.
    ///
    /// # Panics
    /// Panics on any [`ContractViolation`]; see [`Animation::try_replace_keyframes`].
    #[track_caller]
    pub fn replace_keyframes(&mut self, keyframes: Vec<Keyframe>) {
        self.try_replace_keyframes(keyframes).unwrap_or_else(|e| panic!("{e}"));
    }

    /// Replace the whole keyframe sequence with one of the same length
    pub fn try_replace_keyframes(&mut self, keyframes: Vec<Keyframe>) -> Result<(), ContractViolation> {
        if keyframes.len() != self.keyframes.len() {
            return Err(ContractViolation::KeyframeCountMismatch {
                expected: self.keyframes.len(),
                found: keyframes.len(),
            });
        }
        check_increasing(&keyframes)?;
        self.keyframes = keyframes;
        tracing::debug!(keyframes = self.keyframes.len(), "Replaced keyframes");
        self.keyframes_changed();
        Ok(())
    }

    fn keyframes_changed(&mut self) {
        debug_assert!(self.validate().is_ok(), "track lengths diverged from keyframes");
        self.time_length = self.time_length.max(self.min_time_length());
        self.edit_index = self.edit_index.min(self.keyframes.len() - 1);
        self.invalidate_loop_table();
        self.update(self.time);
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Groups of selected keyframe indexes
    pub fn selection_indexes(&self) -> &[Vec<usize>] {
        &self.selection_indexes
    }

    /// Replace the keyframe selection, rejecting indexes out of range
    pub fn set_selection_indexes(&mut self, groups: Vec<Vec<usize>>) -> Result<(), ContractViolation> {
        let len = self.keyframes.len();
        if let Some(&index) = groups.iter().flatten().find(|&&i| i >= len) {
            return Err(ContractViolation::IndexOutOfRange { index, len });
        }
        self.selection_indexes = groups;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Derived time queries
    // ------------------------------------------------------------------

    /// Keyframe sequence
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Total duration
    pub fn time_length(&self) -> Beat {
        self.time_length
    }

    /// Set the total duration, clamped to [`Animation::min_time_length`]
    pub fn set_time_length(&mut self, time_length: Beat) {
        let clamped = time_length.max(self.min_time_length());
        if clamped != self.time_length {
            self.time_length = clamped;
            self.invalidate_loop_table();
            self.update(self.time);
        }
    }

    /// Shortest duration that still shows the last keyframe
    pub fn min_time_length(&self) -> Beat {
        self.last_keyframe_time() + Beat::ONE
    }

    /// Time of the last keyframe
    pub fn last_keyframe_time(&self) -> Beat {
        self.keyframes.last().map_or(Beat::ZERO, |k| k.time)
    }

    /// Time of the last loop table row inside the animation.
    ///
    /// A trailing row at or past `time_length` only exists as an
    /// interpolation target, so the row before it is reported instead.
    pub fn last_looped_keyframe_time(&self) -> Beat {
        let entries = self.looped_entries();
        match entries {
            [.., before, last] if last.virtual_time >= self.time_length => before.virtual_time,
            [.., last] => last.virtual_time,
            [] => Beat::ZERO,
        }
    }

    /// Latest loop table time strictly before `time`
    pub fn previous_keyframe_time(&self, time: Beat) -> Option<Beat> {
        self.looped_entries()
            .iter()
            .rev()
            .map(|e| e.virtual_time)
            .find(|&t| t < time)
    }

    /// Earliest loop table time strictly after `time`, up to the last looped keyframe
    pub fn next_keyframe_time(&self, time: Beat) -> Option<Beat> {
        let last = self.last_looped_keyframe_time();
        self.looped_entries()
            .iter()
            .map(|e| e.virtual_time)
            .find(|&t| t > time)
            .filter(|&t| t <= last)
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new(vec![Keyframe::default()], vec![Drawing::default()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::keyframe::Loop;
    use crate::value::{Color, Line, Point};
    use approx::assert_abs_diff_eq;

    const EPS: f64 = 1e-9;

    fn beats(times: &[i64]) -> Vec<Keyframe> {
        times.iter().map(|&t| Keyframe::new(Beat::whole(t))).collect()
    }

    fn drawings(n: usize) -> Vec<Drawing> {
        (0..n)
            .map(|i| Drawing::new(vec![Line::new(vec![Point::new(i as f64, 0.0)])]))
            .collect()
    }

    fn scalar_geometry(v: f64) -> Geometry {
        Geometry::new(vec![Line::new(vec![Point::new(v, -v)])])
    }

    fn cell_value(animation: &Animation, id: CellId) -> f64 {
        animation.cell_track(id).map(|t| t.current().lines[0].points[0].x).unwrap_or(f64::NAN)
    }

    /// Animation with one cell track whose value at keyframe `i` is `values[i]`
    fn animation_with_cell(keyframes: Vec<Keyframe>, values: &[f64]) -> (Animation, CellId) {
        let n = keyframes.len();
        let mut animation = Animation::new(keyframes, drawings(n));
        let id = CellId::new();
        animation.add_cell_track(CellTrack::new(id, values.iter().map(|&v| scalar_geometry(v)).collect()));
        (animation, id)
    }

    fn full_animation() -> Animation {
        let mut animation = Animation::new(beats(&[0, 10, 20]), drawings(3));
        animation.add_cell_track(CellTrack::new(CellId::new(), (0..3).map(|i| scalar_geometry(i as f64)).collect()));
        animation.add_cell_track(CellTrack::new(CellId::new(), (0..3).map(|i| scalar_geometry(i as f64 * 2.0)).collect()));
        animation.add_material_track(MaterialTrack::new(MaterialId::new(), vec![Material::default(); 3]));
        animation.set_transform_track(Some(TransformTrack::new(vec![Transform::default(); 3])));
        animation.set_speech_track(Some(SpeechTrack::new(vec![Speech::new("a"), Speech::new("b"), Speech::new("c")])));
        animation
    }

    fn full_values(time_marker: f64) -> KeyframeValues {
        KeyframeValues {
            drawing: Drawing::default(),
            geometries: vec![scalar_geometry(time_marker), scalar_geometry(time_marker)],
            materials: vec![Material::default()],
            transform: Some(Transform::default()),
            speech: Some(Speech::new("new")),
        }
    }

    fn assert_synchronized(animation: &Animation) {
        let n = animation.keyframes().len();
        for track in animation.tracks() {
            assert_eq!(track.value_count(), n, "{:?} out of sync", track.track_type());
        }
    }

    #[test]
    fn test_first_monospline_without_predecessor() {
        let (mut animation, id) = animation_with_cell(beats(&[0, 10, 20]), &[0.0, 10.0, 20.0]);
        animation = animation.with_time_length(Beat::whole(20));
        let resolution = animation.resolve(Beat::whole(5));
        assert!(matches!(
            resolution.segment,
            Segment::FirstMonospline { i1: 0, i2: 1, i3: 2, .. }
        ));

        animation.update(Beat::whole(5));
        assert!(animation.is_interpolated());
        assert_abs_diff_eq!(cell_value(&animation, id), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mid_and_end_monospline_selection() {
        let (animation, _) = animation_with_cell(beats(&[0, 10, 20, 30]), &[0.0, 1.0, 2.0, 3.0]);
        let animation = animation.with_time_length(Beat::whole(40));
        assert!(matches!(
            animation.resolve(Beat::whole(15)).segment,
            Segment::Monospline { i0: 0, i1: 1, i2: 2, i3: 3, .. }
        ));
        assert!(matches!(
            animation.resolve(Beat::whole(25)).segment,
            Segment::EndMonospline { i0: 1, i1: 2, i2: 3, .. }
        ));
        // Last keyframe holds until the end
        assert!(matches!(animation.resolve(Beat::whole(35)).segment, Segment::Step { index: 3 }));
    }

    #[test]
    fn test_bound_blocks_smoothing() {
        let mut keyframes = beats(&[0, 10, 20, 30]);
        keyframes[0].interpolation = Interpolation::Bound;
        let (animation, _) = animation_with_cell(keyframes, &[0.0, 1.0, 2.0, 3.0]);
        let animation = animation.with_time_length(Beat::whole(40));
        assert!(matches!(
            animation.resolve(Beat::whole(15)).segment,
            Segment::FirstMonospline { i1: 1, i2: 2, i3: 3, .. }
        ));

        let mut keyframes = beats(&[0, 10, 20, 30]);
        keyframes[2].interpolation = Interpolation::Bound;
        let (animation, _) = animation_with_cell(keyframes, &[0.0, 1.0, 2.0, 3.0]);
        assert!(matches!(
            animation.resolve(Beat::whole(15)).segment,
            Segment::EndMonospline { i0: 0, i1: 1, i2: 2, .. }
        ));
    }

    #[test]
    fn test_bound_on_both_sides_falls_back_to_linear() {
        let mut keyframes = beats(&[0, 10, 20, 30]);
        keyframes[0].interpolation = Interpolation::Bound;
        keyframes[2].interpolation = Interpolation::Bound;
        let (animation, _) = animation_with_cell(keyframes, &[0.0, 1.0, 2.0, 3.0]);
        match animation.resolve(Beat::whole(15)).segment {
            Segment::Linear { i0, i1, t } => {
                assert_eq!((i0, i1), (1, 2));
                assert_abs_diff_eq!(t, 0.5, epsilon = EPS);
            }
            other => panic!("expected linear, got {other:?}"),
        }
    }

    #[test]
    fn test_linear_and_none_modes() {
        let mut keyframes = beats(&[0, 10, 20]);
        keyframes[0].interpolation = Interpolation::Linear;
        keyframes[1].interpolation = Interpolation::None;
        let (mut animation, id) = animation_with_cell(keyframes, &[0.0, 10.0, 20.0]);
        animation.update(Beat::whole(4));
        assert_abs_diff_eq!(cell_value(&animation, id), 4.0, epsilon = EPS);
        animation.update(Beat::whole(15));
        assert!(!animation.is_interpolated());
        assert_eq!(cell_value(&animation, id), 10.0);
    }

    #[test]
    fn test_two_keyframes_are_linear() {
        let (mut animation, id) = animation_with_cell(beats(&[0, 8]), &[0.0, 8.0]);
        animation = animation.with_time_length(Beat::whole(16));
        assert!(matches!(animation.resolve(Beat::whole(2)).segment, Segment::Linear { .. }));
        animation.update(Beat::whole(2));
        assert_abs_diff_eq!(cell_value(&animation, id), 2.0, epsilon = EPS);
    }

    #[test]
    fn test_easing_changes_linear_parameter() {
        let mut keyframes = beats(&[0, 10]);
        keyframes[0].easing = Easing::EASE_IN;
        let (mut animation, id) = animation_with_cell(keyframes, &[0.0, 10.0]);
        animation.update(Beat::whole(3));
        assert!(cell_value(&animation, id) < 3.0);
    }

    #[test]
    fn test_eased_spline_uses_rescaled_coordinate() {
        let mut keyframes = beats(&[0, 10, 20]);
        keyframes[0].easing = Easing::EASE_IN;
        let (animation, _) = animation_with_cell(keyframes, &[0.0, 10.0, 20.0]);
        let time = Beat::whole(5);
        let Segment::FirstMonospline { pack, .. } = animation.resolve(time).segment else {
            panic!("expected first monospline");
        };
        let t = Easing::EASE_IN.convert_t(0.5);
        assert_abs_diff_eq!(pack.t, t, epsilon = EPS);
        let expected = Monospline::first(0.0, 10.0, 20.0, t * 10.0, t);
        assert_eq!(pack, expected);
    }

    fn looped_region_animation() -> (Animation, CellId) {
        let mut keyframes = beats(&[0, 5, 10, 15]);
        keyframes[0].loop_ = Loop::START;
        keyframes[3].loop_ = Loop::END;
        let (mut animation, id) = animation_with_cell(keyframes, &[0.0, 1.0, 2.0, 3.0]);
        animation.set_time_length(Beat::whole(40));
        (animation, id)
    }

    #[test]
    fn test_loop_replay_resolution() {
        let (mut animation, id) = looped_region_animation();

        // Every half beat of the timeline: first play, first replay, second replay
        for half_beats in 0..80 {
            let time = Beat::new(half_beats, 2);
            let resolution = animation.resolve(time);
            let expected_pass = match half_beats {
                0..=29 => 0,
                30..=59 => 1,
                _ => 2,
            };
            assert_eq!(resolution.entry.looping_count, expected_pass, "at {time}");
            assert_ne!(resolution.entry.original_index, 3, "at {time}");
            if (40..60).contains(&half_beats) {
                assert!([1, 2].contains(&resolution.entry.original_index), "at {time}");
            }
        }

        let first_replay = animation.resolve(Beat::whole(22)).entry;
        let second_replay = animation.resolve(Beat::whole(37)).entry;
        assert_eq!(first_replay.original_index, second_replay.original_index);
        assert_ne!(first_replay.looping_count, second_replay.looping_count);

        animation.update(Beat::whole(20));
        assert_eq!(animation.edit_index(), 1);
        assert_eq!(cell_value(&animation, id), 1.0);
    }

    #[test]
    fn test_end_of_looped_timeline_steps_to_trailing_row() {
        let (mut animation, id) = looped_region_animation();
        let last = animation.looped_entries().len() - 1;
        assert_eq!(last, 8);
        assert_eq!(animation.looped_entries()[last].virtual_time, Beat::whole(40));

        for time in [Beat::whole(40), Beat::new(81, 2), Beat::whole(55)] {
            let resolution = animation.resolve(time);
            assert_eq!(resolution.looped_index, last, "at {time}");
            assert_eq!(resolution.segment, Segment::Step { index: 2 }, "at {time}");
        }

        animation.update(Beat::whole(40));
        assert!(!animation.is_interpolated());
        assert_eq!(animation.edit_index(), 2);
        assert_eq!(cell_value(&animation, id), 2.0);
    }

    #[test]
    fn test_boundaries_step() {
        let (animation, _) = animation_with_cell(beats(&[0, 10, 20]), &[0.0, 1.0, 2.0]);
        let animation = animation.with_time_length(Beat::whole(30));
        assert_eq!(animation.resolve(Beat::whole(-3)).segment, Segment::Step { index: 0 });
        assert_eq!(animation.resolve(Beat::ZERO).segment, Segment::Step { index: 0 });
        assert_eq!(animation.resolve(Beat::whole(30)).segment, Segment::Step { index: 2 });
        assert_eq!(animation.resolve(Beat::whole(99)).segment, Segment::Step { index: 2 });
        assert_eq!(animation.resolve(Beat::whole(10)).segment, Segment::Step { index: 1 });
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut animation = full_animation();
        let time = Beat::new(37, 3);
        animation.update(time);
        let first: Vec<Geometry> = animation.cell_tracks().map(|t| t.current().clone()).collect();
        let first_material = *animation.material_tracks().next().map(|t| t.current()).unwrap();
        animation.update(time);
        let second: Vec<Geometry> = animation.cell_tracks().map(|t| t.current().clone()).collect();
        assert_eq!(first, second);
        assert_eq!(&first_material, animation.material_tracks().next().map(|t| t.current()).unwrap());
    }

    #[test]
    fn test_linear_continuity_at_segment_ends() {
        let mut keyframes = beats(&[0, 10, 20]);
        for k in &mut keyframes {
            k.interpolation = Interpolation::Linear;
        }
        let (mut animation, id) = animation_with_cell(keyframes, &[3.0, 7.0, 11.0]);
        let track = animation.cell_tracks.get_mut(&id).unwrap();
        track.linear(0, 1, 0.0);
        let left = track.current().clone();
        track.step(0);
        assert_eq!(&left, track.current());
        track.linear(0, 1, 1.0);
        let right = track.current().clone();
        track.step(1);
        assert_eq!(&right, track.current());

        animation.update(Beat::whole(10));
        assert_eq!(cell_value(&animation, id), 7.0);
    }

    #[test]
    fn test_linear_continuity_with_inexact_values() {
        let (mut animation, id) = animation_with_cell(beats(&[0, 10]), &[5.28, -4.9]);
        let track = animation.cell_tracks.get_mut(&id).unwrap();
        track.linear(0, 1, 1.0);
        let right = track.current().clone();
        track.step(1);
        assert_eq!(&right, track.current());
        track.linear(0, 1, 0.0);
        let left = track.current().clone();
        track.step(0);
        assert_eq!(&left, track.current());

        let mut track = MaterialTrack::new(
            MaterialId::new(),
            [0.9, 0.1]
                .map(|hue| Material { color: Color::new(hue, 0.35, 0.65), ..Material::default() })
                .to_vec(),
        );
        track.linear(0, 1, 1.0);
        let right = *track.current();
        track.step(1);
        assert_eq!(&right, track.current());
        assert_eq!(right.color.hue, 0.1);
    }

    #[test]
    fn test_insert_keeps_tracks_in_sync() {
        let mut animation = full_animation();
        animation.insert_keyframe(Keyframe::new(Beat::whole(15)), full_values(9.0), 2);
        assert_eq!(animation.keyframes().len(), 4);
        assert_synchronized(&animation);
        assert_eq!(animation.keyframes()[2].time, Beat::whole(15));
        assert_eq!(animation.speech_track().unwrap().speeches()[2].text, "new");
        assert_eq!(animation.looped_entries().len(), 4);
    }

    #[test]
    fn test_insert_with_short_geometry_list_is_rejected() {
        let mut animation = full_animation();
        let before_keyframes = animation.keyframes().to_vec();
        let mut values = full_values(1.0);
        values.geometries.pop();

        let err = animation
            .try_insert_keyframe(Keyframe::new(Beat::whole(5)), values, 1)
            .unwrap_err();
        assert_eq!(err, ContractViolation::ValueCountMismatch { track: "cell", expected: 2, found: 1 });
        assert_eq!(animation.keyframes(), before_keyframes.as_slice());
        assert_synchronized(&animation);
        assert!(animation.cell_tracks().all(|t| t.geometries().len() == 3));
    }

    #[test]
    #[should_panic(expected = "transform")]
    fn test_insert_missing_transform_panics() {
        let mut animation = full_animation();
        let mut values = full_values(1.0);
        values.transform = None;
        animation.insert_keyframe(Keyframe::new(Beat::whole(5)), values, 1);
    }

    #[test]
    fn test_insert_out_of_order_is_rejected() {
        let mut animation = full_animation();
        let err = animation.try_insert_keyframe(Keyframe::new(Beat::whole(25)), full_values(0.0), 1);
        assert!(matches!(err, Err(ContractViolation::NonIncreasingTime { index: 1, .. })));
        assert_synchronized(&animation);
    }

    #[test]
    fn test_remove_keeps_tracks_in_sync() {
        let mut animation = full_animation();
        animation.set_selection_indexes(vec![vec![0, 2], vec![1]]).unwrap();
        animation.remove_keyframe(1);
        assert_eq!(animation.keyframes().len(), 2);
        assert_synchronized(&animation);
        assert_eq!(animation.selection_indexes(), &[vec![0, 1]]);
        assert_eq!(animation.speech_track().unwrap().speeches()[1].text, "c");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_remove_out_of_range_panics() {
        let mut animation = full_animation();
        animation.remove_keyframe(3);
    }

    #[test]
    fn test_remove_last_keyframe_is_rejected() {
        let mut animation = Animation::default();
        assert_eq!(animation.try_remove_keyframe(0), Err(ContractViolation::EmptyKeyframes));
    }

    #[test]
    fn test_replace_keyframes() {
        let mut animation = full_animation();
        let mut replacement = animation.keyframes().to_vec();
        replacement[1].interpolation = Interpolation::Linear;
        replacement[2] = replacement[2].at(Beat::whole(40));
        animation.replace_keyframes(replacement);
        assert_eq!(animation.keyframes()[1].interpolation, Interpolation::Linear);
        assert_eq!(animation.min_time_length(), Beat::whole(41));
        assert!(animation.time_length() >= Beat::whole(41));
        assert_synchronized(&animation);

        let err = animation.try_replace_keyframes(beats(&[0, 1]));
        assert_eq!(err, Err(ContractViolation::KeyframeCountMismatch { expected: 3, found: 2 }));
    }

    #[test]
    fn test_attaching_wrong_length_track_is_rejected() {
        let mut animation = Animation::new(beats(&[0, 10]), drawings(2));
        let err = animation.try_add_material_track(MaterialTrack::new(MaterialId::new(), vec![Material::default()]));
        assert_eq!(
            err,
            Err(ContractViolation::TrackLengthMismatch { track: "material", expected: 2, found: 1 })
        );
        assert_eq!(animation.material_tracks().count(), 0);
    }

    #[test]
    fn test_material_hue_wraps_during_update() {
        let mut keyframes = beats(&[0, 10]);
        keyframes[0].interpolation = Interpolation::Linear;
        let mut animation = Animation::new(keyframes, drawings(2));
        let id = MaterialId::new();
        let material = |hue| Material { color: Color::new(hue, 1.0, 0.5), ..Material::default() };
        animation.add_material_track(MaterialTrack::new(id, vec![material(0.9), material(0.1)]));
        animation.update(Beat::whole(5));
        let hue = animation.material_track(id).unwrap().current().color.hue;
        assert!(hue < 1e-6 || hue > 1.0 - 1e-6);
    }

    #[test]
    fn test_derived_time_queries() {
        let mut keyframes = beats(&[0, 5, 10, 15]);
        keyframes[0].loop_ = Loop::START;
        keyframes[3].loop_ = Loop::END;
        let animation = Animation::new(keyframes, drawings(4)).with_time_length(Beat::whole(40));
        assert_eq!(animation.last_keyframe_time(), Beat::whole(15));
        assert_eq!(animation.min_time_length(), Beat::whole(16));
        // Trailing row at 40 is only an interpolation target
        assert_eq!(animation.last_looped_keyframe_time(), Beat::whole(35));
        assert_eq!(animation.next_keyframe_time(Beat::whole(12)), Some(Beat::whole(15)));
        assert_eq!(animation.next_keyframe_time(Beat::whole(35)), None);
        assert_eq!(animation.previous_keyframe_time(Beat::whole(15)), Some(Beat::whole(10)));
        assert_eq!(animation.previous_keyframe_time(Beat::ZERO), None);
        assert_eq!(animation.keyframe_index_at(Beat::whole(31)), 0);
    }

    #[test]
    fn test_time_length_is_clamped() {
        let mut animation = Animation::new(beats(&[0, 10]), drawings(2));
        animation.set_time_length(Beat::whole(3));
        assert_eq!(animation.time_length(), Beat::whole(11));
    }

    #[test]
    fn test_drawing_track_steps_while_cells_blend() {
        let (mut animation, id) = animation_with_cell(beats(&[0, 10, 20]), &[0.0, 10.0, 20.0]);
        animation.update(Beat::whole(7));
        assert!(animation.is_interpolated());
        assert_eq!(animation.drawing_track().current(), &animation.drawing_track().drawings()[0]);
        assert!(cell_value(&animation, id) > 0.0);
        assert_eq!(animation.edit_keyframe().time, Beat::ZERO);
    }

    #[test]
    #[should_panic(expected = "at least one keyframe")]
    fn test_empty_animation_panics() {
        let _ = Animation::new(Vec::new(), Vec::new());
    }
}
