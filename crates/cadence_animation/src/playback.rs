// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback control over an [`Animation`].

use crate::animation::Animation;
use crate::beat::Beat;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing forward
    Playing,
    /// Paused
    Paused,
    /// Playing in reverse
    Reverse,
}

/// Drives an animation's time forward or backward in beat steps
#[derive(Debug, Clone, Default)]
pub struct PlaybackController {
    /// Playback state
    pub state: PlaybackState,
    /// Wrap around at the ends instead of stopping
    pub looping: bool,
}

impl PlaybackController {
    /// Create a new playback controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller that wraps at the ends
    pub fn looping() -> Self {
        Self { looping: true, ..Self::default() }
    }

    /// Advance playback by `delta` and update the animation
    pub fn advance(&mut self, delta: Beat, animation: &mut Animation) {
        let time = match self.state {
            PlaybackState::Playing => self.check_bounds(animation.time() + delta, animation),
            PlaybackState::Reverse => self.check_bounds_reverse(animation.time() - delta, animation),
            PlaybackState::Paused | PlaybackState::Stopped => return,
        };
        animation.update(time);
    }

    fn check_bounds(&mut self, time: Beat, animation: &Animation) -> Beat {
        let end_time = animation.time_length();
        if time < end_time {
            return time;
        }
        if self.looping {
            wrap(time, end_time)
        } else {
            self.state = PlaybackState::Stopped;
            end_time
        }
    }

    fn check_bounds_reverse(&mut self, time: Beat, animation: &Animation) -> Beat {
        if time > Beat::ZERO {
            return time;
        }
        if self.looping {
            wrap(time, animation.time_length())
        } else {
            self.state = PlaybackState::Stopped;
            Beat::ZERO
        }
    }

    /// Play from current position
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.is_playing() {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and rewind the animation to the start
    pub fn stop(&mut self, animation: &mut Animation) {
        self.state = PlaybackState::Stopped;
        animation.update(Beat::ZERO);
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Reverse => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Play in reverse
    pub fn play_reverse(&mut self) {
        self.state = PlaybackState::Reverse;
    }

    /// Is currently playing (forward or reverse)
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Reverse)
    }

    /// Seek to a time clamped into `[0, time_length]`
    pub fn seek(&mut self, time: Beat, animation: &mut Animation) {
        animation.update(time.clamp(Beat::ZERO, animation.time_length()));
    }

    /// Jump to the previous keyframe on the unrolled timeline.
    ///
    /// Returns `false` when already at or before the first one.
    pub fn previous_keyframe(&mut self, animation: &mut Animation) -> bool {
        match animation.previous_keyframe_time(animation.time()) {
            Some(time) => {
                animation.update(time);
                true
            }
            None => false,
        }
    }

    /// Jump to the next keyframe on the unrolled timeline.
    ///
    /// Returns `false` when already at or past the last looped keyframe.
    pub fn next_keyframe(&mut self, animation: &mut Animation) -> bool {
        match animation.next_keyframe_time(animation.time()) {
            Some(time) => {
                animation.update(time);
                true
            }
            None => false,
        }
    }
}

/// Bring `time` back into `[0, length)`
fn wrap(time: Beat, length: Beat) -> Beat {
    if length <= Beat::ZERO {
        return Beat::ZERO;
    }
    time.rem_euclid(length)
}
