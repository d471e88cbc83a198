// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loop region expansion.
//!
//! A keyframe flagged `loop.is_start` opens a region and a later keyframe
//! flagged `loop.is_end` closes it. At the closing keyframe's time the region
//! replays from its start, again and again, until the next keyframe (or the
//! end of the animation) is reached. [`expand_loops`] unrolls all of this into
//! a flat table whose virtual times are strictly increasing, so the resolver
//! can treat a looped timeline exactly like a plain one.

use crate::beat::Beat;
use crate::keyframe::Keyframe;
use serde::{Deserialize, Serialize};

/// One row of the unrolled timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopedEntry {
    /// Keyframe (and track value) index this row replays
    pub original_index: usize,
    /// Time of the row on the unrolled timeline
    pub virtual_time: Beat,
    /// Loop nesting depth plus one for every replay the row belongs to
    pub loop_count: usize,
    /// Replay pass that emitted the row: 0 on the first play, `n` on the n-th replay
    pub looping_count: usize,
}

/// Unroll every loop region of `keyframes` over an animation of `duration`.
///
/// Keyframe times must be strictly increasing. The result always holds at
/// least one row per keyframe that is not a replaying loop end.
pub fn expand_loops(keyframes: &[Keyframe], duration: Beat) -> Vec<LoopedEntry> {
    let mut entries: Vec<LoopedEntry> = Vec::with_capacity(keyframes.len());
    // Table positions of currently open loop starts
    let mut open_starts: Vec<usize> = Vec::new();

    for (i, keyframe) in keyframes.iter().enumerate() {
        let first_row = entries.len();
        let mut replayed = false;
        if keyframe.loop_.is_end {
            if let Some(start) = open_starts.pop() {
                replayed = replay(&mut entries, start, i, keyframes, duration);
            }
        }
        if !replayed {
            let loop_count = open_starts.len() + usize::from(keyframe.loop_.is_start);
            entries.push(LoopedEntry {
                original_index: i,
                virtual_time: keyframe.time,
                loop_count,
                looping_count: 0,
            });
        }
        if keyframe.loop_.is_start {
            open_starts.push(first_row);
        }
    }
    entries
}

/// Replay the rows from `start` up to the loop end keyframe `end_index`.
///
/// Returns `false` when there is no room for even one replayed row, in which
/// case the loop end degenerates to an ordinary keyframe.
fn replay(
    entries: &mut Vec<LoopedEntry>,
    start: usize,
    end_index: usize,
    keyframes: &[Keyframe],
    duration: Beat,
) -> bool {
    let end_time = keyframes[end_index].time;
    let is_last = end_index + 1 == keyframes.len();
    let bound = keyframes.get(end_index + 1).map_or(duration, |k| k.time);
    let region: Vec<LoopedEntry> = entries[start..].to_vec();
    if region.is_empty() || region[0].virtual_time >= end_time {
        return false;
    }

    let mut cursor = end_time;
    let mut pass = 1;
    let mut emitted = false;
    'replay: loop {
        for (k, row) in region.iter().enumerate() {
            if cursor >= bound {
                if is_last && emitted {
                    // Target for interpolating out of the final replayed row
                    entries.push(LoopedEntry {
                        virtual_time: cursor,
                        loop_count: row.loop_count + pass,
                        looping_count: pass,
                        ..*row
                    });
                }
                break 'replay;
            }
            entries.push(LoopedEntry {
                virtual_time: cursor,
                loop_count: row.loop_count + pass,
                looping_count: pass,
                ..*row
            });
            emitted = true;
            let next_time = region.get(k + 1).map_or(end_time, |n| n.virtual_time);
            cursor += next_time - row.virtual_time;
        }
        pass += 1;
    }
    emitted
}
