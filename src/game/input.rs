//! Input Snapshots
//!
//! The normalized, device-independent view of player input the simulation
//! consumes. Device polling, deadzones, and key-repeat suppression are the
//! input collaborator's job; by the time a snapshot reaches the core it is
//! just logical actions, captured once per tick and immutable within it.
//!
//! The i8-to-Fixed conversion goes through a precomputed lookup table so
//! the mapping is bit-exact on every platform.

use serde::{Deserialize, Serialize};

use crate::core::fixed::Fixed;

// =============================================================================
// MOVE LOOKUP TABLE (Critical for Determinism)
// =============================================================================

/// Lookup table for converting i8 move input to Fixed.
///
/// Scaling [-127..+127] to [-1.0..+1.0] requires dividing by 127, which is
/// not exact in Q16.16; the table precomputes the floor-division result for
/// all 256 raw values so every platform agrees on every axis value.
///
/// Index 128 (-128 as i8) represents "axis released" and maps to 0.
pub static MOVE_LUT: [Fixed; 256] = {
    let mut lut = [0i32; 256];
    let mut i = 0i32;
    while i < 256 {
        // Treat as signed: 0..127 = positive, 128..255 = negative (-128..-1)
        let signed = if i < 128 { i } else { i - 256 };

        // -128 is reserved for "no input" -> map to 0
        if signed == -128 {
            lut[i as usize] = 0;
        } else {
            // Scale [-127..+127] to [-65536..+65536], floor division
            lut[i as usize] = (signed * 65536) / 127;
        }
        i += 1;
    }
    lut
};

/// Convert i8 move input to Fixed using the lookup table.
#[inline]
pub fn move_to_fixed(input: i8) -> Fixed {
    MOVE_LUT[(input as u8) as usize]
}

// =============================================================================
// INPUT SNAPSHOT
// =============================================================================

/// Logical actions for one tick.
///
/// `move_x` is the horizontal axis (-127 left to +127 right, -128 =
/// released). `jump` and `action` are level states; edge detection for
/// "newly pressed" happens in the simulation against the previous tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Horizontal axis: -127 (left) to +127 (right), -128 = released
    pub move_x: i8,

    /// Action flags (packed bits), see `FLAG_*`
    pub flags: u8,
}

impl InputSnapshot {
    /// Special axis value indicating no input (stick released)
    pub const NO_INPUT: i8 = -128;

    /// Jump button held
    pub const FLAG_JUMP: u8 = 0x01;

    /// Action (attack) button held
    pub const FLAG_ACTION: u8 = 0x02;

    /// Create an idle snapshot.
    pub const fn new() -> Self {
        Self {
            move_x: Self::NO_INPUT,
            flags: 0,
        }
    }

    /// Create a snapshot with a horizontal axis value.
    pub const fn with_move(move_x: i8) -> Self {
        Self { move_x, flags: 0 }
    }

    /// Horizontal axis as a Fixed in [-1.0, +1.0].
    #[inline]
    pub fn move_axis(&self) -> Fixed {
        move_to_fixed(self.move_x)
    }

    /// Is the jump button held this tick?
    #[inline]
    pub fn jump(&self) -> bool {
        self.flags & Self::FLAG_JUMP != 0
    }

    /// Is the action button held this tick?
    #[inline]
    pub fn action(&self) -> bool {
        self.flags & Self::FLAG_ACTION != 0
    }

    /// Is this an idle snapshot?
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.move_x == Self::NO_INPUT && self.flags == 0
    }

    /// Set the jump flag.
    #[inline]
    pub fn set_jump(&mut self, held: bool) {
        if held {
            self.flags |= Self::FLAG_JUMP;
        } else {
            self.flags &= !Self::FLAG_JUMP;
        }
    }

    /// Set the action flag.
    #[inline]
    pub fn set_action(&mut self, held: bool) {
        if held {
            self.flags |= Self::FLAG_ACTION;
        } else {
            self.flags &= !Self::FLAG_ACTION;
        }
    }
}

// =============================================================================
// INPUT TIMELINE
// =============================================================================

/// Change entry in a timeline: the snapshot that took effect at a tick.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick when this snapshot began
    pub tick: u32,
    /// The new snapshot
    pub snapshot: InputSnapshot,
}

/// Delta-compressed input recording for one session.
///
/// Only stores ticks where the snapshot changed. Used for replay playback
/// and the determinism checks (two runs of the same timeline must hash to
/// the same world state).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputTimeline {
    /// Last tick covered by the recording
    pub end_tick: u32,

    deltas: Vec<InputDelta>,

    #[serde(skip)]
    last: InputSnapshot,
}

impl InputTimeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self {
            end_tick: 0,
            deltas: Vec::new(),
            last: InputSnapshot::new(),
        }
    }

    /// Record the snapshot for a tick. Only stores a delta if it changed.
    pub fn record(&mut self, tick: u32, snapshot: InputSnapshot) {
        self.end_tick = tick;
        if snapshot != self.last {
            self.deltas.push(InputDelta { tick, snapshot });
            self.last = snapshot;
        }
    }

    /// Snapshot in effect at a tick (idle before the first delta).
    ///
    /// Binary search over the delta list.
    pub fn get_at(&self, tick: u32) -> InputSnapshot {
        let idx = self.deltas.partition_point(|d| d.tick <= tick);
        if idx == 0 {
            InputSnapshot::new()
        } else {
            self.deltas[idx - 1].snapshot
        }
    }

    /// Number of stored deltas.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Iterate (tick, snapshot) pairs from 0 through `end_tick`.
    pub fn replay_iter(&self) -> ReplayIter<'_> {
        ReplayIter {
            timeline: self,
            current_tick: 0,
            delta_idx: 0,
            current: InputSnapshot::new(),
        }
    }
}

/// Iterator replaying a timeline tick by tick.
pub struct ReplayIter<'a> {
    timeline: &'a InputTimeline,
    current_tick: u32,
    delta_idx: usize,
    current: InputSnapshot,
}

impl<'a> Iterator for ReplayIter<'a> {
    type Item = (u32, InputSnapshot);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_tick > self.timeline.end_tick {
            return None;
        }

        while self.delta_idx < self.timeline.deltas.len() {
            let delta = &self.timeline.deltas[self.delta_idx];
            if delta.tick <= self.current_tick {
                self.current = delta.snapshot;
                self.delta_idx += 1;
            } else {
                break;
            }
        }

        let result = (self.current_tick, self.current);
        self.current_tick += 1;
        Some(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
