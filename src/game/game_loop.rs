//! Game Loop
//!
//! Fixed-timestep scheduling: wall-clock time accumulates per rendered
//! frame, and the simulation runs zero or more fixed ticks to catch up. A
//! cap on catch-up steps keeps a long stall from spiraling - when the cap
//! hits, the excess accumulated time is discarded rather than carried.
//!
//! The loop never decides when the game is over; it observes an external
//! stop signal, and only between ticks, so entities are always left in a
//! consistent post-tick state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::game::events::GameEvent;
use crate::game::input::InputSnapshot;
use crate::game::step;
use crate::game::world::World;

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Wall-clock duration of one tick
pub const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);

/// Catch-up steps allowed per frame before excess lag is dropped
pub const MAX_CATCHUP_STEPS: u32 = 5;

/// Cloneable stop flag, safe to raise from another thread.
///
/// The loop checks it between ticks only; a tick in progress always
/// finishes.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    inner: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create an un-raised signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal (win, loss, or quit - the loop does not care which).
    pub fn raise(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    /// Has the signal been raised?
    pub fn is_raised(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

/// What one frame of the loop did.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Simulation ticks run this frame
    pub steps: u32,
    /// Accumulated time discarded because the catch-up cap was hit
    pub discarded: Duration,
    /// Events from all ticks run this frame, in order
    pub events: Vec<GameEvent>,
    /// The stop signal was observed raised
    pub stopped: bool,
}

/// Fixed-timestep catch-up loop.
#[derive(Debug)]
pub struct GameLoop {
    tick_duration: Duration,
    max_catchup: u32,
    accumulator: Duration,
    stop: StopSignal,
}

impl GameLoop {
    /// Create a loop at the standard 60 Hz timing.
    pub fn new(stop: StopSignal) -> Self {
        Self::with_timing(TICK_DURATION, MAX_CATCHUP_STEPS, stop)
    }

    /// Create a loop with explicit timing, for tests and tools.
    pub fn with_timing(tick_duration: Duration, max_catchup: u32, stop: StopSignal) -> Self {
        Self {
            tick_duration,
            max_catchup,
            accumulator: Duration::ZERO,
            stop,
        }
    }

    /// Handle to the loop's stop signal.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Time banked toward the next tick.
    pub fn accumulated(&self) -> Duration {
        self.accumulator
    }

    /// Advance by one rendered frame's worth of wall-clock time.
    ///
    /// Runs as many fixed ticks as the accumulator covers, up to the
    /// catch-up cap; the same input snapshot feeds every tick of the frame.
    pub fn frame(
        &mut self,
        world: &mut World,
        input: &InputSnapshot,
        elapsed: Duration,
    ) -> FrameReport {
        self.accumulator += elapsed;

        let mut report = FrameReport::default();
        while self.accumulator >= self.tick_duration {
            // Stop is honored between ticks only
            if self.stop.is_raised() {
                report.stopped = true;
                return report;
            }
            if report.steps == self.max_catchup {
                // Spiral-of-death guard: drop the leftover lag
                report.discarded = self.accumulator;
                self.accumulator = Duration::ZERO;
                return report;
            }

            self.accumulator -= self.tick_duration;
            let result = step::advance(world, input);
            report.events.extend(result.events);
            report.steps += 1;
        }

        report.stopped = self.stop.is_raised();
        report
    }
}

// =============================================================================
// TESTS
// =============================================================================
