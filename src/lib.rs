//! # Orchard
//!
//! Deterministic 2D platformer simulation runtime: a fixed-timestep game
//! loop, a tile-grid collision resolver, and an entity state machine,
//! decoupled from rendering, audio, and input devices.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         ORCHARD                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                 │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic            │
//! │  ├── vec2.rs     - 2D vector (y-down screen convention)     │
//! │  └── hash.rs     - State hashing for replay verification    │
//! │                                                             │
//! │  game/           - Simulation (deterministic)               │
//! │  ├── grid.rs     - Immutable tile grid                      │
//! │  ├── level.rs    - Parsed-level input surface               │
//! │  ├── input.rs    - Input snapshots and replay timelines     │
//! │  ├── entity.rs   - Entities, kind table, state machine      │
//! │  ├── behavior.rs - Per-kind intent (input / AI)             │
//! │  ├── collision.rs- Swept tile collision resolution          │
//! │  ├── world.rs    - Level/session context                    │
//! │  ├── step.rs     - Per-tick simulation step                 │
//! │  ├── events.rs   - Priority-ordered game events             │
//! │  └── game_loop.rs- Fixed-timestep catch-up loop             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The simulation is **100% deterministic**:
//! - No floating-point arithmetic in game logic (floats only at the
//!   render/debug boundary)
//! - No HashMap (BTreeMap for sorted iteration)
//! - No system time dependencies inside a tick
//!
//! Given an identical level and input timeline, two runs produce
//! bit-identical entity state, verifiable by SHA-256 state hash.
//!
//! ## Collaborators
//!
//! Map parsing, rendering, audio, device polling, and save-file encoding
//! live outside this crate. The runtime consumes a parsed [`game::LevelData`]
//! and one [`game::InputSnapshot`] per tick, and hands back read-only
//! render snapshots, priority-ordered events, and serializable save state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use crate::core::fixed::{Fixed, FIXED_HALF, FIXED_ONE, FIXED_SCALE};
pub use crate::core::hash::StateHash;
pub use crate::core::vec2::FixedVec2;
pub use game::game_loop::{MAX_CATCHUP_STEPS, TICK_DURATION, TICK_RATE};
pub use game::{
    CellKind, Entity, EntityId, EntityKind, EntityState, GameEvent, GameLoop, InputSnapshot,
    InputTimeline, LevelData, StopSignal, World,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
