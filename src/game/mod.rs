//! Simulation Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `grid`: immutable tile grid and cell queries
//! - `level`: parsed-level input surface and spawn descriptors
//! - `input`: normalized input snapshots and replay timelines
//! - `entity`: entity data, kind table, and the state machine
//! - `behavior`: per-kind intent (input application and AI)
//! - `collision`: axis-separated swept collision resolution
//! - `world`: the level/session context owning grid and entities
//! - `step`: the per-tick simulation step
//! - `events`: priority-ordered game events
//! - `game_loop`: fixed-timestep catch-up scheduling

pub mod behavior;
pub mod collision;
pub mod entity;
pub mod events;
pub mod game_loop;
pub mod grid;
pub mod input;
pub mod level;
pub mod step;
pub mod world;

// Re-export key types
pub use collision::{Aabb, CollisionResult, ContactFlags};
pub use entity::{Entity, EntityId, EntityKind, EntityState, Facing};
pub use events::{DeathCause, GameEvent, GameEventData};
pub use game_loop::{FrameReport, GameLoop, StopSignal};
pub use grid::{CellKind, LevelError, TileGrid};
pub use input::{InputSnapshot, InputTimeline};
pub use level::{LevelData, SpawnDescriptor};
pub use step::{advance, StepResult};
pub use world::{EntityView, SaveState, SpawnError, World};
