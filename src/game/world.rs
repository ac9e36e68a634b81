//! World State
//!
//! The Level/Session context: owns the tile grid and the entity collection
//! for the duration of a level, under a single-writer-per-tick discipline.
//! Entities live in a BTreeMap so every iteration order is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::vec2::FixedVec2;
use crate::game::entity::{Entity, EntityId, EntityKind, EntityState, Facing};
use crate::game::events::GameEvent;
use crate::game::grid::{LevelError, TileGrid};
use crate::game::level::LevelData;

/// Error raised for a spawn request the world cannot honor.
///
/// A rejected spawn is logged and skipped; the simulation continues without
/// that entity.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The level named an entity kind this build does not know.
    #[error("unknown entity kind \"{0}\"")]
    UnknownKind(String),
}

/// Complete state of a running level.
pub struct World {
    /// Level identifier (carried into save states)
    pub level_id: String,

    /// Current tick
    pub tick: u32,

    /// Immutable level geometry
    pub grid: TileGrid,

    /// All entities (BTreeMap for deterministic iteration)
    pub entities: BTreeMap<EntityId, Entity>,

    /// The one input-driven entity, if still present
    pub player_id: Option<EntityId>,

    /// Events generated this tick (drained at tick end)
    pub pending_events: Vec<GameEvent>,

    next_entity_id: u32,
}

impl World {
    /// Build a world from a parsed level.
    ///
    /// Spawn descriptors naming unknown kinds are rejected with a warning
    /// and skipped; a bad spawn never fails level load.
    pub fn from_level(level: &LevelData) -> Result<Self, LevelError> {
        let grid = level.build_grid()?;
        let mut world = Self {
            level_id: level.id.clone(),
            tick: 0,
            grid,
            entities: BTreeMap::new(),
            player_id: None,
            pending_events: Vec::new(),
            next_entity_id: 0,
        };

        for descriptor in &level.spawns {
            match EntityKind::from_name(&descriptor.kind) {
                Some(kind) => {
                    world.spawn(kind, FixedVec2::new(descriptor.x, descriptor.y));
                }
                None => {
                    warn!(kind = %descriptor.kind, "rejecting spawn of unknown entity kind");
                }
            }
        }

        Ok(world)
    }

    /// Spawn an entity with its feet at `foot`. Returns the new id.
    pub fn spawn(&mut self, kind: EntityKind, foot: FixedVec2) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;

        let entity = Entity::spawn_at_foot(id, kind, foot);
        if kind == EntityKind::Player {
            self.player_id = Some(id);
        }
        self.pending_events
            .push(GameEvent::spawned(self.tick, id, kind, entity.position));
        self.entities.insert(id, entity);
        id
    }

    /// Spawn from a name, rejecting unknown kinds.
    pub fn spawn_named(&mut self, name: &str, foot: FixedVec2) -> Result<EntityId, SpawnError> {
        match EntityKind::from_name(name) {
            Some(kind) => Ok(self.spawn(kind, foot)),
            None => Err(SpawnError::UnknownKind(name.to_string())),
        }
    }

    /// The player entity, if present.
    pub fn player(&self) -> Option<&Entity> {
        self.player_id.and_then(|id| self.entities.get(&id))
    }

    /// Purge entities that are Dead or marked removed. The player id is
    /// cleared if the player was purged.
    pub fn purge(&mut self) {
        self.entities
            .retain(|_, e| e.state != EntityState::Dead && !e.removed);
        if let Some(id) = self.player_id {
            if !self.entities.contains_key(&id) {
                self.player_id = None;
            }
        }
    }

    /// Take this tick's pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// Snap an overlapping entity to the nearest free position.
    ///
    /// Best-effort recovery for the post-resolution invariant: tries
    /// quarter-cell offsets in increasing distance, preferring up, then
    /// down, then left, then right. Returns the new position on success.
    pub fn snap_free(grid: &TileGrid, entity: &Entity) -> Option<FixedVec2> {
        let (x, y) = (entity.position.x, entity.position.y);
        let (w, h) = (entity.width(), entity.height());
        let step = grid.cell_size() >> 2;

        for dist in 1..=16 {
            let d = step.wrapping_mul(dist);
            for (dx, dy) in [(0, -d), (0, d), (-d, 0), (d, 0)] {
                let nx = x.wrapping_add(dx);
                let ny = y.wrapping_add(dy);
                if !grid.is_solid_region(nx, ny, w, h) {
                    return Some(FixedVec2::new(nx, ny));
                }
            }
        }
        None
    }

    /// Read-only render handoff: one view row per entity, plus whatever
    /// events the caller drained this tick.
    pub fn render_snapshot(&self) -> Vec<EntityView> {
        self.entities
            .values()
            .map(|e| EntityView {
                id: e.id,
                kind: e.kind,
                position: e.position,
                facing: e.facing,
                state: e.state,
            })
            .collect()
    }

    /// Capture the full entity list for the persistence collaborator.
    pub fn save_state(&self) -> SaveState {
        SaveState {
            level_id: self.level_id.clone(),
            tick: self.tick,
            next_entity_id: self.next_entity_id,
            entities: self.entities.values().cloned().collect(),
        }
    }

    /// Rebuild a world from a save, spawning entities directly into their
    /// recorded state (the Idle spawn default does not apply).
    pub fn restore(level: &LevelData, save: SaveState) -> Result<Self, LevelError> {
        let grid = level.build_grid()?;
        let mut entities = BTreeMap::new();
        let mut player_id = None;
        for entity in save.entities {
            if entity.kind == EntityKind::Player {
                player_id = Some(entity.id);
            }
            entities.insert(entity.id, entity);
        }
        Ok(Self {
            level_id: save.level_id,
            tick: save.tick,
            grid,
            entities,
            player_id,
            pending_events: Vec::new(),
            next_entity_id: save.next_entity_id,
        })
    }

    /// Hash the complete simulation state.
    ///
    /// Two runs of the same level and input timeline must produce equal
    /// hashes at every tick; the demo binary and the determinism tests
    /// rely on this.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |hasher| {
            hasher.update_u32(self.next_entity_id);
            for entity in self.entities.values() {
                hasher.update_u32(entity.id.0);
                hasher.update_u8(entity.kind as u8);
                hasher.update_vec2(entity.position);
                hasher.update_vec2(entity.velocity);
                hasher.update_u8(entity.state as u8);
                hasher.update_u32(entity.state_ticks);
                hasher.update_u8(entity.prev_locomotion as u8);
                hasher.update_i32(entity.hp);
                hasher.update_u32(entity.invulnerable_ticks);
                hasher.update_u32(entity.attack_cooldown);
                hasher.update_bool(entity.grounded);
                hasher.update_bool(entity.facing == Facing::Right);
                hasher.update_bool(entity.jump_held);
                hasher.update_bool(entity.action_held);
                hasher.update_u32(entity.score);
                // AI scratch also steers future ticks
                hasher.update_bool(entity.patrol_anchor.is_some());
                hasher.update_fixed(entity.patrol_anchor.unwrap_or(0));
                hasher.update_fixed(entity.patrol_dest);
                hasher.update_u32(entity.patrol_idle_ticks);
                hasher.update_u32(entity.anger_ticks);
                hasher.update_bool(entity.charging);
            }
        })
    }
}

/// One row of the render handoff.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EntityView {
    /// Entity id
    pub id: EntityId,
    /// Entity kind
    pub kind: EntityKind,
    /// Top-left of the bounding box
    pub position: FixedVec2,
    /// Horizontal facing
    pub facing: Facing,
    /// Logical state
    pub state: EntityState,
}

/// Serializable full-session capture for the persistence collaborator.
///
/// The collaborator owns the on-disk format; these bytes helpers are a
/// convenience for callers that just want an opaque blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveState {
    /// Level the entities belong to
    pub level_id: String,
    /// Tick at capture time
    pub tick: u32,
    /// Id allocator watermark, so restored worlds never reuse ids
    pub next_entity_id: u32,
    /// Full entity list, restored verbatim
    pub entities: Vec<Entity>,
}

impl SaveState {
    /// Encode to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;
    use crate::game::level::SpawnDescriptor;

    fn test_level() -> LevelData {
        LevelData::from_ascii(
            "world-test",
            from_int(16),
            false,
            &[
                "........", //
                ".P....o.", //
                "########",
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_level_spawns_descriptors() {
        let world = World::from_level(&test_level()).unwrap();
        assert_eq!(world.entities.len(), 2);
        let player = world.player().unwrap();
        assert_eq!(player.kind, EntityKind::Player);
        // Feet on the floor row's top edge
        assert_eq!(player.position.y.wrapping_add(player.height()), from_int(32));
    }

    #[test]
    fn test_unknown_spawn_kind_is_skipped_not_fatal() {
        let mut level = test_level();
        level.spawns.push(SpawnDescriptor {
            kind: "dragon".into(),
            x: 0,
            y: from_int(32),
        });
        let world = World::from_level(&level).unwrap();
        // The dragon is skipped; everything else spawned
        assert_eq!(world.entities.len(), 2);
    }

    #[test]
    fn test_spawn_named_rejects_unknown() {
        let mut world = World::from_level(&test_level()).unwrap();
        assert!(world.spawn_named("dragon", FixedVec2::ZERO).is_err());
        assert!(world.spawn_named("walker", FixedVec2::new(0, from_int(32))).is_ok());
    }

    #[test]
    fn test_ids_are_monotonic_and_purge_preserves_them() {
        let mut world = World::from_level(&test_level()).unwrap();
        let a = world.spawn(EntityKind::Walker, FixedVec2::new(0, from_int(32)));
        world.entities.get_mut(&a).unwrap().state = EntityState::Dead;
        world.purge();
        assert!(!world.entities.contains_key(&a));

        let b = world.spawn(EntityKind::Walker, FixedVec2::new(0, from_int(32)));
        assert!(b > a, "ids must never be reused");
    }

    #[test]
    fn test_purge_clears_player_id() {
        let mut world = World::from_level(&test_level()).unwrap();
        let id = world.player_id.unwrap();
        world.entities.get_mut(&id).unwrap().state = EntityState::Dead;
        world.purge();
        assert!(world.player().is_none());
    }

    #[test]
    fn test_save_restore_round_trip() {
        let level = test_level();
        let mut world = World::from_level(&level).unwrap();

        // Disturb some state so the round trip is non-trivial
        let id = world.player_id.unwrap();
        {
            let player = world.entities.get_mut(&id).unwrap();
            player.position = FixedVec2::new(from_int(40), from_int(7));
            player.state = EntityState::Falling;
            player.hp = 42;
            player.score = 150;
        }
        world.tick = 777;

        let bytes = world.save_state().to_bytes().unwrap();
        let save = SaveState::from_bytes(&bytes).unwrap();
        let restored = World::restore(&level, save).unwrap();

        assert_eq!(restored.tick, 777);
        let player = restored.player().unwrap();
        // Restored directly into the recorded state, not the Idle default
        assert_eq!(player.state, EntityState::Falling);
        assert_eq!(player.hp, 42);
        assert_eq!(player.score, 150);
        assert_eq!(restored.compute_hash(), world.compute_hash());
    }

    #[test]
    fn test_snap_free_prefers_upward() {
        let level = test_level();
        let world = World::from_level(&level).unwrap();

        // Plant a walker half-embedded in the floor
        let mut embedded = Entity::new(
            EntityId(99),
            EntityKind::Walker,
            FixedVec2::new(from_int(32), from_int(12)),
        );
        embedded.position.y = from_int(20); // bottom at 48, inside row 2
        assert!(world.grid.is_solid_region(
            embedded.position.x,
            embedded.position.y,
            embedded.width(),
            embedded.height()
        ));

        let fixed_pos = World::snap_free(&world.grid, &embedded).unwrap();
        assert!(fixed_pos.y < embedded.position.y, "snap should prefer up");
        assert!(!world
            .grid
            .is_solid_region(fixed_pos.x, fixed_pos.y, embedded.width(), embedded.height()));
    }

    #[test]
    fn test_render_snapshot_matches_entities() {
        let world = World::from_level(&test_level()).unwrap();
        let snapshot = world.render_snapshot();
        assert_eq!(snapshot.len(), world.entities.len());
        for view in &snapshot {
            let entity = &world.entities[&view.id];
            assert_eq!(view.position, entity.position);
            assert_eq!(view.state, entity.state);
        }
    }
}
