//! Game Events
//!
//! Events generated during simulation, consumed by the render, audio, and
//! outer game-logic collaborators (and by replay comparisons in tests).
//! Events carry a priority so the set produced within one tick has a total,
//! deterministic order.

use serde::{Deserialize, Serialize};

use crate::core::vec2::FixedVec2;
use crate::game::entity::{EntityId, EntityKind};
use crate::game::grid::CellKind;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Deaths processed first
    Death = 0,
    /// Then damage
    Damage = 1,
    /// Then pickups
    Pickup = 2,
    /// Then hazard contacts
    Hazard = 3,
    /// Then trigger zones
    Trigger = 4,
    /// Then spawns
    Spawn = 5,
    /// Lowest priority
    Other = 255,
}

/// Why an entity died.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Swept through a hazard cell
    Hazard,
    /// Health emptied by damage
    Damage,
    /// Fell below an open-bottom level
    FellOut,
    /// A charger detonating against a wall mid-rush
    SelfDestruct,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// An entity entered Dying (or was removed outright by falling out)
    EntityDied {
        /// Who died
        entity: EntityId,
        /// Its kind, for the collaborator's convenience
        kind: EntityKind,
        /// What killed it
        cause: DeathCause,
    },

    /// An entity survived a damaging contact
    EntityDamaged {
        /// Who was hit
        entity: EntityId,
        /// The attacker, if the damage came from an entity
        source: Option<EntityId>,
        /// Damage applied
        amount: i32,
        /// Health remaining
        hp_left: i32,
    },

    /// The player collected a pickup
    PickupCollected {
        /// The collector
        entity: EntityId,
        /// The pickup that was consumed
        pickup: EntityId,
        /// Score awarded
        score: u32,
        /// Collector's new total
        new_score: u32,
    },

    /// An entity swept through a hazard or trigger cell
    CellTouched {
        /// Who touched it
        entity: EntityId,
        /// Hazard or Trigger
        cell: CellKind,
        /// Grid column
        col: i32,
        /// Grid row
        row: i32,
    },

    /// An entity entered the world
    EntitySpawned {
        /// The new entity
        entity: EntityId,
        /// Its kind
        kind: EntityKind,
        /// Where it appeared
        position: FixedVec2,
    },

    /// An entity ended a tick inside a solid cell and was snapped free
    OverlapRecovered {
        /// The affected entity
        entity: EntityId,
        /// Position before the snap
        from: FixedVec2,
        /// Position after the snap
        to: FixedVec2,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when the event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Entity involved (for tie-breaking)
    pub entity: Option<EntityId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event; the involved entity is derived from the data.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let entity = match &data {
            GameEventData::EntityDied { entity, .. } => Some(*entity),
            GameEventData::EntityDamaged { entity, .. } => Some(*entity),
            GameEventData::PickupCollected { entity, .. } => Some(*entity),
            GameEventData::CellTouched { entity, .. } => Some(*entity),
            GameEventData::EntitySpawned { entity, .. } => Some(*entity),
            GameEventData::OverlapRecovered { entity, .. } => Some(*entity),
        };

        Self {
            tick,
            priority,
            entity,
            data,
        }
    }

    /// Create an entity-died event.
    pub fn died(tick: u32, entity: EntityId, kind: EntityKind, cause: DeathCause) -> Self {
        Self::new(
            tick,
            EventPriority::Death,
            GameEventData::EntityDied { entity, kind, cause },
        )
    }

    /// Create an entity-damaged event.
    pub fn damaged(
        tick: u32,
        entity: EntityId,
        source: Option<EntityId>,
        amount: i32,
        hp_left: i32,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Damage,
            GameEventData::EntityDamaged {
                entity,
                source,
                amount,
                hp_left,
            },
        )
    }

    /// Create a pickup-collected event.
    pub fn pickup(tick: u32, entity: EntityId, pickup: EntityId, score: u32, new_score: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Pickup,
            GameEventData::PickupCollected {
                entity,
                pickup,
                score,
                new_score,
            },
        )
    }

    /// Create a cell-touched event.
    pub fn cell_touched(tick: u32, entity: EntityId, cell: CellKind, col: i32, row: i32) -> Self {
        let priority = if cell == CellKind::Hazard {
            EventPriority::Hazard
        } else {
            EventPriority::Trigger
        };
        Self::new(
            tick,
            priority,
            GameEventData::CellTouched {
                entity,
                cell,
                col,
                row,
            },
        )
    }

    /// Create an entity-spawned event.
    pub fn spawned(tick: u32, entity: EntityId, kind: EntityKind, position: FixedVec2) -> Self {
        Self::new(
            tick,
            EventPriority::Spawn,
            GameEventData::EntitySpawned {
                entity,
                kind,
                position,
            },
        )
    }

    /// Create an overlap-recovered event.
    pub fn overlap_recovered(tick: u32, entity: EntityId, from: FixedVec2, to: FixedVec2) -> Self {
        Self::new(
            tick,
            EventPriority::Other,
            GameEventData::OverlapRecovered { entity, from, to },
        )
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.priority == other.priority && self.entity == other.entity
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then entity id
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.entity.cmp(&other.entity))
    }
}
