//! Entities and the Entity State Machine
//!
//! Per-entity physical and logical state. Kinds are a tagged variant with a
//! per-kind tuning table; behavior specific to a kind lives in `behavior`,
//! while the locomotion state machine here is shared by every kind that
//! walks, falls, or dies.

use serde::{Deserialize, Serialize};

use crate::core::fixed::{from_int, Fixed, KNOCKBACK_LIFT, KNOCKBACK_SPEED};
use crate::core::vec2::FixedVec2;
use crate::game::collision::ContactFlags;

// =============================================================================
// TIMING CONSTANTS (tick counts at 60 Hz)
// =============================================================================

/// Ticks spent in Dying before the entity becomes Dead and is purged
pub const DEATH_TICKS: u32 = 45;

/// Ticks spent in Hurt with horizontal input locked
pub const HURT_TICKS: u32 = 30;

/// Invulnerability window granted when entering Hurt
pub const INVULN_TICKS: u32 = 90;

/// Cooldown between player melee attacks
pub const ATTACK_COOLDOWN_TICKS: u32 = 24;

/// Reach of the player melee attack, in world units
pub const ATTACK_RANGE: Fixed = from_int(48);

// =============================================================================
// ENTITY ID
// =============================================================================

/// Unique entity identifier, monotonic within a world.
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// ENTITY KIND
// =============================================================================

/// Horizontal facing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    /// Facing -x
    Left,
    /// Facing +x
    #[default]
    Right,
}

impl Facing {
    /// Unit sign of this facing (-1 or +1) in Q16.16.
    #[inline]
    pub fn sign(self) -> Fixed {
        match self {
            Facing::Left => -crate::core::fixed::FIXED_ONE,
            Facing::Right => crate::core::fixed::FIXED_ONE,
        }
    }

    /// The opposite facing.
    #[inline]
    pub fn flip(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

/// Kind of entity, with per-kind tuning in `spec()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityKind {
    /// The one input-driven entity
    Player = 0,
    /// Enemy that patrols a horizontal path
    Walker = 1,
    /// Enemy that patrols, then rushes the player on sight
    Charger = 2,
    /// Straight-flying projectile, despawns on wall impact
    Projectile = 3,
    /// Static collectible
    Pickup = 4,
}

/// Static tuning for an entity kind.
#[derive(Clone, Copy, Debug)]
pub struct KindSpec {
    /// Bounding box width, world units
    pub width: Fixed,
    /// Bounding box height, world units
    pub height: Fixed,
    /// Hit points at spawn
    pub max_hp: i32,
    /// Patrol/walk speed, units per second
    pub move_speed: Fixed,
    /// Damage dealt on contact (or per melee hit for the player)
    pub contact_damage: i32,
    /// Score awarded to the player for killing/collecting this
    pub score_value: u32,
    /// Is this kind pulled down by gravity?
    pub gravity: bool,
}

impl EntityKind {
    /// Tuning table for this kind.
    pub const fn spec(self) -> KindSpec {
        match self {
            EntityKind::Player => KindSpec {
                width: from_int(24),
                height: from_int(48),
                max_hp: 100,
                move_speed: from_int(240),
                contact_damage: 25,
                score_value: 0,
                gravity: true,
            },
            EntityKind::Walker => KindSpec {
                width: from_int(28),
                height: from_int(28),
                max_hp: 30,
                move_speed: from_int(60),
                contact_damage: 10,
                score_value: 100,
                gravity: true,
            },
            EntityKind::Charger => KindSpec {
                width: from_int(28),
                height: from_int(28),
                max_hp: 40,
                move_speed: from_int(75),
                contact_damage: 15,
                score_value: 150,
                gravity: true,
            },
            EntityKind::Projectile => KindSpec {
                width: from_int(12),
                height: from_int(12),
                max_hp: 1,
                move_speed: from_int(180),
                contact_damage: 20,
                score_value: 0,
                gravity: false,
            },
            EntityKind::Pickup => KindSpec {
                width: from_int(16),
                height: from_int(16),
                max_hp: 1,
                move_speed: 0,
                contact_damage: 0,
                score_value: 50,
                gravity: false,
            },
        }
    }

    /// Parse a kind from a level-file name. Unknown names are a spawn
    /// configuration error handled by the caller.
    pub fn from_name(name: &str) -> Option<EntityKind> {
        match name {
            "player" => Some(EntityKind::Player),
            "walker" => Some(EntityKind::Walker),
            "charger" => Some(EntityKind::Charger),
            "projectile" => Some(EntityKind::Projectile),
            "pickup" => Some(EntityKind::Pickup),
            _ => None,
        }
    }

    /// Canonical name for logs and level files.
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Walker => "walker",
            EntityKind::Charger => "charger",
            EntityKind::Projectile => "projectile",
            EntityKind::Pickup => "pickup",
        }
    }

    /// Does this kind hurt the player on touch?
    #[inline]
    pub fn is_enemy(self) -> bool {
        matches!(
            self,
            EntityKind::Walker | EntityKind::Charger | EntityKind::Projectile
        )
    }
}

// =============================================================================
// ENTITY STATE
// =============================================================================

/// Logical state of an entity.
///
/// Transitions are evaluated once per tick in a fixed precedence order; see
/// `Entity::evaluate_transitions`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityState {
    /// Grounded, no horizontal intent
    #[default]
    Idle = 0,
    /// Grounded, moving horizontally
    Walking = 1,
    /// Airborne after a jump impulse
    Jumping = 2,
    /// Airborne without a jump (walked off a ledge, knocked back)
    Falling = 3,
    /// Recently damaged; horizontal input locked, knockback in effect
    Hurt = 4,
    /// Death animation playing; ignores the world
    Dying = 5,
    /// Terminal; purged at end of tick
    Dead = 6,
}

impl EntityState {
    /// Is this one of the ground/air locomotion states?
    #[inline]
    pub fn is_locomotion(self) -> bool {
        matches!(
            self,
            EntityState::Idle | EntityState::Walking | EntityState::Jumping | EntityState::Falling
        )
    }

    /// Is the entity still participating in the world (not dying or dead)?
    #[inline]
    pub fn alive(self) -> bool {
        !matches!(self, EntityState::Dying | EntityState::Dead)
    }
}

/// Per-tick facts the transition rules consume.
///
/// Gathered by the simulation step from this tick's collision result and
/// intent phase; the state machine itself never touches the grid.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransitionCtx {
    /// Standing on a solid/platform cell after resolution
    pub grounded: bool,
    /// A hazard cell was swept through this tick
    pub hazard: bool,
    /// A jump impulse was applied in the intent phase
    pub jumped: bool,
    /// Horizontal intent (input or AI), for Idle/Walking selection
    pub move_intent: Fixed,
}

/// Outcome of `Entity::take_damage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Invulnerable or already dying; nothing happened
    Ignored,
    /// Survived; now in Hurt with knockback
    Hurt,
    /// Health reached zero; now Dying
    Died,
}

// =============================================================================
// ENTITY
// =============================================================================

/// A simulated entity.
///
/// `position` is the top-left corner of the bounding box; the box size comes
/// from the kind's tuning table and is always non-degenerate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id within the world
    pub id: EntityId,

    /// Kind (fixes the tuning table row)
    pub kind: EntityKind,

    /// Top-left corner of the bounding box
    pub position: FixedVec2,

    /// Velocity in units per second
    pub velocity: FixedVec2,

    /// Horizontal facing
    pub facing: Facing,

    /// Current logical state
    pub state: EntityState,

    /// Ticks spent in the current state
    pub state_ticks: u32,

    /// Locomotion state to return to when Hurt ends
    pub prev_locomotion: EntityState,

    /// Current hit points
    pub hp: i32,

    /// Hit point ceiling
    pub max_hp: i32,

    /// Remaining invulnerability ticks (damage ignored while > 0)
    pub invulnerable_ticks: u32,

    /// Remaining melee cooldown ticks (player)
    pub attack_cooldown: u32,

    /// Standing on ground as of the last resolution
    pub grounded: bool,

    /// Contact flags from the last resolution
    pub contacts: ContactFlags,

    /// Jump button was held last tick (edge detection)
    pub jump_held: bool,

    /// Action button was held last tick (edge detection)
    pub action_held: bool,

    /// Accumulated score (player)
    pub score: u32,

    /// Marked for removal; purged at end of tick
    pub removed: bool,

    // =========================================================================
    // AI scratch (walker/charger patrol and charge)
    // =========================================================================
    /// Left extreme of the patrol path, set on first tick
    pub patrol_anchor: Option<Fixed>,

    /// Current patrol destination x
    pub patrol_dest: Fixed,

    /// Ticks idled at a patrol extreme
    pub patrol_idle_ticks: u32,

    /// Windup ticks before a charger starts its rush
    pub anger_ticks: u32,

    /// Charger is mid-rush
    pub charging: bool,
}

impl Entity {
    /// Create an entity of a kind with its bottom-left corner at `foot`.
    pub fn spawn_at_foot(id: EntityId, kind: EntityKind, foot: FixedVec2) -> Self {
        let spec = kind.spec();
        let position = FixedVec2::new(foot.x, foot.y.wrapping_sub(spec.height));
        Self::new(id, kind, position)
    }

    /// Create an entity of a kind with its top-left corner at `position`.
    pub fn new(id: EntityId, kind: EntityKind, position: FixedVec2) -> Self {
        let spec = kind.spec();
        Self {
            id,
            kind,
            position,
            velocity: FixedVec2::ZERO,
            facing: Facing::Right,
            state: EntityState::Idle,
            state_ticks: 0,
            prev_locomotion: EntityState::Idle,
            hp: spec.max_hp,
            max_hp: spec.max_hp,
            invulnerable_ticks: 0,
            attack_cooldown: 0,
            grounded: false,
            contacts: ContactFlags::default(),
            jump_held: false,
            action_held: false,
            score: 0,
            removed: false,
            patrol_anchor: None,
            patrol_dest: 0,
            patrol_idle_ticks: 0,
            anger_ticks: 0,
            charging: false,
        }
    }

    /// Bounding box width.
    #[inline]
    pub fn width(&self) -> Fixed {
        self.kind.spec().width
    }

    /// Bounding box height.
    #[inline]
    pub fn height(&self) -> Fixed {
        self.kind.spec().height
    }

    /// Center of the bounding box.
    #[inline]
    pub fn center(&self) -> FixedVec2 {
        FixedVec2::new(
            self.position.x.wrapping_add(self.width() >> 1),
            self.position.y.wrapping_add(self.height() >> 1),
        )
    }

    /// Does this entity's box overlap another's? Open intervals: touching
    /// edges do not overlap, matching the grid tests.
    pub fn overlaps(&self, other: &Entity) -> bool {
        let a_right = self.position.x.wrapping_add(self.width());
        let a_bottom = self.position.y.wrapping_add(self.height());
        let b_right = other.position.x.wrapping_add(other.width());
        let b_bottom = other.position.y.wrapping_add(other.height());
        self.position.x < b_right
            && a_right > other.position.x
            && self.position.y < b_bottom
            && a_bottom > other.position.y
    }

    /// Enter a state, resetting the time-in-state counter.
    ///
    /// Entering Hurt records the state to return to afterwards.
    pub fn enter_state(&mut self, state: EntityState) {
        if state == EntityState::Hurt && self.state.is_locomotion() {
            self.prev_locomotion = match self.state {
                EntityState::Jumping | EntityState::Falling => EntityState::Falling,
                other => other,
            };
        }
        self.state = state;
        self.state_ticks = 0;
    }

    /// Apply damage from a direction, entering Hurt or Dying.
    ///
    /// Ignored while invulnerable or already dying. Lethal damage wins over
    /// Hurt: a hit that empties the health bar never produces knockback.
    pub fn take_damage(&mut self, amount: i32, from_left: bool) -> DamageOutcome {
        if !self.state.alive() {
            return DamageOutcome::Ignored;
        }
        if self.invulnerable_ticks > 0 {
            return DamageOutcome::Ignored;
        }

        self.hp = (self.hp - amount).max(0);
        if self.hp == 0 {
            self.kill();
            return DamageOutcome::Died;
        }

        // Knockback away from the source, with a small upward lift
        let away = if from_left { KNOCKBACK_SPEED } else { -KNOCKBACK_SPEED };
        self.velocity = FixedVec2::new(away, -KNOCKBACK_LIFT);
        self.invulnerable_ticks = INVULN_TICKS;
        self.enter_state(EntityState::Hurt);
        DamageOutcome::Hurt
    }

    /// Force the entity into Dying (hazard contact, lethal damage).
    pub fn kill(&mut self) {
        if !self.state.alive() {
            return;
        }
        self.hp = 0;
        self.velocity = FixedVec2::ZERO;
        self.enter_state(EntityState::Dying);
    }

    /// Restore health, capped at the maximum.
    pub fn heal(&mut self, amount: i32) {
        self.hp = (self.hp + amount).min(self.max_hp);
    }

    /// Tick down the per-entity timers. Called once per tick before
    /// transitions so a fresh Hurt/invulnerability window is not shortened.
    pub fn tick_timers(&mut self) {
        if self.invulnerable_ticks > 0 {
            self.invulnerable_ticks -= 1;
        }
        if self.attack_cooldown > 0 {
            self.attack_cooldown -= 1;
        }
    }

    /// Evaluate the state machine for this tick.
    ///
    /// First matching rule wins; at most one transition per tick. Returns
    /// the (old, new) pair when a transition fired.
    pub fn evaluate_transitions(
        &mut self,
        ctx: &TransitionCtx,
    ) -> Option<(EntityState, EntityState)> {
        let old = self.state;

        // 1. Dying -> Dead once the death animation has played out
        if self.state == EntityState::Dying {
            if self.state_ticks >= DEATH_TICKS {
                self.enter_state(EntityState::Dead);
                return Some((old, EntityState::Dead));
            }
            self.state_ticks += 1;
            return None;
        }
        if self.state == EntityState::Dead {
            return None;
        }

        // 2. Anything -> Dying on empty health or hazard contact
        if self.hp <= 0 || ctx.hazard {
            self.kill();
            return Some((old, EntityState::Dying));
        }

        // 3. is damage entry, handled by `take_damage` when the contact is
        //    detected; 4. Hurt ends when its timer elapses
        if self.state == EntityState::Hurt {
            if self.state_ticks >= HURT_TICKS {
                let next = self.prev_locomotion;
                self.enter_state(next);
                return Some((old, next));
            }
            self.state_ticks += 1;
            return None;
        }

        // 5. Landing: airborne -> grounded once no longer moving upward
        if matches!(self.state, EntityState::Jumping | EntityState::Falling)
            && ctx.grounded
            && self.velocity.y >= 0
        {
            let next = if ctx.move_intent != 0 {
                EntityState::Walking
            } else {
                EntityState::Idle
            };
            self.enter_state(next);
            return Some((old, next));
        }

        // 6. Takeoff: the intent phase applied a jump impulse this tick
        if matches!(self.state, EntityState::Idle | EntityState::Walking) && ctx.jumped {
            self.enter_state(EntityState::Jumping);
            return Some((old, EntityState::Jumping));
        }

        // 7. Walked off a ledge
        if matches!(self.state, EntityState::Idle | EntityState::Walking) && !ctx.grounded {
            self.enter_state(EntityState::Falling);
            return Some((old, EntityState::Falling));
        }

        // 8. Idle <-> Walking on horizontal intent
        if self.state == EntityState::Idle && ctx.move_intent != 0 {
            self.enter_state(EntityState::Walking);
            return Some((old, EntityState::Walking));
        }
        if self.state == EntityState::Walking && ctx.move_intent == 0 {
            self.enter_state(EntityState::Idle);
            return Some((old, EntityState::Idle));
        }

        self.state_ticks += 1;
        None
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn walker() -> Entity {
        Entity::new(EntityId(1), EntityKind::Walker, FixedVec2::ZERO)
    }

    #[test]
    fn test_kind_table_is_sane() {
        for kind in [
            EntityKind::Player,
            EntityKind::Walker,
            EntityKind::Charger,
            EntityKind::Projectile,
            EntityKind::Pickup,
        ] {
            let spec = kind.spec();
            assert!(spec.width > 0 && spec.height > 0, "{:?} box degenerate", kind);
            assert!(spec.max_hp > 0);
            assert_eq!(EntityKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EntityKind::from_name("balrog"), None);
    }

    #[test]
    fn test_spawn_at_foot_aligns_bottom() {
        let e = Entity::spawn_at_foot(
            EntityId(1),
            EntityKind::Player,
            FixedVec2::new(from_int(32), from_int(64)),
        );
        assert_eq!(e.position.y.wrapping_add(e.height()), from_int(64));
        assert_eq!(e.position.x, from_int(32));
    }

    #[test]
    fn test_idle_walk_transitions() {
        let mut e = walker();
        e.grounded = true;

        let ctx = TransitionCtx {
            grounded: true,
            move_intent: from_int(60),
            ..Default::default()
        };
        assert_eq!(
            e.evaluate_transitions(&ctx),
            Some((EntityState::Idle, EntityState::Walking))
        );

        let ctx = TransitionCtx {
            grounded: true,
            ..Default::default()
        };
        assert_eq!(
            e.evaluate_transitions(&ctx),
            Some((EntityState::Walking, EntityState::Idle))
        );
    }

    #[test]
    fn test_jump_then_land() {
        let mut e = walker();
        let ctx = TransitionCtx {
            grounded: true,
            jumped: true,
            ..Default::default()
        };
        e.evaluate_transitions(&ctx);
        assert_eq!(e.state, EntityState::Jumping);

        // Still rising: no landing even if a ground flag sneaks in
        e.velocity.y = -from_int(100);
        let ctx = TransitionCtx {
            grounded: true,
            ..Default::default()
        };
        assert_eq!(e.evaluate_transitions(&ctx), None);

        // Falling onto ground lands into Idle
        e.velocity.y = 0;
        let ctx = TransitionCtx {
            grounded: true,
            ..Default::default()
        };
        assert_eq!(
            e.evaluate_transitions(&ctx),
            Some((EntityState::Jumping, EntityState::Idle))
        );
    }

    #[test]
    fn test_walk_off_ledge_falls() {
        let mut e = walker();
        let ctx = TransitionCtx::default();
        assert_eq!(
            e.evaluate_transitions(&ctx),
            Some((EntityState::Idle, EntityState::Falling))
        );
    }

    #[test]
    fn test_hazard_beats_everything() {
        let mut e = walker();
        e.enter_state(EntityState::Jumping);
        let ctx = TransitionCtx {
            hazard: true,
            grounded: true,
            ..Default::default()
        };
        assert_eq!(
            e.evaluate_transitions(&ctx),
            Some((EntityState::Jumping, EntityState::Dying))
        );
        assert_eq!(e.hp, 0);
    }

    #[test]
    fn test_dying_runs_out_to_dead() {
        let mut e = walker();
        e.kill();
        assert_eq!(e.state, EntityState::Dying);

        let ctx = TransitionCtx::default();
        for _ in 0..DEATH_TICKS {
            assert_eq!(e.evaluate_transitions(&ctx), None);
        }
        assert_eq!(
            e.evaluate_transitions(&ctx),
            Some((EntityState::Dying, EntityState::Dead))
        );
    }

    #[test]
    fn test_damage_hurt_and_recovery() {
        let mut e = walker();
        assert_eq!(e.take_damage(10, true), DamageOutcome::Hurt);
        assert_eq!(e.state, EntityState::Hurt);
        assert_eq!(e.hp, 20);
        // Knocked to the right and lifted
        assert!(e.velocity.x > 0);
        assert!(e.velocity.y < 0);

        // Invulnerable: further damage ignored
        assert_eq!(e.take_damage(10, true), DamageOutcome::Ignored);
        assert_eq!(e.hp, 20);

        // Timer runs out, returns to the stored locomotion state
        let ctx = TransitionCtx {
            grounded: true,
            ..Default::default()
        };
        for _ in 0..HURT_TICKS {
            assert_eq!(e.evaluate_transitions(&ctx), None);
        }
        let change = e.evaluate_transitions(&ctx).unwrap();
        assert_eq!(change.0, EntityState::Hurt);
        assert!(change.1.is_locomotion());
    }

    #[test]
    fn test_lethal_damage_skips_hurt() {
        let mut e = walker();
        assert_eq!(e.take_damage(999, true), DamageOutcome::Died);
        assert_eq!(e.state, EntityState::Dying);
        assert_eq!(e.velocity, FixedVec2::ZERO);
    }

    #[test]
    fn test_overlap_open_intervals() {
        let a = Entity::new(EntityId(1), EntityKind::Pickup, FixedVec2::ZERO);
        // Exactly touching on the right edge: no overlap
        let b = Entity::new(
            EntityId(2),
            EntityKind::Pickup,
            FixedVec2::new(from_int(16), 0),
        );
        assert!(!a.overlaps(&b));

        let c = Entity::new(
            EntityId(3),
            EntityKind::Pickup,
            FixedVec2::new(from_int(16) - 1, 0),
        );
        assert!(a.overlaps(&c));
    }
}
