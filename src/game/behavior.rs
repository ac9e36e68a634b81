//! Per-Kind Behavior
//!
//! Phase (a) of the simulation step: turn input (for the player) or AI (for
//! everything else) into an intended velocity for the tick. Dispatch is a
//! match over the kind tag - no trait objects, all tuning data-driven from
//! the kind table.
//!
//! `react` handles kind-specific responses to this tick's collision result:
//! walkers turn at walls, chargers detonate against them, projectiles
//! despawn on impact.

use crate::core::fixed::{fixed_mul, from_int, Fixed, JUMP_IMPULSE, TICK_DT};
use crate::core::vec2::FixedVec2;
use crate::game::collision::CollisionResult;
use crate::game::entity::{Entity, EntityKind, EntityState, Facing};
use crate::game::input::InputSnapshot;

// =============================================================================
// AI TUNING
// =============================================================================

/// Horizontal patrol path length, anchor to far extreme
pub const PATROL_RANGE: Fixed = from_int(160);

/// Pause at each patrol extreme (1.5 s)
pub const PATROL_IDLE_TICKS: u32 = 90;

/// Horizontal distance at which a charger notices the player
pub const AGGRO_RANGE: Fixed = from_int(128);

/// Vertical tolerance for noticing the player
pub const AGGRO_HEIGHT: Fixed = from_int(48);

/// Windup before a charger starts its rush
pub const ANGER_TICKS: u32 = 40;

/// Rush speed of a charging charger
pub const CHARGE_SPEED: Fixed = from_int(270);

/// What the intent phase decided for one entity this tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct Intent {
    /// A jump impulse was applied to the velocity
    pub jumped: bool,
    /// Horizontal intent, for the Idle/Walking distinction
    pub move_intent: Fixed,
    /// The player wants to swing a melee attack this tick
    pub wants_attack: bool,
}

/// Kind-specific reaction to a collision result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reaction {
    /// A charger hit a wall mid-rush and detonates
    SelfDestruct,
}

/// Produce this tick's intended velocity for an entity.
///
/// `input` is present only for the player-controlled entity;
/// `player_center` is the player's center captured at tick start (None once
/// the player is gone), which drives enemy aggro.
pub fn apply_intent(
    entity: &mut Entity,
    input: Option<&InputSnapshot>,
    player_center: Option<FixedVec2>,
) -> Intent {
    // Dying/Dead entities are frozen
    if !entity.state.alive() {
        return Intent::default();
    }

    // Hurt locks horizontal control for every kind; the knockback velocity
    // rides out the timer. The player still latches its buttons so a
    // release during the lock is not missed.
    if entity.state == EntityState::Hurt {
        if entity.kind == EntityKind::Player {
            if let Some(snapshot) = input {
                entity.jump_held = snapshot.jump();
                entity.action_held = snapshot.action();
            }
        }
        return Intent::default();
    }

    match entity.kind {
        EntityKind::Player => player_intent(entity, input),
        EntityKind::Walker => patrol_intent(entity),
        EntityKind::Charger => charger_intent(entity, player_center),
        EntityKind::Projectile => {
            // Flight velocity was set at spawn; just track facing
            if entity.velocity.x != 0 {
                entity.facing = if entity.velocity.x > 0 {
                    Facing::Right
                } else {
                    Facing::Left
                };
            }
            Intent {
                move_intent: entity.velocity.x,
                ..Intent::default()
            }
        }
        EntityKind::Pickup => {
            entity.velocity = FixedVec2::ZERO;
            Intent::default()
        }
    }
}

fn player_intent(entity: &mut Entity, input: Option<&InputSnapshot>) -> Intent {
    let snapshot = match input {
        Some(s) => *s,
        None => InputSnapshot::new(),
    };

    // Edge-detect buttons against last tick's held state
    let jump_edge = snapshot.jump() && !entity.jump_held;
    let action_edge = snapshot.action() && !entity.action_held;
    entity.jump_held = snapshot.jump();
    entity.action_held = snapshot.action();

    let axis = snapshot.move_axis();
    let vx = fixed_mul(axis, entity.kind.spec().move_speed);
    entity.velocity.x = vx;
    if vx != 0 {
        entity.facing = if vx > 0 { Facing::Right } else { Facing::Left };
    }

    // No air jump: the ground flag from the start of the tick gates takeoff
    let mut jumped = false;
    if jump_edge
        && entity.grounded
        && matches!(entity.state, EntityState::Idle | EntityState::Walking)
    {
        entity.velocity.y = -JUMP_IMPULSE;
        jumped = true;
    }

    Intent {
        jumped,
        move_intent: vx,
        wants_attack: action_edge && entity.attack_cooldown == 0,
    }
}

/// Walk between the spawn anchor and `anchor + PATROL_RANGE`, pausing at
/// each extreme.
///
/// Arrival uses a one-step tolerance: fixed-point division cannot produce a
/// velocity that lands exactly on the destination, so within one step the
/// walker stops where it is and pauses.
fn patrol_intent(entity: &mut Entity) -> Intent {
    // The path is anchored at the spawn position, which is only known on
    // the first tick, not at construction
    let anchor = match entity.patrol_anchor {
        Some(a) => a,
        None => {
            entity.patrol_anchor = Some(entity.position.x);
            entity.patrol_dest = entity.position.x;
            entity.position.x
        }
    };
    let far = anchor.wrapping_add(PATROL_RANGE);
    let speed = entity.kind.spec().move_speed;
    let step = fixed_mul(speed, TICK_DT);

    let to_dest = entity.patrol_dest.wrapping_sub(entity.position.x);
    if to_dest.abs() <= step {
        entity.velocity.x = 0;
        if entity.patrol_idle_ticks < PATROL_IDLE_TICKS {
            entity.patrol_idle_ticks += 1;
            return Intent::default();
        }
        // Pause over: head for the other extreme, starting this tick
        entity.patrol_dest = if entity.patrol_dest == anchor { far } else { anchor };
        entity.patrol_idle_ticks = 0;
    }

    let to_dest = entity.patrol_dest.wrapping_sub(entity.position.x);
    let vx = if to_dest > 0 { speed } else { -speed };
    entity.velocity.x = vx;
    entity.facing = if vx > 0 { Facing::Right } else { Facing::Left };
    Intent {
        move_intent: vx,
        ..Intent::default()
    }
}

/// Patrol until the player is close and in front, wind up, then rush.
fn charger_intent(entity: &mut Entity, player_center: Option<FixedVec2>) -> Intent {
    if entity.charging {
        let vx = fixed_mul(entity.facing.sign(), CHARGE_SPEED);
        entity.velocity.x = vx;
        return Intent {
            move_intent: vx,
            ..Intent::default()
        };
    }

    if entity.anger_ticks > 0 {
        entity.anger_ticks -= 1;
        if entity.anger_ticks == 0 {
            entity.charging = true;
        }
        entity.velocity.x = 0;
        return Intent::default();
    }

    if let Some(target) = player_center {
        let center = entity.center();
        let dx = target.x.wrapping_sub(center.x);
        let dy = target.y.wrapping_sub(center.y);
        let facing_target = (dx > 0) == (entity.facing == Facing::Right);
        if dx.abs() <= AGGRO_RANGE && dy.abs() <= AGGRO_HEIGHT && facing_target {
            entity.anger_ticks = ANGER_TICKS;
            entity.velocity.x = 0;
            return Intent::default();
        }
    }

    patrol_intent(entity)
}

/// Kind-specific response to this tick's collision result.
pub fn react(entity: &mut Entity, result: &CollisionResult) -> Option<Reaction> {
    let hit_wall = result.contacts.on_left_wall || result.contacts.on_right_wall;
    match entity.kind {
        EntityKind::Walker => {
            // Turn around instead of grinding against the wall
            if hit_wall {
                if let Some(anchor) = entity.patrol_anchor {
                    let far = anchor.wrapping_add(PATROL_RANGE);
                    entity.patrol_dest = if entity.patrol_dest == anchor { far } else { anchor };
                    entity.patrol_idle_ticks = 0;
                }
            }
            None
        }
        EntityKind::Charger => {
            if entity.charging && hit_wall {
                return Some(Reaction::SelfDestruct);
            }
            None
        }
        EntityKind::Projectile => {
            if hit_wall || result.contacts.on_ceiling || result.contacts.on_ground {
                entity.removed = true;
            }
            None
        }
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::EntityId;

    fn at(kind: EntityKind, x: Fixed) -> Entity {
        Entity::new(EntityId(1), kind, FixedVec2::new(x, 0))
    }

    #[test]
    fn test_player_jump_edge_detection() {
        let mut player = at(EntityKind::Player, 0);
        player.grounded = true;

        let mut snap = InputSnapshot::new();
        snap.set_jump(true);

        let intent = apply_intent(&mut player, Some(&snap), None);
        assert!(intent.jumped);
        assert!(player.velocity.y < 0);

        // Held jump does not retrigger
        player.grounded = true;
        player.velocity.y = 0;
        let intent = apply_intent(&mut player, Some(&snap), None);
        assert!(!intent.jumped);

        // Release and press again: fires
        let released = InputSnapshot::new();
        apply_intent(&mut player, Some(&released), None);
        let intent = apply_intent(&mut player, Some(&snap), None);
        assert!(intent.jumped);
    }

    #[test]
    fn test_player_airborne_cannot_jump() {
        let mut player = at(EntityKind::Player, 0);
        player.grounded = false;

        let mut snap = InputSnapshot::new();
        snap.set_jump(true);

        let intent = apply_intent(&mut player, Some(&snap), None);
        assert!(!intent.jumped);
        assert_eq!(player.velocity.y, 0);
    }

    #[test]
    fn test_player_hurt_locks_horizontal_input() {
        let mut player = at(EntityKind::Player, 0);
        player.take_damage(10, true);
        assert_eq!(player.state, EntityState::Hurt);
        let knockback = player.velocity;

        let snap = InputSnapshot::with_move(-127);
        let intent = apply_intent(&mut player, Some(&snap), None);
        assert_eq!(intent.move_intent, 0);
        // Knockback velocity untouched by input
        assert_eq!(player.velocity, knockback);
    }

    #[test]
    fn test_patrol_idles_then_walks_out_and_back() {
        let mut walker = at(EntityKind::Walker, from_int(100));

        // First tick initializes the path and starts the idle pause
        let intent = apply_intent(&mut walker, None, None);
        assert_eq!(intent.move_intent, 0);
        assert_eq!(walker.patrol_anchor, Some(from_int(100)));

        // Burn through the pause
        for _ in 0..PATROL_IDLE_TICKS {
            apply_intent(&mut walker, None, None);
        }
        // Now heading for the far extreme
        let intent = apply_intent(&mut walker, None, None);
        assert!(intent.move_intent > 0);
        assert_eq!(walker.patrol_dest, from_int(260));
        assert_eq!(walker.facing, Facing::Left.flip());
    }

    #[test]
    fn test_patrol_stops_within_one_step_of_destination() {
        let mut walker = at(EntityKind::Walker, from_int(100));
        walker.patrol_anchor = Some(from_int(100));
        // A fraction of one step away from the destination
        walker.patrol_dest = from_int(100) + 500;

        let intent = apply_intent(&mut walker, None, None);
        // Treated as arrived: stop and start the pause
        assert_eq!(intent.move_intent, 0);
        assert_eq!(walker.velocity.x, 0);
        assert_eq!(walker.patrol_idle_ticks, 1);
    }

    #[test]
    fn test_charger_angers_then_charges() {
        let mut charger = at(EntityKind::Charger, 0);
        charger.facing = Facing::Right;
        // Player just to the right, same height
        let player = FixedVec2::new(from_int(60), from_int(14));

        let intent = apply_intent(&mut charger, None, Some(player));
        assert_eq!(intent.move_intent, 0);
        assert_eq!(charger.anger_ticks, ANGER_TICKS);

        for _ in 0..ANGER_TICKS {
            apply_intent(&mut charger, None, Some(player));
        }
        assert!(charger.charging);
        let intent = apply_intent(&mut charger, None, Some(player));
        assert_eq!(intent.move_intent, CHARGE_SPEED);
    }

    #[test]
    fn test_charger_ignores_player_behind() {
        let mut charger = at(EntityKind::Charger, from_int(100));
        charger.facing = Facing::Right;
        // Player to the left while the charger faces right
        let player = FixedVec2::new(from_int(40), from_int(14));

        apply_intent(&mut charger, None, Some(player));
        assert_eq!(charger.anger_ticks, 0);
        assert!(!charger.charging);
    }

    #[test]
    fn test_charger_detonates_on_wall_mid_rush() {
        let mut charger = at(EntityKind::Charger, 0);
        charger.charging = true;

        let mut result = CollisionResult::default();
        result.contacts.on_right_wall = true;
        assert_eq!(react(&mut charger, &result), Some(Reaction::SelfDestruct));

        // Not charging: walls are just walls
        charger.charging = false;
        assert_eq!(react(&mut charger, &result), None);
    }

    #[test]
    fn test_projectile_despawns_on_impact() {
        let mut projectile = at(EntityKind::Projectile, 0);
        let mut result = CollisionResult::default();
        result.contacts.on_left_wall = true;
        react(&mut projectile, &result);
        assert!(projectile.removed);
    }
}
