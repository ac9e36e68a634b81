//! Simulation Step
//!
//! Advances every entity by one fixed tick, in entity-id order, through the
//! same phases every time: intent, gravity, collision, state transitions,
//! entity interactions, purge. Side effects are confined to entity state;
//! the grid is read-only. A failure in one entity's processing never aborts
//! the tick for the others.

use tracing::warn;

use crate::core::fixed::{fixed_min, fixed_mul, GRAVITY, MAX_FALL_SPEED, TICK_DT};
use crate::core::vec2::FixedVec2;
use crate::game::behavior::{self, Reaction};
use crate::game::collision::{self, Aabb, CollisionResult};
use crate::game::entity::{
    DamageOutcome, EntityId, EntityKind, EntityState, Facing, TransitionCtx,
    ATTACK_COOLDOWN_TICKS, ATTACK_RANGE,
};
use crate::game::events::{DeathCause, GameEvent};
use crate::game::input::InputSnapshot;
use crate::game::world::World;

/// Result of one tick.
#[derive(Debug, Default)]
pub struct StepResult {
    /// Events generated this tick, in priority order
    pub events: Vec<GameEvent>,
}

/// Run one simulation tick.
///
/// # Determinism
///
/// This function is 100% deterministic:
/// - Entities advance in id order (BTreeMap iteration)
/// - Fixed-point math only
/// - The input snapshot is the only outside signal
pub fn advance(world: &mut World, input: &InputSnapshot) -> StepResult {
    world.tick += 1;
    let tick = world.tick;

    let ids: Vec<EntityId> = world.entities.keys().copied().collect();

    // Player center at tick start drives enemy aggro this tick
    let player_center = world.player().map(|p| p.center());

    let mut attackers: Vec<EntityId> = Vec::new();

    // Phases (a)-(d), one entity at a time
    for id in &ids {
        let grid = &world.grid;
        let events = &mut world.pending_events;
        let Some(entity) = world.entities.get_mut(id) else {
            continue;
        };

        entity.tick_timers();

        // (a) intent: input for the player, AI for the rest
        let is_player = Some(*id) == world.player_id;
        let intent = behavior::apply_intent(
            entity,
            if is_player { Some(input) } else { None },
            if is_player { None } else { player_center },
        );

        // (b) gravity, capped at terminal fall speed
        if entity.state.alive() && entity.kind.spec().gravity {
            let vy = entity.velocity.y.wrapping_add(fixed_mul(GRAVITY, TICK_DT));
            entity.velocity.y = fixed_min(vy, MAX_FALL_SPEED);
        }

        // (c) collision resolution and integration
        let result = if entity.state.alive() {
            let aabb = Aabb::new(
                entity.position.x,
                entity.position.y,
                entity.width(),
                entity.height(),
            );
            let delta = FixedVec2::new(
                fixed_mul(entity.velocity.x, TICK_DT),
                fixed_mul(entity.velocity.y, TICK_DT),
            );
            let result = collision::resolve(grid, aabb, delta);

            entity.position = entity.position.add(result.displacement);
            // Contact zeroes the velocity component into the surface
            if result.contacts.on_left_wall || result.contacts.on_right_wall {
                entity.velocity.x = 0;
            }
            if result.contacts.on_ceiling && entity.velocity.y < 0 {
                entity.velocity.y = 0;
            }
            if result.contacts.on_ground && entity.velocity.y > 0 {
                entity.velocity.y = 0;
            }
            entity.grounded = result.contacts.on_ground;
            entity.contacts = result.contacts;
            result
        } else {
            CollisionResult::default()
        };

        // Kind-specific collision reactions
        if behavior::react(entity, &result) == Some(Reaction::SelfDestruct) {
            entity.kill();
            events.push(GameEvent::died(
                tick,
                *id,
                entity.kind,
                DeathCause::SelfDestruct,
            ));
        }

        // Report swept hazard/trigger cells
        for touch in &result.cell_events {
            events.push(GameEvent::cell_touched(
                tick, *id, touch.kind, touch.col, touch.row,
            ));
        }

        // Falling out of an open-bottom level is lethal and immediate
        if grid.open_bottom() && entity.position.y >= grid.world_height() {
            events.push(GameEvent::died(tick, *id, entity.kind, DeathCause::FellOut));
            entity.state = EntityState::Dead;
            entity.removed = true;
            continue;
        }

        // (d) state machine transitions from this tick's facts
        let was_dying = entity.state == EntityState::Dying;
        let ctx = TransitionCtx {
            grounded: entity.grounded,
            hazard: result.touched_hazard(),
            jumped: intent.jumped,
            move_intent: intent.move_intent,
        };
        if let Some((_, new)) = entity.evaluate_transitions(&ctx) {
            if new == EntityState::Dying && !was_dying {
                let cause = if ctx.hazard {
                    DeathCause::Hazard
                } else {
                    DeathCause::Damage
                };
                events.push(GameEvent::died(tick, *id, entity.kind, cause));
            }
        }

        if intent.wants_attack {
            entity.attack_cooldown = ATTACK_COOLDOWN_TICKS;
            attackers.push(*id);
        }
    }

    // (e) entity-entity interactions on post-move boxes
    process_contact_damage(world, tick);
    process_melee_attacks(world, tick, &attackers);
    process_pickups(world, tick);

    // Post-resolution invariant: nobody ends the tick inside a solid cell.
    // Violations are an internal defect; recover best-effort and report.
    recover_overlaps(world, tick, &ids);

    // (f) purge entities that finished dying or were removed
    world.purge();

    let mut events = world.take_events();
    events.sort();
    StepResult { events }
}

/// Enemies touching the player damage it. Deterministic: enemies apply in
/// id order, and the invulnerability window from the first hit shields the
/// rest of the pile-up.
fn process_contact_damage(world: &mut World, tick: u32) {
    let Some(player_id) = world.player_id else {
        return;
    };
    let Some(player) = world.entities.get(&player_id) else {
        return;
    };
    if !player.state.alive() {
        return;
    }

    struct Hit {
        source: EntityId,
        damage: i32,
        from_left: bool,
        is_projectile: bool,
    }

    let player_snapshot = player.clone();
    let hits: Vec<Hit> = world
        .entities
        .values()
        .filter(|e| e.kind.is_enemy() && e.state.alive() && e.overlaps(&player_snapshot))
        .map(|e| Hit {
            source: e.id,
            damage: e.kind.spec().contact_damage,
            from_left: e.center().x < player_snapshot.center().x,
            is_projectile: e.kind == EntityKind::Projectile,
        })
        .collect();

    for hit in hits {
        let Some(player) = world.entities.get_mut(&player_id) else {
            return;
        };
        let outcome = player.take_damage(hit.damage, hit.from_left);
        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Hurt => {
                let hp_left = player.hp;
                world.pending_events.push(GameEvent::damaged(
                    tick,
                    player_id,
                    Some(hit.source),
                    hit.damage,
                    hp_left,
                ));
            }
            DamageOutcome::Died => {
                world.pending_events.push(GameEvent::died(
                    tick,
                    player_id,
                    EntityKind::Player,
                    DeathCause::Damage,
                ));
            }
        }

        // Projectiles are spent on impact, even against an invulnerable
        // target
        if hit.is_projectile {
            if let Some(projectile) = world.entities.get_mut(&hit.source) {
                projectile.removed = true;
            }
        }
    }
}

/// Resolve queued melee swings: each attacker hits the nearest living enemy
/// within range on its facing side.
fn process_melee_attacks(world: &mut World, tick: u32, attackers: &[EntityId]) {
    for attacker_id in attackers {
        let Some(attacker) = world.entities.get(attacker_id) else {
            continue;
        };
        if !attacker.state.alive() {
            continue;
        }
        let center = attacker.center();
        let facing = attacker.facing;
        let damage = attacker.kind.spec().contact_damage;

        // Nearest enemy in reach and in front; ties broken by id order
        let target = world
            .entities
            .values()
            .filter(|e| e.kind.is_enemy() && e.state.alive())
            .filter(|e| {
                let delta = e.center().sub(center);
                let in_front = match facing {
                    Facing::Right => delta.x >= 0,
                    Facing::Left => delta.x <= 0,
                };
                in_front && delta.x.abs() <= ATTACK_RANGE && delta.y.abs() <= ATTACK_RANGE
            })
            .min_by_key(|e| (e.center().sub(center).x.abs(), e.id))
            .map(|e| (e.id, e.center().x));

        let Some((target_id, target_x)) = target else {
            continue;
        };
        let from_left = center.x < target_x;

        let Some(target) = world.entities.get_mut(&target_id) else {
            continue;
        };
        let outcome = target.take_damage(damage, from_left);
        let (target_kind, hp_left) = (target.kind, target.hp);

        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Hurt => {
                world.pending_events.push(GameEvent::damaged(
                    tick,
                    target_id,
                    Some(*attacker_id),
                    damage,
                    hp_left,
                ));
            }
            DamageOutcome::Died => {
                world.pending_events.push(GameEvent::died(
                    tick,
                    target_id,
                    target_kind,
                    DeathCause::Damage,
                ));

                // Score the kill
                let score_value = target_kind.spec().score_value;
                if let Some(attacker) = world.entities.get_mut(attacker_id) {
                    attacker.score = attacker.score.saturating_add(score_value);
                }

                // A slain charger releases its payload
                if target_kind == EntityKind::Charger {
                    let payload = world.entities.get(&target_id).map(|t| {
                        (
                            FixedVec2::new(
                                t.position.x,
                                t.position.y.wrapping_add(t.height()),
                            ),
                            t.facing,
                        )
                    });
                    if let Some((foot, facing)) = payload {
                        let projectile_id = world.spawn(EntityKind::Projectile, foot);
                        let speed = EntityKind::Projectile.spec().move_speed;
                        if let Some(projectile) = world.entities.get_mut(&projectile_id) {
                            projectile.velocity.x = fixed_mul(facing.sign(), speed);
                        }
                    }
                }
            }
        }
    }
}

/// The player collects any pickup it overlaps.
fn process_pickups(world: &mut World, tick: u32) {
    let Some(player_id) = world.player_id else {
        return;
    };
    let Some(player) = world.entities.get(&player_id) else {
        return;
    };
    if !player.state.alive() {
        return;
    }

    let player_snapshot = player.clone();
    let collected: Vec<(EntityId, u32)> = world
        .entities
        .values()
        .filter(|e| e.kind == EntityKind::Pickup && !e.removed && e.overlaps(&player_snapshot))
        .map(|e| (e.id, e.kind.spec().score_value))
        .collect();

    // Pickups also restore a little health
    const PICKUP_HEAL: i32 = 10;

    for (pickup_id, score) in collected {
        if let Some(pickup) = world.entities.get_mut(&pickup_id) {
            pickup.removed = true;
        }
        let Some(player) = world.entities.get_mut(&player_id) else {
            return;
        };
        player.score = player.score.saturating_add(score);
        player.heal(PICKUP_HEAL);
        let new_score = player.score;
        world.pending_events.push(GameEvent::pickup(
            tick, player_id, pickup_id, score, new_score,
        ));
    }
}

/// Detect and repair entities that ended the tick inside a solid cell.
fn recover_overlaps(world: &mut World, tick: u32, ids: &[EntityId]) {
    for id in ids {
        let grid = &world.grid;
        let events = &mut world.pending_events;
        let Some(entity) = world.entities.get_mut(id) else {
            continue;
        };
        if !entity.state.alive() {
            continue;
        }
        if !grid.is_solid_region(
            entity.position.x,
            entity.position.y,
            entity.width(),
            entity.height(),
        ) {
            continue;
        }

        match World::snap_free(grid, entity) {
            Some(free) => {
                warn!(
                    entity = %entity.id,
                    from = %entity.position,
                    to = %free,
                    "entity ended tick inside solid cell; snapped free"
                );
                events.push(GameEvent::overlap_recovered(
                    tick,
                    *id,
                    entity.position,
                    free,
                ));
                entity.position = free;
                entity.velocity = FixedVec2::ZERO;
            }
            None => {
                warn!(
                    entity = %entity.id,
                    position = %entity.position,
                    "entity stuck inside solid cell; no free position found"
                );
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
