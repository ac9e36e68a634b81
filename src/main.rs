//! Orchard Demo
//!
//! Runs a scripted session headless: loads a built-in level, drives the
//! fixed-timestep loop with generated input, reacts to events the way an
//! outer game layer would (win on the goal trigger, lose on player death),
//! then replays the recorded input timeline to verify determinism.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use orchard::game::events::GameEventData;
use orchard::game::step;
use orchard::{
    CellKind, EntityKind, GameLoop, InputSnapshot, InputTimeline, LevelData, StopSignal, World,
    FIXED_ONE, TICK_DURATION, VERSION,
};

/// Built-in demo level: a run to the goal trigger past two enemies, a
/// one-way platform, and a few pickups.
const DEMO_LEVEL: &[&str] = &[
    "..............................",
    "..........o...................",
    "........-----.................",
    "..P..........W.....C....o...!.",
    "##############################",
];

/// Ticks before the demo gives up
const DEMO_TICK_LIMIT: u32 = 3600;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Orchard demo v{}", VERSION);
    run_demo().context("demo session failed")
}

/// Scripted input for a tick: run right, hop periodically, swing often.
fn scripted_input(tick: u32) -> InputSnapshot {
    let mut snap = InputSnapshot::with_move(127);
    snap.set_jump(tick % 150 < 2);
    snap.set_action(tick % 2 == 0);
    snap
}

fn run_demo() -> anyhow::Result<()> {
    let level = LevelData::from_ascii("demo", 32 * FIXED_ONE, false, DEMO_LEVEL)
        .context("demo level is malformed")?;
    let mut world = World::from_level(&level)?;

    info!(
        width = level.width,
        height = level.height,
        entities = world.entities.len(),
        "level loaded"
    );

    let stop = StopSignal::new();
    let mut game_loop = GameLoop::new(stop.clone());
    let mut timeline = InputTimeline::new();
    let mut outcome = "timeout";

    for frame in 0..DEMO_TICK_LIMIT {
        let input = scripted_input(frame);
        timeline.record(frame, input);

        // Headless: pretend each rendered frame took exactly one tick
        let report = game_loop.frame(&mut world, &input, TICK_DURATION);
        if report.stopped {
            break;
        }

        for event in &report.events {
            match &event.data {
                GameEventData::EntityDied { entity, kind, cause } => {
                    info!(tick = event.tick, %entity, ?kind, ?cause, "entity died");
                    if *kind == EntityKind::Player {
                        outcome = "defeat";
                        stop.raise();
                    }
                }
                GameEventData::PickupCollected { score, new_score, .. } => {
                    info!(tick = event.tick, score, new_score, "pickup collected");
                }
                GameEventData::CellTouched { cell, col, row, .. } => {
                    if *cell == CellKind::Trigger {
                        info!(tick = event.tick, col, row, "goal trigger reached");
                        outcome = "victory";
                        stop.raise();
                    }
                }
                GameEventData::EntityDamaged { entity, hp_left, .. } => {
                    info!(tick = event.tick, %entity, hp_left, "entity damaged");
                }
                GameEventData::OverlapRecovered { entity, .. } => {
                    warn!(tick = event.tick, %entity, "overlap recovery kicked in");
                }
                GameEventData::EntitySpawned { .. } => {}
            }
        }

        // Render handoff happens here in a real frontend
        let _ = world.render_snapshot();
    }

    let final_hash = world.compute_hash();
    info!(
        outcome,
        ticks = world.tick,
        score = world.player().map(|p| p.score).unwrap_or(0),
        hash = %hex::encode(final_hash),
        "session over"
    );

    // Save/restore round trip through the persistence surface
    let save_bytes = world
        .save_state()
        .to_bytes()
        .context("save state encoding failed")?;
    let restored = World::restore(
        &level,
        orchard::game::SaveState::from_bytes(&save_bytes).context("save state decoding failed")?,
    )?;
    info!(
        bytes = save_bytes.len(),
        restored_hash_matches = restored.compute_hash() == final_hash,
        "save/restore round trip"
    );

    // Replay the recorded timeline against a fresh world; the hashes must
    // agree at every run
    info!("replaying {} ticks to verify determinism", world.tick);
    let mut replay_world = World::from_level(&level)?;
    for (_, snapshot) in timeline.replay_iter().take(world.tick as usize) {
        step::advance(&mut replay_world, &snapshot);
    }
    let replay_hash = replay_world.compute_hash();

    if replay_hash == final_hash {
        info!("DETERMINISM VERIFIED: replay hash matches");
    } else {
        warn!(
            original = %hex::encode(final_hash),
            replay = %hex::encode(replay_hash),
            "DETERMINISM FAILURE: hashes differ"
        );
    }

    // Pretty-print the final standings for the terminal
    for view in world.render_snapshot() {
        let (x, y) = view.position.to_floats();
        info!(
            id = %view.id,
            kind = view.kind.name(),
            x,
            y,
            state = ?view.state,
            "final entity"
        );
    }

    Ok(())
}
