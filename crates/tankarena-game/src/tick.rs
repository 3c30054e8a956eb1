//! Per-arena tick pipeline: lifecycle housekeeping, motion integration
//! (including the barrel FSM, which fires during this phase), collision
//! resolution, death processing, census emission, and the periodic
//! leaderboard broadcast.
//!
//! A tick is skipped entirely while an arena has no Remote tank connected —
//! an empty arena does no simulation work.

use crate::arena::Arena;
use crate::entity::TankType;
use crate::{barrel, census, collision, leaderboard, lifecycle, motion};

/// Runs one full tick. `delta` is the wall-clock/nominal-period ratio for
/// this tick; the caller is responsible for measuring it and feeding it in
/// so the pipeline itself stays free of a wall-clock dependency (and is
/// deterministic to drive from tests).
pub fn step(arena: &mut Arena, delta: f32) {
    if !arena.tanks.values().any(|t| t.kind == TankType::Remote) {
        return;
    }

    arena.tick += 1;
    arena.record_delta(delta);

    lifecycle::cull_dead_shapes(arena);
    lifecycle::cull_dead_bullets(arena);
    lifecycle::maintain_shape_population(arena);
    lifecycle::process_deaths(arena);

    motion::integrate_all(arena, delta);
    barrel::update_all(arena, delta);

    collision::resolve_all(arena, delta);

    census::run_all(arena);
    leaderboard::maybe_broadcast(arena);
}
