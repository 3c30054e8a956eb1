//! Spawn/despawn rules: shape population hysteresis, bullet expiry, and
//! tank death/respawn. Runs at the top of each tick, before motion
//! integration — dead shapes/bullets are culled and dead tanks transitioned
//! before anything moves this tick.

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tracing::info;

use crate::arena::{Arena, SHAPE_TARGET_HYSTERESIS};
use crate::broadphase::{BroadphaseEntity, EntityKind, Rect};
use crate::client::{ClientHandle, CLOSE_ARENA_TEARDOWN};
use crate::entity::{
    tank_radius_for_level, Barrel, EntityBase, EntityId, Input, Shape, Tank, TankState, TankType,
    SHAPE_RADIUS_MAX, SHAPE_RADIUS_MIN, TANK_FRICTION, TANK_MASS,
};
use tankarena_common::config::TankConfig;
use tankarena_common::protocol::encode_death;
use tankarena_common::Vector2;

/// Spawns shapes up to `target`, trims arbitrary excess past `target + 12`.
/// No preference among excess entries: drops whichever the `HashMap`
/// iteration yields first.
pub fn maintain_shape_population(arena: &mut Arena) {
    let target = arena.shape_target() as i64;
    let current = arena.shapes.len() as i64;

    if current <= target - SHAPE_TARGET_HYSTERESIS {
        let to_spawn = (target - current).max(0);
        for _ in 0..to_spawn {
            spawn_shape(arena);
        }
    } else if current >= target + SHAPE_TARGET_HYSTERESIS {
        let excess = (current - target).max(0) as usize;
        let doomed: Vec<u32> = arena.shapes.keys().take(excess).copied().collect();
        for id in doomed {
            destroy_shape(arena, id);
        }
    }
}

fn spawn_shape(arena: &mut Arena) {
    let id = arena.alloc_id();
    let position = arena.random_position();
    let radius = rand::thread_rng().gen_range(SHAPE_RADIUS_MIN..=SHAPE_RADIUS_MAX);
    let shape = Shape::spawn(id, position, radius);
    arena.broadphase.insert(BroadphaseEntity {
        id,
        kind: EntityKind::Shape,
        rect: Rect::from_circle(position, radius),
        radius,
    });
    arena.shapes.insert(id, shape);
}

fn destroy_shape(arena: &mut Arena, id: u32) {
    arena.shapes.remove(&id);
    arena.broadphase.delete(id);
}

/// Removes shapes whose health dropped to/below zero during the collision
/// pass; this runs at the *next* tick's top.
pub fn cull_dead_shapes(arena: &mut Arena) {
    let dead: Vec<u32> = arena
        .shapes
        .iter()
        .filter(|(_, s)| s.base.health <= 0.0)
        .map(|(id, _)| *id)
        .collect();
    for id in dead {
        destroy_shape(arena, id);
    }
}

/// Removes expired/destroyed bullets: `lifetime <= 0 OR health <= 0`.
pub fn cull_dead_bullets(arena: &mut Arena) {
    let dead: Vec<u32> = arena
        .bullets
        .iter()
        .filter(|(_, b)| b.is_expired())
        .map(|(id, _)| *id)
        .collect();
    for id in dead {
        arena.bullets.remove(&id);
        arena.broadphase.delete(id);
    }
}

/// Halves a tank's level on death, flooring at 1. Shared by both
/// `TankType`s.
fn halved_level(level: f32) -> f32 {
    if level / 2.0 >= 1.0 {
        level / 2.0
    } else {
        1.0
    }
}

/// Transitions tanks whose health reached zero: Remote tanks go to `Dead`
/// (broadphase record dropped, Death packet sent) and wait for a Respawn
/// packet; Local (bot) tanks respawn in place immediately.
pub fn process_deaths(arena: &mut Arena) {
    let dying: Vec<u32> = arena
        .tanks
        .iter()
        .filter(|(_, t)| t.state == TankState::Alive && t.base.health <= 0.0)
        .map(|(id, _)| *id)
        .collect();

    for id in dying {
        let Some(tank) = arena.tanks.get_mut(&id) else {
            continue;
        };
        tank.input = Input::default();

        if tank.is_remote() {
            tank.state = TankState::Dead;
            arena.broadphase.delete(id);
            let spawn_time = tank.spawn_time;
            let client = tank.client.clone();
            let name = tank.name.clone();
            if let Some(client) = client {
                let seconds_alive = spawn_time
                    .map(|t| t.elapsed().as_secs_f64())
                    .unwrap_or(0.0);
                if seconds_alive <= 15.0 {
                    info!(bruh = true, name = %name, seconds_alive, "lived a very short time before dying");
                } else {
                    info!(name = %name, seconds_alive, "tank died");
                }
                client.send(encode_death(seconds_alive));
            }
        } else {
            tank.base.position = arena.random_position();
            tank.base.health = tank.base.max_health;
            tank.level = halved_level(tank.level);
            let position = tank.base.position;
            let radius = tank.base.radius;
            arena.broadphase.mutate(BroadphaseEntity {
                id,
                kind: EntityKind::Tank,
                rect: Rect::from_circle(position, radius),
                radius,
            });
        }
    }
}

/// Handles an authenticated Dead tank's Respawn packet: reposition
/// uniformly, restore health, halve level, restore the broadphase record,
/// and go Alive.
pub fn respawn(arena: &mut Arena, id: u32) -> bool {
    let Some(tank) = arena.tanks.get_mut(&id) else {
        return false;
    };
    if tank.state != TankState::Dead {
        return false;
    }

    tank.base.position = arena.random_position();
    tank.base.health = tank.base.max_health;
    tank.level = halved_level(tank.level);
    tank.base.radius = tank_radius_for_level(tank.level);
    tank.state = TankState::Alive;
    tank.spawn_time = Some(std::time::Instant::now());

    let position = tank.base.position;
    let radius = tank.base.radius;
    arena.broadphase.insert(BroadphaseEntity {
        id,
        kind: EntityKind::Tank,
        rect: Rect::from_circle(position, radius),
        radius,
    });
    true
}

/// Fully removes a tank (disconnect): drops its broadphase record (if it
/// had one) and its map entry, then recomputes arena size.
pub fn destroy_tank(arena: &mut Arena, id: u32) {
    if arena.tanks.remove(&id).is_some() {
        arena.broadphase.delete(id);
        arena.recompute_size();
    }
}

/// Sends every Remote client the teardown close code and clears the
/// arena's entities. Used when an arena is torn down (e.g. removed from
/// the registry).
pub fn teardown(arena: &mut Arena) {
    for tank in arena.tanks.values() {
        if let Some(client) = &tank.client {
            client.close(CLOSE_ARENA_TEARDOWN);
        }
    }
    arena.tanks.clear();
    arena.shapes.clear();
    arena.bullets.clear();
    arena.broadphase.clear();
}

/// Admits a new tank into the arena — used both for an InboundInit
/// handshake and for the bot population seeded at arena startup: allocates
/// an id, places it at a uniform random position, wires its barrels from
/// `mockup`, and inserts its broadphase record. Destruction of any tank
/// recomputes arena size, and so does joining one, since size depends on
/// `|tanks|`.
pub fn join_tank(
    arena: &mut Arena,
    kind: TankType,
    name: String,
    mockup_index: usize,
    mockup: &TankConfig,
    client: Option<Arc<dyn ClientHandle>>,
) -> EntityId {
    let id = arena.alloc_id();
    let level = 1.0;
    let position = arena.random_position();
    let radius = tank_radius_for_level(level);
    let max_health = Tank::max_health_for_level(level);
    let barrels = mockup.barrels.iter().cloned().map(Barrel::new).collect();

    let tank = Tank {
        base: EntityBase {
            id,
            position,
            velocity: Vector2::ZERO,
            rotation: 0.0,
            radius,
            max_health,
            health: max_health,
            damage: 0.0,
            mass: TANK_MASS,
            friction: TANK_FRICTION,
        },
        kind,
        state: TankState::Alive,
        input: Input::default(),
        chat: None,
        level,
        mockup: mockup_index,
        fov: mockup.fov,
        barrels,
        name,
        client: client.clone(),
        spawn_time: matches!(kind, TankType::Remote).then(Instant::now),
    };

    arena.tanks.insert(id, tank);
    arena.broadphase.insert(BroadphaseEntity {
        id,
        kind: EntityKind::Tank,
        rect: Rect::from_circle(position, radius),
        radius,
    });
    arena.recompute_size();
    id
}

/// Rebuilds a live tank's barrel list from its mockup's current config,
/// preserving its `mockup` index. Used on config hot reload: the tank's
/// `mockup` index stays put, only the barrels it derives from it change.
pub fn rebuild_barrels_from_config(tank: &mut Tank, mockup: &TankConfig) {
    tank.fov = mockup.fov;
    tank.barrels = mockup.barrels.iter().cloned().map(Barrel::new).collect();
}

/// Tops the arena's `Local` (bot) population up to `arena.target_bot_count`,
/// picking a uniformly random mockup per bot. Called once when an arena is
/// registered, so bots are present — but idle, since `tick::step` is a
/// no-op without a Remote tank — before any player ever joins, per S6.
pub fn seed_bots(arena: &mut Arena, mockups: &[TankConfig]) {
    if mockups.is_empty() {
        return;
    }
    let current_bots = arena
        .tanks
        .values()
        .filter(|t| t.kind == TankType::Local)
        .count();
    let to_spawn = arena.target_bot_count.saturating_sub(current_bots);
    for _ in 0..to_spawn {
        let mockup_index = rand::thread_rng().gen_range(0..mockups.len());
        let mockup = mockups[mockup_index].clone();
        join_tank(
            arena,
            TankType::Local,
            "Bot".to_string(),
            mockup_index,
            &mockup,
            None,
        );
    }
}
