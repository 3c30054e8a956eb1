//! Barrel firing state machine, one step per barrel per tick. Bullet-on-fire
//! insertion happens here, in the motion phase, not the collision phase —
//! so it never needs to be synchronized with a parallelized collision pass.

use std::mem;

use tankarena_common::Vector2;

use crate::arena::Arena;
use crate::broadphase::{BroadphaseEntity, EntityKind, Rect};
use crate::entity::{
    Barrel, BarrelTargetKind, BarrelTargetTime, Bullet, EntityBase, TankState,
};

pub fn update_all(arena: &mut Arena, delta: f32) {
    let tick = arena.tick;
    let avg_delta = arena.avg_delta();
    let tank_ids: Vec<u32> = arena.tanks.keys().copied().collect();

    for tank_id in tank_ids {
        // Take the barrel list out of the tank so `fire` can mutate `arena`
        // (to insert the new bullet) without a second mutable borrow of the
        // same tank's storage.
        let mut barrels = match arena.tanks.get_mut(&tank_id) {
            Some(tank) if tank.state == TankState::Alive => mem::take(&mut tank.barrels),
            _ => continue,
        };

        for barrel in &mut barrels {
            step(arena, tank_id, barrel, tick, avg_delta, delta);
        }

        if let Some(tank) = arena.tanks.get_mut(&tank_id) {
            tank.barrels = barrels;
        }
    }
}

fn ticks_from_seconds_at_avg_delta(seconds: f32, avg_delta: f32, tick: u64) -> u64 {
    tick + (seconds / avg_delta).round().max(0.0) as u64
}

fn step(arena: &mut Arena, tank_id: u32, barrel: &mut Barrel, tick: u64, avg_delta: f32, delta: f32) {
    match barrel.target_time.target {
        BarrelTargetKind::None => {
            let mousedown = arena
                .tanks
                .get(&tank_id)
                .map(|t| t.input.mousedown)
                .unwrap_or(false);
            if mousedown && !barrel.cooling_down {
                barrel.cooling_down = true;
                barrel.target_time = BarrelTargetTime {
                    target: BarrelTargetKind::ReloadDelay,
                    time: ticks_from_seconds_at_avg_delta(barrel.config.reload_delay, avg_delta, tick),
                };
            }
        }
        BarrelTargetKind::ReloadDelay => {
            if tick >= barrel.target_time.time {
                fire(arena, tank_id, barrel, delta);
                barrel.target_time = BarrelTargetTime {
                    target: BarrelTargetKind::CoolingDown,
                    time: ticks_from_seconds_at_avg_delta(barrel.config.full_reload, avg_delta, tick),
                };
            }
        }
        BarrelTargetKind::CoolingDown => {
            if tick >= barrel.target_time.time {
                barrel.cooling_down = false;
                barrel.target_time = BarrelTargetTime::default();
            }
        }
    }
}

/// Spawns a bullet and applies recoil to the firing tank.
fn fire(arena: &mut Arena, tank_id: u32, barrel: &Barrel, delta: f32) {
    let Some(tank) = arena.tanks.get(&tank_id) else {
        return;
    };

    let angle = tank.base.rotation + barrel.config.angle;
    let dir = Vector2::unit(angle);
    let bullet_radius = barrel.config.width * tank.base.radius;
    let spawn_position = tank.base.position + dir * (tank.base.radius + bullet_radius + 1.0);
    let velocity = dir * barrel.config.bullet_speed;
    let damage = barrel.config.bullet_damage;
    let max_health = barrel.config.bullet_penetration;
    let recoil = barrel.config.recoil;

    let id = arena.alloc_id();
    let base = EntityBase {
        id,
        position: spawn_position,
        velocity,
        rotation: angle,
        radius: bullet_radius,
        max_health,
        health: max_health,
        damage,
        mass: 1.0,
        friction: crate::entity::BULLET_FRICTION,
    };
    arena.bullets.insert(
        id,
        Bullet {
            base,
            owner: tank_id,
            lifetime: crate::entity::BULLET_DEFAULT_LIFETIME,
        },
    );
    arena.broadphase.insert(BroadphaseEntity {
        id,
        kind: EntityKind::Bullet,
        rect: Rect::from_circle(spawn_position, bullet_radius),
        radius: bullet_radius,
    });

    if let Some(tank) = arena.tanks.get_mut(&tank_id) {
        let safe_delta = delta.max(f32::EPSILON);
        tank.base.velocity -= dir * (recoil / safe_delta);
    }
}
