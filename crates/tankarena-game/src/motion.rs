//! Motion integration: run once per tick for every live entity, then
//! refresh its broadphase record.

use tankarena_common::Vector2;

use crate::arena::Arena;
use crate::broadphase::{BroadphaseEntity, EntityKind, Rect};
use crate::entity::{EntityBase, TankState};

/// `velocity *= friction; position += velocity * delta / mass`, clamped to
/// `[0, size]` on each axis with velocity zeroed on the clamped axis.
pub fn integrate(base: &mut EntityBase, delta: f32, size: f32) {
    base.velocity = base.velocity * base.friction;
    base.position = base.position + base.velocity * (delta / base.mass);

    let (clamped, clamped_x, clamped_y) = base.position.clamp_axes(0.0, size);
    base.position = clamped;
    if clamped_x {
        base.velocity.x = 0.0;
    }
    if clamped_y {
        base.velocity.y = 0.0;
    }
}

fn sync_broadphase(arena: &mut Arena, id: u32, kind: EntityKind, base: &EntityBase) {
    arena.broadphase.mutate(BroadphaseEntity {
        id,
        kind,
        rect: Rect::from_circle(base.position, base.radius),
        radius: base.radius,
    });
}

pub fn integrate_all(arena: &mut Arena, delta: f32) {
    let size = arena.size;

    let shape_ids: Vec<u32> = arena.shapes.keys().copied().collect();
    for id in shape_ids {
        if let Some(shape) = arena.shapes.get_mut(&id) {
            integrate(&mut shape.base, delta, size);
            let base = shape.base;
            sync_broadphase(arena, id, EntityKind::Shape, &base);
        }
    }

    let bullet_ids: Vec<u32> = arena.bullets.keys().copied().collect();
    for id in bullet_ids {
        if let Some(bullet) = arena.bullets.get_mut(&id) {
            integrate(&mut bullet.base, delta, size);
            bullet.lifetime -= delta;
            let base = bullet.base;
            sync_broadphase(arena, id, EntityKind::Bullet, &base);
        }
    }

    let tank_ids: Vec<u32> = arena.tanks.keys().copied().collect();
    for id in tank_ids {
        if let Some(tank) = arena.tanks.get_mut(&id) {
            if tank.state != TankState::Alive {
                continue;
            }
            steer_from_input(tank);
            integrate(&mut tank.base, delta, size);
            tank.regen_health();
            let base = tank.base;
            sync_broadphase(arena, id, EntityKind::Tank, &base);
        }
    }
}

/// Applies the tank's current `Input` as a movement impulse and aims its
/// rotation at the mouse position. W/A/S/D are cardinal, not relative to
/// facing — a screen-space movement model.
fn steer_from_input(tank: &mut crate::entity::Tank) {
    use crate::entity::TANK_MOVEMENT_SPEED;

    let mut impulse = Vector2::ZERO;
    if tank.input.w {
        impulse.y -= 1.0;
    }
    if tank.input.s {
        impulse.y += 1.0;
    }
    if tank.input.a {
        impulse.x -= 1.0;
    }
    if tank.input.d {
        impulse.x += 1.0;
    }
    if impulse != Vector2::ZERO {
        tank.base.velocity += impulse.normalized() * TANK_MOVEMENT_SPEED;
    }

    let to_mouse = tank.input.mouse_pos - tank.base.position;
    if to_mouse.length_squared() > f32::EPSILON {
        tank.base.rotation = to_mouse.angle();
    }
}
