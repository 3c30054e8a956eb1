//! Pairwise collision resolution: damage and knockback. Each entity is
//! processed as "self" exactly once per tick; it only ever mutates its own
//! health and velocity, which is what makes the pass data-parallelizable —
//! mutual damage between two overlapping entities falls out naturally
//! because each side gets its own turn as "self" within the same tick.
//!
//! The broadphase-query-plus-circle-test read phase runs across a
//! `rayon` thread pool, one job per entity, touching only `&Arena`; kill
//! credits are collected rather than applied inline so the parallel phase
//! never needs a second entity's `&mut` borrow. The actual health/velocity
//! writes and credited kills are applied serially afterward, one job's
//! result per entity, so a given entity's update always lands on a single
//! logical step regardless of which worker computed it.

use rayon::prelude::*;

use tankarena_common::Vector2;

use crate::arena::{Arena, COLLISION_STRENGTH};
use crate::broadphase::{BroadphaseEntity, EntityKind, Rect};
use crate::entity::TankState;

#[derive(Clone, Copy)]
struct Candidate {
    id: u32,
    kind: EntityKind,
    position: Vector2,
    radius: f32,
    damage: f32,
    owner: Option<u32>,
    tank_alive: bool,
}

fn resolve_candidate(arena: &Arena, entry: &BroadphaseEntity) -> Option<Candidate> {
    match entry.kind {
        EntityKind::Shape => arena.shapes.get(&entry.id).map(|s| Candidate {
            id: entry.id,
            kind: EntityKind::Shape,
            position: s.base.position,
            radius: s.base.radius,
            damage: s.base.damage,
            owner: None,
            tank_alive: true,
        }),
        EntityKind::Bullet => arena.bullets.get(&entry.id).map(|b| Candidate {
            id: entry.id,
            kind: EntityKind::Bullet,
            position: b.base.position,
            radius: b.base.radius,
            damage: b.base.damage,
            owner: Some(b.owner),
            tank_alive: true,
        }),
        EntityKind::Tank => arena.tanks.get(&entry.id).map(|t| Candidate {
            id: entry.id,
            kind: EntityKind::Tank,
            position: t.base.position,
            radius: t.base.radius,
            damage: t.base.damage,
            owner: None,
            tank_alive: t.state == TankState::Alive,
        }),
    }
}

/// Cull rules: a bullet ignores its owner; tanks ignore bullets
/// they own; bullets ignore bullets of the same owner; all kinds ignore
/// candidates pointing at dead tanks.
fn is_culled(self_kind: EntityKind, self_id: u32, self_owner: Option<u32>, candidate: &Candidate) -> bool {
    if candidate.id == self_id {
        return true;
    }
    if candidate.kind == EntityKind::Tank && !candidate.tank_alive {
        return true;
    }
    match self_kind {
        EntityKind::Bullet => {
            if candidate.kind == EntityKind::Tank && Some(candidate.id) == self_owner {
                return true;
            }
            if candidate.kind == EntityKind::Bullet && candidate.owner == self_owner {
                return true;
            }
        }
        EntityKind::Tank => {
            if candidate.kind == EntityKind::Bullet && candidate.owner == Some(self_id) {
                return true;
            }
        }
        EntityKind::Shape => {}
    }
    false
}

fn credit_kill(arena: &mut Arena, bullet_owner: u32, reward: f32) {
    if let Some(owner_tank) = arena.tanks.get_mut(&bullet_owner) {
        if owner_tank.state == TankState::Alive {
            owner_tank.level += reward;
        }
    }
}

/// One entity's resolved-collision outcome, computed against a read-only
/// `&Arena` so it can run on any `rayon` worker. `kill_credits` lists the
/// bullet owners to award on apply — awarding them here, inside the
/// parallel phase, would require a second entity's `&mut` borrow.
struct Resolved {
    id: u32,
    health: f32,
    velocity: Vector2,
    kill_credits: Vec<(u32, f32)>,
}

/// Applies damage and knockback from every candidate overlapping `self`,
/// returning the (possibly killing) updated health/velocity plus any kill
/// credits earned. Read-only over `arena`, so it is safe to run for every
/// entity of a kind concurrently.
#[allow(clippy::too_many_arguments)]
fn resolve_one(
    arena: &Arena,
    self_kind: EntityKind,
    self_id: u32,
    self_owner: Option<u32>,
    position: Vector2,
    radius: f32,
    mut health: f32,
    mut velocity: Vector2,
    reward_on_death: Option<f32>,
    level_on_death: Option<f32>,
    delta: f32,
) -> Resolved {
    let mut kill_credits = Vec::new();
    let rect = Rect::from_circle(position, radius);
    let candidates = arena.broadphase.query(&rect);

    for entry in candidates {
        let Some(candidate) = resolve_candidate(arena, &entry) else {
            continue;
        };
        if is_culled(self_kind, self_id, self_owner, &candidate) {
            continue;
        }
        let distance = position.distance(candidate.position);
        if distance >= radius + candidate.radius {
            continue;
        }

        let was_alive = health > 0.0;
        health -= candidate.damage * delta;

        let heading_candidate_to_self = if distance > f32::EPSILON {
            (position - candidate.position) / distance
        } else {
            Vector2::ZERO
        };
        velocity -= heading_candidate_to_self * COLLISION_STRENGTH;

        if was_alive && health <= 0.0 && candidate.kind == EntityKind::Bullet {
            if let Some(owner) = candidate.owner {
                let reward = reward_on_death.unwrap_or_else(|| level_on_death.unwrap_or(0.0) / 2.0);
                kill_credits.push((owner, reward));
            }
        }
    }

    Resolved {
        id: self_id,
        health,
        velocity,
        kill_credits,
    }
}

pub fn resolve_all(arena: &mut Arena, delta: f32) {
    let shape_snapshot: Vec<_> = arena
        .shapes
        .iter()
        .map(|(id, s)| (*id, s.base.position, s.base.radius, s.base.health, s.base.velocity, s.reward))
        .collect();
    let resolved: Vec<Resolved> = shape_snapshot
        .par_iter()
        .map(|&(id, position, radius, health, velocity, reward)| {
            resolve_one(
                arena,
                EntityKind::Shape,
                id,
                None,
                position,
                radius,
                health,
                velocity,
                Some(reward),
                None,
                delta,
            )
        })
        .collect();
    apply(arena, resolved);

    let bullet_snapshot: Vec<_> = arena
        .bullets
        .iter()
        .map(|(id, b)| (*id, b.base.position, b.base.radius, b.base.health, b.base.velocity, b.owner))
        .collect();
    let resolved: Vec<Resolved> = bullet_snapshot
        .par_iter()
        .map(|&(id, position, radius, health, velocity, owner)| {
            resolve_one(
                arena,
                EntityKind::Bullet,
                id,
                Some(owner),
                position,
                radius,
                health,
                velocity,
                None,
                None,
                delta,
            )
        })
        .collect();
    apply(arena, resolved);

    let tank_snapshot: Vec<_> = arena
        .tanks
        .iter()
        .filter(|(_, t)| t.state == TankState::Alive)
        .map(|(id, t)| (*id, t.base.position, t.base.radius, t.base.health, t.base.velocity, t.level))
        .collect();
    let resolved: Vec<Resolved> = tank_snapshot
        .par_iter()
        .map(|&(id, position, radius, health, velocity, level)| {
            resolve_one(
                arena,
                EntityKind::Tank,
                id,
                None,
                position,
                radius,
                health,
                velocity,
                None,
                Some(level),
                delta,
            )
        })
        .collect();
    apply(arena, resolved);
}

/// Serial write-back phase: one `Resolved` per entity, applied in the
/// order the parallel phase happened to finish in (order doesn't matter —
/// each touches a disjoint entity plus, for kill credits, the bullet's
/// owner tank).
fn apply(arena: &mut Arena, resolved: Vec<Resolved>) {
    for r in resolved {
        for (owner, reward) in &r.kill_credits {
            credit_kill(arena, *owner, *reward);
        }
        if let Some(shape) = arena.shapes.get_mut(&r.id) {
            shape.base.health = r.health;
            shape.base.velocity = r.velocity;
            continue;
        }
        if let Some(bullet) = arena.bullets.get_mut(&r.id) {
            bullet.base.health = r.health;
            bullet.base.velocity = r.velocity;
            continue;
        }
        if let Some(tank) = arena.tanks.get_mut(&r.id) {
            tank.base.health = r.health;
            tank.base.velocity = r.velocity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, EntityIdAllocator};
    use crate::entity::{EntityBase, Shape};

    fn insert_shape(arena: &mut Arena, id: u32, position: Vector2, radius: f32, health: f32) {
        arena.shapes.insert(
            id,
            Shape {
                base: EntityBase {
                    id,
                    position,
                    velocity: Vector2::ZERO,
                    rotation: 0.0,
                    radius,
                    max_health: health,
                    health,
                    damage: 20.0,
                    mass: 5.0,
                    friction: 0.9,
                },
                reward: 0.075,
            },
        );
        arena.broadphase.insert(BroadphaseEntity {
            id,
            kind: EntityKind::Shape,
            rect: Rect::from_circle(position, radius),
            radius,
        });
    }

    #[test]
    fn overlapping_shapes_damage_each_other() {
        let mut arena = Arena::new("/t", EntityIdAllocator::new(), 0);
        insert_shape(&mut arena, 1, Vector2::new(100.0, 100.0), 100.0, 50.0);
        insert_shape(&mut arena, 2, Vector2::new(150.0, 100.0), 100.0, 50.0);

        resolve_all(&mut arena, 1.0);

        assert!(arena.shapes[&1].base.health < 50.0);
        assert!(arena.shapes[&2].base.health < 50.0);
    }

    #[test]
    fn non_overlapping_shapes_are_untouched() {
        let mut arena = Arena::new("/t", EntityIdAllocator::new(), 0);
        insert_shape(&mut arena, 1, Vector2::new(0.0, 0.0), 50.0, 50.0);
        insert_shape(&mut arena, 2, Vector2::new(5000.0, 5000.0), 50.0, 50.0);

        resolve_all(&mut arena, 1.0);

        assert_eq!(arena.shapes[&1].base.health, 50.0);
        assert_eq!(arena.shapes[&2].base.health, 50.0);
    }
}
