//! Per-player viewport culling and packet assembly. Runs once per tick,
//! after the collision pass, for every tank: a Remote tank gets a Census
//! packet pushed down its `ClientHandle`; a Local (bot) tank gets its
//! `Input` recomputed from the nearest visible target, but only every
//! other tick.

use tankarena_common::protocol::{encode_census, CensusEntity};
use tankarena_common::Vector2;

use crate::arena::Arena;
use crate::broadphase::{EntityKind, Rect};
use crate::entity::{Input, TankState, CHAT_VISIBLE_TICKS};

/// Side of the square viewport a tank culls its Census/bot-target query
/// against: `dr = 112.5 * fov * 1.6`.
fn viewport_rect(position: Vector2, fov: u8) -> Rect {
    let dr = 112.5 * fov as f32 * 1.6;
    Rect {
        x: position.x - dr / 2.0,
        y: position.y - dr / 2.0,
        w: dr,
        h: dr,
    }
}

/// Bot steering parameters.
const BOT_ENGAGE_RANGE: f32 = 400.0;
const BOT_ACCURACY_THRESHOLD: f32 = 30.0;

pub fn run_all(arena: &mut Arena) {
    let tick = arena.tick;
    let tank_ids: Vec<u32> = arena.tanks.keys().copied().collect();

    for id in tank_ids {
        let Some((position, fov, is_remote)) = arena
            .tanks
            .get(&id)
            .filter(|t| t.state == TankState::Alive)
            .map(|t| (t.base.position, t.fov, t.is_remote()))
        else {
            continue;
        };

        let rect = viewport_rect(position, fov);
        let candidates = arena.broadphase.query(&rect);
        // The broadphase may over-report; re-check each candidate's stored
        // rectangle against the viewport.
        let visible: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.rect.overlaps(&rect))
            .collect();

        if is_remote {
            let mut entities = Vec::with_capacity(visible.len());
            for candidate in &visible {
                match candidate.kind {
                    EntityKind::Tank => {
                        if let Some(t) = arena.tanks.get(&candidate.id) {
                            if t.state != TankState::Alive {
                                continue;
                            }
                            let chat = match &t.chat {
                                Some(msg) if tick.saturating_sub(msg.tick) <= CHAT_VISIBLE_TICKS => {
                                    msg.content.clone()
                                }
                                _ => String::new(),
                            };
                            entities.push(CensusEntity::Tank {
                                id: t.base.id,
                                x: t.base.position.x as i16,
                                y: t.base.position.y as i16,
                                rotation: t.base.rotation,
                                vx: t.base.velocity.x as i16,
                                vy: t.base.velocity.y as i16,
                                mockup: t.mockup.min(u8::MAX as usize) as u8,
                                health_frac: if t.base.max_health > 0.0 {
                                    t.base.health / t.base.max_health
                                } else {
                                    0.0
                                },
                                radius: t.base.radius as u16,
                                name: t.name.clone(),
                                chat,
                            });
                        }
                    }
                    EntityKind::Shape => {
                        if let Some(s) = arena.shapes.get(&candidate.id) {
                            entities.push(CensusEntity::Shape {
                                id: s.base.id,
                                x: s.base.position.x as i16,
                                y: s.base.position.y as i16,
                                health_frac: if s.base.max_health > 0.0 {
                                    s.base.health / s.base.max_health
                                } else {
                                    0.0
                                },
                                radius: s.base.radius as u16,
                            });
                        }
                    }
                    EntityKind::Bullet => {
                        if let Some(b) = arena.bullets.get(&candidate.id) {
                            entities.push(CensusEntity::Bullet {
                                id: b.base.id,
                                x: b.base.position.x as i16,
                                y: b.base.position.y as i16,
                                radius: b.base.radius as u16,
                                vx: b.base.velocity.x as i16,
                                vy: b.base.velocity.y as i16,
                                owner: b.owner,
                            });
                        }
                    }
                }
            }

            let (level, client) = match arena.tanks.get(&id) {
                Some(t) => (t.level, t.client.clone()),
                None => continue,
            };
            if let Some(client) = client {
                let packet = encode_census(&entities, arena.size as u16, level);
                client.send(packet);
            }
        } else if tick % 2 == 0 {
            run_bot(arena, id, position, &visible);
        }
    }
}

fn run_bot(
    arena: &mut Arena,
    id: u32,
    position: Vector2,
    visible: &[crate::broadphase::BroadphaseEntity],
) {
    let mut nearest_tank: Option<(u32, f32, Vector2)> = None;
    let mut nearest_shape: Option<(u32, f32, Vector2)> = None;

    for candidate in visible {
        if candidate.id == id {
            continue;
        }
        match candidate.kind {
            EntityKind::Tank => {
                if let Some(t) = arena.tanks.get(&candidate.id) {
                    if t.state != TankState::Alive {
                        continue;
                    }
                    let dist = position.distance(t.base.position);
                    if nearest_tank.map_or(true, |(_, best, _)| dist < best) {
                        nearest_tank = Some((candidate.id, dist, t.base.position));
                    }
                }
            }
            EntityKind::Shape => {
                if let Some(s) = arena.shapes.get(&candidate.id) {
                    let dist = position.distance(s.base.position);
                    if nearest_shape.map_or(true, |(_, best, _)| dist < best) {
                        nearest_shape = Some((candidate.id, dist, s.base.position));
                    }
                }
            }
            EntityKind::Bullet => {}
        }
    }

    // Tanks are preferred over shapes.
    let target = nearest_tank.or(nearest_shape);

    let Some(tank) = arena.tanks.get_mut(&id) else {
        return;
    };

    let Some((_, distance, target_pos)) = target else {
        tank.input = Input::default();
        return;
    };

    let mut input = Input {
        mousedown: true,
        mouse_pos: target_pos,
        ..Input::default()
    };

    let to_target = target_pos - position;
    tank.base.rotation = to_target.angle();

    if distance > BOT_ENGAGE_RANGE + tank.base.radius {
        let dx = position.x - target_pos.x;
        let dy = position.y - target_pos.y;
        if dx > BOT_ACCURACY_THRESHOLD {
            input.a = true;
        } else if -dx > BOT_ACCURACY_THRESHOLD {
            input.d = true;
        }
        if dy > BOT_ACCURACY_THRESHOLD {
            input.w = true;
        } else if -dy > BOT_ACCURACY_THRESHOLD {
            input.s = true;
        }
    }

    tank.input = input;
}
