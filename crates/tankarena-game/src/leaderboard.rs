//! Leaderboard broadcast: every 15 ticks, the top 10 alive tanks by level,
//! broadcast to every Remote tank in the arena.

use tankarena_common::protocol::encode_leaderboard;

use crate::arena::{Arena, LEADERBOARD_INTERVAL};
use crate::entity::TankState;

pub fn maybe_broadcast(arena: &Arena) {
    if arena.tick % LEADERBOARD_INTERVAL != 0 {
        return;
    }

    let mut alive: Vec<_> = arena
        .tanks
        .values()
        .filter(|t| t.state == TankState::Alive)
        .collect();
    alive.sort_by(|a, b| b.level.partial_cmp(&a.level).unwrap_or(std::cmp::Ordering::Equal));

    // Guard `min(|alive|, 10)` explicitly rather than slicing past the end
    // when fewer than 10 tanks exist.
    let top = alive.len().min(10);
    let entries: Vec<(String, f32, u8)> = alive[..top]
        .iter()
        .map(|t| (t.name.clone(), t.level, t.mockup.min(u8::MAX as usize) as u8))
        .collect();

    let packet = encode_leaderboard(&entries);
    for tank in arena.tanks.values() {
        if let Some(client) = &tank.client {
            client.send(packet.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::EntityIdAllocator;
    use crate::client::test_support::RecordingClient;
    use crate::entity::{tank_radius_for_level, Barrel, EntityBase, Input, Tank, TankType, TANK_FRICTION};
    use std::sync::Arc;
    use tankarena_common::Vector2;

    fn spawn(arena: &mut Arena, level: f32, name: &str) -> Arc<RecordingClient> {
        let id = arena.alloc_id();
        let client = Arc::new(RecordingClient::default());
        arena.tanks.insert(
            id,
            Tank {
                base: EntityBase {
                    id,
                    position: Vector2::ZERO,
                    velocity: Vector2::ZERO,
                    rotation: 0.0,
                    radius: tank_radius_for_level(level),
                    max_health: 100.0,
                    health: 100.0,
                    damage: 0.0,
                    mass: 1.0,
                    friction: TANK_FRICTION,
                },
                kind: TankType::Remote,
                state: TankState::Alive,
                input: Input::default(),
                chat: None,
                level,
                mockup: 0,
                fov: 1,
                barrels: vec![Barrel::new(tankarena_common::config::BarrelConfig {
                    angle: 0.0,
                    width: 1.0,
                    length: 1.0,
                    full_reload: 1.0,
                    reload_delay: 1.0,
                    recoil: 1.0,
                    bullet_speed: 1.0,
                    bullet_damage: 1.0,
                    bullet_penetration: 1.0,
                })],
                name: name.to_string(),
                client: Some(client.clone()),
                spawn_time: None,
            },
        );
        client
    }

    #[test]
    fn broadcasts_only_on_the_interval() {
        let mut arena = Arena::new("/t", EntityIdAllocator::new(), 0);
        let client = spawn(&mut arena, 3.0, "Alice");
        arena.tick = 1;
        maybe_broadcast(&arena);
        assert!(client.sent.lock().unwrap().is_empty());

        arena.tick = 15;
        maybe_broadcast(&arena);
        assert_eq!(client.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn caps_at_ten_entries_with_fewer_than_ten_tanks() {
        let mut arena = Arena::new("/t", EntityIdAllocator::new(), 0);
        for i in 0..3 {
            spawn(&mut arena, i as f32, &format!("p{i}"));
        }
        arena.tick = 0;
        // Should not panic even though fewer than 10 tanks exist.
        maybe_broadcast(&arena);
    }
}
