//! Per-connection protocol dispatch: the state machine that turns an
//! already-framed binary payload into arena mutations, dispatching on a
//! per-tag basis against the tank arena's inbound packet catalog.
//!
//! The WebSocket/TCP framing library lives elsewhere: this module only ever
//! sees an already-decoded `(is_binary, payload)` pair per frame.

use std::sync::Arc;

use tracing::warn;

use tankarena_common::protocol::{decode_chat, decode_init, decode_input, inbound_tag, InputBits};
use tankarena_game::client::ClientHandle;
use tankarena_game::entity::{EntityId, TankState};
use tankarena_game::{lifecycle, Arena};
use tankarena_common::config::TankConfigRegistry;
use tankarena_common::protocol::encode_outbound_init;

use crate::arena_registry::ArenaRegistry;

/// WebSocket close code sent to a banned/kicked client. Picked from the
/// same private-use range as `client::CLOSE_ARENA_TEARDOWN` rather than
/// reusing a standard code.
pub const BAN_CLOSE_CODE: u16 = 4003;

/// Per-connection state. Exactly one of these exists per connection, owned
/// by the transport layer; `dispatch` only borrows it.
#[derive(Debug, Default, Clone)]
pub struct ClientInfo {
    pub path: String,
    pub ip: String,
    pub id: Option<EntityId>,
    pub authenticated: bool,
}

/// What the transport layer should do after a frame was handled.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing further required; the connection stays open.
    Continue,
    /// The precondition/tag was invalid: ban the client's IP and close the
    /// connection.
    Ban,
}

/// Entry point: validates framing, then dispatches on the first byte.
pub fn handle_frame(
    arena: &mut Arena,
    client_info: &mut ClientInfo,
    client: &Arc<dyn ClientHandle>,
    config: &TankConfigRegistry,
    is_binary: bool,
    frame: &[u8],
) -> DispatchOutcome {
    if !is_binary || frame.is_empty() {
        warn!("non-binary or zero-length frame");
        return DispatchOutcome::Ban;
    }

    let tag = frame[0];
    let body = &frame[1..];

    match tag {
        inbound_tag::INIT => handle_init(arena, client_info, client, config, frame.len(), body),
        inbound_tag::INPUT => handle_input(arena, client_info, frame.len(), body),
        inbound_tag::CHAT => handle_chat(arena, client_info, frame.len(), body),
        inbound_tag::RESPAWN => handle_respawn(arena, client_info, frame.len()),
        _ => {
            warn!(tag, "unknown packet tag");
            DispatchOutcome::Ban
        }
    }
}

/// Clamps `s` to at most `max_bytes` bytes. Byte-length, not codepoint
/// count: this slices on a byte boundary that may land mid-codepoint for
/// non-ASCII input rather than walking `char_indices` to stay
/// codepoint-safe.
fn truncate_bytes(s: &str, max_bytes: usize, ellipsis: bool) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    if ellipsis && max_bytes > 3 {
        let mut cut = max_bytes - 3;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &s[..cut])
    } else {
        let mut cut = max_bytes;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s[..cut].to_string()
    }
}

const NAME_MAX_BYTES: usize = 14;
const CHAT_MAX_BYTES: usize = 100;

fn handle_init(
    arena: &mut Arena,
    client_info: &mut ClientInfo,
    client: &Arc<dyn ClientHandle>,
    config: &TankConfigRegistry,
    frame_len: usize,
    body: &[u8],
) -> DispatchOutcome {
    if client_info.authenticated {
        warn!("authenticated client re-sent init");
        return DispatchOutcome::Ban;
    }
    if frame_len < 3 {
        warn!(frame_len, "init frame too short");
        return DispatchOutcome::Ban;
    }

    let Ok(raw_name) = decode_init(body) else {
        warn!("malformed init packet");
        return DispatchOutcome::Ban;
    };

    let name = if raw_name.is_empty() {
        "Unnamed".to_string()
    } else {
        truncate_bytes(&raw_name, NAME_MAX_BYTES, false)
    };

    let snapshot = config.snapshot();
    if snapshot.is_empty() {
        warn!("no tank mockups configured, refusing join");
        return DispatchOutcome::Ban;
    }
    let mockup_index = rand::random::<usize>() % snapshot.len();
    let mockup = &snapshot[mockup_index];

    let id = lifecycle::join_tank(
        arena,
        tankarena_game::entity::TankType::Remote,
        name,
        mockup_index,
        mockup,
        Some(client.clone()),
    );

    client_info.authenticated = true;
    client_info.id = Some(id);

    client.send(encode_outbound_init(id, &snapshot));
    DispatchOutcome::Continue
}

fn handle_input(
    arena: &mut Arena,
    client_info: &mut ClientInfo,
    frame_len: usize,
    body: &[u8],
) -> DispatchOutcome {
    let Some(id) = authenticated_tank(client_info) else {
        return DispatchOutcome::Ban;
    };
    if frame_len != 6 {
        warn!(frame_len, "input frame has wrong length");
        return DispatchOutcome::Ban;
    }
    let Some(tank) = arena.tanks.get_mut(&id) else {
        return DispatchOutcome::Ban;
    };
    if tank.state != TankState::Alive {
        warn!(id, "dead tank sent input, ignoring");
        return DispatchOutcome::Continue;
    }

    let Ok((bits, mouse_x, mouse_y)) = decode_input(body) else {
        warn!("malformed input packet");
        return DispatchOutcome::Ban;
    };

    tank.input.w = bits.contains(InputBits::W);
    tank.input.a = bits.contains(InputBits::A);
    tank.input.s = bits.contains(InputBits::S);
    tank.input.d = bits.contains(InputBits::D);
    tank.input.mousedown = bits.contains(InputBits::MOUSEDOWN);
    tank.input.mouse_pos = tankarena_common::Vector2::new(mouse_x as f32, mouse_y as f32);

    let to_mouse = tank.input.mouse_pos - tank.base.position;
    if to_mouse.length_squared() > f32::EPSILON {
        tank.base.rotation = to_mouse.angle();
    }

    DispatchOutcome::Continue
}

fn handle_chat(
    arena: &mut Arena,
    client_info: &mut ClientInfo,
    frame_len: usize,
    body: &[u8],
) -> DispatchOutcome {
    let Some(id) = authenticated_tank(client_info) else {
        return DispatchOutcome::Ban;
    };
    if frame_len < 3 {
        warn!(frame_len, "chat frame too short");
        return DispatchOutcome::Ban;
    }
    let Some(tank) = arena.tanks.get_mut(&id) else {
        return DispatchOutcome::Ban;
    };
    if tank.state != TankState::Alive {
        warn!(id, "dead tank sent chat, ignoring");
        return DispatchOutcome::Continue;
    }

    let Ok(content) = decode_chat(body) else {
        warn!("malformed chat packet, banning");
        return DispatchOutcome::Ban;
    };

    let tank = arena.tanks.get_mut(&id).expect("checked above");
    if content.is_empty() {
        tank.chat = None;
    } else {
        tank.chat = Some(tankarena_game::entity::ChatMessage {
            content: truncate_bytes(&content, CHAT_MAX_BYTES, true),
            tick: arena.tick,
        });
    }
    DispatchOutcome::Continue
}

fn handle_respawn(arena: &mut Arena, client_info: &mut ClientInfo, frame_len: usize) -> DispatchOutcome {
    let Some(id) = authenticated_tank(client_info) else {
        return DispatchOutcome::Ban;
    };
    if frame_len != 1 {
        warn!(frame_len, "respawn frame has unexpected length");
        return DispatchOutcome::Ban;
    }
    let Some(tank) = arena.tanks.get(&id) else {
        return DispatchOutcome::Ban;
    };
    if tank.state == TankState::Alive {
        warn!(id, "living tank sent respawn, banning");
        return DispatchOutcome::Ban;
    }

    lifecycle::respawn(arena, id);
    DispatchOutcome::Continue
}

fn authenticated_tank(client_info: &ClientInfo) -> Option<EntityId> {
    if !client_info.authenticated {
        warn!("unauthenticated client sent a packet requiring auth");
        return None;
    }
    client_info.id
}

/// Tears down a connection's tank on a clean disconnect. Also the single
/// place a `Ban` outcome's tank gets cleaned up — the scheduler calls this
/// for both cases so every `Ban` path in this module (malformed frame,
/// wrong tag, bad precondition) gets consistent cleanup without each
/// handler having to remember to call it itself.
pub fn handle_disconnect(arena: &mut Arena, client_info: &ClientInfo) {
    if let Some(id) = client_info.authenticated.then_some(client_info.id).flatten() {
        lifecycle::destroy_tank(arena, id);
    }
}

/// Resends every Remote tank across every arena a fresh `OutboundInit` after
/// a tank config hot reload, rebuilding its barrel list from its current
/// mockup index against the new table. A tank whose mockup index no longer
/// exists in the reloaded config is skipped rather than rebuilt — the
/// `entityconfig.json` file shrinking out from under a connected player is
/// not a case the reference handles either.
pub fn broadcast_reload(registry: &ArenaRegistry, config: &TankConfigRegistry) {
    let snapshot = config.snapshot();
    for path in registry.paths() {
        let Some(slot) = registry.get(&path) else {
            continue;
        };
        let mut arena = slot.arena.lock();
        let tank_ids: Vec<EntityId> = arena.tanks.keys().copied().collect();
        for id in tank_ids {
            let Some(tank) = arena.tanks.get_mut(&id) else {
                continue;
            };
            if !tank.is_remote() {
                continue;
            }
            let Some(mockup) = snapshot.get(tank.mockup) else {
                warn!(id, mockup = tank.mockup, "reloaded config dropped this tank's mockup index");
                continue;
            };
            lifecycle::rebuild_barrels_from_config(tank, mockup);
            if let Some(client) = tank.client.clone() {
                client.send(encode_outbound_init(id, &snapshot));
            }
        }
    }
}
