//! The packet catalog. Pure encode/decode functions over the wire codec —
//! no socket, no framing concern (that belongs to the WebSocket layer).
//! `tankarena-game` calls the `encode_*` builders to assemble outbound
//! packets; `tankarena-server` calls the `decode_*` helpers while
//! dispatching inbound ones.

use crate::codec::{ByteReader, ByteWriter};
use crate::config::TankConfig;
use crate::error::CodecError;

/// Inbound (client → server) packet tags.
pub mod inbound_tag {
    pub const INIT: u8 = 0;
    pub const INPUT: u8 = 1;
    pub const CHAT: u8 = 4;
    pub const RESPAWN: u8 = 6;
}

/// Outbound (server → client) packet tags.
pub mod outbound_tag {
    pub const CENSUS: u8 = 2;
    pub const INIT: u8 = 3;
    pub const CHAT: u8 = 4;
    pub const DEATH: u8 = 5;
    pub const LEADERBOARD: u8 = 7;
}

bitflags::bitflags! {
    /// Bitfield layout of an `Input` packet's first byte.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct InputBits: u8 {
        const W         = 0b1_0000;
        const A         = 0b0_1000;
        const S         = 0b0_0100;
        const D         = 0b0_0010;
        const MOUSEDOWN = 0b0_0001;
    }
}

/// One entry of a Census packet's entity list. Plain data, so this crate
/// doesn't need to know about `Tank`/`Shape`/`Bullet` — the caller in
/// `tankarena-game` fills these in from the live entity state.
pub enum CensusEntity {
    Tank {
        id: u32,
        x: i16,
        y: i16,
        rotation: f32,
        vx: i16,
        vy: i16,
        mockup: u8,
        health_frac: f32,
        radius: u16,
        name: String,
        chat: String,
    },
    Shape {
        id: u32,
        x: i16,
        y: i16,
        health_frac: f32,
        radius: u16,
    },
    Bullet {
        id: u32,
        x: i16,
        y: i16,
        radius: u16,
        vx: i16,
        vy: i16,
        owner: u32,
    },
}

impl CensusEntity {
    fn encode(&self, w: &mut ByteWriter) {
        match self {
            CensusEntity::Tank {
                id,
                x,
                y,
                rotation,
                vx,
                vy,
                mockup,
                health_frac,
                radius,
                name,
                chat,
            } => {
                w.write_u8(0)
                    .write_u32(*id)
                    .write_i16(*x)
                    .write_i16(*y)
                    .write_f32(*rotation)
                    .write_i16(*vx)
                    .write_i16(*vy)
                    .write_u8(*mockup)
                    .write_f32(*health_frac)
                    .write_u16(*radius)
                    .write_string(name)
                    .write_string(chat);
            }
            CensusEntity::Shape {
                id,
                x,
                y,
                health_frac,
                radius,
            } => {
                w.write_u8(1)
                    .write_u32(*id)
                    .write_i16(*x)
                    .write_i16(*y)
                    .write_f32(*health_frac)
                    .write_u16(*radius);
            }
            CensusEntity::Bullet {
                id,
                x,
                y,
                radius,
                vx,
                vy,
                owner,
            } => {
                w.write_u8(2)
                    .write_u32(*id)
                    .write_i16(*x)
                    .write_i16(*y)
                    .write_u16(*radius)
                    .write_i16(*vx)
                    .write_i16(*vy)
                    .write_u32(*owner);
            }
        }
    }
}

/// Census: per-tick visibility packet.
pub fn encode_census(entities: &[CensusEntity], arena_size: u16, self_level: f32) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(64 + entities.len() * 32);
    w.write_u8(outbound_tag::CENSUS);
    w.write_u16(entities.len() as u16);
    for e in entities {
        e.encode(&mut w);
    }
    w.write_u16(arena_size);
    w.write_f32(self_level);
    w.into_bytes()
}

/// OutboundInit: assigns the joining player their id and the current mockup
/// list. Re-sent verbatim on config hot reload.
pub fn encode_outbound_init(player_id: u32, mockups: &[TankConfig]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u8(outbound_tag::INIT);
    w.write_u32(player_id);
    w.write_u8(mockups.len().min(u8::MAX as usize) as u8);
    for mockup in mockups {
        w.write_string(&mockup.name);
        w.write_u8(mockup.fov);
        w.write_u8(mockup.barrels.len().min(u8::MAX as usize) as u8);
        for barrel in &mockup.barrels {
            w.write_f32(barrel.width).write_f32(barrel.length).write_f32(barrel.angle);
        }
    }
    w.into_bytes()
}

pub fn encode_chat(content: &str) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u8(outbound_tag::CHAT);
    w.write_string(content);
    w.into_bytes()
}

pub fn encode_death(seconds_alive: f64) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.write_u8(outbound_tag::DEATH);
    w.write_f64(seconds_alive);
    w.into_bytes()
}

/// Leaderboard entry: `(name, level, mockup)`.
pub fn encode_leaderboard(entries: &[(String, f32, u8)]) -> Vec<u8> {
    let n = entries.len().min(10);
    let mut w = ByteWriter::new();
    w.write_u8(outbound_tag::LEADERBOARD);
    w.write_u8(n as u8);
    for (name, level, mockup) in &entries[..n] {
        w.write_string(name).write_f32(*level).write_u8(*mockup);
    }
    w.into_bytes()
}

/// Decodes an `InboundInit` body (`string name`).
pub fn decode_init(body: &[u8]) -> Result<String, CodecError> {
    ByteReader::new(body).read_string()
}

/// Decodes an `Input` body: `u8 bits, i16 mouseX, i16 mouseY`. Callers must
/// check `body.len() == 6` themselves — this function only cares that the
/// fixed fields are present, not that nothing trails them.
pub fn decode_input(body: &[u8]) -> Result<(InputBits, i16, i16), CodecError> {
    let mut r = ByteReader::new(body);
    let bits = InputBits::from_bits_truncate(r.read_u8()?);
    let mouse_x = r.read_i16()?;
    let mouse_y = r.read_i16()?;
    Ok((bits, mouse_x, mouse_y))
}

/// Decodes a `Chat` body (`string content`).
pub fn decode_chat(body: &[u8]) -> Result<String, CodecError> {
    ByteReader::new(body).read_string()
}
