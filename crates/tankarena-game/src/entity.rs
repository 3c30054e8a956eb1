//! Entity model. Shared fields live in `EntityBase`; each concrete kind
//! (`Shape`, `Bullet`, `Tank`) embeds it rather than using subtype
//! inheritance. The three kinds are kept in separate maps on `Arena` so a
//! broadphase hit's `EntityKind` tag can downcast straight to the right map
//! without a runtime type check.

use std::sync::Arc;
use std::time::Instant;

use tankarena_common::config::BarrelConfig;
use tankarena_common::Vector2;

use crate::client::ClientHandle;

pub type EntityId = u32;

/// Fields every entity kind carries.
#[derive(Debug, Clone, Copy)]
pub struct EntityBase {
    pub id: EntityId,
    pub position: Vector2,
    pub velocity: Vector2,
    pub rotation: f32,
    pub radius: f32,
    pub max_health: f32,
    pub health: f32,
    pub damage: f32,
    pub mass: f32,
    pub friction: f32,
}

impl EntityBase {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// A passive destructible obstacle.
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    pub base: EntityBase,
    /// Level credited to the killing bullet's owner.
    pub reward: f32,
}

pub const SHAPE_RADIUS_MIN: f32 = 85.0;
pub const SHAPE_RADIUS_MAX: f32 = 115.0;
pub const SHAPE_MASS: f32 = 5.0;
pub const SHAPE_DAMAGE: f32 = 20.0;
pub const SHAPE_REWARD: f32 = 0.075;
pub const SHAPE_FRICTION: f32 = 0.9;

impl Shape {
    pub fn spawn(id: EntityId, position: Vector2, radius: f32) -> Self {
        let health = radius; // no separately tracked max_health; health tracks body size
        Self {
            base: EntityBase {
                id,
                position,
                velocity: Vector2::ZERO,
                rotation: 0.0,
                radius,
                max_health: health,
                health,
                damage: SHAPE_DAMAGE,
                mass: SHAPE_MASS,
                friction: SHAPE_FRICTION,
            },
            reward: SHAPE_REWARD,
        }
    }
}

/// A short-lived projectile fired by a tank's barrel.
#[derive(Debug, Clone, Copy)]
pub struct Bullet {
    pub base: EntityBase,
    pub owner: EntityId,
    /// Ticks remaining, decremented by `delta` each tick.
    pub lifetime: f32,
}

pub const BULLET_DEFAULT_LIFETIME: f32 = 50.0;
pub const BULLET_FRICTION: f32 = 1.0;

impl Bullet {
    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0 || self.base.health <= 0.0
    }
}

/// Which feed an Input axis/button came from and whether the tank is
/// human-driven or bot-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankType {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankState {
    Alive,
    Dead,
}

/// Latest input sample, applied by motion and the barrel FSM each tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Input {
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
    pub mousedown: bool,
    pub mouse_pos: Vector2,
}

/// A chat message plus the tick it was received at, used to age it out of
/// the Census packet after 150 ticks.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub content: String,
    pub tick: u64,
}

pub const CHAT_VISIBLE_TICKS: u64 = 150;

/// Barrel target, tracked alongside `cooling_down` as two separate fields
/// rather than one enum, so the FSM in `barrel.rs` reads as a direct
/// transcription of the firing state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrelTargetKind {
    ReloadDelay,
    CoolingDown,
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct BarrelTargetTime {
    pub target: BarrelTargetKind,
    pub time: u64,
}

impl Default for BarrelTargetTime {
    fn default() -> Self {
        Self {
            target: BarrelTargetKind::None,
            time: 0,
        }
    }
}

/// A tank's gun: configuration plus firing-state-machine runtime fields.
#[derive(Debug, Clone)]
pub struct Barrel {
    pub config: BarrelConfig,
    pub cooling_down: bool,
    pub target_time: BarrelTargetTime,
}

impl Barrel {
    pub fn new(config: BarrelConfig) -> Self {
        Self {
            config,
            cooling_down: false,
            target_time: BarrelTargetTime::default(),
        }
    }
}

pub const TANK_MOVEMENT_SPEED: f32 = 4.0;
pub const TANK_FRICTION: f32 = 0.8;
pub const TANK_MASS: f32 = 1.0;
pub const TANK_HEALTH_REGEN_FRACTION: f32 = 0.0013;

/// Radius grows (very slowly) with level, capped at level 100.
pub fn tank_radius_for_level(level: f32) -> f32 {
    50.0 + 0.25 * level.min(100.0)
}

/// A player- or bot-controlled tank.
pub struct Tank {
    pub base: EntityBase,
    pub kind: TankType,
    pub state: TankState,
    pub input: Input,
    pub chat: Option<ChatMessage>,
    pub level: f32,
    pub mockup: usize,
    pub fov: u8,
    pub barrels: Vec<Barrel>,
    pub name: String,
    /// Remote only: the bound connection and join time used for `Death`'s
    /// `seconds_alive`.
    pub client: Option<Arc<dyn ClientHandle>>,
    pub spawn_time: Option<Instant>,
}

impl Tank {
    pub fn max_health_for_level(_level: f32) -> f32 {
        // Max health is constant across levels; level only grows radius
        // and is halved on death.
        100.0
    }

    pub fn is_remote(&self) -> bool {
        self.kind == TankType::Remote
    }

    pub fn regen_health(&mut self) {
        if self.state == TankState::Alive {
            self.base.health = (self.base.health + self.base.max_health * TANK_HEALTH_REGEN_FRACTION)
                .min(self.base.max_health);
        }
    }
}
