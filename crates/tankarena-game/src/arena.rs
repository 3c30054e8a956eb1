//! Arena data model and the id allocator it shares with every other arena
//! in the process: an owned registry passed through construction, rather
//! than a mutable global.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tankarena_common::Vector2;
use tracing::warn;

use crate::broadphase::Grid;
use crate::entity::{Bullet, EntityId, Shape, Tank};

/// Nominal tick rate.
pub const TARGET_TPS: u32 = 30;
/// Divisor used to size broadphase cells from arena dimensions.
pub const BROADPHASE_MAGIC: f32 = 10.0;
/// Knockback impulse multiplier.
pub const COLLISION_STRENGTH: f32 = 5.0;
/// Leaderboard broadcast cadence, in ticks.
pub const LEADERBOARD_INTERVAL: u64 = 15;
/// Shape population hysteresis band.
pub const SHAPE_TARGET_HYSTERESIS: i64 = 12;

/// Process-wide, monotonically increasing entity id counter shared by every
/// `Arena`. Wraparound risks two live entities sharing an id, so this logs
/// when it gets close rather than silently wrapping.
#[derive(Clone)]
pub struct EntityIdAllocator {
    next: Arc<AtomicU32>,
}

impl EntityIdAllocator {
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU32::new(1)),
        }
    }

    pub fn alloc(&self) -> EntityId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        if id == u32::MAX {
            warn!(bruh = true, "entity id counter is about to wrap around");
        }
        id
    }
}

impl Default for EntityIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rolling window of recent per-tick `delta`s, averaged for use by reload
/// timers.
pub struct DeltaHistory {
    samples: VecDeque<f32>,
    capacity: usize,
    sum: f32,
}

impl DeltaHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    pub fn push(&mut self, delta: f32) {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(delta);
        self.sum += delta;
    }

    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            1.0
        } else {
            self.sum / self.samples.len() as f32
        }
    }
}

/// One bounded 2D world: the population of shapes/tanks/bullets, the
/// broadphase index over them, and a monotonic tick counter.
pub struct Arena {
    pub path: String,
    pub tanks: HashMap<EntityId, Tank>,
    pub shapes: HashMap<EntityId, Shape>,
    pub bullets: HashMap<EntityId, Bullet>,
    pub broadphase: Grid,
    pub tick: u64,
    pub size: f32,
    pub target_bot_count: usize,
    pub(crate) ids: EntityIdAllocator,
    pub(crate) delta_history: DeltaHistory,
    pub(crate) avg_delta: f32,
}

impl Arena {
    pub fn new(path: impl Into<String>, ids: EntityIdAllocator, target_bot_count: usize) -> Self {
        let size = arena_size(0);
        Self {
            path: path.into(),
            tanks: HashMap::new(),
            shapes: HashMap::new(),
            bullets: HashMap::new(),
            broadphase: Grid::new(size, size, BROADPHASE_MAGIC),
            tick: 0,
            size,
            target_bot_count,
            ids,
            delta_history: DeltaHistory::new(TARGET_TPS as usize),
            avg_delta: 1.0,
        }
    }

    pub fn alloc_id(&self) -> EntityId {
        self.ids.alloc()
    }

    /// `target = floor(size^2 / 700_000)`.
    pub fn shape_target(&self) -> usize {
        ((self.size * self.size) / 700_000.0).floor().max(0.0) as usize
    }

    /// Recomputed whenever tank count changes. Rebuilding the broadphase on
    /// resize would drop every live record, so this only resizes the
    /// stored dimension and lets cell math adapt on next query — the
    /// grid's cell size stays fixed at construction.
    pub fn recompute_size(&mut self) {
        self.size = arena_size(self.tanks.len());
    }

    pub fn record_delta(&mut self, delta: f32) {
        self.delta_history.push(delta);
        self.avg_delta = self.delta_history.average();
    }

    pub fn avg_delta(&self) -> f32 {
        self.avg_delta.max(f32::EPSILON)
    }

    pub fn random_position(&self) -> Vector2 {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Vector2::new(
            rng.gen_range(0.0..=self.size),
            rng.gen_range(0.0..=self.size),
        )
    }
}

/// `S = 1000 * |tanks| + 5000`.
pub fn arena_size(tank_count: usize) -> f32 {
    1000.0 * tank_count as f32 + 5000.0
}
