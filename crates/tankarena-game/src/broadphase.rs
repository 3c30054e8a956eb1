//! Broadphase spatial index. A uniform grid sized from the arena
//! dimensions at construction via a "magic number" cell-size divisor
//! (`cell = max(width, height) / magic`), giving O(1) amortized
//! insert/mutate and an output-proportional query directly, without the
//! complexity of a BSP or tree structure.

use std::collections::{HashMap, HashSet};

use tankarena_common::Vector2;

/// Which live map an entity id should be looked up in. Lets the collision
/// pass downcast a broadphase hit back to a concrete `Tank`/`Shape`/`Bullet`
/// without the index itself knowing about those types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Tank,
    Shape,
    Bullet,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn from_circle(center: Vector2, radius: f32) -> Self {
        Self {
            x: center.x - radius,
            y: center.y - radius,
            w: 2.0 * radius,
            h: 2.0 * radius,
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    fn min_x(&self) -> f32 {
        self.x
    }
    fn max_x(&self) -> f32 {
        self.x + self.w
    }
    fn min_y(&self) -> f32 {
        self.y
    }
    fn max_y(&self) -> f32 {
        self.y + self.h
    }
}

/// A broadphase record: an id's bounding rectangle plus its radius, kept
/// for collision convenience — the index itself only uses the rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroadphaseEntity {
    pub id: u32,
    pub kind: EntityKind,
    pub rect: Rect,
    pub radius: f32,
}

type CellCoord = (i32, i32);

/// Uniform-grid broadphase index.
pub struct Grid {
    cell_size: f32,
    by_id: HashMap<u32, BroadphaseEntity>,
    cells: HashMap<CellCoord, Vec<u32>>,
}

impl Grid {
    /// `magic` is the cell-size divisor: larger values give smaller,
    /// denser cells. 10 keeps cells comfortably larger than a tank/shape
    /// radius across the arena sizes this produces.
    pub fn new(world_width: f32, world_height: f32, magic: f32) -> Self {
        let cell_size = (world_width.max(world_height) / magic).max(1.0);
        Self {
            cell_size,
            by_id: HashMap::new(),
            cells: HashMap::new(),
        }
    }

    fn cell_of(&self, x: f32, y: f32) -> CellCoord {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    fn cells_for(&self, rect: &Rect) -> impl Iterator<Item = CellCoord> {
        let (min_cx, min_cy) = self.cell_of(rect.min_x(), rect.min_y());
        let (max_cx, max_cy) = self.cell_of(rect.max_x(), rect.max_y());
        (min_cx..=max_cx).flat_map(move |cx| (min_cy..=max_cy).map(move |cy| (cx, cy)))
    }

    fn unlink(&mut self, entry: &BroadphaseEntity) {
        for coord in self.cells_for(&entry.rect) {
            if let Some(bucket) = self.cells.get_mut(&coord) {
                bucket.retain(|&id| id != entry.id);
                if bucket.is_empty() {
                    self.cells.remove(&coord);
                }
            }
        }
    }

    fn link(&mut self, entry: &BroadphaseEntity) {
        for coord in self.cells_for(&entry.rect) {
            self.cells.entry(coord).or_default().push(entry.id);
        }
    }

    /// Add or overwrite by id.
    pub fn insert(&mut self, entry: BroadphaseEntity) {
        if let Some(old) = self.by_id.remove(&entry.id) {
            self.unlink(&old);
        }
        self.link(&entry);
        self.by_id.insert(entry.id, entry);
    }

    /// Update geometry for an existing id; a no-op when the rectangle is
    /// unchanged.
    pub fn mutate(&mut self, entry: BroadphaseEntity) {
        if let Some(old) = self.by_id.get(&entry.id) {
            if *old == entry {
                return;
            }
        }
        self.insert(entry);
    }

    /// Remove by id; returns whether it was present.
    pub fn delete(&mut self, id: u32) -> bool {
        match self.by_id.remove(&id) {
            Some(old) => {
                self.unlink(&old);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.cells.clear();
    }

    /// Every entity whose bounding rectangle overlaps `rect`. May over-report
    /// (an entity spanning multiple cells is deduplicated here, but a
    /// caller-side AABB re-check is still expected) but never omits an
    /// overlapping entity.
    pub fn query(&self, rect: &Rect) -> Vec<BroadphaseEntity> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for coord in self.cells_for(rect) {
            if let Some(bucket) = self.cells.get(&coord) {
                for &id in bucket {
                    if seen.insert(id) {
                        if let Some(entry) = self.by_id.get(&id) {
                            out.push(*entry);
                        }
                    }
                }
            }
        }
        out
    }

    pub fn get(&self, id: u32) -> Option<BroadphaseEntity> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Diagnostic-only size estimate; not used for correctness.
    pub fn memory_usage(&self) -> usize {
        let entity_bytes = self.by_id.len() * std::mem::size_of::<BroadphaseEntity>();
        let cell_bytes: usize = self
            .cells
            .values()
            .map(|v| v.len() * std::mem::size_of::<u32>())
            .sum();
        entity_bytes + cell_bytes
    }
}
