//! Map from path → Arena, plus per-tank admission. A name-indexed registry
//! keyed by arena path, holding a `parking_lot::Mutex<Arena>` per entry so
//! the scheduler can tick one arena while another is being mutated by
//! dispatch on the same thread without a single process-wide lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use tankarena_game::{Arena, EntityIdAllocator};

/// One registered arena plus the knobs it was created with.
pub struct ArenaSlot {
    pub arena: Mutex<Arena>,
}

/// Process-wide map from path to arena, one Arena per path. The id
/// allocator is shared across every arena in the registry: entity ids are
/// drawn from a monotonically increasing 32-bit unsigned counter shared
/// across all arenas.
pub struct ArenaRegistry {
    ids: EntityIdAllocator,
    arenas: RwLock<HashMap<String, Arc<ArenaSlot>>>,
}

impl ArenaRegistry {
    pub fn new() -> Self {
        Self {
            ids: EntityIdAllocator::new(),
            arenas: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new arena at `path` with the given bot population target.
    /// A path is registered once at startup, one arena per configured game
    /// mode; re-registering an existing path replaces it.
    pub fn register(&self, path: impl Into<String>, target_bot_count: usize) -> Arc<ArenaSlot> {
        let path = path.into();
        let arena = Arena::new(path.clone(), self.ids.clone(), target_bot_count);
        let slot = Arc::new(ArenaSlot {
            arena: Mutex::new(arena),
        });
        self.arenas.write().insert(path, slot.clone());
        slot
    }

    pub fn get(&self, path: &str) -> Option<Arc<ArenaSlot>> {
        self.arenas.read().get(path).cloned()
    }

    pub fn remove(&self, path: &str) -> Option<Arc<ArenaSlot>> {
        self.arenas.write().remove(path)
    }

    /// The full set of registered paths, for the `/serverinfo` HTTP surface.
    pub fn paths(&self) -> Vec<String> {
        self.arenas.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.arenas.read().len()
    }
}

impl Default for ArenaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
