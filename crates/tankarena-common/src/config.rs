//! Tank config registry: a process-wide mapping from mockup index to tank
//! definition, hot-reloadable from `entityconfig.json`.
//!
//! Reading the file and watching it for changes is an external
//! collaborator; this module only owns the parsed shape and the registry
//! readers consult every tick. The loader in `tankarena-server` is what
//! actually touches the filesystem.
//!
//! Hot reload is a versioned copy-on-write swap (`arc_swap::ArcSwap`)
//! rather than a clear-then-repopulate pattern, so every reader sees
//! either the whole old table or the whole new one, never an empty
//! window.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;

/// One barrel's static configuration. Runtime reload state
/// (`cooling_down`, `target_time`) lives on the live `Tank`/`Barrel`
/// instance in `tankarena-game`, not here — this struct is pure config.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BarrelConfig {
    pub angle: f32,
    pub width: f32,
    pub length: f32,
    pub full_reload: f32,
    pub reload_delay: f32,
    pub recoil: f32,
    pub bullet_speed: f32,
    pub bullet_damage: f32,
    pub bullet_penetration: f32,
}

/// A named mockup: FOV and barrel layout, indexed by position in the
/// `entityconfig.json` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TankConfig {
    pub name: String,
    pub fov: u8,
    pub barrels: Vec<BarrelConfig>,
}

/// The full on-disk shape of `entityconfig.json`: a flat array of mockups.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct TankConfigFile {
    pub tanks: Vec<TankConfig>,
}

/// Process-wide, hot-reloadable mockup table. Cloning the handle is cheap
/// (it clones an `Arc` to the swap point); every tick and every
/// `InboundInit`/reload consults it without taking a lock.
#[derive(Clone)]
pub struct TankConfigRegistry {
    current: Arc<ArcSwap<Vec<TankConfig>>>,
}

impl TankConfigRegistry {
    pub fn new(initial: Vec<TankConfig>) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Atomically replace the whole table. Readers mid-tick keep seeing
    /// their snapshot of the old table until they re-load (i.e. the next
    /// `get`/`snapshot` call), never a partially-populated one.
    pub fn reload(&self, tanks: Vec<TankConfig>) {
        self.current.store(Arc::new(tanks));
    }

    /// A consistent snapshot of the whole table, for iterating (e.g. to
    /// build an `OutboundInit`'s mockup list).
    pub fn snapshot(&self) -> Arc<Vec<TankConfig>> {
        self.current.load_full()
    }

    pub fn get(&self, mockup: usize) -> Option<Arc<TankConfig>> {
        let table = self.current.load_full();
        if mockup < table.len() {
            Some(Arc::new(table[mockup].clone()))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
