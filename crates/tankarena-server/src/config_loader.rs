//! Reads `entityconfig.json` into the tank config registry and watches it
//! for hot reload. The JSON parsing is a thin `serde_json` layer; the
//! filesystem watch plumbing re-triggers a reload from a `notify` event
//! rather than an operator-issued command.

use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use tracing::{error, info, warn};

use tankarena_common::config::{ConfigError, TankConfig, TankConfigFile, TankConfigRegistry};

/// Parses `entityconfig.json`'s on-disk shape: a flat array of mockups,
/// each with all nine `BarrelConfig` fields per barrel.
pub fn load_tank_config(path: &Path) -> Result<Vec<TankConfig>, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let tanks: Vec<TankConfig> = serde_json::from_slice::<TankConfigFile>(&bytes)?.tanks;
    if tanks.is_empty() {
        return Err(ConfigError::Empty);
    }
    Ok(tanks)
}

/// Spawns a background thread that watches `path` and reloads `registry` on
/// every filesystem event. A failed reload logs and retains the previous
/// config — the registry is simply left untouched.
///
/// Returns the `notify` watcher; dropping it stops the watch.
pub fn watch_for_reload(
    path: impl Into<PathBuf>,
    registry: TankConfigRegistry,
    mut on_reload: impl FnMut() + Send + 'static,
) -> notify::Result<notify::RecommendedWatcher> {
    let path = path.into();
    let (tx, rx) = channel();

    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;

    std::thread::spawn(move || {
        for event in rx {
            match event {
                Ok(_) => match load_tank_config(&path) {
                    Ok(tanks) => {
                        info!(path = %path.display(), count = tanks.len(), "reloaded tank config");
                        registry.reload(tanks);
                        on_reload();
                    }
                    Err(err) => {
                        error!(path = %path.display(), error = %err, "config reload failed, keeping previous config");
                    }
                },
                Err(err) => warn!(error = %err, "config watcher error"),
            }
        }
    });

    Ok(watcher)
}

/// Blocks the calling thread for a short settle period after a filesystem
/// event before re-reading the file — some editors/atomic-save strategies
/// emit a remove+create pair in quick succession. Not used by the watcher
/// thread above directly (a single `notify` event is already debounced by
/// the OS in the common case); kept as a small helper for callers that want
/// to coalesce bursts explicitly.
pub fn settle_delay() -> Duration {
    Duration::from_millis(50)
}
