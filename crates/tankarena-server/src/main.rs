//! CLI entrypoint: single positional port argument, exit 1 on missing
//! argument or bind failure. Parses arguments, loads config, then enters
//! the main loop — no windowing/rendering setup, since this is a dedicated
//! arena server with no client-side rendering path.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use tankarena_common::config::TankConfigRegistry;
use tankarena_server::arena_registry::ArenaRegistry;
use tankarena_server::ban_store::{FailOpenBanStore, InMemoryBanStore};
use tankarena_server::config_loader::{load_tank_config, watch_for_reload};
use tankarena_server::dispatch;
use tankarena_server::net_queue::{FrameQueue, DEFAULT_QUEUE_CAPACITY};
use tankarena_server::scheduler;

const DEFAULT_TANK_CONFIG_PATH: &str = "entityconfig.json";
const DEFAULT_TARGET_BOT_COUNT: usize = 23;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(port_arg) = args.get(1) else {
        error!("usage: tankarena-server <port>");
        std::process::exit(1);
    };
    let Ok(port) = port_arg.parse::<u16>() else {
        error!(port = %port_arg, "port must be a 16-bit integer");
        std::process::exit(1);
    };

    let config_path = PathBuf::from(DEFAULT_TANK_CONFIG_PATH);
    let tanks = match load_tank_config(&config_path) {
        Ok(tanks) => tanks,
        Err(err) => {
            error!(error = %err, path = %config_path.display(), "failed to load tank config");
            std::process::exit(1);
        }
    };
    let config = TankConfigRegistry::new(tanks);

    let registry = Arc::new(ArenaRegistry::new());
    let ffa_slot = registry.register("/ffa-1", DEFAULT_TARGET_BOT_COUNT);
    {
        let mockups = config.snapshot();
        let mut ffa_arena = ffa_slot.arena.lock();
        tankarena_game::lifecycle::seed_bots(&mut ffa_arena, &mockups);
    }

    let reload_registry = registry.clone();
    let reload_config = config.clone();
    let _watcher = match watch_for_reload(config_path.clone(), config.clone(), move || {
        dispatch::broadcast_reload(&reload_registry, &reload_config);
    }) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            error!(error = %err, "failed to start config watcher, continuing without hot reload");
            None
        }
    };

    let ban_store: Arc<dyn tankarena_server::ban_store::BanStore> =
        Arc::new(FailOpenBanStore::new(InMemoryBanStore::new()));

    let queue = Arc::new(FrameQueue::new(DEFAULT_QUEUE_CAPACITY));

    match std::net::TcpListener::bind(("0.0.0.0", port)) {
        Ok(listener) => {
            info!(port, "bound listener; handing off to the transport layer");
            drop(listener);
        }
        Err(err) => {
            error!(port, error = %err, "failed to bind port");
            std::process::exit(1);
        }
    }

    info!(port, arenas = registry.len(), "tankarena-server starting scheduler");
    scheduler::run_forever(registry, queue, ban_store, config);
}
