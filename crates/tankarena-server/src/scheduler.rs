//! Fixed-rate tick driver: a `time_residual` accumulator that lets the
//! scheduler's own measured frame length vary while each arena still
//! advances in fixed `1000/TARGET_TPS` ms steps, applied across every
//! registered arena rather than a single world.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::arena_registry::ArenaRegistry;
use crate::ban_store::BanStore;
use crate::dispatch::{self, DispatchOutcome};
use crate::net_queue::{FrameQueue, QueuedEvent};
use tankarena_common::config::TankConfigRegistry;

/// Nominal simulation rate.
pub const TARGET_TPS: u32 = 30;

/// Fixed-timestep accumulator with the tick rate pinned rather than
/// runtime-configurable.
pub struct TickTiming {
    frametime: Duration,
    residual: Duration,
}

impl TickTiming {
    pub fn new() -> Self {
        Self {
            frametime: Duration::from_millis(1000 / TARGET_TPS as u64),
            residual: Duration::ZERO,
        }
    }

    /// Feeds in measured wall-clock elapsed time and returns how many fixed
    /// ticks should run to catch up, draining the residual as it goes.
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        self.residual += elapsed;
        let mut ticks = 0;
        while self.residual >= self.frametime {
            self.residual -= self.frametime;
            ticks += 1;
        }
        ticks
    }

}

impl Default for TickTiming {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains the inbound frame queue, running each frame through dispatch
/// against its arena, then runs one fixed tick per registered arena. Meant
/// to be called in a loop from `main` with a short sleep between calls.
pub fn run_once(
    registry: &ArenaRegistry,
    queue: &FrameQueue,
    ban_store: &dyn BanStore,
    config: &TankConfigRegistry,
    delta: f32,
) {
    for event in queue.drain() {
        match event {
            QueuedEvent::Frame(frame) => {
                let Some(slot) = registry.get(&frame.path) else {
                    warn!(path = %frame.path, "frame for unknown arena path, dropping");
                    continue;
                };

                let mut client_info = frame.client_info.lock().expect("client_info mutex poisoned");
                let mut arena = slot.arena.lock();
                let outcome = dispatch::handle_frame(
                    &mut arena,
                    &mut client_info,
                    &frame.client,
                    config,
                    frame.is_binary,
                    &frame.bytes,
                );

                if outcome == DispatchOutcome::Ban {
                    // Every `Ban` path, regardless of which precondition
                    // tripped it, gets the same cleanup: the client's tank
                    // (if it had one) is destroyed and its IP is recorded in
                    // the ban store.
                    dispatch::handle_disconnect(&mut arena, &client_info);
                    ban_store.ban(&client_info.ip);
                }
                drop(arena);
                drop(client_info);

                if outcome == DispatchOutcome::Ban {
                    frame.client.close(dispatch::BAN_CLOSE_CODE);
                }
            }
            QueuedEvent::Disconnect(disconnect) => {
                let Some(slot) = registry.get(&disconnect.path) else {
                    continue;
                };
                let client_info = disconnect.client_info.lock().expect("client_info mutex poisoned");
                let mut arena = slot.arena.lock();
                dispatch::handle_disconnect(&mut arena, &client_info);
            }
        }
    }

    let paths = registry.paths();
    for path in paths {
        if let Some(slot) = registry.get(&path) {
            let mut arena = slot.arena.lock();
            tankarena_game::tick::step(&mut arena, delta);
        }
    }
}

/// Runs `run_once` forever at the fixed tick rate, sleeping between
/// iterations when ahead of schedule. Intended to be the body of the
/// server's one dedicated scheduler thread.
pub fn run_forever(
    registry: Arc<ArenaRegistry>,
    queue: Arc<FrameQueue>,
    ban_store: Arc<dyn BanStore>,
    config: TankConfigRegistry,
) -> ! {
    let mut timing = TickTiming::new();
    let mut last = Instant::now();
    loop {
        let now = Instant::now();
        let elapsed = now - last;
        last = now;

        let ticks = timing.accumulate(elapsed);
        for _ in 0..ticks {
            // Each drained tick already represents exactly one nominal
            // period (the accumulator only ever subtracts whole
            // `frametime`s), so its wall-clock/nominal ratio is 1.0 here.
            // A scheduler driven by per-tick measured elapsed time instead
            // would pass that ratio directly.
            run_once(&registry, &queue, ban_store.as_ref(), &config, 1.0);
        }

        std::thread::sleep(Duration::from_millis(1));
    }
}
