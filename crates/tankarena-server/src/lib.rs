#![allow(clippy::too_many_arguments)]

//! The network-facing shell: protocol dispatch, the arena registry, the
//! ban store and config loader traits/implementations, the tiny HTTP
//! surface, and the fixed-rate scheduler that drives every registered
//! arena's tick.

pub mod admission;
pub mod arena_registry;
pub mod ban_store;
pub mod config_loader;
pub mod dispatch;
pub mod http;
pub mod net_queue;
pub mod scheduler;
