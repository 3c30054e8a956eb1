#![allow(clippy::too_many_arguments)]

//! The simulation core: arena data model, broadphase spatial index, motion
//! integration, the barrel firing state machine, collision/census, bot AI,
//! lifecycle (spawn/respawn/teardown) rules, the leaderboard, and the tick
//! pipeline that strings them together.

pub mod arena;
pub mod barrel;
pub mod broadphase;
pub mod census;
pub mod client;
pub mod collision;
pub mod entity;
pub mod leaderboard;
pub mod lifecycle;
pub mod motion;
pub mod tick;

pub use arena::{Arena, EntityIdAllocator};
pub use client::ClientHandle;
