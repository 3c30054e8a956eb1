#![allow(clippy::too_many_arguments)]

//! Shared primitives used by both the simulation core (`tankarena-game`) and
//! the network-facing shell (`tankarena-server`): the wire codec, the plain
//! 2D vector type, tank/barrel configuration records, and the error
//! taxonomy described in the design doc's error handling section.

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod vector2;

pub use codec::{ByteReader, ByteWriter};
pub use error::CodecError;
pub use vector2::Vector2;
