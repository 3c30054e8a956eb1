//! Error taxonomy shared across crates. Each boundary named in the design
//! doc's error handling section gets its own `thiserror` enum rather than one
//! catch-all, so callers can match on what actually went wrong.

use thiserror::Error;

/// Errors raised by `codec::ByteReader`. A malformed frame is always a
/// protocol violation at the call site — the codec itself just reports it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame ended after {consumed} bytes while reading a {field}")]
    UnexpectedEof { field: &'static str, consumed: usize },

    #[error("string length {len} exceeds remaining {remaining} bytes")]
    MalformedFrame { len: usize, remaining: usize },
}

/// Errors raised while parsing `entityconfig.json` into `TankConfig`s.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config has no mockups defined")]
    Empty,
}
