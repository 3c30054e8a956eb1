//! The tiny HTTP surface alongside the WebSocket upgrade path. The HTTP
//! server itself (listener, TLS, routing) lives in the transport layer;
//! this module only builds the two response bodies it needs to produce, so
//! whatever minimal HTTP crate the transport layer picks can call straight
//! into it.

use crate::arena_registry::ArenaRegistry;

/// A fully-formed response: status-independent here since both routes are
/// 200s, with a fixed plaintext instruction for anything that isn't
/// `/serverinfo`.
pub struct HttpResponse {
    pub content_type: &'static str,
    pub body: String,
    /// `Access-Control-Allow-Origin: *`, required only on `/serverinfo`.
    pub cors_allow_all: bool,
}

const FALLBACK_BODY: &str = "this is a tank arena server; connect via websocket to a /<path> arena";

/// Routes a request path to its response body. `path` is expected to be the
/// raw HTTP path (e.g. `/serverinfo`), already stripped of query string by
/// the caller.
pub fn route(registry: &ArenaRegistry, path: &str) -> HttpResponse {
    if path == "/serverinfo" {
        serverinfo(registry)
    } else {
        HttpResponse {
            content_type: "text/plain; charset=utf-8",
            body: FALLBACK_BODY.to_string(),
            cors_allow_all: false,
        }
    }
}

fn serverinfo(registry: &ArenaRegistry) -> HttpResponse {
    let paths = registry.paths();
    let body = serde_json::to_string(&paths).expect("Vec<String> always serializes");
    HttpResponse {
        content_type: "application/json",
        body,
        cors_allow_all: true,
    }
}
