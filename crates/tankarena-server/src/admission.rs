//! Connection admission: the two checks that happen before the WebSocket
//! upgrade is allowed to complete. The upgrade itself lives in the transport
//! layer, which calls `admit` with the request's path and tracked IP and
//! acts on the result before ever handing a connection object to the rest
//! of this crate.

use std::sync::Arc;

use crate::arena_registry::{ArenaRegistry, ArenaSlot};
use crate::ban_store::BanStore;

#[derive(Debug, PartialEq, Eq)]
pub enum AdmissionError {
    /// No arena is registered at this path.
    UnknownPath,
    /// The tracked IP is banned.
    Banned,
}

/// Checks path and ban status and, on success, marks the IP as known to the
/// ban store. An unknown path is refused before a ban lookup even happens,
/// since there's no arena to join either way.
pub fn admit(
    registry: &ArenaRegistry,
    ban_store: &dyn BanStore,
    path: &str,
    ip: &str,
) -> Result<Arc<ArenaSlot>, AdmissionError> {
    let slot = registry.get(path).ok_or(AdmissionError::UnknownPath)?;

    if ban_store.is_banned(ip) {
        return Err(AdmissionError::Banned);
    }

    ban_store.ensure_known(ip);
    Ok(slot)
}
