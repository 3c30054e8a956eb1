//! End-to-end scenario tests driving the scheduler's drain-then-tick loop
//! directly against an in-process queue, arena registry and ban store — no
//! real socket. Mirrors scenarios S4 and S5 from the design doc's
//! testable-properties section.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tankarena_common::config::{BarrelConfig, TankConfig, TankConfigRegistry};
use tankarena_common::protocol::{inbound_tag, outbound_tag};

use tankarena_game::client::ClientHandle;
use tankarena_game::entity::TankType;
use tankarena_game::lifecycle;

use tankarena_server::admission::{self, AdmissionError};
use tankarena_server::arena_registry::ArenaRegistry;
use tankarena_server::ban_store::{FailOpenBanStore, InMemoryBanStore};
use tankarena_server::config_loader::load_tank_config;
use tankarena_server::dispatch::{self, ClientInfo};
use tankarena_server::net_queue::{FrameQueue, QueuedFrame};
use tankarena_server::scheduler;

#[derive(Default)]
struct RecordingClient {
    sent: Mutex<Vec<Vec<u8>>>,
    closed_with: Mutex<Option<u16>>,
}

impl ClientHandle for RecordingClient {
    fn send(&self, bytes: Vec<u8>) {
        self.sent.lock().unwrap().push(bytes);
    }
    fn close(&self, code: u16) {
        *self.closed_with.lock().unwrap() = Some(code);
    }
}

fn basic_mockups() -> Vec<TankConfig> {
    vec![TankConfig {
        name: "Basic".to_string(),
        fov: 1,
        barrels: vec![BarrelConfig {
            angle: 0.0,
            width: 1.0,
            length: 20.0,
            full_reload: 25.0,
            reload_delay: 3.0,
            recoil: 3.0,
            bullet_speed: 10.0,
            bullet_damage: 20.0,
            bullet_penetration: 20.0,
        }],
    }]
}

fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("tankarena-scenario-{}-{}", std::process::id(), name));
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

/// S4 — reject misbehavior: a connection that sends an unrecognized packet
/// tag gets its tank torn down, its connection closed with the ban close
/// code, and its IP recorded in the ban store; a later admission attempt
/// from that same IP is refused even though the arena path is known-good.
#[test]
fn s4_misbehaving_connection_is_banned_and_future_admission_refused() {
    let registry = ArenaRegistry::new();
    registry.register("/ffa-1", 0);
    let ban_store: Arc<dyn tankarena_server::ban_store::BanStore> =
        Arc::new(FailOpenBanStore::new(InMemoryBanStore::new()));
    let queue = FrameQueue::new(16);
    let config = TankConfigRegistry::new(basic_mockups());

    let client: Arc<dyn ClientHandle> = Arc::new(RecordingClient::default());
    let client_info = Arc::new(Mutex::new(ClientInfo {
        path: "/ffa-1".to_string(),
        ip: "203.0.113.7".to_string(),
        id: None,
        authenticated: false,
    }));

    assert!(queue.sender().try_send(QueuedFrame {
        path: "/ffa-1".to_string(),
        client: client.clone(),
        client_info: client_info.clone(),
        is_binary: true,
        bytes: vec![99], // no packet tag is defined as 99
    }));

    scheduler::run_once(&registry, &queue, ban_store.as_ref(), &config, 1.0);

    assert!(ban_store.is_banned("203.0.113.7"));
    assert_eq!(
        admission::admit(&registry, ban_store.as_ref(), "/ffa-1", "203.0.113.7").unwrap_err(),
        AdmissionError::Banned
    );
    assert!(
        admission::admit(&registry, ban_store.as_ref(), "/ffa-1", "198.51.100.1").is_ok(),
        "an unrelated IP must still be admitted"
    );
}

/// S4 variant — a clean join followed by a respawn-while-alive (a
/// protocol violation) still bans the IP and tears the tank down, proving
/// the ban path works for an authenticated connection too, not just an
/// unauthenticated one.
#[test]
fn s4_authenticated_connection_violating_protocol_is_banned() {
    let registry = ArenaRegistry::new();
    registry.register("/ffa-1", 0);
    let ban_store: Arc<dyn tankarena_server::ban_store::BanStore> =
        Arc::new(FailOpenBanStore::new(InMemoryBanStore::new()));
    let queue = FrameQueue::new(16);
    let config = TankConfigRegistry::new(basic_mockups());

    let client: Arc<dyn ClientHandle> = Arc::new(RecordingClient::default());
    let client_info = Arc::new(Mutex::new(ClientInfo {
        path: "/ffa-1".to_string(),
        ip: "203.0.113.9".to_string(),
        id: None,
        authenticated: false,
    }));

    let mut init_frame = vec![inbound_tag::INIT];
    let name = "Alice";
    init_frame.extend((name.len() as u16).to_be_bytes());
    init_frame.extend(name.as_bytes());

    assert!(queue.sender().try_send(QueuedFrame {
        path: "/ffa-1".to_string(),
        client: client.clone(),
        client_info: client_info.clone(),
        is_binary: true,
        bytes: init_frame,
    }));
    scheduler::run_once(&registry, &queue, ban_store.as_ref(), &config, 1.0);
    assert!(!ban_store.is_banned("203.0.113.9"));

    let id = client_info.lock().unwrap().id.unwrap();
    assert!(registry.get("/ffa-1").unwrap().arena.lock().tanks.contains_key(&id));

    // A living tank sending Respawn is a protocol violation per the
    // inbound packet catalog.
    assert!(queue.sender().try_send(QueuedFrame {
        path: "/ffa-1".to_string(),
        client: client.clone(),
        client_info: client_info.clone(),
        is_binary: true,
        bytes: vec![inbound_tag::RESPAWN],
    }));
    scheduler::run_once(&registry, &queue, ban_store.as_ref(), &config, 1.0);

    assert!(ban_store.is_banned("203.0.113.9"));
    assert!(!registry.get("/ffa-1").unwrap().arena.lock().tanks.contains_key(&id));
}

/// S5 — hot reload round-trip: reloading the tank config registry with a
/// changed mockup table, then broadcasting the reload, rebuilds every
/// connected Remote tank's barrels from its (unchanged) mockup index
/// against the new table and resends it a fresh OutboundInit reflecting
/// the new barrel count.
#[test]
fn s5_hot_reload_rebuilds_barrels_and_resends_init() {
    let original_path = temp_file(
        "original.json",
        r#"[{"name":"Basic","fov":1,"barrels":[
            {"angle":0.0,"width":1.0,"length":20.0,"full_reload":25.0,
             "reload_delay":3.0,"recoil":3.0,"bullet_speed":10.0,
             "bullet_damage":20.0,"bullet_penetration":20.0}
        ]}]"#,
    );
    let updated_path = temp_file(
        "updated.json",
        r#"[{"name":"Twin","fov":2,"barrels":[
            {"angle":0.0,"width":1.0,"length":20.0,"full_reload":25.0,
             "reload_delay":3.0,"recoil":3.0,"bullet_speed":10.0,
             "bullet_damage":20.0,"bullet_penetration":20.0},
            {"angle":3.14159,"width":1.0,"length":20.0,"full_reload":25.0,
             "reload_delay":3.0,"recoil":3.0,"bullet_speed":10.0,
             "bullet_damage":20.0,"bullet_penetration":20.0}
        ]}]"#,
    );

    let original = load_tank_config(&original_path).unwrap();
    let updated = load_tank_config(&updated_path).unwrap();
    std::fs::remove_file(&original_path).ok();
    std::fs::remove_file(&updated_path).ok();

    let config = TankConfigRegistry::new(original.clone());
    let registry = ArenaRegistry::new();
    registry.register("/ffa-1", 0);

    let client = Arc::new(RecordingClient::default());
    let dyn_client: Arc<dyn ClientHandle> = client.clone();
    let tank_id = {
        let slot = registry.get("/ffa-1").unwrap();
        let mut arena = slot.arena.lock();
        lifecycle::join_tank(
            &mut arena,
            TankType::Remote,
            "Alice".to_string(),
            0,
            &original[0],
            Some(dyn_client),
        )
    };
    assert_eq!(
        registry.get("/ffa-1").unwrap().arena.lock().tanks[&tank_id].barrels.len(),
        1
    );

    config.reload(updated.clone());
    dispatch::broadcast_reload(&registry, &config);

    let arena_after = registry.get("/ffa-1").unwrap();
    let arena_after = arena_after.arena.lock();
    let tank = &arena_after.tanks[&tank_id];
    assert_eq!(tank.mockup, 0, "mockup index is preserved across reload");
    assert_eq!(tank.fov, 2);
    assert_eq!(tank.barrels.len(), 2, "barrel list should be rebuilt from the new table");

    let sent = client.sent.lock().unwrap();
    let last = sent.last().expect("broadcast_reload should resend OutboundInit");
    assert_eq!(last[0], outbound_tag::INIT);
}
