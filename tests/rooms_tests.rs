use vacuum_bridge::device::snapshot::Snapshot;
use vacuum_bridge::error::BridgeError;
use vacuum_bridge::pubsub::context::PubSubContext;
use vacuum_bridge::pubsub::entity::{Entity, EntityKind};
use vacuum_bridge::rooms::extract::{extract_rooms, find_room};
use vacuum_bridge::rooms::manager::{RoomManager, reconcile_rooms};
use vacuum_bridge::rooms::normalize::{clean_label, entity_id, normalize_label};

use crate::common::fakes::{Gesture, RecordingTransport, ScriptedDriver, dumps, gestures};
use crate::common::utils::*;

mod common;

fn manager() -> RoomManager {
    RoomManager::new(fast_timing().settle)
}

// =========================================================================
// Label normalization
// =========================================================================

#[test]
fn labels_lose_icon_prefix() {
    assert_eq!(clean_label("🛋️ Living_Room"), "Living_Room");
    assert_eq!(normalize_label("🛋️ Living_Room"), "living room");
    assert_eq!(entity_id("🛋️ Living_Room"), "living_room");
    assert_eq!(clean_label("Hall"), "Hall");
    assert_eq!(clean_label("🛋️"), "");
}

#[test]
fn normalization_is_idempotent_and_collapses_spacing() {
    for raw in ["🛋️ Living_Room", "  Kids   Room ", "BATH_room", "Büro 2", "  "] {
        let once = normalize_label(raw);
        assert_eq!(normalize_label(&once), once, "{raw:?}");
    }
    assert_eq!(normalize_label("  Kids   Room "), "kids room");
    assert_eq!(normalize_label("Büro 2"), "büro 2");
}

#[test]
fn entity_ids_are_topic_safe() {
    assert_eq!(entity_id("Click Post Meal"), "click_post_meal");
    assert_eq!(entity_id("Kids' Room #2"), "kids_room_2");
    assert_eq!(entity_id("Map Status"), "map_status");
}

// =========================================================================
// Extraction
// =========================================================================

#[test]
fn extraction_reads_every_selection_signal() {
    let xml = robot_page_with(
        &[
            room("🍳 Kitchen", Mark::Badge, "[0,0][10,10]"),
            room("Hall", Mark::Off, "[0,0][10,10]"),
            room("Office", Mark::ParentFlag, "[0,0][10,10]"),
            room("Bath", Mark::ButtonFlag, "[0,0][10,10]"),
            room("🛋️", Mark::Badge, "[0,0][10,10]"),
        ],
        &element("android.widget.Button", 0, "Outside", "", "[0,0][10,10]", ""),
    );
    let snapshot = Snapshot::parse(&xml).unwrap();
    let rooms = extract_rooms(&snapshot);

    let summary: Vec<(&str, bool, Option<&str>)> = rooms
        .iter()
        .map(|r| (r.name.as_str(), r.enabled, r.signal))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Kitchen", true, Some("sibling-badge")),
            ("Hall", false, None),
            ("Office", true, Some("parent-flag")),
            ("Bath", true, Some("button-flag")),
        ]
    );
    assert_eq!(rooms[0].raw_label, "🍳 Kitchen");
    assert_eq!(rooms[0].normalized, "kitchen");
}

#[test]
fn extraction_without_container_finds_nothing() {
    let snapshot = Snapshot::parse(&station_page()).unwrap();
    assert!(extract_rooms(&snapshot).is_empty());
}

#[test]
fn find_room_matches_normalized_label() {
    let snapshot = Snapshot::parse(&robot_page(Mark::Badge, Mark::Off)).unwrap();
    let rooms = extract_rooms(&snapshot);
    assert_eq!(find_room(&rooms, "KITCHEN").map(|r| r.enabled), Some(true));
    assert_eq!(find_room(&rooms, " hall ").map(|r| r.enabled), Some(false));
    assert!(find_room(&rooms, "Kit").is_none());
}

// =========================================================================
// Reconciliation
// =========================================================================

#[test]
fn first_sight_creates_and_publishes_each_room() {
    let transport = RecordingTransport::new();
    let ctx = context(&transport);
    let ready = ctx.ready().unwrap();
    let snapshot = Snapshot::parse(&robot_page(Mark::Badge, Mark::Off)).unwrap();
    let rooms = extract_rooms(&snapshot);

    let mut entities = Vec::new();
    let report = reconcile_rooms(&rooms, &mut entities, &ready);

    assert_eq!(report.created, vec!["kitchen", "hall"]);
    assert_eq!(entities.len(), 2);
    assert!(entities[0].enabled);
    assert!(!entities[1].enabled);

    let published = transport.published();
    assert_eq!(published.len(), 4);
    assert!(published.iter().all(|p| p.retain));
    assert_eq!(published[0].topic, "homeassistant/switch/kitchen/config");
    assert_eq!(transport.payloads("homeassistant/kitchen/state"), vec!["ON"]);
    assert_eq!(transport.payloads("homeassistant/hall/state"), vec!["OFF"]);
    assert_eq!(
        transport.subscribed(),
        vec!["homeassistant/kitchen/set", "homeassistant/hall/set"]
    );
}

#[test]
fn unchanged_rooms_publish_nothing() {
    let transport = RecordingTransport::new();
    let ctx = context(&transport);
    let ready = ctx.ready().unwrap();
    let snapshot = Snapshot::parse(&robot_page(Mark::Badge, Mark::Off)).unwrap();
    let rooms = extract_rooms(&snapshot);

    let mut entities = Vec::new();
    reconcile_rooms(&rooms, &mut entities, &ready);
    transport.clear();

    let report = reconcile_rooms(&rooms, &mut entities, &ready);
    assert_eq!(report.unchanged.len(), 2);
    assert!(transport.published().is_empty());
    assert_eq!(entities.len(), 2);
}

#[test]
fn changed_room_publishes_once() {
    let transport = RecordingTransport::new();
    let ctx = context(&transport);
    let ready = ctx.ready().unwrap();
    let before = Snapshot::parse(&robot_page(Mark::Badge, Mark::Off)).unwrap();
    let after = Snapshot::parse(&robot_page(Mark::Off, Mark::Off)).unwrap();

    let mut entities = Vec::new();
    reconcile_rooms(&extract_rooms(&before), &mut entities, &ready);
    transport.clear();

    let report = reconcile_rooms(&extract_rooms(&after), &mut entities, &ready);
    assert_eq!(report.changed, vec!["kitchen"]);
    assert_eq!(transport.published().len(), 1);
    assert_eq!(transport.payloads("homeassistant/kitchen/state"), vec!["OFF"]);
    assert!(!entities[0].enabled);
}

#[test]
fn label_variants_map_to_one_entity() {
    let transport = RecordingTransport::new();
    let ctx = context(&transport);
    let ready = ctx.ready().unwrap();
    let mut entities = vec![Entity::new("Living Room", EntityKind::Switch, PREFIX, false)];

    let xml = robot_page_with(&[room("🛋️ Living_Room", Mark::Off, "[0,0][10,10]")], "");
    let snapshot = Snapshot::parse(&xml).unwrap();
    let report = reconcile_rooms(&extract_rooms(&snapshot), &mut entities, &ready);

    assert!(report.created.is_empty());
    assert_eq!(entities.len(), 1);
}

#[test]
fn colliding_ids_get_numbered_suffix() {
    let transport = RecordingTransport::new();
    let ctx = context(&transport);
    let ready = ctx.ready().unwrap();
    let xml = robot_page_with(
        &[
            room("Room 1", Mark::Off, "[100,300][200,360]"),
            room("Room-1", Mark::Badge, "[300,300][400,360]"),
        ],
        "",
    );
    let snapshot = Snapshot::parse(&xml).unwrap();

    let mut entities = Vec::new();
    let report = reconcile_rooms(&extract_rooms(&snapshot), &mut entities, &ready);

    assert_eq!(report.created, vec!["room_1", "room_1_2"]);
    assert_eq!(entities[1].name, "Room-1");
    assert_eq!(entities[1].command_topic.as_deref(), Some("homeassistant/room_1_2/set"));
    assert_eq!(
        transport.subscribed(),
        vec!["homeassistant/room_1/set", "homeassistant/room_1_2/set"]
    );

    // A later pass matches both rooms to their own entity again.
    transport.clear();
    let report = reconcile_rooms(&extract_rooms(&snapshot), &mut entities, &ready);
    assert_eq!(report.unchanged, vec!["room_1", "room_1_2"]);
    assert!(transport.published().is_empty());
}

#[test]
fn new_room_avoids_ids_of_existing_entities() {
    let transport = RecordingTransport::new();
    let ctx = context(&transport);
    let ready = ctx.ready().unwrap();
    let mut entities = vec![Entity::new("Room 1", EntityKind::Switch, PREFIX, false)];

    let xml = robot_page_with(
        &[
            room("Room 1", Mark::Off, "[100,300][200,360]"),
            room("Room_1!", Mark::Off, "[300,300][400,360]"),
        ],
        "",
    );
    let snapshot = Snapshot::parse(&xml).unwrap();
    let report = reconcile_rooms(&extract_rooms(&snapshot), &mut entities, &ready);

    assert_eq!(report.unchanged, vec!["room_1"]);
    assert_eq!(report.created, vec!["room_1_2"]);
}

#[test]
fn refresh_with_none_keeps_ids_unique() {
    let transport = RecordingTransport::new();
    let xml = robot_page_with(
        &[
            room("Room 1", Mark::Off, "[100,300][200,360]"),
            room("Room-1", Mark::Off, "[300,300][400,360]"),
        ],
        "",
    );
    let driver = ScriptedDriver::pages(&[xml]);
    let mut device = controller(driver);

    let entities = manager()
        .refresh_room_state(&mut device, &navigator(), &context(&transport), None)
        .unwrap();
    let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["room_1", "room_1_2"]);
}

#[test]
fn refresh_without_context_fails() {
    let driver = ScriptedDriver::pages(&[robot_page(Mark::Badge, Mark::Off)]);
    let mut device = controller(driver);

    let result = manager().refresh_room_state(&mut device, &navigator(), &PubSubContext::default(), Some(Vec::new()));
    assert!(matches!(result, Err(BridgeError::ContextNotInitialized("transport"))));
}

#[test]
fn refresh_with_none_builds_entities_silently() {
    let transport = RecordingTransport::new();
    let driver = ScriptedDriver::pages(&[robot_page(Mark::Badge, Mark::Off)]);
    let mut device = controller(driver);

    let entities = manager()
        .refresh_room_state(&mut device, &navigator(), &context(&transport), None)
        .unwrap();
    assert_eq!(entities.len(), 2);
    assert!(entities.iter().all(|e| e.kind == EntityKind::Switch));
    assert!(transport.published().is_empty());
}

#[test]
fn refresh_without_rooms_keeps_entities() {
    let transport = RecordingTransport::new();
    let driver = ScriptedDriver::pages(&[robot_settings_page(), robot_settings_page()]);
    let mut device = controller(driver);
    let existing = vec![Entity::new("Hall", EntityKind::Switch, PREFIX, true)];

    let entities = manager()
        .refresh_room_state(&mut device, &navigator(), &context(&transport), Some(existing.clone()))
        .unwrap();
    assert_eq!(entities, existing);
    assert!(transport.published().is_empty());
}

// =========================================================================
// Enable / wait
// =========================================================================

#[test]
fn enable_room_taps_exact_match() {
    let driver = ScriptedDriver::pages(&[robot_page(Mark::Badge, Mark::Off), robot_page(Mark::Badge, Mark::Badge)]);
    let log = driver.log();
    let mut device = controller(driver);

    assert!(manager().enable_room(&mut device, &navigator(), "hall").unwrap());
    assert_eq!(gestures(&log), vec![Gesture::Tap(350.0, 330.0)]);
}

#[test]
fn enable_room_falls_back_to_substring() {
    let driver = ScriptedDriver::pages(&[robot_page(Mark::Off, Mark::Off)]);
    let log = driver.log();
    let mut device = controller(driver);

    assert!(manager().enable_room(&mut device, &navigator(), "Kitch").unwrap());
    assert_eq!(gestures(&log), vec![Gesture::Tap(150.0, 330.0)]);
}

#[test]
fn enable_room_searches_screen_text_for_underscored_labels() {
    let xml = robot_page_with(&[], &text("Guest Room", "[0,1000][100,1100]"));
    let driver = ScriptedDriver::pages(&[xml]);
    let log = driver.log();
    let mut device = controller(driver);

    assert!(manager().enable_room(&mut device, &navigator(), "Guest_Room").unwrap());
    assert_eq!(gestures(&log), vec![Gesture::Tap(50.0, 1050.0)]);
}

#[test]
fn enable_missing_room_taps_nothing() {
    let driver = ScriptedDriver::pages(&[robot_page(Mark::Off, Mark::Off)]);
    let log = driver.log();
    let mut device = controller(driver);

    assert!(!manager().enable_room(&mut device, &navigator(), "Garage").unwrap());
    assert!(gestures(&log).is_empty());
}

#[test]
fn wait_for_state_succeeds_once_visible() {
    let driver = ScriptedDriver::pages(&[robot_page(Mark::Off, Mark::Badge)]);
    let log = driver.log();
    let mut device = controller(driver);

    assert!(manager().wait_for_state(&mut device, "Hall", true, 3, fast_timing().room_poll_delay));
    assert_eq!(dumps(&log), 1);
}

#[test]
fn wait_for_state_gives_up_after_retries() {
    let driver = ScriptedDriver::pages(&[robot_page(Mark::Off, Mark::Off)]);
    let log = driver.log();
    let mut device = controller(driver);

    assert!(!manager().wait_for_state(&mut device, "Hall", true, 3, fast_timing().room_poll_delay));
    assert!(!manager().wait_for_state(&mut device, "Garage", false, 2, fast_timing().room_poll_delay));
    assert_eq!(dumps(&log), 5);
}

#[test]
fn room_state_reads_snapshot() {
    let snapshot = Snapshot::parse(&robot_page(Mark::Badge, Mark::Off)).unwrap();
    assert_eq!(manager().room_state(&snapshot, "kitchen"), Some(true));
    assert_eq!(manager().room_state(&snapshot, "Hall"), Some(false));
    assert_eq!(manager().room_state(&snapshot, "Garage"), None);
}

#[test]
fn context_reports_missing_parts() {
    let transport = RecordingTransport::new();
    let mut ctx = context(&transport);
    assert!(ctx.ready().is_ok());

    ctx.prefix = None;
    assert!(matches!(ctx.ready(), Err(BridgeError::ContextNotInitialized("discovery prefix"))));
    ctx.device = None;
    assert!(matches!(ctx.ready(), Err(BridgeError::ContextNotInitialized("device descriptor"))));
}
