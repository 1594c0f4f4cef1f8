use std::sync::Arc;
use std::time::Duration;

use vacuum_bridge::bridge::bridge::{Bridge, Timing};
use vacuum_bridge::device::controller::DeviceController;
use vacuum_bridge::navigation::classifier::PageClassifier;
use vacuum_bridge::navigation::graph::NavGraph;
use vacuum_bridge::navigation::navigator::Navigator;
use vacuum_bridge::pubsub::context::{DeviceDescriptor, PubSubContext, Transport};
use vacuum_bridge::rooms::extract::ROOM_CONTAINER_ID;

use crate::common::fakes::{RecordingTransport, ScriptedDriver};

pub const PREFIX: &str = "homeassistant";
pub const PIN: &str = "12";

/// Map anchor bounds whose centre (380, 635) counts as a centred map.
pub const ANCHOR_BOUNDS: &str = "[330,620][430,650]";

// ============================================================================
// XML builders
// ============================================================================

pub fn hierarchy(body: &str) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>\
         <hierarchy rotation=\"0\">\
         <node index=\"0\" text=\"\" resource-id=\"\" class=\"android.widget.FrameLayout\" \
         content-desc=\"\" checked=\"false\" selected=\"false\" bounds=\"[0,0][720,1560]\">{}</node>\
         </hierarchy>",
        body
    )
}

pub fn element(class: &str, index: i32, text: &str, desc: &str, bounds: &str, children: &str) -> String {
    format!(
        "<node index=\"{}\" text=\"{}\" resource-id=\"\" class=\"{}\" content-desc=\"{}\" \
         checked=\"false\" selected=\"false\" bounds=\"{}\">{}</node>",
        index, text, class, desc, bounds, children
    )
}

pub fn text(text: &str, bounds: &str) -> String {
    element("android.widget.TextView", 0, text, "", bounds, "")
}

pub fn desc(desc: &str, bounds: &str) -> String {
    element("android.view.View", 0, "", desc, bounds, "")
}

pub fn view(index: i32, children: &str) -> String {
    element("android.view.View", index, "", "", "[0,0][720,1560]", children)
}

/// How a room toggle shows its selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mark {
    Off,
    Badge,
    ParentFlag,
    ButtonFlag,
}

pub struct RoomSpec<'a> {
    pub label: &'a str,
    pub mark: Mark,
    pub bounds: &'a str,
}

pub fn room<'a>(label: &'a str, mark: Mark, bounds: &'a str) -> RoomSpec<'a> {
    RoomSpec { label, mark, bounds }
}

fn room_xml(room: &RoomSpec<'_>) -> String {
    let button_selected = room.mark == Mark::ButtonFlag;
    let parent_selected = room.mark == Mark::ParentFlag;
    let badge = if room.mark == Mark::Badge {
        "<node index=\"1\" text=\"1\" resource-id=\"\" class=\"android.widget.TextView\" content-desc=\"\" \
         checked=\"false\" selected=\"false\" bounds=\"[0,0][10,10]\"/>"
    } else {
        ""
    };
    format!(
        "<node index=\"0\" text=\"\" resource-id=\"\" class=\"android.view.View\" content-desc=\"\" \
         checked=\"false\" selected=\"{}\" bounds=\"[0,0][720,1560]\">\
         <node index=\"0\" text=\"{}\" resource-id=\"\" class=\"android.widget.Button\" content-desc=\"\" \
         checked=\"false\" selected=\"{}\" bounds=\"{}\"/>{}</node>",
        parent_selected, room.label, button_selected, room.bounds, badge
    )
}

pub fn room_container(rooms: &[RoomSpec<'_>]) -> String {
    let inner: String = rooms.iter().map(room_xml).collect();
    format!(
        "<node index=\"0\" text=\"\" resource-id=\"{}\" class=\"android.view.View\" content-desc=\"\" \
         checked=\"false\" selected=\"false\" bounds=\"[0,200][720,1200]\">{}</node>",
        ROOM_CONTAINER_ID, inner
    )
}

// ============================================================================
// Pages
// ============================================================================

/// Map page with transport controls, the anchor room label and `rooms`.
pub fn robot_page_with(rooms: &[RoomSpec<'_>], extra: &str) -> String {
    hierarchy(&format!(
        "{}{}{}{}{}{}{}",
        text("Corridor", ANCHOR_BOUNDS),
        text("Start", "[0,1400][200,1500]"),
        text("Pause", "[260,1400][460,1500]"),
        text("End", "[520,1400][720,1500]"),
        text("Station", "[500,100][700,180]"),
        room_container(rooms),
        extra
    ))
}

pub fn robot_page(kitchen: Mark, hall: Mark) -> String {
    robot_page_with(
        &[
            room("🍳 Kitchen", kitchen, "[100,300][200,360]"),
            room("Hall", hall, "[300,300][400,360]"),
        ],
        "",
    )
}

pub fn robot_settings_page() -> String {
    hierarchy(&format!(
        "{}{}{}",
        text("Corridor", ANCHOR_BOUNDS),
        text("Start", "[0,1400][200,1500]"),
        text("Suction Power", "[0,800][720,900]")
    ))
}

pub fn station_page() -> String {
    hierarchy(&format!(
        "{}{}{}",
        text("Corridor", ANCHOR_BOUNDS),
        text("ROBOT 1", "[20,100][220,180]"),
        text("Cancel", "[100,500][300,560]")
    ))
}

pub fn station_advanced_page() -> String {
    hierarchy(&text("Mop Wash Settings", "[0,300][720,380]"))
}

pub fn scenario_page() -> String {
    hierarchy(&format!(
        "{}{}{}",
        text("Scenario Clean", "[0,100][720,180]"),
        text("Nora", "[0,300][720,380]"),
        desc("Post-meal Clean", "[0,500][720,580]")
    ))
}

pub fn main_page() -> String {
    hierarchy(&format!(
        "{}{}",
        desc("Enter", "[200,600][520,700]"),
        desc("Scenario Clean", "[200,900][520,1000]")
    ))
}

pub fn desktop_page() -> String {
    hierarchy(&format!(
        "{}{}",
        desc("Nova-Suche", "[0,80][720,160]"),
        text("ECOVACS HOME", "[300,1000][420,1100]")
    ))
}

pub fn lock_page() -> String {
    hierarchy(&format!(
        "{}{}{}",
        desc("Entsperren", "[0,1300][720,1400]"),
        text("1", "[100,800][200,900]"),
        text("2", "[300,800][400,900]")
    ))
}

pub fn warning_page() -> String {
    hierarchy(&format!(
        "{}{}",
        text("Ignore", "[0,1000][300,1100]"),
        text("View", "[400,1000][720,1100]")
    ))
}

pub fn blank_page() -> String {
    hierarchy(&text("Loading", "[0,0][720,100]"))
}

/// Nested status panel (`View[1]/View[0]/View[0]/View[0]`) holding `parts`.
pub fn status_panel(parts: &[&str]) -> String {
    let texts: String = parts.iter().map(|p| text(p, "[0,0][100,40]")).collect();
    view(1, &view(0, &view(0, &view(0, &texts))))
}

// ============================================================================
// Wiring
// ============================================================================

pub fn fast_timing() -> Timing {
    Timing {
        detect_retries: 3,
        detect_delay: Duration::ZERO,
        max_nav_steps: 6,
        settle: Duration::ZERO,
        room_poll_retries: 3,
        room_poll_delay: Duration::ZERO,
        refresh_active: Duration::from_secs(10),
        refresh_idle: Duration::from_secs(3600),
    }
}

pub fn navigator() -> Navigator {
    let timing = fast_timing();
    Navigator::new(
        PageClassifier::new(timing.detect_retries, timing.detect_delay),
        NavGraph::vacuum_app(),
        PIN,
        timing.max_nav_steps,
    )
}

pub fn controller(driver: ScriptedDriver) -> DeviceController {
    DeviceController::new(Box::new(driver))
}

pub fn context(transport: &Arc<RecordingTransport>) -> PubSubContext {
    let transport: Arc<dyn Transport> = transport.clone();
    PubSubContext::new(
        transport,
        DeviceDescriptor::new("Robot Vacuum"),
        PREFIX,
    )
}

pub fn bridge(driver: ScriptedDriver, transport: &Arc<RecordingTransport>) -> Bridge {
    Bridge::new(Box::new(driver), PIN, context(transport), fast_timing())
}
