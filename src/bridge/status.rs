use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bridge::bridge::Bridge;
use crate::device::snapshot::{Node, Snapshot, TextMatch};
use crate::error::BridgeError;
use crate::navigation::classifier::MAP_ANCHOR_TEXT;
use crate::navigation::page::PageId;
use crate::pubsub::entity::EntityKind;

pub const STATUS_SENSOR_NAME: &str = "Map Status";
pub const IDLE_STATUS: &str = "Idle";

const VIEW_CLASS: &str = "android.view.View";
const TEXT_VIEW_CLASS: &str = "android.widget.TextView";
const WATER_TANK_WARNING: &str = "Clean water tank low on water or not installed";
const CLEANING_LOG_BANNER: &str = "Cleaning completed. Tap to view the Log.";
/// The banner's close control sits to the right of its text.
const BANNER_CLOSE_OFFSET_X: f64 = 130.0;

/// Pixel window the map anchor is expected in when the map is centred.
const ANCHOR_X_RANGE: (f64, f64) = (360.0, 400.0);
const ANCHOR_Y_RANGE: (f64, f64) = (630.0, 640.0);

// ============================================================================
// Status text extraction
// ============================================================================

/// Text views under the status panel (`View[1]/View[0]/View[0]/View[0]`),
/// joined with spaces. The last matching panel wins.
pub fn panel_status_text(snapshot: &Snapshot) -> Option<String> {
    let mut found = None;
    for node in snapshot.nodes() {
        if !(node.is_class(VIEW_CLASS) && node.index == 1) {
            continue;
        }
        let panel = node
            .child_at(VIEW_CLASS, 0)
            .and_then(|n| n.child_at(VIEW_CLASS, 0))
            .and_then(|n| n.child_at(VIEW_CLASS, 0));
        if let Some(panel) = panel {
            found = Some(joined_text_views(panel));
        }
    }
    found
}

fn joined_text_views(panel: &Node) -> String {
    panel
        .children
        .iter()
        .filter(|c| c.is_class(TEXT_VIEW_CLASS) && !c.text.is_empty())
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `View[0]/View[0]/View[0]/TextView[0]` chain on screen.
pub fn robot_status_bar(snapshot: &Snapshot) -> Option<String> {
    snapshot
        .nodes()
        .filter(|n| n.is_class(VIEW_CLASS) && n.index == 0)
        .find_map(|n| {
            n.child_at(VIEW_CLASS, 0)
                .and_then(|l1| l1.child_at(VIEW_CLASS, 0))
                .and_then(|l2| l2.child_at(TEXT_VIEW_CLASS, 0))
                .map(|t| t.text.clone())
        })
}

/// Best status string visible in `snapshot`, if any.
pub fn read_status(snapshot: &Snapshot) -> Option<String> {
    let mut status = panel_status_text(snapshot).unwrap_or_default();

    if let Some(warning) = snapshot.find_by_text(WATER_TANK_WARNING, TextMatch::Exact) {
        status = warning.text.clone();
    }
    if status.trim().is_empty() {
        status = robot_status_bar(snapshot).unwrap_or_default();
    }

    let status = status.trim();
    if status.is_empty() { None } else { Some(status.to_string()) }
}

// ============================================================================
// Monitor
// ============================================================================

/// Remembers the last status so a blank read does not erase it.
#[derive(Debug, Clone)]
pub struct StatusMonitor {
    last_status: String,
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self {
            last_status: "Unknown".to_string(),
        }
    }
}

impl StatusMonitor {
    pub fn last_status(&self) -> &str {
        &self.last_status
    }

    /// Record a fresh read, falling back to the previous status.
    pub fn update(&mut self, read: Option<String>) -> &str {
        self.last_status = match read {
            Some(status) => status,
            None if self.last_status.is_empty() => IDLE_STATUS.to_string(),
            None => self.last_status.clone(),
        };
        &self.last_status
    }

    pub fn is_cleaning(&self) -> bool {
        self.last_status.trim().to_lowercase().starts_with("clean")
    }

    pub fn next_interval(&self, active: Duration, idle: Duration) -> Duration {
        if self.is_cleaning() { active } else { idle }
    }
}

// ============================================================================
// Bridge integration
// ============================================================================

impl Bridge {
    /// Read the robot status from the map page and publish it.
    pub fn refresh_status(&mut self) {
        self.go_to(PageId::Robot);
        if let Err(e) = self.dismiss_cleaning_log() {
            warn!("could not dismiss cleaning log: {}", e);
        }
        if let Err(e) = self.center_map() {
            warn!("could not centre map: {}", e);
        }

        let read = match self.device.capture() {
            Ok(snapshot) => read_status(&snapshot),
            Err(e) => {
                warn!("status capture failed: {}", e);
                None
            }
        };
        let status = self.status.update(read).to_string();
        info!(%status, "robot status");

        let sensor = self
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Sensor && e.name == STATUS_SENSOR_NAME);
        match (sensor, self.context.transport.as_deref()) {
            (Some(sensor), Some(transport)) => {
                if sensor.publish_state(transport, &status) {
                    debug!(%status, "status published");
                }
            }
            _ => warn!("status sensor not initialized; skipping publish"),
        }
        self.device.invalidate();
    }

    fn dismiss_cleaning_log(&mut self) -> Result<(), BridgeError> {
        let snapshot = self.device.current()?;
        let Some(banner) = snapshot.find_by_text(CLEANING_LOG_BANNER, TextMatch::Exact) else {
            return Ok(());
        };
        let bounds = banner.parse_bounds()?;
        let (_, y) = bounds.center();
        let x = bounds.x2 as f64 + BANNER_CLOSE_OFFSET_X;
        info!(x, y, "dismissing cleaning log");
        self.device.tap_point(x, y)
    }

    fn center_map(&mut self) -> Result<(), BridgeError> {
        let snapshot = self.device.current()?;
        let Some(anchor) = snapshot.find_by_text(MAP_ANCHOR_TEXT, TextMatch::Contains) else {
            return Ok(());
        };
        let (x, y) = anchor.parse_bounds()?.center();
        let centred = (ANCHOR_X_RANGE.0..=ANCHOR_X_RANGE.1).contains(&x)
            && (ANCHOR_Y_RANGE.0..=ANCHOR_Y_RANGE.1).contains(&y);
        if centred {
            return Ok(());
        }

        debug!(x, y, "map off centre");
        self.device
            .double_tap(0.5, 0.5, Duration::from_millis(1))?;
        self.device
            .drag((0.5, 0.5), (0.5, 0.38), Duration::from_millis(50))
    }
}
