use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::device::controller::DeviceController;
use crate::device::snapshot::Snapshot;
use crate::error::BridgeError;
use crate::navigation::page::PageId;

/// Text of the map room that anchors every vacuum-detail screen.
pub const MAP_ANCHOR_TEXT: &str = "Corridor";

const STATION_ADVANCED_MARKERS: [&str; 3] = [
    "Mop Wash Settings",
    "Auto-Empty settings",
    "Hot Air Drying Settings",
];

/// What a page predicate may look at.
pub struct PageProbe<'a> {
    pub screen_on: bool,
    pub snapshot: &'a Snapshot,
}

pub type PagePredicate = fn(&PageProbe<'_>) -> bool;

// ============================================================================
// Predicates
// ============================================================================

fn has_transport_control(s: &Snapshot) -> bool {
    s.has_text("Start") || s.has_text("Pause") || s.has_text("End")
}

fn in_screen_off(p: &PageProbe<'_>) -> bool {
    !p.screen_on
}

fn in_lock(p: &PageProbe<'_>) -> bool {
    p.snapshot.has_desc("Entsperren")
}

fn in_desktop(p: &PageProbe<'_>) -> bool {
    p.snapshot.has_desc("Nova-Suche")
}

fn in_main(p: &PageProbe<'_>) -> bool {
    p.snapshot.has_desc("Enter")
}

fn in_scenario(p: &PageProbe<'_>) -> bool {
    p.snapshot.has_text("Scenario Clean") && p.snapshot.has_text("Nora")
}

fn in_robot(p: &PageProbe<'_>) -> bool {
    let s = p.snapshot;
    s.contains_text(MAP_ANCHOR_TEXT) && !s.has_text("Suction Power") && has_transport_control(s)
}

fn in_robot_settings(p: &PageProbe<'_>) -> bool {
    let s = p.snapshot;
    s.contains_text(MAP_ANCHOR_TEXT) && s.has_text("Suction Power") && has_transport_control(s)
}

fn in_station(p: &PageProbe<'_>) -> bool {
    p.snapshot.contains_text(MAP_ANCHOR_TEXT) && !in_robot(p) && !in_robot_settings(p)
}

fn in_station_advanced(p: &PageProbe<'_>) -> bool {
    STATION_ADVANCED_MARKERS
        .iter()
        .any(|marker| p.snapshot.has_text(marker))
}

fn in_warning(p: &PageProbe<'_>) -> bool {
    p.snapshot.has_text("Ignore") && p.snapshot.has_text("View")
}

// ============================================================================
// Classifier
// ============================================================================

/// Ordered page predicates; the first one that holds names the screen.
pub struct PageClassifier {
    detectors: Vec<(PageId, PagePredicate)>,
    retries: u32,
    retry_delay: Duration,
}

impl PageClassifier {
    pub fn new(retries: u32, retry_delay: Duration) -> Self {
        Self {
            detectors: vec![
                (PageId::ScreenOff, in_screen_off as PagePredicate),
                (PageId::Lock, in_lock),
                (PageId::Desktop, in_desktop),
                (PageId::Main, in_main),
                (PageId::Scenario, in_scenario),
                (PageId::Robot, in_robot),
                (PageId::RobotSettings, in_robot_settings),
                (PageId::Station, in_station),
                (PageId::StationAdvanced, in_station_advanced),
                (PageId::Warning, in_warning),
            ],
            retries,
            retry_delay,
        }
    }

    /// Evaluate the predicates against one probe, without retrying.
    pub fn classify(&self, probe: &PageProbe<'_>) -> Option<PageId> {
        self.detectors
            .iter()
            .find(|(_, predicate)| predicate(probe))
            .map(|(page, _)| *page)
    }

    /// Classify the current screen, re-capturing between attempts.
    ///
    /// Observation failures count as unmatched attempts. Gives up with
    /// `PageId::None` after the retry bound.
    pub fn detect_current_page(&self, device: &mut DeviceController) -> PageId {
        for attempt in 1..=self.retries {
            match self.probe_once(device) {
                Ok(Some(page)) => {
                    info!(%page, "current page");
                    return page;
                }
                Ok(None) => debug!(attempt, "no page predicate matched"),
                Err(e) => warn!(attempt, "page detection failed: {}", e),
            }

            thread::sleep(self.retry_delay);
            debug!(attempt, "retrying page detection");
            device.invalidate();
        }

        warn!(retries = self.retries, "page detection gave up");
        PageId::None
    }

    fn probe_once(
        &self,
        device: &mut DeviceController,
    ) -> Result<Option<PageId>, BridgeError> {
        let screen_on = device.is_screen_on()?;
        if !screen_on {
            // The accessibility dump is meaningless with the panel off.
            return Ok(Some(PageId::ScreenOff));
        }
        let snapshot = device.current()?;
        let probe = PageProbe {
            screen_on,
            snapshot: &snapshot,
        };
        Ok(self.classify(&probe))
    }
}
