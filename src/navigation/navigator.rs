use std::time::Duration;

use tracing::{debug, info, warn};

use crate::device::controller::DeviceController;
use crate::device::snapshot::TextMatch;
use crate::error::BridgeError;
use crate::navigation::classifier::PageClassifier;
use crate::navigation::graph::{NavAction, NavGraph};
use crate::navigation::page::PageId;

const UNLOCK_SWIPE_FROM: (f64, f64) = (0.5, 0.8);
const UNLOCK_SWIPE_TO: (f64, f64) = (0.5, 0.5);
const UNLOCK_SWIPE_DURATION: Duration = Duration::from_millis(100);

/// Result of a [`Navigator::navigate_to`] call. None of these are errors:
/// the caller decides whether a missed target matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Already on the target page; no gestures were issued.
    AlreadyThere,
    /// Reached the target after `hops` executed edges.
    Arrived { hops: u32 },
    /// No path exists from the detected page.
    Unreachable { from: PageId },
    /// Step bound exhausted before reaching the target.
    GaveUp { last: PageId },
}

impl NavOutcome {
    pub fn reached(&self) -> bool {
        matches!(self, NavOutcome::AlreadyThere | NavOutcome::Arrived { .. })
    }
}

/// Drives the app from whatever screen it is on to a target page.
pub struct Navigator {
    classifier: PageClassifier,
    graph: NavGraph,
    unlock_pin: String,
    max_steps: u32,
}

impl Navigator {
    pub fn new(classifier: PageClassifier, graph: NavGraph, unlock_pin: impl Into<String>, max_steps: u32) -> Self {
        Self {
            classifier,
            graph,
            unlock_pin: unlock_pin.into(),
            max_steps,
        }
    }

    pub fn graph(&self) -> &NavGraph {
        &self.graph
    }

    pub fn detect_current_page(&self, device: &mut DeviceController) -> PageId {
        self.classifier.detect_current_page(device)
    }

    pub fn find_path(&self, start: PageId, goal: PageId) -> Option<Vec<(PageId, PageId)>> {
        self.graph.find_path(start, goal)
    }

    /// Execute one hop at a time, re-detecting and re-planning after each.
    ///
    /// Only the first edge of every plan is executed; a hop that lands on an
    /// unexpected page simply becomes the start of the next plan.
    pub fn navigate_to(&self, device: &mut DeviceController, goal: PageId) -> NavOutcome {
        let mut hops = 0;
        let mut current = PageId::None;

        for _ in 0..self.max_steps {
            current = self.detect_current_page(device);
            if current == goal {
                if hops == 0 {
                    debug!(%goal, "already on target page");
                    return NavOutcome::AlreadyThere;
                }
                return NavOutcome::Arrived { hops };
            }

            let Some(path) = self.find_path(current, goal) else {
                warn!(from = %current, to = %goal, "no navigation path");
                return NavOutcome::Unreachable { from: current };
            };
            let Some(&(src, dst)) = path.first() else {
                return NavOutcome::Unreachable { from: current };
            };
            let Some(edge) = self.graph.edge(src, dst) else {
                return NavOutcome::Unreachable { from: current };
            };

            info!(from = %src, to = %dst, "navigating");
            match self.perform(device, &edge.action) {
                Ok(true) => {}
                Ok(false) => debug!(from = %src, to = %dst, "navigation target element missing"),
                Err(e) => warn!(from = %src, to = %dst, "navigation action failed: {}", e),
            }
            hops += 1;

            let landed = self.detect_current_page(device);
            if landed == dst {
                info!(page = %dst, "arrived");
            } else {
                debug!(expected = %dst, actual = %landed, "hop drifted, re-planning");
            }
            if landed == goal {
                return NavOutcome::Arrived { hops };
            }
            current = landed;
        }

        warn!(%goal, last = %current, steps = self.max_steps, "navigation gave up");
        NavOutcome::GaveUp { last: current }
    }

    /// Run one edge action. `Ok(false)` means its target element was missing.
    pub fn perform(&self, device: &mut DeviceController, action: &NavAction) -> Result<bool, BridgeError> {
        match action {
            NavAction::Press(key) => device.press(*key).map(|_| true),
            NavAction::ScreenOn => device.screen_on().map(|_| true),
            NavAction::Unlock => self.unlock(device),
            NavAction::TapText { text, mode } => device.tap_text(text, *mode),
            NavAction::TapDesc { text, mode } => device.tap_desc(text, *mode),
            NavAction::TapScreen { x, y } => device.tap_point(*x, *y).map(|_| true),
        }
    }

    fn unlock(&self, device: &mut DeviceController) -> Result<bool, BridgeError> {
        device.swipe(UNLOCK_SWIPE_FROM, UNLOCK_SWIPE_TO, UNLOCK_SWIPE_DURATION)?;

        let mut typed_all = true;
        for digit in self.unlock_pin.chars() {
            let key = digit.to_string();
            typed_all &= device.tap_text(&key, TextMatch::Exact)?;
        }
        Ok(typed_all)
    }
}
