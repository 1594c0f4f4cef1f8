use std::collections::HashMap;

use tracing::{info, warn};

use crate::bridge::bridge::Bridge;
use crate::device::snapshot::TextMatch;
use crate::error::BridgeError;
use crate::navigation::page::PageId;
use crate::rooms::normalize::entity_id;

/// Stable identifiers of the operator actions exposed as buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    Start,
    Pause,
    End,
    Zone,
    Nora,
    PostMeal,
    StopDryMop,
}

impl ActionId {
    pub const ALL: [ActionId; 7] = [
        ActionId::Start,
        ActionId::Pause,
        ActionId::End,
        ActionId::Zone,
        ActionId::Nora,
        ActionId::PostMeal,
        ActionId::StopDryMop,
    ];

    /// Published entity name. These names fix the discovery ids
    /// (`clickstart`, ...) that existing installations are keyed on.
    pub fn display_name(self) -> &'static str {
        match self {
            ActionId::Start => "ClickStart",
            ActionId::Pause => "ClickPause",
            ActionId::End => "ClickEnd",
            ActionId::Zone => "ClickZone",
            ActionId::Nora => "ClickNora",
            ActionId::PostMeal => "ClickPostMeal",
            ActionId::StopDryMop => "ClickStopDryMop",
        }
    }

    /// Entity id of the button that triggers this action.
    pub fn entity_id(self) -> String {
        entity_id(self.display_name())
    }
}

pub type ActionHandler = fn(&mut Bridge) -> Result<(), BridgeError>;

/// Button entity id -> handler, built once at startup.
pub struct ActionRegistry {
    order: Vec<ActionId>,
    handlers: HashMap<String, (ActionId, ActionHandler)>,
}

impl ActionRegistry {
    pub fn empty() -> Self {
        Self {
            order: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(ActionId::Start, click_start);
        registry.register(ActionId::Pause, click_pause);
        registry.register(ActionId::End, click_end);
        registry.register(ActionId::Zone, click_zone);
        registry.register(ActionId::Nora, click_nora);
        registry.register(ActionId::PostMeal, click_post_meal);
        registry.register(ActionId::StopDryMop, click_stop_dry_mop);
        registry
    }

    pub fn register(&mut self, id: ActionId, handler: ActionHandler) {
        if self.handlers.insert(id.entity_id(), (id, handler)).is_none() {
            self.order.push(id);
        }
    }

    /// Registered actions in registration order.
    pub fn actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.order.iter().copied()
    }

    pub fn lookup(&self, entity_id: &str) -> Option<(ActionId, ActionHandler)> {
        self.handlers.get(entity_id).copied()
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn tap_on(bridge: &mut Bridge, page: PageId, text: &str) -> Result<(), BridgeError> {
    bridge.go_to(page);
    bridge.device.capture()?;
    if !bridge.device.tap_text(text, TextMatch::Exact)? {
        warn!(%page, text, "action target not found");
    }
    Ok(())
}

fn click_start(bridge: &mut Bridge) -> Result<(), BridgeError> {
    bridge.go_to(PageId::Robot);
    let snapshot = bridge.device.capture()?;
    // A paused run shows "Continue" instead of "Start".
    let target = snapshot
        .find_by_text("Start", TextMatch::Exact)
        .or_else(|| snapshot.find_by_text("Continue", TextMatch::Exact));
    info!(button = target.map(|n| n.text.as_str()).unwrap_or(""), "start button");
    bridge.device.tap(target)?;
    Ok(())
}

fn click_pause(bridge: &mut Bridge) -> Result<(), BridgeError> {
    tap_on(bridge, PageId::Robot, "Pause")
}

fn click_end(bridge: &mut Bridge) -> Result<(), BridgeError> {
    tap_on(bridge, PageId::Robot, "End")
}

fn click_zone(bridge: &mut Bridge) -> Result<(), BridgeError> {
    tap_on(bridge, PageId::Robot, "Zone")?;
    let snapshot = bridge.device.current()?;
    match snapshot.find_by_text("1.0m * 1.0m", TextMatch::Exact) {
        Some(zone) => {
            let siblings = snapshot.parent_of(zone).map(|p| p.children.len()).unwrap_or(1);
            info!(siblings, "zone editor open");
        }
        None => warn!("zone element not found"),
    }
    Ok(())
}

fn click_nora(bridge: &mut Bridge) -> Result<(), BridgeError> {
    tap_on(bridge, PageId::Scenario, "Nora")
}

fn click_post_meal(bridge: &mut Bridge) -> Result<(), BridgeError> {
    bridge.go_to(PageId::Scenario);
    bridge.device.invalidate();
    bridge.device.tap_desc("Post-meal Clean", TextMatch::Exact)?;
    Ok(())
}

/// The stop control has no label of its own; it sits right above "Cancel".
fn click_stop_dry_mop(bridge: &mut Bridge) -> Result<(), BridgeError> {
    const OFFSET_ABOVE_CANCEL: f64 = 100.0;

    bridge.go_to(PageId::Station);
    let snapshot = bridge.device.current()?;
    let Some(cancel) = snapshot.find_by_text("Cancel", TextMatch::Exact) else {
        warn!("dry mop cancel control not found");
        return Ok(());
    };
    let bounds = match cancel.parse_bounds() {
        Ok(b) => b,
        Err(e) => {
            warn!("dry mop cancel control unusable: {}", e);
            return Ok(());
        }
    };
    let (x, _) = bounds.center();
    bridge.device.tap_point(x, bounds.y1 as f64 - OFFSET_ABOVE_CANCEL)?;
    Ok(())
}
