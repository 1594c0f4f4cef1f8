use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::device::controller::DeviceController;
use crate::device::snapshot::{Snapshot, TextMatch};
use crate::error::BridgeError;
use crate::navigation::navigator::Navigator;
use crate::navigation::page::PageId;
use crate::pubsub::context::{PubSubContext, ReadyContext};
use crate::pubsub::entity::{Entity, EntityKind};
use crate::rooms::extract::{Room, extract_rooms, find_room, room_buttons};
use crate::rooms::normalize::{clean_label, entity_id, normalize_label};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Diff freshly extracted rooms against the published switch entities.
///
/// Rooms are matched to entities by exact normalized label. Unknown rooms
/// become new entities (discovery plus a forced state publish); known
/// rooms publish only when their state flipped. Entities whose room is
/// not on screen are left as they are.
pub fn reconcile_rooms(rooms: &[Room<'_>], entities: &mut Vec<Entity>, ctx: &ReadyContext<'_>) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut taken: HashSet<String> = entities.iter().map(|e| e.id.clone()).collect();
    let mut by_label: HashMap<String, usize> = entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == EntityKind::Switch)
        .map(|(i, e)| (normalize_label(&e.name), i))
        .collect();

    for room in rooms {
        match by_label.get(&room.normalized).copied() {
            None => {
                let mut entity = new_room_entity(room, ctx.prefix, &mut taken);
                entity.publish_discovery(ctx.transport, ctx.device);
                entity.set_state(ctx.transport, room.enabled, true);
                if let Some(topic) = &entity.command_topic {
                    if let Err(e) = ctx.transport.subscribe(topic) {
                        warn!(topic, "subscribe failed: {}", e);
                    }
                }
                info!(room = %room.name, "added room entity");
                by_label.insert(room.normalized.clone(), entities.len());
                report.created.push(entity.id.clone());
                entities.push(entity);
            }
            Some(i) => {
                let entity = &mut entities[i];
                if entity.enabled != room.enabled {
                    entity.set_state(ctx.transport, room.enabled, false);
                    report.changed.push(entity.id.clone());
                } else {
                    entity.enabled = room.enabled;
                    report.unchanged.push(entity.id.clone());
                }
            }
        }
    }

    report
}

/// Switch entity for a room not seen before. Labels that normalize apart
/// but squash to the same id ("Room 1", "Room-1") get `_2`, `_3`, ...
/// so every room keeps its own command topic.
pub fn new_room_entity(room: &Room<'_>, prefix: &str, taken: &mut HashSet<String>) -> Entity {
    let base = entity_id(&room.name);
    let mut id = base.clone();
    let mut suffix = 2;
    while taken.contains(&id) {
        id = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    if id != base {
        warn!(room = %room.name, id = %id, "entity id {} already taken", base);
    }
    taken.insert(id.clone());
    Entity::with_id(&room.name, id, EntityKind::Switch, prefix, room.enabled)
}

/// Reads, toggles and waits on the room selection toggles of the map.
pub struct RoomManager {
    settle: Duration,
}

impl RoomManager {
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    /// Navigate to the map, extract rooms and sync them into `entities`.
    ///
    /// With `None`, builds a fresh switch entity per room without
    /// publishing anything; discovery is then up to the caller.
    pub fn refresh_room_state(
        &self,
        device: &mut DeviceController,
        navigator: &Navigator,
        ctx: &PubSubContext,
        entities: Option<Vec<Entity>>,
    ) -> Result<Vec<Entity>, BridgeError> {
        navigator.navigate_to(device, PageId::Robot);

        let snapshot = match device.capture() {
            Ok(s) => s,
            Err(e) => {
                warn!("room refresh skipped, capture failed: {}", e);
                return Ok(entities.unwrap_or_default());
            }
        };

        let rooms = extract_rooms(&snapshot);
        if rooms.is_empty() {
            warn!("no room map found on screen");
            return Ok(entities.unwrap_or_default());
        }

        let ready = ctx.ready()?;

        match entities {
            None => {
                let mut taken = HashSet::new();
                Ok(rooms
                    .iter()
                    .map(|r| new_room_entity(r, ready.prefix, &mut taken))
                    .collect())
            }
            Some(mut entities) => {
                let report = reconcile_rooms(&rooms, &mut entities, &ready);
                debug!(?report, "room reconciliation");
                Ok(entities)
            }
        }
    }

    /// Tap the toggle of `label`. Returns `Ok(false)` if it is not on screen.
    pub fn enable_room(
        &self,
        device: &mut DeviceController,
        navigator: &Navigator,
        label: &str,
    ) -> Result<bool, BridgeError> {
        navigator.navigate_to(device, PageId::Robot);
        let snapshot = device.capture()?;
        let rooms = extract_rooms(&snapshot);
        let wanted = normalize_label(label);

        debug!(
            label,
            normalized = %wanted,
            visible = ?rooms.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "resolving room"
        );

        let target = rooms
            .iter()
            .find(|r| r.normalized == wanted)
            .or_else(|| {
                let hit = rooms.iter().find(|r| r.normalized.contains(&wanted));
                if let Some(room) = hit {
                    info!(room = %room.name, "using substring match");
                }
                hit
            })
            .map(|r| r.node)
            .or_else(|| {
                if label.contains('_') {
                    snapshot.find_by_text(&label.replace('_', " "), TextMatch::Contains)
                } else {
                    None
                }
            });

        let Some(node) = target else {
            warn!(label, "room not found on screen");
            return Ok(false);
        };

        info!(label, bounds = %node.bounds, "tapping room");
        let tapped = device.tap(Some(node))?;

        thread::sleep(self.settle);
        match device.capture() {
            Ok(after) => debug!(label, state = ?self.room_state(&after, label), "post-tap room state"),
            Err(e) => debug!(label, "post-tap capture failed: {}", e),
        }
        Ok(tapped)
    }

    /// Enabled flag of one room in `snapshot`, `None` if not visible.
    pub fn room_state(&self, snapshot: &Snapshot, label: &str) -> Option<bool> {
        let rooms = extract_rooms(snapshot);
        find_room(&rooms, label).map(|r| r.enabled)
    }

    /// Poll until `label` shows `desired`, up to `retries` captures.
    pub fn wait_for_state(
        &self,
        device: &mut DeviceController,
        label: &str,
        desired: bool,
        retries: u32,
        delay: Duration,
    ) -> bool {
        for attempt in 1..=retries {
            match device.capture() {
                Ok(snapshot) => match self.room_state(&snapshot, label) {
                    Some(state) if state == desired => {
                        info!(label, desired, attempt, "room reached desired state");
                        return true;
                    }
                    Some(state) => {
                        debug!(label, state, desired, attempt, retries, "room state pending");
                        log_room_debug(&snapshot, label);
                    }
                    None => {
                        debug!(label, attempt, retries, "room not visible");
                        log_room_debug(&snapshot, label);
                    }
                },
                Err(e) => warn!(label, attempt, "capture failed while polling: {}", e),
            }
            thread::sleep(delay);
        }

        warn!(label, desired, retries, "room did not reach desired state");
        false
    }
}

fn log_room_debug(snapshot: &Snapshot, label: &str) {
    let wanted = normalize_label(label);
    let hit = room_buttons(snapshot)
        .into_iter()
        .find(|ctx| normalize_label(&clean_label(&ctx.button.text)) == wanted);

    match hit {
        Some(ctx) => debug!(
            label,
            button.index = ctx.button.index,
            button.selected = ctx.button.selected,
            button.checked = ctx.button.checked,
            button.bounds = %ctx.button.bounds,
            parent.index = ctx.parent.index,
            parent.selected = ctx.parent.selected,
            parent.checked = ctx.parent.checked,
            "room toggle attributes"
        ),
        None => debug!(label, "room absent from debug scan"),
    }
}
