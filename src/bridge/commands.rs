use tracing::{debug, info, warn};

use crate::bridge::bridge::Bridge;
use crate::error::BridgeError;
use crate::pubsub::entity::{EntityKind, PAYLOAD_OFF, PAYLOAD_ON, PAYLOAD_PRESS};
use crate::queue::command_queue::QueueHandle;

/// Entity a command was addressed to, detached from the entity list so
/// the handler can mutate the bridge freely.
struct CommandTarget {
    kind: EntityKind,
    id: String,
    name: String,
    enabled: bool,
}

impl Bridge {
    /// Handle one inbound `(topic, payload)` message.
    ///
    /// Returns whether any entity listens on `topic`. When one of them
    /// accepted the payload, the rooms are reconciled and the status
    /// refreshed afterwards. Switches take `ON`/`OFF`, buttons `PRESS`.
    pub fn handle_command(&mut self, topic: &str, payload: &str) -> Result<bool, BridgeError> {
        let command = payload.trim().to_uppercase();
        info!(topic, payload = %command, "command received");

        let targets: Vec<CommandTarget> = self
            .entities
            .iter()
            .filter(|e| e.command_topic.as_deref() == Some(topic))
            .map(|e| CommandTarget {
                kind: e.kind,
                id: e.id.clone(),
                name: e.name.clone(),
                enabled: e.enabled,
            })
            .collect();

        if targets.is_empty() {
            warn!(topic, "no entity matched topic");
            return Ok(false);
        }

        let mut handled = false;
        for target in targets {
            if !accepts(target.kind, &command) {
                warn!(entity = %target.id, kind = %target.kind, payload = %command, "unsupported payload ignored");
                continue;
            }
            handled = true;
            match target.kind {
                EntityKind::Switch => self.toggle_room(&target, command == PAYLOAD_ON)?,
                EntityKind::Button => match self.actions.lookup(&target.id) {
                    Some((action, handler)) => {
                        info!(?action, "button pressed");
                        handler(self)?;
                    }
                    None => warn!(entity = %target.id, "no handler registered"),
                },
                EntityKind::Sensor => debug!(entity = %target.id, "sensors take no commands"),
            }
        }

        if !handled {
            return Ok(true);
        }

        self.reconcile()?;
        self.refresh_status();
        info!("room state refreshed after command");
        Ok(true)
    }

    fn toggle_room(&mut self, target: &CommandTarget, desired: bool) -> Result<(), BridgeError> {
        if target.enabled == desired {
            info!(room = %target.name, desired, "room already in requested state");
            return Ok(());
        }

        info!(room = %target.name, from = target.enabled, to = desired, "toggling room");
        if !self
            .rooms
            .enable_room(&mut self.device, &self.navigator, &target.name)?
        {
            return Ok(());
        }

        self.rooms.wait_for_state(
            &mut self.device,
            &target.name,
            desired,
            self.timing.room_poll_retries,
            self.timing.room_poll_delay,
        );
        Ok(())
    }
}

fn accepts(kind: EntityKind, command: &str) -> bool {
    match kind {
        EntityKind::Switch => command == PAYLOAD_ON || command == PAYLOAD_OFF,
        EntityKind::Button => command == PAYLOAD_PRESS,
        EntityKind::Sensor => false,
    }
}

/// Transport callback body: queue the message, never touch the device here.
pub fn enqueue_command(queue: &QueueHandle<Bridge>, topic: String, payload: String) {
    let label = format!("command {}", topic);
    let queued = queue.enqueue(label, move |bridge: &mut Bridge| {
        bridge.handle_command(&topic, &payload).map(|_| ())
    });
    if !queued {
        warn!("command queue closed; message dropped");
    }
}
