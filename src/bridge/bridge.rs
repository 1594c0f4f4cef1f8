use std::time::Duration;

use tracing::{info, warn};

use crate::bridge::actions::ActionRegistry;
use crate::bridge::status::{STATUS_SENSOR_NAME, StatusMonitor};
use crate::device::controller::DeviceController;
use crate::device::driver::DeviceDriver;
use crate::error::BridgeError;
use crate::navigation::classifier::PageClassifier;
use crate::navigation::graph::NavGraph;
use crate::navigation::navigator::{NavOutcome, Navigator};
use crate::navigation::page::PageId;
use crate::pubsub::context::PubSubContext;
use crate::pubsub::entity::{Entity, EntityKind};
use crate::queue::command_queue::QueueHandle;
use crate::queue::timer::RefreshTimer;
use crate::rooms::manager::RoomManager;

/// Delays and retry bounds of the automation loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    pub detect_retries: u32,
    pub detect_delay: Duration,
    pub max_nav_steps: u32,
    /// Pause after tapping a room before re-reading the screen.
    pub settle: Duration,
    pub room_poll_retries: u32,
    pub room_poll_delay: Duration,
    /// Status refresh interval while the robot is cleaning.
    pub refresh_active: Duration,
    pub refresh_idle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            detect_retries: 10,
            detect_delay: Duration::from_secs(1),
            max_nav_steps: 10,
            settle: Duration::from_millis(300),
            room_poll_retries: 10,
            room_poll_delay: Duration::from_millis(500),
            refresh_active: Duration::from_secs(10),
            refresh_idle: Duration::from_secs(3600),
        }
    }
}

/// Everything the queue worker owns: the device, the navigation and room
/// logic, and the live entity set.
pub struct Bridge {
    pub device: DeviceController,
    pub navigator: Navigator,
    pub rooms: RoomManager,
    pub context: PubSubContext,
    pub entities: Vec<Entity>,
    pub actions: ActionRegistry,
    pub status: StatusMonitor,
    pub timing: Timing,
    refresh: Option<RefreshTimer<Bridge>>,
}

impl Bridge {
    pub fn new(driver: Box<dyn DeviceDriver>, unlock_pin: &str, context: PubSubContext, timing: Timing) -> Self {
        let classifier = PageClassifier::new(timing.detect_retries, timing.detect_delay);
        let navigator = Navigator::new(classifier, NavGraph::vacuum_app(), unlock_pin, timing.max_nav_steps);

        Self {
            device: DeviceController::new(driver),
            navigator,
            rooms: RoomManager::new(timing.settle),
            context,
            entities: Vec::new(),
            actions: ActionRegistry::standard(),
            status: StatusMonitor::default(),
            timing,
            refresh: None,
        }
    }

    /// Give the bridge a way to feed its own timer tasks into the queue.
    pub fn attach_queue(&mut self, queue: QueueHandle<Bridge>) {
        self.refresh = Some(RefreshTimer::new(queue));
    }

    pub fn go_to(&mut self, page: PageId) -> NavOutcome {
        self.navigator.navigate_to(&mut self.device, page)
    }

    /// Build the entity set from the live screen and publish everything.
    pub fn bootstrap(&mut self) -> Result<(), BridgeError> {
        let mut entities =
            self.rooms
                .refresh_room_state(&mut self.device, &self.navigator, &self.context, None)?;

        let ready = self.context.ready()?;
        entities.push(Entity::new(STATUS_SENSOR_NAME, EntityKind::Sensor, ready.prefix, false));
        for action in self.actions.actions() {
            entities.push(Entity::new(action.display_name(), EntityKind::Button, ready.prefix, false));
        }

        for entity in &mut entities {
            entity.publish_discovery(ready.transport, ready.device);
            if entity.kind == EntityKind::Switch {
                let enabled = entity.enabled;
                entity.set_state(ready.transport, enabled, true);
            }
            if let Some(topic) = &entity.command_topic {
                if let Err(e) = ready.transport.subscribe(topic) {
                    warn!(topic, "subscribe failed: {}", e);
                }
            }
        }

        info!(count = entities.len(), "all entities published");
        self.entities = entities;
        Ok(())
    }

    /// Re-read the rooms and sync them into the live entity set.
    pub fn reconcile(&mut self) -> Result<(), BridgeError> {
        // Fail before handing the entities over, so they survive the error.
        self.context.ready()?;
        let entities = std::mem::take(&mut self.entities);
        self.entities =
            self.rooms
                .refresh_room_state(&mut self.device, &self.navigator, &self.context, Some(entities))?;
        Ok(())
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Arm the next status refresh according to the last observed status.
    pub fn schedule_refresh(&mut self) {
        let delay = self
            .status
            .next_interval(self.timing.refresh_active, self.timing.refresh_idle);
        match &mut self.refresh {
            Some(timer) => timer.schedule("status refresh", delay, refresh_status_task),
            None => warn!("no queue attached; status refresh not scheduled"),
        }
    }

    /// Delay of the pending status refresh, if one is armed.
    pub fn pending_refresh(&self) -> Option<Duration> {
        self.refresh.as_ref().and_then(|t| t.armed_delay())
    }
}

/// Timer task: refresh the status sensor, then schedule the next run.
pub fn refresh_status_task(bridge: &mut Bridge) -> Result<(), BridgeError> {
    bridge.refresh_status();
    bridge.schedule_refresh();
    Ok(())
}
